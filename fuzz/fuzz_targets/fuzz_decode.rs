#![no_main]

use asset_relay::{infer, Multipart};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let parsed = match Multipart::new(data.to_vec(), "X-BOUNDARY").parse() {
        Ok(parsed) => parsed,
        Err(_) => return,
    };

    if let Some(file) = parsed.file() {
        let _ = infer(&file.file_name, parsed.field("assetType"));
    }
});
