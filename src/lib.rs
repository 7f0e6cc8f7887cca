//! Relays browser form uploads to the Roblox Open Cloud assets API.
//!
//! An inbound `multipart/form-data` body is decoded with [`Multipart`],
//! validated into an [`AssetUploadSpec`], re-encoded with the strict layout
//! the assets API expects, and submitted through an [`AssetApi`]. When the API
//! answers with an operation handle instead of an asset id, the operation is
//! polled until it finishes or the [`PollPolicy`] budget runs out.
//!
//! # Examples
//!
//! ```
//! use asset_relay::{infer, AssetType, Multipart};
//!
//! let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"file\"; filename=\"model.rbxm\"\r\n\r\n<roblox/>\r\n--X-BOUNDARY--\r\n";
//! let parsed = Multipart::new(data, "X-BOUNDARY").parse().unwrap();
//! let file = parsed.file().unwrap();
//!
//! let inferred = infer(&file.file_name, None);
//! assert_eq!(inferred.asset_type, AssetType::Model);
//! assert_eq!(inferred.mime_type, "application/xml");
//! ```

pub use asset::{infer, AssetResult, AssetType, AssetUploadSpec, Inference};
pub use client::{AssetApi, RemoteApi, RemoteResponse};
pub use config::Config;
pub use error::Error;
pub use form::{FilePart, FormPart, ParsedRequest};
pub use multipart::{decode, Multipart};
pub use poll::{PollOutcome, PollPolicy, PollState};
pub use server::App;
pub use size_limit::SizeLimit;
pub use upload::{PreparedUpload, Uploader};
pub use writer::{encode, EncodedBody, MultipartWriter};

pub mod asset;
mod buffer;
mod client;
mod config;
pub mod constants;
mod content_disposition;
mod error;
mod form;
mod helpers;
mod multipart;
pub mod poll;
pub mod server;
mod size_limit;
mod upload;
pub mod verify;
mod writer;

/// A Result type often returned from methods that can have relay errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Parses the `Content-Type` header to extract the boundary value.
pub fn parse_boundary<T: AsRef<str>>(content_type: T) -> crate::Result<String> {
    let m = content_type
        .as_ref()
        .parse::<mime::Mime>()
        .map_err(crate::Error::DecodeContentType)?;

    if !(m.type_() == mime::MULTIPART && m.subtype() == mime::FORM_DATA) {
        return Err(crate::Error::NoMultipart);
    }

    m.get_param(mime::BOUNDARY)
        .map(|name| name.as_str().to_owned())
        .ok_or(crate::Error::NoBoundary)
}
