use lazy_static::lazy_static;
use regex::Regex;
use std::time::Duration;

pub(crate) const BOUNDARY_EXT: &str = "--";
pub(crate) const CRLF: &str = "\r\n";
pub(crate) const CRLF_CRLF: &str = "\r\n\r\n";
pub(crate) const MAX_HEADERS: usize = 32;

pub(crate) const DEFAULT_WHOLE_STREAM_SIZE_LIMIT: usize = 60 * 1024 * 1024;
pub(crate) const DEFAULT_PER_FIELD_SIZE_LIMIT: usize = usize::MAX;
pub(crate) const DEFAULT_FILE_SIZE_LIMIT: usize = 50 * 1024 * 1024;
pub(crate) const JSON_BODY_SIZE_LIMIT: usize = 64 * 1024;

pub(crate) const FORM_FILE_FIELD: &str = "file";

pub(crate) const OUTBOUND_BOUNDARY_PREFIX: &str = "----AssetRelay";
pub(crate) const METADATA_PART_NAME: &str = "request";
pub(crate) const METADATA_FILE_NAME: &str = "request.json";
pub(crate) const FILE_PART_NAME: &str = "fileContent";
pub(crate) const FALLBACK_FILE_NAME: &str = "asset.rbxm";

pub(crate) const DEFAULT_DISPLAY_NAME: &str = "Uploaded Asset";
pub(crate) const DEFAULT_DESCRIPTION: &str = "Uploaded via RBXM Converter";
pub(crate) const MAX_DISPLAY_NAME_CHARS: usize = 50;
pub(crate) const MAX_DESCRIPTION_CHARS: usize = 1000;

pub const DEFAULT_API_BASE: &str = "https://apis.roblox.com";
pub const DEFAULT_USERS_BASE: &str = "https://users.roblox.com";
pub(crate) const ASSETS_PATH: &str = "/assets/v1/assets";
pub(crate) const OPERATIONS_PREFIX: &str = "/assets/v1/";
pub(crate) const API_KEY_HEADER: &str = "x-api-key";

pub(crate) const TOOLBOX_URL_PREFIX: &str = "https://www.roblox.com/library/";
pub(crate) const INSERT_URL_PREFIX: &str = "rbxassetid://";

pub(crate) const DEFAULT_POLL_ATTEMPTS: u32 = 15;
pub(crate) const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

pub(crate) const OCTET_STREAM: &str = "application/octet-stream";

/// Extension to MIME type, consulted after the per-asset-type tables.
pub(crate) const MIME_BY_EXTENSION: &[(&str, &str)] = &[
    ("rbxm", "application/xml"),
    ("rbxmx", "application/xml"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("mp3", "audio/mpeg"),
    ("ogg", "audio/ogg"),
    ("fbx", "model/fbx"),
    ("obj", "model/obj"),
];

/// Extra formats the remote API accepts for decals only.
pub(crate) const DECAL_ONLY_MIME: &[(&str, &str)] = &[("bmp", "image/bmp"), ("tga", "image/tga")];

lazy_static! {
    pub(crate) static ref CONTENT_DISPOSITION_FIELD_NAME_RE: Regex = Regex::new(r#"(?:^|[;\s])name="([^"]+)""#).unwrap();
    pub(crate) static ref CONTENT_DISPOSITION_FILE_NAME_RE: Regex = Regex::new(r#"filename="([^"]+)""#).unwrap();
    pub(crate) static ref ASSET_PATH_RE: Regex = Regex::new(r"assets/(\d+)").unwrap();
    pub(crate) static ref NUMERIC_USER_ID_RE: Regex = Regex::new(r"^\d+$").unwrap();
}
