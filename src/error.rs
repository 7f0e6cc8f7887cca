use std::fmt::{self, Debug, Display, Formatter};

use derive_more::Display;
use http::StatusCode;
use serde_json::{json, Value};

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A set of errors that can occur while decoding an inbound form, talking to
/// the remote assets API, or serving a request.
///
/// Every variant maps to an HTTP status through [`Error::status_code`] and to
/// a JSON body through [`Error::to_json`]; the server never lets one escape
/// as anything else.
#[derive(Display)]
#[non_exhaustive]
pub enum Error {
    /// `userId` or `apiKey` is absent or empty.
    #[display(fmt = "Missing userId or apiKey")]
    MissingCredentials,

    /// The form carried no file part, or an empty one.
    #[display(fmt = "No file uploaded")]
    MissingFile,

    /// Any other malformed input, with a message meant for the caller.
    #[display(fmt = "{}", _0)]
    Validation(String),

    /// The `Content-Type` header is not `multipart/form-data`.
    #[display(fmt = "Content-Type is not multipart/form-data")]
    NoMultipart,

    /// Failed to convert the `Content-Type` to [`mime::Mime`] type.
    #[display(fmt = "Failed to convert Content-Type to `mime::Mime` type: {}", _0)]
    DecodeContentType(mime::FromStrError),

    /// No boundary found in `Content-Type` header.
    #[display(fmt = "multipart boundary not found in Content-Type")]
    NoBoundary,

    /// The body does not contain a single boundary delimiter.
    #[display(fmt = "malformed multipart body: no boundary delimiter found")]
    MalformedMultipart,

    /// A part has no blank line between its headers and its body.
    #[display(fmt = "multipart part {} has no header/body separator", index)]
    TruncatedPart { index: usize },

    /// Failed to read a part's headers.
    #[display(fmt = "failed to read part headers: {}", _0)]
    ReadHeaderFailed(httparse::Error),

    /// Failed to decode a part's raw header name to
    /// [`HeaderName`](http::header::HeaderName) type.
    #[display(fmt = "failed to decode part's raw header name: {:?} {}", name, cause)]
    DecodeHeaderName { name: String, cause: BoxError },

    /// Failed to decode a part's raw header value to
    /// [`HeaderValue`](http::header::HeaderValue) type.
    #[display(fmt = "failed to decode part's raw header value: {}", cause)]
    DecodeHeaderValue { value: Vec<u8>, cause: BoxError },

    /// A part exceeded its size limit.
    #[display(
        fmt = "field '{}' exceeded the maximum size limit: {} bytes",
        "field_name.as_deref().unwrap_or(\"<unknown>\")",
        limit
    )]
    FieldSizeExceeded { limit: usize, field_name: Option<String> },

    /// The request body exceeded the maximum limit.
    #[display(fmt = "stream size exceeded the maximum limit: {} bytes", limit)]
    StreamSizeExceeded { limit: usize },

    /// Reading the request body failed.
    #[display(fmt = "stream read failed: {}", _0)]
    StreamReadFailed(BoxError),

    /// A JSON request body could not be decoded.
    #[display(fmt = "Invalid request: {}", _0)]
    DecodeJson(serde_json::Error),

    /// The remote API rejected the key (401).
    #[display(fmt = "Invalid API Key")]
    InvalidApiKey { details: Value },

    /// The key is valid but lacks the assets scopes or the caller's IP (403).
    #[display(fmt = "API Key lacks permissions — enable Assets Read+Write and IP 0.0.0.0/0")]
    InsufficientPermissions { details: Value },

    /// The remote API throttled the request (429).
    #[display(fmt = "Rate limited — wait a minute")]
    RateLimited { details: Value },

    /// Any other non-2xx reply from the remote API.
    #[display(fmt = "{}", message)]
    RemoteApi {
        status: StatusCode,
        message: String,
        details: Value,
    },

    /// The outbound request never produced a response.
    #[display(fmt = "request to remote API failed: {}", _0)]
    Transport(BoxError),

    /// The user lookup returned a non-2xx status.
    #[display(fmt = "User ID not found on Roblox")]
    UserNotFound,

    /// The user exists but is banned.
    #[display(fmt = "User is banned")]
    UserBanned,

    /// The user lookup could not reach the remote service.
    #[display(fmt = "Cannot reach Roblox API: {}", _0)]
    UpstreamUnreachable(String),

    /// Catch-all for unexpected failures.
    #[display(fmt = "Server error: {}", _0)]
    Server(String),
}

impl Error {
    /// Maps a non-2xx reply from the assets API to the matching variant.
    pub(crate) fn from_remote(status: StatusCode, details: Value) -> Error {
        let remote_message = details.get("message").and_then(Value::as_str).map(str::to_owned);

        match status {
            StatusCode::UNAUTHORIZED => Error::InvalidApiKey { details },
            StatusCode::FORBIDDEN => Error::InsufficientPermissions { details },
            StatusCode::TOO_MANY_REQUESTS => Error::RateLimited { details },
            StatusCode::BAD_REQUEST => Error::RemoteApi {
                status,
                message: remote_message.unwrap_or_else(|| "Bad request — check file format".to_owned()),
                details,
            },
            _ => Error::RemoteApi {
                status,
                message: remote_message.unwrap_or_else(|| format!("Roblox API error {}", status.as_u16())),
                details,
            },
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::MissingCredentials
            | Error::MissingFile
            | Error::Validation(_)
            | Error::NoMultipart
            | Error::DecodeContentType(_)
            | Error::NoBoundary
            | Error::MalformedMultipart
            | Error::TruncatedPart { .. }
            | Error::ReadHeaderFailed(_)
            | Error::DecodeHeaderName { .. }
            | Error::DecodeHeaderValue { .. }
            | Error::StreamReadFailed(_)
            | Error::DecodeJson(_)
            | Error::UserNotFound
            | Error::UserBanned
            | Error::UpstreamUnreachable(_) => StatusCode::BAD_REQUEST,
            Error::FieldSizeExceeded { .. } | Error::StreamSizeExceeded { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::InvalidApiKey { .. } => StatusCode::UNAUTHORIZED,
            Error::InsufficientPermissions { .. } => StatusCode::FORBIDDEN,
            Error::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Error::RemoteApi { status, .. } => *status,
            Error::Transport(_) => StatusCode::BAD_GATEWAY,
            Error::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The remote body attached to a passthrough failure, if any.
    pub fn details(&self) -> Option<&Value> {
        match self {
            Error::InvalidApiKey { details }
            | Error::InsufficientPermissions { details }
            | Error::RateLimited { details }
            | Error::RemoteApi { details, .. } => Some(details),
            _ => None,
        }
    }

    /// Renders the `{error, details?}` body sent back to the caller.
    pub fn to_json(&self) -> Value {
        match self.details() {
            Some(details) => json!({ "error": self.to_string(), "details": details }),
            None => json!({ "error": self.to_string() }),
        }
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl std::error::Error for Error {}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string().eq(&other.to_string())
    }
}

impl Eq for Error {}
