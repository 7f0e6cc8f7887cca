use crate::buffer;
use crate::constants;
use crate::form::FilePart;
use bytes::{BufMut, Bytes, BytesMut};

/// A finished outbound `multipart/form-data` body and the boundary it uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBody {
    pub boundary: String,
    pub bytes: Bytes,
}

impl EncodedBody {
    /// The `Content-Type` header value announcing this body's boundary.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }
}

/// Writes parts one after another into a single contiguous body.
pub struct MultipartWriter {
    boundary: String,
    buf: BytesMut,
}

impl MultipartWriter {
    pub fn with_boundary<B: Into<String>>(boundary: B) -> MultipartWriter {
        MultipartWriter {
            boundary: boundary.into(),
            buf: BytesMut::new(),
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn write_part(&mut self, name: &str, file_name: Option<&str>, content_type: &str, data: &[u8]) {
        let head = self.part_head(name, file_name, content_type);

        self.buf.reserve(head.len() + data.len() + constants::CRLF.len());
        self.buf.put_slice(head.as_bytes());
        self.buf.put_slice(data);
        self.buf.put_slice(constants::CRLF.as_bytes());
    }

    /// The delimiter line, headers and blank line that open a part.
    pub fn part_head(&self, name: &str, file_name: Option<&str>, content_type: &str) -> String {
        let disposition = match file_name {
            Some(file_name) => format!(
                "form-data; name=\"{}\"; filename=\"{}\"",
                quote_safe(name),
                quote_safe(file_name)
            ),
            None => format!("form-data; name=\"{}\"", quote_safe(name)),
        };

        format!(
            "{ext}{boundary}{crlf}Content-Disposition: {disposition}{crlf}Content-Type: {content_type}{crlf}{crlf}",
            ext = constants::BOUNDARY_EXT,
            boundary = self.boundary,
            crlf = constants::CRLF,
            disposition = disposition,
            content_type = content_type,
        )
    }

    /// The closing delimiter line.
    pub fn closing(&self) -> String {
        format!(
            "{ext}{boundary}{ext}{crlf}",
            ext = constants::BOUNDARY_EXT,
            boundary = self.boundary,
            crlf = constants::CRLF
        )
    }

    pub fn finish(mut self) -> EncodedBody {
        let closing = self.closing();
        self.buf.put_slice(closing.as_bytes());

        EncodedBody {
            boundary: self.boundary,
            bytes: self.buf.freeze(),
        }
    }
}

/// Produces a fresh boundary token. Uniqueness comes from a random UUID; it
/// is not a cryptographic guarantee.
pub fn generate_boundary() -> String {
    format!(
        "{}{}",
        constants::OUTBOUND_BOUNDARY_PREFIX,
        uuid::Uuid::new_v4().simple()
    )
}

/// Picks a boundary that occurs in none of `contents`.
pub(crate) fn boundary_for(contents: &[&[u8]]) -> String {
    loop {
        let boundary = generate_boundary();
        if contents
            .iter()
            .all(|content| buffer::find_bytes(content, boundary.as_bytes()).is_none())
        {
            return boundary;
        }
        log::warn!("generated boundary collides with upload content, regenerating");
    }
}

/// The file name sent to the remote API for `file`.
pub(crate) fn outbound_file_name(file: &FilePart) -> &str {
    if file.file_name.is_empty() {
        constants::FALLBACK_FILE_NAME
    } else {
        &file.file_name
    }
}

/// Builds the body the assets API expects: a `request` part holding the JSON
/// metadata (as `request.json`) followed by a `fileContent` part holding the
/// raw file bytes.
pub fn encode(metadata_json: &str, file: &FilePart, mime_type: &str) -> EncodedBody {
    let boundary = boundary_for(&[metadata_json.as_bytes(), &file.data]);
    encode_with_boundary(boundary, metadata_json, file, mime_type)
}

pub(crate) fn encode_with_boundary(
    boundary: String,
    metadata_json: &str,
    file: &FilePart,
    mime_type: &str,
) -> EncodedBody {
    let mut writer = MultipartWriter::with_boundary(boundary);

    writer.write_part(
        constants::METADATA_PART_NAME,
        Some(constants::METADATA_FILE_NAME),
        mime::APPLICATION_JSON.as_ref(),
        metadata_json.as_bytes(),
    );
    writer.write_part(
        constants::FILE_PART_NAME,
        Some(outbound_file_name(file)),
        mime_type,
        &file.data,
    );

    writer.finish()
}

// Quotes, CR and LF would end the quoted-string or the header line early.
fn quote_safe(value: &str) -> String {
    value.replace('"', "%22").replace('\r', "%0D").replace('\n', "%0A")
}
