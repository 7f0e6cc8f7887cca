use crate::buffer::{self, StreamBuffer};
use crate::constants;
use crate::content_disposition::ContentDisposition;
use crate::form::{self, FilePart, FormPart, ParsedRequest};
use crate::helpers;
use crate::size_limit::SizeLimit;
use bytes::Bytes;
use http::header::{self, HeaderMap};

/// Decoder for a fully received `multipart/form-data` body.
///
/// Every pair of consecutive boundary delimiters frames one part. The closing
/// delimiter (`--{boundary}--`) ends the structure; anything after it is
/// ignored, and so is any preamble before the first delimiter.
///
/// # Examples
///
/// ```
/// use asset_relay::Multipart;
///
/// let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"userId\"\r\n\r\n123\r\n--X-BOUNDARY--\r\n";
/// let parsed = Multipart::new(data, "X-BOUNDARY").parse().unwrap();
///
/// assert_eq!(parsed.field("userId"), Some("123"));
/// ```
pub struct Multipart {
    buffer: StreamBuffer,
    boundary: String,
    size_limit: SizeLimit,
}

impl Multipart {
    /// Construct a new `Multipart` decoder over the given body and boundary.
    pub fn new<D, B>(data: D, boundary: B) -> Multipart
    where
        D: Into<Bytes>,
        B: Into<String>,
    {
        Multipart::with_size_limit(data, boundary, SizeLimit::default())
    }

    /// Construct a new `Multipart` decoder that enforces `size_limit`.
    pub fn with_size_limit<D, B>(data: D, boundary: B, size_limit: SizeLimit) -> Multipart
    where
        D: Into<Bytes>,
        B: Into<String>,
    {
        Multipart {
            buffer: StreamBuffer::new(data.into()),
            boundary: boundary.into(),
            size_limit,
        }
    }

    /// Decodes the body into its named parts, in body order.
    ///
    /// Parts without a `name` attribute are skipped.
    pub fn parts(&self) -> crate::Result<Vec<FormPart>> {
        if self.buffer.len() > self.size_limit.whole_stream {
            return Err(crate::Error::StreamSizeExceeded {
                limit: self.size_limit.whole_stream,
            });
        }

        let positions = self.buffer.delimiter_positions(&self.boundary);
        if positions.is_empty() {
            return Err(crate::Error::MalformedMultipart);
        }

        let delimiter_len = constants::BOUNDARY_EXT.len() + self.boundary.len();
        let mut parts = Vec::with_capacity(positions.len() - 1);

        for (index, window) in positions.windows(2).enumerate() {
            let mut start = window[0] + delimiter_len;

            if self.buffer.is_closing_at(start) {
                break;
            }

            if self.buffer.has_crlf_at(start) {
                start += constants::CRLF.len();
            }

            // The CRLF in front of the next delimiter belongs to the delimiter.
            let mut end = window[1];
            if end >= start + constants::CRLF.len() && self.buffer.has_crlf_at(end - constants::CRLF.len()) {
                end -= constants::CRLF.len();
            }

            if let Some(part) = self.read_part(index, self.buffer.slice(start..end))? {
                parts.push(part);
            }
        }

        Ok(parts)
    }

    /// Decodes the body and folds the parts into a [`ParsedRequest`].
    pub fn parse(&self) -> crate::Result<ParsedRequest> {
        self.parts().map(|parts| parts.into_iter().collect())
    }

    fn read_part(&self, index: usize, part: Bytes) -> crate::Result<Option<FormPart>> {
        let (headers, body) = if part.starts_with(constants::CRLF.as_bytes()) {
            (HeaderMap::new(), part.slice(constants::CRLF.len()..))
        } else {
            let header_end = buffer::find_bytes(&part, constants::CRLF_CRLF.as_bytes())
                .ok_or(crate::Error::TruncatedPart { index })?
                + constants::CRLF_CRLF.len();

            (parse_part_headers(index, &part[..header_end])?, part.slice(header_end..))
        };

        let content_disposition = ContentDisposition::parse(&headers);

        let name = match content_disposition.field_name {
            Some(name) => name,
            None => {
                log::debug!("skipping multipart part {} without a name", index);
                return Ok(None);
            }
        };

        let limit = self.size_limit.extract_size_limit_for(Some(&name));
        if body.len() > limit {
            return Err(crate::Error::FieldSizeExceeded {
                limit,
                field_name: Some(name),
            });
        }

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<mime::Mime>().ok());

        let part = match content_disposition.file_name {
            Some(file_name) => FormPart::File(FilePart {
                name,
                file_name,
                content_type,
                data: body,
            }),
            None => FormPart::Field {
                value: form::decode_text(&body, content_type.as_ref()),
                name,
            },
        };

        Ok(Some(part))
    }
}

fn parse_part_headers(index: usize, header_bytes: &[u8]) -> crate::Result<HeaderMap> {
    let mut headers = [httparse::EMPTY_HEADER; constants::MAX_HEADERS];

    match httparse::parse_headers(header_bytes, &mut headers) {
        Ok(httparse::Status::Complete((_, raw_headers))) => helpers::convert_raw_headers_to_header_map(raw_headers),
        Ok(httparse::Status::Partial) => Err(crate::Error::TruncatedPart { index }),
        Err(err) => Err(crate::Error::ReadHeaderFailed(err)),
    }
}

/// Decodes `data` with the default size limits.
pub fn decode<D: Into<Bytes>>(data: D, boundary: &str) -> crate::Result<ParsedRequest> {
    Multipart::new(data, boundary).parse()
}
