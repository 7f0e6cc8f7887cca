use crate::constants;
use bytes::Bytes;
use encoding_rs::{Encoding, UTF_8};
use std::collections::HashMap;

/// A file part from an inbound form: the one piece of the body kept as raw
/// bytes rather than decoded to text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub name: String,
    pub file_name: String,
    pub content_type: Option<mime::Mime>,
    pub data: Bytes,
}

impl FilePart {
    pub fn new<N: Into<String>, F: Into<String>, D: Into<Bytes>>(name: N, file_name: F, data: D) -> FilePart {
        FilePart {
            name: name.into(),
            file_name: file_name.into(),
            content_type: None,
            data: data.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// One decoded part of an inbound `multipart/form-data` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPart {
    Field { name: String, value: String },
    File(FilePart),
}

impl FormPart {
    pub fn name(&self) -> &str {
        match self {
            FormPart::Field { name, .. } => name,
            FormPart::File(file) => &file.name,
        }
    }
}

/// The text fields and the file of one inbound form.
///
/// A later field with the same name replaces an earlier one. Only the first
/// file part named `file` is kept; any other file part is dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRequest {
    fields: HashMap<String, String>,
    file: Option<FilePart>,
}

impl ParsedRequest {
    pub fn new() -> ParsedRequest {
        ParsedRequest::default()
    }

    pub fn insert(&mut self, part: FormPart) {
        match part {
            FormPart::Field { name, value } => {
                self.fields.insert(name, value);
            }
            FormPart::File(file) => {
                if file.name != constants::FORM_FILE_FIELD {
                    log::debug!("ignoring file part '{}' ({})", file.name, file.file_name);
                } else if let Some(kept) = self.file.as_ref() {
                    log::debug!(
                        "ignoring file part '{}' ({}), already holding '{}'",
                        file.name,
                        file.file_name,
                        kept.file_name
                    );
                } else {
                    self.file = Some(file);
                }
            }
        }
    }

    /// Returns the field value, treating an empty value as absent.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str).filter(|value| !value.is_empty())
    }

    pub fn fields(&self) -> &HashMap<String, String> {
        &self.fields
    }

    pub fn file(&self) -> Option<&FilePart> {
        self.file.as_ref()
    }

    pub fn take_file(&mut self) -> Option<FilePart> {
        self.file.take()
    }
}

impl FromIterator<FormPart> for ParsedRequest {
    fn from_iter<I: IntoIterator<Item = FormPart>>(iter: I) -> Self {
        let mut parsed = ParsedRequest::new();
        for part in iter {
            parsed.insert(part);
        }
        parsed
    }
}

/// Decodes a field body using the charset of its `Content-Type`, UTF-8 otherwise.
pub(crate) fn decode_text(bytes: &[u8], content_type: Option<&mime::Mime>) -> String {
    let encoding = content_type
        .and_then(|mime| mime.get_param(mime::CHARSET))
        .and_then(|charset| Encoding::for_label(charset.as_str().as_bytes()))
        .unwrap_or(UTF_8);

    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}
