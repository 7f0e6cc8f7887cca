use crate::constants;
use std::collections::HashMap;

/// Represents size limits on an inbound form, to keep a single request from
/// running the server out of memory.
#[derive(Debug, Clone)]
pub struct SizeLimit {
    pub(crate) whole_stream: usize,
    pub(crate) per_field: usize,
    pub(crate) field_map: HashMap<String, usize>,
}

impl SizeLimit {
    /// Creates the default limits: 60 MiB for the whole body, no per-part
    /// limit, and 50 MiB for the `file` part.
    pub fn new() -> SizeLimit {
        SizeLimit::default()
    }

    /// Sets size limit for the whole body.
    pub fn whole_stream(mut self, limit: usize) -> SizeLimit {
        self.whole_stream = limit;
        self
    }

    /// Sets size limit for each part.
    pub fn per_field(mut self, limit: usize) -> SizeLimit {
        self.per_field = limit;
        self
    }

    /// Sets size limit for a specific field, it overrides the `per_field` value for this field.
    pub fn for_field<N: Into<String>>(mut self, field_name: N, limit: usize) -> SizeLimit {
        self.field_map.insert(field_name.into(), limit);
        self
    }

    pub fn whole_stream_limit(&self) -> usize {
        self.whole_stream
    }

    pub(crate) fn extract_size_limit_for(&self, field: Option<&str>) -> usize {
        field
            .and_then(|field| self.field_map.get(field))
            .copied()
            .unwrap_or(self.per_field)
    }
}

impl Default for SizeLimit {
    fn default() -> Self {
        SizeLimit {
            whole_stream: constants::DEFAULT_WHOLE_STREAM_SIZE_LIMIT,
            per_field: constants::DEFAULT_PER_FIELD_SIZE_LIMIT,
            field_map: HashMap::default(),
        }
        .for_field(constants::FORM_FILE_FIELD, constants::DEFAULT_FILE_SIZE_LIMIT)
    }
}
