use std::collections::HashMap;

use crate::constants;

/// Represents the size limits applied while parsing, to bound memory and
/// work against adversarial input.
///
/// Please refer [`MultipartOptions`](crate::MultipartOptions) for more info.
#[derive(Debug, Clone)]
pub struct SizeLimit {
    pub(crate) whole_stream: u64,
    pub(crate) per_part: u64,
    pub(crate) per_file: u64,
    pub(crate) header_block: u64,
    pub(crate) part_map: HashMap<String, u64>,
}

impl SizeLimit {
    /// Creates a default size limit: unbounded stream and bodies, and 8 KiB
    /// for each part's header block.
    pub fn new() -> SizeLimit {
        SizeLimit::default()
    }

    /// Sets size limit for the whole stream.
    pub fn whole_stream(mut self, limit: u64) -> SizeLimit {
        self.whole_stream = limit;
        self
    }

    /// Sets size limit for the body of each part.
    pub fn per_part(mut self, limit: u64) -> SizeLimit {
        self.per_part = limit;
        self
    }

    /// Sets size limit for the body of each file part, i.e. a part whose
    /// `Content-Disposition` has a `filename` parameter.
    ///
    /// The `per_part` limit still applies to file parts when it is smaller.
    pub fn per_file(mut self, limit: u64) -> SizeLimit {
        self.per_file = limit;
        self
    }

    /// Sets size limit for the header block of each part, not counting the
    /// blank line that terminates it.
    pub fn header_block(mut self, limit: u64) -> SizeLimit {
        self.header_block = limit;
        self
    }

    /// Sets size limit for the parts named `part_name`, overriding the
    /// `per_part` and `per_file` values for them.
    ///
    /// It is useful to keep a textual field that will be buffered in memory
    /// small while still allowing large file uploads.
    pub fn for_part<N: Into<String>>(mut self, part_name: N, limit: u64) -> SizeLimit {
        self.part_map.insert(part_name.into(), limit);
        self
    }

    pub(crate) fn extract_size_limit_for(&self, part_name: &str, is_file: bool) -> u64 {
        if let Some(limit) = self.part_map.get(part_name) {
            return *limit;
        }

        if is_file {
            self.per_part.min(self.per_file)
        } else {
            self.per_part
        }
    }
}

impl Default for SizeLimit {
    fn default() -> Self {
        SizeLimit {
            whole_stream: constants::DEFAULT_WHOLE_STREAM_SIZE_LIMIT,
            per_part: constants::DEFAULT_PER_PART_SIZE_LIMIT,
            per_file: constants::DEFAULT_PER_FILE_SIZE_LIMIT,
            header_block: constants::DEFAULT_HEADER_BLOCK_SIZE_LIMIT,
            part_map: HashMap::default(),
        }
    }
}
