use thiserror::Error;

/// Result alias used across the defaults generator.
pub type DefaultsResult<T> = Result<T, DefaultsError>;

/// Errors produced while collecting, copying or emitting default values.
///
/// Every variant is fatal for the current run: generated code is only
/// trustworthy when every default was materialized completely.
#[derive(Debug, Error)]
pub enum DefaultsError {
    /// Two defaults resolved to the same binding name.
    #[error("default identifier '{ident}' is already registered")]
    DuplicateIdentifier { ident: String },

    /// A field name that cannot be part of a generated binding name.
    #[error("field name '{field_name}' of node {node_id} is not a valid identifier")]
    InvalidFieldName { node_id: u64, field_name: String },

    /// A slice used as a struct section or pointer is not a whole number of words.
    #[error("slice of {len} bytes is not word aligned")]
    UnalignedSlice { len: usize },

    /// A segment handed to `Message::from_segments` is not a whole number of words.
    #[error("segment {segment_id} has {len} bytes, which is not word aligned")]
    UnalignedSegment { segment_id: u32, len: usize },

    /// A slice or pointer names a segment the message does not have.
    #[error("segment {segment_id} does not exist (message has {segment_count} segments)")]
    SegmentOutOfRange { segment_id: u32, segment_count: usize },

    /// A slice reaches past the used part of its segment.
    #[error("range {start}..{end} is out of bounds for segment {segment_id} ({available} bytes used)")]
    OutOfBounds {
        segment_id: u32,
        start: usize,
        end: usize,
        available: usize,
    },

    /// Pointer bits that do not describe a valid object.
    #[error("malformed pointer at segment {segment_id} word {word}: {reason}")]
    MalformedPointer {
        segment_id: u32,
        word: usize,
        reason: &'static str,
    },

    /// Capabilities have no meaning inside a statically embedded default.
    #[error("capability pointer at segment {segment_id} word {word} cannot be part of a default value")]
    CapabilityPointer { segment_id: u32, word: usize },

    /// Source data nests deeper than the configured limit (or is cyclic).
    #[error("default value nests deeper than {limit} pointers")]
    NestingLimitExceeded { limit: usize },

    /// A list descriptor whose storage does not match its element kind and count.
    #[error("list storage holds {actual} bytes but {num_elements} elements of kind {storage_type} need {expected}")]
    ListSizeMismatch {
        storage_type: String,
        num_elements: u32,
        expected: usize,
        actual: usize,
    },

    /// A literal wrap width too small to make progress on `\xHH` escapes.
    #[error("wrap width {width} is too small (minimum {minimum})")]
    InvalidWrapWidth { width: usize, minimum: usize },
}
