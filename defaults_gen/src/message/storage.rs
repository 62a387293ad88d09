//! Descriptors for structs and lists living inside a [`Message`](super::Message).

use super::pointer::ElementSize;
use super::{BYTES_PER_WORD, Slice, round_up_to_words};
use crate::error::{DefaultsError, DefaultsResult};
use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// Data and pointer sections of one struct. Both sections live in the same
/// segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructStorage {
    pub data: Slice,
    pub pointers: Slice,
}

impl StructStorage {
    /// Struct occupying `data_words + pointer_words` words starting at `region.start`.
    pub fn from_region(region: Slice, data_words: usize, pointer_words: usize) -> Self {
        let data_len = data_words * BYTES_PER_WORD;
        Self {
            data: Slice::new(region.segment_id, region.start, data_len),
            pointers: Slice::new(
                region.segment_id,
                region.start + data_len,
                pointer_words * BYTES_PER_WORD,
            ),
        }
    }

    pub fn data_words(&self) -> DefaultsResult<usize> {
        self.data.word_count()
    }

    pub fn pointer_words(&self) -> DefaultsResult<usize> {
        self.pointers.word_count()
    }
}

/// Layout of the elements of a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ListStorageType {
    Empty,
    Bit,
    Bytes1,
    Bytes2,
    Bytes4,
    Bytes8,
    Pointer,
    Composite { data_words: u16, pointer_words: u16 },
}

impl fmt::Display for ListStorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListStorageType::Composite {
                data_words,
                pointer_words,
            } => write!(f, "composite({data_words}, {pointer_words})"),
            other => write!(f, "{}", other.variant_name()),
        }
    }
}

impl ListStorageType {
    /// Storage type for a non-composite element size; composite lists carry
    /// their layout in a tag word instead.
    pub fn from_element_size(size: ElementSize) -> Option<Self> {
        Some(match size {
            ElementSize::Void => ListStorageType::Empty,
            ElementSize::Bit => ListStorageType::Bit,
            ElementSize::Byte => ListStorageType::Bytes1,
            ElementSize::TwoBytes => ListStorageType::Bytes2,
            ElementSize::FourBytes => ListStorageType::Bytes4,
            ElementSize::EightBytes => ListStorageType::Bytes8,
            ElementSize::Pointer => ListStorageType::Pointer,
            ElementSize::InlineComposite => return None,
        })
    }

    pub fn element_size(&self) -> ElementSize {
        match self {
            ListStorageType::Empty => ElementSize::Void,
            ListStorageType::Bit => ElementSize::Bit,
            ListStorageType::Bytes1 => ElementSize::Byte,
            ListStorageType::Bytes2 => ElementSize::TwoBytes,
            ListStorageType::Bytes4 => ElementSize::FourBytes,
            ListStorageType::Bytes8 => ElementSize::EightBytes,
            ListStorageType::Pointer => ElementSize::Pointer,
            ListStorageType::Composite { .. } => ElementSize::InlineComposite,
        }
    }

    /// Name of the variant as written in generated code.
    pub fn variant_name(&self) -> &'static str {
        match self {
            ListStorageType::Empty => "Empty",
            ListStorageType::Bit => "Bit",
            ListStorageType::Bytes1 => "Bytes1",
            ListStorageType::Bytes2 => "Bytes2",
            ListStorageType::Bytes4 => "Bytes4",
            ListStorageType::Bytes8 => "Bytes8",
            ListStorageType::Pointer => "Pointer",
            ListStorageType::Composite { .. } => "Composite",
        }
    }

    /// Size of one element in bits (composite elements include their pointers).
    pub fn bits_per_element(&self) -> usize {
        match self {
            ListStorageType::Empty => 0,
            ListStorageType::Bit => 1,
            ListStorageType::Bytes1 => 8,
            ListStorageType::Bytes2 => 16,
            ListStorageType::Bytes4 => 32,
            ListStorageType::Bytes8 | ListStorageType::Pointer => 64,
            ListStorageType::Composite {
                data_words,
                pointer_words,
            } => (usize::from(*data_words) + usize::from(*pointer_words)) * 64,
        }
    }

    /// Bytes carrying element values, before rounding up to words.
    pub fn payload_bytes(&self, num_elements: u32) -> usize {
        (num_elements as usize * self.bits_per_element()).div_ceil(8)
    }

    /// Word-rounded size of the element storage (excluding any composite tag).
    pub fn storage_bytes(&self, num_elements: u32) -> usize {
        round_up_to_words(self.payload_bytes(num_elements))
    }
}

/// Elements of one list plus what is needed to reinterpret them.
///
/// For composite lists `storage` covers the elements only; the tag word sits
/// in the word just before `storage.start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListStorage {
    pub storage: Slice,
    pub storage_type: ListStorageType,
    pub num_elements: u32,
}

impl ListStorage {
    /// Checks that the storage is large enough for the declared elements.
    pub fn validate(&self) -> DefaultsResult<()> {
        let expected = self.storage_type.payload_bytes(self.num_elements);
        if self.storage.len < expected {
            return Err(DefaultsError::ListSizeMismatch {
                storage_type: self.storage_type.to_string(),
                num_elements: self.num_elements,
                expected,
                actual: self.storage.len,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_bytes_round_to_words() {
        assert_eq!(ListStorageType::Bit.storage_bytes(9), 8);
        assert_eq!(ListStorageType::Bit.payload_bytes(9), 2);
        assert_eq!(ListStorageType::Bytes2.storage_bytes(5), 16);
        assert_eq!(ListStorageType::Empty.storage_bytes(1000), 0);
        let composite = ListStorageType::Composite {
            data_words: 1,
            pointer_words: 1,
        };
        assert_eq!(composite.storage_bytes(3), 48);
        assert_eq!(composite.element_size() as u8, 7);
    }

    #[test]
    fn validate_rejects_short_storage() {
        let list = ListStorage {
            storage: Slice::new(0, 0, 8),
            storage_type: ListStorageType::Bytes4,
            num_elements: 3,
        };
        let err = list.validate().unwrap_err();
        assert!(matches!(err, DefaultsError::ListSizeMismatch { expected: 12, actual: 8, .. }));
    }

    #[test]
    fn struct_storage_from_region_splits_sections() {
        let storage = StructStorage::from_region(Slice::new(2, 16, 24), 2, 1);
        assert_eq!(storage.data, Slice::new(2, 16, 16));
        assert_eq!(storage.pointers, Slice::new(2, 32, 8));
        assert_eq!(storage.pointer_words().unwrap(), 1);
    }
}
