//! Wire pointer encoding.
//!
//! A pointer is one little-endian word. The low two bits select the kind;
//! the remaining bits are interpreted per kind:
//!
//! ```text
//! struct: [ptr words:16][data words:16][offset:30][00]
//! list:   [count:29][size:3]           [offset:30][01]
//! far:    [segment id:32]      [pad:29][double:1] [10]
//! other:  capability, not valid in defaults       [11]
//! ```
//!
//! Offsets are signed word counts measured from the word that follows the
//! pointer.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Struct = 0,
    List = 1,
    Far = 2,
    Other = 3,
}

/// Element size code stored in list pointers.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementSize {
    Void = 0,
    Bit = 1,
    Byte = 2,
    TwoBytes = 3,
    FourBytes = 4,
    EightBytes = 5,
    Pointer = 6,
    InlineComposite = 7,
}

impl ElementSize {
    pub fn from_code(code: u8) -> Self {
        match code & 7 {
            0 => Self::Void,
            1 => Self::Bit,
            2 => Self::Byte,
            3 => Self::TwoBytes,
            4 => Self::FourBytes,
            5 => Self::EightBytes,
            6 => Self::Pointer,
            _ => Self::InlineComposite,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct WirePointer(pub u64);

impl fmt::Debug for WirePointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WirePointer({:#018x})", self.0)
    }
}

impl WirePointer {
    pub const NULL: WirePointer = WirePointer(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    pub fn kind(self) -> PointerKind {
        match self.0 & 3 {
            0 => PointerKind::Struct,
            1 => PointerKind::List,
            2 => PointerKind::Far,
            _ => PointerKind::Other,
        }
    }

    /// Signed word offset of a struct or list pointer.
    pub fn offset(self) -> i64 {
        i64::from((self.0 as u32 as i32) >> 2)
    }

    /// Word index of the target, given the word index of the pointer itself.
    /// `None` when the offset points before the start of the segment.
    pub fn target_word(self, pointer_word: usize) -> Option<usize> {
        let target = pointer_word as i64 + 1 + self.offset();
        usize::try_from(target).ok()
    }

    pub fn struct_data_words(self) -> u16 {
        (self.0 >> 32) as u16
    }

    pub fn struct_pointer_words(self) -> u16 {
        (self.0 >> 48) as u16
    }

    pub fn list_element_size(self) -> ElementSize {
        ElementSize::from_code((self.0 >> 32) as u8)
    }

    /// Element count, or the word count for inline composite lists.
    pub fn list_element_count(self) -> u32 {
        (self.0 >> 35) as u32
    }

    /// Element count stored in the offset field of a composite list tag.
    pub fn tag_element_count(self) -> u32 {
        (self.0 as u32) >> 2
    }

    pub fn far_is_double(self) -> bool {
        self.0 & 4 != 0
    }

    pub fn far_pad_word(self) -> usize {
        ((self.0 as u32) >> 3) as usize
    }

    pub fn far_segment_id(self) -> u32 {
        (self.0 >> 32) as u32
    }

    fn offset_bits(offset: i64) -> u64 {
        u64::from(((offset as i32) << 2) as u32)
    }

    pub fn new_struct(offset: i64, data_words: u16, pointer_words: u16) -> Self {
        Self(
            Self::offset_bits(offset)
                | (u64::from(data_words) << 32)
                | (u64::from(pointer_words) << 48),
        )
    }

    /// Pointer for a struct with no data and no pointers. The offset of -1
    /// keeps the word distinct from null.
    pub fn new_empty_struct() -> Self {
        Self::new_struct(-1, 0, 0)
    }

    pub fn new_list(offset: i64, element_size: ElementSize, count: u32) -> Self {
        Self(
            Self::offset_bits(offset)
                | PointerKind::List as u64
                | (u64::from(element_size as u8) << 32)
                | (u64::from(count) << 35),
        )
    }

    /// Tag word preceding the elements of an inline composite list.
    pub fn new_composite_tag(element_count: u32, data_words: u16, pointer_words: u16) -> Self {
        Self(
            (u64::from(element_count) << 2)
                | (u64::from(data_words) << 32)
                | (u64::from(pointer_words) << 48),
        )
    }

    pub fn new_far(double: bool, pad_word: usize, segment_id: u32) -> Self {
        Self(
            ((pad_word as u64 & 0x1fff_ffff) << 3)
                | (u64::from(double) << 2)
                | PointerKind::Far as u64
                | (u64::from(segment_id) << 32),
        )
    }

    /// Same pointer, re-targeted at a new offset.
    pub fn with_offset(self, offset: i64) -> Self {
        Self((self.0 & !0xffff_fffc) | Self::offset_bits(offset))
    }
}
