//! Arena-backed, segmented messages.
//!
//! A [`Message`] is an append-only list of fixed-capacity segments. Every
//! allocation hands out a [`Slice`] that stays valid for the lifetime of the
//! message: segments are never resized and regions are never freed. The
//! concrete byte container is abstracted behind [`Storage`] so the same copy
//! and emission code runs against the mutable builder arena and the
//! read-oriented reader arena.

pub mod default_value;
pub mod pointer;
pub mod storage;

pub use default_value::{DefaultValue, StaticMessage};
pub use pointer::{ElementSize, PointerKind, WirePointer};
pub use storage::{ListStorage, ListStorageType, StructStorage};

use crate::error::{DefaultsError, DefaultsResult};
use serde_derive::{Deserialize, Serialize};

/// Size of one wire word in bytes.
pub const BYTES_PER_WORD: usize = 8;

/// Capacity used for the first segment when none was requested up front.
pub const MIN_SEGMENT_SIZE: usize = 128 * BYTES_PER_WORD;

/// Rounds a byte count up to a whole number of words.
pub fn round_up_to_words(bytes: usize) -> usize {
    bytes.div_ceil(BYTES_PER_WORD) * BYTES_PER_WORD
}

/// A view of `len` bytes at `start` inside one segment of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slice {
    pub segment_id: u32,
    pub start: usize,
    pub len: usize,
}

impl Slice {
    pub const fn new(segment_id: u32, start: usize, len: usize) -> Self {
        Self {
            segment_id,
            start,
            len,
        }
    }

    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// Sub-range relative to the start of this slice.
    pub fn sub(&self, offset: usize, len: usize) -> Slice {
        debug_assert!(offset + len <= self.len, "sub-slice escapes its parent");
        Slice::new(self.segment_id, self.start + offset, len)
    }

    /// The `index`-th word of this slice.
    pub fn word(&self, index: usize) -> Slice {
        self.sub(index * BYTES_PER_WORD, BYTES_PER_WORD)
    }

    /// Index of the first word, counted from the start of the segment.
    pub fn start_word(&self) -> usize {
        self.start / BYTES_PER_WORD
    }

    /// Number of whole words covered; errors when the length is not word aligned.
    pub fn word_count(&self) -> DefaultsResult<usize> {
        if self.len % BYTES_PER_WORD != 0 || self.start % BYTES_PER_WORD != 0 {
            return Err(DefaultsError::UnalignedSlice { len: self.len });
        }
        Ok(self.len / BYTES_PER_WORD)
    }
}

/// Byte container backing one segment.
///
/// Implementations only differ in how they hold their bytes; the arena logic
/// lives in [`Message`]. `NAME` is the world the storage belongs to and is
/// used to prefix generated bindings.
pub trait Storage {
    const NAME: &'static str;

    fn zeroed(len: usize) -> Self;
    fn from_bytes(bytes: &[u8]) -> Self;
    fn as_bytes(&self) -> &[u8];
    fn as_bytes_mut(&mut self) -> &mut [u8];
}

/// Growable storage used by the builder world.
#[derive(Debug, Clone, Default)]
pub struct BuilderStorage(Vec<u8>);

impl Storage for BuilderStorage {
    const NAME: &'static str = "builder";

    fn zeroed(len: usize) -> Self {
        Self(vec![0; len])
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

/// Fixed-size storage used by the reader world. Its length is decided once
/// when the segment is created.
#[derive(Debug, Clone)]
pub struct ReaderStorage(Box<[u8]>);

impl Storage for ReaderStorage {
    const NAME: &'static str = "reader";

    fn zeroed(len: usize) -> Self {
        Self(vec![0; len].into_boxed_slice())
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        Self(bytes.into())
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

#[derive(Debug, Clone)]
struct Segment<S> {
    storage: S,
    used: usize,
}

impl<S: Storage> Segment<S> {
    fn capacity(&self) -> usize {
        self.storage.as_bytes().len()
    }
}

/// Segmented arena owning every byte its slices refer to.
#[derive(Debug, Clone)]
pub struct Message<S: Storage> {
    segments: Vec<Segment<S>>,
    next_size: usize,
}

impl<S: Storage> Message<S> {
    /// Creates an arena whose first segment holds `initial_capacity` bytes
    /// (rounded up to words). A zero capacity defers the first segment to the
    /// first allocation.
    pub fn with_capacity(initial_capacity: usize) -> Self {
        let capacity = round_up_to_words(initial_capacity);
        let mut message = Self {
            segments: Vec::new(),
            next_size: capacity.max(MIN_SEGMENT_SIZE),
        };
        if capacity > 0 {
            message.push_segment(capacity);
        }
        message
    }

    /// Wraps existing segments as a fully used message.
    pub fn from_segments<'a, I>(segments: I) -> DefaultsResult<Self>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut message = Self {
            segments: Vec::new(),
            next_size: MIN_SEGMENT_SIZE,
        };
        for (index, bytes) in segments.into_iter().enumerate() {
            if bytes.len() % BYTES_PER_WORD != 0 {
                return Err(DefaultsError::UnalignedSegment {
                    segment_id: index as u32,
                    len: bytes.len(),
                });
            }
            message.segments.push(Segment {
                storage: S::from_bytes(bytes),
                used: bytes.len(),
            });
        }
        Ok(message)
    }

    /// Like [`Message::from_segments`], but the first segment is backed by at
    /// least `capacity` bytes, leaving room to allocate behind its content.
    pub fn from_segments_with_capacity<'a, I>(segments: I, capacity: usize) -> DefaultsResult<Self>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut message = Self::from_segments(segments)?;
        let capacity = round_up_to_words(capacity);
        if message.segments.is_empty() {
            if capacity > 0 {
                message.push_segment(capacity);
            }
            return Ok(message);
        }
        let first = &mut message.segments[0];
        if first.capacity() < capacity {
            let mut storage = S::zeroed(capacity);
            storage.as_bytes_mut()[..first.used]
                .copy_from_slice(&first.storage.as_bytes()[..first.used]);
            first.storage = storage;
        }
        Ok(message)
    }

    fn push_segment(&mut self, capacity: usize) -> u32 {
        let segment_id = self.segments.len() as u32;
        self.segments.push(Segment {
            storage: S::zeroed(capacity),
            used: 0,
        });
        self.next_size = self.next_size.max(capacity.saturating_mul(2));
        segment_id
    }

    /// Allocates a zeroed, word-aligned region. The region goes into the last
    /// segment when it fits there, otherwise into a freshly opened segment.
    pub fn alloc(&mut self, byte_count: usize) -> Slice {
        let len = round_up_to_words(byte_count);
        if let Some(last) = self.segments.len().checked_sub(1) {
            if let Some(slice) = self.alloc_in(last as u32, len) {
                return slice;
            }
        }
        let segment_id = self.push_segment(len.max(self.next_size));
        self.segments[segment_id as usize].used = len;
        Slice::new(segment_id, 0, len)
    }

    /// Allocates inside one specific segment, or returns `None` when the
    /// segment is unknown or full.
    pub fn alloc_in(&mut self, segment_id: u32, byte_count: usize) -> Option<Slice> {
        let len = round_up_to_words(byte_count);
        let segment = self.segments.get_mut(segment_id as usize)?;
        if segment.capacity() - segment.used < len {
            return None;
        }
        let start = segment.used;
        segment.used += len;
        Some(Slice::new(segment_id, start, len))
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Used bytes of one segment.
    pub fn segment(&self, segment_id: u32) -> DefaultsResult<&[u8]> {
        let segment = self.segment_ref(segment_id)?;
        Ok(&segment.storage.as_bytes()[..segment.used])
    }

    /// Used bytes of every segment, in storage order.
    pub fn to_segments(&self) -> Vec<&[u8]> {
        self.segments
            .iter()
            .map(|segment| &segment.storage.as_bytes()[..segment.used])
            .collect()
    }

    /// Sum of the used bytes of every segment.
    pub fn total_size(&self) -> usize {
        self.segments.iter().map(|segment| segment.used).sum()
    }

    pub fn bytes(&self, slice: Slice) -> DefaultsResult<&[u8]> {
        let segment = self.segment_ref(slice.segment_id)?;
        Self::check_bounds(slice, segment.used)?;
        Ok(&segment.storage.as_bytes()[slice.start..slice.end()])
    }

    pub fn bytes_mut(&mut self, slice: Slice) -> DefaultsResult<&mut [u8]> {
        let segment_count = self.segments.len();
        let segment = self
            .segments
            .get_mut(slice.segment_id as usize)
            .ok_or(DefaultsError::SegmentOutOfRange {
                segment_id: slice.segment_id,
                segment_count,
            })?;
        Self::check_bounds(slice, segment.used)?;
        Ok(&mut segment.storage.as_bytes_mut()[slice.start..slice.end()])
    }

    pub fn read_word(&self, segment_id: u32, word: usize) -> DefaultsResult<u64> {
        let bytes = self.bytes(Slice::new(segment_id, word * BYTES_PER_WORD, BYTES_PER_WORD))?;
        let mut raw = [0u8; BYTES_PER_WORD];
        raw.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(raw))
    }

    pub fn write_word(&mut self, segment_id: u32, word: usize, value: u64) -> DefaultsResult<()> {
        let bytes =
            self.bytes_mut(Slice::new(segment_id, word * BYTES_PER_WORD, BYTES_PER_WORD))?;
        bytes.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn segment_ref(&self, segment_id: u32) -> DefaultsResult<&Segment<S>> {
        self.segments
            .get(segment_id as usize)
            .ok_or(DefaultsError::SegmentOutOfRange {
                segment_id,
                segment_count: self.segments.len(),
            })
    }

    fn check_bounds(slice: Slice, used: usize) -> DefaultsResult<()> {
        match slice.start.checked_add(slice.len) {
            Some(end) if end <= used => Ok(()),
            _ => Err(DefaultsError::OutOfBounds {
                segment_id: slice.segment_id,
                start: slice.start,
                end: slice.start.saturating_add(slice.len),
                available: used,
            }),
        }
    }
}
