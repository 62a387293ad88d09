//! Descriptors bound to the static message they were laid out in.
//!
//! Generated code wraps every default in a [`DefaultValue`] whose storage
//! kind is part of its type, so a reader default can only ever be read from
//! the reader message and a builder default from the builder message.

use super::{ListStorage, Message, Slice, Storage, StructStorage};
use crate::error::DefaultsResult;
use std::sync::LazyLock;

/// Lazily built message living in a `static`.
pub type StaticMessage<S> = LazyLock<Message<S>>;

pub struct DefaultValue<S: Storage + 'static, T> {
    message: &'static StaticMessage<S>,
    descriptor: T,
}

impl<S: Storage + 'static, T: Copy> DefaultValue<S, T> {
    pub const fn new(message: &'static StaticMessage<S>, descriptor: T) -> Self {
        Self {
            message,
            descriptor,
        }
    }

    /// The message holding this default, built on first use.
    pub fn message(&self) -> &'static Message<S> {
        LazyLock::force(self.message)
    }

    pub fn descriptor(&self) -> T {
        self.descriptor
    }

    pub fn parts(&self) -> (&'static Message<S>, T) {
        (self.message(), self.descriptor)
    }
}

impl<S: Storage + 'static> DefaultValue<S, StructStorage> {
    pub fn data(&self) -> DefaultsResult<&'static [u8]> {
        self.message().bytes(self.descriptor.data)
    }

    pub fn pointers(&self) -> DefaultsResult<&'static [u8]> {
        self.message().bytes(self.descriptor.pointers)
    }
}

impl<S: Storage + 'static> DefaultValue<S, ListStorage> {
    /// Element bytes, excluding a composite list's tag word.
    pub fn elements(&self) -> DefaultsResult<&'static [u8]> {
        self.message().bytes(self.descriptor.storage)
    }
}

impl<S: Storage + 'static> DefaultValue<S, Slice> {
    /// The pointer word itself.
    pub fn pointer_word(&self) -> DefaultsResult<u64> {
        self.message()
            .read_word(self.descriptor.segment_id, self.descriptor.start_word())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{BuilderStorage, ListStorageType, ReaderStorage, WirePointer};

    static READER: StaticMessage<ReaderStorage> = LazyLock::new(|| {
        let words = [0x2a_u64, WirePointer::new_struct(-2, 1, 0).0, 0x0000_0002_0000_0001];
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        Message::from_segments([bytes.as_slice()]).unwrap()
    });

    static BUILDER: StaticMessage<BuilderStorage> = LazyLock::new(|| Message::with_capacity(0));

    static ROOT: DefaultValue<ReaderStorage, StructStorage> = DefaultValue::new(
        &READER,
        StructStorage {
            data: Slice::new(0, 0, 8),
            pointers: Slice::new(0, 8, 0),
        },
    );

    #[test]
    fn struct_defaults_read_from_their_own_message() {
        assert_eq!(ROOT.data().unwrap(), &[0x2a, 0, 0, 0, 0, 0, 0, 0]);
        assert!(ROOT.pointers().unwrap().is_empty());
        let (message, descriptor) = ROOT.parts();
        assert_eq!(message.total_size(), 24);
        assert_eq!(descriptor.data.len, 8);
    }

    #[test]
    fn list_and_pointer_defaults_resolve() {
        let list = DefaultValue::new(
            &READER,
            ListStorage {
                storage: Slice::new(0, 16, 8),
                storage_type: ListStorageType::Bytes4,
                num_elements: 2,
            },
        );
        assert_eq!(list.elements().unwrap(), &[1, 0, 0, 0, 2, 0, 0, 0]);

        let pointer = DefaultValue::new(&READER, Slice::new(0, 8, 8));
        assert_eq!(pointer.pointer_word().unwrap(), WirePointer::new_struct(-2, 1, 0).0);
    }

    #[test]
    fn descriptors_outside_their_message_fail() {
        let stray = DefaultValue::new(&BUILDER, Slice::new(0, 0, 8));
        assert!(stray.pointer_word().is_err());
    }
}
