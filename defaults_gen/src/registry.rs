//! Registry of default values collected during one generation run.
//!
//! Every default is deep-copied into a single arena owned by the registry and
//! recorded under its identifier. Structs, lists and raw pointers are kept in
//! three insertion-ordered maps; insertion order is the emission order.

use crate::copy::{DEFAULT_NESTING_LIMIT, DeepCopier};
use crate::error::{DefaultsError, DefaultsResult};
use crate::message::{
    BYTES_PER_WORD, BuilderStorage, ListStorage, Message, Slice, Storage, StructStorage,
};
use indexmap::IndexMap;
use tracing::debug;

/// Binding name for the default of `field_name` on schema node `node_id`.
///
/// Node ids are decimal and never contain `_`, so the first underscore after
/// the prefix always separates the two parts and distinct pairs give
/// distinct identifiers.
pub fn make_ident(node_id: u64, field_name: &str) -> DefaultsResult<String> {
    let valid = !field_name.is_empty()
        && field_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(DefaultsError::InvalidFieldName {
            node_id,
            field_name: field_name.to_string(),
        });
    }
    Ok(format!("default_value_{}_{}", node_id, field_name))
}

#[derive(Debug)]
pub struct DefaultsRegistry<S: Storage = BuilderStorage> {
    message: Message<S>,
    structs: IndexMap<String, StructStorage>,
    lists: IndexMap<String, ListStorage>,
    pointers: IndexMap<String, Slice>,
    nesting_limit: usize,
}

impl<S: Storage> DefaultsRegistry<S> {
    pub fn new(initial_capacity: usize) -> Self {
        Self {
            message: Message::with_capacity(initial_capacity),
            structs: IndexMap::new(),
            lists: IndexMap::new(),
            pointers: IndexMap::new(),
            nesting_limit: DEFAULT_NESTING_LIMIT,
        }
    }

    pub fn with_nesting_limit(mut self, nesting_limit: usize) -> Self {
        self.nesting_limit = nesting_limit;
        self
    }

    /// Deep-copies a struct default into the arena. Its word counts are taken
    /// from the source sections.
    pub fn add_struct<T: Storage>(
        &mut self,
        ident: String,
        src_message: &Message<T>,
        src: &StructStorage,
    ) -> DefaultsResult<()> {
        self.reserve(&ident)?;
        let data_words = src.data_words()?;
        let pointer_words = src.pointer_words()?;
        let copy = DeepCopier::new(src_message, &mut self.message)
            .with_nesting_limit(self.nesting_limit)
            .copy_struct(src, data_words, pointer_words)?;
        debug!(
            world = S::NAME,
            %ident,
            data_words,
            pointer_words,
            "registered struct default"
        );
        self.structs.insert(ident, copy);
        Ok(())
    }

    pub fn add_list<T: Storage>(
        &mut self,
        ident: String,
        src_message: &Message<T>,
        src: &ListStorage,
    ) -> DefaultsResult<()> {
        self.reserve(&ident)?;
        let copy = DeepCopier::new(src_message, &mut self.message)
            .with_nesting_limit(self.nesting_limit)
            .copy_list(src)?;
        debug!(
            world = S::NAME,
            %ident,
            storage_type = %src.storage_type,
            num_elements = src.num_elements,
            "registered list default"
        );
        self.lists.insert(ident, copy);
        Ok(())
    }

    /// Copies the object behind the pointer word `src` into a fresh pointer
    /// slot of the arena.
    pub fn add_pointer<T: Storage>(
        &mut self,
        ident: String,
        src_message: &Message<T>,
        src: Slice,
    ) -> DefaultsResult<()> {
        self.reserve(&ident)?;
        let slot = self.message.alloc(BYTES_PER_WORD);
        DeepCopier::new(src_message, &mut self.message)
            .with_nesting_limit(self.nesting_limit)
            .copy_pointer(src, slot)?;
        debug!(world = S::NAME, %ident, "registered pointer default");
        self.pointers.insert(ident, slot);
        Ok(())
    }

    fn reserve(&self, ident: &str) -> DefaultsResult<()> {
        if self.contains(ident) {
            return Err(DefaultsError::DuplicateIdentifier {
                ident: ident.to_string(),
            });
        }
        Ok(())
    }

    pub fn contains(&self, ident: &str) -> bool {
        self.structs.contains_key(ident)
            || self.lists.contains_key(ident)
            || self.pointers.contains_key(ident)
    }

    pub fn message(&self) -> &Message<S> {
        &self.message
    }

    pub fn structs(&self) -> &IndexMap<String, StructStorage> {
        &self.structs
    }

    pub fn lists(&self) -> &IndexMap<String, ListStorage> {
        &self.lists
    }

    pub fn pointers(&self) -> &IndexMap<String, Slice> {
        &self.pointers
    }

    pub fn len(&self) -> usize {
        self.structs.len() + self.lists.len() + self.pointers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Re-materializes every entry, in registration order, inside a fresh
    /// arena of storage kind `D`. The result depends only on this registry.
    pub fn transcribe<D: Storage>(&self, initial_capacity: usize) -> DefaultsResult<DefaultsRegistry<D>> {
        let mut target = DefaultsRegistry::<D>::new(initial_capacity).with_nesting_limit(self.nesting_limit);
        for (ident, storage) in &self.structs {
            target.add_struct(ident.clone(), &self.message, storage)?;
        }
        for (ident, storage) in &self.lists {
            target.add_list(ident.clone(), &self.message, storage)?;
        }
        for (ident, slot) in &self.pointers {
            target.add_pointer(ident.clone(), &self.message, *slot)?;
        }
        debug!(
            from = S::NAME,
            to = D::NAME,
            entries = target.len(),
            total_size = target.message.total_size(),
            "transcribed defaults"
        );
        Ok(target)
    }

    /// Canonical byte image of every default, keyed by identifier.
    ///
    /// Each entry is copied on its own into a scratch arena large enough to
    /// hold it in one segment, so two registries holding the same logical
    /// values produce identical images regardless of where the values sit
    /// in their arenas.
    pub fn payload_bytes(&self) -> DefaultsResult<IndexMap<String, Vec<u8>>> {
        let capacity = self.message.total_size() + BYTES_PER_WORD;
        let mut payloads = IndexMap::with_capacity(self.len());

        for (ident, storage) in &self.structs {
            let mut scratch = Message::<BuilderStorage>::with_capacity(capacity);
            DeepCopier::new(&self.message, &mut scratch)
                .with_nesting_limit(self.nesting_limit)
                .copy_struct(storage, storage.data_words()?, storage.pointer_words()?)?;
            payloads.insert(ident.clone(), flatten(&scratch));
        }
        for (ident, storage) in &self.lists {
            let mut scratch = Message::<BuilderStorage>::with_capacity(capacity);
            DeepCopier::new(&self.message, &mut scratch)
                .with_nesting_limit(self.nesting_limit)
                .copy_list(storage)?;
            payloads.insert(ident.clone(), flatten(&scratch));
        }
        for (ident, slot) in &self.pointers {
            let mut scratch = Message::<BuilderStorage>::with_capacity(capacity);
            let scratch_slot = scratch.alloc(BYTES_PER_WORD);
            DeepCopier::new(&self.message, &mut scratch)
                .with_nesting_limit(self.nesting_limit)
                .copy_pointer(*slot, scratch_slot)?;
            payloads.insert(ident.clone(), flatten(&scratch));
        }
        Ok(payloads)
    }
}

fn flatten(message: &Message<BuilderStorage>) -> Vec<u8> {
    message.to_segments().concat()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ListStorageType, ReaderStorage, WirePointer};

    fn source() -> Message<ReaderStorage> {
        let words: [u64; 4] = [
            1,
            WirePointer::new_list(0, crate::message::ElementSize::FourBytes, 2).0,
            0x0000_0009_0000_0008,
            WirePointer::new_struct(-4, 1, 1).0,
        ];
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        Message::from_segments([bytes.as_slice()]).unwrap()
    }

    #[test]
    fn identifiers_follow_the_naming_scheme() {
        assert_eq!(make_ident(1001, "foo").unwrap(), "default_value_1001_foo");
        assert_ne!(make_ident(1, "2_x").unwrap(), make_ident(12, "x").unwrap());
        assert!(make_ident(7, "").is_err());
        assert!(matches!(
            make_ident(7, "bad-name"),
            Err(DefaultsError::InvalidFieldName { node_id: 7, .. })
        ));
    }

    #[test]
    fn duplicate_identifiers_are_rejected_across_kinds() {
        let src = source();
        let mut registry = DefaultsRegistry::<BuilderStorage>::new(256);
        let root = StructStorage::from_region(Slice::new(0, 0, 16), 1, 1);
        registry.add_struct("default_value_1_a".into(), &src, &root).unwrap();

        let err = registry
            .add_pointer("default_value_1_a".into(), &src, Slice::new(0, 24, 8))
            .unwrap_err();
        assert!(matches!(err, DefaultsError::DuplicateIdentifier { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn entries_keep_insertion_order() {
        let src = source();
        let mut registry = DefaultsRegistry::<BuilderStorage>::new(256);
        let list = ListStorage {
            storage: Slice::new(0, 16, 8),
            storage_type: ListStorageType::Bytes4,
            num_elements: 2,
        };
        registry.add_list("default_value_2_z".into(), &src, &list).unwrap();
        registry.add_list("default_value_2_a".into(), &src, &list).unwrap();

        let order: Vec<&str> = registry.lists().keys().map(String::as_str).collect();
        assert_eq!(order, vec!["default_value_2_z", "default_value_2_a"]);
    }

    #[test]
    fn unaligned_struct_sections_are_rejected() {
        let src = source();
        let mut registry = DefaultsRegistry::<BuilderStorage>::new(256);
        let bad = StructStorage {
            data: Slice::new(0, 0, 5),
            pointers: Slice::new(0, 8, 0),
        };
        let err = registry.add_struct("default_value_3_b".into(), &src, &bad).unwrap_err();
        assert!(matches!(err, DefaultsError::UnalignedSlice { len: 5 }));
    }

    #[test]
    fn transcribed_registry_has_identical_payloads() {
        let src = source();
        let mut builder = DefaultsRegistry::<BuilderStorage>::new(16);
        let root = StructStorage::from_region(Slice::new(0, 0, 16), 1, 1);
        builder.add_struct("default_value_1_a".into(), &src, &root).unwrap();
        builder
            .add_pointer("default_value_1_b".into(), &src, Slice::new(0, 24, 8))
            .unwrap();

        let reader: DefaultsRegistry<ReaderStorage> =
            builder.transcribe(builder.message().total_size()).unwrap();

        assert_eq!(reader.message().segment_count(), 1);
        assert!(reader.message().total_size() <= builder.message().total_size());
        assert_eq!(builder.payload_bytes().unwrap(), reader.payload_bytes().unwrap());
        let idents: Vec<&str> = reader.pointers().keys().map(String::as_str).collect();
        assert_eq!(idents, vec!["default_value_1_b"]);
    }
}
