//! Deep copy of structs, lists and pointers between messages.
//!
//! The copier walks every pointer reachable from the value being copied and
//! re-creates the whole tree inside the destination arena, so the result never
//! refers back into the source message. Source and destination may use
//! different [`Storage`] kinds.

use crate::error::{DefaultsError, DefaultsResult};
use crate::message::{
    BYTES_PER_WORD, ListStorage, ListStorageType, Message, PointerKind, Slice, Storage,
    StructStorage, WirePointer,
};

/// Maximum pointer depth followed before a value is considered cyclic.
pub const DEFAULT_NESTING_LIMIT: usize = 64;

/// Copies a struct into `dest`, resizing it to `data_words` / `pointer_words`.
pub fn deep_copy_struct<S: Storage, D: Storage>(
    src_message: &Message<S>,
    src: &StructStorage,
    dest: &mut Message<D>,
    data_words: usize,
    pointer_words: usize,
) -> DefaultsResult<StructStorage> {
    DeepCopier::new(src_message, dest).copy_struct(src, data_words, pointer_words)
}

/// Copies a list and everything its elements point to into `dest`.
pub fn deep_copy_list<S: Storage, D: Storage>(
    src_message: &Message<S>,
    src: &ListStorage,
    dest: &mut Message<D>,
) -> DefaultsResult<ListStorage> {
    DeepCopier::new(src_message, dest).copy_list(src)
}

/// Copies the object behind the pointer word at `src` and stores a pointer to
/// the copy in the pre-allocated word `dest_pointer`.
pub fn deep_copy_pointer<S: Storage, D: Storage>(
    src_message: &Message<S>,
    src: Slice,
    dest: &mut Message<D>,
    dest_pointer: Slice,
) -> DefaultsResult<()> {
    DeepCopier::new(src_message, dest).copy_pointer(src, dest_pointer)
}

enum SourceObject {
    Struct(StructStorage),
    List(ListStorage),
}

/* Where a nested object landed; `landing_pad` is set when the object could not
 * share the segment of the pointer referring to it. */
struct Placement {
    content: Slice,
    landing_pad: Option<Slice>,
}

pub struct DeepCopier<'a, S: Storage, D: Storage> {
    src: &'a Message<S>,
    dest: &'a mut Message<D>,
    nesting_limit: usize,
    depth: usize,
}

impl<'a, S: Storage, D: Storage> DeepCopier<'a, S, D> {
    pub fn new(src: &'a Message<S>, dest: &'a mut Message<D>) -> Self {
        Self {
            src,
            dest,
            nesting_limit: DEFAULT_NESTING_LIMIT,
            depth: 0,
        }
    }

    pub fn with_nesting_limit(mut self, nesting_limit: usize) -> Self {
        self.nesting_limit = nesting_limit;
        self
    }

    pub fn copy_struct(
        &mut self,
        src: &StructStorage,
        data_words: usize,
        pointer_words: usize,
    ) -> DefaultsResult<StructStorage> {
        let region = self.dest.alloc((data_words + pointer_words) * BYTES_PER_WORD);
        let target = StructStorage::from_region(region, data_words, pointer_words);
        self.fill_struct(src, &target)?;
        Ok(target)
    }

    pub fn copy_list(&mut self, src: &ListStorage) -> DefaultsResult<ListStorage> {
        src.validate()?;
        let region = self.dest.alloc(Self::list_footprint(src));
        let target = self.list_in_region(src, region)?;
        self.fill_list(src, &target)?;
        Ok(target)
    }

    pub fn copy_pointer(&mut self, src: Slice, dest_pointer: Slice) -> DefaultsResult<()> {
        for slice in [src, dest_pointer] {
            if slice.len != BYTES_PER_WORD || slice.start % BYTES_PER_WORD != 0 {
                return Err(DefaultsError::UnalignedSlice { len: slice.len });
            }
        }

        let pointer = WirePointer(self.src.read_word(src.segment_id, src.start_word())?);
        if pointer.is_null() {
            return self
                .dest
                .write_word(dest_pointer.segment_id, dest_pointer.start_word(), WirePointer::NULL.0);
        }

        if self.depth >= self.nesting_limit {
            return Err(DefaultsError::NestingLimitExceeded {
                limit: self.nesting_limit,
            });
        }
        self.depth += 1;
        let result = self.copy_object(src.segment_id, src.start_word(), pointer, dest_pointer);
        self.depth -= 1;
        result
    }

    fn copy_object(
        &mut self,
        segment_id: u32,
        pointer_word: usize,
        pointer: WirePointer,
        dest_pointer: Slice,
    ) -> DefaultsResult<()> {
        match self.resolve(segment_id, pointer_word, pointer)? {
            SourceObject::Struct(src) => {
                let data_words = src.data.len / BYTES_PER_WORD;
                let pointer_words = src.pointers.len / BYTES_PER_WORD;
                if data_words == 0 && pointer_words == 0 {
                    return self.dest.write_word(
                        dest_pointer.segment_id,
                        dest_pointer.start_word(),
                        WirePointer::new_empty_struct().0,
                    );
                }

                let placement =
                    self.place(dest_pointer, (data_words + pointer_words) * BYTES_PER_WORD);
                let target = StructStorage::from_region(placement.content, data_words, pointer_words);
                self.fill_struct(&src, &target)?;
                let wire = WirePointer::new_struct(0, data_words as u16, pointer_words as u16);
                self.link(dest_pointer, &placement, wire)
            }
            SourceObject::List(src) => {
                let placement = self.place(dest_pointer, Self::list_footprint(&src));
                let target = self.list_in_region(&src, placement.content)?;
                self.fill_list(&src, &target)?;
                let count = match src.storage_type {
                    ListStorageType::Composite { .. } => {
                        (target.storage.len / BYTES_PER_WORD) as u32
                    }
                    _ => src.num_elements,
                };
                let wire = WirePointer::new_list(0, src.storage_type.element_size(), count);
                self.link(dest_pointer, &placement, wire)
            }
        }
    }

    /* Follows far pointers and decodes the object a pointer refers to. */
    fn resolve(
        &self,
        segment_id: u32,
        pointer_word: usize,
        pointer: WirePointer,
    ) -> DefaultsResult<SourceObject> {
        let (tag, target_segment, target_word) = match pointer.kind() {
            PointerKind::Other => {
                return Err(DefaultsError::CapabilityPointer {
                    segment_id,
                    word: pointer_word,
                });
            }
            PointerKind::Far => {
                let pad_segment = pointer.far_segment_id();
                let pad_word = pointer.far_pad_word();
                let pad = WirePointer(self.src.read_word(pad_segment, pad_word)?);
                if pointer.far_is_double() {
                    if pad.kind() != PointerKind::Far || pad.far_is_double() {
                        return Err(malformed(
                            pad_segment,
                            pad_word,
                            "double-far landing pad must start with a single far pointer",
                        ));
                    }
                    let tag = WirePointer(self.src.read_word(pad_segment, pad_word + 1)?);
                    (tag, pad.far_segment_id(), pad.far_pad_word())
                } else {
                    if pad.kind() == PointerKind::Far {
                        return Err(malformed(
                            pad_segment,
                            pad_word,
                            "landing pad holds another far pointer",
                        ));
                    }
                    let target = pad.target_word(pad_word).ok_or_else(|| {
                        malformed(pad_segment, pad_word, "offset points before the segment")
                    })?;
                    (pad, pad_segment, target)
                }
            }
            PointerKind::Struct | PointerKind::List => {
                let target = pointer.target_word(pointer_word).ok_or_else(|| {
                    malformed(segment_id, pointer_word, "offset points before the segment")
                })?;
                (pointer, segment_id, target)
            }
        };

        match tag.kind() {
            PointerKind::Struct => {
                let data_words = usize::from(tag.struct_data_words());
                let pointer_words = usize::from(tag.struct_pointer_words());
                let region = Slice::new(
                    target_segment,
                    target_word * BYTES_PER_WORD,
                    (data_words + pointer_words) * BYTES_PER_WORD,
                );
                self.src.bytes(region)?;
                Ok(SourceObject::Struct(StructStorage::from_region(
                    region,
                    data_words,
                    pointer_words,
                )))
            }
            PointerKind::List => self
                .resolve_list(tag, target_segment, target_word)
                .map(SourceObject::List),
            PointerKind::Far => Err(malformed(
                target_segment,
                target_word,
                "far pointer where an object was expected",
            )),
            PointerKind::Other => Err(DefaultsError::CapabilityPointer {
                segment_id: target_segment,
                word: target_word,
            }),
        }
    }

    fn resolve_list(
        &self,
        tag: WirePointer,
        segment_id: u32,
        word: usize,
    ) -> DefaultsResult<ListStorage> {
        let count = tag.list_element_count();
        let Some(storage_type) = ListStorageType::from_element_size(tag.list_element_size())
        else {
            let word_count = count as usize;
            let header = WirePointer(self.src.read_word(segment_id, word)?);
            if header.kind() != PointerKind::Struct {
                return Err(malformed(segment_id, word, "composite list tag is not struct shaped"));
            }
            let num_elements = header.tag_element_count();
            let data_words = header.struct_data_words();
            let pointer_words = header.struct_pointer_words();
            let stride = usize::from(data_words) + usize::from(pointer_words);
            if stride * num_elements as usize > word_count {
                return Err(malformed(
                    segment_id,
                    word,
                    "composite list elements exceed the list word count",
                ));
            }
            let storage = Slice::new(
                segment_id,
                (word + 1) * BYTES_PER_WORD,
                word_count * BYTES_PER_WORD,
            );
            self.src.bytes(storage)?;
            return Ok(ListStorage {
                storage,
                storage_type: ListStorageType::Composite {
                    data_words,
                    pointer_words,
                },
                num_elements,
            });
        };

        let storage = Slice::new(
            segment_id,
            word * BYTES_PER_WORD,
            storage_type.storage_bytes(count),
        );
        self.src.bytes(storage)?;
        Ok(ListStorage {
            storage,
            storage_type,
            num_elements: count,
        })
    }

    fn fill_struct(&mut self, src: &StructStorage, target: &StructStorage) -> DefaultsResult<()> {
        let src_message = self.src;
        let data_len = src.data.len.min(target.data.len);
        if data_len > 0 {
            let bytes = src_message.bytes(src.data.sub(0, data_len))?;
            self.dest
                .bytes_mut(target.data.sub(0, data_len))?
                .copy_from_slice(bytes);
        }

        let pointer_count = src.pointer_words()?.min(target.pointer_words()?);
        for index in 0..pointer_count {
            self.copy_pointer(src.pointers.word(index), target.pointers.word(index))?;
        }
        Ok(())
    }

    fn fill_list(&mut self, src: &ListStorage, target: &ListStorage) -> DefaultsResult<()> {
        let count = src.num_elements as usize;
        match src.storage_type {
            ListStorageType::Pointer => {
                for index in 0..count {
                    self.copy_pointer(src.storage.word(index), target.storage.word(index))?;
                }
            }
            ListStorageType::Composite {
                data_words,
                pointer_words,
            } => {
                let data_words = usize::from(data_words);
                let pointer_words = usize::from(pointer_words);
                let stride = (data_words + pointer_words) * BYTES_PER_WORD;
                for index in 0..count {
                    let element = StructStorage::from_region(
                        src.storage.sub(index * stride, stride),
                        data_words,
                        pointer_words,
                    );
                    let copy = StructStorage::from_region(
                        target.storage.sub(index * stride, stride),
                        data_words,
                        pointer_words,
                    );
                    self.fill_struct(&element, &copy)?;
                }
            }
            _ => {
                let len = src.storage_type.payload_bytes(src.num_elements);
                if len > 0 {
                    let src_message = self.src;
                    let bytes = src_message.bytes(src.storage.sub(0, len))?;
                    self.dest
                        .bytes_mut(target.storage.sub(0, len))?
                        .copy_from_slice(bytes);
                }
            }
        }
        Ok(())
    }

    /* Bytes a list occupies in the destination, including the composite tag. */
    fn list_footprint(src: &ListStorage) -> usize {
        let tag = match src.storage_type {
            ListStorageType::Composite { .. } => BYTES_PER_WORD,
            _ => 0,
        };
        tag + src.storage_type.storage_bytes(src.num_elements)
    }

    fn list_in_region(&mut self, src: &ListStorage, region: Slice) -> DefaultsResult<ListStorage> {
        let storage = match src.storage_type {
            ListStorageType::Composite {
                data_words,
                pointer_words,
            } => {
                let tag = WirePointer::new_composite_tag(src.num_elements, data_words, pointer_words);
                self.dest
                    .write_word(region.segment_id, region.start_word(), tag.0)?;
                region.sub(BYTES_PER_WORD, region.len - BYTES_PER_WORD)
            }
            _ => region,
        };
        Ok(ListStorage {
            storage,
            storage_type: src.storage_type,
            num_elements: src.num_elements,
        })
    }

    fn place(&mut self, dest_pointer: Slice, bytes: usize) -> Placement {
        if let Some(content) = self.dest.alloc_in(dest_pointer.segment_id, bytes) {
            return Placement {
                content,
                landing_pad: None,
            };
        }
        let region = self.dest.alloc(bytes + BYTES_PER_WORD);
        Placement {
            content: region.sub(BYTES_PER_WORD, region.len - BYTES_PER_WORD),
            landing_pad: Some(region.word(0)),
        }
    }

    fn link(&mut self, dest_pointer: Slice, placement: &Placement, wire: WirePointer) -> DefaultsResult<()> {
        match placement.landing_pad {
            None => {
                let offset = placement.content.start_word() as i64
                    - dest_pointer.start_word() as i64
                    - 1;
                self.dest.write_word(
                    dest_pointer.segment_id,
                    dest_pointer.start_word(),
                    wire.with_offset(offset).0,
                )
            }
            Some(pad) => {
                /* The pad sits right before the content, so its own offset is zero. */
                self.dest
                    .write_word(pad.segment_id, pad.start_word(), wire.with_offset(0).0)?;
                let far = WirePointer::new_far(false, pad.start_word(), pad.segment_id);
                self.dest
                    .write_word(dest_pointer.segment_id, dest_pointer.start_word(), far.0)
            }
        }
    }
}

fn malformed(segment_id: u32, word: usize, reason: &'static str) -> DefaultsError {
    DefaultsError::MalformedPointer {
        segment_id,
        word,
        reason,
    }
}
