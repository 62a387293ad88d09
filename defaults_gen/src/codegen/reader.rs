/* Reader world: a read-only copy of the builder defaults in one segment */

use super::builder::{emit_message, message_static_name};
use super::DefaultsCodeGeneratorOptions;
use crate::error::DefaultsResult;
use crate::message::{BuilderStorage, ReaderStorage, Storage};
use crate::registry::DefaultsRegistry;

const READER_SIZE_CONST: &str = "_READER_DEFAULTS_SIZE";

/* Replays every builder default into a reader arena sized to the whole builder
   arena, so the copy never needs a second segment. */
pub fn transcribe_defaults(builder: &DefaultsRegistry<BuilderStorage>) -> DefaultsResult<DefaultsRegistry<ReaderStorage>> {
  builder.transcribe::<ReaderStorage>(builder.message().total_size())
}

pub fn emit_setup(
  builder_size: usize,
  reader: &DefaultsRegistry<ReaderStorage>,
  options: &DefaultsCodeGeneratorOptions,
) -> Vec<String> {
  let mut lines = Vec::new();
  lines.push(format!(
    "/* Size of the builder defaults; the first segment of {} is backed by this many bytes */",
    message_static_name::<ReaderStorage>()
  ));
  lines.push(format!("pub(crate) const {}: usize = {};", READER_SIZE_CONST, builder_size));
  lines.extend(emit_message(reader.message(), Some(READER_SIZE_CONST), options));
  lines
}

pub fn emit_bindings<S: Storage>(reader: &DefaultsRegistry<S>, options: &DefaultsCodeGeneratorOptions) -> Vec<String> {
  super::builder::emit_bindings(reader, options)
}
