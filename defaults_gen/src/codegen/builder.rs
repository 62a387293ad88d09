/* Message and binding emission for the builder world */

use super::DefaultsCodeGeneratorOptions;
use crate::literal::emit_literal_seg;
use crate::message::{ListStorageType, Message, Slice, Storage};
use crate::registry::DefaultsRegistry;
use std::fmt::Write;

const SEGMENT_INDENT: &str = "    ";
const CONTINUATION_INDENT: &str = "      ";

/* Name of the generated binding for `ident` in the world of storage kind S */
pub fn binding_name<S: Storage>(ident: &str) -> String {
  format!("_{}_{}", S::NAME, ident)
}

/* Name of the generated static holding the arena of storage kind S */
pub fn message_static_name<S: Storage>() -> String {
  format!("_{}_DEFAULTS_MESSAGE", S::NAME.to_uppercase())
}

/* Runtime type name of storage kind S, e.g. BuilderStorage */
pub fn storage_type_name<S: Storage>() -> String {
  let mut chars = S::NAME.chars();
  match chars.next() {
    Some(first) => format!("{}{}Storage", first.to_uppercase(), chars.as_str()),
    None => "Storage".to_string(),
  }
}

/* Wrapped literal lines of every segment, in storage order, unindented */
pub fn segment_literals<S: Storage>(message: &Message<S>, wrap_width: usize) -> Vec<Vec<String>> {
  message
    .to_segments()
    .into_iter()
    .map(|segment| emit_literal_seg(segment, wrap_width))
    .collect()
}

/* Static that rebuilds `message` from embedded segment literals on first use.
   With `capacity`, the first segment is backed by that many bytes. */
pub fn emit_message<S: Storage>(
  message: &Message<S>,
  capacity: Option<&str>,
  options: &DefaultsCodeGeneratorOptions,
) -> Vec<String> {
  let rt = &options.runtime_path;
  let literals = segment_literals(message, options.wrap_width);
  let mut lines = Vec::new();

  lines.push(format!(
    "/* {} default values: {} segment(s), {} bytes */",
    S::NAME,
    literals.len(),
    message.total_size()
  ));
  lines.push(format!(
    "static {}: {}::StaticMessage<{}::{}> = ::std::sync::LazyLock::new(|| {{",
    message_static_name::<S>(),
    rt,
    rt,
    storage_type_name::<S>()
  ));
  lines.push(format!("  let segments: [&[u8]; {}] = [", literals.len()));
  for literal in literals {
    for (index, line) in literal.into_iter().enumerate() {
      let indent = if index == 0 { SEGMENT_INDENT } else { CONTINUATION_INDENT };
      lines.push(format!("{}{}", indent, line));
    }
  }
  lines.push("  ];".to_string());
  let constructor = match capacity {
    Some(capacity) => format!("from_segments_with_capacity(segments, {})", capacity),
    None => "from_segments(segments)".to_string(),
  };
  lines.push(format!(
    "  {}::Message::{}.expect(\"default segments are word aligned\")",
    rt, constructor
  ));
  lines.push("});".to_string());
  lines
}

/* One static per registered default, bound to the message of its world:
   structs, then lists, then pointers */
pub fn emit_bindings<S: Storage>(registry: &DefaultsRegistry<S>, options: &DefaultsCodeGeneratorOptions) -> Vec<String> {
  let rt = &options.runtime_path;
  let mut lines = Vec::new();

  for (ident, storage) in registry.structs() {
    let descriptor = vec![
      format!("{}::StructStorage {{", rt),
      format!("  data: {},", slice_expr(rt, &storage.data)),
      format!("  pointers: {},", slice_expr(rt, &storage.pointers)),
      "}".to_string(),
    ];
    emit_binding::<S>(&mut lines, rt, ident, "StructStorage", descriptor);
  }
  for (ident, storage) in registry.lists() {
    let descriptor = vec![
      format!("{}::ListStorage {{", rt),
      format!("  storage: {},", slice_expr(rt, &storage.storage)),
      format!("  storage_type: {},", storage_type_expr(rt, &storage.storage_type)),
      format!("  num_elements: {},", storage.num_elements),
      "}".to_string(),
    ];
    emit_binding::<S>(&mut lines, rt, ident, "ListStorage", descriptor);
  }
  for (ident, slice) in registry.pointers() {
    emit_binding::<S>(&mut lines, rt, ident, "Slice", vec![slice_expr(rt, slice)]);
  }
  lines
}

fn emit_binding<S: Storage>(lines: &mut Vec<String>, rt: &str, ident: &str, descriptor_type: &str, descriptor: Vec<String>) {
  lines.push("#[allow(non_upper_case_globals)]".to_string());
  lines.push(format!(
    "pub(crate) static {}: {}::DefaultValue<{}::{}, {}::{}> = {}::DefaultValue::new(",
    binding_name::<S>(ident),
    rt,
    rt,
    storage_type_name::<S>(),
    rt,
    descriptor_type,
    rt
  ));
  lines.push(format!("  &{},", message_static_name::<S>()));
  let last = descriptor.len() - 1;
  for (index, line) in descriptor.into_iter().enumerate() {
    let separator = if index == last { "," } else { "" };
    lines.push(format!("  {}{}", line, separator));
  }
  lines.push(");".to_string());
}

fn slice_expr(rt: &str, slice: &Slice) -> String {
  format!("{}::Slice::new({}, {}, {})", rt, slice.segment_id, slice.start, slice.len)
}

fn storage_type_expr(rt: &str, storage_type: &ListStorageType) -> String {
  let mut expr = format!("{}::ListStorageType::{}", rt, storage_type.variant_name());
  if let ListStorageType::Composite { data_words, pointer_words } = storage_type {
    write!(expr, " {{ data_words: {}, pointer_words: {} }}", data_words, pointer_words).unwrap();
  }
  expr
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::literal::{decode_literal, literal_content};
  use crate::message::{BuilderStorage, ReaderStorage};

  fn options() -> DefaultsCodeGeneratorOptions {
    DefaultsCodeGeneratorOptions {
      runtime_path: "rt".to_string(),
      ..Default::default()
    }
  }

  #[test]
  fn names_carry_the_world_prefix() {
    assert_eq!(binding_name::<BuilderStorage>("default_value_1_a"), "_builder_default_value_1_a");
    assert_eq!(binding_name::<ReaderStorage>("default_value_1_a"), "_reader_default_value_1_a");
    assert_eq!(message_static_name::<ReaderStorage>(), "_READER_DEFAULTS_MESSAGE");
    assert_eq!(storage_type_name::<BuilderStorage>(), "BuilderStorage");
  }

  #[test]
  fn composite_storage_type_spells_its_stride() {
    let expr = storage_type_expr("rt", &ListStorageType::Composite { data_words: 2, pointer_words: 1 });
    assert_eq!(expr, "rt::ListStorageType::Composite { data_words: 2, pointer_words: 1 }");
    assert_eq!(storage_type_expr("rt", &ListStorageType::Bit), "rt::ListStorageType::Bit");
  }

  #[test]
  fn message_block_embeds_every_segment() {
    let mut message = Message::<BuilderStorage>::with_capacity(16);
    let first = message.alloc(16);
    message.bytes_mut(first).unwrap()[0] = 0x2a;
    let second = message.alloc(8);
    message.bytes_mut(second).unwrap()[7] = 0x5c;
    assert_eq!(message.segment_count(), 2);

    let lines = emit_message(&message, None, &options());
    assert_eq!(
      lines[1],
      "static _BUILDER_DEFAULTS_MESSAGE: rt::StaticMessage<rt::BuilderStorage> = ::std::sync::LazyLock::new(|| {"
    );
    assert!(lines.iter().any(|line| line == "  let segments: [&[u8]; 2] = ["));
    assert!(lines.iter().any(|line| line.contains("rt::Message::from_segments(segments)")));

    let sized = emit_message(&message, Some("SIZE"), &options());
    assert!(sized.iter().any(|line| line.contains("rt::Message::from_segments_with_capacity(segments, SIZE)")));

    let literals = segment_literals(&message, options().wrap_width);
    let decoded: Vec<Vec<u8>> = literals
      .iter()
      .map(|lines| decode_literal(&literal_content(lines)).unwrap())
      .collect();
    let expected: Vec<Vec<u8>> = message.to_segments().into_iter().map(<[u8]>::to_vec).collect();
    assert_eq!(decoded, expected);
  }
}
