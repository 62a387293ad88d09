/* Check command - verify both worlds agree and the literals round-trip */

use super::common::{Progress, load_registry};
use crate::codegen::builder::segment_literals;
use crate::codegen::{DefaultsCodeGenerator, DefaultsCodeGeneratorOptions, reader};
use crate::literal::{decode_literal, literal_content};
use crate::manifest::ManifestOptions;
use crate::message::{BuilderStorage, Message, Storage};
use crate::registry::DefaultsRegistry;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
  pub entries: usize,
  pub builder_segments: usize,
  pub builder_bytes: usize,
  pub reader_bytes: usize,
  pub generated_lines: usize,
}

/* Execute the check command */
pub fn run(manifest_path: PathBuf, verbose: bool) -> anyhow::Result<()> {
  let progress = Progress::new(verbose, false);
  let (options, registry) = load_registry(&manifest_path, &ManifestOptions::default(), progress)?;
  let report = verify(&registry, &options)?;

  println!(
    "[✓] {} default(s) agree: builder {} bytes in {} segment(s), reader {} bytes, {} generated line(s)",
    report.entries, report.builder_bytes, report.builder_segments, report.reader_bytes, report.generated_lines
  );
  Ok(())
}

/* Compare the builder and reader worlds entry by entry and decode every emitted literal */
pub fn verify(
  registry: &DefaultsRegistry<BuilderStorage>,
  options: &DefaultsCodeGeneratorOptions,
) -> anyhow::Result<CheckReport> {
  let generated = DefaultsCodeGenerator::new(options.clone()).emit_code(registry)?;
  let reader = reader::transcribe_defaults(registry)?;

  if reader.message().segment_count() > 1 {
    anyhow::bail!(
      "reader defaults span {} segments instead of one",
      reader.message().segment_count()
    );
  }

  let builder_payloads = registry.payload_bytes()?;
  let reader_payloads = reader.payload_bytes()?;
  for (ident, payload) in &builder_payloads {
    match reader_payloads.get(ident) {
      Some(other) if other == payload => {}
      Some(_) => anyhow::bail!("default '{}' differs between builder and reader", ident),
      None => anyhow::bail!("default '{}' is missing from the reader", ident),
    }
  }
  if builder_payloads.len() != reader_payloads.len() {
    anyhow::bail!(
      "builder has {} defaults but reader has {}",
      builder_payloads.len(),
      reader_payloads.len()
    );
  }

  check_literals(registry.message(), options.wrap_width)?;
  check_literals(reader.message(), options.wrap_width)?;

  Ok(CheckReport {
    entries: registry.len(),
    builder_segments: registry.message().segment_count(),
    builder_bytes: registry.message().total_size(),
    reader_bytes: reader.message().total_size(),
    generated_lines: generated.blocks().map(Vec::len).sum(),
  })
}

fn check_literals<S: Storage>(message: &Message<S>, wrap_width: usize) -> anyhow::Result<()> {
  let segments = message.to_segments();
  for (segment_id, lines) in segment_literals(message, wrap_width).iter().enumerate() {
    let decoded = decode_literal(&literal_content(lines));
    if decoded.as_deref() != Some(segments[segment_id]) {
      anyhow::bail!("{} segment {} does not decode back from its literal", S::NAME, segment_id);
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::message::{ListStorage, ListStorageType, ReaderStorage, Slice, StructStorage, WirePointer};

  #[test]
  fn spilled_builder_arena_still_agrees_with_reader() {
    let words = [
      0x1111_u64,
      WirePointer::new_list(0, crate::message::ElementSize::Byte, 5).0,
      0x0000_0055_4433_2211,
    ];
    let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
    let src = Message::<ReaderStorage>::from_segments([bytes.as_slice()]).unwrap();

    let options = DefaultsCodeGeneratorOptions {
      initial_capacity: 16,
      wrap_width: 12,
      ..Default::default()
    };
    let mut registry = options.new_registry();
    let root = StructStorage::from_region(Slice::new(0, 0, 16), 1, 1);
    registry.add_struct("default_value_5_a".into(), &src, &root).unwrap();
    let list = ListStorage {
      storage: Slice::new(0, 16, 8),
      storage_type: ListStorageType::Bytes1,
      num_elements: 5,
    };
    registry.add_list("default_value_5_b".into(), &src, &list).unwrap();
    assert!(registry.message().segment_count() > 1);

    let report = verify(&registry, &options).unwrap();
    assert_eq!(report.entries, 2);
    assert!(report.reader_bytes <= report.builder_bytes);
    assert!(report.generated_lines > 0);
  }
}
