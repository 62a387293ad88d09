pub mod builder;
pub mod reader;

use crate::copy::DEFAULT_NESTING_LIMIT;
use crate::error::{DefaultsError, DefaultsResult};
use crate::literal::MIN_WRAP_WIDTH;
use crate::message::BuilderStorage;
use crate::registry::DefaultsRegistry;
use tracing::info;

pub struct DefaultsCodeGenerator {
  options: DefaultsCodeGeneratorOptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultsCodeGeneratorOptions {
  /* Path of the module providing Message, Slice and the storage descriptors */
  pub runtime_path: String,
  /* Width of each wrapped literal chunk, in characters */
  pub wrap_width: usize,
  /* First segment size of the builder arena, in bytes */
  pub initial_capacity: usize,
  /* Maximum pointer depth followed while copying defaults */
  pub nesting_limit: usize,
}

impl Default for DefaultsCodeGeneratorOptions {
  fn default() -> Self {
    Self {
      runtime_path: "defaults_gen::message".to_string(),
      wrap_width: 64,
      initial_capacity: 8 * 1024,
      nesting_limit: DEFAULT_NESTING_LIMIT,
    }
  }
}

impl DefaultsCodeGeneratorOptions {
  pub fn validate(&self) -> DefaultsResult<()> {
    if self.wrap_width < MIN_WRAP_WIDTH {
      return Err(DefaultsError::InvalidWrapWidth {
        width: self.wrap_width,
        minimum: MIN_WRAP_WIDTH,
      });
    }
    Ok(())
  }

  /* Empty registry configured the way these options ask for */
  pub fn new_registry(&self) -> DefaultsRegistry<BuilderStorage> {
    DefaultsRegistry::new(self.initial_capacity).with_nesting_limit(self.nesting_limit)
  }
}

/* Generated source, as four ordered blocks of lines */
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedDefaults {
  pub builder_message: Vec<String>,
  pub builder_bindings: Vec<String>,
  pub reader_setup: Vec<String>,
  pub reader_bindings: Vec<String>,
}

impl GeneratedDefaults {
  pub fn is_empty(&self) -> bool {
    self.blocks().all(|block| block.is_empty())
  }

  pub fn blocks(&self) -> impl Iterator<Item = &Vec<String>> {
    [
      &self.builder_message,
      &self.builder_bindings,
      &self.reader_setup,
      &self.reader_bindings,
    ]
    .into_iter()
  }

  /* Joins the non-empty blocks, separated by one blank line */
  pub fn render(&self) -> String {
    let blocks: Vec<String> = self
      .blocks()
      .filter(|block| !block.is_empty())
      .map(|block| block.join("\n"))
      .collect();
    if blocks.is_empty() {
      return String::new();
    }
    let mut output = blocks.join("\n\n");
    output.push('\n');
    output
  }
}

impl DefaultsCodeGenerator {
  pub fn new(options: DefaultsCodeGeneratorOptions) -> Self {
    Self { options }
  }

  pub fn options(&self) -> &DefaultsCodeGeneratorOptions {
    &self.options
  }

  /* Renders the builder world, then derives and renders the reader world */
  pub fn emit_code(&self, registry: &DefaultsRegistry<BuilderStorage>) -> DefaultsResult<GeneratedDefaults> {
    self.options.validate()?;

    if registry.is_empty() {
      info!("no default values to emit");
      return Ok(GeneratedDefaults::default());
    }

    let builder_message = builder::emit_message(registry.message(), None, &self.options);
    let builder_bindings = builder::emit_bindings(registry, &self.options);

    let reader_registry = reader::transcribe_defaults(registry)?;
    let reader_setup = reader::emit_setup(registry.message().total_size(), &reader_registry, &self.options);
    let reader_bindings = reader::emit_bindings(&reader_registry, &self.options);

    info!(
      entries = registry.len(),
      builder_bytes = registry.message().total_size(),
      reader_bytes = reader_registry.message().total_size(),
      "emitted default values"
    );

    Ok(GeneratedDefaults {
      builder_message,
      builder_bindings,
      reader_setup,
      reader_bindings,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::literal::{decode_literal, literal_content};
  use crate::message::{Message, ReaderStorage, Slice, StructStorage};
  use crate::registry::make_ident;

  fn single_struct_registry() -> DefaultsRegistry<BuilderStorage> {
    let mut data = [0u8; 8];
    data[0] = 0x01;
    let src = Message::<ReaderStorage>::from_segments([data.as_slice()]).unwrap();
    let storage = StructStorage::from_region(Slice::new(0, 0, 8), 1, 0);

    let mut registry = DefaultsCodeGeneratorOptions::default().new_registry();
    registry.add_struct(make_ident(1001, "foo").unwrap(), &src, &storage).unwrap();
    registry
  }

  #[test]
  fn struct_default_is_emitted_for_both_worlds() {
    let registry = single_struct_registry();
    let generated = DefaultsCodeGenerator::new(Default::default()).emit_code(&registry).unwrap();

    assert_eq!(
      generated.builder_bindings,
      vec![
        "#[allow(non_upper_case_globals)]",
        "pub(crate) static _builder_default_value_1001_foo: defaults_gen::message::DefaultValue<defaults_gen::message::BuilderStorage, defaults_gen::message::StructStorage> = defaults_gen::message::DefaultValue::new(",
        "  &_BUILDER_DEFAULTS_MESSAGE,",
        "  defaults_gen::message::StructStorage {",
        "    data: defaults_gen::message::Slice::new(0, 0, 8),",
        "    pointers: defaults_gen::message::Slice::new(0, 8, 0),",
        "  },",
        ");",
      ]
    );
    assert!(generated
      .reader_bindings
      .iter()
      .any(|line| line.starts_with("pub(crate) static _reader_default_value_1001_foo:")));
    assert!(generated.reader_bindings.contains(&"  &_READER_DEFAULTS_MESSAGE,".to_string()));

    let literal: Vec<&String> = generated
      .builder_message
      .iter()
      .skip_while(|line| !line.trim_start().starts_with("b\""))
      .take_while(|line| !line.trim_start().starts_with("];"))
      .collect();
    let bytes = decode_literal(&literal_content(&literal)).unwrap();
    assert_eq!(&bytes[..8], &[0x01, 0, 0, 0, 0, 0, 0, 0]);
    assert_eq!(bytes, registry.message().to_segments().concat());
  }

  #[test]
  fn empty_registry_emits_nothing() {
    let registry = DefaultsCodeGeneratorOptions::default().new_registry();
    let generated = DefaultsCodeGenerator::new(Default::default()).emit_code(&registry).unwrap();
    assert!(generated.is_empty());
    assert_eq!(generated.render(), "");
  }

  #[test]
  fn narrow_wrap_width_is_rejected() {
    let registry = single_struct_registry();
    let options = DefaultsCodeGeneratorOptions {
      wrap_width: 4,
      ..Default::default()
    };
    let err = DefaultsCodeGenerator::new(options).emit_code(&registry).unwrap_err();
    assert!(matches!(err, DefaultsError::InvalidWrapWidth { width: 4, minimum: 5 }));
  }

  #[test]
  fn render_separates_blocks_with_blank_lines() {
    let registry = single_struct_registry();
    let generated = DefaultsCodeGenerator::new(Default::default()).emit_code(&registry).unwrap();
    let rendered = generated.render();

    assert!(rendered.ends_with(");\n"));
    assert_eq!(rendered.matches("\n\n").count(), 3);
    let builder_pos = rendered.find("_builder_default_value_1001_foo").unwrap();
    let reader_pos = rendered.find("_READER_DEFAULTS_SIZE").unwrap();
    assert!(builder_pos < reader_pos);
  }
}
