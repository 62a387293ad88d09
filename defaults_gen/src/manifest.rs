//! Input manifest describing a source message and the defaults to extract
//! from it.
//!
//! The manifest is YAML unless the file name ends in `.json`. Segments are
//! hex strings; every default names its schema node, its field and the
//! object to copy, tagged by `kind`.

use crate::codegen::DefaultsCodeGeneratorOptions;
use crate::message::{
    BuilderStorage, ListStorage, Message, ReaderStorage, Slice, StructStorage,
};
use crate::registry::{DefaultsRegistry, make_ident};
use anyhow::Context;
use serde_derive::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub options: ManifestOptions,
    /// Source message, one hex string per segment.
    #[serde(default)]
    pub segments: Vec<String>,
    #[serde(default)]
    pub defaults: Vec<DefaultEntry>,
}

/// Generator options that a manifest may pin. Command-line flags win.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrap_width: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_capacity: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nesting_limit: Option<usize>,
}

impl ManifestOptions {
    pub fn apply(&self, options: &mut DefaultsCodeGeneratorOptions) {
        if let Some(wrap_width) = self.wrap_width {
            options.wrap_width = wrap_width;
        }
        if let Some(runtime_path) = &self.runtime_path {
            options.runtime_path = runtime_path.clone();
        }
        if let Some(initial_capacity) = self.initial_capacity {
            options.initial_capacity = initial_capacity;
        }
        if let Some(nesting_limit) = self.nesting_limit {
            options.nesting_limit = nesting_limit;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultEntry {
    pub node_id: u64,
    pub field: String,
    pub payload: DefaultPayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DefaultPayload {
    Struct(StructStorage),
    List(ListStorage),
    /// One pointer word; the object it refers to is copied.
    Pointer(Slice),
}

impl Manifest {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest {}", path.display()))?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let manifest = if is_json {
            Self::from_json(&text)
        } else {
            Self::from_yaml(&text)
        }
        .with_context(|| format!("failed to parse manifest {}", path.display()))?;
        debug!(
            path = %path.display(),
            segments = manifest.segments.len(),
            defaults = manifest.defaults.len(),
            "loaded manifest"
        );
        Ok(manifest)
    }

    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        Ok(serde_yml::from_str(text)?)
    }

    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Decodes the hex segments into a read-only source message.
    pub fn source_message(&self) -> anyhow::Result<Message<ReaderStorage>> {
        let segments = self
            .segments
            .iter()
            .enumerate()
            .map(|(index, segment)| {
                hex::decode(segment.trim())
                    .with_context(|| format!("segment {} is not valid hex", index))
            })
            .collect::<anyhow::Result<Vec<Vec<u8>>>>()?;
        Ok(Message::from_segments(segments.iter().map(Vec::as_slice))?)
    }

    /// Copies every listed default, in manifest order, into a fresh builder
    /// registry.
    pub fn build_registry(
        &self,
        options: &DefaultsCodeGeneratorOptions,
    ) -> anyhow::Result<DefaultsRegistry<BuilderStorage>> {
        let source = self.source_message()?;
        let mut registry = options.new_registry();
        for entry in &self.defaults {
            let ident = make_ident(entry.node_id, &entry.field)?;
            match &entry.payload {
                DefaultPayload::Struct(storage) => {
                    registry.add_struct(ident.clone(), &source, storage)
                }
                DefaultPayload::List(storage) => registry.add_list(ident.clone(), &source, storage),
                DefaultPayload::Pointer(slice) => {
                    registry.add_pointer(ident.clone(), &source, *slice)
                }
            }
            .with_context(|| format!("failed to register {}", ident))?;
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ListStorageType;

    const YAML: &str = r#"
options:
  wrap_width: 16
segments:
  - "01000000000000000200000003000000"
defaults:
  - node_id: 1001
    field: foo
    payload:
      kind: struct
      data: { segment_id: 0, start: 0, len: 8 }
      pointers: { segment_id: 0, start: 8, len: 0 }
  - node_id: 1002
    field: bar
    payload:
      kind: list
      storage: { segment_id: 0, start: 8, len: 8 }
      storage_type: { kind: bytes4 }
      num_elements: 2
"#;

    #[test]
    fn yaml_payloads_are_tagged_by_kind() {
        let manifest = Manifest::from_yaml(YAML).unwrap();
        assert_eq!(manifest.options.wrap_width, Some(16));
        assert_eq!(manifest.defaults.len(), 2);
        assert_eq!(
            manifest.defaults[1].payload,
            DefaultPayload::List(ListStorage {
                storage: Slice::new(0, 8, 8),
                storage_type: ListStorageType::Bytes4,
                num_elements: 2,
            })
        );
    }

    #[test]
    fn json_manifest_matches_yaml() {
        let yaml = Manifest::from_yaml(YAML).unwrap();
        let json = serde_json::to_string(&yaml).unwrap();
        assert_eq!(Manifest::from_json(&json).unwrap(), yaml);
    }

    #[test]
    fn invalid_hex_is_reported() {
        let manifest = Manifest::from_yaml("segments:\n  - \"01zz\"\n").unwrap();
        let err = manifest.source_message().unwrap_err();
        assert!(err.to_string().contains("segment 0"));
    }

    #[test]
    fn registry_follows_manifest_order() {
        let manifest = Manifest::from_yaml(YAML).unwrap();
        let mut options = DefaultsCodeGeneratorOptions::default();
        manifest.options.apply(&mut options);
        assert_eq!(options.wrap_width, 16);

        let registry = manifest.build_registry(&options).unwrap();
        assert_eq!(registry.structs().keys().next().map(String::as_str), Some("default_value_1001_foo"));
        assert_eq!(registry.lists().keys().next().map(String::as_str), Some("default_value_1002_bar"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn bad_field_names_abort_the_build() {
        let manifest = Manifest::from_yaml(&YAML.replace("field: foo", "field: \"f-o\"")).unwrap();
        let err = manifest
            .build_registry(&DefaultsCodeGeneratorOptions::default())
            .unwrap_err();
        assert!(err.to_string().contains("f-o"));
    }

    #[test]
    fn unknown_options_are_rejected() {
        assert!(Manifest::from_yaml("options:\n  wrap: 3\n").is_err());
    }
}
