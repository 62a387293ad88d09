/* Default Value Table Generator
 *
 * Collects schema default values (structs, lists and raw pointers) from a
 * source message, deep-copies them into a segmented arena and emits Rust
 * source that rebuilds the arena from byte-string literals, once for the
 * mutable builder world and once for the read-only reader world.
 */

pub mod cmds;
pub mod codegen;
pub mod copy;
pub mod error;
pub mod literal;
pub mod manifest;
pub mod message;
pub mod registry;

pub use codegen::{DefaultsCodeGenerator, DefaultsCodeGeneratorOptions, GeneratedDefaults};
pub use copy::{DeepCopier, deep_copy_list, deep_copy_pointer, deep_copy_struct};
pub use error::{DefaultsError, DefaultsResult};
pub use manifest::{DefaultEntry, DefaultPayload, Manifest, ManifestOptions};
pub use message::{
    BuilderStorage, DefaultValue, ListStorage, ListStorageType, Message, ReaderStorage, Slice,
    StaticMessage, Storage, StructStorage,
};
pub use registry::{DefaultsRegistry, make_ident};
