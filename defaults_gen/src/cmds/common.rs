/* Common utilities shared between the generate and check commands */

use crate::codegen::DefaultsCodeGeneratorOptions;
use crate::manifest::{Manifest, ManifestOptions};
use crate::message::BuilderStorage;
use crate::registry::DefaultsRegistry;
use std::fmt;
use std::path::Path;

/* Destination of verbose progress lines */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
  Quiet,
  Stdout,
  /* Used while generated code is written to stdout */
  Stderr,
}

impl Progress {
  pub fn new(verbose: bool, code_on_stdout: bool) -> Self {
    match (verbose, code_on_stdout) {
      (false, _) => Progress::Quiet,
      (true, false) => Progress::Stdout,
      (true, true) => Progress::Stderr,
    }
  }

  pub fn line(&self, args: fmt::Arguments<'_>) {
    match self {
      Progress::Quiet => {}
      Progress::Stdout => println!("{}", args),
      Progress::Stderr => eprintln!("{}", args),
    }
  }
}

/* Defaults, then the manifest's options block, then command-line overrides */
pub fn resolve_options(manifest: &Manifest, overrides: &ManifestOptions) -> DefaultsCodeGeneratorOptions {
  let mut options = DefaultsCodeGeneratorOptions::default();
  manifest.options.apply(&mut options);
  overrides.apply(&mut options);
  options
}

/* Load a manifest and copy its defaults into a builder registry */
pub fn load_registry(
  manifest_path: &Path,
  overrides: &ManifestOptions,
  progress: Progress,
) -> anyhow::Result<(DefaultsCodeGeneratorOptions, DefaultsRegistry<BuilderStorage>)> {
  progress.line(format_args!("[~] Loading manifest {}", manifest_path.display()));

  let manifest = Manifest::load(manifest_path)?;
  let options = resolve_options(&manifest, overrides);
  options.validate()?;

  progress.line(format_args!("[~] Configuration:"));
  progress.line(format_args!("  Runtime path: {}", options.runtime_path));
  progress.line(format_args!("  Wrap width: {}", options.wrap_width));
  progress.line(format_args!("  Initial capacity: {} bytes", options.initial_capacity));
  progress.line(format_args!("  Nesting limit: {}", options.nesting_limit));
  progress.line(format_args!("  Source segments: {}", manifest.segments.len()));
  progress.line(format_args!("  Defaults: {}\n", manifest.defaults.len()));

  let registry = manifest.build_registry(&options)?;

  progress.line(format_args!(
    "[✓] Registered {} default(s) in {} segment(s), {} bytes",
    registry.len(),
    registry.message().segment_count(),
    registry.message().total_size()
  ));

  Ok((options, registry))
}
