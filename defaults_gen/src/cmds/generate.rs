/* Generate command - emit default value tables from a manifest */

use super::common::{Progress, load_registry};
use crate::codegen::DefaultsCodeGenerator;
use crate::manifest::ManifestOptions;
use anyhow::Context;
use std::path::{Path, PathBuf};

/* Execute the generate command */
pub fn run(
  manifest_path: PathBuf,
  output: Option<PathBuf>,
  overrides: ManifestOptions,
  verbose: bool,
) -> anyhow::Result<()> {
  let progress = Progress::new(verbose, output.is_none());

  progress.line(format_args!("Defaults Generator - Code Generation Tool"));
  progress.line(format_args!("=========================================\n"));

  let (options, registry) = load_registry(&manifest_path, &overrides, progress)?;

  progress.line(format_args!("\n[*] Emitting builder and reader defaults..."));

  let generated = DefaultsCodeGenerator::new(options).emit_code(&registry)?;
  let rendered = generated.render();

  match &output {
    Some(path) => write_output(path, &rendered)?,
    None => print!("{}", rendered),
  }

  progress.line(format_args!("[~] Builder message: {} line(s)", generated.builder_message.len()));
  progress.line(format_args!("[~] Builder bindings: {} line(s)", generated.builder_bindings.len()));
  progress.line(format_args!("[~] Reader setup: {} line(s)", generated.reader_setup.len()));
  progress.line(format_args!("[~] Reader bindings: {} line(s)", generated.reader_bindings.len()));

  if let Some(path) = &output {
    progress.line(format_args!("[✓] Wrote {}", path.display()));
    println!("[✓] Code generation complete!");
  }
  Ok(())
}

fn write_output(path: &Path, rendered: &str) -> anyhow::Result<()> {
  if let Some(parent) = path.parent() {
    if !parent.as_os_str().is_empty() {
      std::fs::create_dir_all(parent)
        .with_context(|| format!("failed to create {}", parent.display()))?;
    }
  }
  std::fs::write(path, rendered).with_context(|| format!("failed to write {}", path.display()))
}
