use clap::{Parser, Subcommand};
use defaults_gen::ManifestOptions;
use defaults_gen::cmds;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "defaults-gen")]
#[command(about = "Default value table generator for schema accessors", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /* Generate builder and reader default tables from a manifest */
    Generate {
        /* Manifest describing the source message and its defaults (YAML or JSON) */
        #[arg(short = 'f', long = "file", value_name = "FILE")]
        manifest: PathBuf,

        /* Output file for the generated code; stdout when omitted */
        #[arg(short = 'o', long = "output", value_name = "FILE")]
        output: Option<PathBuf>,

        /* Width of each wrapped literal chunk */
        #[arg(long = "wrap-width", value_name = "CHARS")]
        wrap_width: Option<usize>,

        /* Module path of the runtime used by the generated code */
        #[arg(long = "runtime-path", value_name = "PATH")]
        runtime_path: Option<String>,

        /* First segment size of the builder arena */
        #[arg(long = "initial-capacity", value_name = "BYTES")]
        initial_capacity: Option<usize>,

        /* Enable verbose output */
        #[arg(short = 'v', long = "verbose")]
        verbose: bool,
    },

    /* Verify that builder and reader defaults agree without writing code */
    Check {
        /* Manifest describing the source message and its defaults (YAML or JSON) */
        #[arg(short = 'f', long = "file", value_name = "FILE")]
        manifest: PathBuf,

        /* Enable verbose output */
        #[arg(short = 'v', long = "verbose")]
        verbose: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            manifest,
            output,
            wrap_width,
            runtime_path,
            initial_capacity,
            verbose,
        } => {
            init_tracing(verbose);
            let overrides = ManifestOptions {
                wrap_width,
                runtime_path,
                initial_capacity,
                nesting_limit: None,
            };
            cmds::generate::run(manifest, output, overrides, verbose)?;
        }

        Commands::Check { manifest, verbose } => {
            init_tracing(verbose);
            cmds::check::run(manifest, verbose)?;
        }
    }

    Ok(())
}
