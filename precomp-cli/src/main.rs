mod fs_host;

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use precomp_core::{preprocess, Host, PreprocessorConfig};
use precomp_lexer::Dialect;
use tracing::{debug, error, metadata::LevelFilter};
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::fs_host::FileSystemHost;

#[derive(Debug, Parser)]
pub struct Args {
    /// The entry-point source file to preprocess.
    input: PathBuf,

    /// Extra directories searched when resolving `#include` targets.
    #[clap(short = 'I', long = "include")]
    include_paths: Vec<PathBuf>,

    /// Maximum nested include/require depth before the pipeline reports an error.
    #[clap(long, default_value_t = 5)]
    max_include_depth: u32,

    /// Disable the preprocessor entirely and echo the input unchanged.
    #[clap(long)]
    disabled: bool,
}

fn detect_dialect(path: &std::path::Path) -> anyhow::Result<Dialect> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("lsl") => Ok(Dialect::Lsl),
        Some("luau") | Some("lua") => Ok(Dialect::Luau),
        other => bail!("cannot infer dialect from extension {other:?}; expected .lsl, .luau, or .lua"),
    }
}

fn fallible_main(args: Args) -> anyhow::Result<()> {
    let dialect = detect_dialect(&args.input)?;
    debug!(?dialect, "detected dialect");

    let source_file = args.input.to_string_lossy().into_owned();
    let config = PreprocessorConfig {
        enabled: !args.disabled,
        include_paths: args
            .include_paths
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect(),
        max_include_depth: args.max_include_depth,
    };
    let host = FileSystemHost::new(config);

    let source = host
        .read_file(&source_file)
        .with_context(|| format!("cannot read entry-point file {:?}", args.input))?;

    let output = preprocess(&host, &source, &source_file, dialect);

    for diagnostic in &output.diagnostics {
        eprintln!("{}", diagnostic.to_pretty_string());
    }

    if !output.success {
        error!("preprocessing failed, {} diagnostic(s) reported", output.diagnostics.len());
        std::process::exit(1);
    }

    print!("{}", output.content);
    Ok(())
}

fn main() {
    let subscriber = tracing_subscriber::registry()
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        );
    tracing::subscriber::set_global_default(subscriber).expect("cannot set default tracing subscriber");

    let args = Args::parse();
    if let Err(error) = fallible_main(args) {
        error!("{error:?}");
        std::process::exit(1);
    }
}
