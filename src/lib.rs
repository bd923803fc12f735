mod commands;
pub mod core;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub use crate::core::error::{JarlinkError, JarlinkResult};
pub use crate::core::intercept::{DelegatingSource, HostContext, SplicePolicy};
pub use crate::core::maven::{DependencyDescriptor, MetaConfig, RepositoryResolver};
pub use crate::core::registry::SourceRegistry;
pub use crate::core::state::{JarlinkState, Settings};

/// Initialize structured logging to stderr, honouring `RUST_LOG`.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,jarlink_lib=debug")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// CLI entry point.
pub fn run() -> ExitCode {
    let cli = commands::Cli::parse();
    init_logging();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: cannot start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(commands::execute(cli)) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
