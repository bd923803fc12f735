use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::core::error::JarlinkResult;
use crate::core::maven::{DescriptorOutcome, MetaConfig, ReconcileReport};
use crate::core::state::{default_data_dir, JarlinkState, Settings};

#[derive(Debug, Parser)]
#[command(name = "jarlink", version, about = "Fetch declared jars and resolve names against them")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Reconcile the cache with a meta-configuration and fetch what is missing.
    Sync {
        /// Meta file; defaults to the META-INF/jarlink.meta resource on CLASSPATH.
        #[arg(long)]
        meta: Option<PathBuf>,
        /// Cache directory; defaults to the configured one.
        #[arg(long)]
        cache: Option<PathBuf>,
        /// Fail when any dependency could not be fetched.
        #[arg(long)]
        strict: bool,
        /// Fail when no meta-configuration can be found.
        #[arg(long)]
        fail_hard: bool,
        #[arg(long)]
        create_cache_dir: bool,
        /// Keep cached jars of other versions.
        #[arg(long)]
        no_prune: bool,
        #[arg(long)]
        verify_checksums: bool,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Resolve a class or resource name through the source chain.
    Locate {
        name: String,
        /// Extra directory sources, in order.
        #[arg(long = "dir")]
        dirs: Vec<PathBuf>,
        /// Extra jars, registered as one archive source.
        #[arg(long = "jar")]
        jars: Vec<PathBuf>,
        /// Treat the name as a class name.
        #[arg(long)]
        class: bool,
    },
    /// Print the effective settings.
    Settings,
}

pub async fn execute(cli: Cli) -> JarlinkResult<ExitCode> {
    match cli.command {
        Command::Sync {
            meta,
            cache,
            strict,
            fail_hard,
            create_cache_dir,
            no_prune,
            verify_checksums,
            json,
        } => {
            let mut settings = Settings::load_default();
            settings.strict |= strict;
            settings.fail_hard |= fail_hard;
            settings.create_cache_dir |= create_cache_dir;
            settings.verify_checksums |= verify_checksums;
            if no_prune {
                settings.prune_stale_versions = false;
            }
            let cache_dir = cache.unwrap_or_else(|| settings.cache_dir.clone());
            let state = JarlinkState::new(settings)?;

            match meta {
                Some(path) => {
                    let meta = MetaConfig::load(&path)?;
                    let report = state.sync(&meta, &cache_dir).await?;
                    print_report(&report, json)?;
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    if state.check_dependencies(&cache_dir).await? {
                        Ok(ExitCode::SUCCESS)
                    } else {
                        println!("no meta-configuration found");
                        Ok(ExitCode::from(2))
                    }
                }
            }
        }
        Command::Locate {
            name,
            dirs,
            jars,
            class,
        } => {
            let state = JarlinkState::new(Settings::load_default())?;
            for dir in &dirs {
                state.registry.register_directory(dir)?;
            }
            if !jars.is_empty() {
                state.registry.register_archives(&jars);
            }

            let found = if class {
                state.registry.resolve_class(&name)
            } else {
                state.registry.resolve_resource(&name)
            };
            match found {
                Some(location) => {
                    println!("{}", location);
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    println!("{}: not found", name);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Settings => {
            let settings = Settings::load_default();
            println!("# {}", default_data_dir().join("settings.json").display());
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_report(report: &ReconcileReport, json: bool) -> JarlinkResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    for path in &report.pruned {
        println!("pruned     {}", path.display());
    }
    for entry in &report.entries {
        match &entry.outcome {
            DescriptorOutcome::AlreadyPresent => println!("present    {}", entry.descriptor),
            DescriptorOutcome::Fetched { repository, .. } => {
                println!("fetched    {} from {}", entry.descriptor, repository)
            }
            DescriptorOutcome::Unsatisfied { failures } => {
                println!("missing    {}", entry.descriptor);
                for failure in failures {
                    println!("           {} ({})", failure.url, failure.reason);
                }
            }
        }
    }
    Ok(())
}
