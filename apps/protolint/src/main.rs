//! protolint CLI binary entry point.
//! Delegates to the library for lint/fix and prints results.

use clap::Parser;
use protolint::cli::{Cli, Commands};
use protolint::utils::{error_prefix, info_prefix, note_prefix};
use protolint::{config, lint, output, rules};
use std::process::exit;

fn main() {
    let cli = Cli::parse();
    match cli.cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::List => {
            let catalog = match rules::all_rules(&rules::RulesOption::default(), false) {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("{} {}", error_prefix(), e);
                    exit(2);
                }
            };
            for r in &catalog {
                let official = if r.is_official() { "official" } else { "optional" };
                println!("{} [{}]: {}", r.id(), official, r.purpose());
            }
        }
        Commands::Lint {
            fix,
            config_dir,
            output,
            verbose,
            paths,
        } => {
            let eff = match config::resolve_effective(
                config_dir.as_deref(),
                output.as_deref(),
                if fix { Some(true) } else { None },
            ) {
                Ok(e) => e,
                Err(e) => {
                    eprintln!("{} {:#}", error_prefix(), e);
                    exit(2);
                }
            };
            if verbose && eff.output != "json" {
                match eff.config_file.as_ref() {
                    Some(p) => eprintln!("{} using config {}", info_prefix(), p.display()),
                    None => eprintln!(
                        "{} No protolint config found; using defaults.",
                        note_prefix()
                    ),
                }
            }

            let files = match lint::collect_targets(&paths, &eff.excludes) {
                Ok(f) if f.is_empty() => {
                    eprintln!("{} no .proto files found", error_prefix());
                    exit(2);
                }
                Ok(f) => f,
                Err(e) => {
                    eprintln!("{} {:#}", error_prefix(), e);
                    exit(2);
                }
            };
            if verbose && eff.output != "json" {
                for f in &files {
                    eprintln!("{} linting {}", info_prefix(), f.display());
                }
            }

            let run = if eff.fix {
                lint::run_fix(&files, &eff)
            } else {
                lint::run_lint(&files, &eff)
            };
            let (result, errors) = match run {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("{} {}", error_prefix(), e);
                    exit(2);
                }
            };
            output::print_lint(&result, &eff.output, &errors);
            if !errors.is_empty() {
                exit(2);
            }
            let remaining = result
                .issues
                .iter()
                .any(|i| !i.fixed && i.severity == "error");
            if remaining {
                exit(1);
            }
        }
    }
}
