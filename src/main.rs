use std::process;

use clap::Parser;
use colored::Colorize;
use sircel::cli::Args;
use sircel::progress;
use sircel::run::run;

fn main() {
    let args = Args::parse();
    let quiet = args.quiet;

    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}\n {}", "Invalid configuration:".red().bold(), e.to_string().red());
            process::exit(1);
        }
    };

    if let Err(e) = std::fs::create_dir_all(&config.output_dir) {
        eprintln!("{}\n {}", "Failed to create output directory:".red().bold(), e);
        process::exit(1);
    }

    let _guard = match progress::init(&config.run_log_path(), quiet) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{}\n {}", "Failed to open run log:".red().bold(), e);
            process::exit(1);
        }
    };

    match run(&config) {
        Ok(summary) => {
            if !quiet {
                eprintln!(
                    "\n{} {:.2}s",
                    "done in".green().bold(),
                    summary.elapsed.as_secs_f64()
                );
                eprintln!(
                    "{}: {}",
                    "cells discovered".bold(),
                    summary.accepted_paths.to_string().blue().bold()
                );
                eprintln!(
                    "{}: {} assigned, {} unassigned",
                    "reads".bold(),
                    summary.reads_assigned.to_string().blue().bold(),
                    summary.reads_unassigned.to_string().blue().bold()
                );
            }
        }
        Err(e) => {
            eprintln!("{}\n {}", "Pipeline error:".red().bold(), e.to_string().red());
            process::exit(1);
        }
    }
}
