//! `holdfast config`: inspect the loaded configuration.

use anyhow::Result;
use clap::Subcommand;

use crate::runtime::Runtime;
use crate::terminal_output::{note_error, note_info, note_success, note_warn};

#[derive(Debug, Clone, Subcommand)]
pub enum ConfigCommand {
    /// Validate the config file and print any problems
    Check,
}

pub fn run(runtime: &Runtime, command: ConfigCommand) -> Result<bool> {
    match command {
        ConfigCommand::Check => Ok(check(runtime)),
    }
}

fn check(runtime: &Runtime) -> bool {
    note_info(&format!("config: {}", runtime.config_path.display()));

    let report = &runtime.report;
    for warning in &report.warnings {
        note_warn(&format!("{}: {}", warning.path, warning.message));
    }
    for error in &report.errors {
        note_error(&format!("{}: {}", error.path, error.message));
    }

    if report.is_valid() {
        note_success(&format!(
            "config is valid ({} operation(s), {} warning(s))",
            runtime.config.operations.len(),
            report.warnings.len()
        ));
    }
    report.is_valid()
}
