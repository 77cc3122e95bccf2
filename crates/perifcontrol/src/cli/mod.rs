//! Command-line interface for perifcontrol.
//!
//! This module provides the CLI structure and command handlers for the
//! `perifctl` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    CertificateCommand, CollectionArg, ConfigCommand, DashboardCommand, DisposeCommand,
    ExportCommand, ImportCommand, InstallCommand, KindArg, ListCommand, LookupCommand,
    OutputFormat, PrefsCommand, RemoveCommand, ReportAction, ReportCommand, ReportFilterArgs,
    StatusCommand, StockCommand,
};

use crate::logging::Verbosity;

/// perifctl - Track installed, stocked and retired peripherals
///
/// Registers cameras, card readers, e-CPF readers and biometric devices per
/// site, keeps stock and disposal records, and produces dashboards, reports
/// and spreadsheets from them.
#[derive(Debug, Parser)]
#[command(name = "perifctl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Register an installed peripheral
    Install(InstallCommand),

    /// Manage stock
    #[command(subcommand)]
    Stock(StockCommand),

    /// Register disposed peripherals
    Dispose(DisposeCommand),

    /// Find everything installed at a site
    Lookup(LookupCommand),

    /// List the records of a collection
    List(ListCommand),

    /// Delete a record by id
    Remove(RemoveCommand),

    /// Show counts, alerts and recent activity
    Dashboard(DashboardCommand),

    /// Show or export a filtered report
    Report(ReportCommand),

    /// Import a CSV spreadsheet into a collection
    Import(ImportCommand),

    /// Export a collection as a CSV spreadsheet
    Export(ExportCommand),

    /// Write a disposal certificate
    Certificate(CertificateCommand),

    /// View or change user preferences
    #[command(subcommand)]
    Prefs(PrefsCommand),

    /// Show storage status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}
