//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};
use uuid::Uuid;

use crate::preferences::SortField;
use crate::record::{Collection, DisposalReason, PeripheralKind, ReplacementReason};
use crate::report::{Period, ReportFilter};

/// Install command arguments.
#[derive(Debug, Args)]
pub struct InstallCommand {
    /// Peripheral type
    #[arg(value_enum)]
    pub kind: KindArg,

    /// Serial number or asset tag
    #[arg(short, long)]
    pub serial: String,

    /// Site code (UNCP), 1 to 4 digits
    #[arg(short = 'u', long)]
    pub site: String,

    /// Installation date (defaults to today)
    #[arg(short, long)]
    pub date: Option<String>,

    /// Incident-ticket number (OCOMON)
    #[arg(short, long)]
    pub ticket: String,

    /// Replacement reason (e.g. "Defeito", "Nova Instalação")
    #[arg(short, long, default_value = "Nova Instalação")]
    pub reason: ReplacementReason,

    /// Free-text note
    #[arg(short, long, default_value = "")]
    pub note: String,

    /// Technician (defaults to the preferred technician)
    #[arg(long)]
    pub technician: Option<String>,
}

/// Stock commands.
#[derive(Debug, Subcommand)]
pub enum StockCommand {
    /// Register a unit taken into stock
    Add {
        /// Peripheral type
        #[arg(short = 'k', long = "type", value_enum)]
        kind: KindArg,

        /// Serial number or asset tag
        #[arg(short, long)]
        serial: String,

        /// Intake date (defaults to today)
        #[arg(short, long)]
        date: Option<String>,

        /// Incident-ticket number (OCOMON)
        #[arg(short, long)]
        ticket: String,

        /// Technician (defaults to the preferred technician)
        #[arg(long)]
        technician: Option<String>,
    },

    /// List stock grouped by type
    List {
        /// Case-insensitive serial substring
        #[arg(short, long)]
        search: Option<String>,

        /// Only this type
        #[arg(short = 'k', long = "type", value_enum)]
        kind: Option<KindArg>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Dispose command arguments.
#[derive(Debug, Args)]
pub struct DisposeCommand {
    /// Peripheral type
    #[arg(short = 'k', long = "type", value_enum)]
    pub kind: KindArg,

    /// Serial number or asset tag; repeat to dispose of several units at once
    #[arg(short, long = "serial", required = true)]
    pub serials: Vec<String>,

    /// Disposal date (defaults to today)
    #[arg(short, long)]
    pub date: Option<String>,

    /// Incident-ticket number (OCOMON)
    #[arg(short, long)]
    pub ticket: String,

    /// Disposal reason (e.g. "Obsolescência", "Dano Físico")
    #[arg(short, long, default_value = "Defeito Irreparável")]
    pub reason: DisposalReason,

    /// Free-text note
    #[arg(short, long, default_value = "")]
    pub note: String,

    /// Technician (defaults to the preferred technician)
    #[arg(long)]
    pub technician: Option<String>,
}

/// Lookup command arguments.
#[derive(Debug, Args)]
pub struct LookupCommand {
    /// Site code (UNCP); leading zeros are ignored
    pub site: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Collection to list
    #[arg(value_enum)]
    pub collection: CollectionArg,

    /// Maximum number of records (defaults to the preferred page size)
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Sort field: data, tipo or uncp (defaults to the preferred order)
    #[arg(short, long)]
    pub sort: Option<SortField>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Remove command arguments.
#[derive(Debug, Args)]
pub struct RemoveCommand {
    /// Collection holding the record
    #[arg(value_enum)]
    pub collection: CollectionArg,

    /// Record id, as shown by `list`
    pub id: Uuid,
}

/// Dashboard command arguments.
#[derive(Debug, Args)]
pub struct DashboardCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Report filter arguments.
#[derive(Debug, Clone, Default, Args)]
pub struct ReportFilterArgs {
    /// Period: mes, trimestre, ano or todos
    #[arg(short, long, default_value = "todos")]
    pub period: Period,

    /// Only this type
    #[arg(short = 'k', long = "type", value_enum)]
    pub kind: Option<KindArg>,

    /// Only this site code
    #[arg(short = 'u', long)]
    pub site: Option<String>,
}

impl From<ReportFilterArgs> for ReportFilter {
    fn from(args: ReportFilterArgs) -> Self {
        Self {
            period: args.period,
            kind: args.kind.map(PeripheralKind::from),
            site: args.site,
        }
    }
}

/// Report command arguments.
#[derive(Debug, Args)]
pub struct ReportCommand {
    /// Report action
    #[command(subcommand)]
    pub action: Option<ReportAction>,

    /// Filters
    #[command(flatten)]
    pub filter: ReportFilterArgs,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Report actions.
#[derive(Debug, Subcommand)]
pub enum ReportAction {
    /// Write the full report as one CSV file per sheet
    Export {
        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        out: PathBuf,

        /// Filters
        #[command(flatten)]
        filter: ReportFilterArgs,
    },
}

/// Import command arguments.
#[derive(Debug, Args)]
pub struct ImportCommand {
    /// Target collection
    #[arg(value_enum)]
    pub collection: CollectionArg,

    /// CSV file to import
    pub file: PathBuf,

    /// Skip rows identical to an existing record
    #[arg(long)]
    pub skip_duplicates: bool,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Export command arguments.
#[derive(Debug, Args)]
pub struct ExportCommand {
    /// Collection to export
    #[arg(value_enum)]
    pub collection: CollectionArg,

    /// Destination CSV file
    pub file: PathBuf,
}

/// Certificate command arguments.
#[derive(Debug, Args)]
pub struct CertificateCommand {
    /// Destination text file
    #[arg(short, long, value_name = "FILE")]
    pub out: PathBuf,

    /// Disposal ids to include; all disposals when omitted
    #[arg(long = "id")]
    pub ids: Vec<Uuid>,

    /// Responsible technician (defaults to the preferred technician)
    #[arg(long)]
    pub technician: Option<String>,
}

/// Preference commands.
#[derive(Debug, Subcommand)]
pub enum PrefsCommand {
    /// Show stored preferences
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Change preferences; unspecified fields keep their value
    Set {
        /// Default technician
        #[arg(long)]
        technician: Option<String>,

        /// Notification e-mail
        #[arg(long)]
        email: Option<String>,

        /// Show dashboard alerts
        #[arg(long)]
        show_alerts: Option<bool>,

        /// Records per listing: 5, 10, 20 or 50
        #[arg(long)]
        items_per_page: Option<usize>,

        /// Listing order: data, tipo or uncp
        #[arg(long)]
        sort: Option<SortField>,
    },

    /// Restore default preferences
    Reset,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Peripheral type argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    /// Cameras
    Camera,
    /// Smart-card readers
    CardReader,
    /// e-CPF readers
    Ecpf,
    /// Biometric devices
    Biometric,
}

impl From<KindArg> for PeripheralKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Camera => Self::Camera,
            KindArg::CardReader => Self::CardReader,
            KindArg::Ecpf => Self::Ecpf,
            KindArg::Biometric => Self::Biometric,
        }
    }
}

/// Collection argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CollectionArg {
    /// Installed cameras
    Camera,
    /// Installed card readers
    CardReader,
    /// Installed e-CPF readers
    Ecpf,
    /// Installed biometric devices
    Biometric,
    /// Stock intake
    Stock,
    /// Disposals
    Disposal,
}

impl From<CollectionArg> for Collection {
    fn from(arg: CollectionArg) -> Self {
        match arg {
            CollectionArg::Camera => Self::Camera,
            CollectionArg::CardReader => Self::CardReader,
            CollectionArg::Ecpf => Self::Ecpf,
            CollectionArg::Biometric => Self::Biometric,
            CollectionArg::Stock => Self::Stock,
            CollectionArg::Disposal => Self::Disposal,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_arg_conversion() {
        assert_eq!(PeripheralKind::from(KindArg::Camera), PeripheralKind::Camera);
        assert_eq!(
            PeripheralKind::from(KindArg::CardReader),
            PeripheralKind::CardReader
        );
        assert_eq!(PeripheralKind::from(KindArg::Ecpf), PeripheralKind::Ecpf);
        assert_eq!(
            PeripheralKind::from(KindArg::Biometric),
            PeripheralKind::Biometric
        );
    }

    #[test]
    fn test_collection_arg_matches_slug() {
        for arg in CollectionArg::value_variants() {
            let name = arg.to_possible_value().unwrap().get_name().to_string();
            assert_eq!(Collection::from(*arg).slug(), name);
        }
    }

    #[test]
    fn test_report_filter_conversion() {
        let args = ReportFilterArgs {
            period: Period::Quarter,
            kind: Some(KindArg::Ecpf),
            site: Some("58".to_string()),
        };
        let filter = ReportFilter::from(args);
        assert_eq!(filter.period, Period::Quarter);
        assert_eq!(filter.kind, Some(PeripheralKind::Ecpf));
        assert_eq!(filter.site.as_deref(), Some("58"));
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Plain);
    }
}
