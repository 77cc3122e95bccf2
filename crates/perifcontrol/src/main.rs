//! `perifctl` - CLI for perifcontrol
//!
//! This binary provides the command-line interface for registering
//! peripherals and querying the inventory.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;

use perifcontrol::certificate::{Certificate, Layout};
use perifcontrol::cli::{
    CertificateCommand, Cli, Command, ConfigCommand, DisposeCommand, ImportCommand,
    InstallCommand, ListCommand, LookupCommand, OutputFormat, PrefsCommand, ReportAction,
    ReportCommand, StockCommand,
};
use perifcontrol::dashboard::Dashboard;
use perifcontrol::export::{export_collection, export_report};
use perifcontrol::import::{import_file, ImportOptions};
use perifcontrol::inventory::sort_records;
use perifcontrol::lookup::{lookup_site, SiteQuery};
use perifcontrol::record::{
    Collection, NewDisposal, NewInstallation, NewStock, PeripheralKind, Record,
};
use perifcontrol::report::Report;
use perifcontrol::{init_logging, Config, Error, Repository, SqliteStore};

type Repo = Repository<SqliteStore>;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    run(&config, cli.command)
}

fn run(config: &Config, command: Command) -> Result<()> {
    let today = Local::now().date_naive();
    let repo = || open_repository(config);

    match command {
        Command::Install(cmd) => handle_install(&repo()?, cmd, today),
        Command::Stock(cmd) => handle_stock(&repo()?, cmd, today),
        Command::Dispose(cmd) => handle_dispose(&repo()?, cmd, today),
        Command::Lookup(cmd) => handle_lookup(&repo()?, &cmd),
        Command::List(cmd) => handle_list(&repo()?, &cmd),
        Command::Remove(cmd) => {
            let collection = Collection::from(cmd.collection);
            repo()?.remove(collection, cmd.id)?;
            println!("Removed {} from {collection}.", cmd.id);
            Ok(())
        }
        Command::Dashboard(cmd) => handle_dashboard(&repo()?, cmd.json, today),
        Command::Report(cmd) => handle_report(&repo()?, config, cmd, today),
        Command::Import(cmd) => handle_import(&repo()?, config, &cmd),
        Command::Export(cmd) => {
            let collection = Collection::from(cmd.collection);
            let count = export_collection(&repo()?, collection, &cmd.file, config.export_delimiter())
                .with_context(|| format!("exporting to {}", cmd.file.display()))?;
            println!("Exported {count} records to {}.", cmd.file.display());
            Ok(())
        }
        Command::Certificate(cmd) => handle_certificate(&repo()?, cmd, today),
        Command::Prefs(cmd) => handle_prefs(&repo()?, cmd),
        Command::Status(cmd) => handle_status(&repo()?, cmd.json),
        // Configuration commands never open the database.
        Command::Config(cmd) => handle_config(config, cmd),
    }
}

fn open_repository(config: &Config) -> Result<Repo> {
    let path = config.database_path();
    let store = SqliteStore::open(&path, config.storage.quota_bytes)
        .with_context(|| format!("opening {}", path.display()))?;
    Ok(Repository::new(store))
}

fn date_or_today(date: Option<String>, today: NaiveDate) -> String {
    date.unwrap_or_else(|| today.format("%Y-%m-%d").to_string())
}

fn handle_install(repo: &Repo, cmd: InstallCommand, today: NaiveDate) -> Result<()> {
    let prefs = repo.preferences()?;
    let kind = PeripheralKind::from(cmd.kind);
    let record = repo.add_installation(
        kind,
        NewInstallation {
            serial: cmd.serial,
            site: cmd.site,
            date: date_or_today(cmd.date, today),
            ticket: cmd.ticket,
            reason: cmd.reason,
            note: cmd.note,
            technician: prefs.technician_or_default(cmd.technician.as_deref()),
        },
    )?;
    println!(
        "Registered {kind} {} at UNCP {} ({}).",
        record.serial, record.site, record.id
    );
    Ok(())
}

fn handle_stock(repo: &Repo, cmd: StockCommand, today: NaiveDate) -> Result<()> {
    match cmd {
        StockCommand::Add {
            kind,
            serial,
            date,
            ticket,
            technician,
        } => {
            let prefs = repo.preferences()?;
            let kind = PeripheralKind::from(kind);
            let record = repo.add_stock(
                kind,
                NewStock {
                    serial,
                    date: date_or_today(date, today),
                    ticket,
                    technician: prefs.technician_or_default(technician.as_deref()),
                },
            )?;
            println!("Added {kind} {} to stock ({}).", record.serial, record.id);
        }
        StockCommand::List { search, kind, json } => {
            let inventory = repo.snapshot()?;
            let mut groups = inventory.stock_by_kind(search.as_deref());
            if let Some(kind) = kind.map(PeripheralKind::from) {
                groups.retain(|g| g.kind == kind);
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&groups)?);
                return Ok(());
            }
            for group in &groups {
                println!("{} ({})", group.kind.plural_label(), group.items.len());
                for item in &group.items {
                    println!("  {}  {:<20} {:<12} {}", item.id, item.serial, item.date, item.ticket);
                }
            }
        }
    }
    Ok(())
}

fn handle_dispose(repo: &Repo, cmd: DisposeCommand, today: NaiveDate) -> Result<()> {
    let prefs = repo.preferences()?;
    let kind = PeripheralKind::from(cmd.kind);
    let date = date_or_today(cmd.date, today);
    let technician = prefs.technician_or_default(cmd.technician.as_deref());

    let entries = cmd
        .serials
        .into_iter()
        .map(|serial| {
            (
                kind,
                NewDisposal {
                    serial,
                    date: date.clone(),
                    ticket: cmd.ticket.clone(),
                    reason: cmd.reason,
                    note: cmd.note.clone(),
                    technician: technician.clone(),
                },
            )
        })
        .collect();

    let records = repo.add_disposals(entries)?;
    for record in &records {
        println!("Disposed of {kind} {} ({}).", record.serial, record.id);
    }
    Ok(())
}

fn print_records<T: Record>(records: &[T], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(records)?),
        OutputFormat::Plain => {
            for r in records {
                let site = r.site().map(|s| format!("  UNCP {s}")).unwrap_or_default();
                println!("{}  {} - {}  {}{site}", r.id(), r.kind(), r.serial(), r.date());
            }
        }
        OutputFormat::Table => {
            println!(
                "{:<36}  {:<18}  {:<20}  {:<10}  {:<6}  TÉCNICO",
                "ID", "TIPO", "SN", "DATA", "UNCP"
            );
            for r in records {
                println!(
                    "{:<36}  {:<18}  {:<20}  {:<10}  {:<6}  {}",
                    r.id(),
                    r.kind().label(),
                    r.serial(),
                    r.date(),
                    r.site().map_or("-", |s| s.as_str()),
                    r.technician()
                );
            }
        }
    }
    Ok(())
}

fn handle_lookup(repo: &Repo, cmd: &LookupCommand) -> Result<()> {
    let query = SiteQuery::parse(&cmd.site)?;
    let result = lookup_site(&repo.snapshot()?, &query);

    if cmd.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }
    if result.is_empty() {
        println!("No peripherals found for UNCP {}.", query.as_str());
        return Ok(());
    }

    println!("UNCP {}: {} peripherals", query.as_str(), result.len());
    for kind in PeripheralKind::ALL {
        let matches: Vec<_> = result.by_kind(kind).cloned().collect();
        if matches.is_empty() {
            continue;
        }
        println!();
        println!("{} ({})", kind.plural_label(), matches.len());
        print_records(&matches, cmd.format)?;
    }
    Ok(())
}

fn list_sorted<T: Record>(mut records: Vec<T>, cmd: &ListCommand, repo: &Repo) -> Result<()> {
    let prefs = repo.preferences()?;
    sort_records(&mut records, cmd.sort.unwrap_or(prefs.display.sort));
    let total = records.len();
    records.truncate(cmd.limit.unwrap_or(prefs.display.items_per_page));
    print_records(&records, cmd.format)?;
    if cmd.format != OutputFormat::Json && records.len() < total {
        println!("({} of {total} shown)", records.len());
    }
    Ok(())
}

fn handle_list(repo: &Repo, cmd: &ListCommand) -> Result<()> {
    match Collection::from(cmd.collection) {
        Collection::Stock => list_sorted(repo.stock()?, cmd, repo),
        Collection::Disposal => list_sorted(repo.disposals()?, cmd, repo),
        installed => {
            let kind = installed
                .installed_kind()
                .ok_or_else(|| Error::internal(format!("{installed} has no peripheral type")))?;
            list_sorted(repo.installed(kind)?, cmd, repo)
        }
    }
}

fn handle_dashboard(repo: &Repo, json: bool, today: NaiveDate) -> Result<()> {
    let prefs = repo.preferences()?;
    let mut dashboard = Dashboard::compute(&repo.snapshot()?, today);
    if !prefs.display.show_alerts {
        dashboard.alerts.clear();
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&dashboard)?);
        return Ok(());
    }

    println!("Dashboard ({})", dashboard.today.format("%d/%m/%Y"));
    println!("==========");
    println!("Total installed:      {}", dashboard.total_installed);
    for entry in &dashboard.by_kind {
        println!("  {:<20} {}", entry.kind.plural_label(), entry.count);
    }
    println!("Installed this month: {}", dashboard.installed_this_month);
    println!("Sites (UNCP):         {}", dashboard.distinct_sites);
    println!("Technicians:          {}", dashboard.distinct_technicians);
    println!("In stock:             {}", dashboard.stock_count);
    println!("Disposed:             {}", dashboard.disposal_count);

    if !dashboard.alerts.is_empty() {
        println!();
        println!("Alerts");
        for alert in &dashboard.alerts {
            println!("  [{}] {}", alert.severity, alert.message);
        }
    }

    if !dashboard.top_technicians.is_empty() {
        println!();
        println!("Top technicians");
        for tech in &dashboard.top_technicians {
            println!("  {:<24} {}", tech.name, tech.count);
        }
    }

    if !dashboard.recent_activity.is_empty() {
        println!();
        println!("Recent activity");
        for event in &dashboard.recent_activity {
            let site = event
                .site
                .as_deref()
                .map(|s| format!("  UNCP {s}"))
                .unwrap_or_default();
            println!("  {:<10} {:<11} {}{site}", event.date, event.kind.to_string(), event.label);
        }
    }
    Ok(())
}

fn handle_report(repo: &Repo, config: &Config, cmd: ReportCommand, today: NaiveDate) -> Result<()> {
    let inventory = repo.snapshot()?;

    if let Some(ReportAction::Export { out, filter }) = cmd.action {
        let report = Report::generate(&inventory, filter.into(), today);
        let paths = export_report(&report, &out, config.export_delimiter())
            .with_context(|| format!("exporting report to {}", out.display()))?;
        for path in paths {
            println!("Wrote {}", path.display());
        }
        return Ok(());
    }

    let report = Report::generate(&inventory, cmd.filter.into(), today);
    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Report (period: {})", report.filter.period);
    println!("======");
    println!("Peripherals:          {}", report.summary.total);
    println!("Installed this month: {}", report.summary.this_month);
    println!("Sites (UNCP):         {}", report.summary.distinct_sites);
    println!("Technicians:          {}", report.summary.distinct_technicians);

    println!();
    println!("By type");
    for entry in &report.by_kind {
        println!("  {:<20} {}", entry.kind.plural_label(), entry.count);
    }

    println!();
    println!("Installations per month");
    for month in &report.per_month {
        println!("  {:<10} {:>4} {}", month.label, month.count, "#".repeat(month.count.min(50)));
    }

    if !report.top_technicians.is_empty() {
        println!();
        println!("Top technicians");
        for tech in &report.top_technicians {
            println!("  {:<24} {}", tech.name, tech.count);
        }
    }
    Ok(())
}

fn handle_import(repo: &Repo, config: &Config, cmd: &ImportCommand) -> Result<()> {
    let collection = Collection::from(cmd.collection);
    let options = ImportOptions {
        skip_duplicates: cmd.skip_duplicates || config.import.skip_duplicates,
        delimiter: config.import_delimiter(),
    };
    let report = import_file(repo, collection, &cmd.file, options)
        .with_context(|| format!("importing {}", cmd.file.display()))?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Imported:   {}", report.imported);
    println!("Duplicates: {}", report.duplicates);
    println!("Rejected:   {}", report.rejected.len());
    for row in &report.rejected {
        println!("  line {}: {}", row.line, row.reason);
    }
    Ok(())
}

fn handle_certificate(repo: &Repo, cmd: CertificateCommand, today: NaiveDate) -> Result<()> {
    let prefs = repo.preferences()?;
    let disposals = repo.disposals()?;

    let items = if cmd.ids.is_empty() {
        disposals
    } else {
        cmd.ids
            .iter()
            .map(|id| {
                disposals
                    .iter()
                    .find(|d| d.id == *id)
                    .cloned()
                    .ok_or_else(|| Error::RecordNotFound {
                        collection: Collection::Disposal.to_string(),
                        id: id.to_string(),
                    })
            })
            .collect::<perifcontrol::Result<Vec<_>>>()?
    };

    let technician = prefs.technician_or_default(cmd.technician.as_deref());
    let certificate = Certificate::new(items, &technician, today)?;
    let pages = certificate
        .write_to(&cmd.out, Layout::default())
        .with_context(|| format!("writing {}", cmd.out.display()))?;
    println!(
        "Wrote certificate for {} items ({pages} pages) to {}.",
        certificate.item_count(),
        cmd.out.display()
    );
    Ok(())
}

fn handle_prefs(repo: &Repo, cmd: PrefsCommand) -> Result<()> {
    match cmd {
        PrefsCommand::Show { json } => {
            let prefs = repo.preferences()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&prefs)?);
            } else {
                println!("Default technician: {}", prefs.default_technician);
                println!("E-mail:             {}", prefs.email);
                println!("Show alerts:        {}", prefs.display.show_alerts);
                println!("Items per page:     {}", prefs.display.items_per_page);
                println!("Sort by:            {}", prefs.display.sort);
            }
        }
        PrefsCommand::Set {
            technician,
            email,
            show_alerts,
            items_per_page,
            sort,
        } => {
            let mut prefs = repo.preferences()?;
            if let Some(technician) = technician {
                prefs.default_technician = technician.trim().to_string();
            }
            if let Some(email) = email {
                prefs.email = email.trim().to_string();
            }
            if let Some(show_alerts) = show_alerts {
                prefs.display.show_alerts = show_alerts;
            }
            if let Some(items_per_page) = items_per_page {
                prefs.display.items_per_page = items_per_page;
            }
            if let Some(sort) = sort {
                prefs.display.sort = sort;
            }
            repo.save_preferences(&prefs)?;
            println!("Preferences saved.");
        }
        PrefsCommand::Reset => {
            repo.reset_preferences()?;
            println!("Preferences reset to defaults.");
        }
    }
    Ok(())
}

fn handle_status(repo: &Repo, json: bool) -> Result<()> {
    let stats = repo.store().stats()?;
    let inventory = repo.snapshot()?;
    let collections = Collection::ALL
        .into_iter()
        .map(|c| -> perifcontrol::Result<_> {
            Ok((c, inventory.count(c), repo.store().updated_at(c.storage_key())?))
        })
        .collect::<perifcontrol::Result<Vec<_>>>()?;

    if json {
        let collections: serde_json::Map<String, serde_json::Value> = collections
            .iter()
            .map(|(c, count, updated_at)| {
                (
                    c.slug().to_string(),
                    serde_json::json!({ "count": count, "updated_at": updated_at }),
                )
            })
            .collect();
        let status = serde_json::json!({
            "database_path": repo.store().path(),
            "storage": stats,
            "collections": collections,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    let quota = if stats.quota_bytes == 0 {
        "unlimited".to_string()
    } else {
        format!("{} bytes", stats.quota_bytes)
    };
    println!("perifctl status");
    println!("---------------");
    println!("Database:      {}", repo.store().path().display());
    println!("Database size: {} bytes", stats.db_size_bytes);
    println!("Keys:          {}", stats.keys);
    println!("Stored:        {} bytes", stats.total_bytes);
    println!("Quota:         {quota}");
    println!();
    for (collection, count, updated_at) in &collections {
        let updated_at = updated_at.as_deref().unwrap_or("never written");
        println!("  {:<12} {count:>6}  {updated_at}", collection.slug());
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:    {}", config.database_path().display());
                println!("  Quota (bytes):    {}", config.storage.quota_bytes);
                println!();
                println!("[Import]");
                println!("  Skip duplicates:  {}", config.import.skip_duplicates);
                println!("  Delimiter:        {:?}", config.import.delimiter);
                println!();
                println!("[Export]");
                println!("  Delimiter:        {:?}", config.export.delimiter);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use perifcontrol::cli::StatusCommand;

    /// A config whose database path sits under a regular file, so opening it fails.
    fn unopenable_config(name: &str) -> (Config, std::path::PathBuf) {
        let blocker =
            std::env::temp_dir().join(format!("perifctl_{name}_{}", std::process::id()));
        std::fs::write(&blocker, b"not a directory").unwrap();
        let mut config = Config::default();
        config.storage.database_path = Some(blocker.join("data").join("perifcontrol.db"));
        (config, blocker)
    }

    #[test]
    fn test_config_commands_do_not_open_storage() {
        let (config, blocker) = unopenable_config("config_show");

        let result = run(&config, Command::Config(ConfigCommand::Show { json: true }));
        let _ = std::fs::remove_file(&blocker);

        assert!(result.is_ok());
    }

    #[test]
    fn test_storage_commands_open_storage() {
        let (config, blocker) = unopenable_config("status");

        let result = run(&config, Command::Status(StatusCommand { json: true }));
        let _ = std::fs::remove_file(&blocker);

        assert!(result.is_err());
    }
}
