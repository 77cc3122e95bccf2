//! Spreadsheet (CSV) export of collections and reports.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{Error, Result};
use crate::record::{Collection, Record};
use crate::report::Report;
use crate::repository::Repository;
use crate::storage::KeyValueStore;

/// File names of the report sheets, in writing order.
pub const REPORT_SHEETS: [&str; 5] = [
    "resumo-geral.csv",
    "distribuicao-por-tipo.csv",
    "instalacoes-por-mes.csv",
    "tecnicos-mais-ativos.csv",
    "todos-os-perifericos.csv",
];

fn writer<W: Write>(sink: W, delimiter: u8) -> csv::Writer<W> {
    csv::WriterBuilder::new().delimiter(delimiter).from_writer(sink)
}

/// Write records as CSV: an `id` column, then the record's columns.
///
/// The headers are the stored field names, which the importer accepts.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_records<T: Record, W: Write>(sink: W, records: &[T], delimiter: u8) -> Result<()> {
    let mut out = writer(sink, delimiter);
    out.write_record(std::iter::once("id").chain(T::COLUMNS.iter().copied()))?;
    for record in records {
        let id = record.id().to_string();
        out.write_record(std::iter::once(id).chain(record.column_values()))?;
    }
    out.flush()?;
    Ok(())
}

/// Export one collection to `path`, returning the number of records written.
///
/// # Errors
///
/// Returns an error if the store cannot be read or the file cannot be written.
pub fn export_collection<S: KeyValueStore>(
    repo: &Repository<S>,
    collection: Collection,
    path: &Path,
    delimiter: u8,
) -> Result<usize> {
    let file = File::create(path)?;
    let count = match collection {
        Collection::Stock => {
            let records = repo.stock()?;
            write_records(file, &records, delimiter)?;
            records.len()
        }
        Collection::Disposal => {
            let records = repo.disposals()?;
            write_records(file, &records, delimiter)?;
            records.len()
        }
        installed => {
            let kind = installed
                .installed_kind()
                .ok_or_else(|| Error::internal(format!("{installed} has no peripheral type")))?;
            let records = repo.installed(kind)?;
            write_records(file, &records, delimiter)?;
            records.len()
        }
    };
    info!(%collection, count, path = %path.display(), "Exported collection");
    Ok(count)
}

fn write_summary<W: Write>(sink: W, report: &Report, delimiter: u8) -> Result<()> {
    let mut out = writer(sink, delimiter);
    out.write_record([
        "Total de Periféricos",
        "Instalações no Mês Atual",
        "Total de UNCPs Atendidas",
        "Total de Técnicos Ativos",
    ])?;
    out.write_record([
        report.summary.total.to_string(),
        report.summary.this_month.to_string(),
        report.summary.distinct_sites.to_string(),
        report.summary.distinct_technicians.to_string(),
    ])?;
    out.flush()?;
    Ok(())
}

fn write_distribution<W: Write>(sink: W, report: &Report, delimiter: u8) -> Result<()> {
    let mut out = writer(sink, delimiter);
    out.write_record(["Tipo", "Quantidade"])?;
    for entry in &report.by_kind {
        out.write_record([entry.kind.plural_label().to_string(), entry.count.to_string()])?;
    }
    out.flush()?;
    Ok(())
}

fn write_monthly<W: Write>(sink: W, report: &Report, delimiter: u8) -> Result<()> {
    let mut out = writer(sink, delimiter);
    out.write_record(["Mês", "Total de Instalações"])?;
    for month in &report.per_month {
        out.write_record([month.label.clone(), month.count.to_string()])?;
    }
    out.flush()?;
    Ok(())
}

fn write_technicians<W: Write>(sink: W, report: &Report, delimiter: u8) -> Result<()> {
    let mut out = writer(sink, delimiter);
    out.write_record(["Técnico", "Total de Instalações"])?;
    for tech in &report.top_technicians {
        out.write_record([tech.name.clone(), tech.count.to_string()])?;
    }
    out.flush()?;
    Ok(())
}

fn write_all_records<W: Write>(sink: W, report: &Report, delimiter: u8) -> Result<()> {
    let mut out = writer(sink, delimiter);
    out.write_record(["SN", "Tipo", "Data de Instalação", "Técnico", "UNCP"])?;
    for record in &report.records {
        let date = record
            .parsed_date()
            .map_or_else(|| record.date.clone(), |d| d.format("%d/%m/%Y").to_string());
        let site = if record.site.is_empty() {
            "N/A"
        } else {
            record.site.as_str()
        };
        out.write_record([
            record.serial.as_str(),
            record.kind.label(),
            date.as_str(),
            record.technician.as_str(),
            site,
        ])?;
    }
    out.flush()?;
    Ok(())
}

/// Write the report as one CSV file per sheet under `dir`.
///
/// Returns the written paths in [`REPORT_SHEETS`] order.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or a file cannot be written.
pub fn export_report(report: &Report, dir: &Path, delimiter: u8) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(|source| Error::DirectoryCreate {
        path: dir.to_path_buf(),
        source,
    })?;

    let writers: [fn(File, &Report, u8) -> Result<()>; 5] = [
        write_summary,
        write_distribution,
        write_monthly,
        write_technicians,
        write_all_records,
    ];

    let mut paths = Vec::with_capacity(REPORT_SHEETS.len());
    for (name, write) in REPORT_SHEETS.iter().zip(writers) {
        let path = dir.join(name);
        write(File::create(&path)?, report, delimiter)?;
        paths.push(path);
    }
    info!(dir = %dir.display(), sheets = paths.len(), "Exported report");
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{import_reader, ImportOptions};
    use crate::record::{NewInstallation, PeripheralKind};
    use crate::report::ReportFilter;
    use crate::storage::MemoryStore;
    use chrono::NaiveDate;

    fn seeded() -> Repository<MemoryStore> {
        let repo = Repository::new(MemoryStore::new());
        for (serial, site) in [("CAM-1", "58"), ("CAM-2", "100")] {
            repo.add_installation(
                PeripheralKind::Camera,
                NewInstallation {
                    serial: serial.to_string(),
                    site: site.to_string(),
                    date: "2024-06-01".to_string(),
                    ticket: "OC-1".to_string(),
                    note: "linha, com vírgula".to_string(),
                    technician: "Ana".to_string(),
                    ..NewInstallation::default()
                },
            )
            .unwrap();
        }
        repo
    }

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("perifcontrol-{name}-{}", std::process::id()))
    }

    #[test]
    fn test_write_records_header() {
        let repo = seeded();
        let mut buf = Vec::new();
        write_records(&mut buf, &repo.installed(PeripheralKind::Camera).unwrap(), b',').unwrap();
        let text = String::from_utf8(buf).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(header, "id,sn,tipo,data,ocomon,motivo,observacao,tecnico,uncp");
        assert!(text.contains("\"linha, com vírgula\""));
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_exported_file_imports_back() {
        let repo = seeded();
        let mut buf = Vec::new();
        write_records(&mut buf, &repo.installed(PeripheralKind::Camera).unwrap(), b';').unwrap();

        let target = Repository::new(MemoryStore::new());
        let options = ImportOptions {
            delimiter: b';',
            ..ImportOptions::default()
        };
        let report = import_reader(&target, Collection::Camera, buf.as_slice(), options).unwrap();
        assert_eq!(report.imported, 2);
        assert!(report.rejected.is_empty());

        let original = repo.installed(PeripheralKind::Camera).unwrap();
        let imported = target.installed(PeripheralKind::Camera).unwrap();
        assert_eq!(original[0].fingerprint(), imported[0].fingerprint());
        assert_eq!(original[0].id, imported[0].id);

        // Importing the same export again finds every id taken.
        let again = import_reader(&target, Collection::Camera, buf.as_slice(), options).unwrap();
        assert_eq!(again.imported, 0);
        assert_eq!(again.rejected.len(), 2);
    }

    #[test]
    fn test_export_collection_to_file() {
        let repo = seeded();
        let dir = temp_dir("export");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("stock.csv");

        assert_eq!(export_collection(&repo, Collection::Stock, &path, b',').unwrap(), 0);
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.trim(), "id,sn,tipo,data,ocomon,tecnico");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_export_report_sheets() {
        let mut inventory = seeded().snapshot().unwrap();
        inventory.cameras[1].site = crate::record::SiteCode::new("");
        let today = NaiveDate::from_ymd_opt(2024, 6, 20).unwrap();
        let report = Report::generate(&inventory, ReportFilter::default(), today);

        let dir = temp_dir("report");
        let paths = export_report(&report, &dir, b',').unwrap();
        assert_eq!(paths.len(), 5);
        for (path, name) in paths.iter().zip(REPORT_SHEETS) {
            assert!(path.ends_with(name));
            assert!(path.exists());
        }

        let all = fs::read_to_string(dir.join("todos-os-perifericos.csv")).unwrap();
        assert!(all.contains("CAM-1,Câmera,01/06/2024,Ana,0058"));
        assert!(all.contains("CAM-2,Câmera,01/06/2024,Ana,N/A"));

        let summary = fs::read_to_string(dir.join("resumo-geral.csv")).unwrap();
        assert!(summary.lines().nth(1).unwrap().starts_with("2,2,1,1"));

        fs::remove_dir_all(&dir).ok();
    }
}
