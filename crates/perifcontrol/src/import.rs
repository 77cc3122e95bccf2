//! Spreadsheet (CSV) import.
//!
//! Header names are matched case- and accent-insensitively against a small
//! alias table, so files exported by this tool and hand-made spreadsheets
//! both load. Missing columns and empty cells fall back to placeholders.
//! A type or reason cell that is present but not a known value rejects the
//! row; rejected rows are counted and reported, never fatal.
//!
//! An `id` column, as written by export, is kept so that an export imported
//! elsewhere still refers to the same records. Rows without one get a fresh
//! id; a row whose id is already stored or repeated in the file is rejected.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::record::{
    fold, Collection, DisposalReason, DisposalRecord, InstalledRecord, PeripheralKind, Record,
    ReplacementReason, SiteCode, StockRecord,
};
use crate::repository::Repository;
use crate::storage::KeyValueStore;

/// Accepted header spellings per stored field, already folded.
const HEADER_ALIASES: &[(&str, &[&str])] = &[
    ("id", &["id"]),
    ("sn", &["sn", "sn/patrimonio", "serial", "patrimonio", "numero de serie"]),
    ("tipo", &["tipo", "type"]),
    ("data", &["data", "date", "data de instalacao"]),
    ("ocomon", &["ocomon", "ticket", "chamado"]),
    ("motivo", &["motivo", "reason"]),
    ("observacao", &["observacao", "observacoes", "note", "notes"]),
    ("tecnico", &["tecnico", "technician"]),
    ("uncp", &["uncp", "site"]),
];

/// Options for one import run.
#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    /// Skip rows identical to a stored or earlier imported record.
    pub skip_duplicates: bool,
    /// Field delimiter.
    pub delimiter: u8,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            skip_duplicates: false,
            delimiter: b',',
        }
    }
}

/// A row that was not imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRow {
    /// Line number in the source file.
    pub line: u64,
    /// Why the row was rejected.
    pub reason: String,
}

/// Outcome of an import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Rows stored.
    pub imported: usize,
    /// Rows skipped as duplicates.
    pub duplicates: usize,
    /// Rows rejected, with reasons.
    pub rejected: Vec<RejectedRow>,
}

/// Column positions resolved from a header row.
#[derive(Debug, Default)]
struct Columns {
    positions: HashMap<&'static str, usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Self {
        let mut positions = HashMap::new();
        for (index, header) in headers.iter().enumerate() {
            let folded = fold(header);
            let field = HEADER_ALIASES
                .iter()
                .find(|(_, aliases)| aliases.contains(&folded.as_str()))
                .map(|(field, _)| *field);
            match field {
                Some(field) => {
                    positions.entry(field).or_insert(index);
                }
                None => debug!(header, "Ignoring unrecognized column"),
            }
        }
        Self { positions }
    }

    fn view<'r>(&'r self, row: &'r csv::StringRecord) -> RowView<'r> {
        RowView { columns: self, row }
    }
}

/// One data row addressed by stored field name.
#[derive(Debug)]
pub struct RowView<'r> {
    columns: &'r Columns,
    row: &'r csv::StringRecord,
}

impl RowView<'_> {
    /// Trimmed cell for `field`, empty when the column or cell is missing.
    #[must_use]
    pub fn get(&self, field: &str) -> &str {
        self.columns
            .positions
            .get(field)
            .and_then(|&index| self.row.get(index))
            .map_or("", str::trim)
    }

    fn owned(&self, field: &str) -> String {
        self.get(field).to_string()
    }

    fn id(&self) -> Result<Uuid> {
        match self.get("id") {
            "" => Ok(Uuid::new_v4()),
            raw => Uuid::parse_str(raw)
                .map_err(|_| Error::validation("id", format!("'{raw}' is not a valid id"))),
        }
    }

    fn kind_or(&self, default: PeripheralKind) -> Result<PeripheralKind> {
        match self.get("tipo") {
            "" => Ok(default),
            raw => raw.parse(),
        }
    }
}

/// Build a record from an imported row.
pub trait FromRow: Record {
    /// Build a record for `collection`, keeping the row's id when it has one.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed id or a present but unknown type or
    /// reason.
    fn from_row(row: &RowView<'_>, collection: Collection) -> Result<Self>;
}

fn default_kind(collection: Collection) -> PeripheralKind {
    collection.installed_kind().unwrap_or(PeripheralKind::Camera)
}

impl FromRow for InstalledRecord {
    fn from_row(row: &RowView<'_>, collection: Collection) -> Result<Self> {
        let reason = match row.get("motivo") {
            "" => ReplacementReason::default(),
            raw => raw.parse()?,
        };
        Ok(Self {
            id: row.id()?,
            serial: row.owned("sn"),
            kind: row.kind_or(default_kind(collection))?,
            date: row.owned("data"),
            ticket: row.owned("ocomon"),
            reason,
            note: row.owned("observacao"),
            technician: row.owned("tecnico"),
            site: SiteCode::new(row.get("uncp")),
        })
    }
}

impl FromRow for StockRecord {
    fn from_row(row: &RowView<'_>, collection: Collection) -> Result<Self> {
        Ok(Self {
            id: row.id()?,
            serial: row.owned("sn"),
            kind: row.kind_or(default_kind(collection))?,
            date: row.owned("data"),
            ticket: row.owned("ocomon"),
            technician: row.owned("tecnico"),
        })
    }
}

impl FromRow for DisposalRecord {
    fn from_row(row: &RowView<'_>, collection: Collection) -> Result<Self> {
        let reason = match row.get("motivo") {
            "" => DisposalReason::default(),
            raw => raw.parse()?,
        };
        Ok(Self {
            id: row.id()?,
            serial: row.owned("sn"),
            kind: row.kind_or(default_kind(collection))?,
            date: row.owned("data"),
            ticket: row.owned("ocomon"),
            reason,
            note: row.owned("observacao"),
            technician: row.owned("tecnico"),
        })
    }
}

/// Parse rows into records, skipping rejected rows and duplicates.
fn parse_rows<T: FromRow, R: Read>(
    source: R,
    collection: Collection,
    existing: &[T],
    options: ImportOptions,
) -> Result<(Vec<T>, ImportReport)> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .flexible(true)
        .from_reader(source);
    let columns = Columns::from_headers(reader.headers()?);

    let mut ids: HashSet<Uuid> = existing.iter().map(Record::id).collect();
    let mut seen: HashSet<String> = if options.skip_duplicates {
        existing.iter().map(Record::fingerprint).collect()
    } else {
        HashSet::new()
    };

    let mut report = ImportReport::default();
    let mut records = Vec::new();
    for result in reader.records() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                let line = e.position().map_or(0, csv::Position::line);
                warn!(line, error = %e, "Rejecting unreadable row");
                report.rejected.push(RejectedRow {
                    line,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        let line = row.position().map_or(0, csv::Position::line);

        let record = match T::from_row(&columns.view(&row), collection) {
            Ok(record) => record,
            Err(e) => {
                warn!(line, error = %e, "Rejecting row");
                report.rejected.push(RejectedRow {
                    line,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let fingerprint = record.fingerprint();
        if options.skip_duplicates && seen.contains(&fingerprint) {
            debug!(line, serial = record.serial(), "Skipping duplicate row");
            report.duplicates += 1;
            continue;
        }
        if !ids.insert(record.id()) {
            warn!(line, id = %record.id(), "Rejecting row with a taken id");
            report.rejected.push(RejectedRow {
                line,
                reason: format!("id {} is already in use", record.id()),
            });
            continue;
        }
        if options.skip_duplicates {
            seen.insert(fingerprint);
        }
        records.push(record);
    }

    report.imported = records.len();
    Ok((records, report))
}

/// Import CSV data from `source` into `collection`.
///
/// All accepted rows are written in one store write.
///
/// # Errors
///
/// Returns an error if the header cannot be read or the store write fails.
pub fn import_reader<S: KeyValueStore, R: Read>(
    repo: &Repository<S>,
    collection: Collection,
    source: R,
    options: ImportOptions,
) -> Result<ImportReport> {
    let report = match collection {
        Collection::Stock => {
            let (records, report) = parse_rows(source, collection, &repo.stock()?, options)?;
            repo.append_stock(&records)?;
            report
        }
        Collection::Disposal => {
            let (records, report) =
                parse_rows(source, collection, &repo.disposals()?, options)?;
            repo.append_disposals(&records)?;
            report
        }
        installed => {
            let kind = default_kind(installed);
            let (records, report) =
                parse_rows(source, collection, &repo.installed(kind)?, options)?;
            repo.append_installed(kind, &records)?;
            report
        }
    };

    info!(
        %collection,
        imported = report.imported,
        duplicates = report.duplicates,
        rejected = report.rejected.len(),
        "Import finished"
    );
    Ok(report)
}

/// Import a CSV file into `collection`.
///
/// # Errors
///
/// Returns an error if the file cannot be opened, the header cannot be read,
/// or the store write fails.
pub fn import_file<S: KeyValueStore>(
    repo: &Repository<S>,
    collection: Collection,
    path: &Path,
    options: ImportOptions,
) -> Result<ImportReport> {
    let file = File::open(path)?;
    info!(path = %path.display(), %collection, "Importing");
    import_reader(repo, collection, file, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn repo() -> Repository<MemoryStore> {
        Repository::new(MemoryStore::new())
    }

    fn import(repo: &Repository<MemoryStore>, collection: Collection, csv: &str) -> ImportReport {
        import_reader(repo, collection, csv.as_bytes(), ImportOptions::default()).unwrap()
    }

    #[test]
    fn test_import_with_aliased_headers() {
        let repo = repo();
        let csv = "SN/Patrimônio,Tipo,Data,OCOMON,Motivo,Observação,Técnico,UNCP\n\
                   CAM-1,Câmera,2024-01-10,123,Defeito,troca,Ana,0058\n";
        let report = import(&repo, Collection::Camera, csv);
        assert_eq!(report.imported, 1);
        assert!(report.rejected.is_empty());

        let cameras = repo.installed(PeripheralKind::Camera).unwrap();
        assert_eq!(cameras[0].serial, "CAM-1");
        assert_eq!(cameras[0].reason, ReplacementReason::Defect);
        assert_eq!(cameras[0].note, "troca");
        assert_eq!(cameras[0].site.as_str(), "0058");
    }

    #[test]
    fn test_missing_columns_get_placeholders() {
        let repo = repo();
        let report = import(&repo, Collection::Ecpf, "serial\nE-1\n");
        assert_eq!(report.imported, 1);

        let records = repo.installed(PeripheralKind::Ecpf).unwrap();
        assert_eq!(records[0].kind, PeripheralKind::Ecpf);
        assert_eq!(records[0].reason, ReplacementReason::NewInstallation);
        assert!(records[0].site.is_empty());
        assert!(records[0].date.is_empty());
    }

    #[test]
    fn test_stock_defaults_to_camera() {
        let repo = repo();
        import(&repo, Collection::Stock, "sn,data\nS-1,2024-02-02\n");
        assert_eq!(repo.stock().unwrap()[0].kind, PeripheralKind::Camera);
    }

    #[test]
    fn test_unknown_enumeration_rejects_row() {
        let repo = repo();
        let csv = "sn,tipo,motivo\n\
                   D-1,Biometria,Obsolescência\n\
                   D-2,Scanner,Outro\n\
                   D-3,Câmera,Quebrou\n";
        let report = import(&repo, Collection::Disposal, csv);
        assert_eq!(report.imported, 1);
        assert_eq!(report.rejected.len(), 2);
        assert_eq!(report.rejected[0].line, 3);
        assert!(report.rejected[0].reason.contains("Scanner"));
        assert_eq!(report.rejected[1].line, 4);

        let disposals = repo.disposals().unwrap();
        assert_eq!(disposals.len(), 1);
        assert_eq!(disposals[0].kind, PeripheralKind::Biometric);
    }

    #[test]
    fn test_skip_duplicates() {
        let repo = repo();
        let csv = "sn,tipo,data,uncp\nC-1,Câmera,2024-01-01,0058\n";
        import(&repo, Collection::Camera, csv);

        let options = ImportOptions {
            skip_duplicates: true,
            ..ImportOptions::default()
        };
        let again = format!("{csv}C-1,Câmera,2024-01-01,0058\nC-2,Câmera,2024-01-01,0058\n");
        let report = import_reader(&repo, Collection::Camera, again.as_bytes(), options).unwrap();
        assert_eq!(report.imported, 1);
        assert_eq!(report.duplicates, 2);
        assert_eq!(repo.installed(PeripheralKind::Camera).unwrap().len(), 2);
    }

    #[test]
    fn test_duplicates_admitted_by_default() {
        let repo = repo();
        let csv = "sn\nX\nX\n";
        let report = import(&repo, Collection::Stock, csv);
        assert_eq!(report.imported, 2);
        assert_eq!(report.duplicates, 0);
    }

    #[test]
    fn test_id_column_is_kept() {
        let repo = repo();
        let csv = "id,sn,tipo\n\
                   6f1c2a4e-0d7e-4a3a-9a43-3f3d5c1f7a10,S-1,Biometria\n\
                   ,S-2,Biometria\n";
        let report = import(&repo, Collection::Stock, csv);
        assert_eq!(report.imported, 2);

        let stock = repo.stock().unwrap();
        assert_eq!(stock[0].id.to_string(), "6f1c2a4e-0d7e-4a3a-9a43-3f3d5c1f7a10");
        assert_ne!(stock[1].id, stock[0].id);
        repo.remove(Collection::Stock, stock[0].id).unwrap();
    }

    #[test]
    fn test_taken_or_malformed_ids_reject_rows() {
        let repo = repo();
        let csv = "id,sn\n\
                   6f1c2a4e-0d7e-4a3a-9a43-3f3d5c1f7a10,S-1\n\
                   6f1c2a4e-0d7e-4a3a-9a43-3f3d5c1f7a10,S-2\n\
                   not-a-uuid,S-3\n";
        let report = import(&repo, Collection::Stock, csv);
        assert_eq!(report.imported, 1);
        assert_eq!(report.rejected.len(), 2);
        assert_eq!(report.rejected[0].line, 3);
        assert!(report.rejected[0].reason.contains("already in use"));
        assert!(report.rejected[1].reason.contains("not-a-uuid"));

        // The same file again: every stored id is taken.
        let csv = "id,sn\n6f1c2a4e-0d7e-4a3a-9a43-3f3d5c1f7a10,S-1\n";
        let again = import(&repo, Collection::Stock, csv);
        assert_eq!(again.imported, 0);
        assert_eq!(again.rejected.len(), 1);
        assert_eq!(repo.stock().unwrap().len(), 1);
    }

    #[test]
    fn test_skip_duplicates_counts_reimported_rows_as_duplicates() {
        let repo = repo();
        let csv = "id,sn,data\n6f1c2a4e-0d7e-4a3a-9a43-3f3d5c1f7a10,S-1,2024-01-01\n";
        import(&repo, Collection::Stock, csv);

        let options = ImportOptions {
            skip_duplicates: true,
            ..ImportOptions::default()
        };
        let report = import_reader(&repo, Collection::Stock, csv.as_bytes(), options).unwrap();
        assert_eq!(report.duplicates, 1);
        assert!(report.rejected.is_empty());
    }

    #[test]
    fn test_semicolon_delimiter() {
        let repo = repo();
        let options = ImportOptions {
            delimiter: b';',
            ..ImportOptions::default()
        };
        let report = import_reader(
            &repo,
            Collection::Biometric,
            "sn;uncp\nB-1;12\n".as_bytes(),
            options,
        )
        .unwrap();
        assert_eq!(report.imported, 1);
        assert_eq!(repo.installed(PeripheralKind::Biometric).unwrap()[0].site.as_str(), "12");
    }

    #[test]
    fn test_import_missing_file() {
        let repo = repo();
        let err = import_file(
            &repo,
            Collection::Camera,
            Path::new("/nonexistent/perifcontrol.csv"),
            ImportOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
