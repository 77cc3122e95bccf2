//! Core record types for perifcontrol.
//!
//! This module defines the closed enumerations (peripheral type, replacement
//! and disposal reasons), the site code, and the three stored record shapes:
//! installed peripherals, stock intake and disposals.
//!
//! Field names on the wire follow the stored JSON layout (`sn`, `tipo`,
//! `data`, `ocomon`, ...), so blobs written by earlier versions still load.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Fold a label for lenient comparison: lowercase, Portuguese accents removed.
pub(crate) fn fold(s: &str) -> String {
    s.trim()
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' => 'a',
            'é' | 'ê' => 'e',
            'í' => 'i',
            'ó' | 'ô' | 'õ' => 'o',
            'ú' | 'ü' => 'u',
            'ç' => 'c',
            '_' => '-',
            other => other,
        })
        .collect()
}

/// The type of an installed, stocked or disposed peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PeripheralKind {
    /// Camera.
    #[serde(rename = "Câmera")]
    Camera,
    /// Smart-card reader.
    #[serde(rename = "Leitor de Cartão")]
    CardReader,
    /// e-CPF certificate reader.
    #[serde(rename = "Leitor de E-CPF")]
    Ecpf,
    /// Biometric device.
    #[serde(rename = "Biometria")]
    Biometric,
}

impl PeripheralKind {
    /// Every peripheral type, in the fixed collection order.
    pub const ALL: [Self; 4] = [Self::Camera, Self::CardReader, Self::Ecpf, Self::Biometric];

    /// Human-readable label, as stored in the `tipo` field.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Camera => "Câmera",
            Self::CardReader => "Leitor de Cartão",
            Self::Ecpf => "Leitor de E-CPF",
            Self::Biometric => "Biometria",
        }
    }

    /// Plural label used in summaries and report sheets.
    #[must_use]
    pub fn plural_label(self) -> &'static str {
        match self {
            Self::Camera => "Câmeras",
            Self::CardReader => "Leitores de Cartão",
            Self::Ecpf => "Leitores de E-CPF",
            Self::Biometric => "Biometria",
        }
    }

    /// Short identifier used on the command line.
    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Self::Camera => "camera",
            Self::CardReader => "card-reader",
            Self::Ecpf => "ecpf",
            Self::Biometric => "biometric",
        }
    }

    /// The installed-peripheral collection holding this type.
    #[must_use]
    pub fn collection(self) -> Collection {
        match self {
            Self::Camera => Collection::Camera,
            Self::CardReader => Collection::CardReader,
            Self::Ecpf => Collection::Ecpf,
            Self::Biometric => Collection::Biometric,
        }
    }
}

impl fmt::Display for PeripheralKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PeripheralKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let folded = fold(s);
        let kind = match folded.as_str() {
            "camera" | "cameras" => Self::Camera,
            "leitor de cartao" | "leitores de cartao" | "card-reader" | "leitor" => {
                Self::CardReader
            }
            "leitor de e-cpf" | "leitores de e-cpf" | "ecpf" | "e-cpf" => Self::Ecpf,
            "biometria" | "biometric" | "biometrics" => Self::Biometric,
            _ => return Err(Error::unknown_variant("tipo", s)),
        };
        Ok(kind)
    }
}

/// Reason recorded when a peripheral is installed or replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReplacementReason {
    /// First installation at the site.
    #[default]
    #[serde(rename = "Nova Instalação")]
    NewInstallation,
    /// Previous unit was defective.
    #[serde(rename = "Defeito")]
    Defect,
    /// Previous unit was physically damaged.
    #[serde(rename = "Dano Físico")]
    PhysicalDamage,
    /// Hardware upgrade.
    #[serde(rename = "Atualização")]
    Upgrade,
    /// Any other reason, explained in the note.
    #[serde(rename = "Outro")]
    Other,
}

impl ReplacementReason {
    /// Every replacement reason.
    pub const ALL: [Self; 5] = [
        Self::NewInstallation,
        Self::Defect,
        Self::PhysicalDamage,
        Self::Upgrade,
        Self::Other,
    ];

    /// Human-readable label, as stored in the `motivo` field.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::NewInstallation => "Nova Instalação",
            Self::Defect => "Defeito",
            Self::PhysicalDamage => "Dano Físico",
            Self::Upgrade => "Atualização",
            Self::Other => "Outro",
        }
    }
}

impl fmt::Display for ReplacementReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ReplacementReason {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let folded = fold(s);
        Self::ALL
            .into_iter()
            .find(|r| fold(r.label()) == folded)
            .ok_or_else(|| Error::unknown_variant("motivo", s))
    }
}

/// Reason a peripheral was retired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DisposalReason {
    /// Defect that cannot be repaired.
    #[default]
    #[serde(rename = "Defeito Irreparável")]
    IrreparableDefect,
    /// Obsolete hardware.
    #[serde(rename = "Obsolescência")]
    Obsolescence,
    /// Physical damage.
    #[serde(rename = "Dano Físico")]
    PhysicalDamage,
    /// End of service life.
    #[serde(rename = "Fim da Vida Útil")]
    EndOfLife,
    /// Any other reason, explained in the note.
    #[serde(rename = "Outro")]
    Other,
}

impl DisposalReason {
    /// Every disposal reason.
    pub const ALL: [Self; 5] = [
        Self::IrreparableDefect,
        Self::Obsolescence,
        Self::PhysicalDamage,
        Self::EndOfLife,
        Self::Other,
    ];

    /// Human-readable label, as stored in the `motivo` field.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::IrreparableDefect => "Defeito Irreparável",
            Self::Obsolescence => "Obsolescência",
            Self::PhysicalDamage => "Dano Físico",
            Self::EndOfLife => "Fim da Vida Útil",
            Self::Other => "Outro",
        }
    }
}

impl fmt::Display for DisposalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DisposalReason {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let folded = fold(s);
        Self::ALL
            .into_iter()
            .find(|r| fold(r.label()) == folded)
            .ok_or_else(|| Error::unknown_variant("motivo", s))
    }
}

/// One of the six stored collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Collection {
    /// Installed cameras.
    Camera,
    /// Installed card readers.
    CardReader,
    /// Installed e-CPF readers.
    Ecpf,
    /// Installed biometric devices.
    Biometric,
    /// Stock intake.
    Stock,
    /// Disposals.
    Disposal,
}

impl Collection {
    /// All six collections.
    pub const ALL: [Self; 6] = [
        Self::Camera,
        Self::CardReader,
        Self::Ecpf,
        Self::Biometric,
        Self::Stock,
        Self::Disposal,
    ];

    /// The four installed-peripheral collections, in lookup order.
    pub const INSTALLED: [Self; 4] = [Self::Camera, Self::CardReader, Self::Ecpf, Self::Biometric];

    /// Storage key holding this collection's JSON array.
    #[must_use]
    pub fn storage_key(self) -> &'static str {
        match self {
            Self::Camera => "cameraItems",
            Self::CardReader => "cardReaderItems",
            Self::Ecpf => "ecpfItems",
            Self::Biometric => "biometricsItems",
            Self::Stock => "stockItems",
            Self::Disposal => "disposalItems",
        }
    }

    /// Short identifier used on the command line.
    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Self::Camera => "camera",
            Self::CardReader => "card-reader",
            Self::Ecpf => "ecpf",
            Self::Biometric => "biometric",
            Self::Stock => "stock",
            Self::Disposal => "disposal",
        }
    }

    /// The peripheral type an installed collection holds.
    #[must_use]
    pub fn installed_kind(self) -> Option<PeripheralKind> {
        match self {
            Self::Camera => Some(PeripheralKind::Camera),
            Self::CardReader => Some(PeripheralKind::CardReader),
            Self::Ecpf => Some(PeripheralKind::Ecpf),
            Self::Biometric => Some(PeripheralKind::Biometric),
            Self::Stock | Self::Disposal => None,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Collection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let folded = fold(s);
        Self::ALL
            .into_iter()
            .find(|c| c.slug() == folded || fold(c.storage_key()) == folded)
            .ok_or_else(|| Error::unknown_variant("collection", s))
    }
}

fn site_code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9]{1,4}$").expect("valid site code pattern"))
}

/// Check whether `input` looks like a site code: one to four ASCII digits.
#[must_use]
pub fn is_site_code(input: &str) -> bool {
    site_code_pattern().is_match(input)
}

/// A site (UNCP) code, kept exactly as entered or imported.
///
/// Comparison between site codes goes through [`SiteCode::normalized`],
/// which strips leading zeros. "0000" therefore normalizes to the same empty
/// key as a missing site code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteCode(String);

impl SiteCode {
    /// Wrap a raw value without validation (legacy blobs, imports).
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Parse a site code typed by a user: 1 to 4 digits, zero-padded to 4.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSiteCode`] for empty or non-numeric input.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if !is_site_code(trimmed) {
            return Err(Error::InvalidSiteCode(input.to_string()));
        }
        Ok(Self(format!("{trimmed:0>4}")))
    }

    /// The stored value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The value with leading zeros stripped.
    #[must_use]
    pub fn normalized(&self) -> &str {
        normalize_site_code(&self.0)
    }

    /// Check whether no site code was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SiteCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Strip leading `'0'` characters from a site code.
#[must_use]
pub fn normalize_site_code(code: &str) -> &str {
    code.trim_start_matches('0')
}

/// Parse a stored date string.
///
/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps, naive ISO timestamps and
/// `DD/MM/YYYY`. Returns `None` for anything else.
#[must_use]
pub fn parse_record_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| NaiveDate::parse_from_str(raw, "%d/%m/%Y").ok())
}

/// Behavior shared by the three stored record shapes.
pub trait Record: Clone + Serialize + DeserializeOwned {
    /// Column names for tabular export, in order, after the `id` column.
    const COLUMNS: &'static [&'static str];

    /// Stable identifier.
    fn id(&self) -> Uuid;

    /// Declared peripheral type.
    fn kind(&self) -> PeripheralKind;

    /// Serial number or asset tag.
    fn serial(&self) -> &str;

    /// Raw date string.
    fn date(&self) -> &str;

    /// Technician name, possibly empty.
    fn technician(&self) -> &str;

    /// Field values in [`Record::COLUMNS`] order.
    fn column_values(&self) -> Vec<String>;

    /// Site code, for records that carry one.
    fn site(&self) -> Option<&SiteCode> {
        None
    }

    /// Parsed date, if the stored string is a recognized date.
    fn parsed_date(&self) -> Option<NaiveDate> {
        parse_record_date(self.date())
    }

    /// BLAKE3 fingerprint over every field except the id.
    ///
    /// Two records with identical field values share a fingerprint.
    fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for value in self.column_values() {
            hasher.update(value.as_bytes());
            hasher.update(&[0x1f]);
        }
        hasher.finalize().to_hex().to_string()
    }
}

fn require(field: &'static str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(field, "must not be empty"));
    }
    Ok(trimmed.to_string())
}

fn require_date(value: &str) -> Result<String> {
    let trimmed = require("data", value)?;
    parse_record_date(&trimmed)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .ok_or_else(|| Error::validation("data", format!("'{trimmed}' is not a date")))
}

/// An installed peripheral.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledRecord {
    /// Stable identifier.
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Serial number or asset tag.
    #[serde(rename = "sn", default)]
    pub serial: String,
    /// Declared peripheral type.
    #[serde(rename = "tipo")]
    pub kind: PeripheralKind,
    /// Installation date.
    #[serde(rename = "data", default)]
    pub date: String,
    /// Incident-ticket number.
    #[serde(rename = "ocomon", default)]
    pub ticket: String,
    /// Replacement reason.
    #[serde(rename = "motivo", default)]
    pub reason: ReplacementReason,
    /// Free-text note.
    #[serde(rename = "observacao", default)]
    pub note: String,
    /// Technician who performed the installation.
    #[serde(rename = "tecnico", default)]
    pub technician: String,
    /// Site code.
    #[serde(rename = "uncp", default)]
    pub site: SiteCode,
}

/// Fields entered for a new installation.
#[derive(Debug, Clone, Default)]
pub struct NewInstallation {
    /// Serial number or asset tag.
    pub serial: String,
    /// Site code as typed.
    pub site: String,
    /// Installation date.
    pub date: String,
    /// Incident-ticket number.
    pub ticket: String,
    /// Replacement reason.
    pub reason: ReplacementReason,
    /// Free-text note.
    pub note: String,
    /// Technician name.
    pub technician: String,
}

impl InstalledRecord {
    /// Validate manual entry and build a record with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the first missing or malformed field.
    pub fn create(kind: PeripheralKind, input: NewInstallation) -> Result<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            serial: require("sn", &input.serial)?,
            kind,
            date: require_date(&input.date)?,
            ticket: require("ocomon", &input.ticket)?,
            reason: input.reason,
            note: input.note.trim().to_string(),
            technician: require("tecnico", &input.technician)?,
            site: SiteCode::parse(&input.site)?,
        })
    }
}

impl Record for InstalledRecord {
    const COLUMNS: &'static [&'static str] = &[
        "sn",
        "tipo",
        "data",
        "ocomon",
        "motivo",
        "observacao",
        "tecnico",
        "uncp",
    ];

    fn id(&self) -> Uuid {
        self.id
    }

    fn kind(&self) -> PeripheralKind {
        self.kind
    }

    fn serial(&self) -> &str {
        &self.serial
    }

    fn date(&self) -> &str {
        &self.date
    }

    fn technician(&self) -> &str {
        &self.technician
    }

    fn site(&self) -> Option<&SiteCode> {
        Some(&self.site)
    }

    fn column_values(&self) -> Vec<String> {
        vec![
            self.serial.clone(),
            self.kind.label().to_string(),
            self.date.clone(),
            self.ticket.clone(),
            self.reason.label().to_string(),
            self.note.clone(),
            self.technician.clone(),
            self.site.as_str().to_string(),
        ]
    }
}

/// A unit taken into stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    /// Stable identifier.
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Serial number or asset tag.
    #[serde(rename = "sn", default)]
    pub serial: String,
    /// Peripheral type.
    #[serde(rename = "tipo")]
    pub kind: PeripheralKind,
    /// Intake date.
    #[serde(rename = "data", default)]
    pub date: String,
    /// Incident-ticket number.
    #[serde(rename = "ocomon", default)]
    pub ticket: String,
    /// Technician who received the unit.
    #[serde(rename = "tecnico", default)]
    pub technician: String,
}

/// Fields entered for a stock intake.
#[derive(Debug, Clone, Default)]
pub struct NewStock {
    /// Serial number or asset tag.
    pub serial: String,
    /// Intake date.
    pub date: String,
    /// Incident-ticket number.
    pub ticket: String,
    /// Technician name, optional.
    pub technician: String,
}

impl StockRecord {
    /// Validate manual entry and build a record with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the first missing or malformed field.
    pub fn create(kind: PeripheralKind, input: NewStock) -> Result<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            serial: require("sn", &input.serial)?,
            kind,
            date: require_date(&input.date)?,
            ticket: require("ocomon", &input.ticket)?,
            technician: input.technician.trim().to_string(),
        })
    }
}

impl Record for StockRecord {
    const COLUMNS: &'static [&'static str] = &["sn", "tipo", "data", "ocomon", "tecnico"];

    fn id(&self) -> Uuid {
        self.id
    }

    fn kind(&self) -> PeripheralKind {
        self.kind
    }

    fn serial(&self) -> &str {
        &self.serial
    }

    fn date(&self) -> &str {
        &self.date
    }

    fn technician(&self) -> &str {
        &self.technician
    }

    fn column_values(&self) -> Vec<String> {
        vec![
            self.serial.clone(),
            self.kind.label().to_string(),
            self.date.clone(),
            self.ticket.clone(),
            self.technician.clone(),
        ]
    }
}

/// A retired unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisposalRecord {
    /// Stable identifier.
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Serial number or asset tag.
    #[serde(rename = "sn", default)]
    pub serial: String,
    /// Peripheral type.
    #[serde(rename = "tipo")]
    pub kind: PeripheralKind,
    /// Disposal date.
    #[serde(rename = "data", default)]
    pub date: String,
    /// Incident-ticket number.
    #[serde(rename = "ocomon", default)]
    pub ticket: String,
    /// Disposal reason.
    #[serde(rename = "motivo", default)]
    pub reason: DisposalReason,
    /// Free-text note.
    #[serde(rename = "observacao", default)]
    pub note: String,
    /// Technician responsible for the disposal.
    #[serde(rename = "tecnico", default)]
    pub technician: String,
}

/// Fields entered for a disposal.
#[derive(Debug, Clone, Default)]
pub struct NewDisposal {
    /// Serial number or asset tag.
    pub serial: String,
    /// Disposal date.
    pub date: String,
    /// Incident-ticket number.
    pub ticket: String,
    /// Disposal reason.
    pub reason: DisposalReason,
    /// Free-text note.
    pub note: String,
    /// Technician name, optional.
    pub technician: String,
}

impl DisposalRecord {
    /// Validate manual entry and build a record with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the first missing or malformed field.
    pub fn create(kind: PeripheralKind, input: NewDisposal) -> Result<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            serial: require("sn", &input.serial)?,
            kind,
            date: require_date(&input.date)?,
            ticket: require("ocomon", &input.ticket)?,
            reason: input.reason,
            note: input.note.trim().to_string(),
            technician: input.technician.trim().to_string(),
        })
    }
}

impl Record for DisposalRecord {
    const COLUMNS: &'static [&'static str] = &[
        "sn",
        "tipo",
        "data",
        "ocomon",
        "motivo",
        "observacao",
        "tecnico",
    ];

    fn id(&self) -> Uuid {
        self.id
    }

    fn kind(&self) -> PeripheralKind {
        self.kind
    }

    fn serial(&self) -> &str {
        &self.serial
    }

    fn date(&self) -> &str {
        &self.date
    }

    fn technician(&self) -> &str {
        &self.technician
    }

    fn column_values(&self) -> Vec<String> {
        vec![
            self.serial.clone(),
            self.kind.label().to_string(),
            self.date.clone(),
            self.ticket.clone(),
            self.reason.label().to_string(),
            self.note.clone(),
            self.technician.clone(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera_input(site: &str) -> NewInstallation {
        NewInstallation {
            serial: "CAM-001".to_string(),
            site: site.to_string(),
            date: "2024-03-15".to_string(),
            ticket: "OC-1234".to_string(),
            reason: ReplacementReason::Defect,
            note: String::new(),
            technician: "Ana".to_string(),
        }
    }

    #[test]
    fn test_peripheral_kind_labels() {
        assert_eq!(PeripheralKind::Camera.to_string(), "Câmera");
        assert_eq!(PeripheralKind::CardReader.label(), "Leitor de Cartão");
        assert_eq!(PeripheralKind::Ecpf.label(), "Leitor de E-CPF");
        assert_eq!(PeripheralKind::Biometric.label(), "Biometria");
    }

    #[test]
    fn test_peripheral_kind_from_str_lenient() {
        assert_eq!("Câmera".parse::<PeripheralKind>().unwrap(), PeripheralKind::Camera);
        assert_eq!("camera".parse::<PeripheralKind>().unwrap(), PeripheralKind::Camera);
        assert_eq!(
            "LEITOR DE CARTAO".parse::<PeripheralKind>().unwrap(),
            PeripheralKind::CardReader
        );
        assert_eq!("ecpf".parse::<PeripheralKind>().unwrap(), PeripheralKind::Ecpf);
        assert_eq!(
            " biometria ".parse::<PeripheralKind>().unwrap(),
            PeripheralKind::Biometric
        );
    }

    #[test]
    fn test_peripheral_kind_rejects_unknown() {
        let err = "Scanner".parse::<PeripheralKind>().unwrap_err();
        assert!(matches!(err, Error::UnknownVariant { field: "tipo", .. }));
    }

    #[test]
    fn test_peripheral_kind_serde_uses_label() {
        let json = serde_json::to_string(&PeripheralKind::CardReader).unwrap();
        assert_eq!(json, "\"Leitor de Cartão\"");
        let kind: PeripheralKind = serde_json::from_str("\"Biometria\"").unwrap();
        assert_eq!(kind, PeripheralKind::Biometric);
    }

    #[test]
    fn test_reasons_parse_without_accents() {
        assert_eq!(
            "obsolescencia".parse::<DisposalReason>().unwrap(),
            DisposalReason::Obsolescence
        );
        assert_eq!(
            "Fim da Vida Util".parse::<DisposalReason>().unwrap(),
            DisposalReason::EndOfLife
        );
        assert_eq!(
            "atualizacao".parse::<ReplacementReason>().unwrap(),
            ReplacementReason::Upgrade
        );
        assert!("quebrou".parse::<DisposalReason>().is_err());
    }

    #[test]
    fn test_collection_keys_and_parsing() {
        assert_eq!(Collection::Camera.storage_key(), "cameraItems");
        assert_eq!(Collection::Biometric.storage_key(), "biometricsItems");
        assert_eq!(Collection::Disposal.storage_key(), "disposalItems");
        assert_eq!("stock".parse::<Collection>().unwrap(), Collection::Stock);
        assert_eq!("ecpfItems".parse::<Collection>().unwrap(), Collection::Ecpf);
        assert_eq!("card_reader".parse::<Collection>().unwrap(), Collection::CardReader);
        assert!("printers".parse::<Collection>().is_err());
    }

    #[test]
    fn test_kind_collection_round_trip() {
        for kind in PeripheralKind::ALL {
            assert_eq!(kind.collection().installed_kind(), Some(kind));
        }
        assert_eq!(Collection::Stock.installed_kind(), None);
    }

    #[test]
    fn test_site_code_parse_pads() {
        assert_eq!(SiteCode::parse("58").unwrap().as_str(), "0058");
        assert_eq!(SiteCode::parse("0058").unwrap().as_str(), "0058");
        assert!(SiteCode::parse("").is_err());
        assert!(SiteCode::parse("12a4").is_err());
        assert!(SiteCode::parse("12345").is_err());
    }

    #[test]
    fn test_site_code_normalization() {
        assert_eq!(SiteCode::new("0058").normalized(), "58");
        assert_eq!(SiteCode::new("058").normalized(), "58");
        assert_eq!(SiteCode::new("0000").normalized(), "");
        assert_eq!(SiteCode::new("").normalized(), "");
        assert_eq!(normalize_site_code("00058"), "58");
    }

    #[test]
    fn test_parse_record_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(parse_record_date("2024-03-15"), Some(expected));
        assert_eq!(parse_record_date("2024-03-15T10:30:00Z"), Some(expected));
        assert_eq!(parse_record_date("2024-03-15T10:30:00.123"), Some(expected));
        assert_eq!(parse_record_date("15/03/2024"), Some(expected));
        assert_eq!(parse_record_date("ontem"), None);
        assert_eq!(parse_record_date(""), None);
    }

    #[test]
    fn test_installed_create_validates() {
        let record = InstalledRecord::create(PeripheralKind::Camera, camera_input("58")).unwrap();
        assert_eq!(record.site.as_str(), "0058");
        assert_eq!(record.kind, PeripheralKind::Camera);

        let mut missing_serial = camera_input("58");
        missing_serial.serial = "   ".to_string();
        let err = InstalledRecord::create(PeripheralKind::Camera, missing_serial).unwrap_err();
        assert!(matches!(err, Error::Validation { field: "sn", .. }));

        let err = InstalledRecord::create(PeripheralKind::Camera, camera_input("abcd")).unwrap_err();
        assert!(matches!(err, Error::InvalidSiteCode(_)));
    }

    #[test]
    fn test_create_normalizes_date() {
        let mut input = camera_input("1234");
        input.date = "15/03/2024".to_string();
        let record = InstalledRecord::create(PeripheralKind::Ecpf, input).unwrap();
        assert_eq!(record.date, "2024-03-15");

        let mut input = camera_input("1234");
        input.date = "soon".to_string();
        let err = InstalledRecord::create(PeripheralKind::Ecpf, input).unwrap_err();
        assert!(matches!(err, Error::Validation { field: "data", .. }));
    }

    #[test]
    fn test_disposal_create_requires_ticket() {
        let input = NewDisposal {
            serial: "BIO-9".to_string(),
            date: "2024-01-02".to_string(),
            ticket: String::new(),
            ..NewDisposal::default()
        };
        let err = DisposalRecord::create(PeripheralKind::Biometric, input).unwrap_err();
        assert!(matches!(err, Error::Validation { field: "ocomon", .. }));
    }

    #[test]
    fn test_legacy_blob_without_id_deserializes() {
        let json = r#"{"sn":"X1","tipo":"Câmera","data":"2024-01-01","ocomon":"1","tecnico":"Ana","uncp":"0058"}"#;
        let record: InstalledRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.serial, "X1");
        assert_eq!(record.reason, ReplacementReason::NewInstallation);
        assert_eq!(record.site.as_str(), "0058");
    }

    #[test]
    fn test_fingerprint_ignores_id() {
        let a = InstalledRecord::create(PeripheralKind::Camera, camera_input("58")).unwrap();
        let mut b = a.clone();
        b.id = Uuid::new_v4();
        assert_eq!(a.fingerprint(), b.fingerprint());

        b.serial = "CAM-002".to_string();
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_column_values_match_columns() {
        let record = InstalledRecord::create(PeripheralKind::Camera, camera_input("58")).unwrap();
        assert_eq!(record.column_values().len(), InstalledRecord::COLUMNS.len());

        let stock = StockRecord::create(
            PeripheralKind::Camera,
            NewStock {
                serial: "S1".to_string(),
                date: "2024-01-01".to_string(),
                ticket: "T".to_string(),
                technician: String::new(),
            },
        )
        .unwrap();
        assert_eq!(stock.column_values().len(), StockRecord::COLUMNS.len());
    }
}
