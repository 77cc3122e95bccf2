//! Site-code lookup across the installed collections.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::inventory::Inventory;
use crate::record::{is_site_code, normalize_site_code, InstalledRecord, PeripheralKind};

/// A validated lookup query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteQuery {
    raw: String,
}

impl SiteQuery {
    /// Validate user input: one to four digits after trimming.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSiteCode`] for empty, non-numeric or overlong input.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if !is_site_code(trimmed) {
            return Err(Error::InvalidSiteCode(input.to_string()));
        }
        Ok(Self {
            raw: trimmed.to_string(),
        })
    }

    /// The query as typed, trimmed.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The query with leading zeros stripped.
    #[must_use]
    pub fn normalized(&self) -> &str {
        normalize_site_code(&self.raw)
    }
}

/// Records found for one site.
#[derive(Debug, Clone, Serialize)]
pub struct LookupResult {
    /// The query that produced the result.
    pub query: SiteQuery,
    /// Matches in collection order: cameras, card readers, e-CPF readers, biometrics.
    pub matches: Vec<InstalledRecord>,
}

impl LookupResult {
    /// Check whether nothing matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Number of matches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// Matches whose declared type is `kind`.
    pub fn by_kind(&self, kind: PeripheralKind) -> impl Iterator<Item = &InstalledRecord> + '_ {
        self.matches.iter().filter(move |r| r.kind == kind)
    }
}

/// Every installed record whose normalized site code equals the query's.
///
/// An all-zero query normalizes to the empty string and so also matches
/// records stored without a site code.
#[must_use]
pub fn lookup_site(inventory: &Inventory, query: &SiteQuery) -> LookupResult {
    let wanted = query.normalized();
    let matches = inventory
        .installed()
        .filter(|record| record.site.normalized() == wanted)
        .cloned()
        .collect();

    LookupResult {
        query: query.clone(),
        matches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{NewInstallation, SiteCode};
    use crate::repository::Repository;
    use crate::storage::MemoryStore;
    use uuid::Uuid;

    fn record(kind: PeripheralKind, site: &str) -> InstalledRecord {
        InstalledRecord {
            id: Uuid::new_v4(),
            serial: format!("SN-{site}"),
            kind,
            date: "2024-01-01".to_string(),
            ticket: String::new(),
            reason: Default::default(),
            note: String::new(),
            technician: String::new(),
            site: SiteCode::new(site),
        }
    }

    #[test]
    fn test_query_validation() {
        assert!(SiteQuery::parse("").is_err());
        assert!(SiteQuery::parse("   ").is_err());
        assert!(SiteQuery::parse("5a").is_err());
        assert!(SiteQuery::parse("12345").is_err());
        assert_eq!(SiteQuery::parse(" 58 ").unwrap().as_str(), "58");
    }

    #[test]
    fn test_leading_zeros_match() {
        let inventory = Inventory {
            cameras: vec![record(PeripheralKind::Camera, "0058")],
            card_readers: vec![record(PeripheralKind::CardReader, "058")],
            biometrics: vec![
                record(PeripheralKind::Biometric, "58"),
                record(PeripheralKind::Biometric, "0580"),
            ],
            ..Inventory::default()
        };

        let result = lookup_site(&inventory, &SiteQuery::parse("58").unwrap());
        assert_eq!(result.len(), 3);
        let sites: Vec<_> = result.matches.iter().map(|r| r.site.as_str()).collect();
        assert_eq!(sites, vec!["0058", "058", "58"]);
    }

    #[test]
    fn test_all_zero_matches_empty_site() {
        let inventory = Inventory {
            cameras: vec![record(PeripheralKind::Camera, "")],
            ecpf_readers: vec![record(PeripheralKind::Ecpf, "0000")],
            ..Inventory::default()
        };

        let result = lookup_site(&inventory, &SiteQuery::parse("0000").unwrap());
        assert_eq!(result.len(), 2);
        let result = lookup_site(&inventory, &SiteQuery::parse("0").unwrap());
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_not_found_is_empty() {
        let inventory = Inventory {
            cameras: vec![record(PeripheralKind::Camera, "0001")],
            ..Inventory::default()
        };
        let result = lookup_site(&inventory, &SiteQuery::parse("9999").unwrap());
        assert!(result.is_empty());
    }

    #[test]
    fn test_partition_by_declared_kind() {
        let mut mislabeled = record(PeripheralKind::Biometric, "7");
        mislabeled.serial = "odd".to_string();
        let inventory = Inventory {
            cameras: vec![record(PeripheralKind::Camera, "7"), mislabeled],
            ..Inventory::default()
        };

        let result = lookup_site(&inventory, &SiteQuery::parse("7").unwrap());
        assert_eq!(result.by_kind(PeripheralKind::Camera).count(), 1);
        assert_eq!(result.by_kind(PeripheralKind::Biometric).count(), 1);
    }

    #[test]
    fn test_registered_camera_found_by_short_code() {
        let repo = Repository::new(MemoryStore::new());
        repo.add_installation(
            PeripheralKind::Camera,
            NewInstallation {
                serial: "CAM-9".to_string(),
                site: "0058".to_string(),
                date: "2024-04-01".to_string(),
                ticket: "OC-5".to_string(),
                technician: "Ana".to_string(),
                ..NewInstallation::default()
            },
        )
        .unwrap();

        let inventory = repo.snapshot().unwrap();
        let result = lookup_site(&inventory, &SiteQuery::parse("58").unwrap());
        assert_eq!(result.len(), 1);
        assert_eq!(result.matches[0].kind, PeripheralKind::Camera);
        assert_eq!(result.matches[0].serial, "CAM-9");
    }
}
