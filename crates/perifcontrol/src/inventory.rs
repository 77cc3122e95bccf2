//! In-memory snapshot of all six collections.
//!
//! Lookup, dashboard and reports all work over an [`Inventory`] loaded in one
//! pass, never against the store directly.

use std::cmp::Ordering;

use serde::Serialize;

use crate::preferences::SortField;
use crate::record::{
    Collection, DisposalRecord, InstalledRecord, PeripheralKind, Record, StockRecord,
};

/// Every stored record, grouped by collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    /// Installed cameras.
    pub cameras: Vec<InstalledRecord>,
    /// Installed card readers.
    pub card_readers: Vec<InstalledRecord>,
    /// Installed e-CPF readers.
    pub ecpf_readers: Vec<InstalledRecord>,
    /// Installed biometric devices.
    pub biometrics: Vec<InstalledRecord>,
    /// Stock intake.
    pub stock: Vec<StockRecord>,
    /// Disposals.
    pub disposals: Vec<DisposalRecord>,
}

impl Inventory {
    /// Records of the installed collection for `kind`.
    #[must_use]
    pub fn installed_in(&self, kind: PeripheralKind) -> &[InstalledRecord] {
        match kind {
            PeripheralKind::Camera => &self.cameras,
            PeripheralKind::CardReader => &self.card_readers,
            PeripheralKind::Ecpf => &self.ecpf_readers,
            PeripheralKind::Biometric => &self.biometrics,
        }
    }

    /// All installed records: cameras, card readers, e-CPF readers, biometrics.
    pub fn installed(&self) -> impl Iterator<Item = &InstalledRecord> + '_ {
        PeripheralKind::ALL
            .into_iter()
            .flat_map(move |kind| self.installed_in(kind).iter())
    }

    /// Technician names across all six collections, blank ones included.
    pub fn technicians(&self) -> impl Iterator<Item = &str> + '_ {
        self.installed()
            .map(|r| r.technician())
            .chain(self.stock.iter().map(|r| r.technician()))
            .chain(self.disposals.iter().map(|r| r.technician()))
    }

    /// Sum of the four installed-collection lengths.
    #[must_use]
    pub fn installed_count(&self) -> usize {
        PeripheralKind::ALL
            .into_iter()
            .map(|kind| self.installed_in(kind).len())
            .sum()
    }

    /// Length of one collection.
    #[must_use]
    pub fn count(&self, collection: Collection) -> usize {
        match collection {
            Collection::Stock => self.stock.len(),
            Collection::Disposal => self.disposals.len(),
            other => other
                .installed_kind()
                .map_or(0, |kind| self.installed_in(kind).len()),
        }
    }

    /// Stock grouped by type, filtered by a case-insensitive serial substring.
    ///
    /// Every type appears in the result, possibly with no items.
    #[must_use]
    pub fn stock_by_kind(&self, search: Option<&str>) -> Vec<StockGroup> {
        let needle = search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        PeripheralKind::ALL
            .into_iter()
            .map(|kind| StockGroup {
                kind,
                items: self
                    .stock
                    .iter()
                    .filter(|item| item.kind == kind)
                    .filter(|item| {
                        needle
                            .as_ref()
                            .map_or(true, |n| item.serial.to_lowercase().contains(n.as_str()))
                    })
                    .cloned()
                    .collect(),
            })
            .collect()
    }
}

/// Stock items of one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockGroup {
    /// The type shared by every item.
    pub kind: PeripheralKind,
    /// Matching items, in stored order.
    pub items: Vec<StockRecord>,
}

fn compare_dates<T: Record>(a: &T, b: &T) -> Ordering {
    // Newest first; unparseable dates sink to the end.
    match (a.parsed_date(), b.parsed_date()) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Sort records for display. The sort is stable.
///
/// Records without a site code fall back to date order under [`SortField::Site`].
pub fn sort_records<T: Record>(records: &mut [T], field: SortField) {
    match field {
        SortField::Date => records.sort_by(compare_dates),
        SortField::Kind => {
            records.sort_by(|a, b| a.kind().cmp(&b.kind()).then_with(|| compare_dates(a, b)));
        }
        SortField::Site => records.sort_by(|a, b| match (a.site(), b.site()) {
            (Some(x), Some(y)) => {
                let (x, y) = (x.normalized(), y.normalized());
                x.len()
                    .cmp(&y.len())
                    .then_with(|| x.cmp(y))
                    .then_with(|| compare_dates(a, b))
            }
            _ => compare_dates(a, b),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SiteCode;
    use uuid::Uuid;

    fn installed(kind: PeripheralKind, site: &str, date: &str) -> InstalledRecord {
        InstalledRecord {
            id: Uuid::new_v4(),
            serial: format!("{}-{site}-{date}", kind.slug()),
            kind,
            date: date.to_string(),
            ticket: String::new(),
            reason: Default::default(),
            note: String::new(),
            technician: "Ana".to_string(),
            site: SiteCode::new(site),
        }
    }

    fn stock(kind: PeripheralKind, serial: &str) -> StockRecord {
        StockRecord {
            id: Uuid::new_v4(),
            serial: serial.to_string(),
            kind,
            date: "2024-01-01".to_string(),
            ticket: String::new(),
            technician: String::new(),
        }
    }

    #[test]
    fn test_installed_order_is_fixed() {
        let inventory = Inventory {
            biometrics: vec![installed(PeripheralKind::Biometric, "1", "2024-01-01")],
            cameras: vec![installed(PeripheralKind::Camera, "2", "2024-01-01")],
            ecpf_readers: vec![installed(PeripheralKind::Ecpf, "3", "2024-01-01")],
            card_readers: vec![installed(PeripheralKind::CardReader, "4", "2024-01-01")],
            ..Inventory::default()
        };

        let kinds: Vec<_> = inventory.installed().map(|r| r.kind).collect();
        assert_eq!(kinds, PeripheralKind::ALL.to_vec());
        assert_eq!(inventory.installed_count(), 4);
    }

    #[test]
    fn test_count_by_collection() {
        let inventory = Inventory {
            cameras: vec![
                installed(PeripheralKind::Camera, "1", "2024-01-01"),
                installed(PeripheralKind::Camera, "2", "2024-01-01"),
            ],
            stock: vec![stock(PeripheralKind::Camera, "S1")],
            ..Inventory::default()
        };
        assert_eq!(inventory.count(Collection::Camera), 2);
        assert_eq!(inventory.count(Collection::Stock), 1);
        assert_eq!(inventory.count(Collection::Disposal), 0);
    }

    #[test]
    fn test_stock_by_kind_with_search() {
        let inventory = Inventory {
            stock: vec![
                stock(PeripheralKind::Camera, "CAM-100"),
                stock(PeripheralKind::Camera, "cam-200"),
                stock(PeripheralKind::Biometric, "BIO-100"),
            ],
            ..Inventory::default()
        };

        let groups = inventory.stock_by_kind(None);
        assert_eq!(groups.len(), 4);
        assert_eq!(groups[0].items.len(), 2);
        assert_eq!(groups[3].items.len(), 1);

        let groups = inventory.stock_by_kind(Some("100"));
        assert_eq!(groups[0].items.len(), 1);
        assert_eq!(groups[3].items.len(), 1);

        let groups = inventory.stock_by_kind(Some("CAM-2"));
        assert_eq!(groups[0].items[0].serial, "cam-200");
    }

    #[test]
    fn test_sort_by_date_newest_first() {
        let mut records = vec![
            installed(PeripheralKind::Camera, "1", "2023-01-01"),
            installed(PeripheralKind::Camera, "2", "invalid"),
            installed(PeripheralKind::Camera, "3", "2024-06-01"),
        ];
        sort_records(&mut records, SortField::Date);
        let sites: Vec<_> = records.iter().map(|r| r.site.as_str()).collect();
        assert_eq!(sites, vec!["3", "1", "2"]);
    }

    #[test]
    fn test_sort_by_site_numeric() {
        let mut records = vec![
            installed(PeripheralKind::Camera, "0100", "2024-01-01"),
            installed(PeripheralKind::Camera, "0058", "2024-01-01"),
            installed(PeripheralKind::Camera, "0900", "2024-01-01"),
        ];
        sort_records(&mut records, SortField::Site);
        let sites: Vec<_> = records.iter().map(|r| r.site.as_str()).collect();
        assert_eq!(sites, vec!["0058", "0100", "0900"]);
    }

    #[test]
    fn test_sort_by_kind() {
        let mut records = vec![
            installed(PeripheralKind::Biometric, "1", "2024-01-01"),
            installed(PeripheralKind::Camera, "2", "2024-01-01"),
        ];
        sort_records(&mut records, SortField::Kind);
        assert_eq!(records[0].kind, PeripheralKind::Camera);
    }
}
