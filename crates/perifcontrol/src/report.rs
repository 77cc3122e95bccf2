//! Filtered reports over installed peripherals.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::dashboard::{KindCount, TOP_TECHNICIANS};
use crate::error::{Error, Result};
use crate::inventory::Inventory;
use crate::record::{fold, normalize_site_code, InstalledRecord, PeripheralKind, Record};
use crate::stats::{self, TechnicianCount};

/// Number of months in the installations-per-month series.
pub const MONTHLY_SERIES_LEN: u32 = 6;

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
];

/// Time window a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Period {
    /// The current calendar month.
    #[serde(rename = "mes")]
    Month,
    /// The last three months.
    #[serde(rename = "trimestre")]
    Quarter,
    /// The last twelve months.
    #[serde(rename = "ano")]
    Year,
    /// No date restriction.
    #[default]
    #[serde(rename = "todos")]
    All,
}

impl Period {
    /// Check whether `date` falls inside the period ending `today`.
    #[must_use]
    pub fn contains(self, date: NaiveDate, today: NaiveDate) -> bool {
        match self {
            Self::Month => date.year() == today.year() && date.month() == today.month(),
            Self::Quarter => date >= stats::months_before(today, 3),
            Self::Year => date >= stats::months_before(today, 12),
            Self::All => true,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Month => write!(f, "mes"),
            Self::Quarter => write!(f, "trimestre"),
            Self::Year => write!(f, "ano"),
            Self::All => write!(f, "todos"),
        }
    }
}

impl FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match fold(s).as_str() {
            "mes" | "month" => Ok(Self::Month),
            "trimestre" | "quarter" => Ok(Self::Quarter),
            "ano" | "year" => Ok(Self::Year),
            "todos" | "all" | "" => Ok(Self::All),
            _ => Err(Error::unknown_variant("periodo", s)),
        }
    }
}

/// Restrictions applied before aggregation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportFilter {
    /// Date window.
    pub period: Period,
    /// Only this declared type.
    pub kind: Option<PeripheralKind>,
    /// Only this site, compared after normalization.
    pub site: Option<String>,
}

impl ReportFilter {
    /// Check whether `record` passes the filter.
    ///
    /// Undated records only pass when the period is [`Period::All`].
    #[must_use]
    pub fn matches(&self, record: &InstalledRecord, today: NaiveDate) -> bool {
        if self.kind.is_some_and(|kind| record.kind != kind) {
            return false;
        }
        if let Some(site) = &self.site {
            if record.site.normalized() != normalize_site_code(site.trim()) {
                return false;
            }
        }
        match self.period {
            Period::All => true,
            period => record
                .parsed_date()
                .is_some_and(|date| period.contains(date, today)),
        }
    }
}

/// Installations in one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthCount {
    /// Year.
    pub year: i32,
    /// Month, 1-based.
    pub month: u32,
    /// Short label, e.g. `jun/2024`.
    pub label: String,
    /// Installed records dated in that month.
    pub count: usize,
}

/// Headline figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    /// Records passing the filter.
    pub total: usize,
    /// Of those, dated in the current month.
    pub this_month: usize,
    /// Distinct site codes.
    pub distinct_sites: usize,
    /// Distinct technicians.
    pub distinct_technicians: usize,
}

/// A computed report.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Date the report is relative to.
    pub generated_on: NaiveDate,
    /// Filter that was applied.
    pub filter: ReportFilter,
    /// Headline figures.
    pub summary: ReportSummary,
    /// Counts by declared type, every type listed.
    pub by_kind: Vec<KindCount>,
    /// Installations per month, oldest first.
    pub per_month: Vec<MonthCount>,
    /// Technicians with the most installations.
    pub top_technicians: Vec<TechnicianCount>,
    /// Records passing the filter, in collection order.
    pub records: Vec<InstalledRecord>,
}

impl Report {
    /// Build a report over the installed collections.
    #[must_use]
    pub fn generate(inventory: &Inventory, filter: ReportFilter, today: NaiveDate) -> Self {
        let records: Vec<InstalledRecord> = inventory
            .installed()
            .filter(|r| filter.matches(r, today))
            .cloned()
            .collect();

        let summary = ReportSummary {
            total: records.len(),
            this_month: stats::count_in_month(&records, today),
            distinct_sites: stats::distinct_sites(&records),
            distinct_technicians: stats::distinct_technicians(&records),
        };

        let by_kind = PeripheralKind::ALL
            .into_iter()
            .map(|kind| KindCount {
                kind,
                count: records.iter().filter(|r| r.kind == kind).count(),
            })
            .collect();

        Self {
            generated_on: today,
            summary,
            by_kind,
            per_month: monthly_series(&records, today, MONTHLY_SERIES_LEN),
            top_technicians: stats::top_technicians(
                records.iter().map(|r| r.technician()),
                TOP_TECHNICIANS,
            ),
            records,
            filter,
        }
    }
}

/// Counts for the `months` calendar months ending with the current one.
#[must_use]
pub fn monthly_series(records: &[InstalledRecord], today: NaiveDate, months: u32) -> Vec<MonthCount> {
    let current = stats::month_start(today);
    (0..months)
        .rev()
        .map(|back| {
            let start = stats::months_before(current, back);
            let count = records
                .iter()
                .filter_map(Record::parsed_date)
                .filter(|d| d.year() == start.year() && d.month() == start.month())
                .count();
            let abbreviation = MONTH_ABBREVIATIONS
                .get(start.month0() as usize)
                .copied()
                .unwrap_or_default();
            MonthCount {
                year: start.year(),
                month: start.month(),
                label: format!("{abbreviation}/{}", start.year()),
                count,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SiteCode;
    use uuid::Uuid;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn installed(kind: PeripheralKind, site: &str, date: &str) -> InstalledRecord {
        InstalledRecord {
            id: Uuid::new_v4(),
            serial: "SN".to_string(),
            kind,
            date: date.to_string(),
            ticket: String::new(),
            reason: Default::default(),
            note: String::new(),
            technician: "Ana".to_string(),
            site: SiteCode::new(site),
        }
    }

    fn sample() -> Inventory {
        Inventory {
            cameras: vec![
                installed(PeripheralKind::Camera, "0058", "2024-06-01"),
                installed(PeripheralKind::Camera, "0058", "2024-04-20"),
                installed(PeripheralKind::Camera, "0100", "2023-01-10"),
            ],
            ecpf_readers: vec![installed(PeripheralKind::Ecpf, "0100", "2024-01-05")],
            biometrics: vec![installed(PeripheralKind::Biometric, "0058", "undated")],
            ..Inventory::default()
        }
    }

    #[test]
    fn test_period_parse() {
        assert_eq!("mes".parse::<Period>().unwrap(), Period::Month);
        assert_eq!("Mês".parse::<Period>().unwrap(), Period::Month);
        assert_eq!("quarter".parse::<Period>().unwrap(), Period::Quarter);
        assert_eq!("ano".parse::<Period>().unwrap(), Period::Year);
        assert_eq!("all".parse::<Period>().unwrap(), Period::All);
        assert!("semana".parse::<Period>().is_err());
    }

    #[test]
    fn test_unfiltered_report() {
        let report = Report::generate(&sample(), ReportFilter::default(), today());
        assert_eq!(report.summary.total, 5);
        assert_eq!(report.summary.this_month, 1);
        assert_eq!(report.summary.distinct_sites, 2);
        let counts: Vec<_> = report.by_kind.iter().map(|k| k.count).collect();
        assert_eq!(counts, vec![3, 0, 1, 1]);
    }

    #[test]
    fn test_period_filters() {
        let month = ReportFilter {
            period: Period::Month,
            ..ReportFilter::default()
        };
        assert_eq!(Report::generate(&sample(), month, today()).summary.total, 1);

        let quarter = ReportFilter {
            period: Period::Quarter,
            ..ReportFilter::default()
        };
        assert_eq!(Report::generate(&sample(), quarter, today()).summary.total, 2);

        let year = ReportFilter {
            period: Period::Year,
            ..ReportFilter::default()
        };
        assert_eq!(Report::generate(&sample(), year, today()).summary.total, 3);
    }

    #[test]
    fn test_kind_and_site_filters() {
        let filter = ReportFilter {
            kind: Some(PeripheralKind::Camera),
            site: Some("58".to_string()),
            ..ReportFilter::default()
        };
        let report = Report::generate(&sample(), filter, today());
        assert_eq!(report.summary.total, 2);
        assert!(report.records.iter().all(|r| r.site.as_str() == "0058"));
    }

    #[test]
    fn test_monthly_series() {
        let report = Report::generate(&sample(), ReportFilter::default(), today());
        assert_eq!(report.per_month.len(), 6);
        assert_eq!(report.per_month[0].label, "jan/2024");
        assert_eq!(report.per_month[0].count, 1);
        assert_eq!(report.per_month[3].label, "abr/2024");
        assert_eq!(report.per_month[3].count, 1);
        assert_eq!(report.per_month[5].label, "jun/2024");
        assert_eq!(report.per_month[5].count, 1);
    }

    #[test]
    fn test_series_crosses_year_boundary() {
        let series = monthly_series(&[], NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(), 6);
        let labels: Vec<_> = series.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["set/2023", "out/2023", "nov/2023", "dez/2023", "jan/2024", "fev/2024"]
        );
    }
}
