//! Reductions shared by the dashboard and reports.

use std::collections::{HashMap, HashSet};

use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;

use crate::record::{InstalledRecord, Record};

/// Installation count for one technician.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TechnicianCount {
    /// Technician name as recorded.
    pub name: String,
    /// Number of installed records.
    pub count: usize,
}

/// `date` moved back by `months` calendar months, clamped to month end.
#[must_use]
pub fn months_before(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}

/// First day of the month containing `date`.
#[must_use]
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Records whose parsed date falls in the same month and year as `today`.
pub fn count_in_month<'a, T, I>(records: I, today: NaiveDate) -> usize
where
    T: Record + 'a,
    I: IntoIterator<Item = &'a T>,
{
    records
        .into_iter()
        .filter_map(Record::parsed_date)
        .filter(|d| d.year() == today.year() && d.month() == today.month())
        .count()
}

/// Distinct non-empty site codes, compared after normalization.
pub fn distinct_sites<'a, I>(records: I) -> usize
where
    I: IntoIterator<Item = &'a InstalledRecord>,
{
    records
        .into_iter()
        .map(|r| r.site.normalized())
        .filter(|s| !s.is_empty())
        .collect::<HashSet<_>>()
        .len()
}

/// Distinct non-blank technician names.
pub fn distinct_technicians<'a, T, I>(records: I) -> usize
where
    T: Record + 'a,
    I: IntoIterator<Item = &'a T>,
{
    records
        .into_iter()
        .map(|r| r.technician().trim())
        .filter(|t| !t.is_empty())
        .collect::<HashSet<_>>()
        .len()
}

/// The `limit` technicians named most often, highest first.
///
/// Ties keep first-seen order; callers should not depend on it.
pub fn top_technicians<'a, I>(names: I, limit: usize) -> Vec<TechnicianCount>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for name in names {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let count = counts.entry(name).or_insert_with(|| {
            order.push(name);
            0
        });
        *count += 1;
    }

    let mut ranked: Vec<TechnicianCount> = order
        .into_iter()
        .map(|name| TechnicianCount {
            name: name.to_string(),
            count: counts.get(name).copied().unwrap_or_default(),
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(limit);
    ranked
}

/// Records dated before `years` years ago.
pub fn count_older_than<'a, T, I>(records: I, today: NaiveDate, years: u32) -> usize
where
    T: Record + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let cutoff = months_before(today, years * 12);
    records
        .into_iter()
        .filter_map(Record::parsed_date)
        .filter(|d| *d < cutoff)
        .count()
}

/// Distinct sites with no record dated after `months` months ago.
///
/// Records with unparseable dates never count as recent.
pub fn stale_sites<'a, I>(records: I, today: NaiveDate, months: u32) -> usize
where
    I: IntoIterator<Item = &'a InstalledRecord>,
{
    let cutoff = months_before(today, months);
    let mut recent: HashMap<&str, bool> = HashMap::new();
    for record in records {
        let site = record.site.normalized();
        if site.is_empty() {
            continue;
        }
        let is_recent = record.parsed_date().is_some_and(|d| d > cutoff);
        *recent.entry(site).or_insert(false) |= is_recent;
    }
    recent.values().filter(|has_recent| !**has_recent).count()
}
