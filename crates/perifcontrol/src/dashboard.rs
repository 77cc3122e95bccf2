//! Dashboard summary: counts, alerts and recent activity.
//!
//! Everything is computed from an [`Inventory`] snapshot relative to a given
//! `today`, so callers pass `Local::now().date_naive()` and tests pass a fixed
//! date.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::inventory::Inventory;
use crate::record::{PeripheralKind, Record};
use crate::stats::{self, TechnicianCount};

/// Stock below this many units raises an alert.
pub const LOW_STOCK_THRESHOLD: usize = 5;

/// Records older than this many years count as aged.
pub const AGING_YEARS: u32 = 5;

/// Sites without a record in this many months count as stale.
pub const MAINTENANCE_MONTHS: u32 = 6;

/// Length of the top-technicians list.
pub const TOP_TECHNICIANS: usize = 5;

/// Length of the recent-activity list.
pub const RECENT_ACTIVITY_LIMIT: usize = 10;

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    /// Informational.
    #[serde(rename = "baixo")]
    Low,
    /// Needs attention.
    #[serde(rename = "médio")]
    Medium,
    /// Needs action.
    #[serde(rename = "alto")]
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "baixo"),
            Self::Medium => write!(f, "médio"),
            Self::High => write!(f, "alto"),
        }
    }
}

/// What an alert is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    /// Stock is running low.
    Estoque,
    /// Old equipment is still installed.
    Antiguidade,
    /// Sites have gone without maintenance.
    Manutencao,
}

/// A dashboard alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    /// Alert category.
    pub kind: AlertKind,
    /// Severity.
    pub severity: Severity,
    /// Message shown to the user.
    pub message: String,
}

/// Event type in the activity feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    /// A unit was installed.
    Instalacao,
    /// A unit was taken into stock.
    Estoque,
    /// A unit was disposed of.
    Descarte,
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instalacao => write!(f, "Instalação"),
            Self::Estoque => write!(f, "Estoque"),
            Self::Descarte => write!(f, "Descarte"),
        }
    }
}

/// One entry in the recent-activity feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Activity {
    /// Event type.
    pub kind: ActivityKind,
    /// `"<tipo> - <sn>"`.
    pub label: String,
    /// Date as stored.
    pub date: String,
    /// Technician, possibly empty.
    pub technician: String,
    /// Site code, installations only.
    pub site: Option<String>,
}

/// Count for one peripheral type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindCount {
    /// Peripheral type.
    pub kind: PeripheralKind,
    /// Records in that type's installed collection.
    pub count: usize,
}

/// The computed dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    /// Date the figures are relative to.
    pub today: NaiveDate,
    /// Sum of the four installed collections.
    pub total_installed: usize,
    /// Installed count per collection.
    pub by_kind: Vec<KindCount>,
    /// Installed records dated in the current month.
    pub installed_this_month: usize,
    /// Distinct site codes among installed records.
    pub distinct_sites: usize,
    /// Distinct technicians among installed records.
    pub distinct_technicians: usize,
    /// Technicians named most often across installed, stock and disposal records.
    pub top_technicians: Vec<TechnicianCount>,
    /// Installed records older than [`AGING_YEARS`].
    pub aged_records: usize,
    /// Sites with no installation in the last [`MAINTENANCE_MONTHS`].
    pub stale_sites: usize,
    /// Stock collection length.
    pub stock_count: usize,
    /// Disposal collection length.
    pub disposal_count: usize,
    /// Active alerts.
    pub alerts: Vec<Alert>,
    /// Most recent events across all collections.
    pub recent_activity: Vec<Activity>,
}

impl Dashboard {
    /// Compute the dashboard for `today`.
    #[must_use]
    pub fn compute(inventory: &Inventory, today: NaiveDate) -> Self {
        let by_kind = PeripheralKind::ALL
            .into_iter()
            .map(|kind| KindCount {
                kind,
                count: inventory.installed_in(kind).len(),
            })
            .collect();

        let aged_records = stats::count_older_than(inventory.installed(), today, AGING_YEARS);
        let stale_sites = stats::stale_sites(inventory.installed(), today, MAINTENANCE_MONTHS);
        let alerts = build_alerts(inventory.stock.len(), aged_records, stale_sites);

        Self {
            today,
            total_installed: inventory.installed_count(),
            by_kind,
            installed_this_month: stats::count_in_month(inventory.installed(), today),
            distinct_sites: stats::distinct_sites(inventory.installed()),
            distinct_technicians: stats::distinct_technicians(inventory.installed()),
            top_technicians: stats::top_technicians(inventory.technicians(), TOP_TECHNICIANS),
            aged_records,
            stale_sites,
            stock_count: inventory.stock.len(),
            disposal_count: inventory.disposals.len(),
            alerts,
            recent_activity: recent_activity(inventory, RECENT_ACTIVITY_LIMIT),
        }
    }

    /// Alerts with the given severity.
    pub fn alerts_at(&self, severity: Severity) -> impl Iterator<Item = &Alert> + '_ {
        self.alerts.iter().filter(move |a| a.severity == severity)
    }
}

fn build_alerts(stock: usize, aged: usize, stale: usize) -> Vec<Alert> {
    let mut alerts = Vec::new();
    if stock < LOW_STOCK_THRESHOLD {
        alerts.push(Alert {
            kind: AlertKind::Estoque,
            severity: Severity::High,
            message: format!("Estoque baixo: {stock} itens disponíveis"),
        });
    }
    if aged > 0 {
        alerts.push(Alert {
            kind: AlertKind::Antiguidade,
            severity: Severity::Medium,
            message: format!("{aged} periféricos com mais de {AGING_YEARS} anos"),
        });
    }
    if stale > 0 {
        alerts.push(Alert {
            kind: AlertKind::Manutencao,
            severity: Severity::High,
            message: format!("{stale} UNCPs sem manutenção há mais de {MAINTENANCE_MONTHS} meses"),
        });
    }
    alerts
}

fn activity<T: Record>(kind: ActivityKind, record: &T) -> Activity {
    Activity {
        kind,
        label: format!("{} - {}", record.kind(), record.serial()),
        date: record.date().to_string(),
        technician: record.technician().to_string(),
        site: record.site().map(|s| s.as_str().to_string()),
    }
}

/// The `limit` newest events, newest first. Undated events sort last.
#[must_use]
pub fn recent_activity(inventory: &Inventory, limit: usize) -> Vec<Activity> {
    let mut events: Vec<(Option<NaiveDate>, Activity)> = inventory
        .installed()
        .map(|r| (r.parsed_date(), activity(ActivityKind::Instalacao, r)))
        .chain(
            inventory
                .disposals
                .iter()
                .map(|r| (r.parsed_date(), activity(ActivityKind::Descarte, r))),
        )
        .chain(
            inventory
                .stock
                .iter()
                .map(|r| (r.parsed_date(), activity(ActivityKind::Estoque, r))),
        )
        .collect();

    // `None` orders before `Some`, so reversing the key puts undated events last.
    events.sort_by(|a, b| b.0.cmp(&a.0));
    events
        .into_iter()
        .take(limit)
        .map(|(_, activity)| activity)
        .collect()
}
