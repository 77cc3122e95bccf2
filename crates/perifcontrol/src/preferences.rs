//! User preferences stored alongside the collections.
//!
//! Preferences live in the store under [`PREFERENCES_KEY`] as one flat JSON
//! object. They supply the default technician for new records, the default
//! listing size and order, and whether the dashboard shows alerts.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::record::fold;

/// Storage key of the preferences object.
pub const PREFERENCES_KEY: &str = "configuracoesUsuario";

/// Allowed values for items per page.
pub const ITEMS_PER_PAGE_CHOICES: [usize; 4] = [5, 10, 20, 50];

/// Field used to order record listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortField {
    /// By date, newest first.
    #[default]
    #[serde(rename = "data")]
    Date,
    /// By peripheral type.
    #[serde(rename = "tipo")]
    Kind,
    /// By site code.
    #[serde(rename = "uncp")]
    Site,
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date => write!(f, "data"),
            Self::Kind => write!(f, "tipo"),
            Self::Site => write!(f, "uncp"),
        }
    }
}

impl FromStr for SortField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match fold(s).as_str() {
            "data" | "date" => Ok(Self::Date),
            "tipo" | "type" => Ok(Self::Kind),
            "uncp" | "site" => Ok(Self::Site),
            _ => Err(Error::unknown_variant("ordenacao", s)),
        }
    }
}

/// Display settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayPreferences {
    /// Show dashboard alerts.
    #[serde(rename = "mostrarAlertas")]
    pub show_alerts: bool,
    /// Default number of records per listing.
    #[serde(rename = "itensPorPagina")]
    pub items_per_page: usize,
    /// Default listing order.
    #[serde(rename = "ordenacao")]
    pub sort: SortField,
}

impl Default for DisplayPreferences {
    fn default() -> Self {
        Self {
            show_alerts: true,
            items_per_page: 10,
            sort: SortField::Date,
        }
    }
}

/// The stored preferences object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferences {
    /// Technician filled in when a command omits one.
    #[serde(rename = "tecnicoPadrao")]
    pub default_technician: String,
    /// Notification e-mail, may be empty.
    pub email: String,
    /// Display settings.
    #[serde(rename = "exibicao")]
    pub display: DisplayPreferences,
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid e-mail pattern")
    })
}

impl UserPreferences {
    /// Validate before saving.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed e-mail or an items-per-page
    /// value outside [`ITEMS_PER_PAGE_CHOICES`].
    pub fn validate(&self) -> Result<()> {
        if !self.email.is_empty() && !email_pattern().is_match(&self.email) {
            return Err(Error::validation(
                "email",
                format!("'{}' is not an e-mail address", self.email),
            ));
        }
        if !ITEMS_PER_PAGE_CHOICES.contains(&self.display.items_per_page) {
            return Err(Error::validation(
                "itensPorPagina",
                format!(
                    "{} is not one of {:?}",
                    self.display.items_per_page, ITEMS_PER_PAGE_CHOICES
                ),
            ));
        }
        Ok(())
    }

    /// `explicit` if non-empty, otherwise the default technician.
    #[must_use]
    pub fn technician_or_default(&self, explicit: Option<&str>) -> String {
        match explicit.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.default_technician.clone(),
        }
    }
}
