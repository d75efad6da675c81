//! Shared domain types.
//!
//! These are the shapes that flow between the source adapters, the
//! integrator, the fuel-file ingestor and the feature builder. They stay
//! small and serializable so the persisted CSV artifacts can be reloaded
//! without any translation layer.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Macro variables carried by the integrated dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MacroVariable {
    ExchangeRate,
    InflationIndex,
    BrentPrice,
    WtiPrice,
    PolicyRate,
}

impl MacroVariable {
    /// Column name in the integrated dataset (and feature name at inference).
    pub fn column(self) -> &'static str {
        match self {
            MacroVariable::ExchangeRate => "exchange_rate",
            MacroVariable::InflationIndex => "inflation_index",
            MacroVariable::BrentPrice => "brent_price",
            MacroVariable::WtiPrice => "wti_price",
            MacroVariable::PolicyRate => "policy_rate",
        }
    }
}

/// One `(date, value)` point produced by a source adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct RawObservation {
    pub timestamp: NaiveDate,
    pub value: f64,
    pub source_tag: String,
}

impl RawObservation {
    pub fn new(timestamp: NaiveDate, value: f64, source_tag: impl Into<String>) -> Self {
        Self {
            timestamp,
            value,
            source_tag: source_tag.into(),
        }
    }
}

/// A single-variable series: chronological, one value per date.
#[derive(Debug, Clone, PartialEq)]
pub struct MacroSeries {
    tag: String,
    observations: Vec<RawObservation>,
}

impl MacroSeries {
    /// Build a series from observations in any order.
    ///
    /// Observations tagged differently are ignored. When a date repeats, the
    /// observation seen last wins.
    pub fn new(tag: impl Into<String>, observations: impl IntoIterator<Item = RawObservation>) -> Self {
        let tag = tag.into();
        let mut by_date: BTreeMap<NaiveDate, RawObservation> = BTreeMap::new();
        for obs in observations {
            if obs.source_tag == tag {
                by_date.insert(obs.timestamp, obs);
            }
        }
        Self {
            tag,
            observations: by_date.into_values().collect(),
        }
    }

    pub fn empty(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            observations: Vec::new(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn observations(&self) -> &[RawObservation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// Inclusive date range for a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Products kept in the unified fuel dataset.
pub const RECOGNIZED_PRODUCTS: [&str; 3] = ["GASOLINA", "DIESEL", "ETANOL"];

pub const UNKNOWN_STREET_NUMBER: &str = "Desconhecido";
pub const UNKNOWN_NEIGHBORHOOD: &str = "Bairro Não Informado";
pub const UNKNOWN_BRAND: &str = "Bandeira Não Informada";

/// One retail price observation from the regulator's survey files.
///
/// Field names on disk keep the survey's own column vocabulary so the
/// unified CSV reads the same as the raw exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelPriceRecord {
    #[serde(rename = "Regiao - Sigla")]
    pub region_code: String,
    #[serde(rename = "Estado - Sigla")]
    pub state_code: String,
    #[serde(rename = "Municipio")]
    pub municipality: String,
    #[serde(rename = "Revenda", default)]
    pub reseller: Option<String>,
    #[serde(rename = "Nome da Rua", default)]
    pub street: Option<String>,
    #[serde(rename = "Numero Rua")]
    pub street_number: String,
    #[serde(rename = "Bairro")]
    pub neighborhood: String,
    #[serde(rename = "Cep", default)]
    pub zip_code: Option<String>,
    #[serde(rename = "Produto")]
    pub product: String,
    #[serde(rename = "Data da Coleta")]
    pub collection_date: NaiveDate,
    #[serde(rename = "Valor de Venda")]
    pub sale_price: f64,
    #[serde(rename = "Unidade de Medida", default)]
    pub unit: Option<String>,
    #[serde(rename = "Bandeira")]
    pub brand: String,
}

/// A categorical filter that is either a concrete label or "everything".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Only(String),
}

impl Selection {
    /// Parse a UI label; the survey's "Todos"/"Todas" (and an empty string)
    /// mean no filter.
    pub fn parse(label: &str) -> Self {
        let trimmed = label.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("todos") || trimmed.eq_ignore_ascii_case("todas") {
            Selection::All
        } else {
            Selection::Only(trimmed.to_string())
        }
    }

    pub fn as_label(&self) -> Option<&str> {
        match self {
            Selection::All => None,
            Selection::Only(label) => Some(label),
        }
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(label) => label == value,
        }
    }
}

/// The categorical choices of one prediction or history request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoricalSelections {
    pub product: String,
    pub state: Selection,
    pub municipality: Selection,
    pub brand: Selection,
}

impl CategoricalSelections {
    pub fn product_only(product: impl Into<String>) -> Self {
        Self {
            product: product.into(),
            state: Selection::All,
            municipality: Selection::All,
            brand: Selection::All,
        }
    }

    /// Without a state there is no municipality to pick: a municipality
    /// chosen under "all states" is reset to all.
    pub fn normalized(&self) -> Self {
        let mut out = self.clone();
        if out.state == Selection::All {
            out.municipality = Selection::All;
        }
        out
    }

    /// Whether a fuel record falls under these filters.
    pub fn matches(&self, record: &FuelPriceRecord) -> bool {
        record.product == self.product
            && self.state.matches(&record.state_code)
            && self.municipality.matches(&record.municipality)
            && self.brand.matches(&record.brand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn macro_series_sorts_and_keeps_last_duplicate() {
        let series = MacroSeries::new(
            "exchange_rate",
            vec![
                RawObservation::new(d(2024, 1, 3), 5.0, "exchange_rate"),
                RawObservation::new(d(2024, 1, 1), 4.9, "exchange_rate"),
                RawObservation::new(d(2024, 1, 3), 5.1, "exchange_rate"),
                RawObservation::new(d(2024, 1, 2), 9.9, "policy_rate"),
            ],
        );

        let dates: Vec<_> = series.observations().iter().map(|o| o.timestamp).collect();
        assert_eq!(dates, vec![d(2024, 1, 1), d(2024, 1, 3)]);
        assert!((series.observations()[1].value - 5.1).abs() < 1e-12);
    }

    #[test]
    fn selection_parses_unselected_sentinels() {
        assert_eq!(Selection::parse("Todos"), Selection::All);
        assert_eq!(Selection::parse("Todas"), Selection::All);
        assert_eq!(Selection::parse("  "), Selection::All);
        assert_eq!(Selection::parse(" SP "), Selection::Only("SP".to_string()));
    }
}
