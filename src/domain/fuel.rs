//! The unified fuel-price dataset and the queries run against it.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::domain::{CategoricalSelections, FuelPriceRecord};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UnifiedFuelDataset {
    records: Vec<FuelPriceRecord>,
}

/// Descriptive statistics of sale prices.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSummary {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    pub max: f64,
}

impl UnifiedFuelDataset {
    pub fn new(records: Vec<FuelPriceRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[FuelPriceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Average sale price per collection date for the matching records,
    /// oldest first.
    pub fn historical_series(&self, filters: &CategoricalSelections) -> Vec<(NaiveDate, f64)> {
        let mut by_date: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
        for r in self.records.iter().filter(|r| filters.matches(r)) {
            let slot = by_date.entry(r.collection_date).or_insert((0.0, 0));
            slot.0 += r.sale_price;
            slot.1 += 1;
        }
        by_date
            .into_iter()
            .map(|(date, (sum, n))| (date, sum / n as f64))
            .collect()
    }

    pub fn products(&self) -> Vec<String> {
        distinct(self.records.iter().map(|r| r.product.as_str()))
    }

    pub fn states_for(&self, product: &str) -> Vec<String> {
        distinct(
            self.records
                .iter()
                .filter(|r| r.product == product)
                .map(|r| r.state_code.as_str()),
        )
    }

    pub fn municipalities_for(&self, product: &str, state: &str) -> Vec<String> {
        distinct(
            self.records
                .iter()
                .filter(|r| r.product == product && r.state_code == state)
                .map(|r| r.municipality.as_str()),
        )
    }

    pub fn brands(&self) -> Vec<String> {
        distinct(self.records.iter().map(|r| r.brand.as_str()))
    }

    /// Per-field count of missing values (empty text or absent optional).
    pub fn missing_counts(&self) -> Vec<(&'static str, usize)> {
        fn count<F: Fn(&FuelPriceRecord) -> bool>(rs: &[FuelPriceRecord], f: F) -> usize {
            rs.iter().filter(|r| f(r)).count()
        }
        let rs = self.records.as_slice();
        vec![
            ("Regiao - Sigla", count(rs, |r| r.region_code.is_empty())),
            ("Estado - Sigla", count(rs, |r| r.state_code.is_empty())),
            ("Municipio", count(rs, |r| r.municipality.is_empty())),
            ("Revenda", count(rs, |r| r.reseller.is_none())),
            ("Nome da Rua", count(rs, |r| r.street.is_none())),
            ("Numero Rua", count(rs, |r| r.street_number.is_empty())),
            ("Bairro", count(rs, |r| r.neighborhood.is_empty())),
            ("Cep", count(rs, |r| r.zip_code.is_none())),
            ("Produto", count(rs, |r| r.product.is_empty())),
            ("Data da Coleta", 0),
            ("Valor de Venda", 0),
            ("Unidade de Medida", count(rs, |r| r.unit.is_none())),
            ("Bandeira", count(rs, |r| r.brand.is_empty())),
        ]
    }

    pub fn price_summary(&self) -> Option<PriceSummary> {
        let mut prices: Vec<f64> = self.records.iter().map(|r| r.sale_price).collect();
        if prices.is_empty() {
            return None;
        }
        prices.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let n = prices.len() as f64;
        let mean = prices.iter().sum::<f64>() / n;
        // Sample standard deviation (n-1), undefined for a single value.
        let std = if prices.len() > 1 {
            (prices.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
        } else {
            f64::NAN
        };

        Some(PriceSummary {
            count: prices.len(),
            mean,
            std,
            min: prices[0],
            p25: quantile(&prices, 0.25),
            median: quantile(&prices, 0.5),
            p75: quantile(&prices, 0.75),
            max: prices[prices.len() - 1],
        })
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Linear interpolation between closest ranks; `sorted` must be ascending.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Selection;

    fn record(state: &str, city: &str, product: &str, brand: &str, day: u32, price: f64) -> FuelPriceRecord {
        FuelPriceRecord {
            region_code: "SE".to_string(),
            state_code: state.to_string(),
            municipality: city.to_string(),
            reseller: None,
            street: None,
            street_number: "100".to_string(),
            neighborhood: "CENTRO".to_string(),
            zip_code: None,
            product: product.to_string(),
            collection_date: NaiveDate::from_ymd_opt(2024, 2, day).unwrap(),
            sale_price: price,
            unit: None,
            brand: brand.to_string(),
        }
    }

    fn dataset() -> UnifiedFuelDataset {
        UnifiedFuelDataset::new(vec![
            record("SP", "SANTOS", "GASOLINA", "IPIRANGA", 2, 5.80),
            record("SP", "SANTOS", "GASOLINA", "SHELL", 2, 6.00),
            record("SP", "CAMPINAS", "GASOLINA", "SHELL", 1, 5.70),
            record("RJ", "NITEROI", "GASOLINA", "BRANCA", 1, 6.10),
            record("RJ", "NITEROI", "ETANOL", "BRANCA", 1, 4.20),
        ])
    }

    #[test]
    fn historical_series_averages_per_date() {
        let filters = CategoricalSelections {
            product: "GASOLINA".to_string(),
            state: Selection::Only("SP".to_string()),
            municipality: Selection::All,
            brand: Selection::All,
        };
        let series = dataset().historical_series(&filters);

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].0, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert!((series[0].1 - 5.70).abs() < 1e-9);
        assert!((series[1].1 - 5.90).abs() < 1e-9);
    }

    #[test]
    fn selection_domains_follow_the_filters() {
        let ds = dataset();
        assert_eq!(ds.products(), vec!["ETANOL", "GASOLINA"]);
        assert_eq!(ds.states_for("ETANOL"), vec!["RJ"]);
        assert_eq!(ds.municipalities_for("GASOLINA", "SP"), vec!["CAMPINAS", "SANTOS"]);
        assert_eq!(ds.brands(), vec!["BRANCA", "IPIRANGA", "SHELL"]);
    }

    #[test]
    fn price_summary_quartiles() {
        let summary = dataset().price_summary().unwrap();
        assert_eq!(summary.count, 5);
        assert!((summary.min - 4.20).abs() < 1e-12);
        assert!((summary.median - 5.80).abs() < 1e-12);
        assert!((summary.p25 - 5.70).abs() < 1e-12);
        assert!((summary.max - 6.10).abs() < 1e-12);
        assert!(UnifiedFuelDataset::default().price_summary().is_none());
    }
}
