use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const SPANISH_TRANSFER_TAX: [(&str, f64); 19] = [
    ("Andalucía", 0.07),
    ("Aragón", 0.09),
    ("Asturias", 0.09),
    ("Islas Baleares", 0.11),
    ("Canarias", 0.065),
    ("Cantabria", 0.09),
    ("Castilla-La Mancha", 0.09),
    ("Castilla y León", 0.09),
    ("Cataluña", 0.11),
    ("Ceuta", 0.06),
    ("Madrid", 0.06),
    ("Comunidad Valenciana", 0.11),
    ("Extremadura", 0.10),
    ("Galicia", 0.08),
    ("La Rioja", 0.07),
    ("Melilla", 0.06),
    ("Murcia", 0.08),
    ("Navarra", 0.06),
    ("País Vasco", 0.07),
];

const ADVANCE_TERMS: [(u32, f64); 5] = [
    (12, 0.80),
    (24, 0.70),
    (36, 0.70),
    (48, 0.65),
    (60, 0.60),
];

const DEFAULT_TRANSFER_TAX: f64 = 0.06;
const NOTARY_FEE: f64 = 0.01;
const COMMISSION: f64 = 0.03;
const GROSS_YIELD: f64 = 0.05;
const YOUNG_BUYER_AGE: u32 = 30;
const YOUNG_BUYER_FRACTION: f64 = 0.10;
const STANDARD_FRACTION: f64 = 0.20;

#[derive(Debug, Error)]
pub enum TablesError {
    #[error("failed to read rate tables from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid rate tables JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid rate tables: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RegionRate {
    pub name: String,
    pub rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct TermCoefficient {
    pub months: u32,
    pub coefficient: f64,
}

/// Every constant the optimizer reads. Fields missing from a JSON override
/// keep their built-in value.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RateTables {
    pub regions: Vec<RegionRate>,
    pub default_transfer_tax: f64,
    pub notary_fee: f64,
    pub commission: f64,
    pub gross_yield: f64,
    /// Buyers strictly younger than this get `young_buyer_fraction`.
    pub young_buyer_age: u32,
    pub young_buyer_fraction: f64,
    pub standard_fraction: f64,
    /// Scanned in order; must be strictly ascending by `months`.
    pub terms: Vec<TermCoefficient>,
}

impl Default for RateTables {
    fn default() -> Self {
        Self::spanish()
    }
}

impl RateTables {
    pub fn spanish() -> Self {
        Self {
            regions: SPANISH_TRANSFER_TAX
                .iter()
                .map(|&(name, rate)| RegionRate {
                    name: name.to_string(),
                    rate,
                })
                .collect(),
            default_transfer_tax: DEFAULT_TRANSFER_TAX,
            notary_fee: NOTARY_FEE,
            commission: COMMISSION,
            gross_yield: GROSS_YIELD,
            young_buyer_age: YOUNG_BUYER_AGE,
            young_buyer_fraction: YOUNG_BUYER_FRACTION,
            standard_fraction: STANDARD_FRACTION,
            terms: ADVANCE_TERMS
                .iter()
                .map(|&(months, coefficient)| TermCoefficient {
                    months,
                    coefficient,
                })
                .collect(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, TablesError> {
        let tables: RateTables = serde_json::from_str(json)?;
        tables.validate()?;
        Ok(tables)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TablesError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| TablesError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Transfer-tax rate for `region`; unknown names get the default rate.
    pub fn transfer_tax_rate(&self, region: &str) -> f64 {
        self.regions
            .iter()
            .find(|r| r.name == region)
            .map(|r| r.rate)
            .unwrap_or(self.default_transfer_tax)
    }

    pub fn bank_down_payment_fraction(&self, buyer_age: u32) -> f64 {
        if buyer_age < self.young_buyer_age {
            self.young_buyer_fraction
        } else {
            self.standard_fraction
        }
    }

    /// Term used when no term keeps the down payment non-negative: the
    /// shortest configured one.
    pub fn fallback_term(&self) -> TermCoefficient {
        self.terms.first().copied().unwrap_or(TermCoefficient {
            months: ADVANCE_TERMS[0].0,
            coefficient: ADVANCE_TERMS[0].1,
        })
    }

    pub fn validate(&self) -> Result<(), TablesError> {
        if self.terms.is_empty() {
            return Err(TablesError::Invalid("terms must not be empty".to_string()));
        }

        let mut previous = 0u32;
        for term in &self.terms {
            if term.months == 0 {
                return Err(TablesError::Invalid("term months must be > 0".to_string()));
            }
            if term.months <= previous {
                return Err(TablesError::Invalid(format!(
                    "terms must be strictly ascending, got {} after {previous}",
                    term.months
                )));
            }
            check_non_negative(
                &format!("coefficient for {} months", term.months),
                term.coefficient,
            )?;
            previous = term.months;
        }

        for (idx, region) in self.regions.iter().enumerate() {
            if region.name.trim().is_empty() {
                return Err(TablesError::Invalid("region name must not be empty".to_string()));
            }
            if self.regions[..idx].iter().any(|r| r.name == region.name) {
                return Err(TablesError::Invalid(format!(
                    "duplicate region {}",
                    region.name
                )));
            }
            check_non_negative(&format!("rate for {}", region.name), region.rate)?;
        }

        for (name, value) in [
            ("defaultTransferTax", self.default_transfer_tax),
            ("notaryFee", self.notary_fee),
            ("commission", self.commission),
            ("grossYield", self.gross_yield),
        ] {
            check_non_negative(name, value)?;
        }

        for (name, value) in [
            ("youngBuyerFraction", self.young_buyer_fraction),
            ("standardFraction", self.standard_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(TablesError::Invalid(format!(
                    "{name} must be between 0 and 1"
                )));
            }
        }

        Ok(())
    }
}

fn check_non_negative(name: &str, value: f64) -> Result<(), TablesError> {
    if !value.is_finite() || value < 0.0 {
        return Err(TablesError::Invalid(format!(
            "{name} must be finite and >= 0"
        )));
    }
    Ok(())
}
