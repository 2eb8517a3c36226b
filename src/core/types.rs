use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuyerMode {
    #[default]
    Alone,
    Partner,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuoteInput {
    pub price: f64,
    pub region: String,
    pub buyer_age: u32,
}

impl QuoteInput {
    pub fn new(price: f64, region: impl Into<String>, buyer_age: u32) -> Self {
        Self {
            price,
            region: region.into(),
            buyer_age,
        }
    }
}

/// Result of one optimizer run. Currency fields are whole units.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub traditional_down_payment: i64,
    pub optimized_down_payment: i64,
    pub savings: i64,
    pub monthly_rent_equivalent: i64,
    pub chosen_term_months: u32,
    /// Set when no term kept the down payment non-negative and the shortest
    /// term was taken unchecked. `optimized_down_payment` can then be negative.
    pub used_fallback: bool,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayQuote {
    pub traditional_down_payment: i64,
    pub optimized_down_payment: i64,
    pub savings: i64,
    pub monthly_rent_equivalent: i64,
    pub chosen_term_months: u32,
    pub per_person: bool,
}

/// Unrounded intermediates of a single computation.
#[derive(Debug, Clone, Copy)]
pub struct Breakdown {
    pub total_cost_fraction: f64,
    pub total_acquisition_cost: f64,
    pub bank_down_payment_fraction: f64,
    pub traditional_down_payment: f64,
    pub monthly_rent_equivalent: f64,
    pub guarantee: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TermCandidate {
    pub term_months: u32,
    pub advance: f64,
    pub down_payment: f64,
}
