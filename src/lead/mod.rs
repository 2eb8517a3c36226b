//! Lead intake: the calculator wizard's contact and property fields, checked
//! the way the wizard gates its steps, then forwarded with the computed
//! quote to the lead-processing webhook.

mod webhook;

use std::sync::LazyLock;

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::core::{BuyerMode, Quote, QuoteInput, RateTables, compute};

pub use webhook::{SubmitError, WebhookClient};

const MIN_PHONE_DIGITS: usize = 9;

/// Country prefixes offered by the wizard, longest first.
const COUNTRY_PREFIXES: [&str; 7] = ["+351", "+34", "+33", "+44", "+39", "+49", "+1"];

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LeadError {
    #[error("name is required")]
    EmptyName,
    #[error("email address is not valid")]
    InvalidEmail,
    #[error("phone number needs at least 9 digits")]
    InvalidPhone,
    #[error("community is required")]
    MissingCommunity,
    #[error("age must be > 0")]
    InvalidAge,
    #[error("price must be a positive amount")]
    InvalidPrice,
}

/// Missing fields deserialize to empty values so `validate` reports them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LeadForm {
    pub name: String,
    pub email: String,
    /// Country prefix and national number, e.g. `+34 612 345 678`.
    pub phone: String,
    #[serde(serialize_with = "serialize_amount")]
    pub price: f64,
    pub community: String,
    pub buying_with: BuyerMode,
    pub age: u32,
}

impl LeadForm {
    pub fn validate(&self) -> Result<(), LeadError> {
        if self.name.trim().is_empty() {
            return Err(LeadError::EmptyName);
        }
        if !is_valid_email(&self.email) {
            return Err(LeadError::InvalidEmail);
        }
        if national_digit_count(&self.phone) < MIN_PHONE_DIGITS {
            return Err(LeadError::InvalidPhone);
        }
        if self.community.trim().is_empty() {
            return Err(LeadError::MissingCommunity);
        }
        if self.age == 0 {
            return Err(LeadError::InvalidAge);
        }
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(LeadError::InvalidPrice);
        }
        Ok(())
    }

    pub fn quote_input(&self) -> QuoteInput {
        QuoteInput::new(self.price, self.community.clone(), self.age)
    }

    /// Validates the form and attaches the quote it produces.
    pub fn prepare(
        self,
        tables: &RateTables,
        submitted_at: DateTime<Utc>,
    ) -> Result<LeadPayload, LeadError> {
        self.validate()?;
        let quote = compute(tables, &self.quote_input());
        Ok(LeadPayload::new(self, &quote, submitted_at))
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Digits of the national number. A known country prefix is stripped whether
/// or not a space follows it; any other `+` prefix must be separated by
/// whitespace.
pub fn national_digit_count(phone: &str) -> usize {
    let trimmed = phone.trim();
    let national = match COUNTRY_PREFIXES
        .iter()
        .find_map(|prefix| trimmed.strip_prefix(prefix))
    {
        Some(rest) => rest,
        None if trimmed.starts_with('+') => trimmed
            .split_once(char::is_whitespace)
            .map(|(_, number)| number)
            .unwrap_or(""),
        None => trimmed,
    };
    national.chars().filter(char::is_ascii_digit).count()
}

/// Result keys as the lead-processing flow reads them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculatedResults {
    pub traditional_down_payment: i64,
    #[serde(rename = "formulaHogarDownPayment")]
    pub optimized_down_payment: i64,
    pub savings: i64,
    #[serde(rename = "monthlyPayment")]
    pub monthly_rent_equivalent: i64,
    #[serde(rename = "months")]
    pub chosen_term_months: u32,
}

impl From<&Quote> for CalculatedResults {
    fn from(quote: &Quote) -> Self {
        Self {
            traditional_down_payment: quote.traditional_down_payment,
            optimized_down_payment: quote.optimized_down_payment,
            savings: quote.savings,
            monthly_rent_equivalent: quote.monthly_rent_equivalent,
            chosen_term_months: quote.chosen_term_months,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadPayload {
    #[serde(flatten)]
    pub form: LeadForm,
    pub calculated_results: CalculatedResults,
    #[serde(serialize_with = "serialize_millis")]
    pub submitted_at: DateTime<Utc>,
}

impl LeadPayload {
    pub fn new(form: LeadForm, quote: &Quote, submitted_at: DateTime<Utc>) -> Self {
        Self {
            form,
            calculated_results: quote.into(),
            submitted_at,
        }
    }
}

/// Whole amounts go out as integers, e.g. `200000` rather than `200000.0`.
fn serialize_amount<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

fn serialize_millis<S: Serializer>(
    value: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
}
