use super::tables::{RateTables, TermCoefficient};
use super::types::TermCandidate;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TermSelection {
    pub chosen: TermCandidate,
    pub used_fallback: bool,
}

fn evaluate_term(
    term: TermCoefficient,
    traditional_down_payment: f64,
    monthly_rent_equivalent: f64,
    guarantee: f64,
) -> TermCandidate {
    let advance = term.months as f64 * term.coefficient * monthly_rent_equivalent - guarantee;
    TermCandidate {
        term_months: term.months,
        advance,
        down_payment: traditional_down_payment - advance,
    }
}

pub fn term_candidates(
    tables: &RateTables,
    traditional_down_payment: f64,
    monthly_rent_equivalent: f64,
    guarantee: f64,
) -> impl Iterator<Item = TermCandidate> + '_ {
    tables.terms.iter().map(move |&term| {
        evaluate_term(
            term,
            traditional_down_payment,
            monthly_rent_equivalent,
            guarantee,
        )
    })
}

/// Scans terms in table order and keeps the first feasible candidate with
/// the strictly smallest down payment. A later term that only ties does not
/// replace an earlier one.
pub fn select_term(
    tables: &RateTables,
    traditional_down_payment: f64,
    monthly_rent_equivalent: f64,
    guarantee: f64,
) -> TermSelection {
    let mut smallest = f64::INFINITY;
    let mut best = None;

    for candidate in term_candidates(
        tables,
        traditional_down_payment,
        monthly_rent_equivalent,
        guarantee,
    ) {
        if candidate.down_payment >= 0.0 && candidate.down_payment < smallest {
            smallest = candidate.down_payment;
            best = Some(candidate);
        }
    }

    match best {
        Some(chosen) => TermSelection {
            chosen,
            used_fallback: false,
        },
        // No feasibility check here: the result may be negative.
        None => TermSelection {
            chosen: evaluate_term(
                tables.fallback_term(),
                traditional_down_payment,
                monthly_rent_equivalent,
                guarantee,
            ),
            used_fallback: true,
        },
    }
}
