mod engine;
mod solver;
mod tables;
mod types;

pub use engine::{breakdown, compute, compute_default, split_for_display};
pub use solver::{TermSelection, select_term, term_candidates};
pub use tables::{RateTables, RegionRate, TablesError, TermCoefficient};
pub use types::{Breakdown, BuyerMode, DisplayQuote, Quote, QuoteInput, TermCandidate};
