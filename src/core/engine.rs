use super::solver::select_term;
use super::tables::RateTables;
use super::types::{Breakdown, BuyerMode, DisplayQuote, Quote, QuoteInput};

const MONTHS_PER_YEAR: f64 = 12.0;

/// Unrounded cost and rent figures that feed the term scan.
pub fn breakdown(tables: &RateTables, input: &QuoteInput) -> Breakdown {
    let total_cost_fraction =
        tables.transfer_tax_rate(&input.region) + tables.notary_fee + tables.commission;
    let total_acquisition_cost = input.price * (1.0 + total_cost_fraction);
    let bank_down_payment_fraction = tables.bank_down_payment_fraction(input.buyer_age);
    let traditional_down_payment = total_acquisition_cost * bank_down_payment_fraction;

    let monthly_rent_equivalent = input.price * tables.gross_yield / MONTHS_PER_YEAR;

    Breakdown {
        total_cost_fraction,
        total_acquisition_cost,
        bank_down_payment_fraction,
        traditional_down_payment,
        monthly_rent_equivalent,
        // One month of rent is held back as guarantee.
        guarantee: monthly_rent_equivalent,
    }
}

/// Compares the bank's down payment with the lowest one reachable through a
/// rent advance. Pure and total: unknown regions use the default rate and no
/// input is rejected.
pub fn compute(tables: &RateTables, input: &QuoteInput) -> Quote {
    let b = breakdown(tables, input);
    let selection = select_term(
        tables,
        b.traditional_down_payment,
        b.monthly_rent_equivalent,
        b.guarantee,
    );

    let traditional_down_payment = round_currency(b.traditional_down_payment);
    let optimized_down_payment = round_currency(selection.chosen.down_payment);

    Quote {
        traditional_down_payment,
        optimized_down_payment,
        savings: traditional_down_payment - optimized_down_payment,
        monthly_rent_equivalent: round_currency(b.monthly_rent_equivalent),
        chosen_term_months: selection.chosen.term_months,
        used_fallback: selection.used_fallback,
    }
}

pub fn compute_default(price: f64, region: &str, buyer_age: u32) -> Quote {
    compute(&RateTables::spanish(), &QuoteInput::new(price, region, buyer_age))
}

/// Per-person figures for co-buyers: each amount halved and floored. The
/// term is shared and left alone.
pub fn split_for_display(quote: &Quote, mode: BuyerMode) -> DisplayQuote {
    let per_person = mode == BuyerMode::Partner;
    let share = |value: i64| if per_person { value.div_euclid(2) } else { value };

    DisplayQuote {
        traditional_down_payment: share(quote.traditional_down_payment),
        optimized_down_payment: share(quote.optimized_down_payment),
        savings: share(quote.savings),
        monthly_rent_equivalent: share(quote.monthly_rent_equivalent),
        chosen_term_months: quote.chosen_term_months,
        per_person,
    }
}

// f64::round is half away from zero; `as` saturates and maps NaN to 0.
fn round_currency(value: f64) -> i64 {
    value.round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tables::TermCoefficient;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_quote(savings: i64) -> Quote {
        Quote {
            traditional_down_payment: 44_001,
            optimized_down_payment: 44_001 - savings,
            savings,
            monthly_rent_equivalent: 833,
            chosen_term_months: 60,
            used_fallback: false,
        }
    }

    #[test]
    fn madrid_worked_example() {
        let quote = compute_default(200_000.0, "Madrid", 30);
        assert_eq!(quote.traditional_down_payment, 44_000);
        assert_eq!(quote.monthly_rent_equivalent, 833);
        assert_eq!(quote.chosen_term_months, 60);
        assert_eq!(quote.optimized_down_payment, 14_833);
        assert_eq!(quote.savings, 29_167);
        assert!(!quote.used_fallback);
    }

    #[test]
    fn madrid_breakdown_intermediates() {
        let b = breakdown(&RateTables::spanish(), &QuoteInput::new(200_000.0, "Madrid", 30));
        assert_approx(b.total_cost_fraction, 0.10);
        assert_approx(b.total_acquisition_cost, 220_000.0);
        assert_approx(b.bank_down_payment_fraction, 0.20);
        assert_approx(b.traditional_down_payment, 44_000.0);
        assert_approx(b.monthly_rent_equivalent, 10_000.0 / 12.0);
        assert_eq!(b.guarantee, b.monthly_rent_equivalent);
    }

    #[test]
    fn young_buyer_halves_bank_fraction_and_shortens_term() {
        let quote = compute_default(200_000.0, "Madrid", 29);
        assert_eq!(quote.traditional_down_payment, 22_000);
        // 48 and 60 months advance more than 22000; 36 is the best feasible.
        assert_eq!(quote.chosen_term_months, 36);
        assert_eq!(quote.optimized_down_payment, 1_833);
        assert_eq!(quote.savings, 20_167);
    }

    #[test]
    fn higher_tax_region_raises_traditional_down_payment() {
        let quote = compute_default(300_000.0, "Cataluña", 45);
        assert_eq!(quote.traditional_down_payment, 69_000);
        assert_eq!(quote.monthly_rent_equivalent, 1_250);
        assert_eq!(quote.chosen_term_months, 60);
        assert_eq!(quote.optimized_down_payment, 25_250);
        assert_eq!(quote.savings, 43_750);
    }

    #[test]
    fn every_region_uses_standard_fraction_at_thirty() {
        let tables = RateTables::spanish();
        for region in &tables.regions {
            let quote = compute(&tables, &QuoteInput::new(200_000.0, region.name.clone(), 30));
            let expected =
                (200_000.0 * (1.0 + (region.rate + 0.01 + 0.03)) * 0.20).round() as i64;
            assert_eq!(
                quote.traditional_down_payment, expected,
                "region {}",
                region.name
            );
            assert_eq!(quote.monthly_rent_equivalent, 833);
        }
    }

    #[test]
    fn unknown_region_matches_default_rate() {
        let tables = RateTables::spanish();
        let reference = RateTables {
            regions: Vec::new(),
            ..RateTables::spanish()
        };
        for region in ["Atlantis", "", "madrid", "  Madrid "] {
            for age in [22, 30, 64] {
                let input = QuoteInput::new(250_000.0, region, age);
                assert_eq!(compute(&tables, &input), compute(&reference, &input));
            }
        }
    }

    #[test]
    fn fallback_can_yield_negative_down_payment() {
        let tables = RateTables {
            terms: [12, 24, 36, 48, 60]
                .into_iter()
                .map(|months| TermCoefficient {
                    months,
                    coefficient: 5.0,
                })
                .collect(),
            ..RateTables::spanish()
        };
        let quote = compute(&tables, &QuoteInput::new(200_000.0, "Madrid", 30));

        assert!(quote.used_fallback);
        assert_eq!(quote.chosen_term_months, 12);
        // 44000 - (12 * 5 - 1) * 833.33
        assert_eq!(quote.optimized_down_payment, -5_167);
        assert_eq!(quote.savings, 49_167);
        assert!(quote.savings > quote.traditional_down_payment);
    }

    #[test]
    fn negative_price_takes_fallback_with_default_tables() {
        let quote = compute_default(-100_000.0, "Madrid", 30);
        assert!(quote.used_fallback);
        assert_eq!(quote.chosen_term_months, 12);
        assert_eq!(quote.traditional_down_payment, -22_000);
        assert_eq!(quote.optimized_down_payment, -18_417);
        assert_eq!(quote.savings, -3_583);
    }

    #[test]
    fn non_finite_price_does_not_panic() {
        let quote = compute_default(f64::NAN, "Madrid", 30);
        assert!(quote.used_fallback);
        assert_eq!(quote.traditional_down_payment, 0);
        let quote = compute_default(f64::INFINITY, "Madrid", 30);
        assert_eq!(quote.traditional_down_payment, i64::MAX);
    }

    #[test]
    fn partner_split_floors_each_amount() {
        let even = split_for_display(&sample_quote(10_000), BuyerMode::Partner);
        assert_eq!(even.savings, 5_000);
        let odd = split_for_display(&sample_quote(10_001), BuyerMode::Partner);
        assert_eq!(odd.savings, 5_000);
        assert_eq!(odd.traditional_down_payment, 22_000);
        assert_eq!(odd.optimized_down_payment, 17_000);
        assert_eq!(odd.monthly_rent_equivalent, 416);
        assert_eq!(odd.chosen_term_months, 60);
        assert!(odd.per_person);
    }

    #[test]
    fn partner_split_rounds_negative_amounts_down() {
        let mut quote = sample_quote(49_167);
        quote.optimized_down_payment = -5_167;
        let display = split_for_display(&quote, BuyerMode::Partner);
        assert_eq!(display.optimized_down_payment, -2_584);
    }

    #[test]
    fn alone_display_is_unchanged() {
        let quote = compute_default(200_000.0, "Madrid", 30);
        let display = split_for_display(&quote, BuyerMode::Alone);
        assert_eq!(display.traditional_down_payment, quote.traditional_down_payment);
        assert_eq!(display.optimized_down_payment, quote.optimized_down_payment);
        assert_eq!(display.savings, quote.savings);
        assert_eq!(display.monthly_rent_equivalent, quote.monthly_rent_equivalent);
        assert!(!display.per_person);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(128))]

        #[test]
        fn prop_quote_invariants_hold_over_ui_range(
            price in 50_000u32..=1_000_000,
            region_idx in 0usize..21,
            age in 18u32..=80
        ) {
            let tables = RateTables::spanish();
            let region = tables
                .regions
                .get(region_idx)
                .map(|r| r.name.clone())
                .unwrap_or_else(|| "Atlantis".to_string());
            let input = QuoteInput::new(price as f64, region, age);
            let quote = compute(&tables, &input);

            prop_assert_eq!(
                quote.savings,
                quote.traditional_down_payment - quote.optimized_down_payment
            );
            prop_assert!([12, 24, 36, 48, 60].contains(&quote.chosen_term_months));
            prop_assert!(!quote.used_fallback);
            prop_assert!(quote.optimized_down_payment >= 0);
            prop_assert!(quote.optimized_down_payment <= quote.traditional_down_payment);
            prop_assert_eq!(quote, compute(&tables, &input));
        }

        #[test]
        fn prop_partner_split_never_exceeds_half(
            price in 50_000u32..=1_000_000,
            age in 18u32..=80
        ) {
            let quote = compute_default(price as f64, "Galicia", age);
            let display = split_for_display(&quote, BuyerMode::Partner);
            prop_assert!(display.savings * 2 <= quote.savings);
            prop_assert!(quote.savings - display.savings * 2 <= 1);
            prop_assert_eq!(display.chosen_term_months, quote.chosen_term_months);
        }
    }
}
