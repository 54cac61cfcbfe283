//! Fixed token pricing.

use rust_decimal::Decimal;

use crate::provider::TokenUsage;

/// USD per million input tokens (0.1)
pub const INPUT_PRICE_PER_MILLION: Decimal = Decimal::from_parts(1, 0, 0, false, 1);
/// USD per million output tokens (0.4)
pub const OUTPUT_PRICE_PER_MILLION: Decimal = Decimal::from_parts(4, 0, 0, false, 1);

const ONE_MILLION: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// `(input × 0.1 + output × 0.4) / 1_000_000`, exact. Negative counts are
/// treated as zero so the result is never negative.
pub fn estimate_cost(input_tokens: i64, output_tokens: i64) -> Decimal {
    let input = Decimal::from(input_tokens.max(0));
    let output = Decimal::from(output_tokens.max(0));
    (input * INPUT_PRICE_PER_MILLION + output * OUTPUT_PRICE_PER_MILLION) / ONE_MILLION
}

pub fn estimate_usage_cost(usage: &TokenUsage) -> Decimal {
    estimate_cost(usage.input_tokens, usage.output_tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn matches_reference_example() {
        assert_eq!(estimate_cost(100, 200), Decimal::from_str("0.00009").unwrap());
    }

    #[test]
    fn zero_tokens_cost_nothing() {
        assert_eq!(estimate_cost(0, 0), Decimal::ZERO);
    }

    #[test]
    fn one_million_tokens_each_way() {
        assert_eq!(estimate_cost(1_000_000, 1_000_000), Decimal::from_str("0.5").unwrap());
    }

    #[test]
    fn is_exact_for_odd_counts() {
        // 7 * 0.1 + 13 * 0.4 = 5.9
        assert_eq!(estimate_cost(7, 13), Decimal::from_str("0.0000059").unwrap());
    }

    #[test]
    fn negative_counts_clamp_to_zero() {
        assert_eq!(estimate_cost(-50, 10), estimate_cost(0, 10));
    }
}
