//! Pure indicator math shared by the built-in strategies.
//!
//! No I/O, no side effects. All computations use `Decimal`; callers decide
//! what insufficient data means for them (here: empty results).

use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Simple moving average of the last `period` values.
pub fn sma(values: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || values.len() < period {
        return None;
    }
    let window = &values[values.len() - period..];
    Some(window.iter().copied().sum::<Decimal>() / Decimal::from(period as u64))
}

/// Exponential moving average, seeded with the SMA of the first `period`
/// values. Returns the latest EMA value.
pub fn ema(values: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || values.len() < period {
        return None;
    }

    let k = dec!(2) / Decimal::from(period as u64 + 1);
    let one_minus_k = dec!(1) - k;

    let mut current: Decimal = values[..period].iter().copied().sum::<Decimal>()
        / Decimal::from(period as u64);
    for &value in &values[period..] {
        current = value * k + current * one_minus_k;
    }
    Some(current)
}

/// Population standard deviation over the last `period` values.
pub fn stddev(values: &[Decimal], period: usize) -> Option<Decimal> {
    let mean = sma(values, period)?;
    let window = &values[values.len() - period..];
    let variance = window
        .iter()
        .map(|v| {
            let d = *v - mean;
            d * d
        })
        .sum::<Decimal>()
        / Decimal::from(period as u64);
    // sqrt on Decimal via f64; precision loss is irrelevant at this scale.
    variance
        .to_f64()
        .map(f64::sqrt)
        .and_then(Decimal::from_f64)
}

/// Highest high over the last `period` values.
pub fn highest(values: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || values.len() < period {
        return None;
    }
    values[values.len() - period..].iter().copied().reduce(Decimal::max)
}

/// Lowest low over the last `period` values.
pub fn lowest(values: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || values.len() < period {
        return None;
    }
    values[values.len() - period..].iter().copied().reduce(Decimal::min)
}

/// Clamp a ratio into [0, 1] for use as an opaque quality score.
pub fn unit_clamp(value: Decimal) -> Decimal {
    value.clamp(Decimal::ZERO, Decimal::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decimals(values: &[i64]) -> Vec<Decimal> {
        values.iter().map(|&v| Decimal::from(v)).collect()
    }

    #[test]
    fn test_sma_window() {
        let values = decimals(&[1, 2, 3, 4, 5]);
        assert_eq!(sma(&values, 5), Some(dec!(3)));
        assert_eq!(sma(&values, 2), Some(dec!(4.5)));
        assert_eq!(sma(&values, 6), None);
        assert_eq!(sma(&values, 0), None);
    }

    #[test]
    fn test_ema_constant_series_is_constant() {
        let values = vec![dec!(7); 30];
        assert_eq!(ema(&values, 10), Some(dec!(7)));
    }

    #[test]
    fn test_ema_tracks_rising_series() {
        let values = decimals(&(1..=50).collect::<Vec<_>>());
        let fast = ema(&values, 5).unwrap();
        let slow = ema(&values, 20).unwrap();
        assert!(fast > slow, "fast EMA should lead in a rising series");
    }

    #[test]
    fn test_stddev_of_constant_is_zero() {
        let values = vec![dec!(4); 10];
        assert_eq!(stddev(&values, 10), Some(Decimal::ZERO));
    }

    #[test]
    fn test_highest_lowest() {
        let values = decimals(&[3, 9, 1, 7, 5]);
        assert_eq!(highest(&values, 3), Some(dec!(7)));
        assert_eq!(lowest(&values, 3), Some(dec!(1)));
        assert_eq!(highest(&values, 5), Some(dec!(9)));
        assert_eq!(highest(&values, 6), None);
    }

    #[test]
    fn test_unit_clamp() {
        assert_eq!(unit_clamp(dec!(-0.2)), Decimal::ZERO);
        assert_eq!(unit_clamp(dec!(0.4)), dec!(0.4));
        assert_eq!(unit_clamp(dec!(1.7)), Decimal::ONE);
    }
}
