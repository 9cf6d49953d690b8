//! Population standard deviation (divides by N, not N-1).

use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;

pub fn population_stddev(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    let n = Decimal::from(values.len());
    let mean = values.iter().copied().sum::<Decimal>() / n;
    let variance = values
        .iter()
        .map(|&v| {
            let diff = v - mean;
            diff * diff
        })
        .sum::<Decimal>()
        / n;
    variance.sqrt().unwrap_or(Decimal::ZERO)
}
