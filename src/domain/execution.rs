//! Fill prices, exit levels and round-trip costs.
//!
//! Slippage is quoted in dollars per fill and converted to points with the
//! symbol's point multiplier. It always works against the trader:
//! - Long entry pays up, long exit sells down
//! - Short entry sells down, short exit buys up

use crate::domain::error::SimulationError;
use crate::domain::indicator::atr;
use crate::domain::bar::Bar;
use crate::domain::strategy::{Direction, ExitKind, ExitLevel};
use crate::domain::symbol::SymbolSpec;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Round-trip commission in dollars when none is configured.
pub const DEFAULT_COMMISSION: Decimal = dec!(5.00);

/// How an `atr` stop or target value becomes a price distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AtrStopMode {
    /// `value × entry × 0.01`
    #[default]
    PriceProxy,
    /// `value × ATR(period)` of the entry history.
    Live { period: usize },
}

/// Per-symbol execution costs for one simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParams {
    pub point_multiplier: Decimal,
    /// Dollars per fill.
    pub slippage_cost: Decimal,
    /// Dollars per round trip.
    pub commission: Decimal,
    pub atr_stop_mode: AtrStopMode,
}

impl SimulationParams {
    pub fn for_symbol(spec: &SymbolSpec, commission: Decimal, atr_stop_mode: AtrStopMode) -> Self {
        SimulationParams {
            point_multiplier: spec.point_multiplier(),
            slippage_cost: spec.slippage_cost(),
            commission,
            atr_stop_mode,
        }
    }

    /// Slippage per fill in price points.
    pub fn slippage_points(&self) -> Result<Decimal, SimulationError> {
        if self.point_multiplier <= Decimal::ZERO {
            return Err(SimulationError::InvalidPointMultiplier(
                self.point_multiplier,
            ));
        }
        Ok(self.slippage_cost / self.point_multiplier)
    }
}

pub fn apply_entry_slippage(market_price: Decimal, slippage: Decimal, direction: Direction) -> Decimal {
    if direction.is_short() {
        market_price - slippage
    } else {
        market_price + slippage
    }
}

pub fn apply_exit_slippage(market_price: Decimal, slippage: Decimal, direction: Direction) -> Decimal {
    if direction.is_short() {
        market_price + slippage
    } else {
        market_price - slippage
    }
}

/// Price distance of a stop or target from the entry price.
///
/// - `points`: the value itself
/// - `percentage`: `entry × value / 100`
/// - `atr`: per `AtrStopMode`
pub fn exit_distance(
    level: &ExitLevel,
    entry_price: Decimal,
    history: &[Bar],
    mode: AtrStopMode,
) -> Decimal {
    match level.kind {
        ExitKind::Points => level.value,
        ExitKind::Percentage => entry_price * level.value / dec!(100),
        ExitKind::Atr => match mode {
            AtrStopMode::PriceProxy => level.value * entry_price * dec!(0.01),
            AtrStopMode::Live { period } => level.value * atr::calculate_atr(history, period),
        },
    }
}

/// Stop price: below entry for longs, above for shorts.
pub fn stop_price(entry_price: Decimal, distance: Decimal, direction: Direction) -> Decimal {
    if direction.is_short() {
        entry_price + distance
    } else {
        entry_price - distance
    }
}

/// Target price: above entry for longs, below for shorts.
pub fn target_price(entry_price: Decimal, distance: Decimal, direction: Direction) -> Decimal {
    if direction.is_short() {
        entry_price - distance
    } else {
        entry_price + distance
    }
}

/// Directional points gained from entry to exit.
pub fn points_gained(entry_price: Decimal, exit_price: Decimal, direction: Direction) -> Decimal {
    if direction.is_short() {
        entry_price - exit_price
    } else {
        exit_price - entry_price
    }
}

/// Net dollars: `points × multiplier - commission`.
pub fn net_pnl(
    entry_price: Decimal,
    exit_price: Decimal,
    direction: Direction,
    params: &SimulationParams,
) -> Decimal {
    points_gained(entry_price, exit_price, direction) * params.point_multiplier - params.commission
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn es_params() -> SimulationParams {
        SimulationParams {
            point_multiplier: dec!(50),
            slippage_cost: dec!(25),
            commission: dec!(5),
            atr_stop_mode: AtrStopMode::PriceProxy,
        }
    }

    #[test]
    fn slippage_in_points() {
        // 2 ticks of ES = $25 = half a point
        assert_eq!(es_params().slippage_points().unwrap(), dec!(0.5));
    }

    #[test]
    fn zero_multiplier_rejected() {
        let mut params = es_params();
        params.point_multiplier = Decimal::ZERO;
        assert_eq!(
            params.slippage_points(),
            Err(SimulationError::InvalidPointMultiplier(Decimal::ZERO))
        );
    }

    #[test]
    fn slippage_works_against_trader() {
        assert_eq!(apply_entry_slippage(dec!(100), dec!(0.5), Direction::Long), dec!(100.5));
        assert_eq!(apply_exit_slippage(dec!(100), dec!(0.5), Direction::Long), dec!(99.5));
        assert_eq!(apply_entry_slippage(dec!(100), dec!(0.5), Direction::Short), dec!(99.5));
        assert_eq!(apply_exit_slippage(dec!(100), dec!(0.5), Direction::Short), dec!(100.5));
        assert_eq!(apply_entry_slippage(dec!(100), dec!(0.5), Direction::Both), dec!(100.5));
    }

    #[test]
    fn distances_by_kind() {
        let entry = dec!(200);
        let points = ExitLevel::new(ExitKind::Points, dec!(4));
        let pct = ExitLevel::new(ExitKind::Percentage, dec!(1.5));
        let atr_level = ExitLevel::new(ExitKind::Atr, dec!(2));

        assert_eq!(exit_distance(&points, entry, &[], AtrStopMode::PriceProxy), dec!(4));
        assert_eq!(exit_distance(&pct, entry, &[], AtrStopMode::PriceProxy), dec!(3));
        assert_eq!(exit_distance(&atr_level, entry, &[], AtrStopMode::PriceProxy), dec!(4));
    }

    #[test]
    fn live_atr_distance() {
        let start = Utc.with_ymd_and_hms(2024, 1, 8, 15, 0, 0).unwrap();
        let bars: Vec<Bar> = (0..15)
            .map(|i| {
                Bar::new(
                    "ES",
                    start + Duration::minutes(i),
                    dec!(100),
                    dec!(101.5),
                    dec!(98.5),
                    dec!(100),
                    1,
                )
            })
            .collect();
        let level = ExitLevel::new(ExitKind::Atr, dec!(2));
        // ATR(14) = 3
        assert_eq!(
            exit_distance(&level, dec!(100), &bars, AtrStopMode::Live { period: 14 }),
            dec!(6)
        );
    }

    #[test]
    fn levels_and_pnl_by_direction() {
        assert_eq!(stop_price(dec!(100), dec!(10), Direction::Long), dec!(90));
        assert_eq!(target_price(dec!(100), dec!(20), Direction::Long), dec!(120));
        assert_eq!(stop_price(dec!(100), dec!(10), Direction::Short), dec!(110));
        assert_eq!(target_price(dec!(100), dec!(20), Direction::Short), dec!(80));

        let params = es_params();
        // 2 points × 50 - 5
        assert_eq!(net_pnl(dec!(100), dec!(102), Direction::Long, &params), dec!(95));
        assert_eq!(net_pnl(dec!(100), dec!(102), Direction::Short, &params), dec!(-105));
    }

    #[test]
    fn params_from_symbol_spec() {
        let spec = SymbolSpec::new("NQ", dec!(20), dec!(0.25), dec!(5));
        let params = SimulationParams::for_symbol(&spec, DEFAULT_COMMISSION, AtrStopMode::default());
        assert_eq!(params.point_multiplier, dec!(20));
        assert_eq!(params.slippage_cost, dec!(10));
        assert_eq!(params.commission, dec!(5));
        assert_eq!(params.atr_stop_mode, AtrStopMode::PriceProxy);
    }
}
