//! Single-trade simulation.
//!
//! Walks the future bars after an entry signal until the stop or target is
//! hit, or the window runs out.
//!
//! Per bar, for a long position:
//! 1. Update MAE/MFE from the bar's low/high
//! 2. `low <= stop` → loss at the stop
//! 3. else `high >= target` → win at the target
//!
//! The stop is checked first, so a bar touching both is a loss. Shorts
//! mirror this. If neither level is hit the trade times out at the last
//! future close. Every exit fill pays slippage.

use crate::domain::bar::Bar;
use crate::domain::error::SimulationError;
use crate::domain::execution::{self, SimulationParams};
use crate::domain::strategy::{Direction, Strategy};
use crate::domain::trade::{IndicatorSnapshot, TradeOutcome, TradeResult};
use rust_decimal::Decimal;

struct Excursion {
    mae: Decimal,
    mfe: Decimal,
}

impl Excursion {
    fn new() -> Self {
        Excursion {
            mae: Decimal::ZERO,
            mfe: Decimal::ZERO,
        }
    }

    fn update(&mut self, bar: &Bar, entry: Decimal, direction: Direction, multiplier: Decimal) {
        let (adverse, favorable) = if direction.is_short() {
            (entry - bar.high, entry - bar.low)
        } else {
            (bar.low - entry, bar.high - entry)
        };
        self.mae = self.mae.min(adverse * multiplier);
        self.mfe = self.mfe.max(favorable * multiplier);
    }
}

/// Simulate one trade entered at `entry_bar.close`.
///
/// `history` ends at the entry bar; `future` holds the bars after it.
/// Returns `Ok(None)` when `future` is empty.
pub fn simulate(
    strategy: &Strategy,
    entry_bar: &Bar,
    history: &[Bar],
    future: &[Bar],
    params: &SimulationParams,
) -> Result<Option<TradeResult>, SimulationError> {
    let slippage = params.slippage_points()?;
    let Some(last_bar) = future.last() else {
        return Ok(None);
    };

    let direction = strategy.direction.effective();
    let entry_price = execution::apply_entry_slippage(entry_bar.close, slippage, direction);

    let stop_distance = execution::exit_distance(
        &strategy.stop_loss,
        entry_price,
        history,
        params.atr_stop_mode,
    );
    let target_distance = execution::exit_distance(
        &strategy.take_profit,
        entry_price,
        history,
        params.atr_stop_mode,
    );
    if stop_distance <= Decimal::ZERO {
        return Err(SimulationError::InvalidDistance {
            kind: "stop",
            distance: stop_distance,
        });
    }
    if target_distance <= Decimal::ZERO {
        return Err(SimulationError::InvalidDistance {
            kind: "target",
            distance: target_distance,
        });
    }

    let stop_price = execution::stop_price(entry_price, stop_distance, direction);
    let target_price = execution::target_price(entry_price, target_distance, direction);

    let mut excursion = Excursion::new();
    let mut exit = None;
    for (idx, bar) in future.iter().enumerate() {
        excursion.update(bar, entry_price, direction, params.point_multiplier);

        let (stopped, reached) = if direction.is_short() {
            (bar.high >= stop_price, bar.low <= target_price)
        } else {
            (bar.low <= stop_price, bar.high >= target_price)
        };

        if stopped {
            exit = Some((idx, stop_price, TradeOutcome::Loss));
            break;
        }
        if reached {
            exit = Some((idx, target_price, TradeOutcome::Win));
            break;
        }
    }

    let (exit_idx, exit_level, outcome) =
        exit.unwrap_or((future.len() - 1, last_bar.close, TradeOutcome::Timeout));
    let exit_price = execution::apply_exit_slippage(exit_level, slippage, direction);
    let bars_held = exit_idx + 1;

    Ok(Some(TradeResult {
        strategy_id: strategy.id.clone(),
        symbol: entry_bar.symbol.clone(),
        direction,
        entry_time: entry_bar.timestamp,
        entry_price,
        exit_time: future[exit_idx].timestamp,
        exit_price,
        stop_price,
        target_price,
        pnl: execution::net_pnl(entry_price, exit_price, direction, params),
        outcome,
        bars_held,
        mae: excursion.mae,
        mfe: excursion.mfe,
        risk_reward: target_distance / stop_distance,
        setup_bars: Vec::new(),
        trade_bars: future[..bars_held].to_vec(),
        entry_indicators: IndicatorSnapshot::capture(history),
        exit_indicators: None,
    }))
}
