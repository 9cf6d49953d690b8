//! Aggregate statistics over a list of simulated trades.

use super::trade::{TradeOutcome, TradeResult};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeSummary {
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub timeouts: usize,
    /// Wins over total trades, 0 when there are none.
    pub win_rate: Decimal,
    pub total_pnl: Decimal,
    pub avg_pnl: Decimal,
    pub gross_profit: Decimal,
    pub gross_loss: Decimal,
    /// Gross profit over gross loss; `None` when nothing was lost.
    pub profit_factor: Option<Decimal>,
    pub largest_win: Decimal,
    pub largest_loss: Decimal,
    pub avg_bars_held: Decimal,
    pub avg_mae: Decimal,
    pub avg_mfe: Decimal,
}

impl TradeSummary {
    pub fn compute(trades: &[TradeResult]) -> Self {
        let mut wins = 0usize;
        let mut losses = 0usize;
        let mut timeouts = 0usize;
        let mut total_pnl = Decimal::ZERO;
        let mut gross_profit = Decimal::ZERO;
        let mut gross_loss = Decimal::ZERO;
        let mut largest_win = Decimal::ZERO;
        let mut largest_loss = Decimal::ZERO;
        let mut bars_held = 0usize;
        let mut total_mae = Decimal::ZERO;
        let mut total_mfe = Decimal::ZERO;

        for trade in trades {
            match trade.outcome {
                TradeOutcome::Win => wins += 1,
                TradeOutcome::Loss => losses += 1,
                TradeOutcome::Timeout => timeouts += 1,
            }

            let pnl = trade.pnl;
            total_pnl += pnl;
            if pnl > Decimal::ZERO {
                gross_profit += pnl;
                largest_win = largest_win.max(pnl);
            } else if pnl < Decimal::ZERO {
                gross_loss += pnl.abs();
                largest_loss = largest_loss.max(pnl.abs());
            }

            bars_held += trade.bars_held;
            total_mae += trade.mae;
            total_mfe += trade.mfe;
        }

        let total_trades = trades.len();
        let mean = |sum: Decimal| {
            if total_trades > 0 {
                sum / Decimal::from(total_trades)
            } else {
                Decimal::ZERO
            }
        };

        let profit_factor = if gross_loss > Decimal::ZERO {
            Some(gross_profit / gross_loss)
        } else {
            None
        };

        TradeSummary {
            total_trades,
            wins,
            losses,
            timeouts,
            win_rate: mean(Decimal::from(wins)),
            total_pnl,
            avg_pnl: mean(total_pnl),
            gross_profit,
            gross_loss,
            profit_factor,
            largest_win,
            largest_loss,
            avg_bars_held: mean(Decimal::from(bars_held)),
            avg_mae: mean(total_mae),
            avg_mfe: mean(total_mfe),
        }
    }
}

impl fmt::Display for TradeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "trades: {} (win {}, loss {}, timeout {})",
            self.total_trades, self.wins, self.losses, self.timeouts
        )?;
        writeln!(
            f,
            "win rate: {}%",
            (self.win_rate * Decimal::ONE_HUNDRED).round_dp(2)
        )?;
        writeln!(
            f,
            "total pnl: {}  avg pnl: {}",
            self.total_pnl.round_dp(2),
            self.avg_pnl.round_dp(2)
        )?;
        match self.profit_factor {
            Some(pf) => writeln!(f, "profit factor: {}", pf.round_dp(2))?,
            None => writeln!(f, "profit factor: n/a")?,
        }
        write!(
            f,
            "avg bars held: {}  avg mae: {}  avg mfe: {}",
            self.avg_bars_held.round_dp(1),
            self.avg_mae.round_dp(2),
            self.avg_mfe.round_dp(2)
        )
    }
}
