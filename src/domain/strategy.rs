//! Strategy definition.

use crate::domain::condition::Condition;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
    /// Simulated as a long position.
    Both,
}

impl Direction {
    pub fn is_short(self) -> bool {
        self == Direction::Short
    }

    /// Direction a `Both` strategy is traded in.
    pub fn effective(self) -> Direction {
        match self {
            Direction::Short => Direction::Short,
            Direction::Long | Direction::Both => Direction::Long,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::Long => "long",
            Direction::Short => "short",
            Direction::Both => "both",
        };
        f.write_str(s)
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "long" => Ok(Direction::Long),
            "short" => Ok(Direction::Short),
            "both" => Ok(Direction::Both),
            other => Err(format!("unknown direction '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitKind {
    Points,
    Percentage,
    Atr,
}

impl fmt::Display for ExitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitKind::Points => "points",
            ExitKind::Percentage => "percentage",
            ExitKind::Atr => "atr",
        };
        f.write_str(s)
    }
}

impl FromStr for ExitKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "points" | "point" => Ok(ExitKind::Points),
            "percentage" | "percent" | "pct" => Ok(ExitKind::Percentage),
            "atr" => Ok(ExitKind::Atr),
            other => Err(format!("unknown exit type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitLevel {
    #[serde(rename = "type")]
    pub kind: ExitKind,
    pub value: Decimal,
}

impl ExitLevel {
    pub fn new(kind: ExitKind, value: Decimal) -> Self {
        ExitLevel { kind, value }
    }
}

pub type StopLoss = ExitLevel;
pub type TakeProfit = ExitLevel;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub id: String,
    pub name: String,
    pub direction: Direction,
    /// All must hold for an entry.
    pub conditions: Vec<Condition>,
    pub stop_loss: StopLoss,
    pub take_profit: TakeProfit,
}
