//! Futures contract specifications.
//!
//! The table is built once (built-in CME roots plus config overrides) and
//! passed by reference. Lookups accept either a root (`ES`) or a dated
//! contract code (`ESZ4`, `MNQH25`).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::collections::BTreeMap;

/// Ticks of slippage assumed per fill.
const SLIPPAGE_TICKS: Decimal = dec!(2);
const MONTH_CODES: &str = "FGHJKMNQUVXZ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolSpec {
    pub root: String,
    /// Dollars per full point.
    pub point_value: Decimal,
    pub tick_size: Decimal,
    pub tick_value: Decimal,
}

impl SymbolSpec {
    pub fn new(
        root: impl Into<String>,
        point_value: Decimal,
        tick_size: Decimal,
        tick_value: Decimal,
    ) -> Self {
        SymbolSpec {
            root: root.into().to_ascii_uppercase(),
            point_value,
            tick_size,
            tick_value,
        }
    }

    pub fn point_multiplier(&self) -> Decimal {
        self.point_value
    }

    /// Dollar slippage per fill.
    pub fn slippage_cost(&self) -> Decimal {
        self.tick_value * SLIPPAGE_TICKS
    }
}

/// `ESZ4` → `ES`, `MNQH25` → `MNQ`. Anything that does not end in a month
/// code plus a one or two digit year is returned unchanged.
pub fn root_symbol(code: &str) -> String {
    let upper = code.trim().to_ascii_uppercase();
    let without_year = upper.trim_end_matches(|c: char| c.is_ascii_digit());
    let year_len = upper.len() - without_year.len();
    if !(1..=2).contains(&year_len) {
        return upper;
    }
    match without_year.char_indices().last() {
        Some((idx, month)) if idx > 0 && MONTH_CODES.contains(month) => {
            without_year[..idx].to_string()
        }
        _ => upper,
    }
}

#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    specs: BTreeMap<String, SymbolSpec>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut table = SymbolTable::new();
        for (root, point_value, tick_size, tick_value) in [
            ("ES", dec!(50), dec!(0.25), dec!(12.50)),
            ("MES", dec!(5), dec!(0.25), dec!(1.25)),
            ("NQ", dec!(20), dec!(0.25), dec!(5.00)),
            ("MNQ", dec!(2), dec!(0.25), dec!(0.50)),
            ("YM", dec!(5), dec!(1), dec!(5.00)),
            ("MYM", dec!(0.5), dec!(1), dec!(0.50)),
            ("RTY", dec!(50), dec!(0.1), dec!(5.00)),
            ("M2K", dec!(5), dec!(0.1), dec!(0.50)),
            ("CL", dec!(1000), dec!(0.01), dec!(10.00)),
            ("MCL", dec!(100), dec!(0.01), dec!(1.00)),
            ("GC", dec!(100), dec!(0.1), dec!(10.00)),
            ("MGC", dec!(10), dec!(0.1), dec!(1.00)),
        ] {
            table.insert(SymbolSpec::new(root, point_value, tick_size, tick_value));
        }
        table
    }

    /// Add or replace the spec for a root.
    pub fn insert(&mut self, spec: SymbolSpec) {
        self.specs.insert(spec.root.clone(), spec);
    }

    pub fn get(&self, symbol: &str) -> Option<&SymbolSpec> {
        let upper = symbol.trim().to_ascii_uppercase();
        self.specs
            .get(&upper)
            .or_else(|| self.specs.get(&root_symbol(&upper)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &SymbolSpec> {
        self.specs.values()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
