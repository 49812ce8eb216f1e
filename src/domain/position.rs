//! Per-system position state: side, pyramided units and their entry prices.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Flat,
    Long,
    Short,
}

impl Side {
    /// +1 for long, -1 for short, 0 when flat.
    pub fn sign(self) -> f64 {
        match self {
            Side::Flat => 0.0,
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Flat => write!(f, "flat"),
            Side::Long => write!(f, "long"),
            Side::Short => write!(f, "short"),
        }
    }
}

/// One increment of position added at a breakout or pyramid add.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub entry_price: f64,
    pub side: Side,
    pub size: f64,
}

/// Units held by one system, in pyramiding order.
///
/// Invariant: `units.is_empty() == (side == Side::Flat)`, and every unit carries `side`.
/// Only [`PositionLedger`](super::ledger::PositionLedger) mutates a `SystemState`.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemState {
    pub(crate) units: Vec<Unit>,
    pub(crate) side: Side,
}

impl Default for SystemState {
    fn default() -> Self {
        SystemState::flat()
    }
}

impl SystemState {
    pub fn flat() -> Self {
        SystemState {
            units: Vec::new(),
            side: Side::Flat,
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn is_flat(&self) -> bool {
        self.side == Side::Flat
    }

    pub fn units_held(&self) -> usize {
        self.units.len()
    }

    /// Entry of the earliest unit; the stop is anchored here.
    pub fn first_entry_price(&self) -> Option<f64> {
        self.units.first().map(|u| u.entry_price)
    }

    /// Entry of the most recent unit; the next pyramid level is measured from here.
    pub fn last_entry_price(&self) -> Option<f64> {
        self.units.last().map(|u| u.entry_price)
    }

    pub fn total_size(&self) -> f64 {
        self.units.iter().map(|u| u.size).sum()
    }

    /// Positive when long, negative when short.
    pub fn signed_size(&self) -> f64 {
        self.side.sign() * self.total_size()
    }

    /// Mark-to-market gain of every held unit at `price`.
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.units
            .iter()
            .map(|u| u.side.sign() * u.size * (price - u.entry_price))
            .sum()
    }
}
