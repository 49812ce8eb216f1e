//! Turtle strategy parameters.

use super::allocator::{DEFAULT_MIN_PRICE_MOVE_FRACTION, DEFAULT_RISK_RATIO, SizingParams};
use super::channel::ChannelPeriods;
use super::engine::{DEFAULT_MAX_UNITS, DEFAULT_UNIT_GAP};
use super::intent::SystemId;
use super::risk::DEFAULT_STOP_ATR_MULTIPLE;

/// Channel periods and capital share of one system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemConfig {
    pub entry_period: usize,
    pub exit_period: usize,
    pub allocation: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurtleConfig {
    pub system1: SystemConfig,
    pub system2: SystemConfig,
    pub atr_period: usize,
    pub risk_ratio: f64,
    pub max_units: usize,
    pub unit_gap: f64,
    pub stop_atr_multiple: f64,
    pub min_price_move_fraction: f64,
    pub lot_size: f64,
}

impl Default for TurtleConfig {
    fn default() -> Self {
        TurtleConfig {
            system1: SystemConfig {
                entry_period: 20,
                exit_period: 10,
                allocation: 0.5,
            },
            system2: SystemConfig {
                entry_period: 55,
                exit_period: 20,
                allocation: 0.5,
            },
            atr_period: 20,
            risk_ratio: DEFAULT_RISK_RATIO,
            max_units: DEFAULT_MAX_UNITS,
            unit_gap: DEFAULT_UNIT_GAP,
            stop_atr_multiple: DEFAULT_STOP_ATR_MULTIPLE,
            min_price_move_fraction: DEFAULT_MIN_PRICE_MOVE_FRACTION,
            lot_size: 0.001,
        }
    }
}

impl TurtleConfig {
    pub fn system(&self, id: SystemId) -> &SystemConfig {
        match id {
            SystemId::System1 => &self.system1,
            SystemId::System2 => &self.system2,
        }
    }

    pub fn channel_periods(&self, id: SystemId) -> ChannelPeriods {
        let system = self.system(id);
        ChannelPeriods {
            entry: system.entry_period,
            exit: system.exit_period,
            atr: self.atr_period,
        }
    }

    /// Bars before both systems produce ready readings.
    pub fn warmup_bars(&self) -> usize {
        SystemId::ALL
            .iter()
            .map(|&id| self.channel_periods(id).warmup_bars())
            .max()
            .unwrap_or(0)
    }

    pub fn sizing(&self) -> SizingParams {
        SizingParams {
            risk_ratio: self.risk_ratio,
            min_price_move_fraction: self.min_price_move_fraction,
            lot_size: self.lot_size,
        }
    }
}
