//! Breakout / pyramid / exit state machine for one system.
//!
//! `SystemEngine::evaluate` is a pure function of the held state, the bar, the channel
//! reading and the pending-intent guard. It never mutates anything; the returned [`Signal`]
//! still has to be sized, emitted, executed and applied to the ledger.
//!
//! Transitions (long side; short mirrors with inequalities reversed):
//!
//! | held  | condition                                             | signal |
//! |-------|-------------------------------------------------------|--------|
//! | flat  | `close > entry_high`                                  | Open   |
//! | long  | `close < exit_low`                                    | Exit   |
//! | long  | `units < max_units && close >= last + unit_gap * atr` | Add    |
//!
//! Exit is checked before Add, so a bar satisfying both reduces risk.
//! `atr` is taken as given; [`TurtleEngine`](super::turtle::TurtleEngine) floors it with
//! [`ChannelReading::with_volatility_floor`] before calling in.

use super::channel::ChannelReading;
use super::intent::{Action, PendingIntent, Signal, SystemId};
use super::ohlcv::Bar;
use super::position::{Side, SystemState};

pub const DEFAULT_UNIT_GAP: f64 = 0.5;
pub const DEFAULT_MAX_UNITS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemEngine {
    pub id: SystemId,
    pub max_units: usize,
    /// Favourable move, in ATRs from the last entry, that triggers the next unit.
    pub unit_gap: f64,
}

impl SystemEngine {
    pub fn new(id: SystemId, max_units: usize, unit_gap: f64) -> Self {
        SystemEngine {
            id,
            max_units,
            unit_gap,
        }
    }

    pub fn evaluate(
        &self,
        state: &SystemState,
        bar: &Bar,
        channel: &ChannelReading,
        pending: &PendingIntent,
    ) -> Option<Signal> {
        if !pending.is_clear() || !channel.is_ready() || !bar.close.is_finite() {
            return None;
        }

        let close = bar.close;
        let signal = |action, side| Signal {
            action,
            side,
            reference_price: close,
        };

        match state.side() {
            Side::Flat => {
                if close > channel.entry_high {
                    Some(signal(Action::Open, Side::Long))
                } else if close < channel.entry_low {
                    Some(signal(Action::Open, Side::Short))
                } else {
                    None
                }
            }
            Side::Long => {
                if close < channel.exit_low {
                    return Some(signal(Action::Exit, Side::Long));
                }
                let last = state.last_entry_price()?;
                let can_add = state.units_held() < self.max_units
                    && close >= last + self.unit_gap * channel.atr;
                can_add.then(|| signal(Action::Add, Side::Long))
            }
            Side::Short => {
                if close > channel.exit_high {
                    return Some(signal(Action::Exit, Side::Short));
                }
                let last = state.last_entry_price()?;
                let can_add = state.units_held() < self.max_units
                    && close <= last - self.unit_gap * channel.atr;
                can_add.then(|| signal(Action::Add, Side::Short))
            }
        }
    }
}
