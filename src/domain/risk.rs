//! Hard stop-loss check, run once per system per bar before any entry or exit signal.

use super::intent::{Action, Signal};
use super::ohlcv::Bar;
use super::position::{Side, SystemState};

pub const DEFAULT_STOP_ATR_MULTIPLE: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskManager {
    pub stop_atr_multiple: f64,
}

impl Default for RiskManager {
    fn default() -> Self {
        RiskManager {
            stop_atr_multiple: DEFAULT_STOP_ATR_MULTIPLE,
        }
    }
}

impl RiskManager {
    pub fn new(stop_atr_multiple: f64) -> Self {
        RiskManager { stop_atr_multiple }
    }

    /// Stop level for the held position, anchored to the first unit's entry.
    /// Adding units never moves it.
    pub fn stop_price(&self, state: &SystemState, atr: f64) -> Option<f64> {
        let anchor = state.first_entry_price()?;
        let distance = self.stop_atr_multiple * atr;
        match state.side() {
            Side::Long => Some(anchor - distance),
            Side::Short => Some(anchor + distance),
            Side::Flat => None,
        }
    }

    /// A StopOut covering every unit when `close` has reached the stop.
    pub fn check_stop(&self, state: &SystemState, bar: &Bar, atr: f64) -> Option<Signal> {
        if !atr.is_finite() || !bar.close.is_finite() {
            return None;
        }
        let stop = self.stop_price(state, atr)?;
        let breached = match state.side() {
            Side::Long => bar.close <= stop,
            Side::Short => bar.close >= stop,
            Side::Flat => false,
        };
        breached.then_some(Signal {
            action: Action::StopOut,
            side: state.side(),
            reference_price: bar.close,
        })
    }
}
