//! Per-account coordinator for the two systems.
//!
//! Per bar: stop checks for both systems, then System 1 and System 2 are evaluated in that
//! order, entries are sized by the allocator and every signal leaves as an [`Intent`]. An
//! emitted intent stays pending until the caller reports its fill (or cancels it); while it
//! is pending that system produces nothing further.

use chrono::NaiveDateTime;

use super::allocator::{AccountState, CapitalAllocator};
use super::channel::{ChannelReading, effective_volatility};
use super::engine::SystemEngine;
use super::error::DomainError;
use super::intent::{Action, Fill, Intent, IntentEmitter, PendingIntent, Signal, SystemId};
use super::ledger::PositionLedger;
use super::ohlcv::Bar;
use super::position::SystemState;
use super::risk::RiskManager;
use super::strategy::TurtleConfig;

#[derive(Debug, Clone)]
pub struct TurtleEngine {
    systems: [SystemEngine; 2],
    risk: RiskManager,
    allocator: CapitalAllocator,
    ledger: PositionLedger,
    emitter: IntentEmitter,
    pending: [PendingIntent; 2],
    last_timestamp: Option<NaiveDateTime>,
}

impl TurtleEngine {
    pub fn new(config: &TurtleConfig, initial_equity: f64) -> Result<Self, DomainError> {
        let allocator = CapitalAllocator::new(
            AccountState {
                equity: initial_equity,
                system1_capital_share: config.system1.allocation,
                system2_capital_share: config.system2.allocation,
            },
            config.sizing(),
        )?;
        let systems = SystemId::ALL.map(|id| SystemEngine::new(id, config.max_units, config.unit_gap));

        Ok(TurtleEngine {
            systems,
            risk: RiskManager::new(config.stop_atr_multiple),
            allocator,
            ledger: PositionLedger::new([config.max_units; 2]),
            emitter: IntentEmitter::new(),
            pending: [PendingIntent::Clear, PendingIntent::Clear],
            last_timestamp: None,
        })
    }

    pub fn state(&self, system: SystemId) -> &SystemState {
        self.ledger.state(system)
    }

    pub fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }

    pub fn allocator(&self) -> &CapitalAllocator {
        &self.allocator
    }

    pub fn pending(&self, system: SystemId) -> &PendingIntent {
        &self.pending[system.index()]
    }

    pub fn emitted(&self) -> &[Intent] {
        self.emitter.emitted()
    }

    /// Stop level for `system` given the bar's ATR and close. A degenerate ATR is replaced by
    /// the same price-based proxy the sizing uses.
    pub fn stop_price(&self, system: SystemId, atr: f64, close: f64) -> Option<f64> {
        let volatility = effective_volatility(atr, close, self.min_price_move_fraction());
        self.risk.stop_price(self.state(system), volatility)
    }

    fn min_price_move_fraction(&self) -> f64 {
        self.allocator.params().min_price_move_fraction
    }

    /// Between bars only.
    pub fn set_equity(&mut self, equity: f64) {
        self.allocator.set_equity(equity);
    }

    /// Evaluate one bar. Returns at most one intent per system.
    pub fn on_bar(
        &mut self,
        bar: &Bar,
        readings: &[ChannelReading; 2],
    ) -> Result<Vec<Intent>, DomainError> {
        if let Some(previous) = self.last_timestamp {
            if bar.timestamp <= previous {
                return Err(DomainError::OutOfOrderBar {
                    timestamp: bar.timestamp,
                    previous,
                });
            }
        }
        self.last_timestamp = Some(bar.timestamp);

        let fraction = self.min_price_move_fraction();
        let floored = readings.map(|r| r.with_volatility_floor(bar.close, fraction));

        // Stops for both systems before any new signal.
        let stops: [Option<Signal>; 2] = SystemId::ALL.map(|id| {
            let i = id.index();
            if !self.pending[i].is_clear() {
                return None;
            }
            self.risk.check_stop(self.ledger.state(id), bar, floored[i].atr)
        });

        let mut intents = Vec::with_capacity(2);
        for id in SystemId::ALL {
            let i = id.index();
            let signal = match stops[i] {
                Some(stop) => Some(stop),
                None => self.systems[i].evaluate(
                    self.ledger.state(id),
                    bar,
                    &floored[i],
                    &self.pending[i],
                ),
            };
            let Some(signal) = signal else { continue };

            let Some(size) = self.size_for(id, &signal, &readings[i], bar) else {
                continue;
            };
            if let Some(intent) = self.emitter.emit(id, signal, size, bar.timestamp) {
                self.pending[i] = PendingIntent::Awaiting(intent.clone());
                intents.push(intent);
            }
        }
        Ok(intents)
    }

    fn size_for(
        &self,
        system: SystemId,
        signal: &Signal,
        reading: &ChannelReading,
        bar: &Bar,
    ) -> Option<f64> {
        match signal.action {
            Action::Open | Action::Add => self.allocator.unit_size(system, reading.atr, bar.close),
            Action::Exit | Action::StopOut => Some(self.ledger.state(system).total_size()),
        }
    }

    /// Apply the fill for the system's pending intent to the ledger.
    ///
    /// On a ledger rejection the intent stays pending and the error is returned.
    pub fn confirm_fill(
        &mut self,
        system: SystemId,
        fill: &Fill,
    ) -> Result<&SystemState, DomainError> {
        let i = system.index();
        let intent = self.pending[i]
            .take()
            .ok_or(DomainError::NoPendingIntent { system })?;
        if let Err(e) = self.ledger.apply(&intent, fill) {
            self.pending[i] = PendingIntent::Awaiting(intent);
            return Err(e);
        }
        Ok(self.ledger.state(system))
    }

    /// Drop the pending intent without touching the ledger (order rejected or expired).
    pub fn cancel_pending(&mut self, system: SystemId) -> Option<Intent> {
        self.pending[system.index()].take()
    }
}
