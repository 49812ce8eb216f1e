//! Position ledger: the single record of what each system holds.
//!
//! Every state change goes through [`PositionLedger::apply`], which checks the transition
//! against the held state before touching anything. A rejected intent leaves the ledger
//! exactly as it was.

use super::error::DomainError;
use super::intent::{Action, Fill, Intent, SystemId};
use super::position::{Side, SystemState, Unit};

#[derive(Debug, Clone, PartialEq)]
pub struct PositionLedger {
    states: [SystemState; 2],
    max_units: [usize; 2],
}

impl PositionLedger {
    pub fn new(max_units: [usize; 2]) -> Self {
        PositionLedger {
            states: [SystemState::flat(), SystemState::flat()],
            max_units,
        }
    }

    pub fn state(&self, system: SystemId) -> &SystemState {
        &self.states[system.index()]
    }

    pub fn max_units(&self, system: SystemId) -> usize {
        self.max_units[system.index()]
    }

    pub fn aggregate_signed_size(&self, system: SystemId) -> f64 {
        self.state(system).signed_size()
    }

    /// Net signed size across both systems.
    pub fn net_signed_size(&self) -> f64 {
        self.states.iter().map(SystemState::signed_size).sum()
    }

    /// Record an executed intent. `fill.price` becomes the unit's entry price.
    pub fn apply(&mut self, intent: &Intent, fill: &Fill) -> Result<&SystemState, DomainError> {
        let system = intent.system;
        self.check_fill(system, fill)?;
        self.check_transition(intent)?;

        let state = &mut self.states[system.index()];
        match intent.action {
            Action::Open | Action::Add => {
                state.side = intent.side;
                state.units.push(Unit {
                    entry_price: fill.price,
                    side: intent.side,
                    size: fill.size,
                });
            }
            Action::Exit | Action::StopOut => {
                state.units.clear();
                state.side = Side::Flat;
            }
        }
        Ok(&self.states[system.index()])
    }

    fn check_fill(&self, system: SystemId, fill: &Fill) -> Result<(), DomainError> {
        if !(fill.price.is_finite() && fill.price > 0.0) {
            return Err(DomainError::InvalidFill {
                system,
                reason: format!("price must be positive, got {}", fill.price),
            });
        }
        if !(fill.size.is_finite() && fill.size > 0.0) {
            return Err(DomainError::InvalidFill {
                system,
                reason: format!("size must be positive, got {}", fill.size),
            });
        }
        Ok(())
    }

    fn check_transition(&self, intent: &Intent) -> Result<(), DomainError> {
        let system = intent.system;
        let state = self.state(system);
        let invalid = || DomainError::InvalidTransition {
            system,
            action: intent.action,
            side: intent.side,
            held: state.side(),
        };

        if intent.side == Side::Flat {
            return Err(invalid());
        }

        match intent.action {
            Action::Open if !state.is_flat() => Err(invalid()),
            Action::Open => Ok(()),
            Action::Add | Action::Exit | Action::StopOut if state.side() != intent.side => {
                Err(invalid())
            }
            Action::Add if state.units_held() >= self.max_units(system) => {
                Err(DomainError::UnitLimit {
                    system,
                    max_units: self.max_units(system),
                })
            }
            Action::Add | Action::Exit | Action::StopOut => Ok(()),
        }
    }
}
