//! Order execution port.
//!
//! The engine hands every intent to an `ExecutionPort`; the returned [`Fill`] is what the
//! ledger records. Implementations own commission, slippage and cash.

use crate::domain::error::TurtleError;
use crate::domain::intent::{Fill, Intent};

pub trait ExecutionPort {
    fn execute(&mut self, intent: &Intent) -> Result<Fill, TurtleError>;

    /// Account equity marked at `price`.
    fn equity(&self, price: f64) -> f64;
}
