//! Paper execution: fills every intent immediately at its reference price.
//!
//! Slippage moves the fill price against the trade, commission is charged on notional, and
//! cash is settled per fill. Holdings are tracked per system as signed base-asset size, so
//! equity is `cash + Σ holdings × mark`.

use crate::domain::error::TurtleError;
use crate::domain::intent::{Action, Fill, Intent, SystemId};
use crate::domain::position::Side;
use crate::ports::execution_port::ExecutionPort;

#[derive(Debug, Clone, PartialEq)]
pub struct BrokerConfig {
    /// Percent of notional, e.g. 0.1 for 0.1 %.
    pub commission_pct: f64,
    /// Percent adverse price move applied to every fill.
    pub slippage_pct: f64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        BrokerConfig {
            commission_pct: 0.1,
            slippage_pct: 0.0,
        }
    }
}

/// commission = notional * pct / 100
pub fn calculate_commission(notional: f64, config: &BrokerConfig) -> f64 {
    notional * config.commission_pct / 100.0
}

/// Buying pays up, selling gets less.
pub fn apply_slippage(price: f64, is_buy: bool, slippage_pct: f64) -> f64 {
    if is_buy {
        price * (1.0 + slippage_pct / 100.0)
    } else {
        price * (1.0 - slippage_pct / 100.0)
    }
}

fn is_buy(intent: &Intent) -> Result<bool, TurtleError> {
    match (intent.action, intent.side) {
        (_, Side::Flat) => Err(TurtleError::Execution {
            reason: format!("{} intent for {} has no side", intent.action, intent.system),
        }),
        (Action::Open | Action::Add, Side::Long) | (Action::Exit | Action::StopOut, Side::Short) => {
            Ok(true)
        }
        _ => Ok(false),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaperBroker {
    pub cash: f64,
    pub total_commission: f64,
    holdings: [f64; 2],
    config: BrokerConfig,
}

impl PaperBroker {
    pub fn new(initial_cash: f64, config: BrokerConfig) -> Self {
        PaperBroker {
            cash: initial_cash,
            total_commission: 0.0,
            holdings: [0.0; 2],
            config,
        }
    }

    /// Signed base-asset size held for `system`.
    pub fn holding(&self, system: SystemId) -> f64 {
        self.holdings[system.index()]
    }
}

impl ExecutionPort for PaperBroker {
    fn execute(&mut self, intent: &Intent) -> Result<Fill, TurtleError> {
        if !(intent.reference_price.is_finite() && intent.reference_price > 0.0) {
            return Err(TurtleError::Execution {
                reason: format!("invalid reference price {}", intent.reference_price),
            });
        }
        let buy = is_buy(intent)?;
        let price = apply_slippage(intent.reference_price, buy, self.config.slippage_pct);
        let notional = intent.size * price;
        let commission = calculate_commission(notional, &self.config);

        let holding = &mut self.holdings[intent.system.index()];
        if buy {
            self.cash -= notional + commission;
            *holding += intent.size;
        } else {
            self.cash += notional - commission;
            *holding -= intent.size;
        }
        if !intent.action.is_entry() && holding.abs() < 1e-9 {
            *holding = 0.0;
        }
        self.total_commission += commission;

        Ok(Fill {
            price,
            size: intent.size,
        })
    }

    fn equity(&self, price: f64) -> f64 {
        self.cash + self.holdings.iter().map(|h| h * price).sum::<f64>()
    }
}
