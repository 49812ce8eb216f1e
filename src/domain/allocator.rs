//! Capital allocation between the two systems and volatility-based unit sizing.

use super::channel::effective_volatility;
use super::error::DomainError;
use super::intent::SystemId;

pub const DEFAULT_RISK_RATIO: f64 = 0.02;
pub const DEFAULT_MIN_PRICE_MOVE_FRACTION: f64 = 0.01;

const SHARE_TOLERANCE: f64 = 1e-9;
// absorbs representation error in raw / lot_size (e.g. 2.0 / 0.001)
const LOT_EPSILON: f64 = 1e-9;

/// Equity and the fixed split between System 1 and System 2.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccountState {
    pub equity: f64,
    pub system1_capital_share: f64,
    pub system2_capital_share: f64,
}

impl AccountState {
    pub fn capital_share(&self, system: SystemId) -> f64 {
        match system {
            SystemId::System1 => self.system1_capital_share,
            SystemId::System2 => self.system2_capital_share,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingParams {
    pub risk_ratio: f64,
    pub min_price_move_fraction: f64,
    pub lot_size: f64,
}

impl Default for SizingParams {
    fn default() -> Self {
        SizingParams {
            risk_ratio: DEFAULT_RISK_RATIO,
            min_price_move_fraction: DEFAULT_MIN_PRICE_MOVE_FRACTION,
            lot_size: 0.001,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CapitalAllocator {
    account: AccountState,
    params: SizingParams,
}

impl CapitalAllocator {
    pub fn new(account: AccountState, params: SizingParams) -> Result<Self, DomainError> {
        let shares = [account.system1_capital_share, account.system2_capital_share];
        if shares.iter().any(|s| !(0.0..=1.0).contains(s)) {
            return Err(DomainError::InvalidAllocation {
                reason: format!("shares must be within [0, 1], got {shares:?}"),
            });
        }
        if (shares[0] + shares[1] - 1.0).abs() > SHARE_TOLERANCE {
            return Err(DomainError::InvalidAllocation {
                reason: format!("shares must sum to 1, got {}", shares[0] + shares[1]),
            });
        }
        if !(params.lot_size.is_finite() && params.lot_size > 0.0) {
            return Err(DomainError::InvalidAllocation {
                reason: format!("lot size must be positive, got {}", params.lot_size),
            });
        }
        Ok(CapitalAllocator { account, params })
    }

    pub fn params(&self) -> &SizingParams {
        &self.params
    }

    /// Only called between bars.
    pub fn set_equity(&mut self, equity: f64) {
        self.account.equity = equity;
    }

    pub fn allocated_capital(&self, system: SystemId) -> f64 {
        self.account.equity * self.account.capital_share(system)
    }

    /// `capital * risk_ratio / atr`, rounded down to whole lots.
    ///
    /// With no usable ATR the volatility proxy becomes `close * min_price_move_fraction`.
    /// Returns `None` when the result is under one lot.
    pub fn unit_size(&self, system: SystemId, atr: f64, close: f64) -> Option<f64> {
        let risk_budget = self.allocated_capital(system) * self.params.risk_ratio;
        let volatility = effective_volatility(atr, close, self.params.min_price_move_fraction);
        if volatility != atr {
            tracing::warn!(
                %system,
                atr,
                close,
                proxy = volatility,
                "degenerate ATR, sizing from price fraction"
            );
        }
        if !(volatility > 0.0 && volatility.is_finite() && risk_budget > 0.0) {
            return None;
        }

        let raw = risk_budget / volatility;
        let lots = (raw / self.params.lot_size + LOT_EPSILON).floor();
        if lots < 1.0 {
            tracing::debug!(%system, raw, lot_size = self.params.lot_size, "unit below one lot");
            return None;
        }
        Some(lots * self.params.lot_size)
    }
}
