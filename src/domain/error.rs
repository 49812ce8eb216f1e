//! Domain error types.

use chrono::NaiveDateTime;

use super::intent::{Action, SystemId};
use super::position::Side;

/// A violated engine invariant.
///
/// These indicate a sequencing bug in the caller (or the ledger wiring), never a market
/// condition, so they always propagate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    #[error("invalid transition for {system}: {action} {side} while {held}")]
    InvalidTransition {
        system: SystemId,
        action: Action,
        side: Side,
        held: Side,
    },

    #[error("{system} already holds the maximum of {max_units} units")]
    UnitLimit { system: SystemId, max_units: usize },

    #[error("bar at {timestamp} is not after the previous bar at {previous}")]
    OutOfOrderBar {
        timestamp: NaiveDateTime,
        previous: NaiveDateTime,
    },

    #[error("no pending intent for {system}")]
    NoPendingIntent { system: SystemId },

    #[error("invalid fill for {system}: {reason}")]
    InvalidFill { system: SystemId, reason: String },

    #[error("invalid capital allocation: {reason}")]
    InvalidAllocation { reason: String },
}

/// Top-level error type for turtle.
#[derive(Debug, thiserror::Error)]
pub enum TurtleError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("insufficient data for {symbol}: have {bars} bars, need {minimum}")]
    InsufficientData {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error("execution error: {reason}")]
    Execution { reason: String },

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&TurtleError> for std::process::ExitCode {
    fn from(err: &TurtleError) -> Self {
        let code: u8 = match err {
            TurtleError::Io(_) => 1,
            TurtleError::ConfigParse { .. }
            | TurtleError::ConfigMissing { .. }
            | TurtleError::ConfigInvalid { .. } => 2,
            TurtleError::Data { .. } => 3,
            TurtleError::Execution { .. } => 4,
            TurtleError::NoData { .. } | TurtleError::InsufficientData { .. } => 5,
            TurtleError::Domain(_) => 6,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn invalid_transition_message() {
        let err = DomainError::InvalidTransition {
            system: SystemId::System1,
            action: Action::Add,
            side: Side::Long,
            held: Side::Flat,
        };
        assert_eq!(
            err.to_string(),
            "invalid transition for system1: add long while flat"
        );
    }

    #[test]
    fn out_of_order_message() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let err = DomainError::OutOfOrderBar {
            timestamp: day.and_hms_opt(0, 0, 0).unwrap(),
            previous: day.and_hms_opt(4, 0, 0).unwrap(),
        };
        assert!(err.to_string().contains("2024-01-15 04:00:00"));
    }

    #[test]
    fn domain_error_converts_into_turtle_error() {
        let err: TurtleError = DomainError::NoPendingIntent {
            system: SystemId::System2,
        }
        .into();
        assert!(matches!(err, TurtleError::Domain(_)));
        assert_eq!(err.to_string(), "no pending intent for system2");
    }

    #[test]
    fn exit_code_categories() {
        use std::process::ExitCode;

        let config = TurtleError::ConfigMissing {
            section: "turtle".into(),
            key: "risk_ratio".into(),
        };
        assert_eq!(
            format!("{:?}", ExitCode::from(&config)),
            format!("{:?}", ExitCode::from(2))
        );

        let domain = TurtleError::Domain(DomainError::InvalidAllocation {
            reason: "bad".into(),
        });
        assert_eq!(
            format!("{:?}", ExitCode::from(&domain)),
            format!("{:?}", ExitCode::from(6))
        );

        let data = TurtleError::NoData {
            symbol: "BTCUSDT".into(),
        };
        assert_eq!(
            format!("{:?}", ExitCode::from(&data)),
            format!("{:?}", ExitCode::from(5))
        );
    }
}
