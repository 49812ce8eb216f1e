//! Bar-by-bar replay of the engine against an execution collaborator.
//!
//! Channels for both systems are computed up front from the bar series, then each bar goes
//! through [`TurtleEngine::on_bar`]; every intent is executed immediately and its fill fed
//! back to the ledger. Equity is re-marked after the bar closes, never mid-bar.

use chrono::NaiveDateTime;

use super::channel::build_channels;
use super::error::TurtleError;
use super::intent::{Fill, Intent, SystemId};
use super::ohlcv::Bar;
use super::strategy::TurtleConfig;
use super::turtle::TurtleEngine;
use crate::ports::execution_port::ExecutionPort;

/// Account-level replay parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_equity: f64,
    pub commission_pct: f64,
    pub slippage_pct: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_equity: 100_000.0,
            commission_pct: 0.1,
            slippage_pct: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplayResult {
    pub intents: Vec<Intent>,
    pub fills: Vec<Fill>,
    pub equity_curve: Vec<EquityPoint>,
    pub initial_equity: f64,
    pub final_equity: f64,
    /// Signed size still held per system at the end of the replay.
    pub open_size: [f64; 2],
    /// Gain of the still-open units per system, marked at the last close.
    pub unrealized_pnl: [f64; 2],
}

impl ReplayResult {
    pub fn total_return(&self) -> f64 {
        if self.initial_equity == 0.0 {
            return 0.0;
        }
        self.final_equity / self.initial_equity - 1.0
    }

    pub fn intents_for(&self, system: SystemId) -> impl Iterator<Item = &Intent> {
        self.intents.iter().filter(move |i| i.system == system)
    }
}

pub fn run_replay(
    bars: &[Bar],
    config: &TurtleConfig,
    initial_equity: f64,
    broker: &mut dyn ExecutionPort,
) -> Result<ReplayResult, TurtleError> {
    let channels = SystemId::ALL.map(|id| build_channels(bars, &config.channel_periods(id)));
    let mut engine = TurtleEngine::new(config, initial_equity)?;

    let mut intents = Vec::new();
    let mut fills = Vec::new();
    let mut equity_curve = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        let readings = [channels[0][i], channels[1][i]];
        for intent in engine.on_bar(bar, &readings)? {
            let fill = broker.execute(&intent)?;
            engine.confirm_fill(intent.system, &fill)?;
            intents.push(intent);
            fills.push(fill);
        }

        let equity = broker.equity(bar.close);
        engine.set_equity(equity);
        equity_curve.push(EquityPoint {
            timestamp: bar.timestamp,
            equity,
        });
    }

    let final_equity = equity_curve
        .last()
        .map(|p| p.equity)
        .unwrap_or(initial_equity);
    let open_size = SystemId::ALL.map(|id| engine.ledger().aggregate_signed_size(id));
    let unrealized_pnl = match bars.last() {
        Some(last) => SystemId::ALL.map(|id| engine.state(id).unrealized_pnl(last.close)),
        None => [0.0; 2],
    };

    Ok(ReplayResult {
        intents,
        fills,
        equity_curve,
        initial_equity,
        final_equity,
        open_size,
        unrealized_pnl,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::intent::Action;
    use crate::domain::strategy::SystemConfig;
    use chrono::NaiveDate;

    struct InstantFill {
        cash: f64,
    }

    impl ExecutionPort for InstantFill {
        fn execute(&mut self, intent: &Intent) -> Result<Fill, TurtleError> {
            Ok(Fill::at_reference(intent))
        }

        fn equity(&self, _price: f64) -> f64 {
            self.cash
        }
    }

    fn bar(i: usize, close: f64) -> Bar {
        Bar {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
                + chrono::Duration::hours(4 * i as i64),
            open: close,
            high: close + 0.5,
            low: close - 0.5,
            close,
            volume: 10.0,
        }
    }

    fn short_config() -> TurtleConfig {
        TurtleConfig {
            system1: SystemConfig {
                entry_period: 3,
                exit_period: 2,
                allocation: 0.5,
            },
            system2: SystemConfig {
                entry_period: 5,
                exit_period: 3,
                allocation: 0.5,
            },
            atr_period: 3,
            lot_size: 0.01,
            ..TurtleConfig::default()
        }
    }

    #[test]
    fn flat_market_emits_nothing() {
        let bars: Vec<Bar> = (0..20).map(|i| bar(i, 100.0)).collect();
        let mut broker = InstantFill { cash: 100_000.0 };
        let result = run_replay(&bars, &short_config(), 100_000.0, &mut broker).unwrap();
        assert!(result.intents.is_empty());
        assert_eq!(result.equity_curve.len(), 20);
        assert_eq!(result.total_return(), 0.0);
    }

    #[test]
    fn rally_opens_then_pyramids() {
        let mut closes = vec![100.0; 6];
        closes.extend((1..=10).map(|k| 100.0 + 2.0 * k as f64));
        let bars: Vec<Bar> = closes.iter().enumerate().map(|(i, &c)| bar(i, c)).collect();
        let mut broker = InstantFill { cash: 100_000.0 };
        let result = run_replay(&bars, &short_config(), 100_000.0, &mut broker).unwrap();

        let s1: Vec<&Intent> = result.intents_for(SystemId::System1).collect();
        assert_eq!(s1[0].action, Action::Open);
        assert!(s1.iter().skip(1).all(|i| i.action == Action::Add));
        assert!(s1.len() <= 4);
        assert!(result.open_size[0] > 0.0);
        assert_eq!(result.intents.len(), result.fills.len());
        // the first unit was bought well below the final close of 120
        assert!(result.unrealized_pnl[0] > 0.0);
    }

    #[test]
    fn warmup_shorter_than_series() {
        let bars: Vec<Bar> = (0..2).map(|i| bar(i, 100.0 + i as f64 * 50.0)).collect();
        let mut broker = InstantFill { cash: 1.0 };
        let result = run_replay(&bars, &short_config(), 1.0, &mut broker).unwrap();
        assert!(result.intents.is_empty());
    }

    #[test]
    fn empty_series_keeps_initial_equity() {
        let mut broker = InstantFill { cash: 5.0 };
        let result = run_replay(&[], &short_config(), 5.0, &mut broker).unwrap();
        assert_eq!(result.final_equity, 5.0);
        assert!(result.equity_curve.is_empty());
        assert_eq!(result.unrealized_pnl, [0.0; 2]);
    }
}
