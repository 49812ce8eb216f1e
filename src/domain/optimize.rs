//! Grid sweep over channel periods.
//!
//! Every combination in a [`ParamGrid`] is replayed over the same bars with a fresh broker,
//! and the results come back ranked by total return.

use serde::Serialize;

use super::backtest::run_replay;
use super::error::TurtleError;
use super::ohlcv::Bar;
use super::strategy::TurtleConfig;
use crate::ports::execution_port::ExecutionPort;

/// Candidate entry and exit periods for both systems.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamGrid {
    pub system1_entry: Vec<usize>,
    pub system1_exit: Vec<usize>,
    pub system2_entry: Vec<usize>,
    pub system2_exit: Vec<usize>,
}

impl ParamGrid {
    /// Three values either side of the classic 20/10 and 55/20 periods.
    pub fn classic() -> Self {
        ParamGrid {
            system1_entry: vec![15, 20, 25],
            system1_exit: vec![8, 10, 12],
            system2_entry: vec![50, 55, 60],
            system2_exit: vec![15, 20, 25],
        }
    }

    /// Upper bound on the number of combinations; [`configs`](Self::configs) may return fewer.
    pub fn size(&self) -> usize {
        self.system1_entry.len()
            * self.system1_exit.len()
            * self.system2_entry.len()
            * self.system2_exit.len()
    }

    /// `base` with each combination applied. Combinations whose exit period is not shorter
    /// than the entry period are skipped.
    pub fn configs(&self, base: &TurtleConfig) -> Vec<TurtleConfig> {
        let mut out = Vec::with_capacity(self.size());
        for &e1 in &self.system1_entry {
            for &x1 in self.system1_exit.iter().filter(|&&x| x < e1) {
                for &e2 in &self.system2_entry {
                    for &x2 in self.system2_exit.iter().filter(|&&x| x < e2) {
                        let mut config = base.clone();
                        config.system1.entry_period = e1;
                        config.system1.exit_period = x1;
                        config.system2.entry_period = e2;
                        config.system2.exit_period = x2;
                        out.push(config);
                    }
                }
            }
        }
        out
    }
}

/// Outcome of one combination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepRow {
    pub system1_entry: usize,
    pub system1_exit: usize,
    pub system2_entry: usize,
    pub system2_exit: usize,
    pub intents: usize,
    pub final_equity: f64,
    pub total_return: f64,
}

/// Replay every combination, best total return first. Ties keep grid order.
pub fn sweep<B, F>(
    bars: &[Bar],
    grid: &ParamGrid,
    base: &TurtleConfig,
    initial_equity: f64,
    mut new_broker: F,
) -> Result<Vec<SweepRow>, TurtleError>
where
    B: ExecutionPort,
    F: FnMut() -> B,
{
    let configs = grid.configs(base);
    tracing::info!(combinations = configs.len(), bars = bars.len(), "starting sweep");

    let mut rows = Vec::with_capacity(configs.len());
    for config in &configs {
        let mut broker = new_broker();
        let result = run_replay(bars, config, initial_equity, &mut broker)?;
        let row = SweepRow {
            system1_entry: config.system1.entry_period,
            system1_exit: config.system1.exit_period,
            system2_entry: config.system2.entry_period,
            system2_exit: config.system2.exit_period,
            intents: result.intents.len(),
            final_equity: result.final_equity,
            total_return: result.total_return(),
        };
        tracing::debug!(?row, "combination done");
        rows.push(row);
    }

    rows.sort_by(|a, b| b.total_return.total_cmp(&a.total_return));
    Ok(rows)
}
