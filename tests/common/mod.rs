#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use turtle::domain::error::TurtleError;
use turtle::domain::intent::{Fill, Intent};
pub use turtle::domain::ohlcv::Bar;
use turtle::domain::strategy::{SystemConfig, TurtleConfig};
use turtle::ports::data_port::DataPort;
use turtle::ports::execution_port::ExecutionPort;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<Bar>, TurtleError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(TurtleError::Data {
                reason: reason.clone(),
            });
        }
        let bars = self.data.get(symbol).ok_or_else(|| TurtleError::NoData {
            symbol: symbol.to_string(),
        })?;
        Ok(bars
            .iter()
            .filter(|b| start.is_none_or(|s| b.timestamp.date() >= s))
            .filter(|b| end.is_none_or(|e| b.timestamp.date() <= e))
            .cloned()
            .collect())
    }

    fn list_symbols(&self) -> Result<Vec<String>, TurtleError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

/// Fills every intent at its reference price and keeps a log. Equity is cash plus a single
/// mark-to-market of the combined holding.
pub struct RecordingBroker {
    pub cash: f64,
    pub holding: f64,
    pub executed: Vec<Intent>,
}

impl RecordingBroker {
    pub fn new(cash: f64) -> Self {
        Self {
            cash,
            holding: 0.0,
            executed: Vec::new(),
        }
    }
}

impl ExecutionPort for RecordingBroker {
    fn execute(&mut self, intent: &Intent) -> Result<Fill, TurtleError> {
        let signed = intent.size * intent.side.sign();
        let delta = if intent.action.is_entry() { signed } else { -signed };
        self.holding += delta;
        self.cash -= delta * intent.reference_price;
        self.executed.push(intent.clone());
        Ok(Fill::at_reference(intent))
    }

    fn equity(&self, price: f64) -> f64 {
        self.cash + self.holding * price
    }
}

pub fn start_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// 4h bar `i` with the given close and a fixed half-range.
pub fn make_bar(i: usize, close: f64, half_range: f64) -> Bar {
    Bar {
        timestamp: start_time() + Duration::hours(4 * i as i64),
        open: close,
        high: close + half_range,
        low: close - half_range,
        close,
        volume: 100.0,
    }
}

pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_bar(i, c, 0.5))
        .collect()
}

/// Multiplicative walk driven by `steps` (each a fractional move, e.g. 0.01 for +1 %).
pub fn generate_bars(start: f64, steps: &[f64]) -> Vec<Bar> {
    let mut price = start;
    let mut closes = Vec::with_capacity(steps.len() + 1);
    closes.push(price);
    for step in steps {
        price = (price * (1.0 + step)).max(1.0);
        closes.push(price);
    }
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_bar(i, c, c * 0.005))
        .collect()
}

/// Short periods so scenarios stay small.
pub fn small_config() -> TurtleConfig {
    TurtleConfig {
        system1: SystemConfig {
            entry_period: 3,
            exit_period: 2,
            allocation: 0.5,
        },
        system2: SystemConfig {
            entry_period: 6,
            exit_period: 3,
            allocation: 0.5,
        },
        atr_period: 3,
        lot_size: 0.01,
        ..TurtleConfig::default()
    }
}
