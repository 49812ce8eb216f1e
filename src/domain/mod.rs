//! Turtle domain: bars, channels, the per-system state machine and the engine that ties them
//! to sizing, stops and the ledger.

pub mod ohlcv;
pub mod position;
pub mod intent;
pub mod ledger;
pub mod channel;
pub mod risk;
pub mod allocator;
pub mod engine;
pub mod strategy;
pub mod turtle;
pub mod backtest;
pub mod optimize;
pub mod config_validation;
pub mod error;
