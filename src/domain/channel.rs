//! Breakout channel readings and the collaborator that computes them from bars.
//!
//! The engine only ever sees [`ChannelReading`] values. [`build_channels`] is the reference
//! producer used by the replay driver: Donchian bounds over the bars *before* the current one,
//! and a Wilder-smoothed ATR ending at the current bar.

use super::ohlcv::Bar;

/// Channel bounds and volatility for one system on one bar.
///
/// Bounds describe the previous completed bar's lookback window, so a bar can never break out
/// of a channel that includes its own extreme. `NaN` marks a value that is still warming up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelReading {
    pub entry_high: f64,
    pub entry_low: f64,
    pub exit_high: f64,
    pub exit_low: f64,
    pub atr: f64,
}

impl ChannelReading {
    pub const WARMING_UP: ChannelReading = ChannelReading {
        entry_high: f64::NAN,
        entry_low: f64::NAN,
        exit_high: f64::NAN,
        exit_low: f64::NAN,
        atr: f64::NAN,
    };

    /// All five values are present.
    pub fn is_ready(&self) -> bool {
        !(self.entry_high.is_nan()
            || self.entry_low.is_nan()
            || self.exit_high.is_nan()
            || self.exit_low.is_nan()
            || self.atr.is_nan())
    }

    /// Same reading with a zero or negative ATR replaced by the price-based proxy, so stop
    /// distances and pyramid gaps never collapse to nothing. A warming-up ATR stays `NaN`.
    pub fn with_volatility_floor(self, close: f64, min_price_move_fraction: f64) -> Self {
        if self.atr.is_nan() {
            return self;
        }
        ChannelReading {
            atr: effective_volatility(self.atr, close, min_price_move_fraction),
            ..self
        }
    }
}

/// The ATR when it is positive and finite, otherwise `close * min_price_move_fraction`.
///
/// Sizing, stop distance and the pyramid gap all measure volatility through this.
pub fn effective_volatility(atr: f64, close: f64, min_price_move_fraction: f64) -> f64 {
    if atr > 0.0 && atr.is_finite() {
        atr
    } else {
        close * min_price_move_fraction
    }
}

/// Lookback periods for one system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelPeriods {
    pub entry: usize,
    pub exit: usize,
    pub atr: usize,
}

impl ChannelPeriods {
    /// Bars needed before every field of a reading is defined.
    pub fn warmup_bars(&self) -> usize {
        self.entry.max(self.exit).max(self.atr)
    }
}

/// Wilder ATR: the first value is the mean true range of the first `period` bars, then
/// `(prev * (period - 1) + tr) / period`. Entries before the seed are `NaN`.
pub fn wilder_atr(bars: &[Bar], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; bars.len()];
    if period == 0 || bars.len() < period {
        return out;
    }

    let tr: Vec<f64> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                bar.high - bar.low
            } else {
                bar.true_range(bars[i - 1].close)
            }
        })
        .collect();

    let seed = tr[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = seed;
    for i in period..bars.len() {
        out[i] = (out[i - 1] * (period - 1) as f64 + tr[i]) / period as f64;
    }
    out
}

/// Highest high over `bars[i - period..i]` for each `i`; `NaN` while fewer than `period`
/// earlier bars exist.
pub fn prior_highest_high(bars: &[Bar], period: usize) -> Vec<f64> {
    prior_window(bars, period, |b| b.high, f64::max)
}

/// Lowest low over `bars[i - period..i]` for each `i`.
pub fn prior_lowest_low(bars: &[Bar], period: usize) -> Vec<f64> {
    prior_window(bars, period, |b| b.low, f64::min)
}

fn prior_window(
    bars: &[Bar],
    period: usize,
    field: impl Fn(&Bar) -> f64,
    fold: impl Fn(f64, f64) -> f64,
) -> Vec<f64> {
    (0..bars.len())
        .map(|i| {
            if period == 0 || i < period {
                return f64::NAN;
            }
            bars[i - period..i]
                .iter()
                .map(&field)
                .reduce(&fold)
                .unwrap_or(f64::NAN)
        })
        .collect()
}

/// One reading per bar for a system with the given periods.
pub fn build_channels(bars: &[Bar], periods: &ChannelPeriods) -> Vec<ChannelReading> {
    let entry_high = prior_highest_high(bars, periods.entry);
    let entry_low = prior_lowest_low(bars, periods.entry);
    let exit_high = prior_highest_high(bars, periods.exit);
    let exit_low = prior_lowest_low(bars, periods.exit);
    let atr = wilder_atr(bars, periods.atr);

    (0..bars.len())
        .map(|i| ChannelReading {
            entry_high: entry_high[i],
            entry_low: entry_low[i],
            exit_high: exit_high[i],
            exit_low: exit_low[i],
            atr: atr[i],
        })
        .collect()
}
