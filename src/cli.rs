//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::paper_broker::{BrokerConfig, PaperBroker};
use crate::domain::backtest::{BacktestConfig, ReplayResult, run_replay};
use crate::domain::config_validation::{
    system_defaults, validate_account_config, validate_data_range, validate_turtle_config,
};
use crate::domain::error::TurtleError;
use crate::domain::intent::{Action, SystemId};
use crate::domain::ohlcv::Bar;
use crate::domain::optimize::{ParamGrid, SweepRow, sweep};
use crate::domain::position::Side;
use crate::domain::strategy::{SystemConfig, TurtleConfig};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(name = "turtle", about = "Dual-system turtle trend-following engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay bars through the engine with paper fills
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory of <SYMBOL>.csv files (overrides [data] path)
        #[arg(short, long)]
        data: Option<PathBuf>,
        #[arg(short, long)]
        symbol: Option<String>,
        /// Intent CSV destination; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Sweep channel periods over the classic grid and rank by total return
    Optimize {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: Option<PathBuf>,
        #[arg(short, long)]
        symbol: Option<String>,
        /// Ranking CSV destination; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration and print the resolved parameters
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List symbols available in a data directory
    ListSymbols {
        #[arg(short, long)]
        data: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Run {
            config,
            data,
            symbol,
            output,
        } => run_turtle(&config, data.as_deref(), symbol.as_deref(), output.as_deref()),
        Command::Optimize {
            config,
            data,
            symbol,
            output,
        } => run_optimize(&config, data.as_deref(), symbol.as_deref(), output.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { data } => run_list_symbols(&data),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, TurtleError> {
    tracing::info!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path)
}

fn validate_all(config: &dyn ConfigPort) -> Result<(), TurtleError> {
    validate_account_config(config)?;
    validate_turtle_config(config)?;
    validate_data_range(config)?;
    Ok(())
}

fn get_period(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<usize, TurtleError> {
    let value = config.get_int(section, key, default)?;
    usize::try_from(value).map_err(|_| TurtleError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: format!("{key} must be non-negative"),
    })
}

pub fn build_turtle_config(config: &dyn ConfigPort) -> Result<TurtleConfig, TurtleError> {
    let system = |id: SystemId| -> Result<SystemConfig, TurtleError> {
        let section = id.to_string();
        let (entry, exit) = system_defaults(id);
        Ok(SystemConfig {
            entry_period: get_period(config, &section, "entry_period", entry)?,
            exit_period: get_period(config, &section, "exit_period", exit)?,
            allocation: config.get_double(&section, "allocation", 0.5)?,
        })
    };
    let defaults = TurtleConfig::default();

    Ok(TurtleConfig {
        system1: system(SystemId::System1)?,
        system2: system(SystemId::System2)?,
        atr_period: get_period(config, "turtle", "atr_period", defaults.atr_period as i64)?,
        risk_ratio: config.get_double("turtle", "risk_ratio", defaults.risk_ratio)?,
        max_units: get_period(config, "turtle", "max_units", defaults.max_units as i64)?,
        unit_gap: config.get_double("turtle", "unit_gap", defaults.unit_gap)?,
        stop_atr_multiple: config.get_double(
            "turtle",
            "stop_atr_multiple",
            defaults.stop_atr_multiple,
        )?,
        min_price_move_fraction: config.get_double(
            "turtle",
            "min_price_move_fraction",
            defaults.min_price_move_fraction,
        )?,
        lot_size: config.get_double("turtle", "lot_size", defaults.lot_size)?,
    })
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, TurtleError> {
    let defaults = BacktestConfig::default();
    Ok(BacktestConfig {
        initial_equity: config.get_double("account", "initial_equity", defaults.initial_equity)?,
        commission_pct: config.get_double("account", "commission_pct", defaults.commission_pct)?,
        slippage_pct: config.get_double("account", "slippage_pct", defaults.slippage_pct)?,
    })
}

pub fn resolve_data_path(
    data_override: Option<&Path>,
    config: &dyn ConfigPort,
) -> Result<PathBuf, TurtleError> {
    match data_override {
        Some(p) => Ok(p.to_path_buf()),
        None => config
            .get_string("data", "path")
            .map(PathBuf::from)
            .ok_or_else(|| TurtleError::ConfigMissing {
                section: "data".into(),
                key: "path".into(),
            }),
    }
}

pub fn resolve_symbol(
    symbol_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<String, TurtleError> {
    symbol_override
        .map(str::to_string)
        .or_else(|| config.get_string("data", "symbol"))
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| TurtleError::ConfigMissing {
            section: "data".into(),
            key: "symbol".into(),
        })
}

fn run_turtle(
    config_path: &Path,
    data_override: Option<&Path>,
    symbol_override: Option<&str>,
    output_path: Option<&Path>,
) -> Result<(), TurtleError> {
    let adapter = load_config(config_path)?;
    validate_all(&adapter)?;

    let turtle_config = build_turtle_config(&adapter)?;
    let bt_config = build_backtest_config(&adapter)?;
    let (symbol, bars) = load_bars(
        &adapter,
        data_override,
        symbol_override,
        turtle_config.warmup_bars() + 1,
    )?;

    let mut broker = paper_broker(&bt_config);
    let result = run_replay(&bars, &turtle_config, bt_config.initial_equity, &mut broker)?;

    match output_path {
        Some(path) => {
            write_intents(File::create(path)?, &result)?;
            tracing::info!(path = %path.display(), intents = result.intents.len(), "intents written");
        }
        None => write_intents(io::stdout().lock(), &result)?,
    }

    print_summary(&symbol, &result, broker.total_commission);
    Ok(())
}

fn paper_broker(bt_config: &BacktestConfig) -> PaperBroker {
    PaperBroker::new(
        bt_config.initial_equity,
        BrokerConfig {
            commission_pct: bt_config.commission_pct,
            slippage_pct: bt_config.slippage_pct,
        },
    )
}

/// Resolve the data source and fetch the configured date range, failing when fewer than
/// `minimum` bars come back.
fn load_bars(
    adapter: &dyn ConfigPort,
    data_override: Option<&Path>,
    symbol_override: Option<&str>,
    minimum: usize,
) -> Result<(String, Vec<Bar>), TurtleError> {
    let (start, end) = validate_data_range(adapter)?;
    let data_path = resolve_data_path(data_override, adapter)?;
    let symbol = resolve_symbol(symbol_override, adapter)?;

    let data_port = CsvAdapter::new(data_path);
    let bars = data_port.fetch_bars(&symbol, start, end)?;
    let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
        return Err(TurtleError::NoData { symbol });
    };
    if bars.len() < minimum {
        return Err(TurtleError::InsufficientData {
            symbol,
            bars: bars.len(),
            minimum,
        });
    }

    tracing::info!(
        symbol = %symbol,
        bars = bars.len(),
        first = %first.timestamp,
        last = %last.timestamp,
        "bars loaded"
    );
    Ok((symbol, bars))
}

fn run_optimize(
    config_path: &Path,
    data_override: Option<&Path>,
    symbol_override: Option<&str>,
    output_path: Option<&Path>,
) -> Result<(), TurtleError> {
    let adapter = load_config(config_path)?;
    validate_all(&adapter)?;

    let base = build_turtle_config(&adapter)?;
    let bt_config = build_backtest_config(&adapter)?;
    let grid = ParamGrid::classic();
    // the longest combination still needs a full warm-up
    let minimum = grid
        .configs(&base)
        .iter()
        .map(|c| c.warmup_bars() + 1)
        .max()
        .unwrap_or(1);
    let (symbol, bars) = load_bars(&adapter, data_override, symbol_override, minimum)?;

    let rows = sweep(&bars, &grid, &base, bt_config.initial_equity, || {
        paper_broker(&bt_config)
    })?;

    match output_path {
        Some(path) => write_sweep(File::create(path)?, &rows)?,
        None => write_sweep(io::stdout().lock(), &rows)?,
    }

    eprintln!("\n=== {} sweep: {} combinations ===", symbol, rows.len());
    if let Some(best) = rows.first() {
        eprintln!(
            "Best: system1 {}/{} system2 {}/{}  return {:.2}%",
            best.system1_entry,
            best.system1_exit,
            best.system2_entry,
            best.system2_exit,
            best.total_return * 100.0
        );
    }
    Ok(())
}

pub fn write_sweep<W: Write>(writer: W, rows: &[SweepRow]) -> Result<(), TurtleError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row).map_err(io::Error::from)?;
    }
    wtr.flush()?;
    Ok(())
}

/// One line of the intent CSV.
#[derive(Debug, Serialize)]
pub struct IntentRow {
    pub timestamp: String,
    pub system: SystemId,
    pub action: Action,
    pub side: Side,
    pub size: f64,
    pub reference_price: f64,
    pub fill_price: f64,
}

pub fn write_intents<W: Write>(writer: W, result: &ReplayResult) -> Result<(), TurtleError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for (intent, fill) in result.intents.iter().zip(&result.fills) {
        wtr.serialize(IntentRow {
            timestamp: intent.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            system: intent.system,
            action: intent.action,
            side: intent.side,
            size: intent.size,
            reference_price: intent.reference_price,
            fill_price: fill.price,
        })
        .map_err(io::Error::from)?;
    }
    wtr.flush()?;
    Ok(())
}

fn print_summary(symbol: &str, result: &ReplayResult, commission: f64) {
    const ACTIONS: [Action; 4] = [Action::Open, Action::Add, Action::Exit, Action::StopOut];

    eprintln!("\n=== {} ===", symbol);
    for id in SystemId::ALL {
        let counts: Vec<String> = ACTIONS
            .iter()
            .map(|&a| {
                let n = result.intents_for(id).filter(|i| i.action == a).count();
                format!("{a}={n}")
            })
            .collect();
        eprintln!("  {id}: {}", counts.join(" "));
        eprintln!(
            "    open size: {:.6}  unrealized: {:.2}",
            result.open_size[id.index()],
            result.unrealized_pnl[id.index()]
        );
    }
    eprintln!("Initial Equity:   {:.2}", result.initial_equity);
    eprintln!("Final Equity:     {:.2}", result.final_equity);
    eprintln!("Total Return:     {:.2}%", result.total_return() * 100.0);
    eprintln!("Commission Paid:  {:.2}", commission);
}

fn run_validate(config_path: &Path) -> Result<(), TurtleError> {
    let adapter = load_config(config_path)?;
    validate_all(&adapter)?;

    let c = build_turtle_config(&adapter)?;
    let bt = build_backtest_config(&adapter)?;
    let (start, end) = validate_data_range(&adapter)?;

    eprintln!("Account:");
    eprintln!("  initial_equity:          {}", bt.initial_equity);
    eprintln!("  commission_pct:          {}", bt.commission_pct);
    eprintln!("  slippage_pct:            {}", bt.slippage_pct);
    for id in SystemId::ALL {
        let s = c.system(id);
        eprintln!("{id}:");
        eprintln!("  entry_period:            {}", s.entry_period);
        eprintln!("  exit_period:             {}", s.exit_period);
        eprintln!("  allocation:              {}", s.allocation);
    }
    eprintln!("Turtle:");
    eprintln!("  atr_period:              {}", c.atr_period);
    eprintln!("  risk_ratio:              {}", c.risk_ratio);
    eprintln!("  max_units:               {}", c.max_units);
    eprintln!("  unit_gap:                {}", c.unit_gap);
    eprintln!("  stop_atr_multiple:       {}", c.stop_atr_multiple);
    eprintln!("  min_price_move_fraction: {}", c.min_price_move_fraction);
    eprintln!("  lot_size:                {}", c.lot_size);
    eprintln!("  warmup_bars:             {}", c.warmup_bars());
    if start.is_some() || end.is_some() {
        let show = |d: Option<chrono::NaiveDate>| d.map_or("open".to_string(), |d| d.to_string());
        eprintln!("Data range: {} to {}", show(start), show(end));
    }

    eprintln!("\nConfiguration is valid.");
    Ok(())
}

fn run_list_symbols(data_path: &Path) -> Result<(), TurtleError> {
    let adapter = CsvAdapter::new(data_path.to_path_buf());
    let symbols = adapter.list_symbols()?;

    if symbols.is_empty() {
        eprintln!("No symbols found in {}", data_path.display());
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::intent::{Fill, Intent};
    use chrono::NaiveDate;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn build_turtle_config_uses_defaults() {
        let c = build_turtle_config(&make_config("")).unwrap();
        assert_eq!(c, TurtleConfig::default());
    }

    #[test]
    fn build_turtle_config_reads_overrides() {
        let c = build_turtle_config(&make_config(
            "[system1]\nentry_period = 10\nallocation = 0.25\n\
             [system2]\nallocation = 0.75\n\
             [turtle]\nmax_units = 2\nlot_size = 1\n",
        ))
        .unwrap();
        assert_eq!(c.system1.entry_period, 10);
        assert_eq!(c.system1.exit_period, 10);
        assert_eq!(c.system1.allocation, 0.25);
        assert_eq!(c.system2.allocation, 0.75);
        assert_eq!(c.max_units, 2);
        assert_eq!(c.lot_size, 1.0);
    }

    #[test]
    fn negative_period_is_invalid() {
        let err = build_turtle_config(&make_config("[turtle]\natr_period = -3\n")).unwrap_err();
        assert!(matches!(err, TurtleError::ConfigInvalid { key, .. } if key == "atr_period"));
    }

    #[test]
    fn build_backtest_config_reads_account() {
        let bt = build_backtest_config(&make_config(
            "[account]\ninitial_equity = 2500\nslippage_pct = 0.2\n",
        ))
        .unwrap();
        assert_eq!(bt.initial_equity, 2500.0);
        assert_eq!(bt.commission_pct, 0.1);
        assert_eq!(bt.slippage_pct, 0.2);
    }

    #[test]
    fn symbol_override_wins_and_is_uppercased() {
        let config = make_config("[data]\nsymbol = ethusdt\n");
        assert_eq!(resolve_symbol(Some("btcusdt"), &config).unwrap(), "BTCUSDT");
        assert_eq!(resolve_symbol(None, &config).unwrap(), "ETHUSDT");
        assert!(resolve_symbol(None, &make_config("")).is_err());
    }

    #[test]
    fn data_path_requires_config_or_override() {
        let err = resolve_data_path(None, &make_config("")).unwrap_err();
        assert!(matches!(err, TurtleError::ConfigMissing { key, .. } if key == "path"));
        let p = resolve_data_path(Some(Path::new("/tmp/bars")), &make_config("")).unwrap();
        assert_eq!(p, PathBuf::from("/tmp/bars"));
    }

    #[test]
    fn intents_serialise_as_csv() {
        let intent = Intent {
            timestamp: NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            system: SystemId::System2,
            action: Action::StopOut,
            side: Side::Short,
            size: 1.5,
            reference_price: 200.0,
        };
        let result = ReplayResult {
            intents: vec![intent],
            fills: vec![Fill {
                price: 201.0,
                size: 1.5,
            }],
            equity_curve: vec![],
            initial_equity: 1.0,
            final_equity: 1.0,
            open_size: [0.0; 2],
            unrealized_pnl: [0.0; 2],
        };
        let mut buf = Vec::new();
        write_intents(&mut buf, &result).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("timestamp,system,action,side,size,reference_price,fill_price")
        );
        assert_eq!(
            lines.next(),
            Some("2024-03-01 12:00:00,system2,stop_out,short,1.5,200.0,201.0")
        );
    }
}
