//! CLI integration tests.
//!
//! Tests cover:
//! - Strategy and Monte Carlo settings resolved from INI files
//! - Symbol resolution (override, config list, data directory)
//! - Subcommands end to end over CSV fixtures on disk

mod common;

use common::*;
use meanrev::adapters::file_config_adapter::FileConfigAdapter;
use meanrev::cli::{self, Cli, Command};
use meanrev::domain::bar::Bar;
use meanrev::domain::position::StopRule;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use tempfile::TempDir;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// ExitCode has no PartialEq; compare through Debug.
fn assert_exit(actual: ExitCode, expected: u8) {
    assert_eq!(
        format!("{:?}", actual),
        format!("{:?}", ExitCode::from(expected))
    );
}

fn write_csv(dir: &Path, symbol: &str, bars: &[Bar]) {
    let mut content = String::from(
        "timestamp,open,high,low,close,adjusted_close,volume,dividend_amount,split_coefficient\n",
    );
    // newest first, like the upstream export
    for b in bars.iter().rev() {
        content.push_str(&format!(
            "{},{},{},{},{},{},{},0.0,{}\n",
            b.date, b.open, b.high, b.low, b.close, b.adjusted_close, b.volume, b.split_coefficient
        ));
    }
    fs::write(dir.join(format!("{symbol}.csv")), content).unwrap();
}

fn data_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_csv(dir.path(), "APA", &wavy_bars(160, 40.0));
    write_csv(dir.path(), "XOM", &wavy_bars(160, 80.0));
    write_csv(dir.path(), "CVX", &wavy_bars(150, 100.0));
    dir
}

/// Closes with one tight squeeze followed by a breakout at bar 10, so the
/// squeeze strategy below opens a long at bar 11 and closes it at bar 12.
fn trading_bars() -> Vec<Bar> {
    let closes = [
        100.0, 120.0, 90.0, 115.0, 95.0, 100.0, 100.5, 100.0, 100.4, 100.2, 106.0, 90.0, 120.0,
        80.0, 80.0,
    ];
    let prices: Vec<(f64, f64)> = closes.iter().map(|&c| (c, c)).collect();
    bars_from(&prices)
}

fn trading_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_csv(dir.path(), "APA", &trading_bars());
    write_csv(dir.path(), "XOM", &trading_bars());
    write_csv(dir.path(), "CVX", &trading_bars()[..12]);
    dir
}

fn trading_ini(dir: &Path) -> String {
    format!(
        r#"
[data]
directory = {}

[strategy]
window = 3
width = 1.0
bandwidth_window = 4
squeeze_lookback = 2
stop_loss = false
"#,
        dir.display()
    )
}

fn ini_for(dir: &Path, extra: &str) -> String {
    format!(
        r#"
[data]
directory = {}

[strategy]
name = Squeeze Test
window = 10
width = 2.0
bandwidth_window = 40
stop_loss = true
stop_loss_perc = 0.1

[monte_carlo]
iterations = 4
seed = 42
parallel = false
{extra}
"#,
        dir.display()
    )
}

mod config_resolution {
    use super::*;

    #[test]
    fn strategy_from_ini() {
        let adapter = FileConfigAdapter::from_string(&ini_for(Path::new("/data"), "")).unwrap();
        let strategy = cli::build_strategy(&adapter);

        assert_eq!(strategy.name, "Squeeze Test");
        assert_eq!(strategy.stop, StopRule::FixedPercent(0.1));
    }

    #[test]
    fn mc_config_from_ini() {
        let adapter = FileConfigAdapter::from_string(&ini_for(Path::new("/data"), "")).unwrap();
        let mc = cli::build_mc_config(&adapter, None, None, false);

        assert_eq!(mc.iterations, 4);
        assert_eq!(mc.seed, 42);
        assert!(!mc.parallel);
    }

    #[test]
    fn symbol_override_wins() {
        let adapter =
            FileConfigAdapter::from_string("[data]\ndirectory = /data\nsymbols = APA, XOM\n")
                .unwrap();
        let port = MockDataPort::new().with_bars("CVX", wavy_bars(5, 10.0));

        let symbols = cli::resolve_symbols(Some(" cvx "), &adapter, &port).unwrap();
        assert_eq!(symbols, vec!["CVX"]);
    }

    #[test]
    fn symbols_from_config_list() {
        let adapter =
            FileConfigAdapter::from_string("[data]\ndirectory = /data\nsymbols = apa, XOM,\n")
                .unwrap();
        let port = MockDataPort::new();

        let symbols = cli::resolve_symbols(None, &adapter, &port).unwrap();
        assert_eq!(symbols, vec!["APA", "XOM"]);
    }

    #[test]
    fn symbols_default_to_data_port_listing() {
        let adapter = FileConfigAdapter::from_string("[data]\ndirectory = /data\n").unwrap();
        let port = MockDataPort::new()
            .with_bars("XOM", wavy_bars(5, 10.0))
            .with_bars("APA", wavy_bars(5, 10.0));

        let symbols = cli::resolve_symbols(None, &adapter, &port).unwrap();
        assert_eq!(symbols, vec!["APA", "XOM"]);
    }
}

mod commands {
    use super::*;

    #[test]
    fn backtest_writes_report() {
        let data = trading_dir();
        let ini = write_temp_ini(&trading_ini(data.path()));
        let out = TempDir::new().unwrap();

        let code = cli::run(Cli {
            command: Command::Backtest {
                config: ini.path().to_path_buf(),
                symbol: None,
                output: Some(out.path().to_path_buf()),
            },
        });

        assert_exit(code, 0);
        let trades = fs::read_to_string(out.path().join("trades.csv")).unwrap();
        let transactions = fs::read_to_string(out.path().join("transactions.csv")).unwrap();
        assert!(trades.starts_with("symbol,entry_date,close_date,days_held,direction"));
        assert!(transactions.starts_with("symbol,date,direction,is_close,price"));

        let rows: Vec<&str> = trades.lines().skip(1).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with("APA,2018-01-11,2018-01-12,1,1,90.0,120.0,"));
        assert!(rows[1].starts_with("XOM,2018-01-11,2018-01-12,1,1,90.0,120.0,"));
        assert_eq!(transactions.lines().count(), 5);
        // CVX has a different length and is cleansed away
        assert!(!transactions.contains("CVX"));
        assert!(!trades.contains("CVX"));
    }

    #[test]
    fn backtest_report_dir_from_config() {
        let data = data_dir();
        let out = TempDir::new().unwrap();
        let extra = format!("\n[report]\noutput_dir = {}\n", out.path().display());
        let ini = write_temp_ini(&ini_for(data.path(), &extra));

        let code = cli::run(Cli {
            command: Command::Backtest {
                config: ini.path().to_path_buf(),
                symbol: Some("APA".into()),
                output: None,
            },
        });

        assert_exit(code, 0);
        assert!(out.path().join("transactions.csv").exists());
    }

    #[test]
    fn backtest_unknown_symbol_has_no_data() {
        let data = data_dir();
        let ini = write_temp_ini(&ini_for(data.path(), ""));

        let code = cli::run(Cli {
            command: Command::Backtest {
                config: ini.path().to_path_buf(),
                symbol: Some("NOPE".into()),
                output: None,
            },
        });

        assert_exit(code, 5);
    }

    #[test]
    fn monte_carlo_runs_sequentially() {
        let data = data_dir();
        let ini = write_temp_ini(&ini_for(data.path(), ""));

        let code = cli::run(Cli {
            command: Command::MonteCarlo {
                config: ini.path().to_path_buf(),
                iterations: Some(3),
                seed: Some(7),
                sequential: true,
            },
        });

        assert_exit(code, 0);
    }

    #[test]
    fn validate_accepts_good_config() {
        let data = data_dir();
        let ini = write_temp_ini(&ini_for(data.path(), ""));

        let code = cli::run(Cli {
            command: Command::Validate {
                config: ini.path().to_path_buf(),
            },
        });

        assert_exit(code, 0);
    }

    #[test]
    fn validate_rejects_bad_window() {
        let ini = write_temp_ini("[data]\ndirectory = /data\n\n[strategy]\nwindow = 1\n");

        let code = cli::run(Cli {
            command: Command::Validate {
                config: ini.path().to_path_buf(),
            },
        });

        assert_exit(code, 2);
    }

    #[test]
    fn validate_rejects_missing_directory() {
        let ini = write_temp_ini("[strategy]\nwindow = 20\n");

        let code = cli::run(Cli {
            command: Command::Validate {
                config: ini.path().to_path_buf(),
            },
        });

        assert_exit(code, 2);
    }

    #[test]
    fn missing_config_file_is_config_error() {
        let code = cli::run(Cli {
            command: Command::Validate {
                config: "/nonexistent/meanrev.ini".into(),
            },
        });

        assert_exit(code, 2);
    }

    #[test]
    fn list_symbols_succeeds() {
        let data = data_dir();
        let ini = write_temp_ini(&ini_for(data.path(), ""));

        let code = cli::run(Cli {
            command: Command::ListSymbols {
                config: ini.path().to_path_buf(),
            },
        });

        assert_exit(code, 0);
    }

    #[test]
    fn list_symbols_missing_directory_is_data_error() {
        let ini = write_temp_ini("[data]\ndirectory = /nonexistent/meanrev/data\n");

        let code = cli::run(Cli {
            command: Command::ListSymbols {
                config: ini.path().to_path_buf(),
            },
        });

        assert_exit(code, 3);
    }
}
