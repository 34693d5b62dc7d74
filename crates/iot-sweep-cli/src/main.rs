use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use iot_sweep_abstract::{SweepConfig, SweepConfigOverride, SweepReport};
use iot_sweep_simulator::{
    CsvReportSink, ParameterGrid, ScenarioRunner, WirelessEngine, run_sweep, write_json_report,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Sweep IoT wireless scenarios over a TxPower x PacketInterval grid"
)]
struct Args {
    /// Load sweep settings from a TOML file. Flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of sensor nodes.
    #[arg(long)]
    nodes: Option<u32>,

    /// Simulated seconds per scenario.
    #[arg(long)]
    sim_time: Option<f64>,

    /// UDP payload size in bytes.
    #[arg(long)]
    packet_size: Option<u32>,

    /// Transmit powers to sweep, in dBm (comma separated).
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    tx_power: Option<Vec<f64>>,

    /// Packet intervals to sweep, in seconds (comma separated).
    #[arg(long, value_delimiter = ',')]
    interval: Option<Vec<f64>>,

    /// CSV output path.
    #[arg(long, short)]
    output: Option<PathBuf>,

    #[arg(long)]
    seed: Option<u64>,

    /// Give up on a scenario after this many seconds of wall-clock time.
    #[arg(long)]
    scenario_timeout: Option<f64>,

    /// Write a JSON report of the finished sweep.
    #[arg(long)]
    report_json: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt::init();
    info!("iot-sweep starting…");

    let config = args.resolve_config()?;
    run(&config)?;
    info!(
        "Finished. Results saved in {}",
        config.output_path.display()
    );
    Ok(())
}

/// Runs the sweep and writes every requested report.
fn run(config: &SweepConfig) -> Result<SweepReport> {
    let grid = ParameterGrid::from_config(config).context("Invalid sweep configuration")?;

    let mut sink = CsvReportSink::create(&config.output_path).with_context(|| {
        format!(
            "Failed to open output file {}",
            config.output_path.display()
        )
    })?;

    let mut engine = WirelessEngine::new(config.seed);
    if let Some(secs) = config.scenario_timeout_s {
        engine = engine.with_wall_clock_limit(Duration::from_secs_f64(secs));
    }
    let mut runner = ScenarioRunner::new(Box::new(engine));

    let report = run_sweep(&mut runner, &grid, &mut sink).context("Sweep aborted")?;
    log_summary(&report);

    if let Some(path) = &config.report_json {
        write_json_report(path, &report)
            .with_context(|| format!("Failed to write JSON report {}", path.display()))?;
    }

    Ok(report)
}

impl Args {
    fn overrides(&self) -> SweepConfigOverride {
        SweepConfigOverride {
            nodes: self.nodes,
            sim_time: self.sim_time,
            packet_size: self.packet_size,
            tx_power_list: self.tx_power.clone(),
            interval_list: self.interval.clone(),
            output_path: self.output.clone(),
            seed: self.seed,
            scenario_timeout: self.scenario_timeout,
            report_json: self.report_json.clone(),
        }
    }

    /// Defaults, then the config file, then flags.
    fn resolve_config(&self) -> Result<SweepConfig> {
        let mut config = SweepConfig::default();
        if let Some(path) = &self.config {
            load_config(path)?.apply_to(&mut config);
        }
        self.overrides().apply_to(&mut config);
        Ok(config)
    }
}

fn load_config(path: &Path) -> Result<SweepConfigOverride> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    parse_config(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}

fn parse_config(content: &str) -> Result<SweepConfigOverride> {
    Ok(toml::from_str(content)?)
}

fn log_summary(report: &SweepReport) {
    let failed = report.failed().count();
    if failed > 0 {
        warn!(
            "{} of {} scenarios failed and were reported with zero metrics",
            failed,
            report.len()
        );
    }
    info!("Completed {} scenarios", report.len() - failed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipped_config_parses() {
        let over = parse_config(include_str!("../../../configs/iot.toml")).unwrap();
        let mut config = SweepConfig::default();
        over.apply_to(&mut config);
        assert_eq!(config, SweepConfig::default());
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let over = parse_config("nodes = 10\nintervalList = [0.1, 2.0]\n").unwrap();
        let mut config = SweepConfig::default();
        over.apply_to(&mut config);
        assert_eq!(config.nodes, 10);
        assert_eq!(config.interval_list, vec![0.1, 2.0]);
        assert_eq!(config.sim_time_s, 30.0);
    }

    #[test]
    fn unknown_config_keys_are_rejected() {
        assert!(parse_config("txPower = [1.0]\n").is_err());
    }

    #[test]
    fn flags_override_defaults() {
        let args = Args::try_parse_from([
            "iot-sweep",
            "--nodes",
            "4",
            "--tx-power",
            "-3,0,5",
            "--interval",
            "0.25",
            "-o",
            "out.csv",
        ])
        .unwrap();
        let config = args.resolve_config().unwrap();
        assert_eq!(config.nodes, 4);
        assert_eq!(config.tx_power_list, vec![-3.0, 0.0, 5.0]);
        assert_eq!(config.interval_list, vec![0.25]);
        assert_eq!(config.output_path, PathBuf::from("out.csv"));
        assert_eq!(config.packet_size, 100);
    }

    fn small_config(name: &str) -> SweepConfig {
        let dir = std::env::temp_dir();
        SweepConfig {
            nodes: 3,
            sim_time_s: 3.0,
            tx_power_list: vec![16.0],
            interval_list: vec![0.5],
            output_path: dir.join(format!("iot-sweep-{}-{}.csv", name, std::process::id())),
            ..Default::default()
        }
    }

    #[test]
    fn run_writes_csv_and_json() {
        let json = std::env::temp_dir().join(format!("iot-sweep-{}.json", std::process::id()));
        let config = SweepConfig {
            report_json: Some(json.clone()),
            ..small_config("ok")
        };
        let report = run(&config).unwrap();
        assert_eq!(report.len(), 1);

        let csv = fs::read_to_string(&config.output_path).unwrap();
        assert_eq!(csv.lines().count(), 2);
        assert!(fs::metadata(&json).unwrap().len() > 0);
        fs::remove_file(&config.output_path).unwrap();
        fs::remove_file(&json).unwrap();
    }

    #[test]
    fn json_write_failure_fails_the_run() {
        let config = SweepConfig {
            report_json: Some(PathBuf::from("/nonexistent/dir/report.json")),
            ..small_config("bad-json")
        };
        let err = run(&config).unwrap_err();
        assert!(err.to_string().contains("Failed to write JSON report"));
        // The CSV is complete even though the run failed.
        let csv = fs::read_to_string(&config.output_path).unwrap();
        assert_eq!(csv.lines().count(), 2);
        fs::remove_file(&config.output_path).unwrap();
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let args =
            Args::try_parse_from(["iot-sweep", "--config", "/nonexistent/iot.toml"]).unwrap();
        assert!(args.resolve_config().is_err());
    }
}
