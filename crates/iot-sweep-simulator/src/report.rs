use crate::sweep::ReportSink;
use iot_sweep_abstract::{ScenarioRecord, SweepReport};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use tracing::debug;

pub const CSV_HEADER: [&str; 6] = [
    "TxPower",
    "PacketInterval",
    "Throughput_Mbps",
    "Delay_s",
    "PDR",
    "Flows",
];

/// Streams one CSV line per grid point, flushing after each so a crash
/// mid-sweep keeps everything finished so far.
pub struct CsvReportSink<W: Write> {
    writer: csv::Writer<W>,
    rows: usize,
}

impl CsvReportSink<File> {
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        Self::from_writer(file)
    }
}

impl<W: Write> CsvReportSink<W> {
    pub fn from_writer(inner: W) -> io::Result<Self> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(inner);
        writer.write_record(CSV_HEADER)?;
        writer.flush()?;
        Ok(Self { writer, rows: 0 })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn into_inner(self) -> io::Result<W> {
        self.writer.into_inner().map_err(|e| e.into_error())
    }
}

/// Failed scenarios are written as zero metrics with `Flows = 0`.
fn csv_row(record: &ScenarioRecord) -> [String; 6] {
    let result = record.outcome.result_or_zero();
    [
        record.params.tx_power_dbm.to_string(),
        record.params.packet_interval_s.to_string(),
        result.throughput_mbps.to_string(),
        result.delay_s.to_string(),
        result.pdr.to_string(),
        result.flows.to_string(),
    ]
}

impl<W: Write> ReportSink for CsvReportSink<W> {
    fn scenario_finished(&mut self, record: &ScenarioRecord) -> io::Result<()> {
        self.writer.write_record(csv_row(record))?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        debug!("CSV report complete with {} rows", self.rows);
        self.writer.flush()
    }
}

/// Dump the whole sweep as pretty-printed JSON.
pub fn write_json_report(path: &Path, report: &SweepReport) -> io::Result<()> {
    let data = serde_json::to_vec_pretty(report)?;
    fs::write(path, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use iot_sweep_abstract::{ScenarioOutcome, ScenarioParameters, ScenarioResult};

    fn record(tx: f64, interval: f64, outcome: ScenarioOutcome) -> ScenarioRecord {
        ScenarioRecord {
            params: ScenarioParameters {
                nodes: 30,
                sim_time_s: 30.0,
                tx_power_dbm: tx,
                packet_interval_s: interval,
                packet_size: 100,
            },
            outcome,
        }
    }

    fn sample() -> Vec<ScenarioRecord> {
        vec![
            record(
                10.0,
                0.2,
                ScenarioOutcome::Completed(ScenarioResult {
                    throughput_mbps: 0.01024,
                    delay_s: 0.02,
                    pdr: 1.0,
                    flows: 1,
                }),
            ),
            record(
                12.0,
                0.5,
                ScenarioOutcome::Failed {
                    error: "address pool exhausted".into(),
                },
            ),
        ]
    }

    #[test]
    fn writes_header_and_rows() {
        let mut sink = CsvReportSink::from_writer(Vec::new()).unwrap();
        for r in sample() {
            sink.scenario_finished(&r).unwrap();
        }
        sink.finish().unwrap();
        assert_eq!(sink.rows(), 2);

        let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        assert_eq!(
            text,
            "TxPower,PacketInterval,Throughput_Mbps,Delay_s,PDR,Flows\n\
             10,0.2,0.01024,0.02,1,1\n\
             12,0.5,0,0,0,0\n"
        );
    }

    #[test]
    fn empty_sweep_still_has_header() {
        let sink = CsvReportSink::from_writer(Vec::new()).unwrap();
        let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        assert_eq!(text, "TxPower,PacketInterval,Throughput_Mbps,Delay_s,PDR,Flows\n");
    }

    #[test]
    fn json_report_tags_outcomes() {
        let report = SweepReport { records: sample() };
        let path = std::env::temp_dir()
            .join(format!("iot-sweep-report-{}.json", std::process::id()));
        write_json_report(&path, &report).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert!(text.contains("\"status\": \"completed\""));
        assert!(text.contains("\"status\": \"failed\""));
        assert!(text.contains("address pool exhausted"));

        let parsed: SweepReport = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.records[1].params.tx_power_dbm, 12.0);
        assert!(parsed.records[1].outcome.is_failed());
    }
}
