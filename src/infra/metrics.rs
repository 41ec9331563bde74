// ============================================================
// Layer 6: Metrics Writer
// ============================================================
// Writes the training log as two CSV tables and renders the
// per-epoch means as charts.
//
// Output files (in the run's output directory):
//   epoch_cost.csv       iteration,epoch,cost       one row per mini-batch
//   epoch_val_error.csv  iteration,epoch,val_error  one row per validation
//   epoch_cost.svg       mean cost per epoch
//   epoch_val_error.svg  mean validation error per epoch
//
// Tables are rewritten from scratch every time, never appended,
// so a partial run always leaves a consistent pair of files.
//
// Example CSV output:
//   iteration,epoch,cost
//   0,1,2.312734
//   1,1,2.298110
//   ...
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::records::TrainingRecord;
use crate::domain::traits::TrainingObserver;
use crate::infra::charts::LineChart;

pub const COST_TABLE: &str = "epoch_cost.csv";
pub const VAL_ERROR_TABLE: &str = "epoch_val_error.csv";
pub const COST_CHART: &str = "epoch_cost.svg";
pub const VAL_ERROR_CHART: &str = "epoch_val_error.svg";

/// Tables are refreshed at the start of every epoch after this one.
const FIRST_PROGRESSIVE_EPOCH: usize = 3;

pub struct MetricsWriter {
    dir: PathBuf,
}

impl MetricsWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create output directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Overwrite both tables with every row in `record`.
    pub fn write_tables(&self, record: &TrainingRecord) -> Result<()> {
        write_table(&self.dir.join(COST_TABLE), ["iteration", "epoch", "cost"], record.losses())?;
        write_table(
            &self.dir.join(VAL_ERROR_TABLE),
            ["iteration", "epoch", "val_error"],
            record.validations(),
        )?;

        tracing::debug!(
            "Wrote {} loss rows and {} validation rows to '{}'",
            record.losses().len(),
            record.validations().len(),
            self.dir.display()
        );
        Ok(())
    }

    /// Final write after training: both tables plus the per-epoch charts.
    pub fn finish(&self, record: &TrainingRecord) -> Result<()> {
        self.write_tables(record)?;

        LineChart::new("Mean training cost per epoch", "cost")
            .write(&self.dir.join(COST_CHART), &record.epoch_mean_costs())?;
        LineChart::new("Mean validation error per epoch", "validation error")
            .write(&self.dir.join(VAL_ERROR_CHART), &record.epoch_mean_val_errors())?;

        tracing::info!("Metrics written to '{}'", self.dir.display());
        Ok(())
    }
}

impl TrainingObserver for MetricsWriter {
    fn epoch_started(&mut self, epoch: usize, record: &TrainingRecord) -> Result<()> {
        if epoch > FIRST_PROGRESSIVE_EPOCH {
            self.write_tables(record)?;
        }
        Ok(())
    }
}

fn write_table<R: Serialize>(path: &Path, header: [&str; 3], rows: &[R]) -> Result<()> {
    let mut w = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Cannot create '{}'", path.display()))?;

    w.write_record(header)?;
    for row in rows {
        w.serialize(row)?;
    }
    w.flush()
        .with_context(|| format!("Cannot write '{}'", path.display()))?;
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> TrainingRecord {
        let mut record = TrainingRecord::new();
        record.push_loss(0, 1, 2.5);
        record.push_loss(1, 1, 1.5);
        record.push_loss(2, 2, 1.0);
        record.push_validation(1, 1, 0.75);
        record
    }

    fn lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path).unwrap().lines().map(str::to_string).collect()
    }

    #[test]
    fn test_tables_have_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let writer = MetricsWriter::new(dir.path()).unwrap();
        writer.write_tables(&sample_record()).unwrap();

        let cost = lines(&dir.path().join(COST_TABLE));
        assert_eq!(cost, vec!["iteration,epoch,cost", "0,1,2.5", "1,1,1.5", "2,2,1.0"]);

        let val = lines(&dir.path().join(VAL_ERROR_TABLE));
        assert_eq!(val, vec!["iteration,epoch,val_error", "1,1,0.75"]);
    }

    #[test]
    fn test_tables_are_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let writer = MetricsWriter::new(dir.path()).unwrap();
        writer.write_tables(&sample_record()).unwrap();

        let mut shorter = TrainingRecord::new();
        shorter.push_loss(0, 1, 3.0);
        writer.write_tables(&shorter).unwrap();

        assert_eq!(lines(&dir.path().join(COST_TABLE)), vec!["iteration,epoch,cost", "0,1,3.0"]);
        assert_eq!(lines(&dir.path().join(VAL_ERROR_TABLE)), vec!["iteration,epoch,val_error"]);
    }

    #[test]
    fn test_observer_writes_only_after_third_epoch() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = MetricsWriter::new(dir.path()).unwrap();
        let record = sample_record();

        for epoch in 1..=3 {
            writer.epoch_started(epoch, &record).unwrap();
        }
        assert!(!dir.path().join(COST_TABLE).exists());

        writer.epoch_started(4, &record).unwrap();
        assert_eq!(lines(&dir.path().join(COST_TABLE)).len(), 4);
    }

    #[test]
    fn test_finish_renders_charts() {
        let dir = tempfile::tempdir().unwrap();
        let writer = MetricsWriter::new(dir.path()).unwrap();
        writer.finish(&sample_record()).unwrap();

        let svg = fs::read_to_string(dir.path().join(COST_CHART)).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(dir.path().join(VAL_ERROR_CHART).exists());
    }
}
