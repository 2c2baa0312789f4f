//! CSV export of simulation artifacts — trade list and daily ledger.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use edgelab_core::sim::SimRun;

/// Write `trades.csv` and `ledger.csv` into `output_dir`, creating it if
/// needed. Returns the directory path.
pub fn save_artifacts(run: &SimRun, output_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let dir = output_dir.as_ref().to_path_buf();
    std::fs::create_dir_all(&dir).context("failed to create output directory")?;

    write_trades(run, &dir.join("trades.csv"))?;
    write_ledger(run, &dir.join("ledger.csv"))?;
    Ok(dir)
}

fn write_trades(run: &SimRun, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("failed to create trades.csv")?;
    for trade in &run.trades {
        writer.serialize(trade).context("failed to write trade")?;
    }
    writer.flush().context("failed to flush trades.csv")?;
    Ok(())
}

fn write_ledger(run: &SimRun, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("failed to create ledger.csv")?;
    for snapshot in &run.snapshots {
        writer
            .serialize(snapshot)
            .context("failed to write snapshot")?;
    }
    writer.flush().context("failed to flush ledger.csv")?;
    Ok(())
}
