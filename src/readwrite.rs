//! Output layer for simulation records.
//!
//! Records are written as CSV into a per-experiment directory. The filename
//! embeds the scalar parameters of the run and carries a `(n)` suffix that
//! is incremented until it does not clobber an existing file.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Parameters;
use crate::errors::EngineError;
use crate::stats::ReplicateRow;

pub struct RecordWriter {
    writer: csv::Writer<fs::File>,
    path: PathBuf,
}

impl RecordWriter {
    /// Create the output directory and file and write the header.
    ///
    /// With per-generation recording the header carries a `gen` column;
    /// either way one `pop1.i, pop2.i, k1.i, k2.i` block follows per host
    /// slot, with the global block at index 0.
    pub fn create(
        base: &Path,
        destination: &str,
        parameters: &Parameters,
    ) -> Result<Self, EngineError> {
        let directory = base.join(destination);
        fs::create_dir_all(&directory).map_err(|error| {
            EngineError::OutputError(format!(
                "unable to create output directory {}: {}",
                directory.display(),
                error
            ))
        })?;
        let path = resolve_path(&directory, parameters);
        let mut writer = csv::WriterBuilder::new().from_path(&path).map_err(|error| {
            EngineError::OutputError(format!(
                "unable to create record file {}: {}",
                path.display(),
                error
            ))
        })?;

        let mut header = vec!["rep".to_string()];
        if parameters.per_generation() {
            header.push("gen".to_string());
        }
        for host in 0..=parameters.host_num {
            header.extend([
                format!("pop1.{host}"),
                format!("pop2.{host}"),
                format!("k1.{host}"),
                format!("k2.{host}"),
            ]);
        }
        writer
            .write_record(&header)
            .map_err(|error| EngineError::OutputError(format!("unable to write header: {error}")))?;

        Ok(Self { writer, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record. Replicate and generation are written 1-based,
    /// population sizes and loads with two decimal places.
    pub fn write_row(&mut self, row: &ReplicateRow) -> Result<(), EngineError> {
        let mut record = vec![(row.replicate + 1).to_string()];
        if let Some(generation) = row.generation {
            record.push((generation + 1).to_string());
        }
        record.extend(row.values.iter().map(|value| format!("{value:.2}")));
        self.writer
            .write_record(&record)
            .map_err(|error| EngineError::OutputError(format!("unable to write record: {error}")))
    }

    pub fn flush(&mut self) -> Result<(), EngineError> {
        self.writer
            .flush()
            .map_err(|error| EngineError::OutputError(format!("unable to flush records: {error}")))
    }
}

/// First filename embedding the scalar parameters that does not collide
/// with an existing file.
fn resolve_path(directory: &Path, parameters: &Parameters) -> PathBuf {
    let stem = format!(
        "meta_{},{},{},{:.3},{},{},{:.5},{},{:.2},{:.2},{},{},{:.5},{:.5}",
        parameters.timestep,
        parameters.krecord,
        parameters.rep,
        parameters.s,
        parameters.n0,
        parameters.capacity,
        parameters.u,
        parameters.gen_num,
        parameters.c,
        parameters.r,
        parameters.kmax,
        parameters.host_num,
        parameters.mig,
        parameters.tr,
    );
    let mut filenum = 0;
    loop {
        let candidate = directory.join(format!("{stem}({filenum}).csv"));
        if !candidate.exists() {
            return candidate;
        }
        filenum += 1;
    }
}
