//! Application runner for the simulation binary.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::args::Args;
use crate::config::Parameters;
use crate::core::MutationTables;
use crate::readwrite::RecordWriter;
use crate::simulation::Simulation;
use crate::stats::{LoadSummary, ReplicateRow};

/// Wall clock spent in each stage kernel, accumulated over replicates.
#[derive(Clone, Copy, Default)]
struct StageTimings {
    mutate: Duration,
    reassort: Duration,
    reproduce: Duration,
    migrate: Duration,
}

impl StageTimings {
    fn merge(&mut self, other: &StageTimings) {
        self.mutate += other.mutate;
        self.reassort += other.reassort;
        self.reproduce += other.reproduce;
        self.migrate += other.migrate;
    }
}

pub struct Runner {
    destination: String,
    parameters: Parameters,
    tables: Arc<MutationTables>,
}

impl Runner {
    pub fn new(args: Args) -> Result<Runner> {
        let parameters = Parameters::from_args(&args)?;
        let tables = Arc::new(MutationTables::new(
            parameters.u,
            parameters.kmax,
            parameters.mutcap,
        ));
        Ok(Self {
            destination: args.destination,
            parameters,
            tables,
        })
    }

    pub fn start(&mut self) -> Result<()> {
        let mut writer = RecordWriter::create(Path::new("./data"), &self.destination, &self.parameters)?;
        Self::setup_logger(writer.path().parent().unwrap_or_else(|| Path::new("./")))?;
        log::info!("Loaded parameters\n{}", self.parameters);
        log::info!("Writing records to {}", writer.path().display());

        let bar = ProgressBar::new(self.parameters.rep as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "[{bar:40}] {pos:>7}/{len:7} [{elapsed_precise} / {duration_precise}] {msg}",
                )
                .expect("Unable to create template.")
                .progress_chars("=> "),
        );

        let timings = self.run(&mut writer, &bar)?;
        writer.flush()?;
        bar.finish_with_message("Done.");

        log::info!(
            "stage times: mutate={:.3}s reassort={:.3}s reproduce={:.3}s migrate={:.3}s",
            timings.mutate.as_secs_f64(),
            timings.reassort.as_secs_f64(),
            timings.reproduce.as_secs_f64(),
            timings.migrate.as_secs_f64(),
        );
        log::info!("Finished simulation.");
        Ok(())
    }

    /// Setup logging into the output directory.
    fn setup_logger(directory: &Path) -> Result<()> {
        simple_logging::log_to_file(directory.join("segvolution.log"), log::LevelFilter::Info)?;
        Ok(())
    }

    #[cfg(not(feature = "parallel"))]
    fn run(&self, writer: &mut RecordWriter, bar: &ProgressBar) -> Result<StageTimings> {
        let mut total = StageTimings::default();
        for replicate in 0..self.parameters.rep {
            let (rows, timings) = run_replicate(&self.parameters, &self.tables, replicate);
            for row in &rows {
                writer.write_row(row)?;
            }
            total.merge(&timings);
            bar.inc(1);
        }
        Ok(total)
    }

    /// Replicates share nothing but the read-only tables, so they fan out
    /// over the thread pool; rows are written afterwards in replicate order
    /// to keep the output identical to a serial run.
    #[cfg(feature = "parallel")]
    fn run(&self, writer: &mut RecordWriter, bar: &ProgressBar) -> Result<StageTimings> {
        let results: Vec<(Vec<ReplicateRow>, StageTimings)> = (0..self.parameters.rep)
            .into_par_iter()
            .map(|replicate| {
                let result = run_replicate(&self.parameters, &self.tables, replicate);
                bar.inc(1);
                result
            })
            .collect();

        let mut total = StageTimings::default();
        for (rows, timings) in &results {
            for row in rows {
                writer.write_row(row)?;
            }
            total.merge(timings);
        }
        Ok(total)
    }
}

/// Run one replicate and collect its output rows.
///
/// The replicate seeds its own generator from the base seed and the
/// replicate index, so the result does not depend on scheduling. A
/// generation only runs while any mass is left; with `untilext` the
/// replicate ends as soon as either arity is globally extinct.
fn run_replicate(
    parameters: &Parameters,
    tables: &Arc<MutationTables>,
    replicate: usize,
) -> (Vec<ReplicateRow>, StageTimings) {
    let seed = parameters.seed.wrapping_add(replicate as u64);
    let mut simulation = Simulation::new(parameters.clone(), tables.clone(), seed);
    simulation.reset();

    let mut rows = Vec::new();
    let mut timings = StageTimings::default();
    for generation in 0..parameters.gen_num {
        let (n1, n2) = simulation.tensor().grand_totals();
        if parameters.until_extinction() && (n1 == 0.0 || n2 == 0.0) {
            break;
        }
        if n1 > 0.0 || n2 > 0.0 {
            let clock = Instant::now();
            simulation.mutate();
            timings.mutate += clock.elapsed();

            let clock = Instant::now();
            simulation.reassort();
            timings.reassort += clock.elapsed();

            let clock = Instant::now();
            simulation.reproduce();
            timings.reproduce += clock.elapsed();

            let clock = Instant::now();
            simulation.migrate();
            timings.migrate += clock.elapsed();
        }
        if parameters.per_generation() {
            rows.push(ReplicateRow {
                replicate,
                generation: Some(generation),
                values: simulation.tensor().load_row(parameters.record_minimum()),
            });
        }
    }
    if !parameters.per_generation() {
        rows.push(ReplicateRow {
            replicate,
            generation: None,
            values: simulation.tensor().load_row(parameters.record_minimum()),
        });
    }
    (rows, timings)
}
