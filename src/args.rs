use clap::Parser;

/// Positional command line interface of the simulation binary.
///
/// All arguments are positional and expected in the declared order, so that
/// parameter sweeps can be driven from shell scripts without keyword noise.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Directory under ./data/ to store the output in.
    pub destination: String,

    /// Record one row per generation (1) or one row per replicate (0).
    pub timestep: u8,

    /// Mutation load statistic: population mean (0) or population minimum (1).
    pub krecord: u8,

    /// Stop a replicate as soon as one of the segment arities is extinct.
    pub untilext: u8,

    /// Number of replicates.
    pub rep: usize,

    /// Selection coefficient per mutation.
    pub s: f64,

    /// Base initial population size.
    pub n0: u32,

    /// Carrying capacity of a host.
    pub k: u32,

    /// Mutation rate per segment.
    pub u: f64,

    /// Number of generations per replicate.
    pub gen_num: usize,

    /// Reproductive cost of carrying two segments.
    pub c: f64,

    /// Reassortment probability.
    pub r: f64,

    /// Seed for the random number generator.
    pub seed: u64,

    /// Number of hosts.
    pub host_num: usize,

    /// Maximum mutation count per segment.
    pub kmax: usize,

    /// `~`-terminated list of per-host two-segment proportions of n0.
    pub pop2init: String,

    /// Character length of the two-segment proportion list.
    pub pop2init_len: usize,

    /// `~`-terminated list of per-host one-segment proportions of n0.
    pub pop1init: String,

    /// Character length of the one-segment proportion list.
    pub pop1init_len: usize,

    /// Transmission rate from the migration pool.
    pub tr: f64,

    /// Migration rate into the shared pool.
    pub mig: f64,

    /// Cap on new mutations per particle per generation.
    pub mutcap: usize,
}
