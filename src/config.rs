//! Simulation parameters.
//!
//! The parameters collect every scalar of the model together with the
//! per-host initial proportions. They are constructed from the positional
//! command line arguments, validated before the generation loop starts, and
//! can be serialized to YAML for logging and archival.

use serde::{Deserialize, Serialize};
use std::fs;

use crate::args::Args;
use crate::errors::EngineError;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Parameters {
    pub timestep: u8,
    pub krecord: u8,
    pub untilext: u8,
    pub rep: usize,
    pub s: f64,
    pub n0: u32,
    pub capacity: u32,
    pub u: f64,
    pub gen_num: usize,
    pub c: f64,
    pub r: f64,
    pub seed: u64,
    pub host_num: usize,
    pub kmax: usize,
    pub pop2init: Vec<f64>,
    pub pop1init: Vec<f64>,
    pub tr: f64,
    pub mig: f64,
    pub mutcap: usize,
}

#[derive(Debug)]
pub enum ParametersError {
    IoError(std::io::Error),
    YamlError(serde_yaml::Error),
}

impl std::error::Error for ParametersError {}

impl std::fmt::Display for ParametersError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParametersError::IoError(error) => write!(formatter, "IO error: {}", error),
            ParametersError::YamlError(error) => write!(formatter, "YAML error: {}", error),
        }
    }
}

impl std::fmt::Display for Parameters {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut output = vec![];
        self.write(&mut output).map_err(|_| std::fmt::Error)?;
        write!(formatter, "{}", String::from_utf8(output).unwrap())
    }
}

impl Parameters {
    /// Build parameters from the command line, resolving the proportion
    /// lists and rejecting every configuration error before any state is
    /// allocated.
    pub fn from_args(args: &Args) -> Result<Parameters, EngineError> {
        let pop2init = parse_proportions(&args.pop2init, args.pop2init_len, args.host_num)?;
        let pop1init = parse_proportions(&args.pop1init, args.pop1init_len, args.host_num)?;
        let parameters = Parameters {
            timestep: args.timestep,
            krecord: args.krecord,
            untilext: args.untilext,
            rep: args.rep,
            s: args.s,
            n0: args.n0,
            capacity: args.k,
            u: args.u,
            gen_num: args.gen_num,
            c: args.c,
            r: args.r,
            seed: args.seed,
            host_num: args.host_num,
            kmax: args.kmax,
            pop2init,
            pop1init,
            tr: args.tr,
            mig: args.mig,
            mutcap: args.mutcap,
        };
        parameters.validate()?;
        Ok(parameters)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.host_num < 1 {
            return Err(EngineError::InvalidParameter(
                "host_num must be at least 1".to_string(),
            ));
        }
        if self.kmax < 1 {
            return Err(EngineError::InvalidParameter(
                "kmax must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("timestep", self.timestep),
            ("krecord", self.krecord),
            ("untilext", self.untilext),
        ] {
            if value > 1 {
                return Err(EngineError::InvalidParameter(format!(
                    "{} must be 0 or 1, got {}",
                    name, value
                )));
            }
        }
        for (name, value) in [("s", self.s), ("c", self.c), ("r", self.r), ("mig", self.mig)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EngineError::InvalidParameter(format!(
                    "{} must lie in [0, 1], got {}",
                    name, value
                )));
            }
        }
        for (name, value) in [("u", self.u), ("tr", self.tr)] {
            if value < 0.0 {
                return Err(EngineError::InvalidParameter(format!(
                    "{} must be non-negative, got {}",
                    name, value
                )));
            }
        }
        for proportions in [&self.pop2init, &self.pop1init] {
            if proportions.len() != self.host_num {
                return Err(EngineError::InvalidParameter(format!(
                    "expected {} initial proportions, got {}",
                    self.host_num,
                    proportions.len()
                )));
            }
            if proportions.iter().any(|&value| value < 0.0) {
                return Err(EngineError::InvalidParameter(
                    "initial proportions must be non-negative".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn per_generation(&self) -> bool {
        self.timestep == 1
    }

    pub fn record_minimum(&self) -> bool {
        self.krecord == 1
    }

    pub fn until_extinction(&self) -> bool {
        self.untilext == 1
    }

    pub fn write(&self, writer: &mut dyn std::io::Write) -> Result<(), ParametersError> {
        serde_yaml::to_writer(writer, self).map_err(ParametersError::YamlError)
    }

    pub fn read(reader: &mut dyn std::io::Read) -> Result<Parameters, ParametersError> {
        serde_yaml::from_reader(reader).map_err(ParametersError::YamlError)
    }

    pub fn write_to_file(&self, filename: &str) -> Result<(), ParametersError> {
        let file = fs::File::create(filename).map_err(ParametersError::IoError)?;
        let mut writer = std::io::BufWriter::new(file);
        self.write(&mut writer)
    }

    pub fn read_from_file(filename: &str) -> Result<Parameters, ParametersError> {
        let file = fs::File::open(filename).map_err(ParametersError::IoError)?;
        let mut reader = std::io::BufReader::new(file);
        Self::read(&mut reader)
    }
}

/// Parse a `~`-terminated list of per-host proportions.
///
/// Every entry must be terminated, e.g. `"0.5~0.5~"` for two hosts. The
/// declared character length is checked against the actual string so that
/// truncated shell quoting is caught early.
fn parse_proportions(
    list: &str,
    declared_len: usize,
    host_num: usize,
) -> Result<Vec<f64>, EngineError> {
    if list.len() != declared_len {
        return Err(EngineError::InvalidParameter(format!(
            "proportion list length {} does not match declared length {}",
            list.len(),
            declared_len
        )));
    }
    let mut values = Vec::new();
    let mut rest = list;
    while !rest.is_empty() {
        match rest.split_once('~') {
            Some((entry, tail)) => {
                let value: f64 = entry.trim().parse().map_err(|_| {
                    EngineError::InvalidParameter(format!(
                        "unable to parse proportion entry {:?}",
                        entry
                    ))
                })?;
                values.push(value);
                rest = tail;
            }
            None => {
                return Err(EngineError::InvalidParameter(format!(
                    "proportion list must be `~`-terminated, got {:?}",
                    list
                )));
            }
        }
    }
    if values.len() != host_num {
        return Err(EngineError::InvalidParameter(format!(
            "expected {} proportions, got {}",
            host_num,
            values.len()
        )));
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parameters() -> Parameters {
        Parameters {
            timestep: 1,
            krecord: 0,
            untilext: 0,
            rep: 10,
            s: 0.05,
            n0: 100,
            capacity: 1000,
            u: 0.1,
            gen_num: 50,
            c: 0.02,
            r: 0.5,
            seed: 42,
            host_num: 2,
            kmax: 5,
            pop2init: vec![1.0, 0.5],
            pop1init: vec![0.0, 0.0],
            tr: 1.0,
            mig: 0.1,
            mutcap: 3,
        }
    }

    #[test]
    fn parse_two_hosts() {
        let values = parse_proportions("0.5~0.5~", 8, 2).unwrap();
        assert_eq!(values, vec![0.5, 0.5]);
    }

    #[test]
    fn parse_unterminated() {
        assert!(parse_proportions("0.5~0.5", 7, 2).is_err());
    }

    #[test]
    fn parse_wrong_count() {
        assert!(parse_proportions("1~", 2, 2).is_err());
    }

    #[test]
    fn parse_wrong_declared_length() {
        assert!(parse_proportions("1~", 5, 1).is_err());
    }

    #[test]
    fn validate_rejects_zero_hosts() {
        let mut parameters = parameters();
        parameters.host_num = 0;
        assert!(parameters.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_kmax() {
        let mut parameters = parameters();
        parameters.kmax = 0;
        assert!(parameters.validate().is_err());
    }

    #[test]
    fn validate_rejects_flag_out_of_range() {
        let mut parameters = parameters();
        parameters.timestep = 2;
        assert!(parameters.validate().is_err());
    }

    #[test]
    fn validate_rejects_probability_out_of_range() {
        let mut parameters = parameters();
        parameters.r = 1.5;
        assert!(parameters.validate().is_err());
    }

    #[test]
    fn read_write() {
        let mut buffer = Vec::new();
        let parameters = parameters();
        parameters.write(&mut buffer).unwrap();
        let read_parameters = Parameters::read(&mut buffer.as_slice()).unwrap();
        assert_eq!(read_parameters, parameters);
    }

    #[test]
    fn read_write_file() {
        let tmp_dir = std::env::temp_dir().join("test_parameters.yaml");
        let path = tmp_dir.to_str().unwrap();
        let parameters = parameters();
        parameters.write_to_file(path).unwrap();
        let read_parameters = Parameters::read_from_file(path).unwrap();
        assert_eq!(read_parameters, parameters);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn from_args_resolves_proportions() {
        use crate::args::Args;
        let args = Args {
            destination: "test".to_string(),
            timestep: 1,
            krecord: 0,
            untilext: 0,
            rep: 1,
            s: 0.0,
            n0: 10,
            k: 100,
            u: 0.0,
            gen_num: 5,
            c: 0.0,
            r: 0.0,
            seed: 1,
            host_num: 2,
            kmax: 3,
            pop2init: "1~0.5~".to_string(),
            pop2init_len: 6,
            pop1init: "0~0~".to_string(),
            pop1init_len: 4,
            tr: 0.0,
            mig: 0.0,
            mutcap: 2,
        };
        let parameters = Parameters::from_args(&args).unwrap();
        assert_eq!(parameters.pop2init, vec![1.0, 0.5]);
        assert_eq!(parameters.pop1init, vec![0.0, 0.0]);
        assert_eq!(parameters.capacity, 100);
    }
}
