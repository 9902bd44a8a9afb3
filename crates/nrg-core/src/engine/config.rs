use crate::core::log::event::RankingMode;
use crate::core::models::ligand::FlexBond;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{parameter}': {reason}")]
    Invalid {
        parameter: &'static str,
        reason: String,
    },
}

/// How the docking engine is launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
    Direct { program: PathBuf, args: Vec<String> },
    /// A complete command line handed to the platform shell.
    Shell(String),
}

impl CommandLine {
    pub fn program_name(&self) -> String {
        match self {
            CommandLine::Direct { program, .. } => program.display().to_string(),
            CommandLine::Shell(line) => line
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_string(),
        }
    }
}

/// Where the engine's output goes and how the monitor reads it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Output is redirected to `log_path`, which is polled through private
    /// copies at `scratch_path`. With `update_path` set, generations after the
    /// ready signal are read from that incremental update file.
    Snapshot {
        log_path: PathBuf,
        scratch_path: PathBuf,
        update_path: Option<PathBuf>,
    },
    /// Output is read straight from the engine's stdout and stderr pipes.
    Stream,
}

/// What the demultiplexer needs to know about the run it is parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseConfig {
    pub total_generations: u32,
    pub rows_per_generation: u32,
    pub draw_frequency: u32,
    pub ready_ranking: RankingMode,
    pub flexible_dihedrals: bool,
    pub flex_bonds: BTreeMap<u32, FlexBond>,
    pub ligand_atom_count: Option<usize>,
}

impl ParseConfig {
    pub fn is_final_generation(&self, generation: u32) -> bool {
        generation >= self.total_generations
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub command: CommandLine,
    pub working_dir: Option<PathBuf>,
    pub delivery: Delivery,
    pub poll_interval: Duration,
    pub read_timeout: Duration,
    pub parse: ParseConfig,
}

impl MonitorConfig {
    pub fn update_path(&self) -> Option<&PathBuf> {
        match &self.delivery {
            Delivery::Snapshot { update_path, .. } => update_path.as_ref(),
            Delivery::Stream => None,
        }
    }
}

#[derive(Default)]
pub struct ParseConfigBuilder {
    total_generations: Option<u32>,
    rows_per_generation: Option<u32>,
    draw_frequency: Option<u32>,
    ready_ranking: Option<RankingMode>,
    flexible_dihedrals: bool,
    flex_bonds: BTreeMap<u32, FlexBond>,
    ligand_atom_count: Option<usize>,
}

impl ParseConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_generations(mut self, n: u32) -> Self {
        self.total_generations = Some(n);
        self
    }
    pub fn rows_per_generation(mut self, n: u32) -> Self {
        self.rows_per_generation = Some(n);
        self
    }
    pub fn draw_frequency(mut self, every: u32) -> Self {
        self.draw_frequency = Some(every);
        self
    }
    pub fn ready_ranking(mut self, mode: RankingMode) -> Self {
        self.ready_ranking = Some(mode);
        self
    }
    pub fn flexible_dihedrals(mut self, enabled: bool) -> Self {
        self.flexible_dihedrals = enabled;
        self
    }
    pub fn flex_bonds(mut self, bonds: BTreeMap<u32, FlexBond>) -> Self {
        self.flex_bonds = bonds;
        self
    }
    pub fn ligand_atom_count(mut self, count: usize) -> Self {
        self.ligand_atom_count = Some(count);
        self
    }

    pub fn build(self) -> Result<ParseConfig, ConfigError> {
        let rows_per_generation = self
            .rows_per_generation
            .ok_or(ConfigError::MissingParameter("rows_per_generation"))?;
        if rows_per_generation == 0 {
            return Err(ConfigError::Invalid {
                parameter: "rows_per_generation",
                reason: "at least one row per generation is required".to_string(),
            });
        }

        let draw_frequency = self.draw_frequency.unwrap_or(1);
        if draw_frequency == 0 {
            return Err(ConfigError::Invalid {
                parameter: "draw_frequency",
                reason: "must be at least 1".to_string(),
            });
        }

        if self.flexible_dihedrals && self.ligand_atom_count.is_none() && !self.flex_bonds.is_empty() {
            return Err(ConfigError::MissingParameter("ligand_atom_count"));
        }

        Ok(ParseConfig {
            total_generations: self
                .total_generations
                .ok_or(ConfigError::MissingParameter("total_generations"))?,
            rows_per_generation,
            draw_frequency,
            ready_ranking: self.ready_ranking.unwrap_or(RankingMode::ByEnergy),
            flexible_dihedrals: self.flexible_dihedrals,
            flex_bonds: self.flex_bonds,
            ligand_atom_count: self.ligand_atom_count,
        })
    }
}

#[derive(Default)]
pub struct MonitorConfigBuilder {
    command: Option<CommandLine>,
    working_dir: Option<PathBuf>,
    delivery: Option<Delivery>,
    poll_interval: Option<Duration>,
    read_timeout: Option<Duration>,
    parse: Option<ParseConfig>,
}

impl MonitorConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command(mut self, command: CommandLine) -> Self {
        self.command = Some(command);
        self
    }
    pub fn working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = Some(dir);
        self
    }
    pub fn delivery(mut self, delivery: Delivery) -> Self {
        self.delivery = Some(delivery);
        self
    }
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }
    pub fn parse(mut self, parse: ParseConfig) -> Self {
        self.parse = Some(parse);
        self
    }

    pub fn build(self) -> Result<MonitorConfig, ConfigError> {
        let poll_interval = self.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL);
        let read_timeout = self.read_timeout.unwrap_or(DEFAULT_READ_TIMEOUT);
        if poll_interval.is_zero() {
            return Err(ConfigError::Invalid {
                parameter: "poll_interval",
                reason: "must be greater than zero".to_string(),
            });
        }
        if read_timeout < poll_interval {
            return Err(ConfigError::Invalid {
                parameter: "read_timeout",
                reason: format!("{read_timeout:?} is shorter than the poll interval {poll_interval:?}"),
            });
        }

        Ok(MonitorConfig {
            command: self
                .command
                .ok_or(ConfigError::MissingParameter("command"))?,
            working_dir: self.working_dir,
            delivery: self
                .delivery
                .ok_or(ConfigError::MissingParameter("delivery"))?,
            poll_interval,
            read_timeout,
            parse: self.parse.ok_or(ConfigError::MissingParameter("parse"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse() -> ParseConfigBuilder {
        ParseConfigBuilder::new()
            .total_generations(10)
            .rows_per_generation(5)
    }

    fn minimal() -> MonitorConfigBuilder {
        MonitorConfigBuilder::new()
            .command(CommandLine::Shell("FlexAID config.inp ga.inp out".into()))
            .delivery(Delivery::Stream)
            .parse(parse().build().unwrap())
    }

    #[test]
    fn build_applies_defaults() {
        let config = minimal().build().unwrap();
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(config.read_timeout, DEFAULT_READ_TIMEOUT);
        assert_eq!(config.parse.draw_frequency, 1);
        assert_eq!(config.parse.ready_ranking, RankingMode::ByEnergy);
        assert!(!config.parse.flexible_dihedrals);
        assert!(config.update_path().is_none());
    }

    #[test]
    fn build_fails_when_required_parameter_is_missing() {
        let result = MonitorConfigBuilder::new()
            .delivery(Delivery::Stream)
            .parse(parse().build().unwrap())
            .build();
        assert_eq!(result.unwrap_err(), ConfigError::MissingParameter("command"));

        let result = ParseConfigBuilder::new().rows_per_generation(1).build();
        assert_eq!(
            result.unwrap_err(),
            ConfigError::MissingParameter("total_generations")
        );
    }

    #[test]
    fn build_rejects_zero_rows_per_generation() {
        let err = parse().rows_per_generation(0).build().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                parameter: "rows_per_generation",
                ..
            }
        ));
    }

    #[test]
    fn build_rejects_timeout_shorter_than_poll() {
        let err = minimal()
            .poll_interval(Duration::from_millis(500))
            .read_timeout(Duration::from_millis(100))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                parameter: "read_timeout",
                ..
            }
        ));
    }

    #[test]
    fn flexible_bonds_need_an_atom_count() {
        let mut bonds = BTreeMap::new();
        bonds.insert(1, FlexBond::new(1, vec![901, 902]));
        let err = parse()
            .flexible_dihedrals(true)
            .flex_bonds(bonds)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingParameter("ligand_atom_count"));
    }

    #[test]
    fn final_generation_matches_total() {
        let config = parse().build().unwrap();
        assert!(!config.is_final_generation(9));
        assert!(config.is_final_generation(10));
    }

    #[test]
    fn shell_command_program_name_is_first_word() {
        let command = CommandLine::Shell("  FlexAID a b".into());
        assert_eq!(command.program_name(), "FlexAID");
    }
}
