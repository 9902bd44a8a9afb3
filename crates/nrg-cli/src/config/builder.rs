use super::defaults::{DefaultsConfig, default_scratch_dir};
use super::file::{DeliveryMode, FileConfig};
use super::models::{ReplayConfig, RunConfig};
use crate::cli::{RankingArg, ReplayArgs, RunArgs, SimulationArgs};
use crate::error::{CliError, Result};
use clap::ValueEnum;
use nrgsuite::core::io::load_ligand;
use nrgsuite::engine::config::{
    CommandLine, Delivery, MonitorConfigBuilder, ParseConfig, ParseConfigBuilder,
};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

pub fn build_run_config(args: &RunArgs) -> Result<RunConfig> {
    let defaults = DefaultsConfig::default();
    let mut file_config = load_file_config(args.simulation.config.as_deref())?;
    apply_set_values(&mut file_config, &args.simulation.set_values)?;

    let engine_file = file_config.engine.take().unwrap_or_default();
    let output_file = file_config.output.take().unwrap_or_default();
    let monitor_file = file_config.monitor.take().unwrap_or_default();

    let command = if let Some(line) = args
        .shell_command
        .clone()
        .or(engine_file.shell_command.filter(|_| args.engine.is_none()))
    {
        CommandLine::Shell(line)
    } else {
        let program = args.engine.clone().or(engine_file.program).ok_or_else(|| {
            CliError::Config(
                "An engine is required: pass --engine or --shell-command, or set `engine.program`."
                    .to_string(),
            )
        })?;
        let engine_args = if args.engine_args.is_empty() {
            engine_file.args.unwrap_or_default()
        } else {
            args.engine_args.clone()
        };
        CommandLine::Direct {
            program,
            args: engine_args,
        }
    };

    let working_dir = args.work_dir.clone().or(engine_file.work_dir);

    let mode = if args.stream {
        DeliveryMode::Stream
    } else {
        output_file.mode.unwrap_or(DeliveryMode::Snapshot)
    };
    let delivery = match mode {
        DeliveryMode::Stream => Delivery::Stream,
        DeliveryMode::Snapshot => {
            let log_path = args.log.clone().or(output_file.log).unwrap_or_else(|| {
                working_dir
                    .clone()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(defaults.log_file_name)
            });
            let scratch_path = args
                .scratch
                .clone()
                .or(output_file.scratch)
                .unwrap_or_else(|| default_scratch_path(&log_path, &defaults));
            Delivery::Snapshot {
                log_path,
                scratch_path,
                update_path: args.update_file.clone().or(output_file.update_file),
            }
        }
    };

    let poll_interval = Duration::from_millis(
        args.poll_ms
            .or(monitor_file.poll_interval_ms)
            .unwrap_or(defaults.poll_interval_ms),
    );
    let read_timeout = Duration::from_secs(
        args.timeout_secs
            .or(monitor_file.read_timeout_secs)
            .unwrap_or(defaults.read_timeout_secs),
    );

    let parse = build_parse_config(&args.simulation, &mut file_config, &defaults)?;

    let mut builder = MonitorConfigBuilder::new()
        .command(command)
        .delivery(delivery)
        .poll_interval(poll_interval)
        .read_timeout(read_timeout)
        .parse(parse);
    if let Some(dir) = working_dir {
        builder = builder.working_dir(dir);
    }
    let monitor = builder.build().map_err(|e| CliError::Config(e.to_string()))?;
    debug!("Resolved monitor configuration: {:?}", monitor);

    Ok(RunConfig {
        monitor,
        solution_table: args
            .simulation
            .solution_table
            .clone()
            .or(output_file.solution_table),
    })
}

pub fn build_replay_config(args: &ReplayArgs) -> Result<ReplayConfig> {
    let defaults = DefaultsConfig::default();
    let mut file_config = load_file_config(args.simulation.config.as_deref())?;
    apply_set_values(&mut file_config, &args.simulation.set_values)?;

    let output_file = file_config.output.take().unwrap_or_default();
    let parse = build_parse_config(&args.simulation, &mut file_config, &defaults)?;

    Ok(ReplayConfig {
        log_path: args.log.clone(),
        parse,
        solution_table: args
            .simulation
            .solution_table
            .clone()
            .or(output_file.solution_table),
    })
}

fn load_file_config(path: Option<&Path>) -> Result<FileConfig> {
    match path {
        Some(path) => FileConfig::from_file(path),
        None => Ok(FileConfig::default()),
    }
}

fn default_scratch_path(log_path: &Path, defaults: &DefaultsConfig) -> PathBuf {
    let name = format!("{}-{}", std::process::id(), defaults.scratch_file_name);
    match default_scratch_dir() {
        Some(dir) => dir.join(name),
        None => log_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
            .join(name),
    }
}

fn build_parse_config(
    args: &SimulationArgs,
    file_config: &mut FileConfig,
    defaults: &DefaultsConfig,
) -> Result<ParseConfig> {
    let simulation_file = file_config.simulation.take().unwrap_or_default();
    let ligand_file = file_config.ligand.take().unwrap_or_default();

    let generations = args.generations.or(simulation_file.generations).ok_or_else(|| {
        CliError::Config(
            "`simulation.generations` is required either in the config file or via --generations."
                .to_string(),
        )
    })?;
    let rows = args
        .rows_per_generation
        .or(simulation_file.rows_per_generation)
        .ok_or_else(|| {
            CliError::Config(
                "`simulation.rows-per-generation` is required either in the config file or via --rows."
                    .to_string(),
            )
        })?;
    let ready_ranking = args
        .ready_ranking
        .or(simulation_file.ready_ranking)
        .unwrap_or(defaults.ready_ranking);
    let flexible_dihedrals =
        args.flexible_dihedrals || simulation_file.flexible_dihedrals.unwrap_or(false);

    let mut builder = ParseConfigBuilder::new()
        .total_generations(generations)
        .rows_per_generation(rows)
        .draw_frequency(
            args.draw_frequency
                .or(simulation_file.draw_frequency)
                .unwrap_or(defaults.draw_frequency),
        )
        .ready_ranking(ready_ranking.into())
        .flexible_dihedrals(flexible_dihedrals);

    let inp = args.ligand_inp.clone().or(ligand_file.inp);
    let ic = args.ligand_ic.clone().or(ligand_file.ic);
    match (inp, ic) {
        (Some(inp), Some(ic)) => {
            let topology = load_ligand(&inp, &ic).map_err(|e| CliError::FileParsing {
                path: inp.clone(),
                source: e.into(),
            })?;
            info!(
                "Loaded ligand with {} atom(s) and {} flexible bond(s).",
                topology.atom_count(),
                topology.flex_bonds.len()
            );
            debug!("Ligand anchor atoms: {:?}", topology.variable_atoms());
            builder = builder
                .ligand_atom_count(topology.atom_count())
                .flex_bonds(topology.flex_bonds);
        }
        (None, None) if !flexible_dihedrals => {}
        _ => {
            return Err(CliError::Config(
                "Flexible dihedrals need both the ligand .inp and .ic files.".to_string(),
            ));
        }
    }

    builder.build().map_err(|e| CliError::Config(e.to_string()))
}

fn parse_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value)))
}

fn apply_set_values(config: &mut FileConfig, set_values: &[String]) -> Result<()> {
    for kv_pair in set_values {
        let parts: Vec<_> = kv_pair.splitn(2, '=').collect();
        if parts.len() != 2 {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        }
        let key = parts[0];
        let value_str = parts[1];

        match key {
            "engine.program" => {
                config.engine.get_or_insert_with(Default::default).program =
                    Some(PathBuf::from(value_str));
            }
            "engine.args" => {
                config.engine.get_or_insert_with(Default::default).args =
                    Some(value_str.split_whitespace().map(str::to_string).collect());
            }
            "engine.shell-command" => {
                config.engine.get_or_insert_with(Default::default).shell_command =
                    Some(value_str.to_string());
            }
            "engine.work-dir" => {
                config.engine.get_or_insert_with(Default::default).work_dir =
                    Some(PathBuf::from(value_str));
            }
            "output.mode" => {
                let mode = match value_str {
                    "snapshot" => DeliveryMode::Snapshot,
                    "stream" => DeliveryMode::Stream,
                    _ => {
                        return Err(CliError::Config(format!(
                            "Invalid delivery mode for {}: {} (expected 'snapshot' or 'stream')",
                            key, value_str
                        )));
                    }
                };
                config.output.get_or_insert_with(Default::default).mode = Some(mode);
            }
            "output.log" => {
                config.output.get_or_insert_with(Default::default).log =
                    Some(PathBuf::from(value_str));
            }
            "output.update-file" => {
                config.output.get_or_insert_with(Default::default).update_file =
                    Some(PathBuf::from(value_str));
            }
            "output.scratch" => {
                config.output.get_or_insert_with(Default::default).scratch =
                    Some(PathBuf::from(value_str));
            }
            "output.solution-table" => {
                config.output.get_or_insert_with(Default::default).solution_table =
                    Some(PathBuf::from(value_str));
            }
            "simulation.generations" => {
                config.simulation.get_or_insert_with(Default::default).generations =
                    Some(parse_value(key, value_str, "integer")?);
            }
            "simulation.rows-per-generation" => {
                config
                    .simulation
                    .get_or_insert_with(Default::default)
                    .rows_per_generation = Some(parse_value(key, value_str, "integer")?);
            }
            "simulation.draw-frequency" => {
                config.simulation.get_or_insert_with(Default::default).draw_frequency =
                    Some(parse_value(key, value_str, "integer")?);
            }
            "simulation.ready-ranking" => {
                let ranking = <RankingArg as ValueEnum>::from_str(value_str, true).map_err(|_| {
                    CliError::Config(format!(
                        "Invalid ranking for {}: {} (expected 'energy' or 'fitness')",
                        key, value_str
                    ))
                })?;
                config.simulation.get_or_insert_with(Default::default).ready_ranking =
                    Some(ranking);
            }
            "simulation.flexible-dihedrals" => {
                config
                    .simulation
                    .get_or_insert_with(Default::default)
                    .flexible_dihedrals = Some(parse_value(key, value_str, "boolean")?);
            }
            "ligand.inp" => {
                config.ligand.get_or_insert_with(Default::default).inp =
                    Some(PathBuf::from(value_str));
            }
            "ligand.ic" => {
                config.ligand.get_or_insert_with(Default::default).ic =
                    Some(PathBuf::from(value_str));
            }
            "monitor.poll-interval-ms" => {
                config.monitor.get_or_insert_with(Default::default).poll_interval_ms =
                    Some(parse_value(key, value_str, "integer")?);
            }
            "monitor.read-timeout-secs" => {
                config.monitor.get_or_insert_with(Default::default).read_timeout_secs =
                    Some(parse_value(key, value_str, "integer")?);
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(())
}
