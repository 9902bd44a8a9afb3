use super::config::{CommandLine, Delivery, MonitorConfig};
use super::error::EngineError;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Exited(i32),
}

/// The lifecycle operations the monitor worker needs from a docking process.
pub trait EngineProcess: Send {
    fn id(&self) -> u32;

    fn poll(&mut self) -> Result<RunStatus, EngineError>;

    /// Stops the process. Calling it again, or after the process exited, is a
    /// no-op.
    fn terminate(&mut self) -> Result<(), EngineError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSink {
    LogFile(PathBuf),
    Pipes,
}

/// A running docking engine started by [`RunController::start`].
#[derive(Debug)]
pub struct RunHandle {
    child: Child,
    sink: OutputSink,
    exit_code: Option<i32>,
}

impl RunHandle {
    pub fn sink(&self) -> &OutputSink {
        &self.sink
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Takes the stdout and stderr pipes of a pipe-sink run. Returns nothing
    /// for log-file runs or when the pipes were already taken.
    pub fn take_output(&mut self) -> Vec<Box<dyn Read + Send>> {
        let mut outputs: Vec<Box<dyn Read + Send>> = Vec::new();
        if let Some(stdout) = self.child.stdout.take() {
            outputs.push(Box::new(stdout));
        }
        if let Some(stderr) = self.child.stderr.take() {
            outputs.push(Box::new(stderr));
        }
        outputs
    }

    fn record_exit(&mut self, status: std::process::ExitStatus) -> i32 {
        let code = status.code().unwrap_or(-1);
        self.exit_code = Some(code);
        code
    }
}

impl EngineProcess for RunHandle {
    fn id(&self) -> u32 {
        self.child.id()
    }

    fn poll(&mut self) -> Result<RunStatus, EngineError> {
        if let Some(code) = self.exit_code {
            return Ok(RunStatus::Exited(code));
        }
        match self.child.try_wait()? {
            Some(status) => {
                let code = self.record_exit(status);
                debug!("Docking engine (pid {}) exited with code {}", self.id(), code);
                Ok(RunStatus::Exited(code))
            }
            None => Ok(RunStatus::Running),
        }
    }

    fn terminate(&mut self) -> Result<(), EngineError> {
        if self.exit_code.is_some() {
            return Ok(());
        }
        match self.child.kill() {
            Ok(()) => info!("Terminated docking engine (pid {}).", self.id()),
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => {}
            Err(e) => return Err(e.into()),
        }
        let status = self.child.wait()?;
        self.record_exit(status);
        Ok(())
    }
}

pub struct RunController;

impl RunController {
    /// Launches the engine described by `config`, wiring its output to the
    /// configured sink.
    pub fn start(config: &MonitorConfig) -> Result<RunHandle, EngineError> {
        let mut command = build_command(&config.command);
        if let Some(dir) = &config.working_dir {
            command.current_dir(dir);
        }
        command.stdin(Stdio::null());

        let sink = match &config.delivery {
            Delivery::Snapshot {
                log_path,
                update_path,
                ..
            } => {
                if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)?;
                }
                if let Some(update) = update_path {
                    match fs::remove_file(update) {
                        Ok(()) => warn!("Removed stale update file '{}'", update.display()),
                        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                        Err(e) => return Err(e.into()),
                    }
                }
                let log = File::create(log_path)?;
                let log_err = log.try_clone()?;
                command.stdout(log).stderr(log_err);
                OutputSink::LogFile(log_path.clone())
            }
            Delivery::Stream => {
                command.stdout(Stdio::piped()).stderr(Stdio::piped());
                OutputSink::Pipes
            }
        };

        let child = command.spawn().map_err(|source| EngineError::Spawn {
            program: config.command.program_name(),
            source,
        })?;
        info!(
            "Started docking engine '{}' (pid {}).",
            config.command.program_name(),
            child.id()
        );

        Ok(RunHandle {
            child,
            sink,
            exit_code: None,
        })
    }
}

fn build_command(command_line: &CommandLine) -> Command {
    match command_line {
        CommandLine::Direct { program, args } => {
            let mut command = Command::new(program);
            command.args(args);
            command
        }
        CommandLine::Shell(line) => shell_command(line),
    }
}

#[cfg(windows)]
fn shell_command(line: &str) -> Command {
    let mut command = Command::new("cmd");
    command.arg("/C").arg(line);
    command
}

#[cfg(not(windows))]
fn shell_command(line: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(line);
    command
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::engine::config::{MonitorConfigBuilder, ParseConfigBuilder};
    use std::thread;
    use std::time::{Duration, Instant};

    fn config(command: CommandLine, delivery: Delivery) -> MonitorConfig {
        MonitorConfigBuilder::new()
            .command(command)
            .delivery(delivery)
            .parse(
                ParseConfigBuilder::new()
                    .total_generations(1)
                    .rows_per_generation(1)
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap()
    }

    fn wait_for_exit(handle: &mut RunHandle) -> i32 {
        let started = Instant::now();
        loop {
            if let RunStatus::Exited(code) = handle.poll().unwrap() {
                return code;
            }
            assert!(started.elapsed() < Duration::from_secs(10), "process never exited");
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn log_file_sink_captures_stdout_and_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("out").join("log.txt");
        let config = config(
            CommandLine::Shell("echo SIGMA_SHARE; echo 'ERROR oops' 1>&2".into()),
            Delivery::Snapshot {
                log_path: log.clone(),
                scratch_path: dir.path().join(".read"),
                update_path: None,
            },
        );

        let mut handle = RunController::start(&config).unwrap();
        assert_eq!(wait_for_exit(&mut handle), 0);
        assert!(handle.take_output().is_empty());

        let text = fs::read_to_string(&log).unwrap();
        assert!(text.contains("SIGMA_SHARE\n"));
        assert!(text.contains("ERROR oops\n"));
    }

    #[test]
    fn pipe_sink_exposes_output_streams() {
        let config = config(
            CommandLine::Direct {
                program: "echo".into(),
                args: vec!["Generation:".into(), "0".into()],
            },
            Delivery::Stream,
        );

        let mut handle = RunController::start(&config).unwrap();
        let mut outputs = handle.take_output();
        assert_eq!(outputs.len(), 2);

        let mut text = String::new();
        outputs[0].read_to_string(&mut text).unwrap();
        assert_eq!(text, "Generation: 0\n");
        assert_eq!(wait_for_exit(&mut handle), 0);
    }

    #[test]
    fn nonzero_exit_code_is_reported() {
        let config = config(CommandLine::Shell("exit 3".into()), Delivery::Stream);
        let mut handle = RunController::start(&config).unwrap();
        assert_eq!(wait_for_exit(&mut handle), 3);
        assert_eq!(handle.exit_code(), Some(3));
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let config = config(
            CommandLine::Direct {
                program: "/nonexistent/FlexAID".into(),
                args: vec![],
            },
            Delivery::Stream,
        );
        let err = RunController::start(&config).unwrap_err();
        assert!(matches!(err, EngineError::Spawn { .. }));
        assert!(err.to_string().starts_with("could not execute the docking engine"));
    }

    #[test]
    fn terminate_is_idempotent() {
        let config = config(CommandLine::Shell("sleep 30".into()), Delivery::Stream);
        let mut handle = RunController::start(&config).unwrap();
        assert_eq!(handle.poll().unwrap(), RunStatus::Running);

        handle.terminate().unwrap();
        handle.terminate().unwrap();
        assert!(matches!(handle.poll().unwrap(), RunStatus::Exited(_)));
    }

    #[test]
    fn stale_update_file_is_removed_before_start() {
        let dir = tempfile::tempdir().unwrap();
        let update = dir.path().join(".update");
        fs::write(&update, "Generation: 9\n").unwrap();
        let config = config(
            CommandLine::Shell("true".into()),
            Delivery::Snapshot {
                log_path: dir.path().join("log.txt"),
                scratch_path: dir.path().join(".read"),
                update_path: Some(update.clone()),
            },
        );

        let mut handle = RunController::start(&config).unwrap();
        assert!(!update.exists());
        assert_eq!(wait_for_exit(&mut handle), 0);
    }
}
