use crate::core::log::classifier::classify;
use crate::core::log::reader::{Batch, LogReader, LogSource, SnapshotReader, StreamReader};
use crate::engine::config::{Delivery, MonitorConfig};
use crate::engine::controller::{EngineProcess, RunController, RunStatus};
use crate::engine::demux::{Demultiplexer, ReaderDirective};
use crate::engine::error::EngineError;
use crate::engine::progress::{ProgressCallback, ProgressReporter};
use crate::engine::signals::RunSignals;
use crate::engine::state::{ParseState, Phase};
use std::io;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct MonitorReport {
    pub phase: Phase,
    pub exit_code: Option<i32>,
    pub state: ParseState,
}

/// Launches the docking engine and follows its output until the run ends.
///
/// Blocks the calling thread. See [`spawn_worker`] to run it in the
/// background.
#[instrument(skip_all, name = "monitor_workflow")]
pub fn run(
    config: &MonitorConfig,
    reporter: &ProgressReporter,
    signals: &RunSignals,
) -> Result<MonitorReport, EngineError> {
    let mut demux = Demultiplexer::new(&config.parse, config.update_path().is_some(), reporter);

    let mut handle = match RunController::start(config) {
        Ok(handle) => handle,
        Err(err) => {
            demux.fail(&err);
            return Err(err);
        }
    };

    let reader: Box<dyn LogReader> = match &config.delivery {
        Delivery::Snapshot {
            log_path,
            scratch_path,
            update_path,
        } => {
            let reader = SnapshotReader::new(
                log_path,
                scratch_path,
                config.poll_interval,
                config.read_timeout,
            );
            match update_path {
                Some(update) => Box::new(reader.with_update_file(update)),
                None => Box::new(reader),
            }
        }
        Delivery::Stream => {
            match StreamReader::spawn(handle.take_output(), config.poll_interval) {
                Ok(reader) => Box::new(reader),
                Err(e) => {
                    let err = EngineError::Io(e);
                    demux.fail(&err);
                    stop_process(&mut handle);
                    return Err(err);
                }
            }
        }
    };

    MonitorSession::new(config, &mut handle, reader, demux, signals).drive()
}

/// Runs [`run`] on a dedicated, named thread. Notifications are delivered on
/// that thread.
pub fn spawn_worker(
    config: MonitorConfig,
    callback: ProgressCallback<'static>,
    signals: RunSignals,
) -> io::Result<JoinHandle<Result<MonitorReport, EngineError>>> {
    thread::Builder::new()
        .name("nrg-monitor".to_string())
        .spawn(move || {
            let reporter = ProgressReporter::with_callback(callback);
            run(&config, &reporter, &signals)
        })
}

/// One run's worker loop over a process, a reader and a demultiplexer.
pub struct MonitorSession<'a, 'r, P: EngineProcess + ?Sized, R: LogReader> {
    config: &'a MonitorConfig,
    process: &'a mut P,
    reader: R,
    demux: Demultiplexer<'a, 'r>,
    signals: &'a RunSignals,
    on_update_file: bool,
}

impl<'a, 'r, P: EngineProcess + ?Sized, R: LogReader> MonitorSession<'a, 'r, P, R> {
    pub fn new(
        config: &'a MonitorConfig,
        process: &'a mut P,
        reader: R,
        demux: Demultiplexer<'a, 'r>,
        signals: &'a RunSignals,
    ) -> Self {
        Self {
            config,
            process,
            reader,
            demux,
            signals,
            on_update_file: false,
        }
    }

    pub fn drive(mut self) -> Result<MonitorReport, EngineError> {
        info!("Monitoring docking engine (pid {}).", self.process.id());
        match self.follow_until_exit() {
            Ok(code) => {
                let finished = self.demux.finish(code);
                let report = self.report(Some(code));
                finished.map(|()| report)
            }
            Err(err) => {
                self.demux.fail(&err);
                stop_process(self.process);
                Err(err)
            }
        }
    }

    fn follow_until_exit(&mut self) -> Result<i32, EngineError> {
        loop {
            if self.signals.is_stopped() {
                self.demux.cancel();
                return Err(EngineError::Cancelled);
            }

            let status = self.process.poll()?;

            if self.signals.is_paused() {
                self.demux.pause();
                if status == RunStatus::Running {
                    thread::sleep(self.config.poll_interval);
                    continue;
                }
            } else {
                self.demux.resume();
            }

            match status {
                RunStatus::Running => match self.reader.next_batch()? {
                    Batch::Lines(lines) => {
                        self.feed(lines)?;
                    }
                    Batch::EndOfStream => thread::sleep(self.config.poll_interval),
                },
                RunStatus::Exited(code) => {
                    debug!("Engine exited with code {}; draining remaining output.", code);
                    self.drain()?;
                    return Ok(code);
                }
            }
        }
    }

    /// Reads whatever complete output is left once the engine has exited.
    ///
    /// Readers that report end of stream are drained until they do, bounded by
    /// the read timeout. File readers drain their current source; one left on
    /// the update file then goes back to the initial log, where the engine
    /// writes its closing lines.
    fn drain(&mut self) -> Result<(), EngineError> {
        if self.reader.reports_end_of_stream() {
            return self.drain_stream();
        }
        self.drain_current()?;
        if self.on_update_file && !self.demux.phase().is_terminal() {
            self.direct_reader(ReaderDirective::FollowInitialLog)?;
            self.drain_current()?;
        }
        Ok(())
    }

    fn drain_stream(&mut self) -> Result<(), EngineError> {
        let started = Instant::now();
        loop {
            match self.reader.next_batch()? {
                Batch::Lines(lines) if lines.is_empty() => {
                    if started.elapsed() >= self.config.read_timeout {
                        return Ok(());
                    }
                }
                Batch::Lines(lines) => self.feed(lines)?,
                Batch::EndOfStream => return Ok(()),
            }
            if self.demux.phase().is_terminal() {
                return Ok(());
            }
        }
    }

    fn drain_current(&mut self) -> Result<(), EngineError> {
        loop {
            match self.reader.next_batch()? {
                Batch::Lines(lines) if !lines.is_empty() => self.feed(lines)?,
                _ => return Ok(()),
            }
            if self.demux.phase().is_terminal() {
                return Ok(());
            }
        }
    }

    fn feed(&mut self, lines: Vec<String>) -> Result<(), EngineError> {
        for line in lines {
            if let Some(directive) = self.demux.apply(classify(&line))? {
                self.direct_reader(directive)?;
            }
        }
        Ok(())
    }

    fn direct_reader(&mut self, directive: ReaderDirective) -> Result<(), EngineError> {
        debug!("Reader directive: {:?}", directive);
        match directive {
            ReaderDirective::FollowUpdateFile => {
                self.reader.follow(LogSource::UpdateFile)?;
                self.on_update_file = true;
            }
            ReaderDirective::FollowInitialLog => {
                self.reader.follow(LogSource::InitialLog)?;
                self.on_update_file = false;
            }
            ReaderDirective::RecycleUpdateFile => self.reader.recycle()?,
        }
        Ok(())
    }

    fn report(&self, exit_code: Option<i32>) -> MonitorReport {
        MonitorReport {
            phase: self.demux.phase(),
            exit_code,
            state: self.demux.state().clone(),
        }
    }
}

fn stop_process<P: EngineProcess + ?Sized>(process: &mut P) {
    if let Err(e) = process.terminate() {
        warn!("Failed to terminate docking engine (pid {}): {}", process.id(), e);
    }
}
