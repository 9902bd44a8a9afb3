use super::config::ParseConfig;
use super::error::{EngineError, ProtocolViolation};
use super::progress::{Progress, ProgressReporter};
use super::state::{ParseState, Phase, ReferenceFrame, RowWindow};
use crate::core::log::event::{ParseEvent, RankingMode, SolutionRow};
use tracing::{debug, info, trace, warn};

/// What the demultiplexer needs the log reader to do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderDirective {
    FollowUpdateFile,
    FollowInitialLog,
    RecycleUpdateFile,
}

/// Applies classified events to a [`ParseState`] and raises notifications.
///
/// Once the run reaches a terminal phase every later event is ignored and no
/// further notification is sent.
pub struct Demultiplexer<'a, 'r> {
    config: &'a ParseConfig,
    reporter: &'a ProgressReporter<'r>,
    state: ParseState,
    follows_update_file: bool,
}

impl<'a, 'r> Demultiplexer<'a, 'r> {
    /// `follows_update_file` enables the update-file handshake: the ready
    /// signal and every closed ready window then direct the log reader.
    pub fn new(
        config: &'a ParseConfig,
        follows_update_file: bool,
        reporter: &'a ProgressReporter<'r>,
    ) -> Self {
        let flex_bonds = if config.flexible_dihedrals {
            config.flex_bonds.clone()
        } else {
            Default::default()
        };
        Self {
            config,
            reporter,
            state: ParseState::new(config.ligand_atom_count, flex_bonds),
            follows_update_file,
        }
    }

    pub fn state(&self) -> &ParseState {
        &self.state
    }

    pub fn into_state(self) -> ParseState {
        self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Applies one event. Errors have already moved the run to `Failed` and
    /// reported `Fatal` by the time they are returned.
    pub fn apply(&mut self, event: ParseEvent) -> Result<Option<ReaderDirective>, EngineError> {
        if self.state.phase.is_terminal() {
            trace!("Ignoring {} after the run ended", event.kind());
            return Ok(None);
        }

        match self.dispatch(event) {
            Ok(directive) => Ok(directive),
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    fn dispatch(&mut self, event: ParseEvent) -> Result<Option<ReaderDirective>, EngineError> {
        match event {
            ParseEvent::GridVertex { index, position } => {
                self.state.grid.insert(index, position);
            }
            ParseEvent::GenerationStart { number } => return self.start_generation(number),
            ParseEvent::RankingMode { mode } => self.open_window(mode)?,
            ParseEvent::SolutionRow { row, .. } => return self.push_row(row),
            ParseEvent::RotamerAnnouncement { residue, dihedrals } => {
                self.state.rotamers.record(residue.clone(), &dihedrals);
                let count = self.state.rotamers.count(&residue);
                self.reporter
                    .report(Progress::RotamerDiscovered { residue, count });
            }
            ParseEvent::FlexDihedralShift { atoms, shift } => {
                if self.config.flexible_dihedrals {
                    self.state.dihedral_shifts.insert(atoms, shift);
                } else {
                    trace!("Flexible dihedrals disabled; ignoring shift for {}", atoms);
                }
            }
            ParseEvent::ListedAtom { atom_index, .. } => self.list_atom(atom_index),
            ParseEvent::ProteinCentroid { center } => {
                self.state.reference_frame = Some(ReferenceFrame::from_centroid(center));
            }
            ParseEvent::ClusteringStarted => {
                info!("Engine started clustering the population.");
                self.reporter.report(Progress::ClusteringStarted);
            }
            ParseEvent::Done => {
                self.state.pending_error = None;
                self.state.done = true;
            }
            ParseEvent::ReadySignal => return Ok(self.ready()),
            ParseEvent::FatalError { message } => {
                return Err(EngineError::engine_reported(&message));
            }
            ParseEvent::Unrecognized { raw } => {
                self.state.unrecognized_lines += 1;
                trace!("Unrecognized engine output: {:?}", raw);
            }
        }
        Ok(None)
    }

    fn promote_to_running(&mut self) {
        if self.state.phase == Phase::AwaitingStart {
            self.state.phase = Phase::Running;
            info!("Simulation started.");
            self.reporter.report(Progress::SimulationStarted);
        }
    }

    fn ready(&mut self) -> Option<ReaderDirective> {
        self.promote_to_running();
        if self.state.ready_seen {
            return None;
        }
        self.state.ready_seen = true;
        self.follows_update_file
            .then_some(ReaderDirective::FollowUpdateFile)
    }

    fn ensure_window_closed(&self) -> Result<(), EngineError> {
        match &self.state.window {
            Some(window) if !window.is_complete(self.config.rows_per_generation) => {
                Err(ProtocolViolation::UnclosedWindow {
                    generation: window.generation,
                    received: window.next_rank(),
                    expected: self.config.rows_per_generation,
                }
                .into())
            }
            _ => Ok(()),
        }
    }

    fn start_generation(&mut self, number: u32) -> Result<Option<ReaderDirective>, EngineError> {
        self.ensure_window_closed()?;
        self.promote_to_running();

        self.state.generation = Some(number);
        self.state.ranking_mode = None;
        self.state.top_rank = None;
        self.state.window = None;
        debug!("Generation {} of {}", number, self.config.total_generations);
        self.reporter.report(Progress::GenerationAdvanced {
            generation: number,
            total: self.config.total_generations,
        });
        Ok(None)
    }

    fn open_window(&mut self, mode: RankingMode) -> Result<(), EngineError> {
        self.ensure_window_closed()?;
        self.state.ranking_mode = Some(mode);
        self.state.window = self
            .state
            .generation
            .map(|generation| RowWindow::new(generation, mode));
        self.reporter.report(Progress::RankingModeObserved { mode });
        Ok(())
    }

    fn push_row(&mut self, row: SolutionRow) -> Result<Option<ReaderDirective>, EngineError> {
        let rows_per_generation = self.config.rows_per_generation;
        let Some(window) = self.state.window.as_mut() else {
            debug!(
                "Ignoring row of rank {} outside a ranked generation block",
                row.rank
            );
            return Ok(None);
        };

        if window.is_complete(rows_per_generation) || row.rank >= rows_per_generation {
            return Err(ProtocolViolation::RowOverflow {
                generation: window.generation,
                rank: row.rank,
                rows_per_generation,
            }
            .into());
        }
        if row.rank != window.next_rank() {
            return Err(ProtocolViolation::RankOutOfOrder {
                generation: window.generation,
                expected: window.next_rank(),
                found: row.rank,
            }
            .into());
        }

        self.state.top_rank = Some(self.state.top_rank.map_or(row.rank, |top| top.max(row.rank)));
        window.rows.push(row);
        if !window.is_complete(rows_per_generation) {
            return Ok(None);
        }

        self.state.windows_closed += 1;
        if window.mode != self.config.ready_ranking {
            return Ok(None);
        }

        let ready = window.clone();
        Ok(self.generation_ready(ready))
    }

    fn generation_ready(&mut self, window: RowWindow) -> Option<ReaderDirective> {
        let generation = window.generation;
        self.reporter.report(Progress::GenerationReady {
            generation,
            rows: window.rows.clone(),
        });
        self.state.last_ready = Some(window);

        let is_final = self.config.is_final_generation(generation);
        if generation % self.config.draw_frequency == 0 || is_final {
            self.reporter.report(Progress::RefreshDisplay { generation });
        }

        if !self.follows_update_file {
            None
        } else if is_final {
            Some(ReaderDirective::FollowInitialLog)
        } else {
            Some(ReaderDirective::RecycleUpdateFile)
        }
    }

    fn list_atom(&mut self, atom_index: u32) {
        let Some(count) = self.state.declared_atom_count else {
            self.state.listed_atoms.push(atom_index);
            return;
        };
        if self.state.listed_atoms.len() >= count {
            trace!("Ignoring extra listed atom {}", atom_index);
            return;
        }

        self.state.listed_atoms.push(atom_index);
        if self.state.listed_atoms.len() == count && self.config.flexible_dihedrals {
            let order = self.state.listed_atoms.clone();
            let mut all_ordered = true;
            for bond in self.state.flex_bonds.values_mut() {
                all_ordered &= bond.reorder_by(&order);
            }
            self.state.atoms_ordered = all_ordered;
            debug!("Reordered {} flexible bond(s)", self.state.flex_bonds.len());
        }
    }

    pub fn pause(&mut self) {
        if self.state.phase == Phase::Running {
            self.state.phase = Phase::Paused;
            info!("Simulation paused.");
        }
    }

    pub fn resume(&mut self) {
        if self.state.phase == Phase::Paused {
            self.state.phase = Phase::Running;
            info!("Simulation resumed.");
        }
    }

    /// Moves the run to `Failed` and reports `Fatal` unless it already ended.
    pub fn fail(&mut self, err: &EngineError) {
        if self.state.phase.is_terminal() {
            return;
        }
        let message = err.to_string();
        warn!("Simulation failed: {}", message);
        self.state.phase = Phase::Failed;
        self.state.pending_error = Some(message.clone());
        self.reporter.report(Progress::Fatal { message });
    }

    pub fn cancel(&mut self) {
        if self.state.phase.is_terminal() {
            return;
        }
        info!("Simulation stopped on request.");
        self.state.phase = Phase::Failed;
        self.reporter.report(Progress::Cancelled);
    }

    /// Settles the run once the engine exited with `code`.
    pub fn finish(&mut self, code: i32) -> Result<(), EngineError> {
        if self.state.phase.is_terminal() {
            return match self.state.phase {
                Phase::Failed => Err(self.terminal_error()),
                _ => Ok(()),
            };
        }
        if code != 0 {
            let err = EngineError::AbnormalExit { code };
            self.fail(&err);
            return Err(err);
        }
        if !self.state.done {
            debug!("Engine exited cleanly without a completion marker.");
        }
        self.state.phase = Phase::Completed;
        info!("Simulation completed.");
        self.reporter.report(Progress::Completed);
        Ok(())
    }

    fn terminal_error(&self) -> EngineError {
        match &self.state.pending_error {
            Some(message) => EngineError::Internal(message.clone()),
            None => EngineError::Cancelled,
        }
    }
}
