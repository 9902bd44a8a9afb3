use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};
use nrgsuite::core::log::event::SolutionRow;
use nrgsuite::engine::progress::{Progress, ProgressCallback};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::warn;

#[derive(Debug)]
pub enum UiEvent {
    Progress(Progress),
    Log(String),
}

pub struct UiManager {
    mp: Arc<MultiProgress>,
    state: BarState,
    event_receiver: mpsc::Receiver<UiEvent>,
    shutdown_receiver: watch::Receiver<bool>,
    _sentinel_bar: ProgressBar,
}

#[derive(Default)]
struct BarState {
    active_bar: Option<ProgressBar>,
    base_message: String,
    tracking_generations: bool,
    best: Option<(u32, SolutionRow)>,
}

impl UiManager {
    pub fn new() -> (Self, mpsc::Sender<UiEvent>, watch::Sender<bool>) {
        let (event_sender, event_receiver) = mpsc::channel(1024);
        let (shutdown_sender, shutdown_receiver) = watch::channel(false);
        let mp = Arc::new(MultiProgress::new());
        mp.set_draw_target(ProgressDrawTarget::stderr_with_hz(12));
        let _sentinel_bar = mp.add(ProgressBar::hidden());
        let manager = Self {
            mp,
            state: BarState::default(),
            event_receiver,
            shutdown_receiver,
            _sentinel_bar,
        };

        (manager, event_sender, shutdown_sender)
    }

    pub async fn run(mut self) {
        loop {
            tokio::select! {
                Some(event) = self.event_receiver.recv() => {
                    self.handle_event(event);
                }
                result = self.shutdown_receiver.changed() => {
                    if result.is_err() || *self.shutdown_receiver.borrow() {
                        break;
                    }
                }
            }
        }
        while let Ok(event) = self.event_receiver.try_recv() {
            self.handle_event(event);
        }
        if let Some(bar) = self.state.active_bar.take() {
            bar.finish_and_clear();
        }
        self._sentinel_bar.finish_and_clear();
    }

    fn handle_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::Log(msg) => {
                self.mp.println(msg).ok();
            }
            UiEvent::Progress(progress) => self.handle_progress(progress),
        }
    }

    fn start_spinner(&mut self, name: &str) {
        if let Some(bar) = self.state.active_bar.take() {
            bar.finish_and_clear();
        }

        let pb = self.mp.add(ProgressBar::new_spinner());
        pb.enable_steady_tick(Duration::from_millis(80));
        pb.set_style(Self::spinner_style());
        pb.set_message(name.to_string());

        self.state.active_bar = Some(pb);
        self.state.base_message = name.to_string();
        self.state.tracking_generations = false;
    }

    fn finish_with(&mut self, line: String) {
        if let Some(bar) = self.state.active_bar.take() {
            bar.finish_and_clear();
        }
        self.state.base_message.clear();
        self.state.tracking_generations = false;
        self.mp.println(line).ok();
    }

    fn handle_progress(&mut self, progress: Progress) {
        match progress {
            Progress::SimulationStarted => {
                self.start_spinner("Initializing simulation");
            }
            Progress::GenerationAdvanced { generation, total } => {
                if !self.state.tracking_generations {
                    if self.state.active_bar.is_none() {
                        self.start_spinner("Running genetic algorithm");
                    }
                    if let Some(bar) = self.state.active_bar.as_ref() {
                        bar.disable_steady_tick();
                        bar.set_style(Self::bar_style());
                    }
                    self.state.base_message = "Running genetic algorithm".to_string();
                    self.state.tracking_generations = true;
                }
                if let Some(bar) = self.state.active_bar.as_ref() {
                    bar.set_length(u64::from(total));
                    bar.set_position(u64::from(generation.min(total)));
                    bar.set_message(self.status_message());
                }
            }
            Progress::RankingModeObserved { .. } | Progress::RotamerDiscovered { .. } => {}
            Progress::GenerationReady { generation, rows } => {
                if let Some(best) = rows.into_iter().next() {
                    self.state.best = Some((generation, best));
                }
                if let Some(bar) = self.state.active_bar.as_ref() {
                    bar.set_message(self.status_message());
                }
            }
            Progress::RefreshDisplay { generation } => {
                if let Some((ready, best)) = self.state.best.as_ref().filter(|(g, _)| *g == generation) {
                    self.mp
                        .println(format!(
                            "  Generation {:>5}: best value {:>10.3}, fitness {:>8.3}",
                            ready, best.value, best.fitness
                        ))
                        .ok();
                }
            }
            Progress::ClusteringStarted => {
                if let Some(bar) = self.state.active_bar.as_ref() {
                    bar.finish();
                }
                self.state.active_bar = None;
                self.start_spinner("Clustering solutions");
            }
            Progress::Completed => {
                let line = match self.state.best.as_ref() {
                    Some((generation, best)) => format!(
                        "✓ Simulation completed (best value {:.3} at generation {})",
                        best.value, generation
                    ),
                    None => "✓ Simulation completed".to_string(),
                };
                self.finish_with(line);
            }
            Progress::Fatal { message } => {
                self.finish_with(format!("✗ {}", message));
            }
            Progress::Cancelled => {
                self.finish_with("✗ Simulation cancelled".to_string());
            }
        }
    }

    fn status_message(&self) -> String {
        match self.state.best.as_ref() {
            Some((_, best)) => format!("{} (best {:.3})", self.state.base_message, best.value),
            None => self.state.base_message.clone(),
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .expect("Invalid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("{msg:<45} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .expect("Invalid template")
            .with_key(
                "eta",
                |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                    let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
                },
            )
            .progress_chars("━╸ ")
    }
}

#[derive(Clone)]
pub struct CliProgressHandler {
    sender: mpsc::Sender<UiEvent>,
}

impl CliProgressHandler {
    pub fn new(sender: mpsc::Sender<UiEvent>) -> Self {
        Self { sender }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let sender = self.sender.clone();
        Box::new(move |progress: Progress| {
            if let Err(e) = sender.try_send(UiEvent::Progress(progress)) {
                warn!("Failed to send progress update to UI channel: {}", e);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn setup_manager() -> UiManager {
        let (manager, _sender, _shutdown) = UiManager::new();
        manager.mp.set_draw_target(ProgressDrawTarget::hidden());
        manager
    }

    fn row(value: f64) -> SolutionRow {
        SolutionRow {
            rank: 0,
            genes: vec![1.0],
            value,
            fitness: 100.0,
        }
    }

    fn send(manager: &mut UiManager, progress: Progress) {
        manager.handle_event(UiEvent::Progress(progress));
    }

    #[test]
    fn simulation_start_creates_spinner() {
        let mut manager = setup_manager();
        assert!(manager.state.active_bar.is_none());

        send(&mut manager, Progress::SimulationStarted);

        let bar = manager.state.active_bar.as_ref().unwrap();
        assert_eq!(bar.message(), "Initializing simulation");
        assert!(!manager.state.tracking_generations);
    }

    #[test]
    fn generation_advance_switches_to_bar() {
        let mut manager = setup_manager();
        send(&mut manager, Progress::SimulationStarted);
        send(
            &mut manager,
            Progress::GenerationAdvanced {
                generation: 3,
                total: 10,
            },
        );

        let bar = manager.state.active_bar.as_ref().unwrap();
        assert_eq!(bar.length(), Some(10));
        assert_eq!(bar.position(), 3);
        assert!(manager.state.tracking_generations);
    }

    #[test]
    fn generation_advance_without_start_still_tracks() {
        let mut manager = setup_manager();
        send(
            &mut manager,
            Progress::GenerationAdvanced {
                generation: 0,
                total: 5,
            },
        );
        assert_eq!(manager.state.active_bar.as_ref().unwrap().length(), Some(5));
    }

    #[test]
    fn ready_generation_updates_best_solution() {
        let mut manager = setup_manager();
        send(
            &mut manager,
            Progress::GenerationAdvanced {
                generation: 1,
                total: 10,
            },
        );
        send(
            &mut manager,
            Progress::GenerationReady {
                generation: 1,
                rows: vec![row(-42.5), row(-40.0)],
            },
        );

        let (generation, best) = manager.state.best.as_ref().unwrap();
        assert_eq!(*generation, 1);
        assert_eq!(best.value, -42.5);
        let bar = manager.state.active_bar.as_ref().unwrap();
        assert_eq!(bar.message(), "Running genetic algorithm (best -42.500)");

        send(&mut manager, Progress::RefreshDisplay { generation: 1 });
    }

    #[test]
    fn clustering_replaces_generation_bar() {
        let mut manager = setup_manager();
        send(
            &mut manager,
            Progress::GenerationAdvanced {
                generation: 10,
                total: 10,
            },
        );
        send(&mut manager, Progress::ClusteringStarted);

        let bar = manager.state.active_bar.as_ref().unwrap();
        assert_eq!(bar.message(), "Clustering solutions");
        assert!(!manager.state.tracking_generations);
    }

    #[test]
    fn terminal_events_clear_active_bar() {
        for terminal in [
            Progress::Completed,
            Progress::Cancelled,
            Progress::Fatal {
                message: "*FlexAID ERROR".into(),
            },
        ] {
            let mut manager = setup_manager();
            send(&mut manager, Progress::SimulationStarted);
            send(&mut manager, terminal);
            assert!(manager.state.active_bar.is_none());
            assert!(manager.state.base_message.is_empty());
        }
    }

    #[tokio::test]
    async fn cli_progress_handler_sends_progress_event() {
        let (sender, mut receiver) = mpsc::channel(1);
        let handler = CliProgressHandler::new(sender);
        let callback = handler.get_callback();

        callback(Progress::GenerationAdvanced {
            generation: 2,
            total: 4,
        });

        match receiver.recv().await.unwrap() {
            UiEvent::Progress(Progress::GenerationAdvanced { generation, total }) => {
                assert_eq!((generation, total), (2, 4));
            }
            other => panic!("Incorrect event received: {other:?}"),
        }
    }

    #[test]
    fn log_events_print() {
        let mut manager = setup_manager();
        manager.handle_event(UiEvent::Log("Test log message".to_string()));
    }
}
