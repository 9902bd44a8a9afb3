use crate::core::log::event::{RankingMode, SolutionRow};
use crate::core::models::keys::ResidueKey;

#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    SimulationStarted,
    GenerationAdvanced { generation: u32, total: u32 },
    RankingModeObserved { mode: RankingMode },
    GenerationReady { generation: u32, rows: Vec<SolutionRow> },
    RefreshDisplay { generation: u32 },
    RotamerDiscovered { residue: ResidueKey, count: usize },
    ClusteringStarted,

    Completed,
    Fatal { message: String },
    Cancelled,
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}
