use tl_results::RunId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStage {
    Discovering,
    ProcessingRun,
    RunCompleted,
    RunSkipped,
    Persisting,
    Completed,
}

#[derive(Debug, Clone)]
pub struct BatchProgressEvent {
    pub stage: BatchStage,
    /// Runs finished so far, successful or skipped.
    pub completed: usize,
    pub total: usize,
    pub run_id: Option<RunId>,
    pub elapsed_wall_s: f64,
}

impl BatchProgressEvent {
    pub fn fraction_complete(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}
