use labeling_core::PrefetchTrigger;

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub prefetch_trigger: PrefetchTrigger,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The session was shut down or its driver task is gone.
    #[error("labeling session is closed")]
    Closed,
    /// A search or classification was still in flight, so the search was not started.
    #[error("a request is still in flight")]
    Busy,
}
