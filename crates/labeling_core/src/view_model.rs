use crate::{ImageClass, WorkflowState};

/// Snapshot published to session observers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionView {
    pub state: WorkflowState,
    pub class: ImageClass,
    pub search_term: Option<String>,
    pub prefetching: bool,
    pub classifying: bool,
    pub pages_fetched: u32,
}

impl SessionView {
    pub fn current_item(&self) -> Option<&crate::ImageReference> {
        self.state.current_item()
    }
}
