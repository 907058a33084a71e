//! Labeling core: pure browsing/classification state machine and view-model helpers.
mod effect;
mod error;
mod model;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::{Effect, FetchKind};
pub use error::{FailureKind, RemoteFetchError};
pub use model::{ImageClass, ImageReference, SourceMetadata};
pub use msg::Msg;
pub use state::{PrefetchTrigger, RequestId, Session, WorkflowState, PREFETCH_THRESHOLD};
pub use update::update;
pub use view_model::SessionView;
