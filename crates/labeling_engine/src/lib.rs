//! Labeling engine: remote adapters and the async session driver.
mod engine;
mod http;
mod sink;
mod source;
mod types;

pub use engine::{EngineHandle, ViewSubscription};
pub use http::HttpSettings;
pub use sink::{ClassificationSink, Clock, HttpClassificationSink, SinkSettings};
pub use source::{image_id, ImageSource, RapidApiImageSource, SourceSettings};
pub use types::{EngineConfig, EngineError};
