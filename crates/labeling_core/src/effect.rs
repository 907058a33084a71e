use crate::{ImageClass, ImageReference, RequestId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Ask the image source for one page of results.
    Search {
        request_id: RequestId,
        term: String,
        page: u32,
        kind: FetchKind,
    },
    /// Record a confirm decision with the classification sink.
    Classify {
        request_id: RequestId,
        image: ImageReference,
        target: ImageClass,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// First page of a new search; replaces the buffer.
    Initial,
    /// Next page of the current search; appends to the buffer.
    Prefetch,
}
