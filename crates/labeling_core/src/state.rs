use std::sync::Arc;

use engine_logging::{engine_debug, engine_info};

use crate::view_model::SessionView;
use crate::{Effect, FetchKind, ImageClass, ImageReference, RemoteFetchError};

/// Remaining-item count at which the next page is requested.
pub const PREFETCH_THRESHOLD: usize = 10;

pub type RequestId = u64;

/// When a browsing step asks for the next page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrefetchTrigger {
    /// Only when exactly `PREFETCH_THRESHOLD` items remain after the step.
    #[default]
    Exact,
    /// Whenever `PREFETCH_THRESHOLD` or fewer items remain after the step.
    AtOrBelow,
}

impl PrefetchTrigger {
    pub fn should_prefetch(self, remaining: usize) -> bool {
        match self {
            PrefetchTrigger::Exact => remaining == PREFETCH_THRESHOLD,
            PrefetchTrigger::AtOrBelow => remaining <= PREFETCH_THRESHOLD,
        }
    }
}

/// Externally visible state of a labeling session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WorkflowState {
    #[default]
    Idle,
    Loading,
    Error(RemoteFetchError),
    Ready {
        /// Shared with the session; cloning the state does not copy the images.
        buffer: Arc<[ImageReference]>,
        cursor: usize,
    },
}

impl WorkflowState {
    /// The image under the cursor, if the session is ready and not exhausted.
    pub fn current_item(&self) -> Option<&ImageReference> {
        match self {
            WorkflowState::Ready { buffer, cursor } => buffer.get(*cursor),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum Status {
    #[default]
    Idle,
    Loading,
    Ready,
    Error(RemoteFetchError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingFetch {
    request_id: RequestId,
    kind: FetchKind,
}

/// Result buffer, cursor and in-flight bookkeeping for one labeling session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    class: ImageClass,
    trigger: PrefetchTrigger,
    term: Option<String>,
    // Append-only per search. Replaced, never mutated in place, so published
    // states can share it.
    buffer: Arc<[ImageReference]>,
    cursor: usize,
    status: Status,
    // Set once the initial page of the current search arrived.
    browsable: bool,
    fetch: Option<PendingFetch>,
    classify: Option<RequestId>,
    pages_fetched: u32,
    next_request_id: RequestId,
    dirty: bool,
}

impl Session {
    pub fn new(class: ImageClass) -> Self {
        Self::with_trigger(class, PrefetchTrigger::default())
    }

    pub fn with_trigger(class: ImageClass, trigger: PrefetchTrigger) -> Self {
        Self {
            class,
            trigger,
            ..Self::default()
        }
    }

    pub fn class(&self) -> &ImageClass {
        &self.class
    }

    pub fn search_term(&self) -> Option<&str> {
        self.term.as_deref()
    }

    pub fn buffer(&self) -> &[ImageReference] {
        &self.buffer
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    pub fn is_fetching(&self) -> bool {
        self.fetch.is_some()
    }

    pub fn is_prefetching(&self) -> bool {
        matches!(
            self.fetch,
            Some(PendingFetch {
                kind: FetchKind::Prefetch,
                ..
            })
        )
    }

    pub fn is_classifying(&self) -> bool {
        self.classify.is_some()
    }

    pub fn current_item(&self) -> Option<&ImageReference> {
        match self.status {
            Status::Ready => self.buffer.get(self.cursor),
            _ => None,
        }
    }

    pub fn workflow_state(&self) -> WorkflowState {
        match &self.status {
            Status::Idle => WorkflowState::Idle,
            Status::Loading => WorkflowState::Loading,
            Status::Error(cause) => WorkflowState::Error(cause.clone()),
            Status::Ready => WorkflowState::Ready {
                buffer: Arc::clone(&self.buffer),
                cursor: self.cursor,
            },
        }
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            state: self.workflow_state(),
            class: self.class.clone(),
            search_term: self.term.clone(),
            prefetching: self.is_prefetching(),
            classifying: self.is_classifying(),
            pages_fetched: self.pages_fetched,
        }
    }

    /// Returns whether the session changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn begin_search(&mut self, term: String) -> Option<Effect> {
        if self.fetch.is_some() || self.classify.is_some() {
            engine_debug!("Search for {:?} rejected: a request is in flight", term);
            return None;
        }

        engine_info!("Starting search for {:?} (class {})", term, self.class.name);
        self.buffer = Arc::default();
        self.cursor = 0;
        self.pages_fetched = 0;
        self.browsable = false;
        self.status = Status::Loading;
        self.term = Some(term.clone());
        self.dirty = true;

        let request_id = self.allocate_request_id();
        self.fetch = Some(PendingFetch {
            request_id,
            kind: FetchKind::Initial,
        });
        Some(Effect::Search {
            request_id,
            term,
            page: 1,
            kind: FetchKind::Initial,
        })
    }

    pub(crate) fn apply_search_result(
        &mut self,
        request_id: RequestId,
        result: Result<Vec<ImageReference>, RemoteFetchError>,
    ) {
        let Some(pending) = self.fetch.filter(|p| p.request_id == request_id) else {
            engine_debug!("Ignoring stale search completion {}", request_id);
            return;
        };
        self.fetch = None;
        self.dirty = true;

        match (pending.kind, result) {
            (FetchKind::Initial, Ok(items)) => {
                engine_info!("Search returned {} images", items.len());
                self.buffer = items.into();
                self.cursor = 0;
                self.pages_fetched = 1;
                self.browsable = true;
                self.status = Status::Ready;
            }
            (FetchKind::Prefetch, Ok(items)) => {
                engine_info!(
                    "Prefetch appended {} images to {}",
                    items.len(),
                    self.buffer.len()
                );
                self.buffer = self.buffer.iter().cloned().chain(items).collect();
                self.pages_fetched += 1;
            }
            (kind, Err(cause)) => {
                engine_info!("{:?} fetch failed: {}", kind, cause);
                self.status = Status::Error(cause);
            }
        }
    }

    /// Moves the cursor one item forward. Returns a prefetch effect when the
    /// step lands on the prefetch trigger.
    pub(crate) fn advance_cursor(&mut self) -> Option<Effect> {
        if !self.can_step() {
            engine_debug!(
                "Advance ignored at cursor {} of {}",
                self.cursor,
                self.buffer.len()
            );
            return None;
        }

        self.cursor += 1;
        self.status = Status::Ready;
        self.dirty = true;
        self.prefetch_if_due()
    }

    pub(crate) fn begin_classify(&mut self, target: ImageClass) -> Option<Effect> {
        if !self.can_step() {
            engine_debug!("Confirm ignored at cursor {}", self.cursor);
            return None;
        }
        let image = self.buffer[self.cursor].clone();
        let request_id = self.allocate_request_id();
        self.classify = Some(request_id);
        self.dirty = true;
        Some(Effect::Classify {
            request_id,
            image,
            target,
        })
    }

    pub(crate) fn apply_classify_result(
        &mut self,
        request_id: RequestId,
        result: Result<(), RemoteFetchError>,
    ) -> Option<Effect> {
        if self.classify != Some(request_id) {
            engine_debug!("Ignoring stale classify completion {}", request_id);
            return None;
        }
        self.classify = None;
        self.dirty = true;

        match result {
            Ok(()) => self.advance_cursor(),
            Err(cause) => {
                engine_info!("Classification failed at cursor {}: {}", self.cursor, cause);
                self.status = Status::Error(cause);
                None
            }
        }
    }

    fn can_step(&self) -> bool {
        self.browsable
            && self.classify.is_none()
            && self.cursor < self.buffer.len()
            && matches!(self.status, Status::Ready | Status::Error(_))
    }

    fn prefetch_if_due(&mut self) -> Option<Effect> {
        let remaining = self.buffer.len() - self.cursor;
        if self.fetch.is_some() || !self.trigger.should_prefetch(remaining) {
            return None;
        }
        let term = self.term.clone()?;
        let request_id = self.allocate_request_id();
        let page = self.pages_fetched + 1;
        engine_debug!(
            "Prefetching page {} with {} images remaining",
            page,
            remaining
        );
        self.fetch = Some(PendingFetch {
            request_id,
            kind: FetchKind::Prefetch,
        });
        Some(Effect::Search {
            request_id,
            term,
            page,
            kind: FetchKind::Prefetch,
        })
    }

    fn allocate_request_id(&mut self) -> RequestId {
        self.next_request_id += 1;
        self.next_request_id
    }
}
