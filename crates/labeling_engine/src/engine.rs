use std::sync::Arc;

use engine_logging::{engine_debug, engine_info, engine_warn};
use labeling_core::{
    update, Effect, FetchKind, ImageClass, ImageReference, Msg, RequestId, Session, SessionView,
    WorkflowState,
};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

use crate::sink::ClassificationSink;
use crate::source::ImageSource;
use crate::{EngineConfig, EngineError};

type Reply = oneshot::Sender<Result<WorkflowState, EngineError>>;

// Views a subscriber may fall behind by before it starts skipping.
const VIEW_BACKLOG: usize = 64;

enum EngineCommand {
    StartSearch { term: String, reply: Reply },
    Advance { reply: Reply },
    Discard { reply: Reply },
    Confirm { target: ImageClass, reply: Reply },
}

/// Cloneable handle to one labeling session.
///
/// The session runs as a task on the tokio runtime that owns the result
/// buffer. Calls are answered once the state they caused is settled: a
/// search resolves when its first page arrives, a confirm when the sink
/// answers. Prefetches run in the background and are visible through
/// [`EngineHandle::subscribe`].
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::UnboundedSender<EngineCommand>,
    view_rx: watch::Receiver<SessionView>,
    // Weak so that subscriptions end once the driver is gone.
    updates: broadcast::WeakSender<SessionView>,
    cancel: CancellationToken,
}

impl EngineHandle {
    /// Starts a session bound to `class`. Must be called within a tokio runtime.
    pub fn spawn(
        class: ImageClass,
        source: Arc<dyn ImageSource>,
        sink: Arc<dyn ClassificationSink>,
        config: EngineConfig,
    ) -> Self {
        let session = Session::with_trigger(class, config.prefetch_trigger);
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(session.view());
        let (updates_tx, _) = broadcast::channel(VIEW_BACKLOG);
        let updates = updates_tx.downgrade();
        let cancel = CancellationToken::new();

        let driver = SessionDriver {
            session,
            source,
            sink,
            view_tx,
            updates_tx,
            done_tx,
            cancel: cancel.clone(),
            waiting: Vec::new(),
        };
        tokio::spawn(driver.run(cmd_rx, done_rx));

        Self {
            cmd_tx,
            view_rx,
            updates,
            cancel,
        }
    }

    /// Fails with [`EngineError::Busy`] while a search or confirm is in flight.
    pub async fn start_search(
        &self,
        term: impl Into<String>,
    ) -> Result<WorkflowState, EngineError> {
        let term = term.into();
        self.request(|reply| EngineCommand::StartSearch { term, reply })
            .await
    }

    pub async fn advance(&self) -> Result<WorkflowState, EngineError> {
        self.request(|reply| EngineCommand::Advance { reply }).await
    }

    pub async fn discard(&self) -> Result<WorkflowState, EngineError> {
        self.request(|reply| EngineCommand::Discard { reply }).await
    }

    pub async fn confirm(&self, target: ImageClass) -> Result<WorkflowState, EngineError> {
        self.request(|reply| EngineCommand::Confirm { target, reply })
            .await
    }

    pub fn current_state(&self) -> WorkflowState {
        self.view_rx.borrow().state.clone()
    }

    pub fn current_item(&self) -> Option<ImageReference> {
        self.view_rx.borrow().current_item().cloned()
    }

    pub fn view(&self) -> SessionView {
        self.view_rx.borrow().clone()
    }

    /// Yields the latest view, then every view published after it.
    /// Drop it to unsubscribe.
    pub fn subscribe(&self) -> ViewSubscription {
        let updates = match self.updates.upgrade() {
            Some(updates_tx) => updates_tx.subscribe(),
            None => {
                let (closed_tx, closed_rx) = broadcast::channel(1);
                drop(closed_tx);
                closed_rx
            }
        };
        // Read after subscribing: a view published in between shows up in
        // both and is dropped by `ViewSubscription::next`.
        let latest = self.view_rx.borrow().clone();
        ViewSubscription {
            latest: Some(latest.clone()),
            first: Some(latest),
            updates,
        }
    }

    /// Ends the session and cancels any request in flight.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.cmd_tx.is_closed()
    }

    async fn request(
        &self,
        command: impl FnOnce(Reply) -> EngineCommand,
    ) -> Result<WorkflowState, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(command(reply_tx))
            .map_err(|_| EngineError::Closed)?;
        reply_rx.await.map_err(|_| EngineError::Closed)?
    }
}

/// Stream of session views returned by [`EngineHandle::subscribe`].
pub struct ViewSubscription {
    latest: Option<SessionView>,
    // Snapshot handed out first, used to drop its duplicate from `updates`.
    first: Option<SessionView>,
    updates: broadcast::Receiver<SessionView>,
}

impl ViewSubscription {
    /// Next view in publication order, or `None` once the session is closed
    /// and every published view was seen.
    pub async fn next(&mut self) -> Option<SessionView> {
        if let Some(view) = self.latest.take() {
            return Some(view);
        }
        loop {
            match self.updates.recv().await {
                Ok(view) => {
                    if self.first.take().is_some_and(|first| first == view) {
                        continue;
                    }
                    return Some(view);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    engine_warn!("View subscriber fell behind, skipped {} views", skipped);
                    self.first = None;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

struct SessionDriver {
    session: Session,
    source: Arc<dyn ImageSource>,
    sink: Arc<dyn ClassificationSink>,
    view_tx: watch::Sender<SessionView>,
    updates_tx: broadcast::Sender<SessionView>,
    done_tx: mpsc::UnboundedSender<Msg>,
    cancel: CancellationToken,
    // Callers parked until the request they started completes.
    waiting: Vec<(RequestId, Reply)>,
}

impl SessionDriver {
    async fn run(
        mut self,
        mut cmd_rx: mpsc::UnboundedReceiver<EngineCommand>,
        mut done_rx: mpsc::UnboundedReceiver<Msg>,
    ) {
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                Some(msg) = done_rx.recv() => self.complete(msg),
                command = cmd_rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
            }
        }

        // Stops in-flight requests when the last handle went away.
        self.cancel.cancel();
        engine_info!(
            "Labeling session for class {} closed at cursor {} of {}",
            self.session.class().name,
            self.session.cursor(),
            self.session.buffer().len()
        );
    }

    fn handle_command(&mut self, command: EngineCommand) {
        let (msg, reply) = match command {
            EngineCommand::StartSearch { term, reply } => (Msg::SearchSubmitted(term), reply),
            EngineCommand::Advance { reply } => (Msg::AdvanceClicked, reply),
            EngineCommand::Discard { reply } => (Msg::DiscardClicked, reply),
            EngineCommand::Confirm { target, reply } => (Msg::ConfirmClicked(target), reply),
        };

        let is_search = matches!(msg, Msg::SearchSubmitted(_));
        let effects = self.dispatch(msg);
        let awaited = effects.iter().find_map(|effect| match effect {
            Effect::Search {
                request_id,
                kind: FetchKind::Initial,
                ..
            }
            | Effect::Classify { request_id, .. } => Some(*request_id),
            Effect::Search { .. } => None,
        });
        self.execute(effects);

        match awaited {
            Some(request_id) => self.waiting.push((request_id, reply)),
            None if is_search => {
                let _ = reply.send(Err(EngineError::Busy));
            }
            None => {
                let _ = reply.send(Ok(self.session.workflow_state()));
            }
        }
    }

    fn complete(&mut self, msg: Msg) {
        let request_id = match &msg {
            Msg::SearchCompleted { request_id, .. } | Msg::ClassifyCompleted { request_id, .. } => {
                Some(*request_id)
            }
            _ => None,
        };

        let effects = self.dispatch(msg);
        self.execute(effects);

        if let Some(request_id) = request_id {
            let (ready, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.waiting)
                .into_iter()
                .partition(|(id, _)| *id == request_id);
            self.waiting = pending;
            for (_, reply) in ready {
                let _ = reply.send(Ok(self.session.workflow_state()));
            }
        }
    }

    fn dispatch(&mut self, msg: Msg) -> Vec<Effect> {
        let state = std::mem::take(&mut self.session);
        let (mut state, effects) = update(state, msg);
        if state.consume_dirty() {
            let view = state.view();
            // Latest value first, so `subscribe` never misses a view.
            self.view_tx.send_replace(view.clone());
            let _ = self.updates_tx.send(view);
        }
        self.session = state;
        effects
    }

    fn execute(&self, effects: Vec<Effect>) {
        for effect in effects {
            let done_tx = self.done_tx.clone();
            let cancel = self.cancel.child_token();
            match effect {
                Effect::Search {
                    request_id,
                    term,
                    page,
                    kind,
                } => {
                    engine_debug!(
                        "{:?} search request_id={} page={} term={:?}",
                        kind,
                        request_id,
                        page,
                        term
                    );
                    let source = Arc::clone(&self.source);
                    tokio::spawn(async move {
                        let result = tokio::select! {
                            _ = cancel.cancelled() => return,
                            result = source.search(&term, page) => result,
                        };
                        let _ = done_tx.send(Msg::SearchCompleted { request_id, result });
                    });
                }
                Effect::Classify {
                    request_id,
                    image,
                    target,
                } => {
                    engine_debug!(
                        "Classify request_id={} image={} class={}",
                        request_id,
                        image.id,
                        target.id
                    );
                    let sink = Arc::clone(&self.sink);
                    tokio::spawn(async move {
                        let result = tokio::select! {
                            _ = cancel.cancelled() => return,
                            result = sink.classify(&image, &target) => result,
                        };
                        let _ = done_tx.send(Msg::ClassifyCompleted { request_id, result });
                    });
                }
            }
        }
    }
}
