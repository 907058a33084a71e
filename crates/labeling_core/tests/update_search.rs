use std::sync::Once;

use labeling_core::{
    update, Effect, FailureKind, FetchKind, ImageClass, ImageReference, Msg, RemoteFetchError,
    RequestId, Session, WorkflowState,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

fn images(prefix: &str, count: usize) -> Vec<ImageReference> {
    (0..count)
        .map(|i| {
            ImageReference::new(
                format!("{prefix}-{i}"),
                format!("https://img.example.com/{prefix}/{i}.jpg"),
            )
        })
        .collect()
}

fn search_request(effects: &[Effect]) -> RequestId {
    effects
        .iter()
        .find_map(|effect| match effect {
            Effect::Search { request_id, .. } => Some(*request_id),
            _ => None,
        })
        .expect("search effect")
}

fn searched(state: Session, term: &str, items: Vec<ImageReference>) -> Session {
    let (state, effects) = update(state, Msg::SearchSubmitted(term.to_string()));
    let request_id = search_request(&effects);
    let (state, _) = update(
        state,
        Msg::SearchCompleted {
            request_id,
            result: Ok(items),
        },
    );
    state
}

fn network_error() -> RemoteFetchError {
    RemoteFetchError::new(FailureKind::Network, "connection reset")
}

#[test]
fn search_emits_first_page_fetch_and_enters_loading() {
    init_logging();
    let state = Session::new(ImageClass::new(3, "dogs"));

    let (mut next, effects) = update(state, Msg::SearchSubmitted("dogs".to_string()));

    assert_eq!(next.workflow_state(), WorkflowState::Loading);
    assert_eq!(next.search_term(), Some("dogs"));
    assert!(next.is_fetching());
    assert!(next.consume_dirty());
    assert_eq!(
        effects,
        vec![Effect::Search {
            request_id: 1,
            term: "dogs".to_string(),
            page: 1,
            kind: FetchKind::Initial,
        }]
    );
}

#[test]
fn successful_search_is_ready_at_first_item() {
    init_logging();
    let state = searched(Session::new(ImageClass::new(3, "dogs")), "dogs", images("d", 3));

    let items = images("d", 3);
    assert_eq!(
        state.workflow_state(),
        WorkflowState::Ready {
            buffer: items.clone().into(),
            cursor: 0,
        }
    );
    assert_eq!(state.current_item(), Some(&items[0]));
    assert_eq!(state.pages_fetched(), 1);
    assert!(!state.is_fetching());
}

#[test]
fn empty_search_result_is_ready_without_current_item() {
    init_logging();
    let state = searched(Session::new(ImageClass::new(3, "dogs")), "", Vec::new());

    assert_eq!(
        state.workflow_state(),
        WorkflowState::Ready {
            buffer: Vec::new().into(),
            cursor: 0,
        }
    );
    assert_eq!(state.current_item(), None);

    let (state, effects) = update(state, Msg::AdvanceClicked);
    assert_eq!(state.cursor(), 0);
    assert!(effects.is_empty());
}

#[test]
fn failed_search_surfaces_error_and_blocks_browsing() {
    init_logging();
    let (state, effects) = update(
        Session::new(ImageClass::new(3, "dogs")),
        Msg::SearchSubmitted("dogs".to_string()),
    );
    let request_id = search_request(&effects);
    let (state, _) = update(
        state,
        Msg::SearchCompleted {
            request_id,
            result: Err(network_error()),
        },
    );

    assert_eq!(state.workflow_state(), WorkflowState::Error(network_error()));
    assert_eq!(state.current_item(), None);

    let (state, effects) = update(state, Msg::DiscardClicked);
    assert!(effects.is_empty());
    assert_eq!(state.workflow_state(), WorkflowState::Error(network_error()));

    let (state, effects) = update(state, Msg::ConfirmClicked(ImageClass::new(3, "dogs")));
    assert!(effects.is_empty());
    assert!(!state.is_classifying());
}

#[test]
fn search_recovers_from_error() {
    init_logging();
    let (state, effects) = update(
        Session::new(ImageClass::new(3, "dogs")),
        Msg::SearchSubmitted("dogs".to_string()),
    );
    let request_id = search_request(&effects);
    let (state, _) = update(
        state,
        Msg::SearchCompleted {
            request_id,
            result: Err(network_error()),
        },
    );

    let state = searched(state, "dogs", images("d", 2));
    assert_eq!(state.current_item(), Some(&images("d", 2)[0]));
}

#[test]
fn new_search_resets_cursor_and_discards_previous_buffer() {
    init_logging();
    let state = searched(Session::new(ImageClass::new(1, "cats")), "kittens", images("k", 5));
    let (state, _) = update(state, Msg::AdvanceClicked);
    let (state, _) = update(state, Msg::AdvanceClicked);
    assert_eq!(state.cursor(), 2);

    let (loading, effects) = update(state, Msg::SearchSubmitted("cats".to_string()));
    assert_eq!(loading.buffer().len(), 0);
    assert_eq!(loading.cursor(), 0);

    let request_id = search_request(&effects);
    let (state, _) = update(
        loading,
        Msg::SearchCompleted {
            request_id,
            result: Ok(images("c", 4)),
        },
    );
    assert_eq!(state.cursor(), 0);
    assert_eq!(state.buffer(), images("c", 4).as_slice());
    assert_eq!(state.search_term(), Some("cats"));
}

#[test]
fn search_is_rejected_while_fetch_in_flight() {
    init_logging();
    let (mut state, effects) = update(
        Session::new(ImageClass::new(1, "cats")),
        Msg::SearchSubmitted("cats".to_string()),
    );
    let first = search_request(&effects);
    assert!(state.consume_dirty());

    let (mut state, effects) = update(state, Msg::SearchSubmitted("dogs".to_string()));
    assert!(effects.is_empty());
    assert_eq!(state.search_term(), Some("cats"));
    assert!(!state.consume_dirty());

    let (state, _) = update(
        state,
        Msg::SearchCompleted {
            request_id: first,
            result: Ok(images("c", 1)),
        },
    );
    assert_eq!(state.buffer(), images("c", 1).as_slice());
}

#[test]
fn stale_search_completion_is_ignored() {
    init_logging();
    let (state, effects) = update(
        Session::new(ImageClass::new(1, "cats")),
        Msg::SearchSubmitted("cats".to_string()),
    );
    let request_id = search_request(&effects);

    let (mut state, _) = update(
        state,
        Msg::SearchCompleted {
            request_id: request_id + 40,
            result: Ok(images("x", 3)),
        },
    );
    state.consume_dirty();

    assert_eq!(state.workflow_state(), WorkflowState::Loading);
    assert!(state.is_fetching());
    assert!(!state.consume_dirty());
}

#[test]
fn search_is_rejected_while_classification_in_flight() {
    init_logging();
    let state = searched(Session::new(ImageClass::new(1, "cats")), "cats", images("c", 3));
    let (state, effects) = update(state, Msg::ConfirmClicked(ImageClass::new(1, "cats")));
    assert_eq!(effects.len(), 1);

    let (state, effects) = update(state, Msg::SearchSubmitted("dogs".to_string()));
    assert!(effects.is_empty());
    assert_eq!(state.search_term(), Some("cats"));
    assert_eq!(state.buffer().len(), 3);
}
