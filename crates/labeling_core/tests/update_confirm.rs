use labeling_core::{
    update, Effect, FailureKind, FetchKind, ImageClass, ImageReference, Msg, RemoteFetchError,
    RequestId, Session, WorkflowState,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    engine_logging::initialize_for_tests();
}

fn cats() -> ImageClass {
    ImageClass::new(7, "cats")
}

fn images(count: usize) -> Vec<ImageReference> {
    (0..count)
        .map(|i| ImageReference::new(format!("img-{i}"), format!("https://img.example.com/{i}.png")))
        .collect()
}

fn ready_session(count: usize) -> Session {
    let (state, _) = update(Session::new(cats()), Msg::SearchSubmitted("cats".to_string()));
    let (state, _) = update(
        state,
        Msg::SearchCompleted {
            request_id: 1,
            result: Ok(images(count)),
        },
    );
    state
}

fn classify_request(effects: &[Effect]) -> RequestId {
    effects
        .iter()
        .find_map(|effect| match effect {
            Effect::Classify { request_id, .. } => Some(*request_id),
            _ => None,
        })
        .expect("classify effect")
}

fn confirmed(state: Session, result: Result<(), RemoteFetchError>) -> (Session, Vec<Effect>) {
    let (state, effects) = update(state, Msg::ConfirmClicked(cats()));
    let request_id = classify_request(&effects);
    update(state, Msg::ClassifyCompleted { request_id, result })
}

#[test]
fn confirm_sends_current_image_and_target_class() {
    init_logging();
    let state = ready_session(3);

    let (state, effects) = update(state, Msg::ConfirmClicked(cats()));

    assert_eq!(
        effects,
        vec![Effect::Classify {
            request_id: 2,
            image: images(3)[0].clone(),
            target: cats(),
        }]
    );
    assert!(state.is_classifying());
    assert_eq!(state.cursor(), 0);
}

#[test]
fn confirm_success_advances_one_item() {
    init_logging();
    let (state, effects) = confirmed(ready_session(3), Ok(()));

    assert!(effects.is_empty());
    assert_eq!(state.cursor(), 1);
    assert!(!state.is_classifying());
    assert_eq!(state.current_item(), Some(&images(3)[1]));
}

#[test]
fn confirm_failure_keeps_cursor_and_allows_retry() {
    init_logging();
    let cause = RemoteFetchError::new(FailureKind::Timeout, "operation timed out");
    let (state, _) = confirmed(ready_session(3), Err(cause.clone()));

    assert_eq!(state.workflow_state(), WorkflowState::Error(cause));
    assert_eq!(state.cursor(), 0);

    let (state, effects) = update(state, Msg::ConfirmClicked(cats()));
    let retried = effects
        .iter()
        .find_map(|effect| match effect {
            Effect::Classify { image, .. } => Some(image.clone()),
            _ => None,
        })
        .expect("retry classify");
    assert_eq!(retried, images(3)[0]);

    let request_id = classify_request(&effects);
    let (state, _) = update(
        state,
        Msg::ClassifyCompleted {
            request_id,
            result: Ok(()),
        },
    );
    assert_eq!(state.cursor(), 1);
    assert!(matches!(state.workflow_state(), WorkflowState::Ready { cursor: 1, .. }));
}

#[test]
fn confirm_on_last_item_exhausts_buffer() {
    init_logging();
    let state = ready_session(3);
    let (state, _) = update(state, Msg::AdvanceClicked);
    let (state, _) = update(state, Msg::AdvanceClicked);

    let (state, _) = confirmed(state, Ok(()));
    assert_eq!(state.cursor(), 3);
    assert_eq!(state.current_item(), None);

    let (state, effects) = update(state, Msg::AdvanceClicked);
    assert_eq!(state.cursor(), 3);
    assert!(effects.is_empty());

    let (state, effects) = update(state, Msg::ConfirmClicked(cats()));
    assert!(effects.is_empty());
    assert!(!state.is_classifying());
}

#[test]
fn confirm_success_can_trigger_prefetch() {
    init_logging();
    let (state, effects) = confirmed(ready_session(11), Ok(()));

    assert_eq!(state.cursor(), 1);
    assert_eq!(
        effects,
        vec![Effect::Search {
            request_id: 3,
            term: "cats".to_string(),
            page: 2,
            kind: FetchKind::Prefetch,
        }]
    );
}

#[test]
fn browsing_waits_for_pending_classification() {
    init_logging();
    let (state, effects) = update(ready_session(3), Msg::ConfirmClicked(cats()));
    let request_id = classify_request(&effects);

    let (state, effects) = update(state, Msg::DiscardClicked);
    assert!(effects.is_empty());
    assert_eq!(state.cursor(), 0);

    let (state, effects) = update(state, Msg::ConfirmClicked(cats()));
    assert!(effects.is_empty());

    let (state, _) = update(
        state,
        Msg::ClassifyCompleted {
            request_id,
            result: Ok(()),
        },
    );
    assert_eq!(state.cursor(), 1);
}

#[test]
fn stale_classify_completion_is_ignored() {
    init_logging();
    let (state, effects) = update(ready_session(3), Msg::ConfirmClicked(cats()));
    let request_id = classify_request(&effects);

    let (state, _) = update(
        state,
        Msg::ClassifyCompleted {
            request_id: request_id + 1,
            result: Ok(()),
        },
    );
    assert_eq!(state.cursor(), 0);
    assert!(state.is_classifying());
}
