use crate::{Effect, Msg, Session};

/// Pure update function: applies a message to the session and returns any effects.
pub fn update(mut state: Session, msg: Msg) -> (Session, Vec<Effect>) {
    let effect = match msg {
        Msg::SearchSubmitted(term) => state.begin_search(term),
        Msg::AdvanceClicked | Msg::DiscardClicked => state.advance_cursor(),
        Msg::ConfirmClicked(target) => state.begin_classify(target),
        Msg::SearchCompleted { request_id, result } => {
            state.apply_search_result(request_id, result);
            None
        }
        Msg::ClassifyCompleted { request_id, result } => {
            state.apply_classify_result(request_id, result)
        }
    };

    (state, effect.into_iter().collect())
}
