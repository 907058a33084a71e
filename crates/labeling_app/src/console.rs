use labeling_core::{SessionView, WorkflowState};

pub(crate) const HELP: &str = "\
commands:
  search <term>   start a new search (replaces the current results)
  next            skip the current image
  discard         reject the current image
  confirm         label the current image with the session class
  show            print the current state
  help            print this help
  quit            end the session";

pub(crate) const BUSY: &str = "busy: wait for the current request to finish, then search again";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ConsoleCommand {
    Search(String),
    Next,
    Discard,
    Confirm,
    Show,
    Help,
    Quit,
    Unknown(String),
}

/// Parses one input line. Blank lines yield `None`.
pub(crate) fn parse_command(line: &str) -> Option<ConsoleCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "search" | "s" => ConsoleCommand::Search(rest.to_string()),
        "next" | "n" => ConsoleCommand::Next,
        "discard" | "d" => ConsoleCommand::Discard,
        "confirm" | "c" | "y" => ConsoleCommand::Confirm,
        "show" => ConsoleCommand::Show,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" | "q" => ConsoleCommand::Quit,
        _ => ConsoleCommand::Unknown(word.to_string()),
    };
    Some(command)
}

/// One status line for the session.
pub(crate) fn render_view(view: &SessionView) -> String {
    let class = &view.class.name;
    let term = view.search_term.as_deref().unwrap_or("");

    let mut line = match &view.state {
        WorkflowState::Idle => format!("[{class}] idle, type `search <term>`"),
        WorkflowState::Loading => format!("[{class}] searching {term:?}..."),
        WorkflowState::Error(cause) => format!("[{class}] error: {cause}"),
        WorkflowState::Ready { buffer, cursor } => match buffer.get(*cursor) {
            Some(image) => {
                let title = image
                    .source
                    .as_ref()
                    .and_then(|meta| meta.title.as_deref())
                    .map(|title| format!(" \"{title}\""))
                    .unwrap_or_default();
                format!(
                    "[{class}] {}/{} {}{title}",
                    cursor + 1,
                    buffer.len(),
                    image.url
                )
            }
            None => format!(
                "[{class}] no more images for {term:?} ({} seen)",
                buffer.len()
            ),
        },
    };

    if view.classifying {
        line.push_str(" (saving)");
    }
    if view.prefetching {
        line.push_str(" (loading more)");
    }
    line
}
