//! Terminal rendering of the confirmation dialog, and toasts as log events.

use std::time::Duration;

use publish_action::{ConfirmationPrompt, ConfirmationSurface, DialogModel, UserDecision};
use redirects::{NotificationSink, RedirectKind, Toast};
use tracing::info;

/// Prints the confirmation dialog to stderr.
#[derive(Debug, Default)]
pub struct TerminalSurface;

impl ConfirmationSurface for TerminalSurface {
    fn show(&self, prompt: &ConfirmationPrompt) {
        eprint!("{}", render(&DialogModel::from_prompt(prompt)));
    }

    fn close(&self) {}
}

/// Text of the dialog, including the input hint.
pub fn render(model: &DialogModel) -> String {
    let mut out = format!("\n{}\n", model.header);
    if let Some(heading) = &model.age_heading {
        out.push_str(&format!("{heading}\n"));
    }
    if let Some(advice) = model.age_advice {
        out.push_str(&format!("{advice}\n"));
    }
    out.push_str(&format!("  redirect from: {}\n", model.redirect_from));
    out.push_str(&format!("            to: {}\n", model.redirect_to));
    if let Some(error) = &model.error {
        out.push_str(&format!("  error: {error}\n"));
    }

    let create = if model.kind_options.is_empty() {
        "c".to_string()
    } else {
        let kinds: Vec<_> = model
            .kind_options
            .iter()
            .map(|k| {
                let name = k.as_str().to_ascii_lowercase();
                if *k == model.selected_kind {
                    format!("[{name}]")
                } else {
                    name
                }
            })
            .collect();
        format!("c {}", kinds.join("|"))
    };
    out.push_str(&format!(
        "{create} = publish and create redirect, p = just publish, x = cancel\n> "
    ));
    out
}

/// Parses one line of input. `selected` is used when `c` names no kind.
///
/// Returns `None` for unrecognised input.
pub fn parse_decision(line: &str, selected: RedirectKind) -> Option<UserDecision> {
    let mut words = line.split_whitespace();
    let command = words.next()?.to_ascii_lowercase();
    let argument = words.next();
    if words.next().is_some() {
        return None;
    }
    match (command.as_str(), argument) {
        ("c" | "create", None) => Some(UserDecision::Confirm(selected)),
        ("c" | "create", Some(kind)) => kind.parse().ok().map(UserDecision::Confirm),
        ("p" | "publish", None) => Some(UserDecision::PublishWithoutRedirect),
        ("x" | "cancel", None) => Some(UserDecision::Cancel),
        _ => None,
    }
}

/// Emits toasts as `info` events.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn push(&self, toast: &Toast) {
        info!(duration_ms = millis(toast.duration), "{}", toast.title);
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
