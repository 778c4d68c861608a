//! Text and controls of the default confirmation dialog.

use std::time::Duration;

use redirects::RedirectKind;
use serde::Serialize;

use crate::surface::{ConfirmationPrompt, UserDecision};

const ONE_DAY: Duration = Duration::from_secs(86_400);

/// Dialog header.
pub const DIALOG_HEADER: &str = "Create a redirect?";

/// Shown for documents younger than a day.
pub const YOUNG_DOCUMENT_HEADING: &str =
    "This document is under a day old and probably doesn’t need a redirect.";

/// Shown under the age heading for older documents.
pub const OLD_DOCUMENT_ADVICE: &str = "If you think the document may have been indexed by search \
     engines, or has been linked by an outside website, you should probably create a redirect.";

/// Visual weight of a button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    /// Destructive or aborting action.
    Critical,
    /// Neutral action.
    Default,
    /// The suggested action.
    Primary,
}

/// What a dialog button does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogAction {
    /// Maps to [`UserDecision::Cancel`].
    Cancel,
    /// Maps to [`UserDecision::PublishWithoutRedirect`].
    PublishWithoutRedirect,
    /// Maps to [`UserDecision::Confirm`] with the selected kind.
    CreateRedirectAndPublish,
}

impl DialogAction {
    /// Turns a button press into a decision, using `selected` as the kind.
    pub fn decision(self, selected: RedirectKind) -> UserDecision {
        match self {
            DialogAction::Cancel => UserDecision::Cancel,
            DialogAction::PublishWithoutRedirect => UserDecision::PublishWithoutRedirect,
            DialogAction::CreateRedirectAndPublish => UserDecision::Confirm(selected),
        }
    }
}

/// A dialog button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DialogButton {
    /// Button label.
    pub label: &'static str,
    /// Action performed.
    pub action: DialogAction,
    /// Visual weight.
    pub tone: Tone,
}

/// Render-ready content of the default dialog.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogModel {
    /// Dialog header.
    pub header: &'static str,
    /// Age heading; absent when the age is unknown.
    pub age_heading: Option<String>,
    /// Advice under the age heading.
    pub age_advice: Option<&'static str>,
    /// Read-only "redirect from…" value.
    pub redirect_from: String,
    /// Read-only "to…" value.
    pub redirect_to: String,
    /// Kinds offered by the selector; empty when the selector is hidden.
    pub kind_options: Vec<RedirectKind>,
    /// Preselected kind.
    pub selected_kind: RedirectKind,
    /// Inline error from the last attempt.
    pub error: Option<String>,
    /// Buttons, left to right.
    pub buttons: Vec<DialogButton>,
}

impl DialogModel {
    /// Derives the dialog content for `prompt`.
    pub fn from_prompt(prompt: &ConfirmationPrompt) -> Self {
        let (age_heading, age_advice) = age_text(prompt.time_since_created);
        Self {
            header: DIALOG_HEADER,
            age_heading,
            age_advice,
            redirect_from: prompt.redirect_path.to_string(),
            redirect_to: prompt.destination_path.to_string(),
            kind_options: if prompt.hide_kind_selector {
                Vec::new()
            } else {
                RedirectKind::ALL.to_vec()
            },
            selected_kind: prompt.redirect_kind,
            error: prompt.error.clone(),
            buttons: vec![
                DialogButton {
                    label: "cancel",
                    action: DialogAction::Cancel,
                    tone: Tone::Critical,
                },
                DialogButton {
                    label: "just Publish",
                    action: DialogAction::PublishWithoutRedirect,
                    tone: Tone::Default,
                },
                DialogButton {
                    label: "Publish and create Redirect",
                    action: DialogAction::CreateRedirectAndPublish,
                    tone: Tone::Primary,
                },
            ],
        }
    }
}

fn age_text(age: Option<Duration>) -> (Option<String>, Option<&'static str>) {
    match age {
        None => (None, None),
        Some(age) if age.is_zero() => (None, None),
        Some(age) if age < ONE_DAY => (Some(YOUNG_DOCUMENT_HEADING.to_string()), None),
        Some(age) => {
            let days = age.as_millis().div_ceil(ONE_DAY.as_millis());
            let unit = if days == 1 { "day" } else { "days" };
            (
                Some(format!("This document is {days} {unit} old.")),
                Some(OLD_DOCUMENT_ADVICE),
            )
        }
    }
}
