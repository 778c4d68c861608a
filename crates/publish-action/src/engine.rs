//! The redirect decision engine behind the intercepted publish action.
//!
//! One [`PublishAndCreateRedirect`] exists per document action. Each publish
//! attempt is one cycle through this state machine:
//!
//! ```text
//! Idle ──(path changed)──► AwaitingConfirmation ──confirm──► CreatingRedirect ──► Publishing ──► Idle
//!   │                              │    ▲                          │
//!   │                              │    └──────(write failed)──────┘
//!   │                              ├──publish without redirect──► Publishing ──► Idle
//!   │                              └──cancel──► Idle
//!   └──(no change / untracked / first publish / no draft)──► Publishing ──► Idle
//! ```
//!
//! The decision travels inside the state, so there is no way to be awaiting
//! confirmation without one. Record creation is always acknowledged before
//! publish is executed; a failed write never publishes.

use std::sync::Arc;
use std::time::Duration;

use redirects::{
    effective_redirect_schema, CycleId, DocumentReference, DocumentSnapshot, NotificationSink,
    PublishError, PublishExecutor, RecordId, RedirectConfig, RedirectDecision,
    RedirectKind, RedirectRecord, RedirectRecordWriter, ResolutionError, RetryPolicy, Timestamp,
    UrlPath, WriteError,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::surface::{ConfirmationPrompt, ConfirmationSurface, UserDecision};

// ---------------------------------------------------------------------------
// Ports bundle
// ---------------------------------------------------------------------------

/// The host capabilities one publish action needs.
#[derive(Clone)]
pub struct ActionPorts {
    /// Persists redirect records.
    pub writer: Arc<dyn RedirectRecordWriter>,
    /// Publishes the document's draft.
    pub publisher: Arc<dyn PublishExecutor>,
    /// Shows toasts. Optional; without it no toast is pushed.
    pub notifier: Option<Arc<dyn NotificationSink>>,
}

impl ActionPorts {
    /// Bundles the required ports.
    pub fn new(writer: Arc<dyn RedirectRecordWriter>, publisher: Arc<dyn PublishExecutor>) -> Self {
        Self {
            writer,
            publisher,
            notifier: None,
        }
    }

    /// Adds a notification sink.
    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = Some(notifier);
        self
    }
}

/// Source of the current time, injectable for tests.
pub type Clock = Arc<dyn Fn() -> Timestamp + Send + Sync>;

// ---------------------------------------------------------------------------
// State and outcomes
// ---------------------------------------------------------------------------

/// Where the engine is in the current cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineState {
    /// No publish attempt in progress.
    Idle,
    /// Waiting for the editor to answer the confirmation prompt.
    AwaitingConfirmation {
        /// Cycle this decision belongs to.
        cycle: CycleId,
        /// The pending decision.
        decision: RedirectDecision,
        /// What the prompt shows.
        prompt: ConfirmationPrompt,
    },
    /// Waiting for the store to acknowledge the redirect record.
    CreatingRedirect {
        /// Cycle this write belongs to.
        cycle: CycleId,
        /// The decision being committed.
        decision: RedirectDecision,
    },
    /// Waiting for the publish to finish.
    Publishing {
        /// Cycle this publish belongs to.
        cycle: CycleId,
    },
}

impl EngineState {
    /// Short state name for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            EngineState::Idle => "idle",
            EngineState::AwaitingConfirmation { .. } => "awaiting_confirmation",
            EngineState::CreatingRedirect { .. } => "creating_redirect",
            EngineState::Publishing { .. } => "publishing",
        }
    }
}

/// Read-only view of the dialog, derived from [`EngineState`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DialogState<'a> {
    /// Whether the confirmation dialog is open.
    pub open: bool,
    /// The decision the dialog is about, present iff `open`.
    pub decision: Option<&'a RedirectDecision>,
}

/// Why a publish went ahead without asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectPublishReason {
    /// The request carried no draft. Should not happen; publish anyway.
    MissingDraft,
    /// The document has never been published.
    FirstPublish,
    /// The document type is not redirect-tracked.
    UntrackedType,
    /// The path did not change.
    PathUnchanged,
    /// One of the two paths could not be computed, so there is nothing to
    /// redirect from or to.
    PathUnresolved,
}

/// Result of a step of the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Published without interaction.
    Published(DirectPublishReason),
    /// The path changes; waiting for a [`UserDecision`].
    AwaitingConfirmation(RedirectDecision),
    /// The redirect record was created, then the document was published.
    PublishedWithRedirect {
        /// Id of the created record.
        record_id: RecordId,
        /// The created record.
        record: RedirectRecord,
    },
    /// The editor declined the redirect; the document was published.
    PublishedWithoutRedirect,
    /// The editor cancelled; nothing was written or published.
    Cancelled,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures of an engine step.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A publish request arrived while a confirmation is pending.
    #[error("a redirect confirmation is already pending for this document")]
    ConfirmationPending,

    /// The operation is not allowed in the current state.
    #[error("cannot {operation} while {state}")]
    InvalidTransition {
        /// The rejected operation.
        operation: &'static str,
        /// State the engine was in.
        state: &'static str,
    },

    /// A path resolver failed. Nothing was written or published.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// The redirect record was not created and the document was not
    /// published. After a prompt the decision stays pending and can be
    /// confirmed again; with the dialog suppressed the engine returns to idle.
    #[error("redirect was not created: {0}")]
    Write(#[source] WriteError),

    /// Publishing failed; no redirect record was created in this cycle.
    #[error("publish failed: {0}")]
    Publish(#[source] PublishError),

    /// The redirect record was created but publishing failed. The record
    /// points at a path that is not live and must be reconciled by hand.
    #[error("redirect {record_id} from {url} was created but publish failed: {source}")]
    OrphanedRedirect {
        /// Id of the created record.
        record_id: RecordId,
        /// Source path of the created record.
        url: UrlPath,
        /// The publish failure.
        #[source]
        source: PublishError,
    },
}

impl EngineError {
    /// Whether re-invoking the failed operation may succeed.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            EngineError::Write(e) => e.retry_policy(),
            EngineError::Publish(e) | EngineError::OrphanedRedirect { source: e, .. } => {
                e.retry_policy()
            }
            EngineError::ConfirmationPending
            | EngineError::InvalidTransition { .. }
            | EngineError::Resolution(_) => RetryPolicy::NonRetryable,
        }
    }
}

// ---------------------------------------------------------------------------
// Host-facing descriptor
// ---------------------------------------------------------------------------

/// What the host renders for the publish action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDescriptor {
    /// Button label.
    pub label: &'static str,
    /// Whether the button is disabled.
    pub disabled: bool,
    /// Whether the confirmation dialog is open.
    pub dialog_open: bool,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Publish action that offers a redirect when the document's path changes.
pub struct PublishAndCreateRedirect {
    document: DocumentReference,
    config: Arc<RedirectConfig>,
    ports: ActionPorts,
    surface: Arc<dyn ConfirmationSurface>,
    clock: Clock,
    state: EngineState,
}

impl PublishAndCreateRedirect {
    /// Creates the action for `document`.
    pub fn new(
        document: DocumentReference,
        config: Arc<RedirectConfig>,
        ports: ActionPorts,
        surface: Arc<dyn ConfirmationSurface>,
    ) -> Self {
        Self {
            document,
            config,
            ports,
            surface,
            clock: Arc::new(Timestamp::now),
            state: EngineState::Idle,
        }
    }

    /// Replaces the clock used for the document age shown in the prompt.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// The document this action publishes.
    pub fn document(&self) -> &DocumentReference {
        &self.document
    }

    /// Current state.
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Dialog view derived from the current state.
    pub fn dialog_state(&self) -> DialogState<'_> {
        match &self.state {
            EngineState::AwaitingConfirmation { decision, .. } => DialogState {
                open: true,
                decision: Some(decision),
            },
            _ => DialogState {
                open: false,
                decision: None,
            },
        }
    }

    /// The action as the host should render it.
    pub fn descriptor(&self, has_draft: bool) -> ActionDescriptor {
        let busy = matches!(
            self.state,
            EngineState::CreatingRedirect { .. } | EngineState::Publishing { .. }
        );
        ActionDescriptor {
            label: if busy { "Publishing…" } else { "Publish" },
            disabled: !has_draft || busy,
            dialog_open: self.dialog_state().open,
        }
    }

    /// Handles a publish request for the document.
    ///
    /// Publishes immediately when there is nothing to redirect; otherwise
    /// enters [`EngineState::AwaitingConfirmation`] (or, with
    /// `suppressDialog`, creates the redirect with the default kind and
    /// publishes).
    ///
    /// # Errors
    ///
    /// - [`EngineError::ConfirmationPending`] if a confirmation is already open.
    /// - [`EngineError::Resolution`] if a path resolver fails.
    /// - [`EngineError::Write`] / [`EngineError::Publish`] /
    ///   [`EngineError::OrphanedRedirect`] from the side effects performed.
    #[instrument(skip_all, fields(document = %self.document.id, doc_type = %self.document.doc_type))]
    pub async fn evaluate_publish_request(
        &mut self,
        draft: Option<&DocumentSnapshot>,
        published: Option<&DocumentSnapshot>,
    ) -> Result<Outcome, EngineError> {
        if !matches!(self.state, EngineState::Idle) {
            return Err(match self.state {
                EngineState::AwaitingConfirmation { .. } => EngineError::ConfirmationPending,
                _ => EngineError::InvalidTransition {
                    operation: "evaluate a publish request",
                    state: self.state.name(),
                },
            });
        }

        let cycle = CycleId::new_random();

        let Some(draft) = draft else {
            warn!(%cycle, "Publish requested without a draft; publishing anyway");
            return self.publish_directly(cycle, DirectPublishReason::MissingDraft).await;
        };
        let Some(published) = published else {
            return self.publish_directly(cycle, DirectPublishReason::FirstPublish).await;
        };
        if !self.config.resolvers().is_tracked(&draft.doc_type) {
            return self.publish_directly(cycle, DirectPublishReason::UntrackedType).await;
        }
        if draft.id.published() != published.id.published() {
            warn!(
                draft = %draft.id,
                published = %published.id,
                "Draft and published snapshots belong to different documents"
            );
        }

        let resolvers = self.config.resolvers();
        let old_path = resolvers.resolve_path(published)?;
        let new_path = resolvers.resolve_path(draft)?;
        debug!(%cycle, old_path = ?old_path, new_path = ?new_path, "Resolved paths");

        let (old_path, new_path) = match (old_path, new_path) {
            (old, new) if old == new => {
                return self.publish_directly(cycle, DirectPublishReason::PathUnchanged).await;
            }
            (Some(old), Some(new)) => (old, new),
            _ => {
                return self.publish_directly(cycle, DirectPublishReason::PathUnresolved).await;
            }
        };

        let title = draft
            .title(self.config.document_title_key())
            .map(str::to_string);
        let Some(decision) = RedirectDecision::between(
            old_path,
            new_path,
            self.config.default_redirect_kind(),
            draft.reference(),
        ) else {
            return self.publish_directly(cycle, DirectPublishReason::PathUnchanged).await;
        };
        let decision = decision.with_destination_title(title);

        if self.config.suppress_dialog() {
            self.transition(EngineState::CreatingRedirect {
                cycle,
                decision: decision.clone(),
            });
            let kind = self.config.default_redirect_kind();
            return match self.commit(cycle, &decision, kind, EngineState::Idle).await {
                Err(EngineError::Write(e)) => {
                    // No prompt to retry from; the editor re-invokes publish.
                    self.transition(EngineState::Idle);
                    Err(EngineError::Write(e))
                }
                other => other,
            };
        }

        let age = time_since_created(Some(published), (self.clock)());
        let prompt =
            ConfirmationPrompt::for_decision(&decision, age, self.config.hide_redirect_type());
        self.surface.show(&prompt);
        self.transition(EngineState::AwaitingConfirmation {
            cycle,
            decision: decision.clone(),
            prompt,
        });
        Ok(Outcome::AwaitingConfirmation(decision))
    }

    /// Applies the editor's answer to the open prompt.
    ///
    /// # Errors
    ///
    /// See [`confirm_and_publish`](Self::confirm_and_publish),
    /// [`publish_without_redirect`](Self::publish_without_redirect) and
    /// [`cancel`](Self::cancel).
    pub async fn resolve(&mut self, decision: UserDecision) -> Result<Outcome, EngineError> {
        match decision {
            UserDecision::Confirm(kind) => self.confirm_and_publish(kind).await,
            UserDecision::PublishWithoutRedirect => self.publish_without_redirect().await,
            UserDecision::Cancel => self.cancel(),
        }
    }

    /// Creates the redirect record for the pending decision, then publishes.
    ///
    /// When the kind selector is hidden, the configured default kind is used
    /// whatever `kind` says.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidTransition`] unless awaiting confirmation.
    /// - [`EngineError::Write`] if the record was not created; the engine
    ///   stays in [`EngineState::AwaitingConfirmation`] with the same
    ///   decision and the prompt shows the error.
    /// - [`EngineError::OrphanedRedirect`] if the record was created but the
    ///   publish failed.
    #[instrument(skip_all, fields(document = %self.document.id, kind = %kind))]
    pub async fn confirm_and_publish(&mut self, kind: RedirectKind) -> Result<Outcome, EngineError> {
        let EngineState::AwaitingConfirmation {
            cycle,
            decision,
            prompt,
        } = &self.state
        else {
            return Err(self.reject("confirm a redirect"));
        };
        let (cycle, decision, prompt) = (*cycle, decision.clone(), prompt.clone());

        let kind = if self.config.hide_redirect_type() {
            self.config.default_redirect_kind()
        } else {
            kind
        };

        self.transition(EngineState::CreatingRedirect {
            cycle,
            decision: decision.clone(),
        });
        let pending = EngineState::AwaitingConfirmation {
            cycle,
            decision: decision.clone(),
            prompt: prompt.clone(),
        };
        match self.commit(cycle, &decision, kind, pending).await {
            Err(EngineError::Write(e)) => {
                let prompt = ConfirmationPrompt {
                    error: Some(e.to_string()),
                    redirect_kind: kind,
                    ..prompt
                };
                self.surface.show(&prompt);
                self.transition(EngineState::AwaitingConfirmation {
                    cycle,
                    decision,
                    prompt,
                });
                Err(EngineError::Write(e))
            }
            other => other,
        }
    }

    /// Publishes without creating a redirect.
    ///
    /// Allowed when idle (nothing to redirect) or while awaiting confirmation
    /// (the editor declined).
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidTransition`] while a write or publish is in flight.
    /// - [`EngineError::Publish`] if the publish failed.
    #[instrument(skip_all, fields(document = %self.document.id))]
    pub async fn publish_without_redirect(&mut self) -> Result<Outcome, EngineError> {
        let cycle = match &self.state {
            EngineState::Idle => CycleId::new_random(),
            EngineState::AwaitingConfirmation { cycle, .. } => {
                self.surface.close();
                *cycle
            }
            _ => return Err(self.reject("publish without a redirect")),
        };
        self.publish(cycle).await?;
        info!(%cycle, "Published without redirect");
        Ok(Outcome::PublishedWithoutRedirect)
    }

    /// Drops the pending decision without writing or publishing.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidTransition`] unless awaiting confirmation.
    pub fn cancel(&mut self) -> Result<Outcome, EngineError> {
        let EngineState::AwaitingConfirmation { cycle, .. } = &self.state else {
            return Err(self.reject("cancel"));
        };
        let cycle = *cycle;
        self.surface.close();
        self.transition(EngineState::Idle);
        info!(%cycle, document = %self.document.id, "Publish cancelled");
        Ok(Outcome::Cancelled)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Writes the record, notifies, publishes. Expects to be called in
    /// [`EngineState::CreatingRedirect`]; `fallback` is restored if the
    /// returned future is dropped while the write is in flight.
    async fn commit(
        &mut self,
        cycle: CycleId,
        decision: &RedirectDecision,
        kind: RedirectKind,
        fallback: EngineState,
    ) -> Result<Outcome, EngineError> {
        let record = RedirectRecord::for_decision(
            decision,
            kind,
            self.config.redirect_schema_name().clone(),
        );

        let valid = effective_redirect_schema(&self.config).validate_record(&record);
        let written = match valid {
            Ok(()) => {
                let writer = Arc::clone(&self.ports.writer);
                let in_flight = InFlight::write(&mut self.state, fallback);
                let written = writer.create(&record).await;
                in_flight.finish();
                written
            }
            Err(e) => Err(WriteError::Invalid(e)),
        };
        let record_id = match written {
            Ok(id) => id,
            Err(e) => {
                error!(%cycle, url = %record.url, error = %e, "Redirect record was not created");
                return Err(EngineError::Write(e));
            }
        };
        info!(%cycle, record_id = %record_id, url = %record.url, kind = %kind, "Redirect record created");

        if let (Some(notifier), Some(toast)) = (&self.ports.notifier, self.config.toast()) {
            notifier.push(toast);
        }

        self.surface.close();
        match self.publish(cycle).await {
            Ok(()) => {
                info!(%cycle, record_id = %record_id, "Published with redirect");
                Ok(Outcome::PublishedWithRedirect { record_id, record })
            }
            Err(EngineError::Publish(source)) => {
                error!(
                    %cycle,
                    orphaned_redirect = %record_id,
                    url = %record.url,
                    error = %source,
                    "Publish failed after redirect record was created"
                );
                Err(EngineError::OrphanedRedirect {
                    record_id,
                    url: record.url,
                    source,
                })
            }
            Err(other) => Err(other),
        }
    }

    async fn publish_directly(
        &mut self,
        cycle: CycleId,
        reason: DirectPublishReason,
    ) -> Result<Outcome, EngineError> {
        self.publish(cycle).await?;
        debug!(%cycle, ?reason, "Published without interception");
        Ok(Outcome::Published(reason))
    }

    /// Executes the publish and signals completion exactly once, leaving the
    /// engine idle whatever the result, including when the future is dropped.
    async fn publish(&mut self, cycle: CycleId) -> Result<(), EngineError> {
        self.transition(EngineState::Publishing { cycle });
        let publisher = Arc::clone(&self.ports.publisher);
        let in_flight = InFlight::publish(&mut self.state, Arc::clone(&publisher));
        let result = publisher.execute().await;
        in_flight.finish();
        publisher.complete();
        self.transition(EngineState::Idle);
        result.map_err(|e| {
            error!(%cycle, error = %e, "Publish failed");
            EngineError::Publish(e)
        })
    }

    fn reject(&self, operation: &'static str) -> EngineError {
        EngineError::InvalidTransition {
            operation,
            state: self.state.name(),
        }
    }

    fn transition(&mut self, next: EngineState) {
        let from = self.state.name();
        let to = next.name();
        if self.config.debug() {
            info!(document = %self.document.id, from, to, "Publish action transition");
        } else {
            debug!(document = %self.document.id, from, to, "Publish action transition");
        }
        self.state = next;
    }
}

/// Holds the engine state while a write or publish is awaited. If the step's
/// future is dropped first, the fallback state is restored on drop.
struct InFlight<'a> {
    state: &'a mut EngineState,
    fallback: Option<EngineState>,
    /// Signalled as complete when an interrupted publish is abandoned.
    publisher: Option<Arc<dyn PublishExecutor>>,
}

impl<'a> InFlight<'a> {
    fn write(state: &'a mut EngineState, fallback: EngineState) -> Self {
        Self {
            state,
            fallback: Some(fallback),
            publisher: None,
        }
    }

    fn publish(state: &'a mut EngineState, publisher: Arc<dyn PublishExecutor>) -> Self {
        Self {
            state,
            fallback: Some(EngineState::Idle),
            publisher: Some(publisher),
        }
    }

    fn finish(mut self) {
        self.fallback = None;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let Some(fallback) = self.fallback.take() else {
            return;
        };
        warn!(
            interrupted = self.state.name(),
            restored = fallback.name(),
            "Publish action step dropped before it finished"
        );
        if let Some(publisher) = &self.publisher {
            publisher.complete();
        }
        *self.state = fallback;
    }
}

impl std::fmt::Debug for PublishAndCreateRedirect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishAndCreateRedirect")
            .field("document", &self.document)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Age of `published` at `now`, as shown in the prompt.
pub fn time_since_created(published: Option<&DocumentSnapshot>, now: Timestamp) -> Option<Duration> {
    published
        .and_then(|p| p.created_at)
        .map(|created| created.elapsed_until(now))
}
