//! Side-channel collaborators a run executes against.
//!
//! The engine core never talks to the browser, the session layer or the URL
//! bar directly; it sees four narrow traits, bundled into a [`RunEnv`]:
//!
//! - [`SessionIdentity`]: who is running the flow (`@USER`/`@USERNAME`)
//! - [`UrlParams`]: query parameters for dynamic key resolution
//! - [`Prompter`]: the blocking alert/confirm surface
//! - [`Navigator`]: the jump-node navigation side effect
//!
//! Prompts are modeled as a suspension point, not a blocking call: the
//! [`ChannelPrompter`] sends a [`PromptRequest`] down a flume channel and
//! awaits the reply, so the walker's one-node-at-a-time ordering is preserved
//! while the host UI takes as long as it needs. Headless and test runs use
//! the [`AutoPrompter`] instead.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::design::OpenMode;

// ============================================================================
// Identity & URL parameters
// ============================================================================

/// Source of the current session identity.
pub trait SessionIdentity: Send + Sync {
    fn current_user(&self) -> Option<String>;
}

/// No session: `@USER` resolves to null.
#[derive(Clone, Copy, Debug, Default)]
pub struct Anonymous;

impl SessionIdentity for Anonymous {
    fn current_user(&self) -> Option<String> {
        None
    }
}

/// Fixed identity, for tests and single-user embeddings.
#[derive(Clone, Debug)]
pub struct StaticIdentity(pub String);

impl SessionIdentity for StaticIdentity {
    fn current_user(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Source of the page's URL/query parameters.
pub trait UrlParams: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
}

/// No parameters available (background triggers).
#[derive(Clone, Copy, Debug, Default)]
pub struct NoParams;

impl UrlParams for NoParams {
    fn get(&self, _name: &str) -> Option<String> {
        None
    }
}

/// Fixed parameter map.
#[derive(Clone, Debug, Default)]
pub struct FixedParams {
    params: rustc_hash::FxHashMap<String, String>,
}

impl FixedParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }
}

impl UrlParams for FixedParams {
    fn get(&self, name: &str) -> Option<String> {
        self.params.get(name).cloned()
    }
}

// ============================================================================
// Prompter
// ============================================================================

/// What kind of dialog a prompt request asks the host to show.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromptKind {
    Message,
    Confirm,
}

/// A pending user prompt handed to the host UI.
///
/// The run suspends until [`respond`](Self::respond) is called (any reply
/// unblocks a message; `true`/`false` decides a confirm) or the request is
/// dropped, which reads as a rejection.
#[derive(Debug)]
pub struct PromptRequest {
    pub message: String,
    pub kind: PromptKind,
    reply: flume::Sender<bool>,
}

impl PromptRequest {
    pub fn respond(self, accept: bool) {
        let _ = self.reply.send(accept);
    }
}

/// The blocking alert/confirm surface.
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Show a message and wait for acknowledgement.
    async fn alert(&self, message: &str);

    /// Show an accept/reject dialog; returns the user's choice.
    async fn confirm(&self, message: &str) -> bool;
}

/// Prompter that answers immediately without user interaction.
#[derive(Clone, Copy, Debug)]
pub struct AutoPrompter {
    pub accept: bool,
}

impl Default for AutoPrompter {
    fn default() -> Self {
        Self { accept: true }
    }
}

impl AutoPrompter {
    #[must_use]
    pub fn rejecting() -> Self {
        Self { accept: false }
    }
}

#[async_trait]
impl Prompter for AutoPrompter {
    async fn alert(&self, message: &str) {
        tracing::debug!(prompt = message, "alert auto-acknowledged");
    }

    async fn confirm(&self, message: &str) -> bool {
        tracing::debug!(prompt = message, accept = self.accept, "confirm auto-answered");
        self.accept
    }
}

/// Prompter that forwards requests to a host UI over a channel and suspends
/// the run until the host replies.
#[derive(Clone)]
pub struct ChannelPrompter {
    requests: flume::Sender<PromptRequest>,
}

impl ChannelPrompter {
    /// Create the prompter and the receiver the host UI drains.
    #[must_use]
    pub fn new() -> (Self, flume::Receiver<PromptRequest>) {
        let (tx, rx) = flume::unbounded();
        (Self { requests: tx }, rx)
    }

    async fn ask(&self, message: &str, kind: PromptKind) -> Option<bool> {
        let (reply_tx, reply_rx) = flume::bounded(1);
        let request = PromptRequest {
            message: message.to_string(),
            kind,
            reply: reply_tx,
        };
        if self.requests.send(request).is_err() {
            tracing::warn!(prompt = message, "prompt channel closed; no host UI attached");
            return None;
        }
        reply_rx.recv_async().await.ok()
    }
}

#[async_trait]
impl Prompter for ChannelPrompter {
    async fn alert(&self, message: &str) {
        let _ = self.ask(message, PromptKind::Message).await;
    }

    async fn confirm(&self, message: &str) -> bool {
        // A dropped request or closed channel reads as a rejection.
        self.ask(message, PromptKind::Confirm).await.unwrap_or(false)
    }
}

// ============================================================================
// Navigator
// ============================================================================

/// A navigation the jump executor asks the host to perform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigationRequest {
    pub url: String,
    pub mode: OpenMode,
}

/// Sink for jump-node navigations. Fire-and-forget: the engine does not wait
/// for the navigation to complete.
pub trait Navigator: Send + Sync {
    fn navigate(&self, request: NavigationRequest);
}

/// Discards navigations (headless runs).
#[derive(Clone, Copy, Debug, Default)]
pub struct NullNavigator;

impl Navigator for NullNavigator {
    fn navigate(&self, request: NavigationRequest) {
        tracing::debug!(url = %request.url, mode = ?request.mode, "navigation discarded");
    }
}

/// Records navigations for assertions.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    seen: Mutex<Vec<NavigationRequest>>,
}

impl RecordingNavigator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn requests(&self) -> Vec<NavigationRequest> {
        self.seen.lock().expect("navigator lock poisoned").clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, request: NavigationRequest) {
        self.seen
            .lock()
            .expect("navigator lock poisoned")
            .push(request);
    }
}

// ============================================================================
// Bundle
// ============================================================================

/// The collaborators one run executes against.
#[derive(Clone)]
pub struct RunEnv {
    pub identity: Arc<dyn SessionIdentity>,
    pub params: Arc<dyn UrlParams>,
    pub prompter: Arc<dyn Prompter>,
    pub navigator: Arc<dyn Navigator>,
}

impl Default for RunEnv {
    fn default() -> Self {
        Self {
            identity: Arc::new(Anonymous),
            params: Arc::new(NoParams),
            prompter: Arc::new(AutoPrompter::default()),
            navigator: Arc::new(NullNavigator),
        }
    }
}

impl RunEnv {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_identity(mut self, identity: impl SessionIdentity + 'static) -> Self {
        self.identity = Arc::new(identity);
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: impl UrlParams + 'static) -> Self {
        self.params = Arc::new(params);
        self
    }

    #[must_use]
    pub fn with_prompter(mut self, prompter: impl Prompter + 'static) -> Self {
        self.prompter = Arc::new(prompter);
        self
    }

    #[must_use]
    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }
}
