//! The graph walker and run-level API.
//!
//! [`FlowEngine`] bundles the record store, the design repository, the
//! collaborator environment and the runtime configuration; each call to
//! [`run_flow`](FlowEngine::run_flow) or
//! [`run_design`](FlowEngine::run_design) is one independent run with its own
//! freshly created [`VariableStore`]. The walker holds the single current
//! node pointer, awaits the executor for that node, follows the returned id,
//! and stops when an executor returns `None`.
//!
//! Execution is single-threaded and cooperative: at most one node executes
//! at a time, and the only suspension points are record-store calls and the
//! prompt/navigation collaborators. There is no cancellation primitive and
//! no rollback; a caller abandoning a run must not assume issued writes
//! were undone.
//!
//! The reference behavior this engine reproduces has no iteration bound; a
//! cyclic design whose branch never flips would walk forever. The walker
//! therefore enforces a configurable step limit and fails the run with
//! [`RunnerError::StepLimitExceeded`] when it is hit.

use miette::Diagnostic;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

use crate::design::Design;
use crate::env::RunEnv;
use crate::nodes::{self, RunContext};
use crate::repository::{DesignRepository, RepositoryError};
use crate::store::{RecordStore, StoreError};
use crate::variables::VariableStore;

/// Runtime limits for a run.
#[derive(Clone, Copy, Debug)]
pub struct RuntimeConfig {
    /// Upper bound on executed nodes per run.
    pub max_steps: u64,
}

impl RuntimeConfig {
    pub const DEFAULT_MAX_STEPS: u64 = 10_000;

    #[must_use]
    pub fn new(max_steps: u64) -> Self {
        Self {
            max_steps: if max_steps == 0 {
                Self::DEFAULT_MAX_STEPS
            } else {
                max_steps
            },
        }
    }

    /// Read overrides from the environment (`FORMFLOW_MAX_STEPS`), falling
    /// back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        std::env::var("FORMFLOW_MAX_STEPS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .map(Self::new)
            .unwrap_or_default()
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_steps: Self::DEFAULT_MAX_STEPS,
        }
    }
}

/// Errors that abort a run.
///
/// Everything here is resolution-fatal; configuration gaps never surface as
/// errors (the executors degrade and log instead). Side effects already
/// issued to the record store remain committed.
#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    #[error("node not found: {node_id}")]
    #[diagnostic(
        code(formflow::runner::node_not_found),
        help("An edge or explicit target references a node missing from the design.")
    )]
    NodeNotFound { node_id: String },

    #[error("design has no start node")]
    #[diagnostic(
        code(formflow::runner::no_start_node),
        help("Pass an explicit start node id or add a start node to the design.")
    )]
    NoStartNode,

    #[error("run exceeded the step limit of {limit}")]
    #[diagnostic(
        code(formflow::runner::step_limit),
        help("The design likely contains a cycle whose branch never flips.")
    )]
    StepLimitExceeded { limit: u64 },

    #[error(transparent)]
    #[diagnostic(code(formflow::runner::store))]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(code(formflow::runner::repository))]
    Repository(#[from] RepositoryError),
}

/// Outcome counts of one batch write node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchWriteReport {
    pub node_id: String,
    pub written: usize,
    pub failed: usize,
}

/// What a completed run leaves behind.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: Uuid,
    /// Number of nodes executed.
    pub steps: u64,
    /// Node ids in execution order.
    pub visited: Vec<String>,
    /// Final variable store contents.
    pub variables: VariableStore,
    /// Per-node outcome counts of batch writes.
    pub batch_writes: Vec<BatchWriteReport>,
}

/// The flow execution engine.
///
/// One engine instance can serve many runs, sequentially or concurrently;
/// runs share nothing but the injected collaborators.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use formflow::design::{Design, Node, NodeConfig};
/// use formflow::repository::InMemoryDesignRepository;
/// use formflow::runner::FlowEngine;
/// use formflow::store::InMemoryRecordStore;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), formflow::runner::RunnerError> {
/// let design = Design::new(vec![Node::new("start", NodeConfig::Start)], vec![]);
/// let engine = FlowEngine::new(
///     Arc::new(InMemoryRecordStore::new()),
///     Arc::new(InMemoryDesignRepository::new().with_design("f1", design)),
/// );
/// let report = engine.run_flow("f1", None, None).await?;
/// assert_eq!(report.visited, vec!["start".to_string()]);
/// # Ok(())
/// # }
/// ```
pub struct FlowEngine {
    store: Arc<dyn RecordStore>,
    designs: Arc<dyn DesignRepository>,
    env: RunEnv,
    config: RuntimeConfig,
}

impl FlowEngine {
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, designs: Arc<dyn DesignRepository>) -> Self {
        Self {
            store,
            designs,
            env: RunEnv::default(),
            config: RuntimeConfig::default(),
        }
    }

    #[must_use]
    pub fn with_env(mut self, env: RunEnv) -> Self {
        self.env = env;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Load a flow's design and run it.
    ///
    /// `start` overrides the design's own start node; `input` is seeded into
    /// the run as `$INPUT`.
    #[instrument(skip(self, input), err)]
    pub async fn run_flow(
        &self,
        flow_id: &str,
        start: Option<&str>,
        input: Option<Value>,
    ) -> Result<RunReport, RunnerError> {
        let design = self.designs.load_design(flow_id).await?;
        self.run_design(&design, start, input).await
    }

    /// Run an already-loaded design.
    #[instrument(skip(self, design, input), err)]
    pub async fn run_design(
        &self,
        design: &Design,
        start: Option<&str>,
        input: Option<Value>,
    ) -> Result<RunReport, RunnerError> {
        let run_id = Uuid::new_v4();
        let start_id = match start {
            Some(id) => id.to_string(),
            None => design
                .start_node()
                .map(|n| n.id.clone())
                .ok_or(RunnerError::NoStartNode)?,
        };

        tracing::info!(run = %run_id, start = %start_id, "flow run started");

        let mut vars = VariableStore::seeded(input);
        let mut batch_reports = Vec::new();
        let mut visited = Vec::new();
        let mut steps: u64 = 0;
        let mut current = Some(start_id);

        while let Some(node_id) = current {
            let node = design
                .node(&node_id)
                .ok_or_else(|| RunnerError::NodeNotFound {
                    node_id: node_id.clone(),
                })?;

            steps += 1;
            if steps > self.config.max_steps {
                tracing::error!(run = %run_id, node = %node_id, limit = self.config.max_steps, "step limit exceeded");
                return Err(RunnerError::StepLimitExceeded {
                    limit: self.config.max_steps,
                });
            }
            visited.push(node_id.clone());
            tracing::debug!(run = %run_id, step = steps, node = %node_id, kind = %node.kind(), "executing node");

            let mut cx = RunContext {
                design,
                vars: &mut vars,
                store: self.store.as_ref(),
                env: &self.env,
                step: steps,
                batch_reports: &mut batch_reports,
            };
            current = nodes::execute(node, &mut cx).await?;
        }

        tracing::info!(run = %run_id, steps, "flow run completed");
        Ok(RunReport {
            run_id,
            steps,
            visited,
            variables: vars,
            batch_writes: batch_reports,
        })
    }
}
