//! The design repository seam: where persisted flow designs are loaded from.
//!
//! Read-only from the engine's perspective. The persisted format is the
//! repository's concern; [`Design`](crate::design::Design) carries the serde
//! derives for the JSON interchange the editor produces.

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use std::sync::Mutex;
use thiserror::Error;

use crate::design::Design;

#[derive(Debug, Error, Diagnostic)]
pub enum RepositoryError {
    #[error("flow not found: {flow_id}")]
    #[diagnostic(
        code(formflow::repository::flow_not_found),
        help("Check that the flow id matches a saved design.")
    )]
    FlowNotFound { flow_id: String },

    #[error("design for flow {flow_id} is malformed: {source}")]
    #[diagnostic(code(formflow::repository::malformed))]
    Malformed {
        flow_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("design repository backend error: {message}")]
    #[diagnostic(code(formflow::repository::backend))]
    Backend { message: String },
}

/// Async contract for loading a flow's persisted graph.
#[async_trait]
pub trait DesignRepository: Send + Sync {
    async fn load_design(&self, flow_id: &str) -> Result<Design, RepositoryError>;
}

/// Volatile design repository for tests and embedded use.
#[derive(Default)]
pub struct InMemoryDesignRepository {
    designs: Mutex<FxHashMap<String, Design>>,
}

impl InMemoryDesignRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_design(self, flow_id: impl Into<String>, design: Design) -> Self {
        self.insert(flow_id, design);
        self
    }

    pub fn insert(&self, flow_id: impl Into<String>, design: Design) {
        let mut designs = self.designs.lock().expect("design repository lock poisoned");
        designs.insert(flow_id.into(), design);
    }
}

#[async_trait]
impl DesignRepository for InMemoryDesignRepository {
    async fn load_design(&self, flow_id: &str) -> Result<Design, RepositoryError> {
        let designs = self.designs.lock().expect("design repository lock poisoned");
        designs
            .get(flow_id)
            .cloned()
            .ok_or_else(|| RepositoryError::FlowNotFound {
                flow_id: flow_id.to_string(),
            })
    }
}
