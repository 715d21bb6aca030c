//! # FormFlow: Flow Execution Engine
//!
//! FormFlow interprets user-authored, node-and-edge workflow graphs (*flow
//! designs*) against a record-oriented data store (*forms* of *records*).
//! It is the run-time half of a low-code form platform: the visual editor
//! produces a [`design::Design`], external triggers start runs, and this
//! crate walks the graph one node at a time: branching, reading and
//! writing records, computing derived values, prompting the user and
//! navigating pages.
//!
//! ## Core Concepts
//!
//! - **Design**: the immutable graph of nodes, edges and per-kind configs
//! - **Variables**: run-scoped, dynamically-typed values flowing between nodes
//! - **Node executors**: one interpreter per node kind (read, write, branch,
//!   exist-check, calculate, aggregate, alert, jump)
//! - **Record store**: the async seam to the persistence adapter
//! - **Collaborators**: session identity, URL parameters, prompts, navigation
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use formflow::design::{
//!     CalcOperation, CalculateConfig, Design, Edge, Node, NodeConfig, OutputBinding, Term, VarRef,
//! };
//! use formflow::repository::InMemoryDesignRepository;
//! use formflow::runner::FlowEngine;
//! use formflow::store::InMemoryRecordStore;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), formflow::runner::RunnerError> {
//! // A two-node flow: start, then double the trigger payload and add ten.
//! let design = Design::new(
//!     vec![
//!         Node::new("start", NodeConfig::Start),
//!         Node::new(
//!             "calc",
//!             NodeConfig::Calculate(CalculateConfig {
//!                 operation: Some(CalcOperation::Addition {
//!                     constant: 10.0,
//!                     terms: vec![Term {
//!                         coefficient: 2.0,
//!                         source: Some(VarRef::new("$INPUT")),
//!                     }],
//!                 }),
//!                 output: Some(OutputBinding::new("result")),
//!             }),
//!         ),
//!     ],
//!     vec![Edge::new("start", "calc")],
//! );
//!
//! let engine = FlowEngine::new(
//!     Arc::new(InMemoryRecordStore::new()),
//!     Arc::new(InMemoryDesignRepository::new().with_design("demo", design)),
//! );
//! let report = engine.run_flow("demo", None, Some(json!(5))).await?;
//! assert_eq!(report.variables.value("result"), Some(&json!(20)));
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Policy
//!
//! The engine is deliberately fail-soft toward the designs it runs: a
//! half-edited node degrades to a conservative default (false conditions,
//! empty reads, skipped writes) with a logged warning. Only resolution-fatal
//! conditions (a dangling node reference, a record-store I/O failure, the
//! step limit) abort a run; see [`runner::RunnerError`].
//!
//! ## Module Guide
//!
//! - [`design`] - Graph data model and per-kind node configuration
//! - [`value`] - Dynamic values, coercions and comparison operators
//! - [`variables`] - The per-run variable store and path resolution
//! - [`resolver`] - System tokens, operands and message templates
//! - [`expr`] - Boolean expressions for expression-mode branches
//! - [`nodes`] - The node executors
//! - [`runner`] - The graph walker and [`runner::FlowEngine`]
//! - [`store`] - The record store contract and in-memory implementation
//! - [`repository`] - The design repository contract
//! - [`env`] - Side-channel collaborators (identity, prompts, navigation)
//! - [`telemetry`] - Tracing subscriber bootstrap for hosts

pub mod design;
pub mod env;
pub mod expr;
pub mod nodes;
pub mod repository;
pub mod resolver;
pub mod runner;
pub mod store;
pub mod telemetry;
pub mod value;
pub mod variables;
