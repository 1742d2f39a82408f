//! End-to-end tests for the pipeline orchestrator.
//!
//! Every test drives `Orchestrator::execute_pipeline` with in-memory stage
//! executors and collaborators, then inspects the response envelope and the
//! run registry.
//!
//! # Test Structure
//!
//! - `helpers/` -- mock stages, collaborators and orchestrator factories
//! - `scenarios/` -- one file per behaviour (happy path, scan failure,
//!   degraded stages, timeout notification, registry properties)
//!
//! # Running
//!
//! ```bash
//! cargo test -p vigil-pipeline --test e2e
//! ```

mod helpers;
mod scenarios;
