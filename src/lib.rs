//! Facade crate: one entry point over the analysis pipeline.
//!
//! The heavy lifting lives in the workspace crates; this crate re-exports
//! the public surface and adds the end-to-end driver the CLI and embedders
//! share: JSON declaration graph in, records plus diagnostics out.

pub use wrapcheck_analyzer::{
    analyze, AnalysisOutput, Analyzer, CallableKind, CallableRecord, ClassInfo, ClassRecord,
    DtorState, EnumRecord, Ownership, ReasonCode, Record, SpecialMember,
};
pub use wrapcheck_binder::{Binder, ResolveError};
pub use wrapcheck_common::diagnostics::{Diagnostic, DiagnosticKind, Severity};
pub use wrapcheck_graph::{load_graph, DeclGraph};

pub mod tracing_config;

use anyhow::{Context, Result};

/// Parse a JSON declaration graph and run the full analysis over it.
///
/// Fatal graph inconsistencies come back as errors; everything else is a
/// diagnostic on the output.
pub fn analyze_json(json: &str) -> Result<AnalysisOutput> {
    let graph = load_graph(json).context("failed to load the declaration graph")?;
    let output = analyze(&graph).context("analysis aborted on a fatal inconsistency")?;
    Ok(output)
}
