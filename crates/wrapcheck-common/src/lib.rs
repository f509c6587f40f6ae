//! Common types and utilities for the wrapcheck analyzer.
//!
//! This crate provides foundational types used across all wrapcheck crates:
//! - String interning (`Atom`, `Interner`)
//! - Structured diagnostics (`Diagnostic`, `DiagnosticKind`)
//! - Source locations (`SourceLoc`)
//! - Centralized recursion and expansion limits

// String interning for identifier deduplication
pub mod interner;
pub use interner::{Atom, Interner};

// Structured diagnostics for per-declaration failures
pub mod diagnostics;
pub use diagnostics::{Diagnostic, DiagnosticKind, Severity};

// Source location tracking (file + line as delivered by the parser)
pub mod location;
pub use location::SourceLoc;

// Centralized limits and thresholds
pub mod limits;
