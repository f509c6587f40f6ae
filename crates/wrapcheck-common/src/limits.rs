//! Centralized limits and thresholds.
//!
//! Analysis terminates by construction on a finite graph; these bounds only
//! guard the recursive procedures that could otherwise loop on adversarial
//! input (self-referential typedefs, recursive template instantiation).

/// Maximum typedef chain length before resolution reports a cycle.
pub const MAX_TYPEDEF_CHAIN: usize = 64;

/// Maximum template instantiation nesting depth. Recursive instantiation
/// beyond this depth is reported as a deduction failure instead of looping.
pub const MAX_INSTANTIATION_DEPTH: usize = 64;

/// Maximum aggregate-initializer nesting depth during default-argument
/// folding.
pub const MAX_FOLD_DEPTH: usize = 32;

/// Maximum inheritance DAG depth walked by the inheritance resolver.
pub const MAX_INHERITANCE_DEPTH: usize = 128;
