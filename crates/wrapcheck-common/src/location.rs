//! Source locations as delivered by the external parser.

use crate::interner::Atom;
use serde::Serialize;

/// File + line of a declaration. The file name is interned; rendering to
/// "file:line" goes through the graph's interner.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct SourceLoc {
    pub file: Atom,
    pub line: u32,
}

impl SourceLoc {
    pub const fn new(file: Atom, line: u32) -> Self {
        Self { file, line }
    }
}
