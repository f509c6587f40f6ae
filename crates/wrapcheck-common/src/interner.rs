//! String interning for identifier deduplication.
//!
//! Every identifier in the declaration graph is interned once and referred to
//! by a compact `Atom`. The interner is append-only and safe for concurrent
//! read/insert: a race on the same string may take the slow path twice, but
//! both threads observe the same `Atom`.

use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::sync::RwLock;

/// Interned string handle.
///
/// `Atom` equality is identity equality: two atoms compare equal iff they
/// were interned from the same string in the same `Interner`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Atom(pub u32);

/// Append-only concurrent string interner.
#[derive(Debug)]
pub struct Interner {
    map: DashMap<Arc<str>, Atom>,
    strings: RwLock<Vec<Arc<str>>>,
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

impl Interner {
    pub fn new() -> Self {
        Self {
            map: DashMap::new(),
            strings: RwLock::new(Vec::new()),
        }
    }

    /// Intern a string, returning its `Atom`. Idempotent.
    pub fn intern(&self, text: &str) -> Atom {
        if let Some(existing) = self.map.get(text) {
            return *existing;
        }
        let key: Arc<str> = Arc::from(text);
        // The entry holds the shard lock, so the id allocation below cannot
        // race with another insert of the same string.
        match self.map.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(occupied) => *occupied.get(),
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                let mut strings = self.strings.write().expect("interner lock poisoned");
                let atom = Atom(strings.len() as u32);
                strings.push(key);
                vacant.insert(atom);
                atom
            }
        }
    }

    /// Resolve an `Atom` back to its string.
    pub fn resolve(&self, atom: Atom) -> Arc<str> {
        let strings = self.strings.read().expect("interner lock poisoned");
        Arc::clone(&strings[atom.0 as usize])
    }

    /// Look up an already-interned string without inserting.
    pub fn get(&self, text: &str) -> Option<Atom> {
        self.map.get(text).map(|entry| *entry)
    }

    pub fn len(&self) -> usize {
        self.strings.read().expect("interner lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "../tests/interner_tests.rs"]
mod tests;
