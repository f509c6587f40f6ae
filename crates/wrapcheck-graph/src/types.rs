//! Structural type interning.
//!
//! Types are shared by structural identity: two occurrences of `int*`
//! resolve to the same `TypeId`. Qualifiers are part of the interned key,
//! not a separate wrapper, so `const int` and `int` are distinct entries.
//!
//! The table is append-only and safe for concurrent read/insert; interning
//! the same key from two threads yields the same `TypeId`.

use crate::decl::DeclId;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::RwLock;
use wrapcheck_common::interner::Atom;

/// Interned structural type handle.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TypeId(pub u32);

impl TypeId {
    /// Placeholder for a type that failed to resolve.
    pub const ERROR: Self = Self(0);
    pub const VOID: Self = Self(1);
    pub const BOOL: Self = Self(2);
    pub const CHAR: Self = Self(3);
    pub const INT: Self = Self(4);
    pub const UINT: Self = Self(5);
    pub const INT64: Self = Self(6);
    pub const UINT64: Self = Self(7);
    pub const FLOAT: Self = Self(8);
    pub const DOUBLE: Self = Self(9);
    pub const NULLPTR: Self = Self(10);

    pub(crate) const FIRST_INTERNED: u32 = 11;
}

bitflags::bitflags! {
    /// Cv-qualifiers carried on the interned key.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
    pub struct Quals: u8 {
        const CONST = 1 << 0;
        const VOLATILE = 1 << 1;
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BuiltinKind {
    Void,
    Bool,
    Char,
    Int,
    UInt,
    Int64,
    UInt64,
    Float,
    Double,
    NullPtr,
}

impl BuiltinKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Bool => "bool",
            Self::Char => "char",
            Self::Int => "int",
            Self::UInt => "unsigned int",
            Self::Int64 => "int64",
            Self::UInt64 => "uint64",
            Self::Float => "float",
            Self::Double => "double",
            Self::NullPtr => "nullptr_t",
        }
    }
}

/// Structural key for one interned type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeKey {
    /// Resolution failure placeholder.
    Error,
    Builtin {
        kind: BuiltinKind,
        quals: Quals,
    },
    Pointer {
        pointee: TypeId,
        /// Qualifiers on the pointer itself (`int* const`), not the pointee.
        quals: Quals,
    },
    LValueRef {
        referent: TypeId,
    },
    RValueRef {
        referent: TypeId,
    },
    /// A resolved class or struct. The declaration may still be
    /// forward-only; completeness is a property of the declaration.
    Class {
        decl: DeclId,
        quals: Quals,
    },
    Enum {
        decl: DeclId,
        quals: Quals,
    },
    /// A resolved template instantiation, e.g. `ComposedType<int>`.
    Instance {
        template: DeclId,
        args: Vec<TypeId>,
        quals: Quals,
    },
    /// A namespace-qualified reference as written at the use site, before
    /// canonicalization by the binder.
    Named {
        path: Vec<Atom>,
        args: Vec<TypeId>,
        absolute: bool,
        quals: Quals,
    },
    /// Template type parameter placeholder inside a template pattern.
    Param {
        index: u32,
        quals: Quals,
    },
    /// Variadic parameter pack placeholder.
    Pack {
        index: u32,
    },
}

impl TypeKey {
    pub fn quals(&self) -> Quals {
        match self {
            Self::Builtin { quals, .. }
            | Self::Pointer { quals, .. }
            | Self::Class { quals, .. }
            | Self::Enum { quals, .. }
            | Self::Instance { quals, .. }
            | Self::Named { quals, .. }
            | Self::Param { quals, .. } => *quals,
            Self::Error | Self::LValueRef { .. } | Self::RValueRef { .. } | Self::Pack { .. } => {
                Quals::empty()
            }
        }
    }

    pub fn with_quals(mut self, new: Quals) -> Self {
        match &mut self {
            Self::Builtin { quals, .. }
            | Self::Pointer { quals, .. }
            | Self::Class { quals, .. }
            | Self::Enum { quals, .. }
            | Self::Instance { quals, .. }
            | Self::Named { quals, .. }
            | Self::Param { quals, .. } => *quals = new,
            Self::Error | Self::LValueRef { .. } | Self::RValueRef { .. } | Self::Pack { .. } => {}
        }
        self
    }
}

/// Append-only concurrent type table.
#[derive(Debug)]
pub struct TypeTable {
    map: DashMap<TypeKey, TypeId>,
    keys: RwLock<Vec<TypeKey>>,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeTable {
    pub fn new() -> Self {
        let table = Self {
            map: DashMap::new(),
            keys: RwLock::new(Vec::new()),
        };
        // Seed order must match the TypeId constants above.
        let seeded = [
            TypeKey::Error,
            TypeKey::Builtin { kind: BuiltinKind::Void, quals: Quals::empty() },
            TypeKey::Builtin { kind: BuiltinKind::Bool, quals: Quals::empty() },
            TypeKey::Builtin { kind: BuiltinKind::Char, quals: Quals::empty() },
            TypeKey::Builtin { kind: BuiltinKind::Int, quals: Quals::empty() },
            TypeKey::Builtin { kind: BuiltinKind::UInt, quals: Quals::empty() },
            TypeKey::Builtin { kind: BuiltinKind::Int64, quals: Quals::empty() },
            TypeKey::Builtin { kind: BuiltinKind::UInt64, quals: Quals::empty() },
            TypeKey::Builtin { kind: BuiltinKind::Float, quals: Quals::empty() },
            TypeKey::Builtin { kind: BuiltinKind::Double, quals: Quals::empty() },
            TypeKey::Builtin { kind: BuiltinKind::NullPtr, quals: Quals::empty() },
        ];
        for key in seeded {
            table.intern(key);
        }
        debug_assert_eq!(table.len() as u32, TypeId::FIRST_INTERNED);
        table
    }

    /// Intern a structural key, returning its `TypeId`. Idempotent.
    pub fn intern(&self, key: TypeKey) -> TypeId {
        if let Some(existing) = self.map.get(&key) {
            return *existing;
        }
        match self.map.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(occupied) => *occupied.get(),
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                let mut keys = self.keys.write().expect("type table lock poisoned");
                let id = TypeId(keys.len() as u32);
                keys.push(key);
                vacant.insert(id);
                id
            }
        }
    }

    pub fn lookup(&self, id: TypeId) -> TypeKey {
        let keys = self.keys.read().expect("type table lock poisoned");
        keys[id.0 as usize].clone()
    }

    pub fn len(&self) -> usize {
        self.keys.read().expect("type table lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // =========================================================================
    // Structural queries
    // =========================================================================

    pub fn quals(&self, id: TypeId) -> Quals {
        self.lookup(id).quals()
    }

    pub fn is_const(&self, id: TypeId) -> bool {
        self.quals(id).contains(Quals::CONST)
    }

    /// Re-intern with different top-level qualifiers. References are
    /// returned unchanged (qualifiers live on the referent).
    pub fn with_quals(&self, id: TypeId, quals: Quals) -> TypeId {
        let key = self.lookup(id);
        if key.quals() == quals {
            return id;
        }
        match key {
            TypeKey::Error | TypeKey::LValueRef { .. } | TypeKey::RValueRef { .. } | TypeKey::Pack { .. } => id,
            other => self.intern(other.with_quals(quals)),
        }
    }

    pub fn strip_quals(&self, id: TypeId) -> TypeId {
        self.with_quals(id, Quals::empty())
    }

    /// Peel one level of reference, if any.
    pub fn strip_ref(&self, id: TypeId) -> (TypeId, Option<RefKind>) {
        match self.lookup(id) {
            TypeKey::LValueRef { referent } => (referent, Some(RefKind::LValue)),
            TypeKey::RValueRef { referent } => (referent, Some(RefKind::RValue)),
            _ => (id, None),
        }
    }

    pub fn is_reference(&self, id: TypeId) -> bool {
        matches!(
            self.lookup(id),
            TypeKey::LValueRef { .. } | TypeKey::RValueRef { .. }
        )
    }

    pub fn pointee(&self, id: TypeId) -> Option<TypeId> {
        match self.lookup(id) {
            TypeKey::Pointer { pointee, .. } => Some(pointee),
            _ => None,
        }
    }

    /// The class declaration behind a (possibly qualified) class or
    /// instantiation type, ignoring references.
    pub fn class_decl(&self, id: TypeId) -> Option<DeclId> {
        let (inner, _) = self.strip_ref(id);
        match self.lookup(inner) {
            TypeKey::Class { decl, .. } => Some(decl),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RefKind {
    LValue,
    RValue,
}

#[cfg(test)]
#[path = "../tests/types_tests.rs"]
mod tests;
