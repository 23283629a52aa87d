//! The builtin type table and type-name resolution.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::interface::{Identifier, Type, TypeKind};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Builtin {
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    String,
    Bool,
}

impl Builtin {
    pub const ALL: [Builtin; 12] = [
        Builtin::Int,
        Builtin::Int8,
        Builtin::Int16,
        Builtin::Int32,
        Builtin::Int64,
        Builtin::Uint,
        Builtin::Uint8,
        Builtin::Uint16,
        Builtin::Uint32,
        Builtin::Uint64,
        Builtin::String,
        Builtin::Bool,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Int => "int",
            Builtin::Int8 => "int8",
            Builtin::Int16 => "int16",
            Builtin::Int32 => "int32",
            Builtin::Int64 => "int64",
            Builtin::Uint => "uint",
            Builtin::Uint8 => "uint8",
            Builtin::Uint16 => "uint16",
            Builtin::Uint32 => "uint32",
            Builtin::Uint64 => "uint64",
            Builtin::String => "string",
            Builtin::Bool => "bool",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }

    /// Whether this builtin may be used for a procedure argument or return
    /// value. `bool` is only usable inside type declarations.
    pub fn is_param_type(self) -> bool {
        self != Builtin::Bool
    }

    /// Inclusive integer range, or None for non-integer builtins.
    /// `int` and `uint` are 64 bits wide.
    pub fn int_range(self) -> Option<(i128, i128)> {
        let range = match self {
            Builtin::Int | Builtin::Int64 => (i64::MIN as i128, i64::MAX as i128),
            Builtin::Int8 => (i8::MIN as i128, i8::MAX as i128),
            Builtin::Int16 => (i16::MIN as i128, i16::MAX as i128),
            Builtin::Int32 => (i32::MIN as i128, i32::MAX as i128),
            Builtin::Uint | Builtin::Uint64 => (0, u64::MAX as i128),
            Builtin::Uint8 => (0, u8::MAX as i128),
            Builtin::Uint16 => (0, u16::MAX as i128),
            Builtin::Uint32 => (0, u32::MAX as i128),
            Builtin::String | Builtin::Bool => return None,
        };
        Some(range)
    }
}

static BUILTIN_TYPES: Lazy<HashMap<&'static str, Arc<Type>>> = Lazy::new(|| {
    Builtin::ALL
        .into_iter()
        .map(|b| {
            let ty = Type {
                name: Identifier::from(b.name()),
                kind: TypeKind::Builtin(b),
            };
            (b.name(), Arc::new(ty))
        })
        .collect()
});

/// The shared [Type] for a builtin.
pub fn builtin_type(builtin: Builtin) -> Arc<Type> {
    // Every builtin is inserted when the table is built.
    Arc::clone(&BUILTIN_TYPES[builtin.name()])
}

pub fn lookup_builtin(name: &str) -> Option<Arc<Type>> {
    BUILTIN_TYPES.get(name).cloned()
}

/// Resolves a type name against the builtins first, then against the types
/// declared so far. Resolution never looks ahead, so forward references
/// are unresolved.
pub fn resolve(declared: &HashMap<Identifier, Arc<Type>>, name: &str) -> Option<Arc<Type>> {
    lookup_builtin(name).or_else(|| declared.get(name).cloned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_names_round_trip() {
        for b in Builtin::ALL {
            assert_eq!(Some(b), Builtin::from_name(b.name()));
            assert_eq!(b.name(), builtin_type(b).name.as_str());
        }
        assert_eq!(None, Builtin::from_name("float64"));
    }

    #[test]
    fn builtins_shadow_declared_types() {
        let mut declared = HashMap::new();
        let fake_int = Arc::new(Type {
            name: Identifier::from("int"),
            kind: TypeKind::Simple(builtin_type(Builtin::String)),
        });
        declared.insert(Identifier::from("int"), fake_int);
        let resolved = resolve(&declared, "int").unwrap();
        assert_eq!(TypeKind::Builtin(Builtin::Int), resolved.kind);
    }

    #[test]
    fn resolves_declared_types() {
        let mut declared = HashMap::new();
        assert!(resolve(&declared, "names").is_none());
        let names = Arc::new(Type {
            name: Identifier::from("names"),
            kind: TypeKind::Slice(builtin_type(Builtin::String)),
        });
        declared.insert(Identifier::from("names"), Arc::clone(&names));
        assert_eq!(Some(names), resolve(&declared, "names"));
    }

    #[test]
    fn bool_is_not_a_param_type() {
        assert!(!Builtin::Bool.is_param_type());
        assert!(Builtin::Uint16.is_param_type());
        assert_eq!(Some((0, 255)), Builtin::Uint8.int_range());
        assert_eq!(None, Builtin::String.int_range());
    }
}
