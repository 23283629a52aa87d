//! Data structures representing a parsed service definition.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::types::{self, Builtin};

/// Represents the entire service definition file.
/// Procedures and types are kept in maps from names to definitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub name: Identifier,
    /// Procedures implemented by the server and invoked by the client.
    pub server_procedures: HashMap<Identifier, Procedure>,
    /// Procedures implemented by the client and invoked by the server.
    pub client_procedures: HashMap<Identifier, Procedure>,
    pub types: HashMap<Identifier, Arc<Type>>,
}

impl Service {
    pub(crate) fn new(name: Identifier) -> Self {
        Service {
            name,
            server_procedures: HashMap::new(),
            client_procedures: HashMap::new(),
            types: HashMap::new(),
        }
    }

    /// The procedure table for the side that implements them.
    pub fn procedures(&self, direction: Direction) -> &HashMap<Identifier, Procedure> {
        match direction {
            Direction::Server => &self.server_procedures,
            Direction::Client => &self.client_procedures,
        }
    }

    pub(crate) fn procedures_mut(
        &mut self,
        direction: Direction,
    ) -> &mut HashMap<Identifier, Procedure> {
        match direction {
            Direction::Server => &mut self.server_procedures,
            Direction::Client => &mut self.client_procedures,
        }
    }

    /// Finds a builtin or a previously declared type by name.
    pub fn lookup_type(&self, name: &str) -> Option<Arc<Type>> {
        types::resolve(&self.types, name)
    }
}

/// Which side of the connection implements a procedure.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Direction {
    Server,
    Client,
}

impl Direction {
    /// The other side of the connection.
    pub fn opposite(self) -> Self {
        match self {
            Direction::Server => Direction::Client,
            Direction::Client => Direction::Server,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Server => f.write_str("server"),
            Direction::Client => f.write_str("client"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Procedure {
    pub name: Identifier,
    pub direction: Direction,
    /// Oneway procedures have no return values and never get a response.
    pub oneway: bool,
    pub args: Vec<Param>,
    pub rets: Vec<Param>,
    pub source: Source,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: Identifier,
    pub ty: Arc<Type>,
}

/// Where in the definition file something was declared.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Source {
    /// 1-based line number.
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Type {
    pub name: Identifier,
    pub kind: TypeKind,
}

impl Type {
    pub fn category(&self) -> Category {
        match self.kind {
            TypeKind::Builtin(_) => Category::Builtin,
            TypeKind::Simple(_) => Category::Simple,
            TypeKind::Slice(_) => Category::Slice,
            TypeKind::Map { .. } => Category::Map,
            TypeKind::Struct(_) => Category::Struct,
        }
    }
}

/// The category-specific payload of a [Type].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    Builtin(Builtin),
    /// `type myInt int`
    Simple(Arc<Type>),
    /// `type mySlice []int`
    Slice(Arc<Type>),
    /// `type myMap map[string]int`
    Map { key: Arc<Type>, value: Arc<Type> },
    /// Ordered fields. Never produced by the parser, which rejects struct
    /// declarations.
    Struct(Vec<(Identifier, Arc<Type>)>),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    Builtin,
    Simple,
    Slice,
    Map,
    Struct,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(pub String);

impl Identifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        Identifier(s.to_owned())
    }
}

impl Borrow<str> for Identifier {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
