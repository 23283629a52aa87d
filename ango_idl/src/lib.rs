//! Parser and intermediate representation for `.ango` service definitions.
//!
//! A definition names a service, lists the procedures each side of a
//! connection implements, and declares named types:
//!
//! ```text
//! name chat
//! type names []string
//! server oneway notify(text string)
//! server add(a int, b int)(c int)
//! client oneway message(from string, text string)
//! ```
//!
//! ```
//! let service = ango_idl::parse_str("name chat\nserver add(a int, b int)(c int)").unwrap();
//! assert_eq!("chat", service.name.as_str());
//! assert_eq!(2, service.server_procedures["add"].args.len());
//! ```

mod error;
mod interface;
mod line_reader;
mod parser;
pub mod types;

pub use error::{ParseError, ParseErrorKind};
pub use interface::{
    Category, Direction, Identifier, Param, Procedure, Service, Source, Type, TypeKind,
};
pub use line_reader::LineReader;
pub use parser::{parse, parse_file, parse_str};
pub use types::Builtin;
