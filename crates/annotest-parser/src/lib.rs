/// Parser for annotated feature files
///
/// Reads the Gherkin-like DSL (`Feature:`, `Scenario:`, step lines and
/// `@key=value` annotations) into a [`Document`].

pub mod ast;
pub mod ast_dump;
pub mod coerce;
pub mod error;
pub mod parser;

pub use ast::*;
pub use coerce::coerce;
pub use error::{CoerceError, ParseError};
pub use parser::parse;
