//! SQL Parser
//!
//! A hand-written recursive descent parser with Pratt expression parsing,
//! covering the ClickHouse SELECT dialect used in view and dictionary
//! definitions.

mod error;
#[allow(clippy::module_inception)]
mod parser;
mod pratt;

pub use error::ParseError;
pub use parser::Parser;
