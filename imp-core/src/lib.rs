//! Front end for the IMP language.
//!
//! The pipeline is roughly:
//!
//!   source .imp
//!     -> lexer        (tokens, pulled on demand)
//!     -> parser       (AST with spans, error nodes on bad input)
//!     -> name_resolve (identifiers bound to declarations)
//!     -> emit         (driven through an `IrBuilder`)
//!
//! Higher-level tools (CLI, editors, etc.) should depend on this crate
//! rather than reimplementing the pipeline.

// ---------------------------------------------------------------------
// Error handling and diagnostics
// ---------------------------------------------------------------------

pub mod span;
pub mod symbol;
pub mod diagnostic;
pub mod error;

// ---------------------------------------------------------------------
// Front-end: lexing and parsing
// ---------------------------------------------------------------------

pub mod token;
pub mod lexer;
pub mod ast;
pub mod parser;

// ---------------------------------------------------------------------
// Semantic layers: name resolution, printing, lowering
// ---------------------------------------------------------------------

pub mod name_resolve;
pub mod print;
pub mod emit;

// ---------------------------------------------------------------------
// Compiler orchestration
// ---------------------------------------------------------------------

pub mod compiler;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use compiler::{CompilationArtifact, Compiler, compile};
pub use diagnostic::{Diagnostic, DiagnosticCounts, Severity};
pub use error::CoreError;
