//! `ereport-sql`: expands dashboard variables and time macros in stored panel SQL.
//!
//! The raw SQL is tokenized once ([`lexer::tokenize`]) and every placeholder is
//! substituted in a single pass, so substituted values are never re-scanned and
//! variables whose names share a prefix cannot clobber each other.

pub mod expand;
pub mod lexer;

pub use expand::{expand, expand_detailed, join_values, Expansion, Unresolved};
pub use lexer::{tokenize, Macro, Token, VariableFormat};
