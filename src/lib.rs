//! Implicit-return transform for a Python-subset runtime.
//!
//! [`transform`] takes a live function whose body ends in a bare expression
//! and produces an equivalent function that returns that expression.
//! [`rewrite_source`] applies the same rewrite to module source ahead of time.

pub mod ast;
pub mod builtins;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod preprocess;
pub mod runtime;
pub mod source;
pub mod token;
pub mod transform;
pub mod unparse;

pub use preprocess::{RewriteOptions, RewrittenSource, rewrite_source};
pub use transform::{TransformError, transform};
