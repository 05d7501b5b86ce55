//! A compiler for a small subset of Pascal, emitting LLVM textual IR.
//!
//! The pipeline is lexer -> parser -> [`builder`] -> [`semantic`] -> [`codegen`],
//! with [`ast::xml`] as an alternate, semantics-free sink for the AST.
pub mod ast;
pub mod builder;
pub mod codegen;
pub mod lexer;
pub mod parser;
pub mod semantic;
pub mod span;
pub mod symbol;
