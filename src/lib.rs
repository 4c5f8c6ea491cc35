//! Crate root: wires together the compilation pipeline.
//!
//! Source text flows through four stages, each finishing before the next
//! starts:
//! - `tokenizer` performs lexical analysis and produces a flat token stream.
//! - `parser` owns all syntactic knowledge and builds the [`ast::Program`].
//! - `sema` resolves names, checks types and annotates expressions.
//! - `codegen` lowers the checked tree into stack machine instructions.
//!
//! A syntax error stops the run at once; semantic errors are collected and
//! reported together, and no code is generated when there are any.

pub mod ast;
pub mod codegen;
pub mod error;
pub mod parser;
pub mod sema;
pub mod tokenizer;
pub mod ty;

use tracing::{info, warn};

pub use error::{CompileError, CompileResult, SemanticError};

/// Output options for code generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
  /// Start the output with a comment naming the program.
  pub emit_header: bool,
}

/// Compile a source string into stack machine instructions.
pub fn compile(source: &str) -> CompileResult<String> {
  compile_with(source, &Options::default())
}

/// Like [`compile`], with output options.
pub fn compile_with(source: &str, options: &Options) -> CompileResult<String> {
  let tokens = tokenizer::tokenize(source);
  info!(tokens = tokens.len(), "lexical analysis finished");

  let mut program = parser::parse(tokens)?;
  info!(
    program = %program.name,
    declarations = program.declarations.len(),
    "parsing finished"
  );

  let errors = sema::analyze(&mut program);
  if !errors.is_empty() {
    for err in &errors {
      warn!(line = err.line(), "{err}");
    }
    return error::SemanticSnafu { errors }.fail();
  }

  Ok(codegen::generate_with(&program, options))
}
