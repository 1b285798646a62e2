//! The driver's pipeline (spec.md §2, §4.6): reader → parser →
//! canonicalisation → identity/layout assigner → selected backend. `src/
//! main.rs` owns argument parsing and file IO; this module owns the order
//! of passes and the points where it's worth logging progress.

use crate::ebnfc::assign::{self, AssignContext};
use crate::ebnfc::backend::{asm, structured};
use crate::ebnfc::canon;
use crate::ebnfc::error::{CompileError, Result};
use crate::ebnfc::parser::Parser;
use crate::ebnfc::reader::ByteReader;
use crate::ebnfc::tree::NodeRef;
use std::io::Read;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Structured,
    Asm,
}

pub struct CompileOutput {
    pub declaration_filename: String,
    pub declaration: String,
    pub implementation_filename: String,
    pub implementation: String,
}

/// Runs the reader and parser only, producing the canonicalised tree — the
/// shared first half of both `--tree` and the full compile.
pub fn build_tree(input: impl Read) -> Result<NodeRef> {
    let mut reader = ByteReader::from_read(input).map_err(CompileError::io)?;
    tracing::debug!("reading grammar from input");
    let root = Parser::parse(&mut reader)?;
    tracing::debug!("parse complete");
    canon::canonicalise(&root);
    tracing::debug!("canonicalisation complete");
    Ok(root)
}

/// Runs the full pipeline and renders the selected backend's pair of
/// artifacts, named from `stem` per spec.md §4.6.
pub fn compile(input: impl Read, stem: &str, backend: Backend) -> Result<CompileOutput> {
    let root = build_tree(input)?;
    let ctx = assign_tree(&root)?;
    tracing::debug!(nodes = ctx.total_exportable_nodes(), "identity & layout assignment complete");
    Ok(render(stem, &root, &ctx, backend))
}

fn assign_tree(root: &NodeRef) -> Result<AssignContext> {
    assign::assign(root)
}

fn render(stem: &str, root: &NodeRef, ctx: &AssignContext, backend: Backend) -> CompileOutput {
    match backend {
        Backend::Structured => {
            tracing::debug!("emitting structured-record backend");
            let emitted = structured::emit(stem, root, ctx);
            CompileOutput {
                declaration_filename: format!("{stem}.h"),
                declaration: emitted.header,
                implementation_filename: format!("{stem}.c"),
                implementation: emitted.implementation,
            }
        }
        Backend::Asm => {
            tracing::debug!("emitting assembly backend");
            let emitted = asm::emit(stem, root, ctx);
            CompileOutput {
                declaration_filename: format!("{stem}.inc"),
                declaration: emitted.header,
                implementation_filename: format!("{stem}.nasm"),
                implementation: emitted.implementation,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_minimal_grammar_selects_structured_backend_by_default() {
        let out = compile("a := 'x' .".as_bytes(), "grammar", Backend::Structured).unwrap();
        assert_eq!(out.declaration_filename, "grammar.h");
        assert_eq!(out.implementation_filename, "grammar.c");
        assert!(out.declaration.contains("NT_A"));
    }

    #[test]
    fn compile_selects_asm_backend_on_request() {
        let out = compile("a := 'x' .".as_bytes(), "grammar", Backend::Asm).unwrap();
        assert_eq!(out.declaration_filename, "grammar.inc");
        assert_eq!(out.implementation_filename, "grammar.nasm");
    }

    #[test]
    fn build_tree_surfaces_parse_errors() {
        assert!(build_tree("a := .".as_bytes()).is_err());
    }

    #[test]
    fn compile_surfaces_unresolved_reference_errors() {
        assert!(compile("a := b .".as_bytes(), "grammar", Backend::Structured).is_err());
    }
}
