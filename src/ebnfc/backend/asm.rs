//! The assembly backend (spec.md §4.5): the same logical tables as
//! `structured`, rendered for a 64-bit target in the canonical assembler's
//! fixed-column style — labels left-aligned in a 24-column field,
//! directives starting at column 25 (spec.md §6). Literal text for each
//! terminal is placed under its own `prod_<id>_text` rodata label; table
//! rows reference that label rather than embedding the bytes inline.

use crate::ebnfc::assign::AssignContext;
use crate::ebnfc::backend::{build_table, enum_declaration, header_guard, NodeClass, TermType};
use crate::ebnfc::tree::NodeRef;
use itertools::Itertools;
use std::fmt::Write as _;

const BANNER: &str = "; Auto-generated by ebnfc. Do not edit by hand.\n";
const LABEL_COLUMN: usize = 24;

pub struct Emitted {
    pub header: String,
    pub implementation: String,
}

fn line(label: &str, directive: &str, out: &mut String) {
    let _ = writeln!(out, "{label:<LABEL_COLUMN$}{directive}");
}

pub fn emit(stem: &str, root: &NodeRef, ctx: &AssignContext) -> Emitted {
    let header_filename = format!("{stem}.inc");
    let guard = header_guard(stem, &header_filename);
    let enums = enum_declaration(ctx);
    let table = build_table(root, ctx);

    let mut header = String::new();
    header.push_str(BANNER);
    line("", &format!("%ifndef {guard}"), &mut header);
    line("", &format!("%define {guard}"), &mut header);
    header.push('\n');
    for class in [
        NodeClass::Terminal,
        NodeClass::Production,
        NodeClass::Mandatory,
        NodeClass::Alternative,
        NodeClass::Optional,
        NodeClass::OptionalRepetitive,
    ] {
        line(class.symbol(), &format!("equ {}", class as i32), &mut header);
    }
    header.push('\n');
    for term in [TermType::Undef, TermType::String, TermType::Regex, TermType::Binary] {
        line(term.symbol(), &format!("equ {}", term as i32), &mut header);
    }
    header.push('\n');
    for (i, name) in enums.iter().enumerate() {
        line(name, &format!("equ {i}"), &mut header);
    }
    header.push('\n');
    line("", "extern branches", &mut header);
    line("", "extern parsing_table", &mut header);
    for row in &table {
        line("", &format!("extern {}", row.export_ident), &mut header);
    }
    header.push('\n');
    line("", "%endif", &mut header);

    let mut implementation = String::new();
    implementation.push_str(BANNER);
    line("", &format!("%include \"{header_filename}\""), &mut implementation);
    implementation.push('\n');
    line("", "section .rodata", &mut implementation);
    implementation.push('\n');

    for row in &table {
        if let Some(text) = &row.text {
            let bytes = text.as_bytes().iter().join(", ");
            line(&format!("prod_{}_text:", row.id), &format!("db {bytes}, 0"), &mut implementation);
        } else if let Some(bytes) = &row.binary {
            let rendered = bytes.iter().join(", ");
            line(&format!("prod_{}_text:", row.id), &format!("db {rendered}"), &mut implementation);
        }
    }
    implementation.push('\n');

    line("branches:", &format!("dd {}", ctx.branches.iter().join(", ")), &mut implementation);
    implementation.push('\n');

    line("parsing_table:", "", &mut implementation);
    for row in &table {
        let text_ref = if row.text.is_some() || row.binary.is_some() {
            format!("prod_{}_text", row.id)
        } else {
            "0".to_string()
        };
        let _ = writeln!(implementation, "; row {} ({})", row.id, row.export_ident);
        line(
            "",
            &format!(
                "dd {}, {}, {}, {}, {}, {}",
                row.node_class.symbol(),
                row.node_type_name,
                row.term_type.symbol(),
                text_ref,
                row.num_branches,
                row.branches_ix
            ),
            &mut implementation,
        );
    }
    implementation.push('\n');

    for row in &table {
        line("", &format!("global {}", row.export_ident), &mut implementation);
        line(&format!("{}:", row.export_ident), &format!("equ parsing_table + {} * ROW_SIZE", row.id), &mut implementation);
    }

    Emitted { header, implementation }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ebnfc::assign::assign;
    use crate::ebnfc::canon::canonicalise;
    use crate::ebnfc::parser::Parser;
    use crate::ebnfc::reader::ByteReader;

    fn build(src: &str) -> (NodeRef, AssignContext) {
        let mut reader = ByteReader::from_bytes(src.as_bytes());
        let root = Parser::parse(&mut reader).unwrap();
        canonicalise(&root);
        let ctx = assign(&root).unwrap();
        (root, ctx)
    }

    #[test]
    fn labels_are_left_aligned_in_a_24_column_field() {
        let (root, ctx) = build("a := 'x' .");
        let emitted = emit("grammar", &root, &ctx);
        let text_line = emitted
            .implementation
            .lines()
            .find(|l| l.starts_with("prod_0_text:"))
            .unwrap();
        assert_eq!(&text_line[0..24], &format!("{:<24}", "prod_0_text:"));
        assert_eq!(text_line[24..].trim_start(), "db 120, 0");
    }

    #[test]
    fn header_declares_externs_for_every_export_ident() {
        let (root, ctx) = build("a := 'x' .");
        let emitted = emit("grammar", &root, &ctx);
        assert!(emitted.header.contains("extern production_a"));
        assert!(emitted.header.contains("extern string_terminal_0"));
    }

    #[test]
    fn binary_field_count_emits_the_raw_byte_with_no_trailing_terminator() {
        // BYTE | PARAM | WRITE = 0x32 (decimal 50), not the ASCII codes of "32".
        let (root, ctx) = build("rec := BYTE:count .");
        let emitted = emit("grammar", &root, &ctx);
        let text_line = emitted
            .implementation
            .lines()
            .find(|l| l.starts_with("prod_0_text:"))
            .unwrap();
        assert_eq!(text_line[24..].trim_start(), "db 50");
    }
}
