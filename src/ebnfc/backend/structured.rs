//! The portable structured-record backend (spec.md §4.5): a declaration
//! header and an implementation body suitable for inclusion in a compiled
//! systems project. The exact textual rendering is explicitly out of scope
//! (spec.md §1); this follows the data model closely in a C-compatible
//! record layout, which is the form the spec's own vocabulary ("header",
//! "declaration", "implementation") most directly suggests.

use crate::ebnfc::assign::AssignContext;
use crate::ebnfc::backend::{build_table, enum_declaration, header_guard, NodeClass, TermType};
use crate::ebnfc::tree::NodeRef;
use itertools::Itertools;
use std::fmt::Write as _;

const BANNER: &str = "/* Auto-generated by ebnfc. Do not edit by hand. */\n";

pub struct Emitted {
    pub header: String,
    pub implementation: String,
}

pub fn emit(stem: &str, root: &NodeRef, ctx: &AssignContext) -> Emitted {
    let header_filename = format!("{stem}.h");
    let guard = header_guard(stem, &header_filename);
    let enums = enum_declaration(ctx);
    let table = build_table(root, ctx);

    let mut header = String::new();
    header.push_str(BANNER);
    let _ = writeln!(header, "#ifndef {guard}");
    let _ = writeln!(header, "#define {guard}\n");
    header.push_str("enum node_class { TERMINAL, PRODUCTION, MANDATORY, ALTERNATIVE, OPTIONAL, OPTIONAL_REPETITIVE };\n");
    header.push_str("enum term_type { UNDEF, STRING, REGEX, BINARY };\n\n");
    header.push_str("enum node_type {\n");
    for (i, name) in enums.iter().enumerate() {
        let _ = writeln!(header, "    {name} = {i},");
    }
    header.push_str("};\n\n");
    header.push_str("struct table_row {\n");
    header.push_str("    enum node_class node_class;\n");
    header.push_str("    enum node_type node_type;\n");
    header.push_str("    enum term_type term_type;\n");
    header.push_str("    const char *text;\n");
    header.push_str("    int num_branches;\n");
    header.push_str("    int branches_ix;\n");
    header.push_str("};\n\n");
    let _ = writeln!(header, "extern const int branches[{}];", ctx.branches.len());
    let _ = writeln!(header, "extern const struct table_row parsing_table[{}];", table.len());
    header.push('\n');
    for row in &table {
        let _ = writeln!(header, "extern const struct table_row *const {};", row.export_ident);
    }
    let _ = writeln!(header, "\n#endif /* {guard} */");

    let mut implementation = String::new();
    implementation.push_str(BANNER);
    let _ = writeln!(implementation, "#include \"{header_filename}\"\n");
    implementation.push_str("const int branches[] = {\n");
    for chunk in ctx.branches.chunks(8) {
        let line = chunk.iter().join(", ");
        let _ = writeln!(implementation, "    {line},");
    }
    implementation.push_str("};\n\n");

    implementation.push_str("const struct table_row parsing_table[] = {\n");
    for row in &table {
        let text = match (&row.text, &row.binary) {
            (Some(t), None) => format!("\"{}\"", t.replace('\\', "\\\\").replace('"', "\\\"")),
            (None, Some(bytes)) => {
                let escaped: String = bytes.iter().map(|b| format!("\\x{b:02x}")).collect();
                format!("\"{escaped}\"")
            }
            (None, None) => "NULL".to_string(),
            (Some(_), Some(_)) => unreachable!("a node is either textual or binary, never both"),
        };
        let _ = writeln!(
            implementation,
            "    [{}] = {{ {}, {}, {}, {}, {}, {} }}, /* {} */",
            row.id,
            node_class_symbol(row.node_class),
            row.node_type_name,
            term_type_symbol(row.term_type),
            text,
            row.num_branches,
            row.branches_ix,
            row.export_ident,
        );
    }
    implementation.push_str("};\n\n");

    for row in &table {
        let _ = writeln!(
            implementation,
            "const struct table_row *const {} = &parsing_table[{}];",
            row.export_ident, row.id
        );
    }

    Emitted { header, implementation }
}

fn node_class_symbol(class: NodeClass) -> &'static str {
    class.symbol()
}

fn term_type_symbol(term: TermType) -> &'static str {
    term.symbol()
}
