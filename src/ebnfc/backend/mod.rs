//! Shared schema for both backends (spec.md §4.5): a closed node-class and
//! terminal-type enumeration, the binary-field encoding bit-flags, and the
//! per-node table row both emitters render from.

pub mod asm;
pub mod structured;

use crate::ebnfc::assign::AssignContext;
use crate::ebnfc::tree::{NodeKind, NodeRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeClass {
    Terminal,
    Production,
    Mandatory,
    Alternative,
    Optional,
    OptionalRepetitive,
}

impl NodeClass {
    pub fn symbol(&self) -> &'static str {
        match self {
            NodeClass::Terminal => "TERMINAL",
            NodeClass::Production => "PRODUCTION",
            NodeClass::Mandatory => "MANDATORY",
            NodeClass::Alternative => "ALTERNATIVE",
            NodeClass::Optional => "OPTIONAL",
            NodeClass::OptionalRepetitive => "OPTIONAL_REPETITIVE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermType {
    Undef,
    String,
    Regex,
    Binary,
}

impl TermType {
    pub fn symbol(&self) -> &'static str {
        match self {
            TermType::Undef => "UNDEF",
            TermType::String => "STRING",
            TermType::Regex => "REGEX",
            TermType::Binary => "BINARY",
        }
    }
}

pub const FLAG_DATA: u8 = 0x01;
pub const FLAG_BYTE: u8 = 0x02;
pub const FLAG_WORD: u8 = 0x03;
pub const FLAG_DWORD: u8 = 0x04;
pub const FLAG_QWORD: u8 = 0x05;
pub const FLAG_PARAM: u8 = 0x10;
pub const FLAG_WRITE: u8 = 0x20;

pub fn node_class(kind: NodeKind) -> NodeClass {
    match kind {
        NodeKind::StrLiteral
        | NodeKind::RegEx
        | NodeKind::BinData
        | NodeKind::BinField
        | NodeKind::BinFieldCount
        | NodeKind::BinFieldTimes => NodeClass::Terminal,
        NodeKind::Production => NodeClass::Production,
        NodeKind::AndExpr => NodeClass::Mandatory,
        NodeKind::OrExpr => NodeClass::Alternative,
        NodeKind::BrackExpr => NodeClass::Optional,
        NodeKind::BraceExpr => NodeClass::OptionalRepetitive,
        NodeKind::Eos | NodeKind::Identifier | NodeKind::ProdList => unreachable!("not exportable"),
    }
}

pub fn term_type(kind: NodeKind) -> TermType {
    match kind {
        NodeKind::StrLiteral => TermType::String,
        NodeKind::RegEx => TermType::Regex,
        NodeKind::BinData | NodeKind::BinField | NodeKind::BinFieldCount | NodeKind::BinFieldTimes => {
            TermType::Binary
        }
        _ => TermType::Undef,
    }
}

fn width_flag(width: &str) -> u8 {
    match width {
        "BYTE" => FLAG_BYTE,
        "WORD" => FLAG_WORD,
        "DWORD" => FLAG_DWORD,
        "QWORD" => FLAG_QWORD,
        other => unreachable!("not a field width: {other}"),
    }
}

/// Encodes a terminal's binary payload per spec.md §4.5. `BIN_DATA` is
/// `DATA | len | bytes`; `BIN_FIELD*` is a single width-and-flags byte.
pub fn encode_binary(node: &NodeRef) -> Vec<u8> {
    let n = node.borrow();
    match n.kind {
        NodeKind::BinData => {
            let digits = n.text.as_deref().expect("BIN_DATA always has text");
            let bytes: Vec<u8> = digits
                .as_bytes()
                .chunks(2)
                .map(|pair| {
                    let hi = (pair[0] as char).to_digit(16).unwrap() as u8;
                    let lo = (pair[1] as char).to_digit(16).unwrap() as u8;
                    (hi << 4) | lo
                })
                .collect();
            let mut out = vec![FLAG_DATA, bytes.len() as u8];
            out.extend(bytes);
            out
        }
        NodeKind::BinField | NodeKind::BinFieldCount | NodeKind::BinFieldTimes => {
            let width = n.text.as_deref().expect("BIN_FIELD* always has text");
            let mut flags = width_flag(width);
            if !n.children.is_empty() {
                flags |= FLAG_PARAM;
            }
            if n.kind == NodeKind::BinFieldCount {
                flags |= FLAG_WRITE;
            }
            vec![flags]
        }
        other => unreachable!("not a binary terminal: {other:?}"),
    }
}

/// One fixed-layout record per exportable node, in id order. A node's
/// payload is either `text` (a `STR_LITERAL`/`REG_EX` body, stored as
/// written) or `binary` (a `BIN_DATA`/`BIN_FIELD*` node's raw
/// `encode_binary()` bytes per spec.md §4.5) — never both.
pub struct TableRow {
    pub id: i64,
    pub node_class: NodeClass,
    pub node_type_name: String,
    pub term_type: TermType,
    pub text: Option<String>,
    pub binary: Option<Vec<u8>>,
    pub num_branches: i64,
    pub branches_ix: i64,
    pub export_ident: String,
}

/// Collects every exportable node reachable from `root` into a vector
/// indexed by id, so the table can be emitted in id order.
fn nodes_by_id(root: &NodeRef, ctx: &AssignContext) -> Vec<NodeRef> {
    let mut slots: Vec<Option<NodeRef>> = vec![None; ctx.total_exportable_nodes() as usize];
    collect(root, &mut slots);
    slots.into_iter().map(|slot| slot.expect("dense id assignment")).collect()
}

fn collect(node: &NodeRef, slots: &mut Vec<Option<NodeRef>>) {
    let kind = node.borrow().kind;
    if kind.is_exportable() {
        let id = node.borrow().id as usize;
        slots[id] = Some(node.clone());
    }
    let children = node.borrow().children.clone();
    for child in &children {
        collect(child, slots);
    }
}

pub fn build_table(root: &NodeRef, ctx: &AssignContext) -> Vec<TableRow> {
    nodes_by_id(root, ctx)
        .into_iter()
        .map(|node| {
            let n = node.borrow();
            let kind = n.kind;
            let is_binary = matches!(
                kind,
                NodeKind::BinData | NodeKind::BinField | NodeKind::BinFieldCount | NodeKind::BinFieldTimes
            );
            let (text, binary) = if is_binary {
                (None, Some(encode_binary(&node)))
            } else {
                (n.text.clone(), None)
            };
            TableRow {
                id: n.id,
                node_class: node_class(kind),
                node_type_name: n.node_type_name.clone().expect("assigned by assign::assign"),
                term_type: term_type(kind),
                text,
                binary,
                num_branches: n.children.len() as i64,
                branches_ix: n.branches_ix,
                export_ident: n.export_ident.clone().expect("assigned by assign::assign"),
            }
        })
        .collect()
}

/// Enumerator declaration order: `_NT_GENERIC` (discriminant 0) followed by
/// each distinct `NT_*` name in first-emitted order.
pub fn enum_declaration(ctx: &AssignContext) -> Vec<String> {
    std::iter::once(crate::ebnfc::assign::GENERIC_NODE_TYPE.to_string())
        .chain(ctx.emitted_enum_names.iter().cloned())
        .collect()
}

/// Per spec.md's REDESIGN FLAGS: the header guard is derived from the
/// header filename *and* the stem, so two stems that substitute to the
/// same filename-derived guard don't collide.
pub fn header_guard(stem: &str, header_filename: &str) -> String {
    fn sanitize(s: &str) -> String {
        s.chars()
            .map(|c| match c {
                '.' | '/' | '\\' | ':' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect()
    }
    format!("{}_{}", sanitize(stem), sanitize(header_filename))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_guard_incorporates_stem() {
        assert_eq!(header_guard("foo", "foo.h"), "FOO_FOO_H");
        assert_ne!(header_guard("a", "grammar.h"), header_guard("b", "grammar.h"));
    }

    #[test]
    fn bin_field_count_with_param_encodes_byte_and_write() {
        let node = crate::ebnfc::tree::Node::bin_field(
            NodeKind::BinFieldCount,
            "BYTE",
            Some(crate::ebnfc::tree::Node::identifier("count")),
        );
        assert_eq!(encode_binary(&node), vec![0x32]);
    }

    #[test]
    fn bin_field_times_without_param_has_no_param_flag() {
        let node = crate::ebnfc::tree::Node::bin_field(NodeKind::BinFieldTimes, "WORD", None);
        assert_eq!(encode_binary(&node), vec![FLAG_WORD]);
    }

    #[test]
    fn bin_data_is_length_prefixed() {
        let node = crate::ebnfc::tree::Node::bin_data("1a2b");
        assert_eq!(encode_binary(&node), vec![FLAG_DATA, 2, 0x1a, 0x2b]);
    }
}
