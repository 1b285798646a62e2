//! The shared syntax tree: a single node type tagged by a closed `NodeKind`,
//! carrying optional text, an ordered child array, and the code-generation
//! annotations (id, branch-table offset, symbolic identifier, node-type
//! enum name) filled in by later passes.
//!
//! Nodes are `Rc<RefCell<Node>>` handles (see SPEC_FULL.md §3): a child slot
//! is a strong reference, and canonicalisation (`crate::ebnfc::canon`)
//! introduces sharing by cloning the `Rc` of a chosen representative into a
//! parent's child slot. `Rc::strong_count` doubles as the abstract model's
//! `refcount` field wherever it's observed directly.

use std::cell::RefCell;
use std::fmt::{self, Display, Formatter};
use std::rc::Rc;

pub type NodeRef = Rc<RefCell<Node>>;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum NodeKind {
    Eos,
    Identifier,
    StrLiteral,
    RegEx,
    BinData,
    BinField,
    BinFieldCount,
    BinFieldTimes,
    AndExpr,
    OrExpr,
    BrackExpr,
    BraceExpr,
    Production,
    ProdList,
}

impl NodeKind {
    /// A node is exportable iff it receives an id and a row in the emitted
    /// parsing table; `Identifier` never does, `Eos` is a sentinel that is
    /// never actually produced post-parse, and `ProdList` is the tree root
    /// wrapper with no table row of its own.
    pub fn is_exportable(&self) -> bool {
        !matches!(self, NodeKind::Eos | NodeKind::Identifier | NodeKind::ProdList)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            NodeKind::StrLiteral
                | NodeKind::RegEx
                | NodeKind::BinData
                | NodeKind::BinField
                | NodeKind::BinFieldCount
                | NodeKind::BinFieldTimes
        )
    }
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeKind::Eos => "EOS",
            NodeKind::Identifier => "IDENTIFIER",
            NodeKind::StrLiteral => "STR_LITERAL",
            NodeKind::RegEx => "REG_EX",
            NodeKind::BinData => "BIN_DATA",
            NodeKind::BinField => "BIN_FIELD",
            NodeKind::BinFieldCount => "BIN_FIELD_COUNT",
            NodeKind::BinFieldTimes => "BIN_FIELD_TIMES",
            NodeKind::AndExpr => "AND_EXPR",
            NodeKind::OrExpr => "OR_EXPR",
            NodeKind::BrackExpr => "BRACK_EXPR",
            NodeKind::BraceExpr => "BRACE_EXPR",
            NodeKind::Production => "PRODUCTION",
            NodeKind::ProdList => "PROD_LIST",
        };
        f.write_str(s)
    }
}

/// A single tree node. Code-generation fields (`id`, `branches_ix`,
/// `export_ident`, `node_type_name`) start unset and are filled in by
/// `crate::ebnfc::assign`.
#[derive(Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub text: Option<String>,
    pub children: Vec<NodeRef>,
    pub id: i64,
    pub branches_ix: i64,
    pub export_ident: Option<String>,
    pub node_type_name: Option<String>,
}

impl Node {
    fn new(kind: NodeKind, text: Option<String>, children: Vec<NodeRef>) -> NodeRef {
        Rc::new(RefCell::new(Node {
            kind,
            text,
            children,
            id: -1,
            branches_ix: -1,
            export_ident: None,
            node_type_name: None,
        }))
    }

    pub fn identifier(text: impl Into<String>) -> NodeRef {
        Node::new(NodeKind::Identifier, Some(text.into()), Vec::new())
    }

    pub fn str_literal(text: impl Into<String>) -> NodeRef {
        Node::new(NodeKind::StrLiteral, Some(text.into()), Vec::new())
    }

    pub fn regex(text: impl Into<String>) -> NodeRef {
        Node::new(NodeKind::RegEx, Some(text.into()), Vec::new())
    }

    /// `text` is already the normalised (even-length) hex digit string.
    pub fn bin_data(text: impl Into<String>) -> NodeRef {
        Node::new(NodeKind::BinData, Some(text.into()), Vec::new())
    }

    /// `width` is one of `BYTE`/`WORD`/`DWORD`/`QWORD`; `param` is the
    /// optional identifier child naming the count/times parameter.
    pub fn bin_field(kind: NodeKind, width: impl Into<String>, param: Option<NodeRef>) -> NodeRef {
        debug_assert!(matches!(
            kind,
            NodeKind::BinField | NodeKind::BinFieldCount | NodeKind::BinFieldTimes
        ));
        Node::new(kind, Some(width.into()), param.into_iter().collect())
    }

    pub fn and_expr(children: Vec<NodeRef>) -> NodeRef {
        debug_assert!(children.len() >= 2, "AND_EXPR requires >= 2 children");
        Node::new(NodeKind::AndExpr, None, children)
    }

    pub fn or_expr(children: Vec<NodeRef>) -> NodeRef {
        debug_assert!(children.len() >= 2, "OR_EXPR requires >= 2 children");
        Node::new(NodeKind::OrExpr, None, children)
    }

    pub fn brack_expr(child: NodeRef) -> NodeRef {
        Node::new(NodeKind::BrackExpr, None, vec![child])
    }

    pub fn brace_expr(child: NodeRef) -> NodeRef {
        Node::new(NodeKind::BraceExpr, None, vec![child])
    }

    pub fn production(name: impl Into<String>, body: NodeRef) -> NodeRef {
        Node::new(NodeKind::Production, Some(name.into()), vec![body])
    }

    pub fn prod_list(productions: Vec<NodeRef>) -> NodeRef {
        debug_assert!(!productions.is_empty(), "PROD_LIST requires >= 1 production");
        Node::new(NodeKind::ProdList, None, productions)
    }
}

pub fn strong_count(node: &NodeRef) -> usize {
    Rc::strong_count(node)
}

/// Indented tree dump matching the shape of spec.md's data model: one line
/// per node, `KIND` or `KIND 'text'`, children indented two spaces deeper.
pub fn dump(root: &NodeRef, out: &mut impl fmt::Write) -> fmt::Result {
    dump_indented(root, 0, out)
}

fn dump_indented(node: &NodeRef, indent: usize, out: &mut impl fmt::Write) -> fmt::Result {
    let n = node.borrow();
    match &n.text {
        Some(text) => writeln!(out, "{:indent$}{} '{}'", "", n.kind, text, indent = indent)?,
        None => writeln!(out, "{:indent$}{}", "", n.kind, indent = indent)?,
    }
    for child in &n.children {
        dump_indented(child, indent + 2, out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_renders_text_and_indentation() {
        let lit = Node::str_literal("x");
        let prod = Node::production("a", lit);
        let mut out = String::new();
        dump(&prod, &mut out).unwrap();
        assert_eq!(out, "PRODUCTION 'a'\n  STR_LITERAL 'x'\n");
    }

    #[test]
    fn sharing_is_visible_through_strong_count() {
        let lit = Node::str_literal("a");
        let and = Node::and_expr(vec![lit.clone(), lit.clone()]);
        assert_eq!(strong_count(&lit), 3); // local binding + two child slots
        drop(and);
    }
}
