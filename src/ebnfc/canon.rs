//! Canonicalisation pass (spec.md §4.3): deduplicates structurally-equal
//! `STR_LITERAL`/`REG_EX` leaves so identical terminals resolve to one
//! shared node with refcount ≥ 1.
//!
//! The search for a node's representative walks the whole tree in
//! pre-order from the root and takes the *first* match, which may be the
//! node itself. Per the resolved open question in spec.md §9, a self-match
//! is a no-op: we simply don't rewrite the slot, so there's nothing to
//! release and no double-free to guard against.

use crate::ebnfc::tree::{NodeKind, NodeRef};
use std::rc::Rc;

/// Rewrites every reachable `STR_LITERAL`/`REG_EX` child slot to point at
/// the first node in tree order with the same (kind, text).
pub fn canonicalise(root: &NodeRef) {
    canon_children(root, root);
}

fn canon_children(root: &NodeRef, node: &NodeRef) {
    let len = node.borrow().children.len();
    for i in 0..len {
        let child = node.borrow().children[i].clone();
        if child.borrow().kind.is_terminal_leaf() {
            if let Some(representative) = find_representative(root, &child) {
                if !Rc::ptr_eq(&representative, &child) {
                    node.borrow_mut().children[i] = representative;
                }
            }
        } else {
            canon_children(root, &child);
        }
    }
}

/// Finds the first `STR_LITERAL`/`REG_EX` node in pre-order from `root`
/// that shares `target`'s (kind, text) — which may be `target` itself.
fn find_representative(root: &NodeRef, target: &NodeRef) -> Option<NodeRef> {
    let target_kind = target.borrow().kind;
    let target_text = target.borrow().text.clone();
    find_in(root, target_kind, &target_text)
}

fn find_in(node: &NodeRef, kind: NodeKind, text: &Option<String>) -> Option<NodeRef> {
    {
        let n = node.borrow();
        if n.kind == kind && &n.text == text {
            return Some(node.clone());
        }
    }
    let children = node.borrow().children.clone();
    for child in &children {
        if let Some(found) = find_in(child, kind, text) {
            return Some(found);
        }
    }
    None
}

impl NodeKind {
    fn is_terminal_leaf(&self) -> bool {
        matches!(self, NodeKind::StrLiteral | NodeKind::RegEx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ebnfc::tree::{dump, Node};

    #[test]
    fn duplicate_string_literals_share_one_node() {
        let a1 = Node::str_literal("a");
        let a2 = Node::str_literal("a");
        let and = Node::and_expr(vec![a1.clone(), a2.clone()]);
        let root = Node::prod_list(vec![Node::production("x", and)]);

        canonicalise(&root);

        let prod = &root.borrow().children[0];
        let and_expr = &prod.borrow().children[0];
        let children = &and_expr.borrow().children;
        assert!(Rc::ptr_eq(&children[0], &children[1]));
        assert_eq!(Rc::strong_count(&children[0]), 3); // a1 local, two shared slots
    }

    #[test]
    fn distinct_text_is_left_alone() {
        let a = Node::str_literal("a");
        let b = Node::str_literal("b");
        let and = Node::and_expr(vec![a, b]);
        let root = Node::prod_list(vec![Node::production("x", and)]);

        canonicalise(&root);

        let prod = &root.borrow().children[0];
        let and_expr = &prod.borrow().children[0];
        let children = &and_expr.borrow().children;
        assert!(!Rc::ptr_eq(&children[0], &children[1]));
    }

    #[test]
    fn canonicalisation_is_idempotent_on_dump() {
        let a1 = Node::str_literal("a");
        let a2 = Node::str_literal("a");
        let and = Node::and_expr(vec![a1, a2]);
        let root = Node::prod_list(vec![Node::production("x", and)]);

        canonicalise(&root);
        let first = {
            let mut out = String::new();
            dump(&root, &mut out).unwrap();
            out
        };
        canonicalise(&root);
        let second = {
            let mut out = String::new();
            dump(&root, &mut out).unwrap();
            out
        };
        assert_eq!(first, second);
    }
}
