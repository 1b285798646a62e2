//! Identity & layout assigner (spec.md §4.4): two pre-order walks that give
//! every exportable node a stable id, a node-type enum name, a symbolic
//! export identifier, and a slice of the flat branch array.
//!
//! The id counter, branch cursor, and duplicate-enum-name set are process-
//! wide in the original design; per spec.md §9 they're consolidated here
//! into an explicit `AssignContext` threaded through both walks instead of
//! living as ambient state.

use crate::ebnfc::error::{CompileError, ErrorCode, Result};
use crate::ebnfc::tree::{NodeKind, NodeRef};
use enum_map::{enum_map, Enum, EnumMap};
use std::collections::{HashMap, HashSet};

/// The fixed operator-to-label table from spec.md §4.4, used to name a
/// terminal whose text is a recognised punctuator rather than a bare
/// identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
enum Operator {
    Ne, Cne, Deq, Eq, Ge, Le, Lt, Gt, And, LogAnd, Or, LogOr,
    Semic, Comma, Colon, LParen, RParen, LBrack, RBrack, LBrace, RBrace,
    Xor, LogXor, Star, DblStar, Slash, Plus, Minus, Assign, Assign2,
    Apply, PlusPlus, MinusMinus, PlusEq, MinusEq, StarEq, SlashEq,
    AndEq, OrEq, XorEq, Dot, Exclam, LShift, RShift, Modulo, ModuloEq,
    Ellipsis, Range,
}

fn operator_labels() -> EnumMap<Operator, &'static str> {
    enum_map! {
        Operator::Ne => "NE", Operator::Cne => "CNE", Operator::Deq => "DEQ",
        Operator::Eq => "EQ", Operator::Ge => "GE", Operator::Le => "LE",
        Operator::Lt => "LT", Operator::Gt => "GT", Operator::And => "AND",
        Operator::LogAnd => "LOGAND", Operator::Or => "OR", Operator::LogOr => "LOGOR",
        Operator::Semic => "SEMIC", Operator::Comma => "COMMA", Operator::Colon => "COLON",
        Operator::LParen => "LPAREN", Operator::RParen => "RPAREN", Operator::LBrack => "LBRACK",
        Operator::RBrack => "RBRACK", Operator::LBrace => "LBRACE", Operator::RBrace => "RBRACE",
        Operator::Xor => "XOR", Operator::LogXor => "LOGXOR", Operator::Star => "STAR",
        Operator::DblStar => "DBLSTAR", Operator::Slash => "SLASH", Operator::Plus => "PLUS",
        Operator::Minus => "MINUS", Operator::Assign => "ASSIGN", Operator::Assign2 => "ASSIGN2",
        Operator::Apply => "APPLY", Operator::PlusPlus => "PLUSPLUS", Operator::MinusMinus => "MINUSMINUS",
        Operator::PlusEq => "PLUSEQ", Operator::MinusEq => "MINUSEQ", Operator::StarEq => "STAREQ",
        Operator::SlashEq => "SLASHEQ", Operator::AndEq => "ANDEQ", Operator::OrEq => "OREQ",
        Operator::XorEq => "XOREQ", Operator::Dot => "DOT", Operator::Exclam => "EXCLAM",
        Operator::LShift => "LSHIFT", Operator::RShift => "RSHIFT", Operator::Modulo => "MODULO",
        Operator::ModuloEq => "MODULOEQ", Operator::Ellipsis => "ELLIPSIS", Operator::Range => "RANGE",
    }
}

fn parse_operator(text: &str) -> Option<Operator> {
    Some(match text {
        "<>" => Operator::Ne, "!=" => Operator::Cne, "==" => Operator::Deq,
        "=" => Operator::Eq, ">=" => Operator::Ge, "<=" => Operator::Le,
        "<" => Operator::Lt, ">" => Operator::Gt, "&" => Operator::And,
        "&&" => Operator::LogAnd, "|" => Operator::Or, "||" => Operator::LogOr,
        ";" => Operator::Semic, "," => Operator::Comma, ":" => Operator::Colon,
        "(" => Operator::LParen, ")" => Operator::RParen, "[" => Operator::LBrack,
        "]" => Operator::RBrack, "{" => Operator::LBrace, "}" => Operator::RBrace,
        "^" => Operator::Xor, "^^" => Operator::LogXor, "*" => Operator::Star,
        "**" => Operator::DblStar, "/" => Operator::Slash, "+" => Operator::Plus,
        "-" => Operator::Minus, ":=" => Operator::Assign, "::=" => Operator::Assign2,
        "~=" => Operator::Apply, "++" => Operator::PlusPlus, "--" => Operator::MinusMinus,
        "+=" => Operator::PlusEq, "-=" => Operator::MinusEq, "*=" => Operator::StarEq,
        "/=" => Operator::SlashEq, "&=" => Operator::AndEq, "|=" => Operator::OrEq,
        "^=" => Operator::XorEq, "." => Operator::Dot, "!" => Operator::Exclam,
        "<<" => Operator::LShift, ">>" => Operator::RShift, "%" => Operator::Modulo,
        "%=" => Operator::ModuloEq, "..." => Operator::Ellipsis, ".." => Operator::Range,
        _ => return None,
    })
}

/// Node-type enumerator emitted when a kind carries no distinct identity of
/// its own (spec.md §4.4); present as enumerator `0` but never duplicated.
pub const GENERIC_NODE_TYPE: &str = "_NT_GENERIC";

pub struct AssignContext {
    next_id: i64,
    branch_cursor: i64,
    seen_enum_names: HashSet<String>,
    /// Enum names in first-seen order, for the backend's declaration.
    pub emitted_enum_names: Vec<String>,
    /// Production name to id, first declaration wins (spec.md §8, §9).
    productions_by_name: HashMap<String, i64>,
    /// The flat branch array, built left-to-right as nodes are visited.
    pub branches: Vec<i64>,
    operator_labels: EnumMap<Operator, &'static str>,
}

impl AssignContext {
    pub fn new() -> AssignContext {
        AssignContext {
            next_id: 0,
            branch_cursor: 0,
            seen_enum_names: HashSet::new(),
            emitted_enum_names: Vec::new(),
            productions_by_name: HashMap::new(),
            branches: Vec::new(),
            operator_labels: operator_labels(),
        }
    }

    pub fn total_exportable_nodes(&self) -> i64 {
        self.next_id
    }
}

impl Default for AssignContext {
    fn default() -> AssignContext {
        AssignContext::new()
    }
}

/// Runs both walks over `root` and returns the populated context (id
/// counter, enum names, and branch array) for the backend to consume.
pub fn assign(root: &NodeRef) -> Result<AssignContext> {
    let mut ctx = AssignContext::new();
    walk1(&mut ctx, root);
    walk2(&mut ctx, root)?;
    Ok(ctx)
}

fn is_plain_identifier_text(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn upper_snake(text: &str) -> String {
    text.chars()
        .map(|c| if c == '-' { '_' } else { c.to_ascii_uppercase() })
        .collect()
}

fn node_type_name(ctx: &AssignContext, kind: NodeKind, text: Option<&str>, id: i64) -> String {
    match kind {
        NodeKind::Production => format!("NT_{}", upper_snake(text.expect("PRODUCTION always has text"))),
        NodeKind::StrLiteral | NodeKind::RegEx => {
            let text = text.expect("STR_LITERAL/REG_EX always has text");
            if is_plain_identifier_text(text) {
                format!("NT_TERMINAL_{}", text.to_ascii_uppercase())
            } else if let Some(op) = parse_operator(text) {
                format!("NT_TERMINAL_{}", ctx.operator_labels[op])
            } else {
                format!("NT_TERMINAL_{id}")
            }
        }
        _ => GENERIC_NODE_TYPE.to_string(),
    }
}

/// Numbers children before their parent. The worked examples in spec.md §8
/// assign a `PRODUCTION` the highest id among its descendants (e.g. a
/// single string literal gets id 0, its enclosing production id 1), which
/// only falls out of a depth-first walk that numbers bottom-up; §4.4's
/// "pre-order" prose describes the recursion shape, not the id order.
fn walk1(ctx: &mut AssignContext, node: &NodeRef) {
    let children = node.borrow().children.clone();
    for child in &children {
        walk1(ctx, child);
    }
    let kind = node.borrow().kind;
    if kind.is_exportable() && node.borrow().id == -1 {
        let id = ctx.next_id;
        let text = node.borrow().text.clone();
        let name = node_type_name(ctx, kind, text.as_deref(), id);
        if name != GENERIC_NODE_TYPE && ctx.seen_enum_names.insert(name.clone()) {
            ctx.emitted_enum_names.push(name.clone());
        }
        node.borrow_mut().node_type_name = Some(name);
        node.borrow_mut().id = id;
        ctx.next_id += 1;
        if kind == NodeKind::Production {
            ctx.productions_by_name
                .entry(text.expect("PRODUCTION always has text"))
                .or_insert(id);
        }
    }
}

fn export_ident(kind: NodeKind, text: Option<&str>, id: i64) -> String {
    match kind {
        NodeKind::Production => format!(
            "production_{}",
            text.expect("PRODUCTION always has text").replace('-', "_")
        ),
        NodeKind::StrLiteral => format!("string_terminal_{id}"),
        NodeKind::RegEx => format!("regex_terminal_{id}"),
        NodeKind::AndExpr => format!("mandatory_expr_{id}"),
        NodeKind::OrExpr => format!("alternative_expr_{id}"),
        NodeKind::BrackExpr => format!("optional_expr_{id}"),
        NodeKind::BraceExpr => format!("optional_repetitive_expr_{id}"),
        NodeKind::BinData => format!("binary_data_{id}"),
        NodeKind::BinField | NodeKind::BinFieldCount | NodeKind::BinFieldTimes => {
            format!("binary_field_{id}")
        }
        NodeKind::Eos | NodeKind::Identifier | NodeKind::ProdList => unreachable!("not exportable"),
    }
}

fn resolve_branch_value(ctx: &AssignContext, parent_kind: NodeKind, child: &NodeRef) -> Result<i64> {
    let child = child.borrow();
    if child.kind != NodeKind::Identifier {
        return Ok(child.id);
    }
    if matches!(
        parent_kind,
        NodeKind::BinData | NodeKind::BinField | NodeKind::BinFieldCount | NodeKind::BinFieldTimes
    ) {
        return Ok(-2);
    }
    let name = child.text.as_deref().expect("IDENTIFIER always has text");
    ctx.productions_by_name.get(name).copied().ok_or_else(|| {
        CompileError::semantic(
            ErrorCode::UnresolvedProduction,
            format!("production '{name}' not found"),
        )
    })
}

/// Unlike `walk1`, the branch cursor is claimed parent-first: a node's own
/// range is laid out before its children's ranges, matching the worked
/// branch-array layout in spec.md §8 (a production's single-entry range
/// precedes its body's range, which precedes that body's own children).
fn walk2(ctx: &mut AssignContext, node: &NodeRef) -> Result<()> {
    let kind = node.borrow().kind;
    if kind.is_exportable() {
        if node.borrow().export_ident.is_none() {
            let id = node.borrow().id;
            let text = node.borrow().text.clone();
            let ident = export_ident(kind, text.as_deref(), id);
            node.borrow_mut().export_ident = Some(ident);
        }
        let children = node.borrow().children.clone();
        if !children.is_empty() && node.borrow().branches_ix == -1 {
            let start = ctx.branch_cursor;
            for child in &children {
                let value = resolve_branch_value(ctx, kind, child)?;
                ctx.branches.push(value);
            }
            ctx.branch_cursor += children.len() as i64;
            node.borrow_mut().branches_ix = start;
        }
    }
    let children = node.borrow().children.clone();
    for child in &children {
        walk2(ctx, child)?;
    }
    Ok(())
}
