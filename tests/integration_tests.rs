use assert_matches::assert_matches;
use ebnfc::ebnfc::compiler::{self, Backend};
use ebnfc::ebnfc::error::ErrorCode;
use ebnfc::ebnfc::tree;

fn dump_of(src: &str) -> String {
    let root = compiler::build_tree(src.as_bytes()).unwrap();
    let mut out = String::new();
    tree::dump(&root, &mut out).unwrap();
    out
}

#[test]
fn minimal_grammar() {
    // spec.md §8 scenario 1.
    assert_eq!(
        dump_of("a := 'x' ."),
        "PROD_LIST\n  PRODUCTION 'a'\n    STR_LITERAL 'x'\n"
    );
}

#[test]
fn alternation_and_grouping() {
    // spec.md §8 scenario 2.
    assert_eq!(
        dump_of("x := 'a' | 'b' 'c' ."),
        "PROD_LIST\n  PRODUCTION 'x'\n    OR_EXPR\n      STR_LITERAL 'a'\n      AND_EXPR\n        STR_LITERAL 'b'\n        STR_LITERAL 'c'\n"
    );
}

#[test]
fn deduplication_shares_one_node_for_repeated_literal() {
    // spec.md §8 scenario 3.
    let root = compiler::build_tree("x := 'a' 'a' .".as_bytes()).unwrap();
    let and_expr = root.borrow().children[0].borrow().children[0].clone();
    let children = &and_expr.borrow().children;
    assert!(std::rc::Rc::ptr_eq(&children[0], &children[1]));
    assert_eq!(std::rc::Rc::strong_count(&children[0]), 3);
}

#[test]
fn optional_and_repetitive_forms_resolve_cross_reference() {
    // spec.md §8 scenario 4.
    let out = compiler::compile(
        "xs := x { ',' x } .\nx := 'y' .".as_bytes(),
        "grammar",
        Backend::Structured,
    )
    .unwrap();
    assert!(out.declaration.contains("NT_XS"));
    assert!(out.declaration.contains("extern const struct table_row *const production_x;"));
}

#[test]
fn binary_field_with_count_parameter() {
    // spec.md §8 scenario 5: BYTE | PARAM | WRITE = 0x32, emitted as the raw
    // byte 0x32 — not a 2/3-byte ASCII-hex rendition of it.
    let out = compiler::compile("rec := BYTE:count { BYTE } .".as_bytes(), "grammar", Backend::Asm).unwrap();
    let rows: Vec<Vec<u8>> = out
        .implementation
        .lines()
        .filter(|l| l.contains("_text:") && l.contains("db "))
        .map(|l| {
            l.split("db ")
                .nth(1)
                .unwrap()
                .split(',')
                .map(|tok| tok.trim().parse::<u16>().unwrap() as u8)
                .collect()
        })
        .collect();
    assert!(rows.contains(&vec![0x32]), "expected a raw 0x32 byte row, got {rows:?}");
}

#[test]
fn unresolved_reference_is_a_fatal_error() {
    // spec.md §8 scenario 6.
    let err = compiler::compile("a := b .".as_bytes(), "grammar", Backend::Structured).unwrap_err();
    assert_matches!(err.code, ErrorCode::UnresolvedProduction);
    assert!(err.to_string().contains("production 'b' not found"));
}

#[test]
fn structured_backend_round_trips_through_files() {
    let dir = tempfile::tempdir().unwrap();
    let out = compiler::compile("a := 'x' .".as_bytes(), "grammar", Backend::Structured).unwrap();
    std::fs::write(dir.path().join(&out.declaration_filename), &out.declaration).unwrap();
    std::fs::write(dir.path().join(&out.implementation_filename), &out.implementation).unwrap();

    let declaration = std::fs::read_to_string(dir.path().join("grammar.h")).unwrap();
    let implementation = std::fs::read_to_string(dir.path().join("grammar.c")).unwrap();
    assert_eq!(declaration, out.declaration);
    assert_eq!(implementation, out.implementation);
}

#[test]
fn asm_backend_selects_inc_and_nasm_filenames() {
    let out = compiler::compile("a := 'x' .".as_bytes(), "grammar", Backend::Asm).unwrap();
    assert_eq!(out.declaration_filename, "grammar.inc");
    assert_eq!(out.implementation_filename, "grammar.nasm");
    assert!(out.implementation.contains("prod_0_text:"));
}

#[test]
fn recompiling_the_same_input_is_byte_identical() {
    let first = compiler::compile("a := 'x' | 'y' .".as_bytes(), "grammar", Backend::Structured).unwrap();
    let second = compiler::compile("a := 'x' | 'y' .".as_bytes(), "grammar", Backend::Structured).unwrap();
    assert_eq!(first.declaration, second.declaration);
    assert_eq!(first.implementation, second.implementation);
}
