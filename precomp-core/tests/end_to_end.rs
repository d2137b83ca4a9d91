//! Concrete end-to-end scenarios (§8): each one drives the whole pipeline
//! through [`preprocess`] over an in-memory host and checks an observable
//! outcome, not intermediate representations.

mod support;

use precomp_core::preprocess;
use precomp_foundation::codes;
use precomp_lexer::Dialect;
use support::InMemoryHost;

#[test]
fn conditional_arithmetic_picks_the_true_branch() {
    let source = "#if (2+3)*4 == 20\ninteger ok = 1;\n#else\ninteger ok = 0;\n#endif\n";
    let host = InMemoryHost::new(&[]);
    let output = preprocess(&host, source, "main.lsl", Dialect::Lsl);

    assert!(output.success, "{:?}", output.diagnostics);
    assert!(output.content.contains("ok = 1"));
    assert!(!output.content.contains("ok = 0"));
}

#[test]
fn include_guard_prevents_double_inclusion() {
    let a_lsl = "#ifndef A_INCLUDED\n#define A_INCLUDED\ninteger shared_var;\n#endif\n";
    let main_lsl = "#include \"a.lsl\"\n#include \"a.lsl\"\ndefault { state_entry() {} }\n";
    let host = InMemoryHost::new(&[("a.lsl", a_lsl)]);
    let output = preprocess(&host, main_lsl, "main.lsl", Dialect::Lsl);

    assert!(output.success, "{:?}", output.diagnostics);
    assert_eq!(output.content.matches("shared_var").count(), 1);
    assert_eq!(output.detected_includes.len(), 2);
    assert!(output.detected_includes.iter().all(|inc| inc.file == "a.lsl" && !inc.is_require));
}

#[test]
fn function_like_macro_with_stringify_and_paste() {
    let source = "#define CAT(a, b) a##b\n#define STR(x) #x\nSTR(hello) CAT(foo, bar)\n";
    let host = InMemoryHost::new(&[]);
    let output = preprocess(&host, source, "main.lsl", Dialect::Lsl);

    assert!(output.success, "{:?}", output.diagnostics);
    assert!(output.content.contains("\"hello\""));
    assert!(output.content.contains("foobar"));
    assert_eq!(output.detected_macros.len(), 2);
}

#[test]
fn require_diamond_executes_the_shared_module_once() {
    let d_luau = "local d_marker = true\nreturn d_marker\n";
    let b_luau = "local d = require(\"d\")\nreturn d\n";
    let c_luau = "local d = require(\"d\")\nreturn d\n";
    let main_luau = "local b = require(\"b\")\nlocal c = require(\"c\")\n";
    let host = InMemoryHost::new(&[("b.luau", b_luau), ("c.luau", c_luau), ("d.luau", d_luau)]);
    let output = preprocess(&host, main_luau, "main.luau", Dialect::Luau);

    assert!(output.success, "{:?}", output.diagnostics);
    // `d` is wrapped and registered exactly once, even though both `b` and
    // `c` require it.
    assert_eq!(output.content.matches("d_marker").count(), 1);
    assert_eq!(output.content.matches("__require_table[1]()").count(), 2);
    // Every textual `require(...)` call site is still recorded, even the
    // ones whose target was already registered.
    assert_eq!(output.detected_includes.len(), 4);
    assert!(output.detected_includes.iter().all(|inc| inc.is_require));
}

#[test]
fn circular_include_is_reported_and_fails() {
    // The root file is never itself pushed onto the include stack, so the
    // cycle has to close between two *included* files to be detectable.
    let main_lsl = "#include \"b.lsl\"\n";
    let b_lsl = "#include \"c.lsl\"\n";
    let c_lsl = "#include \"b.lsl\"\n";
    let host = InMemoryHost::new(&[("b.lsl", b_lsl), ("c.lsl", c_lsl)]);
    let output = preprocess(&host, main_lsl, "main.lsl", Dialect::Lsl);

    assert!(!output.success);
    assert_eq!(output.content, main_lsl, "failure policy must return the original source unchanged");
    assert!(output
        .diagnostics
        .iter()
        .any(|d| d.code == Some(codes::inc::CIRCULAR_INCLUDE)));
}

#[test]
fn mismatched_else_with_no_matching_if_fails() {
    let source = "#else\ninteger x;\n#endif\n";
    let host = InMemoryHost::new(&[]);
    let output = preprocess(&host, source, "main.lsl", Dialect::Lsl);

    assert!(!output.success);
    assert_eq!(output.content, source);
    assert!(output
        .diagnostics
        .iter()
        .any(|d| d.code == Some(codes::par::MISMATCHED_CONDITIONAL)));
}

#[test]
fn elif_after_else_is_reported_without_a_spurious_unterminated_block() {
    // A `#elif` after `#else` is an error on its own line, but the `#if` it
    // belongs to is still properly closed by the `#endif` on the next line
    // — that must not also get reported as unterminated.
    let source = "#if 1\n#else\n#elif 1\n#endif\n";
    let host = InMemoryHost::new(&[]);
    let output = preprocess(&host, source, "main.lsl", Dialect::Lsl);

    assert!(!output.success);
    let mismatched: Vec<_> = output
        .diagnostics
        .iter()
        .filter(|d| d.code == Some(codes::par::MISMATCHED_CONDITIONAL))
        .collect();
    assert_eq!(mismatched.len(), 1);
    assert_eq!(mismatched[0].line, 3);
    assert!(output
        .diagnostics
        .iter()
        .all(|d| d.code != Some(codes::par::UNTERMINATED_CONDITIONAL)));
}
