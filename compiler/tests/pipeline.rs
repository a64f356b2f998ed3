//! End-to-end tests: source text through every stage to rendered IR.

use tinypascal_compiler::{
    compile,
    errors::{Error, GenError, SemanticError},
    ir::{self, Instr, SectionKind},
    irgen,
};

const DEMO: &str = include_str!("../../demos/example.tp");

fn tac(src: &str) -> String {
    match compile(src) {
        Ok(code) => ir::render_tac(&code),
        Err(e) => panic!("Expected successful compilation, got: {}", e),
    }
}

#[test]
fn test_demo_compiles() {
    let code = compile(DEMO).expect("demo should compile");
    let sections: Vec<(SectionKind, Option<&str>)> = code
        .iter()
        .filter_map(|i| match i {
            Instr::Section { kind, name, .. } => Some((*kind, name.as_deref())),
            _ => None,
        })
        .collect();
    assert_eq!(
        sections,
        [
            (SectionKind::Function, Some("isEven")),
            (SectionKind::Procedure, Some("report")),
            (SectionKind::Main, None),
        ]
    );

    let text = ir::render_tac(&code);
    assert!(text.starts_with(".func isEven returns boolean\n"));
    assert!(text.contains(".func report returns void\n"));
    assert!(text.ends_with("return\n"));
    assert!(text.contains("call isEven, 1"));
    assert!(text.contains("call report, 2"));
}

#[test]
fn test_demo_listing_matches_instruction_count() {
    let code = compile(DEMO).unwrap();
    let listing = ir::render_list(&code);
    assert_eq!(listing.lines().count(), code.len() + 2);
    assert!(listing.contains("{ op: 'decl', args: [ 'total', 'i', ':integer' ] },"));
    assert!(listing.contains("{ op: 'decl', args: [ 'done', ':boolean' ] },"));
    assert!(listing.contains("{ op: 'section', args: [ 'main' ] },"));
}

#[test]
fn test_expression_example() {
    assert_eq!(
        tac("var x: integer; begin x := 1 + 2 * 3 end."),
        "\
.entry
t1 := 1
t2 := 2
t3 := 3
t4 := t2 * t3
t5 := t1 + t4
x := t5
return
"
    );
}

#[test]
fn test_function_round_trip() {
    let text = tac(
        "var r: integer;
         function twice(n: integer): integer;
         begin
           return n + n
         end;
         begin
           r := twice(21);
           writeln(r)
         end.",
    );
    assert_eq!(
        text,
        "\
.func twice returns integer
t1 := n + n
return t1
.endfunc
.entry
t2 := 21
param t2
t3 := call twice, 1
r := t3
param r
call writeln, 1
return
"
    );
}

#[test]
fn test_loop_control_flow() {
    let text = tac(
        "var i: integer;
         begin
           i := 0;
           while true do
           begin
             i := i + 1;
             if i = 3 then begin continue end;
             if i > 5 then begin break end else begin writeln(i) end
           end
         end.",
    );
    assert!(text.contains("L_while_start_1:\n"));
    assert!(text.contains("ifnot t2 goto L_while_end_2\n"));
    assert!(text.contains("goto L_while_start_1\nL_end_4:\n"));
    assert!(text.contains("L_then_5:\ngoto L_while_end_2\ngoto L_end_7\n"));
    assert!(text.ends_with("goto L_while_start_1\nL_while_end_2:\nreturn\n"));
}

#[test]
fn test_lexical_error_is_reported() {
    let err = compile("var x: integer; begin x := 1 # 2 end.").unwrap_err();
    assert!(matches!(err, Error::Lex(_)));
    assert!(err.to_string().starts_with("lexical error:"));
}

#[test]
fn test_syntax_error_is_reported() {
    let err = compile("var x: integer; begin x := 1 end").unwrap_err();
    match err {
        Error::Syntax(e) => assert_eq!(e.found, "end-of-stream"),
        other => panic!("Expected syntax error, got: {}", other),
    }
}

#[test]
fn test_semantic_error_stops_generation() {
    let err = compile("begin while true do begin end; break end.").unwrap_err();
    assert!(matches!(
        err,
        Error::Semantic(SemanticError::OutsideLoop { keyword: "break", .. })
    ));

    let err = compile("var x: integer; begin x := true end.").unwrap_err();
    assert!(matches!(
        err,
        Error::Semantic(SemanticError::TypeMismatch { .. })
    ));
}

#[test]
fn test_generator_rejects_unchecked_break() {
    let program = tinypascal_compiler::parse("begin continue end.").unwrap();
    assert!(matches!(
        irgen::generate(&program),
        Err(GenError::ContinueOutsideLoop { .. })
    ));
}

#[test]
fn test_error_report_points_at_source() {
    let src = "var x: integer;\nbegin\n  y := 1\nend.";
    let err = compile(src).unwrap_err();
    let span = err.span();
    assert_eq!((span.line, span.column), (3, 3));
    let report = err.to_report(src);
    assert_eq!(report.message, "semantic error: undeclared identifier 'y'");
    assert_eq!(report.span.offset(), src.find('y').unwrap());
}

#[test]
fn test_compilation_is_deterministic() {
    assert_eq!(compile(DEMO).unwrap(), compile(DEMO).unwrap());
}

fn suffix(name: &str) -> u32 {
    let digits = name.trim_start_matches(|c: char| !c.is_ascii_digit());
    digits.parse().unwrap_or_else(|_| panic!("no number in '{}'", name))
}

#[test]
fn test_temps_and_labels_never_repeat() {
    let code = compile(DEMO).unwrap();

    let temps: Vec<u32> = code
        .iter()
        .filter_map(|i| match i {
            Instr::Const { target, .. }
            | Instr::Binary { target, .. }
            | Instr::Not { target, .. }
            | Instr::Call { target, .. } => Some(suffix(target)),
            _ => None,
        })
        .collect();
    assert!(!temps.is_empty());
    assert_eq!(temps[0], 1);
    assert!(
        temps.windows(2).all(|w| w[0] < w[1]),
        "temps out of order: {:?}",
        temps
    );

    let mut labels: Vec<u32> = code
        .iter()
        .filter_map(|i| match i {
            Instr::Label { label } => Some(suffix(label)),
            _ => None,
        })
        .collect();
    let defined = labels.len();
    assert!(defined >= 3);
    labels.sort_unstable();
    labels.dedup();
    assert_eq!(labels.len(), defined, "a label number was reused");
}
