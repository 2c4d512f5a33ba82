use pogc::analyzer::{analyze, SemanticError, SymbolTable, Ty};
use pogc::lexer::Position;
use pogc::CompileError;

fn check(input: &str) -> Result<SymbolTable, Vec<SemanticError>> {
    let program = pogc::parse(input).unwrap();
    analyze(&program)
}

fn errors(input: &str) -> Vec<SemanticError> {
    check(input).unwrap_err()
}

fn kinds(input: &str) -> Vec<&'static str> {
    errors(input).iter().map(|e| e.kind()).collect()
}

#[test]
fn well_typed_program() {
    let table = check(
        "var a: Int = 2;
var b: Int = 3;
var c: Int = a + b;
var s: String = \"sum: \" + c;
if (c > 4 && !(a == b)) { println(s); } else { println(c); }
while (a < 10) { a = a * 2; }
s = readLine();",
    )
    .unwrap();
    assert_eq!(table.symbols().len(), 4);
    assert_eq!(table.lookup("s").unwrap().ty, Ty::String);
}

#[test]
fn duplicate_declaration() {
    let errs = errors("var x: Int = 1;\nvar x: Int = 2;");
    assert_eq!(errs.len(), 1);
    assert_eq!(
        errs[0],
        SemanticError::DuplicateDeclaration {
            name: "x".to_string(),
            pos: Position::new(2, 4),
            previous: Position::new(1, 4),
        }
    );
    assert_eq!(
        errs[0].to_string(),
        "DuplicateDeclaration [Line 2, Column 4]: variable 'x' is already declared in this scope"
    );
}

#[test]
fn shadowing_in_nested_scope_is_legal() {
    check(
        "var x: Int = 1;
if (x) { var x: String = \"inner\"; println(x); }
while (0) { var x: Int = 2; }
println(x);",
    )
    .unwrap();
}

#[test]
fn sibling_blocks_have_separate_scopes() {
    check("if (1) { var y: Int = 1; } else { var y: String = \"s\"; }").unwrap();
}

#[test]
fn block_scope_ends_with_block() {
    let errs = errors("if (1) { var y: Int = 1; }\nprintln(y);");
    assert_eq!(
        errs,
        vec![SemanticError::Undeclared {
            name: "y".to_string(),
            pos: Position::new(2, 8),
        }]
    );
}

#[test]
fn assignment_type_mismatch() {
    // Scenario B
    let errs = errors("var s:String=\"hi\"; s=5;");
    assert_eq!(
        errs,
        vec![SemanticError::TypeMismatch {
            expected: Ty::String,
            found: Ty::Int,
            pos: Position::new(1, 21),
        }]
    );
}

#[test]
fn assignment_to_undeclared() {
    // Scenario C
    let errs = errors("x=1;");
    assert_eq!(errs.len(), 1);
    assert_eq!(
        errs[0].to_string(),
        "Undeclared [Line 1, Column 0]: variable 'x' is not declared"
    );
}

#[test]
fn declaration_type_mismatch() {
    assert_eq!(kinds("var n: Int = \"one\";"), vec!["TypeMismatch"]);
    assert_eq!(kinds("var s: String = 1 + 2;"), vec!["TypeMismatch"]);
}

#[test]
fn string_plus_anything_is_string() {
    check("var a: String = \"a\" + \"b\";").unwrap();
    check("var a: String = \"a\" + 1;").unwrap();
    check("var a: String = 1 + \"a\";").unwrap();
}

#[test]
fn invalid_condition_type() {
    let errs = errors("if (\"yes\") { pog; }\nwhile (\"no\") { pog; }");
    assert_eq!(
        errs,
        vec![
            SemanticError::InvalidConditionType {
                found: Ty::String,
                pos: Position::new(1, 4),
            },
            SemanticError::InvalidConditionType {
                found: Ty::String,
                pos: Position::new(2, 7),
            },
        ]
    );
}

#[test]
fn invalid_operand_type() {
    for op in ["-", "*", "/", "<", "<=", ">", ">=", "&&", "||"] {
        let errs = errors(&format!("println(\"a\" {} 1);", op));
        assert_eq!(errs.len(), 1, "operator {}", op);
        assert_eq!(
            errs[0],
            SemanticError::InvalidOperandType {
                op: op.to_string(),
                operands: vec![Ty::String, Ty::Int],
                pos: Position::new(1, 12),
            }
        );
    }
    assert_eq!(kinds("println(!\"a\");"), vec!["InvalidOperandType"]);
}

#[test]
fn operand_error_does_not_cascade() {
    // the failed subtraction is not reported again as a mismatch
    assert_eq!(kinds("var n: Int = \"a\" - 1;"), vec!["InvalidOperandType"]);
    assert_eq!(kinds("var n: Int = (\"a\" - 1) * 2;"), vec!["InvalidOperandType"]);
}

#[test]
fn equality_needs_matching_types() {
    check("println(\"a\" == \"b\"); println(1 != 2);").unwrap();
    let errs = errors("println(1 == \"b\");");
    assert_eq!(
        errs,
        vec![SemanticError::TypeMismatch {
            expected: Ty::Int,
            found: Ty::String,
            pos: Position::new(1, 10),
        }]
    );
}

#[test]
fn read_target_must_be_string() {
    let errs = errors("var n: Int = 0;\nn = readLine();");
    assert_eq!(
        errs,
        vec![SemanticError::ReadTargetTypeMismatch {
            name: "n".to_string(),
            found: Ty::Int,
            pos: Position::new(2, 0),
        }]
    );
    assert_eq!(kinds("m = readLine();"), vec!["Undeclared"]);
}

#[test]
fn errors_accumulate_in_source_order() {
    let errs = errors(
        "var a: Int = \"x\";
b = 1;
var a: String = \"y\";
if (\"c\") { c = 2; }
println(d);",
    );
    let lines: Vec<_> = errs.iter().map(|e| e.pos().line).collect();
    assert_eq!(lines, vec![1, 2, 3, 4, 4, 5]);
    assert_eq!(
        errs.iter().map(|e| e.kind()).collect::<Vec<_>>(),
        vec![
            "TypeMismatch",
            "Undeclared",
            "DuplicateDeclaration",
            "InvalidConditionType",
            "Undeclared",
            "Undeclared",
        ]
    );
}

#[test]
fn initializer_is_checked_after_duplicate() {
    assert_eq!(
        kinds("var a: Int = 1;\nvar a: Int = zzz;"),
        vec!["DuplicateDeclaration", "Undeclared"]
    );
}

#[test]
fn duplicate_declaration_skips_initializer_type_check() {
    assert_eq!(
        kinds("var a: Int = 1;\nvar a: String = 5;"),
        vec!["DuplicateDeclaration"]
    );
}

#[test]
fn semantic_errors_stop_the_pipeline() {
    let err = pogc::compile("var s:String=\"hi\"; s=5;").unwrap_err();
    let CompileError::Semantic(errs) = &err else {
        panic!();
    };
    assert_eq!(errs.len(), 1);
    assert_eq!(
        err.to_string(),
        "TypeMismatch [Line 1, Column 21]: expected 'String', found 'Int'"
    );
}

#[test]
fn diagnostics_render_one_per_line() {
    let err = pogc::compile("x = 1;\ny = 2;").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Undeclared [Line 1, Column 0]: variable 'x' is not declared\n\
         Undeclared [Line 2, Column 0]: variable 'y' is not declared"
    );
}
