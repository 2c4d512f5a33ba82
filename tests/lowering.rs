use pogc::analyzer::{SymbolTable, Ty};
use pogc::codegen::{
    lower, Cond, Inst, IrType, LoweringError, Module, Runtime, Terminator, Value,
};
use pogc::lexer::Position;
use pogc::tac::{Instruction, Opcode, Operand};

fn compile(input: &str) -> Module {
    pogc::compile(input).unwrap().module
}

fn calls(module: &Module, runtime: Runtime) -> usize {
    module
        .insts()
        .filter(|i| matches!(i, Inst::Call { callee, .. } if *callee == runtime))
        .count()
}

fn label(n: usize) -> Instruction {
    Instruction::op1(Opcode::Label, Operand::Label(n))
}

fn assert_well_formed(module: &Module) {
    assert_eq!(module.blocks[0].label, "entry");
    for block in module.blocks.iter() {
        for succ in block.terminator.successors() {
            assert!(succ.0 < module.blocks.len(), "{} jumps nowhere", block.label);
        }
    }
    let text = module.to_string();
    let terminators = text
        .lines()
        .filter(|l| l.starts_with("  br ") || l.starts_with("  ret "))
        .count();
    assert_eq!(terminators, module.blocks.len());
}

#[test]
fn scenario_a_module() {
    let module = compile("var a:Int=2; var b:Int=3; var c:Int=a+b; println(c);");
    assert_well_formed(&module);

    let globals: Vec<_> = module
        .globals
        .iter()
        .map(|g| (g.name.as_str(), g.ty))
        .collect();
    assert_eq!(
        globals,
        vec![("a", IrType::I32), ("b", IrType::I32), ("c", IrType::I32)]
    );
    assert_eq!(calls(&module, Runtime::PrintInt), 1);

    let last = module.blocks.last().unwrap();
    assert_eq!(last.terminator, Terminator::Return(0));
}

#[test]
fn module_text() {
    let module = compile("var s: String = \"hi\"; var n: Int = 1; println(s); println(n);");
    let text = module.to_string();
    assert!(text.contains("@.str.0 = private unnamed_addr constant [3 x i8] c\"hi\\00\""));
    assert!(text.contains("@var.s = global ptr null"));
    assert!(text.contains("@var.n = global i32 0"));
    assert!(text.contains("declare void @pog_print_int(i32)"));
    assert!(text.contains("declare i32 @pog_strcmp(ptr, ptr)"));
    assert!(text.contains("define i32 @main() {"));
    assert!(text.contains("store ptr @.str.0, ptr @var.s"));
    assert!(text.contains("call void @pog_print_str(ptr %"));
    assert!(text.trim_end().ends_with('}'));
}

#[test]
fn string_constants_are_pooled() {
    let module = compile(
        "println(\"hi\"); println(\"hi\"); println(\"yo\");
var s: String = \"hi\";",
    );
    let contents: Vec<_> = module.strings.iter().map(|s| s.content.as_str()).collect();
    assert_eq!(contents, vec!["hi", "yo"]);
}

#[test]
fn string_escapes_in_text() {
    let module = compile("println(\"a\\b\");");
    assert!(module.to_string().contains("c\"a\\5Cb\\00\""));
}

#[test]
fn print_dispatches_on_type() {
    let module = compile("var s: String = \"x\"; println(s); println(1); println(1 < 2); println(s + 1);");
    assert_eq!(calls(&module, Runtime::PrintStr), 2);
    assert_eq!(calls(&module, Runtime::PrintInt), 2);
}

#[test]
fn string_equality_calls_strcmp() {
    let module = compile("var a: String = \"x\"; if (a == \"x\") { pog; } println(a != \"y\");");
    assert_eq!(calls(&module, Runtime::StrCmp), 2);
    assert!(!module
        .insts()
        .any(|i| matches!(i, Inst::Icmp { lhs, .. } if matches!(lhs, pogc::codegen::Value::Str(_)))));
}

#[test]
fn concatenation_converts_ints() {
    let module = compile("var s: String = \"n=\" + 4; s = s + s;");
    assert_eq!(calls(&module, Runtime::Concat), 2);
    assert_eq!(calls(&module, Runtime::IntToStr), 1);
}

#[test]
fn division_by_variable_is_guarded() {
    let module = compile("var a: Int = 4; var b: Int = 2; println(a / b);");
    assert_well_formed(&module);
    assert_eq!(calls(&module, Runtime::DivByZero), 1);

    let trap = module
        .blocks
        .iter()
        .find(|b| b.label.starts_with("div.trap"))
        .unwrap();
    assert_eq!(trap.terminator, Terminator::Return(1));
}

#[test]
fn division_by_nonzero_constant_is_not_guarded() {
    let module = compile("var a: Int = 4; println(a / 2);");
    assert_eq!(calls(&module, Runtime::DivByZero), 0);
    let module = compile("var a: Int = 4; println(a / 0);");
    assert_eq!(calls(&module, Runtime::DivByZero), 1);
}

fn compares_with_int_min(module: &Module) -> bool {
    module.insts().any(|i| {
        matches!(
            i,
            Inst::Icmp {
                cond: Cond::Eq,
                rhs: Value::Const(i32::MIN),
                ..
            }
        )
    })
}

#[test]
fn division_overflow_is_fixed_up() {
    let module = compile("var a: Int = 4; var b: Int = 2; println(a / b);");
    assert!(compares_with_int_min(&module));
    assert!(module.insts().any(|i| matches!(
        i,
        Inst::Icmp {
            cond: Cond::Eq,
            rhs: Value::Const(-1),
            ..
        }
    )));

    let module = compile("var a: Int = 4; println(a / 2);");
    assert!(!compares_with_int_min(&module));
}

#[test]
fn read_allocates_a_buffer() {
    let module = compile("var s: String = \"\"; s = readLine();");
    assert!(module
        .insts()
        .any(|i| matches!(i, Inst::Alloca { size: 256, .. })));
    assert_eq!(calls(&module, Runtime::ReadStr), 1);
}

#[test]
fn empty_else_falls_through() {
    let module = compile("if (1) { pog; }");
    assert_well_formed(&module);
    let else_block = module.find_block("L2").unwrap();
    let end_block = module.find_block("L3").unwrap();
    assert_eq!(
        module.block(else_block).terminator,
        Terminator::Jump(end_block)
    );
}

#[test]
fn if_true_branches_with_continuation() {
    let module = compile("var n: Int = 0; while (n < 3) { n = n + 1; }");
    assert_well_formed(&module);
    let body = module.find_block("L2").unwrap();
    let branch = module
        .blocks
        .iter()
        .find(|b| matches!(b.terminator, Terminator::Branch { .. }))
        .unwrap();
    let Terminator::Branch {
        then_block,
        else_block,
        ..
    } = branch.terminator
    else {
        panic!();
    };
    assert_eq!(then_block, body);
    // the continuation holds the GOTO to the loop exit
    assert_eq!(
        module.block(else_block).terminator,
        Terminator::Jump(module.find_block("L3").unwrap())
    );
}

#[test]
fn code_after_terminator_opens_fallthrough_block() {
    let tac = vec![
        label(0),
        Instruction::op1(Opcode::Goto, Operand::Label(1)),
        Instruction::op1(Opcode::Print, Operand::Immediate(1)),
        label(1),
        Instruction::op0(Opcode::Exit),
    ];
    let module = lower(tac, &SymbolTable::new()).unwrap();
    assert_well_formed(&module);
    let labels: Vec<_> = module.blocks.iter().map(|b| b.label.as_str()).collect();
    assert_eq!(labels, vec!["entry", "L0", "fallthrough.0", "L1"]);
}

#[test]
fn missing_exit_gets_implicit_return() {
    let tac = vec![label(0), Instruction::op1(Opcode::Print, Operand::Immediate(7))];
    let module = lower(tac, &SymbolTable::new()).unwrap();
    assert_eq!(module.blocks.last().unwrap().terminator, Terminator::Return(0));
}

#[test]
fn lowering_errors() {
    let table = SymbolTable::new();

    let tac = vec![label(0), Instruction::op1(Opcode::Print, Operand::Temporary(5))];
    assert_eq!(lower(tac, &table), Err(LoweringError::UnboundTemporary(5)));

    let tac = vec![label(0), Instruction::op1(Opcode::Goto, Operand::Label(9))];
    assert_eq!(lower(tac, &table), Err(LoweringError::UnboundLabel(9)));

    let tac = vec![label(0), label(0)];
    assert_eq!(lower(tac, &table), Err(LoweringError::DuplicateLabel(0)));

    let tac = vec![
        label(0),
        Instruction::op1(Opcode::Print, Operand::VariableRef("y".to_string())),
    ];
    assert_eq!(
        lower(tac, &table),
        Err(LoweringError::UnboundVariable("y".to_string()))
    );

    let tac = vec![
        label(0),
        Instruction::op3(
            Opcode::Sub,
            Operand::Temporary(0),
            Operand::ImmediateString("a".to_string()),
            Operand::Immediate(1),
        ),
    ];
    assert!(matches!(
        lower(tac, &table),
        Err(LoweringError::UnsupportedOpcode { .. })
    ));
}

#[test]
fn symbol_without_machine_type() {
    let mut table = SymbolTable::new();
    table.declare("bad", Ty::Error, Position::new(1, 0)).unwrap();
    assert_eq!(
        lower(vec![label(0)], &table),
        Err(LoweringError::UnknownType {
            name: "bad".to_string(),
            ty: Ty::Error,
        })
    );
}
