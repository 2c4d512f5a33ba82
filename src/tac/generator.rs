use crate::analyzer::SymbolTable;
use crate::parser::{BinOpKind, Block, Expr, ExprKind, Identifier, Program, Stmt, StmtKind};

use super::{Instruction, Opcode, Operand};

/// Linearizes a checked program into three-address code.
///
/// Temporaries and labels come from counters that only grow, so every
/// `@n` and `$n` is defined exactly once.
pub struct TacGenerator<'a> {
    symbol_table: &'a SymbolTable,
    instructions: Vec<Instruction>,
    temp_index: usize,
    label_index: usize,
}

impl<'a> TacGenerator<'a> {
    pub fn new(symbol_table: &'a SymbolTable) -> Self {
        Self {
            symbol_table,
            instructions: vec![],
            temp_index: 0,
            label_index: 0,
        }
    }

    pub fn generate(mut self, program: &Program) -> Vec<Instruction> {
        self.gen_program(program);
        self.instructions
    }

    fn new_temp(&mut self) -> Operand {
        let t = Operand::Temporary(self.temp_index);
        self.temp_index += 1;
        t
    }

    fn new_label(&mut self) -> Operand {
        let l = Operand::Label(self.label_index);
        self.label_index += 1;
        l
    }

    fn emit(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// Storage slot the analyzer bound this identifier to.
    fn variable(&self, ident: &Identifier) -> Operand {
        match self.symbol_table.resolve(ident.pos) {
            Some(symbol) => Operand::VariableRef(symbol.slot.clone()),
            None => Operand::VariableRef(ident.name.clone()),
        }
    }

    fn gen_program(&mut self, program: &Program) {
        let start = self.new_label();
        self.emit(Instruction::op1(Opcode::Label, start));
        for stmt in program.0.iter() {
            self.gen_stmt(stmt);
        }
        self.emit(Instruction::op0(Opcode::Exit));
    }

    fn gen_block(&mut self, block: &Block) {
        for stmt in block.0.iter() {
            self.gen_stmt(stmt);
        }
    }

    fn gen_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::VarDecl { name, init, .. } => self.gen_assign(name, init),
            StmtKind::Assign { target, value } => self.gen_assign(target, value),
            StmtKind::ReadLine { target } => {
                let dest = self.variable(target);
                self.emit(Instruction::op1(Opcode::Read, dest));
            }
            StmtKind::Println(expr) => {
                let value = self.gen_expr(expr);
                self.emit(Instruction::op1(Opcode::Print, value));
            }
            StmtKind::If {
                cond,
                then_block,
                else_block,
            } => self.gen_if(cond, then_block, else_block.as_ref()),
            StmtKind::While { cond, body } => self.gen_while(cond, body),
            StmtKind::Pog => self.emit(Instruction::op0(Opcode::Nop)),
        }
    }

    fn gen_assign(&mut self, target: &Identifier, value: &Expr) {
        let value = self.gen_expr(value);
        let dest = self.variable(target);
        self.emit(Instruction::op2(Opcode::Assign, dest, value));
    }

    fn gen_if(&mut self, cond: &Expr, then_block: &Block, else_block: Option<&Block>) {
        let cond = self.gen_expr(cond);

        let then_label = self.new_label();
        let else_label = self.new_label();
        let end_label = self.new_label();

        self.emit(Instruction::op2(Opcode::IfTrue, cond, then_label.clone()));
        self.emit(Instruction::op1(Opcode::Goto, else_label.clone()));

        self.emit(Instruction::op1(Opcode::Label, then_label));
        self.gen_block(then_block);
        self.emit(Instruction::op1(Opcode::Goto, end_label.clone()));

        self.emit(Instruction::op1(Opcode::Label, else_label));
        if let Some(else_block) = else_block {
            self.gen_block(else_block);
        }
        self.emit(Instruction::op1(Opcode::Label, end_label));
    }

    fn gen_while(&mut self, cond: &Expr, body: &Block) {
        let start_label = self.new_label();
        let body_label = self.new_label();
        let end_label = self.new_label();

        self.emit(Instruction::op1(Opcode::Label, start_label.clone()));
        let cond = self.gen_expr(cond);
        self.emit(Instruction::op2(Opcode::IfTrue, cond, body_label.clone()));
        self.emit(Instruction::op1(Opcode::Goto, end_label.clone()));

        self.emit(Instruction::op1(Opcode::Label, body_label));
        self.gen_block(body);
        self.emit(Instruction::op1(Opcode::Goto, start_label));
        self.emit(Instruction::op1(Opcode::Label, end_label));
    }

    /// Emits the code computing `expr` and returns the operand holding it.
    fn gen_expr(&mut self, expr: &Expr) -> Operand {
        match &expr.kind {
            ExprKind::Binary(kind, lhs, rhs) => {
                let lhs = self.gen_expr(lhs);
                let rhs = self.gen_expr(rhs);
                let dest = self.new_temp();
                self.emit(Instruction::op3(bin_opcode(*kind), dest.clone(), lhs, rhs));
                dest
            }
            ExprKind::Not(operand) => {
                let operand = self.gen_expr(operand);
                let dest = self.new_temp();
                self.emit(Instruction::op2(Opcode::Not, dest.clone(), operand));
                dest
            }
            ExprKind::Num(n) => Operand::Immediate(*n),
            ExprKind::Str(s) => Operand::ImmediateString(s.clone()),
            ExprKind::Ident(ident) => self.variable(ident),
            ExprKind::Paren(inner) => self.gen_expr(inner),
        }
    }
}

fn bin_opcode(kind: BinOpKind) -> Opcode {
    match kind {
        BinOpKind::LogicalOr => Opcode::Or,
        BinOpKind::LogicalAnd => Opcode::And,
        BinOpKind::Equal => Opcode::Eq,
        BinOpKind::NotEqual => Opcode::Neq,
        BinOpKind::LessThan => Opcode::Lt,
        BinOpKind::LessEqual => Opcode::Lte,
        BinOpKind::GreaterThan => Opcode::Gt,
        BinOpKind::GreaterEqual => Opcode::Gte,
        BinOpKind::Add => Opcode::Add,
        BinOpKind::Sub => Opcode::Sub,
        BinOpKind::Mul => Opcode::Mul,
        BinOpKind::Div => Opcode::Div,
    }
}
