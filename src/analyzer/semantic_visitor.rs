use crate::lexer::Position;
use crate::parser::{BinOpKind, Block, Expr, ExprKind, Identifier, Program, Stmt, StmtKind};

use super::{ScopeError, SemanticError, SymbolTable, Ty, TypedValue};

/// Type-checks a program in one pass.
///
/// The visitor only owns the diagnostics; the scope stack is the
/// `SymbolTable` passed down through every call. Errors never stop the
/// traversal, so a single run reports everything it can find.
#[derive(Debug, Default)]
pub struct SemanticVisitor {
    errors: Vec<SemanticError>,
}

impl SemanticVisitor {
    pub fn new() -> Self {
        Self { errors: vec![] }
    }

    /// Diagnostics sorted by source position.
    pub fn into_errors(mut self) -> Vec<SemanticError> {
        self.errors.sort_by_key(|e| e.pos());
        self.errors
    }

    fn report(&mut self, error: SemanticError) {
        self.errors.push(error);
    }

    pub fn visit_program(&mut self, table: &mut SymbolTable, program: &Program) {
        for stmt in program.0.iter() {
            self.visit_stmt(table, stmt);
        }
    }

    pub fn visit_stmt(&mut self, table: &mut SymbolTable, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::VarDecl { name, ty, init } => {
                self.visit_var_decl(table, name, (*ty).into(), init)
            }
            StmtKind::Assign { target, value } => self.visit_assign(table, target, value),
            StmtKind::ReadLine { target } => self.visit_read_line(table, target),
            StmtKind::Println(expr) => {
                self.visit_expr(table, expr);
            }
            StmtKind::If {
                cond,
                then_block,
                else_block,
            } => {
                self.visit_condition(table, cond);
                self.visit_block(table, then_block);
                if let Some(else_block) = else_block {
                    self.visit_block(table, else_block);
                }
            }
            StmtKind::While { cond, body } => {
                self.visit_condition(table, cond);
                self.visit_block(table, body);
            }
            StmtKind::Pog => (),
        }
    }

    fn visit_block(&mut self, table: &mut SymbolTable, block: &Block) {
        table.enter_scope();
        for stmt in block.0.iter() {
            self.visit_stmt(table, stmt);
        }
        if let Err(err) = table.exit_scope() {
            unreachable!("block scope was pushed above: {}", err);
        }
    }

    fn visit_var_decl(&mut self, table: &mut SymbolTable, name: &Identifier, ty: Ty, init: &Expr) {
        if let Err(err) = table.declare(&name.name, ty, name.pos) {
            let previous = match err {
                ScopeError::DuplicateDeclaration { previous, .. } => previous,
                err => unreachable!("declare only fails on duplicates: {}", err),
            };
            self.report(SemanticError::DuplicateDeclaration {
                name: name.name.clone(),
                pos: name.pos,
                previous,
            });
            // the rejected declaration has no type to check against
            self.visit_expr(table, init);
            return;
        }

        let init = self.visit_expr(table, init);
        if !ty.is_compatible(&init.ty) {
            self.report(SemanticError::TypeMismatch {
                expected: ty,
                found: init.ty,
                pos: init.pos,
            });
        }
    }

    fn visit_assign(&mut self, table: &mut SymbolTable, target: &Identifier, value: &Expr) {
        let target_ty = self.visit_ident(table, target);
        let value = self.visit_expr(table, value);

        if let Some(expected) = target_ty {
            if !expected.is_compatible(&value.ty) {
                self.report(SemanticError::TypeMismatch {
                    expected,
                    found: value.ty,
                    pos: value.pos,
                });
            }
        }
    }

    fn visit_read_line(&mut self, table: &mut SymbolTable, target: &Identifier) {
        let Some(ty) = self.visit_ident(table, target) else {
            return;
        };
        if !ty.is_compatible(&Ty::String) {
            self.report(SemanticError::ReadTargetTypeMismatch {
                name: target.name.clone(),
                found: ty,
                pos: target.pos,
            });
        }
    }

    fn visit_condition(&mut self, table: &mut SymbolTable, cond: &Expr) {
        let cond = self.visit_expr(table, cond);
        if !cond.ty.is_int_like() {
            self.report(SemanticError::InvalidConditionType {
                found: cond.ty,
                pos: cond.pos,
            });
        }
    }

    /// Resolves an identifier and binds its position to the symbol.
    fn visit_ident(&mut self, table: &mut SymbolTable, ident: &Identifier) -> Option<Ty> {
        match table.lookup(&ident.name) {
            Ok(symbol) => {
                let (id, ty) = (symbol.id, symbol.ty);
                table.bind(ident.pos, id);
                Some(ty)
            }
            Err(_) => {
                self.report(SemanticError::Undeclared {
                    name: ident.name.clone(),
                    pos: ident.pos,
                });
                None
            }
        }
    }

    pub fn visit_expr(&mut self, table: &mut SymbolTable, expr: &Expr) -> TypedValue {
        match &expr.kind {
            ExprKind::Binary(kind, lhs, rhs) => self.visit_binary(table, *kind, lhs, rhs, expr.pos),
            ExprKind::Not(operand) => {
                let operand = self.visit_expr(table, operand);
                if operand.ty.is_int_like() {
                    TypedValue::new(Ty::Int, expr.pos)
                } else {
                    self.report(SemanticError::InvalidOperandType {
                        op: "!".to_string(),
                        operands: vec![operand.ty],
                        pos: expr.pos,
                    });
                    TypedValue::error(expr.pos)
                }
            }
            ExprKind::Num(n) => TypedValue {
                ty: Ty::Int,
                pos: expr.pos,
                value: Some(*n),
            },
            ExprKind::Str(_) => TypedValue::new(Ty::String, expr.pos),
            ExprKind::Ident(ident) => match self.visit_ident(table, ident) {
                Some(ty) => TypedValue::new(ty, expr.pos),
                None => TypedValue::error(expr.pos),
            },
            ExprKind::Paren(inner) => self.visit_expr(table, inner),
        }
    }

    fn visit_binary(
        &mut self,
        table: &mut SymbolTable,
        kind: BinOpKind,
        lhs: &Expr,
        rhs: &Expr,
        pos: Position,
    ) -> TypedValue {
        let lhs = self.visit_expr(table, lhs);
        let rhs = self.visit_expr(table, rhs);

        match kind {
            BinOpKind::Equal | BinOpKind::NotEqual => {
                if !lhs.ty.is_compatible(&rhs.ty) {
                    self.report(SemanticError::TypeMismatch {
                        expected: lhs.ty,
                        found: rhs.ty,
                        pos,
                    });
                    return TypedValue::error(pos);
                }
                TypedValue::new(Ty::Int, pos)
            }
            BinOpKind::Add if lhs.ty == Ty::String || rhs.ty == Ty::String => {
                TypedValue::new(Ty::String, pos)
            }
            BinOpKind::Add if lhs.ty == Ty::Error || rhs.ty == Ty::Error => TypedValue::error(pos),
            BinOpKind::LogicalOr
            | BinOpKind::LogicalAnd
            | BinOpKind::LessThan
            | BinOpKind::LessEqual
            | BinOpKind::GreaterThan
            | BinOpKind::GreaterEqual
            | BinOpKind::Add
            | BinOpKind::Sub
            | BinOpKind::Mul
            | BinOpKind::Div => {
                if lhs.ty.is_int_like() && rhs.ty.is_int_like() {
                    return TypedValue::new(Ty::Int, pos);
                }
                self.report(SemanticError::InvalidOperandType {
                    op: kind.to_string(),
                    operands: vec![lhs.ty, rhs.ty],
                    pos,
                });
                TypedValue::error(pos)
            }
        }
    }
}
