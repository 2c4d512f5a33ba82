use crate::lexer::Position;

use super::{Expr, Identifier};

#[derive(Clone, Debug, PartialEq)]
pub struct Program(pub Vec<Stmt>);

#[derive(Clone, Debug, PartialEq)]
pub struct Block(pub Vec<Stmt>);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeName {
    Int,
    String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub pos: Position,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    /// `var name: ty = init;`
    VarDecl {
        name: Identifier,
        ty: TypeName,
        init: Expr,
    },
    /// `target = value;`
    Assign { target: Identifier, value: Expr },
    /// `target = readLine();`
    ReadLine { target: Identifier },
    Println(Expr),
    If {
        cond: Expr,
        then_block: Block,
        else_block: Option<Block>,
    },
    While { cond: Expr, body: Block },
    /// `pog;`
    Pog,
}
