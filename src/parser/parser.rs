use thiserror::Error;

use crate::lexer::{Position, Token, TokenKind};

use super::{BinOpKind, Block, Expr, ExprKind, Identifier, Program, Stmt, StmtKind, TypeName};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("SyntaxError [{pos}]: {message}")]
pub struct ParseError {
    pub pos: Position,
    pub message: String,
}

type ParseResult<T> = Result<T, ParseError>;

const OR_OPS: &[(TokenKind, BinOpKind)] = &[(TokenKind::LogicalOr, BinOpKind::LogicalOr)];
const AND_OPS: &[(TokenKind, BinOpKind)] = &[(TokenKind::LogicalAnd, BinOpKind::LogicalAnd)];
const EQUALITY_OPS: &[(TokenKind, BinOpKind)] = &[
    (TokenKind::DoubleEqual, BinOpKind::Equal),
    (TokenKind::NotEqual, BinOpKind::NotEqual),
];
const RELATIONAL_OPS: &[(TokenKind, BinOpKind)] = &[
    (TokenKind::LessThan, BinOpKind::LessThan),
    (TokenKind::LessEqual, BinOpKind::LessEqual),
    (TokenKind::GreaterThan, BinOpKind::GreaterThan),
    (TokenKind::GreaterEqual, BinOpKind::GreaterEqual),
];
const ADDITIVE_OPS: &[(TokenKind, BinOpKind)] = &[
    (TokenKind::Plus, BinOpKind::Add),
    (TokenKind::Minus, BinOpKind::Sub),
];
const MULTIPLICATIVE_OPS: &[(TokenKind, BinOpKind)] = &[
    (TokenKind::Star, BinOpKind::Mul),
    (TokenKind::Slash, BinOpKind::Div),
];

#[derive(Debug)]
pub struct Parser {
    tokens: Vec<Token>,
    index: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, index: 0 }
    }

    pub fn parse(&mut self) -> ParseResult<Program> {
        self.parse_program()
    }

    fn is_eof(&self) -> bool {
        self.index >= self.tokens.len()
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.index).map(|t| &t.kind)
    }

    fn peek_nth(&self, n: usize) -> Option<&TokenKind> {
        self.tokens.get(self.index + n).map(|t| &t.kind)
    }

    /// Position of the next token, or just past the last one at EOF.
    fn current_pos(&self) -> Position {
        match self.tokens.get(self.index) {
            Some(t) => t.pos,
            None => self
                .tokens
                .last()
                .map(|t| Position::new(t.pos.line, t.pos.column + 1))
                .unwrap_or(Position::new(1, 0)),
        }
    }

    fn error<T>(&self, expected: &str) -> ParseResult<T> {
        let message = match self.peek() {
            Some(kind) => format!("unexpected token '{}', expected {}", kind, expected),
            None => format!("unexpected end of input, expected {}", expected),
        };
        Err(ParseError {
            pos: self.current_pos(),
            message,
        })
    }

    fn consume(&mut self, kind: &TokenKind) -> bool {
        if self.peek() != Some(kind) {
            return false;
        }
        self.index += 1;
        true
    }

    fn expect(&mut self, kind: &TokenKind) -> ParseResult<Position> {
        let pos = self.current_pos();
        if !self.consume(kind) {
            return self.error(&format!("'{}'", kind));
        }
        Ok(pos)
    }

    fn expect_ident(&mut self) -> ParseResult<Identifier> {
        let pos = self.current_pos();
        if let Some(TokenKind::Ident(name)) = self.peek() {
            let name = name.clone();
            self.index += 1;
            return Ok(Identifier { name, pos });
        }
        self.error("identifier")
    }

    /// program = stmt*
    fn parse_program(&mut self) -> ParseResult<Program> {
        let mut stmts = vec![];

        while !self.is_eof() {
            stmts.push(self.parse_stmt()?);
        }

        Ok(Program(stmts))
    }

    /// block = "{" stmt* "}"
    fn parse_block(&mut self) -> ParseResult<Block> {
        self.expect(&TokenKind::OpenCurlyBrace)?;
        let mut stmts = vec![];
        while !self.consume(&TokenKind::CloseCurlyBrace) {
            if self.is_eof() {
                return self.error("'}'");
            }
            stmts.push(self.parse_stmt()?);
        }
        Ok(Block(stmts))
    }

    /// stmt = "var" ident ":" type "=" expr ";"
    ///      | ident "=" "readLine" "(" ")" ";"
    ///      | ident "=" expr ";"
    ///      | "println" "(" expr ")" ";"
    ///      | "if" "(" expr ")" block ("else" block)?
    ///      | "while" "(" expr ")" block
    ///      | "pog" ";"
    fn parse_stmt(&mut self) -> ParseResult<Stmt> {
        let pos = self.current_pos();

        let kind = if self.consume(&TokenKind::Var) {
            let name = self.expect_ident()?;
            self.expect(&TokenKind::Colon)?;
            let ty = self.parse_type()?;
            self.expect(&TokenKind::Equal)?;
            let init = self.parse_expr()?;
            self.expect(&TokenKind::SemiColon)?;
            StmtKind::VarDecl { name, ty, init }
        } else if self.consume(&TokenKind::Println) {
            self.expect(&TokenKind::OpenParen)?;
            let expr = self.parse_expr()?;
            self.expect(&TokenKind::CloseParen)?;
            self.expect(&TokenKind::SemiColon)?;
            StmtKind::Println(expr)
        } else if self.consume(&TokenKind::If) {
            self.expect(&TokenKind::OpenParen)?;
            let cond = self.parse_expr()?;
            self.expect(&TokenKind::CloseParen)?;
            let then_block = self.parse_block()?;
            let else_block = if self.consume(&TokenKind::Else) {
                Some(self.parse_block()?)
            } else {
                None
            };
            StmtKind::If {
                cond,
                then_block,
                else_block,
            }
        } else if self.consume(&TokenKind::While) {
            self.expect(&TokenKind::OpenParen)?;
            let cond = self.parse_expr()?;
            self.expect(&TokenKind::CloseParen)?;
            let body = self.parse_block()?;
            StmtKind::While { cond, body }
        } else if self.consume(&TokenKind::Pog) {
            self.expect(&TokenKind::SemiColon)?;
            StmtKind::Pog
        } else if matches!(self.peek(), Some(TokenKind::Ident(_))) {
            let target = self.expect_ident()?;
            self.expect(&TokenKind::Equal)?;
            if self.peek() == Some(&TokenKind::ReadLine)
                && self.peek_nth(1) == Some(&TokenKind::OpenParen)
            {
                self.index += 1;
                self.expect(&TokenKind::OpenParen)?;
                self.expect(&TokenKind::CloseParen)?;
                self.expect(&TokenKind::SemiColon)?;
                StmtKind::ReadLine { target }
            } else {
                let value = self.parse_expr()?;
                self.expect(&TokenKind::SemiColon)?;
                StmtKind::Assign { target, value }
            }
        } else {
            return self.error("statement");
        };

        Ok(Stmt { kind, pos })
    }

    /// type = "Int" | "String"
    fn parse_type(&mut self) -> ParseResult<TypeName> {
        if self.consume(&TokenKind::IntType) {
            Ok(TypeName::Int)
        } else if self.consume(&TokenKind::StringType) {
            Ok(TypeName::String)
        } else {
            self.error("type 'Int' or 'String'")
        }
    }

    /// expr = or
    pub fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.parse_or()
    }

    fn parse_binary(
        &mut self,
        ops: &[(TokenKind, BinOpKind)],
        next: fn(&mut Self) -> ParseResult<Expr>,
    ) -> ParseResult<Expr> {
        let mut node = next(self)?;

        'outer: loop {
            for (token, kind) in ops {
                let pos = self.current_pos();
                if self.consume(token) {
                    let rhs = next(self)?;
                    node = Expr {
                        kind: ExprKind::Binary(*kind, Box::new(node), Box::new(rhs)),
                        pos,
                    };
                    continue 'outer;
                }
            }
            return Ok(node);
        }
    }

    /// or = and ("||" and)*
    fn parse_or(&mut self) -> ParseResult<Expr> {
        self.parse_binary(OR_OPS, Self::parse_and)
    }

    /// and = equality ("&&" equality)*
    fn parse_and(&mut self) -> ParseResult<Expr> {
        self.parse_binary(AND_OPS, Self::parse_equality)
    }

    /// equality = relational ("==" relational | "!=" relational)*
    fn parse_equality(&mut self) -> ParseResult<Expr> {
        self.parse_binary(EQUALITY_OPS, Self::parse_relational)
    }

    /// relational = add ("<" add | "<=" add | ">" add | ">=" add)*
    fn parse_relational(&mut self) -> ParseResult<Expr> {
        self.parse_binary(RELATIONAL_OPS, Self::parse_add)
    }

    /// add = mul ("+" mul | "-" mul)*
    fn parse_add(&mut self) -> ParseResult<Expr> {
        self.parse_binary(ADDITIVE_OPS, Self::parse_mul)
    }

    /// mul = unary ("*" unary | "/" unary)*
    fn parse_mul(&mut self) -> ParseResult<Expr> {
        self.parse_binary(MULTIPLICATIVE_OPS, Self::parse_unary)
    }

    /// unary = "!" unary | primary
    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let pos = self.current_pos();
        if self.consume(&TokenKind::Bang) {
            let operand = self.parse_unary()?;
            return Ok(Expr {
                kind: ExprKind::Not(Box::new(operand)),
                pos,
            });
        }
        self.parse_primary()
    }

    /// primary = num | str | ident | "(" expr ")"
    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let pos = self.current_pos();

        let kind = match self.peek().cloned() {
            Some(TokenKind::Num(n)) => {
                self.index += 1;
                ExprKind::Num(n)
            }
            Some(TokenKind::Str(s)) => {
                self.index += 1;
                ExprKind::Str(s)
            }
            Some(TokenKind::Ident(name)) => {
                self.index += 1;
                ExprKind::Ident(Identifier { name, pos })
            }
            Some(TokenKind::OpenParen) => {
                self.index += 1;
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::CloseParen)?;
                ExprKind::Paren(Box::new(expr))
            }
            _ => return self.error("expression"),
        };

        Ok(Expr { kind, pos })
    }
}
