use pogc::lexer::{LexError, Lexer, Position, TokenKind};
use pogc::parser::*;

fn parse_expr(input: &str) -> Expr {
    let tokens = Lexer::tokenize(input).unwrap();
    let mut parser = Parser::new(tokens);
    parser.parse_expr().unwrap()
}

fn kinds(input: &str) -> Vec<TokenKind> {
    Lexer::tokenize(input)
        .unwrap()
        .into_iter()
        .map(|t| t.kind)
        .collect()
}

#[test]
fn tokenize_declaration() {
    assert_eq!(
        kinds("var x: Int = 42;"),
        vec![
            TokenKind::Var,
            TokenKind::Ident("x".to_string()),
            TokenKind::Colon,
            TokenKind::IntType,
            TokenKind::Equal,
            TokenKind::Num(42),
            TokenKind::SemiColon,
        ]
    );
}

#[test]
fn tokenize_two_symbol_operators() {
    assert_eq!(
        kinds("a <= b != c || !d"),
        vec![
            TokenKind::Ident("a".to_string()),
            TokenKind::LessEqual,
            TokenKind::Ident("b".to_string()),
            TokenKind::NotEqual,
            TokenKind::Ident("c".to_string()),
            TokenKind::LogicalOr,
            TokenKind::Bang,
            TokenKind::Ident("d".to_string()),
        ]
    );
}

#[test]
fn token_positions() {
    let tokens = Lexer::tokenize("pog;\n  println(\"hi\");").unwrap();
    assert_eq!(tokens[0].pos, Position::new(1, 0));
    assert_eq!(tokens[1].pos, Position::new(1, 3));
    assert_eq!(tokens[2].pos, Position::new(2, 2));
    assert_eq!(tokens[4].kind, TokenKind::Str("hi".to_string()));
    assert_eq!(tokens[4].pos, Position::new(2, 10));
}

#[test]
fn comments_are_skipped() {
    assert_eq!(
        kinds("pog; // println(1);\npog;"),
        vec![
            TokenKind::Pog,
            TokenKind::SemiColon,
            TokenKind::Pog,
            TokenKind::SemiColon,
        ]
    );
}

#[test]
fn lex_errors() {
    assert_eq!(
        Lexer::tokenize("var s: String = \"abc;\n"),
        Err(LexError::UnterminatedString {
            pos: Position::new(1, 16)
        })
    );
    assert_eq!(
        Lexer::tokenize("x = 2147483648;"),
        Err(LexError::IntegerOutOfRange {
            literal: "2147483648".to_string(),
            pos: Position::new(1, 4)
        })
    );
    assert_eq!(
        Lexer::tokenize("x = 1 % 2;"),
        Err(LexError::UnexpectedChar {
            ch: '%',
            pos: Position::new(1, 6)
        })
    );
}

#[test]
fn multiplication_binds_tighter() {
    let expr = parse_expr("1 + 2 * 3");
    let ExprKind::Binary(BinOpKind::Add, lhs, rhs) = expr.kind else {
        panic!();
    };
    assert_eq!(lhs.kind, ExprKind::Num(1));
    let ExprKind::Binary(BinOpKind::Mul, _, _) = rhs.kind else {
        panic!();
    };
}

#[test]
fn binary_operators_are_left_associative() {
    let expr = parse_expr("1 - 2 - 3");
    let ExprKind::Binary(BinOpKind::Sub, lhs, rhs) = expr.kind else {
        panic!();
    };
    assert_eq!(rhs.kind, ExprKind::Num(3));
    let ExprKind::Binary(BinOpKind::Sub, l, r) = lhs.kind else {
        panic!();
    };
    assert_eq!(l.kind, ExprKind::Num(1));
    assert_eq!(r.kind, ExprKind::Num(2));
}

#[test]
fn logical_operator_precedence() {
    let expr = parse_expr("a || b && c == d");
    assert_eq!(expr.pos, Position::new(1, 2));
    let ExprKind::Binary(BinOpKind::LogicalOr, _, rhs) = expr.kind else {
        panic!();
    };
    let ExprKind::Binary(BinOpKind::LogicalAnd, _, rhs) = rhs.kind else {
        panic!();
    };
    let ExprKind::Binary(BinOpKind::Equal, _, _) = rhs.kind else {
        panic!();
    };
}

#[test]
fn parse_statements() {
    let program = pogc::parse(
        "var s: String = \"\";
s = readLine();
if (1) { pog; } else { s = \"x\"; }
while (0) { println(s); }",
    )
    .unwrap();
    assert_eq!(program.0.len(), 4);

    let StmtKind::VarDecl { name, ty, .. } = &program.0[0].kind else {
        panic!();
    };
    assert_eq!(name.name, "s");
    assert_eq!(*ty, TypeName::String);

    let StmtKind::ReadLine { target } = &program.0[1].kind else {
        panic!();
    };
    assert_eq!(target.pos, Position::new(2, 0));

    let StmtKind::If {
        then_block,
        else_block: Some(else_block),
        ..
    } = &program.0[2].kind
    else {
        panic!();
    };
    assert_eq!(then_block.0[0].kind, StmtKind::Pog);
    assert_eq!(else_block.0.len(), 1);

    let StmtKind::While { body, .. } = &program.0[3].kind else {
        panic!();
    };
    assert!(matches!(body.0[0].kind, StmtKind::Println(_)));
}

#[test]
fn missing_semicolon_is_a_syntax_error() {
    let tokens = Lexer::tokenize("var x: Int = 1\nprintln(x);").unwrap();
    let err = Parser::new(tokens).parse().unwrap_err();
    assert_eq!(err.pos, Position::new(2, 0));
    assert!(err.to_string().starts_with("SyntaxError [Line 2, Column 0]"));
}

#[test]
fn unclosed_block_is_a_syntax_error() {
    let tokens = Lexer::tokenize("while (1) { pog;").unwrap();
    assert!(Parser::new(tokens).parse().is_err());
}
