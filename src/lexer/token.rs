use std::fmt;

use phf::phf_map;

pub static KEYWORDS: phf::Map<&str, TokenKind> = phf_map! {
    "var" => TokenKind::Var,
    "Int" => TokenKind::IntType,
    "String" => TokenKind::StringType,
    "println" => TokenKind::Println,
    "readLine" => TokenKind::ReadLine,
    "if" => TokenKind::If,
    "else" => TokenKind::Else,
    "while" => TokenKind::While,
    "pog" => TokenKind::Pog,
};

pub static TWO_SYMBOLS_TOKENS: phf::Map<&str, TokenKind> = phf_map! {
    "||" => TokenKind::LogicalOr,
    "&&" => TokenKind::LogicalAnd,
    "==" => TokenKind::DoubleEqual,
    "!=" => TokenKind::NotEqual,
    "<=" => TokenKind::LessEqual,
    ">=" => TokenKind::GreaterEqual,
    "//" => TokenKind::LineComment,
};

pub static ONE_SYMBOL_TOKENS: phf::Map<char, TokenKind> = phf_map! {
    '+' => TokenKind::Plus,
    '-' => TokenKind::Minus,
    '*' => TokenKind::Star,
    '/' => TokenKind::Slash,
    '!' => TokenKind::Bang,
    '<' => TokenKind::LessThan,
    '>' => TokenKind::GreaterThan,
    '=' => TokenKind::Equal,
    '(' => TokenKind::OpenParen,
    ')' => TokenKind::CloseParen,
    '{' => TokenKind::OpenCurlyBrace,
    '}' => TokenKind::CloseCurlyBrace,
    ':' => TokenKind::Colon,
    ';' => TokenKind::SemiColon,
};

/// Source location of a token: 1-based line, 0-based column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line {}, Column {}", self.line, self.column)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Num(i32),
    Str(String),
    Ident(String),

    Var,
    IntType,
    StringType,
    Println,
    ReadLine,
    If,
    Else,
    While,
    Pog,

    LogicalOr,
    LogicalAnd,
    DoubleEqual,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,

    Plus,
    Minus,
    Star,
    Slash,
    Bang,

    Equal,
    OpenParen,
    CloseParen,
    OpenCurlyBrace,
    CloseCurlyBrace,
    Colon,
    SemiColon,

    LineComment,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::Num(n) => return write!(f, "{}", n),
            TokenKind::Str(s) => return write!(f, "\"{}\"", s),
            TokenKind::Ident(name) => return write!(f, "{}", name),
            TokenKind::Var => "var",
            TokenKind::IntType => "Int",
            TokenKind::StringType => "String",
            TokenKind::Println => "println",
            TokenKind::ReadLine => "readLine",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::While => "while",
            TokenKind::Pog => "pog",
            TokenKind::LogicalOr => "||",
            TokenKind::LogicalAnd => "&&",
            TokenKind::DoubleEqual => "==",
            TokenKind::NotEqual => "!=",
            TokenKind::LessThan => "<",
            TokenKind::LessEqual => "<=",
            TokenKind::GreaterThan => ">",
            TokenKind::GreaterEqual => ">=",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Bang => "!",
            TokenKind::Equal => "=",
            TokenKind::OpenParen => "(",
            TokenKind::CloseParen => ")",
            TokenKind::OpenCurlyBrace => "{",
            TokenKind::CloseCurlyBrace => "}",
            TokenKind::Colon => ":",
            TokenKind::SemiColon => ";",
            TokenKind::LineComment => "//",
        };
        f.write_str(s)
    }
}
