use thiserror::Error;

use super::{
    token::{KEYWORDS, ONE_SYMBOL_TOKENS, TWO_SYMBOLS_TOKENS},
    Position, TokenKind,
};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("LexicalError [{pos}]: unexpected character '{ch}'")]
    UnexpectedChar { ch: char, pos: Position },
    #[error("LexicalError [{pos}]: unterminated string literal")]
    UnterminatedString { pos: Position },
    #[error("LexicalError [{pos}]: integer literal {literal} does not fit in 32 bits")]
    IntegerOutOfRange { literal: String, pos: Position },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: Position,
}

#[derive(Debug)]
pub struct Lexer {
    tokens: Vec<Token>,
    index: usize,
    line: usize,
    line_start: usize,
}

impl Lexer {
    fn new() -> Self {
        Self {
            tokens: vec![],
            index: 0,
            line: 1,
            line_start: 0,
        }
    }

    fn pos(&self) -> Position {
        Position::new(self.line, self.index - self.line_start)
    }

    fn new_token(&mut self, kind: TokenKind, len: usize) {
        let pos = self.pos();
        self.tokens.push(Token { kind, pos });
        self.index += len;
    }

    fn newline(&mut self) {
        self.index += 1;
        self.line += 1;
        self.line_start = self.index;
    }

    fn parse_number(&mut self, chars: &[char]) -> Result<(), LexError> {
        let s: String = chars.iter().take_while(|c| c.is_ascii_digit()).collect();
        let Ok(value) = s.parse() else {
            return Err(LexError::IntegerOutOfRange {
                literal: s,
                pos: self.pos(),
            });
        };
        let len = s.len();
        self.new_token(TokenKind::Num(value), len);
        Ok(())
    }

    fn parse_identifier(&mut self, chars: &[char]) {
        let s: String = chars
            .iter()
            .take_while(|&&c| c.is_ascii_alphanumeric() || c == '_')
            .collect();
        let len = s.chars().count();

        if let Some(kind) = KEYWORDS.get(s.as_str()) {
            self.new_token(kind.clone(), len);
        } else {
            self.new_token(TokenKind::Ident(s), len);
        }
    }

    fn parse_string(&mut self, chars: &[char]) -> Result<(), LexError> {
        // chars[0] is the opening quote
        let Some(end) = chars[1..].iter().position(|&c| c == '"' || c == '\n') else {
            return Err(LexError::UnterminatedString { pos: self.pos() });
        };
        if chars[end + 1] == '\n' {
            return Err(LexError::UnterminatedString { pos: self.pos() });
        }

        let s: String = chars[1..end + 1].iter().collect();
        self.new_token(TokenKind::Str(s), end + 2);
        Ok(())
    }

    fn skip_line_comment(&mut self, chars: &[char]) {
        self.index += chars.iter().take_while(|&&c| c != '\n').count();
    }

    fn _tokenize(&mut self, s: &str) -> Result<(), LexError> {
        let chars: Vec<_> = s.chars().collect();

        while self.index < chars.len() {
            let c = chars[self.index];
            let c2 = chars[self.index..].iter().take(2).collect::<String>();

            if c == '\n' {
                self.newline();
            } else if c.is_whitespace() {
                self.index += 1;
            } else if c.is_ascii_digit() {
                self.parse_number(&chars[self.index..])?;
            } else if c.is_ascii_alphabetic() || c == '_' {
                self.parse_identifier(&chars[self.index..]);
            } else if c == '"' {
                self.parse_string(&chars[self.index..])?;
            } else if let Some(kind) = TWO_SYMBOLS_TOKENS.get(c2.as_str()) {
                if *kind == TokenKind::LineComment {
                    self.skip_line_comment(&chars[self.index..]);
                } else {
                    self.new_token(kind.clone(), 2);
                }
            } else if let Some(kind) = ONE_SYMBOL_TOKENS.get(&c) {
                self.new_token(kind.clone(), 1);
            } else {
                return Err(LexError::UnexpectedChar {
                    ch: c,
                    pos: self.pos(),
                });
            }
        }

        Ok(())
    }

    pub fn tokenize(s: &str) -> Result<Vec<Token>, LexError> {
        let mut lexer = Lexer::new();
        lexer._tokenize(s)?;

        Ok(lexer.tokens)
    }
}
