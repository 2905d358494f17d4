//! Tokenizer for derived-column expressions.
//!
//! The token set is deliberately wider than the accepted grammar: operators
//! such as `.`, `[`, `==` or `and` are recognised so the parser can build a
//! tree for them and the checker can reject them by name.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Ident(String),
    Str(String),
    Keyword(Keyword),

    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    SlashSlash,
    Percent,
    Tilde,
    Amp,
    Pipe,
    Caret,

    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    NotEq,

    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Colon,
    Semicolon,
    Assign,

    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    And,
    Or,
    Not,
    If,
    Else,
    For,
    In,
    Is,
    Lambda,
    Import,
}

impl Keyword {
    fn from_ident(ident: &str) -> Option<Self> {
        Some(match ident {
            "and" => Keyword::And,
            "or" => Keyword::Or,
            "not" => Keyword::Not,
            "if" => Keyword::If,
            "else" => Keyword::Else,
            "for" => Keyword::For,
            "in" => Keyword::In,
            "is" => Keyword::Is,
            "lambda" => Keyword::Lambda,
            "import" => Keyword::Import,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::And => "and",
            Keyword::Or => "or",
            Keyword::Not => "not",
            Keyword::If => "if",
            Keyword::Else => "else",
            Keyword::For => "for",
            Keyword::In => "in",
            Keyword::Is => "is",
            Keyword::Lambda => "lambda",
            Keyword::Import => "import",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Number(n) => return write!(f, "number {n}"),
            TokenKind::Ident(name) => return write!(f, "name '{name}'"),
            TokenKind::Str(s) => return write!(f, "string {s:?}"),
            TokenKind::Keyword(k) => return write!(f, "keyword '{}'", k.as_str()),
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::StarStar => "**",
            TokenKind::Slash => "/",
            TokenKind::SlashSlash => "//",
            TokenKind::Percent => "%",
            TokenKind::Tilde => "~",
            TokenKind::Amp => "&",
            TokenKind::Pipe => "|",
            TokenKind::Caret => "^",
            TokenKind::Lt => "<",
            TokenKind::Le => "<=",
            TokenKind::Gt => ">",
            TokenKind::Ge => ">=",
            TokenKind::EqEq => "==",
            TokenKind::NotEq => "!=",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::Colon => ":",
            TokenKind::Semicolon => ";",
            TokenKind::Assign => "=",
            TokenKind::Eof => return f.write_str("end of expression"),
        };
        write!(f, "'{text}'")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the token's first character.
    pub offset: usize,
}

/// A lexical error: message and byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub offset: usize,
}

pub fn tokenize(text: &str) -> Result<Vec<Token>, LexError> {
    Lexer {
        text,
        chars: text.char_indices().peekable(),
    }
    .run()
}

struct Lexer<'a> {
    text: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    fn run(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        while let Some(&(offset, c)) = self.chars.peek() {
            if c.is_whitespace() {
                self.chars.next();
                continue;
            }
            let kind = if c.is_ascii_digit()
                || (c == '.' && self.peek_second().is_some_and(|n| n.is_ascii_digit()))
            {
                self.number(offset)?
            } else if c == '_' || c.is_alphabetic() {
                let ident = self.ident(offset);
                match Keyword::from_ident(ident) {
                    Some(kw) => TokenKind::Keyword(kw),
                    None => TokenKind::Ident(ident.to_string()),
                }
            } else if c == '"' || c == '\'' {
                self.string(offset, c)?
            } else {
                self.chars.next();
                self.operator(offset, c)?
            };
            tokens.push(Token { kind, offset });
        }
        tokens.push(Token {
            kind: TokenKind::Eof,
            offset: self.text.len(),
        });
        Ok(tokens)
    }

    fn peek_second(&self) -> Option<char> {
        let mut ahead = self.chars.clone();
        ahead.next();
        ahead.next().map(|(_, c)| c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.chars.peek().is_some_and(|&(_, c)| c == expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn eat_digits(&mut self) -> usize {
        let mut count = 0;
        while self.chars.peek().is_some_and(|&(_, c)| c.is_ascii_digit()) {
            self.chars.next();
            count += 1;
        }
        count
    }

    fn position(&mut self) -> usize {
        self.chars.peek().map_or(self.text.len(), |&(i, _)| i)
    }

    fn number(&mut self, start: usize) -> Result<TokenKind, LexError> {
        self.eat_digits();
        if self.eat('.') {
            self.eat_digits();
        }
        if self.chars.peek().is_some_and(|&(_, c)| c == 'e' || c == 'E') {
            self.chars.next();
            if !self.eat('+') {
                self.eat('-');
            }
            if self.eat_digits() == 0 {
                return Err(LexError {
                    message: "malformed exponent in numeric literal".into(),
                    offset: start,
                });
            }
        }

        let end = self.position();
        if self
            .chars
            .peek()
            .is_some_and(|&(_, c)| c == '_' || c.is_alphanumeric())
        {
            return Err(LexError {
                message: format!("invalid numeric literal starting '{}'", &self.text[start..end]),
                offset: start,
            });
        }

        let literal = &self.text[start..end];
        literal
            .parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| LexError {
                message: format!("invalid numeric literal '{literal}'"),
                offset: start,
            })
    }

    fn ident(&mut self, start: usize) -> &'a str {
        while self
            .chars
            .peek()
            .is_some_and(|&(_, c)| c == '_' || c.is_alphanumeric())
        {
            self.chars.next();
        }
        let end = self.position();
        &self.text[start..end]
    }

    fn string(&mut self, start: usize, quote: char) -> Result<TokenKind, LexError> {
        self.chars.next();
        let mut value = String::new();
        loop {
            match self.chars.next() {
                Some((_, c)) if c == quote => return Ok(TokenKind::Str(value)),
                Some((_, '\\')) => match self.chars.next() {
                    Some((_, c)) => value.push(c),
                    None => break,
                },
                Some((_, c)) => value.push(c),
                None => break,
            }
        }
        Err(LexError {
            message: "unterminated string literal".into(),
            offset: start,
        })
    }

    fn operator(&mut self, offset: usize, c: char) -> Result<TokenKind, LexError> {
        Ok(match c {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' if self.eat('*') => TokenKind::StarStar,
            '*' => TokenKind::Star,
            '/' if self.eat('/') => TokenKind::SlashSlash,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '~' => TokenKind::Tilde,
            '&' => TokenKind::Amp,
            '|' => TokenKind::Pipe,
            '^' => TokenKind::Caret,
            '<' if self.eat('=') => TokenKind::Le,
            '<' => TokenKind::Lt,
            '>' if self.eat('=') => TokenKind::Ge,
            '>' => TokenKind::Gt,
            '=' if self.eat('=') => TokenKind::EqEq,
            '=' => TokenKind::Assign,
            '!' if self.eat('=') => TokenKind::NotEq,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            other => {
                return Err(LexError {
                    message: format!("unexpected character '{other}'"),
                    offset,
                })
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<TokenKind> {
        tokenize(text)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn numbers() {
        assert_eq!(
            kinds("1 2.5 .5 3. 1e3 2.5E-2"),
            vec![
                TokenKind::Number(1.0),
                TokenKind::Number(2.5),
                TokenKind::Number(0.5),
                TokenKind::Number(3.0),
                TokenKind::Number(1000.0),
                TokenKind::Number(0.025),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn operators() {
        assert_eq!(
            kinds("a**b // c"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::StarStar,
                TokenKind::Ident("b".into()),
                TokenKind::SlashSlash,
                TokenKind::Ident("c".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn quoted_names() {
        assert_eq!(
            kinds(r#""Column 1" + 'it\'s'"#),
            vec![
                TokenKind::Str("Column 1".into()),
                TokenKind::Plus,
                TokenKind::Str("it's".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn keywords() {
        assert_eq!(
            kinds("x and not y"),
            vec![
                TokenKind::Ident("x".into()),
                TokenKind::Keyword(Keyword::And),
                TokenKind::Keyword(Keyword::Not),
                TokenKind::Ident("y".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexical_errors() {
        assert!(tokenize("'open").is_err());
        assert!(tokenize("1e").is_err());
        assert!(tokenize("2x").is_err());
        assert!(tokenize("0x1f").is_err());
        assert!(tokenize("a $ b").is_err());
        assert!(tokenize("a ! b").is_err());
    }
}
