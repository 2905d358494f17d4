//! Recursive-descent parser producing an unchecked syntax tree.
//!
//! The parser accepts a broad, Python-like expression syntax (comparisons,
//! boolean operators, attribute access, subscripts, list displays,
//! comprehensions, conditionals) purely so that the checker in
//! [`super::check`] can see the whole tree and reject what it does not
//! explicitly allow.

use super::lexer::{Keyword, Token, TokenKind};

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Number(f64),
    Name(String),
    /// A single quoted literal.
    Str(String),
    /// Adjacent string literals, e.g. `"a" "b"`.
    Concat(Vec<String>),
    Unary {
        op: UnaryOp,
        operand: Box<Node>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Compare {
        op: CompareOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Bool {
        op: BoolOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Not(Box<Node>),
    Conditional {
        test: Box<Node>,
        body: Box<Node>,
        orelse: Box<Node>,
    },
    Call {
        callee: Box<Node>,
        args: Vec<Node>,
    },
    Attribute {
        value: Box<Node>,
        attr: String,
    },
    Subscript {
        value: Box<Node>,
        index: Box<Node>,
    },
    Tuple(Vec<Node>),
    List(Vec<Node>),
    Comprehension {
        element: Box<Node>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Pos,
    Neg,
    Invert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    NotEq,
    In,
    Is,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

/// A syntax error: message and byte offset into the expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub offset: usize,
}

/// Deepest tree the parser will build. Parenthesised groups, prefix
/// operators, and every operator in a left-associative chain each count as
/// one level, so the recursion in checking, evaluation and drop stays bounded.
const MAX_NESTING: usize = 128;

pub fn parse(tokens: &[Token]) -> Result<Node, SyntaxError> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    if parser.peek() == &TokenKind::Eof {
        return Err(SyntaxError {
            message: "empty expression".into(),
            offset: 0,
        });
    }
    let node = parser.expression()?;
    match parser.peek() {
        TokenKind::Eof => Ok(node),
        TokenKind::Assign | TokenKind::Semicolon => {
            Err(parser.error("statements are not expressions"))
        }
        other => {
            let message = format!("unexpected {other}");
            Err(parser.error(message))
        }
    }
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    depth: usize,
}

impl<'t> Parser<'t> {
    fn peek(&self) -> &TokenKind {
        // The token list always ends with Eof, and `bump` never moves past it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)].kind
    }

    fn offset(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].offset
    }

    fn bump(&mut self) -> TokenKind {
        let kind = self.peek().clone();
        if kind != TokenKind::Eof {
            self.pos += 1;
        }
        kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == kind {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), SyntaxError> {
        if self.eat(&kind) {
            Ok(())
        } else {
            let message = format!("expected {kind}, found {}", self.peek());
            Err(self.error(message))
        }
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError {
            message: message.into(),
            offset: self.offset(),
        }
    }

    /// Claim one level of nesting; callers give it back with `leave`.
    fn enter(&mut self) -> Result<(), SyntaxError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error("expression nested too deeply"));
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self, levels: usize) {
        self.depth = self.depth.saturating_sub(levels);
    }

    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<T, SyntaxError> {
        self.enter()?;
        let result = f(self);
        self.leave(1);
        result
    }

    fn expression(&mut self) -> Result<Node, SyntaxError> {
        self.nested(Self::conditional)
    }

    // expression := or_expr ['if' or_expr 'else' expression]
    fn conditional(&mut self) -> Result<Node, SyntaxError> {
        if self.peek() == &TokenKind::Keyword(Keyword::Lambda) {
            return Err(self.error("lambda expressions are not supported"));
        }
        let body = self.or_expr()?;
        if self.eat(&TokenKind::Keyword(Keyword::If)) {
            let test = self.or_expr()?;
            self.expect(TokenKind::Keyword(Keyword::Else))?;
            let orelse = self.expression()?;
            return Ok(Node::Conditional {
                test: Box::new(test),
                body: Box::new(body),
                orelse: Box::new(orelse),
            });
        }
        Ok(body)
    }

    fn or_expr(&mut self) -> Result<Node, SyntaxError> {
        let mut left = self.and_expr()?;
        let mut chained = 0;
        while self.eat(&TokenKind::Keyword(Keyword::Or)) {
            self.enter()?;
            chained += 1;
            let right = self.and_expr()?;
            left = Node::Bool {
                op: BoolOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.leave(chained);
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Node, SyntaxError> {
        let mut left = self.not_expr()?;
        let mut chained = 0;
        while self.eat(&TokenKind::Keyword(Keyword::And)) {
            self.enter()?;
            chained += 1;
            let right = self.not_expr()?;
            left = Node::Bool {
                op: BoolOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.leave(chained);
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Node, SyntaxError> {
        if self.eat(&TokenKind::Keyword(Keyword::Not)) {
            let operand = self.nested(Self::not_expr)?;
            return Ok(Node::Not(Box::new(operand)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Node, SyntaxError> {
        let mut left = self.bit_or()?;
        let mut chained = 0;
        loop {
            let op = match self.peek() {
                TokenKind::Lt => CompareOp::Lt,
                TokenKind::Le => CompareOp::Le,
                TokenKind::Gt => CompareOp::Gt,
                TokenKind::Ge => CompareOp::Ge,
                TokenKind::EqEq => CompareOp::Eq,
                TokenKind::NotEq => CompareOp::NotEq,
                TokenKind::Keyword(Keyword::In) => CompareOp::In,
                TokenKind::Keyword(Keyword::Is) => CompareOp::Is,
                _ => break,
            };
            self.bump();
            self.enter()?;
            chained += 1;
            let right = self.bit_or()?;
            left = Node::Compare {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.leave(chained);
        Ok(left)
    }

    fn bit_or(&mut self) -> Result<Node, SyntaxError> {
        self.binary_level(&[(TokenKind::Pipe, BinaryOp::BitOr)], Self::bit_xor)
    }

    fn bit_xor(&mut self) -> Result<Node, SyntaxError> {
        self.binary_level(&[(TokenKind::Caret, BinaryOp::BitXor)], Self::bit_and)
    }

    fn bit_and(&mut self) -> Result<Node, SyntaxError> {
        self.binary_level(&[(TokenKind::Amp, BinaryOp::BitAnd)], Self::additive)
    }

    fn additive(&mut self) -> Result<Node, SyntaxError> {
        self.binary_level(
            &[(TokenKind::Plus, BinaryOp::Add), (TokenKind::Minus, BinaryOp::Sub)],
            Self::multiplicative,
        )
    }

    fn multiplicative(&mut self) -> Result<Node, SyntaxError> {
        self.binary_level(
            &[
                (TokenKind::Star, BinaryOp::Mul),
                (TokenKind::Slash, BinaryOp::Div),
                (TokenKind::SlashSlash, BinaryOp::FloorDiv),
                (TokenKind::Percent, BinaryOp::Mod),
            ],
            Self::unary,
        )
    }

    /// One left-associative precedence level.
    fn binary_level(
        &mut self,
        ops: &[(TokenKind, BinaryOp)],
        next: fn(&mut Self) -> Result<Node, SyntaxError>,
    ) -> Result<Node, SyntaxError> {
        let mut left = next(self)?;
        let mut chained = 0;
        'outer: loop {
            for (token, op) in ops {
                if self.eat(token) {
                    self.enter()?;
                    chained += 1;
                    let right = next(self)?;
                    left = Node::Binary {
                        op: *op,
                        left: Box::new(left),
                        right: Box::new(right),
                    };
                    continue 'outer;
                }
            }
            self.leave(chained);
            return Ok(left);
        }
    }

    // unary := ('+' | '-' | '~') unary | power
    fn unary(&mut self) -> Result<Node, SyntaxError> {
        let op = match self.peek() {
            TokenKind::Plus => UnaryOp::Pos,
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Tilde => UnaryOp::Invert,
            _ => return self.power(),
        };
        self.bump();
        let operand = self.nested(Self::unary)?;
        Ok(Node::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    // power := primary ['**' unary]   (right-associative, binds tighter than a
    // unary operator on its left: -2**2 == -(2**2))
    fn power(&mut self) -> Result<Node, SyntaxError> {
        let base = self.primary()?;
        if self.eat(&TokenKind::StarStar) {
            let exponent = self.nested(Self::unary)?;
            return Ok(Node::Binary {
                op: BinaryOp::Pow,
                left: Box::new(base),
                right: Box::new(exponent),
            });
        }
        Ok(base)
    }

    // primary := atom { '(' args ')' | '.' NAME | '[' expression ']' }
    fn primary(&mut self) -> Result<Node, SyntaxError> {
        let mut node = self.atom()?;
        let mut chained = 0;
        loop {
            match self.peek() {
                TokenKind::LParen => {
                    self.enter()?;
                    chained += 1;
                    self.bump();
                    let args = self.sequence(TokenKind::RParen)?;
                    node = Node::Call {
                        callee: Box::new(node),
                        args,
                    };
                }
                TokenKind::Dot => {
                    self.enter()?;
                    chained += 1;
                    self.bump();
                    match self.bump() {
                        TokenKind::Ident(attr) => {
                            node = Node::Attribute {
                                value: Box::new(node),
                                attr,
                            }
                        }
                        other => {
                            return Err(self.error(format!("expected attribute name, found {other}")))
                        }
                    }
                }
                TokenKind::LBracket => {
                    self.enter()?;
                    chained += 1;
                    self.bump();
                    let index = self.expression()?;
                    self.expect(TokenKind::RBracket)?;
                    node = Node::Subscript {
                        value: Box::new(node),
                        index: Box::new(index),
                    };
                }
                _ => {
                    self.leave(chained);
                    return Ok(node);
                }
            }
        }
    }

    fn atom(&mut self) -> Result<Node, SyntaxError> {
        let offset = self.offset();
        match self.bump() {
            TokenKind::Number(n) => Ok(Node::Number(n)),
            TokenKind::Ident(name) => Ok(Node::Name(name)),
            TokenKind::Str(first) => {
                let mut parts = vec![first];
                while let TokenKind::Str(next) = self.peek().clone() {
                    self.bump();
                    parts.push(next);
                }
                if parts.len() == 1 {
                    Ok(Node::Str(parts.remove(0)))
                } else {
                    Ok(Node::Concat(parts))
                }
            }
            TokenKind::LParen => {
                let mut items = self.sequence(TokenKind::RParen)?;
                if items.len() == 1 && !self.trailing_comma() {
                    Ok(items.remove(0))
                } else {
                    Ok(Node::Tuple(items))
                }
            }
            TokenKind::LBracket => {
                if self.eat(&TokenKind::RBracket) {
                    return Ok(Node::List(Vec::new()));
                }
                let first = self.expression()?;
                if self.eat(&TokenKind::Keyword(Keyword::For)) {
                    self.skip_comprehension_tail()?;
                    return Ok(Node::Comprehension {
                        element: Box::new(first),
                    });
                }
                let mut items = vec![first];
                while self.eat(&TokenKind::Comma) {
                    if self.peek() == &TokenKind::RBracket {
                        break;
                    }
                    items.push(self.expression()?);
                }
                self.expect(TokenKind::RBracket)?;
                Ok(Node::List(items))
            }
            other => Err(SyntaxError {
                message: format!("unexpected {other}"),
                offset,
            }),
        }
    }

    /// Whether the token before the closing delimiter just consumed was a comma.
    fn trailing_comma(&self) -> bool {
        self.pos >= 2 && self.tokens[self.pos - 2].kind == TokenKind::Comma
    }

    /// Comma-separated expressions up to and including `close`.
    fn sequence(&mut self, close: TokenKind) -> Result<Vec<Node>, SyntaxError> {
        let mut items = Vec::new();
        if self.eat(&close) {
            return Ok(items);
        }
        loop {
            items.push(self.expression()?);
            if self.peek() == &TokenKind::Assign {
                return Err(self.error("keyword arguments are not supported"));
            }
            if !self.eat(&TokenKind::Comma) || self.peek() == &close {
                break;
            }
        }
        self.expect(close)?;
        Ok(items)
    }

    /// Consume `target in iterable ...]` after the `for` of a comprehension.
    fn skip_comprehension_tail(&mut self) -> Result<(), SyntaxError> {
        let mut depth = 0usize;
        loop {
            match self.bump() {
                TokenKind::LBracket | TokenKind::LParen => depth += 1,
                TokenKind::RParen => depth = depth.saturating_sub(1),
                TokenKind::RBracket if depth == 0 => return Ok(()),
                TokenKind::RBracket => depth -= 1,
                TokenKind::Eof => return Err(self.error("unterminated comprehension")),
                _ => {}
            }
        }
    }
}
