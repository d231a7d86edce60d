//! Tokenizer and precedence-climbing parser.

use super::ExprError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Number(f64),
    Ident(String),
    Keyword(String),
    Op(Op),
    Bang,
    LParen,
    RParen,
    Comma,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl Op {
    /// Binding power; higher binds tighter.
    fn precedence(self) -> u8 {
        match self {
            Op::Or => 1,
            Op::And => 2,
            Op::Lt | Op::Le | Op::Gt | Op::Ge | Op::Eq | Op::Ne => 3,
            Op::Add | Op::Sub => 4,
            Op::Mul | Op::Div => 5,
            Op::Pow => 7,
        }
    }

    fn right_associative(self) -> bool {
        self == Op::Pow
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unary {
    Neg,
    Not,
}

/// Precedence of prefix operators: above `*` but below `^`, so `-2^2` is -4.
const UNARY_PRECEDENCE: u8 = 6;

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    /// `{keyword}` reference.
    Keyword(String),
    /// Bare identifier, resolved as a constant.
    Ident(String),
    Unary(Unary, Box<Expr>),
    Binary(Op, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

pub(crate) fn tokenize(src: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '0'..='9' | '.' => {
                let mut end = pos;
                let mut prev = c;
                while let Some(&(i, d)) = chars.peek() {
                    let exponent_sign = (d == '+' || d == '-') && (prev == 'e' || prev == 'E');
                    if d.is_ascii_digit() || d == '.' || d == 'e' || d == 'E' || exponent_sign {
                        end = i + d.len_utf8();
                        prev = d;
                        chars.next();
                    } else {
                        break;
                    }
                }
                let text = &src[pos..end];
                let value = text
                    .parse()
                    .map_err(|_| ExprError::UnexpectedToken(text.to_string()))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut end = pos;
                while let Some(&(i, d)) = chars.peek() {
                    if d.is_alphanumeric() || d == '_' {
                        end = i + d.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(src[pos..end].to_string()));
            }
            '{' => {
                chars.next();
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some((_, '}')) => break,
                        Some((_, d)) => name.push(d),
                        None => return Err(ExprError::UnexpectedEnd),
                    }
                }
                tokens.push(Token::Keyword(name.trim().to_string()));
            }
            _ => {
                chars.next();
                let next = chars.peek().map(|&(_, d)| d);
                let mut two = |tok: Token| {
                    chars.next();
                    tok
                };
                let token = match (c, next) {
                    ('*', Some('*')) => two(Token::Op(Op::Pow)),
                    ('<', Some('=')) => two(Token::Op(Op::Le)),
                    ('>', Some('=')) => two(Token::Op(Op::Ge)),
                    ('=', Some('=')) => two(Token::Op(Op::Eq)),
                    ('!', Some('=')) => two(Token::Op(Op::Ne)),
                    ('&', Some('&')) => two(Token::Op(Op::And)),
                    ('|', Some('|')) => two(Token::Op(Op::Or)),
                    ('+', _) => Token::Op(Op::Add),
                    ('-', _) => Token::Op(Op::Sub),
                    ('*', _) => Token::Op(Op::Mul),
                    ('/', _) => Token::Op(Op::Div),
                    ('^', _) => Token::Op(Op::Pow),
                    ('<', _) => Token::Op(Op::Lt),
                    ('>', _) => Token::Op(Op::Gt),
                    ('&', _) => Token::Op(Op::And),
                    ('|', _) => Token::Op(Op::Or),
                    ('!' | '~', _) => Token::Bang,
                    ('(', _) => Token::LParen,
                    (')', _) => Token::RParen,
                    (',', _) => Token::Comma,
                    _ => return Err(ExprError::UnexpectedChar(c, pos)),
                };
                tokens.push(token);
            }
        }
    }
    Ok(tokens)
}

/// Deepest expression tree the parser will build.
pub const MAX_DEPTH: usize = 256;

pub(crate) struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    nesting: usize,
}

impl Parser {
    pub(crate) fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            nesting: 0,
        }
    }

    /// Parse the whole token stream as one expression.
    pub(crate) fn parse(mut self) -> Result<Expr, ExprError> {
        let (expr, _) = self.expression(0)?;
        match self.tokens.get(self.pos) {
            None => Ok(expr),
            Some(tok) => Err(ExprError::UnexpectedToken(format!("{tok:?}"))),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn expect(&mut self, want: Token) -> Result<(), ExprError> {
        match self.bump() {
            Some(tok) if tok == want => Ok(()),
            Some(tok) => Err(ExprError::UnexpectedToken(format!("{tok:?}"))),
            None => Err(ExprError::UnexpectedEnd),
        }
    }

    /// Depth of a new node over children of depth `child`.
    fn nest(child: usize) -> Result<usize, ExprError> {
        let depth = child + 1;
        if depth > MAX_DEPTH {
            return Err(ExprError::TooDeep(MAX_DEPTH));
        }
        Ok(depth)
    }

    /// Parse an expression, returning it with its tree depth.
    fn expression(&mut self, min_prec: u8) -> Result<(Expr, usize), ExprError> {
        self.nesting += 1;
        if self.nesting > MAX_DEPTH {
            return Err(ExprError::TooDeep(MAX_DEPTH));
        }
        let parsed = self.binary(min_prec);
        self.nesting -= 1;
        parsed
    }

    fn binary(&mut self, min_prec: u8) -> Result<(Expr, usize), ExprError> {
        let (mut lhs, mut depth) = self.prefix()?;
        while let Some(Token::Op(op)) = self.peek() {
            let op = *op;
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.pos += 1;
            let next_min = if op.right_associative() { prec } else { prec + 1 };
            let (rhs, rhs_depth) = self.expression(next_min)?;
            depth = Self::nest(depth.max(rhs_depth))?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok((lhs, depth))
    }

    fn prefix(&mut self) -> Result<(Expr, usize), ExprError> {
        match self.bump().ok_or(ExprError::UnexpectedEnd)? {
            Token::Number(n) => Ok((Expr::Number(n), 1)),
            Token::Keyword(name) => Ok((Expr::Keyword(name), 1)),
            Token::Op(Op::Sub) => {
                let (operand, depth) = self.expression(UNARY_PRECEDENCE)?;
                Ok((Expr::Unary(Unary::Neg, Box::new(operand)), Self::nest(depth)?))
            }
            Token::Op(Op::Add) => self.expression(UNARY_PRECEDENCE),
            Token::Bang => {
                let (operand, depth) = self.expression(UNARY_PRECEDENCE)?;
                Ok((Expr::Unary(Unary::Not, Box::new(operand)), Self::nest(depth)?))
            }
            Token::LParen => {
                let inner = self.expression(0)?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(name) => {
                if self.peek() != Some(&Token::LParen) {
                    return Ok((Expr::Ident(name), 1));
                }
                self.pos += 1;
                let mut args = Vec::new();
                let mut depth = 0;
                if self.peek() == Some(&Token::RParen) {
                    self.pos += 1;
                    return Ok((Expr::Call(name, args), 1));
                }
                loop {
                    let (arg, arg_depth) = self.expression(0)?;
                    args.push(arg);
                    depth = depth.max(arg_depth);
                    match self.bump() {
                        Some(Token::Comma) => continue,
                        Some(Token::RParen) => break,
                        Some(tok) => return Err(ExprError::UnexpectedToken(format!("{tok:?}"))),
                        None => return Err(ExprError::UnexpectedEnd),
                    }
                }
                Ok((Expr::Call(name, args), Self::nest(depth)?))
            }
            tok => Err(ExprError::UnexpectedToken(format!("{tok:?}"))),
        }
    }
}

/// Parse source text into an expression tree.
pub fn parse(src: &str) -> Result<Expr, ExprError> {
    Parser::new(tokenize(src)?).parse()
}
