//! Arithmetic Expressions - Sandboxed Evaluator
//!
//! Numbers, identifiers bound to known values, `+ - * / ( )` and unary minus.
//! Nothing else is accepted; there is no field access and no call syntax.

use logos::Logos;
use thiserror::Error;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// Deepest nesting of parentheses and unary signs accepted
pub const MAX_DEPTH: usize = 256;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,

    #[regex(r"([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvalError {
    #[error("unexpected character at {0:?}")]
    InvalidToken(Span),

    #[error("unexpected {found} at {span:?}")]
    Unexpected { found: String, span: Span },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("result is not a finite number")]
    NonFinite,

    #[error("expression nested too deeply")]
    TooDeep,
}

/// Lex input into tokens with spans, failing on the first unknown character
pub fn lex(input: &str) -> Result<Vec<(Token, Span)>, EvalError> {
    Token::lexer(input)
        .spanned()
        .map(|(tok, span)| match tok {
            Ok(tok) => Ok((tok, span)),
            Err(()) => Err(EvalError::InvalidToken(span)),
        })
        .collect()
}

/// Evaluate `input`, resolving bare identifiers through `lookup`
pub fn evaluate<F>(input: &str, lookup: F) -> Result<f64, EvalError>
where
    F: Fn(&str) -> Option<f64>,
{
    let tokens = lex(input)?;
    let mut parser = Parser { tokens: &tokens, pos: 0, depth: 0, lookup: &lookup };
    let value = parser.expression()?;
    if let Some((tok, span)) = parser.peek() {
        return Err(EvalError::Unexpected { found: describe(tok), span: span.clone() });
    }
    if !value.is_finite() {
        return Err(EvalError::NonFinite);
    }
    Ok(value)
}

struct Parser<'t, 'l> {
    tokens: &'t [(Token, Span)],
    pos: usize,
    depth: usize,
    lookup: &'l dyn Fn(&str) -> Option<f64>,
}

impl<'t, 'l> Parser<'t, 'l> {
    fn peek(&self) -> Option<&'t (Token, Span)> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'t (Token, Span)> {
        let tok = self.tokens.get(self.pos);
        self.pos += 1;
        tok
    }

    // expression := term (('+' | '-') term)*
    fn expression(&mut self) -> Result<f64, EvalError> {
        let mut value = self.term()?;
        loop {
            match self.peek().map(|(tok, _)| tok) {
                Some(Token::Plus) => {
                    self.pos += 1;
                    value += self.term()?;
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    // term := factor (('*' | '/') factor)*
    fn term(&mut self) -> Result<f64, EvalError> {
        let mut value = self.factor()?;
        loop {
            match self.peek().map(|(tok, _)| tok) {
                Some(Token::Star) => {
                    self.pos += 1;
                    value *= self.factor()?;
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    let divisor = self.factor()?;
                    if divisor == 0.0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    value /= divisor;
                }
                _ => return Ok(value),
            }
        }
    }

    fn factor(&mut self) -> Result<f64, EvalError> {
        if self.depth >= MAX_DEPTH {
            return Err(EvalError::TooDeep);
        }
        self.depth += 1;
        let value = self.primary();
        self.depth -= 1;
        value
    }

    // factor := '-' factor | '+' factor | number | ident | '(' expression ')'
    fn primary(&mut self) -> Result<f64, EvalError> {
        let (tok, span) = self.next().ok_or(EvalError::UnexpectedEnd)?;
        match tok {
            Token::Minus => Ok(-self.factor()?),
            Token::Plus => self.factor(),
            Token::Number(n) => Ok(*n),
            Token::Ident(name) => {
                (self.lookup)(name.as_str()).ok_or_else(|| EvalError::UnknownIdentifier(name.clone()))
            }
            Token::ParenOpen => {
                let value = self.expression()?;
                match self.next() {
                    Some((Token::ParenClose, _)) => Ok(value),
                    Some((tok, span)) => {
                        Err(EvalError::Unexpected { found: describe(tok), span: span.clone() })
                    }
                    None => Err(EvalError::UnexpectedEnd),
                }
            }
            other => Err(EvalError::Unexpected { found: describe(other), span: span.clone() }),
        }
    }
}

fn describe(tok: &Token) -> String {
    match tok {
        Token::Plus => "'+'".to_string(),
        Token::Minus => "'-'".to_string(),
        Token::Star => "'*'".to_string(),
        Token::Slash => "'/'".to_string(),
        Token::ParenOpen => "'('".to_string(),
        Token::ParenClose => "')'".to_string(),
        Token::Number(n) => format!("number {}", n),
        Token::Ident(s) => format!("identifier '{}'", s),
    }
}
