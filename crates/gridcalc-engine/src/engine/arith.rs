//! Arithmetic evaluation for fully substituted formula expressions.
//!
//! By the time an expression reaches this module every reference and range
//! call has been replaced by a number, so the grammar is deliberately tiny:
//!
//! ```text
//!   expression --> term ( ("+" | "-") term )*
//!   term       --> unary ( ("*" | "/") unary )*
//!   unary      --> ("+" | "-") unary | primary
//!   primary    --> NUMBER | "(" expression ")"
//! ```
//!
//! Nothing here executes code; unknown input is an [`ArithError`].

use thiserror::Error;

/// Deepest parenthesis / unary-sign nesting accepted.
const MAX_NESTING: usize = 256;

/// Why an arithmetic expression could not be evaluated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArithError {
    #[error("Empty expression")]
    Empty,

    #[error("Unexpected character '{ch}' at offset {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("Invalid number '{0}'")]
    InvalidNumber(String),

    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    #[error("Unexpected token at offset {0}")]
    UnexpectedToken(usize),

    #[error("Unbalanced parentheses")]
    UnbalancedParens,

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Expression nested too deeply")]
    TooDeep,

    #[error("Result is not a finite number")]
    NonFinite,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

/// Evaluate `+ - * /` arithmetic with the usual precedence.
pub fn evaluate_arithmetic(expr: &str) -> Result<f64, ArithError> {
    let tokens = tokenize(expr)?;
    if tokens.is_empty() {
        return Err(ArithError::Empty);
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.parse_expression()?;

    // Make sure we consumed all input
    if let Some(&(token, offset)) = parser.tokens.get(parser.pos) {
        return Err(match token {
            Token::RParen => ArithError::UnbalancedParens,
            _ => ArithError::UnexpectedToken(offset),
        });
    }

    if !value.is_finite() {
        return Err(ArithError::NonFinite);
    }
    Ok(value)
}

fn tokenize(input: &str) -> Result<Vec<(Token, usize)>, ArithError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((pos, ch)) = chars.next() {
        let token = match ch {
            c if c.is_whitespace() => continue,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '(' => Token::LParen,
            ')' => Token::RParen,
            c if c.is_ascii_digit() || c == '.' => {
                let mut literal = String::from(c);
                while let Some(&(_, next)) = chars.peek() {
                    if next.is_ascii_digit() || next == '.' {
                        literal.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if literal.matches('.').count() > 1 || literal == "." {
                    return Err(ArithError::InvalidNumber(literal));
                }
                let n = literal
                    .parse::<f64>()
                    .map_err(|_| ArithError::InvalidNumber(literal.clone()))?;
                Token::Number(n)
            }
            ch => return Err(ArithError::UnexpectedChar { ch, pos }),
        };
        tokens.push((token, pos));
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).map(|(token, _)| *token)
    }

    fn advance(&mut self) -> Option<(Token, usize)> {
        let token = self.tokens.get(self.pos).copied();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn enter(&mut self) -> Result<(), ArithError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(ArithError::TooDeep);
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn parse_expression(&mut self) -> Result<f64, ArithError> {
        let mut left = self.parse_term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.advance();
                    left += self.parse_term()?;
                }
                Some(Token::Minus) => {
                    self.advance();
                    left -= self.parse_term()?;
                }
                _ => return Ok(left),
            }
        }
    }

    fn parse_term(&mut self) -> Result<f64, ArithError> {
        let mut left = self.parse_unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.advance();
                    left *= self.parse_unary()?;
                }
                Some(Token::Slash) => {
                    self.advance();
                    let right = self.parse_unary()?;
                    if right == 0.0 {
                        return Err(ArithError::DivisionByZero);
                    }
                    left /= right;
                }
                _ => return Ok(left),
            }
        }
    }

    fn parse_unary(&mut self) -> Result<f64, ArithError> {
        match self.peek() {
            Some(Token::Plus) | Some(Token::Minus) => {
                let negate = self.peek() == Some(Token::Minus);
                self.advance();
                self.enter()?;
                let value = self.parse_unary()?;
                self.leave();
                Ok(if negate { -value } else { value })
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<f64, ArithError> {
        match self.advance() {
            Some((Token::Number(n), _)) => Ok(n),
            Some((Token::LParen, _)) => {
                self.enter()?;
                let value = self.parse_expression()?;
                self.leave();
                match self.advance() {
                    Some((Token::RParen, _)) => Ok(value),
                    _ => Err(ArithError::UnbalancedParens),
                }
            }
            Some((Token::RParen, _)) => Err(ArithError::UnbalancedParens),
            Some((_, offset)) => Err(ArithError::UnexpectedToken(offset)),
            None => Err(ArithError::UnexpectedEnd),
        }
    }
}
