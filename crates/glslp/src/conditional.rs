//! Finds the inputs whose declaration survives conditional compilation.
//!
//! This is not a preprocessor. It tracks `#if`, `#ifdef`, `#ifndef`, `#elif`, `#else` and
//! `#endif` nesting and, whenever it meets an input site marker, evaluates the conditions
//! enclosing it. Conditions that never enclose a marker are never evaluated, so they may use
//! any syntax the real preprocessor understands.
//!
//! The symbol table is made of the `#define NAME [INTEGER]` lines found outside of any
//! conditional block, which in practice is the header generated for the variant.

use std::{
    collections::HashMap,
    iter::Peekable,
    str::CharIndices,
};

use crate::{input::Input, variant::InputMask};

/// Prefix of the macro the parser leaves where an input is declared.
pub(crate) const INPUT_SITE_PREFIX: &str = "_ANKI_INPUT_SITE_";

/// A conditional the analyzer can not evaluate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line} (`{text}`): {reason}")]
#[non_exhaustive]
pub struct UnsupportedConditional {
    /// 1-based line of the directive.
    pub line: usize,
    /// The directive as written.
    pub text: String,
    /// What is not supported.
    pub reason: String,
}

/// Why a conditional expression can not be parsed or evaluated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ExprError {
    /// The expression uses a construct outside the supported subset.
    #[error("{0} is not supported")]
    Unsupported(String),
    /// A number that is not a valid integer literal.
    #[error("invalid integer literal `{0}`")]
    InvalidLiteral(String),
    /// A token where it makes no sense.
    #[error("unexpected `{0}`")]
    Unexpected(String),
    /// The expression stops in the middle of an operation.
    #[error("expression ends unexpectedly")]
    UnexpectedEnd,
    /// A `(` is never closed.
    #[error("missing `)`")]
    MissingClose,
    /// A symbol that is not defined.
    #[error("`{0}` is not defined")]
    Undefined(String),
    /// A symbol defined without an integer value.
    #[error("`{0}` has no integer value")]
    NotAnInteger(String),
}

/// Binary operators of conditional expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[expect(clippy::exhaustive_enums, reason = "the supported subset is closed")]
pub enum BinaryOp {
    /// `||`
    Or,
    /// `&&`
    And,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    Le,
    /// `>=`
    Ge,
}

/// Expression tree of a conditional.
#[derive(Debug, Clone, PartialEq, Eq)]
#[expect(clippy::exhaustive_enums, reason = "the supported subset is closed")]
pub enum Expr {
    /// An integer literal, possibly negative.
    Literal(i64),
    /// A macro with an integer value.
    Symbol(String),
    /// A binary operation.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
}

/// Values of the macros visible to conditionals. `None` for macros without an integer value.
pub type Symbols<'src> = HashMap<&'src str, Option<i64>>;

impl Expr {
    /// Parses a conditional expression.
    ///
    /// # Errors
    ///
    /// Returns an [`ExprError`] if the expression uses anything but integer literals,
    /// identifiers, parentheses and the [supported operators](BinaryOp).
    #[inline]
    pub fn parse(text: &str) -> Result<Self, ExprError> {
        let tokens = lex(text)?;
        let mut parser = ExprParser { tokens, pos: 0 };
        let expr = parser.parse_or()?;
        if let Some(token) = parser.tokens.get(parser.pos) {
            return Err(ExprError::Unexpected(token.to_string()));
        }
        Ok(expr)
    }

    /// Evaluates the expression, `0` being false and anything else true.
    ///
    /// `&&` and `||` short-circuit.
    ///
    /// # Errors
    ///
    /// Returns an [`ExprError`] if a symbol is not defined or has no integer value.
    #[inline]
    pub fn eval(&self, symbols: &Symbols<'_>) -> Result<i64, ExprError> {
        match self {
            Self::Literal(value) => Ok(*value),
            Self::Symbol(name) => match symbols.get(name.as_str()) {
                Some(Some(value)) => Ok(*value),
                Some(None) => Err(ExprError::NotAnInteger(name.clone())),
                None => Err(ExprError::Undefined(name.clone())),
            },
            Self::Binary { op, lhs, rhs } => {
                let lhs = lhs.eval(symbols)?;
                let value = match op {
                    BinaryOp::Or => lhs != 0 || rhs.eval(symbols)? != 0,
                    BinaryOp::And => lhs != 0 && rhs.eval(symbols)? != 0,
                    BinaryOp::Eq => lhs == rhs.eval(symbols)?,
                    BinaryOp::Ne => lhs != rhs.eval(symbols)?,
                    BinaryOp::Lt => lhs < rhs.eval(symbols)?,
                    BinaryOp::Gt => lhs > rhs.eval(symbols)?,
                    BinaryOp::Le => lhs <= rhs.eval(symbols)?,
                    BinaryOp::Ge => lhs >= rhs.eval(symbols)?,
                };
                Ok(i64::from(value))
            }
        }
    }
}

/// Token of a conditional expression.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    /// Integer literal.
    Int(i64),
    /// Identifier.
    Ident(String),
    /// Operator.
    Op(BinaryOp),
    /// `(`
    Open,
    /// `)`
    Close,
}

impl core::fmt::Display for Token {
    #[expect(clippy::min_ident_chars, reason = "It's a core library trait implementation")]
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Ident(name) => f.write_str(name),
            Self::Op(op) => f.write_str(match op {
                BinaryOp::Or => "||",
                BinaryOp::And => "&&",
                BinaryOp::Eq => "==",
                BinaryOp::Ne => "!=",
                BinaryOp::Lt => "<",
                BinaryOp::Gt => ">",
                BinaryOp::Le => "<=",
                BinaryOp::Ge => ">=",
            }),
            Self::Open => f.write_str("("),
            Self::Close => f.write_str(")"),
        }
    }
}

/// Splits an expression into tokens.
fn lex(text: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some((start, ch)) = chars.next() {
        let token = match ch {
            ch if ch.is_whitespace() => continue,
            '(' => Token::Open,
            ')' => Token::Close,
            '0'..='9' => Token::Int(parse_int(take_literal(text, start, &mut chars))?),
            // Only a sign in front of a literal, there is no arithmetic.
            '-' if chars.peek().is_some_and(|&(_, next)| next.is_ascii_digit())
                && !matches!(
                    tokens.last(),
                    Some(Token::Int(_) | Token::Ident(_) | Token::Close)
                ) =>
            {
                Token::Int(parse_int(take_literal(text, start, &mut chars))?)
            }
            ch if ch == '_' || ch.is_ascii_alphabetic() => {
                let mut end = start + 1;
                while let Some(&(idx, next)) = chars.peek() {
                    if next != '_' && !next.is_ascii_alphanumeric() {
                        break;
                    }
                    end = idx + next.len_utf8();
                    chars.next();
                }
                let name = &text[start..end];
                if name == "defined" {
                    return Err(ExprError::Unsupported("`defined`".to_owned()));
                }
                Token::Ident(name.to_owned())
            }
            '|' | '&' | '=' | '!' | '<' | '>' => {
                let second = chars.peek().map(|&(_, next)| next);
                let (op, pair) = match (ch, second) {
                    ('|', Some('|')) => (BinaryOp::Or, true),
                    ('&', Some('&')) => (BinaryOp::And, true),
                    ('=', Some('=')) => (BinaryOp::Eq, true),
                    ('!', Some('=')) => (BinaryOp::Ne, true),
                    ('<', Some('=')) => (BinaryOp::Le, true),
                    ('>', Some('=')) => (BinaryOp::Ge, true),
                    ('<', _) => (BinaryOp::Lt, false),
                    ('>', _) => (BinaryOp::Gt, false),
                    _ => return Err(ExprError::Unsupported(format!("operator `{ch}`"))),
                };
                if pair {
                    chars.next();
                }
                Token::Op(op)
            }
            other => return Err(ExprError::Unsupported(format!("`{other}`"))),
        };
        tokens.push(token);
    }

    Ok(tokens)
}

/// Consumes the alphanumeric rest of the literal starting at `start` and returns all of it.
fn take_literal<'src>(
    text: &'src str,
    start: usize,
    chars: &mut Peekable<CharIndices<'src>>,
) -> &'src str {
    let mut end = start + 1;
    while let Some(&(idx, next)) = chars.peek() {
        if !next.is_ascii_alphanumeric() {
            break;
        }
        end = idx + next.len_utf8();
        chars.next();
    }
    &text[start..end]
}

/// Parses a decimal or `0x` hexadecimal literal with an optional `-` sign and `u`/`U` suffix.
fn parse_int(text: &str) -> Result<i64, ExprError> {
    let (negative, unsigned) = text
        .strip_prefix('-')
        .map_or((false, text), |rest| (true, rest));
    let digits = unsigned.trim_end_matches(['u', 'U']);
    let parsed = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i64::from_str_radix(hex, 16),
        None => digits.parse::<i64>(),
    };
    parsed
        .ok()
        .filter(|_| !digits.starts_with(['+', '-']))
        .map(|value| if negative { -value } else { value })
        .ok_or_else(|| ExprError::InvalidLiteral(text.to_owned()))
}

/// Recursive descent parser with C precedence: `||` < `&&` < equality < relational.
struct ExprParser {
    /// All tokens of the expression.
    tokens: Vec<Token>,
    /// Next token to consume.
    pos: usize,
}

impl ExprParser {
    /// Consumes the next token if it is one of `ops`.
    fn eat_op(&mut self, ops: &[BinaryOp]) -> Option<BinaryOp> {
        match self.tokens.get(self.pos) {
            Some(Token::Op(op)) if ops.contains(op) => {
                self.pos += 1;
                Some(*op)
            }
            _ => None,
        }
    }

    /// Parses a left associative chain of `ops` over operands parsed by `operand`.
    fn parse_chain(
        &mut self,
        ops: &[BinaryOp],
        operand: fn(&mut Self) -> Result<Expr, ExprError>,
    ) -> Result<Expr, ExprError> {
        let mut lhs = operand(self)?;
        while let Some(op) = self.eat_op(ops) {
            let rhs = operand(self)?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    /// `or := and ('||' and)*`
    fn parse_or(&mut self) -> Result<Expr, ExprError> {
        self.parse_chain(&[BinaryOp::Or], Self::parse_and)
    }

    /// `and := equality ('&&' equality)*`
    fn parse_and(&mut self) -> Result<Expr, ExprError> {
        self.parse_chain(&[BinaryOp::And], Self::parse_equality)
    }

    /// `equality := relational (('==' | '!=') relational)*`
    fn parse_equality(&mut self) -> Result<Expr, ExprError> {
        self.parse_chain(&[BinaryOp::Eq, BinaryOp::Ne], Self::parse_relational)
    }

    /// `relational := primary (('<' | '>' | '<=' | '>=') primary)*`
    fn parse_relational(&mut self) -> Result<Expr, ExprError> {
        self.parse_chain(
            &[BinaryOp::Lt, BinaryOp::Gt, BinaryOp::Le, BinaryOp::Ge],
            Self::parse_primary,
        )
    }

    /// `primary := INTEGER | IDENTIFIER | '(' or ')'`
    fn parse_primary(&mut self) -> Result<Expr, ExprError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(ExprError::UnexpectedEnd)?;
        self.pos += 1;
        match token {
            Token::Int(value) => Ok(Expr::Literal(value)),
            Token::Ident(name) => Ok(Expr::Symbol(name)),
            Token::Open => {
                let inner = self.parse_or()?;
                if self.tokens.get(self.pos) != Some(&Token::Close) {
                    return Err(ExprError::MissingClose);
                }
                self.pos += 1;
                Ok(inner)
            }
            other @ (Token::Op(_) | Token::Close) => Err(ExprError::Unexpected(other.to_string())),
        }
    }
}

/// One arm of an `#if` chain.
#[derive(Debug)]
enum Branch<'src> {
    /// `#if EXPR` or `#elif EXPR`.
    Expr(&'src str),
    /// `#ifdef NAME`.
    Defined(&'src str),
    /// `#ifndef NAME`.
    NotDefined(&'src str),
    /// `#else`.
    Else,
}

/// An open `#if` chain.
#[derive(Debug)]
struct Frame<'src> {
    /// Arms seen so far with the line they start at. The last one is the current arm.
    branches: Vec<(Branch<'src>, usize)>,
    /// Lazily computed truth of each arm's own condition.
    results: Vec<Option<bool>>,
}

impl<'src> Frame<'src> {
    /// Opens a chain.
    fn new(branch: Branch<'src>, line: usize) -> Self {
        Self {
            branches: vec![(branch, line)],
            results: vec![None],
        }
    }

    /// Adds an `#elif` or `#else` arm.
    fn push(&mut self, branch: Branch<'src>, line: usize) {
        self.branches.push((branch, line));
        self.results.push(None);
    }

    /// Whether the current arm is the one the preprocessor would keep.
    fn is_active(
        &mut self,
        symbols: &Symbols<'_>,
        lines: &[&str],
    ) -> Result<bool, UnsupportedConditional> {
        let last = self.branches.len() - 1;
        for idx in 0..=last {
            let taken = self.arm_condition(idx, symbols, lines)?;
            if idx == last {
                return Ok(taken);
            }
            if taken {
                return Ok(false);
            }
        }
        Ok(false)
    }

    /// Truth of an arm's own condition, ignoring the arms before it.
    fn arm_condition(
        &mut self,
        idx: usize,
        symbols: &Symbols<'_>,
        lines: &[&str],
    ) -> Result<bool, UnsupportedConditional> {
        if let Some(Some(cached)) = self.results.get(idx) {
            return Ok(*cached);
        }
        let Some((branch, line)) = self.branches.get(idx) else {
            return Ok(false);
        };

        let value = match branch {
            Branch::Expr(text) => Expr::parse(text)
                .and_then(|expr| expr.eval(symbols))
                .map(|value| value != 0)
                .map_err(|reason| UnsupportedConditional {
                    line: *line,
                    text: lines
                        .get(line - 1)
                        .map_or_else(String::new, |text| text.trim().to_owned()),
                    reason: reason.to_string(),
                })?,
            Branch::Defined(name) => symbols.contains_key(name),
            Branch::NotDefined(name) => !symbols.contains_key(name),
            Branch::Else => true,
        };

        if let Some(slot) = self.results.get_mut(idx) {
            *slot = Some(value);
        }
        Ok(value)
    }
}

/// Splits a preprocessor line into its directive keyword and the rest, comments removed.
fn directive(line: &str) -> Option<(&str, &str)> {
    let rest = line.trim_start().strip_prefix('#')?.trim_start();
    let rest = rest
        .find("//")
        .into_iter()
        .chain(rest.find("/*"))
        .min()
        .map_or(rest, |end| &rest[..end]);
    let keyword_end = rest
        .find(|ch: char| !ch.is_ascii_alphanumeric() && ch != '_')
        .unwrap_or(rest.len());
    Some((&rest[..keyword_end], rest[keyword_end..].trim()))
}

/// Splits the body of a `#define` into the macro name and its integer value, if any.
fn parse_define(body: &str) -> Option<(&str, Option<i64>)> {
    let name_end = body
        .find(|ch: char| !ch.is_ascii_alphanumeric() && ch != '_')
        .unwrap_or(body.len());
    let name = &body[..name_end];
    if name.is_empty() {
        return None;
    }
    let value = body[name_end..].trim();
    // Function-like macros are defined but never integers.
    let value = if body[name_end..].starts_with('(') {
        None
    } else {
        parse_int(value).ok()
    };
    Some((name, value))
}

/// Computes which of `inputs` have their declaration site kept by the preprocessor.
///
/// # Errors
///
/// Returns [`UnsupportedConditional`] if a conditional enclosing an input site can not be
/// evaluated, or if the conditional nesting is unbalanced.
#[inline]
pub fn find_active_inputs(
    source: &str,
    inputs: &[Input],
) -> Result<InputMask, UnsupportedConditional> {
    let by_name: HashMap<&str, usize> = inputs
        .iter()
        .map(|input| (input.name(), input.index()))
        .collect();
    let lines: Vec<&str> = source.lines().collect();
    let mut symbols = Symbols::new();
    let mut stack: Vec<Frame<'_>> = Vec::new();
    let mut active = InputMask::default();

    let unbalanced = |line: usize, reason: &str| UnsupportedConditional {
        line,
        text: lines
            .get(line - 1)
            .map_or_else(String::new, |text| text.trim().to_owned()),
        reason: reason.to_owned(),
    };

    for (idx, line) in lines.iter().enumerate() {
        let line_number = idx + 1;
        let Some((keyword, rest)) = directive(line) else {
            continue;
        };

        match keyword {
            "if" => stack.push(Frame::new(Branch::Expr(rest), line_number)),
            "ifdef" => stack.push(Frame::new(Branch::Defined(rest), line_number)),
            "ifndef" => stack.push(Frame::new(Branch::NotDefined(rest), line_number)),
            "elif" => stack
                .last_mut()
                .ok_or_else(|| unbalanced(line_number, "`#elif` without `#if`"))?
                .push(Branch::Expr(rest), line_number),
            "else" => stack
                .last_mut()
                .ok_or_else(|| unbalanced(line_number, "`#else` without `#if`"))?
                .push(Branch::Else, line_number),
            "endif" => {
                stack
                    .pop()
                    .ok_or_else(|| unbalanced(line_number, "`#endif` without `#if`"))?;
            }
            "define" => {
                let Some((name, value)) = parse_define(rest) else {
                    continue;
                };
                if let Some(input_name) = name.strip_prefix(INPUT_SITE_PREFIX) {
                    let Some(&input_idx) = by_name.get(input_name) else {
                        continue;
                    };
                    let mut reachable = true;
                    for frame in &mut stack {
                        if !frame.is_active(&symbols, &lines)? {
                            reachable = false;
                            break;
                        }
                    }
                    if reachable {
                        log::trace!("input `{input_name}` is active");
                        active.set(input_idx);
                    }
                } else if stack.is_empty() {
                    symbols.insert(name, value);
                }
            }
            _ => {}
        }
    }

    if let Some(frame) = stack.last() {
        let line = frame.branches.first().map_or(0, |&(_, line)| line);
        return Err(unbalanced(line, "`#if` without `#endif`"));
    }

    Ok(active)
}
