//! Pratt-style expression parser over in-tag tokens.
//!
//! Precedence, loosest first: `or`, `and`, `not`, comparisons
//! (non-chaining), `+ -`, `* / %`, unary `-`, postfix chains and
//! primaries.
use crate::{
    error::SyntaxError,
    lexer::Tag,
    parser::ast::{BinaryOp, Expr, Target, UnaryOp},
    parser::TagCursor,
    value::Compartment,
    SyntaxResult,
};

/// Parse a single expression from the cursor.
pub(crate) fn parse(cur: &mut TagCursor<'_>) -> SyntaxResult<Expr> {
    parse_or(cur)
}

/// Parse an expression and require the cursor to be exhausted.
pub(crate) fn parse_complete(cur: &mut TagCursor<'_>) -> SyntaxResult<Expr> {
    let expr = parse_or(cur)?;
    if !cur.is_empty() {
        return Err(cur.error(SyntaxError::TrailingTokens));
    }
    Ok(expr)
}

/// Parse an assignment or loop target: an identifier with an
/// optional compartment prefix.
pub(crate) fn target(cur: &mut TagCursor<'_>) -> SyntaxResult<Target> {
    let span = cur.expect(Tag::Identifier)?;
    let raw = cur.slice(&span);
    Ok(split_target(raw))
}

/// Parse an identifier that must not carry a compartment prefix.
pub(crate) fn plain_identifier(
    cur: &mut TagCursor<'_>,
) -> SyntaxResult<String> {
    let span = cur.expect(Tag::Identifier)?;
    let raw = cur.slice(&span);
    if raw.contains('@') {
        return Err(cur.error(SyntaxError::ExpectedIdentifier));
    }
    Ok(raw.to_string())
}

fn split_target(raw: &str) -> Target {
    if let Some(at) = raw.find('@') {
        let prefix = raw[..at].chars().next();
        let compartment = prefix.and_then(Compartment::from_prefix);
        Target {
            compartment,
            name: raw[at + 1..].to_string(),
        }
    } else {
        Target {
            compartment: None,
            name: raw.to_string(),
        }
    }
}

fn parse_or(cur: &mut TagCursor<'_>) -> SyntaxResult<Expr> {
    let mut lhs = parse_and(cur)?;
    while cur.peek() == Some(Tag::Or) {
        cur.advance();
        let rhs = parse_and(cur)?;
        lhs = Expr::Binary(BinaryOp::Or, Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

fn parse_and(cur: &mut TagCursor<'_>) -> SyntaxResult<Expr> {
    let mut lhs = parse_not(cur)?;
    while cur.peek() == Some(Tag::And) {
        cur.advance();
        let rhs = parse_not(cur)?;
        lhs = Expr::Binary(BinaryOp::And, Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

fn parse_not(cur: &mut TagCursor<'_>) -> SyntaxResult<Expr> {
    if cur.peek() == Some(Tag::Not) {
        cur.advance();
        let operand = parse_not(cur)?;
        return Ok(Expr::Unary(UnaryOp::Not, Box::new(operand)));
    }
    parse_comparison(cur)
}

/// Map a comparison token; also used by `case` clauses.
pub(crate) fn comparison(tag: Tag) -> Option<BinaryOp> {
    match tag {
        Tag::Equal => Some(BinaryOp::Eq),
        Tag::NotEqual => Some(BinaryOp::NotEq),
        Tag::Less => Some(BinaryOp::Lt),
        Tag::LessEqual => Some(BinaryOp::LtEq),
        Tag::Greater => Some(BinaryOp::Gt),
        Tag::GreaterEqual => Some(BinaryOp::GtEq),
        _ => None,
    }
}

fn parse_comparison(cur: &mut TagCursor<'_>) -> SyntaxResult<Expr> {
    let lhs = parse_additive(cur)?;
    let op = match cur.peek().and_then(comparison) {
        Some(op) => op,
        None => return Ok(lhs),
    };
    cur.advance();
    let rhs = parse_additive(cur)?;
    if cur.peek().and_then(comparison).is_some() {
        return Err(cur.error(SyntaxError::ChainedComparison));
    }
    Ok(Expr::Binary(op, Box::new(lhs), Box::new(rhs)))
}

fn parse_additive(cur: &mut TagCursor<'_>) -> SyntaxResult<Expr> {
    let mut lhs = parse_multiplicative(cur)?;
    loop {
        let op = match cur.peek() {
            Some(Tag::Plus) => BinaryOp::Add,
            Some(Tag::Minus) => BinaryOp::Sub,
            _ => break,
        };
        cur.advance();
        let rhs = parse_multiplicative(cur)?;
        lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

fn parse_multiplicative(cur: &mut TagCursor<'_>) -> SyntaxResult<Expr> {
    let mut lhs = parse_unary(cur)?;
    loop {
        let op = match cur.peek() {
            Some(Tag::Star) => BinaryOp::Mul,
            Some(Tag::Slash) => BinaryOp::Div,
            Some(Tag::Percent) => BinaryOp::Mod,
            _ => break,
        };
        cur.advance();
        let rhs = parse_unary(cur)?;
        lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

fn parse_unary(cur: &mut TagCursor<'_>) -> SyntaxResult<Expr> {
    if cur.peek() == Some(Tag::Minus) {
        cur.advance();
        let operand = parse_unary(cur)?;
        return Ok(Expr::Unary(UnaryOp::Neg, Box::new(operand)));
    }
    parse_postfix(cur)
}

fn parse_postfix(cur: &mut TagCursor<'_>) -> SyntaxResult<Expr> {
    let mut expr = parse_primary(cur)?;
    loop {
        match cur.peek() {
            Some(Tag::Dot) => {
                cur.advance();
                let name = plain_identifier(cur)?;
                expr = Expr::Attribute(Box::new(expr), name);
            }
            Some(Tag::OpenBracket) => {
                cur.advance();
                let index = parse_or(cur)?;
                cur.expect(Tag::CloseBracket)?;
                expr = Expr::Item(Box::new(expr), Box::new(index));
            }
            Some(Tag::OpenParen) => {
                cur.advance();
                let args = arguments(cur)?;
                expr = Expr::Call(Box::new(expr), args);
            }
            _ => break,
        }
    }
    Ok(expr)
}

fn arguments(cur: &mut TagCursor<'_>) -> SyntaxResult<Vec<Expr>> {
    let mut args = Vec::new();
    if cur.peek() == Some(Tag::CloseParen) {
        cur.advance();
        return Ok(args);
    }
    loop {
        args.push(parse_or(cur)?);
        match cur.peek() {
            Some(Tag::Comma) => cur.advance(),
            Some(Tag::CloseParen) => {
                cur.advance();
                break;
            }
            _ => return Err(cur.error(SyntaxError::Unexpected)),
        }
    }
    Ok(args)
}

fn parse_primary(cur: &mut TagCursor<'_>) -> SyntaxResult<Expr> {
    match cur.peek() {
        Some(Tag::Integer) => {
            let span = cur.expect(Tag::Integer)?;
            let raw = cur.slice(&span);
            let value = raw
                .parse::<i64>()
                .map_err(|_| cur.error(SyntaxError::BadNumberLiteral))?;
            Ok(Expr::Integer(value))
        }
        Some(Tag::Float) => {
            let span = cur.expect(Tag::Float)?;
            let raw = cur.slice(&span);
            let value = raw
                .parse::<f64>()
                .map_err(|_| cur.error(SyntaxError::BadNumberLiteral))?;
            Ok(Expr::Float(value))
        }
        Some(Tag::DoubleString) | Some(Tag::SingleString) => {
            let span = match cur.next() {
                Some((_, span)) => span,
                None => return Err(cur.error(SyntaxError::Unexpected)),
            };
            let raw = cur.slice(&span);
            Ok(Expr::String(unescape(&raw[1..raw.len() - 1])))
        }
        Some(Tag::OpenParen) => {
            cur.advance();
            let expr = parse_or(cur)?;
            cur.expect(Tag::CloseParen)?;
            Ok(expr)
        }
        Some(Tag::OpenBracket) => parse_container(cur),
        Some(Tag::Identifier) => {
            let parsed = target(cur)?;
            Ok(Expr::Variable(parsed))
        }
        _ => Err(cur.error(SyntaxError::Unexpected)),
    }
}

/// Parse a list literal `[a, b]`, a dict literal `[k: v]` or the
/// empty dict `[:]` after the opening bracket has been seen.
fn parse_container(cur: &mut TagCursor<'_>) -> SyntaxResult<Expr> {
    cur.expect(Tag::OpenBracket)?;
    match cur.peek() {
        Some(Tag::CloseBracket) => {
            cur.advance();
            return Ok(Expr::List(Vec::new()));
        }
        Some(Tag::Colon) => {
            cur.advance();
            cur.expect(Tag::CloseBracket)?;
            return Ok(Expr::Dict(Vec::new()));
        }
        _ => {}
    }

    let first = parse_or(cur)?;
    if cur.peek() == Some(Tag::Colon) {
        cur.advance();
        let value = parse_or(cur)?;
        let mut entries = vec![(first, value)];
        while cur.peek() == Some(Tag::Comma) {
            cur.advance();
            let key = parse_or(cur)?;
            cur.expect(Tag::Colon)?;
            let value = parse_or(cur)?;
            entries.push((key, value));
        }
        cur.expect(Tag::CloseBracket)?;
        return Ok(Expr::Dict(entries));
    }

    let mut items = vec![first];
    while cur.peek() == Some(Tag::Comma) {
        cur.advance();
        items.push(parse_or(cur)?);
    }
    cur.expect(Tag::CloseBracket)?;
    Ok(Expr::List(items))
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
