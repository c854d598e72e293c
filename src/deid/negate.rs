//! Logical negation of row-suppression expressions
//!
//! Callers describe the rows to drop; the output query keeps rows, so the
//! compiler stores the negation. Only operators at parenthesis depth 0 and
//! outside quoted text are rewritten:
//!
//! | operator | negation |
//! |----------|----------|
//! | `EXISTS` / `NOT EXISTS` | swapped |
//! | `IN` / `NOT IN` | swapped |
//! | `LIKE` / `NOT LIKE` | swapped |
//! | `IS` / `IS NOT` | swapped |
//! | `=` | `<>` |
//! | `<>`, `!=` | `=` |
//! | `AND` / `OR` | swapped, result parenthesized |
//!
//! A `NOT` heading a term is removed from that term only; any other `NOT`
//! is rejected. Ordering comparisons, `BETWEEN`, and mixed top-level
//! `AND`/`OR` are rejected with [`DeidError::UnsupportedOperator`].

use crate::domain::{DeidError, Result};
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)'(?:[^']|'')*'|`[^`]*`|\x22[^\x22]*\x22|\(|\)|\bNOT\s+EXISTS\b|\bNOT\s+IN\b|\bNOT\s+LIKE\b|\bIS\s+NOT\b|\bEXISTS\b|\bIN\b|\bLIKE\b|\bIS\b|\bBETWEEN\b|\bNOT\b|\bAND\b|\bOR\b|<>|!=|>=|<=|=|>|<",
    )
    .expect("token pattern is valid")
});

static LEADING_NOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^NOT\b\s*").expect("leading NOT pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Connective {
    And,
    Or,
}

impl Connective {
    fn flipped(self) -> &'static str {
        match self {
            Connective::And => "OR",
            Connective::Or => "AND",
        }
    }
}

/// Top-level structure of an expression
#[derive(Debug, Default)]
struct Scan {
    connectives: Vec<(Range<usize>, Connective)>,
    operators: Vec<(Range<usize>, String)>,
}

/// Negate a boolean SQL expression
///
/// # Errors
///
/// [`DeidError::UnsupportedOperator`] when no documented inversion applies.
pub fn negate(expression: &str) -> Result<String> {
    let expr = strip_outer_parens(expression.trim());
    if expr.is_empty() {
        return Err(DeidError::unsupported(expression, "empty expression"));
    }

    let scan = scan(expr)?;

    if !scan.connectives.is_empty() {
        let first = scan.connectives[0].1;
        if scan.connectives.iter().any(|(_, c)| *c != first) {
            return Err(DeidError::unsupported(
                expression,
                "mixed AND/OR at the top level; parenthesize the expression",
            ));
        }

        let mut atoms = Vec::with_capacity(scan.connectives.len() + 1);
        let mut start = 0;
        for (range, _) in &scan.connectives {
            atoms.push(negate(&expr[start..range.start])?);
            start = range.end;
        }
        atoms.push(negate(&expr[start..])?);

        let joiner = format!(" {} ", first.flipped());
        return Ok(format!("({})", atoms.join(&joiner)));
    }

    // A single term: a leading NOT covers all of it
    if let Some(rest) = leading_not(expr) {
        return Ok(rest.to_string());
    }

    match scan.operators.as_slice() {
        [] => Err(DeidError::unsupported(expression, "no invertible operator")),
        [(range, op)] => {
            let inverse = invert_operator(op)
                .ok_or_else(|| DeidError::unsupported(expression, format!("operator '{op}'")))?;
            Ok(format!(
                "{}{}{}",
                &expr[..range.start],
                inverse,
                &expr[range.end..]
            ))
        }
        _ => Err(DeidError::unsupported(
            expression,
            "more than one comparison operator",
        )),
    }
}

/// Inverse of a single comparison operator, if it has a documented one
fn invert_operator(op: &str) -> Option<&'static str> {
    let normalized = op.split_whitespace().collect::<Vec<_>>().join(" ");
    match normalized.to_uppercase().as_str() {
        "NOT EXISTS" => Some("EXISTS"),
        "EXISTS" => Some("NOT EXISTS"),
        "NOT IN" => Some("IN"),
        "IN" => Some("NOT IN"),
        "NOT LIKE" => Some("LIKE"),
        "LIKE" => Some("NOT LIKE"),
        "IS NOT" => Some("IS"),
        "IS" => Some("IS NOT"),
        "=" => Some("<>"),
        "<>" | "!=" => Some("="),
        _ => None,
    }
}

fn leading_not(expr: &str) -> Option<&str> {
    let found = LEADING_NOT.find(expr)?;
    let rest = &expr[found.end()..];
    let next = rest.split_whitespace().next().unwrap_or_default().to_uppercase();
    if matches!(next.as_str(), "EXISTS" | "IN" | "LIKE") {
        return None;
    }
    Some(strip_outer_parens(rest.trim()))
}

/// Collect depth-0 connectives and operators
///
/// `NOT` is accepted only at the start of a term, that is at the start of the
/// expression or right after a connective.
fn scan(expr: &str) -> Result<Scan> {
    let mut scan = Scan::default();
    let mut depth: usize = 0;
    let mut term_start = 0;

    for token in TOKEN.find_iter(expr) {
        let text = token.as_str();
        match text {
            "(" => depth += 1,
            ")" => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    DeidError::unsupported(expr, "unbalanced parentheses")
                })?;
            }
            _ if depth > 0 => {}
            _ if text.starts_with(['\'', '`', '"']) => {}
            _ => {
                let upper = text.to_uppercase();
                match upper.as_str() {
                    "AND" | "OR" => {
                        let connective = if upper == "AND" {
                            Connective::And
                        } else {
                            Connective::Or
                        };
                        scan.connectives.push((token.range(), connective));
                        term_start = token.end();
                    }
                    "BETWEEN" => {
                        return Err(DeidError::unsupported(expr, "operator 'BETWEEN'"));
                    }
                    "NOT" if expr[term_start..token.start()].trim().is_empty() => {}
                    "NOT" => {
                        return Err(DeidError::unsupported(expr, "embedded 'NOT'"));
                    }
                    _ => scan.operators.push((token.range(), text.to_string())),
                }
            }
        }
    }

    if depth != 0 {
        return Err(DeidError::unsupported(expr, "unbalanced parentheses"));
    }
    Ok(scan)
}

/// Remove parentheses that wrap the whole expression
pub(crate) fn strip_outer_parens(mut expr: &str) -> &str {
    while expr.starts_with('(') && expr.ends_with(')') && closes_at_end(expr) {
        expr = expr[1..expr.len() - 1].trim();
    }
    expr
}

/// Whether the opening parenthesis at index 0 is closed by the final character
fn closes_at_end(expr: &str) -> bool {
    let mut depth = 0usize;
    let mut quoted = false;
    let last = expr.len() - 1;

    for (i, c) in expr.char_indices() {
        match c {
            '\'' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i == last;
                }
            }
            _ => {}
        }
    }
    false
}
