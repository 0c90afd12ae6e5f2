//! Finding mathematical expressions in free-form problem text.

use crate::expr::{parse, ParsedExpression};
use log::debug;
use regex::Regex;
use std::sync::LazyLock;

/// A power suffix on a term: `^2`, `²` or `³`.
const POW: &str = r"(?:\s*\^\s*\d+|[²³])?";

/// Delimited math first, then equation-shaped text. Alternatives are tried left to right at each
/// position, so text inside delimiters is never reported a second time.
static CANDIDATE: LazyLock<Regex> = LazyLock::new(|| {
    let group = r"\([^()=$`]+\)";
    let term = format!(
        r"(?:\b\d+(?:\.\d+)?(?:\s*\*?\s*(?:[a-z]\b|{group}){POW})?|\b[a-z]\s*{group}{POW}|\b[a-z]\b{POW}|{group}{POW})"
    );
    let side = format!(r"-?\s*{term}(?:\s*[-+*/]\s*{term})*");
    Regex::new(&format!(r"(?i)\$([^$]+)\$|`([^`]+)`|({side}\s*=\s*{side})"))
        .expect("valid regex literal")
});

static WORD_PROBLEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bwhat is [a-z]\b|\bsolve for [a-z]\b|\bfind the value of [a-z]\b|\bsolve the equation\b",
    )
    .expect("valid regex literal")
});

static LOOSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d+\s*[-+*/]\s*\d+\b|\b[a-z]\s*[-+*/]\s*\d+\b").expect("valid regex literal")
});

/// Extract candidate expressions from `text`, in order of appearance.
///
/// Delimited (`$…$`, `` `…` ``) and equation-shaped matches are preferred. If none parse, text
/// containing a cue phrase such as "solve for x" is returned whole as a word problem. As a last
/// resort single-operator arithmetic like `3 + 4` is picked up.
///
/// # Example
/// ```rust
/// use stepsolve::expr::ExprKind;
///
/// let found = stepsolve::extract("Solve the equation 4z + 8 = 20");
/// assert_eq!(found.len(), 1);
/// assert_eq!(found[0].source(), "4z + 8 = 20");
/// assert_eq!(found[0].kind(), Some(ExprKind::Equation));
/// ```
pub fn extract(text: &str) -> Vec<ParsedExpression> {
    let found = parse_matches(
        CANDIDATE
            .captures_iter(text)
            .filter_map(|c| c.get(1).or_else(|| c.get(2)).or_else(|| c.get(3)))
            .map(|m| m.as_str()),
    );
    if !found.is_empty() {
        return found;
    }

    if WORD_PROBLEM.is_match(text) {
        debug!("no equation found, treating the text as a word problem");
        return vec![ParsedExpression::word_problem(text)];
    }

    parse_matches(LOOSE.find_iter(text).map(|m| m.as_str()))
}

fn parse_matches<'a, I>(matches: I) -> Vec<ParsedExpression>
where
    I: Iterator<Item = &'a str>,
{
    matches
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse)
        .filter(|p| {
            if !p.is_parsed() {
                debug!(
                    "discarding candidate '{}': {}",
                    p.source(),
                    p.error().unwrap_or_default()
                );
            }
            p.is_parsed()
        })
        .collect()
}
