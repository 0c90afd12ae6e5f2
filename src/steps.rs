//! Reading `Step N:` / `Final Answer:` formatted text into solution steps.

use crate::solve::SolutionStep;
use regex::Regex;
use std::sync::LazyLock;

/// Returned by [`extract_final_answer`] when the text has no final answer.
pub const NO_FINAL_ANSWER: &str = "No final answer provided";

const FINAL_ANSWER: &str = "Final Answer:";

static STEP_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Step \d+:").expect("valid regex literal"));

static STEP_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Step (\d+):([^\n]*)").expect("valid regex literal"));

/// Split generated text into steps.
///
/// Each `Step N:` marker opens a segment which runs until the next marker, a `Final Answer:`
/// marker, or the end of the text. The rest of the marker line is the explanation and the
/// remainder of the segment is the expression. A segment whose header cannot be read is kept,
/// with the explanation `Parsing error` and the raw segment as its expression.
///
/// Text without any marker gives no steps.
///
/// ```rust
/// let raw = "Step 1: Start\n2x=4\nStep 2: Divide\nx=2\nFinal Answer: x=2";
/// let steps = stepsolve::steps::parse_steps(raw);
/// assert_eq!(steps.len(), 2);
/// assert_eq!(steps[1].explanation, "Divide");
/// assert_eq!(steps[1].expression, "x=2");
/// ```
pub fn parse_steps(raw: &str) -> Vec<SolutionStep> {
    let starts = STEP_MARKER
        .find_iter(raw)
        .map(|m| (m.start(), m.end()))
        .collect::<Vec<_>>();

    starts
        .iter()
        .enumerate()
        .map(|(i, &(start, marker_end))| {
            let next_step = starts.get(i + 1).map_or(raw.len(), |&(s, _)| s);
            let end = raw[marker_end..next_step]
                .find(FINAL_ANSWER)
                .map_or(next_step, |at| marker_end + at);
            segment(&raw[start..end], i + 1)
        })
        .collect()
}

fn segment(text: &str, position: usize) -> SolutionStep {
    let header = STEP_HEADER.captures(text).and_then(|c| {
        let index = c[1].parse::<usize>().ok().filter(|&n| n > 0)?;
        let whole = c.get(0)?;
        Some((index, c[2].trim().to_string(), whole.end()))
    });

    match header {
        Some((index, explanation, header_end)) => SolutionStep {
            index,
            explanation,
            expression: text[header_end..].trim().to_string(),
        },
        None => SolutionStep {
            index: position,
            explanation: "Parsing error".to_string(),
            expression: text.trim().to_string(),
        },
    }
}

/// The trimmed text following `Final Answer:`, or [`NO_FINAL_ANSWER`].
pub fn extract_final_answer(raw: &str) -> String {
    raw.find(FINAL_ANSWER)
        .and_then(|at| {
            raw[at + FINAL_ANSWER.len()..]
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
        })
        .unwrap_or(NO_FINAL_ANSWER)
        .to_string()
}
