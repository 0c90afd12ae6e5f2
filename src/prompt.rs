//! Prompt templates for the text generator.

use crate::expr::{ExprKind, ParsedExpression};
use crate::solve::SolutionStep;
use clap::ValueEnum;
use serde::Serialize;
use std::fmt::Write;

/// How much explanation to ask the text generator for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    /// Minimal steps.
    Basic,
    /// A balance of detail and clarity.
    #[default]
    Standard,
    /// The reasoning behind each step, with formulas.
    Detailed,
}

impl DetailLevel {
    fn instruction(self) -> &'static str {
        match self {
            DetailLevel::Basic => "Provide a brief solution with minimal steps.",
            DetailLevel::Standard => {
                "Provide a clear step-by-step solution that balances detail with clarity."
            }
            DetailLevel::Detailed => {
                "Provide a very detailed solution, explaining the mathematical reasoning behind \
                 each step. Include relevant formulas and concepts."
            }
        }
    }
}

/// What is already known about the problem.
#[derive(Debug, Default, Clone, Copy)]
pub struct PromptContext<'a> {
    /// The expression recognised in the problem.
    pub parsed: Option<&'a ParsedExpression>,
    /// A hint at the kind of problem, such as a word problem.
    pub problem_type: Option<ExprKind>,
    /// Steps of an existing solution, to be explained in more depth.
    pub base_steps: &'a [SolutionStep],
}

const PREAMBLE: &str = "\
You are a helpful math assistant that solves algebraic problems step by step.
Your task is to solve the following equation and explain each step clearly.";

const FORMAT: &str = "\
Format your answer as follows:
Step 1: [First step description]
[Mathematical expression]

Step 2: [Second step description]
[Mathematical expression]

...

Final Answer: [The solution]";

/// Build the prompt asking for a step-by-step solution of `problem`.
///
/// The response is expected in the `Step N:` / `Final Answer:` format understood by
/// [`parse_steps`](crate::steps::parse_steps).
pub fn solve_equation_prompt(
    problem: &str,
    detail: DetailLevel,
    context: &PromptContext,
) -> String {
    let mut prompt = format!("{PREAMBLE}\n\nProblem: {problem}");

    // writing into a String does not fail
    if let Some(parsed) = context.parsed.filter(|p| p.body().is_some()) {
        let _ = write!(prompt, "\n\nParsed as: {}", parsed.source());
        if let Some(kind) = parsed.kind() {
            let _ = write!(prompt, "\nType: {kind}");
        }
        let _ = write!(prompt, "\nVariables: {}", parsed.variables().join(", "));
    }

    match context.problem_type {
        Some(ExprKind::WordProblem) => prompt.push_str(
            "\n\nThis is a word problem. Translate it into equations before solving them.",
        ),
        Some(kind) => {
            let _ = write!(prompt, "\n\nProblem type: {kind}");
        }
        None => (),
    }

    if !context.base_steps.is_empty() {
        prompt.push_str("\n\nA correct solution is given below. Explain it in more depth, keeping its result:");
        for step in context.base_steps {
            let _ = write!(
                prompt,
                "\nStep {}: {}\n{}",
                step.index, step.explanation, step.expression
            );
        }
    }

    prompt.push_str("\n\n");
    prompt.push_str(detail.instruction());
    prompt.push_str("\n\n");
    prompt.push_str(FORMAT);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parse;
    use crate::solve;

    #[test]
    fn bare_prompt() {
        let p = solve_equation_prompt("2x + 3 = 7", DetailLevel::Standard, &Default::default());
        assert!(p.starts_with("You are a helpful math assistant"));
        assert!(p.contains("\n\nProblem: 2x + 3 = 7\n\n"));
        assert!(p.contains("balances detail with clarity"));
        assert!(p.ends_with("Final Answer: [The solution]"));
        assert!(!p.contains("Parsed as"));
    }

    #[test]
    fn detail_levels_change_the_instruction() {
        let ctx = PromptContext::default();
        let basic = solve_equation_prompt("p", DetailLevel::Basic, &ctx);
        let detailed = solve_equation_prompt("p", DetailLevel::Detailed, &ctx);
        assert!(basic.contains("minimal steps"));
        assert!(detailed.contains("mathematical reasoning behind each step"));
        assert_ne!(basic, detailed);
    }

    #[test]
    fn parsed_context() {
        let parsed = parse("2x + (3 = 7");
        let ctx = PromptContext {
            parsed: Some(&parsed),
            ..Default::default()
        };
        let p = solve_equation_prompt("whatever", DetailLevel::Standard, &ctx);
        assert!(!p.contains("Parsed as"), "unparsed input carries no context");

        let parsed = parse("3y - 5 = 10");
        let ctx = PromptContext {
            parsed: Some(&parsed),
            ..Default::default()
        };
        let p = solve_equation_prompt("Solve 3y - 5 = 10", DetailLevel::Standard, &ctx);
        assert!(p.contains("Parsed as: 3y - 5 = 10\nType: equation\nVariables: y"));
    }

    #[test]
    fn word_problem_hint() {
        let ctx = PromptContext {
            problem_type: Some(ExprKind::WordProblem),
            ..Default::default()
        };
        let p = solve_equation_prompt("solve for x when…", DetailLevel::Standard, &ctx);
        assert!(p.contains("This is a word problem"));
    }

    #[test]
    fn base_steps_are_listed() {
        let steps = solve::steps([("Start", "2x = 4"), ("Divide by 2", "x = 2")]);
        let ctx = PromptContext {
            base_steps: &steps,
            ..Default::default()
        };
        let p = solve_equation_prompt("2x = 4", DetailLevel::Detailed, &ctx);
        assert!(p.contains("Step 1: Start\n2x = 4\nStep 2: Divide by 2\nx = 2"));
    }
}
