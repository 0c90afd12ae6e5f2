use clap::{Args, Parser, Subcommand, ValueEnum};
use miette::*;
use std::{
    io::{self, Write},
    time::Duration,
};

pub mod domain;
pub mod expr;
pub mod extract;
pub mod generate;
pub mod prompt;
pub mod service;
pub mod solve;
pub mod steps;

pub use domain::{classify, Domain};
pub use expr::{parse, ParsedExpression};
pub use extract::extract;
pub use service::{Service, SolveOptions, SolveReport};
pub use solve::Solution;

use generate::{CannedGenerator, CommandGenerator, TextGenerator, Unconfigured};
use prompt::DetailLevel;

/// Step-by-step equation solver.
/// Finds the equations in a problem and explains how to solve them.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct App {
    #[command(subcommand)]
    pub command: Command,

    /// Log more. Repeat for more detail.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Solve a problem given as free text.
    Solve(SolveArgs),

    /// Parse an expression or equation.
    Parse {
        /// The expression or equation.
        #[arg(value_parser = non_empty)]
        expression: String,

        /// The output format to write to stdout.
        #[arg(short, long, default_value_t, value_enum)]
        out: Output,
    },
}

#[derive(Args, Debug)]
pub struct SolveArgs {
    /// The problem text, such as "What is x if 2x + 3 = 7?".
    #[arg(value_parser = non_empty)]
    pub problem: String,

    /// Have the text generator re-explain symbolic solutions.
    #[arg(long)]
    pub enhance: bool,

    /// How much explanation to ask the text generator for.
    #[arg(long, value_enum)]
    pub detail: Option<DetailLevel>,

    /// The output format to write to stdout.
    #[arg(short, long, default_value_t, value_enum)]
    pub out: Output,

    /// Text generator program, with whitespace separated arguments.
    /// It reads a prompt on stdin and writes the continuation to stdout.
    #[arg(long, value_name = "CMD", conflicts_with = "canned")]
    pub generator_cmd: Option<String>,

    /// Seconds to wait for the text generator.
    #[arg(long, value_name = "SECS", default_value_t = 60)]
    pub generator_timeout: u64,

    /// Answer text generator requests with a fixed offline response.
    #[arg(long)]
    pub canned: bool,
}

#[derive(Debug, Copy, Clone, ValueEnum, Default)]
pub enum Output {
    /// Rich table view.
    #[default]
    Table,

    /// Plain, line oriented output.
    Plain,

    /// Pretty printed JSON.
    Json,
}

fn non_empty(s: &str) -> std::result::Result<String, String> {
    let s = s.trim();
    if s.is_empty() {
        Err("must not be empty".to_string())
    } else {
        Ok(s.to_string())
    }
}

impl App {
    pub fn run(self) -> Result<()> {
        match self.command {
            Command::Solve(args) => args.run(),
            Command::Parse { expression, out } => write_parsed(&parse(&expression), out),
        }
    }

    /// Initialise logging to stderr.
    ///
    /// Defaults to warnings, which `RUST_LOG` can override. Each `-v` raises the level.
    pub fn init_logging(&self) {
        let mut builder = env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or("warn"),
        );
        match self.verbose {
            0 => (),
            1 => {
                builder.filter_level(log::LevelFilter::Info);
            }
            2 => {
                builder.filter_level(log::LevelFilter::Debug);
            }
            _ => {
                builder.filter_level(log::LevelFilter::Trace);
            }
        }
        // a logger installed by the host stays
        let _ = builder.format_timestamp(None).try_init();
    }
}

impl SolveArgs {
    fn run(self) -> Result<()> {
        let SolveArgs {
            problem,
            enhance,
            detail,
            out,
            generator_cmd,
            generator_timeout,
            canned,
        } = self;

        let generator: Box<dyn TextGenerator> = match (generator_cmd, canned) {
            (Some(cmd), _) => Box::new(
                CommandGenerator::parse(&cmd, Duration::from_secs(generator_timeout))
                    .wrap_err("invalid --generator-cmd")?,
            ),
            (None, true) => Box::new(CannedGenerator),
            (None, false) => Box::new(Unconfigured),
        };

        let options = SolveOptions {
            enhance_explanation: enhance,
            detail_level: detail,
            parsed_expression: None,
        };
        let report = Service::new(generator).solve_problem(&problem, &options);

        match out {
            Output::Json => write_json(&report)?,
            _ if !report.solution.solved => (),
            Output::Table => write_table(&report).into_diagnostic()?,
            Output::Plain => write_plain(&report).into_diagnostic()?,
        }

        if report.solution.solved {
            return Ok(());
        }

        let error = report.solution.error.unwrap_or_default();
        match report.solution.details {
            Some(details) => Err(miette!("{details}")).wrap_err(error),
            None => Err(miette!("{error}")),
        }
    }
}

fn write_json<T: serde::Serialize>(x: &T) -> Result<()> {
    let w = &mut io::stdout();
    serde_json::to_writer_pretty(&mut *w, x).into_diagnostic()?;
    writeln!(w).into_diagnostic()
}

fn write_table(report: &SolveReport) -> io::Result<()> {
    use comfy_table::{Cell, CellAlignment as CA, Row, Table};

    let SolveReport {
        domain, solution, ..
    } = report;

    let w = &mut io::stdout();

    let mut nfmtr = "[~4]".parse::<numfmt::Formatter>().expect("just fine");

    let mut table = Table::new();

    table.set_header(["Step", "Explanation", "Expression"]);

    for step in &solution.steps {
        let mut row = Row::new();
        row.add_cell(Cell::new(step.index).set_alignment(CA::Right))
            .add_cell(Cell::new(&step.explanation))
            .add_cell(Cell::new(&step.expression));
        table.add_row(row);
    }

    table.load_preset(comfy_table::presets::UTF8_HORIZONTAL_ONLY);

    writeln!(w, "{table}")?;

    if let Some(domain) = domain {
        writeln!(w, "  Domain: {domain}")?;
    }
    if let Some(method) = solution.method {
        writeln!(w, "  Method: {method}")?;
    }
    if let Some(c) = &solution.coefficients {
        let a = nfmtr.fmt(c.a).to_string();
        let b = nfmtr.fmt(c.b).to_string();
        writeln!(w, "  Coefficients: a = {a}, b = {b}, c = {}", nfmtr.fmt(c.c))?;
    }
    if let Some(d) = solution.discriminant {
        writeln!(w, "  Discriminant: {}", nfmtr.fmt(d))?;
    }
    if let Some(result) = &solution.result {
        writeln!(w, "  Result: {result}")?;
    }

    Ok(())
}

fn write_plain(report: &SolveReport) -> io::Result<()> {
    let w = &mut io::stdout();
    let s = &report.solution;

    if let Some(domain) = report.domain {
        writeln!(w, "domain: {domain}")?;
    }
    if let Some(method) = s.method {
        writeln!(w, "method: {method}")?;
    }
    for step in &s.steps {
        writeln!(w, "{}. {}: {}", step.index, step.explanation, step.expression)?;
    }
    if let Some(result) = &s.result {
        writeln!(w, "result: {result}")?;
    }

    Ok(())
}

fn write_parsed(parsed: &ParsedExpression, out: Output) -> Result<()> {
    match out {
        Output::Json => write_json(parsed)?,
        _ if !parsed.is_parsed() => (),
        Output::Table => {
            use comfy_table::Table;

            let mut table = Table::new();
            table.set_header(["Field", "Value"]);
            for (field, value) in parsed_fields(parsed) {
                table.add_row([field, value.as_str()]);
            }
            table.load_preset(comfy_table::presets::UTF8_HORIZONTAL_ONLY);
            writeln!(io::stdout(), "{table}").into_diagnostic()?;
        }
        Output::Plain => {
            let w = &mut io::stdout();
            for (field, value) in parsed_fields(parsed) {
                writeln!(w, "{field}: {value}").into_diagnostic()?;
            }
        }
    }

    match parsed.error() {
        Some(e) => Err(miette!("{e}"))
            .wrap_err_with(|| format!("failed to parse '{}'", parsed.source())),
        None => Ok(()),
    }
}

fn parsed_fields(parsed: &ParsedExpression) -> Vec<(&'static str, String)> {
    let mut fields = vec![
        (
            "kind",
            parsed.kind().map(|k| k.to_string()).unwrap_or_default(),
        ),
        ("variables", parsed.variables().join(", ")),
        ("display", parsed.display().unwrap_or_default()),
    ];
    if let Some((left, right)) = parsed.sides() {
        fields.push(("left", left.text.clone()));
        fields.push(("right", right.text.clone()));
    }
    fields
}
