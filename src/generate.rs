//! Text generation backends used for generative solutions and enhanced explanations.
use super::*;
use log::debug;
use serde::Serialize;
use std::{
    io::{Read, Write},
    process::{Command, Stdio},
    thread,
    time::{Duration, Instant},
};

/// Sampling options passed along with each prompt.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct GenerateOptions {
    pub max_new_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            max_new_tokens: 256,
            temperature: 0.7,
            top_p: 0.95,
        }
    }
}

/// Something that continues a prompt with generated text.
///
/// Implementations return only the continuation, never the prompt itself.
pub trait TextGenerator {
    fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String>;
}

impl<G: TextGenerator + ?Sized> TextGenerator for &G {
    fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String> {
        (**self).generate(prompt, options)
    }
}

impl<G: TextGenerator + ?Sized> TextGenerator for Box<G> {
    fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String> {
        (**self).generate(prompt, options)
    }
}

/// A generator backed by a closure. See [`from_fn`].
#[derive(Debug, Clone, Copy)]
pub struct FnGenerator<F>(F);

/// Use a closure as a [`TextGenerator`].
///
/// ```rust
/// use stepsolve::generate::{from_fn, GenerateOptions, TextGenerator};
///
/// let g = from_fn(|prompt: &str, _: &GenerateOptions| Ok(format!("echo: {}", prompt.len())));
/// assert_eq!(g.generate("abc", &GenerateOptions::default()).unwrap(), "echo: 3");
/// ```
pub fn from_fn<F>(f: F) -> FnGenerator<F>
where
    F: Fn(&str, &GenerateOptions) -> Result<String>,
{
    FnGenerator(f)
}

impl<F> TextGenerator for FnGenerator<F>
where
    F: Fn(&str, &GenerateOptions) -> Result<String>,
{
    fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String> {
        (self.0)(prompt, options)
    }
}

/// The fixed response returned by [`CannedGenerator`].
pub const CANNED_RESPONSE: &str = "Step 1: This is a mock step
2x + 3 = 7

Step 2: Move constants to the right side
2x = 4

Step 3: Divide both sides by 2
x = 2

Final Answer: x = 2";

/// Answers every prompt with [`CANNED_RESPONSE`]. For offline runs and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct CannedGenerator;

impl TextGenerator for CannedGenerator {
    fn generate(&self, _: &str, _: &GenerateOptions) -> Result<String> {
        Ok(CANNED_RESPONSE.to_string())
    }
}

/// Fails every request.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unconfigured;

impl TextGenerator for Unconfigured {
    fn generate(&self, _: &str, _: &GenerateOptions) -> Result<String> {
        Err(miette!("no text generator configured"))
    }
}

/*** A note on the implementation ***
 *
 * The child gets the prompt on stdin and the options as environment variables. Its stdout and
 * stderr are drained on their own threads so a chatty child can not block on a full pipe while
 * we poll for its exit. Once the deadline passes the child is killed; reader threads of a killed
 * child are left to finish on their own.
 */

const POLL: Duration = Duration::from_millis(10);

/// Runs an external program for each prompt.
///
/// The prompt is written to the program's stdin, and the options are passed through the
/// `STEPSOLVE_MAX_NEW_TOKENS`, `STEPSOLVE_TEMPERATURE` and `STEPSOLVE_TOP_P` environment
/// variables. Whatever the program writes to stdout is the generated text. If the output starts
/// with the prompt, the prompt is stripped.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandGenerator {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Split a command line on whitespace into the program and its arguments.
    pub fn parse(command_line: &str, timeout: Duration) -> Result<Self> {
        let mut words = command_line.split_whitespace().map(String::from);
        let program = words
            .next()
            .ok_or_else(|| miette!("generator command is empty"))?;
        Ok(Self::new(program, words.collect(), timeout))
    }
}

impl TextGenerator for CommandGenerator {
    fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String> {
        debug!(
            "running text generator '{}' with {} prompt bytes",
            self.program,
            prompt.len()
        );

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env("STEPSOLVE_MAX_NEW_TOKENS", options.max_new_tokens.to_string())
            .env("STEPSOLVE_TEMPERATURE", options.temperature.to_string())
            .env("STEPSOLVE_TOP_P", options.top_p.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to start text generator '{}'", self.program))?;

        let (stdin, stdout, stderr) =
            match (child.stdin.take(), child.stdout.take(), child.stderr.take()) {
                (Some(i), Some(o), Some(e)) => (i, o, e),
                _ => bail!("text generator '{}' has no piped stdio", self.program),
            };

        let input = prompt.to_string();
        let writer = thread::spawn(move || {
            let mut stdin = stdin;
            stdin.write_all(input.as_bytes())
        });
        let out = drain(stdout);
        let err = drain(stderr);

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait().into_diagnostic()? {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                bail!(
                    "text generator '{}' timed out after {:.1}s",
                    self.program,
                    self.timeout.as_secs_f64()
                );
            }
            thread::sleep(POLL);
        };

        // a child which exits without reading its input closes the pipe early
        if let Ok(Err(e)) = writer.join() {
            debug!("text generator did not take the whole prompt: {e}");
        }

        let out = join(out)?;
        let err = join(err)?;
        ensure!(
            status.success(),
            "text generator '{}' exited with {status}: {}",
            self.program,
            err.trim()
        );

        Ok(out.strip_prefix(prompt).unwrap_or(&out).trim().to_string())
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<std::io::Result<String>> {
    thread::spawn(move || {
        let mut s = String::new();
        pipe.read_to_string(&mut s).map(|_| s)
    })
}

fn join(handle: thread::JoinHandle<std::io::Result<String>>) -> Result<String> {
    handle
        .join()
        .map_err(|_| miette!("text generator output reader panicked"))?
        .into_diagnostic()
        .wrap_err("failed to read text generator output")
}
