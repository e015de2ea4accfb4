//! Interactive yes/no confirmation.

use std::io::{self, BufRead, Write};

/// Something that can ask the user a question and read back one line.
pub trait Prompt {
    /// Shows `question` and returns the answer without its line ending.
    ///
    /// End of input is reported as [`io::ErrorKind::UnexpectedEof`].
    fn ask(&mut self, question: &str) -> io::Result<String>;
}

/// A prompt over any line reader and writer.
#[derive(Debug)]
pub struct LinePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    /// Creates a prompt reading answers from `input` and writing questions
    /// to `output`.
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Prompt for LinePrompt<R, W> {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        self.output.write_all(question.as_bytes())?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed before an answer was given",
            ));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// The terminal prompt.
pub type StdinPrompt = LinePrompt<io::StdinLock<'static>, io::Stdout>;

impl StdinPrompt {
    /// Creates a prompt on the process's stdin and stdout.
    pub fn stdin() -> Self {
        LinePrompt::new(io::stdin().lock(), io::stdout())
    }
}

/// The user's answer to a confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Go ahead.
    Proceed,
    /// Leave everything as it is.
    Abort,
}

impl Confirmation {
    /// Parses `y`, `yes`, `n` or `no`, ignoring case and surrounding
    /// whitespace.
    pub fn parse(answer: &str) -> Option<Self> {
        match answer.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => Some(Self::Proceed),
            "n" | "no" => Some(Self::Abort),
            _ => None,
        }
    }
}

/// Asks `question` until the answer is a recognised yes or no.
pub fn confirm(prompt: &mut dyn Prompt, question: &str) -> io::Result<Confirmation> {
    loop {
        let answer = prompt.ask(question)?;
        if let Some(confirmation) = Confirmation::parse(&answer) {
            return Ok(confirmation);
        }
        tracing::debug!("unrecognised answer {:?}, asking again", answer);
    }
}
