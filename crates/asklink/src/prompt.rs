// SPDX-FileCopyrightText: 2026 Asklink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Line-oriented prompts for the interactive commands.

use std::io::{BufRead, IsTerminal, StdinLock, Stdout, Write};

use asklink_core::AsklinkError;

/// Asks questions on `output` and reads one trimmed answer per line from `input`.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl Prompter<StdinLock<'static>, Stdout> {
    /// A prompter on the process's stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Prints `question: ` and returns the trimmed answer. End of input
    /// reads as an empty answer.
    pub fn ask(&mut self, question: &str) -> Result<String, AsklinkError> {
        write!(self.output, "{question}: ").map_err(io_error)?;
        self.output.flush().map_err(io_error)?;

        let mut line = String::new();
        self.input.read_line(&mut line).map_err(io_error)?;
        Ok(line.trim().to_string())
    }

    /// Prints one line of information.
    pub fn say(&mut self, line: &str) -> Result<(), AsklinkError> {
        writeln!(self.output, "{line}").map_err(io_error)
    }

    /// Asks a yes/no question; only `y` and `yes` confirm.
    pub fn confirm(&mut self, question: &str) -> Result<bool, AsklinkError> {
        let answer = self.ask(&format!("{question} [y/N]"))?.to_ascii_lowercase();
        Ok(answer == "y" || answer == "yes")
    }
}

/// Reads a secret without echo when attached to a terminal.
pub fn ask_secret(question: &str) -> Result<String, AsklinkError> {
    if std::io::stdin().is_terminal() {
        let secret = rpassword::prompt_password(format!("{question}: ")).map_err(io_error)?;
        Ok(secret.trim().to_string())
    } else {
        Prompter::stdio().ask(question)
    }
}

fn io_error(e: std::io::Error) -> AsklinkError {
    AsklinkError::Internal(format!("terminal I/O failed: {e}"))
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Cursor;

    use super::*;

    pub(crate) type TestPrompter = Prompter<Cursor<Vec<u8>>, Vec<u8>>;

    /// A prompter fed with `answers`, one per line.
    pub(crate) fn scripted(answers: &[&str]) -> TestPrompter {
        let mut input = answers.join("\n");
        input.push('\n');
        Prompter::new(Cursor::new(input.into_bytes()), Vec::new())
    }

    pub(crate) fn transcript(prompter: &TestPrompter) -> String {
        String::from_utf8_lossy(&prompter.output).into_owned()
    }

    #[test]
    fn ask_trims_and_echoes_question() {
        let mut p = scripted(&["  hello  "]);
        assert_eq!(p.ask("Name").unwrap(), "hello");
        assert_eq!(transcript(&p), "Name: ");
    }

    #[test]
    fn exhausted_input_reads_empty() {
        let mut p = scripted(&[]);
        assert_eq!(p.ask("first").unwrap(), "");
        assert_eq!(p.ask("second").unwrap(), "");
    }

    #[test]
    fn confirm_accepts_only_yes() {
        let mut p = scripted(&["Y", "yes", "n", ""]);
        assert!(p.confirm("a?").unwrap());
        assert!(p.confirm("b?").unwrap());
        assert!(!p.confirm("c?").unwrap());
        assert!(!p.confirm("d?").unwrap());
    }
}
