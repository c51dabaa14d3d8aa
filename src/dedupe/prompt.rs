use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, bail};

/// Blocking question/answer channel to the person adjudicating clusters.
pub trait Prompter {
    fn prompt(&mut self, message: &str) -> Result<String>;
}

impl<F> Prompter for F
where
    F: FnMut(&str) -> Result<String>,
{
    fn prompt(&mut self, message: &str) -> Result<String> {
        self(message)
    }
}

/// Prints to stdout and reads one line from stdin.
#[derive(Debug, Default)]
pub struct StdioPrompter;

impl Prompter for StdioPrompter {
    fn prompt(&mut self, message: &str) -> Result<String> {
        let mut stdout = io::stdout().lock();
        stdout
            .write_all(message.as_bytes())
            .context("failed to write prompt")?;
        stdout.flush().context("failed to flush prompt")?;

        let mut line = String::new();
        let read = io::stdin()
            .lock()
            .read_line(&mut line)
            .context("failed to read response")?;
        if read == 0 {
            bail!("input closed while waiting for a response");
        }
        Ok(line)
    }
}
