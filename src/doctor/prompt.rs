//! Line-based interactive prompts.

use anyhow::{Result, bail};
use std::io::{BufRead, Write};

/// Questions the doctor asks while building a migration.
pub trait Prompter {
    fn confirm(&mut self, question: &str) -> Result<bool>;

    /// Index into `options` of the selected entry.
    fn choose(&mut self, question: &str, options: &[&str]) -> Result<usize>;

    /// Free-text answer, re-asked until `validate` accepts it.
    fn ask(&mut self, question: &str, validate: &dyn Fn(&str) -> Result<(), String>)
    -> Result<String>;
}

/// Prompts on `output`, answers read one line at a time from `input`.
pub struct LinePrompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn read_answer(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            bail!("input closed while waiting for an answer");
        }
        Ok(line.trim().to_string())
    }
}

impl LinePrompter<std::io::StdinLock<'static>, std::io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompter for LinePrompter<R, W> {
    fn confirm(&mut self, question: &str) -> Result<bool> {
        loop {
            let answer = self.read_answer(&format!("{} [y/n] ", question))?;
            match answer.to_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => writeln!(self.output, "Please answer y or n.")?,
            }
        }
    }

    fn choose(&mut self, question: &str, options: &[&str]) -> Result<usize> {
        if options.is_empty() {
            bail!("no options for {:?}", question);
        }
        writeln!(self.output, "{}", question)?;
        for (i, option) in options.iter().enumerate() {
            writeln!(self.output, "  {}) {}", i + 1, option)?;
        }
        loop {
            let answer = self.read_answer("> ")?;
            if let Ok(n) = answer.parse::<usize>() {
                if (1..=options.len()).contains(&n) {
                    return Ok(n - 1);
                }
            }
            if let Some(i) = options.iter().position(|o| o.eq_ignore_ascii_case(&answer)) {
                return Ok(i);
            }
            writeln!(self.output, "Pick 1-{}.", options.len())?;
        }
    }

    fn ask(
        &mut self,
        question: &str,
        validate: &dyn Fn(&str) -> Result<(), String>,
    ) -> Result<String> {
        loop {
            let answer = self.read_answer(&format!("{}: ", question))?;
            match validate(&answer) {
                Ok(()) => return Ok(answer),
                Err(msg) => writeln!(self.output, "{}", msg)?,
            }
        }
    }
}
