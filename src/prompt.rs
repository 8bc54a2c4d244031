//! Line-based user decisions, from the console or from a script

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// Source of answers to interactive questions
pub trait Prompter {
    /// Show `message` and return the answer without its line terminator
    fn ask(&mut self, message: &str) -> crate::Result<String>;
}

/// Asks on stdout and reads answers from stdin
#[derive(Debug, Default)]
pub struct ConsolePrompter;

impl Prompter for ConsolePrompter {
    fn ask(&mut self, message: &str) -> crate::Result<String> {
        print!("{}", message);
        io::stdout().flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// Replays canned answers; once they run out every answer is an empty line
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        }
    }

    /// Messages shown so far
    pub fn asked(&self) -> &[String] {
        &self.asked
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&mut self, message: &str) -> crate::Result<String> {
        self.asked.push(message.to_string());
        Ok(self.answers.pop_front().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_answers_then_enter() {
        let mut prompter = ScriptedPrompter::new(["y", "Common lime"]);

        assert_eq!(prompter.ask("change? ").unwrap(), "y");
        assert_eq!(prompter.ask("which? ").unwrap(), "Common lime");
        assert_eq!(prompter.ask("again? ").unwrap(), "");
        assert_eq!(prompter.asked(), ["change? ", "which? ", "again? "]);
    }
}
