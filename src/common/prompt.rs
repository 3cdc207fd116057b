//! Yes/no confirmation with a sticky "yes to everything" answer.

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::Result;
use dialoguer::Input;

/// Source of raw answers to confirmation prompts.
pub trait AnswerReader {
    fn read_answer(&mut self, prompt: &str) -> Result<String>;
}

/// Reads answers from the terminal, or from piped stdin when there is none.
#[derive(Debug, Default)]
pub struct TerminalReader;

impl AnswerReader for TerminalReader {
    fn read_answer(&mut self, prompt: &str) -> Result<String> {
        if io::stdin().is_terminal() && io::stderr().is_terminal() {
            let answer = Input::<String>::new()
                .with_prompt(prompt)
                .allow_empty(true)
                .report(false)
                .interact_text()?;
            return Ok(answer);
        }
        LineReader::new(io::stdin().lock(), io::stdout()).read_answer(prompt)
    }
}

/// Prints the prompt and reads one line. End of input is an empty answer,
/// which takes the prompt's default.
pub struct LineReader<I, O> {
    input: I,
    output: O,
}

impl<I: BufRead, O: Write> LineReader<I, O> {
    pub fn new(input: I, output: O) -> Self {
        Self { input, output }
    }
}

impl<I: BufRead, O: Write> AnswerReader for LineReader<I, O> {
    fn read_answer(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{} ", prompt)?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// Asks confirmation questions for the whole run.
///
/// Answering exactly `yes` to any prompt (or passing `--yes`) turns on
/// auto-confirm; from then on every prompt is accepted without reading input.
pub struct Confirmer<R: AnswerReader = TerminalReader> {
    reader: R,
    auto_confirm: bool,
}

impl Confirmer<TerminalReader> {
    pub fn terminal(auto_confirm: bool) -> Self {
        Self::new(TerminalReader, auto_confirm)
    }
}

impl<R: AnswerReader> Confirmer<R> {
    pub fn new(reader: R, auto_confirm: bool) -> Self {
        Self {
            reader,
            auto_confirm,
        }
    }

    #[cfg(test)]
    pub fn auto_confirm(&self) -> bool {
        self.auto_confirm
    }

    pub fn confirm(&mut self, prompt: &str, default_yes: bool) -> Result<bool> {
        if self.auto_confirm {
            return Ok(true);
        }

        let suffix = if default_yes { "[Y/n]" } else { "[y/N]" };
        let full_prompt = if prompt.is_empty() {
            suffix.to_string()
        } else {
            format!("{} {}", prompt, suffix)
        };

        let answer = self.reader.read_answer(&full_prompt)?;
        Ok(self.interpret(answer.trim(), default_yes))
    }

    fn interpret(&mut self, answer: &str, default_yes: bool) -> bool {
        if answer == "yes" {
            self.auto_confirm = true;
            return true;
        }
        match answer.chars().next() {
            None => default_yes,
            Some(c) => c == 'y' || c == 'Y',
        }
    }

    #[cfg(test)]
    pub fn reader(&self) -> &R {
        &self.reader
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;

    #[test]
    fn empty_answer_takes_default() {
        let mut c = scripted(&["", ""]);
        assert!(c.confirm("Update?", true).unwrap());
        assert!(!c.confirm("Reinstall?", false).unwrap());
        assert_eq!(c.reader().prompts, vec!["Update? [Y/n]", "Reinstall? [y/N]"]);
    }

    #[test]
    fn first_letter_decides() {
        let mut c = scripted(&["y", "Yep", "n", "nope", "  Y  ", "x"]);
        assert!(c.confirm("a", false).unwrap());
        assert!(c.confirm("b", false).unwrap());
        assert!(!c.confirm("c", true).unwrap());
        assert!(!c.confirm("d", true).unwrap());
        assert!(c.confirm("e", false).unwrap());
        assert!(!c.confirm("f", true).unwrap());
    }

    #[test]
    fn literal_yes_is_sticky() {
        let mut c = scripted(&["yes"]);
        assert!(!c.auto_confirm());
        assert!(c.confirm("first", false).unwrap());
        assert!(c.auto_confirm());
        // No more scripted answers: these must not read input.
        assert!(c.confirm("second", false).unwrap());
        assert!(c.confirm("third", true).unwrap());
        assert_eq!(c.reader().prompts.len(), 1);
    }

    #[test]
    fn other_yes_spellings_are_not_sticky() {
        let mut c = scripted(&["YES", "y", ""]);
        assert!(c.confirm("a", false).unwrap());
        assert!(c.confirm("b", false).unwrap());
        assert!(!c.confirm("c", false).unwrap());
        assert!(!c.auto_confirm());
    }

    #[test]
    fn preconfirmed_never_reads() {
        let mut c = super::Confirmer::new(ScriptedReader::new(&[]), true);
        assert!(c.confirm("anything", false).unwrap());
        assert!(c.reader().prompts.is_empty());
    }

    #[test]
    fn piped_answers_are_read_line_by_line() {
        let input = std::io::Cursor::new("n\nyes\n");
        let mut output = Vec::new();
        let mut c = super::Confirmer::new(super::LineReader::new(input, &mut output), false);
        assert!(!c.confirm("Reinstall?", true).unwrap());
        assert!(c.confirm("Update?", false).unwrap());
        assert!(c.confirm("Install?", false).unwrap());
        drop(c);
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "Reinstall? [Y/n] Update? [y/N] "
        );
    }

    #[test]
    fn end_of_input_takes_the_default() {
        let mut output = Vec::new();
        let mut c = super::Confirmer::new(
            super::LineReader::new(std::io::empty(), &mut output),
            false,
        );
        assert!(c.confirm("Search on Flatpak?", true).unwrap());
        assert!(!c.confirm("Install \"vim\" instead?", false).unwrap());
    }

    #[test]
    fn empty_prompt_shows_only_suffix() {
        let mut c = scripted(&[""]);
        assert!(c.confirm("", true).unwrap());
        assert_eq!(c.reader().prompts, vec!["[Y/n]"]);
    }
}
