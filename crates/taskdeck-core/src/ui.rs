use std::io::{self, BufRead, Write};

use tracing::warn;

/// Yes/no gate asked before destructive actions.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

/// Fixed answer, for `--yes` and for headless callers.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl Confirm for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> bool {
        self.0
    }
}

/// Prompts on a writer and reads the answer from a line reader.
/// Anything other than `y`/`yes` is a no.
#[derive(Debug)]
pub struct PromptConfirm<R, W> {
    input: R,
    output: W,
}

impl PromptConfirm<io::StdinLock<'static>, io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> PromptConfirm<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Confirm for PromptConfirm<R, W> {
    fn confirm(&mut self, prompt: &str) -> bool {
        if let Err(err) = write!(self.output, "{prompt} [y/N] ").and_then(|_| self.output.flush()) {
            warn!(error = %err, "failed to write confirmation prompt");
            return false;
        }

        let mut answer = String::new();
        match self.input.read_line(&mut answer) {
            Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(err) => {
                warn!(error = %err, "failed to read confirmation answer");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::{AutoConfirm, Confirm, PromptConfirm};

    #[test]
    fn only_explicit_yes_confirms() {
        for (input, expected) in [("y\n", true), ("YES\n", true), ("n\n", false), ("\n", false), ("", false)] {
            let mut output = Vec::new();
            let mut gate = PromptConfirm::new(Cursor::new(input), &mut output);
            assert_eq!(gate.confirm("Delete?"), expected, "input {input:?}");
        }
    }

    #[test]
    fn prompt_is_written() {
        let mut output = Vec::new();
        PromptConfirm::new(Cursor::new("y\n"), &mut output).confirm("Delete task 3?");
        assert_eq!(String::from_utf8_lossy(&output), "Delete task 3? [y/N] ");
    }

    #[test]
    fn auto_confirm_returns_fixed_answer() {
        assert!(AutoConfirm(true).confirm("x"));
        assert!(!AutoConfirm(false).confirm("x"));
    }
}
