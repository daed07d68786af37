//! Human-in-the-loop input seam.
use std::io::Write;

use crate::errors::DroidClawResult;

/// Blocking question/answer channel to the operator. The loop consults it
/// for task entry, `ask_human` questions and the post-FINISH next-task
/// prompt.
pub trait HumanInput: Send + Sync {
    fn ask(&self, question: &str) -> DroidClawResult<String>;
}

/// Reads answers from stdin.
pub struct StdinHuman;

impl HumanInput for StdinHuman {
    fn ask(&self, question: &str) -> DroidClawResult<String> {
        let mut stdout = std::io::stdout();
        writeln!(stdout, "{question}")?;
        write!(stdout, "> ")?;
        stdout.flush()?;

        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;
        Ok(answer.trim().to_string())
    }
}
