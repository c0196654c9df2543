//! Interactive question loop

use crate::workflow::AdaptiveRag;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::Write;
use tracing::error;

pub const PROMPT: &str = "\nEnter your question (or 'exit'): ";

/// Where the loop reads questions from
pub trait LineSource {
    /// Show `prompt` and read one line; `None` ends the session
    fn read_line(&mut self, prompt: &str) -> anyhow::Result<Option<String>>;
}

/// Terminal input with line editing and in-session history
pub struct TerminalInput {
    editor: DefaultEditor,
}

impl TerminalInput {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl LineSource for TerminalInput {
    fn read_line(&mut self, prompt: &str) -> anyhow::Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    let _ = self.editor.add_history_entry(trimmed);
                }
                Ok(Some(line))
            }
            // Ctrl-C and Ctrl-D both end the session
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
            Err(err) => Err(anyhow::anyhow!("Readline error: {}", err)),
        }
    }
}

/// Read questions until `exit`, end of input or an interrupt.
///
/// A failed run is reported and the loop keeps going. Reading blocks the
/// calling thread; questions are handled one at a time.
pub async fn run_repl<L, W>(rag: &AdaptiveRag, input: &mut L, out: &mut W) -> anyhow::Result<()>
where
    L: LineSource,
    W: Write,
{
    loop {
        let Some(line) = input.read_line(PROMPT)? else {
            writeln!(out)?;
            break;
        };

        let question = line.trim();
        if question.eq_ignore_ascii_case("exit") {
            break;
        }
        if question.is_empty() {
            continue;
        }

        match rag.run(question).await {
            Ok(state) => writeln!(out, "\nAnswer:\n {}", state.answer().unwrap_or_default())?,
            Err(e) => {
                error!(error = %e, "Question failed");
                writeln!(out, "\nError: {}", e)?;
            }
        }
        out.flush()?;
    }

    Ok(())
}
