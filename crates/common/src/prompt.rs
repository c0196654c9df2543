//! System + human prompt templates with `{name}` placeholders

use crate::errors::{AppError, Result};
use crate::llm::ChatMessage;

/// A two-message prompt: fixed system instructions and a human turn
/// containing named placeholders.
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub name: &'static str,
    pub system: &'static str,
    pub human: &'static str,
}

impl PromptTemplate {
    pub const fn new(name: &'static str, system: &'static str, human: &'static str) -> Self {
        Self { name, system, human }
    }

    /// Fill the placeholders and produce the message list for a model call.
    pub fn render(&self, vars: &[(&str, &str)]) -> Result<Vec<ChatMessage>> {
        Ok(vec![
            ChatMessage::system(fill(self.name, self.system, vars)?),
            ChatMessage::user(fill(self.name, self.human, vars)?),
        ])
    }
}

/// Single pass substitution. Values are inserted verbatim, so braces inside a
/// value are never treated as placeholders.
fn fill(template_name: &str, text: &str, vars: &[(&str, &str)]) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return Ok(out);
        };

        let key = &after[..close];
        if !is_placeholder(key) {
            out.push('{');
            rest = after;
            continue;
        }

        let value = vars
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| *value)
            .ok_or_else(|| AppError::Internal {
                message: format!("prompt '{}' has no value for {{{}}}", template_name, key),
            })?;

        out.push_str(value);
        rest = &after[close + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

fn is_placeholder(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
