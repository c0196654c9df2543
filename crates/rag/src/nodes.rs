//! Workflow steps
//!
//! Each step is one collaborator call plus the formatting around it. The
//! steps hold no state; [`crate::workflow::AdaptiveRag`] threads their
//! outputs through the run.

use crate::prompts;
use crate::web::{SearchHit, WebSearch};
use askforge_common::errors::Result;
use askforge_common::ChatModel;
use askforge_ingestion::{Document, DocumentIndex};
use tracing::debug;

/// Rewrite the question into a retrieval query
pub async fn enrich_query(llm: &dyn ChatModel, question: &str) -> Result<String> {
    let messages = prompts::ENRICH.render(&[("question", question)])?;
    let rewritten = llm.invoke(&messages).await?;
    Ok(rewritten.trim().to_string())
}

/// Fetch the `k` nearest chunks and format them as one context block
pub async fn retrieve_context(index: &dyn DocumentIndex, query: &str, k: usize) -> Result<String> {
    let documents = index.similarity_search(query, k).await?;
    debug!(results = documents.len(), k, "Chunks retrieved");
    Ok(format_context(&documents))
}

/// `Source: <metadata>\nContent: <text>` per chunk, blank-line separated
pub fn format_context(documents: &[Document]) -> String {
    documents
        .iter()
        .map(|doc| format!("Source: {}\nContent: {}", doc.metadata, doc.page_content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// A judgment counts as relevant only when it starts with "yes"
pub fn is_affirmative(judgment: &str) -> bool {
    judgment.trim().to_lowercase().starts_with("yes")
}

/// Ask the model whether `context` answers `question`
pub async fn validate(llm: &dyn ChatModel, question: &str, context: &str) -> Result<bool> {
    let messages = prompts::VALIDATE.render(&[("question", question), ("context", context)])?;
    let judgment = llm.invoke(&messages).await?;
    let relevant = is_affirmative(&judgment);
    debug!(judgment = %judgment.trim(), relevant, "Relevance judged");
    Ok(relevant)
}

pub async fn answer_from_context(llm: &dyn ChatModel, question: &str, context: &str) -> Result<String> {
    let messages = prompts::ANSWER.render(&[("context", context), ("question", question)])?;
    llm.invoke(&messages).await
}

/// Search the web and join the truncated result contents with newlines
pub async fn search_web(search: &dyn WebSearch, question: &str, max_chars: usize) -> Result<String> {
    let hits = search.search(question).await?;
    Ok(join_results(&hits, max_chars))
}

pub fn join_results(hits: &[SearchHit], max_chars: usize) -> String {
    hits.iter()
        .map(|hit| truncate_chars(&hit.content, max_chars))
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn answer_from_web(llm: &dyn ChatModel, question: &str, web_results: &str) -> Result<String> {
    let messages = prompts::WEB_ANSWER.render(&[("question", question), ("web_results", web_results)])?;
    llm.invoke(&messages).await
}

/// First `max` characters of `s`, never splitting a character
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use askforge_ingestion::DocumentMetadata;

    #[test]
    fn test_is_affirmative() {
        assert!(is_affirmative("YES"));
        assert!(is_affirmative("yes"));
        assert!(is_affirmative("Yes, it does"));
        assert!(is_affirmative("  yes\n"));
        assert!(!is_affirmative("No"));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("Maybe"));
        assert!(!is_affirmative("The answer is yes"));
    }

    #[test]
    fn test_format_context() {
        let docs = vec![
            Document::new("A", DocumentMetadata { source: "hr.pdf".to_string(), page: 0 }),
            Document::new("B", DocumentMetadata { source: "hr.pdf".to_string(), page: 2 }),
        ];
        assert_eq!(
            format_context(&docs),
            "Source: {\"source\":\"hr.pdf\",\"page\":0}\nContent: A\n\n\
             Source: {\"source\":\"hr.pdf\",\"page\":2}\nContent: B"
        );
        assert_eq!(format_context(&[]), "");
    }

    #[test]
    fn test_join_results_truncates() {
        let hits = vec![
            SearchHit { title: None, url: None, content: "x".repeat(1500) },
            SearchHit { title: None, url: None, content: "short".to_string() },
        ];
        let joined = join_results(&hits, 1000);
        let parts: Vec<&str> = joined.split('\n').collect();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].len(), 1000);
        assert_eq!(parts[1], "short");
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }
}
