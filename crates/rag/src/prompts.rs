//! Prompt templates for the four model calls of the workflow

use askforge_common::PromptTemplate;

/// Rewrites the question into a retrieval query
pub const ENRICH: PromptTemplate = PromptTemplate::new(
    "enrich",
    "Rewrite the user question to improve document retrieval.\n\
     Make it more specific and focused.\n\
     DO NOT answer the question.",
    "Original Question:\n{question}\n\nRewritten Question:",
);

/// YES/NO judgment on whether the context answers the question
pub const VALIDATE: PromptTemplate = PromptTemplate::new(
    "validate",
    "You are a strict validator.\n\
     Answer ONLY with YES or NO.\n\
     Say YES only if the context directly answers the question.",
    "Question:\n{question}\n\nContext:\n{context}",
);

pub const ANSWER: PromptTemplate = PromptTemplate::new(
    "answer",
    "You are a helpful assistant.\n\
     Answer ONLY using the provided context.\n\
     If the context does not contain the answer, say so clearly.",
    "Context:\n{context}\n\nQuestion:\n{question}",
);

pub const WEB_ANSWER: PromptTemplate = PromptTemplate::new(
    "web_answer",
    "You answer questions using web search results.\n\
     If the answer is uncertain, say so clearly.",
    "Question:\n{question}\n\nWeb Search Results:\n{web_results}",
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enrich_forbids_answering() {
        let messages = ENRICH.render(&[("question", "How many sick days?")]).unwrap();
        assert!(messages[0].content.ends_with("DO NOT answer the question."));
        assert_eq!(
            messages[1].content,
            "Original Question:\nHow many sick days?\n\nRewritten Question:"
        );
    }

    #[test]
    fn test_every_template_renders_with_its_variables() {
        let vars = [
            ("question", "q"),
            ("context", "c"),
            ("web_results", "w"),
        ];
        for template in [ENRICH, VALIDATE, ANSWER, WEB_ANSWER] {
            let messages = template.render(&vars).unwrap();
            assert_eq!(messages.len(), 2);
            assert!(!messages[1].content.contains('{'));
        }
    }

    #[test]
    fn test_web_answer_needs_results() {
        assert!(WEB_ANSWER.render(&[("question", "q")]).is_err());
    }
}
