//! Adaptive RAG workflow
//!
//! A fixed five-step graph with one branch:
//!
//! ```text
//! enrich -> retrieve -> validate -+-> answer
//!                                 +-> web search -> web answer
//! ```
//!
//! Every step runs to completion before the next one starts. A failing
//! collaborator call fails the whole run; there is no partial answer.

use crate::nodes;
use crate::web::WebSearch;
use askforge_common::errors::{AppError, Result};
use askforge_common::{metrics, ChatModel};
use askforge_ingestion::DocumentIndex;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Chunks retrieved per question unless configured otherwise
pub const DEFAULT_TOP_K: usize = 5;
/// Characters kept from each web result unless configured otherwise
pub const DEFAULT_MAX_CONTENT_CHARS: usize = 1000;

/// A step of the workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Enrich,
    Retrieve,
    Validate,
    Answer,
    WebSearch,
    WebAnswer,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Enrich => "enrich",
            Stage::Retrieve => "retrieve",
            Stage::Validate => "validate",
            Stage::Answer => "answer",
            Stage::WebSearch => "web_search",
            Stage::WebAnswer => "web_answer",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a single run has produced so far. `None` means the step that
/// writes the field has not run.
#[derive(Debug, Clone, Serialize)]
pub struct RunState {
    pub run_id: Uuid,
    pub question: String,
    pub enriched_question: Option<String>,
    pub context: Option<String>,
    pub is_relevant: Option<bool>,
    pub web_results: Option<String>,
    pub answer: Option<String>,
    /// Steps visited, in order
    pub trace: Vec<Stage>,
}

impl RunState {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            question: question.into(),
            enriched_question: None,
            context: None,
            is_relevant: None,
            web_results: None,
            answer: None,
            trace: Vec::new(),
        }
    }

    pub fn answer(&self) -> Option<&str> {
        self.answer.as_deref()
    }

    /// Whether the run answered from web results
    pub fn used_web(&self) -> bool {
        self.trace.contains(&Stage::WebAnswer)
    }

    fn enter(&mut self, stage: Stage) {
        tracing::debug!(stage = %stage, "Entering stage");
        self.trace.push(stage);
    }
}

/// The workflow with its collaborators injected
pub struct AdaptiveRag {
    llm: Arc<dyn ChatModel>,
    index: Arc<dyn DocumentIndex>,
    search: Arc<dyn WebSearch>,
    top_k: usize,
    max_content_chars: usize,
}

impl AdaptiveRag {
    pub fn new(
        llm: Arc<dyn ChatModel>,
        index: Arc<dyn DocumentIndex>,
        search: Arc<dyn WebSearch>,
    ) -> Self {
        Self {
            llm,
            index,
            search,
            top_k: DEFAULT_TOP_K,
            max_content_chars: DEFAULT_MAX_CONTENT_CHARS,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_max_content_chars(mut self, max_content_chars: usize) -> Self {
        self.max_content_chars = max_content_chars;
        self
    }

    /// Answer one question
    pub async fn run(&self, question: &str) -> Result<RunState> {
        if question.trim().is_empty() {
            return Err(AppError::Validation {
                message: "question must not be empty".to_string(),
                field: Some("question".to_string()),
            });
        }

        let state = RunState::new(question);
        let span = info_span!("workflow", run_id = %state.run_id);

        async move {
            let start = Instant::now();
            let result = self.drive(state).await;

            match &result {
                Ok(state) => {
                    let branch = if state.used_web() { "web" } else { "context" };
                    info!(
                        branch,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Run finished"
                    );
                }
                Err(e) => warn!(error = %e, "Run failed"),
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn drive(&self, mut state: RunState) -> Result<RunState> {
        let llm = self.llm.as_ref();

        state.enter(Stage::Enrich);
        let enriched = nodes::enrich_query(llm, &state.question).await?;
        state.enriched_question = Some(enriched.clone());

        state.enter(Stage::Retrieve);
        let context = nodes::retrieve_context(self.index.as_ref(), &enriched, self.top_k).await?;
        state.context = Some(context.clone());

        state.enter(Stage::Validate);
        let relevant = nodes::validate(llm, &enriched, &context).await?;
        state.is_relevant = Some(relevant);

        if relevant {
            state.enter(Stage::Answer);
            let answer = nodes::answer_from_context(llm, &state.question, &context).await?;
            state.answer = Some(answer);
            metrics::record_workflow_run("context");
        } else {
            state.enter(Stage::WebSearch);
            let web_results =
                nodes::search_web(self.search.as_ref(), &state.question, self.max_content_chars)
                    .await?;
            state.web_results = Some(web_results.clone());

            state.enter(Stage::WebAnswer);
            let answer = nodes::answer_from_web(llm, &state.question, &web_results).await?;
            state.answer = Some(answer);
            metrics::record_workflow_run("web");
        }

        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts;
    use crate::web::SearchHit;
    use askforge_common::llm::ChatMessage;
    use askforge_ingestion::{Document, DocumentMetadata};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Answers by prompt kind and records every call
    struct FakeChat {
        verdict: String,
        calls: Mutex<Vec<(&'static str, String)>>,
    }

    impl FakeChat {
        fn new(verdict: &str) -> Arc<Self> {
            Arc::new(Self {
                verdict: verdict.to_string(),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(&'static str, String)> {
            self.calls.lock().unwrap().clone()
        }

        fn human_for(&self, prompt: &str) -> Option<String> {
            self.calls()
                .into_iter()
                .find(|(name, _)| *name == prompt)
                .map(|(_, human)| human)
        }
    }

    #[async_trait]
    impl ChatModel for FakeChat {
        async fn invoke(&self, messages: &[ChatMessage]) -> Result<String> {
            let system = messages[0].content.as_str();
            let template = [
                prompts::ENRICH,
                prompts::VALIDATE,
                prompts::ANSWER,
                prompts::WEB_ANSWER,
            ]
            .into_iter()
            .find(|t| t.system == system)
            .expect("unknown prompt");

            self.calls
                .lock()
                .unwrap()
                .push((template.name, messages[1].content.clone()));

            Ok(match template.name {
                "enrich" => "  enriched question \n".to_string(),
                "validate" => self.verdict.clone(),
                "answer" => "from context".to_string(),
                _ => "from web".to_string(),
            })
        }

        fn model_name(&self) -> &str {
            "fake"
        }
    }

    struct FakeIndex {
        chunks: Vec<&'static str>,
        queries: Mutex<Vec<(String, usize)>>,
    }

    impl FakeIndex {
        fn new(chunks: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                chunks,
                queries: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl DocumentIndex for FakeIndex {
        async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Document>> {
            self.queries.lock().unwrap().push((query.to_string(), k));
            Ok(self
                .chunks
                .iter()
                .map(|text| {
                    Document::new(
                        *text,
                        DocumentMetadata {
                            source: "hr.pdf".to_string(),
                            page: 0,
                        },
                    )
                })
                .collect())
        }
    }

    struct FailingIndex;

    #[async_trait]
    impl DocumentIndex for FailingIndex {
        async fn similarity_search(&self, _query: &str, _k: usize) -> Result<Vec<Document>> {
            Err(AppError::Index {
                message: "index offline".to_string(),
            })
        }
    }

    struct FakeSearch {
        hits: Vec<SearchHit>,
        queries: Mutex<Vec<String>>,
    }

    impl FakeSearch {
        fn new(contents: &[String]) -> Arc<Self> {
            Arc::new(Self {
                hits: contents
                    .iter()
                    .map(|c| SearchHit {
                        title: None,
                        url: None,
                        content: c.clone(),
                    })
                    .collect(),
                queries: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl WebSearch for FakeSearch {
        async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
            self.queries.lock().unwrap().push(query.to_string());
            Ok(self.hits.clone())
        }
    }

    #[tokio::test]
    async fn test_relevant_context_is_answered_directly() {
        let llm = FakeChat::new("YES");
        let index = FakeIndex::new(vec!["A", "B"]);
        let search = FakeSearch::new(&["unused".to_string()]);
        let rag = AdaptiveRag::new(llm.clone(), index.clone(), search.clone());

        let state = rag.run("How many vacation days?").await.unwrap();

        assert_eq!(state.answer(), Some("from context"));
        assert_eq!(state.is_relevant, Some(true));
        assert!(state.web_results.is_none());
        assert_eq!(
            state.trace,
            vec![Stage::Enrich, Stage::Retrieve, Stage::Validate, Stage::Answer]
        );
        assert!(search.queries.lock().unwrap().is_empty());

        let expected_context = "Source: {\"source\":\"hr.pdf\",\"page\":0}\nContent: A\n\n\
                                Source: {\"source\":\"hr.pdf\",\"page\":0}\nContent: B";
        assert_eq!(state.context.as_deref(), Some(expected_context));
        assert_eq!(
            llm.human_for("answer").unwrap(),
            format!("Context:\n{}\n\nQuestion:\nHow many vacation days?", expected_context)
        );
    }

    #[tokio::test]
    async fn test_retrieval_uses_enriched_question() {
        let llm = FakeChat::new("yes");
        let index = FakeIndex::new(vec!["A"]);
        let rag = AdaptiveRag::new(llm.clone(), index.clone(), FakeSearch::new(&[]));

        let state = rag.run("pto?").await.unwrap();

        assert_eq!(state.enriched_question.as_deref(), Some("enriched question"));
        assert_eq!(
            index.queries.lock().unwrap().as_slice(),
            &[("enriched question".to_string(), DEFAULT_TOP_K)]
        );
        assert!(llm
            .human_for("validate")
            .unwrap()
            .starts_with("Question:\nenriched question\n\nContext:\n"));
    }

    #[tokio::test]
    async fn test_irrelevant_context_falls_back_to_web() {
        let llm = FakeChat::new("NO");
        let search = FakeSearch::new(&["web says 20 days".to_string()]);
        let rag = AdaptiveRag::new(llm.clone(), FakeIndex::new(vec!["A"]), search.clone());

        let state = rag.run("How many vacation days?").await.unwrap();

        assert_eq!(state.answer(), Some("from web"));
        assert_eq!(state.is_relevant, Some(false));
        assert_eq!(state.web_results.as_deref(), Some("web says 20 days"));
        assert_eq!(
            state.trace,
            vec![
                Stage::Enrich,
                Stage::Retrieve,
                Stage::Validate,
                Stage::WebSearch,
                Stage::WebAnswer
            ]
        );
        assert!(llm.human_for("answer").is_none());
        assert_eq!(
            search.queries.lock().unwrap().as_slice(),
            &["How many vacation days?".to_string()]
        );
    }

    #[tokio::test]
    async fn test_empty_index_routes_to_web() {
        let llm = FakeChat::new("NO");
        let rag = AdaptiveRag::new(
            llm.clone(),
            FakeIndex::new(vec![]),
            FakeSearch::new(&["result".to_string()]),
        );

        let state = rag.run("Who is the CEO?").await.unwrap();

        assert_eq!(state.context.as_deref(), Some(""));
        assert_eq!(state.is_relevant, Some(false));
        assert!(state.used_web());
    }

    #[tokio::test]
    async fn test_malformed_verdict_means_not_relevant() {
        let llm = FakeChat::new("Maybe, partially");
        let rag = AdaptiveRag::new(llm, FakeIndex::new(vec!["A"]), FakeSearch::new(&[]));

        let state = rag.run("question").await.unwrap();
        assert_eq!(state.is_relevant, Some(false));
        assert_eq!(state.answer(), Some("from web"));
    }

    #[tokio::test]
    async fn test_web_results_are_truncated() {
        let llm = FakeChat::new("no");
        let long = "y".repeat(2500);
        let rag = AdaptiveRag::new(
            llm.clone(),
            FakeIndex::new(vec![]),
            FakeSearch::new(&[long, "tail".to_string()]),
        );

        let state = rag.run("question").await.unwrap();
        let web = state.web_results.unwrap();
        assert_eq!(web, format!("{}\ntail", "y".repeat(1000)));
        assert!(llm.human_for("web_answer").unwrap().ends_with(&web));
    }

    #[tokio::test]
    async fn test_custom_limits() {
        let llm = FakeChat::new("no");
        let index = FakeIndex::new(vec![]);
        let rag = AdaptiveRag::new(llm, index.clone(), FakeSearch::new(&["abcdef".to_string()]))
            .with_top_k(2)
            .with_max_content_chars(3);

        let state = rag.run("question").await.unwrap();
        assert_eq!(state.web_results.as_deref(), Some("abc"));
        assert_eq!(index.queries.lock().unwrap()[0].1, 2);
    }

    #[tokio::test]
    async fn test_empty_question_is_rejected() {
        let llm = FakeChat::new("YES");
        let rag = AdaptiveRag::new(llm.clone(), FakeIndex::new(vec!["A"]), FakeSearch::new(&[]));

        let err = rag.run("   ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
        assert!(llm.calls().is_empty());
    }

    #[tokio::test]
    async fn test_collaborator_failure_fails_the_run() {
        let llm = FakeChat::new("YES");
        let rag = AdaptiveRag::new(llm.clone(), Arc::new(FailingIndex), FakeSearch::new(&[]));

        let err = rag.run("question").await.unwrap_err();
        assert!(matches!(err, AppError::Index { .. }));
        assert_eq!(llm.calls().len(), 1);
    }

    #[test]
    fn test_fresh_state_is_unset() {
        let state = RunState::new("q");
        assert!(state.enriched_question.is_none());
        assert!(state.context.is_none());
        assert!(state.is_relevant.is_none());
        assert!(state.web_results.is_none());
        assert!(state.answer().is_none());
        assert!(state.trace.is_empty());
        assert_eq!(Stage::WebSearch.to_string(), "web_search");
    }
}
