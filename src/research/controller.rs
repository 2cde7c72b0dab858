use crate::{
    llm::{LLMClient, strip_thinking_tokens},
    research::{
        aggregator::{SearchAggregator, SearchRequest},
        formatter::{format_citation_list, format_for_model, linkify_sources},
        prompts,
    },
    search::{PageFetcher, SearchBackend},
    types::{AppError, Message, Result, SearchResult, SuggestedQuery, Suggestions},
    utils::{config::ResearchConfig, json_extract::parse_loose_json},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// States of the research loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchStep {
    ReformulateQuestion,
    GenerateQueries,
    WebResearch,
    SummarizeSources,
    ReflectOnSummary,
    FinalizeSummary,
    GenerateSuggestions,
    Done,
}

impl fmt::Display for ResearchStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ReformulateQuestion => "reformulate_question",
            Self::GenerateQueries => "generate_queries",
            Self::WebResearch => "web_research",
            Self::SummarizeSources => "summarize_sources",
            Self::ReflectOnSummary => "reflect_on_summary",
            Self::FinalizeSummary => "finalize_summary",
            Self::GenerateSuggestions => "generate_suggestions",
            Self::Done => "done",
        };
        write!(f, "{}", name)
    }
}

/// Working memory of one research run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchState {
    /// Current (possibly reformulated) question
    pub query: String,
    /// Conversation so far, append-only
    pub chat_history: Vec<Message>,
    /// Queries for the next web research pass
    pub search_queries: Vec<String>,
    /// One entry per research loop
    pub web_research_results: Vec<Vec<SearchResult>>,
    pub research_loop_count: usize,
    pub running_summary: String,
    pub suggestions: Option<Suggestions>,
}

impl ResearchState {
    pub fn new(query: impl Into<String>, chat_history: Vec<Message>) -> Self {
        Self {
            query: query.into(),
            chat_history,
            ..Default::default()
        }
    }

    /// Every source collected so far, in collection order
    pub fn collected_sources(&self) -> impl Iterator<Item = &SearchResult> {
        self.web_research_results.iter().flatten()
    }
}

#[derive(Debug, Deserialize)]
struct GeneratedQueries {
    queries: Vec<SuggestedQuery>,
}

#[derive(Debug, Default, Deserialize)]
struct Reflection {
    #[serde(default)]
    knowledge_gap: String,
    #[serde(default)]
    follow_up_query: String,
}

/// Drives one question through reformulation, bounded research loops,
/// finalization and suggestions.
pub struct ResearchController {
    llm: Box<dyn LLMClient>,
    aggregator: SearchAggregator,
    config: ResearchConfig,
}

impl ResearchController {
    pub fn new(llm: Box<dyn LLMClient>, aggregator: SearchAggregator, config: ResearchConfig) -> Self {
        Self {
            llm,
            aggregator,
            config,
        }
    }

    /// Wire the configured LLM provider, search backend and page fetcher
    pub fn from_config(config: ResearchConfig) -> Result<Self> {
        let llm = config.llm_provider.create_client(&config)?;
        let backend = SearchBackend::from_config(&config)?;
        let fetcher = PageFetcher::new(Duration::from_secs(config.search.fetch_timeout_secs));
        let aggregator = SearchAggregator::new(Arc::new(backend), Arc::new(fetcher))
            .with_fetch_concurrency(config.search.fetch_concurrency)
            .with_min_content_words(config.search.min_content_words);

        Ok(Self::new(llm, aggregator, config))
    }

    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    /// Research `query` given the prior conversation.
    ///
    /// The returned state carries the final summary (with references and
    /// suggestions appended) and the updated conversation.
    pub async fn run(&self, query: &str, prior_conversation: Vec<Message>) -> Result<ResearchState> {
        if query.trim().is_empty() {
            return Err(AppError::InvalidInput("Query must not be empty".to_string()));
        }

        let mut state = ResearchState::new(query.trim(), prior_conversation);
        let mut step = ResearchStep::ReformulateQuestion;

        while step != ResearchStep::Done {
            debug!("Research step: {}", step);
            step = self.advance(step, &mut state).await?;
        }

        info!(
            "Research complete after {} loops, {} sources collected",
            state.research_loop_count,
            state.collected_sources().count()
        );
        Ok(state)
    }

    /// Execute `step` and return the next one
    pub async fn advance(&self, step: ResearchStep, state: &mut ResearchState) -> Result<ResearchStep> {
        let next = match step {
            ResearchStep::ReformulateQuestion => {
                self.reformulate_question(state).await?;
                ResearchStep::GenerateQueries
            }
            ResearchStep::GenerateQueries => {
                self.generate_queries(state).await?;
                ResearchStep::WebResearch
            }
            ResearchStep::WebResearch => {
                self.web_research(state).await?;
                ResearchStep::SummarizeSources
            }
            ResearchStep::SummarizeSources => {
                self.summarize_sources(state).await?;
                ResearchStep::ReflectOnSummary
            }
            ResearchStep::ReflectOnSummary => {
                self.reflect_on_summary(state).await?;
                self.route_research(state)
            }
            ResearchStep::FinalizeSummary => {
                self.finalize_summary(state);
                ResearchStep::GenerateSuggestions
            }
            ResearchStep::GenerateSuggestions => {
                self.generate_suggestions(state).await?;
                ResearchStep::Done
            }
            ResearchStep::Done => ResearchStep::Done,
        };
        Ok(next)
    }

    /// Loop again while the counter has not exceeded the configured maximum,
    /// which allows `max_web_research_loops + 1` passes in total.
    pub fn route_research(&self, state: &ResearchState) -> ResearchStep {
        if state.research_loop_count <= self.config.max_web_research_loops {
            ResearchStep::WebResearch
        } else {
            ResearchStep::FinalizeSummary
        }
    }

    async fn generate(&self, system: &str, prompt: &str, json_mode: bool) -> Result<String> {
        let response = self.llm.complete(system, prompt, json_mode).await?;
        if self.config.strip_thinking_tokens {
            Ok(strip_thinking_tokens(&response))
        } else {
            Ok(response)
        }
    }

    async fn reformulate_question(&self, state: &mut ResearchState) -> Result<()> {
        if state.chat_history.is_empty() {
            state.chat_history.push(Message::user(state.query.clone()));
            return Ok(());
        }

        let transcript = state
            .chat_history
            .iter()
            .map(|m| format!("{}: {}", m.role.transcript_label(), m.content))
            .collect::<Vec<_>>()
            .join("\n");

        let response = self
            .generate(
                prompts::REFORMULATION_SYSTEM,
                &prompts::reformulation_user(&transcript, &state.query),
                false,
            )
            .await?;

        // Models sometimes continue the transcript with an invented next turn
        let reformulated = response.split("human:").next().unwrap_or_default().trim();
        if reformulated.is_empty() {
            warn!("Empty reformulation, keeping the original question");
        } else {
            info!("Reformulated question: {}", reformulated);
            state.query = reformulated.to_string();
        }

        state.chat_history.push(Message::user(state.query.clone()));
        Ok(())
    }

    async fn generate_queries(&self, state: &mut ResearchState) -> Result<()> {
        let count = self.config.initial_num_queries_in_addition;
        if count == 0 {
            state.search_queries = vec![state.query.clone()];
            return Ok(());
        }

        let system = prompts::query_writer_system(count, &prompts::current_date(), &state.query);
        let response = self
            .generate(&system, &prompts::query_writer_user(count), true)
            .await?;

        let generated = parse_loose_json(&response)
            .and_then(|value| serde_json::from_value::<GeneratedQueries>(value).ok())
            .ok_or_else(|| {
                error!("Could not parse generated queries: {}", response);
                AppError::GenerationParse(
                    "query generation did not return a 'queries' list".to_string(),
                )
            })?;

        state.search_queries = std::iter::once(state.query.clone())
            .chain(
                generated
                    .queries
                    .into_iter()
                    .map(|q| q.query.trim().to_string())
                    .filter(|q| !q.is_empty()),
            )
            .collect();
        info!("Search queries: {:?}", state.search_queries);
        Ok(())
    }

    async fn web_research(&self, state: &mut ResearchState) -> Result<()> {
        let request = SearchRequest::new(state.search_queries.clone())
            .max_filtered_results(self.config.max_filtered_results)
            .max_results_per_query(self.config.max_results_per_query)
            .fetch_full_content(self.config.fetch_full_page)
            .exclude(state.collected_sources())
            .site_restriction(self.config.sites_search_restriction.clone());
        let mut next_number = request.exclude_urls.len();

        info!(
            "Research loop {}/{} on {}",
            state.research_loop_count + 1,
            self.config.max_web_research_loops + 1,
            self.aggregator.provider_name()
        );

        let mut results = self.aggregator.execute_search(&request).await?;
        for result in &mut results {
            next_number += 1;
            result.num_source = Some(next_number);
        }

        state.research_loop_count += 1;
        state.web_research_results.push(results);
        Ok(())
    }

    async fn summarize_sources(&self, state: &mut ResearchState) -> Result<()> {
        let Some(latest) = state.web_research_results.last().filter(|r| !r.is_empty()) else {
            warn!("No new sources in this loop, keeping the current summary");
            return Ok(());
        };

        let sources = format_for_model(
            latest,
            self.config.fetch_full_page,
            self.config.max_tokens_per_source,
        );

        let summary = if state.running_summary.is_empty() {
            self.generate(
                prompts::SUMMARIZER_SYSTEM,
                &prompts::summarizer_user(&state.query, &sources),
                false,
            )
            .await?
        } else {
            self.generate(
                prompts::SUMMARIZER_EXTEND_SYSTEM,
                &prompts::summarizer_extend_user(&state.query, &state.running_summary, &sources),
                false,
            )
            .await?
        };

        state.running_summary = summary;
        Ok(())
    }

    async fn reflect_on_summary(&self, state: &mut ResearchState) -> Result<()> {
        let prompt =
            prompts::reflection_user(&state.running_summary, &state.query, &state.search_queries);
        let response = self.generate(prompts::REFLECTION_SYSTEM, &prompt, true).await?;

        let reflection = parse_loose_json(&response)
            .and_then(|value| serde_json::from_value::<Reflection>(value).ok())
            .unwrap_or_default();

        let follow_up = reflection.follow_up_query.trim();
        let follow_up = if follow_up.is_empty() {
            warn!("No usable follow-up query in reflection, using fallback");
            prompts::fallback_follow_up(&state.query)
        } else {
            debug!("Knowledge gap: {}", reflection.knowledge_gap);
            follow_up.to_string()
        };

        info!("Follow-up query: {}", follow_up);
        state.search_queries = vec![follow_up];
        Ok(())
    }

    fn finalize_summary(&self, state: &mut ResearchState) {
        state
            .chat_history
            .push(Message::assistant(state.running_summary.clone()));

        let sources: Vec<SearchResult> = state.collected_sources().cloned().collect();
        let (linked, used) = linkify_sources(&state.running_summary, &sources);

        if used.is_empty() {
            debug!("Final summary cites no sources");
            return;
        }
        state.running_summary = format!(
            "{}\n\n## Sources:\n{}",
            linked,
            format_citation_list(&used)
        );
    }

    async fn generate_suggestions(&self, state: &mut ResearchState) -> Result<()> {
        let response = self
            .generate(
                prompts::SUGGESTIONS_SYSTEM,
                &prompts::suggestions_user(&state.query, &state.running_summary),
                true,
            )
            .await?;

        let suggestions = parse_loose_json(&response)
            .ok_or_else(|| "no JSON object found".to_string())
            .and_then(|value| {
                serde_json::from_value::<Suggestions>(value).map_err(|e| e.to_string())
            })
            .map_err(|reason| {
                error!("Could not parse suggestions: {}", response);
                AppError::GenerationParse(format!("suggestion generation failed: {}", reason))
            })?;

        if !suggestions.suggestions.is_empty() {
            let list = suggestions
                .suggestions
                .iter()
                .enumerate()
                .map(|(i, s)| format!("{}. {}", i + 1, s.query))
                .collect::<Vec<_>>()
                .join("\n");
            state.running_summary = format!("{}\n\n## Suggestions:\n{}", state.running_summary, list);
        }

        state.suggestions = Some(suggestions);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{ContentFetcher, ResultProvider};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedLlm {
        responses: Mutex<Vec<String>>,
    }

    impl ScriptedLlm {
        fn new(responses: &[&str]) -> Self {
            Self {
                responses: Mutex::new(responses.iter().rev().map(|s| s.to_string()).collect()),
            }
        }
    }

    #[async_trait]
    impl LLMClient for ScriptedLlm {
        async fn complete(&self, _system: &str, _prompt: &str, _json_mode: bool) -> Result<String> {
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| AppError::LLM("script exhausted".to_string()))
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    struct NoResults;

    #[async_trait]
    impl ResultProvider for NoResults {
        fn name(&self) -> &str {
            "None"
        }

        async fn search(&self, _: &str, _: usize, _: &[String]) -> Result<Vec<SearchResult>> {
            Ok(Vec::new())
        }
    }

    struct NoFetch;

    #[async_trait]
    impl ContentFetcher for NoFetch {
        async fn fetch(&self, _url: &str) -> Option<String> {
            None
        }
    }

    fn controller(responses: &[&str], config: ResearchConfig) -> ResearchController {
        let aggregator = SearchAggregator::new(Arc::new(NoResults), Arc::new(NoFetch));
        ResearchController::new(Box::new(ScriptedLlm::new(responses)), aggregator, config)
    }

    #[test]
    fn test_route_research_bound() {
        let config = ResearchConfig {
            max_web_research_loops: 2,
            ..Default::default()
        };
        let controller = controller(&[], config);
        let mut state = ResearchState::default();

        for count in 0..=2 {
            state.research_loop_count = count;
            assert_eq!(controller.route_research(&state), ResearchStep::WebResearch);
        }
        state.research_loop_count = 3;
        assert_eq!(controller.route_research(&state), ResearchStep::FinalizeSummary);
    }

    #[tokio::test]
    async fn test_reformulation_without_history_keeps_query() {
        let controller = controller(&[], ResearchConfig::default());
        let mut state = ResearchState::new("what is rust", Vec::new());

        let next = controller
            .advance(ResearchStep::ReformulateQuestion, &mut state)
            .await
            .unwrap();
        assert_eq!(next, ResearchStep::GenerateQueries);
        assert_eq!(state.query, "what is rust");
        assert_eq!(state.chat_history.len(), 1);
        assert_eq!(state.chat_history[0].content, "what is rust");
    }

    #[tokio::test]
    async fn test_reformulation_cuts_simulated_turn() {
        let controller = controller(
            &["<think>hmm</think>What is the borrow checker in Rust?\nhuman: and more"],
            ResearchConfig::default(),
        );
        let history = vec![Message::user("what is rust"), Message::assistant("A language.")];
        let mut state = ResearchState::new("what is its borrow checker", history);

        controller
            .advance(ResearchStep::ReformulateQuestion, &mut state)
            .await
            .unwrap();
        assert_eq!(state.query, "What is the borrow checker in Rust?");
        assert_eq!(state.chat_history.len(), 3);
        assert_eq!(state.chat_history[2].content, "What is the borrow checker in Rust?");
    }

    #[tokio::test]
    async fn test_zero_additional_queries_skips_generation() {
        let config = ResearchConfig {
            initial_num_queries_in_addition: 0,
            ..Default::default()
        };
        let controller = controller(&[], config);
        let mut state = ResearchState::new("q", Vec::new());

        controller
            .advance(ResearchStep::GenerateQueries, &mut state)
            .await
            .unwrap();
        assert_eq!(state.search_queries, vec!["q"]);
    }

    #[tokio::test]
    async fn test_generated_queries_follow_original() {
        let controller = controller(
            &[r#"```json
{"queries": [{"query": "q one", "rationale": "r"}, {"query": "q two", "rationale": "r"}]}
```"#],
            ResearchConfig::default(),
        );
        let mut state = ResearchState::new("original", Vec::new());

        controller
            .advance(ResearchStep::GenerateQueries, &mut state)
            .await
            .unwrap();
        assert_eq!(state.search_queries, vec!["original", "q one", "q two"]);
    }

    #[tokio::test]
    async fn test_unparseable_queries_are_fatal() {
        let controller = controller(&["I cannot do that."], ResearchConfig::default());
        let mut state = ResearchState::new("original", Vec::new());

        let result = controller
            .advance(ResearchStep::GenerateQueries, &mut state)
            .await;
        assert!(matches!(result, Err(AppError::GenerationParse(_))));
    }

    #[tokio::test]
    async fn test_summarize_empty_loop_is_noop() {
        let controller = controller(&[], ResearchConfig::default());
        let mut state = ResearchState::new("q", Vec::new());
        state.running_summary = "existing".to_string();
        state.web_research_results.push(Vec::new());

        controller
            .advance(ResearchStep::SummarizeSources, &mut state)
            .await
            .unwrap();
        assert_eq!(state.running_summary, "existing");
    }

    #[tokio::test]
    async fn test_reflection_fallback() {
        let controller = controller(&["not json at all"], ResearchConfig::default());
        let mut state = ResearchState::new("regulatory update", Vec::new());
        state.search_queries = vec!["regulatory update".to_string()];

        controller
            .advance(ResearchStep::ReflectOnSummary, &mut state)
            .await
            .unwrap();
        assert_eq!(
            state.search_queries,
            vec!["Give me further insights on **regulatory update**"]
        );
    }

    #[tokio::test]
    async fn test_finalize_without_citations_keeps_summary() {
        let controller = controller(&[], ResearchConfig::default());
        let mut state = ResearchState::new("q", vec![Message::user("q")]);
        state.running_summary = "No sources were cited.".to_string();

        let next = controller
            .advance(ResearchStep::FinalizeSummary, &mut state)
            .await
            .unwrap();
        assert_eq!(next, ResearchStep::GenerateSuggestions);
        assert_eq!(state.running_summary, "No sources were cited.");
        assert_eq!(state.chat_history.last().unwrap().content, "No sources were cited.");
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let controller = controller(&[], ResearchConfig::default());
        let result = controller.run("   ", Vec::new()).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }
}
