use crate::research::controller::{ResearchController, ResearchState};
use crate::types::{Message, Result, SearchResult, Suggestions};
use crate::utils::config::ResearchConfig;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Result of one `invoke`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchOutput {
    /// Final answer with references and suggestions appended
    pub running_summary: String,
    pub web_research_results: Vec<Vec<SearchResult>>,
    pub chat_history: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Suggestions>,
}

impl From<ResearchState> for ResearchOutput {
    fn from(state: ResearchState) -> Self {
        Self {
            running_summary: state.running_summary,
            web_research_results: state.web_research_results,
            chat_history: state.chat_history,
            suggestions: state.suggestions,
        }
    }
}

/// Multi-turn research conversation
///
/// Each `invoke` runs the controller against the conversation so far and
/// keeps the updated conversation for the next turn. A failed turn leaves
/// the conversation unchanged.
pub struct ResearchSession {
    controller: ResearchController,
    chat_history: Vec<Message>,
}

impl ResearchSession {
    pub fn new(controller: ResearchController) -> Self {
        Self {
            controller,
            chat_history: Vec::new(),
        }
    }

    pub fn from_config(config: ResearchConfig) -> Result<Self> {
        Ok(Self::new(ResearchController::from_config(config)?))
    }

    pub async fn invoke(&mut self, query: &str) -> Result<ResearchOutput> {
        info!("Research turn {}: {}", self.turns() + 1, query);
        let state = self.controller.run(query, self.chat_history.clone()).await?;
        self.chat_history = state.chat_history.clone();
        Ok(state.into())
    }

    pub fn chat_history(&self) -> &[Message] {
        &self.chat_history
    }

    /// Completed question/answer turns
    pub fn turns(&self) -> usize {
        self.chat_history
            .iter()
            .filter(|m| m.role == crate::types::MessageRole::Assistant)
            .count()
    }

    pub fn reset(&mut self) {
        self.chat_history.clear();
    }

    pub fn config(&self) -> &ResearchConfig {
        self.controller.config()
    }
}
