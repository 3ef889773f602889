//! Tax question answering: retrieval plus language-model synthesis.

pub mod retrieval;

use std::fs;
use std::path::Path;

use crate::ollama::{ChatMessage, OllamaClient};

pub use retrieval::RelevantSection;

use retrieval::truncate_chars;

/// Characters of each section included in the prompt context.
const PROMPT_SECTION_CHARS: usize = 300;

/// Reply when retrieval finds nothing.
const NO_MATCH_REPLY: &str = "I couldn't find specific information about that in the tax code. \
    Please try rephrasing your question or ask something more specific about tax regulations.";

/// Reply when the model call fails; surfaced instead of the error.
const TROUBLE_REPLY: &str =
    "I'm having trouble processing your question right now. Please try again later.";

/// Answers tax questions by quoting retrieved tax-code sections to a
/// language model.
pub struct TaxAgent {
    client: OllamaClient,
    tax_code: String,
    history: Vec<ChatMessage>,
}

impl TaxAgent {
    /// Build an agent over an already-loaded tax code document.
    pub fn new(tax_code: impl Into<String>, client: OllamaClient) -> Self {
        Self {
            client,
            tax_code: tax_code.into(),
            history: Vec::new(),
        }
    }

    /// Build an agent from the tax code file on disk.
    ///
    /// A missing or unreadable file degrades to a placeholder document so
    /// queries still answer (with the no-match reply) instead of crashing.
    pub fn from_file(path: &Path, client: OllamaClient) -> Self {
        let tax_code = match fs::read_to_string(path) {
            Ok(content) => {
                tracing::info!(chars = content.len(), path = %path.display(), "loaded tax code");
                content
            }
            Err(err) => {
                tracing::error!(path = %path.display(), error = %err, "tax code file not readable");
                "Tax code document not available.".to_owned()
            }
        };
        Self::new(tax_code, client)
    }

    /// Answer one question, recording it and the reply in the conversation
    /// history.
    ///
    /// Never fails: retrieval misses and model errors surface as apologetic
    /// reply text.
    pub fn query(&mut self, question: &str) -> String {
        tracing::info!(%question, "received query");
        self.history.push(ChatMessage::user(question));

        let sections = retrieval::find_relevant_sections(&self.tax_code, question);
        let response = self.generate_response(question, &sections);

        self.history.push(ChatMessage::assistant(&response));
        response
    }

    /// The conversation so far, oldest first.
    #[must_use]
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    fn generate_response(&self, question: &str, sections: &[RelevantSection]) -> String {
        if sections.is_empty() {
            return NO_MATCH_REPLY.to_owned();
        }

        let prompt = build_prompt(question, sections);
        match self.client.chat(&[ChatMessage::user(prompt)]) {
            Ok(mut answer) => {
                if !answer.contains("Source:")
                    && let Some(first) = sections.first()
                {
                    answer.push_str(&format!("\n\nSource: {}", first.citation));
                }
                answer
            }
            Err(err) => {
                tracing::error!(error = %err, "error generating response");
                TROUBLE_REPLY.to_owned()
            }
        }
    }
}

fn build_prompt(question: &str, sections: &[RelevantSection]) -> String {
    let context = sections
        .iter()
        .map(|section| {
            format!(
                "Section: {}\n{}...",
                section.heading,
                truncate_chars(&section.content, PROMPT_SECTION_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are a tax expert assistant. Answer the following tax question using ONLY the \
         provided sections of the US Tax Code.\n\
         If the answer is not clear from these sections, admit that you don't have enough \
         information.\n\
         Always cite your sources using the citation format at the end of each relevant \
         section.\n\n\
         Question: {question}\n\n\
         Relevant Tax Code Sections:\n{context}\n\n\
         Answer the question concisely and accurately, citing the specific sections of the \
         tax code that support your answer."
    )
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::ollama::OllamaClient;

    use super::*;

    const TAX_CODE: &str = "## §63 Taxable Income Defined\n\n\
        Gross income minus the deductions allowed by this chapter.\n";

    fn offline_client() -> OllamaClient {
        // Points at a closed port so any accidental network call fails fast.
        OllamaClient::with_host("http://127.0.0.1:9", "test-model")
    }

    #[test]
    fn unanswerable_question_gets_the_no_match_reply() {
        let mut agent = TaxAgent::new(TAX_CODE, offline_client());
        let reply = agent.query("zzzzz qqqqq");
        assert!(reply.contains("couldn't find specific information"));
    }

    #[test]
    fn model_failure_surfaces_as_apology_not_error() {
        let mut agent = TaxAgent::new(TAX_CODE, offline_client());
        let reply = agent.query("What is the standard deduction?");
        assert_eq!(reply, TROUBLE_REPLY);
    }

    #[test]
    fn history_records_both_sides() {
        let mut agent = TaxAgent::new(TAX_CODE, offline_client());
        agent.query("zzzzz");
        let history = agent.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, "user");
        assert_eq!(history[1].role, "assistant");
    }

    #[test]
    fn missing_file_degrades_to_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let mut agent = TaxAgent::from_file(&dir.path().join("absent.md"), offline_client());
        let reply = agent.query("What about deductions?");
        assert!(reply.contains("couldn't find specific information"));
    }

    #[test]
    fn prompt_embeds_question_and_truncated_sections() {
        let sections = vec![RelevantSection {
            heading: "## §63 Taxable Income Defined".to_owned(),
            content: "c".repeat(500),
            citation: "26 USC §63 [Taxable Income Defined]".to_owned(),
            relevance: 1,
        }];
        let prompt = build_prompt("What is taxable income?", &sections);
        assert!(prompt.contains("Question: What is taxable income?"));
        assert!(prompt.contains("Section: ## §63 Taxable Income Defined"));
        // 500-char content is clipped to 300 in the prompt.
        assert!(prompt.contains(&"c".repeat(300)));
        assert!(!prompt.contains(&"c".repeat(301)));
    }
}
