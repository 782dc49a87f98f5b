//! Prompt composition and answer generation.

use crate::config::AnswerConfig;
use crate::error::{Result, RetrieverError};
use crate::storage::QueryResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::Duration;

/// Default prompt preamble; `{question}` is substituted.
pub const DEFAULT_PREAMBLE: &str = "\
Du bist ein Gelehrter, der die Welt, ihre Orden und ihre Geschichten genau kennt.
Beantworte die Frage \"{question}\" nur mit Hilfe der folgenden Auszüge.
Die Frage kann sich auf Lore, Charaktere, Alchemie, Magie, Lieder oder Glauben beziehen.
Wenn die Auszüge die Antwort nicht enthalten, antworte mit \"Das weiss ich nicht\".
Antworte auf Deutsch und erwähne die Auszüge, die Datenbank oder die Suche nicht.

Auszüge:";

/// Assemble the prompt: preamble, one block per passage, then the question.
pub fn build_prompt(question: &str, results: &[QueryResult], preamble: &str) -> String {
    let mut prompt = preamble.replace("{question}", question);
    prompt.push_str("\n\n");

    for result in results {
        // Writing into a String cannot fail.
        let _ = write!(
            prompt,
            "Dateiname: {}:\n{}\n---\n",
            result.chunk_id, result.content
        );
    }

    let _ = write!(prompt, "\nFrage: {question}\nAntwort:");
    prompt
}

/// Anything that turns a prompt into text.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Build the prompt for `results` and ask `generator` for an answer.
pub async fn answer_question(
    generator: &dyn AnswerGenerator,
    question: &str,
    results: &[QueryResult],
    preamble: &str,
) -> Result<String> {
    let prompt = build_prompt(question, results, preamble);
    tracing::debug!("Prompt:\n{prompt}");

    let answer = generator
        .generate(&prompt)
        .await
        .map_err(|source| RetrieverError::Answer { source })?;
    Ok(answer.trim().to_string())
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Non-streaming `POST {base_url}/api/generate` against Ollama.
#[derive(Debug)]
pub struct OllamaAnswerGenerator {
    config: AnswerConfig,
    client: reqwest::Client,
}

impl OllamaAnswerGenerator {
    pub fn new(config: AnswerConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl AnswerGenerator for OllamaAnswerGenerator {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        tracing::info!("Asking {} for an answer", self.config.model);
        let request = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
        };

        let response: GenerateResponse = self
            .client
            .post(self.endpoint())
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.response)
    }
}
