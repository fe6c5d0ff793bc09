//! Retrieval quality harness.
//!
//! Replays `{q, ans_contains}` cases against `/ask` and reports hit rate
//! (expected text found in the answer or any citation) and precision@k
//! (share of returned citations that contain the expected text).

use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::rag::{AnswerAssembler, AnswerResult};

pub const EVAL_TOP_K: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalCase {
    pub q: String,
    pub ans_contains: String,
}

/// Anything that answers a query the way `/ask` does.
#[async_trait]
pub trait AskTarget: Send + Sync {
    async fn ask(&self, query: &str, k: usize) -> anyhow::Result<AnswerResult>;
}

/// Calls a running server over HTTP.
pub struct HttpAskTarget {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAskTarget {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl AskTarget for HttpAskTarget {
    async fn ask(&self, query: &str, k: usize) -> anyhow::Result<AnswerResult> {
        let url = format!("{}/ask", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "query": query, "k": k }))
            .send()
            .await
            .with_context(|| format!("POST {url}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{url} returned {status}: {body}");
        }
        response
            .json::<AnswerResult>()
            .await
            .context("decoding /ask response")
    }
}

/// Answers in-process, without a server.
#[async_trait]
impl AskTarget for AnswerAssembler {
    async fn ask(&self, query: &str, k: usize) -> anyhow::Result<AnswerResult> {
        Ok(self.answer(query, k).await?)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvalTally {
    pub queries: usize,
    pub hits: usize,
    pub retrieved: usize,
    pub correct: usize,
}

impl EvalTally {
    pub fn record(&mut self, case: &EvalCase, result: &AnswerResult) {
        let expected = case.ans_contains.to_lowercase();
        let answer = result.answer.to_lowercase();
        let citation_text = result
            .citations
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        self.queries += 1;
        if answer.contains(&expected) || citation_text.contains(&expected) {
            self.hits += 1;
        }
        self.retrieved += result.citations.len();
        self.correct += result
            .citations
            .iter()
            .filter(|c| c.content.to_lowercase().contains(&expected))
            .count();
    }

    pub fn hit_rate(&self) -> f64 {
        if self.queries == 0 {
            return 0.0;
        }
        self.hits as f64 / self.queries as f64
    }

    pub fn precision(&self) -> f64 {
        if self.retrieved == 0 {
            return 0.0;
        }
        self.correct as f64 / self.retrieved as f64
    }

    pub fn summary(&self, k: usize) -> String {
        format!(
            "n={} | hit_rate={:.2} | precision@{}={:.2}",
            self.queries,
            self.hit_rate(),
            k,
            self.precision()
        )
    }
}

/// Parses a JSONL eval set; blank lines are skipped.
pub fn parse_eval_set(contents: &str) -> anyhow::Result<Vec<EvalCase>> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).with_context(|| format!("eval set line {}", index + 1))
        })
        .collect()
}

pub fn load_eval_set(path: &Path) -> anyhow::Result<Vec<EvalCase>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading eval set {}", path.display()))?;
    parse_eval_set(&contents)
}

pub async fn run_eval(
    target: &dyn AskTarget,
    cases: &[EvalCase],
    k: usize,
) -> anyhow::Result<EvalTally> {
    let mut tally = EvalTally::default();
    for case in cases {
        let result = target.ask(&case.q, k).await?;
        tracing::debug!(
            "{:?}: {} citations, grounding {}",
            case.q,
            result.citations.len(),
            result.grounding_score
        );
        tally.record(case, &result);
    }
    Ok(tally)
}
