//! In-process fakes shared by unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::errors::ApiError;
use crate::llm::{ChatRequest, ChatResponse, EmbedTask, LlmProvider, Role};
use crate::rag::{Retriever, ScoredChunk};

const FAKE_EMBED_DIMS: usize = 64;

/// Scripted chat replies plus bag-of-words embeddings.
///
/// Chat pops the next scripted reply (a fixed text once the script runs
/// out). Embeddings hash lowercase words into a fixed number of buckets,
/// so texts sharing words land close together.
#[derive(Default)]
pub struct FakeLlm {
    replies: Mutex<VecDeque<ChatResponse>>,
    requests: Mutex<Vec<ChatRequest>>,
    embed_calls: AtomicUsize,
    embed_tasks: Mutex<Vec<EmbedTask>>,
    failure: Option<String>,
}

impl FakeLlm {
    pub fn with_replies(replies: Vec<ChatResponse>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_user_prompt(&self) -> Option<String> {
        self.requests().last().and_then(|req| {
            req.messages
                .iter()
                .rev()
                .find(|m| m.role == Role::User)
                .map(|m| m.content.clone())
        })
    }

    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    pub fn embed_tasks(&self) -> Vec<EmbedTask> {
        self.embed_tasks.lock().unwrap().clone()
    }
}

pub fn fake_embedding(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0; FAKE_EMBED_DIMS];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in word.to_lowercase().bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        vector[(hash % FAKE_EMBED_DIMS as u64) as usize] += 1.0;
    }
    vector
}

#[async_trait]
impl LlmProvider for FakeLlm {
    fn name(&self) -> &str {
        "fake"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ApiError> {
        self.requests.lock().unwrap().push(request);
        if let Some(message) = &self.failure {
            return Err(ApiError::upstream(message));
        }
        Ok(self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ChatResponse::text("fake answer")))
    }

    async fn embed(&self, inputs: &[String], task: EmbedTask) -> Result<Vec<Vec<f32>>, ApiError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        self.embed_tasks.lock().unwrap().push(task);
        if let Some(message) = &self.failure {
            return Err(ApiError::upstream(message));
        }
        Ok(inputs.iter().map(|text| fake_embedding(text)).collect())
    }
}

/// Returns the first `k` of a fixed result list, whatever the query.
pub struct FakeRetriever {
    results: Vec<ScoredChunk>,
}

impl FakeRetriever {
    pub fn new(results: Vec<ScoredChunk>) -> Self {
        Self { results }
    }
}

#[async_trait]
impl Retriever for FakeRetriever {
    async fn retrieve(&self, _query: &str, k: usize) -> Result<Vec<ScoredChunk>, ApiError> {
        Ok(self.results.iter().take(k).cloned().collect())
    }
}
