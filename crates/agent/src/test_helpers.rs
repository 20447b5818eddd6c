//! Shared test helpers for agent tests.

use std::sync::Mutex;

use qogito_core::approval::CommandApprover;
use qogito_core::budget::TokenBudget;
use qogito_core::error::ProviderError;
use qogito_core::message::{Message, ToolCall};
use qogito_core::provider::{ChunkSink, CompletionClient, Outcome};
use qogito_core::tool::ToolDefinition;
use tokio_util::sync::CancellationToken;

/// One scripted reply.
pub struct Script {
    chunks: Vec<String>,
    ending: Ending,
    usage: Option<u64>,
}

enum Ending {
    Outcome(Outcome),
    Error(ProviderError),
    /// Block until cancelled, then report `Aborted`.
    Hang,
}

fn owned(chunks: &[&str]) -> Vec<String> {
    chunks.iter().map(|c| c.to_string()).collect()
}

impl Script {
    pub fn text(chunks: &[&str]) -> Self {
        Self {
            chunks: owned(chunks),
            ending: Ending::Outcome(Outcome::Done),
            usage: None,
        }
    }

    pub fn tool_calls(chunks: &[&str], calls: Vec<ToolCall>) -> Self {
        Self {
            chunks: owned(chunks),
            ending: Ending::Outcome(Outcome::ToolCalls(calls)),
            usage: None,
        }
    }

    pub fn fail_after(chunks: &[&str], error: ProviderError) -> Self {
        Self {
            chunks: owned(chunks),
            ending: Ending::Error(error),
            usage: None,
        }
    }

    pub fn hang(chunks: &[&str]) -> Self {
        Self {
            chunks: owned(chunks),
            ending: Ending::Hang,
            usage: None,
        }
    }

    /// Report this token total once the reply has streamed.
    pub fn with_usage(mut self, total_tokens: u64) -> Self {
        self.usage = Some(total_tokens);
        self
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub tool_names: Vec<String>,
}

/// A completion client that replays scripted replies in order.
///
/// Panics if more calls are made than replies provided.
pub struct ScriptedClient {
    scripts: Mutex<Vec<Script>>,
    requests: Mutex<Vec<RecordedRequest>>,
    budget: Mutex<TokenBudget>,
}

impl ScriptedClient {
    pub fn new(mut scripts: Vec<Script>) -> Self {
        scripts.reverse();
        Self {
            scripts: Mutex::new(scripts),
            requests: Mutex::new(Vec::new()),
            budget: Mutex::new(TokenBudget::default()),
        }
    }

    pub fn set_budget(&self, last_total_tokens: u64, context_size: u64) {
        *self.budget.lock().unwrap() = TokenBudget::new(last_total_tokens, context_size);
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn request(&self, index: usize) -> RecordedRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait::async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        on_chunk: &mut ChunkSink<'_>,
        cancel: &CancellationToken,
    ) -> Result<Outcome, ProviderError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            messages: messages.to_vec(),
            tool_names: tools.iter().map(|t| t.name.clone()).collect(),
        });
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| panic!("ScriptedClient: no more replies"));

        if cancel.is_cancelled() {
            return Err(ProviderError::Aborted);
        }
        for chunk in &script.chunks {
            on_chunk(chunk);
        }
        if let Some(total) = script.usage {
            self.budget.lock().unwrap().last_total_tokens = total;
        }
        match script.ending {
            Ending::Outcome(outcome) => Ok(outcome),
            Ending::Error(e) => Err(e),
            Ending::Hang => {
                cancel.cancelled().await;
                Err(ProviderError::Aborted)
            }
        }
    }

    fn token_budget(&self) -> TokenBudget {
        *self.budget.lock().unwrap()
    }

    fn reset_token_count(&self) {
        self.budget.lock().unwrap().last_total_tokens = 0;
    }
}

/// Approver with a fixed answer that records what it was shown.
pub struct ScriptedApprover {
    answer: Option<bool>,
    seen: Mutex<Vec<String>>,
}

impl ScriptedApprover {
    pub fn approving() -> Self {
        Self {
            answer: Some(true),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn denying() -> Self {
        Self {
            answer: Some(false),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Never answers; the prompt stays open until the turn is stopped.
    pub fn unresponsive() -> Self {
        Self {
            answer: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CommandApprover for ScriptedApprover {
    async fn approve(&self, command: &str) -> bool {
        self.seen.lock().unwrap().push(command.to_string());
        match self.answer {
            Some(answer) => answer,
            None => std::future::pending().await,
        }
    }
}

pub fn call(id: &str, name: &str, arguments: &str) -> ToolCall {
    ToolCall {
        id: id.into(),
        name: name.into(),
        arguments: arguments.into(),
    }
}
