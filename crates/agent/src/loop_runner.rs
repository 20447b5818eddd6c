//! The agent reasoning loop implementation.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use qogito_core::approval::CommandApprover;
use qogito_core::budget::TokenBudget;
use qogito_core::error::{ProviderError, ToolError};
use qogito_core::message::{ConversationId, Message, ToolCall};
use qogito_core::mode::Mode;
use qogito_core::provider::{CompletionClient, Outcome};
use qogito_core::tool::{ToolDefinition, ToolExecutor, ToolInvocation, names};
use qogito_core::transcript::{EntryRole, Transcript};
use qogito_tools::tools_for_mode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::compaction::{CompactionOutcome, compact};
use crate::stream_event::{AgentEvent, EventSink};

/// Result text when the user declines a shell command.
pub const COMMAND_DENIED: &str = "Command denied by user.";

/// Result text for calls cut short by a stop, so every call id stays answered.
pub const CALL_STOPPED: &str = "Stopped by user.";

/// How a turn ended. Failures are also recorded on the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model produced a final reply.
    Completed,

    /// The context was full; the turn ended with a compaction attempt
    /// instead of a request.
    Compacted(CompactionOutcome),

    /// The user stopped the turn. Partial output stays visible.
    Stopped,

    /// The completion request failed.
    Failed(ProviderError),
}

/// Cancels the turn in flight, if any. Cheap to clone and hand to a
/// signal handler or UI thread.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    current: Arc<Mutex<Option<CancellationToken>>>,
}

impl StopHandle {
    /// Returns `true` if a turn was in flight.
    pub fn stop(&self) -> bool {
        match self.slot().as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.slot() = Some(token.clone());
        token
    }

    fn finish(&self) {
        *self.slot() = None;
    }
}

/// Failure of a single tool call as seen by the loop.
enum CallError {
    Tool(ToolError),
    /// The turn was stopped while the call waited for approval.
    Stopped,
}

impl From<ToolError> for CallError {
    fn from(e: ToolError) -> Self {
        Self::Tool(e)
    }
}

/// Orchestrates one conversation: streams replies, runs tools, and keeps the
/// canonical history and the display transcript in step.
pub struct AgentLoop {
    client: Arc<dyn CompletionClient>,
    executor: Arc<dyn ToolExecutor>,
    approver: Arc<dyn CommandApprover>,

    system_prompt: String,
    mode: Mode,
    allow_run_command: bool,
    workspace_root: Option<PathBuf>,

    /// Messages sent to the server.
    history: Vec<Message>,

    /// What the user sees.
    transcript: Transcript,

    generating: bool,
    stop: StopHandle,
    events: EventSink,
    conversation_id: ConversationId,
}

impl AgentLoop {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        executor: Arc<dyn ToolExecutor>,
        approver: Arc<dyn CommandApprover>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            client,
            executor,
            approver,
            system_prompt: system_prompt.into(),
            mode: Mode::default(),
            allow_run_command: true,
            workspace_root: None,
            history: Vec::new(),
            transcript: Transcript::new(),
            generating: false,
            stop: StopHandle::default(),
            events: EventSink::none(),
            conversation_id: ConversationId::new(),
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    pub fn with_allow_run_command(mut self, allow: bool) -> Self {
        self.allow_run_command = allow;
        self
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    /// Takes effect at the start of the next turn.
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.system_prompt = prompt.into();
    }

    /// Switch the tool set. History is left as is.
    pub fn set_mode(&mut self, mode: Mode) {
        info!(conversation_id = %self.conversation_id, mode = %mode, "Mode changed");
        self.mode = mode;
    }

    pub fn set_allow_run_command(&mut self, allow: bool) {
        self.allow_run_command = allow;
    }

    pub fn set_workspace_root(&mut self, root: Option<PathBuf>) {
        self.workspace_root = root;
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn workspace_root(&self) -> Option<&Path> {
        self.workspace_root.as_deref()
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    pub fn token_budget(&self) -> TokenBudget {
        self.client.token_budget()
    }

    /// The tools offered to the model right now.
    pub fn active_tools(&self) -> Vec<ToolDefinition> {
        tools_for_mode(self.mode, self.allow_run_command)
    }

    /// Forget the whole conversation.
    pub fn clear(&mut self) {
        self.history.clear();
        self.transcript.clear();
        self.client.reset_token_count();
        debug!(conversation_id = %self.conversation_id, "Conversation cleared");
    }

    /// Run one turn for `text`, until the model stops calling tools.
    ///
    /// Must not be called while a turn is in flight.
    pub async fn handle_user_message(&mut self, text: &str) -> TurnOutcome {
        self.ensure_system_message();
        self.transcript.push(EntryRole::User, text);
        self.history.push(Message::user(text));
        self.generating = true;

        info!(
            conversation_id = %self.conversation_id,
            mode = %self.mode,
            messages = self.history.len(),
            "Processing user message"
        );

        let cancel = self.stop.begin();
        let result = self.run_turn(&cancel).await;
        self.stop.finish();
        self.generating = false;

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) if e.is_aborted() => {
                debug!(conversation_id = %self.conversation_id, "Turn stopped by user");
                TurnOutcome::Stopped
            }
            Err(e) => {
                warn!(conversation_id = %self.conversation_id, error = %e, "Turn failed");
                self.transcript.mark_last_failed(e.to_string());
                self.events.emit(AgentEvent::Error {
                    message: e.to_string(),
                });
                TurnOutcome::Failed(e)
            }
        };

        let budget = self.client.token_budget();
        self.events.emit(AgentEvent::Done {
            conversation_id: self.conversation_id.to_string(),
            last_total_tokens: budget.last_total_tokens,
            context_size: budget.context_size,
        });
        outcome
    }

    /// History must start with a system message carrying the current prompt.
    fn ensure_system_message(&mut self) {
        match self.history.first_mut() {
            Some(Message::System { content }) => content.clone_from(&self.system_prompt),
            _ => self
                .history
                .insert(0, Message::system(self.system_prompt.as_str())),
        }
    }

    fn should_compact(&self, cancel: &CancellationToken) -> bool {
        !cancel.is_cancelled() && self.client.token_budget().is_near_capacity()
    }

    async fn compact(&mut self, cancel: &CancellationToken) -> CompactionOutcome {
        compact(
            self.client.as_ref(),
            &mut self.history,
            &mut self.transcript,
            &self.events,
            cancel,
        )
        .await
    }

    async fn run_turn(&mut self, cancel: &CancellationToken) -> Result<TurnOutcome, ProviderError> {
        let tools = self.active_tools();
        let mut round = 0usize;

        loop {
            if self.should_compact(cancel) {
                let outcome = self.compact(cancel).await;
                return Ok(TurnOutcome::Compacted(outcome));
            }

            round += 1;
            debug!(conversation_id = %self.conversation_id, round, "Requesting completion");

            self.transcript.push(EntryRole::Assistant, "");
            let mut text = String::new();
            let outcome = {
                let transcript = &mut self.transcript;
                let events = &self.events;
                let mut on_chunk = |chunk: &str| {
                    text.push_str(chunk);
                    transcript.append_to_last(chunk);
                    events.emit(AgentEvent::Chunk {
                        content: chunk.to_string(),
                    });
                };
                self.client
                    .complete(&self.history, &tools, &mut on_chunk, cancel)
                    .await?
            };

            let calls = match outcome {
                Outcome::Done => {
                    self.history.push(Message::assistant(text));
                    break;
                }
                Outcome::ToolCalls(calls) => calls,
            };

            debug!(tool_count = calls.len(), "Executing tool calls");
            if text.is_empty() {
                self.transcript.pop();
            }
            self.history
                .push(Message::assistant_tool_calls(text, calls.clone()));

            for (i, call) in calls.iter().enumerate() {
                if let Err(e) = self.run_tool_call(call, &tools, cancel).await {
                    for skipped in &calls[i + 1..] {
                        self.record_call(skipped);
                        self.record_result(skipped, CALL_STOPPED.to_string(), false);
                    }
                    return Err(e);
                }
            }
        }

        if self.should_compact(cancel) {
            self.compact(cancel).await;
        }
        Ok(TurnOutcome::Completed)
    }

    async fn run_tool_call(
        &mut self,
        call: &ToolCall,
        tools: &[ToolDefinition],
        cancel: &CancellationToken,
    ) -> Result<(), ProviderError> {
        self.record_call(call);

        let (output, success, stopped) = match self.dispatch(call, tools, cancel).await {
            Ok(output) => (output, true, false),
            Err(CallError::Stopped) => (CALL_STOPPED.to_string(), false, true),
            Err(CallError::Tool(e)) => (format!("Error: {e}"), false, false),
        };

        self.record_result(call, output, success);
        if stopped {
            return Err(ProviderError::Aborted);
        }
        Ok(())
    }

    fn record_call(&mut self, call: &ToolCall) {
        self.transcript.push(
            EntryRole::ToolCall,
            format!("{}({})", call.name, call.arguments),
        );
        self.events.emit(AgentEvent::ToolCall {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments: call.arguments.clone(),
        });
    }

    /// Answer `call` on both the transcript and the canonical history.
    fn record_result(&mut self, call: &ToolCall, output: String, success: bool) {
        self.transcript.push(EntryRole::ToolResult, output.as_str());
        self.events.emit(AgentEvent::ToolResult {
            id: call.id.clone(),
            name: call.name.clone(),
            output: output.clone(),
            success,
        });
        self.history.push(Message::tool_result(call.id.as_str(), output));
    }

    async fn dispatch(
        &self,
        call: &ToolCall,
        tools: &[ToolDefinition],
        cancel: &CancellationToken,
    ) -> Result<String, CallError> {
        if !tools.iter().any(|t| t.name == call.name) {
            return Err(ToolError::PermissionDenied {
                tool_name: call.name.clone(),
                mode: self.mode.to_string(),
            }
            .into());
        }

        if call.name == names::LIST_TOOLS {
            let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
            return Ok(names.join("\n"));
        }

        let root = self.workspace_root.as_deref().ok_or(ToolError::NoWorkspace)?;
        let invocation = ToolInvocation::parse(&call.name, &call.arguments)?;

        if let ToolInvocation::RunCommand(args) = &invocation {
            let approved = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(CallError::Stopped),
                approved = self.approver.approve(&args.command) => approved,
            };
            if !approved {
                info!(command = %args.command, "Command denied by user");
                return Ok(COMMAND_DENIED.into());
            }
        }

        Ok(self.executor.execute(&invocation, root).await?)
    }
}
