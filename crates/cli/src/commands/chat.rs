//! `qogito chat`: interactive or single-message chat mode.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use qogito_agent::{AgentEvent, AgentLoop, EventSink, TurnOutcome};
use qogito_core::approval::CommandApprover;
use qogito_core::mode::Mode;
use qogito_providers::LlamaCppClient;
use qogito_tools::SandboxExecutor;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::{Mutex, mpsc};

use super::{connect_agentic, load_config};

/// Stdin lines, shared between the chat prompt and the approval prompt.
/// Only one of them reads at a time: approvals happen inside a turn.
type SharedInput = Arc<Mutex<Lines<BufReader<Stdin>>>>;

/// Asks on the terminal before any shell command runs.
struct StdinApprover {
    input: SharedInput,
}

#[async_trait::async_trait]
impl CommandApprover for StdinApprover {
    async fn approve(&self, command: &str) -> bool {
        eprintln!();
        eprintln!("  Allow command to run?");
        eprintln!();
        eprintln!("  $ {command}");
        eprint!("  [y/N] > ");
        let _ = std::io::stderr().flush();

        match self.input.lock().await.next_line().await {
            Ok(Some(answer)) => is_yes(&answer),
            _ => false,
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// A line typed at the chat prompt.
#[derive(Debug, PartialEq, Eq)]
enum ChatCommand {
    Exit,
    Clear,
    Status,
    SetMode(Mode),
    Invalid(String),
    Message(String),
    Empty,
}

fn parse_line(line: &str) -> ChatCommand {
    let line = line.trim();
    match line {
        "" => ChatCommand::Empty,
        "exit" | "quit" | "/exit" | "/quit" => ChatCommand::Exit,
        "/clear" => ChatCommand::Clear,
        "/status" => ChatCommand::Status,
        _ => match line.strip_prefix("/mode") {
            Some(rest) if rest.is_empty() || rest.starts_with(' ') => match rest.parse() {
                Ok(mode) => ChatCommand::SetMode(mode),
                Err(e) => ChatCommand::Invalid(e),
            },
            _ => ChatCommand::Message(line.to_string()),
        },
    }
}

pub async fn run(
    mode: Mode,
    workspace: Option<PathBuf>,
    message: Option<String>,
) -> anyhow::Result<()> {
    let config = load_config()?;
    let client = Arc::new(connect_agentic(&config).await?);

    let workspace = match workspace {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };
    if !workspace.is_dir() {
        bail!("Workspace {} is not a directory", workspace.display());
    }

    let input: SharedInput = Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()).lines()));
    let (events, mut rx) = EventSink::channel();

    let mut agent = AgentLoop::new(
        client.clone(),
        Arc::new(SandboxExecutor::new()),
        Arc::new(StdinApprover {
            input: input.clone(),
        }),
        config.system_prompt.as_str(),
    )
    .with_mode(mode)
    .with_allow_run_command(config.allow_run_command)
    .with_workspace_root(workspace)
    .with_events(events);

    if let Some(msg) = message {
        let outcome = run_turn(&mut agent, &mut rx, &msg).await;
        if let TurnOutcome::Failed(e) = outcome {
            bail!(e);
        }
        return Ok(());
    }

    print_banner(&agent, &client);

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let line = {
            let mut input = input.lock().await;
            tokio::select! {
                line = input.next_line() => line?,
                _ = tokio::signal::ctrl_c() => None,
            }
        };
        let Some(line) = line else { break };

        match parse_line(&line) {
            ChatCommand::Empty => continue,
            ChatCommand::Exit => break,
            ChatCommand::Clear => {
                agent.clear();
                println!("  Context cleared.");
            }
            ChatCommand::Status => print_status(&agent, &client),
            ChatCommand::SetMode(mode) => {
                agent.set_mode(mode);
                println!("  Mode: {mode}");
            }
            ChatCommand::Invalid(reason) => eprintln!("  {reason}"),
            ChatCommand::Message(text) => {
                run_turn(&mut agent, &mut rx, &text).await;
            }
        }
        println!();
    }

    println!();
    println!("  Goodbye!");
    Ok(())
}

/// Run one turn, rendering events as they arrive. Ctrl-C stops the turn.
async fn run_turn(
    agent: &mut AgentLoop,
    rx: &mut mpsc::UnboundedReceiver<AgentEvent>,
    text: &str,
) -> TurnOutcome {
    let stop = agent.stop_handle();
    let turn = agent.handle_user_message(text);
    tokio::pin!(turn);

    let outcome = loop {
        tokio::select! {
            outcome = &mut turn => break outcome,
            Some(event) = rx.recv() => render(&event),
            Ok(()) = tokio::signal::ctrl_c() => {
                if stop.stop() {
                    eprintln!("\n  [stopped]");
                }
            }
        }
    };

    while let Ok(event) = rx.try_recv() {
        render(&event);
    }
    outcome
}

fn render(event: &AgentEvent) {
    match event {
        AgentEvent::Chunk { content } => {
            print!("{content}");
            let _ = std::io::stdout().flush();
        }
        AgentEvent::ToolCall {
            name, arguments, ..
        } => {
            eprintln!();
            eprintln!("  > {name}({arguments})");
        }
        AgentEvent::ToolResult {
            output, success, ..
        } => {
            let first = output.lines().next().unwrap_or_default();
            let lines = output.lines().count();
            let marker = if *success { "ok" } else { "failed" };
            if lines > 1 {
                eprintln!("    [{marker}] {first} (+{} lines)", lines - 1);
            } else {
                eprintln!("    [{marker}] {first}");
            }
        }
        AgentEvent::CompactionStarted => {
            eprintln!();
            eprintln!("  [Context almost full, summarizing...]");
        }
        AgentEvent::CompactionFinished { success } => {
            eprintln!();
            if *success {
                eprintln!("  [Conversation compacted]");
            } else {
                eprintln!("  [Compaction failed, keeping full history]");
            }
        }
        AgentEvent::Error { message } => {
            eprintln!();
            eprintln!("  [Error] {message}");
        }
        AgentEvent::Done {
            last_total_tokens,
            context_size,
            ..
        } => {
            println!();
            if *context_size > 0 {
                eprintln!("  [{last_total_tokens}/{context_size} tokens]");
            }
        }
    }
}

fn print_banner(agent: &AgentLoop, client: &LlamaCppClient) {
    println!();
    println!("  Qogito: Interactive Mode");
    println!();
    print_status(agent, client);
    println!();
    println!("  Commands: /mode passive|active, /clear, /status, exit");
    println!("  Ctrl+C stops a running reply; at the prompt it quits.");
    println!();
}

fn print_status(agent: &AgentLoop, client: &LlamaCppClient) {
    let budget = agent.token_budget();
    println!("  Server:     {}", client.base_url());
    println!("  Model:      {}", client.display_model_name());
    println!("  Mode:       {}", agent.mode());
    if let Some(root) = agent.workspace_root() {
        println!("  Workspace:  {}", root.display());
    }
    let tools: Vec<String> = agent.active_tools().into_iter().map(|t| t.name).collect();
    println!("  Tools:      {}", tools.join(", "));
    if budget.context_size > 0 {
        println!(
            "  Context:    {}/{} tokens",
            budget.last_total_tokens, budget.context_size
        );
    } else {
        println!("  Context:    size unknown, compaction disabled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_chat_commands() {
        assert_eq!(parse_line("  "), ChatCommand::Empty);
        assert_eq!(parse_line("quit"), ChatCommand::Exit);
        assert_eq!(parse_line("/clear"), ChatCommand::Clear);
        assert_eq!(parse_line("/status"), ChatCommand::Status);
        assert_eq!(parse_line("/mode active"), ChatCommand::SetMode(Mode::Active));
        assert_eq!(parse_line("/mode Passive "), ChatCommand::SetMode(Mode::Passive));
        assert!(matches!(parse_line("/mode yolo"), ChatCommand::Invalid(_)));
        assert_eq!(
            parse_line("/modem is broken"),
            ChatCommand::Message("/modem is broken".into())
        );
        assert_eq!(
            parse_line("explain main.rs"),
            ChatCommand::Message("explain main.rs".into())
        );
    }

    #[test]
    fn only_explicit_yes_approves() {
        assert!(is_yes("y"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("n"));
        assert!(!is_yes("sure"));
    }
}
