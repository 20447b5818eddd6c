//! `qogito transform`: one-shot rewrite of a block of text.

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use qogito_core::message::Message;
use qogito_core::provider::CompletionClient;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

use super::{connect_agentic, load_config};

const TRANSFORM_SYSTEM_PROMPT: &str = "You are a code editor assistant. Transform the provided text according to the instruction. Respond with ONLY the transformed text — no explanations, no markdown code fences, no commentary.";

pub async fn run(instruction: &str, file: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config()?;

    let text = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("Failed to read stdin")?;
            buf
        }
    };

    let client = connect_agentic(&config).await?;
    let messages = transform_messages(&text, instruction);

    let cancel = CancellationToken::new();
    let stopper = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stopper.cancel();
        }
    });

    let mut stdout = std::io::stdout();
    let mut on_chunk = |chunk: &str| {
        let _ = stdout.write_all(chunk.as_bytes());
        let _ = stdout.flush();
    };

    match client.complete(&messages, &[], &mut on_chunk, &cancel).await {
        Ok(_) => {}
        Err(e) if e.is_aborted() => {}
        Err(e) => return Err(e).context("Transform failed"),
    }
    println!();
    Ok(())
}

/// The request for a transform: no history, no tools.
fn transform_messages(text: &str, instruction: &str) -> Vec<Message> {
    vec![
        Message::system(TRANSFORM_SYSTEM_PROMPT),
        Message::user(format!("Text:\n{text}\n\nInstruction: {instruction}")),
    ]
}
