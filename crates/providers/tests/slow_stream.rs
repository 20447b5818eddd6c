//! Streaming against a server that sends records with pauses between them.
//!
//! The mock HTTP server writes the chat body by hand so the gaps between
//! records are real.

use std::time::Duration;

use qogito_core::error::ProviderError;
use qogito_core::message::Message;
use qogito_core::provider::{CompletionClient, Outcome};
use qogito_providers::{LlamaCppClient, TransportConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

/// How the chat endpoint paces its records.
#[derive(Clone, Copy)]
struct Pacing {
    records: usize,
    gap: Duration,
    /// Extra silence after the first record.
    stall: Duration,
}

fn content_record(i: usize) -> String {
    format!(r#"data: {{"choices":[{{"delta":{{"content":"tok{i} "}},"finish_reason":null}}]}}"#)
}

/// Read one request and return its request line.
async fn read_request(socket: &mut TcpStream) -> std::io::Result<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(String::new());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let content_length = head
        .lines()
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Ok(head.lines().next().unwrap_or_default().to_string())
}

async fn respond_json(socket: &mut TcpStream, body: &str) -> std::io::Result<()> {
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await
}

async fn respond_stream(socket: &mut TcpStream, pacing: Pacing) -> std::io::Result<()> {
    socket
        .write_all(
            b"HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n",
        )
        .await?;
    for i in 0..pacing.records {
        if i > 0 {
            tokio::time::sleep(pacing.gap).await;
        }
        if i == 1 {
            tokio::time::sleep(pacing.stall).await;
        }
        socket
            .write_all(format!("{}\n\n", content_record(i)).as_bytes())
            .await?;
        socket.flush().await?;
    }
    tokio::time::sleep(pacing.gap).await;
    socket
        .write_all(
            b"data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\ndata: [DONE]\n\n",
        )
        .await?;
    socket.shutdown().await
}

async fn serve(mut socket: TcpStream, pacing: Pacing) -> std::io::Result<()> {
    let request_line = read_request(&mut socket).await?;
    if request_line.contains("/v1/models") {
        respond_json(&mut socket, r#"{"data":[{"id":"slow-model"}]}"#).await
    } else if request_line.contains("/props") {
        respond_json(&mut socket, r#"{"default_generation_settings":{"n_ctx":8192}}"#).await
    } else if request_line.contains("/v1/chat/completions") {
        respond_stream(&mut socket, pacing).await
    } else {
        Ok(())
    }
}

async fn start_server(pacing: Pacing) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = serve(socket, pacing).await;
            });
        }
    });
    format!("http://{addr}")
}

async fn stream_once(
    base_url: &str,
    read_timeout: Duration,
) -> (Result<Outcome, ProviderError>, String) {
    let transport = TransportConfig {
        read_timeout,
        ..TransportConfig::default()
    };
    let client = LlamaCppClient::new(&transport).unwrap();
    client.connect(base_url).await.unwrap();

    let mut text = String::new();
    let mut sink = |chunk: &str| text.push_str(chunk);
    let result = client
        .complete(
            &[Message::system("sys"), Message::user("hi")],
            &[],
            &mut sink,
            &CancellationToken::new(),
        )
        .await;
    (result, text)
}

#[tokio::test]
async fn long_generation_outlives_read_timeout() {
    // Six records 400ms apart: well past the one second read timeout in
    // total, but never silent for that long.
    let base_url = start_server(Pacing {
        records: 6,
        gap: Duration::from_millis(400),
        stall: Duration::ZERO,
    })
    .await;

    let (result, text) = stream_once(&base_url, Duration::from_secs(1)).await;

    assert_eq!(result.unwrap(), Outcome::Done);
    assert_eq!(text, "tok0 tok1 tok2 tok3 tok4 tok5 ");
}

#[tokio::test]
async fn silent_server_fails_with_network_error() {
    let base_url = start_server(Pacing {
        records: 3,
        gap: Duration::from_millis(50),
        stall: Duration::from_secs(2),
    })
    .await;

    let (result, text) = stream_once(&base_url, Duration::from_millis(500)).await;

    assert!(
        matches!(result, Err(ProviderError::Network(_))),
        "unexpected result: {result:?}"
    );
    assert_eq!(text, "tok0 ");
}
