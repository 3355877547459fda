pub mod cli;
pub mod client;
pub mod models;

use std::error::Error;
use std::sync::Arc;

use log::info;
use tokio::io::{ AsyncBufReadExt, AsyncWriteExt, BufReader };

use cli::Args;
use client::StreamingChatClient;
use models::chat::Role;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Endpoint: {}", args.endpoint);
    info!("Model: {}", args.model);
    info!("Streaming Enabled: {}", !args.no_stream);
    info!("Credential Configured: {}", !args.api_key.is_empty());
    info!("-------------------------");

    let client = Arc::new(StreamingChatClient::new(args.chat_config())?);
    repl(client).await
}

/// Minimal terminal binding over the client's snapshot/subscribe contract:
/// reads turns from stdin, prints streamed reply content as it lands in the
/// conversation, and maps Ctrl-C to cancellation of the in-flight exchange.
async fn repl(client: Arc<StreamingChatClient>) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut input_lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    let banner = format!("({}) Enter /quit to exit.\n", client.placeholder());
    stdout.write_all(banner.as_bytes()).await?;

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = input_lines.next_line().await? else {
            break;
        };
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" || line == "/exit" {
            break;
        }

        // Subscribe before the exchange starts so no notification is missed.
        let changes = client.subscribe();
        let renderer = tokio::spawn(render_reply(client.clone(), changes));
        let mut exchange = {
            let client = client.clone();
            tokio::spawn(async move { client.submit(&line).await })
        };

        tokio::select! {
            _ = &mut exchange => {}
            _ = tokio::signal::ctrl_c() => {
                client.cancel();
                let _ = (&mut exchange).await;
            }
        }
        let _ = renderer.await;
    }

    Ok(())
}

/// Follows change notifications for the duration of one exchange and prints
/// whatever the latest assistant message has appended since the last look.
async fn render_reply(
    client: Arc<StreamingChatClient>,
    mut changes: tokio::sync::watch::Receiver<u64>,
) {
    let mut current_id: Option<String> = None;
    let mut printed = 0usize;
    let mut stdout = tokio::io::stdout();

    loop {
        if changes.changed().await.is_err() {
            break;
        }

        let busy = client.is_busy();
        let messages = client.messages();
        if let Some(last) = messages.last() {
            if last.role == Role::Assistant {
                if current_id.as_deref() != Some(last.id.as_str()) {
                    if printed > 0 {
                        let _ = stdout.write_all(b"\n").await;
                    }
                    current_id = Some(last.id.clone());
                    printed = 0;
                }
                if last.content.len() > printed {
                    let _ = stdout.write_all(&last.content.as_bytes()[printed..]).await;
                    let _ = stdout.flush().await;
                    printed = last.content.len();
                }
            }
        }

        if !busy {
            if printed > 0 {
                let _ = stdout.write_all(b"\n").await;
                let _ = stdout.flush().await;
            }
            break;
        }
    }
}
