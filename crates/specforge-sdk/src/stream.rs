//! Pipeline events over the node's WebSocket.

use futures::StreamExt;
use specforge_core::PipelineEvent;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::debug;

use crate::error::{ClientError, Result};

/// A live stream of [`PipelineEvent`]s.
pub struct EventStream {
    receiver: mpsc::Receiver<PipelineEvent>,
    _handle: tokio::task::JoinHandle<()>,
}

impl EventStream {
    /// Connect and wait for the node's `connected` greeting.
    pub async fn connect(ws_url: &str) -> Result<Self> {
        let (ws_stream, _) = connect_async(ws_url).await?;
        let (_, mut read) = ws_stream.split();

        match read.next().await {
            Some(Ok(Message::Text(text))) if is_greeting(&text) => {}
            Some(Ok(other)) => {
                return Err(ClientError::Connection(format!(
                    "unexpected first message: {other:?}"
                )))
            }
            Some(Err(e)) => return Err(e.into()),
            None => {
                return Err(ClientError::Connection(
                    "stream closed before greeting".to_string(),
                ))
            }
        }

        let (tx, rx) = mpsc::channel(100);

        let handle = tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(Message::Text(text)) => match serde_json::from_str::<PipelineEvent>(&text) {
                        Ok(event) => {
                            if tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => debug!(error = %e, "skipping unrecognised message"),
                    },
                    Ok(Message::Close(_)) | Err(_) => break,
                    _ => {}
                }
            }
        });

        Ok(Self {
            receiver: rx,
            _handle: handle,
        })
    }

    /// Next event, or `None` once the node closes the stream.
    pub async fn next(&mut self) -> Option<PipelineEvent> {
        self.receiver.recv().await
    }

    /// Collect events up to and including the terminal one for `run`.
    pub async fn until_finished(&mut self, run: uuid::Uuid) -> Vec<PipelineEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next().await {
            let done = event.run_id() == run && event.is_terminal();
            events.push(event);
            if done {
                break;
            }
        }
        events
    }
}

fn is_greeting(text: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(text)
        .map(|v| v["type"] == "connected")
        .unwrap_or(false)
}
