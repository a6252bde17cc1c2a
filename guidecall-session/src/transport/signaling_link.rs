use crate::config::SignalingConfig;
use anyhow::{Context, Result, anyhow, bail};
use futures::{SinkExt, StreamExt};
use guidecall_core::SignalMessage;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub enum LinkEvent {
    Signal(SignalMessage),
    /// The socket is gone. Always the last event.
    Closed,
}

/// WebSocket connection to the rendezvous service.
pub struct SignalingLink {
    outgoing: mpsc::UnboundedSender<Message>,
    closed: Arc<AtomicBool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SignalingLink {
    pub async fn connect(
        config: &SignalingConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<LinkEvent>)> {
        let (socket, _) = connect_async(config.connect_url().as_str())
            .await
            .with_context(|| format!("Failed to reach rendezvous service at {}", config.url))?;
        info!("Signaling link established with {}", config.url);

        let (mut sink, mut stream) = socket.split();
        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<Message>();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));

        let send_task = tokio::spawn(async move {
            while let Some(msg) = outgoing_rx.recv().await {
                let is_close = matches!(msg, Message::Close(_));
                if sink.send(msg).await.is_err() || is_close {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let recv_task = tokio::spawn({
            let closed = closed.clone();

            async move {
                while let Some(frame) = stream.next().await {
                    match frame {
                        Ok(Message::Text(text)) => {
                            match serde_json::from_str::<SignalMessage>(text.as_str()) {
                                Ok(SignalMessage::Heartbeat) => {}
                                Ok(signal) => {
                                    if event_tx.send(LinkEvent::Signal(signal)).is_err() {
                                        break;
                                    }
                                }
                                Err(e) => warn!("Invalid SignalMessage from rendezvous: {:?}", e),
                            }
                        }
                        Ok(Message::Close(_)) => break,
                        Ok(_) => {}
                        Err(e) => {
                            warn!("Signaling link read failed: {}", e);
                            break;
                        }
                    }
                }

                closed.store(true, Ordering::SeqCst);
                let _ = event_tx.send(LinkEvent::Closed);
                debug!("Signaling link reader finished");
            }
        });

        let heartbeat_task = tokio::spawn({
            let outgoing = outgoing.clone();
            let period = config.heartbeat_interval();

            async move {
                let mut ticker = tokio::time::interval(period);
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    let Ok(json) = serde_json::to_string(&SignalMessage::Heartbeat) else {
                        break;
                    };
                    if outgoing.send(Message::text(json)).is_err() {
                        break;
                    }
                }
            }
        });

        let link = Self {
            outgoing,
            closed,
            tasks: Mutex::new(vec![send_task, recv_task, heartbeat_task]),
        };
        Ok((link, event_rx))
    }

    pub fn send(&self, signal: &SignalMessage) -> Result<()> {
        if self.is_closed() {
            bail!("signaling link is closed");
        }
        let json = serde_json::to_string(signal)?;
        self.outgoing
            .send(Message::text(json))
            .map_err(|_| anyhow!("signaling link is closed"))
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Sends a close frame. The reader reports [`LinkEvent::Closed`] once
    /// the service acknowledges it.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.outgoing.send(Message::Close(None));
        // Heartbeat is the last task in the list.
        if let Some(heartbeat) = self.tasks.lock().last() {
            heartbeat.abort();
        }
        info!("Signaling link closing");
    }
}

impl Drop for SignalingLink {
    fn drop(&mut self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }
}
