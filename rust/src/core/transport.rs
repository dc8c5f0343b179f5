// Duplex WebSocket channel for one session.
//
// The channel runs as a task on the actor's runtime. It never touches state
// directly: every lifecycle change and inbound frame is posted back to the
// actor as an `InternalEvent` tagged with the session id.

use flume::Sender;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use url::Url;

use crate::updates::{CoreMsg, InternalEvent};

/// What to do after the channel errors or closes.
///
/// Only `Never` exists: a dead channel stays dead until the next login.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReconnectPolicy {
    #[default]
    Never,
}

impl ReconnectPolicy {
    pub fn should_reconnect(self) -> bool {
        match self {
            ReconnectPolicy::Never => false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid channel url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported channel scheme: {0}")]
    UnsupportedScheme(String),
}

/// `{ws_url}?username=<username>`, keeping any query the base already has.
pub fn connection_url(ws_url: &str, username: &str) -> Result<Url, TransportError> {
    let mut url = Url::parse(ws_url).map_err(|source| TransportError::InvalidUrl {
        url: ws_url.to_string(),
        source,
    })?;
    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(TransportError::UnsupportedScheme(url.scheme().to_string()));
    }
    url.query_pairs_mut().append_pair("username", username);
    Ok(url)
}

/// Sending half of a running channel. Dropping it closes the socket.
#[derive(Debug)]
pub struct TransportHandle {
    outbound: mpsc::UnboundedSender<String>,
}

impl TransportHandle {
    /// Queues one text frame. Fails once the channel task has exited.
    pub fn send(&self, text: String) -> bool {
        self.outbound.send(text).is_ok()
    }

    #[cfg(test)]
    pub(crate) fn for_test(outbound: mpsc::UnboundedSender<String>) -> Self {
        Self { outbound }
    }
}

pub fn spawn_channel(
    runtime: &tokio::runtime::Runtime,
    url: Url,
    session_id: u64,
    core_tx: Sender<CoreMsg>,
) -> TransportHandle {
    let (outbound, outbound_rx) = mpsc::unbounded_channel::<String>();
    runtime.spawn(run_channel(url, session_id, core_tx, outbound_rx));
    TransportHandle { outbound }
}

fn post(core_tx: &Sender<CoreMsg>, ev: InternalEvent) {
    let _ = core_tx.send(CoreMsg::Internal(Box::new(ev)));
}

async fn run_channel(
    url: Url,
    session_id: u64,
    core_tx: Sender<CoreMsg>,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
) {
    tracing::info!(session_id, url = %url, "transport: connecting");
    let ws = match tokio_tungstenite::connect_async(url.as_str()).await {
        Ok((ws, _response)) => ws,
        Err(e) => {
            tracing::warn!(session_id, err = %e, "transport: connect failed");
            post(
                &core_tx,
                InternalEvent::TransportErrored {
                    session_id,
                    error: e.to_string(),
                },
            );
            return;
        }
    };
    post(&core_tx, InternalEvent::TransportOpened { session_id });

    let (mut write, mut read) = ws.split();
    loop {
        tokio::select! {
            out = outbound_rx.recv() => {
                let Some(text) = out else {
                    // Session ended; close politely and stop.
                    let _ = write.send(WsMessage::Close(None)).await;
                    tracing::debug!(session_id, "transport: closed by session");
                    break;
                };
                if let Err(e) = write.send(WsMessage::Text(text.into())).await {
                    post(&core_tx, InternalEvent::TransportErrored { session_id, error: e.to_string() });
                    break;
                }
            }
            inbound = read.next() => {
                match inbound {
                    Some(Ok(WsMessage::Text(text))) => {
                        post(&core_tx, InternalEvent::FrameReceived { session_id, text: text.to_string() });
                    }
                    Some(Ok(WsMessage::Close(_))) | None => {
                        post(&core_tx, InternalEvent::TransportClosed { session_id });
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        post(&core_tx, InternalEvent::TransportErrored { session_id, error: e.to_string() });
                        break;
                    }
                }
            }
        }
    }
}
