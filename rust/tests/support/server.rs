use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

#[derive(Default)]
struct ServerState {
    conns: HashMap<String, mpsc::UnboundedSender<Message>>,
    emails: HashMap<String, Option<String>>,
    received: Vec<(String, Value)>,
    accepted: usize,
}

/// In-process stand-in for the hangouts service.
///
/// Clients connect with `?username=`. Every command is echoed back to the
/// sender as an acknowledgement state and relayed to the addressed peer as
/// the matching request or acknowledgement state.
pub struct LocalHangoutsServer {
    pub url: String,
    state: Arc<Mutex<ServerState>>,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl LocalHangoutsServer {
    pub fn start() -> Self {
        let (url_tx, url_rx) = std::sync::mpsc::channel::<String>();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let state = Arc::new(Mutex::new(ServerState::default()));

        let state_for_thread = state.clone();
        let thread = std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("tokio runtime");

            rt.block_on(async move {
                let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind server");
                let addr: SocketAddr = listener.local_addr().expect("local addr");
                url_tx.send(format!("ws://{addr}/hangouts")).unwrap();
                let state = state_for_thread;

                loop {
                    tokio::select! {
                        _ = &mut shutdown_rx => {
                            let conns: Vec<mpsc::UnboundedSender<Message>> = {
                                let st = state.lock().unwrap();
                                st.conns.values().cloned().collect()
                            };
                            for tx in conns {
                                let _ = tx.send(Message::Close(None));
                            }
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            break;
                        }
                        accept = listener.accept() => {
                            let (stream, _) = match accept {
                                Ok(v) => v,
                                Err(_) => continue,
                            };
                            tokio::spawn(serve_connection(stream, state.clone()));
                        }
                    }
                }
            });
        });

        let url = url_rx.recv().unwrap();
        Self {
            url,
            state,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        }
    }

    /// Sends a raw text frame to a connected user.
    pub fn push(&self, username: &str, text: &str) -> bool {
        let st = self.state.lock().unwrap();
        st.conns
            .get(username)
            .is_some_and(|tx| tx.send(Message::Text(text.to_string().into())).is_ok())
    }

    /// Closes the connection of `username` from the server side.
    pub fn close(&self, username: &str) -> bool {
        let st = self.state.lock().unwrap();
        st.conns
            .get(username)
            .is_some_and(|tx| tx.send(Message::Close(None)).is_ok())
    }

    pub fn is_connected(&self, username: &str) -> bool {
        self.state.lock().unwrap().conns.contains_key(username)
    }

    /// Commands received from `username`, oldest first.
    pub fn received_from(&self, username: &str) -> Vec<Value> {
        let st = self.state.lock().unwrap();
        st.received
            .iter()
            .filter(|(from, _)| from == username)
            .map(|(_, v)| v.clone())
            .collect()
    }

    /// Total handshakes accepted since start.
    pub fn connections_accepted(&self) -> usize {
        self.state.lock().unwrap().accepted
    }
}

impl Drop for LocalHangoutsServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
    }
}

async fn serve_connection(stream: tokio::net::TcpStream, state: Arc<Mutex<ServerState>>) {
    let mut username: Option<String> = None;
    let ws = match tokio_tungstenite::accept_hdr_async(stream, |req: &Request, resp: Response| {
        username = query_username(&req.uri().to_string());
        Ok::<Response, ErrorResponse>(resp)
    })
    .await
    {
        Ok(ws) => ws,
        Err(_) => return,
    };
    let Some(username) = username else {
        return;
    };

    let (mut ws_tx, mut ws_rx) = ws.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();
    {
        let mut st = state.lock().unwrap();
        st.accepted += 1;
        st.conns.insert(username.clone(), out_tx.clone());
    }

    // Writer task
    let writer = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if ws_tx.send(msg).await.is_err() || closing {
                break;
            }
        }
    });

    // Reader loop
    while let Some(Ok(msg)) = ws_rx.next().await {
        match msg {
            Message::Text(text) => {
                if let Ok(v) = serde_json::from_str::<Value>(&text) {
                    handle_command(&state, &username, v);
                }
            }
            Message::Ping(p) => {
                let _ = out_tx.send(Message::Pong(p));
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    {
        let mut st = state.lock().unwrap();
        st.conns.remove(&username);
    }
    writer.abort();
}

fn query_username(uri: &str) -> Option<String> {
    let parsed = url::Url::parse(&format!("ws://localhost{uri}")).ok()?;
    parsed
        .query_pairs()
        .find_map(|(k, v)| if k == "username" { Some(v.into_owned()) } else { None })
}

fn handle_command(state: &Arc<Mutex<ServerState>>, from: &str, v: Value) {
    let mut st = state.lock().unwrap();
    st.received.push((from.to_string(), v.clone()));

    let command = v["command"].as_str().unwrap_or_default();
    let (sender_state, peer_state) = match command {
        "ONLINE" => {
            let email = v["email"].as_str().map(ToString::to_string);
            st.emails.insert(from.to_string(), email);
            return;
        }
        "INVITE" => ("INVITED", "INVITER"),
        "ACCEPT" => ("ACCEPTER", "ACCEPTED"),
        "DECLINE" => ("DECLINER", "DECLINED"),
        "BLOCK" => ("BLOCKER", "BLOCKED"),
        "UNBLOCK" => ("UNBLOCKER", "UNBLOCKED"),
        "MESSAGE" => ("MESSAGED", "MESSANGER"),
        _ => return,
    };
    let Some(to) = v["username"].as_str().map(ToString::to_string) else {
        return;
    };

    let mut to_sender = json!({"username": to, "state": sender_state});
    if let Some(email) = v.get("email") {
        to_sender["email"] = email.clone();
    }
    let mut to_peer = json!({"username": from, "state": peer_state});
    if let Some(Some(email)) = st.emails.get(from) {
        to_peer["email"] = json!(email);
    }
    if let Some(message) = v.get("message") {
        to_sender["message"] = message.clone();
        to_peer["message"] = message.clone();
    }

    if let Some(tx) = st.conns.get(from) {
        let _ = tx.send(Message::Text(to_sender.to_string().into()));
    }
    if let Some(tx) = st.conns.get(&to) {
        let _ = tx.send(Message::Text(to_peer.to_string().into()));
    }
}
