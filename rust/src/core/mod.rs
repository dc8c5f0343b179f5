pub(crate) mod config;
pub(crate) mod dispatch;
pub(crate) mod lookup;
pub(crate) mod reconcile;
pub(crate) mod storage;
pub(crate) mod store;
pub(crate) mod transport;

use std::sync::{Arc, RwLock};

use flume::Sender;
use hangouts_storage_traits::{
    CacheStore, Command, Hangout, HangoutState, PeerRepository, StorageError,
};

use crate::actions::AppAction;
use crate::state::{AppState, Presence, SessionState, TransportStatus, now_millis};
use crate::updates::{AppUpdate, CoreMsg, InternalEvent};

use self::config::AppConfig;
use self::dispatch::{DispatchError, build_envelope, online_envelope};
use self::lookup::LookupClient;
use self::reconcile::{decode_frame, load_hangouts, load_messages, reconcile};
use self::store::{StoreAction, reduce};
use self::transport::{ReconnectPolicy, TransportHandle, connection_url, spawn_channel};

struct Session {
    id: u64,
    username: String,
    email: Option<String>,
    cache: Arc<dyn CacheStore>,
    lookup: Option<LookupClient>,
    transport: Option<TransportHandle>,
}

pub struct AppCore {
    pub state: AppState,
    rev: u64,

    update_sender: Sender<AppUpdate>,
    core_sender: Sender<CoreMsg>,
    shared_state: Arc<RwLock<AppState>>,

    data_dir: String,
    config: AppConfig,
    runtime: tokio::runtime::Runtime,
    reconnect_policy: ReconnectPolicy,

    session: Option<Session>,
    next_session_id: u64,
    lookup_token: u64,
}

impl AppCore {
    pub fn new(
        update_sender: Sender<AppUpdate>,
        core_sender: Sender<CoreMsg>,
        data_dir: String,
        config: AppConfig,
        shared_state: Arc<RwLock<AppState>>,
    ) -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_time()
            .enable_io()
            .build()
            .expect("tokio runtime");

        let this = Self {
            state: AppState::empty(),
            rev: 0,
            update_sender,
            core_sender,
            shared_state,
            data_dir,
            config,
            runtime,
            reconnect_policy: ReconnectPolicy::default(),
            session: None,
            next_session_id: 0,
            lookup_token: 0,
        };

        // Ensure HangoutsApp.state() has an immediately-available snapshot.
        let snapshot = this.state.clone();
        this.commit_state_snapshot(&snapshot);
        this
    }

    fn next_rev(&mut self) -> u64 {
        self.rev += 1;
        self.state.rev = self.rev;
        self.rev
    }

    fn commit_state_snapshot(&self, snapshot: &AppState) {
        match self.shared_state.write() {
            Ok(mut g) => *g = snapshot.clone(),
            Err(poison) => *poison.into_inner() = snapshot.clone(),
        }
    }

    fn emit_state(&mut self) {
        self.next_rev();
        let snapshot = self.state.clone();
        self.commit_state_snapshot(&snapshot);
        let _ = self.update_sender.send(AppUpdate::FullState(snapshot));
    }

    /// Runs one mailbox message to completion and emits at most one update.
    pub fn handle_message(&mut self, msg: CoreMsg) {
        let before = self.state.clone();
        match msg {
            CoreMsg::Action(action) => self.handle_action(action),
            CoreMsg::Internal(ev) => self.handle_internal(*ev),
        }
        if self.state != before {
            self.emit_state();
        }
    }

    fn apply(&mut self, action: StoreAction) {
        tracing::trace!(action = action.tag(), "store");
        let current = std::mem::take(&mut self.state.hangouts);
        self.state.hangouts = reduce(current, action);
    }

    fn toast(&mut self, msg: impl Into<String>) {
        self.state.toast = Some(msg.into());
    }

    fn handle_action(&mut self, action: AppAction) {
        tracing::debug!(action = action.tag(), "dispatch");
        match action {
            AppAction::Login { username, email } => self.login(username, email),
            AppAction::Logout => self.logout(),
            AppAction::SearchChanged { term } => {
                self.apply(StoreAction::SearchChanged(term));
                self.apply(StoreAction::FilterPeers);
            }
            AppAction::Search => self.search(),
            AppAction::SelectPeer { username } => self.select_peer(&username),
            AppAction::SelectUser { username } => self.select_user(&username),
            AppAction::Invite { username, text } => {
                self.send_command(Command::Invite, &username, Some(&text))
            }
            AppAction::Accept { username } => self.send_command(Command::Accept, &username, None),
            AppAction::Decline { username } => {
                self.send_command(Command::Decline, &username, None)
            }
            AppAction::Block { username } => self.send_command(Command::Block, &username, None),
            AppAction::Unblock { username } => {
                self.send_command(Command::Unblock, &username, None)
            }
            AppAction::SendMessage { username, text } => {
                self.send_command(Command::Message, &username, Some(&text))
            }
            AppAction::ClearError => {
                self.apply(StoreAction::ErrorCleared);
                self.state.toast = None;
            }
        }
    }

    fn login(&mut self, username: String, email: Option<String>) {
        let username = username.trim().to_string();
        if let Some(sess) = &self.session {
            if sess.username == username {
                if matches!(
                    self.state.transport,
                    TransportStatus::Closed | TransportStatus::Errored
                ) {
                    self.reopen_transport();
                } else {
                    tracing::debug!(username = %username, "login: already logged in");
                }
                return;
            }
            self.logout();
        }

        let cache = match storage::open_cache(&self.data_dir, &username, self.config.storage()) {
            Ok(cache) => cache,
            Err(e) => {
                tracing::error!(username = %username, err = ?e, "login: cache open failed");
                self.toast(format!("Login failed: {e:#}"));
                return;
            }
        };
        let peers = match load_hangouts(cache.as_ref(), &username) {
            Ok(peers) => peers,
            Err(e) => {
                tracing::error!(username = %username, err = %e, "login: peer load failed");
                self.toast(format!("Login failed: {e}"));
                return;
            }
        };

        self.next_session_id += 1;
        let id = self.next_session_id;
        let lookup = match LookupClient::new(self.config.lookup_url()) {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(err = %e, "lookup disabled");
                None
            }
        };

        tracing::info!(username = %username, session_id = id, peers = peers.len(), "login");
        self.state.session = SessionState::LoggedIn {
            username: username.clone(),
            email: email.clone(),
        };
        self.apply(StoreAction::LoadPeers(peers));
        self.apply(StoreAction::FilterPeers);

        let mut session = Session {
            id,
            username,
            email,
            cache,
            lookup,
            transport: None,
        };
        self.open_transport(&mut session);
        self.session = Some(session);
    }

    fn open_transport(&mut self, session: &mut Session) {
        if !self.network_enabled() {
            tracing::info!(session_id = session.id, "transport: network disabled");
            return;
        }
        match connection_url(self.config.ws_url(), &session.username) {
            Ok(url) => {
                self.state.transport = TransportStatus::Connecting;
                session.transport = Some(spawn_channel(
                    &self.runtime,
                    url,
                    session.id,
                    self.core_sender.clone(),
                ));
            }
            Err(e) => {
                tracing::error!(err = %e, "transport: bad url");
                self.state.transport = TransportStatus::Errored;
                self.toast(format!("Cannot connect: {e}"));
            }
        }
    }

    /// Fresh channel for the current session. The session id moves on so
    /// late events from the dead channel are dropped.
    fn reopen_transport(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        self.next_session_id += 1;
        session.id = self.next_session_id;
        session.transport = None;
        tracing::info!(username = %session.username, session_id = session.id, "login: reopening channel");
        self.open_transport(&mut session);
        self.session = Some(session);
    }

    fn logout(&mut self) {
        if let Some(sess) = self.session.take() {
            tracing::info!(username = %sess.username, session_id = sess.id, "logout");
            // Dropping the session drops the transport handle, which closes the socket.
        }
        let rev = self.state.rev;
        self.state = AppState::empty();
        self.state.rev = rev;
    }

    fn search(&mut self) {
        self.apply(StoreAction::FilterPeers);
        let term = self.state.hangouts.search_term.clone();
        if term.is_empty() || !self.state.hangouts.filtered_peers.is_empty() {
            return;
        }
        let Some(sess) = self.session.as_ref() else {
            return;
        };
        let session_id = sess.id;
        let username = sess.username.clone();
        let Some(client) = sess.lookup.clone() else {
            self.apply(StoreAction::LookupFailed("lookup is not configured".to_string()));
            return;
        };
        if !self.network_enabled() {
            self.apply(StoreAction::LookupFailed("network disabled".to_string()));
            return;
        }

        self.lookup_token += 1;
        let token = self.lookup_token;
        self.apply(StoreAction::LookupStarted);

        let tx = self.core_sender.clone();
        self.runtime.spawn(async move {
            let result = client.find(&term, &username).await.map_err(|e| e.to_string());
            let _ = tx.send(CoreMsg::Internal(Box::new(InternalEvent::LookupCompleted {
                session_id,
                token,
                result,
            })));
        });
    }

    fn select_peer(&mut self, username: &str) {
        let Some(sess) = self.session.as_ref() else {
            return;
        };
        let Some(peer) = self.state.hangouts.peer(username).cloned() else {
            self.apply(StoreAction::ErrorRaised(format!("unknown peer: {username}")));
            return;
        };
        let messages = load_messages(sess.cache.as_ref(), username);
        self.apply(StoreAction::PeerSelected(peer));
        match messages {
            Ok(messages) => self.apply(StoreAction::MessagesLoaded(messages)),
            Err(e) => {
                tracing::error!(peer = %username, err = %e, "message load failed");
                self.apply(StoreAction::ErrorRaised(e.to_string()));
            }
        }
    }

    fn select_user(&mut self, username: &str) {
        let Some(user) = self
            .state
            .hangouts
            .lookup_results
            .iter()
            .find(|h| h.username == username)
            .cloned()
        else {
            self.apply(StoreAction::ErrorRaised(format!("unknown user: {username}")));
            return;
        };
        self.apply(StoreAction::UserSelected(user));
    }

    /// Resolves who a command is addressed to: a known peer, the selected
    /// pending user, or (for invites only) a bare pending entry.
    fn command_target(&self, command: Command, username: &str) -> Result<Hangout, DispatchError> {
        let hangouts = &self.state.hangouts;
        if let Some(peer) = hangouts.peer(username) {
            return Ok(peer.clone());
        }
        if command == Command::Invite {
            let pending = hangouts
                .active_peer
                .iter()
                .chain(hangouts.lookup_results.iter())
                .find(|h| h.username == username)
                .cloned()
                .unwrap_or_else(|| Hangout::new(username, HangoutState::Invite));
            return Ok(Hangout {
                state: HangoutState::Invite,
                ..pending
            });
        }
        Err(DispatchError::UnknownPeer(username.to_string()))
    }

    fn send_command(&mut self, command: Command, username: &str, text: Option<&str>) {
        if let Err(e) = self.try_send_command(command, username, text) {
            tracing::warn!(command = %command, peer = %username, err = %e, "send failed");
            self.apply(StoreAction::ErrorRaised(e.to_string()));
        }
    }

    fn try_send_command(
        &mut self,
        command: Command,
        username: &str,
        text: Option<&str>,
    ) -> Result<(), DispatchError> {
        let Some(sess) = self.session.as_ref() else {
            return Err(DispatchError::NotLoggedIn);
        };
        let target = self.command_target(command, username)?;
        let transport = match (&sess.transport, self.state.transport.is_open()) {
            (Some(t), true) => t,
            _ => return Err(DispatchError::TransportNotOpen),
        };

        let envelope = build_envelope(command, &target, &sess.username, text, now_millis());
        if !transport.send(envelope.to_json()?) {
            return Err(DispatchError::TransportNotOpen);
        }
        tracing::info!(command = %command, peer = %username, "command sent");

        // The command is out; cache failures from here on are logged, not reported as a failed send.
        let cache = sess.cache.clone();
        let local = sess.username.clone();
        match command {
            Command::Invite if self.state.hangouts.peer(username).is_none() => {
                if let Err(e) = persist_pending_peer(cache.as_ref(), &local, &target) {
                    tracing::warn!(peer = %username, err = %e, "pending peer not cached");
                }
                self.apply(StoreAction::PeerAdded(target));
            }
            Command::Message => {
                if let Some(message) = envelope.message {
                    if let Err(e) = cache.append_message(username, message.clone()) {
                        tracing::warn!(peer = %username, err = %e, "sent message not cached");
                    }
                    if self.state.hangouts.is_active(username) {
                        self.apply(StoreAction::MessageAppended(message));
                    }
                }
            }
            _ => {}
        }

        // Last, so the pending entry added above does not clear it.
        self.apply(StoreAction::CommandStarted {
            command,
            username: username.to_string(),
        });
        Ok(())
    }

    fn handle_internal(&mut self, ev: InternalEvent) {
        let current = self.session.as_ref().map(|s| s.id);
        match ev {
            InternalEvent::TransportOpened { session_id } if current == Some(session_id) => {
                tracing::info!(session_id, "transport: open");
                self.state.transport = TransportStatus::Open;
                self.state.presence = Presence::Online;
                self.announce_online();
            }
            InternalEvent::TransportClosed { session_id } if current == Some(session_id) => {
                tracing::info!(session_id, "transport: closed");
                self.state.transport = TransportStatus::Closed;
                self.state.presence = Presence::Offline;
                if let Some(sess) = self.session.as_mut() {
                    sess.transport = None;
                }
            }
            InternalEvent::TransportErrored { session_id, error } if current == Some(session_id) => {
                tracing::warn!(
                    session_id,
                    err = %error,
                    reconnect = self.reconnect_policy.should_reconnect(),
                    "transport: error"
                );
                self.state.transport = TransportStatus::Errored;
                self.state.presence = Presence::Offline;
                if let Some(sess) = self.session.as_mut() {
                    sess.transport = None;
                }
            }
            InternalEvent::FrameReceived { session_id, text } if current == Some(session_id) => {
                self.handle_frame(&text);
            }
            InternalEvent::LookupCompleted {
                session_id,
                token,
                result,
            } if current == Some(session_id) && token == self.lookup_token => match result {
                Ok(results) => {
                    tracing::debug!(results = results.len(), "lookup: done");
                    self.apply(StoreAction::LookupSuccess(results));
                }
                Err(e) => {
                    tracing::warn!(err = %e, "lookup: failed");
                    self.apply(StoreAction::LookupFailed(e));
                }
            },
            _ => {
                tracing::debug!("dropping event from a finished session or lookup");
            }
        }
    }

    fn announce_online(&mut self) {
        let Some(sess) = self.session.as_ref() else {
            return;
        };
        let Some(transport) = sess.transport.as_ref() else {
            return;
        };
        match online_envelope(&sess.username, sess.email.as_deref()).to_json() {
            Ok(json) => {
                if !transport.send(json) {
                    tracing::warn!("transport: ONLINE not sent");
                }
            }
            Err(e) => tracing::error!(err = %e, "transport: ONLINE encode failed"),
        }
    }

    /// One inbound frame. Failures are fatal for this frame only: the cache and
    /// relationship store stay as they were and the error lands in `toast`.
    fn handle_frame(&mut self, text: &str) {
        let Some(sess) = self.session.as_ref() else {
            return;
        };
        let result = decode_frame(text).and_then(|inbound| {
            let peer = inbound.username.clone();
            reconcile(sess.cache.as_ref(), &sess.username, inbound).map(|outcome| (peer, outcome))
        });
        match result {
            Ok((peer, outcome)) => {
                self.apply(outcome.action);
                if let Some(message) = outcome.appended_message
                    && self.state.hangouts.is_active(&peer)
                {
                    self.apply(StoreAction::MessageAppended(message));
                }
            }
            Err(e) => {
                tracing::error!(err = %e, "reconcile failed; frame dropped");
                self.toast(format!("Dropped event: {e}"));
            }
        }
    }
}

/// Adds `target` to the cached collection of `local` unless a peer with that username is already there.
fn persist_pending_peer(
    cache: &dyn CacheStore,
    local: &str,
    target: &Hangout,
) -> Result<(), StorageError> {
    let mut hangouts = load_hangouts(cache, local)?;
    if !hangouts.iter().any(|h| h.username == target.username) {
        hangouts.push(target.clone());
        cache.put_hangouts(local, &hangouts)?;
    }
    Ok(())
}
