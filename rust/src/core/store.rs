//! Relationship store reducer.
//!
//! `reduce` is the only way [`HangoutsState`] changes. It is pure: the actor
//! owns the state value and feeds every action through here, so any sequence
//! of actions can be replayed in tests without a runtime.

use hangouts_storage_traits::{Command, Hangout, HangoutState, Message};

use crate::state::{HangoutsState, PendingCommand};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreAction {
    LoadPeers(Vec<Hangout>),
    SearchChanged(String),
    FilterPeers,
    LookupStarted,
    LookupSuccess(Vec<Hangout>),
    LookupFailed(String),
    PeerSelected(Hangout),
    /// Promotes a lookup result into the pending `INVITE` state.
    UserSelected(Hangout),
    PeerUpdated(Hangout),
    PeerAdded(Hangout),
    MessagesLoaded(Vec<Message>),
    MessageAppended(Message),
    CommandStarted {
        command: Command,
        username: String,
    },
    ErrorRaised(String),
    ErrorCleared,
}

impl StoreAction {
    /// Log-safe action tag.
    pub fn tag(&self) -> &'static str {
        match self {
            StoreAction::LoadPeers(_) => "LOAD_PEERS",
            StoreAction::SearchChanged(_) => "SEARCH_CHANGED",
            StoreAction::FilterPeers => "FILTER_PEERS",
            StoreAction::LookupStarted => "LOOKUP_STARTED",
            StoreAction::LookupSuccess(_) => "LOOKUP_SUCCESS",
            StoreAction::LookupFailed(_) => "LOOKUP_FAILED",
            StoreAction::PeerSelected(_) => "PEER_SELECTED",
            StoreAction::UserSelected(_) => "USER_SELECTED",
            StoreAction::PeerUpdated(_) => "PEER_UPDATED",
            StoreAction::PeerAdded(_) => "PEER_ADDED",
            StoreAction::MessagesLoaded(_) => "MESSAGES_LOADED",
            StoreAction::MessageAppended(_) => "MESSAGE_APPENDED",
            StoreAction::CommandStarted { .. } => "COMMAND_STARTED",
            StoreAction::ErrorRaised(_) => "ERROR_RAISED",
            StoreAction::ErrorCleared => "ERROR_CLEARED",
        }
    }
}

pub fn reduce(mut state: HangoutsState, action: StoreAction) -> HangoutsState {
    match action {
        StoreAction::LoadPeers(peers) => {
            state.peers = peers;
            state.filtered_peers = filter_peers(&state.peers, &state.search_term);
            state.is_loading = false;
        }
        StoreAction::SearchChanged(term) => {
            state.search_term = term;
        }
        StoreAction::FilterPeers => {
            state.filtered_peers = filter_peers(&state.peers, &state.search_term);
        }
        StoreAction::LookupStarted => {
            state.is_loading = true;
            state.lookup_results.clear();
            state.last_error = None;
        }
        StoreAction::LookupSuccess(results) => {
            state.is_loading = false;
            state.lookup_results = results;
        }
        StoreAction::LookupFailed(error) => {
            state.is_loading = false;
            state.last_error = Some(error);
        }
        StoreAction::PeerSelected(peer) => {
            state.active_peer = Some(peer);
            state.messages = None;
        }
        StoreAction::UserSelected(mut user) => {
            user.state = HangoutState::Invite;
            state.active_peer = Some(user);
            state.messages = Some(Vec::new());
        }
        StoreAction::PeerUpdated(peer) | StoreAction::PeerAdded(peer) => {
            match state.peers.iter_mut().find(|h| h.username == peer.username) {
                Some(existing) => *existing = peer.clone(),
                None => state.peers.push(peer.clone()),
            }
            if state.is_active(&peer.username) {
                state.active_peer = Some(peer.clone());
            }
            if state
                .pending_command
                .as_ref()
                .is_some_and(|p| p.username == peer.username)
            {
                state.pending_command = None;
            }
            state.filtered_peers = filter_peers(&state.peers, &state.search_term);
        }
        StoreAction::MessagesLoaded(messages) => {
            state.messages = Some(messages);
        }
        StoreAction::MessageAppended(message) => {
            state.messages.get_or_insert_with(Vec::new).push(message);
        }
        StoreAction::CommandStarted { command, username } => {
            state.pending_command = Some(PendingCommand { command, username });
        }
        StoreAction::ErrorRaised(error) => {
            state.last_error = Some(error);
        }
        StoreAction::ErrorCleared => {
            state.last_error = None;
        }
    }
    state
}

/// Case-sensitive substring match on `username`. An empty term keeps everything.
fn filter_peers(peers: &[Hangout], term: &str) -> Vec<Hangout> {
    peers
        .iter()
        .filter(|h| h.username.contains(term))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(username: &str, state: HangoutState) -> Hangout {
        Hangout::new(username, state)
    }

    fn message(username: &str, text: &str, timestamp: i64) -> Message {
        Message {
            text: text.to_string(),
            timestamp,
            username: username.to_string(),
        }
    }

    fn run(actions: Vec<StoreAction>) -> HangoutsState {
        actions
            .into_iter()
            .fold(HangoutsState::default(), reduce)
    }

    #[test]
    fn load_peers_fills_filtered_view() {
        let state = run(vec![StoreAction::LoadPeers(vec![
            peer("bob", HangoutState::Accepted),
            peer("carol", HangoutState::Inviter),
        ])]);
        assert_eq!(state.peers.len(), 2);
        assert_eq!(state.filtered_peers, state.peers);
        assert!(!state.is_loading);
    }

    #[test]
    fn filter_is_case_sensitive_substring() {
        let state = run(vec![
            StoreAction::LoadPeers(vec![
                peer("bobby", HangoutState::Accepted),
                peer("Bob", HangoutState::Accepted),
                peer("carol", HangoutState::Accepted),
            ]),
            StoreAction::SearchChanged("bob".to_string()),
            StoreAction::FilterPeers,
        ]);
        let names: Vec<_> = state.filtered_peers.iter().map(|h| h.username.as_str()).collect();
        assert_eq!(names, vec!["bobby"]);
        assert_eq!(state.peers.len(), 3);
    }

    #[test]
    fn search_changed_alone_does_not_refilter() {
        let state = run(vec![
            StoreAction::LoadPeers(vec![peer("bob", HangoutState::Accepted)]),
            StoreAction::SearchChanged("zed".to_string()),
        ]);
        assert_eq!(state.search_term, "zed");
        assert_eq!(state.filtered_peers.len(), 1);
    }

    #[test]
    fn lookup_lifecycle() {
        let started = run(vec![
            StoreAction::ErrorRaised("old".to_string()),
            StoreAction::LookupStarted,
        ]);
        assert!(started.is_loading);
        assert_eq!(started.last_error, None);

        let ok = reduce(
            started.clone(),
            StoreAction::LookupSuccess(vec![peer("dave", HangoutState::Invite)]),
        );
        assert!(!ok.is_loading);
        assert_eq!(ok.lookup_results.len(), 1);

        let failed = reduce(started, StoreAction::LookupFailed("timeout".to_string()));
        assert!(!failed.is_loading);
        assert_eq!(failed.last_error.as_deref(), Some("timeout"));
    }

    #[test]
    fn user_selected_becomes_pending_invite() {
        let state = run(vec![StoreAction::UserSelected(
            peer("dave", HangoutState::Accepted).with_email("dave@example.com"),
        )]);
        let active = state.active_peer.unwrap();
        assert_eq!(active.state, HangoutState::Invite);
        assert_eq!(active.email.as_deref(), Some("dave@example.com"));
        assert_eq!(state.messages, Some(vec![]));
        assert!(state.peers.is_empty());
    }

    #[test]
    fn peer_updated_replaces_in_place_and_refreshes_active() {
        let state = run(vec![
            StoreAction::LoadPeers(vec![
                peer("bob", HangoutState::Inviter),
                peer("carol", HangoutState::Accepted),
            ]),
            StoreAction::PeerSelected(peer("bob", HangoutState::Inviter)),
            StoreAction::PeerUpdated(peer("bob", HangoutState::Accepter)),
        ]);
        assert_eq!(state.peers[0], peer("bob", HangoutState::Accepter));
        assert_eq!(state.peers.len(), 2);
        assert_eq!(state.active_peer, Some(peer("bob", HangoutState::Accepter)));
    }

    #[test]
    fn peer_added_never_duplicates() {
        let state = run(vec![
            StoreAction::PeerAdded(peer("bob", HangoutState::Inviter)),
            StoreAction::PeerAdded(peer("bob", HangoutState::Accepted)),
        ]);
        assert_eq!(state.peers, vec![peer("bob", HangoutState::Accepted)]);
    }

    #[test]
    fn pending_command_clears_on_matching_peer_change() {
        let started = run(vec![StoreAction::CommandStarted {
            command: Command::Accept,
            username: "bob".to_string(),
        }]);
        assert!(started.pending_command.is_some());

        let other = reduce(
            started.clone(),
            StoreAction::PeerUpdated(peer("carol", HangoutState::Blocked)),
        );
        assert!(other.pending_command.is_some());

        let answered = reduce(
            started,
            StoreAction::PeerUpdated(peer("bob", HangoutState::Accepter)),
        );
        assert_eq!(answered.pending_command, None);
    }

    #[test]
    fn messages_load_then_append_in_order() {
        let state = run(vec![
            StoreAction::PeerSelected(peer("bob", HangoutState::Accepted)),
            StoreAction::MessagesLoaded(vec![message("bob", "hi", 1)]),
            StoreAction::MessageAppended(message("alice", "hey", 2)),
        ]);
        let texts: Vec<_> = state
            .messages
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, vec!["hi", "hey"]);
    }

    #[test]
    fn selecting_a_peer_resets_messages_until_loaded() {
        let state = run(vec![
            StoreAction::MessagesLoaded(vec![message("bob", "hi", 1)]),
            StoreAction::PeerSelected(peer("carol", HangoutState::Accepted)),
        ]);
        assert_eq!(state.messages, None);
    }

    #[test]
    fn error_raised_and_cleared() {
        let state = run(vec![StoreAction::ErrorRaised("boom".to_string())]);
        assert_eq!(state.last_error.as_deref(), Some("boom"));
        assert_eq!(reduce(state, StoreAction::ErrorCleared).last_error, None);
    }

    #[test]
    fn tags_use_wire_vocabulary() {
        assert_eq!(StoreAction::FilterPeers.tag(), "FILTER_PEERS");
        assert_eq!(
            StoreAction::PeerAdded(peer("bob", HangoutState::Inviter)).tag(),
            "PEER_ADDED"
        );
    }
}
