mod actions;
mod core;
pub mod logging;
mod state;
mod updates;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;

use flume::{Receiver, Sender};

pub use actions::AppAction;
pub use crate::core::config::{AppConfig, CONFIG_FILE_NAME, StorageKind, load_app_config};
pub use crate::core::dispatch::{CommandEnvelope, DispatchError, build_envelope, online_envelope};
pub use crate::core::lookup::{LookupClient, LookupError};
pub use crate::core::reconcile::{
    ReconcileError, Reconciliation, decode_frame, load_hangouts, load_messages, reconcile,
};
pub use crate::core::storage::{cache_path, open_cache};
pub use crate::core::store::{StoreAction, reduce};
pub use crate::core::transport::{ReconnectPolicy, TransportError, connection_url};
pub use hangouts_storage_traits::{Command, Hangout, HangoutState, Message};
pub use state::*;
pub use updates::*;

/// Return the default `hangouts_config.json` payload used when no config file exists.
pub fn default_config_json() -> String {
    crate::core::config::default_app_config_json()
}

pub trait AppObserver: Send + Sync + 'static {
    fn on_update(&self, update: AppUpdate);
}

/// Host-facing handle. One actor thread owns all state; this handle only
/// posts actions and reads snapshots.
pub struct HangoutsApp {
    core_tx: Sender<CoreMsg>,
    update_rx: Receiver<AppUpdate>,
    listening: AtomicBool,
    shared_state: Arc<RwLock<AppState>>,
}

impl HangoutsApp {
    /// Starts the actor with the config found in `data_dir`.
    pub fn new(data_dir: String) -> Arc<Self> {
        logging::init_logging(&data_dir);
        let config = load_app_config(&data_dir);
        Self::with_config(data_dir, config)
    }

    /// Starts the actor with an explicit config; nothing is read from `data_dir`
    /// except the caches themselves.
    pub fn with_config(data_dir: String, config: AppConfig) -> Arc<Self> {
        tracing::info!(data_dir = %data_dir, "HangoutsApp starting");

        let (update_tx, update_rx) = flume::unbounded();
        let (core_tx, core_rx) = flume::unbounded::<CoreMsg>();
        let shared_state = Arc::new(RwLock::new(AppState::empty()));

        // Actor loop thread (single threaded "app actor").
        let core_tx_for_core = core_tx.clone();
        let shared_for_core = shared_state.clone();
        thread::spawn(move || {
            let mut core = crate::core::AppCore::new(
                update_tx,
                core_tx_for_core,
                data_dir,
                config,
                shared_for_core,
            );
            while let Ok(msg) = core_rx.recv() {
                core.handle_message(msg);
            }
        });

        Arc::new(Self {
            core_tx,
            update_rx,
            listening: AtomicBool::new(false),
            shared_state,
        })
    }

    pub fn state(&self) -> AppState {
        match self.shared_state.read() {
            Ok(g) => g.clone(),
            Err(poison) => poison.into_inner().clone(),
        }
    }

    pub fn dispatch(&self, action: AppAction) {
        // Contract: never block caller.
        let _ = self.core_tx.send(CoreMsg::Action(action));
    }

    pub fn listen_for_updates(&self, observer: Box<dyn AppObserver>) {
        if self
            .listening
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            // Avoid multiple listeners that would split messages.
            return;
        }

        let rx = self.update_rx.clone();
        thread::spawn(move || {
            while let Ok(update) = rx.recv() {
                observer.on_update(update);
            }
        });
    }
}
