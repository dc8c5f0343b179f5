use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use hangouts_core::{AppConfig, AppObserver, AppState, AppUpdate, HangoutsApp, StorageKind};

pub fn wait_until(what: &str, timeout: Duration, f: impl FnMut() -> bool) {
    wait_until_with_poll(what, timeout, Duration::from_millis(20), f);
}

pub fn wait_until_with_poll(
    what: &str,
    timeout: Duration,
    poll: Duration,
    mut f: impl FnMut() -> bool,
) {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if f() {
            return;
        }
        std::thread::sleep(poll);
    }
    panic!("{what}: condition not met within {timeout:?}");
}

pub fn write_config(data_dir: &str, ws_url: &str, lookup_url: &str) {
    let path = std::path::Path::new(data_dir).join(hangouts_core::CONFIG_FILE_NAME);
    let v = serde_json::json!({
        "disable_network": false,
        "ws_url": ws_url,
        "lookup_url": lookup_url,
        "storage": "sqlite",
    });
    std::fs::write(path, serde_json::to_vec(&v).unwrap()).unwrap();
}

pub fn online_config(ws_url: &str, lookup_url: &str) -> AppConfig {
    AppConfig {
        ws_url: Some(ws_url.to_string()),
        lookup_url: Some(lookup_url.to_string()),
        storage: Some(StorageKind::Sqlite),
        disable_network: Some(false),
    }
}

pub fn start_app(data_dir: &str, config: AppConfig) -> (Arc<HangoutsApp>, Collector) {
    let app = HangoutsApp::with_config(data_dir.to_string(), config);
    let collector = Collector::new();
    app.listen_for_updates(Box::new(collector.clone()));
    (app, collector)
}

#[derive(Clone)]
pub struct Collector(pub Arc<Mutex<Vec<AppUpdate>>>);

impl Collector {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(Vec::new())))
    }

    pub fn revs(&self) -> Vec<u64> {
        self.0.lock().unwrap().iter().map(AppUpdate::rev).collect()
    }

    pub fn last_state(&self) -> Option<AppState> {
        self.0.lock().unwrap().last().map(|u| match u {
            AppUpdate::FullState(s) => s.clone(),
        })
    }

    pub fn last_toast(&self) -> Option<String> {
        self.last_state().and_then(|s| s.toast)
    }
}

impl AppObserver for Collector {
    fn on_update(&self, update: AppUpdate) {
        self.0.lock().unwrap().push(update);
    }
}
