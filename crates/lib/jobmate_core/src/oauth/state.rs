//! CSRF `state` values for the authorization-code flow.

use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine;
use dashmap::DashMap;
use rand::RngCore;

/// How long a login may take between redirect and callback.
pub const STATE_TTL: Duration = Duration::from_secs(600);

/// Generate an unguessable, URL-safe state value.
pub fn generate_state() -> String {
    let mut bytes = [0u8; 24];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// A login started at a provider and not yet completed.
#[derive(Debug, Clone)]
pub struct PendingLogin {
    pub provider: String,
    pub created_at: Instant,
}

/// Single-use state values keyed by the state string.
pub struct OAuthStateStore {
    states: DashMap<String, PendingLogin>,
    ttl: Duration,
}

impl OAuthStateStore {
    pub fn new() -> Self {
        Self::with_ttl(STATE_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            states: DashMap::new(),
            ttl,
        }
    }

    /// Start a login for `provider` and return its fresh state value.
    pub fn issue(&self, provider: &str) -> String {
        let state = generate_state();
        self.states.insert(
            state.clone(),
            PendingLogin {
                provider: provider.to_string(),
                created_at: Instant::now(),
            },
        );
        state
    }

    /// Consume a state value. Succeeds once, only for the provider it was
    /// issued for and only within the TTL.
    pub fn consume(&self, state: &str, provider: &str) -> bool {
        match self.states.remove(state) {
            Some((_, pending)) => {
                pending.provider == provider && pending.created_at.elapsed() <= self.ttl
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Evict expired entries.
    pub fn cleanup(&self) {
        let ttl = self.ttl;
        self.states.retain(|_, v| v.created_at.elapsed() <= ttl);
    }

    /// Spawn a periodic cleanup task.
    pub fn spawn_cleanup_task(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                store.cleanup();
            }
        })
    }
}

impl Default for OAuthStateStore {
    fn default() -> Self {
        Self::new()
    }
}
