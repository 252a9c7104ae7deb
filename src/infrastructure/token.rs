use std::sync::RwLock;
use tracing::info;

/// Holds the current bearer access token for the mail provider.
///
/// Passed explicitly to every collaborator that needs it; an OAuth refresh
/// flow (out of scope here) pushes new tokens in through [`update`].
///
/// [`update`]: TokenProvider::update
pub struct TokenProvider {
    token: RwLock<String>,
}

impl TokenProvider {
    pub fn new(initial: String) -> Self {
        Self {
            token: RwLock::new(initial),
        }
    }

    /// Current token. A stale value just surfaces as a provider auth error
    /// on the next request.
    pub fn current(&self) -> String {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Replace the token after a refresh.
    pub fn update(&self, token: String) {
        let mut guard = self.token.write().unwrap_or_else(|e| e.into_inner());
        *guard = token;
        info!("Access token updated");
    }
}
