//! Shared service state.

use std::sync::Arc;

use crate::auth::TokenIssuer;
use crate::config::AuthConfig;
use crate::forum::ForumService;
use crate::store::ForumStore;

/// State shared by every request handler.
///
/// Holds the forum store and the token issuer. The signing secret lives
/// inside the issuer and is never exposed to handlers.
pub struct ServiceState<S: ForumStore + 'static> {
    /// The forum store.
    pub store: Arc<S>,
    tokens: Arc<TokenIssuer>,
}

impl<S: ForumStore + 'static> ServiceState<S> {
    /// Create service state from a store and a token issuer.
    pub fn new(store: S, tokens: TokenIssuer) -> Self {
        Self {
            store: Arc::new(store),
            tokens: Arc::new(tokens),
        }
    }

    /// Create service state reading the token settings from the environment.
    ///
    /// See [`AuthConfig::from_env`].
    pub fn from_env(store: S) -> Self {
        Self::new(store, AuthConfig::from_env().issuer())
    }

    /// Forum operations over this state's store.
    pub fn forum(&self) -> ForumService<S> {
        ForumService::new(Arc::clone(&self.store), Arc::clone(&self.tokens))
    }
}

impl<S: ForumStore + 'static> Clone for ServiceState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            tokens: Arc::clone(&self.tokens),
        }
    }
}
