//! The authenticated session's bearer tokens.
//!
//! A `TokenPair` is plain data. `SessionClient` owns the only live instance
//! and mutates it on login, refresh, logout and reset; everything else reads
//! a snapshot.

use std::fmt;

#[derive(Clone, Default, PartialEq, Eq)]
pub struct TokenPair {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token: Some(refresh_token.into()),
        }
    }

    /// The access token, if one is held. Empty strings count as absent.
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }

    /// The refresh token, if one is held. Empty strings count as absent.
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn has_access_token(&self) -> bool {
        self.access_token().is_some()
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token().is_some()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_access_token() && !self.has_refresh_token()
    }

    pub(crate) fn replace(&mut self, access_token: String, refresh_token: String) {
        self.access_token = Some(access_token);
        self.refresh_token = Some(refresh_token);
    }

    pub(crate) fn set_access_token(&mut self, access_token: String) {
        self.access_token = Some(access_token);
    }

    pub(crate) fn clear(&mut self) {
        self.access_token = None;
        self.refresh_token = None;
    }
}

// Tokens are bearer credentials; never print them.
impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &self.has_access_token().then_some("<redacted>"))
            .field("refresh_token", &self.has_refresh_token().then_some("<redacted>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_empty() {
        let tokens = TokenPair::default();
        assert!(tokens.is_empty());
        assert!(tokens.access_token().is_none());
        assert!(tokens.refresh_token().is_none());
    }

    #[test]
    fn empty_strings_count_as_absent() {
        let tokens = TokenPair::new("", "");
        assert!(!tokens.has_access_token());
        assert!(!tokens.has_refresh_token());
    }

    #[test]
    fn set_access_token_keeps_refresh_token() {
        let mut tokens = TokenPair::new("a1", "r1");
        tokens.set_access_token("a2".to_string());
        assert_eq!(tokens.access_token(), Some("a2"));
        assert_eq!(tokens.refresh_token(), Some("r1"));
    }

    #[test]
    fn clear_drops_both() {
        let mut tokens = TokenPair::new("a1", "r1");
        tokens.clear();
        assert!(tokens.is_empty());
    }

    #[test]
    fn debug_redacts_tokens() {
        let tokens = TokenPair::new("secret-access", "secret-refresh");
        let debug = format!("{tokens:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("<redacted>"));
    }
}
