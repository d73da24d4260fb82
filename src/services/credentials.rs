use std::fmt;

use super::error::ServiceError;

/// An API key for the model provider. Threaded through each call instead of
/// living in global state, so concurrent requests never see each other's key.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Decides which key a request runs with: the caller's own key wins, the
/// server-wide key from the environment is the fallback.
#[derive(Debug, Clone, Default)]
pub struct CredentialResolver {
    fallback: Option<Credential>,
}

impl CredentialResolver {
    pub fn new(fallback: Option<String>) -> Self {
        Self {
            fallback: non_blank(fallback.as_deref()).map(Credential::new),
        }
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Fails before any remote call is attempted when neither source has a key.
    pub fn resolve(&self, explicit: Option<&str>) -> Result<Credential, ServiceError> {
        if let Some(key) = non_blank(explicit) {
            return Ok(Credential::new(key));
        }
        self.fallback.clone().ok_or(ServiceError::MissingCredential)
    }
}

fn non_blank(key: Option<&str>) -> Option<&str> {
    key.map(str::trim).filter(|k| !k.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_key_wins() {
        let resolver = CredentialResolver::new(Some("env-key".to_string()));
        let credential = resolver.resolve(Some("header-key")).unwrap();
        assert_eq!(credential.expose(), "header-key");
    }

    #[test]
    fn test_falls_back_to_environment_key() {
        let resolver = CredentialResolver::new(Some("env-key".to_string()));
        assert_eq!(resolver.resolve(None).unwrap().expose(), "env-key");
        // An empty header counts as no header
        assert_eq!(resolver.resolve(Some("  ")).unwrap().expose(), "env-key");
    }

    #[test]
    fn test_missing_everywhere() {
        let resolver = CredentialResolver::new(Some(String::new()));
        assert!(!resolver.has_fallback());
        assert!(matches!(
            resolver.resolve(None),
            Err(ServiceError::MissingCredential)
        ));
    }

    #[test]
    fn test_debug_redacts_key() {
        let credential = Credential::new("sk-secret");
        assert!(!format!("{:?}", credential).contains("sk-secret"));
    }
}
