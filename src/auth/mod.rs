//! Shared-secret authentication
//!
//! The scheduled rotation endpoint and the administrative writes are each
//! gated by a configured secret, presented as a bearer token and compared
//! in constant time.

/// Validates bearer tokens against one configured secret
#[derive(Debug, Clone)]
pub struct SecretValidator {
    secret: Option<String>,
}

impl SecretValidator {
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    /// Validate an `Authorization` header value. An unconfigured validator
    /// rejects everything.
    pub fn validate_bearer(&self, header: Option<&str>) -> bool {
        let Some(ref expected) = self.secret else {
            return false;
        };
        let Some(header) = header else {
            return false;
        };
        let Some(token) = header.strip_prefix("Bearer ") else {
            return false;
        };
        constant_time_compare(token, expected)
    }
}

/// Constant-time string comparison to prevent timing attacks
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_rejects_everything() {
        let validator = SecretValidator::new(None);
        assert!(!validator.is_configured());
        assert!(!validator.validate_bearer(None));
        assert!(!validator.validate_bearer(Some("Bearer anything")));
    }

    #[test]
    fn empty_secret_treated_as_unconfigured() {
        let validator = SecretValidator::new(Some("".into()));
        assert!(!validator.is_configured());
    }

    #[test]
    fn bearer_token_must_match() {
        let validator = SecretValidator::new(Some("s3cret".into()));
        assert!(validator.validate_bearer(Some("Bearer s3cret")));
        assert!(!validator.validate_bearer(Some("Bearer wrong")));
        assert!(!validator.validate_bearer(Some("s3cret")));
        assert!(!validator.validate_bearer(None));
    }

    #[test]
    fn constant_time_compare_basics() {
        assert!(constant_time_compare("hello", "hello"));
        assert!(!constant_time_compare("hello", "world"));
        assert!(!constant_time_compare("hello", "hell"));
    }
}
