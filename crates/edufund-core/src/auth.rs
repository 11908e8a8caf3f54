//! Donor Authentication
//!
//! Resolves a bearer access token into the donor it belongs to.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::Donor;

/// Authentication trait (one implementation per identity provider)
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Resolve an access token. `Ok(None)` means the token was rejected;
    /// `Err` means the identity provider could not be reached.
    async fn authenticate(&self, access_token: &str) -> Result<Option<Donor>>;
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("bearer  xyz "), Some("xyz"));
        assert_eq!(bearer_token("Basic dXNlcg=="), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("token"), None);
    }
}
