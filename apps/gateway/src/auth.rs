//! HTTP Basic credential extraction (§6).
//!
//! ActiveSync devices authenticate with plain HTTP Basic, not the bearer
//! tokens the teacher's cloud-api used for Store Hub uplinks.

use base64::Engine;

/// A decoded Basic credential pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

/// Parses an `Authorization: Basic <base64>` header value.
pub fn parse_basic_auth(header_value: &str) -> Option<BasicCredentials> {
    let encoded = header_value.strip_prefix("Basic ")?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;

    Some(BasicCredentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_auth_roundtrip() {
        let encoded = base64::engine::general_purpose::STANDARD.encode("alice:secret");
        let header = format!("Basic {encoded}");
        let creds = parse_basic_auth(&header).unwrap();
        assert_eq!(creds.username, "alice");
        assert_eq!(creds.password, "secret");
    }

    #[test]
    fn test_parse_basic_auth_rejects_other_schemes() {
        assert!(parse_basic_auth("Bearer abc123").is_none());
    }

    #[test]
    fn test_parse_basic_auth_rejects_malformed_payload() {
        let encoded = base64::engine::general_purpose::STANDARD.encode("no-colon-here");
        assert!(parse_basic_auth(&format!("Basic {encoded}")).is_none());
    }
}
