//! Basic-auth header construction for the local service.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Builds the `Authorization` header value for the local service.
///
/// The local service accepts `user:password` where the password comes from
/// the session descriptor and the user is a fixed name.
pub fn basic_authorization(user: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{user}:{password}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_authorization_encodes_user_and_password() {
        assert_eq!(basic_authorization("riot", "pass"), "Basic cmlvdDpwYXNz");
    }

    #[test]
    fn test_basic_authorization_keeps_colons_in_password() {
        let header = basic_authorization("riot", "a:b");
        let encoded = header.strip_prefix("Basic ").unwrap();
        let decoded = String::from_utf8(STANDARD.decode(encoded).unwrap()).unwrap();
        assert_eq!(decoded, "riot:a:b");
    }
}
