use std::fmt;

/// Jenkins API token, kept out of `Debug` output.
#[derive(Clone)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

/// Basic-auth credentials for the Jenkins JSON API.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: String,
    pub token: Token,
}

impl Credentials {
    /// Builds credentials only when both halves are present and non-empty.
    pub fn from_parts(user: Option<&str>, token: Option<&str>) -> Option<Self> {
        match (user, token) {
            (Some(user), Some(token)) if !user.is_empty() && !token.is_empty() => Some(Self {
                user: user.to_owned(),
                token: Token::from(token),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_debug_is_redacted() {
        let token = Token::from("11a2b3c4d5");
        assert_eq!(format!("{token:?}"), "Token(***)");
        assert_eq!(token.as_str(), "11a2b3c4d5");
    }

    #[test]
    fn test_credentials_require_both_parts() {
        assert!(Credentials::from_parts(Some("admin"), Some("secret")).is_some());
        assert!(Credentials::from_parts(Some("admin"), None).is_none());
        assert!(Credentials::from_parts(None, Some("secret")).is_none());
        assert!(Credentials::from_parts(Some(""), Some("secret")).is_none());
    }
}
