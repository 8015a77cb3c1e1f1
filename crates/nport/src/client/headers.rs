//! Identification headers required by SEC's fair-access policy.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};

use crate::errors::NportError;

/// A declared user agent that carries a contact address.
///
/// SEC blocks automated requests that do not identify the caller with a
/// company/application name and an e-mail address, so an agent without one
/// is refused at construction time rather than sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserAgent(String);

impl UserAgent {
    /// Validate a user-agent string such as `NPORT Viewer (ops@example.com)`.
    pub fn new(value: impl Into<String>) -> Result<Self, NportError> {
        let value = value.into().trim().to_string();
        if !has_contact_address(&value) {
            return Err(NportError::Config(format!(
                "SEC user agent must include a contact e-mail address, got '{}'",
                value
            )));
        }
        if HeaderValue::from_str(&value).is_err() {
            return Err(NportError::Config(format!(
                "SEC user agent contains characters not allowed in a header: '{}'",
                value
            )));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn has_contact_address(value: &str) -> bool {
    value
        .split(|c: char| c.is_whitespace() || matches!(c, '(' | ')' | '<' | '>' | ';' | ','))
        .any(|token| match token.split_once('@') {
            Some((user, domain)) => !user.is_empty() && domain.contains('.') && !domain.ends_with('.'),
            None => false,
        })
}

/// Headers attached to every request sent to SEC hosts.
pub fn sec_headers(user_agent: &UserAgent) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(user_agent.as_str()) {
        headers.insert(USER_AGENT, value);
    }
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, application/xml, text/xml, */*"),
    );
    headers
}
