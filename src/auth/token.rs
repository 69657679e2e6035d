use reqwest::RequestBuilder;

/// Azure DevOps personal access token. `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self(value.trim().to_owned())
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Adds the token as the password of a Basic credential with an empty
    /// user name, which is how Azure DevOps accepts PATs. Empty tokens leave
    /// the request anonymous.
    pub fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        if self.is_empty() {
            return request;
        }
        request.basic_auth("", Some(&self.0))
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Token(<redacted>)")
    }
}
