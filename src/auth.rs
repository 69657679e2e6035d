mod token;

pub use token::Token;

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::AUTHORIZATION;
    use reqwest::Client;

    fn authorization(token: &Token) -> Option<String> {
        let request = token
            .authorize(Client::new().get("https://dev.azure.com/contoso/_apis/projects"))
            .build()
            .unwrap();

        request
            .headers()
            .get(AUTHORIZATION)
            .map(|value| value.to_str().unwrap().to_string())
    }

    #[test]
    fn test_token_is_trimmed() {
        let token = Token::from("  4xq7w2m3kd9p1r8s6t5u0v2w3x4y5z6a7b8c9d0e1f2g3h\n");

        assert_eq!(token.as_str(), "4xq7w2m3kd9p1r8s6t5u0v2w3x4y5z6a7b8c9d0e1f2g3h");
    }

    #[test]
    fn test_whitespace_token_is_empty() {
        assert!(Token::from("  \t").is_empty());
        assert!(Token::from(String::new()).is_empty());
        assert!(!Token::from("pat").is_empty());
    }

    #[test]
    fn test_authorize_uses_empty_user_name() {
        // base64(":pat")
        assert_eq!(
            authorization(&Token::from("pat")).as_deref(),
            Some("Basic OnBhdA==")
        );
    }

    #[test]
    fn test_empty_token_leaves_request_anonymous() {
        assert_eq!(authorization(&Token::from("")), None);
    }

    #[test]
    fn test_debug_redacts_value() {
        #[derive(Debug)]
        #[allow(dead_code)]
        struct Credentials {
            organization: String,
            token: Token,
        }

        let credentials = Credentials {
            organization: "contoso".to_string(),
            token: Token::from("azdo_very_secret_token"),
        };

        let debug_output = format!("{credentials:?}");

        assert!(debug_output.contains("Token(<redacted>)"));
        assert!(debug_output.contains("contoso"));
        assert!(!debug_output.contains("azdo_very_secret_token"));
    }
}
