use thiserror::Error;

/// Errors surfaced by the chat-completion client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("invalid llm config: {0}")]
    InvalidConfig(String),
    /// The configured API key variable is unset or empty.
    #[error("environment variable `{0}` holding the llm api key is not set")]
    MissingApiKey(String),
    /// Transport failure or non-success HTTP status.
    #[error("http failure: {0}")]
    Http(String),
    /// The completion body had no usable `choices[0].message.content`.
    #[error("invalid completion response: {0}")]
    InvalidResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_names_variable() {
        let err = LlmError::MissingApiKey("OPENAI_API_KEY".into());
        assert!(err.to_string().contains("`OPENAI_API_KEY`"));
    }

    #[test]
    fn http_keeps_status() {
        let err = LlmError::Http("HTTP error 429 Too Many Requests".into());
        assert!(err.to_string().contains("429"));
    }
}
