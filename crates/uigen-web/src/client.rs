//! HTTP client for the generation backend.
//!
//! Generation requests run against a model and routinely take minutes,
//! so the default timeout is deliberately long. Every failure collapses
//! into [`NetworkError`], which carries a user-facing phrasing separate
//! from the diagnostic detail.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("request timed out")]
    Timeout,
    #[error("server returned {status}: {message}")]
    Server { status: u16, message: String },
    #[error("server returned an empty response")]
    NoResponse,
    #[error("{0}")]
    Client(String),
}

impl NetworkError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NetworkError::Timeout
        } else if let Some(status) = err.status() {
            NetworkError::Server {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            NetworkError::Client(err.to_string())
        }
    }

    /// Phrasing shown to the person waiting on a generation, as opposed
    /// to the diagnostic `Display` form.
    pub fn user_message(&self) -> String {
        match self {
            NetworkError::Timeout => {
                "The request took too long. Try a simpler prompt, or try again.".to_string()
            }
            NetworkError::Server { status, .. } => {
                format!("The generation service had a problem (status {status}). Try again.")
            }
            NetworkError::NoResponse => {
                "The generation service returned nothing. Try again.".to_string()
            }
            NetworkError::Client(_) => {
                "Could not reach the generation service. Check your connection.".to_string()
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct QuestionBody<'a> {
    question: &'a str,
}

#[derive(Debug, Deserialize)]
struct ResultBody {
    result: Option<String>,
}

#[derive(Debug, Serialize)]
struct QuickImproveBody<'a> {
    code: &'a str,
    design: &'a str,
    modification: &'a str,
}

#[derive(Debug, Serialize)]
pub struct PreviewUpdate<'a> {
    pub code: &'a str,
    pub seq: u64,
}

/// Client for the generate / improve / describe endpoints.
#[derive(Debug, Clone)]
pub struct GenerationClient {
    http: reqwest::Client,
    base_url: String,
}

impl GenerationClient {
    pub fn new(base_url: &str) -> Result<Self, NetworkError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, NetworkError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NetworkError::Client(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Generate component source for a prompt.
    pub async fn generate(&self, question: &str) -> Result<String, NetworkError> {
        self.ask("/generate", question).await
    }

    /// Short natural-language description of what was generated.
    pub async fn generate_description(&self, question: &str) -> Result<String, NetworkError> {
        self.ask("/generate-description", question).await
    }

    /// One-shot refinement of an existing component. The endpoint needs
    /// the current source and the design description alongside the
    /// requested modification.
    pub async fn quick_improve(
        &self,
        code: &str,
        design: &str,
        modification: &str,
    ) -> Result<String, NetworkError> {
        let response = self
            .http
            .post(self.url("/quick-improve"))
            .json(&QuickImproveBody {
                code,
                design,
                modification,
            })
            .send()
            .await
            .map_err(NetworkError::from_reqwest)?;
        Self::read_result(response).await
    }

    /// Push the latest code to the preview channel. Best-effort: the
    /// caller treats failure as a log line, not an error.
    pub async fn update_preview(&self, update: &PreviewUpdate<'_>) -> Result<(), NetworkError> {
        let response = self
            .http
            .post(self.url("/update-preview"))
            .json(update)
            .send()
            .await
            .map_err(NetworkError::from_reqwest)?;
        self.check_status(&response)?;
        Ok(())
    }

    async fn ask(&self, path: &str, question: &str) -> Result<String, NetworkError> {
        let response = self
            .http
            .post(self.url(path))
            .json(&QuestionBody { question })
            .send()
            .await
            .map_err(NetworkError::from_reqwest)?;
        Self::read_result(response).await
    }

    async fn read_result(response: reqwest::Response) -> Result<String, NetworkError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NetworkError::Server {
                status: status.as_u16(),
                message,
            });
        }
        let body: ResultBody = response
            .json()
            .await
            .map_err(|e| NetworkError::Client(e.to_string()))?;
        match body.result {
            Some(result) if !result.trim().is_empty() => Ok(result),
            _ => Err(NetworkError::NoResponse),
        }
    }

    fn check_status(&self, response: &reqwest::Response) -> Result<(), NetworkError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(NetworkError::Server {
                status: status.as_u16(),
                message: String::new(),
            })
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let client = GenerationClient::new("http://localhost:8080/").unwrap();
        assert_eq!(client.url("/generate"), "http://localhost:8080/generate");
    }

    #[test]
    fn user_messages_do_not_leak_diagnostics() {
        let err = NetworkError::Client("tcp connect error: 127.0.0.1:9 refused".to_string());
        assert!(!err.user_message().contains("127.0.0.1"));

        let err = NetworkError::Server {
            status: 503,
            message: "upstream exploded".to_string(),
        };
        assert!(err.user_message().contains("503"));
        assert!(!err.user_message().contains("exploded"));
    }

    #[test]
    fn quick_improve_body_carries_code_design_and_modification() {
        let body = QuickImproveBody {
            code: "function App() {}",
            design: "a pricing card",
            modification: "make the button blue",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["code"], "function App() {}");
        assert_eq!(json["design"], "a pricing card");
        assert_eq!(json["modification"], "make the button blue");
    }

    #[test]
    fn preview_update_serializes_code_and_seq() {
        let update = PreviewUpdate { code: "x", seq: 7 };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["code"], "x");
        assert_eq!(json["seq"], 7);
    }
}
