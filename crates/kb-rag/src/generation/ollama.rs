//! Ollama HTTP client for embeddings and text generation

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use crate::config::LlmConfig;
use crate::error::{Error, Result};

/// Ollama API client
///
/// Embedding requests are retried with exponential backoff; generation
/// requests are attempted once and failures are surfaced to the caller.
#[derive(Clone)]
pub struct OllamaClient {
    /// HTTP client
    client: Client,
    /// Base URL of the Ollama server
    base_url: String,
    /// Temperature for generation
    temperature: f32,
    /// Maximum retries for embedding requests
    max_retries: u32,
    /// Per-request HTTP timeout
    request_timeout: Duration,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: usize,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let request_timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .timeout(request_timeout)
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            temperature: config.temperature,
            max_retries: config.max_retries,
            request_timeout,
        })
    }

    /// Map a generation transport error, keeping timeouts distinguishable
    fn generation_error(&self, context: &str, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::GenerationTimeout {
                timeout: self.request_timeout,
            }
        } else {
            Error::generation(format!("{}: {}", context, err))
        }
    }

    /// Retry a request with exponential backoff
    async fn retry_request<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if attempt < self.max_retries => {
                    let delay = Duration::from_secs(2u64.pow(attempt));
                    tracing::warn!(
                        "Request failed (attempt {}/{}): {}, retrying in {:?}",
                        attempt + 1,
                        self.max_retries + 1,
                        e,
                        delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Check if Ollama is available
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Generate an embedding with retry
    pub async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);

        self.retry_request(|| async {
            let response = self
                .client
                .post(&url)
                .json(&EmbedRequest { model, prompt: text })
                .send()
                .await
                .map_err(|e| Error::embedding(format!("Embedding request failed: {}", e)))?;

            if !response.status().is_success() {
                return Err(Error::embedding(format!(
                    "Embedding failed: HTTP {}",
                    response.status()
                )));
            }

            let embed_response: EmbedResponse = response
                .json()
                .await
                .map_err(|e| Error::embedding(format!("Failed to parse embedding response: {}", e)))?;

            Ok(embed_response.embedding)
        })
        .await
    }

    /// Generate a completion (single attempt)
    pub async fn generate(&self, model: &str, prompt: &str, max_tokens: usize) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        tracing::info!("Generating answer with model: {}", model);

        let request = GenerateRequest {
            model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
                num_predict: max_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.generation_error("Generation request failed", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::generation(format!(
                "Generation failed: HTTP {} - {}",
                status, body
            )));
        }

        let generate_response: GenerateResponse = response
            .json()
            .await
            .map_err(|e| self.generation_error("Failed to parse generation response", e))?;

        Ok(generate_response.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_request_shape() {
        let request = GenerateRequest {
            model: "tinyllama",
            prompt: "Bonjour",
            stream: false,
            options: GenerateOptions {
                temperature: 0.3,
                num_predict: 150,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "tinyllama");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 150);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = LlmConfig {
            base_url: "http://localhost:11434/".to_string(),
            ..LlmConfig::default()
        };
        let client = OllamaClient::new(&config).unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unhealthy() {
        let config = LlmConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 1,
            ..LlmConfig::default()
        };
        let client = OllamaClient::new(&config).unwrap();
        assert!(!client.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_generation_failure_is_generation_error() {
        let config = LlmConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 1,
            ..LlmConfig::default()
        };
        let client = OllamaClient::new(&config).unwrap();
        let err = client.generate("tinyllama", "prompt", 10).await.unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
    }

    #[tokio::test]
    async fn test_silent_server_is_generation_timeout() {
        // Accepts connections and never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let config = LlmConfig {
            base_url: format!("http://{}", addr),
            timeout_secs: 1,
            ..LlmConfig::default()
        };
        let client = OllamaClient::new(&config).unwrap();
        let err = client.generate("tinyllama", "prompt", 10).await.unwrap_err();
        assert!(
            matches!(err, Error::GenerationTimeout { timeout } if timeout == Duration::from_secs(1)),
            "unexpected error: {err}"
        );
    }
}
