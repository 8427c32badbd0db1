//! HTTP-backed `SimilarityProvider` (spec §6: optional, consumed collaborator).
//!
//! Calls out to `SIMILARITY_PROVIDER_URL` with a 5s timeout and a single
//! retry (spec §5); any failure is surfaced as a `TransientStoreError` so the
//! corroboration engine falls back to its internal Jaccard scan, matching
//! the "absent or failing" contract in §6.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;

use crate::error::{PipelineError, PipelineResult};

use super::traits::{DuplicateMatch, SimilarityProvider};

const REQUEST_TIMEOUT_SECS: u64 = 5;
const MAX_RETRIES: u32 = 1;

#[derive(Debug, Serialize)]
struct FindDuplicatesRequest<'a> {
    article_id: &'a str,
    content: &'a str,
    title: &'a str,
    threshold: f64,
}

#[derive(Debug, Deserialize)]
struct FindDuplicatesResponse {
    duplicates: Vec<DuplicateMatch>,
}

pub struct HttpSimilarityProvider {
    client: Client,
    base_url: String,
}

impl HttpSimilarityProvider {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("reqwest client builds with default TLS backend"),
            base_url,
        }
    }
}

#[async_trait::async_trait]
impl SimilarityProvider for HttpSimilarityProvider {
    async fn find_duplicates(
        &self,
        article_id: &str,
        content: &str,
        title: &str,
        threshold: f64,
    ) -> PipelineResult<Vec<DuplicateMatch>> {
        let body = FindDuplicatesRequest { article_id, content, title, threshold };
        let mut attempt = 0u32;
        loop {
            let call = timeout(
                Duration::from_secs(REQUEST_TIMEOUT_SECS),
                self.client.post(format!("{}/duplicates", self.base_url)).json(&body).send(),
            )
            .await;

            match call {
                Ok(Ok(response)) => {
                    return response
                        .json::<FindDuplicatesResponse>()
                        .await
                        .map(|r| r.duplicates)
                        .map_err(|e| PipelineError::TransientStore(format!("similarity provider decode: {e}")));
                }
                Ok(Err(e)) if attempt < MAX_RETRIES => {
                    attempt += 1;
                    log::warn!("Degraded: similarity_provider_failed, retrying ({e})");
                    continue;
                }
                Ok(Err(e)) => return Err(PipelineError::TransientStore(format!("similarity provider: {e}"))),
                Err(_elapsed) if attempt < MAX_RETRIES => {
                    attempt += 1;
                    continue;
                }
                Err(_elapsed) => return Err(PipelineError::TransientStore("similarity provider timed out".into())),
            }
        }
    }
}
