//! Fill-in-the-middle completion against a llama.cpp `/infill` endpoint.

use qogito_core::error::ProviderError;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::transport::{TransportConfig, map_reqwest_error, trim_base_url};

/// Tokens requested per infill.
pub const INFILL_N_PREDICT: u32 = 32;

pub struct InfillClient {
    http: reqwest::Client,
}

impl InfillClient {
    pub fn new(transport: &TransportConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            http: transport.build_client()?,
        })
    }

    /// Ask the server for text to insert between `prefix` and `suffix`.
    pub async fn infill(
        &self,
        completion_url: &str,
        prefix: &str,
        suffix: &str,
        cancel: &CancellationToken,
    ) -> Result<String, ProviderError> {
        let url = format!("{}/infill", trim_base_url(completion_url));
        let body = InfillRequest {
            input_prefix: prefix,
            input_suffix: suffix,
            n_predict: INFILL_N_PREDICT,
            stream: false,
            cache_prompt: true,
        };

        debug!(
            url = %url,
            prefix_len = prefix.len(),
            suffix_len = suffix.len(),
            "Sending infill request"
        );

        let request = async {
            let response = self
                .http
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(map_reqwest_error)?;
            if !response.status().is_success() {
                return Err(ProviderError::Http {
                    status: response.status().as_u16(),
                });
            }
            let parsed: InfillResponse = response
                .json()
                .await
                .map_err(map_reqwest_error)?;
            Ok(parsed.content)
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ProviderError::Aborted),
            result = request => result,
        }
    }
}

#[derive(Debug, Serialize)]
struct InfillRequest<'a> {
    input_prefix: &'a str,
    input_suffix: &'a str,
    n_predict: u32,
    stream: bool,
    cache_prompt: bool,
}

#[derive(Debug, Deserialize)]
struct InfillResponse {
    content: String,
}
