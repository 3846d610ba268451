//! HTTP client for the remote toxic-language-detection service

use std::time::Duration;

use serde_json::{json, Value};

use crate::classify::{
    normalize_raw, ClassificationError, ClassificationResult, Classifier, ClassifyRequest,
};
use crate::config::ApiConfig;

/// Remote classifier speaking the detection service's JSON protocol
///
/// One instance per pipeline; the underlying `reqwest::Client` pools
/// connections, so cloning the classifier is cheap.
#[derive(Debug, Clone)]
pub struct HttpClassifier {
    http: reqwest::Client,
    detect_url: String,
    batch_url: String,
    token: Option<String>,
    timeout: Duration,
}

impl HttpClassifier {
    /// Build a classifier from the `[api]` configuration section
    pub fn from_config(config: &ApiConfig) -> Result<Self, ClassificationError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| ClassificationError::Network(format!("failed to build client: {e}")))?;

        let base = config.endpoint.trim_end_matches('/');
        Ok(Self {
            http,
            detect_url: format!("{base}/detect"),
            batch_url: format!("{base}/detect/batch"),
            token: config.token(),
            timeout,
        })
    }

    /// Bulk submission used by user-initiated analysis flows, not the
    /// per-comment pipeline. Shares the normalization path with `classify`.
    pub async fn classify_batch(
        &self,
        requests: &[ClassifyRequest],
    ) -> Result<Vec<ClassificationResult>, ClassificationError> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let payload = json!({ "items": requests });
        let body = self.post(&self.batch_url, &payload).await?;

        // Either a bare array or {"results": [...]}
        let items = match &body {
            Value::Array(items) => items.as_slice(),
            Value::Object(map) => map
                .get("results")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .ok_or_else(|| {
                    ClassificationError::Malformed("batch response missing results".into())
                })?,
            other => {
                return Err(ClassificationError::Malformed(format!(
                    "batch response must be an array or object, got {other}"
                )))
            }
        };

        if items.len() != requests.len() {
            return Err(ClassificationError::Malformed(format!(
                "batch returned {} results for {} items",
                items.len(),
                requests.len()
            )));
        }

        items.iter().map(normalize_raw).collect()
    }

    async fn post(&self, url: &str, payload: &Value) -> Result<Value, ClassificationError> {
        let mut request = self.http.post(url).json(payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| self.map_transport(e))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassificationError::Auth(format!("HTTP {status}: {body}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassificationError::Server {
                status: status.as_u16(),
                message: body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ClassificationError::Malformed(format!("invalid JSON response: {e}")))
    }

    fn map_transport(&self, error: reqwest::Error) -> ClassificationError {
        if error.is_timeout() {
            ClassificationError::Timeout(self.timeout)
        } else {
            ClassificationError::Network(error.to_string())
        }
    }
}

impl Classifier for HttpClassifier {
    async fn classify(
        &self,
        request: ClassifyRequest,
    ) -> Result<ClassificationResult, ClassificationError> {
        let payload = json!({
            "text": request.text,
            "platform": request.platform,
            "platform_id": request.platform_id,
            "metadata": request.metadata,
        });

        let body = self.post(&self.detect_url, &payload).await?;
        normalize_raw(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Platform;

    fn test_config() -> ApiConfig {
        ApiConfig {
            endpoint: "http://127.0.0.1:9/api/".to_string(),
            api_key_env: "TOXISCAN_TEST_TOKEN_UNSET".to_string(),
            timeout_secs: 20,
            connect_timeout_secs: 10,
        }
    }

    #[test]
    fn test_urls_derived_from_endpoint() {
        let client = HttpClassifier::from_config(&test_config()).unwrap();
        assert_eq!(client.detect_url, "http://127.0.0.1:9/api/detect");
        assert_eq!(client.batch_url, "http://127.0.0.1:9/api/detect/batch");
        assert!(client.token.is_none());
    }

    #[tokio::test]
    async fn test_empty_batch_skips_network() {
        // Port 9 (discard) is never reachable; an empty batch must not try
        let client = HttpClassifier::from_config(&test_config()).unwrap();
        let results = client.classify_batch(&[]).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        let client = HttpClassifier::from_config(&test_config()).unwrap();
        let err = client
            .classify(ClassifyRequest::new("some comment text", Platform::Generic))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClassificationError::Network(_) | ClassificationError::Timeout(_)
        ));
    }
}
