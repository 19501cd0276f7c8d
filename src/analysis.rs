//! Analysis client: ships a selected image to the configured backend and
//! folds whatever comes back into an [`AnalysisResult`].

use reqwest::{multipart, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::Backend;
use crate::error::ErrorKind;
use crate::intake::SelectedImage;

pub const RATE_LIMIT_MESSAGE: &str = "Rate limit exceeded. Please try again in a moment.";
pub const QUOTA_MESSAGE: &str = "AI service credits exhausted. Please contact support.";
pub const GENERIC_UPSTREAM_MESSAGE: &str = "Server error";
pub const NETWORK_MESSAGE: &str =
    "Failed to reach the inference backend. Make sure it is running and reachable.";

/// How the diagnosis text should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosisFormat {
    /// A class label from the classifier, e.g. "Leaf Blight".
    Label,
    /// Free-form report text from the language model, shown verbatim.
    Narrative,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnosis {
    pub diagnosis_text: String,
    pub confidence: Option<f64>,
    pub format: DiagnosisFormat,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisFailure {
    pub kind: ErrorKind,
    pub message: String,
}

/// Outcome of exactly one request. There are no partial results.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisResult {
    Success(Diagnosis),
    Failure(AnalysisFailure),
}

impl AnalysisResult {
    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        AnalysisResult::Failure(AnalysisFailure {
            kind,
            message: message.into(),
        })
    }
}

/// Body shape shared by the inference endpoint and the proxy.
#[derive(Debug, Default, Deserialize)]
struct BackendResponse {
    prediction: Option<String>,
    confidence: Option<f64>,
    diagnosis: Option<String>,
    error: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProxyRequest<'a> {
    image_base64: &'a str,
}

#[derive(Clone)]
pub struct AnalysisClient {
    http: reqwest::Client,
    backend: Backend,
}

impl AnalysisClient {
    pub fn new(backend: Backend) -> Self {
        Self {
            http: reqwest::Client::new(),
            backend,
        }
    }

    /// Runs one analysis. Never retries; every failure path ends up as
    /// `AnalysisResult::Failure`.
    pub async fn analyze(&self, image: &SelectedImage) -> AnalysisResult {
        let request = match &self.backend {
            Backend::Inference { url } => {
                let part = match multipart::Part::bytes(image.raw_bytes.clone())
                    .file_name(image.file_name.clone())
                    .mime_str(&image.mime_type)
                {
                    Ok(part) => part,
                    Err(e) => {
                        tracing::warn!("unusable content type {}: {}", image.mime_type, e);
                        return AnalysisResult::failure(ErrorKind::Validation, "not an image");
                    }
                };
                let form = multipart::Form::new().part("image", part);
                tracing::info!("📤 Sending {} to inference endpoint {}", image.file_name, url);
                self.http.post(url).multipart(form)
            }
            Backend::Proxy { url } => {
                tracing::info!("📤 Sending {} to analysis proxy {}", image.file_name, url);
                self.http.post(url).json(&ProxyRequest {
                    image_base64: &image.preview,
                })
            }
        };

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("analysis request failed: {}", e);
                return AnalysisResult::failure(ErrorKind::Network, NETWORK_MESSAGE);
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("failed to read analysis response: {}", e);
                return AnalysisResult::failure(ErrorKind::Network, NETWORK_MESSAGE);
            }
        };

        let result = interpret_response(status, &body);
        match &result {
            AnalysisResult::Success(_) => tracing::info!("✅ Analysis complete ({})", status),
            AnalysisResult::Failure(failure) => {
                tracing::warn!("analysis failed ({}): {}", status, failure.message)
            }
        }
        result
    }
}

/// Maps a raw backend response onto the result union.
pub fn interpret_response(status: StatusCode, body: &str) -> AnalysisResult {
    let parsed = serde_json::from_str::<BackendResponse>(body);

    if !status.is_success() {
        let kind = match status {
            StatusCode::TOO_MANY_REQUESTS => ErrorKind::RateLimited,
            StatusCode::PAYMENT_REQUIRED => ErrorKind::QuotaExhausted,
            _ => ErrorKind::Upstream,
        };
        let message = parsed
            .ok()
            .and_then(|b| b.error)
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| match kind {
                ErrorKind::RateLimited => RATE_LIMIT_MESSAGE.to_string(),
                ErrorKind::QuotaExhausted => QUOTA_MESSAGE.to_string(),
                _ => GENERIC_UPSTREAM_MESSAGE.to_string(),
            });
        return AnalysisResult::failure(kind, message);
    }

    let parsed = match parsed {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::error!("malformed analysis response: {}", e);
            return AnalysisResult::failure(ErrorKind::Network, NETWORK_MESSAGE);
        }
    };

    if let Some(text) = parsed.diagnosis {
        return AnalysisResult::Success(Diagnosis {
            diagnosis_text: text,
            confidence: parsed.confidence,
            format: DiagnosisFormat::Narrative,
        });
    }
    if let Some(label) = parsed.prediction {
        return AnalysisResult::Success(Diagnosis {
            diagnosis_text: label,
            confidence: parsed.confidence,
            format: DiagnosisFormat::Label,
        });
    }

    tracing::error!("analysis response carried neither prediction nor diagnosis");
    AnalysisResult::failure(ErrorKind::Network, NETWORK_MESSAGE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prediction_becomes_label_diagnosis() {
        let result = interpret_response(
            StatusCode::OK,
            r#"{"prediction":"Tomato___Early_blight","confidence":0.8734}"#,
        );
        assert_eq!(
            result,
            AnalysisResult::Success(Diagnosis {
                diagnosis_text: "Tomato___Early_blight".to_string(),
                confidence: Some(0.8734),
                format: DiagnosisFormat::Label,
            })
        );
    }

    #[test]
    fn diagnosis_text_is_kept_verbatim() {
        let result = interpret_response(StatusCode::OK, r#"{"diagnosis":"1. Disease Name: Healthy\n"}"#);
        match result {
            AnalysisResult::Success(d) => {
                assert_eq!(d.diagnosis_text, "1. Disease Name: Healthy\n");
                assert_eq!(d.format, DiagnosisFormat::Narrative);
                assert_eq!(d.confidence, None);
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn status_codes_pick_the_failure_kind() {
        let kind = |status: u16, body: &str| match interpret_response(
            StatusCode::from_u16(status).unwrap(),
            body,
        ) {
            AnalysisResult::Failure(f) => f.kind,
            other => panic!("expected failure, got {:?}", other),
        };
        assert_eq!(kind(429, ""), ErrorKind::RateLimited);
        assert_eq!(kind(402, "{}"), ErrorKind::QuotaExhausted);
        assert_eq!(kind(400, r#"{"error":"No image uploaded"}"#), ErrorKind::Upstream);
        assert_eq!(kind(503, "<html>"), ErrorKind::Upstream);
    }

    #[test]
    fn error_field_is_preferred_over_generic_message() {
        assert_eq!(
            interpret_response(StatusCode::BAD_REQUEST, r#"{"error":"No image uploaded"}"#),
            AnalysisResult::failure(ErrorKind::Upstream, "No image uploaded")
        );
        assert_eq!(
            interpret_response(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            AnalysisResult::failure(ErrorKind::Upstream, GENERIC_UPSTREAM_MESSAGE)
        );
    }

    #[test]
    fn malformed_success_is_a_network_failure() {
        assert_eq!(
            interpret_response(StatusCode::OK, "not json"),
            AnalysisResult::failure(ErrorKind::Network, NETWORK_MESSAGE)
        );
        assert_eq!(
            interpret_response(StatusCode::OK, r#"{"label":"x"}"#),
            AnalysisResult::failure(ErrorKind::Network, NETWORK_MESSAGE)
        );
    }
}
