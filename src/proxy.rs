//! `/analyze-plant`: relays an image to a multimodal chat-completion API with
//! a fixed diagnostic rubric and returns the model's answer untouched.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::{header, HeaderValue, StatusCode},
    response::Json,
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::GatewayConfig;
use crate::error::ProxyError;

/// Room for the JSON envelope and the `data:<mime>;base64,` prefix.
const ENVELOPE_BYTES: usize = 1024;

pub const ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

pub const RUBRIC_PROMPT: &str = "You are an expert plant pathologist specializing in disease diagnosis. Analyze plant images and provide detailed, accurate diagnoses.

For each image, provide:
1. Disease Name (or \"Healthy\" if no disease detected)
2. Confidence Level (High/Medium/Low)
3. Affected Plant Part (leaves, stems, roots, etc.)
4. Disease Symptoms (detailed description of visible signs)
5. Possible Causes (pathogens, environmental factors, nutrient deficiency)
6. Severity Assessment (Mild/Moderate/Severe)
7. Treatment Recommendations (3-5 actionable steps)
8. Prevention Tips (3-5 preventive measures)

Be specific, professional, and helpful. If you cannot clearly identify the disease, state uncertainty and suggest consulting a local agricultural extension office.";

pub const USER_PROMPT: &str =
    "Please analyze this plant image and provide a comprehensive disease diagnosis report.";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub image_base64: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub diagnosis: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Debug, Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Client for the upstream gateway. The credential is injected at start-up
/// and checked on every call.
#[derive(Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    config: GatewayConfig,
}

impl GatewayClient {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn has_credential(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Returns the first completion's content exactly as the model wrote it.
    pub async fn diagnose(&self, image_url: &str) -> Result<String, ProxyError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(ProxyError::MissingCredential)?;

        let payload = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(RUBRIC_PROMPT),
                },
                ChatMessage {
                    role: "user",
                    content: MessageContent::Parts(vec![
                        ContentPart::Text { text: USER_PROMPT },
                        ContentPart::ImageUrl {
                            image_url: ImageUrl { url: image_url },
                        },
                    ]),
                },
            ],
        };

        tracing::info!("📤 Analyzing plant image with {}", self.config.model);

        let response = self
            .http
            .post(&self.config.url)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("AI gateway request failed: {}", e);
                ProxyError::Upstream
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            tracing::error!("failed to read AI gateway response: {}", e);
            ProxyError::Upstream
        })?;

        match status.as_u16() {
            429 => {
                tracing::warn!("AI gateway rate limited the request");
                return Err(ProxyError::RateLimited);
            }
            402 => {
                tracing::warn!("AI gateway credits exhausted");
                return Err(ProxyError::QuotaExhausted);
            }
            _ if !status.is_success() => {
                tracing::error!(
                    "AI gateway error: {} {}",
                    status,
                    truncate(&body, 500)
                );
                return Err(ProxyError::Upstream);
            }
            _ => {}
        }

        let completion: ChatCompletion = serde_json::from_str(&body).map_err(|e| {
            tracing::error!("unexpected AI gateway body ({}): {}", e, truncate(&body, 500));
            ProxyError::Upstream
        })?;

        let diagnosis = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                tracing::error!("AI gateway returned no choices");
                ProxyError::Upstream
            })?;

        tracing::info!("✅ Analysis complete");
        Ok(diagnosis)
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Body cap for `/analyze-plant` such that any upload accepted under
/// `max_upload_bytes` still fits once base64-encoded into a data URI.
pub fn body_limit_for_upload(max_upload_bytes: usize) -> usize {
    max_upload_bytes
        .div_ceil(3)
        .saturating_mul(4)
        .saturating_add(ENVELOPE_BYTES)
}

async fn analyze_plant(
    State(gateway): State<Arc<GatewayClient>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<AnalyzeResponse>, ProxyError> {
    if !gateway.has_credential() {
        tracing::error!("AI_GATEWAY_API_KEY is not configured");
        return Err(ProxyError::MissingCredential);
    }

    let body = body.map_err(|rejection| {
        tracing::warn!("rejected proxy body: {}", rejection.body_text());
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ProxyError::PayloadTooLarge
        } else {
            ProxyError::InvalidPayload
        }
    })?;

    let request: AnalyzeRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!("malformed proxy payload: {}", e);
        ProxyError::InvalidPayload
    })?;
    if request.image_base64.trim().is_empty() {
        tracing::warn!("proxy payload carried an empty imageBase64");
        return Err(ProxyError::InvalidPayload);
    }

    let diagnosis = gateway.diagnose(&request.image_base64).await?;
    Ok(Json(AnalyzeResponse { diagnosis }))
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Router for the proxy. Every response, errors included, carries the
/// cross-origin headers.
pub fn router(gateway: Arc<GatewayClient>, body_limit: usize) -> Router {
    Router::new()
        .route("/analyze-plant", post(analyze_plant).options(preflight))
        .layer(
            ServiceBuilder::new()
                .layer(SetResponseHeaderLayer::overriding(
                    header::ACCESS_CONTROL_ALLOW_ORIGIN,
                    HeaderValue::from_static("*"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::ACCESS_CONTROL_ALLOW_HEADERS,
                    HeaderValue::from_static(ALLOW_HEADERS),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::ACCESS_CONTROL_ALLOW_METHODS,
                    HeaderValue::from_static("POST, OPTIONS"),
                ))
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(gateway)
}
