use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use log::debug;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::TextRecognizer;
use crate::config::OcrSettings;
use crate::credentials::VisionCredentials;
use crate::error::ExtractError;
use crate::http_client;

/// OAuth scope requested for service account grants
const VISION_SCOPE: &str = "https://www.googleapis.com/auth/cloud-vision";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
/// Lifetime of a signed grant, the maximum Google accepts
const GRANT_LIFETIME_SECS: u64 = 3600;

/// Claims of a service account JWT-bearer grant
#[derive(Debug, Serialize)]
struct GrantClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

/// OCR through the Google Cloud Vision `images:annotate` endpoint
pub struct GoogleVisionRecognizer {
    client: Client,
    endpoint: String,
    token_endpoint: String,
    feature: String,
    credentials: VisionCredentials,
}

impl GoogleVisionRecognizer {
    /// Create a Vision client
    ///
    /// # Arguments
    /// * `settings` - Vision endpoint, feature type and OAuth token endpoint
    /// * `credentials` - API key, `authorized_user` or `service_account` credentials
    /// * `timeout` - Optional per-request timeout; `None` keeps the HTTP client default
    ///
    /// # Errors
    /// Returns `ExtractError::Builder` if the HTTP client cannot be constructed
    pub fn new(
        settings: &OcrSettings,
        credentials: VisionCredentials,
        timeout: Option<Duration>,
    ) -> Result<Self, ExtractError> {
        Ok(GoogleVisionRecognizer {
            client: http_client(timeout)?,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            token_endpoint: settings.token_endpoint.clone(),
            feature: settings.feature.clone(),
            credentials,
        })
    }

    /// Attach credentials to an outgoing Vision request
    async fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, ExtractError> {
        match &self.credentials {
            VisionCredentials::ApiKey { api_key } => Ok(request.query(&[("key", api_key)])),
            VisionCredentials::AuthorizedUser {
                client_id,
                client_secret,
                refresh_token,
            } => {
                debug!("Refreshing Vision access token");
                let token = self
                    .exchange_token(&[
                        ("grant_type", "refresh_token"),
                        ("client_id", client_id),
                        ("client_secret", client_secret),
                        ("refresh_token", refresh_token),
                    ])
                    .await?;
                Ok(request.bearer_auth(token))
            }
            VisionCredentials::ServiceAccount {
                client_email,
                private_key,
                private_key_id,
                token_uri,
            } => {
                debug!("Requesting Vision access token for {}", client_email);
                let audience = token_uri.as_deref().unwrap_or(&self.token_endpoint);
                let assertion = sign_grant(
                    client_email,
                    private_key,
                    private_key_id.as_deref(),
                    audience,
                    unix_now()?,
                )?;
                let token = self
                    .exchange_token(&[
                        ("grant_type", JWT_BEARER_GRANT),
                        ("assertion", &assertion),
                    ])
                    .await?;
                Ok(request.bearer_auth(token))
            }
        }
    }

    /// Trade an OAuth grant for a short-lived access token
    async fn exchange_token(&self, form: &[(&str, &str)]) -> Result<String, ExtractError> {
        let response = self
            .client
            .post(&self.token_endpoint)
            .form(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(ExtractError::Ocr(format!(
                "token exchange failed ({}): {}",
                status, error_text
            )));
        }

        let body: Value = response.json().await?;
        body["access_token"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ExtractError::Ocr("token response has no access_token".to_string()))
    }
}

/// Sign an RS256 JWT-bearer grant for a service account
fn sign_grant(
    client_email: &str,
    private_key: &str,
    private_key_id: Option<&str>,
    audience: &str,
    issued_at: u64,
) -> Result<String, ExtractError> {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = private_key_id.map(str::to_string);

    let claims = GrantClaims {
        iss: client_email,
        scope: VISION_SCOPE,
        aud: audience,
        iat: issued_at,
        exp: issued_at + GRANT_LIFETIME_SECS,
    };

    let key = EncodingKey::from_rsa_pem(private_key.as_bytes()).map_err(|e| {
        ExtractError::Credentials(format!("private_key of {} is unusable: {}", client_email, e))
    })?;

    jsonwebtoken::encode(&header, &claims, &key).map_err(|e| {
        ExtractError::Credentials(format!("failed to sign grant for {}: {}", client_email, e))
    })
}

fn unix_now() -> Result<u64, ExtractError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .map_err(|e| ExtractError::Ocr(format!("system clock is before the epoch: {}", e)))
}

#[async_trait]
impl TextRecognizer for GoogleVisionRecognizer {
    fn name(&self) -> &str {
        "google_vision"
    }

    async fn recognize(&self, image: &[u8]) -> Result<Option<String>, ExtractError> {
        let url = format!("{}/v1/images:annotate", self.endpoint);

        let request_body = json!({
            "requests": [{
                "image": {
                    "content": STANDARD.encode(image)
                },
                "features": [{
                    "type": self.feature
                }]
            }]
        });

        debug!(
            "Sending OCR request to Google Vision API ({} image bytes)",
            image.len()
        );

        let request = self
            .client
            .post(&url)
            .header("Accept-Encoding", "identity")
            .json(&request_body);
        let response = self.authorize(request).await?.send().await?;

        // Check for HTTP errors
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(ExtractError::Ocr(format!(
                "Google Vision API error ({}): {}",
                status, error_text
            )));
        }

        let response_body: Value = response.json().await?;
        debug!("Google Vision API response: {:?}", response_body);

        parse_annotation(&response_body)
    }
}

/// Pull the full-page text out of an `images:annotate` response.
///
/// The first text annotation holds the whole detected text; the remaining
/// ones are per-word boxes.
fn parse_annotation(body: &Value) -> Result<Option<String>, ExtractError> {
    let first = &body["responses"][0];

    // Per-image failures come back with HTTP 200
    if let Some(error) = first.get("error") {
        let code = error["code"].as_i64().unwrap_or(0);
        let message = error["message"].as_str().unwrap_or("Unknown error");
        return Err(ExtractError::Ocr(format!(
            "Google Vision API error ({}): {}",
            code, message
        )));
    }

    match first["textAnnotations"][0]["description"].as_str() {
        Some(text) if !text.trim().is_empty() => {
            debug!("Extracted text from image: {} characters", text.len());
            Ok(Some(text.to_string()))
        }
        _ => {
            debug!("No text annotations in Vision response");
            Ok(None)
        }
    }
}
