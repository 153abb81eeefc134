use config::{Config, File, FileFormat};
use jsonwebtoken::EncodingKey;
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::path::Path;

use crate::config::Settings;
use crate::error::ExtractError;

/// Secret store key holding the language model API key
pub const SECRET_GEMINI_API_KEY: &str = "gemini_api_key";
/// Secret store key holding the Vision credentials document
pub const SECRET_VISION_CREDENTIALS: &str = "vision_credentials_json";
/// Older name for [`SECRET_VISION_CREDENTIALS`], still found in existing deployments
pub const SECRET_SERVICE_ACCOUNT_JSON: &str = "gcp_service_account_json_str";

pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_APPLICATION_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const ENV_VISION_API_KEY: &str = "GOOGLE_API_KEY";

/// Credentials for both remote services, resolved once at startup
#[derive(Clone)]
pub struct Credentials {
    pub gemini_api_key: String,
    pub vision: VisionCredentials,
}

/// How requests to the Vision API are authenticated
#[derive(Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VisionCredentials {
    /// Plain API key passed as `?key=`
    ApiKey { api_key: String },
    /// OAuth user credentials; exchanged for an access token per request
    AuthorizedUser {
        client_id: String,
        client_secret: String,
        refresh_token: String,
    },
    /// Service account key; a signed JWT is exchanged for an access token per request
    ServiceAccount {
        client_email: String,
        private_key: String,
        #[serde(default)]
        private_key_id: Option<String>,
        /// Audience of the signed grant. Defaults to the configured token endpoint.
        #[serde(default)]
        token_uri: Option<String>,
    },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("gemini_api_key", &"<redacted>")
            .field("vision", &self.vision)
            .finish()
    }
}

impl fmt::Debug for VisionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VisionCredentials::ApiKey { .. } => f.write_str("ApiKey(<redacted>)"),
            VisionCredentials::AuthorizedUser { client_id, .. } => f
                .debug_struct("AuthorizedUser")
                .field("client_id", client_id)
                .finish_non_exhaustive(),
            VisionCredentials::ServiceAccount { client_email, .. } => f
                .debug_struct("ServiceAccount")
                .field("client_email", client_email)
                .finish_non_exhaustive(),
        }
    }
}

impl VisionCredentials {
    /// Parse a credentials document
    ///
    /// # Arguments
    /// * `document` - JSON with a `type` of `api_key`, `authorized_user` or `service_account`
    ///
    /// # Returns
    /// The parsed credentials. Extra fields (e.g. `project_id`) are ignored.
    ///
    /// # Errors
    /// Returns `ExtractError::Credentials` if:
    /// - The document is not JSON or has no `type`
    /// - The `type` is unknown or a required field is missing
    /// - A service account `private_key` is not an RSA PEM key
    pub fn from_json(document: &str) -> Result<Self, ExtractError> {
        let value: Value = serde_json::from_str(document)
            .map_err(|e| ExtractError::Credentials(format!("not a JSON document: {}", e)))?;

        if value["type"].as_str().is_none() {
            return Err(ExtractError::Credentials(
                "credentials document has no \"type\" field".to_string(),
            ));
        }

        let credentials: VisionCredentials = serde_json::from_value(value)
            .map_err(|e| ExtractError::Credentials(e.to_string()))?;

        // Fail at startup rather than on the first image
        if let VisionCredentials::ServiceAccount {
            client_email,
            private_key,
            ..
        } = &credentials
        {
            EncodingKey::from_rsa_pem(private_key.as_bytes()).map_err(|e| {
                ExtractError::Credentials(format!(
                    "private_key of {} is not a usable RSA key: {}",
                    client_email, e
                ))
            })?;
        }

        Ok(credentials)
    }

    /// Read a credentials document from disk
    ///
    /// # Errors
    /// Returns `ExtractError::Credentials` if the file cannot be read or parsed
    pub fn from_file(path: &Path) -> Result<Self, ExtractError> {
        let document = std::fs::read_to_string(path).map_err(|e| {
            ExtractError::Credentials(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&document)
    }
}

/// Values found in the secret store file
#[derive(Debug, Default)]
struct SecretStore {
    gemini_api_key: Option<String>,
    vision_credentials_json: Option<String>,
}

impl SecretStore {
    fn load(path: &Path) -> Result<Self, ExtractError> {
        let store = Config::builder()
            .add_source(File::new(&path.to_string_lossy(), FileFormat::Toml).required(false))
            .build()?;

        Ok(SecretStore {
            gemini_api_key: non_blank(store.get_string(SECRET_GEMINI_API_KEY).ok()),
            vision_credentials_json: non_blank(store.get_string(SECRET_VISION_CREDENTIALS).ok())
                .or_else(|| non_blank(store.get_string(SECRET_SERVICE_ACCOUNT_JSON).ok())),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Credentials {
    /// Resolve credentials from the secret store, falling back to the process environment
    ///
    /// The secret store (`settings.secrets_file`) is used only when it holds
    /// both `gemini_api_key` and a Vision credentials document
    /// (`vision_credentials_json`, or `gcp_service_account_json_str`). The
    /// document is then written to `settings.ocr.credentials_artifact` and
    /// read back from there. Otherwise `GEMINI_API_KEY` plus either
    /// `GOOGLE_APPLICATION_CREDENTIALS` or `GOOGLE_API_KEY` are read from the
    /// environment.
    ///
    /// # Arguments
    /// * `settings` - Application settings naming the secret store and artifact paths
    ///
    /// # Returns
    /// Credentials for both remote services
    ///
    /// # Errors
    /// Returns an error if:
    /// - Neither source provides both credentials (`MissingCredentials`)
    /// - The credentials document is unreadable or unusable (`Credentials`)
    /// - The secret store is not valid TOML or the artifact cannot be written
    pub fn resolve(settings: &Settings) -> Result<Self, ExtractError> {
        Self::resolve_with(settings, |key| std::env::var(key).ok())
    }

    /// Same as [`Credentials::resolve`] with a custom environment lookup
    pub fn resolve_with<F>(settings: &Settings, env: F) -> Result<Self, ExtractError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secrets = SecretStore::load(&settings.secrets_file)?;

        if let (Some(gemini_api_key), Some(document)) =
            (secrets.gemini_api_key, secrets.vision_credentials_json)
        {
            let artifact = &settings.ocr.credentials_artifact;
            write_credentials_artifact(artifact, &document)?;
            info!(
                "Loaded credentials from secret store {}",
                settings.secrets_file.display()
            );
            return Ok(Credentials {
                gemini_api_key,
                vision: VisionCredentials::from_file(artifact)?,
            });
        }

        warn!("API secrets not configured for deployment. Relying on environment variables.");
        Self::from_env(env)
    }

    fn from_env<F>(env: F) -> Result<Self, ExtractError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let missing = || {
            ExtractError::MissingCredentials(format!(
                "Please set {} and {} environment variables",
                ENV_GEMINI_API_KEY, ENV_APPLICATION_CREDENTIALS
            ))
        };

        let gemini_api_key = non_blank(env(ENV_GEMINI_API_KEY)).ok_or_else(missing)?;

        let vision = if let Some(path) = non_blank(env(ENV_APPLICATION_CREDENTIALS)) {
            debug!("Reading Vision credentials from {}", path);
            VisionCredentials::from_file(Path::new(&path))?
        } else if let Some(api_key) = non_blank(env(ENV_VISION_API_KEY)) {
            VisionCredentials::ApiKey { api_key }
        } else {
            return Err(missing());
        };

        Ok(Credentials {
            gemini_api_key,
            vision,
        })
    }
}

/// Write a credentials document where the Vision client expects to find it
pub fn write_credentials_artifact(path: &Path, document: &str) -> Result<(), ExtractError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, document)?;
    debug!("Wrote credentials artifact to {}", path.display());
    Ok(())
}

/// RSA key used to sign service account grants in tests
#[cfg(test)]
pub(crate) const TEST_SERVICE_ACCOUNT_KEY: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/testdata/service_account_key.pem"
));

/// A service account document in the layout Google Cloud hands out
#[cfg(test)]
pub(crate) fn service_account_document(token_uri: &str) -> String {
    serde_json::json!({
        "type": "service_account",
        "project_id": "label-reader",
        "private_key_id": "0123abcd",
        "private_key": TEST_SERVICE_ACCOUNT_KEY,
        "client_email": "ocr@label-reader.iam.gserviceaccount.com",
        "client_id": "1234567890",
        "token_uri": token_uri
    })
    .to_string()
}
