use crate::services::providers::gemini::GEMINI_API_BASE;
use crate::services::MultipartLimits;
use secrecy::SecretString;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::time::Duration;

/// Uploads above 20 MiB are rejected by default.
const DEFAULT_UPLOAD_MAX_BYTES: u64 = 20 * 1024 * 1024;

/// Base64 inflates an image by about a third, so JSON bodies get headroom
/// over the upload ceiling.
const DEFAULT_JSON_BODY_LIMIT_BYTES: usize = 30 * 1024 * 1024;

const DEFAULT_EDIT_CANDIDATES: &str = "gemini-2.5-flash-image-preview,gemini-2.0-flash-preview-image-generation,gemini-2.0-flash-exp";

const DEFAULT_ALLOWED_MIME_TYPES: &str = "image/png,image/jpeg,image/webp,image/gif";

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub common: core_config::Config,
    pub google: GoogleConfig,
    pub models: ModelConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// Not checked at startup; an empty key fails on the first upstream call.
    pub api_key: SecretString,
    pub api_base: String,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Model for the text-completion endpoint (e.g., gemini-1.5-flash)
    pub text_model: String,
    /// Model for the single-model image edit endpoint
    pub image_edit_model: String,
    /// Priority-ordered models for the multipart image edit endpoint
    pub image_edit_candidates: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub max_bytes: u64,
    /// Empty means any declared type is accepted.
    pub allowed_mime_types: Vec<String>,
    pub json_body_limit_bytes: usize,
}

impl UploadConfig {
    pub fn limits(&self) -> MultipartLimits {
        let limits = MultipartLimits::new(self.max_bytes);
        if self.allowed_mime_types.is_empty() {
            limits
        } else {
            limits.with_allowed_mime_types(&self.allowed_mime_types)
        }
    }
}

impl RelayConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let timeout_secs: u64 = parse_number(
            "GENAI_REQUEST_TIMEOUT_SECS",
            &get_env("GENAI_REQUEST_TIMEOUT_SECS", Some("120"))?,
        )?;

        let config = RelayConfig {
            common: common_config,
            google: GoogleConfig {
                api_key: SecretString::new(env::var("GEMINI_API_KEY").unwrap_or_default()),
                api_base: get_env("GEMINI_API_BASE", Some(GEMINI_API_BASE))?,
                request_timeout: Duration::from_secs(timeout_secs),
            },
            models: ModelConfig {
                text_model: get_env("GENAI_TEXT_MODEL", Some("gemini-1.5-flash"))?,
                image_edit_model: get_env("GENAI_IMAGE_EDIT_MODEL", Some("gemini-1.5-flash"))?,
                image_edit_candidates: split_list(&get_env(
                    "GENAI_IMAGE_EDIT_CANDIDATES",
                    Some(DEFAULT_EDIT_CANDIDATES),
                )?),
            },
            upload: UploadConfig {
                max_bytes: parse_number(
                    "UPLOAD_MAX_BYTES",
                    &get_env(
                        "UPLOAD_MAX_BYTES",
                        Some(&DEFAULT_UPLOAD_MAX_BYTES.to_string()),
                    )?,
                )?,
                allowed_mime_types: split_list(&get_env(
                    "UPLOAD_ALLOWED_MIME_TYPES",
                    Some(DEFAULT_ALLOWED_MIME_TYPES),
                )?),
                json_body_limit_bytes: parse_number(
                    "JSON_BODY_LIMIT_BYTES",
                    &get_env(
                        "JSON_BODY_LIMIT_BYTES",
                        Some(&DEFAULT_JSON_BODY_LIMIT_BYTES.to_string()),
                    )?,
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.models.image_edit_candidates.is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "GENAI_IMAGE_EDIT_CANDIDATES must list at least one model"
            )));
        }
        if self.upload.max_bytes == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "UPLOAD_MAX_BYTES must be positive"
            )));
        }
        if self.google.request_timeout.is_zero() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "GENAI_REQUEST_TIMEOUT_SECS must be positive"
            )));
        }
        Ok(())
    }
}

/// Comma-separated list, blanks dropped, order kept.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, AppError> {
    raw.trim().parse().map_err(|_| {
        AppError::ConfigError(anyhow::anyhow!("{} must be a number, got '{}'", key, raw))
    })
}

fn get_env(key: &str, default: Option<&str>) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => match default {
            Some(def) => Ok(def.to_string()),
            None => Err(AppError::ConfigError(anyhow::anyhow!(
                "{} is required but not set",
                key
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_keeps_order_and_drops_blanks() {
        assert_eq!(
            split_list(" a, b ,,c "),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        assert!(split_list("").is_empty());
    }

    #[test]
    fn parse_number_rejects_garbage() {
        assert_eq!(parse_number::<u64>("X", " 42 ").unwrap(), 42);
        assert!(matches!(
            parse_number::<u64>("X", "lots"),
            Err(AppError::ConfigError(_))
        ));
    }

    #[test]
    fn empty_allowlist_accepts_any_type() {
        let upload = UploadConfig {
            max_bytes: 10,
            allowed_mime_types: vec![],
            json_body_limit_bytes: 10,
        };
        assert!(upload.limits().allows("application/pdf"));

        let upload = UploadConfig {
            allowed_mime_types: vec!["image/png".into()],
            ..upload
        };
        assert!(!upload.limits().allows("application/pdf"));
        assert!(upload.limits().allows("image/png"));
    }
}
