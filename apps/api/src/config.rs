use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::LlmSettings;

/// Application configuration loaded from environment variables.
/// Every variable has a default; startup fails only on unparsable values.
///
/// The model API key is deliberately absent: users supply it per session.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub llm_api_base: String,
    pub llm_model: String,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
    pub llm_timeout: Duration,
    pub tesseract_path: String,
    pub ocr_timeout: Duration,
    pub max_upload_bytes: usize,
    pub session_ttl: Duration,
    pub accept_image_uploads: bool,
    pub progress_tick: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: env_or("PORT", 8080)?,
            rust_log: env_or("RUST_LOG", "info".to_string())?,
            llm_api_base: env_or("LLM_API_BASE", "https://api.openai.com/v1".to_string())?,
            llm_model: env_or("LLM_MODEL", "gpt-4o-mini".to_string())?,
            llm_temperature: env_or("LLM_TEMPERATURE", 0.7)?,
            llm_max_tokens: env_or("LLM_MAX_TOKENS", 2048)?,
            llm_timeout: Duration::from_secs(env_or("LLM_TIMEOUT_SECS", 120)?),
            tesseract_path: env_or("TESSERACT_PATH", "tesseract".to_string())?,
            ocr_timeout: Duration::from_secs(env_or("OCR_TIMEOUT_SECS", 60)?),
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", 20 * 1024 * 1024)?,
            session_ttl: Duration::from_secs(env_or("SESSION_TTL_SECS", 3600)?),
            accept_image_uploads: env_or("ACCEPT_IMAGE_UPLOADS", true)?,
            progress_tick: Duration::from_millis(env_or("PROGRESS_TICK_MS", 50)?),
        })
    }

    pub fn llm_settings(&self) -> LlmSettings {
        LlmSettings {
            api_base: self.llm_api_base.clone(),
            model: self.llm_model.clone(),
            temperature: self.llm_temperature,
            max_tokens: self.llm_max_tokens,
            timeout: self.llm_timeout,
        }
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => parse_var(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_var<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("Environment variable '{key}' has an invalid value: '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var_trims_whitespace() {
        let port: u16 = parse_var("PORT", " 9090 ").unwrap();
        assert_eq!(port, 9090);
    }

    #[test]
    fn test_parse_var_reports_key_on_failure() {
        let err = parse_var::<u16>("PORT", "eighty").unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_parse_var_bool() {
        assert!(!parse_var::<bool>("ACCEPT_IMAGE_UPLOADS", "false").unwrap());
    }

    #[test]
    fn test_env_or_falls_back_when_unset() {
        let value: u64 = env_or("AQURAID_TEST_SURELY_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }
}
