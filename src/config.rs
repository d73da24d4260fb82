use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::services::dashscope::{
    DashScopeSettings, DEFAULT_BASE_URL, DEFAULT_TEXT_MODEL, DEFAULT_VISION_MODEL,
};
use crate::services::prompts::DEFAULT_LANGUAGE;

pub const API_KEY_VAR: &str = "DASHSCOPE_API_KEY";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    /// Server-wide key used when a request brings none.
    pub api_key: Option<String>,
    pub dashscope: DashScopeSettings,
    pub response_language: String,
    pub static_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub assume_food_when_unflagged: bool,
    /// Keep code blocks inside evaluation reports.
    pub keep_report_code_blocks: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any variable source; missing variables take
    /// their defaults, malformed ones are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str, default: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let timeout_secs: u64 = parse_var(&lookup, "MODEL_TIMEOUT_SECS", 45)?;

        Ok(Self {
            bind_addr: var("BIND_ADDR", "0.0.0.0:8000"),
            api_key: lookup(API_KEY_VAR).filter(|v| !v.trim().is_empty()),
            dashscope: DashScopeSettings {
                base_url: var("DASHSCOPE_BASE_URL", DEFAULT_BASE_URL),
                vision_model: var("DASHSCOPE_VL_MODEL", DEFAULT_VISION_MODEL),
                text_model: var("DASHSCOPE_TEXT_MODEL", DEFAULT_TEXT_MODEL),
                timeout: Duration::from_secs(timeout_secs),
            },
            response_language: var("RESPONSE_LANGUAGE", DEFAULT_LANGUAGE),
            static_dir: PathBuf::from(var("STATIC_DIR", "dist")),
            max_upload_bytes: parse_var(&lookup, "MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            assume_food_when_unflagged: parse_var(&lookup, "ASSUME_FOOD_WHEN_UNFLAGGED", true)?,
            keep_report_code_blocks: parse_var(&lookup, "KEEP_REPORT_CODE_BLOCKS", false)?,
        })
    }
}

fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", name, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:8000");
        assert_eq!(config.api_key, None);
        assert_eq!(config.dashscope.vision_model, "qwen-vl-max");
        assert_eq!(config.dashscope.text_model, "qwen-plus");
        assert_eq!(config.dashscope.timeout, Duration::from_secs(45));
        assert_eq!(config.static_dir, PathBuf::from("dist"));
        assert!(config.assume_food_when_unflagged);
        assert!(!config.keep_report_code_blocks);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            (API_KEY_VAR, "sk-env"),
            ("DASHSCOPE_TEXT_MODEL", "qwen-max"),
            ("MODEL_TIMEOUT_SECS", "20"),
            ("ASSUME_FOOD_WHEN_UNFLAGGED", "false"),
            ("RESPONSE_LANGUAGE", "English"),
            ("KEEP_REPORT_CODE_BLOCKS", "true"),
        ])
        .unwrap();

        assert_eq!(config.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.dashscope.text_model, "qwen-max");
        assert_eq!(config.dashscope.timeout, Duration::from_secs(20));
        assert!(!config.assume_food_when_unflagged);
        assert_eq!(config.response_language, "English");
        assert!(config.keep_report_code_blocks);
    }

    #[test]
    fn test_invalid_flag_names_variable() {
        let err = config_from(&[("KEEP_REPORT_CODE_BLOCKS", "sometimes")]).unwrap_err();
        assert!(err.to_string().contains("KEEP_REPORT_CODE_BLOCKS"));
    }

    #[test]
    fn test_blank_key_is_unset() {
        let config = config_from(&[(API_KEY_VAR, "  ")]).unwrap();
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn test_invalid_number_names_variable() {
        let err = config_from(&[("MODEL_TIMEOUT_SECS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("MODEL_TIMEOUT_SECS"));
    }
}
