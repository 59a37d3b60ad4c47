use anyhow::{Context, Result};

pub const DEFAULT_OPENALEX_BASE_URL: &str = "https://api.openalex.org";
pub const DEFAULT_LLM_BASE_URL: &str = "http://localhost:1234/v1";
pub const DEFAULT_LLM_MODEL: &str = "Qwen/Qwen2-7B-Instruct";
pub const DEFAULT_MIN_YEAR: &str = "2013";

/// New-token budget of each generation call, per protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBudgets {
    /// System-only priming call of the initial-system-message protocol.
    pub priming: u32,
    pub initial: u32,
    pub repeated: u32,
    pub stepwise: u32,
}

impl Default for TokenBudgets {
    fn default() -> Self {
        Self {
            priming: 50,
            initial: 200,
            repeated: 400,
            stepwise: 400,
        }
    }
}

/// Runtime settings, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Settings {
    pub openalex_base_url: String,
    /// Contact address for the OpenAlex polite pool.
    pub openalex_mailto: Option<String>,
    pub llm_base_url: String,
    pub llm_model: String,
    pub llm_api_key: Option<String>,
    pub http_timeout_secs: u64,
    /// Earliest publication year considered by searches.
    pub min_year: String,
    pub budgets: TokenBudgets,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openalex_base_url: DEFAULT_OPENALEX_BASE_URL.to_string(),
            openalex_mailto: None,
            llm_base_url: DEFAULT_LLM_BASE_URL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            llm_api_key: None,
            http_timeout_secs: 120,
            min_year: DEFAULT_MIN_YEAR.to_string(),
            budgets: TokenBudgets::default(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let http_timeout_secs = match dotenv::var("HTTP_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("HTTP_TIMEOUT_SECS is not a number: {}", raw))?,
            Err(_) => defaults.http_timeout_secs,
        };

        Ok(Self {
            openalex_base_url: dotenv::var("OPENALEX_BASE_URL")
                .unwrap_or(defaults.openalex_base_url),
            openalex_mailto: dotenv::var("OPENALEX_MAILTO").ok().filter(|m| !m.is_empty()),
            llm_base_url: dotenv::var("LLM_BASE_URL").unwrap_or(defaults.llm_base_url),
            llm_model: dotenv::var("LLM_MODEL").unwrap_or(defaults.llm_model),
            llm_api_key: dotenv::var("LLM_API_KEY").ok().filter(|k| !k.is_empty()),
            http_timeout_secs,
            min_year: dotenv::var("PICO_MIN_YEAR").unwrap_or(defaults.min_year),
            budgets: defaults.budgets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budgets() {
        let budgets = TokenBudgets::default();
        assert_eq!(budgets.priming, 50);
        assert_eq!(budgets.initial, 200);
        assert_eq!(budgets.repeated, 400);
        assert_eq!(budgets.stepwise, 400);
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.openalex_base_url, "https://api.openalex.org");
        assert_eq!(settings.min_year, "2013");
        assert!(settings.openalex_mailto.is_none());
    }
}
