use std::env;

use crate::engine::weights::{DEFAULT_WEIGHTS, ScoringWeights, parse_overrides};
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub event_buffer_size: usize,
    pub scoring_weights: ScoringWeights,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format: parse_log_format(env::var("LOG_FORMAT").ok().as_deref())?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            scoring_weights: parse_scoring_weights(env::var("SCORING_WEIGHTS").ok().as_deref())?,
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}

fn parse_log_format(raw: Option<&str>) -> Result<LogFormat, AppError> {
    match raw.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") | Some("compact") => Ok(LogFormat::Compact),
        Some("json") => Ok(LogFormat::Json),
        Some(other) => Err(AppError::Internal(format!(
            "invalid LOG_FORMAT: {other}, expected compact/json"
        ))),
    }
}

fn parse_scoring_weights(raw: Option<&str>) -> Result<ScoringWeights, AppError> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_WEIGHTS);
    };

    let overrides = parse_overrides(raw)
        .map_err(|err| AppError::Internal(format!("invalid SCORING_WEIGHTS: {err}")))?;
    Ok(DEFAULT_WEIGHTS.merged(&overrides))
}

#[cfg(test)]
mod tests {
    use super::{LogFormat, parse_log_format, parse_scoring_weights};
    use crate::engine::weights::DEFAULT_WEIGHTS;

    #[test]
    fn log_format_defaults_to_compact() {
        assert_eq!(parse_log_format(None).unwrap(), LogFormat::Compact);
        assert_eq!(parse_log_format(Some("JSON")).unwrap(), LogFormat::Json);
        assert!(parse_log_format(Some("xml")).is_err());
    }

    #[test]
    fn scoring_weights_merge_over_defaults() {
        assert_eq!(parse_scoring_weights(None).unwrap(), DEFAULT_WEIGHTS);

        let weights = parse_scoring_weights(Some("recency=0.5")).unwrap();
        assert_eq!(weights.recency, 0.5);
        assert_eq!(weights.rating, DEFAULT_WEIGHTS.rating);

        assert!(parse_scoring_weights(Some("recency=fast")).is_err());
    }
}
