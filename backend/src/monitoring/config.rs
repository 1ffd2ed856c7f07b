use std::env;
use validator::Validate;

#[derive(Debug, Clone, Validate)]
pub struct MonitoringConfig {
    /// Ingestion endpoint. Tracking is disabled when unset.
    pub dsn: Option<String>,
    pub environment: String,
    pub release: String,
    #[validate(range(min = 0.0, max = 1.0))]
    pub traces_sample_rate: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub profiles_sample_rate: f64,
    pub debug: bool,
}

impl MonitoringConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let environment = read("MONITORING_ENVIRONMENT")
            .or_else(|| read("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        // Production traffic is sampled, everything else is traced in full
        let default_rate = if environment == "production" { 0.1 } else { 1.0 };

        let mut config = MonitoringConfig {
            dsn: read("MONITORING_DSN"),
            release: read("MONITORING_RELEASE")
                .unwrap_or_else(|| format!("pubflow-server@{}", env!("CARGO_PKG_VERSION"))),
            traces_sample_rate: parse_rate(
                read("MONITORING_TRACES_SAMPLE_RATE"),
                "MONITORING_TRACES_SAMPLE_RATE",
                default_rate,
            ),
            profiles_sample_rate: parse_rate(
                read("MONITORING_PROFILES_SAMPLE_RATE"),
                "MONITORING_PROFILES_SAMPLE_RATE",
                default_rate,
            ),
            debug: read("MONITORING_DEBUG")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
                .unwrap_or(false),
            environment,
        };

        if let Err(e) = config.validate() {
            tracing::warn!("Invalid monitoring sample rates, clamping: {}", e);
            config.traces_sample_rate = config.traces_sample_rate.clamp(0.0, 1.0);
            config.profiles_sample_rate = config.profiles_sample_rate.clamp(0.0, 1.0);
        }

        config
    }

    pub fn is_enabled(&self) -> bool {
        self.dsn.is_some()
    }
}

fn parse_rate(raw: Option<String>, key: &str, default: f64) -> f64 {
    match raw {
        None => default,
        Some(raw) => match raw.parse::<f64>() {
            Ok(rate) if rate.is_finite() => rate,
            _ => {
                tracing::warn!("{} is not a number ({:?}), using {}", key, raw, default);
                default
            }
        },
    }
}
