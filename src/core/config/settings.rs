use super::parsing::{
    env_optional, env_or_default, parse_bool, parse_cors_origins, parse_environment, parse_f64,
    parse_string_list, parse_u16, parse_u64,
};
use super::types::{
    ApiSettings, ConfigError, CorsSettings, DatabaseSettings, GeminiSettings, PredictionSettings,
    RuntimeSettings, ServerHost, ServerPort, ServerSettings, Settings, TelemetrySettings,
};

const DEFAULT_FALLBACK_MODELS: &[&str] = &["gemini-2.0-flash", "gemini-1.5-flash"];

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("PREPCAST_HOST", "0.0.0.0");
        let port = env_or_default("PREPCAST_PORT", "8000");

        let environment =
            parse_environment(env_optional("PREPCAST_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config =
            env_optional("PREPCAST_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false)
                || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "PrepCast API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "prepcastsuperuser");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "prepcast_db");
        let database_url = env_optional("DATABASE_URL");

        let gemini_api_key = env_or_default("GEMINI_API_KEY", "");
        let gemini_base_url = env_or_default(
            "GEMINI_BASE_URL",
            "https://generativelanguage.googleapis.com/v1beta",
        );
        let gemini_model = env_or_default("GEMINI_MODEL", "gemini-2.5-flash");
        let gemini_thinking_model = env_or_default("GEMINI_THINKING_MODEL", "gemini-2.5-pro");
        let gemini_fallback_models =
            parse_string_list(env_optional("GEMINI_FALLBACK_MODELS"), DEFAULT_FALLBACK_MODELS);
        let gemini_request_timeout = parse_u64(
            "GEMINI_REQUEST_TIMEOUT",
            env_or_default("GEMINI_REQUEST_TIMEOUT", "60"),
        )?;
        let gemini_time_budget = parse_u64(
            "GEMINI_TIME_BUDGET_SECONDS",
            env_or_default("GEMINI_TIME_BUDGET_SECONDS", "90"),
        )?;

        let history_limit = parse_u64(
            "PREDICTION_HISTORY_LIMIT",
            env_or_default("PREDICTION_HISTORY_LIMIT", "40"),
        )?;
        let history_max_chars = parse_u64(
            "PREDICTION_HISTORY_MAX_CHARS",
            env_or_default("PREDICTION_HISTORY_MAX_CHARS", "400"),
        )?;
        let freshness_top_k =
            parse_u64("FRESHNESS_TOP_K", env_or_default("FRESHNESS_TOP_K", "15"))?;
        let freshness_half_life_days = parse_f64(
            "FRESHNESS_HALF_LIFE_DAYS",
            env_or_default("FRESHNESS_HALF_LIFE_DAYS", "180"),
        )?;
        let default_question_count = parse_u64(
            "PREDICTION_DEFAULT_QUESTION_COUNT",
            env_or_default("PREDICTION_DEFAULT_QUESTION_COUNT", "10"),
        )?;
        let max_question_count = parse_u64(
            "PREDICTION_MAX_QUESTION_COUNT",
            env_or_default("PREDICTION_MAX_QUESTION_COUNT", "50"),
        )?;

        let log_level = env_or_default("PREPCAST_LOG_LEVEL", "info");
        let json = env_optional("PREPCAST_LOG_JSON")
            .map(|value| parse_bool(&value))
            .unwrap_or(false);
        let prometheus_enabled = env_optional("PROMETHEUS_ENABLED")
            .map(|value| parse_bool(&value))
            .unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
            },
            gemini: GeminiSettings {
                api_key: gemini_api_key,
                base_url: gemini_base_url.trim_end_matches('/').to_string(),
                model: gemini_model,
                thinking_model: gemini_thinking_model,
                fallback_models: gemini_fallback_models,
                request_timeout_seconds: gemini_request_timeout,
                time_budget_seconds: gemini_time_budget,
            },
            prediction: PredictionSettings {
                history_limit,
                history_max_chars,
                freshness_top_k,
                freshness_half_life_days,
                default_question_count,
                max_question_count,
            },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn gemini(&self) -> &GeminiSettings {
        &self.gemini
    }

    pub(crate) fn prediction(&self) -> &PredictionSettings {
        &self.prediction
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.prediction.history_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "PREDICTION_HISTORY_LIMIT",
                value: "0".to_string(),
            });
        }

        if self.prediction.freshness_top_k == 0 {
            return Err(ConfigError::InvalidValue {
                field: "FRESHNESS_TOP_K",
                value: "0".to_string(),
            });
        }

        if !self.prediction.freshness_half_life_days.is_finite()
            || self.prediction.freshness_half_life_days <= 0.0
        {
            return Err(ConfigError::InvalidValue {
                field: "FRESHNESS_HALF_LIFE_DAYS",
                value: self.prediction.freshness_half_life_days.to_string(),
            });
        }

        if self.prediction.default_question_count == 0
            || self.prediction.default_question_count > self.prediction.max_question_count
        {
            return Err(ConfigError::InvalidValue {
                field: "PREDICTION_DEFAULT_QUESTION_COUNT",
                value: self.prediction.default_question_count.to_string(),
            });
        }

        if self.gemini.time_budget_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "GEMINI_TIME_BUDGET_SECONDS",
                value: "0".to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if self.gemini.api_key.is_empty() {
            return Err(ConfigError::MissingSecret("GEMINI_API_KEY"));
        }
        if self.gemini.base_url.is_empty() {
            return Err(ConfigError::MissingSecret("GEMINI_BASE_URL"));
        }

        Ok(())
    }
}
