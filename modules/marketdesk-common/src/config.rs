use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_url: String,

    // OpenAI
    pub openai_api_key: String,
    pub openai_model: String,

    // News providers
    pub alphavantage_api_key: String,
    pub alphavantage_base_url: String,
    pub event_registry_api_key: String,
    pub event_registry_base_url: String,

    // Ingest cadence
    pub alphavantage_interval_secs: u64,
    pub event_registry_interval_secs: u64,

    // Auth
    pub jwt_secret: String,
    pub access_token_expire_minutes: i64,
    pub reset_token_expiry_hours: i64,

    // Mail
    pub sendgrid_api_key: Option<String>,
    pub from_email: String,
    pub sendgrid_verify_template_id: String,
    pub sendgrid_reset_template_id: String,

    // Frontend (links in mails)
    pub frontend_url: String,

    // Web server
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            openai_api_key: required_env("OPENAI_API_KEY"),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            alphavantage_api_key: required_env("ALPHAVANTAGE_API_KEY"),
            alphavantage_base_url: env::var("ALPHAVANTAGE_API_BASE_URL")
                .unwrap_or_else(|_| "https://www.alphavantage.co".to_string()),
            event_registry_api_key: required_env("EVENT_REGISTRY_API_KEY"),
            event_registry_base_url: env::var("EVENT_REGISTRY_API_BASE_URL").unwrap_or_else(|_| {
                "https://eventregistry.org/api/v1/article/getArticles".to_string()
            }),
            alphavantage_interval_secs: env_u64("ALPHAVANTAGE_INTERVAL_SECS", 15 * 60),
            event_registry_interval_secs: env_u64("EVENT_REGISTRY_INTERVAL_SECS", 24 * 3600),
            jwt_secret: required_env("JWT_SECRET"),
            access_token_expire_minutes: env_i64("ACCESS_TOKEN_EXPIRE_MINUTES", 60),
            reset_token_expiry_hours: env_i64("RESET_TOKEN_EXPIRY_HOURS", 1),
            sendgrid_api_key: env::var("SENDGRID_API_KEY").ok().filter(|s| !s.is_empty()),
            from_email: env::var("FROM_EMAIL").unwrap_or_else(|_| "noreply@marketdesk.app".to_string()),
            sendgrid_verify_template_id: env::var("SENDGRID_VERIFY_EMAIL_TEMPLATE_ID")
                .unwrap_or_default(),
            sendgrid_reset_template_id: env::var("SENDGRID_FORGOT_PASSWORD_TEMPLATE_ID")
                .unwrap_or_default(),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .expect("PORT must be a number"),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .filter(|s| !s.is_empty())
                .map(|s| s.trim().to_string())
                .collect(),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_i64(key: &str, default: i64) -> i64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
