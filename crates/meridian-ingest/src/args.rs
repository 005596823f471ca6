use clap::Parser;

#[derive(Debug, Parser)]
pub struct Args {
    /// Base URL of the upstream tracking API.
    #[arg(long, env = "MERIDIAN_API_URL")]
    pub api_url: String,

    /// Account email for the one-shot login at process start.
    #[arg(long, env = "MERIDIAN_API_EMAIL")]
    pub api_email: String,

    /// Account password for the one-shot login at process start.
    #[arg(long, env = "MERIDIAN_API_PASSWORD", hide_env_values = true)]
    pub api_password: String,

    /// Postgres connection string for the persistence sink.
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: String,

    /// Delay between cycles, measured from the end of the previous cycle.
    #[arg(long, env = "MERIDIAN_POLL_INTERVAL_SECS", default_value_t = 60)]
    pub poll_interval_secs: u64,

    /// Per-request timeout for upstream HTTP calls.
    #[arg(long, env = "MERIDIAN_HTTP_TIMEOUT_SECS", default_value_t = 10)]
    pub http_timeout_secs: u64,
}
