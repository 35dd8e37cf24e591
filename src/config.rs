//! Configuration for Agora
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

/// Agora - topic lifecycle engine
#[derive(Parser, Debug, Clone)]
#[command(name = "agora")]
#[command(about = "Weekly poll and discussion rotation service")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "agora")]
    pub mongodb_db: String,

    /// Enable development mode (relaxes auth, falls back to the in-memory
    /// store when MongoDB is unreachable)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Shared secret for the scheduled rotation endpoint (required in
    /// production)
    #[arg(long, env = "CRON_SECRET")]
    pub cron_secret: Option<String>,

    /// Shared secret for administrative writes (required in production)
    #[arg(long, env = "ADMIN_SECRET")]
    pub admin_secret: Option<String>,

    /// Seconds between in-process sweep ticks
    #[arg(long, env = "SWEEP_INTERVAL_SECS", default_value = "300")]
    pub sweep_interval_secs: u64,

    /// Days an official topic's window lasts after each reset
    #[arg(long, env = "TOPIC_PERIOD_DAYS", default_value = "7")]
    pub topic_period_days: i64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Window length granted to an official topic on reset.
    pub fn period(&self) -> chrono::Duration {
        chrono::Duration::days(self.topic_period_days)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            if self.cron_secret.as_deref().unwrap_or("").is_empty() {
                return Err("CRON_SECRET is required in production mode".to_string());
            }
            if self.admin_secret.as_deref().unwrap_or("").is_empty() {
                return Err("ADMIN_SECRET is required in production mode".to_string());
            }
        }

        if self.topic_period_days < 1 {
            return Err("TOPIC_PERIOD_DAYS must be at least 1".to_string());
        }
        if self.sweep_interval_secs == 0 {
            return Err("SWEEP_INTERVAL_SECS must be positive".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args::parse_from(["agora"])
    }

    #[test]
    fn production_requires_secrets() {
        let args = base_args();
        assert!(args.validate().is_err());

        let mut with_secrets = base_args();
        with_secrets.cron_secret = Some("cron".into());
        with_secrets.admin_secret = Some("admin".into());
        assert!(with_secrets.validate().is_ok());
    }

    #[test]
    fn dev_mode_skips_secret_checks() {
        let mut args = base_args();
        args.dev_mode = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn period_reflects_configured_days() {
        let mut args = base_args();
        args.topic_period_days = 14;
        assert_eq!(args.period(), chrono::Duration::days(14));
    }
}
