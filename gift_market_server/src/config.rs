//! Daemon configuration.
//!
//! Everything is read from `GMX_*` environment variables. Missing or malformed values fall back to a default, and the
//! fallback is logged so that a typo in a `.env` file does not go unnoticed.
use std::{env, fmt::Display, str::FromStr, time::Duration};

use gift_common::helpers::parse_duration;
use gift_market_engine::{
    jobs::{JobConfig, JobKind},
    worker::DEFAULT_SHUTDOWN_TIMEOUT,
    MarketLimits,
    StatusPolicy,
};
use log::*;
use steam_tools::SteamConfig;

const DEFAULT_PAGE_SIZE: i64 = 10;
const DEFAULT_PACING: Duration = Duration::from_millis(250);
const DEFAULT_EVENT_BUFFER_SIZE: usize = 25;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub limits: MarketLimits,
    pub status_policy: StatusPolicy,
    /// Orders fetched per page by each verification job.
    pub page_size: i64,
    /// Pause between two inventory fetches within a job run.
    pub pacing: Duration,
    pub inventory_check_interval: Duration,
    pub inventory_recheck_interval: Duration,
    pub delivery_check_interval: Duration,
    pub giftwrapped_check_interval: Duration,
    /// How long a Ctrl-C waits for running jobs before abandoning them.
    pub shutdown_timeout: Duration,
    pub event_buffer_size: usize,
    pub steam: SteamConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_url: String::default(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            limits: MarketLimits::default(),
            status_policy: StatusPolicy::default(),
            page_size: DEFAULT_PAGE_SIZE,
            pacing: DEFAULT_PACING,
            inventory_check_interval: JobKind::InventoryCheck.default_interval(),
            inventory_recheck_interval: JobKind::InventoryRecheck.default_interval(),
            delivery_check_interval: JobKind::DeliveryCheck.default_interval(),
            giftwrapped_check_interval: JobKind::GiftWrappedCheck.default_interval(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
            steam: SteamConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env_or_default() -> Self {
        let mut config = Self::from_lookup(|name| env::var(name).ok());
        config.steam = SteamConfig::new_from_env_or_default();
        config
    }

    /// Builds the configuration from any key-value source. Steam settings are left at their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where F: Fn(&str) -> Option<String> {
        let defaults = Self::default();
        let database_url = lookup("GMX_DATABASE_URL").unwrap_or_else(|| {
            error!("🪛️ GMX_DATABASE_URL is not set. Please set it to the URL for the gift market database.");
            String::default()
        });
        let limits = MarketLimits {
            base_ask_limit: parsed(&lookup, "GMX_BASE_ASK_LIMIT", defaults.limits.base_ask_limit),
            premium_ask_limit: parsed(&lookup, "GMX_PREMIUM_ASK_LIMIT", defaults.limits.premium_ask_limit),
        };
        if limits.premium_ask_limit < limits.base_ask_limit {
            warn!(
                "🪛️ The premium ask limit ({}) is lower than the base limit ({}). Refresher Orb holders will be worse \
                 off than everyone else.",
                limits.premium_ask_limit, limits.base_ask_limit
            );
        }
        let status_policy = parsed(&lookup, "GMX_STATUS_POLICY", defaults.status_policy);
        let page_size = parsed(&lookup, "GMX_JOB_PAGE_SIZE", defaults.page_size).max(1);
        let pacing = Duration::from_millis(parsed(&lookup, "GMX_JOB_PACING_MS", DEFAULT_PACING.as_millis() as u64));
        let inventory_check_interval =
            duration(&lookup, "GMX_INVENTORY_CHECK_INTERVAL", defaults.inventory_check_interval);
        let inventory_recheck_interval =
            duration(&lookup, "GMX_INVENTORY_RECHECK_INTERVAL", defaults.inventory_recheck_interval);
        let delivery_check_interval =
            duration(&lookup, "GMX_DELIVERY_CHECK_INTERVAL", defaults.delivery_check_interval);
        let giftwrapped_check_interval =
            duration(&lookup, "GMX_GIFTWRAPPED_CHECK_INTERVAL", defaults.giftwrapped_check_interval);
        let shutdown_timeout = duration(&lookup, "GMX_SHUTDOWN_TIMEOUT", defaults.shutdown_timeout);
        let event_buffer_size = parsed(&lookup, "GMX_EVENT_BUFFER_SIZE", defaults.event_buffer_size).max(1);
        Self {
            database_url,
            limits,
            status_policy,
            page_size,
            pacing,
            inventory_check_interval,
            inventory_recheck_interval,
            delivery_check_interval,
            giftwrapped_check_interval,
            shutdown_timeout,
            event_buffer_size,
            ..defaults
        }
    }

    pub fn interval_for(&self, kind: JobKind) -> Duration {
        match kind {
            JobKind::InventoryCheck => self.inventory_check_interval,
            JobKind::InventoryRecheck => self.inventory_recheck_interval,
            JobKind::DeliveryCheck => self.delivery_check_interval,
            JobKind::GiftWrappedCheck => self.giftwrapped_check_interval,
        }
    }

    pub fn job_config(&self, kind: JobKind) -> JobConfig {
        JobConfig::for_kind(kind)
            .with_interval(self.interval_for(kind))
            .with_page_size(self.page_size)
            .with_pacing(self.pacing)
    }
}

fn parsed<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(name) {
        None => {
            debug!("🪛️ {name} is not set. Using the default value of {default}.");
            default
        },
        Some(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            warn!("🪛️ Invalid configuration value for {name} ({s}). {e} Using the default, {default}, instead.");
            default
        }),
    }
}

fn duration<F>(lookup: &F, name: &str, default: Duration) -> Duration
where F: Fn(&str) -> Option<String> {
    match lookup(name) {
        None => {
            debug!("🪛️ {name} is not set. Using the default value of {}s.", default.as_secs());
            default
        },
        Some(s) => parse_duration(&s).unwrap_or_else(|| {
            warn!("🪛️ Invalid duration for {name} ({s}). Using the default, {}s, instead.", default.as_secs());
            default
        }),
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> ServerConfig {
        let vars = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect::<HashMap<_, _>>();
        ServerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = config_from(&[]);
        assert!(config.database_url.is_empty());
        assert_eq!(config.limits, MarketLimits::default());
        assert_eq!(config.status_policy, StatusPolicy::UpgradeOnly);
        assert_eq!(config.page_size, 10);
        assert_eq!(config.pacing, Duration::from_millis(250));
        assert_eq!(config.inventory_check_interval, Duration::from_secs(3600));
        assert_eq!(config.inventory_recheck_interval, Duration::from_secs(12 * 3600));
        assert_eq!(config.delivery_check_interval, Duration::from_secs(3600));
        assert_eq!(config.giftwrapped_check_interval, Duration::from_secs(3600));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(30));
        assert_eq!(config.event_buffer_size, 25);
    }

    #[test]
    fn values_are_read_from_the_environment() {
        let config = config_from(&[
            ("GMX_DATABASE_URL", "sqlite://market.db"),
            ("GMX_BASE_ASK_LIMIT", "3"),
            ("GMX_PREMIUM_ASK_LIMIT", "12"),
            ("GMX_STATUS_POLICY", "freshest_wins"),
            ("GMX_JOB_PAGE_SIZE", "50"),
            ("GMX_JOB_PACING_MS", "0"),
            ("GMX_INVENTORY_CHECK_INTERVAL", "15m"),
            ("GMX_INVENTORY_RECHECK_INTERVAL", "1d"),
            ("GMX_DELIVERY_CHECK_INTERVAL", "90"),
            ("GMX_GIFTWRAPPED_CHECK_INTERVAL", "6h"),
            ("GMX_SHUTDOWN_TIMEOUT", "5s"),
        ]);
        assert_eq!(config.database_url, "sqlite://market.db");
        assert_eq!(config.limits, MarketLimits { base_ask_limit: 3, premium_ask_limit: 12 });
        assert_eq!(config.status_policy, StatusPolicy::FreshestWins);
        assert_eq!(config.page_size, 50);
        assert!(config.pacing.is_zero());
        assert_eq!(config.inventory_check_interval, Duration::from_secs(900));
        assert_eq!(config.inventory_recheck_interval, Duration::from_secs(86_400));
        assert_eq!(config.delivery_check_interval, Duration::from_secs(90));
        assert_eq!(config.giftwrapped_check_interval, Duration::from_secs(6 * 3600));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
    }

    #[test]
    fn malformed_values_fall_back_to_defaults() {
        let config = config_from(&[
            ("GMX_BASE_ASK_LIMIT", "five"),
            ("GMX_STATUS_POLICY", "whatever"),
            ("GMX_JOB_PAGE_SIZE", "0"),
            ("GMX_INVENTORY_CHECK_INTERVAL", "soon"),
            ("GMX_EVENT_BUFFER_SIZE", "-3"),
        ]);
        assert_eq!(config.limits.base_ask_limit, 5);
        assert_eq!(config.status_policy, StatusPolicy::UpgradeOnly);
        assert_eq!(config.page_size, 1);
        assert_eq!(config.inventory_check_interval, Duration::from_secs(3600));
        assert_eq!(config.event_buffer_size, 25);
    }

    #[test]
    fn job_configs_follow_the_settings() {
        let config = config_from(&[("GMX_JOB_PAGE_SIZE", "20"), ("GMX_DELIVERY_CHECK_INTERVAL", "2h")]);
        let job = config.job_config(JobKind::DeliveryCheck);
        assert_eq!(job.page_size, 20);
        assert_eq!(job.interval, Duration::from_secs(7200));
        assert_eq!(job.pacing, Duration::from_millis(250));
        assert_eq!(job.retry_ceiling, 10);
        assert_eq!(config.job_config(JobKind::InventoryRecheck).interval, Duration::from_secs(12 * 3600));
    }
}
