use std::time::Duration;

use gift_common::{helpers::parse_duration, Secret};
use log::*;

pub const DEFAULT_COMMUNITY_URL: &str = "https://steamcommunity.com";
pub const DEFAULT_API_URL: &str = "https://api.steampowered.com";
/// Dota 2
pub const DEFAULT_APP_ID: u32 = 570;
pub const DEFAULT_CONTEXT_ID: u32 = 2;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct SteamConfig {
    pub community_url: String,
    pub api_url: String,
    pub api_key: Secret<String>,
    pub app_id: u32,
    pub context_id: u32,
    pub request_timeout: Duration,
}

impl Default for SteamConfig {
    fn default() -> Self {
        Self {
            community_url: DEFAULT_COMMUNITY_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            api_key: Secret::default(),
            app_id: DEFAULT_APP_ID,
            context_id: DEFAULT_CONTEXT_ID,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl SteamConfig {
    pub fn new_from_env_or_default() -> Self {
        let defaults = Self::default();
        let community_url = std::env::var("GMX_STEAM_COMMUNITY_URL").unwrap_or_else(|_| {
            info!("GMX_STEAM_COMMUNITY_URL not set, using {DEFAULT_COMMUNITY_URL}");
            defaults.community_url.clone()
        });
        let api_url = std::env::var("GMX_STEAM_API_URL").unwrap_or_else(|_| {
            info!("GMX_STEAM_API_URL not set, using {DEFAULT_API_URL}");
            defaults.api_url.clone()
        });
        let api_key = Secret::new(std::env::var("GMX_STEAM_API_KEY").unwrap_or_else(|_| {
            warn!("GMX_STEAM_API_KEY not set. Vanity profile URLs cannot be resolved without it.");
            String::default()
        }));
        let app_id = std::env::var("GMX_STEAM_APP_ID")
            .ok()
            .and_then(|s| {
                s.parse::<u32>()
                    .map_err(|e| warn!("Invalid GMX_STEAM_APP_ID ({s}): {e}. Using {DEFAULT_APP_ID}"))
                    .ok()
            })
            .unwrap_or(DEFAULT_APP_ID);
        let request_timeout = std::env::var("GMX_STEAM_TIMEOUT")
            .ok()
            .and_then(|s| {
                let timeout = parse_duration(&s);
                if timeout.is_none() {
                    warn!("Invalid GMX_STEAM_TIMEOUT ({s}). Using {}s", DEFAULT_REQUEST_TIMEOUT.as_secs());
                }
                timeout
            })
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        Self { community_url, api_url, api_key, app_id, context_id: defaults.context_id, request_timeout }
    }
}
