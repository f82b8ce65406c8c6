use std::fmt::Display;

use crate::SteamApiError;

const STEAM_ID_LENGTH: usize = 17;
const STEAM_ID_PREFIX: &str = "7656119";

/// The forms in which users paste a Steam profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileReference {
    /// A canonical 64-bit Steam id.
    SteamId(String),
    /// A custom (vanity) profile name, which must be resolved through the web API.
    Vanity(String),
}

impl Display for ProfileReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SteamId(id) => write!(f, "steam id {id}"),
            Self::Vanity(name) => write!(f, "vanity name {name}"),
        }
    }
}

/// Parses a profile reference. Accepts bare Steam ids, bare vanity names and both flavours of profile URL
/// (`…/profiles/{id}` and `…/id/{vanity}`), with or without scheme and trailing slash.
pub fn parse_profile_reference(input: &str) -> Result<ProfileReference, SteamApiError> {
    let trimmed = input.trim().trim_end_matches('/');
    let invalid = || SteamApiError::InvalidProfileReference(input.to_string());
    if trimmed.is_empty() {
        return Err(invalid());
    }
    let path = trimmed.strip_prefix("https://").or_else(|| trimmed.strip_prefix("http://")).unwrap_or(trimmed);
    let segments = path.split('/').filter(|s| !s.is_empty()).collect::<Vec<&str>>();
    match segments.as_slice() {
        [single] if is_steam_id(single) => Ok(ProfileReference::SteamId(single.to_string())),
        [single] if is_vanity_name(single) => Ok(ProfileReference::Vanity(single.to_string())),
        [.., "profiles", id] if is_steam_id(id) => Ok(ProfileReference::SteamId(id.to_string())),
        [.., "id", name] if is_vanity_name(name) => Ok(ProfileReference::Vanity(name.to_string())),
        _ => Err(invalid()),
    }
}

pub fn is_steam_id(s: &str) -> bool {
    s.len() == STEAM_ID_LENGTH && s.starts_with(STEAM_ID_PREFIX) && s.chars().all(|c| c.is_ascii_digit())
}

fn is_vanity_name(s: &str) -> bool {
    (2..=32).contains(&s.len()) && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Returns the remainder of `s` if it starts with `prefix`, ignoring case.
pub fn extract_prefixed_value<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        s.get(prefix.len()..)
    } else {
        None
    }
}

pub fn has_flag(s: &str, flag: &str) -> bool {
    s.trim().eq_ignore_ascii_case(flag)
}
