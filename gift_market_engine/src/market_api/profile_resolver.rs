use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ProfileResolutionError(pub String);

/// Turns a user-supplied profile reference (canonical id, vanity name or profile URL) into a canonical profile id.
#[async_trait]
pub trait ProfileResolver: Send + Sync {
    async fn resolve_profile_id(&self, reference: &str) -> Result<String, ProfileResolutionError>;
}

/// Accepts every reference as-is. Useful when callers already hold canonical ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalProfiles;

#[async_trait]
impl ProfileResolver for CanonicalProfiles {
    async fn resolve_profile_id(&self, reference: &str) -> Result<String, ProfileResolutionError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(ProfileResolutionError("Empty profile reference".into()));
        }
        Ok(reference.to_string())
    }
}
