use std::{cmp::Ordering, fmt::Display};

use serde::{Deserialize, Serialize};
use sqlx::Type;

use crate::db_types::ConversionError;

/// Outcome of a verification attempt. The discriminants are the persisted codes.
///
/// `NoHit < NameVerified < SenderVerified` is the confidence ladder. `Private` and `Error` mean nothing could be
/// learned, and sort below every ladder step: `Error < Private < NoHit < NameVerified < SenderVerified`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[repr(i32)]
pub enum VerificationStatus {
    /// The inventory was read but holds nothing with the expected name.
    NoHit = 100,
    /// An item with the expected name is present, without matching gift information.
    NameVerified = 200,
    /// The item is present and was gifted by the expected sender.
    SenderVerified = 300,
    /// The inventory is not publicly visible.
    Private = 400,
    /// The inventory could not be fetched or parsed.
    Error = 500,
}

impl VerificationStatus {
    pub fn code(&self) -> i32 {
        *self as i32
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Error => 0,
            Self::Private => 1,
            Self::NoHit => 2,
            Self::NameVerified => 3,
            Self::SenderVerified => 4,
        }
    }

    /// True for statuses that say nothing about the item itself.
    pub fn is_inconclusive(&self) -> bool {
        matches!(self, Self::Private | Self::Error)
    }
}

impl PartialOrd for VerificationStatus {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VerificationStatus {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl TryFrom<i32> for VerificationStatus {
    type Error = ConversionError;

    fn try_from(code: i32) -> Result<Self, ConversionError> {
        match code {
            100 => Ok(VerificationStatus::NoHit),
            200 => Ok(VerificationStatus::NameVerified),
            300 => Ok(VerificationStatus::SenderVerified),
            400 => Ok(VerificationStatus::Private),
            500 => Ok(VerificationStatus::Error),
            _ => Err(ConversionError(format!("Invalid verification status code: {code}"))),
        }
    }
}

impl Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoHit => write!(f, "NoHit"),
            Self::NameVerified => write!(f, "NameVerified"),
            Self::SenderVerified => write!(f, "SenderVerified"),
            Self::Private => write!(f, "Private"),
            Self::Error => write!(f, "Error"),
        }
    }
}
