//! Identity types for interest-sync.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// The server-side identifier of a registered device.
///
/// Issued by the remote service on successful registration; opaque to the
/// client. A fresh registration supersedes the previous id.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(String);

impl DeviceId {
    /// Wrap a server-issued device id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceId({})", self.0)
    }
}

/// A platform registration token (APNs/FCM style), opaque to this crate.
///
/// Tokens are credentials: Debug never prints the value.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token(String);

impl Token {
    /// Wrap a platform-issued registration token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for building registration requests.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token([{} bytes REDACTED])", self.0.len())
    }
}

/// A user identifier associated with a device.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Wrap a user id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

/// Maximum length of an interest name, matching the service-side limit.
pub const MAX_INTEREST_LENGTH: usize = 164;

/// Error returned when an interest name fails validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidInterest {
    /// The name was empty.
    #[error("interest name is empty")]
    Empty,
    /// The name exceeded [`MAX_INTEREST_LENGTH`].
    #[error("interest name is {0} chars, max is {MAX_INTEREST_LENGTH}")]
    TooLong(usize),
    /// The name contained a character outside the allowed set.
    #[error("interest name contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// A named topic a device subscribes to for targeted delivery.
///
/// Names are 1..=164 characters from `[A-Za-z0-9_\-=@,.;]`, the set the
/// remote service accepts.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Interest(String);

impl Interest {
    /// Validate and wrap an interest name.
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidInterest> {
        let name = name.into();
        if name.is_empty() {
            return Err(InvalidInterest::Empty);
        }
        if name.chars().count() > MAX_INTEREST_LENGTH {
            return Err(InvalidInterest::TooLong(name.chars().count()));
        }
        if let Some(bad) = name
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && !"_-=@,.;".contains(*c))
        {
            return Err(InvalidInterest::InvalidCharacter(bad));
        }
        Ok(Self(name))
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Interest {
    type Error = InvalidInterest;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Interest> for String {
    fn from(interest: Interest) -> Self {
        interest.0
    }
}

impl fmt::Display for Interest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Interest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Interest({})", self.0)
    }
}

/// The set of interests a device is subscribed to.
///
/// Ordered so that replay results and request bodies are deterministic.
pub type InterestSet = BTreeSet<Interest>;
