// shared/src/lib.rs

use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid cache configuration: {0}")]
    Config(String),
    #[error("cache connection error: {0}")]
    Connection(String),
    #[error("cache backend unavailable")]
    Unavailable,
    #[error("cache serialization error: {0}")]
    Serialization(String),
    #[error("cache backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Caller-facing time-to-live in whole seconds.
///
/// Non-positive values mean "expire immediately".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TtlSecs(pub i64);

impl TtlSecs {
    pub const DEFAULT: TtlSecs = TtlSecs(3600);

    /// The TTL as a duration, or `None` when the entry should not be kept at all.
    pub fn as_duration(self) -> Option<Duration> {
        if self.0 > 0 {
            Some(Duration::from_secs(self.0 as u64))
        } else {
            None
        }
    }
}

impl Default for TtlSecs {
    fn default() -> Self {
        Self::DEFAULT
    }
}

pub mod config;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_ttl_converts_to_duration() {
        assert_eq!(TtlSecs(5).as_duration(), Some(Duration::from_secs(5)));
        assert_eq!(TtlSecs::default(), TtlSecs(3600));
    }

    #[test]
    fn test_non_positive_ttl_has_no_duration() {
        assert_eq!(TtlSecs(0).as_duration(), None);
        assert_eq!(TtlSecs(-30).as_duration(), None);
    }
}
