//! Time-ordering errors for trip times.

use std::fmt;

/// Kind of ordering violation found in a trip's times.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// A vehicle departs a stop before it arrives there.
    NegativeDwellTime,
    /// A vehicle arrives at a stop before it left the previous one.
    NegativeHopTime,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NegativeDwellTime => "NEGATIVE_DWELL_TIME",
            ErrorCode::NegativeHopTime => "NEGATIVE_HOP_TIME",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The first ordering violation of a trip, with the offending stop index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[error("{code} at stop index {stop_index}")]
pub struct ValidationError {
    pub code: ErrorCode,
    pub stop_index: usize,
}

impl ValidationError {
    pub fn new(code: ErrorCode, stop_index: usize) -> Self {
        Self { code, stop_index }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let error = ValidationError::new(ErrorCode::NegativeHopTime, 3);
        assert_eq!(error.to_string(), "NEGATIVE_HOP_TIME at stop index 3");
        assert_eq!(ErrorCode::NegativeDwellTime.to_string(), "NEGATIVE_DWELL_TIME");
    }
}
