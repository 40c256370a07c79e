//! Channel names and method identifiers shared with the host.

use std::fmt::{self, Display, Formatter};

/// Request/response channel carrying the one-shot queries.
pub const METHOD_CHANNEL: &str = "healthlink/health";

/// Event channel carrying push events.
pub const EVENT_CHANNEL: &str = "healthlink/health_stream";

/// Methods understood on [`METHOD_CHANNEL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostMethod {
    /// `checkPermissions`
    CheckPermissions,
    /// `requestPermissions`
    RequestPermissions,
    /// `getTodaySteps`
    GetTodaySteps,
    /// `getLatestHeartRate`
    GetLatestHeartRate,
}

impl HostMethod {
    /// Every supported method.
    pub const ALL: [Self; 4] = [
        Self::CheckPermissions,
        Self::RequestPermissions,
        Self::GetTodaySteps,
        Self::GetLatestHeartRate,
    ];

    /// Resolve a wire name; unknown names yield `None`.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|method| method.as_str() == name)
    }

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CheckPermissions => "checkPermissions",
            Self::RequestPermissions => "requestPermissions",
            Self::GetTodaySteps => "getTodaySteps",
            Self::GetLatestHeartRate => "getLatestHeartRate",
        }
    }
}

impl Display for HostMethod {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_and_unknowns_are_rejected() {
        for method in HostMethod::ALL {
            assert_eq!(HostMethod::parse(method.as_str()), Some(method));
        }
        assert_eq!(HostMethod::parse("getWeeklySteps"), None);
        assert_eq!(HostMethod::parse("checkpermissions"), None);
    }
}
