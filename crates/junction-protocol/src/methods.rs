use std::fmt;
use std::str::FromStr;

/// The closed method set. Any wire method string outside this set maps to
/// `method-not-found` at the dispatcher, never to a variant here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    GetMetadata,
    Configure,
    TestConnection,
    FetchSensors,
    FetchSelectedSensors,
    StartSession,
    StopSession,
    HealthCheck,
}

impl Method {
    pub const ALL: [Method; 8] = [
        Method::GetMetadata,
        Method::Configure,
        Method::TestConnection,
        Method::FetchSensors,
        Method::FetchSelectedSensors,
        Method::StartSession,
        Method::StopSession,
        Method::HealthCheck,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Method::GetMetadata => "getMetadata",
            Method::Configure => "configure",
            Method::TestConnection => "testConnection",
            Method::FetchSensors => "fetchSensors",
            Method::FetchSelectedSensors => "fetchSelectedSensors",
            Method::StartSession => "startSession",
            Method::StopSession => "stopSession",
            Method::HealthCheck => "healthCheck",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by [`Method::from_str`] for anything outside the closed
/// set. Carries the original string so a caller can build the
/// `"Method not found: <method>"` message without re-threading it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownMethod(pub String);

impl FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "getMetadata" => Ok(Method::GetMetadata),
            "configure" => Ok(Method::Configure),
            "testConnection" => Ok(Method::TestConnection),
            "fetchSensors" => Ok(Method::FetchSensors),
            "fetchSelectedSensors" => Ok(Method::FetchSelectedSensors),
            "startSession" => Ok(Method::StartSession),
            "stopSession" => Ok(Method::StopSession),
            "healthCheck" => Ok(Method::HealthCheck),
            other => Err(UnknownMethod(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_method_name() {
        for method in Method::ALL {
            assert_eq!(method.as_str().parse::<Method>().unwrap(), method);
        }
    }

    #[test]
    fn rejects_unknown_methods() {
        let err = "unknownMethod".parse::<Method>().unwrap_err();
        assert_eq!(err.0, "unknownMethod");
    }
}
