use std::sync::OnceLock;

use regex::Regex;

fn plugin_identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z][a-z0-9]*(-[a-z0-9]+)*\.[a-z][a-z0-9]*(-[a-z0-9]+)*$")
            .expect("plugin identifier pattern is a fixed, valid regex")
    })
}

/// Reports whether `collector_name` names a user-contributed plugin
/// (`namespace.name`, lowercase kebab-case on both sides of the dot) as
/// opposed to a native built-in collector. Built-ins carry no `.` and are
/// exempt from the naming rule entirely.
pub fn is_plugin_identifier(collector_name: &str) -> bool {
    collector_name.contains('.')
}

/// Validates a plugin identifier against the full naming rule. Only
/// meaningful for names that `is_plugin_identifier` reports `true` for;
/// native built-ins have no pattern to satisfy.
pub fn validate_plugin_identifier(collector_name: &str) -> Result<(), crate::ProtocolError> {
    if plugin_identifier_pattern().is_match(collector_name) {
        Ok(())
    } else {
        Err(crate::ProtocolError::InvalidIdentifier {
            identifier: collector_name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_builtin_has_no_dot() {
        assert!(!is_plugin_identifier("weather"));
        assert!(!is_plugin_identifier("system-metrics"));
    }

    #[test]
    fn plugin_identifier_has_a_dot() {
        assert!(is_plugin_identifier("acme.weather-station"));
    }

    #[test]
    fn validates_well_formed_plugin_identifiers() {
        assert!(validate_plugin_identifier("acme.weather-station").is_ok());
        assert!(validate_plugin_identifier("a.b").is_ok());
        assert!(validate_plugin_identifier("acme-corp.weather-station-v2").is_ok());
    }

    #[test]
    fn rejects_malformed_plugin_identifiers() {
        assert!(validate_plugin_identifier("Acme.weather").is_err());
        assert!(validate_plugin_identifier("acme..weather").is_err());
        assert!(validate_plugin_identifier("acme.").is_err());
        assert!(validate_plugin_identifier(".weather").is_err());
        assert!(validate_plugin_identifier("acme.weather_station").is_err());
    }
}
