//! Log subscriber setup

use dirlink_core::config::DirlinkConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Directive added when `ldap.debug` is set
const LDAP_DEBUG_DIRECTIVE: &str = "dirlink_auth=debug";

/// Filter directives for `config`, with `level` overriding the configured
/// level when given
pub fn filter_directives(config: &DirlinkConfig, level: Option<&str>) -> String {
    let mut directives = level.unwrap_or(config.logging.level.as_str()).to_string();

    if config.ldap_settings().map(|l| l.debug).unwrap_or(false) {
        directives.push(',');
        directives.push_str(LDAP_DEBUG_DIRECTIVE);
    }

    directives
}

/// Install the global subscriber. `RUST_LOG` wins over everything else.
pub fn init(config: &DirlinkConfig, level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(config, level)));

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format == "json" {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirlink_core::config::LdapSettings;

    #[test]
    fn test_configured_level() {
        let config = DirlinkConfig::default();
        assert_eq!(filter_directives(&config, None), "info");
        assert_eq!(filter_directives(&config, Some("warn")), "warn");
    }

    #[test]
    fn test_ldap_debug_adds_directive() {
        let config = DirlinkConfig {
            ldap: Some(LdapSettings {
                debug: true,
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(filter_directives(&config, None), "info,dirlink_auth=debug");
    }

    #[test]
    fn test_disabled_ldap_debug_is_ignored() {
        let config = DirlinkConfig {
            ldap: Some(LdapSettings {
                enabled: false,
                debug: true,
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(filter_directives(&config, None), "info");
    }
}
