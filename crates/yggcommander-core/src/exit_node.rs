//! Exit-node toggle: advertise (or stop advertising) the IPv6 default route.
//!
//! Enabling always turns tunnel routing on and adds `::/0` to the IPv6
//! destinations. Disabling removes only `::/0` and then leaves routing on
//! exactly when some other route list is still non-empty. Applying the same
//! value twice is the same as applying it once.

use serde::Serialize;

use yggcommander_config::{DaemonConfig, StoreError, TunnelRouting};

/// The IPv6 default route an exit node advertises.
pub const DEFAULT_ROUTE_V6: &str = "::/0";

/// Whether this node currently acts as an exit node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitNodeState {
    Disabled,
    Enabled,
}

impl ExitNodeState {
    /// Enabled iff routing is on and the default route is advertised.
    pub fn of(routing: &TunnelRouting) -> Self {
        let advertises_default = routing
            .ipv6_destinations
            .as_ref()
            .is_some_and(|d| d.iter().any(|r| r == DEFAULT_ROUTE_V6));
        if routing.enable && advertises_default {
            Self::Enabled
        } else {
            Self::Disabled
        }
    }
}

/// Apply the toggle to a routing section.
pub fn toggle_routing(mut routing: TunnelRouting, enabled: bool) -> TunnelRouting {
    if enabled {
        routing.enable = true;
        let destinations = routing.ipv6_destinations.get_or_insert_with(Vec::new);
        if !destinations.iter().any(|r| r == DEFAULT_ROUTE_V6) {
            destinations.push(DEFAULT_ROUTE_V6.to_string());
        }
    } else {
        if let Some(destinations) = routing.ipv6_destinations.as_mut() {
            destinations.retain(|r| r != DEFAULT_ROUTE_V6);
        }
        routing.enable = routing.has_routes();
    }
    routing
}

/// Apply the toggle to a whole daemon config.
pub fn set_enabled(mut config: DaemonConfig, enabled: bool) -> Result<DaemonConfig, StoreError> {
    let routing = toggle_routing(config.tunnel_routing()?, enabled);
    config.set_tunnel_routing(&routing);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn config_from(value: Value) -> DaemonConfig {
        match value {
            Value::Object(doc) => DaemonConfig::from_map(doc),
            other => panic!("not an object: {other}"),
        }
    }

    fn routing_of(config: &DaemonConfig) -> Value {
        config.get("TunnelRouting").cloned().unwrap_or(Value::Null)
    }

    #[test]
    fn test_enable_then_disable_example() {
        let config = config_from(json!({
            "Peers": [],
            "TunnelRouting": {"Enable": false, "IPv6Destinations": []}
        }));

        let enabled = set_enabled(config, true).unwrap();
        assert_eq!(
            routing_of(&enabled),
            json!({"Enable": true, "IPv6Destinations": ["::/0"]})
        );

        let disabled = set_enabled(enabled, false).unwrap();
        assert_eq!(
            routing_of(&disabled),
            json!({"Enable": false, "IPv6Destinations": []})
        );
    }

    #[test]
    fn test_enable_is_idempotent() {
        let config = config_from(json!({
            "TunnelRouting": {"Enable": false, "IPv6Destinations": ["fd00::/8"]}
        }));
        let once = set_enabled(config, true).unwrap();
        let twice = set_enabled(once.clone(), true).unwrap();
        assert_eq!(once, twice);
        assert_eq!(
            routing_of(&twice),
            json!({"Enable": true, "IPv6Destinations": ["fd00::/8", "::/0"]})
        );
    }

    #[test]
    fn test_disable_is_idempotent() {
        let config = config_from(json!({
            "TunnelRouting": {"Enable": true, "IPv6Destinations": ["::/0"]}
        }));
        let once = set_enabled(config, false).unwrap();
        let twice = set_enabled(once.clone(), false).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_disable_keeps_unrelated_routes_enabled() {
        let config = config_from(json!({
            "TunnelRouting": {
                "Enable": false,
                "IPv6Destinations": [],
                "IPv4Destinations": ["10.0.0.0/8"]
            }
        }));
        let result = set_enabled(set_enabled(config, true).unwrap(), false).unwrap();
        let routing = result.tunnel_routing().unwrap();
        assert!(routing.enable);
        assert_eq!(routing.ipv6_destinations, Some(vec![]));
        assert_eq!(ExitNodeState::of(&routing), ExitNodeState::Disabled);
    }

    #[test]
    fn test_disable_clears_enable_when_no_other_routes() {
        let config = config_from(json!({"TunnelRouting": {"Enable": false}}));
        let result = set_enabled(set_enabled(config, true).unwrap(), false).unwrap();
        assert!(!result.tunnel_routing().unwrap().enable);
    }

    #[test]
    fn test_disable_repairs_stale_enable_flag() {
        // edited by hand: on, but nothing routed
        let config = config_from(json!({
            "TunnelRouting": {"Enable": true, "IPv6Sources": []}
        }));
        let result = set_enabled(config, false).unwrap();
        assert_eq!(
            routing_of(&result),
            json!({"Enable": false, "IPv6Sources": []})
        );
    }

    #[test]
    fn test_enable_creates_missing_section() {
        let config = config_from(json!({"Peers": ["tcp://a:1"]}));
        let result = set_enabled(config, true).unwrap();
        assert_eq!(
            routing_of(&result),
            json!({"Enable": true, "IPv6Destinations": ["::/0"]})
        );
        assert_eq!(result.peers(), vec!["tcp://a:1".to_string()]);
    }

    #[test]
    fn test_enable_does_not_duplicate_default_route() {
        let routing = TunnelRouting {
            enable: false,
            ipv6_destinations: Some(vec!["::/0".to_string()]),
            ..Default::default()
        };
        let toggled = toggle_routing(routing, true);
        assert_eq!(toggled.ipv6_destinations, Some(vec!["::/0".to_string()]));
        assert_eq!(ExitNodeState::of(&toggled), ExitNodeState::Enabled);
    }

    #[test]
    fn test_malformed_section_is_an_error() {
        let config = config_from(json!({"TunnelRouting": {"IPv6Destinations": "::/0"}}));
        assert!(set_enabled(config, true).is_err());
    }
}
