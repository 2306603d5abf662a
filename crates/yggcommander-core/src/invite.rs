//! Invite strings other nodes can use to peer with this one.

use serde::Serialize;

/// What to hand to another operator so they can peer with this node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invite {
    pub address: String,
    pub peering_string: String,
}

impl Invite {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        let address = address.into();
        let peering_string = peering_string(&address, port);
        Self {
            address,
            peering_string,
        }
    }
}

/// `tcp://[<address>]:<port>`; the brackets are required for IPv6 literals.
pub fn peering_string(address: &str, port: u16) -> String {
    let host = address.trim_start_matches('[').trim_end_matches(']');
    format!("tcp://[{host}]:{port}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peering_string() {
        assert_eq!(
            peering_string("200:1234::1", 9001),
            "tcp://[200:1234::1]:9001"
        );
    }

    #[test]
    fn test_peering_string_already_bracketed() {
        assert_eq!(peering_string("[200::1]", 443), "tcp://[200::1]:443");
    }

    #[test]
    fn test_invite() {
        let invite = Invite::new("200:1234::1", 9001);
        assert!(invite.peering_string.contains("tcp://[200:1234::1]:9001"));
    }
}
