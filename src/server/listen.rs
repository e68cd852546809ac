//! Usage: `LISTEN_ADDRESS` parsing for the HTTP bind.
//!
//! Accepted spellings: empty (all interfaces, default port), `host`,
//! `host:port`, `[v6]` and `[v6]:port`. Anything with a scheme or a path is
//! rejected so a copy-pasted URL fails loudly instead of binding nothing.

use std::net::SocketAddr;

use crate::shared::error::AppResult;

pub(crate) const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HOST: &str = "0.0.0.0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BindAddress {
    pub(crate) host: String,
    pub(crate) port: u16,
}

impl BindAddress {
    fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
        }
    }

    /// Loggable form; IPv6 hosts get their brackets back.
    pub(crate) fn display(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

pub(crate) fn parse_listen_address(raw: &str) -> AppResult<BindAddress> {
    let spec = raw.trim();
    if spec.is_empty() {
        return Ok(BindAddress::new(DEFAULT_HOST, DEFAULT_PORT));
    }
    if spec.contains("://") || spec.contains('/') {
        return Err(format!(
            "BAD_REQUEST: LISTEN_ADDRESS {spec:?} looks like a URL; expected host or host:port"
        )
        .into());
    }

    // Complete socket addresses ("10.0.0.2:80", "[::1]:443") parse in one step.
    if let Ok(addr) = spec.parse::<SocketAddr>() {
        return Ok(BindAddress::new(&addr.ip().to_string(), addr.port()));
    }

    // A bracketed IPv6 host with no port.
    if spec.starts_with('[') {
        let inner = spec
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .filter(|h| !h.is_empty())
            .ok_or_else(|| {
                format!("BAD_REQUEST: LISTEN_ADDRESS {spec:?} is not a valid [ipv6] address")
            })?;
        return Ok(BindAddress::new(inner, DEFAULT_PORT));
    }

    // What's left is a named/IPv4 host, optionally with a port. A second
    // colon means someone wrote bare IPv6, which is ambiguous without
    // brackets.
    match spec.rsplit_once(':') {
        None => Ok(BindAddress::new(spec, DEFAULT_PORT)),
        Some((host, _)) if host.contains(':') => Err(format!(
            "BAD_REQUEST: LISTEN_ADDRESS {spec:?} is ambiguous; write IPv6 as [addr]:port"
        )
        .into()),
        Some((host, port)) => {
            if host.is_empty() {
                return Err(
                    format!("BAD_REQUEST: LISTEN_ADDRESS {spec:?} has no host").into()
                );
            }
            let port: u16 = port.trim().parse().map_err(|_| {
                format!("BAD_REQUEST: LISTEN_ADDRESS {spec:?} has an invalid port")
            })?;
            Ok(BindAddress::new(host, port))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_address_binds_all_interfaces_on_the_default_port() {
        for raw in ["", "   "] {
            assert_eq!(
                parse_listen_address(raw).unwrap(),
                BindAddress::new("0.0.0.0", DEFAULT_PORT)
            );
        }
    }

    #[test]
    fn complete_socket_addresses_parse_in_one_step() {
        assert_eq!(
            parse_listen_address("10.0.0.2:80").unwrap(),
            BindAddress::new("10.0.0.2", 80)
        );
        assert_eq!(
            parse_listen_address("[::1]:443").unwrap(),
            BindAddress::new("::1", 443)
        );
    }

    #[test]
    fn bare_host_gets_the_default_port() {
        assert_eq!(
            parse_listen_address("127.0.0.1").unwrap(),
            BindAddress::new("127.0.0.1", DEFAULT_PORT)
        );
        assert_eq!(
            parse_listen_address("[fe80::1]").unwrap(),
            BindAddress::new("fe80::1", DEFAULT_PORT)
        );
    }

    #[test]
    fn named_hosts_take_a_port() {
        assert_eq!(
            parse_listen_address("localhost:3000").unwrap(),
            BindAddress::new("localhost", 3000)
        );
    }

    #[test]
    fn urls_are_rejected_loudly() {
        assert!(parse_listen_address("https://hub.example:8080").is_err());
        assert!(parse_listen_address("hub.example/oauth").is_err());
    }

    #[test]
    fn unbracketed_ipv6_is_ambiguous() {
        assert!(parse_listen_address("fe80::1:8080").is_err());
    }

    #[test]
    fn broken_brackets_and_empty_parts_fail() {
        for raw in ["[::1", "[]", ":8080", "host:notaport", "host:"] {
            assert!(parse_listen_address(raw).is_err(), "accepted {raw:?}");
        }
    }

    #[test]
    fn display_restores_ipv6_brackets() {
        assert_eq!(BindAddress::new("::", 8080).display(), "[::]:8080");
        assert_eq!(BindAddress::new("0.0.0.0", 80).display(), "0.0.0.0:80");
    }
}
