//! Usage: AuthId wire formats.
//!
//! V1 `keyId:password` names an encrypted blob-store entry; V2
//! `v2:serviceId:refreshToken` is self-describing and never persisted.

pub(crate) const V2_PREFIX: &str = "v2:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AuthId {
    V1 { key_id: String, password: String },
    V2 { service_id: String, refresh_token: String },
}

impl AuthId {
    pub(crate) fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Some(rest) = raw.strip_prefix(V2_PREFIX) {
            // The refresh token may itself contain colons, so split once.
            let (service_id, refresh_token) = rest.split_once(':')?;
            if service_id.is_empty() || refresh_token.is_empty() {
                return None;
            }
            return Some(AuthId::V2 {
                service_id: service_id.to_string(),
                refresh_token: refresh_token.to_string(),
            });
        }

        let (key_id, password) = raw.split_once(':')?;
        // V1 must be exactly two parts; the password alphabet has no colon.
        if key_id.is_empty() || password.is_empty() || password.contains(':') {
            return None;
        }
        Some(AuthId::V1 {
            key_id: key_id.to_string(),
            password: password.to_string(),
        })
    }

    pub(crate) fn format_v1(key_id: &str, password: &str) -> String {
        format!("{key_id}:{password}")
    }

    pub(crate) fn format_v2(service_id: &str, refresh_token: &str) -> String {
        format!("{V2_PREFIX}{service_id}:{refresh_token}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v1_round_trips() {
        let raw = AuthId::format_v1("00ff00ff", "pa-ss.wo_rd");
        assert_eq!(
            AuthId::parse(&raw),
            Some(AuthId::V1 {
                key_id: "00ff00ff".to_string(),
                password: "pa-ss.wo_rd".to_string(),
            })
        );
    }

    #[test]
    fn v2_round_trips_and_keeps_colons_in_the_token() {
        let raw = AuthId::format_v2("gd", "1//abc:def");
        assert_eq!(
            AuthId::parse(&raw),
            Some(AuthId::V2 {
                service_id: "gd".to_string(),
                refresh_token: "1//abc:def".to_string(),
            })
        );
    }

    #[test]
    fn missing_separator_is_rejected() {
        assert_eq!(AuthId::parse("justonepart"), None);
    }

    #[test]
    fn v1_with_extra_colon_is_rejected() {
        assert_eq!(AuthId::parse("key:pass:extra"), None);
    }

    #[test]
    fn empty_parts_are_rejected() {
        assert_eq!(AuthId::parse(":password"), None);
        assert_eq!(AuthId::parse("key:"), None);
        assert_eq!(AuthId::parse("v2::token"), None);
        assert_eq!(AuthId::parse("v2:gd:"), None);
    }
}
