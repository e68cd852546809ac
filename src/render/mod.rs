//! Usage: HTML page rendering behind a typed trait.
//!
//! Handlers depend on `PageRenderer` only; the handlebars implementation
//! compiles the embedded templates once at startup (strict mode, so a
//! template referring to a missing field fails fast).

use handlebars::Handlebars;
use serde::Serialize;

use crate::shared::error::AppResult;

#[derive(Debug, Clone, Serialize)]
pub struct IndexServiceRow {
    pub id: String,
    pub name: String,
    /// Pre-built login or cli-token link for this row.
    pub link: String,
    pub brand_image: String,
    pub service_link: String,
    pub notes: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexPage {
    pub app_name: String,
    pub display_name: String,
    pub redir: String,
    pub services: Vec<IndexServiceRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdditionalItem {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoggedInPage {
    pub app_name: String,
    pub service_name: String,
    pub auth_id: String,
    pub error_message: Option<String>,
    pub deauth_link: Option<String>,
    pub additional_data: Vec<AdditionalItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CliTokenPage {
    pub app_name: String,
    pub service_id: String,
    pub service_name: String,
    pub fetch_token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RevokePage {
    pub app_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RevokeResultPage {
    pub app_name: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrivacyPage {
    pub app_name: String,
}

pub trait PageRenderer: Send + Sync {
    fn index(&self, page: &IndexPage) -> AppResult<String>;
    fn logged_in(&self, page: &LoggedInPage) -> AppResult<String>;
    fn cli_token(&self, page: &CliTokenPage) -> AppResult<String>;
    fn revoke(&self, page: &RevokePage) -> AppResult<String>;
    fn revoked(&self, page: &RevokeResultPage) -> AppResult<String>;
    fn privacy_policy(&self, page: &PrivacyPage) -> AppResult<String>;
}

pub struct HandlebarsRenderer {
    registry: Handlebars<'static>,
}

const TEMPLATES: [(&str, &str); 6] = [
    ("index", include_str!("../../templates/index.hbs")),
    ("logged-in", include_str!("../../templates/logged-in.hbs")),
    ("cli-token", include_str!("../../templates/cli-token.hbs")),
    ("revoke", include_str!("../../templates/revoke.hbs")),
    ("revoked", include_str!("../../templates/revoked.hbs")),
    (
        "privacy-policy",
        include_str!("../../templates/privacy-policy.hbs"),
    ),
];

impl HandlebarsRenderer {
    pub fn new() -> AppResult<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        for (name, template) in TEMPLATES {
            registry
                .register_template_string(name, template)
                .map_err(|e| format!("INTERNAL_ERROR: template {name} invalid: {e}"))?;
        }
        Ok(Self { registry })
    }

    fn render<T: Serialize>(&self, name: &str, data: &T) -> AppResult<String> {
        self.registry
            .render(name, data)
            .map_err(|e| format!("INTERNAL_ERROR: template {name} render failed: {e}").into())
    }
}

impl PageRenderer for HandlebarsRenderer {
    fn index(&self, page: &IndexPage) -> AppResult<String> {
        self.render("index", page)
    }

    fn logged_in(&self, page: &LoggedInPage) -> AppResult<String> {
        self.render("logged-in", page)
    }

    fn cli_token(&self, page: &CliTokenPage) -> AppResult<String> {
        self.render("cli-token", page)
    }

    fn revoke(&self, page: &RevokePage) -> AppResult<String> {
        self.render("revoke", page)
    }

    fn revoked(&self, page: &RevokeResultPage) -> AppResult<String> {
        self.render("revoked", page)
    }

    fn privacy_policy(&self, page: &PrivacyPage) -> AppResult<String> {
        self.render("privacy-policy", page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> HandlebarsRenderer {
        HandlebarsRenderer::new().expect("templates compile")
    }

    #[test]
    fn index_lists_services_with_links() {
        let html = renderer()
            .index(&IndexPage {
                app_name: "Hub".to_string(),
                display_name: "Hub".to_string(),
                redir: String::new(),
                services: vec![IndexServiceRow {
                    id: "gd".to_string(),
                    name: "Google Drive".to_string(),
                    link: "/login?id=gd".to_string(),
                    brand_image: String::new(),
                    service_link: "https://drive.google.com".to_string(),
                    notes: String::new(),
                }],
            })
            .expect("render");
        assert!(html.contains("Google Drive"));
        assert!(html.contains("/login?id=gd"));
    }

    #[test]
    fn logged_in_shows_the_authid() {
        let html = renderer()
            .logged_in(&LoggedInPage {
                app_name: "Hub".to_string(),
                service_name: "Google Drive".to_string(),
                auth_id: "key:password".to_string(),
                error_message: None,
                deauth_link: None,
                additional_data: vec![AdditionalItem {
                    name: "hostname".to_string(),
                    value: "eapi.pcloud.com".to_string(),
                }],
            })
            .expect("render");
        assert!(html.contains("key:password"));
        assert!(html.contains("eapi.pcloud.com"));
    }

    #[test]
    fn logged_in_error_path_shows_deauth_link_instead() {
        let html = renderer()
            .logged_in(&LoggedInPage {
                app_name: "Hub".to_string(),
                service_name: "Google Drive".to_string(),
                auth_id: String::new(),
                error_message: Some("Server error, you must de-authorize Hub".to_string()),
                deauth_link: Some("https://example.com/deauth".to_string()),
                additional_data: vec![],
            })
            .expect("render");
        assert!(html.contains("de-authorize"));
        assert!(html.contains("https://example.com/deauth"));
    }

    #[test]
    fn revoked_message_is_html_escaped() {
        let html = renderer()
            .revoked(&RevokeResultPage {
                app_name: "Hub".to_string(),
                message: "<script>".to_string(),
            })
            .expect("render");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn cli_token_form_carries_the_fetch_token() {
        let html = renderer()
            .cli_token(&CliTokenPage {
                app_name: "Hub".to_string(),
                service_id: "jottacloud".to_string(),
                service_name: "Jottacloud".to_string(),
                fetch_token: "abcdefghij".to_string(),
            })
            .expect("render");
        assert!(html.contains("jottacloud"));
        assert!(html.contains("abcdefghij"));
    }

    #[test]
    fn privacy_policy_renders() {
        let html = renderer()
            .privacy_policy(&PrivacyPage {
                app_name: "Hub".to_string(),
            })
            .expect("render");
        assert!(html.contains("privacy"));
    }
}
