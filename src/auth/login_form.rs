//! Login page scraping
//!
//! The hidden inputs of the provider's login page are not a documented
//! contract. Everything that depends on the markup sits behind
//! [`LoginFormFetcher`].

use crate::error::Result;
use crate::transport::{HttpRequest, Transport};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Source of the hidden login form fields
#[async_trait::async_trait]
pub trait LoginFormFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<BTreeMap<String, String>>;
}

/// Fetches the page over the shared transport and scrapes its markup
pub struct HtmlLoginFormFetcher {
    transport: Arc<dyn Transport>,
}

impl HtmlLoginFormFetcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait::async_trait]
impl LoginFormFetcher for HtmlLoginFormFetcher {
    async fn fetch(&self, url: &str) -> Result<BTreeMap<String, String>> {
        let html = self.transport.execute(&HttpRequest::get(url)).await?;
        Ok(parse_hidden_inputs(&html))
    }
}

/// Name/value pairs of every `<input type="hidden">` in `html`
pub fn parse_hidden_inputs(html: &str) -> BTreeMap<String, String> {
    let lower = html.to_ascii_lowercase();
    let mut fields = BTreeMap::new();
    let mut cursor = 0;

    while let Some(offset) = lower[cursor..].find("<input") {
        let start = cursor + offset + "<input".len();
        let Some(len) = lower[start..].find('>') else {
            break;
        };
        let end = start + len;
        cursor = end;

        let attrs = parse_attributes(&html[start..end]);
        let hidden = attrs
            .get("type")
            .is_some_and(|t| t.eq_ignore_ascii_case("hidden"));
        if !hidden {
            continue;
        }
        if let Some(name) = attrs.get("name").filter(|n| !n.is_empty()) {
            let value = attrs.get("value").cloned().unwrap_or_default();
            fields.insert(name.clone(), value);
        }
    }

    fields
}

fn parse_attributes(tag: &str) -> BTreeMap<String, String> {
    let mut attrs = BTreeMap::new();
    let mut rest = tag.trim_start();

    while !rest.is_empty() {
        let name_len = rest
            .find(|c: char| c == '=' || c.is_whitespace() || c == '/')
            .unwrap_or(rest.len());
        let name = rest[..name_len].to_ascii_lowercase();
        rest = rest[name_len..].trim_start();

        let value = if let Some(after_eq) = rest.strip_prefix('=') {
            let after_eq = after_eq.trim_start();
            match after_eq.chars().next() {
                Some(quote @ ('"' | '\'')) => {
                    let body = &after_eq[1..];
                    let close = body.find(quote).unwrap_or(body.len());
                    rest = body.get(close + 1..).unwrap_or("");
                    body[..close].to_string()
                }
                _ => {
                    let len = after_eq
                        .find(|c: char| c.is_whitespace() || c == '/')
                        .unwrap_or(after_eq.len());
                    rest = &after_eq[len..];
                    after_eq[..len].to_string()
                }
            }
        } else {
            String::new()
        };

        if name.is_empty() {
            // Stray '/' or other separator
            rest = rest.get(1..).unwrap_or("");
        } else {
            attrs.insert(name, value);
        }
        rest = rest.trim_start();
    }

    attrs
}
