//! Page object domain types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::types::Sref;

/// A single measured resource (e.g. an image or script) within a test run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageObject {
    pub sref: Sref,
    /// PA reports some objects without a URL
    #[serde(default)]
    pub url: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl PageObject {
    /// Network location (`host[:port]`) of the object's URL
    ///
    /// Returns `None` when the URL is missing, cannot be parsed or has no
    /// host.
    pub fn network_location(&self) -> Option<String> {
        let url = Url::parse(self.url.as_deref()?).ok()?;
        let host = url.host_str()?;
        Some(match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(url: &str) -> PageObject {
        PageObject {
            sref: Sref::from("objects/1"),
            url: Some(url.to_string()),
            fields: Map::new(),
        }
    }

    #[test]
    fn test_network_location() {
        assert_eq!(
            object("http://example.com/x").network_location().as_deref(),
            Some("example.com")
        );
        assert_eq!(
            object("https://cdn.example.com:8443/a.js?v=1").network_location().as_deref(),
            Some("cdn.example.com:8443")
        );
    }

    #[test]
    fn test_network_location_drops_default_port() {
        assert_eq!(
            object("https://example.com:443/").network_location().as_deref(),
            Some("example.com")
        );
    }

    #[test]
    fn test_network_location_invalid() {
        assert!(object("").network_location().is_none());
        assert!(object("not a url").network_location().is_none());
        assert!(object("data:image/png;base64,AAAA").network_location().is_none());
    }

    #[test]
    fn test_null_url_deserializes() {
        let object: PageObject =
            serde_json::from_str(r#"{"sref":"objects/1","url":null,"bytes":3}"#).unwrap();
        assert!(object.url.is_none());
        assert!(object.network_location().is_none());
        assert_eq!(object.fields["bytes"], 3);

        let missing: PageObject = serde_json::from_str(r#"{"sref":"objects/2"}"#).unwrap();
        assert!(missing.url.is_none());
    }
}
