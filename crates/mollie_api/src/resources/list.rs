use std::collections::HashMap;

use serde::Deserialize;

use super::links::Link;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ListLinks {
    #[serde(default)]
    pub next: Option<Link>,
}

/// Collection envelope: resources live under `_embedded.<plural>` where the
/// plural key depends on the resource kind, and `_links.next.href` chains to
/// the next page.
#[derive(Clone, Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::Deserialize<'de>"))]
pub struct ListEnvelope<T> {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(rename = "_embedded", default)]
    pub embedded: HashMap<String, Vec<T>>,
    #[serde(rename = "_links", default)]
    pub links: Option<ListLinks>,
}

impl<T> ListEnvelope<T> {
    /// The single embedded collection, regardless of its plural key.
    pub fn into_items(self) -> Vec<T> {
        self.embedded.into_values().next().unwrap_or_default()
    }

    pub fn next_href(&self) -> Option<&str> {
        self.links
            .as_ref()
            .and_then(|links| links.next.as_ref())
            .map(|link| link.href.as_str())
            .filter(|href| !href.is_empty())
    }
}
