// trigger.rs - TriggerMatcher: which pages and buttons get gated.
//
// A page is gated when its URL looks like a checkout flow, unless the
// domain was unlocked by an allowed purchase earlier in this process or is
// on the configured ignore list (glob patterns such as "*.bank.example").

use std::collections::HashSet;

use glob::Pattern;
use serde::{Deserialize, Serialize};

use crate::error::HostError;

/// Trigger settings (`[trigger]` in the config file).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriggerConfig {
    /// URL substrings that mark a checkout flow.
    #[serde(default = "default_checkout_patterns")]
    pub checkout_patterns: Vec<String>,

    /// Button labels that start a purchase.
    #[serde(default = "default_purchase_labels")]
    pub purchase_labels: Vec<String>,

    /// Domains never gated. Glob syntax.
    #[serde(default)]
    pub ignore_domains: Vec<String>,

    /// Ask the browser to close the tab when a purchase is blocked.
    #[serde(default)]
    pub close_tab_on_block: bool,
}

fn default_checkout_patterns() -> Vec<String> {
    ["checkout", "cart", "basket", "payment", "order", "buy", "purchase"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_purchase_labels() -> Vec<String> {
    [
        "buy now",
        "add to cart",
        "checkout",
        "place order",
        "complete purchase",
        "proceed to checkout",
        "confirm order",
        "submit order",
        "purchase",
        "buy",
        "add to bag",
        "add to basket",
        "complete order",
        "pay now",
        "place your order",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            checkout_patterns: default_checkout_patterns(),
            purchase_labels: default_purchase_labels(),
            ignore_domains: Vec::new(),
            close_tab_on_block: false,
        }
    }
}

/// Decides whether a page or button should raise the gate.
#[derive(Debug, Clone)]
pub struct TriggerMatcher {
    checkout_patterns: Vec<String>,
    purchase_labels: Vec<String>,
    ignore: Vec<Pattern>,
    unlocked: HashSet<String>,
}

impl TriggerMatcher {
    pub fn new(config: &TriggerConfig) -> Result<Self, HostError> {
        let ignore = config
            .ignore_domains
            .iter()
            .map(|raw| {
                Pattern::new(&raw.to_lowercase()).map_err(|source| HostError::InvalidPattern {
                    pattern: raw.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            checkout_patterns: lowercase_all(&config.checkout_patterns),
            purchase_labels: lowercase_all(&config.purchase_labels),
            ignore,
            unlocked: HashSet::new(),
        })
    }

    /// True if `url` is a checkout page on a domain that is still gated.
    ///
    /// `domain` defaults to the URL's host when not supplied.
    pub fn should_gate(&self, url: &str, domain: Option<&str>) -> bool {
        let domain = domain
            .map(normalize_domain)
            .unwrap_or_else(|| domain_of(url));
        if self.is_exempt(&domain) {
            return false;
        }
        let url = url.to_lowercase();
        self.checkout_patterns.iter().any(|p| url.contains(p.as_str()))
    }

    /// True if a button, link, or input label reads like a purchase action.
    pub fn is_purchase_label(&self, text: &str) -> bool {
        let text = text.trim().to_lowercase();
        !text.is_empty() && self.purchase_labels.iter().any(|l| text.contains(l.as_str()))
    }

    /// Stop gating `domain` for the rest of this process.
    pub fn unlock(&mut self, domain: &str) {
        let domain = normalize_domain(domain);
        if !domain.is_empty() && self.unlocked.insert(domain.clone()) {
            tracing::info!(domain = %domain, "domain unlocked");
        }
    }

    pub fn is_unlocked(&self, domain: &str) -> bool {
        self.unlocked.contains(&normalize_domain(domain))
    }

    fn is_exempt(&self, domain: &str) -> bool {
        self.unlocked.contains(domain) || self.ignore.iter().any(|p| p.matches(domain))
    }
}

/// Host part of a URL, lowercased. Empty if there is none.
pub fn domain_of(url: &str) -> String {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or("");
    let host = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    let host = host.split(':').next().unwrap_or("");
    host.to_lowercase()
}

fn normalize_domain(domain: &str) -> String {
    domain.trim().trim_end_matches('.').to_lowercase()
}

fn lowercase_all(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
