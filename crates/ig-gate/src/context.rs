// context.rs - PurchaseContext: what the shopper is about to buy.
//
// Everything here is scraped from a live page by the trigger detector, so
// every field is best-effort. Missing fields deserialize to placeholders and
// the helpers below never fail: a garbage context is treated as a generic
// purchase.

use serde::{Deserialize, Serialize};

/// Placeholder product name used when the page yielded nothing.
pub const UNKNOWN_PRODUCT: &str = "Unknown Product";

/// Placeholder price used when the page yielded nothing.
pub const UNKNOWN_PRICE: &str = "Price not found";

/// Category used when neither the page nor the product name says anything.
pub const OTHER_CATEGORY: &str = "Other";

/// Keyword table for category inference, checked in order.
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Electronics",
        &[
            "phone", "laptop", "computer", "tablet", "ipad", "iphone", "macbook", "headphone",
            "airpod", "camera", "tv", "monitor", "speaker", "charger", "console", "watch",
        ],
    ),
    (
        "Clothing",
        &[
            "shirt", "pants", "dress", "shoes", "jacket", "sweater", "jeans", "sneaker", "hoodie",
            "coat",
        ],
    ),
    (
        "Fitness",
        &["gym", "fitness", "yoga", "dumbbell", "weights", "treadmill", "protein", "workout"],
    ),
    (
        "Home",
        &["furniture", "sofa", "chair", "table", "lamp", "kitchen", "bedding", "decor", "rug"],
    ),
    (
        "Health",
        &["vitamin", "supplement", "medicine", "skincare", "toothbrush", "health"],
    ),
    ("Education", &["book", "course", "textbook", "class", "lesson"]),
    (
        "Entertainment",
        &["game", "movie", "music", "concert", "ticket", "subscription", "toy"],
    ),
    ("Food", &["food", "snack", "coffee", "tea", "grocery", "meal"]),
];

/// Product and page information for one purchase attempt.
///
/// Immutable once a gate session starts. All fields are optional on the
/// wire: `{}` is a valid (fully unknown) context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseContext {
    /// Product name as scraped from the page.
    #[serde(default = "default_product_name")]
    pub product_name: String,

    /// Price text as scraped (e.g., "$1,299.99"). Parsed lazily.
    #[serde(default = "default_price")]
    pub price: String,

    /// Category hint from the page, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Full URL of the page that triggered the gate.
    #[serde(default)]
    pub url: String,

    /// Domain of the page (e.g., "www.amazon.com").
    #[serde(default)]
    pub domain: String,
}

fn default_product_name() -> String {
    UNKNOWN_PRODUCT.to_string()
}

fn default_price() -> String {
    UNKNOWN_PRICE.to_string()
}

impl Default for PurchaseContext {
    fn default() -> Self {
        Self {
            product_name: default_product_name(),
            price: default_price(),
            category: None,
            url: String::new(),
            domain: String::new(),
        }
    }
}

impl PurchaseContext {
    /// Create a context for a named product with a price string.
    pub fn new(product_name: impl Into<String>, price: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
            price: price.into(),
            ..Self::default()
        }
    }

    /// Builder-style: set the category hint.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Builder-style: set the source page.
    pub fn with_source(mut self, url: impl Into<String>, domain: impl Into<String>) -> Self {
        self.url = url.into();
        self.domain = domain.into();
        self
    }

    /// Whether the scraped product name is usable in prompts and feedback.
    ///
    /// Placeholders and very short names (5 characters or fewer) do not count.
    pub fn has_known_product(&self) -> bool {
        let name = self.product_name.trim();
        !name.eq_ignore_ascii_case(UNKNOWN_PRODUCT)
            && !name.eq_ignore_ascii_case("this item")
            && name.chars().count() > 5
    }

    /// Product label for human-facing text: the name, or "this item".
    pub fn product_label(&self) -> &str {
        if self.has_known_product() {
            self.product_name.trim()
        } else {
            "this item"
        }
    }

    /// Numeric amount parsed from the price text.
    ///
    /// Takes the first run of digits (with thousands separators and an
    /// optional decimal part). Returns `None` when nothing parses.
    pub fn amount(&self) -> Option<f64> {
        parse_amount(&self.price)
    }

    /// The supplied category, or one inferred from the product name.
    pub fn effective_category(&self) -> String {
        if let Some(category) = self.category.as_deref().map(str::trim) {
            if !category.is_empty() {
                return category.to_string();
            }
        }
        infer_category(&self.product_name).to_string()
    }
}

/// Extract the first numeric amount from a free-form price string.
///
/// `"$1,299.99"` → `1299.99`, `"EUR 45"` → `45.0`, `"free"` → `None`.
pub fn parse_amount(text: &str) -> Option<f64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let mut digits = String::new();
    let mut seen_dot = false;

    for c in text[start..].chars() {
        match c {
            '0'..='9' => digits.push(c),
            ',' if !seen_dot => {}
            '.' if !seen_dot => {
                seen_dot = true;
                digits.push(c);
            }
            _ => break,
        }
    }

    let digits = digits.trim_end_matches('.');
    digits.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Infer a category from a product name by keyword lookup.
pub fn infer_category(product_name: &str) -> &'static str {
    let name = product_name.to_lowercase();
    let words: Vec<&str> = name
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    for &(category, keywords) in CATEGORY_KEYWORDS {
        let hit = keywords.iter().any(|keyword| {
            words
                .iter()
                .any(|word| word == keyword || word.strip_suffix('s') == Some(*keyword))
        });
        if hit {
            return category;
        }
    }
    OTHER_CATEGORY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_placeholders() {
        let ctx: PurchaseContext = serde_json::from_str("{}").unwrap();
        assert_eq!(ctx.product_name, UNKNOWN_PRODUCT);
        assert_eq!(ctx.price, UNKNOWN_PRICE);
        assert!(!ctx.has_known_product());
        assert_eq!(ctx.amount(), None);
        assert_eq!(ctx.effective_category(), OTHER_CATEGORY);
        assert_eq!(ctx.product_label(), "this item");
    }

    #[test]
    fn parse_amount_handles_common_formats() {
        assert_eq!(parse_amount("$1,299.99"), Some(1299.99));
        assert_eq!(parse_amount("EUR 45"), Some(45.0));
        assert_eq!(parse_amount("Now only 19.50!"), Some(19.5));
        assert_eq!(parse_amount("12."), Some(12.0));
        assert_eq!(parse_amount("free shipping"), None);
        assert_eq!(parse_amount(""), None);
    }

    #[test]
    fn short_or_placeholder_names_are_not_known() {
        assert!(!PurchaseContext::new("this item", "$5").has_known_product());
        assert!(!PurchaseContext::new("Mug", "$5").has_known_product());
        assert!(PurchaseContext::new("Apple iPad Air", "$599").has_known_product());
    }

    #[test]
    fn category_inference_uses_keywords() {
        assert_eq!(infer_category("Apple MacBook Pro 14"), "Electronics");
        assert_eq!(infer_category("Nike running shoes"), "Clothing");
        assert_eq!(infer_category("Adjustable dumbbells set"), "Fitness");
        assert_eq!(infer_category("Mystery box"), OTHER_CATEGORY);
    }

    #[test]
    fn supplied_category_wins_over_inference() {
        let ctx = PurchaseContext::new("Apple iPad Air", "$599").with_category("Gifts");
        assert_eq!(ctx.effective_category(), "Gifts");

        let blank = PurchaseContext::new("Apple iPad Air", "$599").with_category("  ");
        assert_eq!(blank.effective_category(), "Electronics");
    }
}
