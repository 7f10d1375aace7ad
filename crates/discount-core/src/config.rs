//! Discount configuration persisted in the `custom/special-discount-configuration` metafield.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

/// Metafield namespace holding the configuration.
pub const METAFIELD_NAMESPACE: &str = "custom";

/// Metafield key holding the configuration.
pub const METAFIELD_KEY: &str = "special-discount-configuration";

/// Metafield value type the configuration is written with.
pub const METAFIELD_TYPE: &str = "json";

/// Decoded discount configuration.
///
/// Always fully populated: missing keys fall back to zero percentages and
/// empty id lists. A percentage of zero or below means the matching
/// discount class is switched off.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountConfig {
    /// Percentage taken off eligible cart lines.
    #[serde(default, deserialize_with = "lenient_percentage")]
    pub cart_line_percentage: f64,

    /// Percentage taken off the order subtotal.
    #[serde(default, deserialize_with = "lenient_percentage")]
    pub order_percentage: f64,

    /// Percentage taken off the first delivery group.
    #[serde(default, deserialize_with = "lenient_percentage")]
    pub delivery_percentage: f64,

    /// Product ids whose lines receive the cart-line discount.
    #[serde(default, deserialize_with = "lenient_ids")]
    pub product_ids: Vec<String>,

    /// Collection ids chosen in the settings form.
    #[serde(default, deserialize_with = "lenient_ids")]
    pub collection_ids: Vec<String>,

    /// Marks the discount as part of the loyalty programme.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_flag"
    )]
    pub is_loyalty_discount: Option<bool>,
}

impl DiscountConfig {
    /// Decodes a raw metafield value, returning `None` when it is empty or
    /// not a JSON object.
    pub fn decode(raw: &str) -> Option<Self> {
        let value = match serde_json::from_str::<Value>(raw) {
            Ok(value @ Value::Object(_)) => value,
            Ok(other) => {
                debug!(kind = json_kind(&other), "discount configuration is not an object");
                return None;
            }
            Err(error) => {
                debug!(%error, "discount configuration is not valid JSON");
                return None;
            }
        };

        match serde_json::from_value(value) {
            Ok(config) => Some(config),
            Err(error) => {
                debug!(%error, "discount configuration could not be decoded");
                None
            }
        }
    }

    /// Decodes an optional metafield value, falling back to the zero
    /// configuration when it is absent or malformed.
    pub fn from_metafield(raw: Option<&str>) -> Self {
        raw.and_then(Self::decode).unwrap_or_default()
    }

    /// Encodes the configuration as the JSON string stored in the metafield.
    pub fn to_metafield_value(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Cart-line percentage, if the product discount is switched on.
    pub fn cart_line_discount(&self) -> Option<f64> {
        active(self.cart_line_percentage)
    }

    /// Delivery percentage, if the shipping discount is switched on.
    pub fn delivery_discount(&self) -> Option<f64> {
        active(self.delivery_percentage)
    }

    /// Whether lines of `product_id` are eligible for the cart-line discount.
    ///
    /// An empty product list targets nothing.
    pub fn targets_product(&self, product_id: &str) -> bool {
        self.product_ids.iter().any(|id| id == product_id)
    }
}

fn active(percentage: f64) -> Option<f64> {
    (percentage > 0.0).then_some(percentage)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Numbers pass through, numeric strings are parsed, anything else is zero.
fn coerce_percentage(value: &Value) -> f64 {
    let percentage = match value {
        Value::Number(number) => number.as_f64().unwrap_or_default(),
        Value::String(text) => text.trim().parse().unwrap_or_default(),
        _ => 0.0,
    };

    if percentage.is_finite() {
        percentage
    } else {
        0.0
    }
}

fn lenient_percentage<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(|value| coerce_percentage(&value))
}

fn lenient_ids<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let ids = match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(id) => Some(id),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    Ok(ids)
}

fn lenient_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Value::deserialize(deserializer)?.as_bool())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn decodes_every_field() {
        let raw = json!({
            "cartLinePercentage": 10,
            "orderPercentage": 5.5,
            "deliveryPercentage": "15",
            "productIds": ["gid://shopify/Product/1", "gid://shopify/Product/2"],
            "collectionIds": ["gid://shopify/Collection/9"],
            "isLoyaltyDiscount": true,
        })
        .to_string();

        let config = DiscountConfig::from_metafield(Some(&raw));

        assert_eq!(config.cart_line_percentage, 10.0);
        assert_eq!(config.order_percentage, 5.5);
        assert_eq!(config.delivery_percentage, 15.0);
        assert_eq!(
            config.product_ids,
            ["gid://shopify/Product/1", "gid://shopify/Product/2"]
        );
        assert_eq!(config.collection_ids, ["gid://shopify/Collection/9"]);
        assert_eq!(config.is_loyalty_discount, Some(true));
    }

    #[test]
    fn missing_keys_default_to_zero_and_empty() {
        let config = DiscountConfig::from_metafield(Some(r#"{"cartLinePercentage": 20}"#));

        assert_eq!(
            config,
            DiscountConfig {
                cart_line_percentage: 20.0,
                ..DiscountConfig::default()
            }
        );
    }

    #[test]
    fn absent_or_malformed_values_fall_back_to_zero_config() {
        for raw in [None, Some(""), Some("not json"), Some("{\"cartLine"), Some("[10, 5]"), Some("null")] {
            assert_eq!(
                DiscountConfig::from_metafield(raw),
                DiscountConfig::default(),
                "input {raw:?} should decode to the zero configuration"
            );
        }
    }

    #[test]
    fn malformed_values_are_reported_by_decode() {
        assert!(DiscountConfig::decode("").is_none());
        assert!(DiscountConfig::decode("42").is_none());
        assert!(DiscountConfig::decode("{}").is_some());
    }

    #[test]
    fn odd_field_types_are_coerced() {
        let raw = json!({
            "cartLinePercentage": " 12.5 ",
            "orderPercentage": null,
            "deliveryPercentage": "lots",
            "productIds": ["gid://shopify/Product/1", 7, null],
            "collectionIds": "gid://shopify/Collection/9",
            "isLoyaltyDiscount": "yes",
        })
        .to_string();

        let config = DiscountConfig::from_metafield(Some(&raw));

        assert_eq!(config.cart_line_percentage, 12.5);
        assert_eq!(config.order_percentage, 0.0);
        assert_eq!(config.delivery_percentage, 0.0);
        assert_eq!(config.product_ids, ["gid://shopify/Product/1"]);
        assert!(config.collection_ids.is_empty());
        assert_eq!(config.is_loyalty_discount, None);
    }

    #[test]
    fn non_positive_percentages_are_switched_off() {
        let config = DiscountConfig {
            cart_line_percentage: -5.0,
            delivery_percentage: 0.5,
            ..DiscountConfig::default()
        };

        assert_eq!(config.cart_line_discount(), None);
        assert_eq!(config.delivery_discount(), Some(0.5));
        assert_eq!(DiscountConfig::default().delivery_discount(), None);
    }

    #[test]
    fn strings_with_trailing_text_are_not_numbers() {
        let config = DiscountConfig::from_metafield(Some(
            r#"{"cartLinePercentage": "12abc", "deliveryPercentage": "15%"}"#,
        ));

        assert_eq!(config.cart_line_percentage, 0.0);
        assert_eq!(config.delivery_percentage, 0.0);
    }

    #[test]
    fn empty_product_list_targets_nothing() {
        let config = DiscountConfig::default();

        assert!(!config.targets_product("gid://shopify/Product/1"));
        assert!(!config.targets_product(""));
    }

    #[test]
    fn metafield_value_round_trips() -> TestResult {
        let config = DiscountConfig {
            cart_line_percentage: 12.5,
            order_percentage: 3.0,
            delivery_percentage: 100.0,
            product_ids: vec!["gid://shopify/Product/1".to_string()],
            collection_ids: vec!["gid://shopify/Collection/2".to_string()],
            is_loyalty_discount: None,
        };

        let raw = config.to_metafield_value()?;
        let decoded = DiscountConfig::decode(&raw).ok_or("encoded value did not decode")?;

        assert_eq!(decoded, config);
        Ok(())
    }

    #[test]
    fn encodes_the_persisted_key_names() -> TestResult {
        let raw = DiscountConfig::default().to_metafield_value()?;
        let value: Value = serde_json::from_str(&raw)?;

        assert_eq!(
            value,
            json!({
                "cartLinePercentage": 0.0,
                "orderPercentage": 0.0,
                "deliveryPercentage": 0.0,
                "productIds": [],
                "collectionIds": [],
            })
        );
        Ok(())
    }
}
