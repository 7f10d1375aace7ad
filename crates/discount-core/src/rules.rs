//! Pricing rules shared by the discount entrypoints.

/// Discount codes ending with this suffix trigger the loyalty rule.
pub const LOYALTY_CODE_SUFFIX: &str = "20";

/// Message attached to the zero-value discount returning customers receive
/// for a loyalty code.
pub const RETURNING_CUSTOMER_MESSAGE: &str =
    "Code applied, no discount for returning customers, 2x loyalty points";

/// Whether a triggering discount code activates the loyalty rule.
pub fn is_loyalty_code(code: &str) -> bool {
    code.ends_with(LOYALTY_CODE_SUFFIX)
}

/// Whether a buyer has ordered before.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CustomerStanding {
    /// Anonymous buyer, or a customer with no previous orders.
    New,

    /// Customer with at least one previous order.
    Returning,
}

impl CustomerStanding {
    /// Classifies a buyer by their order count. `None` is an anonymous buyer.
    pub fn from_order_count(orders: Option<i64>) -> Self {
        match orders {
            Some(count) if count >= 1 => CustomerStanding::Returning,
            _ => CustomerStanding::New,
        }
    }
}

/// Message for a percentage taken off cart lines, e.g. `10% Off`.
pub fn percent_off_message(percentage: f64) -> String {
    format!("{percentage}% Off")
}

/// Message for a percentage taken off shipping, e.g. `15% off shipping`.
pub fn shipping_message(percentage: f64) -> String {
    format!("{percentage}% off shipping")
}

/// Rounds a percentage to one fractional digit, judged on its exact binary
/// value: `1.45` is stored just below the midpoint and rounds to `1.4`.
///
/// The only exact midpoints are odd multiples of a quarter; those round up.
pub fn round_to_tenth(percentage: f64) -> f64 {
    if (percentage * 4.0).fract() == 0.0 {
        return (percentage * 10.0).round() / 10.0;
    }

    format!("{percentage:.1}").parse().unwrap_or(percentage)
}
