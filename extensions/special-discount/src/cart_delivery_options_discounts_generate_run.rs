use discount_core::rules;
use discount_core::DiscountConfig;
use shopify_function::prelude::*;
use shopify_function::Result;

use crate::schema;

// Only the first delivery group is discounted.
#[shopify_function]
fn cart_delivery_options_discounts_generate_run(
    input: schema::cart_delivery_options_discounts_generate_run::Input,
) -> Result<schema::FunctionRunResult> {
    let Some(delivery_group) = input.cart().delivery_groups().first() else {
        return Ok(no_discounts());
    };

    let discount = input.discount();
    let Some(config) = discount
        .metafield()
        .and_then(|metafield| DiscountConfig::decode(metafield.value()))
    else {
        return Ok(no_discounts());
    };

    let has_shipping_class = discount
        .discount_classes()
        .contains(&schema::DiscountClass::Shipping);
    let Some(percentage) = config.delivery_discount().filter(|_| has_shipping_class) else {
        return Ok(no_discounts());
    };

    Ok(schema::FunctionRunResult {
        discount_application_strategy: schema::DiscountApplicationStrategy::First,
        discounts: vec![schema::DeliveryDiscount {
            message: Some(rules::shipping_message(percentage)),
            targets: vec![schema::DeliveryTarget::DeliveryGroup(
                schema::DeliveryGroupTarget {
                    id: delivery_group.id().to_string(),
                },
            )],
            value: schema::DeliveryValue::Percentage(schema::Percentage {
                value: Decimal(percentage),
            }),
        }],
    })
}

fn no_discounts() -> schema::FunctionRunResult {
    schema::FunctionRunResult {
        discount_application_strategy: schema::DiscountApplicationStrategy::First,
        discounts: vec![],
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use shopify_function::run_function_with_input;
    use shopify_function::wasm_api::{self, Serialize};

    use super::*;

    fn input(groups: &[&str], classes: &[&str], metafield: Option<&str>) -> String {
        let delivery_groups: Vec<Value> = groups.iter().map(|id| json!({ "id": id })).collect();

        json!({
            "cart": { "deliveryGroups": delivery_groups },
            "discount": {
                "discountClasses": classes,
                "metafield": metafield.map(|value| json!({ "value": value })),
            },
        })
        .to_string()
    }

    fn run(input: &str) -> Result<schema::FunctionRunResult> {
        run_function_with_input(cart_delivery_options_discounts_generate_run, input)
    }

    /// The result as the host receives it, decimals written as strings.
    fn wire_output(result: &impl Serialize) -> Result<Value> {
        let mut context = wasm_api::Context::new_with_input(json!({}));
        result.serialize(&mut context)?;
        Ok(context.finalize_output_and_return()?)
    }

    const FIFTEEN_PERCENT: &str = r#"{"deliveryPercentage": 15}"#;

    #[test]
    fn discounts_the_first_delivery_group() -> Result<()> {
        let result = run(&input(
            &["gid://shopify/CartDeliveryGroup/0", "gid://shopify/CartDeliveryGroup/1"],
            &["SHIPPING"],
            Some(FIFTEEN_PERCENT),
        ))?;

        let expected = schema::FunctionRunResult {
            discount_application_strategy: schema::DiscountApplicationStrategy::First,
            discounts: vec![schema::DeliveryDiscount {
                message: Some("15% off shipping".to_string()),
                targets: vec![schema::DeliveryTarget::DeliveryGroup(
                    schema::DeliveryGroupTarget {
                        id: "gid://shopify/CartDeliveryGroup/0".to_string(),
                    },
                )],
                value: schema::DeliveryValue::Percentage(schema::Percentage {
                    value: Decimal(15.0),
                }),
            }],
        };

        assert_eq!(result, expected);
        Ok(())
    }

    #[test]
    fn sends_the_configured_percentage_as_a_decimal_string() -> Result<()> {
        let result = run(&input(
            &["gid://shopify/CartDeliveryGroup/0"],
            &["SHIPPING"],
            Some(FIFTEEN_PERCENT),
        ))?;

        assert_eq!(
            wire_output(&result)?,
            json!({
                "discountApplicationStrategy": "FIRST",
                "discounts": [{
                    "message": "15% off shipping",
                    "targets": [{ "deliveryGroup": { "id": "gid://shopify/CartDeliveryGroup/0" } }],
                    "value": { "percentage": { "value": "15.0" } },
                }],
            })
        );
        Ok(())
    }

    #[test]
    fn no_delivery_group_gives_nothing() -> Result<()> {
        let result = run(&input(&[], &["SHIPPING"], Some(FIFTEEN_PERCENT)))?;

        assert_eq!(result, no_discounts());
        Ok(())
    }

    #[test]
    fn requires_the_shipping_class() -> Result<()> {
        let result = run(&input(
            &["gid://shopify/CartDeliveryGroup/0"],
            &["PRODUCT", "ORDER"],
            Some(FIFTEEN_PERCENT),
        ))?;

        assert_eq!(result, no_discounts());
        Ok(())
    }

    #[test]
    fn non_positive_percentage_gives_nothing() -> Result<()> {
        for config in [r#"{"deliveryPercentage": 0}"#, r#"{"deliveryPercentage": -10}"#, "{}"] {
            let result = run(&input(
                &["gid://shopify/CartDeliveryGroup/0"],
                &["SHIPPING"],
                Some(config),
            ))?;

            assert_eq!(result, no_discounts(), "config {config}");
        }
        Ok(())
    }

    #[test]
    fn missing_or_unreadable_configuration_gives_nothing() -> Result<()> {
        for metafield in [None, Some(""), Some("{deliveryPercentage")] {
            let result = run(&input(
                &["gid://shopify/CartDeliveryGroup/0"],
                &["SHIPPING"],
                metafield,
            ))?;

            assert_eq!(result, no_discounts(), "metafield {metafield:?}");
        }
        Ok(())
    }
}
