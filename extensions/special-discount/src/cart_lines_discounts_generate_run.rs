use discount_core::rules::{self, CustomerStanding};
use discount_core::DiscountConfig;
use shopify_function::prelude::*;
use shopify_function::Result;

use crate::schema;
use crate::schema::cart_lines_discounts_generate_run::input::cart::lines::Merchandise;

#[shopify_function]
fn cart_lines_discounts_generate_run(
    input: schema::cart_lines_discounts_generate_run::Input,
) -> Result<schema::CartLinesDiscountsGenerateRunResult> {
    let discount = input.discount();
    if !discount
        .discount_classes()
        .contains(&schema::DiscountClass::Product)
    {
        return Ok(no_operations());
    }

    // Unconfigured or unreadable configuration means no discount.
    let Some(config) = discount
        .metafield()
        .and_then(|metafield| DiscountConfig::decode(metafield.value()))
    else {
        return Ok(no_operations());
    };

    let loyalty_code = input
        .triggering_discount_code()
        .is_some_and(|code| rules::is_loyalty_code(code));
    if loyalty_code {
        return Ok(loyalty_discount(&input, &config));
    }

    let Some(percentage) = config.cart_line_discount() else {
        return Ok(no_operations());
    };

    let targets: Vec<_> = input
        .cart()
        .lines()
        .iter()
        .filter_map(|line| match line.merchandise() {
            Merchandise::ProductVariant(variant) if config.targets_product(variant.product().id()) => {
                Some(cart_line_target(line.id()))
            }
            _ => None,
        })
        .collect();

    Ok(product_discount(
        targets,
        percentage,
        rules::percent_off_message(percentage),
    ))
}

/// Loyalty codes discount every product line: new customers get the
/// configured percentage, returning customers a zero-value discount that
/// flags the order for bonus loyalty points.
fn loyalty_discount(
    input: &schema::cart_lines_discounts_generate_run::Input,
    config: &DiscountConfig,
) -> schema::CartLinesDiscountsGenerateRunResult {
    let cart = input.cart();
    let targets: Vec<_> = cart
        .lines()
        .iter()
        .filter(|line| matches!(line.merchandise(), Merchandise::ProductVariant(_)))
        .map(|line| cart_line_target(line.id()))
        .collect();

    let orders = cart
        .buyer_identity()
        .and_then(|buyer| buyer.customer())
        .map(|customer| i64::from(*customer.number_of_orders()));

    match CustomerStanding::from_order_count(orders) {
        CustomerStanding::Returning => {
            product_discount(targets, 0.0, rules::RETURNING_CUSTOMER_MESSAGE.to_string())
        }
        CustomerStanding::New => match config.cart_line_discount() {
            Some(percentage) => {
                product_discount(targets, percentage, rules::percent_off_message(percentage))
            }
            None => no_operations(),
        },
    }
}

fn cart_line_target(id: &str) -> schema::ProductDiscountCandidateTarget {
    schema::ProductDiscountCandidateTarget::CartLine(schema::CartLineTarget {
        id: id.to_string(),
        quantity: None,
    })
}

/// A single candidate covering every target, or nothing when there are no targets.
fn product_discount(
    targets: Vec<schema::ProductDiscountCandidateTarget>,
    percentage: f64,
    message: String,
) -> schema::CartLinesDiscountsGenerateRunResult {
    if targets.is_empty() {
        return no_operations();
    }

    schema::CartLinesDiscountsGenerateRunResult {
        operations: vec![schema::CartOperation::ProductDiscountsAdd(
            schema::ProductDiscountsAddOperation {
                selection_strategy: schema::ProductDiscountSelectionStrategy::First,
                candidates: vec![schema::ProductDiscountCandidate {
                    targets,
                    message: Some(message),
                    value: schema::ProductDiscountCandidateValue::Percentage(schema::Percentage {
                        value: Decimal(rules::round_to_tenth(percentage)),
                    }),
                }],
            },
        )],
    }
}

fn no_operations() -> schema::CartLinesDiscountsGenerateRunResult {
    schema::CartLinesDiscountsGenerateRunResult { operations: vec![] }
}
