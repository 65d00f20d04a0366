//! Checkout command.

use roastery_storefront::CheckoutForm;

use super::Context;

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Validate the collected checkout fields and place the order.
///
/// Validation failures surface their own messages; on success the cart
/// identity is reset and the next invocation starts a fresh session.
#[allow(clippy::print_stdout)]
pub async fn place_order(
    ctx: &Context,
    email: String,
    address: String,
    zip: String,
) -> CommandResult {
    ctx.session.start().await?;

    let form = CheckoutForm {
        email,
        address,
        zip_code: zip,
    };
    ctx.session.submit_checkout(&form).await?;

    println!("Order placed. Thank you!");
    Ok(())
}
