//! Cart inspection and mutation commands.

use roastery_core::ProductId;
use roastery_storefront::MutationOutcome;
use roastery_storefront::api::CartSummary;

use super::Context;

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Show the current cart summary.
pub async fn show(ctx: &Context) -> CommandResult {
    ctx.session.start().await?;
    render_summary(&ctx.session.summary());
    Ok(())
}

/// Add a product to the cart.
pub async fn add(ctx: &Context, product_id: ProductId) -> CommandResult {
    ctx.session.start().await?;
    let outcome = ctx.session.toggle_add(product_id).await?;
    report(outcome, product_id);
    render_summary(&ctx.session.summary());
    Ok(())
}

/// Remove a product from the cart, asking for confirmation.
pub async fn remove(ctx: &Context, product_id: ProductId) -> CommandResult {
    ctx.session.start().await?;
    let outcome = ctx.session.toggle_remove(product_id).await?;
    report(outcome, product_id);
    render_summary(&ctx.session.summary());
    Ok(())
}

/// Increase a line's quantity by one.
pub async fn increase(ctx: &Context, product_id: ProductId) -> CommandResult {
    ctx.session.start().await?;
    let outcome = ctx.session.increase_quantity(product_id).await?;
    report(outcome, product_id);
    render_summary(&ctx.session.summary());
    Ok(())
}

/// Decrease a line's quantity by one. The server decides whether a
/// decrease below one removes the line.
pub async fn decrease(ctx: &Context, product_id: ProductId) -> CommandResult {
    ctx.session.start().await?;
    let outcome = ctx.session.decrease_quantity(product_id).await?;
    report(outcome, product_id);
    render_summary(&ctx.session.summary());
    Ok(())
}

/// Discard the persisted cart identity.
#[allow(clippy::print_stdout)]
pub fn reset(ctx: &Context) -> CommandResult {
    ctx.session.reset_identity()?;
    println!("Cart identity discarded; the next add starts a fresh cart.");
    Ok(())
}

#[allow(clippy::print_stdout)]
fn report(outcome: MutationOutcome, product_id: ProductId) {
    match outcome {
        MutationOutcome::Applied => {}
        MutationOutcome::AlreadyInCart => {
            println!("Product {product_id} is already in your cart.");
        }
        MutationOutcome::NotInCart => {
            println!("Product {product_id} is not in your cart.");
        }
        MutationOutcome::Declined => println!("Left unchanged."),
        MutationOutcome::InFlight => {
            println!("Still working on product {product_id}; try again in a moment.");
        }
    }
}

#[allow(clippy::print_stdout)]
fn render_summary(summary: &CartSummary) {
    if summary.is_empty() {
        println!("Your cart is empty.");
        return;
    }

    println!("{:>4}  {:<28} {:>4} {:>10} {:>10}", "ID", "NAME", "QTY", "UNIT", "TOTAL");
    for line in &summary.lines {
        println!(
            "{:>4}  {:<28} {:>4} {:>10} {:>10}",
            line.product_id,
            line.name,
            line.quantity,
            line.unit_price.to_string(),
            line.line_total.to_string()
        );
    }
    println!("{:>60}", format!("Cart total: {}", summary.total_amount));
}
