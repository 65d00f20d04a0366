//! Admin console commands.
//!
//! # Environment Variables
//!
//! - `ROASTERY_ADMIN_EMAIL` - Admin login email
//! - `ROASTERY_ADMIN_PASSWORD` - Admin login password

use super::Context;

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Verify the configured admin credentials against the backend.
#[allow(clippy::print_stdout)]
pub async fn login(ctx: &Context) -> CommandResult {
    let Some(admin) = &ctx.config.admin else {
        return Err(
            "admin credentials not configured; set ROASTERY_ADMIN_EMAIL and ROASTERY_ADMIN_PASSWORD"
                .into(),
        );
    };

    ctx.client.admin_login(&admin.email, &admin.password).await?;
    println!("Login accepted for {}.", admin.email);
    Ok(())
}

/// List every order the backend knows about.
#[allow(clippy::print_stdout)]
pub async fn orders(ctx: &Context) -> CommandResult {
    let orders = ctx.client.admin_orders().await?;

    if orders.is_empty() {
        println!("No orders.");
        return Ok(());
    }

    for order in &orders {
        println!(
            "Cart {:<6} {:<26} {:<20} {}",
            order.cart_id,
            order.email.as_deref().unwrap_or("-"),
            order.order_date.as_deref().unwrap_or("-"),
            order.address.as_deref().unwrap_or("-"),
        );
        for line in &order.lines {
            println!("    {:>3} x {:<28} {:>10}", line.quantity, line.name, line.line_total.to_string());
        }
    }
    Ok(())
}

/// Per-product aggregate quantities for the day.
#[allow(clippy::print_stdout)]
pub async fn daily_batch(ctx: &Context) -> CommandResult {
    let rows = ctx.client.admin_daily_batch().await?;

    if rows.is_empty() {
        println!("Nothing to brew today.");
        return Ok(());
    }

    println!("{:>4}  {:<28} {:>4}", "ID", "NAME", "QTY");
    for row in &rows {
        println!("{:>4}  {:<28} {:>4}", row.product_id, row.name, row.quantity);
    }
    Ok(())
}
