//! Catalog browsing commands.

use roastery_core::ProductId;

use super::Context;

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// List the full product catalog.
#[allow(clippy::print_stdout)]
pub async fn list(ctx: &Context) -> CommandResult {
    let products = ctx.catalog.load().await?;

    if products.is_empty() {
        println!("No products available right now.");
        return Ok(());
    }

    println!("{:>4}  {:<28} {:>10}", "ID", "NAME", "PRICE");
    for product in &products {
        println!(
            "{:>4}  {:<28} {:>10}",
            product.id,
            product.name,
            product.price.to_string()
        );
    }
    Ok(())
}

/// Show a single product in detail.
#[allow(clippy::print_stdout)]
pub async fn show(ctx: &Context, id: ProductId) -> CommandResult {
    let product = ctx.catalog.detail(id).await?;

    println!("{} (#{})", product.name, product.id);
    println!("Price: {}", product.price);
    if let Some(contents) = &product.contents {
        println!("Contents: {contents}");
    }
    if let Some(image_url) = &product.image_url {
        println!("Image: {image_url}");
    }
    Ok(())
}
