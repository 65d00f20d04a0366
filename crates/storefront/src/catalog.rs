//! Catalog loading and image reference normalization.
//!
//! The catalog is a one-shot fetch with no caching beyond the current
//! render: requests are cache-busted so listings reflect live stock and
//! price. Image references arrive in heterogeneous forms (bare filename,
//! absolute URL, already-prefixed path) and are normalized against the
//! configured static-asset base before display.

use std::sync::Arc;

use roastery_core::ProductId;
use tracing::instrument;
use url::Url;

use crate::api::{ApiError, OrderingBackend, Product};

/// Catalog reader over the ordering backend.
#[derive(Clone)]
pub struct Catalog {
    backend: Arc<dyn OrderingBackend>,
    image_base: Url,
}

impl Catalog {
    /// Create a catalog reader.
    ///
    /// `image_base` is the static-asset prefix bare filenames are resolved
    /// against; it should end with a slash so joins append rather than
    /// replace the final path segment.
    #[must_use]
    pub fn new(backend: Arc<dyn OrderingBackend>, image_base: Url) -> Self {
        Self {
            backend,
            image_base,
        }
    }

    /// Fetch the full product list with normalized image references.
    ///
    /// On failure the caller keeps whatever it was already displaying;
    /// there is no retry here.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch or decode fails.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Vec<Product>, ApiError> {
        let mut products = self.backend.products().await?;
        for product in &mut products {
            self.normalize(product);
        }
        Ok(products)
    }

    /// Fetch a single product for detail display.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch or decode fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn detail(&self, product_id: ProductId) -> Result<Product, ApiError> {
        let mut product = self.backend.product_detail(product_id).await?;
        self.normalize(&mut product);
        Ok(product)
    }

    fn normalize(&self, product: &mut Product) {
        if let Some(reference) = product.image_url.take() {
            product.image_url = Some(normalize_image_url(&self.image_base, &reference));
        }
    }
}

/// Normalize a product image reference.
///
/// A value already carrying a scheme, or already starting with the asset
/// prefix, passes through unchanged; a bare filename (or relative path) is
/// resolved against the prefix.
#[must_use]
pub fn normalize_image_url(image_base: &Url, reference: &str) -> String {
    if reference.starts_with(image_base.as_str()) {
        return reference.to_owned();
    }

    // An absolute URL parses on its own; a bare filename does not.
    if Url::parse(reference).is_ok() {
        return reference.to_owned();
    }

    match image_base.join(reference) {
        Ok(url) => url.into(),
        Err(e) => {
            tracing::warn!(reference, error = %e, "could not normalize image reference");
            reference.to_owned()
        }
    }
}
