//! Product catalog: the card data source.
//!
//! A catalog is a TOML or JSON file listing products in display order:
//!
//! ```toml
//! [[products]]
//! title = "Minimal Watch"
//! description = "Brushed steel, *sapphire* glass."
//! price = "$129.00"
//! images = [
//!     "https://images.unsplash.com/photo-1523275335684-37898b6baf30?auto=format&q=75&fit=crop",
//!     "https://images.unsplash.com/photo-1524805444758-089113d48a6d?auto=format&q=75&fit=crop&w=600&h=600",
//! ]
//! image_index = 0   # optional, previously shown image
//!
//! [[products]]
//! title = "Headphones"
//! price = "$89.00"
//! image = "https://images.unsplash.com/photo-1505740420928-5e560c06d30e"  # single-image shorthand
//! ```
//!
//! The format is picked by extension: `.json` is JSON, anything else TOML.
//! Descriptions are markdown. Image URLs may carry leftover `w`/`h` params;
//! they are normalized when the card is built.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Catalog {
    #[serde(default)]
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Product {
    pub title: String,
    /// Markdown body shown under the title.
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: String,
    /// Image URLs in carousel order. Takes precedence over `image`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    /// Single-image shorthand, used only when `images` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Index of the image shown first.
    #[serde(default)]
    pub image_index: usize,
}

impl Product {
    /// Raw image URLs: `images` if present, else `image`, else nothing.
    pub fn image_urls(&self) -> Vec<String> {
        match (&self.images, &self.image) {
            (Some(images), _) => images.clone(),
            (None, Some(image)) => vec![image.clone()],
            (None, None) => Vec::new(),
        }
    }

    /// The product added by the "add sample" action.
    pub fn sample() -> Self {
        Self {
            title: "Sample Product".to_string(),
            description: "Dynamically added sample product.".to_string(),
            price: "$19.99".to_string(),
            images: Some(vec![
                "https://images.unsplash.com/photo-1523275335684-37898b6baf30?auto=format&q=75&fit=crop".to_string(),
                "https://images.unsplash.com/photo-1505740420928-5e560c06d30e?auto=format&q=75&fit=crop".to_string(),
                "https://images.unsplash.com/photo-1523275335684-37898b6baf30?auto=format&q=75&fit=crop".to_string(),
            ]),
            image: None,
            image_index: 0,
        }
    }
}

/// Load a catalog file, choosing the parser by extension.
pub fn load_catalog(path: &Path) -> Result<Catalog, CatalogError> {
    let content = fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        Ok(serde_json::from_str(&content)?)
    } else {
        Ok(toml::from_str(&content)?)
    }
}
