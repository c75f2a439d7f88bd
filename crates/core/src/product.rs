use std::fmt;

use serde::{Deserialize, Serialize};

/// Product record as served by the catalog API. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: Option<Price>,
    #[serde(default)]
    pub images: Vec<MediaAsset>,
    #[serde(default)]
    pub video: Option<MediaAsset>,
    #[serde(default)]
    pub category: Option<CategoryRef>,
}

impl Product {
    /// URL of the first image, used for cards and the detail hero.
    pub fn primary_image(&self) -> Option<&str> {
        self.images
            .first()
            .and_then(|image| image.secure_url.as_deref())
    }

    pub fn video_url(&self) -> Option<&str> {
        self.video
            .as_ref()
            .and_then(|video| video.secure_url.as_deref())
    }

    /// Category name, falling back to a generic label.
    pub fn category_label(&self) -> &str {
        self.category
            .as_ref()
            .and_then(|category| category.name.as_deref())
            .filter(|name| !name.is_empty())
            .unwrap_or("Category")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaAsset {
    #[serde(default)]
    pub secure_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRef {
    #[serde(default)]
    pub name: Option<String>,
}

/// Price as the API reports it; some records carry numbers, others strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Price {
    Amount(f64),
    Text(String),
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Amount(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

/// Response wrapper carrying the product collection under `data`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductEnvelope {
    #[serde(default)]
    pub data: Option<Vec<Product>>,
}

/// Locates a product by identifier; the catalog offers no single-item lookup.
pub fn find_product<'a>(products: &'a [Product], id: &str) -> Option<&'a Product> {
    products.iter().find(|product| product.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> serde_json::Value {
        json!({
            "data": [
                {
                    "_id": "p-1",
                    "name": "Panjabi",
                    "description": "Cotton panjabi",
                    "price": 1200,
                    "images": [{ "secure_url": "https://cdn/p1.jpg", "public_id": "x" }],
                    "video": { "secure_url": "https://cdn/p1.mp4" },
                    "category": { "name": "Men" },
                    "stock": 4
                },
                {
                    "_id": "p-2",
                    "name": "Scarf",
                    "price": "450.50"
                }
            ]
        })
    }

    #[test]
    fn parses_envelope_and_ignores_unknown_fields() {
        let envelope: ProductEnvelope = serde_json::from_value(sample()).expect("envelope");
        let products = envelope.data.expect("data present");

        assert_eq!(products.len(), 2);
        assert_eq!(products[0].primary_image(), Some("https://cdn/p1.jpg"));
        assert_eq!(products[0].video_url(), Some("https://cdn/p1.mp4"));
        assert_eq!(products[0].category_label(), "Men");
        assert_eq!(products[0].price.as_ref().unwrap().to_string(), "1200");
    }

    #[test]
    fn missing_optional_fields_fall_back() {
        let envelope: ProductEnvelope = serde_json::from_value(sample()).expect("envelope");
        let scarf = &envelope.data.unwrap()[1];

        assert_eq!(scarf.primary_image(), None);
        assert_eq!(scarf.video_url(), None);
        assert_eq!(scarf.category_label(), "Category");
        assert_eq!(scarf.price.as_ref().unwrap().to_string(), "450.50");
        assert_eq!(scarf.description, "");
    }

    #[test]
    fn envelope_without_data_is_none() {
        let envelope: ProductEnvelope =
            serde_json::from_value(json!({ "message": "oops" })).expect("envelope");
        assert!(envelope.data.is_none());
    }

    #[test]
    fn finds_product_by_id() {
        let envelope: ProductEnvelope = serde_json::from_value(sample()).expect("envelope");
        let products = envelope.data.unwrap();

        assert_eq!(find_product(&products, "p-2").map(|p| p.name.as_str()), Some("Scarf"));
        assert!(find_product(&products, "missing").is_none());
    }
}
