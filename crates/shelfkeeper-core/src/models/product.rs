use serde::{Deserialize, Serialize};

use super::Pagination;

/// A catalog product as the remote API stores it.
///
/// `id` is absent for records that have not been created yet. Updates
/// replace the whole record, so every field is always sent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Product {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub origin_price: f64,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, with = "enabled_flag")]
    pub is_enabled: bool,
    #[serde(rename = "imageUrl", default)]
    pub image_url: String,
    #[serde(rename = "imagesUrls", default)]
    pub images_urls: Vec<String>,
}

impl Product {
    /// Copy of this record without its identifier, as sent on create.
    pub fn without_id(&self) -> Self {
        Self {
            id: None,
            ..self.clone()
        }
    }

    pub fn status_display(&self) -> &'static str {
        if self.is_enabled {
            "Enabled"
        } else {
            "Disabled"
        }
    }
}

/// One page of the product listing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProductPage {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub pagination: Pagination,
}

/// The API stores `is_enabled` as a 0/1 integer. Accept booleans too.
mod enabled_flag {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Flag {
            Int(i64),
            Bool(bool),
        }

        Ok(match Flag::deserialize(deserializer)? {
            Flag::Int(n) => n != 0,
            Flag::Bool(b) => b,
        })
    }
}
