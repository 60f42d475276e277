//! Editable product draft backing the create/edit modal.
//!
//! Every field has a fixed type. Text typed by the operator is applied
//! through [`ProductDraft::set_text`], which parses according to the
//! field's type instead of guessing from its name.

use thiserror::Error;

use super::Product;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductField {
    Title,
    Category,
    Unit,
    OriginPrice,
    Price,
    Description,
    Content,
    IsEnabled,
    ImageUrl,
    ImagesUrls,
}

impl ProductField {
    /// Fields in form order.
    pub const ALL: [ProductField; 10] = [
        ProductField::Title,
        ProductField::Category,
        ProductField::Unit,
        ProductField::OriginPrice,
        ProductField::Price,
        ProductField::Description,
        ProductField::Content,
        ProductField::IsEnabled,
        ProductField::ImageUrl,
        ProductField::ImagesUrls,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ProductField::Title => "Title",
            ProductField::Category => "Category",
            ProductField::Unit => "Unit",
            ProductField::OriginPrice => "Original price",
            ProductField::Price => "Price",
            ProductField::Description => "Description",
            ProductField::Content => "Content",
            ProductField::IsEnabled => "Enabled",
            ProductField::ImageUrl => "Image URL",
            ProductField::ImagesUrls => "More images",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ProductField::OriginPrice | ProductField::Price)
    }

    fn index(&self) -> usize {
        Self::ALL.iter().position(|f| f == self).unwrap_or(0)
    }

    pub fn next(&self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(&self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum DraftError {
    #[error("{field} must be a number, got {input:?}")]
    NotANumber { field: &'static str, input: String },

    #[error("{0} cannot be negative")]
    Negative(&'static str),

    #[error("{field} must be yes or no, got {input:?}")]
    NotAFlag { field: &'static str, input: String },
}

/// In-memory product record being created or edited.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProductDraft {
    product: Product,
}

impl ProductDraft {
    /// Blank draft for a new product.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Draft seeded with every field of an existing product.
    pub fn from_product(product: &Product) -> Self {
        Self {
            product: product.clone(),
        }
    }

    pub fn product(&self) -> &Product {
        &self.product
    }

    pub fn toggle_enabled(&mut self) {
        self.product.is_enabled = !self.product.is_enabled;
    }

    /// Current value of a field rendered as editable text.
    pub fn text(&self, field: ProductField) -> String {
        let p = &self.product;
        match field {
            ProductField::Title => p.title.clone(),
            ProductField::Category => p.category.clone(),
            ProductField::Unit => p.unit.clone(),
            ProductField::OriginPrice => format_number(p.origin_price),
            ProductField::Price => format_number(p.price),
            ProductField::Description => p.description.clone(),
            ProductField::Content => p.content.clone(),
            ProductField::IsEnabled => if p.is_enabled { "yes" } else { "no" }.to_string(),
            ProductField::ImageUrl => p.image_url.clone(),
            ProductField::ImagesUrls => p.images_urls.join(" "),
        }
    }

    /// Apply operator text to a field. On error the draft is unchanged.
    pub fn set_text(&mut self, field: ProductField, input: &str) -> Result<(), DraftError> {
        let p = &mut self.product;
        match field {
            ProductField::Title => p.title = input.to_string(),
            ProductField::Category => p.category = input.to_string(),
            ProductField::Unit => p.unit = input.to_string(),
            ProductField::OriginPrice => p.origin_price = parse_price(field, input)?,
            ProductField::Price => p.price = parse_price(field, input)?,
            ProductField::Description => p.description = input.to_string(),
            ProductField::Content => p.content = input.to_string(),
            ProductField::IsEnabled => p.is_enabled = parse_flag(field, input)?,
            ProductField::ImageUrl => p.image_url = input.trim().to_string(),
            // Whitespace separated: URLs may hold commas but never bare spaces
            ProductField::ImagesUrls => {
                p.images_urls = input.split_whitespace().map(str::to_string).collect();
            }
        }
        Ok(())
    }
}

fn parse_price(field: ProductField, input: &str) -> Result<f64, DraftError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    let value: f64 = trimmed.parse().map_err(|_| DraftError::NotANumber {
        field: field.label(),
        input: input.to_string(),
    })?;
    if !value.is_finite() {
        return Err(DraftError::NotANumber {
            field: field.label(),
            input: input.to_string(),
        });
    }
    if value < 0.0 {
        return Err(DraftError::Negative(field.label()));
    }
    Ok(value)
}

fn parse_flag(field: ProductField, input: &str) -> Result<bool, DraftError> {
    match input.trim().to_lowercase().as_str() {
        "1" | "y" | "yes" | "true" | "on" => Ok(true),
        "0" | "n" | "no" | "false" | "off" | "" => Ok(false),
        _ => Err(DraftError::NotAFlag {
            field: field.label(),
            input: input.to_string(),
        }),
    }
}

/// Whole numbers print without a trailing `.0`.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_draft() {
        let draft = ProductDraft::empty();
        assert_eq!(draft.product().id, None);
        assert_eq!(draft.text(ProductField::Price), "0");
        assert_eq!(draft.text(ProductField::IsEnabled), "no");
    }

    #[test]
    fn test_from_product_keeps_all_fields() {
        let product = Product {
            id: Some("p1".to_string()),
            title: "Mochi".to_string(),
            content: "hidden field".to_string(),
            images_urls: vec!["a".to_string(), "b".to_string()],
            price: 120.0,
            ..Default::default()
        };

        let draft = ProductDraft::from_product(&product);
        assert_eq!(draft.product(), &product);
        assert_eq!(draft.text(ProductField::ImagesUrls), "a b");
        assert_eq!(draft.text(ProductField::Price), "120");
    }

    #[test]
    fn test_numeric_fields_parse() {
        let mut draft = ProductDraft::empty();
        draft.set_text(ProductField::Price, " 99.5 ").unwrap();
        draft.set_text(ProductField::OriginPrice, "").unwrap();
        assert_eq!(draft.product().price, 99.5);
        assert_eq!(draft.product().origin_price, 0.0);
        assert_eq!(draft.text(ProductField::Price), "99.5");
    }

    #[test]
    fn test_numeric_field_rejects_text() {
        let mut draft = ProductDraft::empty();
        draft.set_text(ProductField::Price, "10").unwrap();

        let err = draft.set_text(ProductField::Price, "ten").unwrap_err();
        assert_eq!(
            err,
            DraftError::NotANumber {
                field: "Price",
                input: "ten".to_string()
            }
        );
        // Unchanged on error
        assert_eq!(draft.product().price, 10.0);

        assert_eq!(
            draft.set_text(ProductField::OriginPrice, "-1"),
            Err(DraftError::Negative("Original price"))
        );
        assert!(draft.set_text(ProductField::Price, "NaN").is_err());
    }

    #[test]
    fn test_text_fields_are_not_coerced() {
        // A numeric-looking title stays text
        let mut draft = ProductDraft::empty();
        draft.set_text(ProductField::Title, "42").unwrap();
        assert_eq!(draft.product().title, "42");
    }

    #[test]
    fn test_enabled_flag() {
        let mut draft = ProductDraft::empty();
        draft.set_text(ProductField::IsEnabled, "Yes").unwrap();
        assert!(draft.product().is_enabled);
        draft.toggle_enabled();
        assert!(!draft.product().is_enabled);
        assert!(draft.set_text(ProductField::IsEnabled, "maybe").is_err());
    }

    #[test]
    fn test_images_list() {
        let mut draft = ProductDraft::empty();
        draft
            .set_text(ProductField::ImagesUrls, "https://a.png  https://b.png\nhttps://c.png ")
            .unwrap();
        assert_eq!(
            draft.product().images_urls,
            vec!["https://a.png", "https://b.png", "https://c.png"]
        );
    }

    #[test]
    fn test_image_urls_with_commas_survive_editing() {
        let urls = vec![
            "https://cdn.example.test/w_400,h_300/tea.png".to_string(),
            "https://img.example.test/a.png?crop=0,0,10,10".to_string(),
        ];
        let product = Product {
            images_urls: urls.clone(),
            ..Default::default()
        };

        let mut draft = ProductDraft::from_product(&product);
        let text = draft.text(ProductField::ImagesUrls);
        draft.set_text(ProductField::ImagesUrls, &text).unwrap();
        assert_eq!(draft.product().images_urls, urls);
    }

    #[test]
    fn test_field_cycle_wraps() {
        assert_eq!(ProductField::Title.next(), ProductField::Category);
        assert_eq!(ProductField::ImagesUrls.next(), ProductField::Title);
        assert_eq!(ProductField::Title.prev(), ProductField::ImagesUrls);
        assert!(ProductField::Price.is_numeric());
        assert!(!ProductField::Title.is_numeric());
    }
}
