use serde::{Deserialize, Serialize};

/// Listing metadata returned alongside every product page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pagination {
    pub total_pages: u32,
    pub current_page: u32,
    #[serde(rename = "has_pre", alias = "has_prev")]
    pub has_prev: bool,
    pub has_next: bool,
    pub category: String,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            total_pages: 0,
            current_page: 1,
            has_prev: false,
            has_next: false,
            category: String::new(),
        }
    }
}

impl Pagination {
    pub fn prev_page(&self) -> Option<u32> {
        (self.has_prev && self.current_page > 1).then(|| self.current_page - 1)
    }

    pub fn next_page(&self) -> Option<u32> {
        self.has_next.then(|| self.current_page + 1)
    }

    pub fn display(&self) -> String {
        if self.total_pages == 0 {
            "No pages".to_string()
        } else {
            format!("Page {} of {}", self.current_page, self.total_pages)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation() {
        let middle = Pagination {
            total_pages: 3,
            current_page: 2,
            has_prev: true,
            has_next: true,
            category: String::new(),
        };
        assert_eq!(middle.prev_page(), Some(1));
        assert_eq!(middle.next_page(), Some(3));
        assert_eq!(middle.display(), "Page 2 of 3");

        let first = Pagination {
            total_pages: 1,
            ..Default::default()
        };
        assert_eq!(first.prev_page(), None);
        assert_eq!(first.next_page(), None);
    }

    #[test]
    fn test_default_before_any_fetch() {
        let pagination = Pagination::default();
        assert_eq!(pagination.current_page, 1);
        assert_eq!(pagination.display(), "No pages");
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let pagination: Pagination =
            serde_json::from_str(r#"{"total_pages": 2}"#).expect("should parse");
        assert_eq!(pagination.current_page, 1);
        assert!(!pagination.has_next);
    }
}
