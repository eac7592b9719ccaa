use serde::{Deserialize, Serialize};

/// Campaign ("causa") as listed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Campaign {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "goal", alias = "goal_amount")]
    pub goal_amount: f64,
    #[serde(default, alias = "raised", alias = "raised_amount")]
    pub raised_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, alias = "image_url", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Campaign {
    /// Funding progress in percent, capped at 100.
    #[must_use]
    pub fn progress(&self) -> f64 {
        if self.goal_amount <= 0.0 {
            return 0.0;
        }
        (self.raised_amount / self.goal_amount * 100.0).clamp(0.0, 100.0)
    }
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new", alias = "data")]
    pub items: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default, alias = "total_pages")]
    pub total_pages: u32,
}

fn first_page() -> u32 {
    1
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: first_page(),
            total_pages: 0,
        }
    }
}

impl<T> Page<T> {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Filters for `GET campaigns`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CampaignQuery {
    page: Option<u32>,
    limit: Option<u32>,
    search: Option<String>,
    category: Option<String>,
    status: Option<String>,
}

impl CampaignQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Free-text search. Blank input is ignored.
    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        let search = search.into();
        self.search = (!search.trim().is_empty()).then(|| search.trim().to_owned());
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Query-string pairs, omitting unset filters.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if let Some(category) = &self.category {
            pairs.push(("category", category.clone()));
        }
        if let Some(status) = &self.status {
            pairs.push(("status", status.clone()));
        }
        pairs
    }
}

/// Body of `POST campaigns`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCampaign {
    pub title: String,
    pub description: String,
    pub goal_amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_accepts_data_alias() {
        let json = r#"{"data":[{"id":"c1","title":"Agua potable","goal":1000,"raised":250}],"total":1,"totalPages":1}"#;
        let page: Page<Campaign> = serde_json::from_str(json).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.items[0].progress(), 25.0);
    }

    #[test]
    fn progress_is_capped_and_safe_for_zero_goal() {
        let mut c: Campaign = serde_json::from_str(r#"{"id":"c","title":"t"}"#).unwrap();
        assert_eq!(c.progress(), 0.0);
        c.goal_amount = 10.0;
        c.raised_amount = 40.0;
        assert_eq!(c.progress(), 100.0);
    }

    #[test]
    fn query_skips_unset_and_blank_filters() {
        let q = CampaignQuery::new()
            .with_page(2)
            .with_search("   ")
            .with_category("salud");
        assert_eq!(
            q.to_pairs(),
            vec![("page", "2".to_string()), ("category", "salud".to_string())]
        );
    }

    #[test]
    fn default_page_is_empty() {
        let page: Page<Campaign> = Page::default();
        assert!(page.is_empty());
        assert_eq!(page.page, 1);
    }
}
