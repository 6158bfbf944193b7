//! Query parameter normalization for `/models`.
//!
//! The catalog rejects unknown enum values with a 400, so anything we can't
//! map is dropped from the request rather than forwarded.

/// Labels the catalog accepts for `sort`, spaces included
pub const SORT_HIGHEST_RATED: &str = "Highest Rated";
pub const SORT_MOST_DOWNLOADED: &str = "Most Downloaded";
pub const SORT_NEWEST: &str = "Newest";

/// Sort orders offered to the UI; `Relevance` means "omit sort"
pub const SORT_ORDERS: [&str; 4] = [
    "Relevance",
    SORT_HIGHEST_RATED,
    SORT_MOST_DOWNLOADED,
    SORT_NEWEST,
];

/// Map a sort label to the value the API accepts, or `None` to omit it.
///
/// Space-free variants map to the spaced form; the API 400s on the former.
#[must_use]
pub fn normalize_sort(label: &str) -> Option<&'static str> {
    match label.trim().to_lowercase().as_str() {
        "highestrated" | "highest rated" => Some(SORT_HIGHEST_RATED),
        "mostdownloaded" | "most downloaded" => Some(SORT_MOST_DOWNLOADED),
        "newest" => Some(SORT_NEWEST),
        _ => None,
    }
}

/// Route-level sort map: only the exact UI labels pass through
#[must_use]
pub fn sort_from_label(label: &str) -> Option<&'static str> {
    match label.trim() {
        SORT_HIGHEST_RATED => Some(SORT_HIGHEST_RATED),
        SORT_MOST_DOWNLOADED => Some(SORT_MOST_DOWNLOADED),
        SORT_NEWEST => Some(SORT_NEWEST),
        _ => None,
    }
}

/// Map a period label to the API enum, or `None` to omit it
#[must_use]
pub fn normalize_period(label: &str) -> Option<&'static str> {
    match label.trim().to_lowercase().as_str() {
        "alltime" | "all time" => Some("AllTime"),
        "year" => Some("Year"),
        "month" => Some("Month"),
        "week" => Some("Week"),
        "day" => Some("Day"),
        _ => None,
    }
}

/// Whether a filter value means "no filter"
#[must_use]
pub fn is_wildcard(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || ["any", "all"].iter().any(|w| v.eq_ignore_ascii_case(w))
}

/// Parameters for one `/models` request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    /// Free text; when non-empty it is sent as the tag
    pub query: String,
    pub model_type: String,
    /// Explicit tag, only honored when `query` is empty
    pub tag: Option<String>,
    pub base_models: Vec<String>,
    pub sort: String,
    pub period: String,
    pub nsfw: bool,
    pub page: u32,
    pub limit: u32,
}

impl SearchQuery {
    /// Query pairs in request order; `baseModels` repeats per value
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("limit".to_string(), self.limit.to_string()),
            ("page".to_string(), self.page.to_string()),
            ("nsfw".to_string(), self.nsfw.to_string()),
        ];

        if !is_wildcard(&self.model_type) {
            pairs.push(("types".to_string(), self.model_type.trim().to_string()));
        }

        let query = self.query.trim();
        let tag = if query.is_empty() {
            self.tag.as_deref().map(str::trim).filter(|t| !t.is_empty())
        } else {
            Some(query)
        };
        if let Some(tag) = tag {
            pairs.push(("tag".to_string(), tag.to_string()));
        }

        pairs.extend(
            self.base_models
                .iter()
                .map(|b| b.trim())
                .filter(|b| !b.is_empty())
                .map(|b| ("baseModels".to_string(), b.to_string())),
        );

        if let Some(sort) = normalize_sort(&self.sort) {
            pairs.push(("sort".to_string(), sort.to_string()));
        }
        if let Some(period) = normalize_period(&self.period) {
            pairs.push(("period".to_string(), period.to_string()));
        }

        pairs
    }
}
