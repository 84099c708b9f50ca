use crate::server::context::QueryParams;
use serde::Serialize;
use url::form_urlencoded;

/// A requested page window, read from the `limit` and `offset` parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub offset: usize,
    pub limit: usize,
}

impl PageParams {
    /// Reads the window, applying `default_limit` and capping the limit at `max_limit`.
    /// Unparseable values fall back to the defaults.
    #[must_use]
    pub fn from_params(params: &QueryParams, default_limit: usize, max_limit: usize) -> Self {
        let limit = params
            .get("limit")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|&l| l > 0)
            .unwrap_or(default_limit)
            .min(max_limit);
        let offset = params.get("offset").and_then(|v| v.parse::<usize>().ok()).unwrap_or(0);
        Self { offset, limit }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub limit: usize,
    pub offset: usize,
    pub total_count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
}

/// A paginated list response: `{"meta": {...}, "objects": [...]}`.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub meta: PageMeta,
    pub objects: Vec<T>,
}

impl<T> Page<T> {
    /// Wraps one page of `objects`. Links keep every other query parameter of the request.
    #[must_use]
    pub fn new(
        objects: Vec<T>,
        total_count: u64,
        window: PageParams,
        path: &str,
        params: &QueryParams,
    ) -> Self {
        let total = usize::try_from(total_count).unwrap_or(usize::MAX);
        let next = (window.offset.saturating_add(window.limit) < total)
            .then(|| page_link(path, params, window.limit, window.offset + window.limit));
        let previous = (window.offset > 0)
            .then(|| page_link(path, params, window.limit, window.offset.saturating_sub(window.limit)));

        Self {
            meta: PageMeta {
                limit: window.limit,
                offset: window.offset,
                total_count,
                next,
                previous,
            },
            objects,
        }
    }

    /// Wraps an unpaginated result set.
    #[must_use]
    pub fn all(objects: Vec<T>) -> Self {
        let count = objects.len();
        Self {
            meta: PageMeta {
                limit: count,
                offset: 0,
                total_count: count as u64,
                next: None,
                previous: None,
            },
            objects,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page { meta: self.meta, objects: self.objects.into_iter().map(f).collect() }
    }
}

fn page_link(path: &str, params: &QueryParams, limit: usize, offset: usize) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params.iter().filter(|(k, _)| !matches!(*k, "limit" | "offset")) {
        query.append_pair(key, value);
    }
    query.append_pair("limit", &limit.to_string());
    query.append_pair("offset", &offset.to_string());
    format!("{path}?{}", query.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_capped_and_defaulted() {
        let params = QueryParams::from_pairs([("limit", "500"), ("offset", "10")]);
        assert_eq!(PageParams::from_params(&params, 25, 100), PageParams { offset: 10, limit: 100 });

        let params = QueryParams::from_pairs([("limit", "zero")]);
        assert_eq!(PageParams::from_params(&params, 25, 100), PageParams { offset: 0, limit: 25 });
    }

    #[test]
    fn links_keep_filters_and_move_the_window() {
        let params = QueryParams::from_pairs([("q", "star map"), ("limit", "2"), ("offset", "2")]);
        let window = PageParams::from_params(&params, 25, 100);
        let page = Page::new(vec![3, 4], 5, window, "/api/v1/apps/search/", &params);

        assert_eq!(page.meta.next.as_deref(), Some("/api/v1/apps/search/?q=star+map&limit=2&offset=4"));
        assert_eq!(
            page.meta.previous.as_deref(),
            Some("/api/v1/apps/search/?q=star+map&limit=2&offset=0")
        );
    }

    #[test]
    fn last_page_has_no_next() {
        let params = QueryParams::default();
        let page = Page::new(vec![1], 1, PageParams { offset: 0, limit: 25 }, "/x", &params);
        assert!(page.meta.next.is_none());
        assert!(page.meta.previous.is_none());
    }
}
