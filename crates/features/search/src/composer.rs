//! Filter composer: request parameters to a typed index query.
//!
//! Each recognised parameter adds one predicate on top of the visibility filters every
//! public query carries. Values outside their allow-list are skipped with a debug log, never
//! rejected.

use mkt_domain::catalog::{
    AppType, DeviceType, FormFactor, Platform, PremiumType, Region, analyzer_for_locale,
};
use mkt_domain::features::FeatureProfile;
use mkt_index::{Clause, Filter, ListingDocument, SearchQuery, Sort};
use mkt_kernel::server::{PageParams, QueryParams, RequestContext};
use tracing::debug;

/// Allowed `sort` keys and the index sort they map to.
const SORTING: [(&str, &str); 6] = [
    ("popularity", "-popularity"),
    ("downloads", "-weekly_downloads"),
    ("rating", "-bayesian_rating"),
    ("created", "-created"),
    ("reviewed", "-reviewed"),
    ("name", "name_sort"),
];
const DEFAULT_SORT: &str = "-popularity";

/// Builds index queries for one request.
#[derive(Debug, Clone, Copy)]
pub struct FilterComposer<'a> {
    params: &'a QueryParams,
    region: &'a Region,
    locale: &'a str,
    profile: Option<&'a FeatureProfile>,
    max_results: usize,
}

impl<'a> FilterComposer<'a> {
    #[must_use]
    pub const fn new(params: &'a QueryParams, region: &'a Region, locale: &'a str, max_results: usize) -> Self {
        Self { params, region, locale, profile: None, max_results }
    }

    /// Composer for the parameters, region, language and feature profile of a request.
    #[must_use]
    pub fn from_context(ctx: &'a RequestContext, max_results: usize) -> Self {
        Self::new(&ctx.params, ctx.region, &ctx.lang, max_results).profile(ctx.profile.as_ref())
    }

    #[must_use]
    pub const fn profile(mut self, profile: Option<&'a FeatureProfile>) -> Self {
        self.profile = profile;
        self
    }

    /// The lower-cased free-text query, if any.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        self.params.get("q").map(str::trim).filter(|q| !q.is_empty()).map(str::to_lowercase)
    }

    /// Builds the query for `window`. The page size never exceeds the configured cap.
    #[must_use]
    pub fn compose(&self, window: PageParams) -> SearchQuery {
        let text = self.text();
        let mut query = self.filters().into_iter().fold(SearchQuery::new(), SearchQuery::filter);
        if let Some(text) = &text {
            let analyzer = analyzer_for_locale(self.locale);
            query = text_clauses(text, analyzer).into_iter().fold(query, SearchQuery::should);
        }
        query = self.sorting(text.is_some()).into_iter().fold(query, SearchQuery::sort_by);

        query.page(window.offset, window.limit.min(self.max_results))
    }

    /// Visibility filters plus one predicate per recognised parameter.
    #[must_use]
    pub fn filters(&self) -> Vec<Filter> {
        let params = self.params;
        let mut filters = ListingDocument::visibility_filters(self.region.id);

        if let Some(category) = params.get("cat") {
            filters.push(Filter::term("category", category));
        }

        match params.get("price") {
            Some("paid") => filters.push(premium_filter(&PremiumType::PAID)),
            Some("free") => {
                filters.push(premium_filter(&PremiumType::FREE));
                filters.push(Filter::term("price", 0));
            },
            Some(other) => debug!(price = other, "Ignoring unknown price filter"),
            None => {},
        }

        if let Some(platform) = lookup(params, "platform", Platform::from_slug) {
            filters.push(Filter::term("platform", platform.id()));
        }
        if let Some(device) = lookup(params, "device", DeviceType::from_api_name) {
            filters.push(Filter::term("device", device.id()));
        }
        if let Some(form_factor) = lookup(params, "form_factor", FormFactor::from_slug) {
            filters.push(Filter::term("form_factor", form_factor.id()));
        }

        let premium_types = lookup_all(params, "premium_types", PremiumType::from_api_name);
        if !premium_types.is_empty() {
            filters.push(premium_filter(&premium_types));
        }

        let mut app_types = lookup_all(params, "app_type", AppType::from_slug);
        if app_types.contains(&AppType::Packaged) && !app_types.contains(&AppType::Privileged) {
            app_types.push(AppType::Privileged);
        }
        if !app_types.is_empty() {
            filters.push(Filter::terms("app_type", app_types.iter().map(|t| t.id())));
        }

        if let Some(manifest) = params.get("manifest_url") {
            filters.push(Filter::term("manifest_url", manifest));
        }

        match params.get("offline").map(str::to_ascii_lowercase).as_deref() {
            Some("true" | "1") => filters.push(Filter::term("is_offline", true)),
            Some("false" | "0") => filters.push(Filter::term("is_offline", false)),
            Some(other) => debug!(offline = other, "Ignoring unknown offline filter"),
            None => {},
        }

        let languages = params.get_list("languages");
        if !languages.is_empty() {
            filters.push(Filter::terms("supported_locales", languages));
        }

        if let Some(profile) = self.profile.and_then(ListingDocument::profile_filter) {
            filters.push(profile);
        }

        filters
    }

    /// Sort order: requested keys from the allow-list, else `-popularity` when there is no
    /// text query. Popularity is region-local in mature regions.
    #[must_use]
    pub fn sorting(&self, has_text: bool) -> Vec<Sort> {
        let requested = self.params.get_list("sort");
        let keys: Vec<&str> = if requested.is_empty() {
            if has_text { Vec::new() } else { vec![DEFAULT_SORT] }
        } else {
            requested
                .into_iter()
                .filter_map(|name| {
                    let key = SORTING.iter().find(|(allowed, _)| *allowed == name).map(|(_, key)| *key);
                    if key.is_none() {
                        debug!(sort = name, "Ignoring unknown sort key");
                    }
                    key
                })
                .collect()
        };

        keys.into_iter()
            .map(|key| match key {
                DEFAULT_SORT if self.region.is_mature() => {
                    Sort::desc(format!("popularity_{}", self.region.id))
                },
                other => Sort::from_key(other),
            })
            .collect()
    }
}

/// Relevance clauses for a lower-cased query. Fuzzy clauses are only added for single words.
#[must_use]
pub fn text_clauses(text: &str, analyzer: Option<&str>) -> Vec<Clause> {
    let single_word = !text.contains(char::is_whitespace);
    let mut clauses = Vec::new();

    for field in ["name", "app_slug", "author"] {
        clauses.push(Clause::Match { field: field.into(), query: text.into(), boost: 3.0, analyzer: None });
        clauses.push(Clause::MatchPhrase { field: field.into(), query: text.into(), boost: 4.0, slop: 1 });
        clauses.push(Clause::Prefix { field: field.into(), value: text.into(), boost: 1.5 });
        if single_word {
            clauses.push(Clause::Fuzzy {
                field: field.into(),
                value: text.into(),
                boost: 2.0,
                prefix_length: 1,
            });
        }
    }
    clauses.push(Clause::Term { field: "name_sort".into(), value: text.into(), boost: 10.0 });
    if let Some(analyzer) = analyzer {
        clauses.push(Clause::Match {
            field: format!("name_l10n_{analyzer}"),
            query: text.into(),
            boost: 2.5,
            analyzer: Some(analyzer.to_owned()),
        });
    }

    clauses.push(Clause::MatchPhrase { field: "description".into(), query: text.into(), boost: 0.8, slop: 0 });
    if let Some(analyzer) = analyzer {
        clauses.push(Clause::MatchPhrase {
            field: format!("description_l10n_{analyzer}"),
            query: text.into(),
            boost: 0.6,
            slop: 0,
        });
    }
    clauses.push(Clause::Match { field: "tags".into(), query: text.into(), boost: 1.0, analyzer: None });
    if single_word {
        clauses.push(Clause::Fuzzy { field: "tags".into(), value: text.into(), boost: 1.0, prefix_length: 1 });
    }

    clauses
}

fn premium_filter(types: &[PremiumType]) -> Filter {
    Filter::terms("premium_type", types.iter().map(|t| t.id()))
}

fn lookup<T>(params: &QueryParams, name: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
    let raw = params.get(name)?;
    let value = parse(raw);
    if value.is_none() {
        debug!(param = name, value = raw, "Ignoring unknown filter value");
    }
    value
}

fn lookup_all<T>(params: &QueryParams, name: &str, parse: impl Fn(&str) -> Option<T>) -> Vec<T> {
    params
        .get_list(name)
        .into_iter()
        .filter_map(|raw| {
            let value = parse(raw);
            if value.is_none() {
                debug!(param = name, value = raw, "Ignoring unknown filter value");
            }
            value
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mkt_domain::features::FeatureSet;
    use proptest::prelude::*;

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        QueryParams::from_pairs(pairs.iter().copied())
    }

    fn region(slug: &str) -> &'static Region {
        Region::by_slug(slug).unwrap()
    }

    fn window(limit: usize) -> PageParams {
        PageParams { offset: 0, limit }
    }

    fn fuzzy_fields(query: &SearchQuery) -> Vec<&str> {
        query
            .should
            .iter()
            .filter(|c| matches!(c, Clause::Fuzzy { .. }))
            .map(Clause::field)
            .collect()
    }

    #[test]
    fn single_word_queries_are_fuzzy() {
        let p = params(&[("q", "Maps")]);
        let query = FilterComposer::new(&p, region("us"), "en-US", 100).compose(window(25));
        assert_eq!(fuzzy_fields(&query), vec!["name", "app_slug", "author", "tags"]);
        assert!(query.should.contains(&Clause::Term {
            field: "name_sort".into(),
            value: "maps".into(),
            boost: 10.0
        }));
        assert!(query.should.iter().any(|c| c.field() == "name_l10n_english"));
        assert!(query.sort.is_empty());

        let p = params(&[("q", "star maps")]);
        let query = FilterComposer::new(&p, region("us"), "en-US", 100).compose(window(25));
        assert!(fuzzy_fields(&query).is_empty());
    }

    #[test]
    fn unknown_locale_has_no_localized_clauses() {
        let p = params(&[("q", "maps")]);
        let query = FilterComposer::new(&p, region("us"), "xx", 100).compose(window(25));
        assert!(!query.should.iter().any(|c| c.field().contains("_l10n_")));
    }

    #[test]
    fn price_filters() {
        let p = params(&[("price", "free")]);
        let filters = FilterComposer::new(&p, region("br"), "en-US", 100).filters();
        assert!(filters.contains(&Filter::terms("premium_type", [0_u8, 3, 4])));
        assert!(filters.contains(&Filter::term("price", 0)));

        let p = params(&[("price", "paid")]);
        let filters = FilterComposer::new(&p, region("br"), "en-US", 100).filters();
        assert!(filters.contains(&Filter::terms("premium_type", [1_u8, 2])));
        assert!(!filters.contains(&Filter::term("price", 0)));
    }

    #[test]
    fn packaged_admits_privileged() {
        let p = params(&[("app_type", "packaged")]);
        let filters = FilterComposer::new(&p, region("br"), "en-US", 100).filters();
        assert!(filters.contains(&Filter::terms("app_type", [2_u8, 3])));
    }

    #[test]
    fn unknown_values_are_ignored() {
        let base = FilterComposer::new(&QueryParams::default(), region("br"), "en-US", 100).filters();
        let p = params(&[
            ("platform", "beos"),
            ("device", "watch"),
            ("price", "cheap"),
            ("premium_types", "gratis"),
            ("offline", "maybe"),
        ]);
        assert_eq!(FilterComposer::new(&p, region("br"), "en-US", 100).filters(), base);
    }

    #[test]
    fn every_parameter_adds_its_predicate() {
        let p = params(&[
            ("cat", "games"),
            ("platform", "android"),
            ("device", "android-tablet"),
            ("form_factor", "tablet"),
            ("premium_types", "premium"),
            ("premium_types", "free-inapp"),
            ("manifest_url", "https://maps.example.com/manifest.webapp"),
            ("offline", "true"),
            ("languages", "es, pt-BR"),
        ]);
        let filters = FilterComposer::new(&p, region("br"), "en-US", 100).filters();
        for expected in [
            Filter::term("status", "public"),
            Filter::term("region_exclusions", 7).negate(),
            Filter::term("category", "games"),
            Filter::term("platform", 2),
            Filter::term("device", 3),
            Filter::term("form_factor", 3),
            Filter::terms("premium_type", [1_u8, 3]),
            Filter::term("manifest_url", "https://maps.example.com/manifest.webapp"),
            Filter::term("is_offline", true),
            Filter::terms("supported_locales", ["es", "pt-BR"]),
        ] {
            assert!(filters.contains(&expected), "missing {expected:?}");
        }
    }

    #[test]
    fn profile_excludes_unsupported_features() {
        let profile = FeatureProfile::from_supported(FeatureSet::all().difference(FeatureSet::NFC));
        let p = QueryParams::default();
        let filters = FilterComposer::new(&p, region("br"), "en-US", 100).profile(Some(&profile)).filters();
        assert_eq!(filters.last(), ListingDocument::profile_filter(&profile).as_ref());
    }

    #[test]
    fn popularity_is_regional_in_mature_regions() {
        let p = params(&[("sort", "rating,popularity,shoe-size")]);
        let us = FilterComposer::new(&p, region("us"), "en-US", 100).sorting(false);
        assert_eq!(us, vec![Sort::from_key("-bayesian_rating"), Sort::desc("popularity_2")]);

        let br = FilterComposer::new(&p, region("br"), "en-US", 100).sorting(false);
        assert_eq!(br, vec![Sort::from_key("-bayesian_rating"), Sort::from_key("-popularity")]);
    }

    #[test]
    fn default_sort_only_without_text() {
        let none = QueryParams::default();
        let composer = FilterComposer::new(&none, region("us"), "en-US", 100);
        assert_eq!(composer.sorting(false), vec![Sort::desc("popularity_2")]);
        assert!(composer.sorting(true).is_empty());

        let invalid = params(&[("sort", "shoe-size")]);
        assert!(FilterComposer::new(&invalid, region("us"), "en-US", 100).sorting(false).is_empty());
    }

    fn param_pair() -> impl Strategy<Value = (String, String)> {
        let name = prop::sample::select(vec![
            "q", "sort", "premium_types", "app_type", "cat", "price", "platform", "device", "dev",
            "form_factor", "tag", "author", "languages", "offline", "is_privileged", "manifest_url",
        ]);
        let value = prop_oneof![
            prop::sample::select(vec![
                "free", "premium", "paid", "hosted", "packaged", "android", "firefoxos", "mobile",
                "-popularity", "rating,name", "downloads,-created", "games", "star maps", "true",
            ])
            .prop_map(str::to_owned),
            "[a-z ,-]{0,16}",
        ];
        (name, value).prop_map(|(name, value)| (name.to_owned(), value))
    }

    proptest! {
        #[test]
        fn page_size_never_exceeds_the_cap(
            pairs in prop::collection::vec(param_pair(), 0..12),
            slug in prop::sample::select(vec!["us", "br", "restofworld"]),
            limit in 0_usize..10_000,
            cap in 1_usize..500,
        ) {
            let p = QueryParams::from_pairs(pairs);
            let query = FilterComposer::new(&p, region(slug), "en-US", cap)
                .compose(PageParams { offset: 0, limit });
            prop_assert!(query.size <= cap);
        }
    }
}
