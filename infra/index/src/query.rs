//! A typed subset of the Elasticsearch query DSL.
//!
//! Queries are built once and either rendered to a JSON body ([`SearchQuery::to_body`]) or
//! evaluated directly by the in-memory backend.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Non-scoring restriction on the document set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    /// The field contains exactly this value.
    Term { field: String, value: Value },
    /// The field contains any of these values.
    Terms { field: String, values: Vec<Value> },
    /// A numeric field lies within the inclusive bounds.
    Range { field: String, gte: Option<Value>, lte: Option<Value> },
    /// The field holds a non-null value.
    Exists { field: String },
    /// At least one object of the nested array at `path` satisfies the inner filter.
    Nested { path: String, filter: Box<Filter> },
    Not(Box<Filter>),
}

impl Filter {
    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Term { field: field.into(), value: value.into() }
    }

    pub fn terms<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self::Terms { field: field.into(), values: values.into_iter().map(Into::into).collect() }
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Self::Exists { field: field.into() }
    }

    pub fn nested(path: impl Into<String>, filter: Self) -> Self {
        Self::Nested { path: path.into(), filter: Box::new(filter) }
    }

    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Term { field, value } => json!({ "term": { field: value } }),
            Self::Terms { field, values } => json!({ "terms": { field: values } }),
            Self::Range { field, gte, lte } => {
                let mut bounds = Map::new();
                if let Some(gte) = gte {
                    bounds.insert("gte".to_owned(), gte.clone());
                }
                if let Some(lte) = lte {
                    bounds.insert("lte".to_owned(), lte.clone());
                }
                json!({ "range": { field: bounds } })
            },
            Self::Exists { field } => json!({ "exists": { "field": field } }),
            Self::Nested { path, filter } => {
                json!({ "nested": { "path": path, "query": { "bool": { "filter": [filter.to_json()] } } } })
            },
            Self::Not(inner) => json!({ "bool": { "must_not": [inner.to_json()] } }),
        }
    }
}

/// Scoring clause; a document matching several clauses sums their boosts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Clause {
    Match { field: String, query: String, boost: f64, analyzer: Option<String> },
    MatchPhrase { field: String, query: String, boost: f64, slop: u32 },
    Prefix { field: String, value: String, boost: f64 },
    /// Edit-distance match with automatic fuzziness; the first `prefix_length` characters must
    /// match exactly.
    Fuzzy { field: String, value: String, boost: f64, prefix_length: usize },
    Term { field: String, value: String, boost: f64 },
}

impl Clause {
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::Match { field, .. }
            | Self::MatchPhrase { field, .. }
            | Self::Prefix { field, .. }
            | Self::Fuzzy { field, .. }
            | Self::Term { field, .. } => field,
        }
    }

    #[must_use]
    pub const fn boost(&self) -> f64 {
        match self {
            Self::Match { boost, .. }
            | Self::MatchPhrase { boost, .. }
            | Self::Prefix { boost, .. }
            | Self::Fuzzy { boost, .. }
            | Self::Term { boost, .. } => *boost,
        }
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Match { field, query, boost, analyzer } => {
                let mut body = json!({ "query": query, "boost": boost });
                if let (Some(analyzer), Some(map)) = (analyzer, body.as_object_mut()) {
                    map.insert("analyzer".to_owned(), Value::from(analyzer.as_str()));
                }
                json!({ "match": { field: body } })
            },
            Self::MatchPhrase { field, query, boost, slop } => {
                json!({ "match_phrase": { field: { "query": query, "boost": boost, "slop": slop } } })
            },
            Self::Prefix { field, value, boost } => {
                json!({ "prefix": { field: { "value": value, "boost": boost } } })
            },
            Self::Fuzzy { field, value, boost, prefix_length } => json!({
                "fuzzy": { field: { "value": value, "boost": boost, "prefix_length": prefix_length } }
            }),
            Self::Term { field, value, boost } => {
                json!({ "term": { field: { "value": value, "boost": boost } } })
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

/// Restricts a sort on a nested field to the nested objects matching `filter`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedSort {
    pub path: String,
    pub filter: Filter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    pub order: Order,
    pub nested: Option<NestedSort>,
}

impl Sort {
    /// Field name used for relevance ordering.
    pub const SCORE: &'static str = "_score";

    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), order: Order::Asc, nested: None }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), order: Order::Desc, nested: None }
    }

    /// Parses `field` or `-field` (descending).
    #[must_use]
    pub fn from_key(key: &str) -> Self {
        key.strip_prefix('-').map_or_else(|| Self::asc(key), Self::desc)
    }

    #[must_use]
    pub fn nested(mut self, path: impl Into<String>, filter: Filter) -> Self {
        self.nested = Some(NestedSort { path: path.into(), filter });
        self
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut body = json!({ "order": self.order });
        if let (Some(nested), Some(map)) = (&self.nested, body.as_object_mut()) {
            map.insert(
                "nested".to_owned(),
                json!({ "path": nested.path, "filter": nested.filter.to_json() }),
            );
        }
        json!({ &self.field: body })
    }
}

/// A complete search request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    pub filters: Vec<Filter>,
    /// When non-empty, a document must match at least one clause.
    pub should: Vec<Clause>,
    pub sort: Vec<Sort>,
    pub from: usize,
    pub size: usize,
}

impl SearchQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn should(mut self, clause: Clause) -> Self {
        self.should.push(clause);
        self
    }

    #[must_use]
    pub fn sort_by(mut self, sort: Sort) -> Self {
        self.sort.push(sort);
        self
    }

    #[must_use]
    pub const fn page(mut self, from: usize, size: usize) -> Self {
        self.from = from;
        self.size = size;
        self
    }

    /// Renders the Elasticsearch request body.
    #[must_use]
    pub fn to_body(&self) -> Value {
        let mut bool_query = Map::new();
        bool_query.insert(
            "filter".to_owned(),
            Value::Array(self.filters.iter().map(Filter::to_json).collect()),
        );
        if !self.should.is_empty() {
            bool_query.insert(
                "should".to_owned(),
                Value::Array(self.should.iter().map(Clause::to_json).collect()),
            );
            bool_query.insert("minimum_should_match".to_owned(), Value::from(1));
        }

        let mut body = json!({
            "query": { "bool": bool_query },
            "from": self.from,
            "size": self.size,
        });
        if !self.sort.is_empty()
            && let Some(map) = body.as_object_mut()
        {
            map.insert(
                "sort".to_owned(),
                Value::Array(self.sort.iter().map(Sort::to_json).collect()),
            );
        }
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_key_prefix_selects_order() {
        assert_eq!(Sort::from_key("-popularity"), Sort::desc("popularity"));
        assert_eq!(Sort::from_key("name_sort"), Sort::asc("name_sort"));
    }

    #[test]
    fn body_omits_should_without_clauses() {
        let body = SearchQuery::new().filter(Filter::term("status", 4)).page(0, 10).to_body();
        assert_eq!(body["query"]["bool"]["filter"][0], json!({ "term": { "status": 4 } }));
        assert!(body["query"]["bool"].get("should").is_none());
        assert!(body.get("sort").is_none());
        assert_eq!(body["size"], 10);
    }

    #[test]
    fn body_renders_clauses_and_nested_sort() {
        let query = SearchQuery::new()
            .should(Clause::MatchPhrase {
                field: "name".into(),
                query: "star map".into(),
                boost: 4.0,
                slop: 1,
            })
            .sort_by(
                Sort::asc("collection.order")
                    .nested("collection", Filter::term("collection.id", 7)),
            );
        let body = query.to_body();

        assert_eq!(body["query"]["bool"]["minimum_should_match"], 1);
        assert_eq!(body["query"]["bool"]["should"][0]["match_phrase"]["name"]["slop"], 1);
        assert_eq!(body["sort"][0]["collection.order"]["order"], "asc");
        assert_eq!(body["sort"][0]["collection.order"]["nested"]["path"], "collection");
    }
}
