//! In-process search backend.
//!
//! Documents are kept as JSON and queries are evaluated against them directly. Relevance is an
//! approximation: each matching clause contributes its boost scaled by how much of the query it
//! covers, which keeps the relative weighting of clauses without term statistics.

use crate::document::ListingDocument;
use crate::error::IndexError;
use crate::query::{Clause, Filter, NestedSort, Order, SearchQuery, Sort};
use crate::{Hit, SearchHits, SearchIndex};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

/// A search index held in memory.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    docs: RwLock<BTreeMap<u64, Value>>,
}

impl MemoryIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    /// Evaluates a query synchronously.
    #[must_use]
    pub fn execute(&self, query: &SearchQuery) -> SearchHits {
        let docs = self.docs.read();

        let mut matched: Vec<(u64, f64, &Value)> = docs
            .iter()
            .filter(|(_, doc)| query.filters.iter().all(|f| eval_filter(doc, f)))
            .filter_map(|(id, doc)| {
                if query.should.is_empty() {
                    return Some((*id, 0.0, doc));
                }
                let score: f64 = query.should.iter().map(|c| score_clause(doc, c)).sum();
                (score > 0.0).then_some((*id, score, doc))
            })
            .collect();

        matched.sort_by(|a, b| compare_hits(&query.sort, a, b));

        let total = matched.len() as u64;
        let hits = matched
            .into_iter()
            .skip(query.from)
            .take(query.size)
            .map(|(id, score, _)| Hit { id, score })
            .collect();

        SearchHits { total, hits }
    }
}

#[async_trait]
impl SearchIndex for MemoryIndex {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchHits, IndexError> {
        Ok(self.execute(query))
    }

    async fn upsert(&self, documents: Vec<ListingDocument>) -> Result<(), IndexError> {
        let mut encoded = Vec::with_capacity(documents.len());
        for doc in documents {
            encoded.push((doc.id, serde_json::to_value(&doc)?));
        }
        let mut docs = self.docs.write();
        for (id, value) in encoded {
            docs.insert(id, value);
        }
        debug!(count = docs.len(), "Memory index updated");
        Ok(())
    }

    async fn remove(&self, id: u64) -> Result<(), IndexError> {
        self.docs.write().remove(&id);
        Ok(())
    }
}

/// Collects the values at a dotted path, flattening arrays on the way.
fn values_at<'a>(doc: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut current = vec![doc];
    for segment in path.split('.') {
        let mut next = Vec::new();
        for value in current {
            match value {
                Value::Object(map) => {
                    if let Some(child) = map.get(segment) {
                        push_flat(child, &mut next);
                    }
                },
                Value::Array(items) => {
                    for item in items {
                        if let Some(child) = item.get(segment) {
                            push_flat(child, &mut next);
                        }
                    }
                },
                _ => {},
            }
        }
        current = next;
    }
    current
}

fn push_flat<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| push_flat(item, out)),
        Value::Null => {},
        other => out.push(other),
    }
}

fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn eval_filter(doc: &Value, filter: &Filter) -> bool {
    match filter {
        Filter::Term { field, value } => values_at(doc, field).iter().any(|v| same_value(v, value)),
        Filter::Terms { field, values } => values_at(doc, field)
            .iter()
            .any(|v| values.iter().any(|target| same_value(v, target))),
        Filter::Range { field, gte, lte } => values_at(doc, field).iter().any(|v| {
            let Some(n) = v.as_f64() else { return false };
            gte.as_ref().and_then(Value::as_f64).is_none_or(|lo| n >= lo)
                && lte.as_ref().and_then(Value::as_f64).is_none_or(|hi| n <= hi)
        }),
        Filter::Exists { field } => !values_at(doc, field).is_empty(),
        Filter::Nested { path, filter } => nested_objects(doc, path).iter().any(|o| eval_filter(o, filter)),
        Filter::Not(inner) => !eval_filter(doc, inner),
    }
}

/// Wraps every object of the nested array at `path` so inner filters can keep using full
/// dotted field names.
fn nested_objects(doc: &Value, path: &str) -> Vec<Value> {
    values_at(doc, path)
        .into_iter()
        .map(|item| {
            let mut wrapped = item.clone();
            for segment in path.rsplit('.') {
                let mut map = Map::new();
                map.insert(segment.to_owned(), wrapped);
                wrapped = Value::Object(map);
            }
            wrapped
        })
        .collect()
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn field_texts(doc: &Value, field: &str) -> Vec<String> {
    values_at(doc, field)
        .into_iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect()
}

fn score_clause(doc: &Value, clause: &Clause) -> f64 {
    let texts = field_texts(doc, clause.field());
    if texts.is_empty() {
        return 0.0;
    }
    let boost = clause.boost();

    match clause {
        Clause::Match { query, .. } => {
            let wanted = tokenize(query);
            if wanted.is_empty() {
                return 0.0;
            }
            let present: Vec<String> = texts.iter().flat_map(|t| tokenize(t)).collect();
            let hits = wanted.iter().filter(|w| present.contains(w)).count();
            boost * hits as f64 / wanted.len() as f64
        },
        Clause::MatchPhrase { query, slop, .. } => {
            let wanted = tokenize(query);
            let found = !wanted.is_empty()
                && texts.iter().any(|t| phrase_matches(&tokenize(t), &wanted, *slop as usize));
            if found { boost } else { 0.0 }
        },
        Clause::Prefix { value, .. } => {
            let prefix = value.to_lowercase();
            let found = texts.iter().any(|t| {
                t.to_lowercase().starts_with(&prefix) || tokenize(t).iter().any(|tok| tok.starts_with(&prefix))
            });
            if found { boost } else { 0.0 }
        },
        Clause::Fuzzy { value, prefix_length, .. } => {
            let target = value.to_lowercase();
            let found = texts
                .iter()
                .flat_map(|t| tokenize(t))
                .any(|tok| fuzzy_matches(&tok, &target, *prefix_length));
            if found { boost } else { 0.0 }
        },
        Clause::Term { value, .. } => {
            if texts.iter().any(|t| t == value) { boost } else { 0.0 }
        },
    }
}

/// Whether `wanted` occurs in order within `tokens` with at most `slop` extra positions.
fn phrase_matches(tokens: &[String], wanted: &[String], slop: usize) -> bool {
    tokens.iter().enumerate().filter(|(_, t)| **t == wanted[0]).any(|(start, _)| {
        let mut pos = start;
        let mut gaps = 0;
        for word in &wanted[1..] {
            let Some(offset) = tokens[pos + 1..].iter().position(|t| t == word) else {
                return false;
            };
            gaps += offset;
            pos += offset + 1;
        }
        gaps <= slop
    })
}

/// Edit distance allowed for a term of the given length.
const fn auto_fuzziness(len: usize) -> usize {
    match len {
        0..=2 => 0,
        3..=5 => 1,
        _ => 2,
    }
}

fn fuzzy_matches(token: &str, target: &str, prefix_length: usize) -> bool {
    let same_prefix = token.chars().take(prefix_length).eq(target.chars().take(prefix_length));
    let long_enough = token.chars().count() >= prefix_length && target.chars().count() >= prefix_length;
    same_prefix && long_enough && strsim::levenshtein(token, target) <= auto_fuzziness(target.chars().count())
}

#[derive(Debug, PartialEq, PartialOrd)]
enum SortKey {
    Num(f64),
    Text(String),
}

fn sort_key(doc: &Value, score: f64, sort: &Sort) -> Option<SortKey> {
    if sort.field == Sort::SCORE {
        return Some(SortKey::Num(score));
    }
    let candidates: Vec<Value> = match &sort.nested {
        Some(NestedSort { path, filter }) => nested_objects(doc, path)
            .into_iter()
            .filter(|o| eval_filter(o, filter))
            .flat_map(|o| values_at(&o, &sort.field).into_iter().cloned().collect::<Vec<_>>())
            .collect(),
        None => values_at(doc, &sort.field).into_iter().cloned().collect(),
    };

    let keys = candidates.into_iter().filter_map(|v| match v {
        Value::Number(n) => n.as_f64().map(SortKey::Num),
        Value::String(s) => Some(SortKey::Text(s)),
        Value::Bool(b) => Some(SortKey::Num(f64::from(u8::from(b)))),
        _ => None,
    });
    // Multi-valued fields sort by their minimum ascending and maximum descending.
    match sort.order {
        Order::Asc => keys.min_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal)),
        Order::Desc => keys.max_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal)),
    }
}

fn compare_hits(sorts: &[Sort], a: &(u64, f64, &Value), b: &(u64, f64, &Value)) -> Ordering {
    let by_score = [Sort::desc(Sort::SCORE)];
    let sorts = if sorts.is_empty() { &by_score[..] } else { sorts };

    for sort in sorts {
        let ka = sort_key(a.2, a.1, sort);
        let kb = sort_key(b.2, b.1, sort);
        let ordering = match (ka, kb) {
            (Some(x), Some(y)) => {
                let natural = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
                if sort.order == Order::Desc { natural.reverse() } else { natural }
            },
            // Missing values go last in both directions.
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    a.0.cmp(&b.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn values_at_flattens_nested_arrays() {
        let doc = json!({ "collection": [{ "id": 1, "order": 3 }, { "id": 2, "order": 0 }] });
        let ids: Vec<_> = values_at(&doc, "collection.id").into_iter().cloned().collect();
        assert_eq!(ids, vec![json!(1), json!(2)]);
    }

    #[test]
    fn phrase_respects_slop() {
        let tokens = tokenize("star wide map");
        let wanted = tokenize("star map");
        assert!(phrase_matches(&tokens, &wanted, 1));
        assert!(!phrase_matches(&tokens, &wanted, 0));
    }

    #[test]
    fn fuzziness_scales_with_length() {
        assert!(fuzzy_matches("mapz", "maps", 1));
        assert!(!fuzzy_matches("zaps", "maps", 1));
        assert!(!fuzzy_matches("ab", "ac", 0));
        assert!(fuzzy_matches("calculater", "calculator", 1));
    }

    #[test]
    fn fuzzy_distance_counts_characters() {
        assert!(fuzzy_matches("cafe", "café", 1));
        assert!(fuzzy_matches("mapá", "mapa", 1));
        assert!(!fuzzy_matches("cofé", "cafe", 1));
    }
}
