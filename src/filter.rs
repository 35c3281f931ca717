//! Filter expression grammar used to constrain nearest-neighbor search.
//!
//! Two dialects share one recursive shape, a mapping whose `$and` / `$or`
//! keys hold lists of sub-expressions and whose other keys are leaf
//! predicates:
//!
//! - [`where_clause`]: metadata predicates such as `{"age": {"$gt": 5}}`
//! - [`where_document`]: document predicates such as `{"$contains": "cat"}`
//!
//! Expressions travel as `serde_json::Value` trees. Validation and evaluation
//! both walk the tree with an explicit stack, so adversarially deep filters
//! cannot exhaust the call stack.
//!
//! ```
//! use pegasus::filter::{CandidateFilter, validate_where};
//! use pegasus::types::{Metadata, MetadataValue};
//! use serde_json::json;
//!
//! let filter = json!({"$or": [{"age": {"$gte": 18}}, {"role": "admin"}]});
//! assert!(validate_where(&filter).is_ok());
//!
//! let candidates = CandidateFilter::new(Some(filter), None).unwrap();
//! let mut metadata = Metadata::new();
//! metadata.insert("age".to_string(), MetadataValue::Int(21));
//! assert!(candidates.matches(Some(&metadata), None));
//! ```

pub mod include;
pub mod path;
pub mod validation;
pub mod where_clause;
pub mod where_document;

use serde_json::Value;

use crate::error::Result;
use crate::types::Metadata;

pub use include::validate_include;
pub use validation::{validate_ids, validate_metadata, validate_metadatas};
pub use where_clause::{WhereOperator, validate_where, where_matches};
pub use where_document::{validate_where_document, where_document_matches};

/// Boolean combinator keys shared by both dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

impl LogicalOperator {
    pub const NAMES: [&'static str; 2] = ["$and", "$or"];

    /// Parse a mapping key as a logical operator.
    pub fn parse(key: &str) -> Option<Self> {
        match key {
            "$and" => Some(LogicalOperator::And),
            "$or" => Some(LogicalOperator::Or),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LogicalOperator::And => "$and",
            LogicalOperator::Or => "$or",
        }
    }
}

/// Pre-filter applied to candidates before scoring.
///
/// Both expressions are validated on construction. An item passes when its
/// metadata satisfies the `where` expression and its document satisfies the
/// `where_document` expression; an absent expression always passes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateFilter {
    where_clause: Option<Value>,
    where_document: Option<Value>,
}

impl CandidateFilter {
    /// Validate both expressions and build the filter.
    pub fn new(where_clause: Option<Value>, where_document: Option<Value>) -> Result<Self> {
        if let Some(expr) = &where_clause {
            validate_where(expr)?;
        }
        if let Some(expr) = &where_document {
            validate_where_document(expr)?;
        }
        Ok(Self {
            where_clause,
            where_document,
        })
    }

    /// A filter that accepts every candidate.
    pub fn accept_all() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.where_clause.is_none() && self.where_document.is_none()
    }

    /// Check one candidate. Missing metadata is treated as an empty mapping.
    pub fn matches(&self, metadata: Option<&Metadata>, document: Option<&str>) -> bool {
        if let Some(expr) = &self.where_clause {
            let empty = Metadata::new();
            if !where_matches(expr, metadata.unwrap_or(&empty)) {
                return false;
            }
        }
        if let Some(expr) = &self.where_document {
            match document {
                Some(document) => {
                    if !where_document_matches(expr, document) {
                        return false;
                    }
                }
                None => return false,
            }
        }
        true
    }
}

/// One unit of work produced by an evaluation frame.
enum Next<'a> {
    Done(bool),
    Leaf(bool),
    Push(Frame<'a>),
}

/// Evaluation frame: a mapping (all entries must hold) or a logical list.
enum Frame<'a> {
    Mapping(serde_json::map::Iter<'a>),
    Logical(LogicalOperator, std::slice::Iter<'a, Value>),
}

impl<'a> Frame<'a> {
    fn short_circuits_on(&self, result: bool) -> bool {
        match self {
            Frame::Mapping(_) | Frame::Logical(LogicalOperator::And, _) => !result,
            Frame::Logical(LogicalOperator::Or, _) => result,
        }
    }

    fn next<F>(&mut self, leaf: &F) -> Next<'a>
    where
        F: Fn(&str, &Value) -> bool,
    {
        match self {
            Frame::Mapping(entries) => match entries.next() {
                None => Next::Done(true),
                Some((key, value)) => match (LogicalOperator::parse(key), value) {
                    (Some(op), Value::Array(children)) => {
                        Next::Push(Frame::Logical(op, children.iter()))
                    }
                    (Some(_), _) => Next::Leaf(false),
                    (None, _) => Next::Leaf(leaf(key, value)),
                },
            },
            Frame::Logical(op, children) => match children.next() {
                None => Next::Done(*op == LogicalOperator::And),
                Some(Value::Object(map)) => Next::Push(Frame::Mapping(map.iter())),
                Some(_) => Next::Leaf(false),
            },
        }
    }
}

/// Evaluate an expression tree with an explicit frame stack.
///
/// `leaf` decides every non-logical `(key, value)` entry. Logical nodes
/// short-circuit. A non-mapping root evaluates to `false`.
pub(crate) fn evaluate_tree<F>(root: &Value, leaf: F) -> bool
where
    F: Fn(&str, &Value) -> bool,
{
    let Value::Object(map) = root else {
        return false;
    };

    let mut stack = vec![Frame::Mapping(map.iter())];
    let mut carried: Option<bool> = None;

    while let Some(frame) = stack.last_mut() {
        if let Some(result) = carried.take()
            && frame.short_circuits_on(result)
        {
            stack.pop();
            carried = Some(result);
            continue;
        }

        match frame.next(&leaf) {
            Next::Done(result) => {
                stack.pop();
                carried = Some(result);
            }
            Next::Leaf(result) => carried = Some(result),
            Next::Push(child) => stack.push(child),
        }
    }

    carried.unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use serde_json::{Map, json};

    use super::*;
    use crate::types::MetadataValue;

    /// Builds `{op: [.., sibling]}` `depth` levels deep without going through
    /// `json!`, which serializes interpolated values recursively.
    fn nested(op: &str, depth: usize, leaf: Value, sibling: &Value) -> Value {
        let mut expr = leaf;
        for _ in 0..depth {
            let mut node = Map::new();
            node.insert(op.to_string(), Value::Array(vec![expr, sibling.clone()]));
            expr = Value::Object(node);
        }
        expr
    }

    fn metadata(pairs: &[(&str, MetadataValue)]) -> Metadata {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_candidate_filter_rejects_invalid_expressions() {
        let err = CandidateFilter::new(Some(json!({"$and": [{"a": 1}]})), None).unwrap_err();
        assert_eq!(err.kind(), "SchemaError");

        let err = CandidateFilter::new(None, Some(json!({"$regex": "x"}))).unwrap_err();
        assert_eq!(err.kind(), "UnknownOperator");
    }

    #[test]
    fn test_candidate_filter_combines_dialects() {
        let filter = CandidateFilter::new(
            Some(json!({"kind": "photo"})),
            Some(json!({"$contains": "sunset"})),
        )
        .unwrap();
        let meta = metadata(&[("kind", "photo".into())]);

        assert!(filter.matches(Some(&meta), Some("a sunset over water")));
        assert!(!filter.matches(Some(&meta), Some("a sunrise")));
        assert!(!filter.matches(Some(&meta), None));
        assert!(!filter.matches(None, Some("sunset")));
    }

    #[test]
    fn test_accept_all() {
        let filter = CandidateFilter::accept_all();
        assert!(filter.is_empty());
        assert!(filter.matches(None, None));
    }

    #[test]
    fn test_evaluate_tree_short_circuits() {
        let expr = json!({"$or": [{"x": 1}, {"y": 2}]});
        let calls = std::cell::Cell::new(0);
        let result = evaluate_tree(&expr, |_, _| {
            calls.set(calls.get() + 1);
            true
        });
        assert!(result);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_evaluate_tree_deep_nesting() {
        let depth = 100_000;
        let expr = nested("$and", depth, json!({"leaf": 1}), &json!({"leaf": 1}));
        assert!(evaluate_tree(&expr, |_, _| true));
        assert!(!evaluate_tree(&expr, |_, _| false));
        // Value drops recursively.
        std::mem::forget(expr);
    }
}
