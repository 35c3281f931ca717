//! Metadata filter dialect (`where`).

use std::cmp::Ordering;

use serde_json::Value;

use crate::error::{PegasusError, Result};
use crate::filter::path::{PathTrail, describe};
use crate::filter::{LogicalOperator, evaluate_tree};
use crate::types::{Metadata, MetadataValue};

/// Comparison operators allowed in a leaf operator expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhereOperator {
    Gt,
    Gte,
    Lt,
    Lte,
    Ne,
    Eq,
}

impl WhereOperator {
    pub const NAMES: [&'static str; 6] = ["$gt", "$gte", "$lt", "$lte", "$ne", "$eq"];

    pub fn parse(key: &str) -> Option<Self> {
        match key {
            "$gt" => Some(WhereOperator::Gt),
            "$gte" => Some(WhereOperator::Gte),
            "$lt" => Some(WhereOperator::Lt),
            "$lte" => Some(WhereOperator::Lte),
            "$ne" => Some(WhereOperator::Ne),
            "$eq" => Some(WhereOperator::Eq),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            WhereOperator::Gt => "$gt",
            WhereOperator::Gte => "$gte",
            WhereOperator::Lt => "$lt",
            WhereOperator::Lte => "$lte",
            WhereOperator::Ne => "$ne",
            WhereOperator::Eq => "$eq",
        }
    }

    /// Range operators only accept numeric operands.
    pub fn is_range(&self) -> bool {
        matches!(
            self,
            WhereOperator::Gt | WhereOperator::Gte | WhereOperator::Lt | WhereOperator::Lte
        )
    }

    /// Apply this operator to a stored value and a literal operand.
    pub fn apply(&self, actual: &MetadataValue, operand: &Value) -> bool {
        match self {
            WhereOperator::Eq => literal_equals(actual, operand),
            WhereOperator::Ne => !literal_equals(actual, operand),
            _ => {
                let (Some(lhs), Some(rhs)) = (actual.as_f64(), operand.as_f64()) else {
                    return false;
                };
                match lhs.partial_cmp(&rhs) {
                    Some(Ordering::Greater) => {
                        matches!(self, WhereOperator::Gt | WhereOperator::Gte)
                    }
                    Some(Ordering::Equal) => {
                        matches!(self, WhereOperator::Gte | WhereOperator::Lte)
                    }
                    Some(Ordering::Less) => matches!(self, WhereOperator::Lt | WhereOperator::Lte),
                    None => false,
                }
            }
        }
    }
}

fn literal_equals(actual: &MetadataValue, operand: &Value) -> bool {
    match (actual, operand) {
        (MetadataValue::Str(lhs), Value::String(rhs)) => lhs == rhs,
        (MetadataValue::Int(lhs), Value::Number(rhs)) if rhs.is_i64() => {
            rhs.as_i64() == Some(*lhs)
        }
        (MetadataValue::Int(_) | MetadataValue::Float(_), Value::Number(rhs)) => {
            actual.as_f64() == rhs.as_f64()
        }
        _ => false,
    }
}

/// Validate a metadata filter expression.
///
/// Returns the expression unchanged on success. Fails with `SchemaError` for
/// malformed shapes (non-mapping nodes, `$and`/`$or` with fewer than two
/// children, leaf mappings with zero or several operators), `UnknownOperator`
/// for operators outside `$gt,$gte,$lt,$lte,$ne,$eq`, and `TypeMismatch` for
/// operands the operator cannot compare against.
pub fn validate_where(where_clause: &Value) -> Result<&Value> {
    let mut trail = PathTrail::new("where");
    let mut pending: Vec<(&Value, usize)> = vec![(where_clause, PathTrail::ROOT)];

    while let Some((node, at)) = pending.pop() {
        let Value::Object(entries) = node else {
            return Err(PegasusError::schema(
                trail.render(at),
                format!("Expected where to be a mapping, got {}", describe(node)),
            ));
        };

        for (key, value) in entries {
            let key_at = trail.key(at, key);

            if LogicalOperator::parse(key).is_some() {
                let Value::Array(children) = value else {
                    return Err(PegasusError::schema(
                        trail.render(key_at),
                        format!(
                            "Expected where value for $and or $or to be a list of where expressions, got {}",
                            describe(value)
                        ),
                    ));
                };
                if children.len() < 2 {
                    return Err(PegasusError::schema(
                        trail.render(key_at),
                        format!(
                            "Expected where value for $and or $or to be a list with at least two where expressions, got {}",
                            describe(value)
                        ),
                    ));
                }
                // Reversed so the first child is checked first.
                for (index, child) in children.iter().enumerate().rev() {
                    let child_at = trail.index(key_at, index);
                    pending.push((child, child_at));
                }
                continue;
            }

            validate_leaf(&trail, key_at, value)?;
        }
    }

    Ok(where_clause)
}

fn validate_leaf(trail: &PathTrail<'_>, at: usize, value: &Value) -> Result<()> {
    match value {
        Value::String(_) | Value::Number(_) => Ok(()),
        Value::Object(operators) => {
            let mut iter = operators.iter();
            let (Some((operator, operand)), None) = (iter.next(), iter.next()) else {
                return Err(PegasusError::schema(
                    trail.render(at),
                    format!(
                        "Expected operator expression to have exactly one operator, got {}",
                        describe(value)
                    ),
                ));
            };

            let Some(parsed) = WhereOperator::parse(operator) else {
                return Err(PegasusError::unknown_operator(
                    trail.render(at),
                    operator.as_str(),
                    &WhereOperator::NAMES,
                ));
            };

            match operand {
                Value::Number(_) => Ok(()),
                Value::String(_) if !parsed.is_range() => Ok(()),
                _ => Err(PegasusError::type_mismatch(
                    trail.render(at),
                    parsed.name(),
                    describe(operand),
                )),
            }
        }
        _ => Err(PegasusError::schema(
            trail.render(at),
            format!(
                "Expected where value to be a str, int, float, or operator expression, got {}",
                describe(value)
            ),
        )),
    }
}

/// Evaluate a validated metadata filter against one item's metadata.
///
/// A field missing from the metadata fails every predicate on it, `$ne`
/// included. Keys of one mapping are combined with AND.
pub fn where_matches(where_clause: &Value, metadata: &Metadata) -> bool {
    evaluate_tree(where_clause, |field, condition| {
        let Some(actual) = metadata.get(field) else {
            return false;
        };
        match condition {
            Value::Object(operators) => {
                let Some((operator, operand)) = operators.iter().next() else {
                    return false;
                };
                WhereOperator::parse(operator)
                    .map(|op| op.apply(actual, operand))
                    .unwrap_or(false)
            }
            literal => WhereOperator::Eq.apply(actual, literal),
        }
    })
}
