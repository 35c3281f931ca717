//! Document-content filter dialect (`where_document`).

use serde_json::Value;

use crate::error::{PegasusError, Result};
use crate::filter::LogicalOperator;
use crate::filter::evaluate_tree;
use crate::filter::path::{PathTrail, describe};

const CONTAINS: &str = "$contains";
const DOCUMENT_OPERATORS: [&str; 3] = [CONTAINS, "$and", "$or"];

/// Validate a document filter expression.
///
/// Every node holds exactly one key: `$contains` with a string operand, or
/// `$and` / `$or` with a list of at least two sub-expressions.
pub fn validate_where_document(where_document: &Value) -> Result<&Value> {
    let mut trail = PathTrail::new("where_document");
    let mut pending: Vec<(&Value, usize)> = vec![(where_document, PathTrail::ROOT)];

    while let Some((node, at)) = pending.pop() {
        let Value::Object(entries) = node else {
            return Err(PegasusError::schema(
                trail.render(at),
                format!(
                    "Expected where document to be a mapping, got {}",
                    describe(node)
                ),
            ));
        };

        let mut iter = entries.iter();
        let (Some((operator, operand)), None) = (iter.next(), iter.next()) else {
            return Err(PegasusError::schema(
                trail.render(at),
                format!(
                    "Expected where document to have exactly one operator, got {}",
                    describe(node)
                ),
            ));
        };
        let op_at = trail.key(at, operator);

        if operator == CONTAINS {
            if !operand.is_string() {
                return Err(PegasusError::type_mismatch(
                    trail.render(op_at),
                    CONTAINS,
                    describe(operand),
                ));
            }
            continue;
        }

        if LogicalOperator::parse(operator).is_none() {
            return Err(PegasusError::unknown_operator(
                trail.render(at),
                operator.as_str(),
                &DOCUMENT_OPERATORS,
            ));
        }

        let Value::Array(children) = operand else {
            return Err(PegasusError::schema(
                trail.render(op_at),
                format!(
                    "Expected document value for $and or $or to be a list of where document expressions, got {}",
                    describe(operand)
                ),
            ));
        };
        if children.len() < 2 {
            return Err(PegasusError::schema(
                trail.render(op_at),
                format!(
                    "Expected document value for $and or $or to be a list with at least two where document expressions, got {}",
                    describe(operand)
                ),
            ));
        }
        for (index, child) in children.iter().enumerate().rev() {
            let child_at = trail.index(op_at, index);
            pending.push((child, child_at));
        }
    }

    Ok(where_document)
}

/// Evaluate a validated document filter. `$contains` is a case-sensitive
/// substring test.
pub fn where_document_matches(where_document: &Value, document: &str) -> bool {
    evaluate_tree(where_document, |operator, operand| {
        operator == CONTAINS
            && operand
                .as_str()
                .map(|needle| document.contains(needle))
                .unwrap_or(false)
    })
}
