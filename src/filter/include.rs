//! Include-set validation.

use crate::error::{PegasusError, Result};
use crate::types::Include;

/// Validate the requested result fields.
///
/// `distances` only makes sense for nearest-neighbor queries, so a plain fetch
/// passes `allow_distances = false`. Repeated fields are collapsed, keeping
/// first-seen order.
pub fn validate_include<S: AsRef<str>>(include: &[S], allow_distances: bool) -> Result<Vec<Include>> {
    let mut allowed = vec![Include::Embeddings, Include::Documents, Include::Metadatas];
    if allow_distances {
        allowed.push(Include::Distances);
    }

    let mut validated = Vec::with_capacity(include.len());
    for item in include {
        let item = item.as_ref();
        let Some(field) = allowed.iter().copied().find(|f| f.name() == item) else {
            let names: Vec<&str> = allowed.iter().map(|f| f.name()).collect();
            return Err(PegasusError::invalid_include(format!(
                "Expected include item to be one of {}, got {item:?}",
                names.join(", ")
            )));
        };
        if !validated.contains(&field) {
            validated.push(field);
        }
    }

    Ok(validated)
}
