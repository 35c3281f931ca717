//! Output formatting for CLI commands.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;
use serde_json::Value;

use crate::cli::args::{OutputFormat, PegasusArgs};
use crate::embedding::CacheStats;
use crate::error::Result;
use crate::index::IndexMetadata;
use crate::types::{Embedding, MetadataValue, QueryResult};

/// Human-readable rendering of a command result.
pub trait HumanOutput {
    fn render_human(&self) -> String;
}

/// Result of `validate-where` and `validate-where-document`.
#[derive(Debug, Serialize)]
pub struct ValidationReport {
    pub expression: &'static str,
    pub valid: bool,
    pub value: Value,
}

/// Result of `validate-include`.
#[derive(Debug, Serialize)]
pub struct IncludeReport {
    pub include: Vec<String>,
}

/// Result of `search`.
#[derive(Debug, Serialize)]
pub struct SearchReport {
    pub strategy: String,
    pub result: QueryResult,
}

/// Result of `embed`.
#[derive(Debug, Serialize)]
pub struct EmbedReport {
    pub embedder: String,
    pub modality: String,
    pub dimension: usize,
    pub embeddings: Vec<Embedding>,
    pub cache: Option<CacheStats>,
}

/// Result of `info`.
#[derive(Debug, Serialize)]
pub struct InfoReport {
    pub modalities: BTreeMap<String, IndexMetadata>,
}

/// Output a result in the specified format.
pub fn output_result<T>(message: &str, result: &T, args: &PegasusArgs) -> Result<()>
where
    T: Serialize + HumanOutput,
{
    match args.output_format {
        OutputFormat::Human => {
            if args.verbosity() > 1 {
                println!("{message}");
                println!();
            }
            print!("{}", result.render_human());
        }
        OutputFormat::Json => println!("{}", render_json(result, args.pretty)?),
    }
    Ok(())
}

pub fn render_json<T: Serialize>(result: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    Ok(json)
}

impl HumanOutput for ValidationReport {
    fn render_human(&self) -> String {
        format!("{} is valid: {}\n", self.expression, self.value)
    }
}

impl HumanOutput for IncludeReport {
    fn render_human(&self) -> String {
        format!("include: {}\n", self.include.join(", "))
    }
}

impl HumanOutput for SearchReport {
    fn render_human(&self) -> String {
        let result = &self.result;
        let mut out = String::new();
        let _ = writeln!(out, "Search Results ({})", self.strategy);
        let _ = writeln!(out, "═══════════════");

        for (row, ids) in result.ids.iter().enumerate() {
            let _ = writeln!(out, "Query {row}:");
            if ids.is_empty() {
                let _ = writeln!(out, "  (no matches)");
            }
            for (rank, id) in ids.iter().enumerate() {
                let _ = write!(out, "  {}. {id}", rank + 1);
                if let Some(distance) = result.distances.as_ref().and_then(|d| d[row].get(rank)) {
                    let _ = write!(out, " (distance: {distance:.4})");
                }
                let _ = writeln!(out);

                if let Some(Some(document)) = result.documents.as_ref().and_then(|d| d[row].get(rank))
                {
                    let _ = writeln!(out, "     document: {}", truncate(document, 80));
                }
                if let Some(Some(metadata)) = result.metadatas.as_ref().and_then(|m| m[row].get(rank))
                {
                    let mut keys: Vec<&String> = metadata.keys().collect();
                    keys.sort();
                    let pairs: Vec<String> = keys
                        .into_iter()
                        .map(|k| format!("{k}={}", format_metadata_value(&metadata[k])))
                        .collect();
                    let _ = writeln!(out, "     metadata: {}", pairs.join(", "));
                }
            }
        }
        out
    }
}

impl HumanOutput for EmbedReport {
    fn render_human(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} {} embeddings from {} (dimension {})",
            self.embeddings.len(),
            self.modality,
            self.embedder,
            self.dimension
        );
        for (index, embedding) in self.embeddings.iter().enumerate() {
            let values: Vec<String> = embedding.iter().map(|v| format!("{v:.4}")).collect();
            let _ = writeln!(out, "  {index}: [{}]", values.join(", "));
        }
        if let Some(cache) = &self.cache {
            let _ = writeln!(
                out,
                "cache: {} hits, {} misses, {} entries",
                cache.hits, cache.misses, cache.entries
            );
        }
        out
    }
}

impl HumanOutput for InfoReport {
    fn render_human(&self) -> String {
        let mut out = String::new();
        for (modality, meta) in &self.modalities {
            let _ = writeln!(
                out,
                "{modality}: {} elements, dimension {}, created {}",
                meta.elements,
                meta.dimensionality,
                meta.time_created.to_rfc3339()
            );
        }
        out
    }
}

fn format_metadata_value(value: &MetadataValue) -> String {
    match value {
        MetadataValue::Int(i) => i.to_string(),
        MetadataValue::Float(f) => f.to_string(),
        MetadataValue::Str(s) => s.clone(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::Metadata;

    #[test]
    fn test_search_report_human() {
        let mut metadata = Metadata::new();
        metadata.insert("kind".to_string(), MetadataValue::from("cat"));
        let report = SearchReport {
            strategy: "modality_specific".to_string(),
            result: QueryResult {
                ids: vec![vec!["a".to_string(), "b".to_string()], vec![]],
                distances: Some(vec![vec![0.0, 0.5], vec![]]),
                documents: Some(vec![vec![Some("a cat".to_string()), None], vec![]]),
                metadatas: Some(vec![vec![Some(metadata), None], vec![]]),
                embeddings: None,
            },
        };

        let text = report.render_human();
        assert!(text.contains("1. a (distance: 0.0000)"));
        assert!(text.contains("2. b (distance: 0.5000)"));
        assert!(text.contains("document: a cat"));
        assert!(text.contains("metadata: kind=cat"));
        assert!(text.contains("Query 1:\n  (no matches)"));
    }

    #[test]
    fn test_render_json() {
        let report = ValidationReport {
            expression: "where",
            valid: true,
            value: json!({"age": {"$gt": 5}}),
        };
        let compact = render_json(&report, false).unwrap();
        assert_eq!(
            compact,
            r#"{"expression":"where","valid":true,"value":{"age":{"$gt":5}}}"#
        );
        assert!(render_json(&report, true).unwrap().contains('\n'));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }
}
