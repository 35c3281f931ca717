//! Command implementations for the Pegasus CLI.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::PegasusConfig;
use crate::embedding::{EmbeddingDispatcher, PrecomputedEmbedder, RawInput};
use crate::error::{PegasusError, Result};
use crate::filter::{validate_include, validate_where, validate_where_document};
use crate::index::IndexSnapshot;
use crate::search::{QueryRequest, RetrievalEngine};
use crate::types::Modality;

/// Execute a CLI command.
pub fn execute_command(args: PegasusArgs) -> Result<()> {
    match &args.command {
        Command::ValidateWhere(cmd) => {
            output_result("Where clause is valid", &validate_where_command(cmd)?, &args)
        }
        Command::ValidateWhereDocument(cmd) => output_result(
            "Where-document clause is valid",
            &validate_where_document_command(cmd)?,
            &args,
        ),
        Command::ValidateInclude(cmd) => {
            output_result("Include list is valid", &validate_include_command(cmd)?, &args)
        }
        Command::Search(cmd) => output_result("Search completed", &search_command(cmd)?, &args),
        Command::Embed(cmd) => output_result("Embedding completed", &embed_command(cmd)?, &args),
        Command::Info(cmd) => output_result("Snapshot statistics", &info_command(cmd)?, &args),
    }
}

pub fn validate_where_command(args: &ValidateExpressionArgs) -> Result<ValidationReport> {
    let value = parse_json_arg("where", &args.expression)?;
    validate_where(&value)?;
    Ok(ValidationReport {
        expression: "where",
        valid: true,
        value,
    })
}

pub fn validate_where_document_command(
    args: &ValidateExpressionArgs,
) -> Result<ValidationReport> {
    let value = parse_json_arg("where_document", &args.expression)?;
    validate_where_document(&value)?;
    Ok(ValidationReport {
        expression: "where_document",
        valid: true,
        value,
    })
}

pub fn validate_include_command(args: &ValidateIncludeArgs) -> Result<IncludeReport> {
    let include = validate_include(&args.items, args.allow_distances)?;
    Ok(IncludeReport {
        include: include.iter().map(|i| i.name().to_string()).collect(),
    })
}

pub fn search_command(args: &SearchArgs) -> Result<SearchReport> {
    let config = load_config(args.config.as_deref())?;
    let snapshot = load_snapshot(&args.snapshot_file)?;

    let content = std::fs::read_to_string(&args.query_file)?;
    let mut request: QueryRequest = serde_json::from_str(&content)?;
    if let Some(n_results) = args.n_results {
        request.n_results = Some(n_results);
    }
    if let Some(expression) = &args.where_clause {
        request.where_clause = Some(parse_json_arg("where", expression)?);
    }
    if let Some(expression) = &args.where_document {
        request.where_document = Some(parse_json_arg("where_document", expression)?);
    }
    if let Some(include) = &args.include {
        request.include = Some(include.clone());
    }

    let parameter = args.strategy_parameter().ok_or_else(|| {
        PegasusError::invalid_argument(format!(
            "--modality is required for the {} strategy",
            args.strategy.name()
        ))
    })?;
    let engine = RetrievalEngine::from_names(config.search, args.strategy.name(), parameter)?;
    let result = engine.query(&snapshot, &request)?;

    Ok(SearchReport {
        strategy: engine.strategy().name().to_string(),
        result,
    })
}

pub fn embed_command(args: &EmbedArgs) -> Result<EmbedReport> {
    let config = load_config(args.config.as_deref())?;
    let modality: Modality = args.modality.parse()?;
    let embedder = Arc::new(PrecomputedEmbedder::from_file(&args.table_file)?);
    let dispatcher = EmbeddingDispatcher::new(embedder, &config.embedding)?;

    let inputs: Vec<RawInput> = args.inputs.iter().map(|t| RawInput::from(t.as_str())).collect();
    let embeddings = dispatcher.embed(modality, &inputs)?;

    Ok(EmbedReport {
        embedder: dispatcher.embedder().name().to_string(),
        modality: modality.name().to_string(),
        dimension: dispatcher.embedder().dimension(),
        embeddings,
        cache: dispatcher.cache().map(|c| c.stats()),
    })
}

pub fn info_command(args: &InfoArgs) -> Result<InfoReport> {
    let snapshot = load_snapshot(&args.snapshot_file)?;
    let modalities = snapshot
        .modalities()
        .filter_map(|m| {
            snapshot
                .index_metadata(m)
                .ok()
                .map(|meta| (m.name().to_string(), meta))
        })
        .collect();
    Ok(InfoReport { modalities })
}

fn load_config(path: Option<&Path>) -> Result<PegasusConfig> {
    match path {
        Some(path) => PegasusConfig::load(path),
        None => PegasusConfig::from_env(),
    }
}

fn load_snapshot(path: &Path) -> Result<IndexSnapshot> {
    let content = std::fs::read_to_string(path)?;
    let snapshot: IndexSnapshot = serde_json::from_str(&content)?;
    log::info!("loaded snapshot from {}", path.display());
    Ok(snapshot)
}

fn parse_json_arg(name: &str, text: &str) -> Result<Value> {
    serde_json::from_str(text)
        .map_err(|e| PegasusError::invalid_argument(format!("{name} is not valid JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn json_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn snapshot_file() -> NamedTempFile {
        json_file(
            r#"{
                "modalities": {
                    "vision": {"ids": ["a", "b", "c"], "embeddings": [[1, 0], [0, 1], [1, 1]]},
                    "text": {"ids": ["a", "b"], "embeddings": [[1, 0], [0, 1]]}
                },
                "metadatas": {"a": {"kind": "cat"}, "c": {"kind": "cat"}},
                "documents": {"a": "a tabby cat"}
            }"#,
        )
    }

    fn search_args(snapshot: &NamedTempFile, query: &NamedTempFile) -> SearchArgs {
        SearchArgs {
            snapshot_file: snapshot.path().to_path_buf(),
            query_file: query.path().to_path_buf(),
            strategy: StrategyKind::Modality,
            modality: Some("vision".to_string()),
            fusion: "late".to_string(),
            n_results: None,
            where_clause: None,
            where_document: None,
            include: None,
            config: None,
        }
    }

    #[test]
    fn test_validate_commands() {
        let report = validate_where_command(&ValidateExpressionArgs {
            expression: r#"{"age": {"$gt": 5}}"#.to_string(),
        })
        .unwrap();
        assert!(report.valid);

        let err = validate_where_command(&ValidateExpressionArgs {
            expression: r#"{"$and": [{"age": {"$gt": 5}}]}"#.to_string(),
        })
        .unwrap_err();
        assert_eq!(err.kind(), "SchemaError");

        let err = validate_where_document_command(&ValidateExpressionArgs {
            expression: "{not json".to_string(),
        })
        .unwrap_err();
        assert_eq!(err.kind(), "InvalidArgument");

        let report = validate_include_command(&ValidateIncludeArgs {
            items: vec!["metadatas".to_string(), "distances".to_string()],
            allow_distances: true,
        })
        .unwrap();
        assert_eq!(report.include, vec!["metadatas", "distances"]);
    }

    #[test]
    fn test_search_command() {
        let snapshot = snapshot_file();
        let query = json_file(r#"{"query_embeddings": [[1.0, 0.0]]}"#);

        let report = search_command(&search_args(&snapshot, &query)).unwrap();
        assert_eq!(report.strategy, "modality_specific");
        assert_eq!(report.result.ids, vec![vec!["a", "c", "b"]]);
    }

    #[test]
    fn test_search_command_overrides() {
        let snapshot = snapshot_file();
        let query = json_file(r#"{"query_embeddings": [[0.0, 1.0]], "n_results": 10}"#);

        let mut args = search_args(&snapshot, &query);
        args.where_clause = Some(r#"{"kind": "cat"}"#.to_string());
        args.n_results = Some(1);
        args.include = Some(vec!["distances".to_string()]);

        let report = search_command(&args).unwrap();
        assert_eq!(report.result.ids, vec![vec!["c"]]);
        assert!(report.result.metadatas.is_none());
        assert!(report.result.distances.is_some());
    }

    #[test]
    fn test_search_command_needs_modality() {
        let snapshot = snapshot_file();
        let query = json_file(r#"{"query_embeddings": [[1.0, 0.0]]}"#);
        let mut args = search_args(&snapshot, &query);
        args.modality = None;
        let err = search_command(&args).unwrap_err();
        assert_eq!(err.kind(), "InvalidArgument");
    }

    #[test]
    fn test_embed_command() {
        let table = json_file(
            r#"{"dimension": 2, "entries": [
                {"modality": "text", "input": {"text": "cat"}, "embedding": [1.0, 0.0]},
                {"modality": "text", "input": {"text": "dog"}, "embedding": [0.0, 1.0]}
            ]}"#,
        );
        let report = embed_command(&EmbedArgs {
            table_file: table.path().to_path_buf(),
            modality: "text".to_string(),
            inputs: vec!["dog".to_string(), "cat".to_string()],
            config: None,
        })
        .unwrap();
        assert_eq!(report.embeddings, vec![vec![0.0, 1.0], vec![1.0, 0.0]]);
        assert_eq!(report.embedder, "precomputed");
    }

    #[test]
    fn test_info_command() {
        let snapshot = snapshot_file();
        let report = info_command(&InfoArgs {
            snapshot_file: snapshot.path().to_path_buf(),
        })
        .unwrap();
        assert_eq!(report.modalities["vision"].elements, 3);
        assert_eq!(report.modalities["text"].dimensionality, 2);
    }
}
