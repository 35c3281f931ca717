use std::collections::BTreeMap;
use std::sync::Arc;

use pegasus::config::{EmbeddingConfig, SearchConfig};
use pegasus::embedding::{Embedder, EmbeddingDispatcher, PrecomputedEmbedder, RawInput};
use pegasus::error::Result;
use pegasus::index::IndexSnapshot;
use pegasus::search::{FusionMode, QueryEmbeddings, QueryRequest, RetrievalEngine, SearchStrategy};
use pegasus::types::Modality;

fn table() -> Result<PrecomputedEmbedder> {
    let mut embedder = PrecomputedEmbedder::new(2);
    for (i, word) in ["cat", "dog", "bird", "fish", "frog", "lion"].iter().enumerate() {
        let angle = i as f32 * 0.25;
        embedder.insert(Modality::Text, *word, vec![angle.cos(), angle.sin()])?;
        embedder.insert(
            Modality::Vision,
            RawInput::Path(format!("{word}.png").into()),
            vec![angle.sin(), angle.cos()],
        )?;
    }
    Ok(embedder)
}

fn words(values: &[&str]) -> Vec<RawInput> {
    values.iter().map(|w| RawInput::from(*w)).collect()
}

#[test]
fn parallel_and_sequential_dispatch_agree() -> Result<()> {
    let embedder: Arc<dyn Embedder> = Arc::new(table()?);
    let inputs = words(&["lion", "cat", "frog", "dog", "fish", "bird", "cat"]);

    let sequential = EmbeddingDispatcher::sequential(Arc::clone(&embedder));
    let parallel = EmbeddingDispatcher::new(
        Arc::clone(&embedder),
        &EmbeddingConfig {
            parallel: true,
            workers: 4,
            cache_enabled: true,
            cache_capacity: 3,
        },
    )?;

    let expected = sequential.embed(Modality::Text, &inputs)?;
    for _ in 0..5 {
        assert_eq!(parallel.embed(Modality::Text, &inputs)?, expected);
    }
    assert_eq!(parallel.cache().map(|c| c.len()), Some(3));
    Ok(())
}

#[test]
fn one_failure_fails_the_whole_batch() -> Result<()> {
    let dispatcher = EmbeddingDispatcher::new(
        Arc::new(table()?),
        &EmbeddingConfig {
            parallel: true,
            workers: 2,
            ..EmbeddingConfig::default()
        },
    )?;

    let err = dispatcher
        .embed(Modality::Text, &words(&["cat", "unicorn", "dog"]))
        .unwrap_err();
    assert_eq!(err.kind(), "Model");
    assert!(err.to_string().contains("text"));
    Ok(())
}

#[test]
fn embedded_queries_drive_fusion_search() -> Result<()> {
    let dispatcher = EmbeddingDispatcher::sequential(Arc::new(table()?));

    let catalog = ["cat", "dog", "bird"];
    let text_vectors = dispatcher.embed(Modality::Text, &words(&catalog))?;
    let image_inputs: Vec<RawInput> = catalog
        .iter()
        .map(|w| RawInput::Path(format!("{w}.png").into()))
        .collect();
    let vision_vectors = dispatcher.embed(Modality::Vision, &image_inputs)?;

    let ids: Vec<String> = catalog.iter().map(|s| s.to_string()).collect();
    let snapshot = IndexSnapshot::builder()
        .slice(Modality::Text, ids.clone(), text_vectors)
        .slice(Modality::Vision, ids, vision_vectors)
        .build()?;

    let query = QueryEmbeddings::PerModality(dispatcher.embed_per_modality(&BTreeMap::from([
        (Modality::Text, words(&["dog"])),
        (Modality::Vision, vec![RawInput::Path("dog.png".into())]),
    ]))?);

    for mode in [FusionMode::Early, FusionMode::Late] {
        let engine = RetrievalEngine::new(SearchConfig::default(), SearchStrategy::fusion(mode));
        let result = engine.query(&snapshot, &QueryRequest::new(query.clone()).with_n_results(1))?;
        assert_eq!(result.ids, vec![vec!["dog"]], "{mode}");
    }
    Ok(())
}
