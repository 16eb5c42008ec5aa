use storyqa_core::config::EmbeddingConfig;
use storyqa_embed::{default_embedder, HashingEmbedder};
use storyqa_core::traits::Embedder;

#[test]
fn default_embedder_shapes_and_determinism() {
    let config = EmbeddingConfig { dimension: 128, ..EmbeddingConfig::default() };
    let embedder = default_embedder(&config).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), 128, "embedding dim follows config");
    assert_eq!(embedder.dim(), 128);

    // Norm approximately 1.0
    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    // Deterministic for same input
    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn batch_fails_on_any_overlong_text() {
    let embedder = HashingEmbedder::new(16, 10);
    let texts = vec!["short".to_string(), "this one is far too long".to_string()];
    assert!(embedder.embed_batch(&texts).is_err());
}

#[cfg(not(feature = "model"))]
#[test]
fn model_embedder_requires_feature() {
    let config = EmbeddingConfig { use_fake: false, ..EmbeddingConfig::default() };
    if std::env::var("APP_USE_FAKE_EMBEDDINGS").is_ok() { return; }
    assert!(default_embedder(&config).is_err());
}
