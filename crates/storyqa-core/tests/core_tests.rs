use std::fs;
use tempfile::TempDir;

use storyqa_core::chunker::{reconstruct, Chunker, ChunkingConfig};
use storyqa_core::config::Config;
use storyqa_core::types::{Category, DocumentId};

fn sample_text(words: usize) -> String {
    (0..words).map(|i| format!("word{} ", i % 97)).collect()
}

#[test]
fn chunks_cover_text_and_share_constant_overlap() {
    let text = sample_text(1500);
    for (chunk_size, overlap) in [(2000, 500), (100, 1), (64, 63), (7, 3)] {
        let chunker = Chunker::new(ChunkingConfig { chunk_size, overlap }).expect("config");
        let chunks = chunker.split(&text);
        assert_eq!(reconstruct(&chunks), text, "size={chunk_size} overlap={overlap}");

        let (last, body) = chunks.split_last().expect("non-empty");
        for c in body {
            assert_eq!(c.char_len(), chunk_size);
        }
        assert!(last.char_len() <= chunk_size);
        for pair in chunks.windows(2) {
            let prev: Vec<char> = pair[0].text.chars().collect();
            let next: Vec<char> = pair[1].text.chars().collect();
            assert_eq!(prev[prev.len() - overlap..], next[..overlap]);
            assert_eq!(pair[1].sequence_index, pair[0].sequence_index + 1);
        }
    }
}

#[test]
fn config_defaults_without_files() {
    let tmp = TempDir::new().unwrap();
    let settings = Config::load_from(tmp.path(), "test").unwrap().settings().unwrap();
    assert_eq!(settings.chunking, ChunkingConfig { chunk_size: 2000, overlap: 500 });
    assert_eq!(settings.retrieval.top_k, 4);
    assert_eq!(settings.retrieval.build_timeout(), None);
}

#[test]
fn config_env_overlay_wins_over_base_file() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("storyqa.toml"),
        "[chunking]\nchunk_size = 1000\noverlap = 100\n[retrieval]\ntop_k = 6\n",
    )
    .unwrap();
    fs::write(tmp.path().join("storyqa.test.toml"), "[retrieval]\ntop_k = 2\nbuild_timeout_secs = 30\n").unwrap();

    let config = Config::load_from(tmp.path(), "test").unwrap();
    let settings = config.settings().unwrap();
    assert_eq!(settings.chunking.chunk_size, 1000);
    assert_eq!(settings.chunking.overlap, 100);
    assert_eq!(settings.retrieval.top_k, 2);
    assert_eq!(settings.retrieval.build_timeout_secs, Some(30));
    assert_eq!(config.get::<usize>("chunking.chunk_size").unwrap(), 1000);
    assert_eq!(settings.library_root(tmp.path()), tmp.path().join("library"));
}

#[test]
fn config_rejects_overlap_not_below_chunk_size() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("storyqa.toml"), "[chunking]\nchunk_size = 100\noverlap = 100\n").unwrap();
    assert!(Config::load_from(tmp.path(), "test").unwrap().settings().is_err());
}

#[test]
fn document_ids_display_and_serialize() {
    let id = DocumentId::new(Category::Movie, "Alien");
    assert_eq!(id.to_string(), "movie/Alien");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, r#"{"category":"movie","title":"Alien"}"#);
    assert_eq!("Books".parse::<Category>().unwrap(), Category::Book);
    assert!("poem".parse::<Category>().is_err());
}

#[test]
fn config_rejects_unknown_device() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("storyqa.toml"), "[embedding]\ndevice = \"tpu\"\n").unwrap();
    let err = Config::load_from(tmp.path(), "test").unwrap().settings().unwrap_err();
    assert!(err.to_string().contains("embedding.device"), "{err}");
}
