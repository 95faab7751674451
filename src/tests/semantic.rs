//! End-to-end tests for the index -> persist -> load -> search flow.
//!
//! Most use the deterministic character embedder; the ones touching the
//! real model are marked #[ignore]. Run them with: cargo test -- --ignored

use std::path::Path;

use crate::semantic::{
    ensure_fresh, Embedder, EmbeddingModel, IndexBuilder, IndexStorage, Searcher,
    TextNormalizer, DEFAULT_MODEL,
};
use crate::tests::support::{touch, CharEmbedder};

fn build_and_load<E: Embedder>(
    images: &Path,
    index_dir: &Path,
    embedder: E,
    normalizer: TextNormalizer,
) -> Searcher<E> {
    let storage = IndexStorage::new(index_dir.to_path_buf());
    {
        let builder = IndexBuilder::new(&embedder, &normalizer, &storage);
        assert!(ensure_fresh(images, &builder));
    }
    Searcher::load(&storage, images.to_path_buf(), embedder, normalizer)
        .expect("failed to load searcher")
}

fn zh_normalizer() -> TextNormalizer {
    TextNormalizer::for_variant("zh-cn").unwrap()
}

#[test]
fn test_greeting_ranks_above_farewell() {
    let dir = tempfile::tempdir().unwrap();
    let images = dir.path().join("pict");
    touch(&images, "0001_你好世界.png");
    touch(&images, "0002_再见.png");

    let searcher = build_and_load(&images, dir.path(), CharEmbedder::default(), zh_normalizer());
    let results = searcher.try_search("你好", 6, None).unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].raw_text, "你好世界");
    assert_eq!(results[0].path, images.join("0001_你好世界.png"));
    assert_eq!(results[1].raw_text, "再见");
    assert!(results[0].score > results[1].score);
}

#[test]
fn test_every_caption_finds_itself() {
    let dir = tempfile::tempdir().unwrap();
    let images = dir.path().join("pict");
    let names = [
        "0001_为什么要演奏春日影.png",
        "0002_我是不会道歉的.jpg",
        "ep2/0003_一辈子.gif",
        "ep2/0004-到此为止吧.jpeg",
        "你这个人真是满脑子都只想着自己呢.png",
    ];
    for name in names {
        touch(&images, name);
    }

    let searcher = build_and_load(&images, dir.path(), CharEmbedder::default(), zh_normalizer());
    assert_eq!(searcher.indexed_count(), names.len());

    let storage = IndexStorage::new(dir.path().to_path_buf());
    let metadata = storage.load_metadata().unwrap();
    for (i, text) in metadata.texts.iter().enumerate() {
        let top = &searcher.try_search(text, 1, None).unwrap()[0];
        assert!(top.score >= 0.99, "{text}: score {}", top.score);
        assert_eq!(top.path, images.join(&metadata.paths[i]));
    }
}

#[test]
fn test_traditional_query_matches_simplified_caption() {
    let dir = tempfile::tempdir().unwrap();
    let images = dir.path().join("pict");
    touch(&images, "0001_為什麼要演奏春日影.png");
    touch(&images, "0002_再见.png");

    let searcher = build_and_load(&images, dir.path(), CharEmbedder::default(), zh_normalizer());

    let storage = IndexStorage::new(dir.path().to_path_buf());
    let metadata = storage.load_metadata().unwrap();
    assert_eq!(metadata.raw_texts[0], "為什麼要演奏春日影");
    assert_eq!(metadata.texts[0], "为什么要演奏春日影");

    let top = &searcher.try_search("為什麼要演奏春日影", 1, None).unwrap()[0];
    assert_eq!(top.text, "为什么要演奏春日影");
    assert!(top.score >= 0.99);
}

#[test]
fn test_empty_directory() {
    let dir = tempfile::tempdir().unwrap();
    let images = dir.path().join("pict");
    std::fs::create_dir_all(&images).unwrap();

    let searcher = build_and_load(&images, dir.path(), CharEmbedder::default(), zh_normalizer());

    assert_eq!(searcher.indexed_count(), 0);
    assert!(searcher.try_search("你好", 6, None).unwrap().is_empty());
}

#[test]
fn test_rebuild_picks_up_new_images() {
    let dir = tempfile::tempdir().unwrap();
    let images = dir.path().join("pict");
    touch(&images, "0001_你好世界.png");

    let searcher = build_and_load(&images, dir.path(), CharEmbedder::default(), zh_normalizer());
    assert_eq!(searcher.indexed_count(), 1);

    touch(&images, "0002_再见.png");
    let searcher = build_and_load(&images, dir.path(), CharEmbedder::default(), zh_normalizer());
    assert_eq!(searcher.indexed_count(), 2);

    let top = &searcher.try_search("再见", 1, None).unwrap()[0];
    assert_eq!(top.raw_text, "再见");
}

#[test]
#[ignore = "requires model download (~120MB)"]
fn test_multilingual_model_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let images = dir.path().join("pict");
    touch(&images, "0001_你好世界.png");
    touch(&images, "0002_再见.png");
    touch(&images, "0003_为什么要演奏春日影.png");

    let model = EmbeddingModel::new(DEFAULT_MODEL, dir.path().to_path_buf()).unwrap();
    let searcher = build_and_load(&images, dir.path(), model, zh_normalizer());

    let results = searcher.try_search("你好", 6, None).unwrap();
    let greeting = results.iter().position(|r| r.raw_text == "你好世界").unwrap();
    let farewell = results.iter().position(|r| r.raw_text == "再见").unwrap();
    assert!(greeting < farewell);

    let top = &searcher.try_search("为什么要演奏春日影", 1, None).unwrap()[0];
    assert_eq!(top.raw_text, "为什么要演奏春日影");
    assert!(top.score >= 0.99);
}
