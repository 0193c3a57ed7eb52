use super::*;

fn rejoin(text: &str, size: usize) -> String {
    chunk_text(text, size).map(|c| c.text).collect()
}

#[test]
fn test_chunks_rejoin_to_input() {
    let samples = [
        "",
        "a",
        "<div id=\"search\">results</div>",
        "héllo wörld ✓ 日本語テキスト",
        &"x".repeat(10_001),
    ];
    for text in samples {
        for size in [1, 2, 3, 7, 64, 15_000] {
            assert_eq!(rejoin(text, size), text, "size {size}");
        }
    }
}

#[test]
fn test_chunk_labels_are_one_based_with_total() {
    let chunks: Vec<_> = chunk_text("abcdefg", 3).collect();
    assert_eq!(chunks.len(), 3);
    assert_eq!(
        chunks.iter().map(|c| (c.index, c.total)).collect::<Vec<_>>(),
        vec![(1, 3), (2, 3), (3, 3)]
    );
    assert_eq!(chunks[2].text, "g");
}

#[test]
fn test_no_chunk_exceeds_budget() {
    let text = "ü".repeat(100);
    for chunk in chunk_text(&text, 30) {
        assert!(chunk.text.chars().count() <= 30);
    }
}

#[test]
fn test_empty_text_has_no_chunks() {
    assert_eq!(chunk_text("", 10).count(), 0);
    assert_eq!(chunk_text("", 10).len(), 0);
}

#[test]
fn test_exact_multiple_has_no_trailing_empty_chunk() {
    let chunks: Vec<_> = chunk_text("abcdef", 3).collect();
    assert_eq!(chunks.len(), 2);
    assert!(chunks.iter().all(|c| !c.text.is_empty()));
}

#[test]
fn test_zero_budget_is_treated_as_one() {
    assert_eq!(chunk_text("abc", 0).count(), 3);
}

#[test]
fn test_restartable() {
    let text = "0123456789";
    let first: Vec<_> = chunk_text(text, 4).collect();
    let second: Vec<_> = chunk_text(text, 4).collect();
    assert_eq!(first, second);
}

#[test]
fn test_display_label() {
    let chunk = chunk_text("body", 100).next().unwrap();
    assert_eq!(chunk.to_string(), "### DOM CHUNK 1/1\nbody");
}

#[test]
fn test_exact_size_tracks_progress() {
    let mut chunks = chunk_text("abcdefg", 2);
    assert_eq!(chunks.len(), 4);
    chunks.next();
    assert_eq!(chunks.len(), 3);
}
