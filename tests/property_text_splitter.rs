//! Property-based tests for the recursive text splitter.

use aide::domain::models::ChunkingConfig;
use aide::services::RecursiveTextSplitter;
use proptest::prelude::*;

/// (chunk_size, chunk_overlap) with overlap strictly below size.
fn size_and_overlap() -> impl Strategy<Value = (usize, usize)> {
    (1usize..200).prop_flat_map(|size| (Just(size), 0..size))
}

/// Words (ASCII and multibyte) of varying length joined by spaces, newlines,
/// blank lines and sentence breaks. Some words are longer than small chunk sizes.
fn document() -> impl Strategy<Value = String> {
    let word = prop_oneof![
        3 => "[a-z]{1,40}",
        1 => "[a-zé漢🙂]{1,20}",
    ];
    let gap = prop_oneof![
        6 => Just(" ".to_string()),
        2 => Just("\n".to_string()),
        1 => Just("\n\n".to_string()),
        1 => Just("  ".to_string()),
        2 => Just(". ".to_string()),
        1 => Just(".".to_string()),
    ];
    prop::collection::vec((word, gap), 1..120).prop_map(|parts| {
        parts
            .into_iter()
            .map(|(w, g)| format!("{w}{g}"))
            .collect::<String>()
    })
}

fn splitter(size: usize, overlap: usize) -> RecursiveTextSplitter {
    RecursiveTextSplitter::new(ChunkingConfig::new(size, overlap)).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_chunks_are_bounded_nonempty_substrings(
        (size, overlap) in size_and_overlap(),
        text in document(),
    ) {
        let splitter = splitter(size, overlap);
        let ranges = splitter.split_with_offsets(&text);
        prop_assert!(!ranges.is_empty());

        for range in &ranges {
            let chunk = &text[range.clone()];
            prop_assert!(!chunk.is_empty());
            prop_assert_eq!(chunk, chunk.trim());
            prop_assert!(chunk.chars().count() <= size, "chunk of {} chars exceeds {}", chunk.chars().count(), size);
        }
    }

    #[test]
    fn prop_chunk_ends_strictly_increase(
        (size, overlap) in size_and_overlap(),
        text in document(),
    ) {
        let ranges = splitter(size, overlap).split_with_offsets(&text);
        for pair in ranges.windows(2) {
            prop_assert!(pair[0].end < pair[1].end);
            prop_assert!(pair[0].start <= pair[1].start);
        }
    }

    #[test]
    fn prop_consecutive_overlap_is_bounded(
        (size, overlap) in size_and_overlap(),
        text in document(),
    ) {
        let ranges = splitter(size, overlap).split_with_offsets(&text);
        for pair in ranges.windows(2) {
            let shared = if pair[1].start < pair[0].end {
                text[pair[1].start..pair[0].end].chars().count()
            } else {
                0
            };
            prop_assert!(shared <= overlap, "overlap of {} chars exceeds {}", shared, overlap);
        }
    }

    #[test]
    fn prop_every_non_whitespace_character_is_covered(
        (size, overlap) in size_and_overlap(),
        text in document(),
    ) {
        let ranges = splitter(size, overlap).split_with_offsets(&text);
        for (offset, ch) in text.char_indices().filter(|(_, c)| !c.is_whitespace()) {
            prop_assert!(
                ranges.iter().any(|r| r.contains(&offset)),
                "character {:?} at {} not in any chunk", ch, offset
            );
        }
    }

    #[test]
    fn prop_create_chunks_matches_offsets(
        (size, overlap) in size_and_overlap(),
        text in document(),
    ) {
        let splitter = splitter(size, overlap);
        let chunks = splitter.create_chunks(&text, "doc-1");
        let texts = splitter.split_text(&text);
        prop_assert_eq!(chunks.len(), texts.len());

        for (index, (chunk, content)) in chunks.iter().zip(&texts).enumerate() {
            prop_assert_eq!(chunk.chunk_index, index);
            prop_assert_eq!(&chunk.document_id, "doc-1");
            prop_assert_eq!(&chunk.content, content);
            prop_assert_eq!(&text[chunk.start_offset..chunk.end_offset], content.as_str());
        }
    }

    #[test]
    fn prop_punctuation_only_text_is_kept(
        (size, overlap) in size_and_overlap(),
        text in "[. \n]{1,80}",
    ) {
        prop_assume!(text.contains('.'));
        let chunks = splitter(size, overlap).split_text(&text);
        prop_assert!(!chunks.is_empty());
        let kept: usize = chunks.iter().map(|c| c.matches('.').count()).sum();
        prop_assert!(kept >= text.matches('.').count());
    }

    #[test]
    fn prop_whitespace_only_yields_nothing(text in "[ \n\t]{0,300}", (size, overlap) in size_and_overlap()) {
        prop_assert!(splitter(size, overlap).split_text(&text).is_empty());
    }

    #[test]
    fn prop_multibyte_text_never_splits_a_char(
        (size, overlap) in size_and_overlap(),
        text in "[a-zé漢🙂 ]{1,400}",
    ) {
        // Slicing on a non-boundary would panic inside split_text.
        for chunk in splitter(size, overlap).split_text(&text) {
            prop_assert!(chunk.chars().count() <= size);
        }
    }
}
