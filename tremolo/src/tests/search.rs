use crate::dictionary::{Dictionary, DictionaryBuilder};
use crate::searcher::{Match, Query, Searcher};

const DICT_TSV: &str = include_str!("./resources/dict.tsv");

fn build(text: &str) -> Dictionary {
    DictionaryBuilder::new()
        .build_from_reader(text.as_bytes())
        .unwrap()
}

fn lowercase_searcher(dict: &Dictionary) -> Searcher {
    let mut searcher = Searcher::new(dict);
    searcher
        .set_char_table(b"abcdefghijklmnopqrstuvwxyz")
        .unwrap();
    searcher
}

fn hits<'a>(results: &[Match<'a>]) -> Vec<(&'a [u8], &'a [u8], u32, u32)> {
    results
        .iter()
        .map(|m| (m.dword, m.value, m.start_pos, m.common_len))
        .collect()
}

#[test]
fn test_substring_search() {
    let dict = build("hello\tH\nworld\tW\nhelicopter\tC\n");
    let searcher = lowercase_searcher(&dict);
    let mut results = vec![];
    let query = Query {
        min_common_len: 3,
        max_dword_len: 20,
        limit: 10,
        ..Query::new(b"help")
    };
    assert_eq!(searcher.search(&query, &mut results), 2);
    assert_eq!(
        hits(&results),
        vec![
            (&b"helicopter"[..], &b"C"[..], 0, 3),
            (&b"hello"[..], &b"H"[..], 0, 3),
        ]
    );
}

#[test]
fn test_full_word_match() {
    let dict = build("hello\tH\nworld\tW\nhelicopter\tC\n");
    let searcher = lowercase_searcher(&dict);
    let mut results = vec![];
    let query = Query {
        min_common_len: 5,
        max_dword_len: 20,
        limit: 10,
        ..Query::new(b"world")
    };
    assert_eq!(searcher.search(&query, &mut results), 1);
    assert_eq!(hits(&results), vec![(&b"world"[..], &b"W"[..], 0, 5)]);
}

#[test]
fn test_no_match() {
    let dict = build("hello\tH\nworld\tW\nhelicopter\tC\n");
    let searcher = lowercase_searcher(&dict);
    let mut results = vec![];
    let query = Query {
        min_common_len: 2,
        max_dword_len: 20,
        limit: 10,
        ..Query::new(b"xyz")
    };
    assert_eq!(searcher.search(&query, &mut results), 0);
    assert!(results.is_empty());
}

#[test]
fn test_prefix_covered_words() {
    // "youthful" is a strict prefix of the other two words, so its leaf
    // hangs off an end-of-key child inside their shared path.
    let dict = build("youthful\t1\nyouthfully\t2\nyouthfulness\t3\n");
    let searcher = lowercase_searcher(&dict);
    let mut results = vec![];
    let query = Query {
        min_common_len: 4,
        max_dword_len: 12,
        limit: 10,
        ..Query::new(b"youthe")
    };
    assert_eq!(searcher.search(&query, &mut results), 6);
    assert_eq!(
        hits(&results),
        vec![
            // The "youth" pass matches five bytes of every word...
            (&b"youthful"[..], &b"1"[..], 0, 5),
            (&b"youthfully"[..], &b"2"[..], 0, 5),
            (&b"youthfulness"[..], &b"3"[..], 0, 5),
            // ...and the "outh" pass matches four, one position in.
            (&b"youthful"[..], &b"1"[..], 1, 4),
            (&b"youthfully"[..], &b"2"[..], 1, 4),
            (&b"youthfulness"[..], &b"3"[..], 1, 4),
        ]
    );
}

#[test]
fn test_inner_substring_positions() {
    let dict = build("abcdef\t1\nzzabcd\t2\n");
    let searcher = lowercase_searcher(&dict);
    let mut results = vec![];
    let query = Query {
        min_common_len: 4,
        max_dword_len: 20,
        limit: 10,
        ..Query::new(b"abcd")
    };
    assert_eq!(searcher.search(&query, &mut results), 2);
    assert_eq!(
        hits(&results),
        vec![
            (&b"zzabcd"[..], &b"2"[..], 2, 4),
            (&b"abcdef"[..], &b"1"[..], 0, 4),
        ]
    );
}

#[test]
fn test_search_after_reload() {
    let dict = build("hello\tH\nworld\tW\nhelicopter\tC\n");
    let mut data = vec![];
    dict.write(&mut data).unwrap();
    let reloaded = Dictionary::read(data.as_slice()).unwrap();

    let query = Query {
        min_common_len: 3,
        max_dword_len: 20,
        limit: 10,
        ..Query::new(b"help")
    };
    let mut expected = vec![];
    lowercase_searcher(&dict).search(&query, &mut expected);
    let mut results = vec![];
    lowercase_searcher(&reloaded).search(&query, &mut results);
    assert_eq!(hits(&results), hits(&expected));
    assert_eq!(results.len(), 2);
}

#[test]
fn test_com_prefix_only() {
    let dict = build("hello\tH\nworld\tW\nhelicopter\tC\n");
    let searcher = lowercase_searcher(&dict);
    let mut results = vec![];

    let query = Query {
        min_common_len: 3,
        max_dword_len: 20,
        limit: 10,
        com_prefix_only: true,
        ..Query::new(b"ello")
    };
    assert_eq!(searcher.search(&query, &mut results), 1);
    assert_eq!(hits(&results), vec![(&b"hello"[..], &b"H"[..], 1, 4)]);

    let query = Query {
        com_prefix_only: false,
        ..query
    };
    assert_eq!(searcher.search(&query, &mut results), 2);
    assert_eq!(
        hits(&results),
        vec![
            (&b"hello"[..], &b"H"[..], 1, 4),
            (&b"hello"[..], &b"H"[..], 2, 3),
        ]
    );
}

#[test]
fn test_limit() {
    let dict = build("hello\tH\nworld\tW\nhelicopter\tC\n");
    let searcher = lowercase_searcher(&dict);
    let mut results = vec![];
    let query = Query {
        min_common_len: 3,
        max_dword_len: 20,
        limit: 1,
        ..Query::new(b"help")
    };
    assert_eq!(searcher.search(&query, &mut results), 1);
    assert_eq!(hits(&results), vec![(&b"helicopter"[..], &b"C"[..], 0, 3)]);
}

#[test]
fn test_average_limit() {
    let dict = build("youthful\t1\nyouthfully\t2\nyouthfulness\t3\n");
    let searcher = lowercase_searcher(&dict);
    let mut results = vec![];

    // One global budget: the first match position fills it.
    let query = Query {
        min_common_len: 4,
        max_dword_len: 12,
        limit: 3,
        ..Query::new(b"youthe")
    };
    assert_eq!(searcher.search(&query, &mut results), 3);
    assert!(results.iter().all(|m| m.common_len == 5));

    // One budget per match position: the "outh" pass adds its own three.
    let query = Query {
        average_limit: true,
        ..query
    };
    assert_eq!(searcher.search(&query, &mut results), 6);
}

#[test]
fn test_dword_length_window() {
    let dict = build("hello\tH\nworld\tW\nhelicopter\tC\n");
    let searcher = lowercase_searcher(&dict);
    let mut results = vec![];

    let query = Query {
        min_common_len: 3,
        max_dword_len: 5,
        limit: 10,
        ..Query::new(b"help")
    };
    assert_eq!(searcher.search(&query, &mut results), 1);
    assert_eq!(hits(&results), vec![(&b"hello"[..], &b"H"[..], 0, 3)]);

    let query = Query {
        min_dword_len: 6,
        max_dword_len: 20,
        ..query
    };
    assert_eq!(searcher.search(&query, &mut results), 1);
    assert_eq!(hits(&results), vec![(&b"helicopter"[..], &b"C"[..], 0, 3)]);
}

#[test]
fn test_length_frontier() {
    // At the max_dword_len frontier only the end-of-key child may be taken,
    // so the maximal-length word is reached and its extensions are not.
    let dict = build("youthful\t1\nyouthfully\t2\nyouthfulness\t3\n");
    let searcher = lowercase_searcher(&dict);
    let mut results = vec![];
    let query = Query {
        min_common_len: 8,
        max_dword_len: 8,
        limit: 10,
        ..Query::new(b"youthful")
    };
    assert_eq!(searcher.search(&query, &mut results), 1);
    assert_eq!(hits(&results), vec![(&b"youthful"[..], &b"1"[..], 0, 8)]);
}

#[test]
fn test_bfs_dfs_same_result_set() {
    let dict = build(DICT_TSV);
    let searcher = lowercase_searcher(&dict);
    let mut bfs = vec![];
    let mut dfs = vec![];
    for word in [&b"low"[..], b"cat", b"appl", b"youthful", b"wor"] {
        let query = Query {
            min_common_len: 3,
            ..Query::new(word)
        };
        searcher.search(&query, &mut bfs);
        let query = Query {
            depth_first_search: true,
            ..query
        };
        searcher.search(&query, &mut dfs);

        assert!(!bfs.is_empty(), "no results for {:?}", word);
        let mut bfs = hits(&bfs);
        let mut dfs = hits(&dfs);
        bfs.sort_unstable();
        dfs.sort_unstable();
        assert_eq!(bfs, dfs, "result sets differ for {:?}", word);
    }
}

#[test]
fn test_deterministic_order() {
    let dict = build(DICT_TSV);
    let searcher = lowercase_searcher(&dict);
    let query = Query {
        min_common_len: 3,
        ..Query::new(b"flower")
    };
    let mut first = vec![];
    searcher.search(&query, &mut first);
    let mut second = vec![];
    lowercase_searcher(&dict).search(&query, &mut second);
    assert!(!first.is_empty());
    assert_eq!(hits(&first), hits(&second));
}

#[test]
fn test_suffix_coverage() {
    // Any substring of a word that is long enough to be a prefix of one of
    // the word's indexed suffixes must retrieve the word.
    let dict = build(DICT_TSV);
    let searcher = lowercase_searcher(&dict);
    let min_common_len = 3u32;
    let mut results = vec![];
    for line in DICT_TSV.lines() {
        let word = line.split('\t').next().unwrap().as_bytes();
        let len = word.len() as u32;
        let min_suffix_len = ((f64::from(len) * dict.suffix_ratio()) as u32)
            .max(dict.min_suffix());
        for pos in 0..word.len() {
            if len - (pos as u32) < min_suffix_len {
                continue;
            }
            let shortest = min_common_len.max(min_suffix_len) as usize;
            for sub_len in shortest..=word.len() - pos {
                let substring = &word[pos..pos + sub_len];
                let query = Query {
                    min_common_len,
                    ..Query::new(substring)
                };
                searcher.search(&query, &mut results);
                assert!(
                    results.iter().any(|m| m.dword == word),
                    "query {:?} does not retrieve {:?}",
                    String::from_utf8_lossy(substring),
                    String::from_utf8_lossy(word),
                );
            }
        }
    }
}

#[test]
fn test_results_are_sound() {
    // Every hit points back into the dictionary, within bounds, and meets
    // the query constraints.
    let dict = build(DICT_TSV);
    let searcher = lowercase_searcher(&dict);
    let mut results = vec![];
    for word in [&b"catalog"[..], b"slower", b"youthfulness", b"swordfish"] {
        let query = Query {
            min_common_len: 3,
            min_dword_len: 4,
            max_dword_len: 11,
            ..Query::new(word)
        };
        searcher.search(&query, &mut results);
        for m in &results {
            let start = m.start_pos as usize;
            let end = start + m.common_len as usize;
            assert!(end <= m.dword.len());
            assert!(m.common_len >= 3);
            assert!((4..=11).contains(&(m.dword.len() as u32)));
            // The common substring occurs somewhere in the query word.
            let sub = &m.dword[start..end];
            assert!(
                word.windows(sub.len()).any(|w| w == sub),
                "{:?} not in {:?}",
                String::from_utf8_lossy(sub),
                String::from_utf8_lossy(word),
            );
        }
    }
}
