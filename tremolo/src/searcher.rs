//! Common-substring search over a dictionary.

use std::collections::VecDeque;

use crate::dictionary::Dictionary;
use crate::errors::{Result, TremoloError};

/// Maximum number of entries in a char table: every byte value except the
/// end-of-key label `\0`.
const MAX_CHAR_TABLE_LEN: usize = 255;

/// Search query.
///
/// The scalar fields bound the answer set: a hit is a dictionary word whose
/// length lies in `[min_dword_len, max_dword_len]` and which shares a
/// substring of at least `min_common_len` bytes with `word`.
#[derive(Clone, Debug)]
pub struct Query<'a> {
    /// The query word.
    pub word: &'a [u8],
    /// Minimum common substring length required.
    pub min_common_len: u32,
    /// Dictionary words shorter than this length are dropped.
    pub min_dword_len: u32,
    /// Dictionary words longer than this length are dropped.
    pub max_dword_len: u32,
    /// Maximum number of results over the whole call.
    pub limit: usize,
    /// Use depth-first subtree traversal instead of breadth-first.
    pub depth_first_search: bool,
    /// Search for strings with a common prefix only, instead of scanning
    /// every suffix of the query word.
    pub com_prefix_only: bool,
    /// Give each match position its own `limit`-sized result budget instead
    /// of one global budget. Without this, an early position that fills the
    /// budget starves the later ones.
    pub average_limit: bool,
}

impl<'a> Query<'a> {
    /// Creates a query for `word` with unbounded defaults.
    pub const fn new(word: &'a [u8]) -> Self {
        Self {
            word,
            min_common_len: 1,
            min_dword_len: 1,
            max_dword_len: u32::MAX,
            limit: usize::MAX,
            depth_first_search: false,
            com_prefix_only: false,
            average_limit: false,
        }
    }
}

/// A search hit: a dictionary word sharing a common substring with the
/// query word.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub struct Match<'a> {
    /// The dictionary word.
    pub dword: &'a [u8],
    /// The value associated with the word.
    pub value: &'a [u8],
    /// Start position of the common substring within the dictionary word.
    pub start_pos: u32,
    /// Length of the common substring.
    pub common_len: u32,
}

/// Common-substring searcher over a [`Dictionary`].
///
/// For each suffix of the query word, the searcher descends the suffix trie
/// along the longest common prefix, then walks the subtrees under every
/// sufficiently deep node of the descent, gathering the posting lists of the
/// leaves it reaches.
///
/// Searching is read-only: one searcher (or several, over one dictionary)
/// may run queries from multiple threads.
pub struct Searcher<'a> {
    dict: &'a Dictionary,
    char_table: Vec<u8>,
}

impl<'a> Searcher<'a> {
    /// Creates a searcher over the dictionary, with every non-zero byte in
    /// the char table.
    pub fn new(dict: &'a Dictionary) -> Self {
        Self {
            dict,
            char_table: (1..=u8::MAX).collect(),
        }
    }

    /// Returns the current char table.
    pub fn char_table(&self) -> &[u8] {
        &self.char_table
    }

    /// Sets the valid characters and their subtree traversal order.
    ///
    /// The end-of-key label `\0` must not appear in the table: it is always
    /// traversed implicitly, before any table entry.
    ///
    /// # Errors
    ///
    /// [`TremoloError`] is returned when the table contains `\0` or has more
    /// than 255 entries; the previous table is kept in that case.
    pub fn set_char_table(&mut self, char_table: &[u8]) -> Result<()> {
        if char_table.len() > MAX_CHAR_TABLE_LEN {
            return Err(TremoloError::invalid_argument(
                "char_table",
                "char_table must not have more than 255 entries",
            ));
        }
        if char_table.contains(&0) {
            return Err(TremoloError::invalid_argument(
                "char_table",
                "char_table must not contain the end-of-key label \\0",
            ));
        }
        self.char_table = char_table.to_vec();
        Ok(())
    }

    /// Retrieves all dictionary words sharing a common substring with the
    /// query word, appending them to `results`, and returns their number.
    ///
    /// `results` is cleared first. Returns 0 without searching when `limit`
    /// is zero or the query word is shorter than `min_common_len`.
    pub fn search(&self, query: &Query, results: &mut Vec<Match<'a>>) -> usize {
        results.clear();
        if query.limit == 0 || query.word.len() < query.min_common_len as usize {
            return 0;
        }
        let mut num_results = 0;
        if query.com_prefix_only {
            num_results = self.compre_search(query, query.word, query.limit, results);
        } else {
            for i in 0..=query.word.len() - query.min_common_len as usize {
                let limit = if query.average_limit {
                    num_results.saturating_add(query.limit)
                } else {
                    query.limit
                };
                num_results += self.compre_search(query, &query.word[i..], limit, results);
            }
        }
        num_results
    }

    /// Longest-common-prefix descent for one query suffix, followed by
    /// subtree expansion of every matched node deeper than `min_common_len`.
    fn compre_search(
        &self,
        query: &Query,
        word: &[u8],
        limit: usize,
        results: &mut Vec<Match<'a>>,
    ) -> usize {
        if query.min_common_len as usize > word.len()
            || query.min_common_len > query.max_dword_len
        {
            return 0;
        }
        let trie = self.dict.trie();
        let mut cur = trie.root();
        if trie.base(cur) < 0 {
            return 0;
        }

        let mut num_results = 0;
        let mut match_len: u32 = 0;
        let mut backtrack = vec![];

        while (match_len as usize) < word.len() && match_len <= query.max_dword_len {
            let Some(next) = trie.child(cur, word[match_len as usize]) else {
                break;
            };
            cur = next;
            match_len += 1;
            let base = trie.base(cur);
            if base < 0 {
                // A leaf ends the descent; the match may extend into the
                // tail string.
                let offset = base.unsigned_abs();
                let descended = match_len;
                let tail = trie.tail();
                let tail_len = tail.str_len(offset);
                let suffix_len = match_len + tail_len;
                match_len += tail.match_prefix(offset, &word[match_len as usize..]);
                if match_len >= query.min_common_len {
                    let suffixid = tail.read_u32(offset + tail_len + 1);
                    num_results +=
                        self.retrieve_dword(query, limit, match_len, suffixid, suffix_len, results);
                }
                match_len = descended - 1;
                break;
            }
            if match_len >= query.min_common_len {
                backtrack.push(cur);
            }
        }

        // Expand the matched nodes from deepest to shallowest. A node's
        // subtree covers its deeper neighbour's, so that child is skipped.
        let mut except = None;
        while let Some(node) = backtrack.pop() {
            num_results += if query.depth_first_search {
                self.df_traversal(query, limit, node, match_len, except, results)
            } else {
                self.bf_traversal(query, limit, node, match_len, except, results)
            };
            except = Some(node);
            match_len -= 1;
        }
        num_results
    }

    /// Breadth-first subtree walk from `start`, retrieving every leaf whose
    /// suffix length fits the dword length window.
    fn bf_traversal(
        &self,
        query: &Query,
        limit: usize,
        start: u32,
        match_len: u32,
        except: Option<u32>,
        results: &mut Vec<Match<'a>>,
    ) -> usize {
        if match_len > query.max_dword_len || results.len() >= limit {
            return 0;
        }
        let trie = self.dict.trie();
        let mut num_results = 0;
        let mut queue = VecDeque::new();
        queue.push_back((start, match_len));
        while results.len() < limit {
            let Some((node, suffix_len)) = queue.pop_front() else {
                break;
            };
            let base = trie.base(node);
            if base < 0 {
                num_results +=
                    self.retrieve_leaf(query, limit, match_len, base, suffix_len, results);
            } else if suffix_len <= query.max_dword_len {
                for c in self.labels(suffix_len == query.max_dword_len) {
                    let Some(child) = trie.child(node, c) else {
                        continue;
                    };
                    if Some(child) == except {
                        continue;
                    }
                    // The end-of-key label is a structural terminator and
                    // does not lengthen the suffix.
                    let child_len = if c == 0 { suffix_len } else { suffix_len + 1 };
                    queue.push_back((child, child_len));
                }
            }
        }
        num_results
    }

    /// Depth-first variant of [`Self::bf_traversal`]; children are pushed in
    /// reverse so they pop in char-table order.
    fn df_traversal(
        &self,
        query: &Query,
        limit: usize,
        start: u32,
        match_len: u32,
        except: Option<u32>,
        results: &mut Vec<Match<'a>>,
    ) -> usize {
        if match_len > query.max_dword_len || results.len() >= limit {
            return 0;
        }
        let trie = self.dict.trie();
        let mut num_results = 0;
        let mut stack = vec![(start, match_len)];
        while results.len() < limit {
            let Some((node, suffix_len)) = stack.pop() else {
                break;
            };
            let base = trie.base(node);
            if base < 0 {
                num_results +=
                    self.retrieve_leaf(query, limit, match_len, base, suffix_len, results);
            } else if suffix_len <= query.max_dword_len {
                for c in self.labels(suffix_len == query.max_dword_len).rev() {
                    let Some(child) = trie.child(node, c) else {
                        continue;
                    };
                    if Some(child) == except {
                        continue;
                    }
                    let child_len = if c == 0 { suffix_len } else { suffix_len + 1 };
                    stack.push((child, child_len));
                }
            }
        }
        num_results
    }

    /// Child labels in visit order: the end-of-key pseudo-child first, then
    /// the char table. At the length frontier only the end-of-key label is
    /// considered, so maximal-length words stay reachable without consuming
    /// further characters.
    fn labels(&self, frontier: bool) -> impl DoubleEndedIterator<Item = u8> + '_ {
        let table: &[u8] = if frontier { &[] } else { &self.char_table };
        std::iter::once(0).chain(table.iter().copied())
    }

    fn retrieve_leaf(
        &self,
        query: &Query,
        limit: usize,
        match_len: u32,
        base: i32,
        suffix_len: u32,
        results: &mut Vec<Match<'a>>,
    ) -> usize {
        let tail = self.dict.trie().tail();
        let offset = base.unsigned_abs();
        let tail_len = tail.str_len(offset);
        let leaf_suffix_len = suffix_len + tail_len;
        if leaf_suffix_len > query.max_dword_len {
            return 0;
        }
        let suffixid = tail.read_u32(offset + tail_len + 1);
        self.retrieve_dword(query, limit, match_len, suffixid, leaf_suffix_len, results)
    }

    /// Emits the words of one posting list that fit the dword length window.
    fn retrieve_dword(
        &self,
        query: &Query,
        limit: usize,
        match_len: u32,
        suffixid: u32,
        suffix_len: u32,
        results: &mut Vec<Match<'a>>,
    ) -> usize {
        let list = self.dict.posting_list(suffixid);
        if results.len() >= limit {
            return 0;
        }
        // The list is ordered by word length; binary-search the lower bound
        // and stop at the first over-long word.
        let start = list.partition_point(|&id| self.dict.dword(id).size < query.min_dword_len);
        let mut num_results = 0;
        for &dwordid in &list[start..] {
            let entry = self.dict.dword(dwordid);
            if entry.size > query.max_dword_len {
                break;
            }
            debug_assert!(suffix_len <= entry.size);
            results.push(Match {
                dword: self.dict.dword_key(entry),
                value: self.dict.dword_value(entry),
                start_pos: entry.size - suffix_len,
                common_len: match_len,
            });
            num_results += 1;
            if results.len() >= limit {
                break;
            }
        }
        num_results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::DictionaryBuilder;

    #[test]
    fn test_set_char_table() {
        let dict = DictionaryBuilder::new()
            .build_from_reader("ab\t1\n".as_bytes())
            .unwrap();
        let mut searcher = Searcher::new(&dict);
        assert_eq!(searcher.char_table().len(), 255);

        searcher.set_char_table(b"abc").unwrap();
        assert_eq!(searcher.char_table(), b"abc");

        // A rejected table keeps the previous one.
        assert!(searcher.set_char_table(b"ab\0c").is_err());
        assert_eq!(searcher.char_table(), b"abc");

        let too_long = vec![b'a'; 256];
        assert!(searcher.set_char_table(&too_long).is_err());
        assert_eq!(searcher.char_table(), b"abc");
    }

    #[test]
    fn test_bad_args_return_zero() {
        let dict = DictionaryBuilder::new()
            .build_from_reader("hello\tH\n".as_bytes())
            .unwrap();
        let searcher = Searcher::new(&dict);
        let mut results = vec![Match {
            dword: b"stale",
            value: b"",
            start_pos: 0,
            common_len: 0,
        }];

        let query = Query {
            limit: 0,
            ..Query::new(b"hello")
        };
        assert_eq!(searcher.search(&query, &mut results), 0);
        assert!(results.is_empty());

        let query = Query {
            min_common_len: 6,
            ..Query::new(b"hello")
        };
        assert_eq!(searcher.search(&query, &mut results), 0);
        assert!(results.is_empty());
    }

    #[test]
    fn test_empty_dictionary() {
        let dict = DictionaryBuilder::new().build_from_reader(&b""[..]).unwrap();
        let searcher = Searcher::new(&dict);
        let mut results = vec![];
        let query = Query {
            min_common_len: 2,
            ..Query::new(b"hello")
        };
        assert_eq!(searcher.search(&query, &mut results), 0);
        assert!(results.is_empty());
    }
}
