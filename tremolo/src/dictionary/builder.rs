use std::io::{BufRead, BufReader, Read};

use hashbrown::HashSet;

use crate::dictionary::trie::builder::TrieBuilder;
use crate::dictionary::{
    Dictionary, DwordEntry, ListHeader, DEFAULT_MIN_SUFFIX, DEFAULT_SUFFIX_RATIO,
};
use crate::errors::{Result, TremoloError};

/// Builder of [`Dictionary`] from a dictionary text.
///
/// The input is one record per line in the form `key<TAB>value`; whatever
/// bytes follow the first TAB up to the end of line are stored verbatim as
/// the value. Lines without a TAB are silently discarded.
///
/// Every word is expanded into its suffixes of length at least
/// `max(floor(suffix_ratio * word_len), min_suffix)`; the suffixes are
/// deduplicated across words and indexed in a double-array trie, each one
/// mapping to the list of words that end with it.
pub struct DictionaryBuilder {
    suffix_ratio: f64,
    min_suffix: u32,
}

impl DictionaryBuilder {
    /// Creates a builder with the default parameters.
    pub const fn new() -> Self {
        Self {
            suffix_ratio: DEFAULT_SUFFIX_RATIO,
            min_suffix: DEFAULT_MIN_SUFFIX,
        }
    }

    /// Sets the minimum indexed suffix length as a ratio of the word length,
    /// controlling the size of the suffix trie.
    ///
    /// # Errors
    ///
    /// [`TremoloError`] is returned when `suffix_ratio` is outside `(0, 1]`.
    pub fn suffix_ratio(mut self, suffix_ratio: f64) -> Result<Self> {
        if !(0.0 < suffix_ratio && suffix_ratio <= 1.0) {
            return Err(TremoloError::invalid_argument(
                "suffix_ratio",
                "suffix_ratio must be in (0, 1]",
            ));
        }
        self.suffix_ratio = suffix_ratio;
        Ok(self)
    }

    /// Sets the global minimum indexed suffix length.
    ///
    /// # Errors
    ///
    /// [`TremoloError`] is returned when `min_suffix` is zero.
    pub fn min_suffix(mut self, min_suffix: u32) -> Result<Self> {
        if min_suffix == 0 {
            return Err(TremoloError::invalid_argument(
                "min_suffix",
                "min_suffix must not be zero",
            ));
        }
        self.min_suffix = min_suffix;
        Ok(self)
    }

    /// Builds a new [`Dictionary`] from a dictionary text.
    ///
    /// # Errors
    ///
    /// [`TremoloError`] is returned when the reader fails, when the text
    /// contains duplicate keys, or when a pool outgrows its 32-bit address
    /// space.
    pub fn build_from_reader<R>(self, rdr: R) -> Result<Dictionary>
    where
        R: Read,
    {
        let mut rdr = BufReader::new(rdr);
        let mut dword_pool = vec![];
        let mut dwords = vec![];
        let mut line = vec![];
        loop {
            line.clear();
            if rdr.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            if line.last() == Some(&b'\n') {
                line.pop();
            }
            let Some(key_len) = line.iter().position(|&b| b == b'\t') else {
                continue;
            };
            let offset = u32::try_from(dword_pool.len()).map_err(|_| pool_overflow())?;
            dword_pool.extend_from_slice(&line[..key_len]);
            dword_pool.push(0);
            dword_pool.extend_from_slice(&line[key_len + 1..]);
            dword_pool.push(0);
            dwords.push(DwordEntry {
                offset,
                size: u32::try_from(key_len).map_err(|_| pool_overflow())?,
            });
        }
        u32::try_from(dword_pool.len()).map_err(|_| pool_overflow())?;

        let mut seen = HashSet::with_capacity(dwords.len());
        for e in &dwords {
            if !seen.insert(&dword_pool[e.offset as usize..][..e.size as usize]) {
                return Err(TremoloError::invalid_argument(
                    "rdr",
                    format!(
                        "duplicate dictionary key: {:?}",
                        String::from_utf8_lossy(
                            &dword_pool[e.offset as usize..][..e.size as usize]
                        )
                    ),
                ));
            }
        }
        drop(seen);

        // The word array is length-ordered; ties keep the input order, so
        // posting lists become a deterministic function of the input.
        dwords.sort_by_key(|e| e.size);

        let mut suffixes: Vec<(&[u8], u32)> = vec![];
        for (i, e) in dwords.iter().enumerate() {
            let key = &dword_pool[e.offset as usize..][..e.size as usize];
            let min_len = ((f64::from(e.size) * self.suffix_ratio) as u32).max(self.min_suffix);
            if e.size < min_len {
                continue;
            }
            for j in 0..=(e.size - min_len) as usize {
                suffixes.push((&key[j..], i as u32));
            }
        }
        suffixes.sort_unstable_by(|a, b| a.0.cmp(b.0).then_with(|| a.1.cmp(&b.1)));

        // Collapse runs of equal suffixes into one posting list each. The id
        // tie-break above already leaves each run ascending by dword id,
        // which is the length order because the word array is length-sorted.
        let mut id_pool = Vec::with_capacity(suffixes.len());
        let mut idx_headers = vec![];
        let mut records: Vec<(&[u8], u32)> = vec![];
        let mut i = 0;
        while i < suffixes.len() {
            let mut j = i + 1;
            while j < suffixes.len() && suffixes[j].0 == suffixes[i].0 {
                j += 1;
            }
            let offset = u32::try_from(id_pool.len()).map_err(|_| pool_overflow())?;
            id_pool.extend(suffixes[i..j].iter().map(|&(_, id)| id));
            idx_headers.push(ListHeader {
                offset,
                size: (j - i) as u32,
            });
            let suffixid = u32::try_from(idx_headers.len() - 1).map_err(|_| pool_overflow())?;
            records.push((suffixes[i].0, suffixid));
            i = j;
        }

        let trie = TrieBuilder::build(&records)?;
        Ok(Dictionary::new(
            trie,
            dword_pool,
            dwords,
            id_pool,
            idx_headers,
            self.suffix_ratio,
            self.min_suffix,
        ))
    }
}

impl Default for DictionaryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn pool_overflow() -> TremoloError {
    TremoloError::invalid_argument("rdr", "the dictionary outgrows its 32-bit address space")
}
