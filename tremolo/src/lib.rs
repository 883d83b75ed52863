//! # Tremolo
//!
//! Tremolo is a common-substring dictionary search engine: given a finite
//! dictionary of (key, value) records and a query word, it retrieves every
//! dictionary key that shares a sufficiently long substring with the query,
//! together with the position and length of the match and the associated
//! value.
//!
//! The dictionary is frozen at build time. Internally, every word is
//! expanded into its longer suffixes, which are indexed in a double-array
//! trie whose leaves map to length-ordered posting lists of word ids; a
//! retrievable common substring is thus a common prefix of some
//! sufficiently long suffix of a dictionary word.
//!
//! ## Examples
//!
//! ```
//! use tremolo::{DictionaryBuilder, Query, Searcher};
//!
//! let dict = DictionaryBuilder::new()
//!     .build_from_reader("hello\tH\nworld\tW\n".as_bytes())
//!     .unwrap();
//!
//! let searcher = Searcher::new(&dict);
//! let mut results = vec![];
//! let query = Query {
//!     min_common_len: 3,
//!     ..Query::new(b"help")
//! };
//! searcher.search(&query, &mut results);
//!
//! assert_eq!(results.len(), 1);
//! assert_eq!(results[0].dword, b"hello");
//! assert_eq!(results[0].value, b"H");
//! ```
#![deny(missing_docs)]

#[cfg(target_pointer_width = "16")]
compile_error!("`target_pointer_width` must be larger than or equal to 32");

pub mod dictionary;
pub mod errors;
pub mod searcher;

#[cfg(test)]
mod tests;

pub use dictionary::{Dictionary, DictionaryBuilder};
pub use searcher::{Match, Query, Searcher};
