//! Dictionary for common-substring search.
mod builder;
pub(crate) mod trie;

use std::io::{Read, Write};

use crate::errors::{Result, TremoloError};
pub use builder::DictionaryBuilder;
use trie::Trie;

/// Default minimum indexed suffix length as a ratio of the word length.
pub const DEFAULT_SUFFIX_RATIO: f64 = 0.5;

/// Default global minimum indexed suffix length.
pub const DEFAULT_MIN_SUFFIX: u32 = 2;

/// A dictionary word: byte offset into the word pool and key length.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub(crate) struct DwordEntry {
    pub offset: u32,
    pub size: u32,
}

/// A posting-list head: offset into the id pool and list length.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub(crate) struct ListHeader {
    pub offset: u32,
    pub size: u32,
}

/// Immutable dictionary database for common-substring search.
///
/// A dictionary is built once with [`DictionaryBuilder`] (or loaded with
/// [`Dictionary::read()`]) and then queried read-only through a
/// [`Searcher`](crate::Searcher).
pub struct Dictionary {
    trie: Trie,
    dword_pool: Vec<u8>,
    dwords: Vec<DwordEntry>,
    id_pool: Vec<u32>,
    idx_headers: Vec<ListHeader>,
    suffix_ratio: f64,
    min_suffix: u32,
}

impl Dictionary {
    pub(crate) fn new(
        trie: Trie,
        dword_pool: Vec<u8>,
        dwords: Vec<DwordEntry>,
        id_pool: Vec<u32>,
        idx_headers: Vec<ListHeader>,
        suffix_ratio: f64,
        min_suffix: u32,
    ) -> Self {
        Self {
            trie,
            dword_pool,
            dwords,
            id_pool,
            idx_headers,
            suffix_ratio,
            min_suffix,
        }
    }

    /// Returns the number of dictionary words.
    pub fn num_dwords(&self) -> usize {
        self.dwords.len()
    }

    /// Returns the minimum indexed suffix length as a ratio of the word
    /// length.
    pub const fn suffix_ratio(&self) -> f64 {
        self.suffix_ratio
    }

    /// Returns the global minimum indexed suffix length.
    pub const fn min_suffix(&self) -> u32 {
        self.min_suffix
    }

    #[inline(always)]
    pub(crate) const fn trie(&self) -> &Trie {
        &self.trie
    }

    #[inline(always)]
    pub(crate) fn num_suffixes(&self) -> usize {
        self.idx_headers.len()
    }

    #[inline(always)]
    pub(crate) fn id_pool(&self) -> &[u32] {
        &self.id_pool
    }

    #[inline(always)]
    pub(crate) fn posting_list(&self, suffixid: u32) -> &[u32] {
        let header = self.idx_headers[suffixid as usize];
        &self.id_pool[header.offset as usize..(header.offset + header.size) as usize]
    }

    #[inline(always)]
    pub(crate) fn dword(&self, dwordid: u32) -> DwordEntry {
        self.dwords[dwordid as usize]
    }

    #[inline(always)]
    pub(crate) fn dword_key(&self, entry: DwordEntry) -> &[u8] {
        &self.dword_pool[entry.offset as usize..][..entry.size as usize]
    }

    #[inline(always)]
    pub(crate) fn dword_value(&self, entry: DwordEntry) -> &[u8] {
        let rest = &self.dword_pool[(entry.offset + entry.size + 1) as usize..];
        let len = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
        &rest[..len]
    }

    /// Exports the dictionary database, returning the number of written
    /// bytes.
    ///
    /// # Errors
    ///
    /// When the writer generates an I/O error, it will be returned as is.
    pub fn write<W>(&self, mut wtr: W) -> Result<usize>
    where
        W: Write,
    {
        let mut num_bytes = self.trie.write(&mut wtr)?;
        num_bytes += write_block(&mut wtr, b"DWDP", &self.dword_pool)?;

        let mut buf = Vec::with_capacity(self.dwords.len() * 8);
        for e in &self.dwords {
            buf.extend_from_slice(&e.offset.to_le_bytes());
            buf.extend_from_slice(&e.size.to_le_bytes());
        }
        num_bytes += write_block(&mut wtr, b"DWAR", &buf)?;

        buf.clear();
        buf.reserve(self.id_pool.len() * 4);
        for &id in &self.id_pool {
            buf.extend_from_slice(&id.to_le_bytes());
        }
        num_bytes += write_block(&mut wtr, b"IDAR", &buf)?;

        buf.clear();
        buf.reserve(self.idx_headers.len() * 8);
        for h in &self.idx_headers {
            buf.extend_from_slice(&h.offset.to_le_bytes());
            buf.extend_from_slice(&h.size.to_le_bytes());
        }
        num_bytes += write_block(&mut wtr, b"IIND", &buf)?;

        Ok(num_bytes)
    }

    /// Creates a dictionary from a database exported by
    /// [`Dictionary::write()`].
    ///
    /// The block structure and the referential invariants of the index are
    /// validated here, so the search path can assume them.
    ///
    /// # Errors
    ///
    /// [`TremoloError`] is returned when the database is malformed or
    /// truncated.
    pub fn read<R>(mut rdr: R) -> Result<Self>
    where
        R: Read,
    {
        let trie = Trie::read(&mut rdr)?;
        let dword_pool = read_block(&mut rdr, b"DWDP")?;

        let raw = read_block(&mut rdr, b"DWAR")?;
        if raw.len() % 8 != 0 {
            return Err(TremoloError::invalid_format(
                "DWAR block size must be a multiple of 8",
            ));
        }
        let dwords: Vec<DwordEntry> = raw
            .chunks_exact(8)
            .map(|pair| DwordEntry {
                offset: u32::from_le_bytes(pair[..4].try_into().unwrap()),
                size: u32::from_le_bytes(pair[4..].try_into().unwrap()),
            })
            .collect();

        let raw = read_block(&mut rdr, b"IDAR")?;
        if raw.len() % 4 != 0 {
            return Err(TremoloError::invalid_format(
                "IDAR block size must be a multiple of 4",
            ));
        }
        let id_pool: Vec<u32> = raw
            .chunks_exact(4)
            .map(|le| u32::from_le_bytes(le.try_into().unwrap()))
            .collect();

        let raw = read_block(&mut rdr, b"IIND")?;
        if raw.len() % 8 != 0 {
            return Err(TremoloError::invalid_format(
                "IIND block size must be a multiple of 8",
            ));
        }
        let idx_headers: Vec<ListHeader> = raw
            .chunks_exact(8)
            .map(|pair| ListHeader {
                offset: u32::from_le_bytes(pair[..4].try_into().unwrap()),
                size: u32::from_le_bytes(pair[4..].try_into().unwrap()),
            })
            .collect();

        validate_index(&dword_pool, &dwords, &id_pool, &idx_headers)?;

        Ok(Self::new(
            trie,
            dword_pool,
            dwords,
            id_pool,
            idx_headers,
            DEFAULT_SUFFIX_RATIO,
            DEFAULT_MIN_SUFFIX,
        ))
    }
}

fn validate_index(
    dword_pool: &[u8],
    dwords: &[DwordEntry],
    id_pool: &[u32],
    idx_headers: &[ListHeader],
) -> Result<()> {
    for (i, e) in dwords.iter().enumerate() {
        let end = u64::from(e.offset) + u64::from(e.size);
        // The key and its terminator must lie inside the pool.
        if end >= dword_pool.len() as u64 || dword_pool[end as usize] != 0 {
            return Err(TremoloError::invalid_format(format!(
                "dword {i} is out of the pool range"
            )));
        }
    }
    for pair in dwords.windows(2) {
        if pair[0].size > pair[1].size {
            return Err(TremoloError::invalid_format(
                "dwords must be sorted by length",
            ));
        }
    }
    for (i, h) in idx_headers.iter().enumerate() {
        let end = u64::from(h.offset) + u64::from(h.size);
        if end > id_pool.len() as u64 {
            return Err(TremoloError::invalid_format(format!(
                "posting list {i} is out of the id pool range"
            )));
        }
        let list = &id_pool[h.offset as usize..end as usize];
        for pair in list.windows(2) {
            if pair[0] > pair[1] {
                return Err(TremoloError::invalid_format(format!(
                    "posting list {i} is not sorted"
                )));
            }
        }
    }
    for &id in id_pool {
        if id as usize >= dwords.len() {
            return Err(TremoloError::invalid_format(format!(
                "dword id {id} is out of range"
            )));
        }
    }
    Ok(())
}

pub(crate) fn write_block<W>(wtr: &mut W, magic: &[u8; 4], payload: &[u8]) -> Result<usize>
where
    W: Write,
{
    let size = u32::try_from(payload.len()).map_err(|_| {
        TremoloError::invalid_argument("payload", "block payload must be shorter than 4 GiB")
    })?;
    wtr.write_all(magic)?;
    wtr.write_all(&size.to_le_bytes())?;
    wtr.write_all(payload)?;
    Ok(8 + payload.len())
}

pub(crate) fn read_block<R>(rdr: &mut R, magic: &[u8; 4]) -> Result<Vec<u8>>
where
    R: Read,
{
    let mut chunk = [0; 4];
    read_exact(rdr, &mut chunk)?;
    if &chunk != magic {
        return Err(TremoloError::invalid_format(format!(
            "expected block magic {:?}, got {:?}",
            String::from_utf8_lossy(magic),
            String::from_utf8_lossy(&chunk),
        )));
    }
    read_exact(rdr, &mut chunk)?;
    let mut payload = vec![0; u32::from_le_bytes(chunk) as usize];
    read_exact(rdr, &mut payload)?;
    Ok(payload)
}

fn read_exact<R>(rdr: &mut R, buf: &mut [u8]) -> Result<()>
where
    R: Read,
{
    rdr.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            TremoloError::invalid_format("unexpected end of the database")
        } else {
            e.into()
        }
    })
}
