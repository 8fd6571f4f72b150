// src/repository/index.rs

//! Binary package index parsing
//!
//! An index is a sequence of blocks separated by blank lines. Every line in a
//! block is `<key>:<value>` with a single-character key; the checksum line
//! (`C:`) opens a block. Indexes are usually shipped as a gzip compressed tar
//! archive with a member named `APKINDEX`, but plain text files are accepted
//! too.

use crate::arch::Arch;
use crate::error::{Error, Result};
use crate::version::strip_operators;
use flate2::read::GzDecoder;
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tar::Archive;
use tracing::{debug, trace};

/// Name of the index member inside an index archive
pub const INDEX_MEMBER: &str = "APKINDEX";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// One package entry of a binary package index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexRecord {
    pub arch: Arch,
    pub pkgname: String,
    pub version: String,
    /// Dependency names, comparison operators already stripped
    pub depends: Vec<String>,
    /// Alias names this package satisfies
    pub provides: Vec<String>,
    pub provider_priority: Option<u32>,
    /// Source recipe this binary was built from
    pub origin: Option<String>,
    pub timestamp: Option<String>,
}

impl IndexRecord {
    /// A record without origin and timestamp is a provides-only alias with
    /// no binary behind it
    pub fn is_virtual(&self) -> bool {
        self.origin.is_none() && self.timestamp.is_none()
    }
}

/// Raw `key -> value` lines of one block, before validation
#[derive(Debug, Default)]
struct RawBlock<'a> {
    /// 1-based line number where the block starts
    line: usize,
    fields: Vec<(char, &'a str)>,
}

impl<'a> RawBlock<'a> {
    fn new(line: usize) -> Self {
        Self {
            line,
            fields: Vec::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn get(&self, key: char) -> Option<&'a str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
    }
}

/// Keys the resolver reads; anything else in a block is ignored
const KNOWN_KEYS: [char; 8] = ['A', 'D', 'o', 'P', 'p', 'k', 't', 'V'];

/// Parse the text of an index into its records, in file order
///
/// `path` is only used to label errors.
pub fn parse_index(path: &Path, text: &str) -> Result<Vec<IndexRecord>> {
    let mut records = Vec::new();
    let mut block = RawBlock::new(1);

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        if line.trim().is_empty() {
            if !block.is_empty() {
                records.push(finish_block(path, &block)?);
            }
            block = RawBlock::new(line_no + 1);
            continue;
        }

        let mut chars = line.chars();
        let key = chars.next().unwrap_or_default();
        let Some(value) = chars.as_str().strip_prefix(':') else {
            return Err(parse_error(
                path,
                line_no,
                format!("malformed line '{}'", line),
            ));
        };

        if key == 'C' {
            if !block.is_empty() {
                records.push(finish_block(path, &block)?);
            }
            block = RawBlock::new(line_no);
            continue;
        }
        if !KNOWN_KEYS.contains(&key) {
            continue;
        }
        if block.get(key).is_some() {
            return Err(parse_error(
                path,
                block.line,
                format!("key '{}' specified twice", key),
            ));
        }
        block.fields.push((key, value));
    }

    if !block.is_empty() {
        records.push(finish_block(path, &block)?);
    }

    debug!("Parsed {} index blocks from {}", records.len(), path.display());
    Ok(records)
}

/// Validate one block and convert it to a record
fn finish_block(path: &Path, block: &RawBlock<'_>) -> Result<IndexRecord> {
    let required = |key: char, name: &str| {
        block
            .get(key)
            .ok_or_else(|| parse_error(path, block.line, format!("missing required key '{}'", name)))
    };

    let arch_tag = required('A', "arch")?;
    let pkgname = required('P', "pkgname")?;
    let version = required('V', "version")?;

    let arch = arch_tag
        .parse::<Arch>()
        .map_err(|_| parse_error(path, block.line, format!("unknown arch '{}'", arch_tag)))?;

    let provider_priority = match block.get('k') {
        None | Some("") => None,
        Some(raw) => {
            let priority = raw
                .bytes()
                .all(|b| b.is_ascii_digit())
                .then(|| raw.parse::<u32>().ok())
                .flatten()
                .ok_or_else(|| {
                    parse_error(
                        path,
                        block.line,
                        format!("invalid provider_priority '{}' for {}", raw, pkgname),
                    )
                })?;
            Some(priority)
        }
    };

    let record = IndexRecord {
        arch,
        pkgname: pkgname.to_string(),
        version: version.to_string(),
        depends: split_names(block.get('D')),
        provides: split_names(block.get('p')),
        provider_priority,
        origin: block.get('o').map(str::to_string),
        timestamp: block.get('t').map(str::to_string),
    };
    trace!("Index block {}-{} ({})", record.pkgname, record.version, record.arch);
    Ok(record)
}

fn split_names(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(' ')
        .filter(|token| !token.is_empty())
        .map(|token| strip_operators(token).to_string())
        .collect()
}

fn parse_error(path: &Path, line: usize, reason: String) -> Error {
    Error::IndexParse {
        path: path.to_path_buf(),
        line,
        reason,
    }
}

/// Read the index text from a file
///
/// Returns `None` when the file does not exist; a missing index simply means
/// there are no binary packages for that architecture yet.
pub fn read_index_text(path: &Path) -> Result<Option<String>> {
    if !path.is_file() {
        debug!(
            "Index not found, assuming no binary packages: {}",
            path.display()
        );
        return Ok(None);
    }

    let mut file = File::open(path)?;
    let mut magic = [0u8; 2];
    let is_gzip = file.read(&mut magic)? == 2 && magic == GZIP_MAGIC;
    drop(file);

    if !is_gzip {
        return Ok(Some(std::fs::read_to_string(path)?));
    }

    let mut archive = Archive::new(GzDecoder::new(File::open(path)?));
    for entry in archive.entries()? {
        let mut entry = entry?;
        let entry_path = entry.path()?.to_string_lossy().to_string();
        if entry_path.trim_start_matches("./") == INDEX_MEMBER {
            let mut content = String::new();
            entry.read_to_string(&mut content)?;
            return Ok(Some(content));
        }
    }

    Err(parse_error(
        path,
        0,
        format!("archive has no '{}' member", INDEX_MEMBER),
    ))
}

/// Read and parse an index file, `None` when it does not exist
pub fn load_records(path: &Path) -> Result<Option<Vec<IndexRecord>>> {
    match read_index_text(path)? {
        Some(text) => parse_index(path, &text).map(Some),
        None => Ok(None),
    }
}
