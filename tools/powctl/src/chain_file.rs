//! JSON header files: an array of `{ "height", "time", "bits" }` objects in
//! ascending height order. `bits` may be a number or a hex string.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use consensus::{ChainIndex, HeaderEntry};
use serde::Deserialize;

use crate::parse_bits;

#[derive(Deserialize)]
#[serde(untagged)]
enum BitsField {
    Number(u32),
    Hex(String),
}

#[derive(Deserialize)]
struct FileEntry {
    height: u64,
    time: i64,
    bits: BitsField,
}

pub fn parse(json: &str) -> Result<ChainIndex> {
    let entries: Vec<FileEntry> = serde_json::from_str(json).context("malformed header file")?;
    if entries.is_empty() {
        bail!("header file holds no headers");
    }
    let headers = entries
        .into_iter()
        .map(|entry| {
            let bits = match entry.bits {
                BitsField::Number(bits) => bits,
                BitsField::Hex(text) => parse_bits(&text)
                    .with_context(|| format!("bad bits at height {}", entry.height))?,
            };
            Ok(HeaderEntry {
                height: entry.height,
                time: entry.time,
                bits,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(ChainIndex::from_entries(headers)?)
}

pub fn load(path: &Path) -> Result<ChainIndex> {
    let json =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    parse(&json).with_context(|| format!("failed to load {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use consensus::ChainNode;

    #[test]
    fn loads_mixed_bits_encodings() {
        let index = parse(
            r#"[
                {"height": 10, "time": 1000, "bits": 486604799},
                {"height": 11, "time": 1079, "bits": "0x1d00ffff"},
                {"height": 12, "time": 1158, "bits": "1c7fffff"}
            ]"#,
        )
        .expect("valid file");
        let tip = index.tip().expect("tip");
        assert_eq!(tip.height(), 12);
        assert_eq!(tip.bits(), 0x1c7f_ffff);
        let parent = tip.predecessor().expect("parent");
        assert_eq!(parent.bits(), 0x1d00_ffff);
        let root = parent.predecessor().expect("root");
        assert_eq!(root.bits(), 0x1d00_ffff);
        assert!(root.predecessor().is_none());
    }

    #[test]
    fn rejects_gaps_and_empty_files() {
        assert!(parse("[]").is_err());
        assert!(
            parse(
                r#"[
                    {"height": 1, "time": 0, "bits": 1},
                    {"height": 3, "time": 0, "bits": 1}
                ]"#
            )
            .is_err()
        );
        assert!(parse(r#"[{"height": 1, "time": 0, "bits": "zz"}]"#).is_err());
    }
}
