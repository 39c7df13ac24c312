//! Delimited line codec
//!
//! One record per line: `<key><delim><member1><delim><member2>...`.
//! There is no escaping, so the delimiter and line breaks are forbidden
//! inside keys and members; [`Codec::validate_key`] and
//! [`Codec::validate_members`] enforce that before anything reaches disk.

use std::path::Path;

use indexmap::IndexMap;

use super::error::{StoreError, StoreResult};

/// Delimiter used when none is configured
pub const DEFAULT_DELIMITER: char = ',';

/// In-memory image of one table file, in file order
pub type Table = IndexMap<String, Vec<String>>;

/// Encoder/decoder for a single delimiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codec {
    delimiter: char,
}

impl Default for Codec {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
        }
    }
}

impl Codec {
    /// Create a codec for `delimiter`
    ///
    /// Line breaks cannot be delimiters since they separate records.
    pub fn new(delimiter: char) -> StoreResult<Self> {
        if is_line_break(delimiter) {
            return Err(StoreError::invalid(format!(
                "delimiter {:?} is a line break",
                delimiter
            )));
        }
        Ok(Self { delimiter })
    }

    /// Parse file contents into a table
    ///
    /// Blank lines are skipped. A line without any delimiter is a key with
    /// zero members. When a key repeats, the later line's members replace
    /// the earlier ones and the key keeps its first position.
    pub fn decode(&self, content: &str, path: &Path) -> StoreResult<Table> {
        let mut table = Table::new();

        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let (key, members) = match line.split_once(self.delimiter) {
                Some((key, rest)) => (
                    key,
                    rest.split(self.delimiter).map(str::to_string).collect(),
                ),
                None => (line, Vec::new()),
            };

            if key.is_empty() {
                return Err(StoreError::Decode {
                    path: path.to_path_buf(),
                    line: index + 1,
                    details: "record has an empty key".to_string(),
                });
            }

            table.insert(key.to_string(), members);
        }

        Ok(table)
    }

    /// Serialize a table, one record per line, without a trailing newline
    ///
    /// Records with zero members are not written.
    pub fn encode(&self, table: &Table) -> String {
        let mut out = String::new();
        let mut delim_buf = [0u8; 4];
        let delim: &str = self.delimiter.encode_utf8(&mut delim_buf);

        for (key, members) in table.iter().filter(|(_, members)| !members.is_empty()) {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(key);
            out.push_str(delim);
            out.push_str(&members.join(delim));
        }

        out
    }

    /// Reject keys that would not survive a round trip
    pub fn validate_key(&self, key: &str) -> StoreResult<()> {
        if key.is_empty() {
            return Err(StoreError::invalid("key must not be empty"));
        }
        self.validate_field("key", key)
    }

    /// Reject empty value lists and members that would not survive a round trip
    pub fn validate_members(&self, members: &[String]) -> StoreResult<()> {
        if members.is_empty() {
            return Err(StoreError::invalid("values must not be empty"));
        }
        members
            .iter()
            .try_for_each(|member| self.validate_member(member))
    }

    pub fn validate_member(&self, member: &str) -> StoreResult<()> {
        if member.is_empty() {
            return Err(StoreError::invalid("member must not be empty"));
        }
        self.validate_field("member", member)
    }

    fn validate_field(&self, what: &str, value: &str) -> StoreResult<()> {
        if value.contains(self.delimiter) {
            return Err(StoreError::invalid(format!(
                "{} {:?} contains the delimiter {:?}",
                what, value, self.delimiter
            )));
        }
        if value.chars().any(is_line_break) {
            return Err(StoreError::invalid(format!(
                "{} {:?} contains a line break",
                what, value
            )));
        }
        Ok(())
    }
}

fn is_line_break(c: char) -> bool {
    c == '\n' || c == '\r'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> Codec {
        Codec::default()
    }

    fn decode(content: &str) -> StoreResult<Table> {
        codec().decode(content, Path::new("/data/table.csv"))
    }

    fn members(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_decode_basic() {
        let table = decode("alice,bob,carol\ndave,erin").unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table["alice"], members(&["bob", "carol"]));
        assert_eq!(table["dave"], members(&["erin"]));
    }

    #[test]
    fn test_decode_skips_blank_lines() {
        let table = decode("\n\nalice,bob\n   \n\ndave,erin\n").unwrap();
        let keys: Vec<_> = table.keys().cloned().collect();
        assert_eq!(keys, vec!["alice", "dave"]);
    }

    #[test]
    fn test_decode_crlf() {
        let table = decode("alice,bob\r\ndave,erin\r\n").unwrap();
        assert_eq!(table["alice"], members(&["bob"]));
        assert_eq!(table["dave"], members(&["erin"]));
    }

    #[test]
    fn test_decode_line_without_delimiter() {
        let table = decode("lonely\nalice,bob").unwrap();
        assert!(table["lonely"].is_empty());
    }

    #[test]
    fn test_decode_empty_key_reports_line() {
        let err = decode("alice,bob\n\n,orphan").unwrap_err();
        match err {
            StoreError::Decode { line, .. } => assert_eq!(line, 3),
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_duplicate_key_last_wins_first_position() {
        let table = decode("a,1\nb,2\na,3").unwrap();
        let keys: Vec<_> = table.keys().cloned().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(table["a"], members(&["3"]));
    }

    #[test]
    fn test_encode_preserves_order() {
        let mut table = Table::new();
        table.insert("zed".to_string(), members(&["1", "2"]));
        table.insert("amy".to_string(), members(&["3"]));

        assert_eq!(codec().encode(&table), "zed,1,2\namy,3");
    }

    #[test]
    fn test_encode_empty_table() {
        assert_eq!(codec().encode(&Table::new()), "");
    }

    #[test]
    fn test_round_trip_is_identity() {
        let content = "123,456,789\n42,+15550100\nsubject,w1";
        let table = decode(content).unwrap();
        assert_eq!(codec().encode(&table), content);
    }

    #[test]
    fn test_bare_key_is_dropped_on_encode() {
        let table = decode("lonely\nalice,bob\nempty").unwrap();
        assert_eq!(table["lonely"], Vec::<String>::new());
        assert_eq!(codec().encode(&table), "alice,bob");
    }

    #[test]
    fn test_custom_delimiter() {
        let codec = Codec::new('|').unwrap();
        let table = codec
            .decode("k|a,b|c", Path::new("/data/pipe.txt"))
            .unwrap();
        assert_eq!(table["k"], members(&["a,b", "c"]));
        assert_eq!(codec.encode(&table), "k|a,b|c");
    }

    #[test]
    fn test_line_break_delimiter_rejected() {
        assert!(matches!(
            Codec::new('\n'),
            Err(StoreError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_validate_key() {
        let codec = codec();
        assert!(codec.validate_key("123456").is_ok());
        assert!(codec.validate_key("").is_err());
        assert!(codec.validate_key("a,b").is_err());
        assert!(codec.validate_key("a\nb").is_err());
    }

    #[test]
    fn test_validate_members() {
        let codec = codec();
        assert!(codec.validate_members(&members(&["x", "y"])).is_ok());
        assert!(codec.validate_members(&[]).is_err());
        assert!(codec.validate_members(&members(&["x", "y,z"])).is_err());
        assert!(codec.validate_members(&members(&["x", ""])).is_err());
        assert!(codec.validate_members(&members(&["x\r"])).is_err());
    }
}
