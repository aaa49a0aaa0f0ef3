//! The static mapping file: `{"<discord channel id>": "<whatsapp chat name>"}`.

use std::{
    collections::{BTreeMap, HashMap},
    path::Path,
};

use crate::{Error, Result};

/// A validated routing table read from disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingFile {
    routes: BTreeMap<u64, String>,
}

impl MappingFile {
    /// Read and validate `path`. Returns `Ok(None)` when the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(Error::Read {
                    path: path.to_path_buf(),
                    source,
                });
            },
        };
        Self::parse(&raw).map(Some)
    }

    /// Parse the JSON text of a mapping file.
    ///
    /// Keys must be Discord channel ids and no chat name may appear twice,
    /// otherwise the reverse table could not be built.
    pub fn parse(raw: &str) -> Result<Self> {
        let entries: HashMap<String, String> = serde_json::from_str(raw)?;

        let mut routes = BTreeMap::new();
        let mut seen: HashMap<&str, u64> = HashMap::with_capacity(entries.len());
        for (key, chat) in &entries {
            let id: u64 = key.trim().parse().map_err(|_| {
                Error::invalid_mapping(format!("key {key:?} is not a numeric channel id"))
            })?;
            if chat.trim().is_empty() {
                return Err(Error::invalid_mapping(format!(
                    "channel {id} maps to an empty chat name"
                )));
            }
            if let Some(other) = seen.insert(chat.as_str(), id)
                && other != id
            {
                return Err(Error::invalid_mapping(format!(
                    "chat {chat:?} is mapped from both {other} and {id}"
                )));
            }
            if routes.insert(id, chat.clone()).is_some() {
                // "0042" and "42" normalise to the same id.
                return Err(Error::invalid_mapping(format!(
                    "channel {id} appears more than once"
                )));
            }
        }

        Ok(Self { routes })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn get(&self, channel_id: u64) -> Option<&str> {
        self.routes.get(&channel_id).map(String::as_str)
    }

    /// `(channel id, chat name)` pairs in the string form the broker stores.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        self.routes
            .iter()
            .map(|(id, chat)| (id.to_string(), chat.clone()))
            .collect()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[test]
    fn parses_flat_object() {
        let file = MappingFile::parse(r#"{"1001": "family-group", "1002": "work"}"#).unwrap();
        assert_eq!(file.len(), 2);
        assert_eq!(file.get(1001), Some("family-group"));
        assert_eq!(
            file.to_pairs(),
            vec![
                ("1001".to_string(), "family-group".to_string()),
                ("1002".to_string(), "work".to_string()),
            ]
        );
    }

    #[test]
    fn normalises_channel_ids() {
        let file = MappingFile::parse(r#"{" 0042": "answer"}"#).unwrap();
        assert_eq!(file.to_pairs(), vec![("42".into(), "answer".into())]);
    }

    #[rstest]
    #[case::non_numeric_key(r#"{"general": "family-group"}"#)]
    #[case::empty_chat(r#"{"1": "  "}"#)]
    #[case::duplicate_chat(r#"{"1": "same", "2": "same"}"#)]
    #[case::duplicate_id(r#"{"42": "a", "042": "b"}"#)]
    fn rejects_non_bijective_or_malformed(#[case] raw: &str) {
        let err = MappingFile::parse(raw).unwrap_err();
        assert!(matches!(err, Error::InvalidMapping { .. }), "{err}");
    }

    #[rstest]
    #[case::array(r#"["1001", "family-group"]"#)]
    #[case::number_value(r#"{"1001": 5}"#)]
    #[case::garbage("not json")]
    fn rejects_wrong_shape(#[case] raw: &str) {
        assert!(matches!(MappingFile::parse(raw), Err(Error::Json(_))));
    }

    #[test]
    fn load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(
            MappingFile::load(&dir.path().join("mapping.json"))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn empty_object_is_valid() {
        assert!(MappingFile::parse("{}").unwrap().is_empty());
    }
}
