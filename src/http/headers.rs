use thiserror::Error;

/// Token characters permitted in a header name besides ASCII alphanumerics.
const TOKEN_SYMBOLS: &[u8] = b"!#$%&'*+-.^_`|~";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("invalid header name: {0:?}")]
    InvalidHeaderName(String),
}

/// Ordered, case-insensitive collection of HTTP header fields.
///
/// Names are lowercased on insertion, so lookups are case-insensitive and
/// serialization is stable. A name may repeat: `add` appends a new entry,
/// `set` replaces every entry for the name. Insertion order is preserved,
/// which is what `serialize` emits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all entries for `name` with a single entry.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), HeaderError> {
        validate_name(name)?;
        let lowered = name.to_ascii_lowercase();
        self.entries.retain(|(n, _)| *n != lowered);
        self.entries.push((lowered, value.to_string()));
        Ok(())
    }

    /// Appends an entry without touching existing ones for the same name.
    ///
    /// Used for repeated declarations such as the `trailers` header.
    pub fn add(&mut self, name: &str, value: &str) -> Result<(), HeaderError> {
        validate_name(name)?;
        self.entries
            .push((name.to_ascii_lowercase(), value.to_string()));
        Ok(())
    }

    /// Returns the first value for `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Iterates over every value stored for `name`, in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Removes every entry for `name`.
    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Serializes every entry as `name: value\r\n` in insertion order.
    ///
    /// The terminating empty line is the writer's job, not the collection's.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for (name, value) in &self.entries {
            buf.extend_from_slice(name.as_bytes());
            buf.extend_from_slice(b": ");
            buf.extend_from_slice(value.as_bytes());
            buf.extend_from_slice(b"\r\n");
        }
        buf
    }

    /// Trailer-field names declared via the `trailers` header.
    ///
    /// The header may repeat and each entry may hold a comma-separated list;
    /// the result is the flattened list of names.
    pub fn trailer_names(&self) -> Vec<String> {
        self.get_all("trailers")
            .flat_map(|v| v.split(','))
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect()
    }
}

fn validate_name(name: &str) -> Result<(), HeaderError> {
    if name.is_empty() || !name.bytes().all(is_token_byte) {
        return Err(HeaderError::InvalidHeaderName(name.to_string()));
    }
    Ok(())
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || TOKEN_SYMBOLS.contains(&b)
}
