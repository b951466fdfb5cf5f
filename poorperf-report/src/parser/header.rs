//! Self-describing field header (`$ time;cpu;pid;...`)

use std::collections::HashMap;

/// Fields the pipeline reads, with the older spellings still produced by
/// earlier capture agents.
pub mod fields {
    pub const TIME: &str = "time";
    pub const CPU: &str = "cpu";
    pub const PID: &str = "pid";
    pub const COMM: &str = "comm";
    pub const PATHNAME: &str = "pathname";
    pub const ADDR: &str = "addr";
    pub const NAME: &str = "name";

    pub(super) const ALIASES: &[(&str, &str)] = &[(PATHNAME, "dso"), (NAME, "sym")];
}

/// Marker that starts a header line.
pub const HEADER_MARKER: char = '$';

/// Ordered list of field names, shared by every record parsed under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatHeader {
    fields: Vec<String>,
    index: HashMap<String, usize>,
}

impl FormatHeader {
    /// Build a header from field names. Returns `None` if the list is empty
    /// or contains an empty name.
    pub fn new<I, S>(names: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = names.into_iter().map(Into::into).collect();
        if fields.is_empty() || fields.iter().any(String::is_empty) {
            return None;
        }

        // First declaration wins if a name is repeated
        let mut index = HashMap::with_capacity(fields.len());
        for (pos, name) in fields.iter().enumerate() {
            index.entry(name.clone()).or_insert(pos);
        }

        Some(Self { fields, index })
    }

    /// Parse the body of a header line, i.e. everything after the `$`.
    #[must_use]
    pub fn parse(body: &str) -> Option<Self> {
        Self::new(body.split(';').map(str::trim))
    }

    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Column of `field`, falling back to its older alias.
    #[must_use]
    pub fn position(&self, field: &str) -> Option<usize> {
        if let Some(&pos) = self.index.get(field) {
            return Some(pos);
        }
        fields::ALIASES
            .iter()
            .find(|(canonical, _)| *canonical == field)
            .and_then(|(_, alias)| self.index.get(*alias).copied())
    }
}
