/// Channel identifier plus read-scoped API key of one ThingSpeak feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedCredentials {
    pub channel_id: String,
    pub read_key: String,
}

/// One CSV data line of a feed export, split on commas and otherwise
/// untouched. Field meaning is positional and depends on the channel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawRow(Vec<String>);

impl RawRow {
    pub fn from_line(line: &str) -> Self {
        Self(line.split(',').map(str::to_owned).collect())
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First field: the provider time stamp, used as the row key.
    pub fn time_stamp(&self) -> &str {
        self.get(0).unwrap_or_default()
    }
}

impl From<Vec<String>> for RawRow {
    fn from(fields: Vec<String>) -> Self {
        Self(fields)
    }
}
