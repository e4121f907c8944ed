//! Flat `key=value&key=value` text format shared by requests and replies.

/// Parsed message parameters in first-seen order. Keys are unique: a repeated
/// key keeps its original position and takes the later value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    entries: Vec<(String, String)>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    /// Looks the keys up in order and returns the first hit.
    pub fn get_any(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.get(key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn contains_any(&self, keys: &[&str]) -> bool {
        self.get_any(keys).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn encode(&self) -> String {
        encode(self.iter())
    }
}

/// Parses a message. Never fails: empty segments and empty keys are skipped,
/// a segment without `=` becomes a key with an empty value.
pub fn parse(message: &str) -> ParameterSet {
    let trimmed = message
        .trim_end_matches('\0')
        .trim()
        .trim_start_matches('?');

    let mut params = ParameterSet::new();
    for segment in trimmed.split('&') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let (key, value) = segment.split_once('=').unwrap_or((segment, ""));
        if key.is_empty() {
            continue;
        }
        params.insert(key, value);
    }
    params
}

pub fn encode<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut out = String::new();
    for (key, value) in fields {
        if !out.is_empty() {
            out.push('&');
        }
        out.push_str(key.as_ref());
        out.push('=');
        out.push_str(value.as_ref());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_pairs_in_order() {
        let params = parse("timer=0&stop-side=1&wait=1");
        let pairs: Vec<_> = params.iter().collect();
        assert_eq!(
            pairs,
            vec![("timer", "0"), ("stop-side", "1"), ("wait", "1")]
        );
    }

    #[test]
    fn bare_key_has_empty_value() {
        let params = parse("timer=1&reset");
        assert_eq!(params.get("reset"), Some(""));
        assert!(params.contains("reset"));
    }

    #[test]
    fn tolerates_stray_separators_and_framing() {
        let params = parse("?&&timer=0&&ping=1&\0\0");
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("timer"), Some("0"));
        assert_eq!(params.get("ping"), Some("1"));
    }

    #[test]
    fn garbage_yields_empty_or_partial_set() {
        assert!(parse("").is_empty());
        assert!(parse("&&&").is_empty());
        assert!(parse("=5&=").is_empty());

        let partial = parse("==&timer=0=1");
        assert_eq!(partial.get("timer"), Some("0=1"));
    }

    #[test]
    fn repeated_key_keeps_position_and_takes_last_value() {
        let params = parse("timer=0&reset=1&timer=1");
        let pairs: Vec<_> = params.iter().collect();
        assert_eq!(pairs, vec![("timer", "1"), ("reset", "1")]);
    }

    #[test]
    fn get_any_prefers_earlier_keys() {
        let params = parse("t=1&timer=0");
        assert_eq!(params.get_any(&["timer", "t"]), Some("0"));
        assert_eq!(params.get_any(&["missing", "t"]), Some("1"));
        assert_eq!(params.get_any(&["missing"]), None);
    }

    #[test]
    fn encoded_set_parses_back_to_same_mapping() {
        let original = parse("b=20&s0=1&t0=0&r0=0");
        let reparsed = parse(&original.encode());
        assert_eq!(reparsed, original);
    }

    #[test]
    fn encode_joins_segments() {
        assert_eq!(encode([("a", "1"), ("b", "")]), "a=1&b=");
        assert_eq!(encode(Vec::<(&str, &str)>::new()), "");
    }
}
