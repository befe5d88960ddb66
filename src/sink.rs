//! Accumulator for the rules resolved in one compile unit.

use indexmap::IndexMap;

pub trait StyleSink {
    /// Records `css` under `hash`. A repeated hash overwrites its text in
    /// place, keeping the original position.
    fn add_rule(&mut self, hash: &str, css: &str);

    /// Returns every rule in insertion order and empties the sink.
    fn drain(&mut self) -> String;
}

#[derive(Debug, Clone, Default)]
pub struct StyleSheet {
    rules: IndexMap<String, String>,
}

impl StyleSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, hash: &str) -> Option<&str> {
        self.rules.get(hash).map(String::as_str)
    }
}

impl StyleSink for StyleSheet {
    fn add_rule(&mut self, hash: &str, css: &str) {
        self.rules.insert(hash.to_string(), css.to_string());
    }

    fn drain(&mut self) -> String {
        let css = self.rules.values().map(String::as_str).collect::<String>();
        self.rules.clear();
        css
    }
}
