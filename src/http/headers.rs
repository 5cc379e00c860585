//! Ordered, case-insensitive header collection

/// Header names are unique (compared case-insensitively); each name keeps its
/// values in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, Vec<String>)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(existing, _)| existing.eq_ignore_ascii_case(name))
    }

    /// Append a value, keeping existing values for the name
    pub fn add<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V) -> &mut Self {
        let name = name.into();
        match self.position(&name) {
            Some(index) => self.entries[index].1.push(value.into()),
            None => self.entries.push((name, vec![value.into()])),
        }
        self
    }

    /// Replace all values for the name
    pub fn set<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V) -> &mut Self {
        let name = name.into();
        match self.position(&name) {
            Some(index) => self.entries[index].1 = vec![value.into()],
            None => self.entries.push((name, vec![value.into()])),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.position(name).map(|index| self.entries[index].1.as_slice())
    }

    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.position(name).map(|index| self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
