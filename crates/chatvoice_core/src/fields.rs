/// Named values pulled out of one chat message, in site-config field order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractedFields {
    entries: Vec<(String, String)>,
}

impl ExtractedFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field, replacing the value in place if the name already exists.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when at least one field carries a non-empty value.
    pub fn has_content(&self) -> bool {
        self.entries.iter().any(|(_, v)| !v.is_empty())
    }
}

impl<N, V> FromIterator<(N, V)> for ExtractedFields
where
    N: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut fields = ExtractedFields::new();
        for (name, value) in iter {
            fields.insert(name, value);
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::ExtractedFields;

    #[test]
    fn insert_keeps_first_position() {
        let mut fields: ExtractedFields = [("name", "a"), ("body", "b")].into_iter().collect();
        fields.insert("name", "c");
        let names: Vec<_> = fields.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["name", "body"]);
        assert_eq!(fields.get("name"), Some("c"));
    }

    #[test]
    fn empty_values_are_not_content() {
        let fields: ExtractedFields = [("name", ""), ("body", "")].into_iter().collect();
        assert!(!fields.has_content());
        assert_eq!(fields.len(), 2);
    }
}
