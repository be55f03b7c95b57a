use crate::SqlValue;

/// One result row: column/value pairs in select order.
///
/// When camelCase aliasing is enabled on the handle, the aliases are
/// appended after the original columns, so both spellings resolve.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, SqlValue)>,
}

impl Row {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self { columns: Vec::with_capacity(capacity) }
    }

    pub(crate) fn push(&mut self, name: String, value: SqlValue) {
        self.columns.push((name, value));
    }

    /// Value of the first column with this name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.columns.iter().find(|(column, _)| column == name).map(|(_, value)| value)
    }

    /// Value at the given column position.
    #[must_use]
    pub fn get_at(&self, index: usize) -> Option<&SqlValue> {
        self.columns.get(index).map(|(_, value)| value)
    }

    /// Column names in order, aliases included.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    /// Column/value pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    #[must_use]
    pub fn get_string(&self, name: &str) -> Option<String> {
        self.get(name).and_then(SqlValue::as_text)
    }

    #[must_use]
    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(SqlValue::as_int)
    }

    #[must_use]
    pub fn get_float(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(SqlValue::as_float)
    }

    #[must_use]
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(SqlValue::as_bool)
    }

    /// Appends a camelCase alias for every `snake_case` column.
    pub(crate) fn apply_hump(&mut self) {
        let aliases: Vec<(String, SqlValue)> = self
            .columns
            .iter()
            .filter_map(|(name, value)| {
                let alias = str_to_hump(name);
                (alias != *name).then(|| (alias, value.clone()))
            })
            .collect();
        for (alias, value) in aliases {
            if self.get(&alias).is_none() {
                self.columns.push((alias, value));
            }
        }
    }
}

impl IntoIterator for Row {
    type Item = (String, SqlValue);
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.into_iter()
    }
}

/// `snake_case` to `camelCase`: `user_name` becomes `userName`.
///
/// Names without underscores pass through unchanged; leading underscores
/// are preserved.
#[must_use]
pub fn str_to_hump(name: &str) -> String {
    if !name.contains('_') {
        return name.to_owned();
    }
    let underscores = name.chars().take_while(|&c| c == '_').count();
    let mut out = String::with_capacity(name.len());
    out.push_str(&name[..underscores]);
    let mut first = true;
    for segment in name[underscores..].split('_').filter(|s| !s.is_empty()) {
        let lower = segment.to_ascii_lowercase();
        if first {
            out.push_str(&lower);
            first = false;
        } else {
            let mut chars = lower.chars();
            if let Some(head) = chars.next() {
                out.push(head.to_ascii_uppercase());
                out.push_str(chars.as_str());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hump_conversion_table() {
        assert_eq!(str_to_hump("user_name"), "userName");
        assert_eq!(str_to_hump("USER_LAST_LOGIN"), "userLastLogin");
        assert_eq!(str_to_hump("id"), "id");
        assert_eq!(str_to_hump("alreadyCamel"), "alreadyCamel");
        assert_eq!(str_to_hump("_private_key"), "_privateKey");
        assert_eq!(str_to_hump("a__b"), "aB");
        assert_eq!(str_to_hump("___"), "___");
    }

    #[test]
    fn aliases_resolve_next_to_originals() {
        let mut row = Row::with_capacity(2);
        row.push("user_name".to_owned(), SqlValue::from("alice"));
        row.push("age".to_owned(), SqlValue::from(30));
        row.apply_hump();

        assert_eq!(row.len(), 3);
        assert_eq!(row.get_string("user_name").as_deref(), Some("alice"));
        assert_eq!(row.get_string("userName").as_deref(), Some("alice"));
        assert_eq!(row.get_int("age"), Some(30));
        assert_eq!(row.names().collect::<Vec<_>>(), ["user_name", "age", "userName"]);
    }

    #[test]
    fn typed_getters_use_the_value_coercions() {
        let mut row = Row::with_capacity(3);
        row.push("flag".to_owned(), SqlValue::from("true"));
        row.push("score".to_owned(), SqlValue::from("8.5"));
        row.push("missing".to_owned(), SqlValue::Null);

        assert_eq!(row.get_bool("flag"), Some(true));
        assert_eq!(row.get_float("score"), Some(8.5));
        assert_eq!(row.get_int("score"), Some(8));
        assert_eq!(row.get_string("missing"), None);
        assert_eq!(row.get_at(1).and_then(SqlValue::as_float), Some(8.5));
    }
}
