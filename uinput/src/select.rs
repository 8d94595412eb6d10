//! Options, option groups and search for select inputs.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A selectable option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SelectOption {
    /// Stored value.
    pub value: String,
    /// Display text. Falls back to the value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Secondary text shown after the label.
    #[serde(default, alias = "subLabel", skip_serializing_if = "Option::is_none")]
    pub sub_label: Option<String>,
}

impl SelectOption {
    /// Option whose label is its value.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: None,
            sub_label: None,
        }
    }

    /// Set the display label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Text the option is shown and searched by.
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.value)
    }

    /// Case-insensitive substring match of the label against `query`.
    pub fn matches(&self, query: &str) -> bool {
        self.label().to_lowercase().contains(&query.to_lowercase())
    }
}

/// A labelled group of options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SelectGroup {
    /// Group identifier.
    pub value: String,
    /// Group heading. Falls back to the value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Options inside the group.
    pub options: Vec<SelectOption>,
}

impl SelectGroup {
    /// Heading of the group.
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.value)
    }
}

/// Entry of an options list: either an option or a group of options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum SelectEntry {
    /// Group of options.
    Group(SelectGroup),
    /// Single option.
    Option(SelectOption),
}

impl From<SelectOption> for SelectEntry {
    fn from(value: SelectOption) -> Self {
        SelectEntry::Option(value)
    }
}

impl From<SelectGroup> for SelectEntry {
    fn from(value: SelectGroup) -> Self {
        SelectEntry::Group(value)
    }
}

/// Whether `value` is one of the options, at any nesting level.
pub fn contains_value(entries: &[SelectEntry], value: &str) -> bool {
    entries.iter().any(|e| match e {
        SelectEntry::Option(o) => o.value == value,
        SelectEntry::Group(g) => g.value == value || g.options.iter().any(|o| o.value == value),
    })
}

/// Find the option holding `value`.
pub fn find_option<'a>(entries: &'a [SelectEntry], value: &str) -> Option<&'a SelectOption> {
    options(entries).find(|o| o.value == value)
}

/// Every option, groups flattened, in display order.
pub fn options(entries: &[SelectEntry]) -> impl Iterator<Item = &SelectOption> {
    entries.iter().flat_map(|e| match e {
        SelectEntry::Option(o) => std::slice::from_ref(o).iter(),
        SelectEntry::Group(g) => g.options.iter(),
    })
}

/// Row of a filtered options list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectRow<'a> {
    /// Group heading.
    Group(&'a str),
    /// Selectable option.
    Option(&'a SelectOption),
}

/// Options whose label contains `query`, ignoring case.
///
/// Groups keep only their matching options and disappear when none match.
pub fn filter<'a>(entries: &'a [SelectEntry], query: &str) -> Vec<SelectRow<'a>> {
    let mut rows = Vec::new();
    for entry in entries {
        match entry {
            SelectEntry::Option(o) => {
                if o.matches(query) {
                    rows.push(SelectRow::Option(o));
                }
            }
            SelectEntry::Group(g) => {
                let mut matched = g.options.iter().filter(|o| o.matches(query)).peekable();
                if matched.peek().is_some() {
                    rows.push(SelectRow::Group(g.label()));
                    rows.extend(matched.map(SelectRow::Option));
                }
            }
        }
    }
    rows
}

/// Search text and highlighted row of an open select.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectState {
    query: String,
    highlight: usize,
}

impl SelectState {
    /// Current search text.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Index of the highlighted option among the filtered options.
    pub fn highlight(&self) -> usize {
        self.highlight
    }

    /// Append to the search text.
    pub fn push(&mut self, c: char) {
        self.query.push(c);
        self.highlight = 0;
    }

    /// Remove the last search character. Returns false when already empty.
    pub fn pop(&mut self) -> bool {
        let popped = self.query.pop().is_some();
        self.highlight = 0;
        popped
    }

    /// Drop the search text.
    pub fn clear(&mut self) {
        self.query.clear();
        self.highlight = 0;
    }

    /// Move the highlight down, wrapping around.
    pub fn next(&mut self, entries: &[SelectEntry]) {
        let count = self.choices(entries).len();
        if count > 0 {
            self.highlight = (self.highlight + 1) % count;
        }
    }

    /// Move the highlight up, wrapping around.
    pub fn prev(&mut self, entries: &[SelectEntry]) {
        let count = self.choices(entries).len();
        if count > 0 {
            self.highlight = (self.highlight + count - 1) % count;
        }
    }

    /// Place the highlight on the option holding `value`, if it is visible.
    pub fn highlight_value(&mut self, entries: &[SelectEntry], value: &str) {
        if let Some(idx) = self.choices(entries).iter().position(|o| o.value == value) {
            self.highlight = idx;
        }
    }

    /// Options left after filtering.
    pub fn choices<'a>(&self, entries: &'a [SelectEntry]) -> Vec<&'a SelectOption> {
        filter(entries, &self.query)
            .into_iter()
            .filter_map(|row| match row {
                SelectRow::Option(o) => Some(o),
                SelectRow::Group(_) => None,
            })
            .collect()
    }

    /// Highlighted option, if any option is left after filtering.
    pub fn highlighted<'a>(&self, entries: &'a [SelectEntry]) -> Option<&'a SelectOption> {
        self.choices(entries).get(self.highlight).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat() -> Vec<SelectEntry> {
        ["first element", "second element", "third element"]
            .into_iter()
            .map(|v| SelectOption::new(v).into())
            .collect()
    }

    fn grouped() -> Vec<SelectEntry> {
        vec![
            SelectGroup {
                value: "fruit".into(),
                label: Some("Fruit".into()),
                options: vec![
                    SelectOption::new("apple").with_label("Apple"),
                    SelectOption::new("pear").with_label("Pear"),
                ],
            }
            .into(),
            SelectGroup {
                value: "veg".into(),
                label: None,
                options: vec![SelectOption::new("leek").with_label("Leek")],
            }
            .into(),
            SelectOption::new("other").with_label("Something else").into(),
        ]
    }

    #[test]
    fn test_filter_case_insensitive() {
        let entries = flat();
        let rows = filter(&entries, "THIRD");
        assert_eq!(rows.len(), 1);
        assert!(matches!(rows[0], SelectRow::Option(o) if o.value == "third element"));

        assert_eq!(filter(&entries, "element").len(), 3);
        assert_eq!(filter(&entries, "").len(), 3);
        assert!(filter(&entries, "fourth").is_empty());
    }

    #[test]
    fn test_filter_groups() {
        let entries = grouped();
        let rows = filter(&entries, "p");
        assert_eq!(
            rows,
            vec![
                SelectRow::Group("Fruit"),
                SelectRow::Option(&SelectOption::new("apple").with_label("Apple")),
                SelectRow::Option(&SelectOption::new("pear").with_label("Pear")),
            ]
        );

        let rows = filter(&entries, "leek");
        assert_eq!(rows[0], SelectRow::Group("veg"));
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_label_falls_back_to_value() {
        let opt = SelectOption::new("first element");
        assert_eq!(opt.label(), "first element");
        assert!(opt.matches("First"));
    }

    #[test]
    fn test_contains_value() {
        let entries = grouped();
        assert!(contains_value(&entries, "pear"));
        assert!(contains_value(&entries, "other"));
        assert!(!contains_value(&entries, "Pear"));
        assert_eq!(find_option(&entries, "leek").map(|o| o.label()), Some("Leek"));
        assert_eq!(options(&entries).count(), 4);
    }

    #[test]
    fn test_state_navigation() {
        let entries = flat();
        let mut state = SelectState::default();
        assert_eq!(state.highlighted(&entries).unwrap().value, "first element");

        state.prev(&entries);
        assert_eq!(state.highlighted(&entries).unwrap().value, "third element");
        state.next(&entries);
        assert_eq!(state.highlight(), 0);

        state.highlight_value(&entries, "second element");
        assert_eq!(state.highlight(), 1);

        for c in "thi".chars() {
            state.push(c);
        }
        assert_eq!(state.choices(&entries).len(), 1);
        assert_eq!(state.highlighted(&entries).unwrap().value, "third element");

        state.push('x');
        assert!(state.highlighted(&entries).is_none());
        assert!(state.pop());
        state.clear();
        assert!(!state.pop());
    }

    #[test]
    fn test_deserialize_entries() {
        let json = r#"[
            {"value": "a", "label": "A", "subLabel": "first"},
            {"value": "g", "label": "Group", "options": [{"value": "b"}]}
        ]"#;
        let entries: Vec<SelectEntry> = serde_json::from_str(json).unwrap();
        assert!(matches!(&entries[0], SelectEntry::Option(o) if o.sub_label.as_deref() == Some("first")));
        assert!(matches!(&entries[1], SelectEntry::Group(g) if g.options.len() == 1));
    }
}
