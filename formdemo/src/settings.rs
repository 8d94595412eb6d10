//! Form configuration file.
//!
//! The file is TOML or JSON, picked by extension:
//!
//! ```toml
//! title = "Profile"
//! poll_interval_ms = 500
//!
//! [classes.inputItem]
//! width = 100
//!
//! [[fields]]
//! key = "phone"
//! mask = "111-111"
//! placeholder = "With mask"
//! className = "inputItem"
//!
//! [defaults]
//! phone = ""
//! ```

use std::{collections::BTreeMap, collections::BTreeSet, path::Path};

use anyhow::{Context, bail};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uinput::{
    FieldConfig, InputType, SelectEntry, SelectOption, StyleHints,
    mask,
};

use crate::values::Values;

/// Class every demo field uses.
pub const INPUT_ITEM_CLASS: &str = "inputItem";

/// Everything the form is built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct FormSettings {
    /// Heading above the fields.
    pub title: String,
    /// How often the store is checked for writes by other sessions.
    #[serde(alias = "pollIntervalMs")]
    pub poll_interval_ms: u64,
    /// Fields in display order.
    pub fields: Vec<FieldConfig>,
    /// Values used when nothing is stored. Fields not listed default to empty.
    #[serde(default)]
    pub defaults: BTreeMap<String, String>,
    /// Named style presets referenced by `class_name`.
    pub classes: BTreeMap<String, StyleHints>,
}

impl Default for FormSettings {
    fn default() -> Self {
        let inverted = StyleHints {
            fg: Some("black".into()),
            bg: Some("white".into()),
            rounded: true,
            ..Default::default()
        };
        let demo = |key: &str, placeholder: &str| FieldConfig {
            placeholder: Some(placeholder.into()),
            class_name: Some(INPUT_ITEM_CLASS.into()),
            ..FieldConfig::new(key)
        };

        let fields = vec![
            FieldConfig {
                input_type: InputType::Number,
                ..demo("first", "Number type")
            },
            demo("second", "Text type"),
            FieldConfig {
                multiline: true,
                ..demo("third", "Text multiline type")
            },
            FieldConfig {
                mask: Some("111-111".into()),
                style: inverted.clone(),
                ..demo("four", "With mask")
            },
            FieldConfig {
                options: Some(
                    ["first element", "second element", "third element"]
                        .into_iter()
                        .map(|v| SelectEntry::from(SelectOption::new(v).with_label(v)))
                        .collect(),
                ),
                style: inverted,
                ..demo("five", "Another type")
            },
        ];

        Self {
            title: "THIS IS NOT A TEST TASK".into(),
            poll_interval_ms: 500,
            defaults: fields.iter().map(|f| (f.key.clone(), String::new())).collect(),
            fields,
            classes: BTreeMap::from([(
                INPUT_ITEM_CLASS.to_string(),
                StyleHints {
                    width: Some(100),
                    ..Default::default()
                },
            )]),
        }
    }
}

impl FormSettings {
    /// Read settings from a `.toml` or `.json` file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        let settings: Self = match ext {
            "json" => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?,
            "toml" => toml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?,
            _ => bail!("Unsupported config file extension: {ext:?}"),
        };
        settings.validate()?;
        info!("loaded {} fields from {}", settings.fields.len(), path.display());
        Ok(settings)
    }

    /// Reject settings the form cannot be built from.
    ///
    /// Problems that only degrade a field, like an unusable mask or an
    /// unknown class, are logged instead.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.fields.is_empty() {
            bail!("form has no fields");
        }
        if self.poll_interval_ms == 0 {
            bail!("poll_interval_ms must be positive");
        }

        let mut keys = BTreeSet::new();
        for field in &self.fields {
            if field.key.is_empty() {
                bail!("field without key");
            }
            if !keys.insert(field.key.as_str()) {
                bail!("duplicate field key `{}`", field.key);
            }
            if let Some(m) = &field.mask
                && let Err(e) = mask::Mask::parse(m)
            {
                warn!("field `{}`: mask {m:?} is unusable ({e}), shown as text", field.key);
            }
            if let Some(class) = &field.class_name
                && !self.classes.contains_key(class)
            {
                warn!("field `{}`: unknown class `{class}`", field.key);
            }
        }

        for key in self.defaults.keys() {
            if !keys.contains(key.as_str()) {
                warn!("default for unknown field `{key}`");
            }
        }
        Ok(())
    }

    /// Mapping used when nothing usable is stored.
    pub fn default_values(&self) -> Values {
        let mut values: Values = self
            .fields
            .iter()
            .map(|f| (f.key.as_str(), ""))
            .collect();
        for (key, value) in &self.defaults {
            values.set(key, value);
        }
        values
    }

    /// Effective style of `field`: inline hints over its class preset.
    pub fn style_for(&self, field: &FieldConfig) -> StyleHints {
        match field.class_name.as_ref().and_then(|c| self.classes.get(c)) {
            Some(class) => field.style.over(class),
            None => field.style.clone(),
        }
    }

    /// JSON schema of the configuration file.
    pub fn schema() -> anyhow::Result<String> {
        let schema = schemars::schema_for!(FormSettings);
        Ok(serde_json::to_string_pretty(&schema)?)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use uinput::Variant;

    use super::*;

    #[test]
    fn test_default_demo_fields() {
        let settings = FormSettings::default();
        settings.validate().unwrap();

        let variants: Vec<&str> = settings
            .fields
            .iter()
            .map(|f| Variant::resolve(f).name())
            .collect();
        assert_eq!(variants, ["number", "text", "multiline", "masked", "select"]);

        let values = settings.default_values();
        assert_eq!(values.len(), 5);
        assert!(values.iter().all(|(_, v)| v.is_empty()));
    }

    #[test]
    fn test_style_for_merges_class() {
        let settings = FormSettings::default();
        let four = &settings.fields[3];
        let style = settings.style_for(four);
        assert_eq!(style.width, Some(100));
        assert_eq!(style.bg.as_deref(), Some("white"));
        assert!(style.rounded);

        let plain = FieldConfig::new("x");
        assert_eq!(settings.style_for(&plain), StyleHints::default());
    }

    #[test]
    fn test_load_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
            title = "Profile"
            pollIntervalMs = 250

            [[fields]]
            key = "age"
            type = "number"

            [[fields]]
            key = "bio"
            multiline = true
            maxRows = 5

            [defaults]
            age = "18"
            "#
        )
        .unwrap();

        let settings = FormSettings::load(file.path()).unwrap();
        assert_eq!(settings.title, "Profile");
        assert_eq!(settings.poll_interval_ms, 250);
        assert_eq!(settings.fields[1].max_rows, 5);

        let values = settings.default_values();
        assert_eq!(values.get("age"), "18");
        assert_eq!(values.get("bio"), "");
    }

    #[test]
    fn test_load_json_and_bad_extension() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"fields": [{{"key": "a"}}, {{"key": "b", "readOnly": true}}]}}"#).unwrap();
        let settings = FormSettings::load(file.path()).unwrap();
        assert!(settings.fields[1].read_only);
        assert_eq!(settings.poll_interval_ms, 500);

        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        assert!(FormSettings::load(file.path()).is_err());
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let settings = FormSettings {
            fields: vec![FieldConfig::new("a"), FieldConfig::new("a")],
            ..Default::default()
        };
        let err = settings.validate().unwrap_err();
        assert_eq!(err.to_string(), "duplicate field key `a`");
    }

    #[test]
    fn test_schema_mentions_fields() {
        let schema = FormSettings::schema().unwrap();
        assert!(schema.contains("\"fields\""));
        assert!(schema.contains("poll_interval_ms"));
    }
}
