//! CSV → SQL statement rendering
//!
//! A template holds `{column}` placeholders; each CSV row renders one
//! statement. Placeholders are checked against the header before any row
//! is rendered.

use appcat_common::{CatalogError, Result};
use regex::Regex;
use std::collections::{BTreeSet, HashMap};

/// Insert statement for the `app_metrics` table, filled per row
pub const DEFAULT_TEMPLATE: &str = r#"INSERT INTO app_metrics (
    app_id, version, version_code, size_bytes, sha256, info_score, info_rate_count, download_count, price, release_date, new_features, upgrade_msg, target_sdk, minsdk, compile_sdk_version, min_hmos_api_level, api_release_type, created_at
) VALUES (
    'C1164531384803416384', '6.3.2.302', 1460302302, 76591487, 'f97d5eb1bc89a0d7355b65bc160d1e7e558cdac18ffd45d893058d7348899228', 4.5, 350,
    {download_count},
    0.00, 1755916501000, '来自 Ei 的数据', '来自 Ei 的数据', 18, 13, 50100, 50001, 'Release',
    '{data}'
);
"#;

/// Default output file
pub const DEFAULT_OUTPUT: &str = "gen.sql";

/// Parsed statement template
#[derive(Debug, Clone)]
pub struct SqlTemplate {
    source: String,
    placeholder: Regex,
}

impl SqlTemplate {
    pub fn new(source: impl Into<String>) -> Result<Self> {
        let placeholder = Regex::new(r"\{([^{}]+)\}")
            .map_err(|e| CatalogError::template(format!("placeholder pattern: {e}")))?;
        Ok(Self {
            source: source.into(),
            placeholder,
        })
    }

    /// The built-in `app_metrics` insert template
    pub fn builtin() -> Result<Self> {
        Self::new(DEFAULT_TEMPLATE)
    }

    /// Column names referenced by the template
    pub fn placeholders(&self) -> BTreeSet<&str> {
        self.placeholder
            .captures_iter(&self.source)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .collect()
    }

    /// Fail when a placeholder names a column the header lacks.
    pub fn validate(&self, header: &[String]) -> Result<()> {
        let missing: Vec<&str> = self
            .placeholders()
            .into_iter()
            .filter(|p| !header.iter().any(|h| h == p))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CatalogError::template(format!(
                "template references columns not in the CSV header: {} (header: {})",
                missing.join(", "),
                header.join(", ")
            )))
        }
    }

    /// Render one statement. Single quotes in values are doubled.
    pub fn render(&self, row: &HashMap<String, String>) -> Result<String> {
        let mut unknown = None;
        let rendered = self.placeholder.replace_all(&self.source, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            match row.get(name) {
                Some(value) => value.replace('\'', "''"),
                None => {
                    unknown.get_or_insert_with(|| name.to_string());
                    String::new()
                },
            }
        });

        match unknown {
            Some(name) => Err(CatalogError::template(format!("row has no value for '{{{name}}}'"))),
            None => Ok(rendered.into_owned()),
        }
    }

    /// Render every row in order and concatenate the statements.
    pub fn render_all(&self, header: &[String], rows: &[HashMap<String, String>]) -> Result<String> {
        self.validate(header)?;
        let mut out = String::new();
        for row in rows {
            out.push_str(&self.render(row)?);
        }
        Ok(out)
    }
}
