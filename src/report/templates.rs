//! HTML templates for the timeline report.

use std::path::Path;

use tracing::debug;

use crate::error::ReportError;

pub const BASE_FILE: &str = "base.html";
pub const HEADER_FILE: &str = "header.html";
pub const TIMELINE_ITEM_FILE: &str = "timeline-item-details.html";

const DEFAULT_BASE: &str = include_str!("../../templates/base.html");
const DEFAULT_HEADER: &str = include_str!("../../templates/header.html");
const DEFAULT_TIMELINE_ITEM: &str = include_str!("../../templates/timeline-item-details.html");

/// Page templates with `{{NAME}}` placeholders.
///
/// - `base`: `{{TITLE}}`, `{{CONTENT}}`
/// - `header`: `{{TITLE}}`, `{{SUBTITLE}}`
/// - `timeline_item`: `{{TITLE}}`, `{{TIMESTAMP}}`, `{{CONTENT}}`, `{{ICON}}`, `{{OPEN}}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Templates {
    pub base: String,
    pub header: String,
    pub timeline_item: String,
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE.to_string(),
            header: DEFAULT_HEADER.to_string(),
            timeline_item: DEFAULT_TIMELINE_ITEM.to_string(),
        }
    }
}

impl Templates {
    /// Read all three templates from `dir`.
    pub fn load(dir: &Path) -> Result<Self, ReportError> {
        if !dir.is_dir() {
            return Err(ReportError::NotFound(dir.to_path_buf()));
        }
        let read = |name: &str| {
            let path = dir.join(name);
            std::fs::read_to_string(&path).map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ReportError::NotFound(path.clone())
                } else {
                    ReportError::io(&path, e)
                }
            })
        };

        let templates = Self {
            base: read(BASE_FILE)?,
            header: read(HEADER_FILE)?,
            timeline_item: read(TIMELINE_ITEM_FILE)?,
        };
        debug!(dir = %dir.display(), "Loaded report templates");
        Ok(templates)
    }
}

/// Replace each `{{KEY}}` with its value in a single pass.
///
/// Substituted values are copied verbatim, so placeholder text inside a value
/// is never expanded. Unknown keys are left in place.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let key = &after[..end];
        match values.iter().find(|(k, _)| *k == key) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

/// Escape HTML special characters.
pub fn html_escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}
