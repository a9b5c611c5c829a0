//! Assembles a timeline report page from templates.

use std::path::Path;

use tracing::info;

use super::templates::{fill, html_escape, Templates};
use super::timeline::{Timeline, TimelineEntry, TimelineItem};
use crate::error::ReportError;

/// Incrementally built HTML page.
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    templates: Templates,
    title: String,
    content: String,
}

impl ReportBuilder {
    /// Start a page whose header shows `title` and `subtitle`.
    pub fn new(templates: Templates, title: &str, subtitle: &str) -> Self {
        let title = html_escape(title);
        let header = fill(
            &templates.header,
            &[("TITLE", &title), ("SUBTITLE", &html_escape(subtitle))],
        );
        let mut content = header;
        content.push('\n');
        Self {
            templates,
            title,
            content,
        }
    }

    /// Append one item. `open` expands its details section.
    pub fn add(&mut self, item: &TimelineItem, open: bool) {
        let line = fill(
            &self.templates.timeline_item,
            &[
                ("TITLE", &html_escape(&item.title)),
                ("TIMESTAMP", &item.timestamp()),
                ("CONTENT", &item.content),
                ("ICON", item.icon.as_str()),
                ("OPEN", if open { "open" } else { "" }),
            ],
        );
        self.content.push_str(&line);
        self.content.push('\n');
    }

    pub fn spacer(&mut self) {
        self.content.push_str("<div class=\"spacer\"></div>\n");
    }

    pub fn div_start(&mut self, classes: &str) {
        self.content
            .push_str(&format!("<div class=\"{}\">", html_escape(classes)));
    }

    pub fn div_end(&mut self) {
        self.content.push_str("</div>");
    }

    /// Append every entry of a timeline inside one container.
    pub fn add_timeline(&mut self, timeline: &Timeline) {
        self.div_start("my-5");
        for entry in timeline.entries() {
            match entry {
                TimelineEntry::Item(item) => self.add(item, false),
                TimelineEntry::Spacer => self.spacer(),
            }
        }
        self.div_end();
    }

    /// The complete page.
    pub fn render(&self) -> String {
        fill(
            &self.templates.base,
            &[("TITLE", &self.title), ("CONTENT", &self.content)],
        )
    }

    pub fn save(&self, path: &Path) -> Result<(), ReportError> {
        std::fs::write(path, self.render()).map_err(|e| ReportError::io(path, e))?;
        info!("Wrote report {}", path.display());
        Ok(())
    }
}
