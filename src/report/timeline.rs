//! Chronological ordering of report items.

use chrono::{Duration, NaiveDateTime};

use crate::pv::ScanKind;

/// Gap between consecutive items that starts a new block.
pub const SPACER_GAP_MINUTES: i64 = 10;

/// Badge shown next to an item; also used as a CSS class suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineIcon {
    Line,
    Abf,
    LineScan,
    MarkPoints,
    SingleImage,
    TSeries,
    ZSeries,
    TZSeries,
    PointScan,
}

impl TimelineIcon {
    pub fn for_scan(kind: ScanKind) -> Self {
        match kind {
            ScanKind::LineScan => TimelineIcon::LineScan,
            ScanKind::MarkPoints => TimelineIcon::MarkPoints,
            ScanKind::SingleImage => TimelineIcon::SingleImage,
            ScanKind::TSeries => TimelineIcon::TSeries,
            ScanKind::ZSeries => TimelineIcon::ZSeries,
            ScanKind::TZSeries => TimelineIcon::TZSeries,
            ScanKind::PointScan => TimelineIcon::PointScan,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimelineIcon::Line => "line",
            TimelineIcon::Abf => "abf",
            TimelineIcon::LineScan => "linescan",
            TimelineIcon::MarkPoints => "markpoints",
            TimelineIcon::SingleImage => "singleimage",
            TimelineIcon::TSeries => "tseries",
            TimelineIcon::ZSeries => "zseries",
            TimelineIcon::TZSeries => "tzseries",
            TimelineIcon::PointScan => "pointscan",
        }
    }
}

/// One recording or scan placed on the timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineItem {
    pub started: NaiveDateTime,
    /// Time since the first item of this item's block
    pub elapsed: Duration,
    pub title: String,
    /// HTML body
    pub content: String,
    pub icon: TimelineIcon,
}

impl TimelineItem {
    pub fn new(
        started: NaiveDateTime,
        title: impl Into<String>,
        content: impl Into<String>,
        icon: TimelineIcon,
    ) -> Self {
        Self {
            started,
            elapsed: Duration::zero(),
            title: title.into(),
            content: content.into(),
            icon,
        }
    }

    /// Clock time and block-relative offset, e.g. `13:40:30 (+5:12)`.
    pub fn timestamp(&self) -> String {
        format!(
            "{} (+{})",
            self.started.format("%H:%M:%S"),
            format_elapsed(self.elapsed)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TimelineEntry {
    Item(TimelineItem),
    /// Visual break between blocks of activity
    Spacer,
}

/// Items sorted by start time, split into blocks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    entries: Vec<TimelineEntry>,
}

impl Timeline {
    /// Sort by start time and insert a spacer wherever the gap to the
    /// previous item exceeds [`SPACER_GAP_MINUTES`]. Each item's `elapsed`
    /// is measured from the first item of its block.
    pub fn sorted_with_spacers(mut items: Vec<TimelineItem>) -> Self {
        items.sort_by_key(|item| item.started);

        let gap = Duration::minutes(SPACER_GAP_MINUTES);
        let mut entries = Vec::with_capacity(items.len() * 2);
        let mut previous: Option<NaiveDateTime> = None;
        let mut block_start: Option<NaiveDateTime> = None;

        for mut item in items {
            if let Some(prev) = previous {
                if item.started - prev > gap {
                    entries.push(TimelineEntry::Spacer);
                    block_start = Some(item.started);
                }
            }
            let start = *block_start.get_or_insert(item.started);
            item.elapsed = item.started - start;
            previous = Some(item.started);
            entries.push(TimelineEntry::Item(item));
        }

        Self { entries }
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    pub fn items(&self) -> impl Iterator<Item = &TimelineItem> + '_ {
        self.entries.iter().filter_map(|e| match e {
            TimelineEntry::Item(item) => Some(item),
            TimelineEntry::Spacer => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.num_seconds().max(0);
    let (hours, minutes, seconds) = (total / 3600, (total / 60) % 60, total % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
