//! Event filtering
//!
//! Selects the records whose tag matches a requested event code and restores
//! chronological order. Matches accumulate tag by tag, so the re-sort is what
//! makes the output usable for deltas.

use std::cmp::Ordering;

use crate::types::{NormalizedRecord, TagMatch, TieBreak};

/// Filter for selecting tagged events from a normalized stream
pub struct EventFilter {
    matching: TagMatch,
    tie_break: TieBreak,
}

impl EventFilter {
    pub fn new(matching: TagMatch, tie_break: TieBreak) -> Self {
        Self {
            matching,
            tie_break,
        }
    }

    /// Collect records matching any of `tags`, sorted by time
    pub fn filter<S: AsRef<str>>(
        &self,
        records: &[NormalizedRecord],
        tags: &[S],
    ) -> Vec<NormalizedRecord> {
        let mut events = self.collect(records, tags);
        sort_events(&mut events, self.tie_break);
        events
    }

    /// Collect matches tag by tag, in accumulation order (not time-sorted)
    pub fn collect<S: AsRef<str>>(
        &self,
        records: &[NormalizedRecord],
        tags: &[S],
    ) -> Vec<NormalizedRecord> {
        let mut events = Vec::new();
        for tag in self.unique_keys(tags) {
            events.extend(
                records
                    .iter()
                    .filter(|record| self.key(&record.tag) == tag)
                    .cloned(),
            );
        }
        events
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Whether a single record tag matches `tag`
    pub fn matches(&self, record_tag: &str, tag: &str) -> bool {
        self.key(record_tag) == self.key(tag)
    }

    fn key<'a>(&self, tag: &'a str) -> &'a str {
        match self.matching {
            TagMatch::Exact => tag,
            TagMatch::Prefix(len) => match tag.char_indices().nth(len) {
                Some((end, _)) => &tag[..end],
                None => tag,
            },
        }
    }

    fn unique_keys<'a, S: AsRef<str>>(&self, tags: &'a [S]) -> Vec<&'a str> {
        let mut keys: Vec<&str> = Vec::with_capacity(tags.len());
        for tag in tags {
            let key = self.key(tag.as_ref());
            if keys.contains(&key) {
                tracing::debug!(tag = tag.as_ref(), "duplicate event tag ignored");
            } else {
                keys.push(key);
            }
        }
        keys
    }
}

/// Stable sort by time, ties ordered per `tie_break`
pub fn sort_events(events: &mut [NormalizedRecord], tie_break: TieBreak) {
    events.sort_by(|a, b| {
        let by_time = a.time_ms.total_cmp(&b.time_ms);
        match (by_time, tie_break) {
            (Ordering::Equal, TieBreak::ByTag) => a.tag.cmp(&b.tag),
            _ => by_time,
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rec(tag: &str, time_ms: f64, line: usize) -> NormalizedRecord {
        NormalizedRecord {
            tag: tag.to_string(),
            time_ms,
            line,
        }
    }

    fn tags_of(events: &[NormalizedRecord]) -> Vec<&str> {
        events.iter().map(|e| e.tag.as_str()).collect()
    }

    fn sample() -> Vec<NormalizedRecord> {
        vec![
            rec("open", 100.0, 1),
            rec("clos", 250.0, 2),
            rec("DIN3", 260.0, 3),
            rec("open", 400.0, 4),
            rec("gaze", 500.0, 5),
            rec("clos", 650.0, 6),
        ]
    }

    #[test]
    fn test_filter_resorts_tag_major_matches() {
        let filter = EventFilter::new(TagMatch::Prefix(3), TieBreak::Stable);
        let events = filter.filter(&sample(), &["clo", "ope"]);

        assert_eq!(tags_of(&events), vec!["open", "clos", "open", "clos"]);
        assert_eq!(
            events.iter().map(|e| e.time_ms).collect::<Vec<_>>(),
            vec![100.0, 250.0, 400.0, 650.0]
        );
    }

    #[test]
    fn test_requested_tags_are_truncated() {
        let filter = EventFilter::new(TagMatch::Prefix(3), TieBreak::Stable);
        let events = filter.filter(&sample(), &["gaze", "gaz"]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].line, 5);
    }

    #[test]
    fn test_exact_match() {
        let filter = EventFilter::new(TagMatch::Exact, TieBreak::Stable);
        assert_eq!(filter.filter(&sample(), &["DIN"]).len(), 0);
        assert_eq!(filter.filter(&sample(), &["DIN3"]).len(), 1);
        assert!(filter.matches("DIN3", "DIN3"));
        assert!(!filter.matches("DIN30", "DIN3"));
    }

    #[test]
    fn test_tags_are_case_sensitive() {
        let filter = EventFilter::new(TagMatch::Prefix(3), TieBreak::Stable);
        assert!(filter.filter(&sample(), &["OPE"]).is_empty());
    }

    #[test]
    fn test_tie_break_by_tag() {
        let records = vec![rec("wsq", 100.0, 1), rec("ope", 100.0, 2)];
        let stable = EventFilter::new(TagMatch::Prefix(3), TieBreak::Stable);
        let by_tag = EventFilter::new(TagMatch::Prefix(3), TieBreak::ByTag);

        assert_eq!(tags_of(&stable.filter(&records, &["wsq", "ope"])), vec!["wsq", "ope"]);
        assert_eq!(tags_of(&by_tag.filter(&records, &["wsq", "ope"])), vec!["ope", "wsq"]);
    }

    #[test]
    fn test_filter_is_deterministic() {
        let filter = EventFilter::new(TagMatch::Prefix(3), TieBreak::ByTag);
        let tags = ["gaz", "ope", "clo"];
        assert_eq!(filter.filter(&sample(), &tags), filter.filter(&sample(), &tags));
    }

    #[test]
    fn test_no_tags_no_events() {
        let filter = EventFilter::new(TagMatch::Prefix(3), TieBreak::Stable);
        let none: [&str; 0] = [];
        assert!(filter.filter(&sample(), &none).is_empty());
    }
}
