//! Occurrence lifecycle: the weekly reset, identity retention, and the
//! content-warning report.

use chrono::NaiveDate;
use fcbot_types::CheckinDocument;

use crate::text;

/// Remove identities untouched for longer than `retention_days`.
/// Attending entries whose identity was purged go with it.
pub fn purge_stale_ids(doc: &mut CheckinDocument, today: NaiveDate, retention_days: u32) {
    let cutoff = i64::from(retention_days);
    doc.ids
        .retain(|_, record| (today - record.last_accessed).num_days() <= cutoff);
    let CheckinDocument { attending, ids, .. } = doc;
    attending.retain(|id| ids.contains_key(id));
}

/// Start a fresh occurrence: clear attendance and anonymous requests,
/// then purge stale identities.
pub fn reset_occurrence(doc: &mut CheckinDocument, today: NaiveDate, retention_days: u32) {
    doc.attending.clear();
    doc.requests.clear();
    purge_stale_ids(doc, today, retention_days);
}

/// Collect today's topics: anonymous submissions first, then each
/// attending identity's stored requests, in attendance order.
pub fn collate_topics(doc: &CheckinDocument) -> Vec<String> {
    let mut topics = doc.requests.clone();
    for id in &doc.attending {
        if let Some(record) = doc.ids.get(id) {
            topics.extend(record.requests.iter().cloned());
        }
    }
    topics
}

/// The starting announcement with the topic report appended, one
/// backtick-quoted topic per line.
pub fn starting_report(doc: &CheckinDocument) -> String {
    let mut content = format!("{}{}", text::STARTING, text::TOPIC_REPORT_LEAD);
    for topic in collate_topics(doc) {
        content.push_str(&format!("\n`{topic}`"));
    }
    content
}
