use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::segment::{Role, TranscriptSegment};

const COMPACTION_GAP_SECONDS: f64 = 0.8;

/// Append-only ordered sequence of segments, shared cheaply across tasks.
/// Append order equals non-decreasing `start` within a single source, but
/// may interleave when multiple speakers/utterances are transcribed
/// concurrently — callers reconstruct temporal order from `start`/`end`.
#[derive(Clone, Default)]
pub struct Transcript {
    segments: Arc<RwLock<Vec<TranscriptSegment>>>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Amortised O(1); any task may append concurrently.
    pub fn append(&self, segment: TranscriptSegment) {
        self.segments.write().push(segment);
    }

    /// Snapshot of every segment in append order.
    pub fn all(&self) -> Vec<TranscriptSegment> {
        self.segments.read().clone()
    }

    /// Segments with `start > t`, in original append order.
    pub fn after(&self, t: f64) -> Vec<TranscriptSegment> {
        self.segments
            .read()
            .iter()
            .filter(|s| s.start > t)
            .cloned()
            .collect()
    }

    /// Segments matching `role`, in original append order.
    pub fn with_role(&self, role: Role) -> Vec<TranscriptSegment> {
        self.segments
            .read()
            .iter()
            .filter(|s| s.role == role)
            .cloned()
            .collect()
    }

    /// Space-joined text of every segment, in append order.
    pub fn text(&self) -> String {
        self.segments
            .read()
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Set of non-null speakers across all segments.
    pub fn speakers(&self) -> std::collections::BTreeSet<String> {
        self.segments
            .read()
            .iter()
            .filter_map(|s| s.speaker.clone())
            .collect()
    }

    /// Merges adjacent segments sharing `(speaker, role)` whose gap
    /// `next.start - prev.end < 0.8s`, concatenating text with a single
    /// space and preserving the outermost `start`/`end`. Returns a new,
    /// independent transcript; `self` is unchanged.
    pub fn compact(&self) -> Transcript {
        let segments = self.segments.read();
        let mut merged: Vec<TranscriptSegment> = Vec::new();

        for seg in segments.iter() {
            let mergeable = merged.last().is_some_and(|prev| {
                prev.speaker == seg.speaker
                    && prev.role == seg.role
                    && seg.start - prev.end < COMPACTION_GAP_SECONDS
            });

            if mergeable {
                let prev = merged.last_mut().unwrap();
                prev.text = format!("{} {}", prev.text, seg.text);
                prev.end = seg.end;
            } else {
                merged.push(seg.clone());
            }
        }

        Transcript {
            segments: Arc::new(RwLock::new(merged)),
        }
    }

    /// JSON document with a top-level `segments` array, the external
    /// transcript resource shape.
    pub fn to_json(&self) -> serde_json::Value {
        #[derive(Serialize)]
        struct Wire<'a> {
            segments: &'a [TranscriptSegment],
        }
        let segments = self.segments.read();
        serde_json::to_value(Wire {
            segments: &segments,
        })
        .expect("transcript segments always serialize")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(text: &str, start: f64, end: f64, speaker: &str, role: Role) -> TranscriptSegment {
        TranscriptSegment::new(text, start, end, Some(speaker.to_string()), role)
    }

    #[test]
    fn after_returns_exact_set_in_append_order() {
        let t = Transcript::new();
        t.append(seg("a", 0.0, 1.0, "x", Role::Participant));
        t.append(seg("b", 2.0, 3.0, "x", Role::Participant));
        t.append(seg("c", 1.5, 2.5, "y", Role::Participant));
        let after1 = t.after(1.0);
        assert_eq!(after1.len(), 2);
        assert_eq!(after1[0].text, "b");
        assert_eq!(after1[1].text, "c");
    }

    #[test]
    fn compact_merges_close_same_speaker_segments() {
        let t = Transcript::new();
        t.append(seg("hello ", 0.0, 0.5, "A", Role::Participant));
        t.append(seg("world", 0.8, 1.1, "A", Role::Participant));
        t.append(seg("again", 5.0, 5.2, "A", Role::Participant));

        let compacted = t.compact().all();
        assert_eq!(compacted.len(), 2);
        assert_eq!(compacted[0].text, "hello  world");
        assert_eq!(compacted[0].start, 0.0);
        assert_eq!(compacted[0].end, 1.1);
        assert_eq!(compacted[1].text, "again");
    }

    #[test]
    fn compact_empty_transcript_is_empty() {
        let t = Transcript::new();
        assert!(t.compact().all().is_empty());
    }

    #[test]
    fn compact_does_not_merge_across_roles_or_speakers() {
        let t = Transcript::new();
        t.append(seg("hi", 0.0, 0.2, "A", Role::Participant));
        t.append(seg("hi back", 0.3, 0.5, "A", Role::Assistant));
        let compacted = t.compact().all();
        assert_eq!(compacted.len(), 2);
    }

    #[test]
    fn overlapping_utterances_preserve_append_order_not_start_order() {
        let t = Transcript::new();
        t.append(seg("x", 0.0, 1.0, "A", Role::Participant));
        t.append(seg("y", 0.2, 1.5, "B", Role::Participant));
        let all = t.all();
        assert_eq!(all[0].text, "x");
        assert_eq!(all[1].text, "y");
    }
}
