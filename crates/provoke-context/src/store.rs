use crate::summary::{clean_summary, summary_prompt};
use anyhow::Context;
use provoke_core::text::{clamp_text, collapse_whitespace};
use provoke_core::{
    BusyFlag, ContextRecord, Observation, PassKind, Provocation, ProvokeError, VideoRef,
};
use provoke_model::{GenerateRequest, GenerationClient, GenerationConfig};
use provoke_store::KvStore;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

/// Key prefix of context records.
pub const CONTEXT_PREFIX: &str = "provoke:ctx:";
/// Records retained after pruning.
pub const DEFAULT_MAX_RECORDS: usize = 25;
const NOTE_MAX_CHARS: usize = 600;
const SUMMARY_MAX_TOKENS: u32 = 512;

pub fn context_key(video_id: &str) -> String {
    format!("{CONTEXT_PREFIX}{video_id}")
}

/// Outcome of [`ContextStore::resummarize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryOutcome {
    Updated,
    /// Another summary request was in flight.
    Busy,
    NoObservations,
    /// The model answered with nothing usable; the old summary stays.
    EmptyAnswer,
}

/// Per-video context records on top of a [`KvStore`].
///
/// Storage is last-write-wins with no transaction around read-modify-write.
pub struct ContextStore {
    store: Arc<dyn KvStore>,
    max_records: usize,
    summarizing: BusyFlag,
}

impl ContextStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            max_records: DEFAULT_MAX_RECORDS,
            summarizing: BusyFlag::new(),
        }
    }

    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records.max(1);
        self
    }

    pub fn is_summarizing(&self) -> bool {
        self.summarizing.is_busy()
    }

    /// Load a record. Unreadable records are logged and treated as absent.
    pub fn load(&self, video_id: &str) -> Result<Option<ContextRecord>, ProvokeError> {
        let Some(value) = self.store.get(&context_key(video_id))? else {
            return Ok(None);
        };
        match serde_json::from_value::<ContextRecord>(value) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!(video_id, error = %e, "ignoring unreadable context record");
                Ok(None)
            }
        }
    }

    pub fn save(&self, record: &ContextRecord) -> Result<(), ProvokeError> {
        let value = serde_json::to_value(record).context("serialize context record")?;
        self.store.set(&context_key(&record.video_id), &value)?;
        Ok(())
    }

    /// Load the record for `video`, creating it on first use. Creating a
    /// record prunes the store to the most recently updated records.
    pub fn ensure_record(&self, video: &VideoRef) -> Result<ContextRecord, ProvokeError> {
        if let Some(mut record) = self.load(&video.video_id)? {
            if record.title.is_empty() && !video.title.is_empty() {
                record.title = video.title.clone();
                self.save(&record)?;
            }
            return Ok(record);
        }
        let record = ContextRecord::new(video, OffsetDateTime::now_utc());
        self.save(&record)?;
        info!(video_id = %video.video_id, "created context record");
        self.prune(self.max_records)?;
        Ok(record)
    }

    /// Append an observation (kept to the most recent 50) and bump `updated_at`.
    pub fn record_observation(
        &self,
        video_id: &str,
        start_offset_ms: u64,
        note: &str,
    ) -> Result<(), ProvokeError> {
        let note = clamp_text(&collapse_whitespace(note), NOTE_MAX_CHARS);
        if note.is_empty() {
            return Ok(());
        }
        let mut record = self.ensure_record(&VideoRef::new(video_id))?;
        record.push_observation(
            Observation {
                start_offset_ms,
                note,
            },
            OffsetDateTime::now_utc(),
        );
        self.save(&record)
    }

    /// Regenerate the summary from the latest observations and the previous summary.
    ///
    /// Overlapping calls collapse: a call made while another is in flight
    /// returns [`SummaryOutcome::Busy`] immediately.
    pub async fn resummarize(
        &self,
        client: &dyn GenerationClient,
        model: &str,
        video_id: &str,
    ) -> Result<SummaryOutcome, ProvokeError> {
        let Some(_guard) = self.summarizing.try_acquire() else {
            debug!(video_id, "summary already in flight");
            return Ok(SummaryOutcome::Busy);
        };
        let Some(record) = self.load(video_id)? else {
            return Ok(SummaryOutcome::NoObservations);
        };
        if record.observations.is_empty() {
            return Ok(SummaryOutcome::NoObservations);
        }

        let request =
            GenerateRequest::prompt(summary_prompt(&record), GenerationConfig::text(SUMMARY_MAX_TOKENS));
        let summary = clean_summary(&client.generate(model, &request).await?.text());
        if summary.is_empty() {
            debug!(video_id, "summary answer was empty");
            return Ok(SummaryOutcome::EmptyAnswer);
        }

        // Re-read so observations recorded while the request was in flight survive.
        let mut latest = self.load(video_id)?.unwrap_or(record);
        let now = OffsetDateTime::now_utc();
        latest.summary = summary;
        latest.last_summary_at = Some(now);
        latest.updated_at = now;
        self.save(&latest)?;
        Ok(SummaryOutcome::Updated)
    }

    /// Persist a committed deck, and the pass summary when one was returned.
    pub fn store_deck(
        &self,
        video: &VideoRef,
        deck: &[Provocation],
        source: PassKind,
        summary: Option<&str>,
    ) -> Result<(), ProvokeError> {
        let mut record = self.ensure_record(video)?;
        let now = OffsetDateTime::now_utc();
        record.deck = Some(deck.to_vec());
        record.deck_source = Some(source);
        if let Some(summary) = summary.map(str::trim).filter(|s| !s.is_empty()) {
            record.summary = summary.to_string();
            record.last_summary_at = Some(now);
        }
        record.updated_at = now;
        self.save(&record)
    }

    /// Keep the `keep` most recently updated records, evicting the oldest.
    /// Unreadable records are evicted first. Returns how many were removed.
    pub fn prune(&self, keep: usize) -> Result<usize, ProvokeError> {
        let keys = self.store.keys(CONTEXT_PREFIX)?;
        let mut dated: Vec<(Option<OffsetDateTime>, String)> = keys
            .into_iter()
            .map(|key| {
                let updated = self
                    .store
                    .get(&key)
                    .ok()
                    .flatten()
                    .and_then(|v| serde_json::from_value::<ContextRecord>(v).ok())
                    .map(|r| r.updated_at);
                (updated, key)
            })
            .collect();
        if dated.len() <= keep {
            return Ok(0);
        }
        // Newest first; `None` sorts below every timestamp.
        dated.sort_by(|a, b| b.0.cmp(&a.0));
        let mut removed = 0;
        for (_, key) in dated.into_iter().skip(keep) {
            self.store.remove(&key)?;
            removed += 1;
        }
        debug!(removed, keep, "pruned context records");
        Ok(removed)
    }

    /// Every readable record, most recently updated first.
    pub fn list(&self) -> Result<Vec<ContextRecord>, ProvokeError> {
        let mut records = Vec::new();
        for key in self.store.keys(CONTEXT_PREFIX)? {
            if let Some(video_id) = key.strip_prefix(CONTEXT_PREFIX) {
                if let Some(record) = self.load(video_id)? {
                    records.push(record);
                }
            }
        }
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use provoke_model::MockClient;
    use provoke_store::MemoryStore;
    use std::sync::Arc;
    use time::Duration;
    use tokio::sync::Notify;

    fn store() -> ContextStore {
        ContextStore::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn ensure_record_creates_once() {
        let ctx = store();
        let video = VideoRef::new("abc").with_title("A talk");
        let first = ctx.ensure_record(&video).unwrap();
        assert_eq!(first.url, "https://www.youtube.com/watch?v=abc");
        let again = ctx.ensure_record(&VideoRef::new("abc")).unwrap();
        assert_eq!(again.created_at, first.created_at);
        assert_eq!(again.title, "A talk");
    }

    #[test]
    fn observations_are_capped_to_latest_fifty() {
        let ctx = store();
        for i in 0..60u64 {
            ctx.record_observation("v", i * 1000, &format!("note {i}")).unwrap();
        }
        ctx.record_observation("v", 0, "   ").unwrap();
        let record = ctx.load("v").unwrap().unwrap();
        assert_eq!(record.observations.len(), 50);
        assert_eq!(record.observations[0].note, "note 10");
        assert_eq!(record.observations[49].note, "note 59");
    }

    #[tokio::test]
    async fn resummarize_without_observations_changes_nothing() {
        let ctx = store();
        let mut record = ctx.ensure_record(&VideoRef::new("v")).unwrap();
        record.summary = "- keep me".into();
        ctx.save(&record).unwrap();
        let client = MockClient::new();
        let outcome = ctx.resummarize(&client, "m", "v").await.unwrap();
        assert_eq!(outcome, SummaryOutcome::NoObservations);
        let after = ctx.load("v").unwrap().unwrap();
        assert_eq!(after.summary, "- keep me");
        assert_eq!(after.last_summary_at, None);
        assert_eq!(client.request_count(), 0);
    }

    #[tokio::test]
    async fn resummarize_overwrites_only_on_non_empty_answer() {
        let ctx = store();
        ctx.record_observation("v", 1_000, "speaker claims X").unwrap();
        let client = MockClient::new();
        client.push_text("  \n");
        client.push_text("- X is claimed\n- no evidence yet");

        assert_eq!(
            ctx.resummarize(&client, "m", "v").await.unwrap(),
            SummaryOutcome::EmptyAnswer
        );
        assert_eq!(ctx.load("v").unwrap().unwrap().last_summary_at, None);

        assert_eq!(
            ctx.resummarize(&client, "m", "v").await.unwrap(),
            SummaryOutcome::Updated
        );
        let record = ctx.load("v").unwrap().unwrap();
        assert_eq!(record.summary, "- X is claimed\n- no evidence yet");
        assert!(record.last_summary_at.is_some());
        assert!(client.requests()[1].1.prompt_text().contains("[0:01] speaker claims X"));
    }

    #[tokio::test]
    async fn overlapping_resummarize_collapses() {
        let ctx = Arc::new(store());
        ctx.record_observation("v", 0, "n").unwrap();
        let client = Arc::new(MockClient::new());
        let gate = Arc::new(Notify::new());
        client.push_gated("- one", gate.clone());

        let first = {
            let ctx = ctx.clone();
            let client = client.clone();
            tokio::spawn(async move { ctx.resummarize(client.as_ref(), "m", "v").await })
        };
        while !ctx.is_summarizing() {
            tokio::task::yield_now().await;
        }
        assert_eq!(
            ctx.resummarize(client.as_ref(), "m", "v").await.unwrap(),
            SummaryOutcome::Busy
        );
        gate.notify_one();
        assert_eq!(first.await.unwrap().unwrap(), SummaryOutcome::Updated);
        assert!(!ctx.is_summarizing());
    }

    #[tokio::test]
    async fn busy_flag_cleared_after_transport_failure() {
        let ctx = store();
        ctx.record_observation("v", 0, "n").unwrap();
        let client = MockClient::new();
        client.push_failure("timeout");
        assert!(ctx.resummarize(&client, "m", "v").await.is_err());
        assert!(!ctx.is_summarizing());
    }

    #[test]
    fn prune_keeps_most_recently_updated() {
        let ctx = store();
        let base = OffsetDateTime::now_utc();
        for i in 0..5i64 {
            let mut record = ContextRecord::new(&VideoRef::new(format!("v{i}")), base);
            record.updated_at = base + Duration::minutes(i);
            ctx.save(&record).unwrap();
        }
        assert_eq!(ctx.prune(3).unwrap(), 2);
        let ids: Vec<String> = ctx.list().unwrap().into_iter().map(|r| r.video_id).collect();
        assert_eq!(ids, vec!["v4", "v3", "v2"]);
        assert_eq!(ctx.prune(3).unwrap(), 0);
    }

    #[test]
    fn creating_a_record_prunes() {
        let ctx = store().with_max_records(2);
        let old = OffsetDateTime::now_utc() - Duration::days(1);
        for id in ["a", "b"] {
            let mut record = ContextRecord::new(&VideoRef::new(id), old);
            record.updated_at = if id == "a" { old } else { old + Duration::hours(1) };
            ctx.save(&record).unwrap();
        }
        ctx.ensure_record(&VideoRef::new("c")).unwrap();
        assert!(ctx.load("a").unwrap().is_none());
        assert!(ctx.load("b").unwrap().is_some());
        assert!(ctx.load("c").unwrap().is_some());
    }

    #[test]
    fn store_deck_sets_source_and_summary() {
        let ctx = store();
        let video = VideoRef::new("v");
        let deck = vec![Provocation {
            id: "p".into(),
            kind: "Assumption".into(),
            title: "t".into(),
            body: "b".into(),
            excerpt: String::new(),
            start_offset_ms: 0,
        }];
        ctx.store_deck(&video, &deck, PassKind::Quick, Some("  ")).unwrap();
        let record = ctx.load("v").unwrap().unwrap();
        assert_eq!(record.deck.as_deref(), Some(deck.as_slice()));
        assert_eq!(record.deck_source, Some(PassKind::Quick));
        assert_eq!(record.summary, "");
        ctx.store_deck(&video, &deck, PassKind::Deep, Some("- gist")).unwrap();
        assert_eq!(ctx.load("v").unwrap().unwrap().summary, "- gist");
    }

    #[test]
    fn unreadable_record_is_treated_as_missing() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(&context_key("bad"), &serde_json::json!({"videoId": 3})).unwrap();
        let ctx = ContextStore::new(kv);
        assert!(ctx.load("bad").unwrap().is_none());
        assert!(ctx.ensure_record(&VideoRef::new("bad")).is_ok());
    }
}
