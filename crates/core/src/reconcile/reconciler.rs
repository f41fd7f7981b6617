//! One reconciliation pass over the watchlist.
//!
//! The pass keeps no state of its own. Whether an episode was already
//! announced lives in the store's ledger, so overlapping passes, repeated
//! sync triggers and restarts all re-derive the same decisions.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::json;

use super::{SettingsProvider, ShowMetadataProvider, WatchlistProvider};
use crate::notify::Dispatcher;
use crate::store::timestamp;
use crate::{Clock, EpisodeCandidate, Store, WatchlistEntry};

/// An episode is due when it has not aired and airs within `threshold`.
pub fn is_due(time_until_air: Duration, threshold: Duration) -> bool {
    time_until_air > Duration::zero() && time_until_air <= threshold
}

/// What one pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PassReport {
    pub shows_checked: usize,
    pub shows_skipped: usize,
    pub candidates: usize,
    pub dispatched: usize,
    pub already_sent: usize,
    pub provider_failures: usize,
    pub dispatch_failures: usize,
    pub dispatched_keys: Vec<String>,
}

pub struct Reconciler {
    store: Store,
    watchlist: Arc<dyn WatchlistProvider>,
    settings: Arc<dyn SettingsProvider>,
    metadata: Arc<dyn ShowMetadataProvider>,
    dispatcher: Arc<Dispatcher>,
    clock: Arc<dyn Clock>,
    provider_timeout: StdDuration,
}

impl Reconciler {
    /// The store doubles as watchlist and settings provider until overridden.
    pub fn new(
        store: Store, metadata: Arc<dyn ShowMetadataProvider>, dispatcher: Arc<Dispatcher>, clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            watchlist: Arc::new(store.clone()),
            settings: Arc::new(store.clone()),
            store,
            metadata,
            dispatcher,
            clock,
            provider_timeout: StdDuration::from_secs(15),
        }
    }

    pub fn with_watchlist(mut self, watchlist: Arc<dyn WatchlistProvider>) -> Self {
        self.watchlist = watchlist;
        self
    }

    pub fn with_settings(mut self, settings: Arc<dyn SettingsProvider>) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_provider_timeout(mut self, timeout: StdDuration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    /// Run one reconciliation pass. Never fails; problems are counted in the report.
    pub async fn run_pass(&self) -> PassReport {
        let mut report = PassReport::default();

        let watchlist = match self.watchlist.watchlist().await {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!(error = %e, "watchlist unavailable, skipping pass");
                return report;
            }
        };
        if watchlist.is_empty() {
            tracing::debug!("watchlist empty, nothing to reconcile");
            return report;
        }

        let settings = match self.settings.notification_settings().await {
            Ok(Some(settings)) => settings,
            Ok(None) => {
                tracing::debug!("no notification settings mirrored yet, skipping pass");
                return report;
            }
            Err(e) => {
                tracing::warn!(error = %e, "notification settings unavailable, skipping pass");
                return report;
            }
        };

        let now = self.clock.now();

        for show in &watchlist {
            report.shows_checked += 1;

            if !settings.show_enabled(show.show_id) {
                tracing::debug!(show_id = show.show_id, "notifications disabled for show");
                report.shows_skipped += 1;
                continue;
            }
            let Some(threshold) = settings.lead_time() else {
                tracing::debug!(show_id = show.show_id, "free tier without a timing, skipping show");
                report.shows_skipped += 1;
                continue;
            };

            let candidates =
                match tokio::time::timeout(self.provider_timeout, self.metadata.upcoming_episodes(show.show_id)).await
                {
                    Ok(Ok(candidates)) => candidates,
                    Ok(Err(e)) => {
                        tracing::warn!(show_id = show.show_id, error = %e, "metadata lookup failed, skipping show");
                        report.provider_failures += 1;
                        continue;
                    }
                    Err(_) => {
                        tracing::warn!(
                            show_id = show.show_id,
                            timeout_ms = self.provider_timeout.as_millis() as u64,
                            "metadata lookup timed out, skipping show"
                        );
                        report.provider_failures += 1;
                        continue;
                    }
                };

            for candidate in &candidates {
                report.candidates += 1;
                let time_until_air = candidate.air_date - now;
                if time_until_air <= Duration::zero() {
                    continue;
                }
                if !is_due(time_until_air, threshold) {
                    continue;
                }
                self.announce(show, candidate, now, &mut report).await;
            }
        }

        tracing::info!(
            shows = report.shows_checked,
            candidates = report.candidates,
            dispatched = report.dispatched,
            already_sent = report.already_sent,
            provider_failures = report.provider_failures,
            dispatch_failures = report.dispatch_failures,
            "reconciliation pass finished"
        );
        report
    }

    /// Gate on the ledger, then dispatch.
    ///
    /// The ledger claim is an atomic insert-if-absent and the only thing that
    /// decides who announces an episode. A failed dispatch gives the claim back.
    async fn announce(
        &self, show: &WatchlistEntry, candidate: &EpisodeCandidate, now: DateTime<Utc>, report: &mut PassReport,
    ) {
        let key = candidate.dedup_key();

        let claimed = match self.store.claim_notification(&key, &timestamp(now)).await {
            Ok(true) => true,
            Ok(false) => {
                tracing::debug!(key, "episode already announced or claimed by an overlapping pass");
                report.already_sent += 1;
                return;
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "ledger write failed, dispatching without a record");
                false
            }
        };

        match self.dispatcher.dispatch(show, candidate).await {
            Ok(()) => {
                report.dispatched += 1;
                report.dispatched_keys.push(key.clone());
                let payload = json!({
                    "key": key,
                    "showId": show.show_id,
                    "season": candidate.season_number,
                    "episode": candidate.episode_number,
                    "airDate": timestamp(candidate.air_date),
                });
                if let Err(e) = self.store.append_audit("episode_notified", &payload).await {
                    tracing::warn!(key, error = %e, "failed to write audit entry");
                }
            }
            Err(e) => {
                report.dispatch_failures += 1;
                tracing::warn!(key, error = %e, "dispatch failed, episode stays a candidate");
                if claimed && let Err(e) = self.store.release_notification(&key).await {
                    tracing::warn!(key, error = %e, "failed to release ledger claim");
                }
            }
        }
    }

    /// Show every host-scheduled notification that has come due.
    ///
    /// A notification whose dispatch fails is put back for the next tick.
    pub async fn fire_scheduled(&self) -> usize {
        let due = match self.store.take_due_scheduled(self.clock.now()).await {
            Ok(due) => due,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read scheduled notifications");
                return 0;
            }
        };

        let mut fired = 0;
        for scheduled in due {
            match self.dispatcher.dispatch_scheduled(&scheduled).await {
                Ok(()) => fired += 1,
                Err(e) => {
                    tracing::warn!(id = %scheduled.id, error = %e, "scheduled notification failed, requeueing");
                    if let Err(e) = self.store.schedule_notification(&scheduled).await {
                        tracing::warn!(id = %scheduled.id, error = %e, "failed to requeue scheduled notification");
                    }
                }
            }
        }
        fired
    }

    /// Everything a timer tick does.
    pub async fn tick(&self) -> PassReport {
        let report = self.run_pass().await;
        let fired = self.fire_scheduled().await;
        if fired > 0 {
            tracing::info!(fired, "scheduled notifications shown");
        }
        report
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::notify::dispatcher::tests::RecordingPlatform;
    use crate::{Error, FreeTierTiming, ManualClock, NotificationSettings, ScheduledNotification, Tier};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    pub(crate) struct FakeMetadata {
        pub episodes: Mutex<HashMap<i64, Vec<EpisodeCandidate>>>,
        pub failing: Mutex<HashSet<i64>>,
        pub hanging: Mutex<HashSet<i64>>,
        pub calls: AtomicUsize,
    }

    impl FakeMetadata {
        pub fn add(&self, episode: EpisodeCandidate) {
            self.episodes.lock().unwrap().entry(episode.show_id).or_default().push(episode);
        }
    }

    #[async_trait]
    impl ShowMetadataProvider for FakeMetadata {
        async fn upcoming_episodes(&self, show_id: i64) -> Result<Vec<EpisodeCandidate>, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.lock().unwrap().contains(&show_id) {
                return Err(Error::Provider(format!("show {show_id} lookup failed")));
            }
            if self.hanging.lock().unwrap().contains(&show_id) {
                std::future::pending::<()>().await;
            }
            Ok(self.episodes.lock().unwrap().get(&show_id).cloned().unwrap_or_default())
        }
    }

    pub(crate) fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 15, 12, 0, 0).unwrap()
    }

    pub(crate) fn candidate(show_id: i64, season: u32, episode: u32, airs_in: Duration) -> EpisodeCandidate {
        EpisodeCandidate {
            show_id,
            season_number: season,
            episode_number: episode,
            air_date: now() + airs_in,
            title: format!("Episode {episode}"),
        }
    }

    fn pro(lead_hours: u32) -> NotificationSettings {
        NotificationSettings {
            global_enabled: true,
            tier: Tier::Pro,
            pro_tier_lead_hours: lead_hours,
            ..Default::default()
        }
    }

    fn free(timing: Option<FreeTierTiming>) -> NotificationSettings {
        NotificationSettings { global_enabled: true, tier: Tier::Free, free_tier_timing: timing, ..Default::default() }
    }

    struct Harness {
        store: Store,
        metadata: Arc<FakeMetadata>,
        platform: Arc<RecordingPlatform>,
        reconciler: Reconciler,
    }

    async fn harness(watchlist: &[(i64, &str)], settings: Option<NotificationSettings>) -> Harness {
        let store = Store::open_in_memory().await.unwrap();
        let entries: Vec<WatchlistEntry> = watchlist
            .iter()
            .map(|(id, title)| WatchlistEntry { show_id: *id, title: title.to_string(), poster_url: None })
            .collect();
        store.replace_watchlist(&entries).await.unwrap();
        if let Some(settings) = settings {
            store.put_settings(&settings).await.unwrap();
        }

        let metadata = Arc::new(FakeMetadata::default());
        let platform = Arc::new(RecordingPlatform::default());
        let clock = Arc::new(ManualClock::new(now()));
        let dispatcher = Arc::new(Dispatcher::new(platform.clone(), "/icons/default.png", clock.clone()));
        let reconciler = Reconciler::new(store.clone(), metadata.clone(), dispatcher, clock);

        Harness { store, metadata, platform, reconciler }
    }

    #[tokio::test]
    async fn test_pro_scenario_dispatches_once_and_records() {
        let h = harness(&[(42, "Alpha")], Some(pro(24))).await;
        h.metadata.add(candidate(42, 2, 5, Duration::hours(20)));

        let report = h.reconciler.run_pass().await;

        assert_eq!(report.dispatched, 1);
        assert_eq!(report.dispatched_keys, vec!["42-2-5".to_string()]);
        let shown = h.platform.shown();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].title, "Alpha - New Episode!");
        assert_eq!(shown[0].body, "S2E5: Episode 5");
        assert!(h.store.get_sent("42-2-5").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rerun_does_not_redispatch() {
        let h = harness(&[(42, "Alpha")], Some(pro(24))).await;
        h.metadata.add(candidate(42, 2, 5, Duration::hours(20)));

        h.reconciler.run_pass().await;
        let second = h.reconciler.run_pass().await;

        assert_eq!(second.dispatched, 0);
        assert_eq!(second.already_sent, 1);
        assert_eq!(h.platform.shown().len(), 1);
    }

    #[tokio::test]
    async fn test_threshold_boundary() {
        let h = harness(&[(1, "Edge")], Some(pro(24))).await;
        h.metadata.add(candidate(1, 1, 1, Duration::hours(24)));
        h.metadata.add(candidate(1, 1, 2, Duration::hours(25)));

        let report = h.reconciler.run_pass().await;

        assert_eq!(report.dispatched_keys, vec!["1-1-1".to_string()]);
    }

    #[test]
    fn test_is_due_bounds() {
        let threshold = Duration::hours(24);
        assert!(is_due(Duration::hours(24), threshold));
        assert!(is_due(Duration::seconds(1), threshold));
        assert!(!is_due(Duration::hours(25), threshold));
        assert!(!is_due(Duration::zero(), threshold));
        assert!(!is_due(Duration::hours(-3), threshold));
    }

    #[tokio::test]
    async fn test_free_tier_seven_days() {
        let h = harness(&[(3, "Weekly")], Some(free(Some(FreeTierTiming::SevenDaysBefore)))).await;
        h.metadata.add(candidate(3, 1, 6, Duration::days(6)));
        h.metadata.add(candidate(3, 1, 8, Duration::days(8)));

        let report = h.reconciler.run_pass().await;

        assert_eq!(report.dispatched_keys, vec!["3-1-6".to_string()]);
    }

    #[tokio::test]
    async fn test_free_tier_twenty_four_hours() {
        let h = harness(&[(3, "Daily")], Some(free(Some(FreeTierTiming::TwentyFourHoursBefore)))).await;
        h.metadata.add(candidate(3, 1, 1, Duration::hours(23)));
        h.metadata.add(candidate(3, 1, 2, Duration::days(2)));

        let report = h.reconciler.run_pass().await;

        assert_eq!(report.dispatched_keys, vec!["3-1-1".to_string()]);
    }

    #[tokio::test]
    async fn test_free_tier_without_timing_skips_show() {
        let h = harness(&[(3, "Weekly")], Some(free(None))).await;
        h.metadata.add(candidate(3, 1, 1, Duration::hours(1)));

        let report = h.reconciler.run_pass().await;

        assert_eq!(report.dispatched, 0);
        assert_eq!(report.shows_skipped, 1);
        assert_eq!(h.metadata.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_already_aired_is_skipped() {
        let h = harness(&[(42, "Alpha")], Some(pro(24))).await;
        h.metadata.add(candidate(42, 2, 4, Duration::hours(-2)));

        let report = h.reconciler.run_pass().await;

        assert_eq!(report.candidates, 1);
        assert_eq!(report.dispatched, 0);
    }

    #[tokio::test]
    async fn test_global_disabled_dispatches_nothing() {
        let settings = NotificationSettings { global_enabled: false, ..pro(24) };
        let h = harness(&[(42, "Alpha")], Some(settings)).await;
        h.metadata.add(candidate(42, 2, 5, Duration::hours(1)));

        let report = h.reconciler.run_pass().await;

        assert_eq!(report.dispatched, 0);
        assert!(h.platform.shown().is_empty());
    }

    #[tokio::test]
    async fn test_per_show_override_disables_only_that_show() {
        let mut settings = pro(24);
        settings
            .per_show_override
            .insert("42".into(), crate::ShowOverride { enabled: false });
        let h = harness(&[(42, "Alpha"), (7, "Beta")], Some(settings)).await;
        h.metadata.add(candidate(42, 2, 5, Duration::hours(1)));
        h.metadata.add(candidate(7, 1, 1, Duration::hours(1)));

        let report = h.reconciler.run_pass().await;

        assert_eq!(report.dispatched_keys, vec!["7-1-1".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_watchlist_ends_pass() {
        let h = harness(&[], Some(pro(24))).await;

        let report = h.reconciler.run_pass().await;

        assert_eq!(report, PassReport::default());
        assert_eq!(h.metadata.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_settings_ends_pass() {
        let h = harness(&[(42, "Alpha")], None).await;
        h.metadata.add(candidate(42, 2, 5, Duration::hours(1)));

        let report = h.reconciler.run_pass().await;

        assert_eq!(report.dispatched, 0);
        assert!(h.platform.shown().is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_skips_only_that_show() {
        let h = harness(&[(1, "Broken"), (2, "Fine")], Some(pro(24))).await;
        h.metadata.failing.lock().unwrap().insert(1);
        h.metadata.add(candidate(2, 1, 1, Duration::hours(3)));

        let report = h.reconciler.run_pass().await;

        assert_eq!(report.provider_failures, 1);
        assert_eq!(report.dispatched_keys, vec!["2-1-1".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_provider_is_bounded() {
        let mut h = harness(&[(1, "Stuck"), (2, "Fine")], Some(pro(24))).await;
        h.reconciler = h.reconciler.with_provider_timeout(StdDuration::from_secs(5));
        h.metadata.hanging.lock().unwrap().insert(1);
        h.metadata.add(candidate(2, 1, 1, Duration::hours(3)));

        let report = h.reconciler.run_pass().await;

        assert_eq!(report.provider_failures, 1);
        assert_eq!(report.dispatched, 1);
    }

    #[tokio::test]
    async fn test_existing_claim_blocks_dispatch() {
        let h = harness(&[(42, "Alpha")], Some(pro(24))).await;
        h.metadata.add(candidate(42, 2, 5, Duration::hours(20)));
        assert!(h.store.claim_notification("42-2-5", "2026-10-15T11:00:00.000Z").await.unwrap());

        let report = h.reconciler.run_pass().await;

        assert_eq!(report.dispatched, 0);
        assert_eq!(report.already_sent, 1);
        assert!(h.platform.shown().is_empty());
    }

    #[tokio::test]
    async fn test_failed_dispatch_is_retried_next_pass() {
        let h = harness(&[(42, "Alpha")], Some(pro(24))).await;
        h.metadata.add(candidate(42, 2, 5, Duration::hours(20)));
        h.platform.set_failing(true);

        let first = h.reconciler.run_pass().await;
        assert_eq!(first.dispatch_failures, 1);
        assert!(!h.store.has_sent("42-2-5").await.unwrap());

        h.platform.set_failing(false);
        let second = h.reconciler.run_pass().await;
        assert_eq!(second.dispatched, 1);
        assert!(h.store.has_sent("42-2-5").await.unwrap());
    }

    #[tokio::test]
    async fn test_overlapping_passes_dispatch_once() {
        let h = harness(&[(42, "Alpha")], Some(pro(24))).await;
        h.metadata.add(candidate(42, 2, 5, Duration::hours(20)));

        let (a, b) = tokio::join!(h.reconciler.run_pass(), h.reconciler.run_pass());

        assert_eq!(a.dispatched + b.dispatched, 1);
        assert_eq!(h.platform.shown().len(), 1);
    }

    #[tokio::test]
    async fn test_successful_dispatch_is_audited() {
        let h = harness(&[(42, "Alpha")], Some(pro(24))).await;
        h.metadata.add(candidate(42, 2, 5, Duration::hours(20)));

        h.reconciler.run_pass().await;

        let audit = h.store.recent_audit(5).await.unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].kind, "episode_notified");
        assert_eq!(audit[0].payload["key"], "42-2-5");
    }

    #[tokio::test]
    async fn test_fire_scheduled_shows_due_and_requeues_failures() {
        let h = harness(&[], None).await;
        let due = ScheduledNotification {
            id: "n1".into(),
            title: "Reminder".into(),
            body: "Alpha tonight".into(),
            fire_at: now() - Duration::minutes(1),
            show_id: Some(42),
        };
        let later = ScheduledNotification { id: "n2".into(), fire_at: now() + Duration::hours(1), ..due.clone() };
        h.store.schedule_notification(&due).await.unwrap();
        h.store.schedule_notification(&later).await.unwrap();

        h.platform.set_failing(true);
        assert_eq!(h.reconciler.fire_scheduled().await, 0);
        assert_eq!(h.store.count_scheduled().await.unwrap(), 2);

        h.platform.set_failing(false);
        assert_eq!(h.reconciler.fire_scheduled().await, 1);
        assert_eq!(h.platform.shown()[0].tag, "scheduled-n1");
        assert_eq!(h.store.count_scheduled().await.unwrap(), 1);
    }
}
