//! Time-driven reminder dispatch.
//!
//! A tick lists the games starting within the largest configured offset,
//! picks the closest due offset of each, claims the `(game, offset)` record
//! and only then talks to the notification sink. The claim is what keeps two
//! overlapping ticks (or a restarted process) from reminding anyone twice.

use std::{sync::Arc, time::SystemTime};

use futures::{StreamExt, stream};
use tokio::{
    sync::watch,
    time::{MissedTickBehavior, interval, timeout},
};
use tracing::{debug, info, warn};

use crate::{
    config::{ReminderConfig, ReminderOffset, SchedulerConfig},
    dao::{
        game_store::GameStore,
        models::{GameEntity, ParticipantId, ReminderStatus, ReminderUpdate, TimeWindow},
        storage::StorageError,
    },
    services::{
        notification::{DeliveryError, SharedSink},
        reminder_text::ReminderRenderer,
    },
    state::{
        SharedState,
        reminder_machine::{ReminderEvent, ReminderState, transition},
    },
};

/// Counters describing what a single tick did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// `(game, offset)` pairs found due.
    pub due: usize,
    /// Pairs this tick claimed.
    pub claimed: usize,
    /// Messages the sink confirmed.
    pub delivered: usize,
    /// Pairs that reached `sent`.
    pub sent: usize,
    /// Pairs left pending for a retry.
    pub retrying: usize,
    /// Pairs that reached `failed_permanent`.
    pub failed: usize,
    /// Pairs that could not be processed because of a storage error.
    pub errors: usize,
}

impl TickReport {
    fn absorb(&mut self, outcome: &PairOutcome) {
        match outcome {
            PairOutcome::NotClaimed => {}
            PairOutcome::Released | PairOutcome::ClaimLost => self.claimed += 1,
            PairOutcome::Recorded { state, delivered } => {
                self.claimed += 1;
                self.delivered += delivered;
                match state.status {
                    ReminderStatus::Pending => self.retrying += 1,
                    ReminderStatus::Sent => self.sent += 1,
                    ReminderStatus::FailedPermanent => self.failed += 1,
                }
            }
        }
    }
}

#[derive(Debug)]
enum PairOutcome {
    /// Terminal, or currently owned by another tick.
    NotClaimed,
    /// Claimed but nobody was left to remind; released without an attempt.
    Released,
    /// Outcome written back.
    Recorded {
        state: ReminderState,
        delivered: usize,
    },
    /// The lease expired and someone else took the record before the write.
    ClaimLost,
}

/// Claims due reminders and hands them to the notification sink.
#[derive(Clone)]
pub struct ReminderScheduler {
    store: Arc<dyn GameStore>,
    sink: SharedSink,
    policy: SchedulerConfig,
    reminders: ReminderConfig,
    renderer: ReminderRenderer,
}

impl ReminderScheduler {
    pub fn new(
        store: Arc<dyn GameStore>,
        sink: SharedSink,
        policy: SchedulerConfig,
        reminders: ReminderConfig,
    ) -> Self {
        let renderer = ReminderRenderer::new(reminders.utc_offset());
        Self {
            store,
            sink,
            policy,
            reminders,
            renderer,
        }
    }

    /// Run one scan at `now`.
    ///
    /// Only listing the upcoming games can fail the tick; failures of
    /// individual pairs are logged and counted in [`TickReport::errors`].
    pub async fn tick(&self, now: SystemTime) -> Result<TickReport, StorageError> {
        let window = now
            .checked_add(self.reminders.max_offset())
            .map_or(TimeWindow::after(now), |until| TimeWindow::between(now, until));
        let games = self.store.list_upcoming_games(window).await?;

        let due: Vec<(GameEntity, &ReminderOffset)> = games
            .into_iter()
            .filter(|game| game.occupied() > 0)
            .filter_map(|game| {
                due_offset(self.reminders.offsets(), game.starts_at, now).map(|offset| (game, offset))
            })
            .collect();

        let mut report = TickReport {
            due: due.len(),
            ..TickReport::default()
        };

        let outcomes: Vec<_> = stream::iter(due)
            .map(|(game, offset)| async move {
                let game_id = game.id;
                (game_id, offset, self.process(game, offset, now).await)
            })
            .boxed()
            .buffer_unordered(self.policy.concurrency)
            .collect()
            .await;

        for (game_id, offset, outcome) in outcomes {
            match outcome {
                Ok(outcome) => report.absorb(&outcome),
                Err(err) => {
                    warn!(%game_id, offset = %offset.id, error = %err, "failed to process reminder");
                    report.errors += 1;
                }
            }
        }

        if report.claimed > 0 || report.errors > 0 {
            info!(
                due = report.due,
                claimed = report.claimed,
                delivered = report.delivered,
                sent = report.sent,
                retrying = report.retrying,
                failed = report.failed,
                errors = report.errors,
                "reminder tick finished"
            );
        } else {
            debug!(due = report.due, "reminder tick finished; nothing claimed");
        }

        Ok(report)
    }

    async fn process(
        &self,
        game: GameEntity,
        offset: &ReminderOffset,
        now: SystemTime,
    ) -> Result<PairOutcome, StorageError> {
        let Some(record) = self
            .store
            .claim_reminder(game.id, offset.id.clone(), now, self.policy.claim_lease)
            .await?
        else {
            debug!(game_id = %game.id, offset = %offset.id, "reminder not claimable; skipping");
            return Ok(PairOutcome::NotClaimed);
        };
        let Some(claim_token) = record.claim_token else {
            return Ok(PairOutcome::NotClaimed);
        };

        // Occupancy may have changed since the listing.
        let Some(game) = self.store.find_game(game.id).await? else {
            // The claim may have recreated a record the deletion already removed.
            debug!(game_id = %game.id, offset = %offset.id, "game deleted after listing; dropping its reminders");
            self.store.delete_reminders(game.id).await?;
            return Ok(PairOutcome::NotClaimed);
        };
        let recipients: Vec<ParticipantId> = game
            .participants()
            .filter(|participant| !record.has_handled(*participant))
            .collect();

        let mut update = ReminderUpdate {
            game_id: game.id,
            offset_id: offset.id.clone(),
            claim_token,
            status: record.status,
            attempts: record.attempts,
            last_attempt_at: record.last_attempt_at,
            delivered_to: record.delivered_to.clone(),
            undeliverable: record.undeliverable.clone(),
        };

        if recipients.is_empty() && update.delivered_to.is_empty() && update.undeliverable.is_empty()
        {
            debug!(game_id = %game.id, offset = %offset.id, "no participants left; releasing claim");
            return Ok(match self.store.set_reminder_status(update).await? {
                true => PairOutcome::Released,
                false => PairOutcome::ClaimLost,
            });
        }

        let text = self.renderer.render(&game, offset);
        let delivered_before = update.delivered_to.len();
        let mut remaining = 0;
        for participant in recipients {
            match self.dispatch(participant, text.clone()).await {
                Ok(()) => update.delivered_to.push(participant),
                Err(DeliveryError::Permanent(reason)) => {
                    warn!(game_id = %game.id, offset = %offset.id, %participant, %reason, "participant unreachable");
                    update.undeliverable.push(participant);
                }
                Err(DeliveryError::Transient(reason)) => {
                    warn!(game_id = %game.id, offset = %offset.id, %participant, %reason, "delivery failed; will retry");
                    remaining += 1;
                }
            }
        }

        let event = if remaining > 0 {
            ReminderEvent::TransientFailure
        } else if update.delivered_to.is_empty() {
            ReminderEvent::PermanentFailure
        } else {
            ReminderEvent::Delivered
        };

        let next = match transition(ReminderState::from(&record), event, self.policy.max_attempts) {
            Ok(next) => next,
            Err(err) => {
                warn!(game_id = %game.id, offset = %offset.id, error = %err, "claimed reminder is not pending");
                return Ok(PairOutcome::ClaimLost);
            }
        };

        update.status = next.status;
        update.attempts = next.attempts;
        update.last_attempt_at = Some(now);
        let delivered = update.delivered_to.len() - delivered_before;

        if !self.store.set_reminder_status(update).await? {
            warn!(game_id = %game.id, offset = %offset.id, "claim expired before the outcome was recorded");
            return Ok(PairOutcome::ClaimLost);
        }

        debug!(
            game_id = %game.id,
            offset = %offset.id,
            status = ?next.status,
            attempts = next.attempts,
            delivered,
            "reminder outcome recorded"
        );
        Ok(PairOutcome::Recorded {
            state: next,
            delivered,
        })
    }

    async fn dispatch(&self, participant: ParticipantId, text: String) -> Result<(), DeliveryError> {
        match timeout(self.policy.dispatch_timeout, self.sink.send(participant, text)).await {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Transient(format!(
                "no answer within {:?}",
                self.policy.dispatch_timeout
            ))),
        }
    }
}

/// Closest offset whose reminder time has been reached for a game that has
/// not started yet. `offsets` must be sorted closest first.
fn due_offset(
    offsets: &[ReminderOffset],
    starts_at: SystemTime,
    now: SystemTime,
) -> Option<&ReminderOffset> {
    if starts_at <= now {
        return None;
    }
    offsets
        .iter()
        .find(|offset| {
            now.checked_add(offset.before)
                .is_none_or(|reached| starts_at <= reached)
        })
}

/// Tick on the configured interval until `shutdown` flips to `true`.
///
/// Ticks are skipped while the application is degraded.
pub async fn run(state: SharedState, sink: SharedSink, mut shutdown: watch::Receiver<bool>) {
    let policy = state.config().scheduler().clone();
    let reminders = state.config().reminders().clone();

    let mut ticker = interval(policy.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(
        tick_secs = policy.tick_interval.as_secs(),
        offsets = ?reminders.offsets().iter().map(|offset| offset.id.as_str()).collect::<Vec<_>>(),
        "reminder scheduler started"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("reminder scheduler stopping");
                    return;
                }
                continue;
            }
        }

        let Some(store) = state.game_store().await else {
            debug!("storage unavailable; skipping reminder tick");
            continue;
        };

        let scheduler =
            ReminderScheduler::new(store, sink.clone(), policy.clone(), reminders.clone());
        if let Err(err) = scheduler.tick(SystemTime::now()).await {
            warn!(error = %err, "reminder tick failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::{HashMap, VecDeque},
        sync::Mutex,
    };

    use std::time::Duration;

    use futures::future::BoxFuture;
    use time::UtcOffset;
    use uuid::Uuid;

    use super::*;
    use crate::{
        dao::{game_store::memory::MemoryGameStore, models::ReminderEntity},
        services::notification::NotificationSink,
    };

    const MINUTE: Duration = Duration::from_secs(60);

    enum Script {
        Fail(DeliveryError),
        Hang,
    }

    #[derive(Default)]
    struct SinkLog {
        delivered: Vec<ParticipantId>,
        calls: usize,
        scripts: HashMap<ParticipantId, VecDeque<Script>>,
    }

    #[derive(Clone, Default)]
    struct ScriptedSink {
        log: Arc<Mutex<SinkLog>>,
    }

    impl ScriptedSink {
        fn script(&self, participant: i64, steps: impl IntoIterator<Item = Script>) {
            self.log
                .lock()
                .unwrap()
                .scripts
                .entry(ParticipantId(participant))
                .or_default()
                .extend(steps);
        }

        fn delivered(&self) -> Vec<ParticipantId> {
            let mut delivered = self.log.lock().unwrap().delivered.clone();
            delivered.sort();
            delivered
        }

        fn calls(&self) -> usize {
            self.log.lock().unwrap().calls
        }
    }

    impl NotificationSink for ScriptedSink {
        fn send(
            &self,
            recipient: ParticipantId,
            _text: String,
        ) -> BoxFuture<'static, Result<(), DeliveryError>> {
            let log = self.log.clone();
            Box::pin(async move {
                let step = {
                    let mut log = log.lock().unwrap();
                    log.calls += 1;
                    log.scripts
                        .get_mut(&recipient)
                        .and_then(VecDeque::pop_front)
                };
                match step {
                    Some(Script::Fail(err)) => Err(err),
                    Some(Script::Hang) => {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                        Ok(())
                    }
                    None => {
                        log.lock().unwrap().delivered.push(recipient);
                        Ok(())
                    }
                }
            })
        }
    }

    struct Fixture {
        store: MemoryGameStore,
        sink: ScriptedSink,
        game_id: Uuid,
        starts_at: SystemTime,
    }

    impl Fixture {
        async fn new(players: &[i64]) -> Self {
            let store = MemoryGameStore::new();
            let starts_at = SystemTime::now() + Duration::from_secs(2 * 86_400);
            let mut game =
                GameEntity::new(starts_at, 120, "Padel Arena".into(), Some(2), ParticipantId(1));
            for (slot, player) in players.iter().enumerate() {
                game.slots[slot] = Some(ParticipantId(*player));
            }
            let game_id = game.id;
            store.insert_game(game).await.unwrap();
            Self {
                store,
                sink: ScriptedSink::default(),
                game_id,
                starts_at,
            }
        }

        fn scheduler(&self, offsets: &[u64], max_attempts: u32) -> ReminderScheduler {
            let policy = SchedulerConfig {
                tick_interval: MINUTE,
                max_attempts,
                claim_lease: Duration::from_secs(5),
                dispatch_timeout: Duration::from_millis(100),
                concurrency: 4,
            };
            let reminders = ReminderConfig::new(
                offsets.iter().copied().map(ReminderOffset::minutes).collect(),
                UtcOffset::UTC,
            );
            ReminderScheduler::new(
                Arc::new(self.store.clone()),
                Arc::new(self.sink.clone()),
                policy,
                reminders,
            )
        }

        fn before_start(&self, minutes: u32) -> SystemTime {
            self.starts_at - MINUTE * minutes
        }

        async fn records(&self) -> Vec<ReminderEntity> {
            self.store.list_reminders(self.game_id).await.unwrap()
        }
    }

    #[tokio::test]
    async fn reminder_fires_once_inside_its_window() {
        let fixture = Fixture::new(&[11, 12, 13]).await;
        let scheduler = fixture.scheduler(&[60], 3);

        let early = scheduler.tick(fixture.before_start(61)).await.unwrap();
        assert_eq!(early.due, 0);
        assert_eq!(fixture.sink.calls(), 0);

        let due = scheduler.tick(fixture.before_start(59)).await.unwrap();
        assert_eq!(due.sent, 1);
        assert_eq!(due.delivered, 3);
        assert_eq!(
            fixture.sink.delivered(),
            vec![ParticipantId(11), ParticipantId(12), ParticipantId(13)]
        );
        assert_eq!(fixture.records().await[0].status, ReminderStatus::Sent);

        let late = scheduler.tick(fixture.before_start(30)).await.unwrap();
        assert_eq!(late.claimed, 0);
        assert_eq!(fixture.sink.calls(), 3);
    }

    #[tokio::test]
    async fn overlapping_ticks_send_once() {
        let fixture = Fixture::new(&[11, 12, 13, 14]).await;
        let scheduler = fixture.scheduler(&[60], 3);
        let now = fixture.before_start(10);

        let (first, second) = tokio::join!(scheduler.tick(now), scheduler.tick(now));
        assert_eq!(first.unwrap().claimed + second.unwrap().claimed, 1);
        assert_eq!(fixture.sink.delivered().len(), 4);
        assert_eq!(fixture.sink.calls(), 4);
    }

    #[tokio::test]
    async fn transient_failure_is_retried_for_the_missing_recipient_only() {
        let fixture = Fixture::new(&[11, 12]).await;
        fixture.sink.script(
            12,
            [Script::Fail(DeliveryError::Transient("429".into()))],
        );
        let scheduler = fixture.scheduler(&[60], 3);

        let first = scheduler.tick(fixture.before_start(59)).await.unwrap();
        assert_eq!(first.retrying, 1);
        let record = &fixture.records().await[0];
        assert_eq!(record.status, ReminderStatus::Pending);
        assert_eq!(record.attempts, 1);
        assert_eq!(record.delivered_to, vec![ParticipantId(11)]);

        let second = scheduler.tick(fixture.before_start(58)).await.unwrap();
        assert_eq!(second.sent, 1);
        assert_eq!(
            fixture.sink.delivered(),
            vec![ParticipantId(11), ParticipantId(12)]
        );
        assert_eq!(fixture.sink.calls(), 3);
        assert_eq!(fixture.records().await[0].status, ReminderStatus::Sent);
    }

    #[tokio::test]
    async fn exhausting_attempts_gives_up() {
        let fixture = Fixture::new(&[11]).await;
        fixture.sink.script(
            11,
            (0..5).map(|_| Script::Fail(DeliveryError::Transient("network".into()))),
        );
        let scheduler = fixture.scheduler(&[60], 2);

        scheduler.tick(fixture.before_start(59)).await.unwrap();
        let second = scheduler.tick(fixture.before_start(58)).await.unwrap();
        assert_eq!(second.failed, 1);
        let record = &fixture.records().await[0];
        assert_eq!(record.status, ReminderStatus::FailedPermanent);
        assert_eq!(record.attempts, 2);

        scheduler.tick(fixture.before_start(57)).await.unwrap();
        assert_eq!(fixture.sink.calls(), 2);
    }

    #[tokio::test]
    async fn one_unreachable_participant_does_not_block_the_others() {
        let fixture = Fixture::new(&[11, 12, 13]).await;
        fixture.sink.script(
            12,
            [Script::Fail(DeliveryError::Permanent("blocked".into()))],
        );
        let scheduler = fixture.scheduler(&[60], 3);

        let report = scheduler.tick(fixture.before_start(59)).await.unwrap();
        assert_eq!(report.sent, 1);
        let record = &fixture.records().await[0];
        assert_eq!(record.undeliverable, vec![ParticipantId(12)]);
        assert_eq!(
            fixture.sink.delivered(),
            vec![ParticipantId(11), ParticipantId(13)]
        );
    }

    #[tokio::test]
    async fn nobody_reachable_is_a_permanent_failure() {
        let fixture = Fixture::new(&[11]).await;
        fixture.sink.script(
            11,
            [Script::Fail(DeliveryError::Permanent("chat not found".into()))],
        );
        let scheduler = fixture.scheduler(&[60], 3);

        let report = scheduler.tick(fixture.before_start(59)).await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(
            fixture.records().await[0].status,
            ReminderStatus::FailedPermanent
        );
    }

    #[tokio::test]
    async fn timed_out_dispatch_counts_as_transient() {
        let fixture = Fixture::new(&[11, 12]).await;
        fixture.sink.script(11, [Script::Hang]);
        let scheduler = fixture.scheduler(&[60], 3);

        let report = scheduler.tick(fixture.before_start(59)).await.unwrap();
        assert_eq!(report.retrying, 1);
        let record = &fixture.records().await[0];
        assert_eq!(record.status, ReminderStatus::Pending);
        assert_eq!(record.delivered_to, vec![ParticipantId(12)]);
    }

    #[tokio::test]
    async fn closest_offset_supersedes_stale_ones() {
        let fixture = Fixture::new(&[11]).await;
        let scheduler = fixture.scheduler(&[60, 24 * 60], 3);

        scheduler.tick(fixture.before_start(23 * 60)).await.unwrap();
        scheduler.tick(fixture.before_start(59)).await.unwrap();
        let offsets: Vec<String> = fixture
            .records()
            .await
            .into_iter()
            .map(|record| record.offset_id)
            .collect();
        assert_eq!(offsets, ["1h", "24h"]);
        assert_eq!(fixture.sink.calls(), 2);

        let skipping = Fixture::new(&[11]).await;
        let scheduler = skipping.scheduler(&[60, 24 * 60], 3);
        scheduler.tick(skipping.before_start(30)).await.unwrap();
        let records = skipping.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].offset_id, "1h");
    }

    #[tokio::test]
    async fn empty_games_are_not_recorded() {
        let fixture = Fixture::new(&[]).await;
        let scheduler = fixture.scheduler(&[60], 3);

        let report = scheduler.tick(fixture.before_start(30)).await.unwrap();
        assert_eq!(report.due, 0);
        assert!(fixture.records().await.is_empty());
    }

    #[tokio::test]
    async fn expired_claim_of_a_crashed_run_is_taken_over_once() {
        let fixture = Fixture::new(&[11, 12]).await;
        let scheduler = fixture.scheduler(&[60], 3);
        let lease = scheduler.policy.claim_lease;
        let crashed_at = fixture.before_start(30);

        // Claimed by a run that never wrote an outcome.
        fixture
            .store
            .claim_reminder(fixture.game_id, "1h".into(), crashed_at, lease)
            .await
            .unwrap()
            .unwrap();

        let held = scheduler.tick(crashed_at + Duration::from_secs(1)).await.unwrap();
        assert_eq!(held.due, 1);
        assert_eq!(held.claimed, 0);
        assert_eq!(fixture.sink.calls(), 0);

        let resumed = scheduler
            .tick(crashed_at + lease + Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(resumed.sent, 1);
        assert_eq!(
            fixture.sink.delivered(),
            vec![ParticipantId(11), ParticipantId(12)]
        );

        let later = scheduler.tick(crashed_at + lease * 3).await.unwrap();
        assert_eq!(later.claimed, 0);
        assert_eq!(fixture.sink.calls(), 2);
    }

    #[tokio::test]
    async fn participants_delivered_before_a_crash_are_not_messaged_again() {
        let fixture = Fixture::new(&[11, 12, 13]).await;
        let scheduler = fixture.scheduler(&[60], 3);
        let lease = scheduler.policy.claim_lease;
        let first_attempt = fixture.before_start(40);

        // An earlier attempt reached 11 only, then the retry run crashed
        // while holding the claim.
        let claimed = fixture
            .store
            .claim_reminder(fixture.game_id, "1h".into(), first_attempt, lease)
            .await
            .unwrap()
            .unwrap();
        let released = fixture
            .store
            .set_reminder_status(ReminderUpdate {
                game_id: fixture.game_id,
                offset_id: "1h".into(),
                claim_token: claimed.claim_token.unwrap(),
                status: ReminderStatus::Pending,
                attempts: 1,
                last_attempt_at: Some(first_attempt),
                delivered_to: vec![ParticipantId(11)],
                undeliverable: Vec::new(),
            })
            .await
            .unwrap();
        assert!(released);
        let crashed_at = fixture.before_start(35);
        fixture
            .store
            .claim_reminder(fixture.game_id, "1h".into(), crashed_at, lease)
            .await
            .unwrap()
            .unwrap();

        let report = scheduler
            .tick(crashed_at + lease + Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(report.sent, 1);
        assert_eq!(report.delivered, 2);
        assert_eq!(
            fixture.sink.delivered(),
            vec![ParticipantId(12), ParticipantId(13)]
        );

        let record = &fixture.records().await[0];
        assert_eq!(record.status, ReminderStatus::Sent);
        assert_eq!(record.attempts, 2);
        let mut delivered = record.delivered_to.clone();
        delivered.sort();
        assert_eq!(
            delivered,
            vec![ParticipantId(11), ParticipantId(12), ParticipantId(13)]
        );
    }

    #[tokio::test]
    async fn claim_on_a_deleted_game_leaves_no_record() {
        let fixture = Fixture::new(&[11]).await;
        let scheduler = fixture.scheduler(&[60], 3);
        let deleted = GameEntity::new(
            fixture.starts_at,
            120,
            "Padel Arena".into(),
            None,
            ParticipantId(1),
        );

        let outcome = scheduler
            .process(deleted.clone(), &ReminderOffset::minutes(60), fixture.before_start(30))
            .await
            .unwrap();
        assert!(matches!(outcome, PairOutcome::NotClaimed));
        assert!(fixture.store.list_reminders(deleted.id).await.unwrap().is_empty());
        assert_eq!(fixture.sink.calls(), 0);
    }

    #[test]
    fn due_offset_requires_an_unstarted_game() {
        let offsets = vec![ReminderOffset::minutes(60)];
        let start = SystemTime::UNIX_EPOCH + Duration::from_secs(10_000);
        assert!(due_offset(&offsets, start, start).is_none());
        assert!(due_offset(&offsets, start, start - MINUTE * 60).is_some());
        assert!(due_offset(&offsets, start, start - MINUTE * 61).is_none());
    }
}
