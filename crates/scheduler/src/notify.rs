//! Per-user daily forecast notifications.
//!
//! Each subscriber has at most one live job in the `user_notifications` log.
//! A delivered notification is rolled forward to the same local time the next
//! day. Transient failures roll forward too. Only a recipient that can never be
//! reached again loses its job.
//!
//! A replacement job is always appended before the job it replaces is deleted.
//! A crash or storage failure in between leaves a duplicate, never a gap.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveTime, Utc};
use tokio_util::sync::CancellationToken;

use weatherbell_notifier::{DeliverySink, Message, render, sticker};
use weatherbell_storage::{JobClass, JobId, ScheduledJob};

use crate::Tick;
use crate::clock::{Clock, next_occurrence};
use crate::context::{Services, WorkerConfig};
use crate::error::SchedulerError;
use crate::provider::ForecastService;
use crate::supervisor::pause;

const FIELD_USER_ID: &str = "user_id";

/// Counts from one pass over the notification log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifyReport {
    pub delivered: usize,
    /// Delivery failed but the subscription was kept.
    pub failed: usize,
    /// Jobs removed for good (unreachable recipient or unknown user).
    pub dropped: usize,
    /// Jobs moved to their next occurrence.
    pub rescheduled: usize,
}

impl NotifyReport {
    /// Subscribers whose due job was acted on.
    pub fn handled(&self) -> usize {
        self.delivered + self.failed + self.dropped
    }

    fn record(&mut self, outcome: Outcome) {
        let rescheduled = match outcome {
            Outcome::Delivered { rescheduled } => {
                self.delivered += 1;
                rescheduled
            }
            Outcome::Failed { rescheduled } => {
                self.failed += 1;
                rescheduled
            }
            Outcome::Dropped => {
                self.dropped += 1;
                false
            }
        };
        if rescheduled {
            self.rescheduled += 1;
        }
    }
}

/// What happened to one due subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Delivered { rescheduled: bool },
    Failed { rescheduled: bool },
    Dropped,
}

/// Due entries of one subscriber, oldest first.
struct DueUser {
    user_id: i64,
    execute_at: DateTime<Utc>,
    entries: Vec<JobId>,
}

pub struct NotificationScheduler {
    services: Arc<Services>,
    forecasts: Arc<ForecastService>,
    sink: Arc<dyn DeliverySink>,
    clock: Arc<dyn Clock>,
    config: WorkerConfig,
}

impl NotificationScheduler {
    pub fn new(
        services: Arc<Services>,
        forecasts: Arc<ForecastService>,
        sink: Arc<dyn DeliverySink>,
        clock: Arc<dyn Clock>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            services,
            forecasts,
            sink,
            clock,
            config,
        }
    }

    /// Notify `user_id` every day at local time `at`, replacing any earlier
    /// schedule. The first run is today if `at` is still ahead, else tomorrow.
    ///
    /// On failure the previous schedule, if any, is still in place.
    pub async fn schedule(
        &self,
        user_id: i64,
        at: NaiveTime,
    ) -> Result<DateTime<Local>, SchedulerError> {
        let (installed, execute_at) = self.append_next(user_id, at).await?;
        self.remove_except(user_id, Some(&installed)).await?;

        tracing::info!(user_id, %execute_at, "Notification scheduled");
        Ok(execute_at)
    }

    /// Drop every pending job of `user_id`. Returns how many were removed.
    pub async fn remove(&self, user_id: i64) -> Result<usize, SchedulerError> {
        self.remove_except(user_id, None).await
    }

    async fn remove_except(
        &self,
        user_id: i64,
        keep: Option<&JobId>,
    ) -> Result<usize, SchedulerError> {
        let queue = &self.services.queue;
        let owner = user_id.to_string();
        let mut removed = 0;

        for entry in queue.range_all(JobClass::UserNotify).await? {
            if Some(&entry.id) == keep {
                continue;
            }
            if entry.record.get(FIELD_USER_ID) == Some(&owner) {
                queue.delete(JobClass::UserNotify, &entry.id).await?;
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::debug!(user_id, removed, "Notification jobs removed");
        }
        Ok(removed)
    }

    /// Append the job for the next occurrence of `at`.
    async fn append_next(
        &self,
        user_id: i64,
        at: NaiveTime,
    ) -> Result<(JobId, DateTime<Local>), SchedulerError> {
        let execute_at = next_occurrence(&self.clock.now(), at)?;
        let job = ScheduledJob::Notify {
            user_id,
            execute_at: execute_at.with_timezone(&Utc),
        };
        let id = self
            .services
            .queue
            .append(JobClass::UserNotify, &job.to_record())
            .await?;
        Ok((id, execute_at))
    }

    /// Local time of day of the user's pending notification, if any.
    pub async fn scheduled_time(&self, user_id: i64) -> Result<Option<NaiveTime>, SchedulerError> {
        let entries = self.services.queue.range_all(JobClass::UserNotify).await?;

        let latest = entries
            .iter()
            .filter_map(|e| e.decode(JobClass::UserNotify).ok())
            .filter_map(|job| match job {
                ScheduledJob::Notify {
                    user_id: owner,
                    execute_at,
                } if owner == user_id => Some(execute_at),
                _ => None,
            })
            .last();

        Ok(latest.map(|at| at.with_timezone(&Local).time()))
    }

    /// Render and send today's forecast to `user_id`.
    async fn deliver(&self, user_id: i64) -> Result<(), SchedulerError> {
        let user = match self.services.users.get(user_id).await {
            Ok(user) => user,
            Err(e) if e.is_not_found() => return Err(SchedulerError::UnknownUser(user_id)),
            Err(e) => return Err(e.into()),
        };
        let city_id = user.city_id.ok_or(SchedulerError::NoCitySelected(user_id))?;

        let forecast = self.forecasts.get(city_id).await?;
        let today = self.clock.now().date_naive();
        let day = forecast
            .for_date(today)
            .ok_or(SchedulerError::NoForecastForDate {
                city_id,
                date: today,
            })?;

        let city = user.city.as_deref().unwrap_or_default();
        let sticker = if user.sticker {
            sticker::pick_sticker(day)
        } else {
            None
        };
        let message =
            Message::text(user.chat_id, render::daily_forecast(city, day)).with_sticker(sticker);

        self.sink.deliver(&message).await?;
        Ok(())
    }

    /// Deliver one due subscription and decide its future.
    async fn process(&self, due: &DueUser) -> Outcome {
        let user_id = due.user_id;

        let delivered = match self.deliver(user_id).await {
            Ok(()) => {
                tracing::info!(user_id, "Notification delivered");
                true
            }
            Err(e) if e.is_recipient_unreachable() => {
                tracing::warn!(user_id, error = %e, "Recipient unreachable, dropping subscription");
                self.drop_subscription(user_id).await;
                return Outcome::Dropped;
            }
            Err(SchedulerError::UnknownUser(_)) => {
                tracing::warn!(user_id, "Notification for unknown user, dropping job");
                self.drop_subscription(user_id).await;
                return Outcome::Dropped;
            }
            Err(e) => {
                tracing::error!(user_id, error = %e, "Notification failed, keeping subscription");
                false
            }
        };

        let rescheduled = self.roll_forward(due).await;
        if delivered {
            Outcome::Delivered { rescheduled }
        } else {
            Outcome::Failed { rescheduled }
        }
    }

    /// Append tomorrow's job, then delete the due entries it replaces.
    ///
    /// If the append fails the due entries stay, and the next pass retries.
    async fn roll_forward(&self, due: &DueUser) -> bool {
        let wall_clock = due.execute_at.with_timezone(&Local).time();

        let execute_at = match self.append_next(due.user_id, wall_clock).await {
            Ok((_, execute_at)) => execute_at,
            Err(e) => {
                tracing::error!(user_id = due.user_id, error = %e, "Failed to reschedule notification");
                return false;
            }
        };

        for id in &due.entries {
            if let Err(e) = self.services.queue.delete(JobClass::UserNotify, id).await {
                tracing::error!(user_id = due.user_id, job_id = %id, error = %e, "Failed to delete notification job");
            }
        }

        tracing::debug!(user_id = due.user_id, %execute_at, "Notification rolled forward");
        true
    }

    async fn drop_subscription(&self, user_id: i64) {
        if let Err(e) = self.remove(user_id).await {
            tracing::error!(user_id, error = %e, "Failed to drop subscription");
        }
    }

    /// One pass over the notification log, in append order.
    ///
    /// Returns `None` when the fast tier is unhealthy and nothing was read.
    pub async fn pass(&self) -> Result<Option<NotifyReport>, SchedulerError> {
        if !self.services.health.is_healthy() {
            return Ok(None);
        }

        let entries = self.services.queue.range_all(JobClass::UserNotify).await?;
        let now = self.clock.now().with_timezone(&Utc);

        let mut due: Vec<DueUser> = Vec::new();
        let mut position: HashMap<i64, usize> = HashMap::new();

        for entry in entries {
            let job = match entry.decode(JobClass::UserNotify) {
                Ok(job) => job,
                Err(e) => {
                    tracing::warn!(job_id = %entry.id, error = %e, "Dropping malformed notification job");
                    if let Err(e) = self
                        .services
                        .queue
                        .delete(JobClass::UserNotify, &entry.id)
                        .await
                    {
                        tracing::error!(job_id = %entry.id, error = %e, "Failed to delete malformed job");
                    }
                    continue;
                }
            };

            let ScheduledJob::Notify {
                user_id,
                execute_at,
            } = job
            else {
                continue;
            };
            if !job.is_due(now) {
                continue;
            }

            // Stale duplicates ride along with the first due entry.
            match position.get(&user_id) {
                Some(&i) => due[i].entries.push(entry.id),
                None => {
                    position.insert(user_id, due.len());
                    due.push(DueUser {
                        user_id,
                        execute_at,
                        entries: vec![entry.id],
                    });
                }
            }
        }

        let mut report = NotifyReport::default();
        for user in &due {
            report.record(self.process(user).await);
        }
        Ok(Some(report))
    }

    pub async fn tick(&self) -> Result<Tick, SchedulerError> {
        Ok(match self.pass().await? {
            None => Tick::Unhealthy,
            Some(report) if report.handled() == 0 => Tick::Idle,
            Some(report) => Tick::Processed(report.handled()),
        })
    }

    /// Poll until cancelled.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), SchedulerError> {
        loop {
            let outcome = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                outcome = self.pass() => outcome,
            };

            let wait = match outcome {
                Ok(None) => {
                    tracing::warn!(
                        backoff_secs = self.config.unhealthy_backoff.as_secs(),
                        "Fast tier unhealthy, notification worker backing off"
                    );
                    self.config.unhealthy_backoff
                }
                Ok(Some(report)) => {
                    if report.handled() > 0 {
                        tracing::info!(
                            delivered = report.delivered,
                            failed = report.failed,
                            dropped = report.dropped,
                            rescheduled = report.rescheduled,
                            "Notification pass finished"
                        );
                    }
                    self.config.poll_interval
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to read notification jobs");
                    self.config.poll_interval
                }
            };

            if !pause(&cancel, wait).await {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::provider::testing::StubProvider;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use weatherbell_common::types::{City, User};
    use weatherbell_notifier::DeliveryError;
    use weatherbell_storage::memory::MemoryStore;
    use weatherbell_storage::{HealthMonitor, JobQueue, JobRecord};

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<Message>>,
        fail_with: Mutex<Option<DeliveryError>>,
    }

    #[async_trait]
    impl DeliverySink for RecordingSink {
        async fn deliver(&self, message: &Message) -> Result<(), DeliveryError> {
            if let Some(e) = self.fail_with.lock().unwrap().clone() {
                return Err(e);
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    struct Fixture {
        scheduler: NotificationScheduler,
        sink: Arc<RecordingSink>,
        fast: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
    }

    fn nine_fifteen() -> NaiveTime {
        NaiveTime::from_hms_opt(9, 15, 0).unwrap()
    }

    /// Counts full scans of the log.
    struct ScanCounter {
        inner: Arc<MemoryStore>,
        scans: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl JobQueue for ScanCounter {
        async fn append(
            &self,
            class: JobClass,
            record: &JobRecord,
        ) -> weatherbell_storage::store::Result<JobId> {
            self.inner.append(class, record).await
        }

        async fn range_all(
            &self,
            class: JobClass,
        ) -> weatherbell_storage::store::Result<Vec<weatherbell_storage::QueueEntry>> {
            self.scans.fetch_add(1, Ordering::SeqCst);
            self.inner.range_all(class).await
        }

        async fn delete(
            &self,
            class: JobClass,
            id: &JobId,
        ) -> weatherbell_storage::store::Result<()> {
            self.inner.delete(class, id).await
        }
    }

    fn subscriber(tg_id: i64) -> User {
        let mut user = User::new(tg_id, tg_id * 10, "Olga");
        user.select_city(&City {
            id: 42,
            name: "Example City".to_string(),
            federal_district: String::new(),
            region: "Example Oblast".to_string(),
            city_district: None,
            street: None,
        });
        user
    }

    async fn fixture() -> Fixture {
        fixture_on(|fast| fast as Arc<dyn JobQueue>).await
    }

    async fn fixture_on(queue: impl FnOnce(Arc<MemoryStore>) -> Arc<dyn JobQueue>) -> Fixture {
        let fast = Arc::new(MemoryStore::new());
        let durable = Arc::new(MemoryStore::new());
        let health = Arc::new(HealthMonitor::new(fast.clone()));
        health.probe().await;
        let services = Arc::new(Services::from_tiers(
            fast.clone(),
            durable,
            queue(fast.clone()),
            health,
        ));

        services.users.save(&subscriber(7)).await.unwrap();

        let forecasts = Arc::new(ForecastService::new(
            services.clone(),
            Arc::new(StubProvider::default()),
        ));
        let sink = Arc::new(RecordingSink::default());
        let clock = Arc::new(ManualClock::new(
            Local.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap(),
        ));
        Fixture {
            scheduler: NotificationScheduler::new(
                services,
                forecasts,
                sink.clone(),
                clock.clone(),
                WorkerConfig::default(),
            ),
            sink,
            fast,
            clock,
        }
    }

    async fn live_jobs(store: &MemoryStore) -> usize {
        store.range_all(JobClass::UserNotify).await.unwrap().len()
    }

    #[tokio::test]
    async fn test_schedule_twice_keeps_one_job() {
        let f = fixture().await;
        f.scheduler.schedule(7, nine_fifteen()).await.unwrap();
        let later = NaiveTime::from_hms_opt(18, 30, 0).unwrap();
        f.scheduler.schedule(7, later).await.unwrap();

        assert_eq!(live_jobs(&f.fast).await, 1);
        assert_eq!(f.scheduler.scheduled_time(7).await.unwrap(), Some(later));
    }

    #[tokio::test]
    async fn test_schedule_later_today_or_tomorrow() {
        let f = fixture().await;
        let at = f.scheduler.schedule(7, nine_fifteen()).await.unwrap();
        assert_eq!(at, Local.with_ymd_and_hms(2024, 1, 2, 9, 15, 0).unwrap());

        let early = NaiveTime::from_hms_opt(6, 0, 0).unwrap();
        let at = f.scheduler.schedule(7, early).await.unwrap();
        assert_eq!(at, Local.with_ymd_and_hms(2024, 1, 3, 6, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn test_remove_and_scheduled_time() {
        let f = fixture().await;
        assert_eq!(f.scheduler.scheduled_time(7).await.unwrap(), None);

        f.scheduler.schedule(7, nine_fifteen()).await.unwrap();
        f.scheduler.schedule(8, nine_fifteen()).await.unwrap();
        assert_eq!(f.scheduler.remove(7).await.unwrap(), 1);
        assert_eq!(f.scheduler.scheduled_time(7).await.unwrap(), None);
        assert_eq!(
            f.scheduler.scheduled_time(8).await.unwrap(),
            Some(nine_fifteen())
        );
    }

    #[tokio::test]
    async fn test_delivery_rolls_forward_one_day() {
        let f = fixture().await;
        f.scheduler.schedule(7, nine_fifteen()).await.unwrap();

        assert_eq!(f.scheduler.tick().await.unwrap(), Tick::Idle);
        assert!(f.sink.sent.lock().unwrap().is_empty());

        f.clock.set(Local.with_ymd_and_hms(2024, 1, 2, 9, 15, 20).unwrap());
        assert_eq!(f.scheduler.tick().await.unwrap(), Tick::Processed(1));

        let sent = f.sink.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].chat_id, 70);
        assert!(sent[0].text.contains("Example City"));

        let jobs = f.fast.range_all(JobClass::UserNotify).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(
            jobs[0].decode(JobClass::UserNotify).unwrap().execute_at(),
            Local
                .with_ymd_and_hms(2024, 1, 3, 9, 15, 0)
                .unwrap()
                .with_timezone(&Utc)
        );
    }

    #[tokio::test]
    async fn test_unreachable_recipient_loses_job() {
        let f = fixture().await;
        f.scheduler.schedule(7, nine_fifteen()).await.unwrap();
        *f.sink.fail_with.lock().unwrap() = Some(DeliveryError::RecipientUnreachable(
            "Forbidden: bot was blocked by the user".to_string(),
        ));

        f.clock.set(Local.with_ymd_and_hms(2024, 1, 2, 9, 16, 0).unwrap());
        f.scheduler.tick().await.unwrap();

        assert_eq!(live_jobs(&f.fast).await, 0);
        assert_eq!(f.scheduler.scheduled_time(7).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_transient_failure_keeps_subscription() {
        let f = fixture().await;
        f.scheduler.schedule(7, nine_fifteen()).await.unwrap();
        *f.sink.fail_with.lock().unwrap() =
            Some(DeliveryError::Transient("Too Many Requests".to_string()));

        f.clock.set(Local.with_ymd_and_hms(2024, 1, 2, 9, 16, 0).unwrap());
        f.scheduler.tick().await.unwrap();

        let jobs = f.fast.range_all(JobClass::UserNotify).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(
            jobs[0].decode(JobClass::UserNotify).unwrap().execute_at(),
            Local
                .with_ymd_and_hms(2024, 1, 3, 9, 15, 0)
                .unwrap()
                .with_timezone(&Utc)
        );
    }

    #[tokio::test]
    async fn test_duplicate_due_entries_deliver_once() {
        let f = fixture().await;
        let job = ScheduledJob::Notify {
            user_id: 7,
            execute_at: Local
                .with_ymd_and_hms(2024, 1, 2, 7, 0, 0)
                .unwrap()
                .with_timezone(&Utc),
        };
        f.fast.append(JobClass::UserNotify, &job.to_record()).await.unwrap();
        f.fast.append(JobClass::UserNotify, &job.to_record()).await.unwrap();

        assert_eq!(f.scheduler.tick().await.unwrap(), Tick::Processed(1));
        assert_eq!(f.sink.sent.lock().unwrap().len(), 1);
        assert_eq!(live_jobs(&f.fast).await, 1);
    }

    #[tokio::test]
    async fn test_unknown_user_job_is_dropped() {
        let f = fixture().await;
        f.scheduler.schedule(404, nine_fifteen()).await.unwrap();

        f.clock.set(Local.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap());
        f.scheduler.tick().await.unwrap();
        assert_eq!(live_jobs(&f.fast).await, 0);
    }

    #[tokio::test]
    async fn test_malformed_entry_is_deleted() {
        let f = fixture().await;
        let mut record = JobRecord::new();
        record.insert("executeAt".to_string(), "0".to_string());
        f.fast.append(JobClass::UserNotify, &record).await.unwrap();

        assert_eq!(f.scheduler.tick().await.unwrap(), Tick::Idle);
        assert_eq!(live_jobs(&f.fast).await, 0);
    }

    #[tokio::test]
    async fn test_failed_reschedule_keeps_old_schedule() {
        let f = fixture().await;
        f.scheduler.schedule(7, nine_fifteen()).await.unwrap();

        f.fast.fail_appends(1);
        let later = NaiveTime::from_hms_opt(18, 30, 0).unwrap();
        assert!(f.scheduler.schedule(7, later).await.is_err());
        assert_eq!(
            f.scheduler.scheduled_time(7).await.unwrap(),
            Some(nine_fifteen())
        );
    }

    #[tokio::test]
    async fn test_failed_roll_forward_keeps_subscription() {
        let f = fixture().await;
        f.scheduler.schedule(7, nine_fifteen()).await.unwrap();

        f.clock.set(Local.with_ymd_and_hms(2024, 1, 2, 9, 16, 0).unwrap());
        f.fast.fail_appends(1);
        let report = f.scheduler.pass().await.unwrap().unwrap();
        assert_eq!(
            report,
            NotifyReport {
                delivered: 1,
                rescheduled: 0,
                ..NotifyReport::default()
            }
        );
        assert_eq!(
            f.scheduler.scheduled_time(7).await.unwrap(),
            Some(nine_fifteen())
        );

        // The due job is still there, so the next pass delivers again and
        // rolls it forward.
        let report = f.scheduler.pass().await.unwrap().unwrap();
        assert_eq!(report.delivered, 1);
        assert_eq!(report.rescheduled, 1);
        assert_eq!(f.sink.sent.lock().unwrap().len(), 2);

        let jobs = f.fast.range_all(JobClass::UserNotify).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(
            jobs[0].decode(JobClass::UserNotify).unwrap().execute_at(),
            Local
                .with_ymd_and_hms(2024, 1, 3, 9, 15, 0)
                .unwrap()
                .with_timezone(&Utc)
        );
    }

    #[tokio::test]
    async fn test_pass_reports_each_outcome() {
        let f = fixture().await;
        f.scheduler.schedule(7, nine_fifteen()).await.unwrap();
        f.scheduler.schedule(404, nine_fifteen()).await.unwrap();

        f.clock.set(Local.with_ymd_and_hms(2024, 1, 2, 9, 16, 0).unwrap());
        let report = f.scheduler.pass().await.unwrap().unwrap();
        assert_eq!(
            report,
            NotifyReport {
                delivered: 1,
                failed: 0,
                dropped: 1,
                rescheduled: 1,
            }
        );
        assert_eq!(report.handled(), 2);

        *f.sink.fail_with.lock().unwrap() =
            Some(DeliveryError::Transient("Too Many Requests".to_string()));
        f.clock.set(Local.with_ymd_and_hms(2024, 1, 3, 9, 16, 0).unwrap());
        let report = f.scheduler.pass().await.unwrap().unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.rescheduled, 1);
    }

    #[tokio::test]
    async fn test_unhealthy_pass_reads_nothing() {
        let f = fixture().await;
        f.fast.set_available(false);
        f.scheduler.services.health.probe().await;
        assert_eq!(f.scheduler.pass().await.unwrap(), None);
        assert_eq!(f.scheduler.tick().await.unwrap(), Tick::Unhealthy);
    }

    #[tokio::test]
    async fn test_pass_scans_log_once() {
        let scans = Arc::new(AtomicUsize::new(0));
        let f = fixture_on({
            let scans = scans.clone();
            move |fast| Arc::new(ScanCounter { inner: fast, scans }) as Arc<dyn JobQueue>
        })
        .await;
        for tg_id in [8, 9] {
            f.scheduler.services.users.save(&subscriber(tg_id)).await.unwrap();
        }
        for tg_id in [7, 8, 9] {
            f.scheduler.schedule(tg_id, nine_fifteen()).await.unwrap();
        }

        f.clock.set(Local.with_ymd_and_hms(2024, 1, 2, 9, 16, 0).unwrap());
        scans.store(0, Ordering::SeqCst);
        assert_eq!(f.scheduler.tick().await.unwrap(), Tick::Processed(3));
        assert_eq!(scans.load(Ordering::SeqCst), 1);
        assert_eq!(live_jobs(&f.fast).await, 3);
    }
}
