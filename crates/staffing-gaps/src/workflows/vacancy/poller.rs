use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::domain::{EmployeeId, OriginType, ResponseKey, VacancyEvent};
use super::ingestion::EventIngestor;
use super::store::VacancyStore;

/// Payload handed to notification delivery for each newly seen pending event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewEventSummary {
    pub key: ResponseKey,
    pub employee_name: String,
    pub role: String,
    pub location: String,
    pub event_date: NaiveDate,
}

impl From<&VacancyEvent> for NewEventSummary {
    fn from(event: &VacancyEvent) -> Self {
        Self {
            key: event.key(),
            employee_name: event.employee_name.clone(),
            role: event.role.clone(),
            location: event.location.display_name().to_string(),
            event_date: event.event_date,
        }
    }
}

/// Notification delivery contract.
pub trait EventNotifier: Send + Sync {
    fn on_new_event(&self, summary: NewEventSummary);
}

/// Emits each new event as a structured log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl EventNotifier for LogNotifier {
    fn on_new_event(&self, summary: NewEventSummary) {
        tracing::info!(
            event = %summary.key,
            employee = %summary.employee_name,
            role = %summary.role,
            location = %summary.location,
            event_date = %summary.event_date,
            "new vacancy event"
        );
    }
}

/// Keys already reported, plus the synthetic key each (employee, origin) was
/// last reported under. The ledger event that later replaces a synthetic id
/// inherits its seen status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeenEvents {
    keys: HashSet<ResponseKey>,
    synthetic: HashMap<(EmployeeId, OriginType), ResponseKey>,
}

impl SeenEvents {
    pub fn seeded<'a>(pending: impl IntoIterator<Item = &'a VacancyEvent>) -> Self {
        let mut seen = Self::default();
        for event in pending {
            seen.record(event);
        }
        seen
    }

    /// Marks the event as seen. Returns `true` only for a vacancy not reported
    /// under any earlier key.
    fn record(&mut self, event: &VacancyEvent) -> bool {
        let key = event.key();
        if !self.keys.insert(key) {
            return false;
        }
        let Some(employee_id) = event.employee_id else {
            return true;
        };
        let identity = (employee_id, event.origin_type);
        if event.needs_creation {
            self.synthetic.insert(identity, key);
            return true;
        }
        match self.synthetic.remove(&identity) {
            Some(previous) => {
                tracing::debug!(synthetic = %previous, ledger = %key, "pending event re-keyed");
                false
            }
            None => true,
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: &ResponseKey) -> bool {
        self.keys.contains(key)
    }
}

/// Returns the updated set and a summary for every vacancy not seen before.
/// Keys are never removed, so each one is reported at most once.
pub fn diff_pending(
    mut seen: SeenEvents,
    pending: &[VacancyEvent],
) -> (SeenEvents, Vec<NewEventSummary>) {
    let fresh = pending
        .iter()
        .filter(|event| seen.record(event))
        .map(NewEventSummary::from)
        .collect();
    (seen, fresh)
}

/// Re-fetches the pending set on an interval and reports events it has not
/// seen yet. Owns the seen-set for its whole lifetime.
pub struct NewEventPoller<S, N> {
    store: Arc<S>,
    notifier: Arc<N>,
    ingestor: EventIngestor,
    interval: Duration,
    seen: Mutex<Option<SeenEvents>>,
}

impl<S, N> NewEventPoller<S, N>
where
    S: VacancyStore + 'static,
    N: EventNotifier + 'static,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>, ingestor: EventIngestor, interval: Duration) -> Self {
        Self {
            store,
            notifier,
            ingestor,
            interval,
            seen: Mutex::new(None),
        }
    }

    async fn fetch_pending(&self) -> Vec<VacancyEvent> {
        let partition = self.ingestor.run(self.store.as_ref()).await;
        if !partition.is_complete() {
            tracing::error!(
                failed_chunks = partition.failures.len(),
                unresolved = partition.unresolved,
                "poll saw store failures; diffing partial results"
            );
        }
        partition.pending
    }

    /// Seeds the seen-set with the current pending events without notifying.
    pub async fn init(&self) -> usize {
        let pending = self.fetch_pending().await;
        let seen = SeenEvents::seeded(&pending);
        let count = seen.len();
        *self.seen.lock().await = Some(seen);
        tracing::debug!(seeded = count, "new-event poller initialized");
        count
    }

    /// One poll cycle. An uninitialized poller seeds itself instead of notifying.
    pub async fn poll_once(&self) -> Vec<NewEventSummary> {
        let pending = self.fetch_pending().await;
        let mut guard = self.seen.lock().await;
        let Some(seen) = guard.take() else {
            *guard = Some(SeenEvents::seeded(&pending));
            return Vec::new();
        };

        let (seen, fresh) = diff_pending(seen, &pending);
        *guard = Some(seen);
        drop(guard);

        for summary in &fresh {
            self.notifier.on_new_event(summary.clone());
        }
        fresh
    }

    /// Forgets every seen key; the next poll re-seeds silently.
    pub async fn reset(&self) {
        *self.seen.lock().await = None;
    }

    pub async fn is_initialized(&self) -> bool {
        self.seen.lock().await.is_some()
    }

    /// Runs until `shutdown` flips to `true` or its sender is dropped.
    pub fn spawn(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let fresh = self.poll_once().await;
                        if !fresh.is_empty() {
                            tracing::debug!(count = fresh.len(), "poll reported new events");
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::info!("new-event poller stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::vacancy::domain::{ContractRef, EventId, Location};

    fn event(id: i64) -> VacancyEvent {
        VacancyEvent {
            id: EventId(id),
            origin_type: OriginType::Termination,
            employee_id: None,
            employee_name: format!("Employee {id}"),
            role: "Nurse".to_string(),
            location: Location::default(),
            contract: ContractRef::default(),
            event_date: NaiveDate::from_ymd_opt(2025, 1, 2).expect("valid date"),
            origin_status: "99-DEMITIDO".to_string(),
            needs_creation: false,
        }
    }

    #[test]
    fn diff_reports_each_key_once() {
        let seen = SeenEvents::seeded(&[event(1)]);
        let (seen, fresh) = diff_pending(seen, &[event(1), event(2)]);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].key.event_id, EventId(2));

        let (seen, again) = diff_pending(seen, &[event(1), event(2)]);
        assert!(again.is_empty());
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn events_that_leave_and_return_stay_seen() {
        let seen = SeenEvents::seeded(&[event(1)]);
        let (seen, _) = diff_pending(seen, &[]);
        let (_, fresh) = diff_pending(seen, &[event(1)]);
        assert!(fresh.is_empty());
    }

    fn synthetic(employee: i64) -> VacancyEvent {
        VacancyEvent {
            employee_id: Some(EmployeeId(employee)),
            needs_creation: true,
            ..event(employee)
        }
    }

    fn ledger_backed(id: i64, employee: i64) -> VacancyEvent {
        VacancyEvent {
            employee_id: Some(EmployeeId(employee)),
            ..event(id)
        }
    }

    #[test]
    fn ledger_event_replacing_a_synthetic_id_is_not_new() {
        let seen = SeenEvents::seeded(&[synthetic(7)]);
        let (seen, fresh) = diff_pending(seen, &[ledger_backed(8, 7)]);
        assert!(fresh.is_empty());
        assert!(seen.contains(&ledger_backed(8, 7).key()));

        let (_, fresh) = diff_pending(seen, &[ledger_backed(8, 7), ledger_backed(9, 3)]);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].key.event_id, EventId(9));
    }

    #[test]
    fn re_keying_is_per_origin() {
        let seen = SeenEvents::seeded(&[synthetic(7)]);
        let leave = VacancyEvent {
            origin_type: OriginType::Leave,
            ..ledger_backed(8, 7)
        };
        let (_, fresh) = diff_pending(seen, &[leave]);
        assert_eq!(fresh.len(), 1);
    }
}
