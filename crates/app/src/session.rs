use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use metrics::{counter, gauge};
use tokio::{
    sync::{mpsc, oneshot, watch, RwLock},
    time::{interval, sleep_until, Instant, MissedTickBehavior},
};
use tracing::{debug, info};
use ulid::Ulid;

use storefront_core::{
    AvailabilityChecker, AvailabilitySnapshot, Debouncer, DomainStatus, LookupOutcome,
    LookupTicket,
};

use crate::domain::DomainLookup;

const INPUT_BUFFER: usize = 64;
const SESSION_TTL_MINUTES: i64 = 30;
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);
/// Stand-in deadline for the debounce branch while nothing is pending.
const IDLE_WAIT: Duration = Duration::from_secs(86_400);

enum SessionInput {
    Keystroke {
        value: String,
        edit: Option<u64>,
    },
    SettleNow {
        value: String,
        reply: oneshot::Sender<u64>,
    },
}

/// Handle to one live store form: feeds keystrokes in, exposes the latest snapshot.
pub struct FormSession {
    id: String,
    input: mpsc::Sender<SessionInput>,
    status: watch::Receiver<AvailabilitySnapshot>,
    last_seen_ms: AtomicI64,
}

impl FormSession {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn snapshot(&self) -> AvailabilitySnapshot {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AvailabilitySnapshot> {
        self.status.clone()
    }

    /// Queues a raw field value; it is checked once the quiet period elapses.
    ///
    /// `edit` is the client's edit counter. A value whose counter is not newer
    /// than one already received arrived out of order and is dropped.
    pub async fn push(&self, value: String, edit: Option<u64>) -> Result<(), SessionClosed> {
        self.input
            .send(SessionInput::Keystroke { value, edit })
            .await
            .map_err(|_| SessionClosed)
    }

    /// Settles `value` immediately and waits for its lookup to finish.
    ///
    /// Used when a submission arrives before the live check has caught up. The
    /// returned snapshot is whatever the session holds once the lookup resolves,
    /// a newer value supersedes it, or `timeout` expires.
    pub async fn settle_and_wait(
        &self,
        value: &str,
        timeout: Duration,
    ) -> Result<AvailabilitySnapshot, SessionClosed> {
        let current = self.snapshot();
        if current.domain == value.trim()
            && matches!(current.status, DomainStatus::Available | DomainStatus::Taken)
        {
            return Ok(current);
        }

        let (reply, seq) = oneshot::channel();
        self.input
            .send(SessionInput::SettleNow {
                value: value.to_string(),
                reply,
            })
            .await
            .map_err(|_| SessionClosed)?;
        let seq = seq.await.map_err(|_| SessionClosed)?;

        let mut status = self.status.clone();
        let waited = tokio::time::timeout(
            timeout,
            status.wait_for(|snapshot| {
                snapshot.seq != seq || snapshot.status != DomainStatus::Checking
            }),
        )
        .await
        .map(|result| result.map(|snapshot| (*snapshot).clone()));

        match waited {
            Ok(Ok(snapshot)) => Ok(snapshot),
            Ok(Err(_)) => Err(SessionClosed),
            Err(_) => Ok(self.snapshot()),
        }
    }

    fn touch(&self, now: DateTime<Utc>) {
        self.last_seen_ms
            .store(now.timestamp_millis(), Ordering::Relaxed);
    }

    fn idle_since(&self, threshold: DateTime<Utc>) -> bool {
        self.last_seen_ms.load(Ordering::Relaxed) < threshold.timestamp_millis()
    }
}

#[derive(Debug, thiserror::Error)]
#[error("form session worker has stopped")]
pub struct SessionClosed;

/// Registry of live form sessions keyed by ULID.
#[derive(Clone)]
pub struct FormSessions {
    sessions: Arc<RwLock<HashMap<String, Arc<FormSession>>>>,
    lookup: Arc<dyn DomainLookup>,
    quiet: Duration,
}

impl FormSessions {
    pub fn new(lookup: Arc<dyn DomainLookup>, quiet: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            lookup,
            quiet,
        }
    }

    /// Starts a worker for a new form and registers it.
    pub async fn create(&self, now: DateTime<Utc>) -> Arc<FormSession> {
        let id = Ulid::new().to_string();
        let (input_tx, input_rx) = mpsc::channel(INPUT_BUFFER);
        let (status_tx, status_rx) = watch::channel(AvailabilitySnapshot::default());

        SessionWorker::new(
            id.clone(),
            self.lookup.clone(),
            self.quiet,
            input_rx,
            status_tx,
        )
        .spawn();

        let session = Arc::new(FormSession {
            id: id.clone(),
            input: input_tx,
            status: status_rx,
            last_seen_ms: AtomicI64::new(now.timestamp_millis()),
        });

        let mut guard = self.sessions.write().await;
        guard.insert(id.clone(), session.clone());
        gauge!("form_sessions_active").set(guard.len() as f64);
        drop(guard);

        debug!(stage = "session", session = %id, "form session created");
        session
    }

    /// Looks up a session and marks it as recently used.
    pub async fn get(&self, id: &str, now: DateTime<Utc>) -> Option<Arc<FormSession>> {
        let session = self.sessions.read().await.get(id).cloned()?;
        session.touch(now);
        Some(session)
    }

    /// Returns the named session, or a fresh one when it is unknown or expired.
    pub async fn get_or_create(&self, id: Option<&str>, now: DateTime<Utc>) -> Arc<FormSession> {
        if let Some(id) = id {
            if let Some(session) = self.get(id, now).await {
                return session;
            }
        }
        self.create(now).await
    }

    /// Drops sessions idle for longer than the TTL; their workers stop with them.
    pub async fn sweep(&self, now: DateTime<Utc>) -> usize {
        let threshold = now - ChronoDuration::minutes(SESSION_TTL_MINUTES);
        let mut guard = self.sessions.write().await;
        let before = guard.len();
        guard.retain(|_, session| !session.idle_since(threshold));
        let removed = before - guard.len();
        gauge!("form_sessions_active").set(guard.len() as f64);
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Owns the debouncer and checker of one form; the only writer of its status.
struct SessionWorker {
    id: String,
    lookup: Arc<dyn DomainLookup>,
    debouncer: Debouncer<String>,
    checker: AvailabilityChecker,
    last_edit: u64,
    input: mpsc::Receiver<SessionInput>,
    status: watch::Sender<AvailabilitySnapshot>,
    completions_tx: mpsc::UnboundedSender<(LookupTicket, LookupOutcome)>,
    completions_rx: mpsc::UnboundedReceiver<(LookupTicket, LookupOutcome)>,
}

impl SessionWorker {
    fn new(
        id: String,
        lookup: Arc<dyn DomainLookup>,
        quiet: Duration,
        input: mpsc::Receiver<SessionInput>,
        status: watch::Sender<AvailabilitySnapshot>,
    ) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            id,
            lookup,
            debouncer: Debouncer::new(quiet),
            checker: AvailabilityChecker::new(),
            last_edit: 0,
            input,
            status,
            completions_tx,
            completions_rx,
        }
    }

    fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run_loop())
    }

    async fn run_loop(mut self) {
        loop {
            let pending = self.debouncer.is_pending();
            let wake_at = self
                .debouncer
                .deadline()
                .map(Instant::from_std)
                .unwrap_or_else(|| Instant::now() + IDLE_WAIT);

            tokio::select! {
                input = self.input.recv() => match input {
                    Some(SessionInput::Keystroke { value, edit }) => {
                        if self.accept_edit(edit) {
                            self.debouncer.push(value, Instant::now().into_std());
                        }
                    }
                    Some(SessionInput::SettleNow { value, reply }) => {
                        self.debouncer.flush();
                        self.settle(&value);
                        let _ = reply.send(self.checker.snapshot().seq);
                    }
                    None => break,
                },
                Some((ticket, outcome)) = self.completions_rx.recv() => {
                    self.complete(ticket, outcome);
                }
                _ = sleep_until(wake_at), if pending => {
                    if let Some(value) = self.debouncer.poll(Instant::now().into_std()) {
                        self.settle(&value);
                    }
                }
            }
        }
        debug!(stage = "session", session = %self.id, "form session worker stopped");
    }

    fn accept_edit(&mut self, edit: Option<u64>) -> bool {
        match edit {
            Some(edit) if edit <= self.last_edit => {
                debug!(
                    stage = "session",
                    session = %self.id,
                    edit,
                    last_edit = self.last_edit,
                    "out-of-order keystroke dropped"
                );
                false
            }
            Some(edit) => {
                self.last_edit = edit;
                true
            }
            None => true,
        }
    }

    fn settle(&mut self, value: &str) {
        let ticket = self.checker.settle(value);
        self.publish();

        let Some(ticket) = ticket else {
            debug!(
                stage = "session",
                session = %self.id,
                domain = self.checker.domain(),
                status = self.checker.status().as_str(),
                "no lookup needed"
            );
            return;
        };
        debug!(stage = "session", session = %self.id, seq = ticket.seq, domain = %ticket.domain, "domain lookup issued");
        let lookup = self.lookup.clone();
        let completions = self.completions_tx.clone();
        tokio::spawn(async move {
            let outcome = lookup.lookup(ticket.domain.clone()).await;
            let _ = completions.send((ticket, outcome));
        });
    }

    fn complete(&mut self, ticket: LookupTicket, outcome: LookupOutcome) {
        if self.checker.resolve(&ticket, outcome) {
            debug!(
                stage = "session",
                session = %self.id,
                seq = ticket.seq,
                status = self.checker.status().as_str(),
                "domain status resolved"
            );
            self.publish();
        } else {
            counter!("domain_lookups_stale_total").increment(1);
            debug!(stage = "session", session = %self.id, seq = ticket.seq, domain = %ticket.domain, "stale domain lookup ignored");
        }
    }

    fn publish(&self) {
        self.status.send_replace(self.checker.snapshot());
    }
}

/// Background worker expiring idle form sessions.
#[derive(Clone)]
pub struct SessionSweeper {
    sessions: FormSessions,
    clock: Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>,
    interval: Duration,
}

impl SessionSweeper {
    pub fn new(sessions: FormSessions) -> Self {
        Self {
            sessions,
            clock: Arc::new(Utc::now),
            interval: SWEEP_INTERVAL,
        }
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run_loop().await;
        })
    }

    async fn run_loop(self) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let removed = self.sessions.sweep((self.clock)()).await;
            if removed > 0 {
                info!(stage = "session", removed, "expired idle form sessions");
            }
        }
    }
}
