use serde::Serialize;

/// UI-facing classification of a proposed subdomain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DomainStatus {
    #[default]
    Idle,
    Checking,
    Available,
    Taken,
    /// The lookup itself failed; distinct from a confirmed `Taken`.
    Failed,
}

impl DomainStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Checking => "checking",
            Self::Available => "available",
            Self::Taken => "taken",
            Self::Failed => "failed",
        }
    }

    /// Message shown under the domain field; empty while idle.
    pub fn message(self) -> &'static str {
        match self {
            Self::Idle => "",
            Self::Checking => "Checking...",
            Self::Available => "Domain is available!",
            Self::Taken => "Not available. Please re-enter.",
            Self::Failed => "Error checking domain. Try again.",
        }
    }
}

/// Result of a single remote lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    Available,
    Taken,
    Failed,
}

impl LookupOutcome {
    pub fn from_taken(taken: bool) -> Self {
        if taken {
            Self::Taken
        } else {
            Self::Available
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Taken => "taken",
            Self::Failed => "failed",
        }
    }
}

impl From<LookupOutcome> for DomainStatus {
    fn from(value: LookupOutcome) -> Self {
        match value {
            LookupOutcome::Available => Self::Available,
            LookupOutcome::Taken => Self::Taken,
            LookupOutcome::Failed => Self::Failed,
        }
    }
}

/// Handle for an issued lookup. Only the ticket with the latest sequence may resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTicket {
    pub seq: u64,
    pub domain: String,
}

/// Point-in-time view of a checker, suitable for rendering or streaming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct AvailabilitySnapshot {
    pub seq: u64,
    pub domain: String,
    pub status: DomainStatus,
    pub message: &'static str,
}

/// State machine behind the live domain field.
///
/// Settled values issue sequence-numbered tickets; a completion is applied only
/// when its ticket is the most recent one issued, so a slow lookup for an older
/// value can never overwrite the status of a newer one.
#[derive(Debug, Default)]
pub struct AvailabilityChecker {
    latest_seq: u64,
    domain: String,
    status: DomainStatus,
}

impl AvailabilityChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> DomainStatus {
        self.status
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Feeds a debounced domain value into the checker.
    ///
    /// Returns a ticket when a remote lookup must be issued for the value.
    pub fn settle(&mut self, raw: &str) -> Option<LookupTicket> {
        let domain = raw.trim();
        if domain.is_empty() {
            // Bumping the sequence orphans any lookup still in flight.
            self.latest_seq += 1;
            self.domain.clear();
            self.status = DomainStatus::Idle;
            return None;
        }

        let unchanged = domain == self.domain
            && matches!(
                self.status,
                DomainStatus::Checking | DomainStatus::Available | DomainStatus::Taken
            );
        if unchanged {
            return None;
        }

        self.latest_seq += 1;
        self.domain = domain.to_string();
        self.status = DomainStatus::Checking;
        Some(LookupTicket {
            seq: self.latest_seq,
            domain: self.domain.clone(),
        })
    }

    /// Applies a lookup result. Returns `false` when the ticket has been superseded.
    pub fn resolve(&mut self, ticket: &LookupTicket, outcome: LookupOutcome) -> bool {
        if ticket.seq != self.latest_seq {
            return false;
        }
        self.status = outcome.into();
        true
    }

    pub fn snapshot(&self) -> AvailabilitySnapshot {
        AvailabilitySnapshot {
            seq: self.latest_seq,
            domain: self.domain.clone(),
            status: self.status,
            message: self.status.message(),
        }
    }
}
