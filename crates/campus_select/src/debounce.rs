//! Debounced query scheduler
//!
//! Turns a fast stream of query changes into a slow stream of fetch requests:
//!
//! - Each change restarts the quiet period and replaces any pending deadline
//! - When the deadline passes, exactly one request is issued, carrying the
//!   query current at that moment and a fresh generation token
//! - A result is applied only if its token is still the latest; older results
//!   are dropped silently
//! - After [`DebouncedScheduler::dispose`] nothing is ever applied again
//!
//! The scheduler is driven by explicit millisecond timestamps. A host event
//! loop polls it at [`DebouncedScheduler::next_deadline`]. The tokio driver in
//! [`crate::driver`] does the same with real timers.
//!
//! ```
//! use campus_select::debounce::DebouncedScheduler;
//!
//! let mut search = DebouncedScheduler::<String>::new(300);
//! search.on_query_change("x".to_string(), 0);
//! search.on_query_change("xy".to_string(), 100);
//!
//! assert!(search.poll(350).is_none());
//! let request = search.poll(400).unwrap();
//! assert_eq!(request.query, "xy");
//! assert!(search.poll(1_000).is_none());
//! ```

use tracing::{debug, warn};

use crate::error::FetchError;
use crate::generation::{GenerationCounter, GenerationToken};

/// Results that can report how many entries they hold
///
/// Used to tell "searched, found nothing" apart from "found something".
pub trait ResultSet {
    fn result_count(&self) -> usize;
}

impl<T> ResultSet for Vec<T> {
    fn result_count(&self) -> usize {
        self.len()
    }
}

/// A fetch the host should start now
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest<Q> {
    pub token: GenerationToken,
    pub query: Q,
}

/// Where a search stands, as far as the UI is concerned
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SearchStatus {
    /// Nothing searched yet (or the query was cleared)
    #[default]
    Idle,
    /// Waiting out the quiet period
    Pending,
    /// A request is in flight
    Searching,
    /// The latest search returned this many results
    Found(usize),
    /// The latest search ran and returned nothing
    NoResults,
    /// The latest search failed
    Failed(FetchError),
}

impl SearchStatus {
    /// Whether a search is waiting or running
    pub fn is_busy(&self) -> bool {
        matches!(self, SearchStatus::Pending | SearchStatus::Searching)
    }
}

/// What happened to a query change
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryChange {
    /// A fetch is scheduled at this deadline
    Scheduled { deadline: u64 },
    /// The query fell below the gate; pending and in-flight work was dropped
    Cleared,
    /// The scheduler is disposed
    Ignored,
}

/// What happened to a result handed to [`DebouncedScheduler::on_result`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResultOutcome<R> {
    /// The token was current; apply this to visible state
    Applied(Result<R, FetchError>),
    /// A younger request exists; the result was dropped
    Stale,
    /// The owner was disposed; the result was dropped
    Disposed,
}

impl<R> ResultOutcome<R> {
    pub fn is_applied(&self) -> bool {
        matches!(self, ResultOutcome::Applied(_))
    }
}

type QueryGate<Q> = Box<dyn Fn(&Q) -> bool + Send>;

/// Coalesces query changes into at most one fetch per quiet period
///
/// Each widget owns exactly one scheduler, with one deadline and one
/// generation counter.
pub struct DebouncedScheduler<Q> {
    quiet_period_ms: u64,
    gate: Option<QueryGate<Q>>,
    latest: Option<Q>,
    deadline: Option<u64>,
    generation: GenerationCounter,
    in_flight: Option<GenerationToken>,
    status: SearchStatus,
    disposed: bool,
}

impl<Q: std::fmt::Debug> std::fmt::Debug for DebouncedScheduler<Q> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebouncedScheduler")
            .field("quiet_period_ms", &self.quiet_period_ms)
            .field("gate", &self.gate.is_some())
            .field("latest", &self.latest)
            .field("deadline", &self.deadline)
            .field("in_flight", &self.in_flight)
            .field("status", &self.status)
            .field("disposed", &self.disposed)
            .finish()
    }
}

impl<Q> DebouncedScheduler<Q> {
    /// Create a scheduler with the given quiet period
    pub fn new(quiet_period_ms: u64) -> Self {
        Self {
            quiet_period_ms,
            gate: None,
            latest: None,
            deadline: None,
            generation: GenerationCounter::new(),
            in_flight: None,
            status: SearchStatus::Idle,
            disposed: false,
        }
    }

    /// Only schedule fetches for queries that pass `gate`
    pub fn with_gate<F>(mut self, gate: F) -> Self
    where
        F: Fn(&Q) -> bool + Send + 'static,
    {
        self.gate = Some(Box::new(gate));
        self
    }

    /// Record the latest query and restart the quiet period
    pub fn on_query_change(&mut self, query: Q, now_ms: u64) -> QueryChange {
        if self.disposed {
            return QueryChange::Ignored;
        }

        let admitted = self.gate.as_ref().map_or(true, |gate| gate(&query));
        self.latest = Some(query);

        if !admitted {
            self.deadline = None;
            self.in_flight = None;
            self.generation.invalidate();
            self.status = SearchStatus::Idle;
            debug!("query below gate, search cleared");
            return QueryChange::Cleared;
        }

        let deadline = now_ms.saturating_add(self.quiet_period_ms);
        self.deadline = Some(deadline);
        self.status = SearchStatus::Pending;
        QueryChange::Scheduled { deadline }
    }

    /// Issue the pending fetch if its quiet period has elapsed
    pub fn poll(&mut self, now_ms: u64) -> Option<FetchRequest<Q>>
    where
        Q: Clone,
    {
        if self.disposed {
            return None;
        }
        let deadline = self.deadline?;
        if now_ms < deadline {
            return None;
        }
        self.deadline = None;

        let query = self.latest.clone()?;
        let token = self.generation.issue();
        self.in_flight = Some(token);
        self.status = SearchStatus::Searching;
        debug!(token = token.raw(), "debounced fetch issued");
        Some(FetchRequest { token, query })
    }

    /// Hand back a result; it is applied only if `token` is the latest
    pub fn on_result<R: ResultSet>(
        &mut self,
        token: GenerationToken,
        result: Result<R, FetchError>,
    ) -> ResultOutcome<R> {
        if self.disposed {
            return ResultOutcome::Disposed;
        }
        if !self.generation.is_current(token) {
            debug!(token = token.raw(), "stale search result dropped");
            return ResultOutcome::Stale;
        }

        self.in_flight = None;
        // A newer query may be waiting out its quiet period; keep showing that
        let pending = self.deadline.is_some();
        match &result {
            Ok(results) => {
                if !pending {
                    self.status = match results.result_count() {
                        0 => SearchStatus::NoResults,
                        n => SearchStatus::Found(n),
                    };
                }
            }
            Err(err) => {
                warn!(token = token.raw(), error = %err, "search failed");
                if !pending {
                    self.status = SearchStatus::Failed(err.clone());
                }
            }
        }
        ResultOutcome::Applied(result)
    }

    /// Drop the pending deadline and invalidate in-flight work
    ///
    /// The scheduler stays usable; the next query change starts fresh.
    pub fn cancel(&mut self) {
        self.deadline = None;
        self.in_flight = None;
        self.generation.invalidate();
        if self.status.is_busy() {
            self.status = SearchStatus::Idle;
        }
    }

    /// Cancel everything and ignore all future events and results
    pub fn dispose(&mut self) {
        self.cancel();
        self.disposed = true;
    }

    /// When the pending fetch is due, if any
    pub fn next_deadline(&self) -> Option<u64> {
        self.deadline
    }

    pub fn status(&self) -> &SearchStatus {
        &self.status
    }

    pub fn in_flight(&self) -> Option<GenerationToken> {
        self.in_flight
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}
