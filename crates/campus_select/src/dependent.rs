//! Dependent filter adapter
//!
//! Keeps a child field's candidate set in step with a parent field. Picking a
//! room, for example, narrows the time-slot picker to the slots offered in that
//! room minus the ones already booked there.
//!
//! # Lifecycle
//!
//! - Every parent change replaces the candidate set. Nothing is patched in
//!   place.
//! - Clearing the parent empties the set and disables the child.
//! - While candidates or exclusions are loading, the child is disabled.
//! - Only the response for the latest parent is applied.
//!
//! # Exclusions
//!
//! Candidates and exclusions (bookings) come from two independent sources.
//! [`ExclusionSet::NotLoaded`] is different from an empty loaded set. Until
//! exclusions arrive, nothing is offered, so no slot flashes up as available
//! and then disappears.

use futures::future::BoxFuture;
use rustc_hash::FxHashSet;
use std::hash::Hash;
use tracing::{debug, warn};

use crate::choice::Choice;
use crate::debounce::ResultOutcome;
use crate::error::FetchError;
use crate::generation::{GenerationCounter, GenerationToken};
use crate::index::CandidateSet;

/// Keys already consumed elsewhere (e.g. booked slots in a room)
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ExclusionSet<K: Eq + Hash> {
    /// Exclusion data has not arrived yet
    #[default]
    NotLoaded,
    /// Exclusion data arrived; these keys are unavailable
    Loaded(FxHashSet<K>),
}

impl<K: Eq + Hash> ExclusionSet<K> {
    /// Build a loaded set from keys
    pub fn loaded(keys: impl IntoIterator<Item = K>) -> Self {
        ExclusionSet::Loaded(keys.into_iter().collect())
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, ExclusionSet::Loaded(_))
    }

    /// Whether `key` is excluded; unknown while not loaded
    pub fn contains(&self, key: &K) -> Option<bool> {
        match self {
            ExclusionSet::NotLoaded => None,
            ExclusionSet::Loaded(keys) => Some(keys.contains(key)),
        }
    }
}

/// Drop excluded candidates
///
/// Returns `None` while exclusions are not loaded.
pub fn exclude<T: Choice>(candidates: Vec<T>, exclusions: &ExclusionSet<T::Key>) -> Option<Vec<T>> {
    match exclusions {
        ExclusionSet::NotLoaded => None,
        ExclusionSet::Loaded(keys) if keys.is_empty() => Some(candidates),
        ExclusionSet::Loaded(keys) => Some(
            candidates
                .into_iter()
                .filter(|opt| !keys.contains(&opt.key()))
                .collect(),
        ),
    }
}

/// Where the dependent field stands
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DependentState<P> {
    /// No parent selected; the child is disabled and empty
    Disabled,
    /// Candidates for `parent` are being computed
    Loading { parent: P },
    /// Candidates for `parent` are ready
    Ready { parent: P },
    /// Computing candidates for `parent` failed
    Failed { parent: P, error: FetchError },
}

/// A computation the host should start for a parent key
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DependentRequest<P> {
    pub token: GenerationToken,
    pub parent: P,
}

/// Both halves of a dependent computation, tagged with their request token
#[derive(Debug)]
pub struct DependentResponse<T: Choice> {
    pub token: GenerationToken,
    pub candidates: Result<Vec<T>, FetchError>,
    pub exclusions: Result<Vec<T::Key>, FetchError>,
}

/// Remote collaborator that supplies candidates and exclusions for a parent
pub trait CandidateSource<P, T: Choice>: Send + Sync {
    /// Every candidate that belongs to `parent` (e.g. all slots in a room)
    fn candidates(&self, parent: &P) -> BoxFuture<'static, Result<Vec<T>, FetchError>>;

    /// Keys already consumed under `parent` (e.g. booked slots)
    fn exclusions(&self, parent: &P) -> BoxFuture<'static, Result<Vec<T::Key>, FetchError>>;
}

/// Load candidates and exclusions for `request` concurrently
pub async fn fetch_dependent<P, T, S>(source: &S, request: &DependentRequest<P>) -> DependentResponse<T>
where
    T: Choice,
    S: CandidateSource<P, T> + ?Sized,
{
    let (candidates, exclusions) = futures::join!(
        source.candidates(&request.parent),
        source.exclusions(&request.parent)
    );
    DependentResponse {
        token: request.token,
        candidates,
        exclusions,
    }
}

/// Compute the constrained candidate list for one parent
pub async fn compute_candidates<P, T, S>(source: &S, parent: &P) -> Result<Vec<T>, FetchError>
where
    T: Choice,
    S: CandidateSource<P, T> + ?Sized,
{
    let (candidates, exclusions) =
        futures::future::try_join(source.candidates(parent), source.exclusions(parent)).await?;
    Ok(exclude(candidates, &ExclusionSet::loaded(exclusions)).unwrap_or_default())
}

/// Candidate set for a child field that depends on a parent key
pub struct DependentFilter<P, T: Choice> {
    state: DependentState<P>,
    candidates: CandidateSet<T>,
    /// Candidates received for the current token, waiting on exclusions
    staged: Option<Vec<T>>,
    exclusions: ExclusionSet<T::Key>,
    generation: GenerationCounter,
    disposed: bool,
}

impl<P: Clone + std::fmt::Debug, T: Choice> DependentFilter<P, T> {
    pub fn new() -> Self {
        Self {
            state: DependentState::Disabled,
            candidates: CandidateSet::empty(),
            staged: None,
            exclusions: ExclusionSet::NotLoaded,
            generation: GenerationCounter::new(),
            disposed: false,
        }
    }

    /// React to a parent change (including clearing it)
    ///
    /// Returns the computation to start, if any. Any earlier computation goes
    /// stale.
    pub fn set_parent(&mut self, parent: Option<P>) -> Option<DependentRequest<P>> {
        if self.disposed {
            return None;
        }

        self.candidates = CandidateSet::empty();
        self.staged = None;
        self.exclusions = ExclusionSet::NotLoaded;

        match parent {
            None => {
                self.generation.invalidate();
                self.state = DependentState::Disabled;
                debug!("parent cleared, dependent field disabled");
                None
            }
            Some(parent) => {
                let token = self.generation.issue();
                debug!(?parent, token = token.raw(), "dependent candidates requested");
                self.state = DependentState::Loading {
                    parent: parent.clone(),
                };
                Some(DependentRequest { token, parent })
            }
        }
    }

    /// Apply candidates for `token`
    pub fn on_candidates(
        &mut self,
        token: GenerationToken,
        result: Result<Vec<T>, FetchError>,
    ) -> ResultOutcome<()> {
        if let Some(outcome) = self.reject(token) {
            return outcome;
        }
        match result {
            Ok(candidates) => {
                self.staged = Some(candidates);
                self.try_finish();
                ResultOutcome::Applied(Ok(()))
            }
            Err(err) => self.fail(err),
        }
    }

    /// Apply exclusion keys for `token`
    pub fn on_exclusions(
        &mut self,
        token: GenerationToken,
        result: Result<Vec<T::Key>, FetchError>,
    ) -> ResultOutcome<()> {
        if let Some(outcome) = self.reject(token) {
            return outcome;
        }
        match result {
            Ok(keys) => {
                self.exclusions = ExclusionSet::loaded(keys);
                self.try_finish();
                ResultOutcome::Applied(Ok(()))
            }
            Err(err) => self.fail(err),
        }
    }

    /// Apply both halves of a response at once
    pub fn on_response(&mut self, response: DependentResponse<T>) -> ResultOutcome<()> {
        let DependentResponse {
            token,
            candidates,
            exclusions,
        } = response;
        match self.on_exclusions(token, exclusions) {
            ResultOutcome::Applied(Ok(())) => self.on_candidates(token, candidates),
            other => other,
        }
    }

    /// Current candidate snapshot (empty unless ready)
    pub fn candidates(&self) -> &CandidateSet<T> {
        &self.candidates
    }

    pub fn state(&self) -> &DependentState<P> {
        &self.state
    }

    /// Exclusion data for the current parent
    pub fn exclusions(&self) -> &ExclusionSet<T::Key> {
        &self.exclusions
    }

    /// The parent the current state refers to
    pub fn parent(&self) -> Option<&P> {
        match &self.state {
            DependentState::Disabled => None,
            DependentState::Loading { parent }
            | DependentState::Ready { parent }
            | DependentState::Failed { parent, .. } => Some(parent),
        }
    }

    /// The child may only be used once candidates for its parent are ready
    pub fn is_child_disabled(&self) -> bool {
        !matches!(self.state, DependentState::Ready { .. })
    }

    /// Stop applying anything (unmount)
    pub fn dispose(&mut self) {
        self.generation.invalidate();
        self.disposed = true;
    }

    fn reject(&self, token: GenerationToken) -> Option<ResultOutcome<()>> {
        if self.disposed {
            return Some(ResultOutcome::Disposed);
        }
        let loading = matches!(self.state, DependentState::Loading { .. });
        if !self.generation.is_current(token) || !loading {
            debug!(token = token.raw(), "stale dependent result dropped");
            return Some(ResultOutcome::Stale);
        }
        None
    }

    fn try_finish(&mut self) {
        if !self.exclusions.is_loaded() {
            return;
        }
        let Some(staged) = self.staged.take() else {
            return;
        };
        let available = exclude(staged, &self.exclusions).unwrap_or_default();
        self.candidates = CandidateSet::new(available);
        if let DependentState::Loading { parent } = &self.state {
            debug!(?parent, count = self.candidates.len(), "dependent candidates ready");
            self.state = DependentState::Ready {
                parent: parent.clone(),
            };
        }
    }

    fn fail(&mut self, err: FetchError) -> ResultOutcome<()> {
        warn!(error = %err, "dependent candidates failed");
        self.staged = None;
        self.candidates = CandidateSet::empty();
        if let DependentState::Loading { parent } = &self.state {
            self.state = DependentState::Failed {
                parent: parent.clone(),
                error: err.clone(),
            };
        }
        ResultOutcome::Applied(Err(err))
    }
}

impl<P: Clone + std::fmt::Debug, T: Choice> Default for DependentFilter<P, T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::choice::SelectOption;
    use futures::FutureExt;
    use std::collections::HashMap;

    type Slot = SelectOption<&'static str>;

    fn slots() -> Vec<Slot> {
        vec![
            SelectOption::new("T1", "Mon 09:00"),
            SelectOption::new("T2", "Mon 11:00"),
            SelectOption::new("T3", "Tue 09:00"),
        ]
    }

    fn keys(filter: &DependentFilter<&'static str, Slot>) -> Vec<&'static str> {
        filter.candidates().iter().map(|s| s.key).collect()
    }

    #[test]
    fn test_exclude_semantics() {
        assert_eq!(exclude(slots(), &ExclusionSet::NotLoaded), None);
        assert_eq!(exclude(slots(), &ExclusionSet::loaded([])), Some(slots()));
        let remaining = exclude(slots(), &ExclusionSet::loaded(["T2"])).unwrap();
        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().all(|s| s.key != "T2"));
    }

    #[test]
    fn test_exclusion_contains() {
        let set: ExclusionSet<&str> = ExclusionSet::NotLoaded;
        assert_eq!(set.contains(&"T1"), None);
        let set = ExclusionSet::loaded(["T1"]);
        assert_eq!(set.contains(&"T1"), Some(true));
        assert_eq!(set.contains(&"T2"), Some(false));
    }

    #[test]
    fn test_parent_switch_excludes_booked_slot() {
        let mut filter = DependentFilter::<&str, Slot>::new();

        let r1 = filter.set_parent(Some("R1")).unwrap();
        filter.on_candidates(r1.token, Ok(slots()));
        filter.on_exclusions(r1.token, Ok(vec![]));
        assert_eq!(keys(&filter), vec!["T1", "T2", "T3"]);
        assert!(!filter.is_child_disabled());

        let r2 = filter.set_parent(Some("R2")).unwrap();
        assert!(filter.is_child_disabled());
        assert!(filter.candidates().is_empty());
        filter.on_candidates(r2.token, Ok(slots()));
        filter.on_exclusions(r2.token, Ok(vec!["T3"]));
        assert_eq!(keys(&filter), vec!["T1", "T2"]);
        assert_eq!(filter.state(), &DependentState::Ready { parent: "R2" });
    }

    #[test]
    fn test_candidates_wait_for_exclusions() {
        let mut filter = DependentFilter::<&str, Slot>::new();
        let req = filter.set_parent(Some("R2")).unwrap();

        filter.on_candidates(req.token, Ok(slots()));
        assert!(filter.candidates().is_empty());
        assert!(filter.is_child_disabled());
        assert!(!filter.exclusions().is_loaded());

        filter.on_exclusions(req.token, Ok(vec!["T1"]));
        assert_eq!(keys(&filter), vec!["T2", "T3"]);
    }

    #[test]
    fn test_clearing_parent_disables_child() {
        let mut filter = DependentFilter::<&str, Slot>::new();
        let req = filter.set_parent(Some("R1")).unwrap();
        filter.on_response(DependentResponse {
            token: req.token,
            candidates: Ok(slots()),
            exclusions: Ok(vec![]),
        });
        assert_eq!(filter.candidates().len(), 3);

        assert!(filter.set_parent(None).is_none());
        assert!(filter.candidates().is_empty());
        assert!(filter.is_child_disabled());
        assert_eq!(filter.state(), &DependentState::Disabled);
        assert_eq!(filter.parent(), None);
    }

    #[test]
    fn test_only_final_parent_applies() {
        let mut filter = DependentFilter::<&str, Slot>::new();
        let first = filter.set_parent(Some("R1")).unwrap();
        let second = filter.set_parent(Some("R2")).unwrap();

        let late = filter.on_response(DependentResponse {
            token: first.token,
            candidates: Ok(slots()),
            exclusions: Ok(vec![]),
        });
        assert_eq!(late, ResultOutcome::Stale);
        assert!(filter.candidates().is_empty());

        filter.on_response(DependentResponse {
            token: second.token,
            candidates: Ok(slots()),
            exclusions: Ok(vec!["T1", "T2"]),
        });
        assert_eq!(keys(&filter), vec!["T3"]);
        assert_eq!(filter.parent(), Some(&"R2"));
    }

    #[test]
    fn test_response_after_clear_is_stale() {
        let mut filter = DependentFilter::<&str, Slot>::new();
        let req = filter.set_parent(Some("R1")).unwrap();
        filter.set_parent(None);
        assert_eq!(
            filter.on_candidates(req.token, Ok(slots())),
            ResultOutcome::Stale
        );
        assert!(filter.candidates().is_empty());
    }

    #[test]
    fn test_failure_keeps_child_disabled() {
        let mut filter = DependentFilter::<&str, Slot>::new();
        let req = filter.set_parent(Some("R1")).unwrap();
        let err = FetchError::Remote {
            status: 503,
            message: "bookings unavailable".into(),
        };
        filter.on_candidates(req.token, Ok(slots()));
        let outcome = filter.on_exclusions(req.token, Err(err.clone()));
        assert_eq!(outcome, ResultOutcome::Applied(Err(err.clone())));
        assert!(filter.candidates().is_empty());
        assert!(filter.is_child_disabled());
        assert_eq!(
            filter.state(),
            &DependentState::Failed {
                parent: "R1",
                error: err
            }
        );
    }

    #[test]
    fn test_dispose_drops_results() {
        let mut filter = DependentFilter::<&str, Slot>::new();
        let req = filter.set_parent(Some("R1")).unwrap();
        filter.dispose();
        assert_eq!(
            filter.on_candidates(req.token, Ok(slots())),
            ResultOutcome::Disposed
        );
        assert!(filter.set_parent(Some("R2")).is_none());
    }

    struct Bookings {
        slots: Vec<Slot>,
        booked: HashMap<&'static str, Vec<&'static str>>,
    }

    impl CandidateSource<&'static str, Slot> for Bookings {
        fn candidates(&self, _parent: &&'static str) -> BoxFuture<'static, Result<Vec<Slot>, FetchError>> {
            let slots = self.slots.clone();
            async move { Ok(slots) }.boxed()
        }

        fn exclusions(
            &self,
            parent: &&'static str,
        ) -> BoxFuture<'static, Result<Vec<&'static str>, FetchError>> {
            let booked = self.booked.get(parent).cloned().unwrap_or_default();
            async move { Ok(booked) }.boxed()
        }
    }

    #[test]
    fn test_compute_candidates_with_source() {
        let source = Bookings {
            slots: slots(),
            booked: HashMap::from([("R2", vec!["T3"])]),
        };

        let r1 = futures::executor::block_on(compute_candidates(&source, &"R1")).unwrap();
        assert_eq!(r1.len(), 3);
        let r2 = futures::executor::block_on(compute_candidates(&source, &"R2")).unwrap();
        assert_eq!(r2.iter().map(|s| s.key).collect::<Vec<_>>(), vec!["T1", "T2"]);

        let mut filter = DependentFilter::<&str, Slot>::new();
        let req = filter.set_parent(Some("R2")).unwrap();
        let response = futures::executor::block_on(fetch_dependent(&source, &req));
        assert!(filter.on_response(response).is_applied());
        assert_eq!(keys(&filter), vec!["T1", "T2"]);
    }
}
