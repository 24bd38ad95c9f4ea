//! Fine-grained reactive signals for host form state
//!
//! A small push-based reactive graph:
//! - Signals hold form field values (selected room, selected time slot, ...)
//! - Effects re-run when a signal they read changes
//! - Batches defer effects until a group of writes completes
//!
//! Effects are how a host form wires a parent field to a dependent one. The
//! effect reads the parent signal and forwards each new value to the dependent
//! filter.
//!
//! # State
//!
//! [`State<T>`] wraps a signal with shared access to the graph and is the
//! handle a form field hands out:
//!
//! ```ignore
//! let room: State<Option<u32>> = form.room.clone();
//! room.set(Some(2));
//! assert_eq!(room.get(), Some(2));
//! ```
//!
//! Effects receive `&ReactiveGraph` and must read through it. Calling
//! `State::get` from inside an effect would re-lock the shared graph.

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

new_key_type! {
    /// Unique identifier for a signal
    pub struct SignalId;
    /// Unique identifier for an effect
    pub struct EffectId;
}

/// A reactive signal handle (cheap to copy)
#[derive(Debug)]
pub struct Signal<T> {
    id: SignalId,
    _marker: std::marker::PhantomData<T>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Signal<T> {}

impl<T> Signal<T> {
    /// Get the signal's internal ID
    pub fn id(&self) -> SignalId {
        self.id
    }
}

/// An effect handle
#[derive(Debug, Clone, Copy)]
pub struct Effect {
    id: EffectId,
}

impl Effect {
    pub fn id(&self) -> EffectId {
        self.id
    }
}

type EffectFn = Box<dyn FnMut(&ReactiveGraph) + Send>;

struct SignalNode {
    value: Box<dyn Any + Send>,
    subscribers: SmallVec<[EffectId; 4]>,
}

struct EffectNode {
    /// Taken out while the effect runs so the graph can be borrowed
    run: Option<EffectFn>,
    dependencies: SmallVec<[SignalId; 4]>,
    dirty: Cell<bool>,
}

/// The reactive graph that owns all signals and effects
pub struct ReactiveGraph {
    signals: SlotMap<SignalId, SignalNode>,
    effects: SlotMap<EffectId, EffectNode>,
    pending_effects: RefCell<VecDeque<EffectId>>,
    /// Current batch depth (> 0 means we're in a batch)
    batch_depth: Cell<u32>,
    /// Dependencies recorded while an effect runs
    tracking: RefCell<Option<Vec<SignalId>>>,
    global_version: Cell<u64>,
}

impl ReactiveGraph {
    /// Create a new reactive graph
    pub fn new() -> Self {
        Self {
            signals: SlotMap::with_key(),
            effects: SlotMap::with_key(),
            pending_effects: RefCell::new(VecDeque::new()),
            batch_depth: Cell::new(0),
            tracking: RefCell::new(None),
            global_version: Cell::new(0),
        }
    }

    // =========================================================================
    // SIGNALS
    // =========================================================================

    /// Create a new signal with an initial value
    pub fn create_signal<T: Send + 'static>(&mut self, initial: T) -> Signal<T> {
        let id = self.signals.insert(SignalNode {
            value: Box::new(initial),
            subscribers: SmallVec::new(),
        });
        Signal {
            id,
            _marker: std::marker::PhantomData,
        }
    }

    /// Get the current value of a signal
    ///
    /// Inside an effect, the signal is recorded as a dependency of that effect.
    pub fn get<T: Clone + 'static>(&self, signal: Signal<T>) -> Option<T> {
        if let Some(ref mut deps) = *self.tracking.borrow_mut() {
            if !deps.contains(&signal.id) {
                deps.push(signal.id);
            }
        }

        self.get_untracked(signal)
    }

    /// Get the current value without tracking as a dependency
    pub fn get_untracked<T: Clone + 'static>(&self, signal: Signal<T>) -> Option<T> {
        self.signals
            .get(signal.id)
            .and_then(|node| node.value.downcast_ref::<T>().cloned())
    }

    /// Set the value of a signal, scheduling every subscribed effect
    pub fn set<T: Send + 'static>(&mut self, signal: Signal<T>, value: T) {
        let Some(node) = self.signals.get_mut(signal.id) else {
            tracing::warn!("set on a signal that no longer exists");
            return;
        };
        node.value = Box::new(value);
        self.global_version.set(self.global_version.get() + 1);

        let subscribers = node.subscribers.clone();
        for effect_id in subscribers {
            self.mark_dirty(effect_id);
        }

        if self.batch_depth.get() == 0 {
            self.flush_effects();
        }
    }

    /// Set the value only if it differs from the current one
    ///
    /// Returns `true` if the signal changed and effects were scheduled.
    pub fn set_if_changed<T: Clone + PartialEq + Send + 'static>(
        &mut self,
        signal: Signal<T>,
        value: T,
    ) -> bool {
        if self.get_untracked(signal).as_ref() == Some(&value) {
            return false;
        }
        self.set(signal, value);
        true
    }

    /// Update a signal using a function
    pub fn update<T: Clone + Send + 'static, F: FnOnce(T) -> T>(
        &mut self,
        signal: Signal<T>,
        f: F,
    ) {
        if let Some(current) = self.get_untracked(signal) {
            self.set(signal, f(current));
        }
    }

    // =========================================================================
    // EFFECTS
    // =========================================================================

    /// Create an effect that runs now and again whenever a signal it read changes
    pub fn create_effect<F>(&mut self, run: F) -> Effect
    where
        F: FnMut(&ReactiveGraph) + Send + 'static,
    {
        let id = self.effects.insert(EffectNode {
            run: Some(Box::new(run)),
            dependencies: SmallVec::new(),
            dirty: Cell::new(true),
        });

        self.pending_effects.borrow_mut().push_back(id);

        if self.batch_depth.get() == 0 {
            self.flush_effects();
        }

        Effect { id }
    }

    /// Dispose of an effect, removing it from the graph
    pub fn dispose_effect(&mut self, effect: Effect) {
        if let Some(node) = self.effects.remove(effect.id) {
            for &dep_id in &node.dependencies {
                if let Some(sig) = self.signals.get_mut(dep_id) {
                    sig.subscribers.retain(|s| *s != effect.id);
                }
            }
        }
    }

    // =========================================================================
    // BATCHING
    // =========================================================================

    /// Start a batch - effects won't run until the batch ends
    pub fn batch_start(&self) {
        self.batch_depth.set(self.batch_depth.get() + 1);
    }

    /// End a batch and flush pending effects
    pub fn batch_end(&mut self) {
        let depth = self.batch_depth.get();
        if depth > 0 {
            self.batch_depth.set(depth - 1);
            if depth == 1 {
                self.flush_effects();
            }
        }
    }

    /// Run a function in a batch context
    pub fn batch<F, R>(&mut self, f: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        self.batch_start();
        let result = f(self);
        self.batch_end();
        result
    }

    // =========================================================================
    // INTERNAL
    // =========================================================================

    fn mark_dirty(&mut self, id: EffectId) {
        if let Some(node) = self.effects.get(id) {
            if !node.dirty.get() {
                node.dirty.set(true);
                self.pending_effects.borrow_mut().push_back(id);
            }
        }
    }

    fn flush_effects(&mut self) {
        let effects: Vec<EffectId> = self.pending_effects.borrow_mut().drain(..).collect();
        for effect_id in effects {
            self.run_effect(effect_id);
        }
    }

    fn run_effect(&mut self, effect_id: EffectId) {
        let mut run = match self.effects.get_mut(effect_id) {
            Some(node) if node.dirty.get() => {
                node.dirty.set(false);
                match node.run.take() {
                    Some(run) => run,
                    None => return,
                }
            }
            _ => return,
        };

        self.tracking.replace(Some(Vec::new()));
        run(&*self);
        let deps = self.tracking.take().unwrap_or_default();

        // The effect may have been disposed while it ran; drop it in that case
        let Some(node) = self.effects.get_mut(effect_id) else {
            return;
        };
        node.run = Some(run);
        let old_deps = std::mem::take(&mut node.dependencies);
        node.dependencies = deps.iter().copied().collect();

        for dep_id in old_deps {
            if let Some(sig) = self.signals.get_mut(dep_id) {
                sig.subscribers.retain(|s| *s != effect_id);
            }
        }
        for dep_id in deps {
            if let Some(sig) = self.signals.get_mut(dep_id) {
                if !sig.subscribers.contains(&effect_id) {
                    sig.subscribers.push(effect_id);
                }
            }
        }
    }

    /// Get statistics about the reactive graph
    pub fn stats(&self) -> ReactiveStats {
        ReactiveStats {
            signal_count: self.signals.len(),
            effect_count: self.effects.len(),
            pending_effects: self.pending_effects.borrow().len(),
            global_version: self.global_version.get(),
        }
    }
}

impl Default for ReactiveGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about the reactive graph
#[derive(Debug, Clone)]
pub struct ReactiveStats {
    pub signal_count: usize,
    pub effect_count: usize,
    pub pending_effects: usize,
    pub global_version: u64,
}

// =============================================================================
// STATE - Handle API for host form fields
// =============================================================================

/// Shared reactive graph for thread-safe access
pub type SharedReactiveGraph = Arc<Mutex<ReactiveGraph>>;

/// A bound state value with direct get/set methods
#[derive(Clone)]
pub struct State<T> {
    signal: Signal<T>,
    reactive: SharedReactiveGraph,
}

impl<T: Clone + Send + 'static> State<T> {
    /// Create a new signal in `reactive` and wrap it
    pub fn new(reactive: &SharedReactiveGraph, initial: T) -> Self {
        let signal = lock(reactive).create_signal(initial);
        Self {
            signal,
            reactive: reactive.clone(),
        }
    }

    /// Get the current value
    pub fn get(&self) -> T
    where
        T: Default,
    {
        self.try_get().unwrap_or_default()
    }

    /// Get the current value, returning None if the signal is gone
    pub fn try_get(&self) -> Option<T> {
        lock(&self.reactive).get_untracked(self.signal)
    }

    /// Set a new value, running subscribed effects
    pub fn set(&self, value: T) {
        lock(&self.reactive).set(self.signal, value);
    }

    /// Update the value using a function
    pub fn update(&self, f: impl FnOnce(T) -> T) {
        lock(&self.reactive).update(self.signal, f);
    }

    /// Get the underlying signal (for reading inside effects)
    pub fn signal(&self) -> Signal<T> {
        self.signal
    }
}

impl<T: Clone + PartialEq + Send + 'static> State<T> {
    /// Set a new value only if it differs, returning whether it changed
    pub fn set_if_changed(&self, value: T) -> bool {
        lock(&self.reactive).set_if_changed(self.signal, value)
    }
}

fn lock(reactive: &SharedReactiveGraph) -> MutexGuard<'_, ReactiveGraph> {
    reactive.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_signal_create_get_set() {
        let mut graph = ReactiveGraph::new();

        let room = graph.create_signal(0u32);
        assert_eq!(graph.get(room), Some(0));

        graph.set(room, 42);
        assert_eq!(graph.get(room), Some(42));
        assert_eq!(graph.stats().global_version, 1);
    }

    #[test]
    fn test_signal_update() {
        let mut graph = ReactiveGraph::new();

        let credits = graph.create_signal(10i32);
        graph.update(credits, |x| x + 5);
        assert_eq!(graph.get(credits), Some(15));
    }

    #[test]
    fn test_effect_runs_on_change() {
        let mut graph = ReactiveGraph::new();
        let effect_runs = Arc::new(Mutex::new(Vec::new()));

        let room = graph.create_signal::<Option<u32>>(None);
        let effect_runs_clone = effect_runs.clone();

        let _effect = graph.create_effect(move |g| {
            let val = g.get(room).flatten();
            effect_runs_clone.lock().unwrap().push(val);
        });

        assert_eq!(*effect_runs.lock().unwrap(), vec![None]);

        graph.set(room, Some(1));
        graph.set(room, None);
        assert_eq!(*effect_runs.lock().unwrap(), vec![None, Some(1), None]);
    }

    #[test]
    fn test_set_if_changed_skips_equal_values() {
        let mut graph = ReactiveGraph::new();
        let runs = Arc::new(Mutex::new(0));

        let room = graph.create_signal(Some(1u32));
        let runs_clone = runs.clone();
        let _effect = graph.create_effect(move |g| {
            let _ = g.get(room);
            *runs_clone.lock().unwrap() += 1;
        });

        assert!(!graph.set_if_changed(room, Some(1)));
        assert_eq!(*runs.lock().unwrap(), 1);

        assert!(graph.set_if_changed(room, Some(2)));
        assert_eq!(*runs.lock().unwrap(), 2);
    }

    #[test]
    fn test_batching() {
        let mut graph = ReactiveGraph::new();
        let effect_runs = Arc::new(Mutex::new(0));

        let a = graph.create_signal(1i32);
        let b = graph.create_signal(2i32);
        let effect_runs_clone = effect_runs.clone();

        let _effect = graph.create_effect(move |g| {
            let _a = g.get(a);
            let _b = g.get(b);
            *effect_runs_clone.lock().unwrap() += 1;
        });

        assert_eq!(*effect_runs.lock().unwrap(), 1);

        *effect_runs.lock().unwrap() = 0;
        graph.set(a, 10);
        graph.set(b, 20);
        assert_eq!(*effect_runs.lock().unwrap(), 2);

        *effect_runs.lock().unwrap() = 0;
        graph.batch(|g| {
            g.set(a, 100);
            g.set(b, 200);
        });
        assert_eq!(*effect_runs.lock().unwrap(), 1);
    }

    #[test]
    fn test_dispose_effect() {
        let mut graph = ReactiveGraph::new();
        let effect_runs = Arc::new(Mutex::new(0));

        let count = graph.create_signal(0i32);
        let effect_runs_clone = effect_runs.clone();

        let effect = graph.create_effect(move |g| {
            let _val = g.get(count);
            *effect_runs_clone.lock().unwrap() += 1;
        });

        graph.set(count, 1);
        assert_eq!(*effect_runs.lock().unwrap(), 2);

        graph.dispose_effect(effect);

        graph.set(count, 2);
        assert_eq!(*effect_runs.lock().unwrap(), 2);
    }

    #[test]
    fn test_untracked_read_does_not_subscribe() {
        let mut graph = ReactiveGraph::new();
        let runs = Arc::new(Mutex::new(0));

        let tracked = graph.create_signal(0i32);
        let untracked = graph.create_signal(0i32);
        let runs_clone = runs.clone();
        let _effect = graph.create_effect(move |g| {
            let _ = g.get(tracked);
            let _ = g.get_untracked(untracked);
            *runs_clone.lock().unwrap() += 1;
        });

        graph.set(untracked, 5);
        assert_eq!(*runs.lock().unwrap(), 1);
        graph.set(tracked, 5);
        assert_eq!(*runs.lock().unwrap(), 2);
    }

    #[test]
    fn test_state_handle() {
        let graph: SharedReactiveGraph = Arc::new(Mutex::new(ReactiveGraph::new()));
        let slot = State::new(&graph, None::<u32>);

        assert_eq!(slot.get(), None);
        slot.set(Some(7));
        assert_eq!(slot.try_get(), Some(Some(7)));
        assert!(!slot.set_if_changed(Some(7)));
        slot.update(|_| None);
        assert_eq!(slot.get(), None);

        let stats = graph.lock().unwrap().stats();
        assert_eq!(stats.signal_count, 1);
        assert_eq!(stats.effect_count, 0);
    }
}
