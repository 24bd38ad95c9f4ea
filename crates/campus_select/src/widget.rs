//! Selector widget - searchable, keyboard-navigable selection combobox
//!
//! The composition root. It wires the option index, the selection state
//! machine and (in remote mode) the debounced query scheduler into one
//! controlled input plus listbox. The host owns the value. The selector
//! reports commits through `on_change` and otherwise only reads its inputs.
//!
//! # Example
//!
//! ```
//! use campus_select::prelude::*;
//! use campus_core::{Key, KeyboardEvent};
//!
//! let mut rooms = selector::<SelectOption<u32>>("room")
//!     .option(SelectOption::new(1, "Room A"))
//!     .option(SelectOption::new(2, "Room B"))
//!     .on_change(|key| println!("room -> {key}"))
//!     .build()
//!     .unwrap();
//!
//! rooms.focus();
//! rooms.input("a", 0);
//! rooms.key(&KeyboardEvent::pressed(Key::Enter));
//!
//! assert_eq!(rooms.value(), Some(&1));
//! assert_eq!(rooms.display_text(), "Room A");
//! assert!(!rooms.is_open());
//! ```
//!
//! # Modes
//!
//! - [`SelectorMode::Local`]: options are already in memory (instructors,
//!   courses, rooms). Typing filters them directly.
//! - [`SelectorMode::Remote`]: typing goes through the debounced scheduler.
//!   The host runs the [`FetchRequest`]s returned by [`Selector::tick`] and
//!   hands the results back to [`Selector::apply_search`].

use std::sync::Arc;

use campus_core::{Key, KeyState, KeyboardEvent, PointerEvent};
use tracing::debug;

use crate::choice::Choice;
use crate::config::SelectorConfig;
use crate::debounce::{DebouncedScheduler, FetchRequest, QueryChange, ResultOutcome, SearchStatus};
use crate::dismiss::OutsideInteractionDetector;
use crate::error::{FetchError, Result};
use crate::generation::GenerationToken;
use crate::index::{filter_indices, CandidateSet};
use crate::machine::{MachineState, OptionList, SelectionEvent, SelectionMachine, Transition};

/// Callback invoked with the key of each committed option
pub type ChangeCallback<K> = Arc<dyn Fn(&K) + Send + Sync>;

/// Where a selector's options come from
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SelectorMode {
    /// Options are supplied by the host and filtered locally
    #[default]
    Local,
    /// Options are fetched per query through the debounced scheduler
    Remote,
}

/// What the widget did with a key press
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyOutcome {
    /// A navigation key the selector consumed
    Handled,
    /// Not ours; let normal text editing see it
    PassThrough,
    /// A navigation key ignored because the selector is disabled
    Ignored,
}

/// Why the open listbox shows no rows
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmptyReason {
    /// Remote mode, nothing searched yet
    NotSearched,
    /// Remote mode, a search is pending or in flight
    Searching,
    /// Local mode, nothing matches the query
    NoMatches,
    /// Remote mode, the search ran and found nothing
    NoResults,
    /// Remote mode, the search failed
    SearchFailed,
}

/// One listbox row, ready to render
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewItem {
    /// Element id, referenced by `aria-activedescendant`
    pub id: String,
    pub label: String,
    pub highlighted: bool,
    /// Carries the committed key
    pub selected: bool,
    pub disabled: bool,
}

/// Everything a renderer needs for one frame
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectorView {
    pub display_text: String,
    pub placeholder: Option<String>,
    pub open: bool,
    pub disabled: bool,
    pub items: Vec<ViewItem>,
    pub status: SearchStatus,
    /// Set when the panel is open with no rows
    pub empty: Option<EmptyReason>,
}

/// Accessibility state, mirroring the state machine 1:1
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessibilitySnapshot {
    /// Role of the input element
    pub role: &'static str,
    /// Role of the popup element
    pub popup_role: &'static str,
    /// Id of the popup element (`aria-controls`)
    pub listbox_id: String,
    /// `aria-expanded`
    pub expanded: bool,
    /// `aria-activedescendant`
    pub active_descendant: Option<String>,
    /// `aria-disabled`
    pub disabled: bool,
    /// `aria-busy`
    pub busy: bool,
    pub option_count: usize,
}

/// The filtered rows as the state machine sees them
struct Rows<'a, T> {
    options: &'a CandidateSet<T>,
    filtered: &'a [usize],
}

impl<T: Choice> OptionList for Rows<'_, T> {
    fn len(&self) -> usize {
        self.filtered.len()
    }

    fn is_committable(&self, index: usize) -> bool {
        self.filtered
            .get(index)
            .and_then(|&pos| self.options.get(pos))
            .is_some_and(|opt| !opt.is_disabled())
    }
}

/// Debounced searchable selector
pub struct Selector<T: Choice> {
    id: String,
    mode: SelectorMode,
    placeholder: Option<String>,
    /// Controlled value; mirrors the host after each `set_value`
    value: Option<T::Key>,
    committed_label: String,
    /// Text shown in the input
    display_text: String,
    /// Text the local index filters by; empty until the user types
    filter_query: String,
    options: CandidateSet<T>,
    /// Positions into `options`, in display order
    filtered: Vec<usize>,
    machine: SelectionMachine,
    search: DebouncedScheduler<String>,
    disabled: bool,
    disposed: bool,
    on_change: Option<ChangeCallback<T::Key>>,
}

impl<T: Choice> Selector<T> {
    /// Start building a selector with an instance id
    pub fn builder(id: impl Into<String>) -> SelectorBuilder<T> {
        SelectorBuilder::new(id)
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn mode(&self) -> SelectorMode {
        self.mode
    }

    pub fn value(&self) -> Option<&T::Key> {
        self.value.as_ref()
    }

    pub fn display_text(&self) -> &str {
        &self.display_text
    }

    pub fn state(&self) -> MachineState {
        self.machine.state()
    }

    pub fn is_open(&self) -> bool {
        self.machine.is_open()
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn options(&self) -> &CandidateSet<T> {
        &self.options
    }

    /// Options currently listed, in display order
    pub fn filtered_options(&self) -> Vec<&T> {
        self.filtered
            .iter()
            .filter_map(|&pos| self.options.get(pos))
            .collect()
    }

    /// The highlighted option, if the panel is open and one exists
    pub fn highlighted(&self) -> Option<&T> {
        self.machine
            .active_index(self.filtered.len())
            .and_then(|row| self.options.get(self.filtered[row]))
    }

    pub fn search_status(&self) -> &SearchStatus {
        self.search.status()
    }

    /// Earliest timestamp at which [`Selector::tick`] has work to do
    pub fn next_deadline(&self) -> Option<u64> {
        match (self.machine.close_deadline(), self.search.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    // =========================================================================
    // HOST INPUTS
    // =========================================================================

    /// The host changed the value
    ///
    /// Updates the committed option and, while closed, the display text. Never
    /// opens the panel.
    pub fn set_value(&mut self, value: Option<T::Key>) {
        let changed = self.value != value;
        self.value = value;
        self.committed_label = self.resolve_label(changed);
        if !self.is_open() {
            self.display_text = self.committed_label.clone();
        }
    }

    /// Replace the candidate set with a new snapshot
    ///
    /// A committed key missing from the new set leaves the host value alone.
    /// Only the display text falls back to empty.
    pub fn set_options(&mut self, options: impl Into<CandidateSet<T>>) {
        self.replace_options(options.into());
        if !self.is_open() {
            self.display_text = self.committed_label.clone();
        }
    }

    /// Enable or disable the selector; disabling closes it and cancels search
    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
        if disabled {
            let transition = self.machine.force_close();
            self.apply(transition);
            self.search.cancel();
        }
    }

    // =========================================================================
    // USER EVENTS
    // =========================================================================

    /// The input gained focus
    pub fn focus(&mut self) -> Transition {
        if !self.is_active() {
            return Transition::None;
        }
        self.dispatch(SelectionEvent::Focus)
    }

    /// The input lost focus
    pub fn blur(&mut self, now_ms: u64) -> Transition {
        if !self.is_active() {
            return Transition::None;
        }
        self.dispatch(SelectionEvent::Blur { now_ms })
    }

    /// The input text changed
    pub fn input(&mut self, text: impl Into<String>, now_ms: u64) -> Transition {
        if !self.is_active() {
            return Transition::None;
        }
        let text = text.into();
        self.display_text = text.clone();
        self.filter_query = text.clone();

        match self.mode {
            SelectorMode::Local => self.refilter(),
            SelectorMode::Remote => {
                if self.search.on_query_change(text, now_ms) == QueryChange::Cleared {
                    self.options = CandidateSet::empty();
                    self.refilter();
                }
            }
        }
        self.dispatch(SelectionEvent::Typing)
    }

    /// A key was pressed or released
    pub fn key(&mut self, event: &KeyboardEvent) -> KeyOutcome {
        if event.state != KeyState::Pressed
            || event.modifiers.is_chord()
            || !event.key.is_navigation()
        {
            return KeyOutcome::PassThrough;
        }
        if !self.is_active() {
            return KeyOutcome::Ignored;
        }

        let selection_event = match event.key {
            Key::Down => SelectionEvent::KeyDown,
            Key::Up => SelectionEvent::KeyUp,
            Key::Enter => SelectionEvent::KeyEnter,
            Key::Escape => SelectionEvent::KeyEscape,
            _ => return KeyOutcome::PassThrough,
        };
        self.dispatch(selection_event);
        KeyOutcome::Handled
    }

    /// Pointer-down on row `row` of the listed options
    pub fn pointer_down(&mut self, row: usize) -> Transition {
        if !self.is_active() {
            return Transition::None;
        }
        self.dispatch(SelectionEvent::PointerDown(row))
    }

    /// A pointer event somewhere in the window
    ///
    /// Closes the panel if `detector` classifies it as outside the widget.
    pub fn pointer_event(
        &mut self,
        event: &PointerEvent,
        detector: &OutsideInteractionDetector,
    ) -> Transition {
        if !self.is_open() || !detector.is_outside(event) {
            return Transition::None;
        }
        self.dispatch(SelectionEvent::OutsideInteraction)
    }

    // =========================================================================
    // TIME AND REMOTE RESULTS
    // =========================================================================

    /// Advance timers to `now_ms`
    ///
    /// Returns a fetch the host should start, in remote mode.
    pub fn tick(&mut self, now_ms: u64) -> Option<FetchRequest<String>> {
        let transition = self.machine.tick(now_ms);
        self.apply(transition);

        if self.mode == SelectorMode::Remote && self.is_active() {
            self.search.poll(now_ms)
        } else {
            None
        }
    }

    /// Hand back a remote search result
    ///
    /// Stale and post-dispose results are dropped without touching state.
    pub fn apply_search(
        &mut self,
        token: GenerationToken,
        result: std::result::Result<Vec<T>, FetchError>,
    ) -> ResultOutcome<()> {
        match self.search.on_result(token, result) {
            ResultOutcome::Applied(Ok(results)) => {
                self.replace_options(CandidateSet::new(results));
                ResultOutcome::Applied(Ok(()))
            }
            ResultOutcome::Applied(Err(err)) => {
                self.replace_options(CandidateSet::empty());
                ResultOutcome::Applied(Err(err))
            }
            ResultOutcome::Stale => ResultOutcome::Stale,
            ResultOutcome::Disposed => ResultOutcome::Disposed,
        }
    }

    /// Unmount: cancel timers, drop in-flight work, stop notifying the host
    pub fn dispose(&mut self) {
        let transition = self.machine.force_close();
        self.apply(transition);
        self.search.dispose();
        self.on_change = None;
        self.disposed = true;
        debug!(id = %self.id, "selector disposed");
    }

    // =========================================================================
    // RENDERING
    // =========================================================================

    /// Element id of a listbox row
    pub fn option_id(&self, row: usize) -> String {
        format!("{}-option-{}", self.id, row)
    }

    /// Snapshot for rendering
    pub fn view(&self) -> SelectorView {
        let open = self.is_open();
        let active = self.machine.active_index(self.filtered.len());
        let items = if open {
            self.filtered
                .iter()
                .enumerate()
                .filter_map(|(row, &pos)| self.options.get(pos).map(|opt| (row, opt)))
                .map(|(row, opt)| ViewItem {
                    id: self.option_id(row),
                    label: opt.label().into_owned(),
                    highlighted: active == Some(row),
                    selected: self.value.as_ref() == Some(&opt.key()),
                    disabled: opt.is_disabled(),
                })
                .collect()
        } else {
            Vec::new()
        };

        let empty = (open && self.filtered.is_empty()).then(|| self.empty_reason());

        SelectorView {
            display_text: self.display_text.clone(),
            placeholder: self.placeholder.clone(),
            open,
            disabled: !self.is_active(),
            items,
            status: self.search.status().clone(),
            empty,
        }
    }

    /// Accessibility attributes for the input and listbox
    pub fn accessibility(&self) -> AccessibilitySnapshot {
        AccessibilitySnapshot {
            role: "combobox",
            popup_role: "listbox",
            listbox_id: format!("{}-listbox", self.id),
            expanded: self.is_open(),
            active_descendant: self
                .machine
                .active_index(self.filtered.len())
                .map(|row| self.option_id(row)),
            disabled: !self.is_active(),
            busy: self.search.status().is_busy(),
            option_count: if self.is_open() { self.filtered.len() } else { 0 },
        }
    }

    // =========================================================================
    // INTERNAL
    // =========================================================================

    fn is_active(&self) -> bool {
        !self.disabled && !self.disposed
    }

    fn dispatch(&mut self, event: SelectionEvent) -> Transition {
        let rows = Rows {
            options: &self.options,
            filtered: &self.filtered,
        };
        let transition = self.machine.on_event(event, &rows);
        self.apply(transition);
        transition
    }

    fn apply(&mut self, transition: Transition) {
        match transition {
            Transition::Commit { index } => self.commit(index),
            Transition::Revert => {
                self.display_text = self.committed_label.clone();
                self.filter_query.clear();
                if self.mode == SelectorMode::Remote {
                    self.search.cancel();
                }
                self.refilter();
            }
            _ => {}
        }
    }

    fn commit(&mut self, row: usize) {
        let Some(option) = self.filtered.get(row).and_then(|&pos| self.options.get(pos)) else {
            return;
        };
        let key = option.key();
        let label = option.label().into_owned();
        debug!(id = %self.id, ?key, %label, "option committed");

        self.value = Some(key.clone());
        self.committed_label = label.clone();
        self.display_text = label;
        self.filter_query.clear();
        if self.mode == SelectorMode::Remote {
            self.search.cancel();
        }
        self.refilter();

        if let Some(on_change) = self.on_change.clone() {
            on_change(&key);
        }
    }

    fn replace_options(&mut self, options: CandidateSet<T>) {
        self.options = options;
        self.refilter();
        self.committed_label = self.resolve_label(false);
        if self.is_open() {
            self.dispatch(SelectionEvent::ListReplaced);
        }
    }

    fn refilter(&mut self) {
        self.filtered = match self.mode {
            SelectorMode::Local => filter_indices(self.options.as_slice(), &self.filter_query),
            SelectorMode::Remote => (0..self.options.len()).collect(),
        };
    }

    /// Label for the committed key
    ///
    /// Remote result sets come and go with each query, so a remote selector
    /// keeps the label it committed while the key stays the same.
    fn resolve_label(&self, key_changed: bool) -> String {
        let Some(key) = &self.value else {
            return String::new();
        };
        match self.options.find_by_key(key) {
            Some(opt) => opt.label().into_owned(),
            None if self.mode == SelectorMode::Remote && !key_changed => {
                self.committed_label.clone()
            }
            None => String::new(),
        }
    }

    fn empty_reason(&self) -> EmptyReason {
        match (self.mode, self.search.status()) {
            (SelectorMode::Local, _) => EmptyReason::NoMatches,
            (SelectorMode::Remote, SearchStatus::Idle) => EmptyReason::NotSearched,
            (SelectorMode::Remote, SearchStatus::Pending | SearchStatus::Searching) => {
                EmptyReason::Searching
            }
            (SelectorMode::Remote, SearchStatus::Failed(_)) => EmptyReason::SearchFailed,
            (SelectorMode::Remote, SearchStatus::Found(_) | SearchStatus::NoResults) => {
                EmptyReason::NoResults
            }
        }
    }
}

// =============================================================================
// BUILDER
// =============================================================================

/// Builder for [`Selector`]
pub struct SelectorBuilder<T: Choice> {
    id: String,
    options: Vec<T>,
    value: Option<T::Key>,
    disabled: bool,
    mode: SelectorMode,
    config: SelectorConfig,
    placeholder: Option<String>,
    on_change: Option<ChangeCallback<T::Key>>,
}

impl<T: Choice> SelectorBuilder<T> {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            options: Vec::new(),
            value: None,
            disabled: false,
            mode: SelectorMode::Local,
            config: SelectorConfig::default(),
            placeholder: None,
            on_change: None,
        }
    }

    /// Add one option
    pub fn option(mut self, option: T) -> Self {
        self.options.push(option);
        self
    }

    /// Add options
    pub fn options(mut self, options: impl IntoIterator<Item = T>) -> Self {
        self.options.extend(options);
        self
    }

    /// Initial controlled value
    pub fn value(mut self, value: Option<T::Key>) -> Self {
        self.value = value;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Fetch options per query instead of filtering locally
    pub fn remote(mut self) -> Self {
        self.mode = SelectorMode::Remote;
        self
    }

    pub fn mode(mut self, mode: SelectorMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn config(mut self, config: SelectorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    /// Called with the key of each committed option
    pub fn on_change<F>(mut self, callback: F) -> Self
    where
        F: Fn(&T::Key) + Send + Sync + 'static,
    {
        self.on_change = Some(Arc::new(callback));
        self
    }

    /// Validate the configuration and build the selector
    pub fn build(self) -> Result<Selector<T>> {
        self.config.validate()?;

        let min_query_len = self.config.min_query_len;
        let search = DebouncedScheduler::new(self.config.debounce_ms)
            .with_gate(move |query: &String| query.trim().chars().count() >= min_query_len);

        let mut selector = Selector {
            id: self.id,
            mode: self.mode,
            placeholder: self.placeholder,
            value: None,
            committed_label: String::new(),
            display_text: String::new(),
            filter_query: String::new(),
            options: CandidateSet::new(self.options),
            filtered: Vec::new(),
            machine: SelectionMachine::new(self.config.blur_policy()),
            search,
            disabled: self.disabled,
            disposed: false,
            on_change: self.on_change,
        };
        selector.refilter();
        selector.set_value(self.value);
        Ok(selector)
    }
}

/// Create a selector builder
pub fn selector<T: Choice>(id: impl Into<String>) -> SelectorBuilder<T> {
    SelectorBuilder::new(id)
}
