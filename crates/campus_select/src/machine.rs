//! Selection state machine
//!
//! Owns the open/closed state and the highlighted index of a selector. It
//! knows nothing about options except how many are currently listed and which
//! of them can be committed, supplied on each event through [`OptionList`].
//!
//! ```text
//! Closed --Focus/Typing/ArrowDown/Enter--> Open(0)
//! Open(h) --ArrowDown--> Open(min(h+1, last))
//! Open(h) --ArrowUp--> Open(max(h-1, 0))
//! Open(h) --Enter (h committable)--> Closed + Commit(h)
//! Open(i) --PointerDown(i) (committable)--> Closed + Commit(i)
//! Open --Escape / OutsideInteraction--> Closed + Revert
//! Open --Blur--> close scheduled, then Closed + Revert on tick
//! Open --Typing / ListReplaced--> Open(0)
//! ```

use tracing::debug;

use crate::config::BlurPolicy;

/// Open/closed state of the listbox panel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum MachineState {
    /// Panel hidden
    #[default]
    Closed,
    /// Panel visible with this row highlighted
    Open { highlight: usize },
}

impl MachineState {
    pub fn is_open(&self) -> bool {
        matches!(self, MachineState::Open { .. })
    }
}

/// Input to the state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionEvent {
    /// Input gained focus
    Focus,
    /// The query text changed
    Typing,
    /// ArrowDown
    KeyDown,
    /// ArrowUp
    KeyUp,
    /// Enter
    KeyEnter,
    /// Escape
    KeyEscape,
    /// Pointer went down on row `i` of the filtered list
    PointerDown(usize),
    /// Input lost focus at `now_ms`
    Blur { now_ms: u64 },
    /// Pointer went down outside the widget's region
    OutsideInteraction,
    /// The filtered list was replaced while open
    ListReplaced,
}

/// Result of feeding an event to the machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Nothing changed (includes commits with no valid target)
    None,
    /// Panel opened with row 0 highlighted
    Opened,
    /// Highlight moved
    Highlight { from: usize, to: usize },
    /// Panel closed committing row `index` of the filtered list
    Commit { index: usize },
    /// Panel closed without a selection; restore the committed label
    Revert,
    /// Blur seen; the panel closes at `deadline` unless something commits first
    CloseScheduled { deadline: u64 },
    /// Focus came back during the blur grace period
    CloseCancelled,
}

/// The listed rows, as the machine needs to see them
pub trait OptionList {
    /// Number of rows in the filtered list
    fn len(&self) -> usize;

    /// Whether row `index` can be committed
    fn is_committable(&self, index: usize) -> bool {
        index < self.len()
    }
}

/// A bare row count where every row is committable
impl OptionList for usize {
    fn len(&self) -> usize {
        *self
    }
}

/// Selection state machine for one selector instance
#[derive(Clone, Debug)]
pub struct SelectionMachine {
    state: MachineState,
    blur_policy: BlurPolicy,
    /// Set while a blur grace period is running
    close_at: Option<u64>,
}

impl SelectionMachine {
    pub fn new(blur_policy: BlurPolicy) -> Self {
        Self {
            state: MachineState::Closed,
            blur_policy,
            close_at: None,
        }
    }

    pub fn state(&self) -> MachineState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    /// Highlighted row, if the panel is open and the row exists
    pub fn active_index(&self, len: usize) -> Option<usize> {
        match self.state {
            MachineState::Open { highlight } if highlight < len => Some(highlight),
            _ => None,
        }
    }

    /// Deadline of a running blur grace period
    pub fn close_deadline(&self) -> Option<u64> {
        self.close_at
    }

    /// Feed one event
    pub fn on_event(&mut self, event: SelectionEvent, list: &dyn OptionList) -> Transition {
        let transition = match self.state {
            MachineState::Closed => self.on_closed(event),
            MachineState::Open { highlight } => self.on_open(highlight, event, list),
        };
        if transition != Transition::None {
            debug!(?event, ?transition, state = ?self.state, "selection transition");
        }
        transition
    }

    /// Close the panel if a blur grace period has elapsed
    pub fn tick(&mut self, now_ms: u64) -> Transition {
        match self.close_at {
            Some(deadline) if now_ms >= deadline && self.is_open() => {
                self.close();
                debug!(deadline, "blur grace elapsed, closing");
                Transition::Revert
            }
            _ => Transition::None,
        }
    }

    /// Close without a selection (disable, unmount)
    pub fn force_close(&mut self) -> Transition {
        if self.is_open() {
            self.close();
            Transition::Revert
        } else {
            Transition::None
        }
    }

    fn on_closed(&mut self, event: SelectionEvent) -> Transition {
        match event {
            SelectionEvent::Focus
            | SelectionEvent::Typing
            | SelectionEvent::KeyDown
            | SelectionEvent::KeyEnter => {
                self.state = MachineState::Open { highlight: 0 };
                self.close_at = None;
                Transition::Opened
            }
            _ => Transition::None,
        }
    }

    fn on_open(
        &mut self,
        highlight: usize,
        event: SelectionEvent,
        list: &dyn OptionList,
    ) -> Transition {
        let len = list.len();
        match event {
            SelectionEvent::KeyDown => {
                if len == 0 {
                    return Transition::None;
                }
                let to = (highlight + 1).min(len - 1);
                self.move_highlight(highlight, to)
            }
            SelectionEvent::KeyUp => self.move_highlight(highlight, highlight.saturating_sub(1)),
            SelectionEvent::KeyEnter => self.commit(highlight, list),
            SelectionEvent::PointerDown(index) => self.commit(index, list),
            SelectionEvent::KeyEscape | SelectionEvent::OutsideInteraction => {
                self.close();
                Transition::Revert
            }
            SelectionEvent::Typing | SelectionEvent::ListReplaced => {
                self.state = MachineState::Open { highlight: 0 };
                if highlight == 0 {
                    Transition::None
                } else {
                    Transition::Highlight {
                        from: highlight,
                        to: 0,
                    }
                }
            }
            SelectionEvent::Focus => {
                if self.close_at.take().is_some() {
                    Transition::CloseCancelled
                } else {
                    Transition::None
                }
            }
            SelectionEvent::Blur { now_ms } => match self.blur_policy {
                BlurPolicy::CommitBeforeClose => {
                    self.close();
                    Transition::Revert
                }
                BlurPolicy::GraceDelay(grace_ms) => {
                    let deadline = now_ms.saturating_add(grace_ms);
                    self.close_at = Some(deadline);
                    Transition::CloseScheduled { deadline }
                }
            },
        }
    }

    fn move_highlight(&mut self, from: usize, to: usize) -> Transition {
        if from == to {
            return Transition::None;
        }
        self.state = MachineState::Open { highlight: to };
        Transition::Highlight { from, to }
    }

    fn commit(&mut self, index: usize, list: &dyn OptionList) -> Transition {
        if index >= list.len() || !list.is_committable(index) {
            return Transition::None;
        }
        self.close();
        Transition::Commit { index }
    }

    fn close(&mut self) {
        self.state = MachineState::Closed;
        self.close_at = None;
    }
}

impl Default for SelectionMachine {
    fn default() -> Self {
        Self::new(BlurPolicy::GraceDelay(150))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Rows where some indices are disabled
    struct Rows {
        len: usize,
        disabled: Vec<usize>,
    }

    impl OptionList for Rows {
        fn len(&self) -> usize {
            self.len
        }

        fn is_committable(&self, index: usize) -> bool {
            index < self.len && !self.disabled.contains(&index)
        }
    }

    fn open(machine: &mut SelectionMachine, len: usize) {
        assert_eq!(machine.on_event(SelectionEvent::Focus, &len), Transition::Opened);
    }

    #[test]
    fn test_closed_opens_on_focus_typing_down_enter() {
        for event in [
            SelectionEvent::Focus,
            SelectionEvent::Typing,
            SelectionEvent::KeyDown,
            SelectionEvent::KeyEnter,
        ] {
            let mut machine = SelectionMachine::default();
            assert_eq!(machine.on_event(event, &3usize), Transition::Opened);
            assert_eq!(machine.state(), MachineState::Open { highlight: 0 });
        }
    }

    #[test]
    fn test_closed_ignores_escape_and_up() {
        let mut machine = SelectionMachine::default();
        assert_eq!(machine.on_event(SelectionEvent::KeyEscape, &3usize), Transition::None);
        assert_eq!(machine.on_event(SelectionEvent::KeyUp, &3usize), Transition::None);
        assert!(!machine.is_open());
    }

    #[test]
    fn test_arrow_navigation_clamps() {
        let mut machine = SelectionMachine::default();
        open(&mut machine, 3);

        assert_eq!(
            machine.on_event(SelectionEvent::KeyDown, &3usize),
            Transition::Highlight { from: 0, to: 1 }
        );
        machine.on_event(SelectionEvent::KeyDown, &3usize);
        assert_eq!(machine.on_event(SelectionEvent::KeyDown, &3usize), Transition::None);
        assert_eq!(machine.state(), MachineState::Open { highlight: 2 });

        machine.on_event(SelectionEvent::KeyUp, &3usize);
        machine.on_event(SelectionEvent::KeyUp, &3usize);
        assert_eq!(machine.on_event(SelectionEvent::KeyUp, &3usize), Transition::None);
        assert_eq!(machine.state(), MachineState::Open { highlight: 0 });
    }

    #[test]
    fn test_enter_commits_highlight() {
        let mut machine = SelectionMachine::default();
        open(&mut machine, 3);
        machine.on_event(SelectionEvent::KeyDown, &3usize);
        assert_eq!(
            machine.on_event(SelectionEvent::KeyEnter, &3usize),
            Transition::Commit { index: 1 }
        );
        assert_eq!(machine.state(), MachineState::Closed);
    }

    #[test]
    fn test_enter_on_empty_list_is_noop() {
        let mut machine = SelectionMachine::default();
        open(&mut machine, 0);
        assert_eq!(machine.on_event(SelectionEvent::KeyDown, &0usize), Transition::None);
        assert_eq!(machine.on_event(SelectionEvent::KeyEnter, &0usize), Transition::None);
        assert!(machine.is_open());
        assert_eq!(machine.active_index(0), None);
    }

    #[test]
    fn test_disabled_row_cannot_commit() {
        let rows = Rows {
            len: 3,
            disabled: vec![1],
        };
        let mut machine = SelectionMachine::default();
        machine.on_event(SelectionEvent::Focus, &rows);
        machine.on_event(SelectionEvent::KeyDown, &rows);
        assert_eq!(machine.on_event(SelectionEvent::KeyEnter, &rows), Transition::None);
        assert_eq!(
            machine.on_event(SelectionEvent::PointerDown(1), &rows),
            Transition::None
        );
        assert_eq!(
            machine.on_event(SelectionEvent::PointerDown(2), &rows),
            Transition::Commit { index: 2 }
        );
    }

    #[test]
    fn test_escape_reverts() {
        let mut machine = SelectionMachine::default();
        open(&mut machine, 2);
        assert_eq!(machine.on_event(SelectionEvent::KeyEscape, &2usize), Transition::Revert);
        assert!(!machine.is_open());
    }

    #[test]
    fn test_typing_resets_highlight() {
        let mut machine = SelectionMachine::default();
        open(&mut machine, 5);
        machine.on_event(SelectionEvent::KeyDown, &5usize);
        machine.on_event(SelectionEvent::KeyDown, &5usize);
        assert_eq!(
            machine.on_event(SelectionEvent::Typing, &5usize),
            Transition::Highlight { from: 2, to: 0 }
        );
        assert_eq!(machine.state(), MachineState::Open { highlight: 0 });
    }

    #[test]
    fn test_blur_grace_then_close() {
        let mut machine = SelectionMachine::new(BlurPolicy::GraceDelay(150));
        open(&mut machine, 2);
        assert_eq!(
            machine.on_event(SelectionEvent::Blur { now_ms: 1_000 }, &2usize),
            Transition::CloseScheduled { deadline: 1_150 }
        );
        assert_eq!(machine.tick(1_100), Transition::None);
        assert!(machine.is_open());
        assert_eq!(machine.tick(1_150), Transition::Revert);
        assert!(!machine.is_open());
        assert_eq!(machine.close_deadline(), None);
    }

    #[test]
    fn test_pointer_down_during_grace_commits_first() {
        let mut machine = SelectionMachine::new(BlurPolicy::GraceDelay(150));
        open(&mut machine, 3);
        machine.on_event(SelectionEvent::Blur { now_ms: 0 }, &3usize);
        assert_eq!(
            machine.on_event(SelectionEvent::PointerDown(2), &3usize),
            Transition::Commit { index: 2 }
        );
        assert_eq!(machine.tick(500), Transition::None);
    }

    #[test]
    fn test_refocus_cancels_grace() {
        let mut machine = SelectionMachine::new(BlurPolicy::GraceDelay(150));
        open(&mut machine, 3);
        machine.on_event(SelectionEvent::Blur { now_ms: 0 }, &3usize);
        assert_eq!(
            machine.on_event(SelectionEvent::Focus, &3usize),
            Transition::CloseCancelled
        );
        assert_eq!(machine.tick(1_000), Transition::None);
        assert!(machine.is_open());
    }

    #[test]
    fn test_commit_before_close_policy() {
        let mut machine = SelectionMachine::new(BlurPolicy::CommitBeforeClose);
        open(&mut machine, 3);
        assert_eq!(
            machine.on_event(SelectionEvent::Blur { now_ms: 0 }, &3usize),
            Transition::Revert
        );
        assert!(!machine.is_open());
    }

    #[test]
    fn test_outside_interaction_reverts() {
        let mut machine = SelectionMachine::default();
        open(&mut machine, 3);
        assert_eq!(
            machine.on_event(SelectionEvent::OutsideInteraction, &3usize),
            Transition::Revert
        );
    }

    #[test]
    fn test_force_close() {
        let mut machine = SelectionMachine::default();
        assert_eq!(machine.force_close(), Transition::None);
        open(&mut machine, 1);
        assert_eq!(machine.force_close(), Transition::Revert);
    }
}
