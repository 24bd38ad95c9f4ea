//! Scheduling form: room picker with a dependent time-slot picker
//!
//! Field values live in a reactive graph. Picker commits write the fields
//! through `on_change`. An effect on the room field is the parent-change
//! notifier: every room change goes to the slot filter, and the requests it
//! produces queue up for the host to run.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use campus_core::{Effect, ReactiveGraph, SharedReactiveGraph, Signal, State};
use campus_select::{
    selector, DependentFilter, DependentRequest, DependentResponse, DependentState, ResultOutcome,
    Selector, SelectorConfig,
};
use tracing::debug;

use crate::catalog::{Room, TimeSlot};

type SlotFilter = DependentFilter<u32, TimeSlot>;

pub struct ScheduleForm {
    graph: SharedReactiveGraph,
    room: State<Option<u32>>,
    slot: State<Option<String>>,
    slots: Arc<Mutex<SlotFilter>>,
    requests: Arc<Mutex<Vec<DependentRequest<u32>>>>,
    _room_watch: Effect,
    pub room_picker: Selector<Room>,
    pub slot_picker: Selector<TimeSlot>,
}

impl ScheduleForm {
    pub fn new(rooms: Vec<Room>, config: &SelectorConfig) -> Result<Self> {
        let graph: SharedReactiveGraph = Arc::new(Mutex::new(ReactiveGraph::new()));
        let room: State<Option<u32>> = State::new(&graph, None);
        let slot: State<Option<String>> = State::new(&graph, None);

        let slots = Arc::new(Mutex::new(SlotFilter::new()));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let room_signal = room.signal();
        let watch_slots = Arc::clone(&slots);
        let watch_requests = Arc::clone(&requests);
        let room_watch = lock(&graph).create_effect(move |g| {
            let parent = g.get(room_signal).flatten();
            if let Some(request) = lock(&watch_slots).set_parent(parent) {
                lock(&watch_requests).push(request);
            }
        });

        let room_field = Arc::clone(&graph);
        let slot_signal = slot.signal();
        let room_picker = selector("room")
            .options(rooms)
            .config(config.clone())
            .placeholder("Room")
            .on_change(move |id: &u32| {
                select_room(&room_field, room_signal, slot_signal, Some(*id));
            })
            .build()?;

        let slot_field = slot.clone();
        let slot_picker = selector("slot")
            .config(config.clone())
            .placeholder("Time slot")
            .disabled(true)
            .on_change(move |id: &String| slot_field.set(Some(id.clone())))
            .build()?;

        Ok(Self {
            graph,
            room,
            slot,
            slots,
            requests,
            _room_watch: room_watch,
            room_picker,
            slot_picker,
        })
    }

    pub fn room(&self) -> Option<u32> {
        self.room.get()
    }

    pub fn slot(&self) -> Option<String> {
        self.slot.get()
    }

    /// Change the room; the slot value no longer applies and is cleared
    pub fn set_room(&mut self, room: Option<u32>) {
        select_room(&self.graph, self.room.signal(), self.slot.signal(), room);
        self.room_picker.set_value(room);
        self.sync_slot_picker();
    }

    pub fn set_slot(&mut self, slot: Option<String>) {
        self.slot.set(slot.clone());
        self.slot_picker.set_value(slot);
    }

    /// Requests produced by room changes since the last call
    ///
    /// Also brings the slot picker up to date with commits made in the room
    /// picker.
    pub fn take_requests(&mut self) -> Vec<DependentRequest<u32>> {
        self.sync_slot_picker();
        std::mem::take(&mut *lock(&self.requests))
    }

    /// Apply a slot computation result
    pub fn apply(&mut self, response: DependentResponse<TimeSlot>) -> ResultOutcome<()> {
        let outcome = lock(&self.slots).on_response(response);
        if outcome.is_applied() {
            self.sync_slot_picker();
        }
        outcome
    }

    pub fn slot_state(&self) -> DependentState<u32> {
        lock(&self.slots).state().clone()
    }

    /// Slots currently offered for the selected room
    pub fn available_slots(&self) -> Vec<TimeSlot> {
        lock(&self.slots).candidates().iter().cloned().collect()
    }

    /// Number of signals and effects in the form graph
    pub fn graph_stats(&self) -> campus_core::ReactiveStats {
        lock(&self.graph).stats()
    }

    fn sync_slot_picker(&mut self) {
        let (candidates, disabled) = {
            let filter = lock(&self.slots);
            (filter.candidates().clone(), filter.is_child_disabled())
        };
        debug!(count = candidates.len(), disabled, "slot picker synced");
        self.slot_picker.set_options(candidates);
        self.slot_picker.set_disabled(disabled);
        self.slot_picker.set_value(self.slot.get());
    }
}

/// Write the room field and clear the slot in one batch
///
/// Re-selecting the current room changes nothing and requests nothing.
fn select_room(
    graph: &SharedReactiveGraph,
    room: Signal<Option<u32>>,
    slot: Signal<Option<String>>,
    value: Option<u32>,
) {
    lock(graph).batch(|g| {
        if g.set_if_changed(room, value) {
            g.set(slot, None);
        }
    });
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use campus_core::{Key, KeyboardEvent};
    use campus_select::FetchError;

    fn form() -> ScheduleForm {
        ScheduleForm::new(Catalog::sample().rooms, &SelectorConfig::default()).unwrap()
    }

    fn slots_for(room: u32) -> Vec<TimeSlot> {
        Catalog::sample()
            .slots
            .into_iter()
            .filter(|s| s.room == room)
            .collect()
    }

    fn respond(
        request: &DependentRequest<u32>,
        booked: &[&str],
    ) -> DependentResponse<TimeSlot> {
        DependentResponse {
            token: request.token,
            candidates: Ok(slots_for(request.parent)),
            exclusions: Ok(booked.iter().map(|s| s.to_string()).collect()),
        }
    }

    #[test]
    fn test_starts_disabled_without_requests() {
        let mut form = form();
        assert!(form.take_requests().is_empty());
        assert_eq!(form.slot_state(), DependentState::Disabled);
        assert!(form.slot_picker.is_disabled());
    }

    #[test]
    fn test_room_change_requests_slots() {
        let mut form = form();
        form.set_room(Some(2));
        assert_eq!(form.room_picker.display_text(), "Room B");

        let requests = form.take_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].parent, 2);
        assert!(form.slot_picker.is_disabled());

        assert!(form.apply(respond(&requests[0], &["R2-T3"])).is_applied());
        let ids: Vec<_> = form.available_slots().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["R2-T1", "R2-T2", "R2-T4"]);
        assert!(!form.slot_picker.is_disabled());
        assert_eq!(form.slot_picker.options().len(), 3);
    }

    #[test]
    fn test_switching_rooms_drops_old_response() {
        let mut form = form();
        form.set_room(Some(1));
        let first = form.take_requests().remove(0);
        form.set_room(Some(2));
        let second = form.take_requests().remove(0);

        assert_eq!(form.apply(respond(&first, &[])), ResultOutcome::Stale);
        assert!(form.available_slots().is_empty());

        form.apply(respond(&second, &["R2-T3"]));
        assert_eq!(form.slot_state(), DependentState::Ready { parent: 2 });
    }

    #[test]
    fn test_room_change_clears_slot() {
        let mut form = form();
        form.set_room(Some(1));
        let request = form.take_requests().remove(0);
        form.apply(respond(&request, &[]));
        form.set_slot(Some("R1-T2".to_string()));
        assert_eq!(form.slot_picker.display_text(), "Mon 11:00");

        form.set_room(Some(3));
        assert_eq!(form.slot(), None);
        assert_eq!(form.slot_picker.value(), None);
        assert!(form.slot_picker.is_disabled());
    }

    #[test]
    fn test_clearing_room_disables_slots() {
        let mut form = form();
        form.set_room(Some(1));
        let request = form.take_requests().remove(0);
        form.apply(respond(&request, &[]));

        form.set_room(None);
        assert!(form.take_requests().is_empty());
        assert_eq!(form.slot_state(), DependentState::Disabled);
        assert!(form.slot_picker.options().is_empty());
        assert_eq!(form.room(), None);
    }

    #[test]
    fn test_failed_exclusions_disable_slots() {
        let mut form = form();
        form.set_room(Some(4));
        let request = form.take_requests().remove(0);
        let response = DependentResponse {
            token: request.token,
            candidates: Ok(slots_for(4)),
            exclusions: Err(FetchError::Network("booking system down".into())),
        };
        assert!(form.apply(response).is_applied());
        assert!(matches!(form.slot_state(), DependentState::Failed { parent: 4, .. }));
        assert!(form.slot_picker.is_disabled());
        assert!(form.available_slots().is_empty());
    }

    #[test]
    fn test_graph_holds_form_fields() {
        let form = form();
        let stats = form.graph_stats();
        assert_eq!(stats.signal_count, 2);
        assert_eq!(stats.effect_count, 1);
    }

    #[test]
    fn test_room_picker_commit_requests_slots() {
        let mut form = form();
        form.room_picker.focus();
        form.room_picker.input("b", 0);
        form.room_picker.key(&KeyboardEvent::pressed(Key::Enter));

        assert_eq!(form.room(), Some(2));
        let requests = form.take_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].parent, 2);
        assert_eq!(form.slot_state(), DependentState::Loading { parent: 2 });
        assert!(form.slot_picker.is_disabled());

        // Committing the same room again changes nothing
        form.room_picker.focus();
        form.room_picker.input("b", 10);
        form.room_picker.key(&KeyboardEvent::pressed(Key::Enter));
        assert!(form.take_requests().is_empty());
    }

    #[test]
    fn test_slot_picker_commit_sets_field() {
        let mut form = form();
        form.set_room(Some(2));
        let request = form.take_requests().remove(0);
        form.apply(respond(&request, &["R2-T3"]));

        form.slot_picker.focus();
        form.slot_picker.key(&KeyboardEvent::pressed(Key::Down));
        form.slot_picker.key(&KeyboardEvent::pressed(Key::Enter));
        assert_eq!(form.slot(), Some("R2-T2".to_string()));
        assert_eq!(form.slot_picker.display_text(), "Mon 11:00");

        // A new room from the picker clears the chosen slot
        form.room_picker.focus();
        form.room_picker.input("a", 20);
        form.room_picker.key(&KeyboardEvent::pressed(Key::Enter));
        assert_eq!(form.room(), Some(1));
        assert_eq!(form.slot(), None);

        let requests = form.take_requests();
        assert_eq!(requests[0].parent, 1);
        assert_eq!(form.slot_picker.value(), None);
        assert!(form.slot_picker.is_disabled());
    }
}
