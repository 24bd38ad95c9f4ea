//! Campus Select
//!
//! Headless selector widgets for campus administration forms: pick a room,
//! a time slot, a course, an instructor or a student from a list that may be
//! long, remote, or constrained by another field.
//!
//! # Layers
//!
//! - **Option Index** ([`index`]): case-insensitive substring filtering
//! - **Debounced Query Scheduler** ([`debounce`]): one fetch per quiet period,
//!   with generation tokens ([`generation`]) so only the latest result applies
//! - **Selection State Machine** ([`machine`]): open/closed, highlight,
//!   commit and revert
//! - **Dependent Filter Adapter** ([`dependent`]): a child field's candidates
//!   recomputed from a parent field's value
//! - **Selector Widget** ([`widget`]): the composition of the above into one
//!   controlled combobox
//!
//! Everything above is sans-IO and takes explicit millisecond timestamps. The
//! [`driver`] module runs a scheduler on tokio timers for hosts that want it.
//!
//! # Example
//!
//! ```rust
//! use campus_select::prelude::*;
//! use campus_core::{Key, KeyboardEvent};
//!
//! let mut courses = selector::<SelectOption<&'static str>>("course")
//!     .option(SelectOption::new("CS101", "Intro to Programming"))
//!     .option(SelectOption::new("CS240", "Data Structures"))
//!     .build()
//!     .unwrap();
//!
//! courses.input("data", 0);
//! courses.key(&KeyboardEvent::pressed(Key::Enter));
//! assert_eq!(courses.value(), Some(&"CS240"));
//! ```

pub mod choice;
pub mod config;
pub mod debounce;
pub mod dependent;
pub mod dismiss;
pub mod driver;
pub mod error;
pub mod generation;
pub mod index;
pub mod machine;
pub mod widget;

pub use choice::{Choice, SelectOption};
pub use config::{BlurPolicy, SelectorConfig};
pub use debounce::{
    DebouncedScheduler, FetchRequest, QueryChange, ResultOutcome, ResultSet, SearchStatus,
};
pub use dependent::{
    compute_candidates, exclude, fetch_dependent, CandidateSource, DependentFilter,
    DependentRequest, DependentResponse, DependentState, ExclusionSet,
};
pub use dismiss::{Interaction, InteractionRegion, OutsideInteractionDetector};
pub use driver::{
    spawn_debounced_search, spawn_dependent_refresh, RemoteSource, SearchEvent, SearchHandle,
};
pub use error::{FetchError, Result, SelectError};
pub use generation::{GenerationCounter, GenerationToken};
pub use index::{filter, filter_indices, matches, CandidateSet};
pub use machine::{MachineState, OptionList, SelectionEvent, SelectionMachine, Transition};
pub use widget::{
    selector, AccessibilitySnapshot, ChangeCallback, EmptyReason, KeyOutcome, Selector,
    SelectorBuilder, SelectorMode, SelectorView, ViewItem,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::choice::{Choice, SelectOption};
    pub use crate::config::SelectorConfig;
    pub use crate::debounce::{FetchRequest, SearchStatus};
    pub use crate::dependent::{CandidateSource, DependentFilter, ExclusionSet};
    pub use crate::dismiss::OutsideInteractionDetector;
    pub use crate::error::{FetchError, SelectError};
    pub use crate::widget::{selector, KeyOutcome, Selector, SelectorMode};
}
