//! Campus Core
//!
//! Host-side primitives shared by the campus selector widgets:
//!
//! - **Reactive Signals**: form field state with effects that fire on change,
//!   used as the parent-change notifier for dependent fields
//! - **Input Events**: keyboard and pointer events delivered by the host
//! - **Bounds**: rectangular regions for outside-interaction hit testing
//!
//! # Example
//!
//! ```rust
//! use campus_core::reactive::ReactiveGraph;
//! use std::sync::{Arc, Mutex};
//!
//! let mut graph = ReactiveGraph::new();
//! let room = graph.create_signal::<Option<u32>>(None);
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let seen_in_effect = seen.clone();
//! let _effect = graph.create_effect(move |g| {
//!     seen_in_effect.lock().unwrap().push(g.get(room).flatten());
//! });
//!
//! graph.set(room, Some(2));
//! assert_eq!(*seen.lock().unwrap(), vec![None, Some(2)]);
//! ```

pub mod bounds;
pub mod error;
pub mod input;
pub mod reactive;

pub use bounds::Bounds;
pub use error::{CoreError, Result};
pub use input::{Key, KeyState, KeyboardEvent, Modifiers, PointerEvent, PointerKind};
pub use reactive::{
    Effect, EffectId, ReactiveGraph, ReactiveStats, SharedReactiveGraph, Signal, SignalId, State,
};
