//! The projection contract between host records and selectors
//!
//! A selector never inspects host records beyond the [`Choice`] projections.
//! It only reads options and never mutates them.

use std::borrow::Cow;
use std::fmt::Debug;
use std::hash::Hash;

/// Host-supplied projections over an option record
///
/// ```
/// use std::borrow::Cow;
/// use campus_select::Choice;
///
/// struct Room { id: u32, name: String }
///
/// impl Choice for Room {
///     type Key = u32;
///     fn label(&self) -> Cow<'_, str> { Cow::Borrowed(&self.name) }
///     fn key(&self) -> u32 { self.id }
/// }
/// ```
pub trait Choice {
    /// Primitive key used for equality and as the controlled value
    type Key: Clone + Eq + Hash + Debug + Send + Sync + 'static;

    /// Display label, also the text that queries match against
    fn label(&self) -> Cow<'_, str>;

    /// Key identifying this option
    fn key(&self) -> Self::Key;

    /// Disabled options are listed but cannot be committed
    fn is_disabled(&self) -> bool {
        false
    }
}

/// A plain key/label option for static lists
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectOption<K> {
    /// The key (stored by the host when selected)
    pub key: K,
    /// The display label
    pub label: String,
    /// Whether this option is disabled
    pub disabled: bool,
}

impl<K> SelectOption<K> {
    /// Create a new option with key and label
    pub fn new(key: K, label: impl Into<String>) -> Self {
        Self {
            key,
            label: label.into(),
            disabled: false,
        }
    }

    /// Mark this option as disabled
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

impl<K: Clone + Eq + Hash + Debug + Send + Sync + 'static> Choice for SelectOption<K> {
    type Key = K;

    fn label(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.label)
    }

    fn key(&self) -> K {
        self.key.clone()
    }

    fn is_disabled(&self) -> bool {
        self.disabled
    }
}
