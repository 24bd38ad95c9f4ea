//! Input event types for keyboard and pointer
//!
//! Hosts translate their native events into these types before handing them to
//! a widget. Only the keys a selector reacts to get named variants. Everything
//! else arrives as [`Key::Char`] or [`Key::Unknown`] and is passed through to
//! text editing.

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

// ============================================================================
// Keyboard Events
// ============================================================================

/// Keyboard event
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyboardEvent {
    /// The key that was pressed or released
    pub key: Key,
    /// Whether the key was pressed or released
    pub state: KeyState,
    /// Modifier keys held during this event
    pub modifiers: Modifiers,
}

impl KeyboardEvent {
    /// A key press with no modifiers
    pub fn pressed(key: Key) -> Self {
        Self {
            key,
            state: KeyState::Pressed,
            modifiers: Modifiers::default(),
        }
    }

    /// A key release with no modifiers
    pub fn released(key: Key) -> Self {
        Self {
            key,
            state: KeyState::Released,
            modifiers: Modifiers::default(),
        }
    }

    /// Attach modifiers to this event
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// Key press/release state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyState {
    /// Key was pressed
    Pressed,
    /// Key was released
    Released,
}

/// Modifier key state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    /// Shift key is held
    pub shift: bool,
    /// Control key is held
    pub ctrl: bool,
    /// Alt key is held (Option on macOS)
    pub alt: bool,
    /// Meta key is held (Command on macOS, Windows key on Windows)
    pub meta: bool,
}

impl Modifiers {
    /// Check if a command-style chord is held (ctrl, alt or meta)
    pub fn is_chord(&self) -> bool {
        self.ctrl || self.alt || self.meta
    }
}

/// Key codes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    // Navigation keys handled by selectors
    Up,
    Down,
    Enter,
    Escape,

    // Editing and movement keys passed through to text input
    Backspace,
    Delete,
    Tab,
    Left,
    Right,
    Home,
    End,
    Space,

    // Character input (for text input)
    Char(char),

    // Unknown key
    Unknown,
}

impl Key {
    /// Whether a selector consumes this key instead of passing it to text editing
    pub fn is_navigation(&self) -> bool {
        matches!(self, Key::Up | Key::Down | Key::Enter | Key::Escape)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Up => f.write_str("ArrowUp"),
            Key::Down => f.write_str("ArrowDown"),
            Key::Enter => f.write_str("Enter"),
            Key::Escape => f.write_str("Escape"),
            Key::Backspace => f.write_str("Backspace"),
            Key::Delete => f.write_str("Delete"),
            Key::Tab => f.write_str("Tab"),
            Key::Left => f.write_str("ArrowLeft"),
            Key::Right => f.write_str("ArrowRight"),
            Key::Home => f.write_str("Home"),
            Key::End => f.write_str("End"),
            Key::Space => f.write_str("Space"),
            Key::Char(c) => write!(f, "{c}"),
            Key::Unknown => f.write_str("Unidentified"),
        }
    }
}

impl FromStr for Key {
    type Err = CoreError;

    /// Parse DOM-style key names (`ArrowDown`, `Enter`) or short aliases
    /// (`Down`, `Esc`). A single character parses as [`Key::Char`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Ok(Key::Char(c));
        }

        match s.to_ascii_lowercase().as_str() {
            "arrowup" | "up" => Ok(Key::Up),
            "arrowdown" | "down" => Ok(Key::Down),
            "enter" | "return" => Ok(Key::Enter),
            "escape" | "esc" => Ok(Key::Escape),
            "backspace" => Ok(Key::Backspace),
            "delete" | "del" => Ok(Key::Delete),
            "tab" => Ok(Key::Tab),
            "arrowleft" | "left" => Ok(Key::Left),
            "arrowright" | "right" => Ok(Key::Right),
            "home" => Ok(Key::Home),
            "end" => Ok(Key::End),
            "space" => Ok(Key::Space),
            _ => Err(CoreError::UnknownKey(s.to_string())),
        }
    }
}

// ============================================================================
// Pointer Events
// ============================================================================

/// Pointer event phase
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PointerKind {
    /// Button or touch went down
    Down,
    /// Button or touch went up
    Up,
    /// Pointer moved
    Moved,
}

/// Pointer event in window coordinates
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerEvent {
    /// Event phase
    pub kind: PointerKind,
    /// X position in window coordinates
    pub x: f32,
    /// Y position in window coordinates
    pub y: f32,
}

impl PointerEvent {
    /// Pointer-down at a position
    pub fn down(x: f32, y: f32) -> Self {
        Self {
            kind: PointerKind::Down,
            x,
            y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dom_names() {
        assert_eq!("ArrowDown".parse::<Key>().unwrap(), Key::Down);
        assert_eq!("ArrowUp".parse::<Key>().unwrap(), Key::Up);
        assert_eq!("Enter".parse::<Key>().unwrap(), Key::Enter);
        assert_eq!("Escape".parse::<Key>().unwrap(), Key::Escape);
    }

    #[test]
    fn test_parse_aliases_and_chars() {
        assert_eq!("down".parse::<Key>().unwrap(), Key::Down);
        assert_eq!("Esc".parse::<Key>().unwrap(), Key::Escape);
        assert_eq!("a".parse::<Key>().unwrap(), Key::Char('a'));
        assert_eq!("E".parse::<Key>().unwrap(), Key::Char('E'));
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(
            "Hyper".parse::<Key>(),
            Err(CoreError::UnknownKey("Hyper".to_string()))
        );
    }

    #[test]
    fn test_navigation_keys() {
        assert!(Key::Down.is_navigation());
        assert!(Key::Escape.is_navigation());
        assert!(!Key::Char('x').is_navigation());
        assert!(!Key::Backspace.is_navigation());
    }

    #[test]
    fn test_modifiers() {
        assert!(!Modifiers::default().is_chord());
        let ctrl = Modifiers {
            ctrl: true,
            ..Default::default()
        };
        assert!(ctrl.is_chord());
        let event = KeyboardEvent::pressed(Key::Down).with_modifiers(ctrl);
        assert_eq!(event.key, Key::Down);
        assert!(event.modifiers.ctrl);
        let shift = Modifiers {
            shift: true,
            ..Default::default()
        };
        assert!(!shift.is_chord());
    }
}
