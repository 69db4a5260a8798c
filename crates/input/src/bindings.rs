use crate::action::Action;
use glam::Vec3;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Keys the engine binds. Front ends translate their own key codes into
/// these before lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    F1,
    F2,
    /// Top-row digit 0 to 9.
    Digit(u8),
    Plus,
    Minus,
    W,
    A,
    S,
    D,
    Q,
    E,
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InputError {
    #[error("unknown key name {0:?}")]
    UnknownKey(String),
}

impl FromStr for Key {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = match s.to_ascii_uppercase().as_str() {
            "F1" => Self::F1,
            "F2" => Self::F2,
            "+" | "PLUS" => Self::Plus,
            "-" | "MINUS" => Self::Minus,
            "W" => Self::W,
            "A" => Self::A,
            "S" => Self::S,
            "D" => Self::D,
            "Q" => Self::Q,
            "E" => Self::E,
            "UP" => Self::Up,
            "DOWN" => Self::Down,
            "LEFT" => Self::Left,
            "RIGHT" => Self::Right,
            other => match other.parse::<u8>() {
                Ok(digit) if digit <= 9 => Self::Digit(digit),
                _ => return Err(InputError::UnknownKey(s.to_string())),
            },
        };
        Ok(key)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Digit(d) => write!(f, "{d}"),
            Self::Plus => f.write_str("+"),
            Self::Minus => f.write_str("-"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Key to action table.
///
/// Movement and turn bindings hold unit directions; [`KeyBindings::resolve`]
/// scales them by the configured move and turn speeds.
#[derive(Debug, Clone)]
pub struct KeyBindings {
    table: BTreeMap<Key, Action>,
    move_step: f32,
    turn_step: f32,
}

impl Default for KeyBindings {
    /// F1/F2 cycle the render and MRT modes, digits 1 to 9 pick a camera,
    /// +/- change the time multiplier, WASD/QE move the active camera and the
    /// arrow keys turn it (left-handed: +Y yaws right, -X pitches up).
    fn default() -> Self {
        let mut table = BTreeMap::new();
        table.insert(Key::F1, Action::AdvanceRenderMode);
        table.insert(Key::F2, Action::AdvanceMrtMode);
        for digit in 1..=9u8 {
            table.insert(Key::Digit(digit), Action::SelectCamera(usize::from(digit - 1)));
        }
        table.insert(Key::Plus, Action::SpeedUp);
        table.insert(Key::Minus, Action::SlowDown);
        table.insert(Key::W, Action::MoveCamera(Vec3::NEG_Z));
        table.insert(Key::S, Action::MoveCamera(Vec3::Z));
        table.insert(Key::A, Action::MoveCamera(Vec3::NEG_X));
        table.insert(Key::D, Action::MoveCamera(Vec3::X));
        table.insert(Key::Q, Action::MoveCamera(Vec3::NEG_Y));
        table.insert(Key::E, Action::MoveCamera(Vec3::Y));
        table.insert(Key::Left, Action::RotateCamera(Vec3::NEG_Y));
        table.insert(Key::Right, Action::RotateCamera(Vec3::Y));
        table.insert(Key::Up, Action::RotateCamera(Vec3::NEG_X));
        table.insert(Key::Down, Action::RotateCamera(Vec3::X));
        Self {
            table,
            move_step: 1.0,
            turn_step: 1.0,
        }
    }
}

impl KeyBindings {
    /// A table with nothing bound.
    pub fn empty() -> Self {
        Self {
            table: BTreeMap::new(),
            move_step: 1.0,
            turn_step: 1.0,
        }
    }

    pub fn with_move_step(mut self, step: f32) -> Self {
        self.move_step = step;
        self
    }

    pub fn move_step(&self) -> f32 {
        self.move_step
    }

    pub fn with_turn_step(mut self, step: f32) -> Self {
        self.turn_step = step;
        self
    }

    pub fn turn_step(&self) -> f32 {
        self.turn_step
    }

    /// Bind `key`, returning what it was bound to before.
    pub fn bind(&mut self, key: Key, action: Action) -> Option<Action> {
        let previous = self.table.insert(key, action);
        if let Some(previous) = previous {
            tracing::debug!(%key, ?previous, ?action, "key rebound");
        }
        previous
    }

    pub fn unbind(&mut self, key: Key) -> Option<Action> {
        self.table.remove(&key)
    }

    /// The action for `key`, or [`Action::Noop`] when it is unbound.
    pub fn resolve(&self, key: Key) -> Action {
        self.table
            .get(&key)
            .map_or(Action::Noop, |action| match *action {
                Action::MoveCamera(_) => action.scaled(self.move_step),
                Action::RotateCamera(_) => action.scaled(self.turn_step),
                other => other,
            })
    }

    /// Resolve a key by name, e.g. `"F1"` or `"+"`.
    pub fn resolve_named(&self, name: &str) -> Result<Action, InputError> {
        Ok(self.resolve(name.parse()?))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Key, Action)> + '_ {
        self.table.iter().map(|(k, a)| (*k, *a))
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table() {
        let bindings = KeyBindings::default();
        assert_eq!(bindings.resolve(Key::F1), Action::AdvanceRenderMode);
        assert_eq!(bindings.resolve(Key::F2), Action::AdvanceMrtMode);
        assert_eq!(bindings.resolve(Key::Digit(1)), Action::SelectCamera(0));
        assert_eq!(bindings.resolve(Key::Digit(9)), Action::SelectCamera(8));
        assert_eq!(bindings.resolve(Key::Digit(0)), Action::Noop);
        assert_eq!(bindings.resolve(Key::Plus), Action::SpeedUp);
        assert_eq!(bindings.resolve(Key::Minus), Action::SlowDown);
        assert_eq!(bindings.resolve(Key::Right), Action::RotateCamera(Vec3::Y));
        assert_eq!(bindings.len(), 23);
    }

    #[test]
    fn movement_is_scaled_by_step() {
        let bindings = KeyBindings::default().with_move_step(0.25);
        assert_eq!(
            bindings.resolve(Key::W),
            Action::MoveCamera(Vec3::new(0.0, 0.0, -0.25))
        );
        assert_eq!(bindings.resolve(Key::F1), Action::AdvanceRenderMode);
    }

    #[test]
    fn turning_uses_its_own_step() {
        let bindings = KeyBindings::default().with_move_step(4.0).with_turn_step(0.5);
        assert_eq!(
            bindings.resolve(Key::Up),
            Action::RotateCamera(Vec3::new(-0.5, 0.0, 0.0))
        );
        assert_eq!(bindings.resolve(Key::D), Action::MoveCamera(Vec3::new(4.0, 0.0, 0.0)));
    }

    #[test]
    fn rebinding_returns_previous() {
        let mut bindings = KeyBindings::default();
        let previous = bindings.bind(Key::F1, Action::AdvanceMrtMode);
        assert_eq!(previous, Some(Action::AdvanceRenderMode));
        assert_eq!(bindings.resolve(Key::F1), Action::AdvanceMrtMode);
        assert_eq!(bindings.unbind(Key::F1), Some(Action::AdvanceMrtMode));
        assert_eq!(bindings.resolve(Key::F1), Action::Noop);
    }

    #[test]
    fn empty_table_resolves_to_noop() {
        let bindings = KeyBindings::empty();
        assert!(bindings.is_empty());
        assert_eq!(bindings.resolve(Key::W), Action::Noop);
    }

    #[test]
    fn key_names() {
        assert_eq!("f1".parse::<Key>(), Ok(Key::F1));
        assert_eq!("+".parse::<Key>(), Ok(Key::Plus));
        assert_eq!("7".parse::<Key>(), Ok(Key::Digit(7)));
        assert_eq!(
            "F13".parse::<Key>(),
            Err(InputError::UnknownKey("F13".into()))
        );
        assert!("10".parse::<Key>().is_err());
        assert_eq!(Key::Digit(3).to_string(), "3");
        assert_eq!(Key::F2.to_string(), "F2");
        assert_eq!("left".parse::<Key>(), Ok(Key::Left));
        assert_eq!(Key::Down.to_string(), "Down");
    }

    #[test]
    fn resolve_by_name() {
        let bindings = KeyBindings::default();
        assert_eq!(bindings.resolve_named("F2"), Ok(Action::AdvanceMrtMode));
        assert!(bindings.resolve_named("space").is_err());
    }
}
