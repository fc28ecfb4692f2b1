//! Write actions.
//!
//! Both the tracking cells and the hook emulation accept either a plain
//! replacement value or a function of the previous value.

use std::fmt;

/// A pending change to a stored value.
pub enum Action<T> {
    /// Replace the value.
    SetValue(T),
    /// Compute the new value from the current one.
    UpdateFn(Box<dyn FnOnce(&T) -> T>),
}

impl<T> Action<T> {
    pub fn update<F>(f: F) -> Self
    where
        F: FnOnce(&T) -> T + 'static,
    {
        Action::UpdateFn(Box::new(f))
    }

    /// Produce the value that results from applying this action to `current`.
    pub fn apply(self, current: &T) -> T {
        match self {
            Action::SetValue(value) => value,
            Action::UpdateFn(f) => f(current),
        }
    }

    pub fn is_update_fn(&self) -> bool {
        matches!(self, Action::UpdateFn(_))
    }
}

impl<T> From<T> for Action<T> {
    fn from(value: T) -> Self {
        Action::SetValue(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for Action<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::SetValue(value) => f.debug_tuple("SetValue").field(value).finish(),
            Action::UpdateFn(_) => f.write_str("UpdateFn(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_value_ignores_current() {
        assert_eq!(Action::SetValue(7).apply(&1), 7);
    }

    #[test]
    fn update_fn_sees_current() {
        let action = Action::update(|n: &i32| n * 10);
        assert!(action.is_update_fn());
        assert_eq!(action.apply(&4), 40);
    }

    #[test]
    fn debug_hides_closure() {
        assert_eq!(format!("{:?}", Action::SetValue("x")), "SetValue(\"x\")");
        assert_eq!(format!("{:?}", Action::update(|s: &String| s.clone())), "UpdateFn(..)");
    }
}
