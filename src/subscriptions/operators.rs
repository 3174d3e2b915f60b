//! Per-subscriber stream operators.
//!
//! An operator is a `FnMut(&T) -> Emit<U>` run by the subject for each
//! published value before it is queued for one subscriber.

/// What an operator does with one published value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Emit<U> {
    /// Deliver nothing for this value.
    Skip,
    /// Deliver a value and keep the stream open.
    Next(U),
    /// Deliver a value and complete the stream.
    Last(U),
}

/// Deliver every value unchanged.
pub fn identity<T: Clone>() -> impl FnMut(&T) -> Emit<T> {
    |value: &T| Emit::Next(value.clone())
}

/// Deliver `f(value)` for every value.
pub fn map<T, U, F>(f: F) -> impl FnMut(&T) -> Emit<U>
where
    F: Fn(&T) -> U,
{
    move |value: &T| Emit::Next(f(value))
}

/// Deliver only the values matching `predicate`.
pub fn filter<T, P>(predicate: P) -> impl FnMut(&T) -> Emit<T>
where
    T: Clone,
    P: Fn(&T) -> bool,
{
    move |value: &T| {
        if predicate(value) {
            Emit::Next(value.clone())
        } else {
            Emit::Skip
        }
    }
}

/// Deliver values while `predicate` holds, then deliver the first value for
/// which it fails and complete.
pub fn take_while_inclusive<T, P>(predicate: P) -> impl FnMut(&T) -> Emit<T>
where
    T: Clone,
    P: Fn(&T) -> bool,
{
    move |value: &T| {
        if predicate(value) {
            Emit::Next(value.clone())
        } else {
            Emit::Last(value.clone())
        }
    }
}

/// Deliver `f(value)` for the first value matching `predicate`, then
/// complete.
pub fn first_where<T, U, P, F>(predicate: P, f: F) -> impl FnMut(&T) -> Emit<U>
where
    P: Fn(&T) -> bool,
    F: Fn(&T) -> U,
{
    move |value: &T| {
        if predicate(value) {
            Emit::Last(f(value))
        } else {
            Emit::Skip
        }
    }
}
