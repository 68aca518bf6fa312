//! Equality predicates for change detection.
//!
//! The engine compares `Rc` handles, so the original distinction between
//! reference equality and shallow field-wise equality maps directly:
//!
//! - [`identity`]: `Rc::ptr_eq` — a fresh allocation is always "changed".
//! - [`shallow`]: pointer equality first, then exactly one level of
//!   [`ShallowEq`]. Shared-handle fields compare by identity, leaf values by
//!   `PartialEq`, so the check is O(field count), never O(state size).
//!
//! Two predicates are configured independently per consumer: one for the
//! state-unchanged short-circuit, one for projected-output comparison.
//! Unifying them would change observable re-render frequency.

use std::rc::Rc;

/// An equality predicate over shared value handles.
pub type EqFn<T> = Rc<dyn Fn(&Rc<T>, &Rc<T>) -> bool>;

/// One-level equality.
///
/// Implement for a projection output by comparing each field with
/// `shallow_eq`; the provided impls make `Rc` fields compare by pointer
/// identity and leaf values by `PartialEq`. Never recurse through a shared
/// handle.
pub trait ShallowEq {
    fn shallow_eq(&self, other: &Self) -> bool;
}

impl<T: ?Sized> ShallowEq for Rc<T> {
    fn shallow_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl<T: ShallowEq> ShallowEq for Option<T> {
    fn shallow_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.shallow_eq(b),
            (None, None) => true,
            _ => false,
        }
    }
}

macro_rules! shallow_eq_by_value {
    ($($ty:ty),* $(,)?) => {$(
        impl ShallowEq for $ty {
            fn shallow_eq(&self, other: &Self) -> bool {
                self == other
            }
        }
    )*};
}

shallow_eq_by_value!(
    (),
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
    String,
);

/// Identity equality: two handles are equal iff they point at the same
/// allocation.
#[must_use]
pub fn identity<T: ?Sized + 'static>() -> EqFn<T> {
    Rc::new(|a: &Rc<T>, b: &Rc<T>| Rc::ptr_eq(a, b))
}

/// Shallow equality: identity first, then one level of [`ShallowEq`].
#[must_use]
pub fn shallow<T: ShallowEq + 'static>() -> EqFn<T> {
    Rc::new(|a: &Rc<T>, b: &Rc<T>| Rc::ptr_eq(a, b) || (**a).shallow_eq(&**b))
}
