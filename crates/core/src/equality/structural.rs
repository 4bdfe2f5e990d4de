//! Depth-bounded structural comparison
//!
//! Identity mirrors reference semantics: shared pointers (`Rc`, `Arc`) and
//! containers are identical only when they are the same allocation, while
//! scalars and strings are identical when their values match. Comparing at
//! depth `n` accepts two values that are identical, or whose children are
//! equal at depth `n - 1`.

use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};
use std::rc::Rc;
use std::sync::Arc;

/// Values that can be compared by identity and level by level
pub trait StructuralEq {
    /// Identity comparison
    fn identical(&self, other: &Self) -> bool;

    /// Compare direct children with [`eq_at_depth`] at `depth`
    fn children_eq(&self, other: &Self, depth: usize) -> bool;
}

/// `a` and `b` are identical, or (when `depth > 0`) their children are equal at `depth - 1`
pub fn eq_at_depth<T: StructuralEq + ?Sized>(a: &T, b: &T, depth: usize) -> bool {
    a.identical(b) || (depth > 0 && a.children_eq(b, depth - 1))
}

macro_rules! value_identity {
    ($($ty:ty),* $(,)?) => {
        $(
            impl StructuralEq for $ty {
                fn identical(&self, other: &Self) -> bool {
                    self == other
                }

                fn children_eq(&self, _other: &Self, _depth: usize) -> bool {
                    false
                }
            }
        )*
    };
}

value_identity!(
    (), bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, str, String,
);

// Floats compare by bit pattern: a NaN is identical to itself, and 0.0 and -0.0 differ.
macro_rules! float_identity {
    ($($ty:ty),* $(,)?) => {
        $(
            impl StructuralEq for $ty {
                fn identical(&self, other: &Self) -> bool {
                    self.to_bits() == other.to_bits()
                }

                fn children_eq(&self, _other: &Self, _depth: usize) -> bool {
                    false
                }
            }
        )*
    };
}

float_identity!(f32, f64);

impl<T: StructuralEq + ?Sized> StructuralEq for &T {
    fn identical(&self, other: &Self) -> bool {
        std::ptr::eq(*self, *other) || (**self).identical(*other)
    }

    fn children_eq(&self, other: &Self, depth: usize) -> bool {
        (**self).children_eq(*other, depth)
    }
}

impl<T: StructuralEq + ?Sized> StructuralEq for Box<T> {
    fn identical(&self, other: &Self) -> bool {
        (**self).identical(&**other)
    }

    fn children_eq(&self, other: &Self, depth: usize) -> bool {
        (**self).children_eq(&**other, depth)
    }
}

impl<T: StructuralEq + ?Sized> StructuralEq for Rc<T> {
    fn identical(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other) || (**self).identical(&**other)
    }

    fn children_eq(&self, other: &Self, depth: usize) -> bool {
        (**self).children_eq(&**other, depth)
    }
}

impl<T: StructuralEq + ?Sized> StructuralEq for Arc<T> {
    fn identical(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other) || (**self).identical(&**other)
    }

    fn children_eq(&self, other: &Self, depth: usize) -> bool {
        (**self).children_eq(&**other, depth)
    }
}

impl<T: StructuralEq> StructuralEq for Option<T> {
    fn identical(&self, other: &Self) -> bool {
        match (self, other) {
            (None, None) => true,
            (Some(a), Some(b)) => a.identical(b),
            _ => false,
        }
    }

    fn children_eq(&self, other: &Self, depth: usize) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.children_eq(b, depth),
            _ => false,
        }
    }
}

impl<T: StructuralEq> StructuralEq for [T] {
    fn identical(&self, other: &Self) -> bool {
        std::ptr::eq(self.as_ptr(), other.as_ptr()) && self.len() == other.len()
    }

    fn children_eq(&self, other: &Self, depth: usize) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other.iter())
                .all(|(a, b)| eq_at_depth(a, b, depth))
    }
}

impl<T: StructuralEq> StructuralEq for Vec<T> {
    fn identical(&self, other: &Self) -> bool {
        self.as_slice().identical(other.as_slice())
    }

    fn children_eq(&self, other: &Self, depth: usize) -> bool {
        self.as_slice().children_eq(other.as_slice(), depth)
    }
}

impl<K: Eq + Hash, V: StructuralEq, H: BuildHasher> StructuralEq for HashMap<K, V, H> {
    fn identical(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }

    fn children_eq(&self, other: &Self, depth: usize) -> bool {
        self.len() == other.len()
            && self.iter().all(|(key, value)| {
                other
                    .get(key)
                    .is_some_and(|theirs| eq_at_depth(value, theirs, depth))
            })
    }
}

impl<K: Eq + Hash, V: StructuralEq, H: BuildHasher> StructuralEq for IndexMap<K, V, H> {
    fn identical(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }

    fn children_eq(&self, other: &Self, depth: usize) -> bool {
        self.len() == other.len()
            && self.iter().all(|(key, value)| {
                other
                    .get(key)
                    .is_some_and(|theirs| eq_at_depth(value, theirs, depth))
            })
    }
}

impl<K: Ord, V: StructuralEq> StructuralEq for BTreeMap<K, V> {
    fn identical(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }

    fn children_eq(&self, other: &Self, depth: usize) -> bool {
        self.len() == other.len()
            && self.iter().all(|(key, value)| {
                other
                    .get(key)
                    .is_some_and(|theirs| eq_at_depth(value, theirs, depth))
            })
    }
}

macro_rules! tuple_structural_eq {
    ($(($($name:ident : $idx:tt),+)),* $(,)?) => {
        $(
            impl<$($name: StructuralEq),+> StructuralEq for ($($name,)+) {
                fn identical(&self, other: &Self) -> bool {
                    std::ptr::eq(self, other)
                }

                fn children_eq(&self, other: &Self, depth: usize) -> bool {
                    true $(&& eq_at_depth(&self.$idx, &other.$idx, depth))+
                }
            }
        )*
    };
}

tuple_structural_eq!(
    (A: 0),
    (A: 0, B: 1),
    (A: 0, B: 1, C: 2),
    (A: 0, B: 1, C: 2, D: 3),
);

impl StructuralEq for serde_json::Value {
    fn identical(&self, other: &Self) -> bool {
        use serde_json::Value;
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a.identical(b),
            (Value::Object(_), Value::Object(_)) => std::ptr::eq(self, other),
            _ => false,
        }
    }

    fn children_eq(&self, other: &Self, depth: usize) -> bool {
        use serde_json::Value;
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => a.children_eq(b, depth),
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(key, value)| {
                        b.get(key)
                            .is_some_and(|theirs| eq_at_depth(value, theirs, depth))
                    })
            }
            _ => false,
        }
    }
}

/// Implement [`StructuralEq`] for a type.
///
/// `structural_eq!(Type { field_a, field_b })` compares a struct field by
/// field, with struct identity meaning "same address". `structural_eq!(value
/// Type)` treats a `PartialEq` type as an opaque value, like a scalar.
#[macro_export]
macro_rules! structural_eq {
    (value $ty:ty) => {
        impl $crate::equality::StructuralEq for $ty {
            fn identical(&self, other: &Self) -> bool {
                self == other
            }

            fn children_eq(&self, _other: &Self, _depth: usize) -> bool {
                false
            }
        }
    };
    ($ty:ty { $($field:ident),* $(,)? }) => {
        impl $crate::equality::StructuralEq for $ty {
            fn identical(&self, other: &Self) -> bool {
                ::std::ptr::eq(self, other)
            }

            fn children_eq(&self, other: &Self, depth: usize) -> bool {
                true $(&& $crate::equality::eq_at_depth(&self.$field, &other.$field, depth))*
            }
        }
    };
}
