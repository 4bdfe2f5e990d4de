//! Equality strategies used to gate change notifications
//!
//! Stores and derived stores only notify when the new value is *unequal* to
//! the previous one under their [`Equality`]. The shorthand strategies are:
//!
//! - `strict`: identity (same allocation, or same scalar value)
//! - `shallow`: identity, or top-level children identical
//! - `shallow2` / `shallow3`: one or two more levels of recursion
//! - `deep`: unbounded recursion. There is no cycle detection, so comparing
//!   cyclic `Rc` graphs overflows the stack.

mod structural;

pub use structural::{eq_at_depth, StructuralEq};

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

/// Named comparator shorthand
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EqualityStrategy {
    #[default]
    Strict,
    Shallow,
    Shallow2,
    Shallow3,
    Deep,
}

impl EqualityStrategy {
    /// Recursion depth handed to [`eq_at_depth`]
    pub fn depth(self) -> usize {
        match self {
            EqualityStrategy::Strict => 0,
            EqualityStrategy::Shallow => 1,
            EqualityStrategy::Shallow2 => 2,
            EqualityStrategy::Shallow3 => 3,
            EqualityStrategy::Deep => usize::MAX,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EqualityStrategy::Strict => "strict",
            EqualityStrategy::Shallow => "shallow",
            EqualityStrategy::Shallow2 => "shallow2",
            EqualityStrategy::Shallow3 => "shallow3",
            EqualityStrategy::Deep => "deep",
        }
    }
}

impl fmt::Display for EqualityStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EqualityStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(EqualityStrategy::Strict),
            "shallow" => Ok(EqualityStrategy::Shallow),
            "shallow2" => Ok(EqualityStrategy::Shallow2),
            "shallow3" => Ok(EqualityStrategy::Shallow3),
            "deep" => Ok(EqualityStrategy::Deep),
            _ => Err(Error::unknown_strategy(s)),
        }
    }
}

type Comparator<S> = Rc<dyn Fn(&Rc<S>, &Rc<S>) -> bool>;

/// A resolved comparator over shared state values
pub struct Equality<S> {
    label: Cow<'static, str>,
    compare: Comparator<S>,
}

impl<S: 'static> Equality<S> {
    /// Resolve a named strategy
    pub fn from_strategy(strategy: EqualityStrategy) -> Self
    where
        S: StructuralEq,
    {
        let depth = strategy.depth();
        Self {
            label: Cow::Borrowed(strategy.as_str()),
            compare: Rc::new(move |a: &Rc<S>, b: &Rc<S>| eq_at_depth(a, b, depth)),
        }
    }

    /// Identity comparison for types implementing [`StructuralEq`]
    pub fn strict() -> Self
    where
        S: StructuralEq,
    {
        Self::from_strategy(EqualityStrategy::Strict)
    }

    /// Pointer identity only. Works for any state type.
    pub fn identity() -> Self {
        Self {
            label: Cow::Borrowed("identity"),
            compare: Rc::new(|a: &Rc<S>, b: &Rc<S>| Rc::ptr_eq(a, b)),
        }
    }

    /// A caller-supplied comparator over the underlying values
    pub fn custom(label: impl Into<Cow<'static, str>>, eq: impl Fn(&S, &S) -> bool + 'static) -> Self {
        Self {
            label: label.into(),
            compare: Rc::new(move |a: &Rc<S>, b: &Rc<S>| eq(&**a, &**b)),
        }
    }

    /// Compare two values
    pub fn equals(&self, a: &Rc<S>, b: &Rc<S>) -> bool {
        (self.compare)(a, b)
    }

    /// Strategy name, or the label given to a custom comparator
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl<S: StructuralEq + 'static> From<EqualityStrategy> for Equality<S> {
    fn from(strategy: EqualityStrategy) -> Self {
        Self::from_strategy(strategy)
    }
}

impl<S: StructuralEq + 'static> Default for Equality<S> {
    fn default() -> Self {
        Self::strict()
    }
}

impl<S> Clone for Equality<S> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            compare: self.compare.clone(),
        }
    }
}

impl<S> fmt::Debug for Equality<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Equality").field(&self.label).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[derive(Debug)]
    struct Profile {
        name: String,
        tags: Rc<Vec<String>>,
    }

    crate::structural_eq!(Profile { name, tags });

    fn profile(tags: Rc<Vec<String>>) -> Rc<Profile> {
        Rc::new(Profile {
            name: "ada".to_string(),
            tags,
        })
    }

    #[rstest]
    #[case("strict", EqualityStrategy::Strict)]
    #[case("Shallow", EqualityStrategy::Shallow)]
    #[case(" shallow2 ", EqualityStrategy::Shallow2)]
    #[case("shallow3", EqualityStrategy::Shallow3)]
    #[case("deep", EqualityStrategy::Deep)]
    fn parses_shorthands(#[case] input: &str, #[case] expected: EqualityStrategy) {
        assert_eq!(input.parse::<EqualityStrategy>().unwrap(), expected);
    }

    #[test]
    fn rejects_unknown_shorthand() {
        let err = "fuzzy".parse::<EqualityStrategy>().unwrap_err();
        assert!(matches!(err, Error::UnknownStrategy { .. }));
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&EqualityStrategy::Shallow2).unwrap();
        assert_eq!(json, "\"shallow2\"");
        let back: EqualityStrategy = serde_json::from_str("\"deep\"").unwrap();
        assert_eq!(back, EqualityStrategy::Deep);
    }

    #[test]
    fn strategies_widen_with_depth() {
        let tags = Rc::new(vec!["x".to_string()]);
        let a = profile(tags.clone());
        let same_children = profile(tags);
        let copied_children = profile(Rc::new(vec!["x".to_string()]));

        let strict = Equality::<Profile>::strict();
        let shallow = Equality::<Profile>::from(EqualityStrategy::Shallow);
        let shallow2 = Equality::<Profile>::from(EqualityStrategy::Shallow2);

        assert!(strict.equals(&a, &a.clone()));
        assert!(!strict.equals(&a, &same_children));
        assert!(shallow.equals(&a, &same_children));
        assert!(!shallow.equals(&a, &copied_children));
        assert!(shallow2.equals(&a, &copied_children));
    }

    #[test]
    fn identity_ignores_contents() {
        let eq = Equality::<Vec<u8>>::identity();
        let a = Rc::new(vec![1]);
        assert!(eq.equals(&a, &a.clone()));
        assert!(!eq.equals(&a, &Rc::new(vec![1])));
        assert_eq!(eq.label(), "identity");
    }

    #[test]
    fn custom_comparator_sees_values() {
        let eq = Equality::custom("len", |a: &String, b: &String| a.len() == b.len());
        assert!(eq.equals(&Rc::new("abc".to_string()), &Rc::new("xyz".to_string())));
        assert_eq!(format!("{eq:?}"), "Equality(\"len\")");
    }
}
