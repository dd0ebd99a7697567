//! A success/failure container for expected-failure paths.
//!
//! `Either` differs from `Result` in one way that matters to validators:
//! [`Either::chain_each`] visits every element of a collection and reports
//! all failures instead of stopping at the first one.

use serde::{Deserialize, Serialize};

/// Either a successful value or a failure.
///
/// Exactly one side is ever present; [`Either::into_pair`] exposes that as a
/// `(Option<T>, Option<E>)` pair where the unselected side is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Either<T, E> {
    /// The successful value.
    Ok(T),
    /// The failure.
    Fail(E),
}

impl<T, E> Either<T, E> {
    /// Wraps a successful value.
    pub fn ok(value: T) -> Self {
        Self::Ok(value)
    }

    /// Wraps a failure.
    pub fn fail(error: E) -> Self {
        Self::Fail(error)
    }

    /// Runs a fallible closure and captures its outcome as a value.
    ///
    /// Lets a caller keep assembling a validation report after a check fails
    /// instead of returning early with `?`.
    pub fn safe<F>(f: F) -> Self
    where
        F: FnOnce() -> Result<T, E>,
    {
        f().into()
    }

    /// Returns true for the success side.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// Returns true for the failure side.
    pub fn is_fail(&self) -> bool {
        matches!(self, Self::Fail(_))
    }

    /// Borrows the success value, if any.
    pub fn ok_value(&self) -> Option<&T> {
        match self {
            Self::Ok(value) => Some(value),
            Self::Fail(_) => None,
        }
    }

    /// Borrows the failure, if any.
    pub fn error(&self) -> Option<&E> {
        match self {
            Self::Ok(_) => None,
            Self::Fail(error) => Some(error),
        }
    }

    /// Destructures into an `(ok, error)` pair. Exactly one side is `Some`.
    pub fn into_pair(self) -> (Option<T>, Option<E>) {
        match self {
            Self::Ok(value) => (Some(value), None),
            Self::Fail(error) => (None, Some(error)),
        }
    }

    /// Transforms the success value.
    pub fn map<U, F>(self, f: F) -> Either<U, E>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Ok(value) => Either::Ok(f(value)),
            Self::Fail(error) => Either::Fail(error),
        }
    }

    /// Transforms the failure.
    pub fn map_err<G, F>(self, f: F) -> Either<T, G>
    where
        F: FnOnce(E) -> G,
    {
        match self {
            Self::Ok(value) => Either::Ok(value),
            Self::Fail(error) => Either::Fail(f(error)),
        }
    }

    /// Monadic bind: feeds the success value into `f`, passes failures through.
    pub fn chain<U, F>(self, f: F) -> Either<U, E>
    where
        F: FnOnce(T) -> Either<U, E>,
    {
        match self {
            Self::Ok(value) => f(value),
            Self::Fail(error) => Either::Fail(error),
        }
    }

    /// Converts into a standard `Result`.
    pub fn into_result(self) -> Result<T, E> {
        match self {
            Self::Ok(value) => Ok(value),
            Self::Fail(error) => Err(error),
        }
    }
}

impl<C, E> Either<C, E>
where
    C: IntoIterator,
{
    /// Binds `f` over every element of a successful collection.
    ///
    /// All elements are visited. If any of them fails, the result is a single
    /// failure holding one entry per failing element, in input order. A
    /// failure on `self` is passed through as a one-element failure list.
    pub fn chain_each<U, F>(self, mut f: F) -> Either<Vec<U>, Vec<E>>
    where
        F: FnMut(C::Item) -> Either<U, E>,
    {
        let items = match self {
            Self::Ok(items) => items,
            Self::Fail(error) => return Either::Fail(vec![error]),
        };

        let mut values = Vec::new();
        let mut errors = Vec::new();
        for item in items {
            match f(item) {
                Either::Ok(value) => values.push(value),
                Either::Fail(error) => errors.push(error),
            }
        }

        if errors.is_empty() {
            Either::Ok(values)
        } else {
            Either::Fail(errors)
        }
    }
}

impl<T, E> From<Result<T, E>> for Either<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Ok(value),
            Err(error) => Self::Fail(error),
        }
    }
}

impl<T, E> From<Either<T, E>> for Result<T, E> {
    fn from(either: Either<T, E>) -> Self {
        either.into_result()
    }
}
