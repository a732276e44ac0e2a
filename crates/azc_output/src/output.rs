//! The deferred value type.

use std::fmt;
use std::future::Future;

use futures::future::{self, BoxFuture, FutureExt, Shared};
use tracing::trace;

use crate::error::{OutputError, OutputResult};

type SharedFuture<T> = Shared<BoxFuture<'static, OutputResult<T>>>;

/// A value that is either known now or resolved later by the host runtime.
///
/// Clones share a single evaluation. Composition (`map`, `apply`, `all`)
/// never forces resolution: known inputs compose eagerly, pending inputs
/// produce a new pending value.
#[derive(Clone)]
pub struct Output<T>
where
    T: Clone + Send + Sync + 'static,
{
    inner: Inner<T>,
}

#[derive(Clone)]
enum Inner<T>
where
    T: Clone + Send + Sync + 'static,
{
    Known(T),
    Pending(SharedFuture<T>),
    Failed(OutputError),
}

impl<T> Output<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Wrap an immediate value.
    pub fn known(value: T) -> Self {
        Self {
            inner: Inner::Known(value),
        }
    }

    /// A value that is already known to have failed.
    pub fn failed(error: OutputError) -> Self {
        Self {
            inner: Inner::Failed(error),
        }
    }

    /// Wrap a future that resolves the value later.
    pub fn from_future<F>(fut: F) -> Self
    where
        F: Future<Output = OutputResult<T>> + Send + 'static,
    {
        Self {
            inner: Inner::Pending(fut.boxed().shared()),
        }
    }

    /// Whether the value is available without resolving anything.
    pub fn is_known(&self) -> bool {
        matches!(self.inner, Inner::Known(_))
    }

    /// The immediate value, if there is one.
    pub fn peek(&self) -> Option<&T> {
        match &self.inner {
            Inner::Known(value) => Some(value),
            _ => None,
        }
    }

    /// Resolve the value, waiting on upstream values if needed.
    pub async fn resolve(&self) -> OutputResult<T> {
        match &self.inner {
            Inner::Known(value) => Ok(value.clone()),
            Inner::Failed(error) => Err(error.clone()),
            Inner::Pending(fut) => fut.clone().await,
        }
    }

    /// Transform the value once it is known.
    pub fn map<U, F>(&self, f: F) -> Output<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        match &self.inner {
            Inner::Known(value) => Output::known(f(value.clone())),
            Inner::Failed(error) => Output::failed(error.clone()),
            Inner::Pending(fut) => {
                let fut = fut.clone();
                Output::from_future(async move { fut.await.map(f) })
            }
        }
    }

    /// Chain into another deferred value once this one is known.
    pub fn apply<U, F>(&self, f: F) -> Output<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> Output<U> + Send + 'static,
    {
        match &self.inner {
            Inner::Known(value) => f(value.clone()),
            Inner::Failed(error) => Output::failed(error.clone()),
            Inner::Pending(fut) => {
                let fut = fut.clone();
                Output::from_future(async move {
                    let value = fut.await?;
                    f(value).resolve().await
                })
            }
        }
    }

    /// Combine values into one deferred list, keeping input order.
    ///
    /// Resolution stops at the first failure observed.
    pub fn all(items: Vec<Output<T>>) -> Output<Vec<T>> {
        if let Some(error) = items.iter().find_map(|item| match &item.inner {
            Inner::Failed(error) => Some(error.clone()),
            _ => None,
        }) {
            return Output::failed(error);
        }

        if items.iter().all(Output::is_known) {
            let values = items
                .into_iter()
                .filter_map(|item| match item.inner {
                    Inner::Known(value) => Some(value),
                    _ => None,
                })
                .collect();
            return Output::known(values);
        }

        trace!("Joining {} deferred values", items.len());
        Output::from_future(future::try_join_all(
            items.into_iter().map(Output::into_future),
        ))
    }

    fn into_future(self) -> BoxFuture<'static, OutputResult<T>> {
        match self.inner {
            Inner::Known(value) => future::ready(Ok(value)).boxed(),
            Inner::Failed(error) => future::ready(Err(error)).boxed(),
            Inner::Pending(fut) => fut.boxed(),
        }
    }
}

impl Output<String> {
    /// Concatenate deferred strings in order.
    pub fn concat(parts: Vec<Output<String>>) -> Output<String> {
        Output::all(parts).map(|parts| parts.concat())
    }

    /// Join deferred strings with a separator.
    pub fn join(parts: Vec<Output<String>>, separator: &'static str) -> Output<String> {
        Output::all(parts).map(move |parts| parts.join(separator))
    }
}

impl<T> fmt::Debug for Output<T>
where
    T: Clone + Send + Sync + fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Inner::Known(value) => f.debug_tuple("Output::Known").field(value).finish(),
            Inner::Pending(_) => f.write_str("Output::Pending"),
            Inner::Failed(error) => f.debug_tuple("Output::Failed").field(error).finish(),
        }
    }
}

impl From<&str> for Output<String> {
    fn from(value: &str) -> Self {
        Output::known(value.to_string())
    }
}

impl From<String> for Output<String> {
    fn from(value: String) -> Self {
        Output::known(value)
    }
}

impl From<&String> for Output<String> {
    fn from(value: &String) -> Self {
        Output::known(value.clone())
    }
}

impl<T> From<&Output<T>> for Output<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn from(value: &Output<T>) -> Self {
        value.clone()
    }
}

/// Concatenate parts into a single deferred string.
///
/// Each part may be anything convertible into `Output<String>`: string
/// literals, `String`, or another `Output<String>` (owned or borrowed).
///
/// ```
/// use azc_output::{interpolate, Output};
///
/// let host = Output::known("api.contoso.com".to_string());
/// let url = interpolate!("https://", &host, "/v1");
/// assert_eq!(url.peek().map(String::as_str), Some("https://api.contoso.com/v1"));
/// ```
#[macro_export]
macro_rules! interpolate {
    ($($part:expr),+ $(,)?) => {
        $crate::Output::<::std::string::String>::concat(::std::vec![
            $($crate::Output::<::std::string::String>::from($part)),+
        ])
    };
}
