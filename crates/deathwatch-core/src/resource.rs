//! Closeable resources and their diagnostic labels.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::BoxError;

/// Human-readable identity of a resource, used only in diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ResourceLabel {
    /// Short name, usually the type name.
    pub name: String,
    /// Where the resource comes from, usually the module path.
    pub origin: String,
}

impl ResourceLabel {
    pub fn new(name: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: origin.into(),
        }
    }

    /// Derive a label from a type path such as `my_app::db::Pool<Conn>`.
    ///
    /// The last `::` segment outside generic brackets becomes the name and
    /// everything before it the origin.
    pub fn from_type_name(type_name: &str) -> Self {
        let generics_start = type_name.find('<').unwrap_or(type_name.len());
        let (path, generics) = type_name.split_at(generics_start);
        match path.rfind("::") {
            Some(split) => Self::new(format!("{}{}", &path[split + 2..], generics), &path[..split]),
            None => Self::new(type_name, ""),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.origin.is_empty()
    }
}

impl fmt::Display for ResourceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.origin.is_empty(), self.name.is_empty()) {
            (true, true) => f.write_str("<unnamed>"),
            (true, false) => f.write_str(&self.name),
            (false, _) => write!(f, "{}/{}", self.origin, self.name),
        }
    }
}

/// Something that must be released before the process exits.
///
/// Release failures are logged by the coordinator but never abort the batch.
/// Only failing to return before the deadline counts as an error.
#[async_trait]
pub trait Closeable: Send + Sync {
    /// Release the resource.
    async fn close(&self) -> Result<(), BoxError>;

    /// Describe the resource for log lines and timeout reports.
    ///
    /// Defaults to the implementing type's path.
    fn describe(&self) -> ResourceLabel {
        ResourceLabel::from_type_name(std::any::type_name::<Self>())
    }
}

/// Shared, dynamically dispatched resource.
pub type CloseableRef = Arc<dyn Closeable>;

#[async_trait]
impl<T: Closeable + ?Sized> Closeable for Arc<T> {
    async fn close(&self) -> Result<(), BoxError> {
        (**self).close().await
    }

    fn describe(&self) -> ResourceLabel {
        (**self).describe()
    }
}

/// Cancelling a token is how long-running tasks are told to stop; it never fails.
#[async_trait]
impl Closeable for CancellationToken {
    async fn close(&self) -> Result<(), BoxError> {
        self.cancel();
        Ok(())
    }
}

type CloseFuture = Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send>>;

/// A resource backed by a closure.
///
/// Built with [`closer_fn`].
pub struct FnCloser {
    label: ResourceLabel,
    close: Box<dyn Fn() -> CloseFuture + Send + Sync>,
}

/// Wrap an async closure as a [`Closeable`] with an explicit label.
///
/// The closure is invoked once per release attempt.
pub fn closer_fn<F, Fut>(label: ResourceLabel, close: F) -> FnCloser
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    FnCloser {
        label,
        close: Box::new(move || -> CloseFuture { Box::pin(close()) }),
    }
}

#[async_trait]
impl Closeable for FnCloser {
    async fn close(&self) -> Result<(), BoxError> {
        (self.close)().await
    }

    fn describe(&self) -> ResourceLabel {
        self.label.clone()
    }
}

impl fmt::Debug for FnCloser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCloser")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}
