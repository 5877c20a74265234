use std::future::Future;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};
use serde::{Deserialize, Serialize};

use crate::core::{AxisPatch, Domain, ItemId};
use crate::error::LoaderError;

/// Why a loader was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchReason {
    /// First load for an item.
    Mounted,
    /// The time subdomain moved since the last fetch started.
    SubdomainChanged,
    /// Explicit reload requested by the host.
    Reload,
}

/// Data and optional domain overrides produced by a loader.
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderResult<D> {
    pub data: Vec<D>,
    pub domains: AxisPatch,
}

impl<D> Default for LoaderResult<D> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            domains: AxisPatch::default(),
        }
    }
}

impl<D> LoaderResult<D> {
    #[must_use]
    pub fn new(data: Vec<D>) -> Self {
        Self {
            data,
            domains: AxisPatch::default(),
        }
    }

    #[must_use]
    pub fn with_domains(mut self, domains: AxisPatch) -> Self {
        self.domains = domains;
        self
    }
}

/// Arguments handed to a loader.
#[derive(Debug, Clone)]
pub struct LoaderRequest<D> {
    pub id: ItemId,
    pub time_domain: Domain,
    pub time_subdomain: Domain,
    pub points_per_series: usize,
    /// Previous result for this item, or an empty one.
    pub old_series: Rc<LoaderResult<D>>,
    pub reason: FetchReason,
}

pub type LoaderFuture<D> = LocalBoxFuture<'static, Result<LoaderResult<D>, LoaderError>>;

/// Produces data for an item's current window.
///
/// Must tolerate repeated calls with identical arguments. Failures are not
/// retried; they surface from [`crate::api::ChartEngine::tick`].
pub trait Loader<D> {
    fn load(&self, request: LoaderRequest<D>) -> LoaderFuture<D>;
}

impl<D, F, Fut> Loader<D> for F
where
    F: Fn(LoaderRequest<D>) -> Fut,
    Fut: Future<Output = Result<LoaderResult<D>, LoaderError>> + 'static,
{
    fn load(&self, request: LoaderRequest<D>) -> LoaderFuture<D> {
        self(request).boxed_local()
    }
}
