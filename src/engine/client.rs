//! Remote query client boundary

use super::types::FetchHint;
use crate::config::QueryOptions;
use crate::page::{PageAdapter, PendingPage};

/// What the pagination engine needs from the service it pages through
///
/// The client owns execution: [`RemoteQueryClient::fetch_next`] decides
/// whether a request starts immediately (spawned) or when awaited.
pub trait RemoteQueryClient: Send + Sync {
    /// Raw result of the initial query
    type Seed: Send + 'static;
    /// Raw result of a continuation call
    type Continuation: Send + 'static;
    /// Template for continuation calls, built once from the seed
    type Prototype: Send + Sync;
    /// Page view produced from both seeds and continuations
    type Page: PageAdapter;

    /// View the initial result as a page
    fn wrap_initial(&self, seed: Self::Seed) -> Self::Page;

    /// View a continuation result as a page
    fn wrap_continuation(&self, raw: Self::Continuation) -> Self::Page;

    /// Build the continuation template from the initial result
    fn build_continuation_prototype(
        &self,
        seed: &Self::Seed,
        options: &QueryOptions,
    ) -> Self::Prototype;

    /// Request the page following `last`
    fn fetch_next(
        &self,
        prototype: &Self::Prototype,
        last: &Self::Page,
        hint: FetchHint,
    ) -> PendingPage<Self::Continuation>;
}
