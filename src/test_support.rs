//! Scripted remote client for unit tests

use crate::config::{AdvisorConfig, QueryOptions};
use crate::engine::{FetchHint, QueryResultsSource, RemoteQueryClient};
use crate::error::{Error, Result};
use crate::index::IndexUsageRecorder;
use crate::page::{Page, PendingPage};
use crate::telemetry::ChunkSizeAdvisor;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub(crate) type TestPage = Page<String, String>;

/// One `fetch_next` call as the client saw it
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FetchCall {
    pub after: Option<String>,
    pub hint: FetchHint,
    pub prototype: String,
}

#[derive(Default)]
struct Script {
    pages: VecDeque<Result<TestPage>>,
    calls: Vec<FetchCall>,
    prototypes_built: usize,
}

/// Client that answers continuations from a queue of canned pages
#[derive(Clone, Default)]
pub(crate) struct ScriptedClient {
    script: Arc<Mutex<Script>>,
}

impl ScriptedClient {
    pub fn new(pages: impl IntoIterator<Item = TestPage>) -> Self {
        let client = Self::default();
        for page in pages {
            client.push(Ok(page));
        }
        client
    }

    pub fn push(&self, page: Result<TestPage>) {
        self.script.lock().unwrap().pages.push_back(page);
    }

    pub fn calls(&self) -> Vec<FetchCall> {
        self.script.lock().unwrap().calls.clone()
    }

    pub fn prototypes_built(&self) -> usize {
        self.script.lock().unwrap().prototypes_built
    }
}

impl RemoteQueryClient for ScriptedClient {
    type Seed = TestPage;
    type Continuation = TestPage;
    type Prototype = String;
    type Page = TestPage;

    fn wrap_initial(&self, seed: TestPage) -> TestPage {
        seed
    }

    fn wrap_continuation(&self, raw: TestPage) -> TestPage {
        raw
    }

    fn build_continuation_prototype(&self, _seed: &TestPage, options: &QueryOptions) -> String {
        self.script.lock().unwrap().prototypes_built += 1;
        format!("compiled={}", options.require_compiled_query)
    }

    fn fetch_next(
        &self,
        prototype: &String,
        last: &TestPage,
        hint: FetchHint,
    ) -> PendingPage<TestPage> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(FetchCall {
            after: last.end_cursor.clone(),
            hint,
            prototype: prototype.clone(),
        });
        let next = script
            .pages
            .pop_front()
            .unwrap_or_else(|| Err(Error::backend("script exhausted")));
        PendingPage::ready(next)
    }
}

/// Page of `names`, each with cursor `c-<name>`
pub(crate) fn page(names: &[&str], end: &str, more: bool) -> TestPage {
    Page::new()
        .with_results(
            names
                .iter()
                .map(|name| (name.to_string(), format!("c-{name}"))),
        )
        .with_end_cursor(end.to_string())
        .with_more(more)
}

/// Page that only skips records
pub(crate) fn skip_page(skipped: usize, skip_cursor: &str, end: &str) -> TestPage {
    Page::new()
        .with_skipped(skipped, Some(skip_cursor.to_string()))
        .with_end_cursor(end.to_string())
        .with_more(true)
}

/// Engine over `client` with private recorder and advisor
pub(crate) fn source(
    client: &ScriptedClient,
    options: QueryOptions,
    initial: TestPage,
) -> QueryResultsSource<ScriptedClient> {
    source_with(client, options, PendingPage::ready(Ok(initial)))
}

pub(crate) fn source_with(
    client: &ScriptedClient,
    options: QueryOptions,
    initial: PendingPage<TestPage>,
) -> QueryResultsSource<ScriptedClient> {
    QueryResultsSource::new(client.clone(), options, initial)
        .with_index_usage_sink(Arc::new(IndexUsageRecorder::new()))
        .with_chunk_size_advisor(Arc::new(ChunkSizeAdvisor::new(
            AdvisorConfig::default().disabled(),
        )))
}
