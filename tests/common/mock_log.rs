//! Mock HistoryLog for testing.
//!
//! Serves events per branch token in pages of the requested size. Records
//! every request for assertions. Can be told to fail a specific call.

use history_conflict_resolver::event::HistoryEvent;
use history_conflict_resolver::persistence::{
    HistoryLog, LogFuture, LogReadError, ReadHistoryBranchRequest, ReadHistoryBranchResponse,
};
use history_conflict_resolver::state::EMPTY_EVENT_ID;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// How the mock reports page sizes.
#[derive(Debug, Clone, Copy)]
pub enum PageBytes {
    /// Each event counts this many bytes.
    PerEvent(i64),
    /// Every page reports this size regardless of content.
    PerPage(i64),
}

/// Mock implementation of HistoryLog that records all reads.
///
/// # Example
/// ```rust,ignore
/// let log = MockHistoryLog::new().with_branch(b"branch", events);
///
/// // Use in tests...
///
/// let requests = log.requests().await;
/// assert_eq!(requests[0].max_event_id, 2);
/// ```
pub struct MockHistoryLog {
    branches: HashMap<Vec<u8>, Vec<HistoryEvent>>,
    page_bytes: PageBytes,
    /// Fail the call with this index (0-based).
    fail_on_call: Option<(usize, LogReadError)>,
    /// When false, pages run past `max_event_id` to the end of the branch.
    honor_max_event_id: bool,
    calls: AtomicUsize,
    requests: RwLock<Vec<ReadHistoryBranchRequest>>,
}

impl MockHistoryLog {
    pub fn new() -> Self {
        Self {
            branches: HashMap::new(),
            page_bytes: PageBytes::PerEvent(100),
            fail_on_call: None,
            honor_max_event_id: true,
            calls: AtomicUsize::new(0),
            requests: RwLock::new(Vec::new()),
        }
    }

    pub fn with_branch(mut self, branch_token: &[u8], events: Vec<HistoryEvent>) -> Self {
        self.branches.insert(branch_token.to_vec(), events);
        self
    }

    pub fn with_page_bytes(mut self, page_bytes: PageBytes) -> Self {
        self.page_bytes = page_bytes;
        self
    }

    pub fn failing_on_call(mut self, call: usize, error: LogReadError) -> Self {
        self.fail_on_call = Some((call, error));
        self
    }

    /// Serve everything from `min_event_id` on, like a reader that only
    /// trims whole batches.
    pub fn ignoring_max_event_id(mut self) -> Self {
        self.honor_max_event_id = false;
        self
    }

    /// Number of read calls so far.
    pub fn read_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// All recorded requests, in call order.
    pub async fn requests(&self) -> Vec<ReadHistoryBranchRequest> {
        self.requests.read().await.clone()
    }
}

impl Default for MockHistoryLog {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryLog for MockHistoryLog {
    fn read_history_branch(
        &self,
        request: ReadHistoryBranchRequest,
    ) -> LogFuture<'_, ReadHistoryBranchResponse> {
        Box::pin(async move {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.write().await.push(request.clone());

            if let Some((fail_call, error)) = &self.fail_on_call {
                if *fail_call == call {
                    return Err(error.clone());
                }
            }

            let events = self
                .branches
                .get(&request.branch_token)
                .ok_or_else(|| {
                    let token = String::from_utf8_lossy(&request.branch_token);
                    LogReadError::NotFound(token.into_owned())
                })?;

            let offset = match &request.next_page_token {
                Some(token) => String::from_utf8_lossy(token)
                    .parse::<usize>()
                    .map_err(|e| LogReadError::InvalidPageToken(e.to_string()))?,
                None => 0,
            };

            let in_range: Vec<&HistoryEvent> = events
                .iter()
                .filter(|e| e.event_id >= request.min_event_id)
                .filter(|e| !self.honor_max_event_id || e.event_id < request.max_event_id)
                .collect();
            let start = offset.min(in_range.len());
            let end = (start + request.page_size.max(1)).min(in_range.len());
            let page: Vec<HistoryEvent> =
                in_range[start..end].iter().map(|e| (*e).clone()).collect();

            let size = match self.page_bytes {
                PageBytes::PerEvent(bytes) => page.len() as i64 * bytes,
                PageBytes::PerPage(bytes) => bytes,
            };
            let next_page_token = (end < in_range.len()).then(|| end.to_string().into_bytes());

            Ok(ReadHistoryBranchResponse {
                last_first_event_id: page.first().map(|e| e.event_id).unwrap_or(EMPTY_EVENT_ID),
                size,
                history_events: page,
                next_page_token,
            })
        })
    }
}
