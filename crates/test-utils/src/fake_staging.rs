//! Counting interconnect: hands out predictable URLs and remembers the
//! tokens so tests can assert endpoint teardown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio_util::sync::CancellationToken;

use planwatch::scheduler::Interconnect;

#[derive(Default)]
pub struct FakeInterconnect {
    next: AtomicU64,
    tokens: Mutex<Vec<CancellationToken>>,
}

impl FakeInterconnect {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokens passed to `init_interconnect`, in allocation order.
    pub fn tokens(&self) -> Vec<CancellationToken> {
        self.tokens.lock().unwrap().clone()
    }

    pub fn allocated(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }
}

impl Interconnect for FakeInterconnect {
    fn init_interconnect(&self, token: &CancellationToken) -> String {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        self.tokens.lock().unwrap().push(token.clone());
        format!("http://staging.test/v1/transfer/{n}")
    }
}
