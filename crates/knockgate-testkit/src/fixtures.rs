//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

use knockgate::transport::{ChatMessage, ChatTransport, Result as TransportResult, Update};
use knockgate_core::{ChannelId, Config, UserId};
use knockgate_knockd::{ServiceAction, ServiceRunner};

/// A configuration suitable for tests: every path points into `dir`, the
/// fixed open sequence is enabled so applied sequences are predictable,
/// and the rotation interval is short.
pub fn test_config(dir: &Path) -> Config {
    Config {
        admin_users: vec!["100".to_string()],
        use_open_sequence: true,
        open_sequence: vec![7000, 8000, 9000],
        knockd_config_path: dir.join("knockd.conf"),
        knockd_log_path: dir.join("knockd.log"),
        database_path: dir.join("knockgate.db"),
        rotation_interval_secs: 60,
        max_message_age_secs: 300,
        ..Config::default()
    }
}

/// Build a well-formed command update stamped with the current time.
pub fn command_update(update_id: i64, channel: &str, sender: &str, text: &str) -> Update {
    Update {
        update_id,
        message: Some(ChatMessage {
            channel: ChannelId::from(channel),
            sender: UserId::from(sender),
            message_id: update_id * 10,
            timestamp: unix_now(),
            text: Some(text.to_string()),
        }),
    }
}

/// One message recorded by [`FakeTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub channel: ChannelId,
    pub text: String,
    pub reply_to: Option<i64>,
}

/// Scripted transport: polls pop pre-loaded batches, sends are recorded.
pub struct FakeTransport {
    batches: Mutex<VecDeque<Vec<Update>>>,
    sent: Mutex<Vec<SentMessage>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            batches: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Queue a batch for a future poll.
    pub fn push_batch(&self, updates: Vec<Update>) {
        self.batches.lock().unwrap().push_back(updates);
    }

    /// Everything sent so far.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }
}

impl Default for FakeTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatTransport for FakeTransport {
    async fn poll_updates(&self, _offset: i64, _timeout: Duration) -> TransportResult<Vec<Update>> {
        if let Some(batch) = self.batches.lock().unwrap().pop_front() {
            return Ok(batch);
        }
        // Behave like an expiring long poll rather than a hot loop.
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(Vec::new())
    }

    async fn send_message(
        &self,
        channel: &ChannelId,
        text: &str,
        reply_to: Option<i64>,
    ) -> TransportResult<()> {
        self.sent.lock().unwrap().push(SentMessage {
            channel: channel.clone(),
            text: text.to_string(),
            reply_to,
        });
        Ok(())
    }
}

/// Service runner that records every action and can fail one of them with
/// a fixed exit code.
///
/// Clones share state, so a test can hand one clone to the controller and
/// keep another to inspect the recorded calls.
#[derive(Clone)]
pub struct FakeRunner {
    inner: Arc<FakeRunnerInner>,
}

struct FakeRunnerInner {
    calls: Mutex<Vec<(ServiceAction, String)>>,
    fail: Mutex<Option<(ServiceAction, i32)>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(FakeRunnerInner {
                calls: Mutex::new(Vec::new()),
                fail: Mutex::new(None),
            }),
        }
    }

    /// Make the given action fail with `code` until cleared.
    pub fn fail_with(&self, action: ServiceAction, code: i32) {
        *self.inner.fail.lock().unwrap() = Some((action, code));
    }

    /// Actions invoked so far, with their unit names.
    pub fn calls(&self) -> Vec<(ServiceAction, String)> {
        self.inner.calls.lock().unwrap().clone()
    }
}

impl Default for FakeRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServiceRunner for FakeRunner {
    async fn run(&self, action: ServiceAction, unit: &str) -> std::io::Result<i32> {
        self.inner
            .calls
            .lock()
            .unwrap()
            .push((action, unit.to_string()));
        match *self.inner.fail.lock().unwrap() {
            Some((failing, code)) if failing == action => Ok(code),
            _ => Ok(0),
        }
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
