// Scripted publishers shared by the integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pb_core::{Error, PublishRequest, PublishResult, Publisher, Result};

pub enum Script {
    Succeed(&'static str),
    Fail(&'static str),
    Panic,
    /// Fails on the first call, succeeds afterwards.
    FailOnce(&'static str),
}

pub struct ScriptedPublisher {
    name: &'static str,
    script: Script,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedPublisher {
    pub fn new(name: &'static str, script: Script) -> Arc<Self> {
        Self::delayed(name, script, Duration::ZERO)
    }

    pub fn delayed(name: &'static str, script: Script, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            name,
            script,
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Publisher for ScriptedPublisher {
    fn service_name(&self) -> &str {
        self.name
    }

    async fn publish(&self, request: &PublishRequest) -> Result<PublishResult> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.script {
            Script::Succeed(url) => Ok(PublishResult::success(self.name, format!("{}#{}", url, request.status.as_str()))),
            Script::Fail(message) => Ok(PublishResult::failure(self.name, *message)),
            Script::Panic => panic!("{} exploded", self.name),
            Script::FailOnce(url) if call > 0 => Ok(PublishResult::success(self.name, *url)),
            Script::FailOnce(_) => Err(Error::Network("connection reset".to_string())),
        }
    }

    async fn test_connection(&self) -> bool {
        !matches!(self.script, Script::Fail(_) | Script::Panic)
    }
}
