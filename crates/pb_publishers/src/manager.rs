use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock};

use futures::future::join_all;
use futures::FutureExt;
use pb_core::{PublishRequest, PublishResult, Publisher};
use tracing::{error, info, warn};

type Registry = HashMap<String, Arc<dyn Publisher>>;

/// Fans one publish request out to registered publishers.
///
/// `publish` always returns one result per requested name, in request
/// order. Unknown names, `Err` returns and panics from a publisher all turn
/// into failed results for that target only.
#[derive(Default)]
pub struct PublishManager {
    publishers: RwLock<Registry>,
}

impl PublishManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a publisher under its own service name. A later
    /// registration with the same name replaces the earlier one.
    pub fn register(&self, publisher: Arc<dyn Publisher>) {
        let name = publisher.service_name().to_string();
        let replaced = self
            .publishers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.clone(), publisher)
            .is_some();
        if replaced {
            info!("Replaced publisher: {}", name);
        } else {
            info!("Registered publisher: {}", name);
        }
    }

    /// Snapshot of the registry. Later registrations are not reflected.
    pub fn list_registered(&self) -> Registry {
        self.publishers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Registered service names, sorted.
    pub fn service_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .publishers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn is_registered(&self, service_name: &str) -> bool {
        self.publishers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(service_name)
    }

    fn get(&self, service_name: &str) -> Option<Arc<dyn Publisher>> {
        self.publishers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(service_name)
            .cloned()
    }

    /// Publishes `request` to every named service concurrently.
    pub async fn publish<S: AsRef<str>>(
        &self,
        request: &PublishRequest,
        service_names: &[S],
    ) -> Vec<PublishResult> {
        let targets: Vec<(&str, Option<Arc<dyn Publisher>>)> = service_names
            .iter()
            .map(|name| (name.as_ref(), self.get(name.as_ref())))
            .collect();

        let futures = targets.into_iter().map(|(name, publisher)| async move {
            let result = match publisher {
                None => {
                    warn!("Skipping unregistered service: {}", name);
                    PublishResult::failure(name, format!("unregistered service: {}", name))
                }
                Some(publisher) => publish_isolated(name, publisher, request).await,
            };
            if result.success {
                info!(
                    "Published to {}: {}",
                    name,
                    result.article_url.as_deref().unwrap_or_default()
                );
            }
            result
        });

        join_all(futures).await
    }

    /// False when the service is not registered. Otherwise defers to the
    /// publisher's own check; a panicking check also counts as false.
    pub async fn test_connection(&self, service_name: &str) -> bool {
        let Some(publisher) = self.get(service_name) else {
            warn!("Connection test for unregistered service: {}", service_name);
            return false;
        };
        match AssertUnwindSafe(publisher.test_connection()).catch_unwind().await {
            Ok(connected) => connected,
            Err(panic) => {
                error!(
                    "Connection test for {} panicked: {}",
                    service_name,
                    panic_message(panic.as_ref())
                );
                false
            }
        }
    }
}

async fn publish_isolated(
    name: &str,
    publisher: Arc<dyn Publisher>,
    request: &PublishRequest,
) -> PublishResult {
    match AssertUnwindSafe(publisher.publish(request)).catch_unwind().await {
        Ok(Ok(result)) => {
            if !result.success {
                warn!(
                    "Publishing to {} failed: {}",
                    name,
                    result.error_message.as_deref().unwrap_or_default()
                );
            }
            result
        }
        Ok(Err(e)) => {
            error!("Publisher {} returned an error: {}", name, e);
            PublishResult::failure(name, e.to_string())
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!("Publisher {} panicked: {}", name, message);
            PublishResult::failure(name, message)
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "publisher panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pb_core::{Error, PublishStatus, Result};

    enum Behavior {
        Succeed(&'static str),
        Fail(&'static str),
        Raise(&'static str),
        Panic,
    }

    struct MockPublisher {
        name: &'static str,
        behavior: Behavior,
    }

    impl MockPublisher {
        fn new(name: &'static str, behavior: Behavior) -> Arc<Self> {
            Arc::new(Self { name, behavior })
        }
    }

    #[async_trait]
    impl Publisher for MockPublisher {
        fn service_name(&self) -> &str {
            self.name
        }

        async fn publish(&self, _request: &PublishRequest) -> Result<PublishResult> {
            match self.behavior {
                Behavior::Succeed(url) => Ok(PublishResult::success(self.name, url)),
                Behavior::Fail(msg) => Ok(PublishResult::failure(self.name, msg)),
                Behavior::Raise(msg) => Err(Error::Network(msg.to_string())),
                Behavior::Panic => panic!("boom"),
            }
        }

        async fn test_connection(&self) -> bool {
            match self.behavior {
                Behavior::Panic => panic!("check boom"),
                Behavior::Succeed(_) => true,
                _ => false,
            }
        }
    }

    fn request() -> PublishRequest {
        PublishRequest {
            title: "Rust入門".to_string(),
            body: "本文".to_string(),
            tags: vec!["rust".to_string()],
            status: PublishStatus::Publish,
            blog_type_id: "tech".to_string(),
        }
    }

    #[tokio::test]
    async fn test_results_follow_request_order() {
        let manager = PublishManager::new();
        manager.register(MockPublisher::new("a", Behavior::Raise("connection reset")));
        manager.register(MockPublisher::new("c", Behavior::Succeed("https://c.example/1")));

        let results = manager.publish(&request(), &["a", "b", "c"]).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].service_name, "a");
        assert!(!results[0].success);
        assert!(results[0]
            .error_message
            .as_deref()
            .unwrap()
            .contains("connection reset"));
        assert_eq!(results[1].service_name, "b");
        assert!(!results[1].success);
        assert!(results[1].error_message.as_deref().unwrap().contains("unregistered"));
        assert!(results[2].success);
        assert_eq!(results[2].article_url.as_deref(), Some("https://c.example/1"));
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_successes() {
        let manager = PublishManager::new();
        manager.register(MockPublisher::new("qiita", Behavior::Succeed("https://qiita.com/items/1")));
        manager.register(MockPublisher::new("zenn", Behavior::Raise("ConnectionError: refused")));

        let results = manager.publish(&request(), &["qiita", "zenn"]).await;

        assert_eq!(results.len(), 2);
        assert!(results[0].success);
        assert!(results[0].article_url.is_some());
        assert!(!results[1].success);
        assert!(results[1]
            .error_message
            .as_deref()
            .unwrap()
            .contains("ConnectionError: refused"));
    }

    #[tokio::test]
    async fn test_panicking_publisher_is_isolated() {
        let manager = PublishManager::new();
        manager.register(MockPublisher::new("bad", Behavior::Panic));
        manager.register(MockPublisher::new("good", Behavior::Succeed("https://good/1")));

        let results = manager.publish(&request(), &["bad", "good"]).await;

        assert_eq!(results[0].error_message.as_deref(), Some("boom"));
        assert!(results[1].success);
    }

    #[tokio::test]
    async fn test_failed_result_is_passed_through() {
        let manager = PublishManager::new();
        manager.register(MockPublisher::new("wp", Behavior::Fail("401 Unauthorized")));

        let results = manager.publish(&request(), &["wp"]).await;

        assert_eq!(results[0], PublishResult::failure("wp", "401 Unauthorized"));
    }

    #[tokio::test]
    async fn test_duplicate_names_yield_one_result_each() {
        let manager = PublishManager::new();
        manager.register(MockPublisher::new("qiita", Behavior::Succeed("https://q/1")));

        let results = manager.publish(&request(), &["qiita", "qiita"]).await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.success));
    }

    #[tokio::test]
    async fn test_empty_target_list() {
        let manager = PublishManager::new();
        let names: [&str; 0] = [];
        assert!(manager.publish(&request(), &names).await.is_empty());
    }

    #[tokio::test]
    async fn test_later_registration_wins() {
        let manager = PublishManager::new();
        manager.register(MockPublisher::new("qiita", Behavior::Fail("old")));
        manager.register(MockPublisher::new("qiita", Behavior::Succeed("https://new/1")));

        let results = manager.publish(&request(), &["qiita"]).await;

        assert!(results[0].success);
        assert_eq!(manager.service_names(), vec!["qiita".to_string()]);
    }

    #[tokio::test]
    async fn test_list_registered_is_a_snapshot() {
        let manager = PublishManager::new();
        manager.register(MockPublisher::new("qiita", Behavior::Succeed("u")));
        let snapshot = manager.list_registered();
        manager.register(MockPublisher::new("zenn", Behavior::Succeed("u")));

        assert_eq!(snapshot.len(), 1);
        assert!(manager.is_registered("zenn"));
    }

    #[tokio::test]
    async fn test_connection_check() {
        let manager = PublishManager::new();
        manager.register(MockPublisher::new("up", Behavior::Succeed("u")));
        manager.register(MockPublisher::new("down", Behavior::Raise("x")));
        manager.register(MockPublisher::new("crash", Behavior::Panic));

        assert!(manager.test_connection("up").await);
        assert!(!manager.test_connection("down").await);
        assert!(!manager.test_connection("crash").await);
        assert!(!manager.test_connection("missing").await);
    }
}
