use std::sync::Arc;

use chrono::Utc;
use pb_core::{Article, Error, HistoryRecord, HistoryStorage, PublishResult, PublishStatus, Result};
use pb_publishers::{summarize, PublishManager, PublishSummary};
use tracing::{error, info};

use crate::runner::AsyncRunner;

/// Validation and background dispatch for publish actions.
pub struct PublishController {
    manager: Arc<PublishManager>,
    history: Arc<dyn HistoryStorage>,
    runner: Arc<AsyncRunner>,
}

impl PublishController {
    pub fn new(
        manager: Arc<PublishManager>,
        history: Arc<dyn HistoryStorage>,
        runner: Arc<AsyncRunner>,
    ) -> Self {
        Self {
            manager,
            history,
            runner,
        }
    }

    /// Registered service names, sorted.
    pub fn available_services(&self) -> Vec<String> {
        self.manager.service_names()
    }

    /// Every problem with the request, in a fixed order. Empty means valid.
    pub fn validate_publish_request<S: AsRef<str>>(
        &self,
        article: &Article,
        service_names: &[S],
    ) -> Vec<String> {
        let mut errors = Vec::new();
        if article.title.trim().is_empty() {
            errors.push("Title is required.".to_string());
        }
        if article.body.trim().is_empty() {
            errors.push("Body is required.".to_string());
        }
        if service_names.is_empty() {
            errors.push("No destination service selected.".to_string());
        }
        for name in service_names {
            if !self.manager.is_registered(name.as_ref()) {
                errors.push(format!("Unregistered service: {}", name.as_ref()));
            }
        }
        errors
    }

    fn check<S: AsRef<str>>(&self, article: &Article, service_names: &[S]) -> Result<()> {
        let errors = self.validate_publish_request(article, service_names);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(errors.join("; ")))
        }
    }

    /// Validates synchronously, then publishes and records history on the
    /// background runner. A validation error is returned before anything is
    /// scheduled; afterwards the outcome arrives through exactly one of the
    /// callbacks.
    pub fn publish<S, F, E>(
        &self,
        article: &Article,
        service_names: &[S],
        status: PublishStatus,
        on_success: F,
        on_error: E,
    ) -> Result<()>
    where
        S: AsRef<str>,
        F: FnOnce(Vec<PublishResult>) + Send + 'static,
        E: FnOnce(Error) + Send + 'static,
    {
        self.check(article, service_names)?;

        let manager = self.manager.clone();
        let history = self.history.clone();
        let article = article.clone();
        let names: Vec<String> = service_names.iter().map(|s| s.as_ref().to_string()).collect();
        info!("Publishing \"{}\" to {}", article.title, names.join(", "));

        self.runner.run(
            async move { Ok(publish_and_record(&manager, history.as_ref(), &article, status, &names).await) },
            on_success,
            on_error,
        )
    }

    /// Publishes again to a subset of services, usually the failed ones.
    /// Services that already succeeded are not excluded; repeating them
    /// publishes twice.
    pub fn retry_publish<S, F, E>(
        &self,
        article: &Article,
        failed_service_names: &[S],
        status: PublishStatus,
        on_success: F,
        on_error: E,
    ) -> Result<()>
    where
        S: AsRef<str>,
        F: FnOnce(Vec<PublishResult>) + Send + 'static,
        E: FnOnce(Error) + Send + 'static,
    {
        self.publish(article, failed_service_names, status, on_success, on_error)
    }

    /// Awaitable variant of [`publish`](Self::publish) for callers that are
    /// already async. Runs on the caller's runtime.
    pub async fn publish_and_wait<S: AsRef<str>>(
        &self,
        article: &Article,
        service_names: &[S],
        status: PublishStatus,
    ) -> Result<Vec<PublishResult>> {
        self.check(article, service_names)?;
        let names: Vec<String> = service_names.iter().map(|s| s.as_ref().to_string()).collect();
        Ok(publish_and_record(&self.manager, self.history.as_ref(), article, status, &names).await)
    }

    pub fn summarize_results(results: &[PublishResult]) -> PublishSummary {
        summarize(results)
    }
}

async fn publish_and_record(
    manager: &PublishManager,
    history: &dyn HistoryStorage,
    article: &Article,
    status: PublishStatus,
    service_names: &[String],
) -> Vec<PublishResult> {
    let request = article.to_publish_request(status);
    let results = manager.publish(&request, service_names).await;
    record_history(history, article, &results).await;
    results
}

/// One history entry per result. A failed save is logged and skipped.
pub(crate) async fn record_history(
    history: &dyn HistoryStorage,
    article: &Article,
    results: &[PublishResult],
) {
    let now = Utc::now();
    for result in results {
        let record = HistoryRecord::from_result(article, result, now);
        if let Err(e) = history.save_history(&record).await {
            error!(
                "Failed to record history for {}: {}",
                result.service_name, e
            );
        }
    }
}
