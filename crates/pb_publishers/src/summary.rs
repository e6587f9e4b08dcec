use pb_core::PublishResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishSuccess {
    pub service_name: String,
    pub article_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishFailure {
    pub service_name: String,
    pub error_message: String,
}

/// Aggregate view of one publish run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishSummary {
    pub total: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub successes: Vec<PublishSuccess>,
    pub failures: Vec<PublishFailure>,
}

impl PublishSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failure_count == 0
    }

    /// True only when there was at least one target and none succeeded.
    pub fn all_failed(&self) -> bool {
        self.total > 0 && self.success_count == 0
    }

    /// Names of the failed services, for a retry of just that subset.
    pub fn failed_services(&self) -> Vec<String> {
        self.failures.iter().map(|f| f.service_name.clone()).collect()
    }
}

pub fn summarize(results: &[PublishResult]) -> PublishSummary {
    let (ok, failed): (Vec<&PublishResult>, Vec<&PublishResult>) =
        results.iter().partition(|r| r.success);

    PublishSummary {
        total: results.len(),
        success_count: ok.len(),
        failure_count: failed.len(),
        successes: ok
            .into_iter()
            .map(|r| PublishSuccess {
                service_name: r.service_name.clone(),
                article_url: r.article_url.clone().unwrap_or_default(),
            })
            .collect(),
        failures: failed
            .into_iter()
            .map(|r| PublishFailure {
                service_name: r.service_name.clone(),
                error_message: r.error_message.clone().unwrap_or_default(),
            })
            .collect(),
    }
}
