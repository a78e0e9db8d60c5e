//! Write-time content filtering for comment submissions.
//!
//! Two stages: a local case-insensitive banned-term match that rejects the
//! submission outright, then an optional remote moderation classifier. The
//! remote call is a single best-effort attempt; any failure falls open to
//! "needs human review" rather than rejecting or auto-approving.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ModerationConfig;

/// Outcome of filtering one submission. Transient, never persisted as-is;
/// the submission handler folds it into the stored flags.
#[derive(Debug, Clone)]
pub struct ModerationVerdict {
    pub rejected: bool,
    pub flagged: bool,
    pub should_auto_approve: bool,
    /// Matched term or violated category labels, for operator-facing logs.
    pub reasons: Vec<String>,
}

impl ModerationVerdict {
    fn rejected(reason: String) -> Self {
        Self {
            rejected: true,
            flagged: false,
            should_auto_approve: false,
            reasons: vec![reason],
        }
    }

    fn manual_review() -> Self {
        Self {
            rejected: false,
            flagged: false,
            should_auto_approve: false,
            reasons: Vec::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classifier request failed: {0}")]
    Request(String),
    #[error("classifier response malformed")]
    Malformed,
}

/// Remote moderation classifier: takes the submitted text, returns the
/// violated category labels (possibly empty).
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, content: &str) -> Result<Vec<String>, ClassifierError>;
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    input: &'a str,
}

#[derive(Deserialize)]
struct ClassifyResponse {
    #[serde(default)]
    categories: Vec<String>,
}

/// HTTP-backed classifier. One attempt, bounded by the request timeout; no
/// retries.
pub struct RemoteClassifier {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl RemoteClassifier {
    pub fn new(url: String, api_key: Option<String>, timeout_secs: u64) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|e| panic!("http client init failed: {}", e));
        Self { http, url, api_key }
    }
}

#[async_trait]
impl Classifier for RemoteClassifier {
    async fn classify(&self, content: &str) -> Result<Vec<String>, ClassifierError> {
        let mut req = self.http.post(&self.url).json(&ClassifyRequest { input: content });
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| ClassifierError::Request(e.to_string()))?;
        let body: ClassifyResponse = resp.json().await.map_err(|_| ClassifierError::Malformed)?;
        Ok(body.categories)
    }
}

pub struct ContentFilter {
    /// Lowercased at construction; matching is substring, case-insensitive.
    banned_terms: Vec<String>,
    classifier: Option<Arc<dyn Classifier>>,
}

impl ContentFilter {
    pub fn new(banned_terms: Vec<String>, classifier: Option<Arc<dyn Classifier>>) -> Self {
        Self {
            banned_terms: banned_terms.iter().map(|t| t.to_lowercase()).collect(),
            classifier,
        }
    }

    pub fn from_config(cfg: &ModerationConfig) -> Self {
        let classifier: Option<Arc<dyn Classifier>> = cfg.classifier_url.clone().map(|url| {
            Arc::new(RemoteClassifier::new(
                url,
                cfg.classifier_api_key.clone(),
                cfg.classifier_timeout_secs,
            )) as Arc<dyn Classifier>
        });
        Self::new(cfg.banned_terms.clone(), classifier)
    }

    pub async fn evaluate(&self, content: &str) -> ModerationVerdict {
        if let Some(term) = self.banned_match(content) {
            return ModerationVerdict::rejected(format!("banned term: {}", term));
        }

        let classifier = match &self.classifier {
            Some(c) => c,
            None => return ModerationVerdict::manual_review(),
        };

        match classifier.classify(content).await {
            Ok(categories) => verdict_from_categories(categories),
            Err(e) => {
                log::warn!("moderation classifier unavailable, queueing for manual review: {}", e);
                ModerationVerdict::manual_review()
            }
        }
    }

    fn banned_match(&self, content: &str) -> Option<&str> {
        let lower = content.to_lowercase();
        self.banned_terms
            .iter()
            .find(|term| lower.contains(term.as_str()))
            .map(String::as_str)
    }
}

fn verdict_from_categories(categories: Vec<String>) -> ModerationVerdict {
    if categories.is_empty() {
        ModerationVerdict {
            rejected: false,
            flagged: false,
            should_auto_approve: true,
            reasons: Vec::new(),
        }
    } else {
        ModerationVerdict {
            rejected: false,
            flagged: true,
            should_auto_approve: false,
            reasons: categories,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedClassifier(Vec<String>);

    #[async_trait]
    impl Classifier for FixedClassifier {
        async fn classify(&self, _content: &str) -> Result<Vec<String>, ClassifierError> {
            Ok(self.0.clone())
        }
    }

    struct DownClassifier;

    #[async_trait]
    impl Classifier for DownClassifier {
        async fn classify(&self, _content: &str) -> Result<Vec<String>, ClassifierError> {
            Err(ClassifierError::Request("connection refused".to_string()))
        }
    }

    #[actix_rt::test]
    async fn banned_term_rejects_without_remote_call() {
        // a rejecting filter with a classifier that would approve proves the
        // local match short-circuits
        let filter = ContentFilter::new(
            vec!["Casino".to_string()],
            Some(Arc::new(FixedClassifier(Vec::new()))),
        );
        let verdict = filter.evaluate("visit my CASINO today").await;
        assert!(verdict.rejected);
        assert!(!verdict.should_auto_approve);
        assert_eq!(verdict.reasons, vec!["banned term: casino"]);
    }

    #[actix_rt::test]
    async fn clean_content_with_clean_classifier_auto_approves() {
        let filter = ContentFilter::new(
            vec!["casino".to_string()],
            Some(Arc::new(FixedClassifier(Vec::new()))),
        );
        let verdict = filter.evaluate("great write-up, thanks").await;
        assert!(!verdict.rejected);
        assert!(!verdict.flagged);
        assert!(verdict.should_auto_approve);
    }

    #[actix_rt::test]
    async fn violated_categories_flag_for_review() {
        let filter = ContentFilter::new(
            Vec::new(),
            Some(Arc::new(FixedClassifier(vec!["harassment".to_string()]))),
        );
        let verdict = filter.evaluate("borderline text").await;
        assert!(!verdict.rejected);
        assert!(verdict.flagged);
        assert!(!verdict.should_auto_approve);
        assert_eq!(verdict.reasons, vec!["harassment"]);
    }

    #[actix_rt::test]
    async fn classifier_failure_fails_open_to_manual_review() {
        let filter = ContentFilter::new(Vec::new(), Some(Arc::new(DownClassifier)));
        let verdict = filter.evaluate("anything").await;
        assert!(!verdict.rejected);
        assert!(!verdict.flagged);
        assert!(!verdict.should_auto_approve);
    }

    #[actix_rt::test]
    async fn no_classifier_means_manual_review() {
        let filter = ContentFilter::new(Vec::new(), None);
        let verdict = filter.evaluate("anything").await;
        assert!(!verdict.rejected);
        assert!(!verdict.flagged);
        assert!(!verdict.should_auto_approve);
    }

    #[test]
    fn verdict_combination() {
        assert!(verdict_from_categories(Vec::new()).should_auto_approve);
        let flagged = verdict_from_categories(vec!["hate".to_string(), "spam".to_string()]);
        assert!(flagged.flagged);
        assert!(!flagged.should_auto_approve);
        assert_eq!(flagged.reasons.len(), 2);
    }
}
