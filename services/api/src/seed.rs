use crate::infra::{CatalogQuestion, InMemoryAssessmentRepository, StoreState, StoredResponse};
use chrono::{Duration, Utc};
use readiness::scoring::{
    CoverageLevel, Dimension, ScoreSnapshot, SessionId, SessionRecord, SessionStatus,
};
use std::collections::HashMap;

pub(crate) const DEMO_QUESTIONNAIRE: &str = "qn-technical-readiness";
pub(crate) const DEMO_SESSION: &str = "demo-cto";

const DIMENSIONS: [(&str, &str, f64); 11] = [
    ("arch_sec", "Architecture & Security", 0.15),
    ("devops_iac", "DevOps & Infrastructure as Code", 0.12),
    ("quality_test", "Quality & Testing", 0.10),
    ("finance", "Finance & Cost Management", 0.10),
    ("strategy", "Strategy & Vision", 0.08),
    ("requirements", "Requirements & Specifications", 0.08),
    ("data_ai", "Data & AI", 0.08),
    ("privacy_legal", "Privacy & Legal", 0.08),
    ("service_ops", "Service Operations", 0.08),
    ("compliance_policy", "Compliance & Policy", 0.07),
    ("people_change", "People & Change Management", 0.06),
];

const QUESTIONS: [(&str, &str, &str, f64); 20] = [
    ("q-arch-001", "arch_sec", "Does your system architecture implement defense-in-depth security controls?", 0.95),
    ("q-arch-002", "arch_sec", "Is all data encrypted at rest and in transit?", 0.90),
    ("q-arch-003", "arch_sec", "Do you have a documented threat model for your application?", 0.85),
    ("q-arch-005", "arch_sec", "Do you use parameterized queries for all database operations?", 0.92),
    ("q-devops-001", "devops_iac", "Do you have automated CI/CD pipelines for all environments?", 0.85),
    ("q-devops-002", "devops_iac", "Is your infrastructure defined as code (IaC)?", 0.80),
    ("q-devops-005", "devops_iac", "Do you have rollback capability for deployments?", 0.78),
    ("q-quality-001", "quality_test", "What is your current unit test coverage?", 0.80),
    ("q-quality-004", "quality_test", "Is accessibility testing part of your quality process?", 0.65),
    ("q-finance-001", "finance", "Do you have a documented project budget with tracking?", 0.80),
    ("q-finance-002", "finance", "Have you calculated the total cost of ownership (TCO)?", 0.75),
    ("q-strategy-001", "strategy", "Is there a clear product vision and roadmap?", 0.75),
    ("q-req-001", "requirements", "Are user stories documented with acceptance criteria?", 0.78),
    ("q-data-001", "data_ai", "Is your data architecture documented?", 0.75),
    ("q-privacy-001", "privacy_legal", "Is your application GDPR/privacy compliant?", 0.90),
    ("q-ops-001", "service_ops", "Do you have monitoring and alerting in place?", 0.85),
    ("q-ops-002", "service_ops", "Do you have documented incident response procedures?", 0.80),
    ("q-compliance-002", "compliance_policy", "Do you have audit logging for compliance?", 0.82),
    ("q-people-001", "people_change", "Is there a training plan for the team?", 0.65),
    ("q-people-002", "people_change", "Do you have knowledge transfer documentation?", 0.62),
];

struct DemoSession {
    id: &'static str,
    industry: Option<&'static str>,
    status: SessionStatus,
    answers: &'static [(&'static str, CoverageLevel)],
    past_scores: &'static [f64],
}

const SESSIONS: [DemoSession; 4] = [
    DemoSession {
        id: DEMO_SESSION,
        industry: Some("fintech"),
        status: SessionStatus::InProgress,
        answers: &[
            ("q-arch-001", CoverageLevel::Substantial),
            ("q-arch-002", CoverageLevel::Full),
            ("q-arch-003", CoverageLevel::Partial),
            ("q-devops-001", CoverageLevel::Full),
            ("q-devops-002", CoverageLevel::Half),
            ("q-quality-001", CoverageLevel::Half),
            ("q-finance-001", CoverageLevel::Substantial),
            ("q-strategy-001", CoverageLevel::Full),
            ("q-privacy-001", CoverageLevel::None),
            ("q-ops-001", CoverageLevel::Substantial),
            ("q-people-001", CoverageLevel::Half),
        ],
        past_scores: &[29.8, 24.1, 18.5],
    },
    DemoSession {
        id: "demo-cfo",
        industry: Some("healthcare"),
        status: SessionStatus::InProgress,
        answers: &[
            ("q-finance-001", CoverageLevel::Full),
            ("q-finance-002", CoverageLevel::Substantial),
            ("q-strategy-001", CoverageLevel::Half),
            ("q-compliance-002", CoverageLevel::Partial),
        ],
        past_scores: &[],
    },
    DemoSession {
        id: "demo-startup",
        industry: None,
        status: SessionStatus::InProgress,
        answers: &[],
        past_scores: &[],
    },
    DemoSession {
        id: "demo-platform",
        industry: Some("fintech"),
        status: SessionStatus::Completed,
        answers: &[
            ("q-arch-001", CoverageLevel::Full),
            ("q-arch-002", CoverageLevel::Full),
            ("q-arch-003", CoverageLevel::Substantial),
            ("q-arch-005", CoverageLevel::Full),
            ("q-devops-001", CoverageLevel::Full),
            ("q-devops-002", CoverageLevel::Full),
            ("q-devops-005", CoverageLevel::Substantial),
            ("q-quality-001", CoverageLevel::Substantial),
            ("q-quality-004", CoverageLevel::Half),
            ("q-finance-001", CoverageLevel::Full),
            ("q-finance-002", CoverageLevel::Half),
            ("q-strategy-001", CoverageLevel::Full),
            ("q-req-001", CoverageLevel::Substantial),
            ("q-data-001", CoverageLevel::Half),
            ("q-privacy-001", CoverageLevel::Substantial),
            ("q-ops-001", CoverageLevel::Full),
            ("q-ops-002", CoverageLevel::Substantial),
            ("q-compliance-002", CoverageLevel::Full),
            ("q-people-001", CoverageLevel::Half),
            ("q-people-002", CoverageLevel::Partial),
        ],
        past_scores: &[],
    },
];

const EXTERNAL_COHORTS: [(&str, &[f64]); 3] = [
    ("fintech", &[58.2, 64.0, 71.5, 77.3, 83.9, 90.1]),
    ("healthcare", &[49.5, 57.8, 66.0, 72.4]),
    ("general", &[41.0, 52.3, 60.7, 68.8, 75.2, 81.6, 88.4]),
];

pub(crate) fn dimensions() -> Vec<Dimension> {
    DIMENSIONS
        .iter()
        .map(|(key, name, weight)| Dimension {
            key: (*key).to_string(),
            display_name: (*name).to_string(),
            weight: *weight,
        })
        .collect()
}

/// In-memory store with a technical-readiness questionnaire, four demo
/// sessions, industry cohorts and historical residuals.
pub(crate) fn seeded_repository() -> InMemoryAssessmentRepository {
    let now = Utc::now();
    let mut state = StoreState {
        dimensions: dimensions(),
        ..StoreState::default()
    };

    state.questionnaires.insert(
        DEMO_QUESTIONNAIRE.to_string(),
        QUESTIONS
            .iter()
            .map(|(id, dimension, text, severity)| CatalogQuestion {
                id: (*id).to_string(),
                text: (*text).to_string(),
                dimension_key: Some((*dimension).to_string()),
                severity: Some(*severity),
            })
            .collect(),
    );

    for demo in &SESSIONS {
        let id = SessionId::from(demo.id);
        let history: Vec<ScoreSnapshot> = demo
            .past_scores
            .iter()
            .enumerate()
            .map(|(index, score)| ScoreSnapshot {
                timestamp: now - Duration::days(7 * (index as i64 + 1)),
                score: *score,
                portfolio_residual: (100.0 - score) / 100.0,
                completion_percentage: 40.0 - 10.0 * index as f64,
            })
            .collect();
        let last_score = match demo.status {
            SessionStatus::Completed => Some(86.4),
            _ => history.first().map(|snapshot| snapshot.score),
        };
        let last_scored_at = last_score.map(|_| {
            history
                .first()
                .map(|snapshot| snapshot.timestamp)
                .unwrap_or(now - Duration::days(2))
        });

        state.sessions.insert(
            id.clone(),
            SessionRecord {
                id: id.clone(),
                questionnaire_id: DEMO_QUESTIONNAIRE.to_string(),
                status: demo.status,
                last_score,
                last_scored_at,
                industry: demo.industry.map(str::to_string),
            },
        );
        state.responses.insert(
            id.clone(),
            demo.answers
                .iter()
                .map(|(question, level)| ((*question).to_string(), StoredResponse::Level(*level)))
                .collect::<HashMap<_, _>>(),
        );
        if !history.is_empty() {
            state.history.insert(id, history);
        }
    }

    for (industry, scores) in EXTERNAL_COHORTS {
        state
            .external_cohorts
            .insert(industry.to_string(), scores.to_vec());
    }

    for (index, (key, _, _)) in DIMENSIONS.iter().enumerate() {
        let base = 0.18 + 0.03 * index as f64;
        state
            .residual_samples
            .insert((*key).to_string(), vec![base - 0.05, base, base + 0.05]);
    }

    InMemoryAssessmentRepository::from_state(state)
}
