use serde::Serialize;
use tracing::{error, warn};
use uuid::Uuid;

use crate::service::ServiceError;
use crate::validate::FieldError;

const TYPE_BASE: &str = "https://api.habittracker.dev/errors";

/// Fixed (type URI, title, generic description) triple for a problem code.
fn category(code: &str) -> (String, &'static str, &'static str) {
    let (slug, title, description) = match code {
        "validation_error" => ("validation", "Validation Error", "Input failed validation"),
        "not_found" => ("not-found", "Resource Not Found", "Requested resource not found"),
        "conflict" => (
            "conflict",
            "Resource Conflict",
            "Conflict while creating or updating resource",
        ),
        "rate_limit" => ("rate-limit", "Rate Limit Exceeded", "Request limit exceeded"),
        "internal_error" => ("internal", "Internal Server Error", "Internal server error"),
        "unauthorized" => ("unauthorized", "Unauthorized", "Authentication required"),
        "forbidden" => ("forbidden", "Forbidden", "Insufficient permissions"),
        "inactive_habit" => (
            "inactive-habit",
            "Inactive Habit",
            "Habit is not active",
        ),
        "quota_exceeded" => (
            "quota-exceeded",
            "Quota Exceeded",
            "Resource quota reached",
        ),
        _ => ("unknown", "Unknown Error", "Unknown error"),
    };
    (format!("{}/{}", TYPE_BASE, slug), title, description)
}

/// RFC 7807 problem document. Every failure, whatever its origin, is
/// rendered in this one shape with a fresh correlation id.
#[derive(Debug, Clone, Serialize)]
pub struct Problem {
    #[serde(rename = "type")]
    pub problem_type: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    pub instance: String,
    pub correlation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

impl Problem {
    /// Build and log a problem for a known code.
    ///
    /// For status >= 500 the outgoing detail is always the category's
    /// generic description; the caller-supplied detail only reaches the log.
    pub fn new(code: &str, detail: &str, status: u16, instance: &str) -> Self {
        let (problem_type, title, description) = category(code);
        let correlation_id = Uuid::new_v4().to_string();

        if status >= 500 {
            error!(%correlation_id, code, status, detail, instance, "request failed");
        } else {
            warn!(%correlation_id, code, status, instance, "request rejected");
        }

        let detail = if status >= 500 {
            description.to_string()
        } else {
            detail.to_string()
        };

        Self {
            problem_type,
            title: title.to_string(),
            status,
            detail,
            instance: instance.to_string(),
            correlation_id,
            errors: None,
        }
    }

    /// Build a validation problem carrying the full field-level error list.
    pub fn validation(errors: Vec<FieldError>, instance: &str) -> Self {
        let mut problem = Self::new("validation_error", "Request validation failed", 422, instance);
        problem.errors = Some(errors);
        problem
    }

    /// Normalize a service failure. Total: every variant maps to a problem,
    /// so no error leaves the service layer unstructured.
    pub fn from_service_error(err: &ServiceError, instance: &str) -> Self {
        match err {
            ServiceError::Validation(errors) => {
                Self::validation(errors.errors.clone(), instance)
            }
            ServiceError::HabitNotFound => Self::new("not_found", "Habit not found", 404, instance),
            ServiceError::InactiveHabit => {
                Self::new("inactive_habit", "Cannot track inactive habit", 400, instance)
            }
            ServiceError::QuotaExceeded(_) => {
                Self::new("quota_exceeded", &err.to_string(), 403, instance)
            }
            ServiceError::Store(store_err) => {
                Self::new("internal_error", &store_err.to_string(), 500, instance)
            }
        }
    }

    /// Catch-all for unexpected failures at the outermost boundary.
    pub fn from_unexpected(err: &(dyn std::error::Error + 'static), instance: &str) -> Self {
        Self::new("internal_error", &err.to_string(), 500, instance)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| {
            // Rendering the error must not itself fail the error path.
            format!(
                "{{\"type\":\"{}/internal\",\"title\":\"Internal Server Error\",\"status\":500}}",
                TYPE_BASE
            )
        })
    }
}
