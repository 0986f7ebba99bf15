use serde::{Deserialize, Serialize};

/// Success envelope shared by every JSON endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: Some(message.into()),
        }
    }
}

impl ApiResponse<Option<()>> {
    /// Acknowledgment with no payload: `data` serializes as `null`.
    pub fn ack(message: impl Into<String>) -> Self {
        Self::ok_with_message(None, message)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub success: bool,
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

impl ApiErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub service: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<Vec<HealthCheck>>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HealthCheck {
    /// Reports a dependency probe result; the error text becomes the message.
    pub fn from_probe<E: std::fmt::Display>(name: impl Into<String>, probe: Result<(), E>) -> Self {
        match probe {
            Ok(()) => Self { name: name.into(), status: HealthStatus::Healthy, message: None },
            Err(e) => Self {
                name: name.into(),
                status: HealthStatus::Unhealthy,
                message: Some(e.to_string()),
            },
        }
    }
}

impl HealthResponse {
    pub fn healthy(service: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Healthy,
            service: service.into(),
            version: version.into(),
            checks: None,
        }
    }

    pub fn with_checks(mut self, checks: Vec<HealthCheck>) -> Self {
        if checks.iter().any(|c| c.status == HealthStatus::Unhealthy) {
            self.status = HealthStatus::Unhealthy;
        }
        self.checks = Some(checks);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_serializes_null_data() {
        let json = serde_json::to_value(ApiResponse::ack("OTP sent to your email")).unwrap();
        assert_eq!(json["success"], true);
        assert!(json["data"].is_null());
        assert_eq!(json["message"], "OTP sent to your email");
    }

    #[test]
    fn message_is_omitted_when_absent() {
        let json = serde_json::to_value(ApiResponse::ok("done")).unwrap();
        assert!(json.get("message").is_none());
    }

    #[test]
    fn failed_probe_marks_unhealthy() {
        let response = HealthResponse::healthy("formguide-auth", "0.1.0").with_checks(vec![
            HealthCheck::from_probe("database", Err::<(), _>("connection refused")),
        ]);
        assert_eq!(response.status, HealthStatus::Unhealthy);
        let checks = response.checks.unwrap();
        assert_eq!(checks[0].message.as_deref(), Some("connection refused"));
    }
}
