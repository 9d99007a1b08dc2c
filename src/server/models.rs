use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub repository_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Deployment {
    pub id: i64,
    pub project_id: i64,
    pub environment: String,
    pub version: String,
    pub status: String,
    pub deployed_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Metric {
    pub id: i64,
    pub name: String,
    pub value: f64,
    pub unit: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Status every new deployment starts in.
pub const INITIAL_DEPLOYMENT_STATUS: &str = "pending";

/// Body of `POST /api/deployments`, before validation.
#[derive(Debug, Default, Deserialize)]
pub struct CreateDeploymentRequest {
    pub project_id: Option<i64>,
    pub environment: Option<String>,
    pub version: Option<String>,
    pub deployed_by: Option<String>,
}

/// A deployment request with every required field present.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDeployment {
    pub project_id: i64,
    pub environment: String,
    pub version: String,
    pub deployed_by: Option<String>,
}

impl CreateDeploymentRequest {
    pub fn validate(self) -> Result<NewDeployment, &'static str> {
        let environment = non_blank(self.environment);
        let version = non_blank(self.version);

        match (self.project_id, environment, version) {
            (Some(project_id), Some(environment), Some(version)) => Ok(NewDeployment {
                project_id,
                environment,
                version,
                deployed_by: non_blank(self.deployed_by),
            }),
            _ => Err("project_id, environment, and version are required"),
        }
    }
}

/// Body of `PATCH /api/deployments/:id`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateDeploymentRequest {
    pub status: Option<String>,
}

impl UpdateDeploymentRequest {
    pub fn validate(self) -> Result<String, &'static str> {
        non_blank(self.status).ok_or("status is required")
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_requires_fields() {
        let request = CreateDeploymentRequest {
            project_id: Some(1),
            environment: None,
            version: Some("1.4.0".into()),
            deployed_by: None,
        };
        assert!(request.validate().is_err());

        let request = CreateDeploymentRequest {
            project_id: Some(1),
            environment: Some("   ".into()),
            version: Some("1.4.0".into()),
            deployed_by: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_create_request_trims() {
        let request = CreateDeploymentRequest {
            project_id: Some(2),
            environment: Some(" staging ".into()),
            version: Some("v2.0.1".into()),
            deployed_by: Some("".into()),
        };
        let valid = request.validate().unwrap();
        assert_eq!(valid.environment, "staging");
        assert_eq!(valid.deployed_by, None);
    }

    #[test]
    fn test_update_request_requires_status() {
        assert!(UpdateDeploymentRequest::default().validate().is_err());
        assert_eq!(
            UpdateDeploymentRequest { status: Some("success".into()) }.validate(),
            Ok("success".to_string())
        );
    }
}
