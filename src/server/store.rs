use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::RwLock;

use crate::error::{DevOpsLabError, Result};

use super::models::{Deployment, Metric, NewDeployment, Project, User, INITIAL_DEPLOYMENT_STATUS};

/// Relational storage behind the CRUD endpoints. Lists are newest first.
#[async_trait]
pub trait Store: Send + Sync {
    async fn list_users(&self) -> Result<Vec<User>>;
    async fn list_projects(&self) -> Result<Vec<Project>>;
    async fn list_deployments(&self) -> Result<Vec<Deployment>>;
    async fn list_metrics(&self) -> Result<Vec<Metric>>;

    /// Fails with [`DevOpsLabError::UnknownProject`] when the project does not exist.
    async fn create_deployment(&self, deployment: NewDeployment) -> Result<Deployment>;

    /// `None` when no deployment has this id.
    async fn update_deployment_status(&self, id: i64, status: &str) -> Result<Option<Deployment>>;

    /// Cheap connectivity check for `/health`.
    async fn ping(&self) -> Result<()>;

    fn kind(&self) -> &'static str;
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    projects: Vec<Project>,
    deployments: Vec<Deployment>,
    metrics: Vec<Metric>,
}

/// In-process store used when no database URL is configured.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding the same demo rows the Postgres schema is seeded with.
    pub fn seeded() -> Self {
        let now = Utc::now();
        let hours_ago = |h: i64| now - Duration::hours(h);

        let users = vec![
            User {
                id: 1,
                username: "admin".into(),
                email: "admin@devopslab.local".into(),
                created_at: hours_ago(72),
            },
            User {
                id: 2,
                username: "developer".into(),
                email: "dev@devopslab.local".into(),
                created_at: hours_ago(48),
            },
        ];

        let projects = vec![
            Project {
                id: 1,
                name: "devopslab-frontend".into(),
                description: Some("Single-page dashboard".into()),
                repository_url: Some("https://github.com/devopslab/frontend".into()),
                created_at: hours_ago(70),
                updated_at: hours_ago(2),
            },
            Project {
                id: 2,
                name: "devopslab-backend".into(),
                description: Some("REST API and pipeline status proxy".into()),
                repository_url: Some("https://github.com/devopslab/backend".into()),
                created_at: hours_ago(70),
                updated_at: hours_ago(1),
            },
        ];

        let deployments = vec![
            Deployment {
                id: 1,
                project_id: 2,
                environment: "staging".into(),
                version: "1.2.0".into(),
                status: "success".into(),
                deployed_by: Some("jenkins".into()),
                created_at: hours_ago(24),
                updated_at: hours_ago(24),
            },
            Deployment {
                id: 2,
                project_id: 1,
                environment: "production".into(),
                version: "1.1.3".into(),
                status: "success".into(),
                deployed_by: Some("admin".into()),
                created_at: hours_ago(6),
                updated_at: hours_ago(6),
            },
        ];

        let metrics = vec![
            Metric {
                id: 1,
                name: "deployment_frequency".into(),
                value: 4.0,
                unit: Some("per_day".into()),
                recorded_at: hours_ago(1),
            },
            Metric {
                id: 2,
                name: "lead_time".into(),
                value: 35.5,
                unit: Some("minutes".into()),
                recorded_at: hours_ago(1),
            },
        ];

        Self {
            tables: RwLock::new(Tables {
                users,
                projects,
                deployments,
                metrics,
            }),
        }
    }

    #[cfg(test)]
    pub async fn insert_project(&self, name: &str) -> Project {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let project = Project {
            id: next_id(tables.projects.iter().map(|p| p.id)),
            name: name.to_string(),
            description: None,
            repository_url: None,
            created_at: now,
            updated_at: now,
        };
        tables.projects.push(project.clone());
        project
    }
}

fn next_id(ids: impl Iterator<Item = i64>) -> i64 {
    ids.max().unwrap_or(0) + 1
}

fn newest_first<T: Clone, K: Ord>(rows: &[T], key: impl Fn(&T) -> K) -> Vec<T> {
    let mut rows = rows.to_vec();
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
    rows
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_users(&self) -> Result<Vec<User>> {
        Ok(newest_first(&self.tables.read().await.users, |u| u.created_at))
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        Ok(newest_first(&self.tables.read().await.projects, |p| p.created_at))
    }

    async fn list_deployments(&self) -> Result<Vec<Deployment>> {
        Ok(newest_first(&self.tables.read().await.deployments, |d| d.created_at))
    }

    async fn list_metrics(&self) -> Result<Vec<Metric>> {
        Ok(newest_first(&self.tables.read().await.metrics, |m| m.recorded_at))
    }

    async fn create_deployment(&self, deployment: NewDeployment) -> Result<Deployment> {
        let mut tables = self.tables.write().await;

        if !tables.projects.iter().any(|p| p.id == deployment.project_id) {
            return Err(DevOpsLabError::UnknownProject(deployment.project_id));
        }

        let now = Utc::now();
        let row = Deployment {
            id: next_id(tables.deployments.iter().map(|d| d.id)),
            project_id: deployment.project_id,
            environment: deployment.environment,
            version: deployment.version,
            status: INITIAL_DEPLOYMENT_STATUS.to_string(),
            deployed_by: deployment.deployed_by,
            created_at: now,
            updated_at: now,
        };
        tables.deployments.push(row.clone());
        Ok(row)
    }

    async fn update_deployment_status(&self, id: i64, status: &str) -> Result<Option<Deployment>> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables.deployments.iter_mut().find(|d| d.id == id) else {
            return Ok(None);
        };
        row.status = status.to_string();
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn new_deployment(project_id: i64) -> NewDeployment {
        NewDeployment {
            project_id,
            environment: "staging".into(),
            version: "2.0.0".into(),
            deployed_by: None,
        }
    }

    #[tokio::test]
    async fn test_create_deployment_starts_pending() {
        let store = MemoryStore::new();
        let project = store.insert_project("api").await;

        let row = assert_ok!(store.create_deployment(new_deployment(project.id)).await);
        assert_eq!(row.id, 1);
        assert_eq!(row.status, "pending");
        assert_eq!(store.list_deployments().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_deployment_unknown_project() {
        let store = MemoryStore::new();
        let err = assert_err!(store.create_deployment(new_deployment(99)).await);
        assert!(matches!(err, DevOpsLabError::UnknownProject(99)));
    }

    #[tokio::test]
    async fn test_update_deployment_status() {
        let store = MemoryStore::seeded();

        let updated = store.update_deployment_status(1, "rolled_back").await.unwrap().unwrap();
        assert_eq!(updated.status, "rolled_back");
        assert!(store.update_deployment_status(404, "success").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lists_are_newest_first() {
        let store = MemoryStore::seeded();
        let deployments = store.list_deployments().await.unwrap();
        assert_eq!(deployments[0].id, 2);
        assert!(deployments[0].created_at >= deployments[1].created_at);
    }
}
