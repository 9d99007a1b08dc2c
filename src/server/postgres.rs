use async_trait::async_trait;
use log::info;
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::error::{DevOpsLabError, Result};

use super::models::{Deployment, Metric, NewDeployment, Project, User, INITIAL_DEPLOYMENT_STATUS};
use super::store::Store;

const MAX_CONNECTIONS: u32 = 10;

/// Postgres error code for a violated foreign key.
const FOREIGN_KEY_VIOLATION: &str = "23503";

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL UNIQUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )",
    "CREATE TABLE IF NOT EXISTS projects (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT,
        repository_url TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )",
    "CREATE TABLE IF NOT EXISTS deployments (
        id BIGSERIAL PRIMARY KEY,
        project_id BIGINT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        environment TEXT NOT NULL,
        version TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending',
        deployed_by TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )",
    "CREATE TABLE IF NOT EXISTS metrics (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        value DOUBLE PRECISION NOT NULL,
        unit TEXT,
        recorded_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )",
];

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects and creates any missing tables.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(database_url)
            .await?;

        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        info!("Connected to PostgreSQL, schema ready");

        Ok(Self { pool })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn list_users(&self) -> Result<Vec<User>> {
        Ok(
            sqlx::query_as::<_, User>("SELECT id, username, email, created_at FROM users ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        Ok(sqlx::query_as::<_, Project>(
            "SELECT id, name, description, repository_url, created_at, updated_at
             FROM projects ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_deployments(&self) -> Result<Vec<Deployment>> {
        Ok(sqlx::query_as::<_, Deployment>(
            "SELECT id, project_id, environment, version, status, deployed_by, created_at, updated_at
             FROM deployments ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_metrics(&self) -> Result<Vec<Metric>> {
        Ok(sqlx::query_as::<_, Metric>(
            "SELECT id, name, value, unit, recorded_at FROM metrics ORDER BY recorded_at DESC",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn create_deployment(&self, deployment: NewDeployment) -> Result<Deployment> {
        sqlx::query_as::<_, Deployment>(
            "INSERT INTO deployments (project_id, environment, version, status, deployed_by)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, project_id, environment, version, status, deployed_by, created_at, updated_at",
        )
        .bind(deployment.project_id)
        .bind(&deployment.environment)
        .bind(&deployment.version)
        .bind(INITIAL_DEPLOYMENT_STATUS)
        .bind(&deployment.deployed_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            let missing_project = matches!(
                &e,
                sqlx::Error::Database(db) if db.code().as_deref() == Some(FOREIGN_KEY_VIOLATION)
            );
            if missing_project {
                DevOpsLabError::UnknownProject(deployment.project_id)
            } else {
                e.into()
            }
        })
    }

    async fn update_deployment_status(&self, id: i64, status: &str) -> Result<Option<Deployment>> {
        Ok(sqlx::query_as::<_, Deployment>(
            "UPDATE deployments SET status = $1, updated_at = NOW() WHERE id = $2
             RETURNING id, project_id, environment, version, status, deployed_by, created_at, updated_at",
        )
        .bind(status)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "postgres"
    }
}
