//! SQLite implementation of the portal repositories.
//!
//! Each call borrows a pooled connection for the duration of the statement and
//! hands it back on every exit path, including errors.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::SqlitePool;

use super::domain::{Admin, Application, ApplicationListing, Job, JobFields, JobId, NewApplication};
use super::repository::{AdminRepository, ApplicationRepository, JobRepository, RepositoryError};
use super::resumes::ResumeKey;

#[derive(Debug, Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl JobRepository for SqliteRepository {
    async fn list_jobs(&self) -> Result<Vec<Job>, RepositoryError> {
        let jobs = sqlx::query_as::<_, Job>(
            "SELECT id, title, description, location, job_type, posted_at FROM jobs ORDER BY id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(jobs)
    }

    async fn create_job(
        &self,
        fields: JobFields,
        posted_at: NaiveDate,
    ) -> Result<Job, RepositoryError> {
        let job = sqlx::query_as::<_, Job>(
            r#"
            INSERT INTO jobs (title, description, location, job_type, posted_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, title, description, location, job_type, posted_at
            "#,
        )
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(&fields.location)
        .bind(&fields.job_type)
        .bind(posted_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(job)
    }

    async fn fetch_job(&self, id: JobId) -> Result<Option<Job>, RepositoryError> {
        let job = sqlx::query_as::<_, Job>(
            "SELECT id, title, description, location, job_type, posted_at FROM jobs WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(job)
    }

    async fn update_job(&self, id: JobId, fields: JobFields) -> Result<Job, RepositoryError> {
        let job = sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs
            SET title = ?, description = ?, location = ?, job_type = ?
            WHERE id = ?
            RETURNING id, title, description, location, job_type, posted_at
            "#,
        )
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(&fields.location)
        .bind(&fields.job_type)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        job.ok_or(RepositoryError::NotFound)
    }

    async fn delete_job(&self, id: JobId) -> Result<Vec<ResumeKey>, RepositoryError> {
        // explicit pre-delete of dependents; the FK cascade is only a backstop
        let mut tx = self.pool.begin().await?;

        let resume_keys: Vec<ResumeKey> =
            sqlx::query_scalar("DELETE FROM applications WHERE job_id = ? RETURNING resume_key")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;

        let removed = sqlx::query("DELETE FROM jobs WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if removed.rows_affected() == 0 {
            // dropping the transaction rolls it back
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(resume_keys)
    }

    async fn count_jobs(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM jobs")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl ApplicationRepository for SqliteRepository {
    async fn insert_application(
        &self,
        application: NewApplication,
    ) -> Result<Application, RepositoryError> {
        let stored = sqlx::query_as::<_, Application>(
            r#"
            INSERT INTO applications (job_id, applicant_name, email, phone, resume_key, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id, job_id, applicant_name, email, phone, resume_key, created_at
            "#,
        )
        .bind(application.job_id)
        .bind(&application.applicant_name)
        .bind(&application.email)
        .bind(&application.phone)
        .bind(&application.resume_key)
        .bind(application.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(stored)
    }

    async fn list_applications(
        &self,
        job_id: Option<JobId>,
    ) -> Result<Vec<ApplicationListing>, RepositoryError> {
        let listings = sqlx::query_as::<_, ApplicationListing>(
            r#"
            SELECT a.id, a.job_id, j.title AS job_title, a.applicant_name, a.email, a.phone,
                   a.resume_key, a.created_at
            FROM applications a
            JOIN jobs j ON j.id = a.job_id
            WHERE ?1 IS NULL OR a.job_id = ?1
            ORDER BY a.id DESC
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(listings)
    }

    async fn count_applications(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM applications")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl AdminRepository for SqliteRepository {
    async fn find_admin(&self, email: &str) -> Result<Option<Admin>, RepositoryError> {
        let admin = sqlx::query_as::<_, Admin>(
            "SELECT email, password_hash, session_epoch FROM admins WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(admin)
    }

    async fn insert_admin_if_absent(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("INSERT OR IGNORE INTO admins (email, password_hash) VALUES (?, ?)")
            .bind(email)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn update_admin_password(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<i64, RepositoryError> {
        let epoch: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE admins
            SET password_hash = ?, session_epoch = session_epoch + 1
            WHERE email = ?
            RETURNING session_epoch
            "#,
        )
        .bind(password_hash)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        epoch.ok_or(RepositoryError::NotFound)
    }

    async fn revoke_sessions(&self, email: &str, epoch: i64) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE admins SET session_epoch = session_epoch + 1 WHERE email = ? AND session_epoch = ?",
        )
        .bind(email)
        .bind(epoch)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
