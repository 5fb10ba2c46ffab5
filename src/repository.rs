use crate::models::{
    Admin, AdminRole, BlogPost, BlogStatus, DashboardStats, Message, MessageFilter,
    MessageStatus, NewBlogPost, NewMessage, NewProject, Project, ProjectImage,
    ProjectImageInput, UpdateBlogPostRequest, UpdateProjectRequest,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, query_builder::QueryBuilder};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

pub mod mock;

pub use mock::MockRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(sqlx::Error),
    /// A unique constraint rejected the write (e.g. a duplicate slug).
    #[error("duplicate value: {0}")]
    Conflict(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::Conflict(db.constraint().unwrap_or("unique").to_string())
            }
            _ => RepositoryError::Database(err),
        }
    }
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Repository Trait
///
/// Every table operation the application performs against the hosted database. Handlers and
/// services only see `Arc<dyn Repository>`, so tests swap in `MockRepository`.
///
/// Single-row reads return `Ok(None)` for a missing row so that callers can tell "not found"
/// apart from a failed query.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Admins ---
    async fn get_admin(&self, id: Uuid) -> RepoResult<Option<Admin>>;
    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> RepoResult<()>;
    // Case-insensitive search across email, name and role.
    async fn list_admins(&self, search: Option<String>) -> RepoResult<Vec<Admin>>;
    async fn update_admin(
        &self,
        id: Uuid,
        name: Option<String>,
        role: Option<AdminRole>,
    ) -> RepoResult<Option<Admin>>;

    // --- Messages ---
    async fn insert_message(&self, message: NewMessage) -> RepoResult<Message>;
    // Newest first; honours the filter's equality predicates and pagination.
    async fn list_messages(&self, filter: &MessageFilter) -> RepoResult<Vec<Message>>;
    // Counts rows matching the filter's predicates, ignoring pagination.
    async fn count_messages(&self, filter: &MessageFilter) -> RepoResult<i64>;
    async fn get_message(&self, id: Uuid) -> RepoResult<Option<Message>>;
    async fn update_message_status(
        &self,
        id: Uuid,
        status: MessageStatus,
    ) -> RepoResult<Option<Message>>;
    async fn delete_message(&self, id: Uuid) -> RepoResult<bool>;

    // --- Blog posts ---
    // Optional status filter and case-insensitive search over title and slug.
    async fn list_blog_posts(
        &self,
        status: Option<BlogStatus>,
        search: Option<String>,
    ) -> RepoResult<Vec<BlogPost>>;
    async fn get_blog_post(&self, id: Uuid) -> RepoResult<Option<BlogPost>>;
    async fn get_blog_post_by_slug(&self, slug: &str) -> RepoResult<Option<BlogPost>>;
    async fn insert_blog_post(&self, post: NewBlogPost) -> RepoResult<BlogPost>;
    // Partial update. Moving to `published` stamps `published_at` if it was never set.
    async fn update_blog_post(
        &self,
        id: Uuid,
        changes: UpdateBlogPostRequest,
    ) -> RepoResult<Option<BlogPost>>;
    async fn delete_blog_post(&self, id: Uuid) -> RepoResult<bool>;

    // --- Projects (returned with their gallery images) ---
    async fn list_projects(&self) -> RepoResult<Vec<Project>>;
    async fn get_project(&self, id: Uuid) -> RepoResult<Option<Project>>;
    async fn get_project_by_slug(&self, slug: &str) -> RepoResult<Option<Project>>;
    async fn insert_project(&self, project: NewProject) -> RepoResult<Project>;
    // Partial update; `images: Some(..)` replaces the gallery.
    async fn update_project(
        &self,
        id: Uuid,
        changes: UpdateProjectRequest,
    ) -> RepoResult<Option<Project>>;
    async fn delete_project(&self, id: Uuid) -> RepoResult<bool>;

    // --- Dashboard & health ---
    async fn get_stats(&self) -> RepoResult<DashboardStats>;
    async fn ping(&self) -> RepoResult<()>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// `Repository` backed by the Supabase project's Postgres database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ADMIN_COLUMNS: &str = "id, email, name, role, last_login, created_at";

const MESSAGE_COLUMNS: &str =
    "id, first_name, last_name, email, phone, subject, project, message, type, status, created_at";

const BLOG_POST_COLUMNS: &str = "id, title, slug, excerpt, content, image, category, status, \
     published_at, created_at, updated_at";

const PROJECT_COLUMNS: &str = "id, slug, title, excerpt, image, categories, start_date, location, \
     people_helped, status, content, goals, created_at, updated_at";

/// Image row carrying its owning project, used to attach galleries after a project query.
#[derive(FromRow)]
struct ProjectImageRow {
    project_id: Uuid,
    id: Uuid,
    image_url: String,
    alt_text: Option<String>,
}

/// Appends the equality predicates of a message filter. The builder must already end in a
/// `WHERE 1 = 1` clause.
fn push_message_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &MessageFilter) {
    if let Some(status) = filter.status {
        builder.push(" AND status = ");
        builder.push_bind(status.as_str());
    }
    if let Some(message_type) = filter.message_type {
        builder.push(" AND type = ");
        builder.push_bind(message_type.as_str());
    }
}

impl PostgresRepository {
    /// Loads the gallery images of the given projects and attaches them in place.
    async fn attach_images(&self, projects: &mut [Project]) -> RepoResult<()> {
        if projects.is_empty() {
            return Ok(());
        }
        let ids: Vec<Uuid> = projects.iter().map(|p| p.id).collect();

        let rows = sqlx::query_as::<_, ProjectImageRow>(
            "SELECT project_id, id, image_url, alt_text FROM project_images \
             WHERE project_id = ANY($1) ORDER BY created_at ASC",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_project: HashMap<Uuid, Vec<ProjectImage>> = HashMap::new();
        for row in rows {
            by_project.entry(row.project_id).or_default().push(ProjectImage {
                id: row.id,
                image_url: row.image_url,
                alt_text: row.alt_text,
            });
        }
        for project in projects.iter_mut() {
            project.images = by_project.remove(&project.id).unwrap_or_default();
        }
        Ok(())
    }

    async fn replace_images(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        project_id: Uuid,
        images: &[ProjectImageInput],
    ) -> RepoResult<()> {
        sqlx::query("DELETE FROM project_images WHERE project_id = $1")
            .bind(project_id)
            .execute(&mut **tx)
            .await?;

        for image in images {
            sqlx::query(
                "INSERT INTO project_images (id, project_id, image_url, alt_text) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(Uuid::new_v4())
            .bind(project_id)
            .bind(&image.image_url)
            .bind(&image.alt_text)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    async fn fetch_project_where(&self, clause: &str, bind: ProjectKey<'_>) -> RepoResult<Option<Project>> {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE {clause}");
        let query = sqlx::query_as::<_, Project>(&sql);
        let query = match bind {
            ProjectKey::Id(id) => query.bind(id),
            ProjectKey::Slug(slug) => query.bind(slug),
        };

        match query.fetch_optional(&self.pool).await? {
            Some(project) => {
                let mut projects = [project];
                self.attach_images(&mut projects).await?;
                let [project] = projects;
                Ok(Some(project))
            }
            None => Ok(None),
        }
    }
}

enum ProjectKey<'a> {
    Id(Uuid),
    Slug(&'a str),
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- ADMINS ---

    async fn get_admin(&self, id: Uuid) -> RepoResult<Option<Admin>> {
        let sql = format!("SELECT {ADMIN_COLUMNS} FROM admins WHERE id = $1");
        Ok(sqlx::query_as::<_, Admin>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> RepoResult<()> {
        sqlx::query("UPDATE admins SET last_login = $1 WHERE id = $2")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// list_admins
    ///
    /// Uses `QueryBuilder` so the optional search term is always bound, never interpolated.
    async fn list_admins(&self, search: Option<String>) -> RepoResult<Vec<Admin>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {ADMIN_COLUMNS} FROM admins WHERE 1 = 1"));

        if let Some(s) = search.filter(|s| !s.trim().is_empty()) {
            let search_pattern = format!("%{}%", s.trim());
            builder.push(" AND (email ILIKE ");
            builder.push_bind(search_pattern.clone());
            builder.push(" OR name ILIKE ");
            builder.push_bind(search_pattern.clone());
            builder.push(" OR role ILIKE ");
            builder.push_bind(search_pattern);
            builder.push(")");
        }
        builder.push(" ORDER BY created_at ASC");

        Ok(builder
            .build_query_as::<Admin>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_admin(
        &self,
        id: Uuid,
        name: Option<String>,
        role: Option<AdminRole>,
    ) -> RepoResult<Option<Admin>> {
        let sql = format!(
            "UPDATE admins SET name = COALESCE($2, name), role = COALESCE($3, role) \
             WHERE id = $1 RETURNING {ADMIN_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Admin>(&sql)
            .bind(id)
            .bind(name)
            .bind(role.map(|r| r.as_str()))
            .fetch_optional(&self.pool)
            .await?)
    }

    // --- MESSAGES ---

    async fn insert_message(&self, message: NewMessage) -> RepoResult<Message> {
        let sql = format!(
            "INSERT INTO messages \
             (id, first_name, last_name, email, phone, subject, project, message, type, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW()) \
             RETURNING {MESSAGE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Message>(&sql)
            .bind(Uuid::new_v4())
            .bind(message.first_name)
            .bind(message.last_name)
            .bind(message.email)
            .bind(message.phone)
            .bind(message.subject)
            .bind(message.project)
            .bind(message.message)
            .bind(message.message_type.as_str())
            .bind(message.status.as_str())
            .fetch_one(&self.pool)
            .await?)
    }

    async fn list_messages(&self, filter: &MessageFilter) -> RepoResult<Vec<Message>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE 1 = 1"));
        push_message_filters(&mut builder, filter);
        builder.push(" ORDER BY created_at DESC");

        if let Some(limit) = filter.limit {
            builder.push(" LIMIT ");
            builder.push_bind(limit);
        }
        if filter.offset > 0 {
            builder.push(" OFFSET ");
            builder.push_bind(filter.offset);
        }

        Ok(builder
            .build_query_as::<Message>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn count_messages(&self, filter: &MessageFilter) -> RepoResult<i64> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM messages WHERE 1 = 1");
        push_message_filters(&mut builder, filter);

        Ok(builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?)
    }

    async fn get_message(&self, id: Uuid) -> RepoResult<Option<Message>> {
        let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1");
        Ok(sqlx::query_as::<_, Message>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_message_status(
        &self,
        id: Uuid,
        status: MessageStatus,
    ) -> RepoResult<Option<Message>> {
        let sql = format!("UPDATE messages SET status = $1 WHERE id = $2 RETURNING {MESSAGE_COLUMNS}");
        Ok(sqlx::query_as::<_, Message>(&sql)
            .bind(status.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_message(&self, id: Uuid) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    // --- BLOG POSTS ---

    async fn list_blog_posts(
        &self,
        status: Option<BlogStatus>,
        search: Option<String>,
    ) -> RepoResult<Vec<BlogPost>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {BLOG_POST_COLUMNS} FROM blog_posts WHERE 1 = 1"));
        if let Some(status) = status {
            builder.push(" AND status = ");
            builder.push_bind(status.as_str());
        }
        if let Some(s) = search.filter(|s| !s.trim().is_empty()) {
            let search_pattern = format!("%{}%", s.trim());
            builder.push(" AND (title ILIKE ");
            builder.push_bind(search_pattern.clone());
            builder.push(" OR slug ILIKE ");
            builder.push_bind(search_pattern);
            builder.push(")");
        }
        builder.push(" ORDER BY COALESCE(published_at, created_at) DESC");

        Ok(builder
            .build_query_as::<BlogPost>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_blog_post(&self, id: Uuid) -> RepoResult<Option<BlogPost>> {
        let sql = format!("SELECT {BLOG_POST_COLUMNS} FROM blog_posts WHERE id = $1");
        Ok(sqlx::query_as::<_, BlogPost>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_blog_post_by_slug(&self, slug: &str) -> RepoResult<Option<BlogPost>> {
        let sql = format!("SELECT {BLOG_POST_COLUMNS} FROM blog_posts WHERE slug = $1");
        Ok(sqlx::query_as::<_, BlogPost>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_blog_post(&self, post: NewBlogPost) -> RepoResult<BlogPost> {
        let sql = format!(
            "INSERT INTO blog_posts \
             (id, title, slug, excerpt, content, image, category, status, published_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW(), NOW()) \
             RETURNING {BLOG_POST_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, BlogPost>(&sql)
            .bind(Uuid::new_v4())
            .bind(post.title)
            .bind(post.slug)
            .bind(post.excerpt)
            .bind(post.content)
            .bind(post.image)
            .bind(post.category)
            .bind(post.status.as_str())
            .bind(post.published_at)
            .fetch_one(&self.pool)
            .await?)
    }

    /// update_blog_post
    ///
    /// `COALESCE` keeps every column whose field in `changes` is `None`.
    async fn update_blog_post(
        &self,
        id: Uuid,
        changes: UpdateBlogPostRequest,
    ) -> RepoResult<Option<BlogPost>> {
        let sql = format!(
            "UPDATE blog_posts \
             SET title = COALESCE($2, title), \
                 slug = COALESCE($3, slug), \
                 excerpt = COALESCE($4, excerpt), \
                 content = COALESCE($5, content), \
                 image = COALESCE($6, image), \
                 category = COALESCE($7, category), \
                 status = COALESCE($8, status), \
                 published_at = CASE WHEN COALESCE($8, status) = 'published' \
                                     THEN COALESCE(published_at, NOW()) \
                                     ELSE published_at END, \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {BLOG_POST_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, BlogPost>(&sql)
            .bind(id)
            .bind(changes.title)
            .bind(changes.slug)
            .bind(changes.excerpt)
            .bind(changes.content)
            .bind(changes.image)
            .bind(changes.category)
            .bind(changes.status.map(|s| s.as_str()))
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_blog_post(&self, id: Uuid) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM blog_posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    // --- PROJECTS ---

    async fn list_projects(&self) -> RepoResult<Vec<Project>> {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at DESC");
        let mut projects = sqlx::query_as::<_, Project>(&sql)
            .fetch_all(&self.pool)
            .await?;
        self.attach_images(&mut projects).await?;
        Ok(projects)
    }

    async fn get_project(&self, id: Uuid) -> RepoResult<Option<Project>> {
        self.fetch_project_where("id = $1", ProjectKey::Id(id)).await
    }

    async fn get_project_by_slug(&self, slug: &str) -> RepoResult<Option<Project>> {
        self.fetch_project_where("slug = $1", ProjectKey::Slug(slug)).await
    }

    /// insert_project
    ///
    /// Inserts the project row and its gallery in one transaction.
    async fn insert_project(&self, project: NewProject) -> RepoResult<Project> {
        let mut tx = self.pool.begin().await?;
        let id = Uuid::new_v4();

        let sql = format!(
            "INSERT INTO projects \
             (id, slug, title, excerpt, image, categories, start_date, location, people_helped, \
              status, content, goals, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, NOW(), NOW()) \
             RETURNING {PROJECT_COLUMNS}"
        );
        let created = sqlx::query_as::<_, Project>(&sql)
            .bind(id)
            .bind(project.slug)
            .bind(project.title)
            .bind(project.excerpt)
            .bind(project.image)
            .bind(project.categories)
            .bind(project.start_date)
            .bind(project.location)
            .bind(project.people_helped)
            .bind(project.status.as_str())
            .bind(project.content)
            .bind(project.goals)
            .fetch_one(&mut *tx)
            .await?;

        Self::replace_images(&mut tx, id, &project.images).await?;
        tx.commit().await?;

        let mut projects = [created];
        self.attach_images(&mut projects).await?;
        let [created] = projects;
        Ok(created)
    }

    async fn update_project(
        &self,
        id: Uuid,
        changes: UpdateProjectRequest,
    ) -> RepoResult<Option<Project>> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE projects \
             SET title = COALESCE($2, title), \
                 slug = COALESCE($3, slug), \
                 excerpt = COALESCE($4, excerpt), \
                 image = COALESCE($5, image), \
                 categories = COALESCE($6, categories), \
                 start_date = COALESCE($7, start_date), \
                 location = COALESCE($8, location), \
                 people_helped = COALESCE($9, people_helped), \
                 status = COALESCE($10, status), \
                 content = COALESCE($11, content), \
                 goals = COALESCE($12, goals), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {PROJECT_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Project>(&sql)
            .bind(id)
            .bind(changes.title)
            .bind(changes.slug)
            .bind(changes.excerpt)
            .bind(changes.image)
            .bind(changes.categories)
            .bind(changes.start_date)
            .bind(changes.location)
            .bind(changes.people_helped)
            .bind(changes.status.map(|s| s.as_str()))
            .bind(changes.content)
            .bind(changes.goals)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(updated) = updated else {
            tx.rollback().await?;
            return Ok(None);
        };

        if let Some(images) = &changes.images {
            Self::replace_images(&mut tx, id, images).await?;
        }
        tx.commit().await?;

        let mut projects = [updated];
        self.attach_images(&mut projects).await?;
        let [updated] = projects;
        Ok(Some(updated))
    }

    async fn delete_project(&self, id: Uuid) -> RepoResult<bool> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM project_images WHERE project_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let res = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(res.rows_affected() > 0)
    }

    // --- DASHBOARD ---

    /// get_stats
    ///
    /// Compiles the dashboard counters in a single round trip.
    async fn get_stats(&self) -> RepoResult<DashboardStats> {
        let row: (i64, i64, i64, i64, i64, i64) = sqlx::query_as(
            "SELECT \
               (SELECT COUNT(*) FROM messages), \
               (SELECT COUNT(*) FROM messages WHERE status = 'unread'), \
               (SELECT COUNT(*) FROM blog_posts), \
               (SELECT COUNT(*) FROM blog_posts WHERE status = 'published'), \
               (SELECT COUNT(*) FROM projects), \
               (SELECT COUNT(*) FROM admins)",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(DashboardStats {
            total_messages: row.0,
            unread_messages: row.1,
            total_blog_posts: row.2,
            published_blog_posts: row.3,
            total_projects: row.4,
            total_admins: row.5,
        })
    }

    async fn ping(&self) -> RepoResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
