//! Postgres-backed repository tests.
//!
//! Ignored by default: they need a disposable database at `TEST_DATABASE_URL`.
//! Run with `cargo test --test repository_integration_tests -- --ignored`.

use chrono::Utc;
use foundation_api::{
    models::{
        AdminRole, BlogStatus, MessageFilter, MessageStatus, MessageType, NewBlogPost,
        NewMessage, NewProject, ProjectImageInput, ProjectStatus, UpdateBlogPostRequest,
        UpdateProjectRequest,
    },
    repository::{PostgresRepository, Repository, RepositoryError},
};
use sqlx::PgPool;
use tokio::test;
use uuid::Uuid;

// --- Test Context and Setup ---

struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("TEST_DATABASE_URL")
            .expect("TEST_DATABASE_URL must be set to run repository tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::raw_sql(include_str!("../migrations/0001_init.sql"))
            .execute(&pool)
            .await
            .expect("Failed to apply schema.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

async fn insert_admin(pool: &PgPool, role: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO admins (id, email, name, role) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(format!("{id}@test.org"))
        .bind("Test Admin")
        .bind(role)
        .execute(pool)
        .await
        .expect("Failed to insert admin");
    id
}

fn unique_slug(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

fn new_message(email: &str, message_type: MessageType) -> NewMessage {
    NewMessage {
        first_name: "Repo".to_string(),
        last_name: "Test".to_string(),
        email: email.to_string(),
        phone: None,
        subject: None,
        project: None,
        message: "Hello".to_string(),
        message_type,
        status: MessageStatus::Unread,
    }
}

// --- Tests ---

#[test]
#[ignore]
async fn test_admin_lookup_normalizes_legacy_role() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let id = insert_admin(&ctx.pool, "messages_manager").await;
    let admin = repo.get_admin(id).await.unwrap().unwrap();
    assert_eq!(admin.role, AdminRole::MessageManager);
    assert!(admin.last_login.is_none());

    repo.touch_last_login(id, Utc::now()).await.unwrap();
    assert!(repo.get_admin(id).await.unwrap().unwrap().last_login.is_some());

    let updated = repo
        .update_admin(id, Some("Renamed".to_string()), None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.name, "Renamed");
    assert_eq!(updated.role, AdminRole::MessageManager);

    assert!(repo.get_admin(Uuid::new_v4()).await.unwrap().is_none());
}

#[test]
#[ignore]
async fn test_message_filters_and_count() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let email = format!("{}@example.com", Uuid::new_v4().simple());

    let first = repo.insert_message(new_message(&email, MessageType::Volunteer)).await.unwrap();
    let second = repo.insert_message(new_message(&email, MessageType::Volunteer)).await.unwrap();
    assert_eq!(first.status, MessageStatus::Unread);

    repo.update_message_status(first.id, MessageStatus::Read)
        .await
        .unwrap()
        .unwrap();

    let filter = MessageFilter {
        status: Some(MessageStatus::Unread),
        message_type: Some(MessageType::Volunteer),
        limit: None,
        offset: 0,
    };
    let unread = repo.list_messages(&filter).await.unwrap();
    assert!(unread.iter().any(|m| m.id == second.id));
    assert!(unread.iter().all(|m| m.id != first.id));
    assert_eq!(repo.count_messages(&filter).await.unwrap(), unread.len() as i64);

    assert!(repo.delete_message(first.id).await.unwrap());
    assert!(!repo.delete_message(first.id).await.unwrap());
}

#[test]
#[ignore]
async fn test_blog_slug_conflict_and_publication_stamp() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let slug = unique_slug("post");

    let post = repo
        .insert_blog_post(NewBlogPost {
            title: "Draft".to_string(),
            slug: slug.clone(),
            excerpt: None,
            content: "Body".to_string(),
            image: None,
            category: None,
            status: BlogStatus::Draft,
            published_at: None,
        })
        .await
        .unwrap();
    assert!(post.published_at.is_none());

    let duplicate = repo
        .insert_blog_post(NewBlogPost {
            title: "Again".to_string(),
            slug: slug.clone(),
            excerpt: None,
            content: String::new(),
            image: None,
            category: None,
            status: BlogStatus::Draft,
            published_at: None,
        })
        .await;
    assert!(matches!(duplicate, Err(RepositoryError::Conflict(_))));

    let published = repo
        .update_blog_post(
            post.id,
            UpdateBlogPostRequest {
                status: Some(BlogStatus::Published),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert!(published.published_at.is_some());
    assert_eq!(published.title, "Draft");

    let listed = repo
        .list_blog_posts(Some(BlogStatus::Published), Some(slug.clone()))
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);

    assert!(repo.delete_blog_post(post.id).await.unwrap());
}

#[test]
#[ignore]
async fn test_project_gallery_is_replaced() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let slug = unique_slug("project");

    let image = |url: &str| ProjectImageInput {
        image_url: url.to_string(),
        alt_text: None,
    };

    let project = repo
        .insert_project(NewProject {
            slug: slug.clone(),
            title: "Wells".to_string(),
            excerpt: None,
            image: None,
            categories: vec!["water".to_string()],
            start_date: None,
            location: Some("Kisumu".to_string()),
            people_helped: 40,
            status: ProjectStatus::Planned,
            content: None,
            goals: vec![],
            images: vec![image("https://cdn.test/a.jpg"), image("https://cdn.test/b.jpg")],
        })
        .await
        .unwrap();
    assert_eq!(project.images.len(), 2);
    assert_eq!(project.images[0].image_url, "https://cdn.test/a.jpg");

    let updated = repo
        .update_project(
            project.id,
            UpdateProjectRequest {
                images: Some(vec![image("https://cdn.test/c.jpg")]),
                status: Some(ProjectStatus::Ongoing),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.images.len(), 1);
    assert_eq!(updated.status, ProjectStatus::Ongoing);
    assert_eq!(updated.categories, vec!["water".to_string()]);

    let by_slug = repo.get_project_by_slug(&slug).await.unwrap().unwrap();
    assert_eq!(by_slug.images, updated.images);

    assert!(repo.delete_project(project.id).await.unwrap());
    assert!(repo.get_project(project.id).await.unwrap().is_none());
}

#[test]
#[ignore]
async fn test_stats_and_ping() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    repo.ping().await.unwrap();
    insert_admin(&ctx.pool, "super_admin").await;

    let stats = repo.get_stats().await.unwrap();
    assert!(stats.total_admins >= 1);
    assert!(stats.unread_messages <= stats.total_messages);
    assert!(stats.published_blog_posts <= stats.total_blog_posts);
}
