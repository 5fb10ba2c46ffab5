use chrono::Utc;
use regex::Regex;
use std::sync::LazyLock;
use uuid::Uuid;

use crate::{
    error::AppError,
    guard::{CONTENT_ROLES, require_role},
    identity::Principal,
    models::{
        BlogPost, BlogPostQuery, BlogStatus, CreateBlogPostRequest, CreateProjectRequest,
        NewBlogPost, NewProject, Project, ProjectImageInput, StatusMessage,
        UpdateBlogPostRequest, UpdateProjectRequest,
    },
    repository::{Repository, RepositoryError},
};

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9-]+$").expect("Invalid regex"));

/// slugify
///
/// Lower-cases the title and collapses every run of other characters into a single `-`:
/// `"Clean Water: Phase 2"` becomes `"clean-water-phase-2"`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_RE.is_match(slug)
}

/// Uses the explicit slug when given (it must already be well-formed), otherwise derives one
/// from the title.
fn resolve_slug(explicit: Option<String>, title: &str) -> Result<String, AppError> {
    match explicit.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) {
        Some(slug) => check_slug(slug),
        None => {
            let slug = slugify(title);
            if slug.is_empty() {
                return Err(AppError::validation("Slug could not be derived from title"));
            }
            Ok(slug)
        }
    }
}

fn check_slug(slug: String) -> Result<String, AppError> {
    if is_valid_slug(&slug) {
        Ok(slug)
    } else {
        Err(AppError::validation(
            "Slug may only contain lowercase letters, digits and hyphens",
        ))
    }
}

fn required_title(title: &str) -> Result<String, AppError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::validation("Title is required"));
    }
    Ok(title.to_string())
}

fn check_images(images: &[ProjectImageInput]) -> Result<(), AppError> {
    if images.iter().any(|i| i.image_url.trim().is_empty()) {
        return Err(AppError::validation("Image URL is required"));
    }
    Ok(())
}

/// Maps a failed write, turning unique-constraint violations into `Conflict`.
fn write_error(err: RepositoryError, message: &'static str) -> AppError {
    match err {
        RepositoryError::Conflict(_) => AppError::Conflict("Slug already in use".to_string()),
        other => AppError::operation(message, other),
    }
}

fn post_not_found() -> AppError {
    AppError::NotFound("Blog post not found".to_string())
}

fn project_not_found() -> AppError {
    AppError::NotFound("Project not found".to_string())
}

// --- Public reads ---

pub async fn published_posts(repo: &dyn Repository) -> Result<Vec<BlogPost>, AppError> {
    repo.list_blog_posts(Some(BlogStatus::Published), None)
        .await
        .map_err(|e| AppError::operation("Failed to fetch blog posts", e))
}

/// Drafts and archived posts are invisible to the public: they resolve as not found.
pub async fn published_post(repo: &dyn Repository, slug: &str) -> Result<BlogPost, AppError> {
    repo.get_blog_post_by_slug(slug)
        .await
        .map_err(|e| AppError::operation("Failed to fetch blog post", e))?
        .filter(|p| p.status == BlogStatus::Published)
        .ok_or_else(post_not_found)
}

pub async fn projects(repo: &dyn Repository) -> Result<Vec<Project>, AppError> {
    repo.list_projects()
        .await
        .map_err(|e| AppError::operation("Failed to fetch projects", e))
}

pub async fn project_by_slug(repo: &dyn Repository, slug: &str) -> Result<Project, AppError> {
    repo.get_project_by_slug(slug)
        .await
        .map_err(|e| AppError::operation("Failed to fetch project", e))?
        .ok_or_else(project_not_found)
}

// --- Blog post management ---

pub async fn list_posts(
    repo: &dyn Repository,
    principal: &Principal,
    query: BlogPostQuery,
) -> Result<Vec<BlogPost>, AppError> {
    require_role(repo, principal, CONTENT_ROLES).await?;

    let status = query
        .status
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<BlogStatus>())
        .transpose()
        .map_err(|_| AppError::validation("Invalid status"))?;

    repo.list_blog_posts(status, query.search)
        .await
        .map_err(|e| AppError::operation("Failed to fetch blog posts", e))
}

/// create_post
///
/// Creates a post; publishing on creation stamps `published_at` with the current time.
pub async fn create_post(
    repo: &dyn Repository,
    principal: &Principal,
    request: CreateBlogPostRequest,
) -> Result<BlogPost, AppError> {
    let admin = require_role(repo, principal, CONTENT_ROLES).await?;

    let title = required_title(&request.title)?;
    let slug = resolve_slug(request.slug, &title)?;
    let status = request.status.unwrap_or_default();

    let post = repo
        .insert_blog_post(NewBlogPost {
            title,
            slug,
            excerpt: request.excerpt,
            content: request.content,
            image: request.image,
            category: request.category,
            status,
            published_at: (status == BlogStatus::Published).then(Utc::now),
        })
        .await
        .map_err(|e| write_error(e, "Failed to create blog post"))?;

    tracing::info!(post_id = %post.id, slug = %post.slug, admin_id = %admin.id, "blog post created");
    Ok(post)
}

pub async fn update_post(
    repo: &dyn Repository,
    principal: &Principal,
    id: Uuid,
    mut changes: UpdateBlogPostRequest,
) -> Result<BlogPost, AppError> {
    require_role(repo, principal, CONTENT_ROLES).await?;

    if let Some(title) = changes.title.take() {
        changes.title = Some(required_title(&title)?);
    }
    if let Some(slug) = changes.slug.take() {
        changes.slug = Some(check_slug(slug.trim().to_string())?);
    }

    repo.update_blog_post(id, changes)
        .await
        .map_err(|e| write_error(e, "Failed to update blog post"))?
        .ok_or_else(post_not_found)
}

pub async fn delete_post(
    repo: &dyn Repository,
    principal: &Principal,
    id: Uuid,
) -> Result<StatusMessage, AppError> {
    let admin = require_role(repo, principal, CONTENT_ROLES).await?;

    let deleted = repo
        .delete_blog_post(id)
        .await
        .map_err(|e| AppError::operation("Failed to delete blog post", e))?;
    if !deleted {
        return Err(post_not_found());
    }

    tracing::info!(post_id = %id, admin_id = %admin.id, "blog post deleted");
    Ok(StatusMessage::new("Blog post deleted successfully"))
}

// --- Project management ---

pub async fn list_projects(
    repo: &dyn Repository,
    principal: &Principal,
) -> Result<Vec<Project>, AppError> {
    require_role(repo, principal, CONTENT_ROLES).await?;
    projects(repo).await
}

pub async fn create_project(
    repo: &dyn Repository,
    principal: &Principal,
    request: CreateProjectRequest,
) -> Result<Project, AppError> {
    let admin = require_role(repo, principal, CONTENT_ROLES).await?;

    let title = required_title(&request.title)?;
    let slug = resolve_slug(request.slug, &title)?;
    if request.people_helped < 0 {
        return Err(AppError::validation("people_helped must not be negative"));
    }
    check_images(&request.images)?;

    let project = repo
        .insert_project(NewProject {
            slug,
            title,
            excerpt: request.excerpt,
            image: request.image,
            categories: request.categories,
            start_date: request.start_date,
            location: request.location,
            people_helped: request.people_helped,
            status: request.status.unwrap_or_default(),
            content: request.content,
            goals: request.goals,
            images: request.images,
        })
        .await
        .map_err(|e| write_error(e, "Failed to create project"))?;

    tracing::info!(project_id = %project.id, slug = %project.slug, admin_id = %admin.id, "project created");
    Ok(project)
}

pub async fn update_project(
    repo: &dyn Repository,
    principal: &Principal,
    id: Uuid,
    mut changes: UpdateProjectRequest,
) -> Result<Project, AppError> {
    require_role(repo, principal, CONTENT_ROLES).await?;

    if let Some(title) = changes.title.take() {
        changes.title = Some(required_title(&title)?);
    }
    if let Some(slug) = changes.slug.take() {
        changes.slug = Some(check_slug(slug.trim().to_string())?);
    }
    if changes.people_helped.is_some_and(|n| n < 0) {
        return Err(AppError::validation("people_helped must not be negative"));
    }
    if let Some(images) = &changes.images {
        check_images(images)?;
    }

    repo.update_project(id, changes)
        .await
        .map_err(|e| write_error(e, "Failed to update project"))?
        .ok_or_else(project_not_found)
}

pub async fn delete_project(
    repo: &dyn Repository,
    principal: &Principal,
    id: Uuid,
) -> Result<StatusMessage, AppError> {
    let admin = require_role(repo, principal, CONTENT_ROLES).await?;

    let deleted = repo
        .delete_project(id)
        .await
        .map_err(|e| AppError::operation("Failed to delete project", e))?;
    if !deleted {
        return Err(project_not_found());
    }

    tracing::info!(project_id = %id, admin_id = %admin.id, "project deleted");
    Ok(StatusMessage::new("Project deleted successfully"))
}
