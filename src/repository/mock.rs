use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::{RepoResult, Repository, RepositoryError};
use crate::models::{
    Admin, AdminRole, BlogPost, BlogStatus, DashboardStats, Message, MessageFilter,
    MessageStatus, NewBlogPost, NewMessage, NewProject, Project, ProjectImage,
    ProjectImageInput, UpdateBlogPostRequest, UpdateProjectRequest,
};

/// MockRepository
///
/// In-memory `Repository` used by the test suites. Mirrors the Postgres semantics that the
/// services depend on: newest-first ordering, unique slugs, publication stamping and gallery
/// replacement.
#[derive(Default)]
pub struct MockRepository {
    admins: Mutex<Vec<Admin>>,
    messages: Mutex<Vec<Message>>,
    blog_posts: Mutex<Vec<BlogPost>>,
    projects: Mutex<Vec<Project>>,
    /// Every operation returns `RepositoryError::Unavailable`.
    pub should_fail: bool,
    /// Only `touch_last_login` fails; used to check that login tolerates it.
    pub fail_last_login: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn images_from(inputs: &[ProjectImageInput]) -> Vec<ProjectImage> {
    inputs
        .iter()
        .map(|input| ProjectImage {
            id: Uuid::new_v4(),
            image_url: input.image_url.clone(),
            alt_text: input.alt_text.clone(),
        })
        .collect()
}

impl MockRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn with_admin(self, id: Uuid, email: &str, name: &str, role: AdminRole) -> Self {
        lock(&self.admins).push(Admin {
            id,
            email: email.to_string(),
            name: name.to_string(),
            role,
            last_login: None,
            created_at: Utc::now(),
        });
        self
    }

    pub fn with_message(self, message: Message) -> Self {
        lock(&self.messages).push(message);
        self
    }

    pub fn with_blog_post(self, post: BlogPost) -> Self {
        lock(&self.blog_posts).push(post);
        self
    }

    pub fn with_project(self, project: Project) -> Self {
        lock(&self.projects).push(project);
        self
    }

    /// Snapshot of the stored admin, for assertions.
    pub fn admin(&self, id: Uuid) -> Option<Admin> {
        lock(&self.admins).iter().find(|a| a.id == id).cloned()
    }

    pub fn message_count(&self) -> usize {
        lock(&self.messages).len()
    }

    fn check(&self) -> RepoResult<()> {
        if self.should_fail {
            return Err(RepositoryError::Unavailable(
                "Mock Repository Error: Simulation requested".to_string(),
            ));
        }
        Ok(())
    }

    fn matching_messages(&self, filter: &MessageFilter) -> Vec<Message> {
        let mut messages: Vec<Message> = lock(&self.messages)
            .iter()
            .filter(|m| filter.status.is_none_or(|s| m.status == s))
            .filter(|m| filter.message_type.is_none_or(|t| m.message_type == t))
            .cloned()
            .collect();
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        messages
    }
}

#[async_trait]
impl Repository for MockRepository {
    async fn get_admin(&self, id: Uuid) -> RepoResult<Option<Admin>> {
        self.check()?;
        Ok(self.admin(id))
    }

    async fn touch_last_login(&self, id: Uuid, at: DateTime<Utc>) -> RepoResult<()> {
        self.check()?;
        if self.fail_last_login {
            return Err(RepositoryError::Unavailable("last_login write failed".to_string()));
        }
        if let Some(admin) = lock(&self.admins).iter_mut().find(|a| a.id == id) {
            admin.last_login = Some(at);
        }
        Ok(())
    }

    async fn list_admins(&self, search: Option<String>) -> RepoResult<Vec<Admin>> {
        self.check()?;
        let needle = search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let mut admins: Vec<Admin> = lock(&self.admins)
            .iter()
            .filter(|a| match &needle {
                Some(n) => {
                    a.email.to_lowercase().contains(n)
                        || a.name.to_lowercase().contains(n)
                        || a.role.as_str().contains(n.as_str())
                }
                None => true,
            })
            .cloned()
            .collect();
        admins.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(admins)
    }

    async fn update_admin(
        &self,
        id: Uuid,
        name: Option<String>,
        role: Option<AdminRole>,
    ) -> RepoResult<Option<Admin>> {
        self.check()?;
        let mut admins = lock(&self.admins);
        let Some(admin) = admins.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };
        if let Some(name) = name {
            admin.name = name;
        }
        if let Some(role) = role {
            admin.role = role;
        }
        Ok(Some(admin.clone()))
    }

    async fn insert_message(&self, message: NewMessage) -> RepoResult<Message> {
        self.check()?;
        let stored = Message {
            id: Uuid::new_v4(),
            first_name: message.first_name,
            last_name: message.last_name,
            email: message.email,
            phone: message.phone,
            subject: message.subject,
            project: message.project,
            message: message.message,
            message_type: message.message_type,
            status: message.status,
            created_at: Utc::now(),
        };
        // Front insertion keeps the newest first when timestamps tie.
        lock(&self.messages).insert(0, stored.clone());
        Ok(stored)
    }

    async fn list_messages(&self, filter: &MessageFilter) -> RepoResult<Vec<Message>> {
        self.check()?;
        let offset = usize::try_from(filter.offset).unwrap_or(0);
        let iter = self.matching_messages(filter).into_iter().skip(offset);

        Ok(match filter.limit {
            Some(limit) => iter.take(usize::try_from(limit).unwrap_or(0)).collect(),
            None => iter.collect(),
        })
    }

    async fn count_messages(&self, filter: &MessageFilter) -> RepoResult<i64> {
        self.check()?;
        Ok(self.matching_messages(filter).len() as i64)
    }

    async fn get_message(&self, id: Uuid) -> RepoResult<Option<Message>> {
        self.check()?;
        Ok(lock(&self.messages).iter().find(|m| m.id == id).cloned())
    }

    async fn update_message_status(
        &self,
        id: Uuid,
        status: MessageStatus,
    ) -> RepoResult<Option<Message>> {
        self.check()?;
        let mut messages = lock(&self.messages);
        Ok(messages.iter_mut().find(|m| m.id == id).map(|m| {
            m.status = status;
            m.clone()
        }))
    }

    async fn delete_message(&self, id: Uuid) -> RepoResult<bool> {
        self.check()?;
        let mut messages = lock(&self.messages);
        let before = messages.len();
        messages.retain(|m| m.id != id);
        Ok(messages.len() < before)
    }

    async fn list_blog_posts(
        &self,
        status: Option<BlogStatus>,
        search: Option<String>,
    ) -> RepoResult<Vec<BlogPost>> {
        self.check()?;
        let needle = search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let mut posts: Vec<BlogPost> = lock(&self.blog_posts)
            .iter()
            .filter(|p| status.is_none_or(|s| p.status == s))
            .filter(|p| {
                needle.as_ref().is_none_or(|n| {
                    p.title.to_lowercase().contains(n.as_str()) || p.slug.contains(n.as_str())
                })
            })
            .cloned()
            .collect();
        posts.sort_by_key(|p| std::cmp::Reverse(p.published_at.unwrap_or(p.created_at)));
        Ok(posts)
    }

    async fn get_blog_post(&self, id: Uuid) -> RepoResult<Option<BlogPost>> {
        self.check()?;
        Ok(lock(&self.blog_posts).iter().find(|p| p.id == id).cloned())
    }

    async fn get_blog_post_by_slug(&self, slug: &str) -> RepoResult<Option<BlogPost>> {
        self.check()?;
        Ok(lock(&self.blog_posts).iter().find(|p| p.slug == slug).cloned())
    }

    async fn insert_blog_post(&self, post: NewBlogPost) -> RepoResult<BlogPost> {
        self.check()?;
        let mut posts = lock(&self.blog_posts);
        if posts.iter().any(|p| p.slug == post.slug) {
            return Err(RepositoryError::Conflict("blog_posts_slug_key".to_string()));
        }
        let now = Utc::now();
        let stored = BlogPost {
            id: Uuid::new_v4(),
            title: post.title,
            slug: post.slug,
            excerpt: post.excerpt,
            content: post.content,
            image: post.image,
            category: post.category,
            status: post.status,
            published_at: post.published_at,
            created_at: now,
            updated_at: now,
        };
        posts.push(stored.clone());
        Ok(stored)
    }

    async fn update_blog_post(
        &self,
        id: Uuid,
        changes: UpdateBlogPostRequest,
    ) -> RepoResult<Option<BlogPost>> {
        self.check()?;
        let mut posts = lock(&self.blog_posts);
        if let Some(slug) = &changes.slug {
            if posts.iter().any(|p| p.id != id && &p.slug == slug) {
                return Err(RepositoryError::Conflict("blog_posts_slug_key".to_string()));
            }
        }
        let Some(post) = posts.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };

        if let Some(title) = changes.title {
            post.title = title;
        }
        if let Some(slug) = changes.slug {
            post.slug = slug;
        }
        if changes.excerpt.is_some() {
            post.excerpt = changes.excerpt;
        }
        if let Some(content) = changes.content {
            post.content = content;
        }
        if changes.image.is_some() {
            post.image = changes.image;
        }
        if changes.category.is_some() {
            post.category = changes.category;
        }
        if let Some(status) = changes.status {
            post.status = status;
        }
        let now = Utc::now();
        if post.status == BlogStatus::Published && post.published_at.is_none() {
            post.published_at = Some(now);
        }
        post.updated_at = now;
        Ok(Some(post.clone()))
    }

    async fn delete_blog_post(&self, id: Uuid) -> RepoResult<bool> {
        self.check()?;
        let mut posts = lock(&self.blog_posts);
        let before = posts.len();
        posts.retain(|p| p.id != id);
        Ok(posts.len() < before)
    }

    async fn list_projects(&self) -> RepoResult<Vec<Project>> {
        self.check()?;
        let mut projects = lock(&self.projects).clone();
        projects.sort_by_key(|p| std::cmp::Reverse(p.created_at));
        Ok(projects)
    }

    async fn get_project(&self, id: Uuid) -> RepoResult<Option<Project>> {
        self.check()?;
        Ok(lock(&self.projects).iter().find(|p| p.id == id).cloned())
    }

    async fn get_project_by_slug(&self, slug: &str) -> RepoResult<Option<Project>> {
        self.check()?;
        Ok(lock(&self.projects).iter().find(|p| p.slug == slug).cloned())
    }

    async fn insert_project(&self, project: NewProject) -> RepoResult<Project> {
        self.check()?;
        let mut projects = lock(&self.projects);
        if projects.iter().any(|p| p.slug == project.slug) {
            return Err(RepositoryError::Conflict("projects_slug_key".to_string()));
        }
        let now = Utc::now();
        let stored = Project {
            id: Uuid::new_v4(),
            images: images_from(&project.images),
            slug: project.slug,
            title: project.title,
            excerpt: project.excerpt,
            image: project.image,
            categories: project.categories,
            start_date: project.start_date,
            location: project.location,
            people_helped: project.people_helped,
            status: project.status,
            content: project.content,
            goals: project.goals,
            created_at: now,
            updated_at: now,
        };
        projects.push(stored.clone());
        Ok(stored)
    }

    async fn update_project(
        &self,
        id: Uuid,
        changes: UpdateProjectRequest,
    ) -> RepoResult<Option<Project>> {
        self.check()?;
        let mut projects = lock(&self.projects);
        if let Some(slug) = &changes.slug {
            if projects.iter().any(|p| p.id != id && &p.slug == slug) {
                return Err(RepositoryError::Conflict("projects_slug_key".to_string()));
            }
        }
        let Some(project) = projects.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };

        if let Some(title) = changes.title {
            project.title = title;
        }
        if let Some(slug) = changes.slug {
            project.slug = slug;
        }
        if changes.excerpt.is_some() {
            project.excerpt = changes.excerpt;
        }
        if changes.image.is_some() {
            project.image = changes.image;
        }
        if let Some(categories) = changes.categories {
            project.categories = categories;
        }
        if changes.start_date.is_some() {
            project.start_date = changes.start_date;
        }
        if changes.location.is_some() {
            project.location = changes.location;
        }
        if let Some(people_helped) = changes.people_helped {
            project.people_helped = people_helped;
        }
        if let Some(status) = changes.status {
            project.status = status;
        }
        if changes.content.is_some() {
            project.content = changes.content;
        }
        if let Some(goals) = changes.goals {
            project.goals = goals;
        }
        if let Some(images) = &changes.images {
            project.images = images_from(images);
        }
        project.updated_at = Utc::now();
        Ok(Some(project.clone()))
    }

    async fn delete_project(&self, id: Uuid) -> RepoResult<bool> {
        self.check()?;
        let mut projects = lock(&self.projects);
        let before = projects.len();
        projects.retain(|p| p.id != id);
        Ok(projects.len() < before)
    }

    async fn get_stats(&self) -> RepoResult<DashboardStats> {
        self.check()?;
        let messages = lock(&self.messages);
        let posts = lock(&self.blog_posts);

        Ok(DashboardStats {
            total_messages: messages.len() as i64,
            unread_messages: messages
                .iter()
                .filter(|m| m.status == MessageStatus::Unread)
                .count() as i64,
            total_blog_posts: posts.len() as i64,
            published_blog_posts: posts
                .iter()
                .filter(|p| p.status == BlogStatus::Published)
                .count() as i64,
            total_projects: lock(&self.projects).len() as i64,
            total_admins: lock(&self.admins).len() as i64,
        })
    }

    async fn ping(&self) -> RepoResult<()> {
        self.check()
    }
}
