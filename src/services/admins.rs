use uuid::Uuid;

use crate::{
    error::AppError,
    guard::{ADMIN_ROLES, require_role},
    identity::Principal,
    models::{Admin, UpdateAdminRequest},
    repository::Repository,
};

pub async fn list_admins(
    repo: &dyn Repository,
    principal: &Principal,
    search: Option<String>,
) -> Result<Vec<Admin>, AppError> {
    require_role(repo, principal, ADMIN_ROLES).await?;

    repo.list_admins(search)
        .await
        .map_err(|e| AppError::operation("Failed to fetch admins", e))
}

/// update_admin
///
/// Renames an admin and/or changes their role. Callers may rename themselves but never change
/// their own role.
pub async fn update_admin(
    repo: &dyn Repository,
    principal: &Principal,
    id: Uuid,
    request: UpdateAdminRequest,
) -> Result<Admin, AppError> {
    let caller = require_role(repo, principal, ADMIN_ROLES).await?;

    let name = match request.name {
        Some(name) if name.trim().is_empty() => {
            return Err(AppError::validation("Name must not be empty"));
        }
        Some(name) => Some(name.trim().to_string()),
        None => None,
    };

    if caller.id == id && request.role.is_some_and(|r| r != caller.role) {
        return Err(AppError::validation("You cannot change your own role"));
    }

    let updated = repo
        .update_admin(id, name, request.role)
        .await
        .map_err(|e| AppError::operation("Failed to update admin", e))?
        .ok_or_else(|| AppError::NotFound("Admin not found".to_string()))?;

    tracing::info!(admin_id = %updated.id, role = %updated.role, by = %caller.id, "admin updated");
    Ok(updated)
}
