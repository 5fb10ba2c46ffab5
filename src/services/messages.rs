use regex::Regex;
use std::sync::LazyLock;
use uuid::Uuid;

use crate::{
    error::AppError,
    guard::{MESSAGE_ROLES, require_role},
    identity::Principal,
    models::{
        CreateMessageRequest, Message, MessageFilter, MessageList, MessageQuery, MessageStatus,
        MessageType, NewMessage, StatusMessage, UpdateMessageRequest,
    },
    repository::Repository,
};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid regex"));

/// Splits a full name at the first whitespace run: `"John Ronald Doe"` becomes
/// `("John", "Ronald Doe")`. The last name may be empty.
pub fn split_name(name: &str) -> (String, String) {
    match name.trim().split_once(char::is_whitespace) {
        Some((first, rest)) => (first.to_string(), rest.trim().to_string()),
        None => (name.trim().to_string(), String::new()),
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Trims an optional field; blank becomes `None`.
fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// validate_submission
///
/// Turns a raw contact-form payload into an insertable row, or the first validation error.
pub fn validate_submission(request: CreateMessageRequest) -> Result<NewMessage, AppError> {
    let (first_name, last_name) = split_name(request.name.as_deref().unwrap_or_default());
    let email = request.email.unwrap_or_default().trim().to_string();
    let message = request.message.unwrap_or_default().trim().to_string();

    if first_name.is_empty() || email.is_empty() || message.is_empty() {
        return Err(AppError::validation("Name, email, and message are required"));
    }

    if !is_valid_email(&email) {
        return Err(AppError::validation("Invalid email format"));
    }

    let message_type = optional(request.message_type)
        .map(|t| t.parse::<MessageType>())
        .transpose()
        .map_err(|e| AppError::validation(format!("Invalid message type: {}", e.value)))?
        .unwrap_or_default();

    Ok(NewMessage {
        first_name,
        last_name,
        email,
        phone: optional(request.phone),
        subject: optional(request.subject),
        project: optional(request.project),
        message,
        message_type,
        status: MessageStatus::Unread,
    })
}

/// parse_filter
///
/// Validates the list query: known status/type values, `offset >= 0`, `limit > 0`.
pub fn parse_filter(query: MessageQuery) -> Result<MessageFilter, AppError> {
    let status = optional(query.status)
        .map(|s| s.parse::<MessageStatus>())
        .transpose()
        .map_err(|_| AppError::validation("Invalid status"))?;

    let message_type = optional(query.message_type)
        .map(|t| t.parse::<MessageType>())
        .transpose()
        .map_err(|e| AppError::validation(format!("Invalid message type: {}", e.value)))?;

    let offset = query.offset.unwrap_or(0);
    if offset < 0 {
        return Err(AppError::validation("Offset must not be negative"));
    }
    if query.limit.is_some_and(|l| l <= 0) {
        return Err(AppError::validation("Limit must be positive"));
    }

    Ok(MessageFilter {
        status,
        message_type,
        limit: query.limit,
        offset,
    })
}

/// create_message
///
/// [Public] Stores a contact-form submission as `unread`.
pub async fn create_message(
    repo: &dyn Repository,
    request: CreateMessageRequest,
) -> Result<Message, AppError> {
    let new_message = validate_submission(request)?;

    let message = repo
        .insert_message(new_message)
        .await
        .map_err(|e| AppError::operation("Failed to create message", e))?;

    tracing::info!(message_id = %message.id, kind = %message.message_type, "message received");
    Ok(message)
}

pub async fn list_messages(
    repo: &dyn Repository,
    principal: &Principal,
    query: MessageQuery,
) -> Result<MessageList, AppError> {
    require_role(repo, principal, MESSAGE_ROLES).await?;
    let filter = parse_filter(query)?;

    let messages = repo
        .list_messages(&filter)
        .await
        .map_err(|e| AppError::operation("Failed to fetch messages", e))?;
    let total = repo
        .count_messages(&filter)
        .await
        .map_err(|e| AppError::operation("Failed to fetch messages", e))?;

    Ok(MessageList { messages, total })
}

pub async fn get_message(
    repo: &dyn Repository,
    principal: &Principal,
    id: Uuid,
) -> Result<Message, AppError> {
    require_role(repo, principal, MESSAGE_ROLES).await?;

    repo.get_message(id)
        .await
        .map_err(|e| AppError::operation("Failed to fetch message", e))?
        .ok_or_else(|| AppError::NotFound("Message not found".to_string()))
}

/// update_message
///
/// Only the moderation status can change.
pub async fn update_message(
    repo: &dyn Repository,
    principal: &Principal,
    id: Uuid,
    request: UpdateMessageRequest,
) -> Result<Message, AppError> {
    let admin = require_role(repo, principal, MESSAGE_ROLES).await?;

    let status = optional(request.status)
        .ok_or_else(|| AppError::validation("Status is required"))?
        .parse::<MessageStatus>()
        .map_err(|_| AppError::validation("Invalid status"))?;

    let message = repo
        .update_message_status(id, status)
        .await
        .map_err(|e| AppError::operation("Failed to update message", e))?
        .ok_or_else(|| AppError::NotFound("Message not found".to_string()))?;

    tracing::info!(message_id = %id, %status, admin_id = %admin.id, "message status updated");
    Ok(message)
}

pub async fn delete_message(
    repo: &dyn Repository,
    principal: &Principal,
    id: Uuid,
) -> Result<StatusMessage, AppError> {
    let admin = require_role(repo, principal, MESSAGE_ROLES).await?;

    let deleted = repo
        .delete_message(id)
        .await
        .map_err(|e| AppError::operation("Failed to delete message", e))?;
    if !deleted {
        return Err(AppError::NotFound("Message not found".to_string()));
    }

    tracing::info!(message_id = %id, admin_id = %admin.id, "message deleted");
    Ok(StatusMessage::new("Message deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_splits_at_first_whitespace() {
        assert_eq!(split_name("John Doe"), ("John".into(), "Doe".into()));
        assert_eq!(
            split_name("  Mary  Ann Smith "),
            ("Mary".into(), "Ann Smith".into())
        );
        assert_eq!(split_name("Cher"), ("Cher".into(), String::new()));
        assert_eq!(split_name("   "), (String::new(), String::new()));
    }

    #[test]
    fn email_pattern() {
        assert!(is_valid_email("john@x.com"));
        assert!(!is_valid_email("bad-email"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.org"));
    }

    #[test]
    fn blank_optionals_become_none() {
        let new_message = validate_submission(CreateMessageRequest {
            name: Some("Ada Lovelace".into()),
            email: Some("ada@example.org".into()),
            phone: Some("   ".into()),
            subject: Some("".into()),
            message: Some("Hello".into()),
            message_type: Some("volunteer".into()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(new_message.phone, None);
        assert_eq!(new_message.subject, None);
        assert_eq!(new_message.message_type, MessageType::Volunteer);
        assert_eq!(new_message.status, MessageStatus::Unread);
    }

    #[test]
    fn filter_rejects_bad_pagination() {
        let query = |limit, offset| MessageQuery {
            limit,
            offset,
            ..Default::default()
        };
        assert!(parse_filter(query(Some(0), None)).is_err());
        assert!(parse_filter(query(None, Some(-1))).is_err());

        let filter = parse_filter(query(Some(10), Some(20))).unwrap();
        assert_eq!(filter.limit, Some(10));
        assert_eq!(filter.offset, 20);
    }
}
