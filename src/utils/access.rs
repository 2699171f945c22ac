// src/utils/access.rs

//! Ownership rules for blogs and comments.
//!
//! Pure decisions with no IO: callers load the owner ids first and turn a
//! `false` into a 403.

use crate::{error::AppError, models::user::Role};

/// An admin may mutate anything; everybody else only what they own.
pub fn can_mutate(actor_id: i64, actor_role: Role, owner_id: i64) -> bool {
    actor_role == Role::Admin || actor_id == owner_id
}

/// A comment may be removed by its author, the blog owner, or an admin.
pub fn can_delete_comment(
    actor_id: i64,
    actor_role: Role,
    blog_owner_id: i64,
    comment_author_id: i64,
) -> bool {
    actor_id == comment_author_id || can_mutate(actor_id, actor_role, blog_owner_id)
}

pub fn require_role(actor_role: Role, required: Role) -> bool {
    match required {
        Role::User => true,
        Role::Admin => actor_role == Role::Admin,
    }
}

/// `can_mutate` as a `Result`, with the 403 message naming the action.
pub fn ensure_can_mutate(
    actor_id: i64,
    actor_role: Role,
    owner_id: i64,
    action: &str,
) -> Result<(), AppError> {
    if can_mutate(actor_id, actor_role, owner_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("Not authorized to {action} this blog")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_and_admin_can_mutate() {
        assert!(can_mutate(1, Role::User, 1));
        assert!(can_mutate(2, Role::Admin, 1));
        assert!(!can_mutate(2, Role::User, 1));
    }

    #[test]
    fn comment_deletion_rights() {
        // author
        assert!(can_delete_comment(3, Role::User, 1, 3));
        // blog owner
        assert!(can_delete_comment(1, Role::User, 1, 3));
        // admin
        assert!(can_delete_comment(9, Role::Admin, 1, 3));
        // bystander
        assert!(!can_delete_comment(4, Role::User, 1, 3));
    }

    #[test]
    fn role_requirements() {
        assert!(require_role(Role::Admin, Role::Admin));
        assert!(!require_role(Role::User, Role::Admin));
        assert!(require_role(Role::User, Role::User));
    }

    #[test]
    fn ensure_reports_forbidden() {
        assert!(ensure_can_mutate(1, Role::User, 1, "edit").is_ok());
        match ensure_can_mutate(2, Role::User, 1, "delete") {
            Err(AppError::Forbidden(msg)) => assert_eq!(msg, "Not authorized to delete this blog"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
