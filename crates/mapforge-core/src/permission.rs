//! Authorization rules for project access.
//!
//! Pure functions over already-loaded facts; callers fetch the project's
//! access metadata and the caller's managed organisations, then ask.

use crate::user::User;

/// Access-relevant facts about a project.
#[derive(Debug, Clone)]
pub struct ProjectAccess {
    pub author_id: i64,
    pub organisation_id: Option<i64>,
    pub private: bool,
    /// User ids on the allow-list of a private project.
    pub allowed_user_ids: Vec<i64>,
}

/// May the user administer (update, delete, inspect as admin) the project?
///
/// Admins always may; otherwise the project author, or a manager of the
/// project's organisation.
pub fn can_administer(user: &User, access: &ProjectAccess, managed_org_ids: &[i64]) -> bool {
    if user.is_admin() {
        return true;
    }
    if access.author_id == user.id {
        return true;
    }
    match access.organisation_id {
        Some(org) => managed_org_ids.contains(&org),
        None => false,
    }
}

/// May the user view the project at all?
///
/// Public projects are visible to everyone. Private projects are limited
/// to admins, the author, organisation managers and allow-listed users.
pub fn can_view(user: Option<&User>, access: &ProjectAccess, managed_org_ids: &[i64]) -> bool {
    if !access.private {
        return true;
    }
    let Some(user) = user else {
        return false;
    };
    can_administer(user, access, managed_org_ids) || access.allowed_user_ids.contains(&user.id)
}

/// Gate for endpoints reserved to organisation managers.
pub fn is_org_manager(user: &User, managed_org_ids: &[i64]) -> bool {
    user.is_admin() || !managed_org_ids.is_empty()
}
