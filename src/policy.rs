use crate::error::{PortalError, PortalResult};
use crate::models::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action<'a> {
    SubmitExperience,
    DeleteExperience,
    Like,
    AddComment,
    DeleteComment { author: &'a str },
    ViewAdminDashboard,
}

pub fn can_perform(action: Action<'_>, actor: Option<&User>) -> bool {
    let Some(user) = actor else {
        return false;
    };

    match action {
        Action::SubmitExperience | Action::Like | Action::AddComment => true,
        Action::DeleteExperience | Action::ViewAdminDashboard => user.is_admin(),
        Action::DeleteComment { author } => user.is_admin() || user.username == author,
    }
}

pub fn authorize(action: Action<'_>, actor: Option<&User>) -> PortalResult<()> {
    if can_perform(action, actor) {
        return Ok(());
    }
    match actor {
        None => Err(PortalError::Unauthorized),
        Some(_) => Err(PortalError::Forbidden),
    }
}
