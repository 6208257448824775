//! The acting user and what they may see.

use crate::backend::{rows_as, Backend, Profile, Query, Role};

/// Which rows a request may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visibility {
    /// Every project and memory.
    All,
    /// Only memories assigned to this user, and the projects containing them.
    AssignedTo(String),
}

/// The user on whose behalf a request runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Option<String>,
    pub role: Option<Role>,
}

impl Actor {
    /// An actor with no user. Requests run with the service role only.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn user(user_id: impl Into<String>, role: Option<Role>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            role,
        }
    }

    /// Derive the actor from an access token.
    ///
    /// Token and profile lookups are best-effort: any failure yields a less
    /// informed actor rather than an error.
    pub fn resolve(backend: &dyn Backend, token: Option<&str>) -> Self {
        let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
            return Self::anonymous();
        };

        let user_id = match backend.user_for_token(token) {
            Ok(Some(id)) => id,
            Ok(None) => {
                log::warn!("access token was rejected; continuing without a user");
                return Self::anonymous();
            },
            Err(e) => {
                log::warn!("token lookup failed; continuing without a user: {e}");
                return Self::anonymous();
            },
        };

        let role = backend
            .select("profiles", &Query::new().select("id,role").eq("id", user_id.as_str()))
            .and_then(rows_as::<Profile>)
            .map_err(|e| log::debug!("profile lookup failed for {user_id}: {e}"))
            .ok()
            .and_then(|profiles| profiles.into_iter().next())
            .and_then(|p| p.role);

        Self::user(user_id, role)
    }

    /// Visibility for this actor.
    ///
    /// A known user without an admin/director role only sees what is assigned
    /// to them, including users whose role could not be loaded.
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        match (&self.user_id, self.role) {
            (None, _) => Visibility::All,
            (Some(_), Some(role)) if role.sees_everything() => Visibility::All,
            (Some(id), _) => Visibility::AssignedTo(id.clone()),
        }
    }
}
