use bitflags::bitflags;
use failure::Fail;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, iter::FromIterator, sync::Arc};

bitflags! {
    /// Capabilities allow for a fine-grained control over which lifecycle
    /// actions a given actor can take.
    pub struct Capabilities: u32 {
        /// Capability holder can review submitted documents.
        const REVIEW = 0x0000_0001;
        /// Capability holder can give final approval to reviewed documents.
        const APPROVE = 0x0000_0002;
        /// Capability holder is an administrator. Administrators are not bound
        /// by department restrictions when reviewing.
        const ADMIN = 0x0000_0004;
        /// Capability holder heads their department. Documents they submit
        /// skip the review stage.
        const DEPARTMENT_HEAD = 0x0000_0008;
    }
}

impl Capabilities {
    /// Verify that all required capabilities are present.
    ///
    /// This is the same check as `self.contains(capabilities)`, but returns
    /// a [`DomainError`](crate::error::DomainError).
    pub fn require(&self, capabilities: Capabilities)
    -> Result<(), RequireCapabilitiesError> {
        if self.contains(capabilities) {
            Ok(())
        } else {
            Err(RequireCapabilitiesError(capabilities - *self))
        }
    }
}

#[derive(Debug, DomainError, Fail)]
#[domain(kind = "Permission", code = "actor:insufficient-capabilities")]
#[fail(display = "Missing required capabilities: {:?}", _0)]
pub struct RequireCapabilitiesError(pub Capabilities);

/// Organisational role of an actor.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Top-level authority. Can review and approve anything.
    Admin,
    /// Middle management. Can review.
    Manager,
    /// Regular staff.
    User,
}

impl Role {
    pub fn capabilities(self) -> Capabilities {
        match self {
            Role::Admin => Capabilities::REVIEW | Capabilities::APPROVE
                | Capabilities::ADMIN,
            Role::Manager => Capabilities::REVIEW,
            Role::User => Capabilities::empty(),
        }
    }
}

/// Everything the lifecycle needs to know about an actor.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ActorProfile {
    pub id: i32,
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub department_head: bool,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl ActorProfile {
    /// Get set of capabilities this actor holds.
    ///
    /// Department heads are always at least managers.
    pub fn capabilities(&self) -> Capabilities {
        let mut caps = self.role.capabilities();
        if self.department_head {
            caps |= Capabilities::DEPARTMENT_HEAD | Capabilities::REVIEW;
        }
        caps
    }

    pub fn is_admin(&self) -> bool {
        self.capabilities().contains(Capabilities::ADMIN)
    }

    /// Do both actors belong to the same department?
    ///
    /// Actors without a department belong to no department, not to
    /// a shared one.
    pub fn same_department(&self, other: &ActorProfile) -> bool {
        match (&self.department, &other.department) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// Source of actor profiles.
///
/// User and role management lives outside of this crate, which only consults
/// it through this trait.
pub trait Directory: Send + Sync {
    /// Look up an actor by ID.
    fn profile(&self, id: i32) -> Option<ActorProfile>;

    /// Find all active actors holding all of `capabilities`.
    fn holders(&self, capabilities: Capabilities) -> Vec<ActorProfile>;
}

impl<D: Directory + ?Sized> Directory for Arc<D> {
    fn profile(&self, id: i32) -> Option<ActorProfile> {
        (**self).profile(id)
    }

    fn holders(&self, capabilities: Capabilities) -> Vec<ActorProfile> {
        (**self).holders(capabilities)
    }
}

/// Look up an actor who is about to take an action.
pub fn resolve<D>(directory: &D, id: i32) -> Result<ActorProfile, ActorError>
where
    D: Directory + ?Sized,
{
    let profile = directory.profile(id).ok_or(ActorError::NotFound(id))?;

    if !profile.active {
        return Err(ActorError::Inactive(id));
    }

    Ok(profile)
}

#[derive(Debug, DomainError, Fail)]
pub enum ActorError {
    /// Directory has no such actor.
    #[fail(display = "No such actor: {}", _0)]
    #[domain(kind = "NotFound", code = "actor:not-found")]
    NotFound(i32),
    /// Actor's account was deactivated.
    #[fail(display = "Actor {} is inactive", _0)]
    #[domain(kind = "Permission", code = "actor:inactive")]
    Inactive(i32),
}

/// Directory with a fixed list of actors, as configured in `config.toml`.
#[derive(Clone, Debug, Default)]
pub struct StaticDirectory {
    actors: BTreeMap<i32, ActorProfile>,
}

impl StaticDirectory {
    pub fn new() -> StaticDirectory {
        StaticDirectory::default()
    }

    /// Add or replace an actor.
    pub fn insert(&mut self, profile: ActorProfile) {
        self.actors.insert(profile.id, profile);
    }

    /// Find an actor by name.
    pub fn by_name(&self, name: &str) -> Option<&ActorProfile> {
        self.actors.values().find(|actor| actor.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActorProfile> {
        self.actors.values()
    }
}

impl FromIterator<ActorProfile> for StaticDirectory {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = ActorProfile>,
    {
        StaticDirectory {
            actors: iter.into_iter().map(|a| (a.id, a)).collect(),
        }
    }
}

impl Directory for StaticDirectory {
    fn profile(&self, id: i32) -> Option<ActorProfile> {
        self.actors.get(&id).cloned()
    }

    fn holders(&self, capabilities: Capabilities) -> Vec<ActorProfile> {
        self.actors.values()
            .filter(|actor| actor.active)
            .filter(|actor| actor.capabilities().contains(capabilities))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(id: i32, role: Role, head: bool) -> ActorProfile {
        ActorProfile {
            id,
            name: format!("actor-{}", id),
            role,
            department: Some("Quality".into()),
            department_head: head,
            active: true,
        }
    }

    #[test]
    fn department_heads_can_review() {
        let head = actor(1, Role::User, true);
        assert!(head.capabilities().contains(
            Capabilities::REVIEW | Capabilities::DEPARTMENT_HEAD));
        assert!(!head.is_admin());
    }

    #[test]
    fn require_reports_missing_capabilities() {
        let manager = actor(1, Role::Manager, false).capabilities();
        assert!(manager.require(Capabilities::REVIEW).is_ok());

        let err = manager.require(Capabilities::REVIEW | Capabilities::APPROVE)
            .unwrap_err();
        assert_eq!(err.0, Capabilities::APPROVE);
    }

    #[test]
    fn missing_department_is_never_shared() {
        let mut a = actor(1, Role::User, false);
        let mut b = actor(2, Role::User, false);
        assert!(a.same_department(&b));

        a.department = None;
        b.department = None;
        assert!(!a.same_department(&b));
    }

    #[test]
    fn inactive_actors_cannot_act() {
        let mut inactive = actor(2, Role::Admin, false);
        inactive.active = false;
        let dir: StaticDirectory = vec![actor(1, Role::Admin, false), inactive]
            .into_iter()
            .collect();

        assert!(resolve(&dir, 1).is_ok());
        assert!(matches!(resolve(&dir, 2), Err(ActorError::Inactive(2))));
        assert!(matches!(resolve(&dir, 3), Err(ActorError::NotFound(3))));
        assert_eq!(dir.holders(Capabilities::APPROVE).len(), 1);
    }
}
