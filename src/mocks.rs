//! In-memory storage backend for tests and prototyping.
//!
//! [`MemoryStore`] implements every repository trait plus the transaction
//! boundary on one cheaply-cloneable handle; clones share state. Its unit
//! of work buffers writes and applies them against a copy of the state on
//! commit, so a write sequence that fails midway leaves nothing behind and
//! rollback semantics in tests are honest.

#![allow(clippy::significant_drop_tightening)]

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::invites::{CreateInvite, Invite, InviteRepository, InviteScope, InviteStatus};
use crate::tenancy::{
    CreateOrganization, CreateOrganizationMember, CreateProject, CreateProjectMember,
    CreateWorkspace, CreateWorkspaceMember, Organization, OrganizationMember,
    OrganizationMemberRepository, OrganizationRepository, Project, ProjectMember,
    ProjectMemberRepository, ProjectRepository, Role, Transactional, UnitOfWork, Workspace,
    WorkspaceMember, WorkspaceMemberRepository, WorkspaceRepository,
};
use crate::AccessError;

pub use crate::audit::RecordingAuditSink;
pub use crate::clock::FixedClock;
pub use crate::email::RecordingEmailDispatcher;

#[derive(Default, Clone)]
struct State {
    // user_id -> account email; the store owns the user/email join
    users: HashMap<i64, String>,
    organizations: HashMap<i64, Organization>,
    workspaces: HashMap<i64, Workspace>,
    projects: HashMap<i64, Project>,
    organization_members: HashMap<i64, OrganizationMember>,
    workspace_members: HashMap<i64, WorkspaceMember>,
    project_members: HashMap<i64, ProjectMember>,
    invites: HashMap<i64, Invite>,
    next_id: i64,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn user_id_by_email(&self, email: &str) -> Option<i64> {
        self.users
            .iter()
            .find(|(_, e)| e.as_str() == email)
            .map(|(id, _)| *id)
    }

    fn insert_organization_member(
        &mut self,
        data: CreateOrganizationMember,
    ) -> Result<OrganizationMember, AccessError> {
        let exists = self.organization_members.values().any(|m| {
            m.organization_id == data.organization_id && m.user_id == data.user_id
        });
        if exists {
            return Err(AccessError::Conflict("User is already a member".to_owned()));
        }
        let member = OrganizationMember {
            id: self.next_id(),
            organization_id: data.organization_id,
            user_id: data.user_id,
            role: data.role,
            joined_at: Utc::now(),
        };
        self.organization_members.insert(member.id, member.clone());
        Ok(member)
    }

    fn insert_workspace_member(
        &mut self,
        data: CreateWorkspaceMember,
    ) -> Result<WorkspaceMember, AccessError> {
        let exists = self
            .workspace_members
            .values()
            .any(|m| m.workspace_id == data.workspace_id && m.user_id == data.user_id);
        if exists {
            return Err(AccessError::Conflict("User is already a member".to_owned()));
        }
        let member = WorkspaceMember {
            id: self.next_id(),
            workspace_id: data.workspace_id,
            user_id: data.user_id,
            role: data.role,
            joined_at: Utc::now(),
        };
        self.workspace_members.insert(member.id, member.clone());
        Ok(member)
    }

    fn insert_project_member(
        &mut self,
        data: CreateProjectMember,
    ) -> Result<ProjectMember, AccessError> {
        let exists = self
            .project_members
            .values()
            .any(|m| m.project_id == data.project_id && m.user_id == data.user_id);
        if exists {
            return Err(AccessError::Conflict("User is already a member".to_owned()));
        }
        let member = ProjectMember {
            id: self.next_id(),
            project_id: data.project_id,
            user_id: data.user_id,
            role: data.role,
            joined_at: Utc::now(),
        };
        self.project_members.insert(member.id, member.clone());
        Ok(member)
    }

    fn apply(&mut self, write: BufferedWrite) -> Result<(), AccessError> {
        match write {
            BufferedWrite::CreateOrganizationMember(data) => {
                self.insert_organization_member(data)?;
            }
            BufferedWrite::CreateWorkspaceMember(data) => {
                self.insert_workspace_member(data)?;
            }
            BufferedWrite::UpsertWorkspaceMember {
                workspace_id,
                user_id,
                role,
            } => {
                let exists = self
                    .workspace_members
                    .values()
                    .any(|m| m.workspace_id == workspace_id && m.user_id == user_id);
                if !exists {
                    self.insert_workspace_member(CreateWorkspaceMember {
                        workspace_id,
                        user_id,
                        role,
                    })?;
                }
            }
            BufferedWrite::DeleteWorkspaceMember {
                workspace_id,
                user_id,
            } => {
                self.workspace_members
                    .retain(|_, m| !(m.workspace_id == workspace_id && m.user_id == user_id));
            }
            BufferedWrite::UpdateOrganizationMemberRole {
                organization_id,
                user_id,
                role,
            } => {
                let member = self
                    .organization_members
                    .values_mut()
                    .find(|m| m.organization_id == organization_id && m.user_id == user_id)
                    .ok_or(AccessError::NotFound)?;
                member.role = role;
            }
            BufferedWrite::DeleteOrganizationMember {
                organization_id,
                user_id,
            } => {
                self.organization_members
                    .retain(|_, m| !(m.organization_id == organization_id && m.user_id == user_id));
            }
            BufferedWrite::SetInviteStatus {
                invite_id,
                status,
                accepted_at,
            } => {
                let invite = self
                    .invites
                    .get_mut(&invite_id)
                    .ok_or(AccessError::NotFound)?;
                invite.status = status;
                if accepted_at.is_some() {
                    invite.accepted_at = accepted_at;
                }
            }
        }
        Ok(())
    }
}

/// Shared in-memory implementation of every storage trait.
///
/// Clones are handles onto the same state, so a single store can be handed
/// to a resolver, several actions and the test body at once.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user account's email.
    ///
    /// The production store joins memberships against its user table; the
    /// mock needs to be told which id owns which address before
    /// `*_membership_by_email` lookups or invite flows involving that user.
    pub fn register_user(&self, user_id: i64, email: &str) {
        if let Ok(mut state) = self.state.write() {
            state.users.insert(user_id, email.to_owned());
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, AccessError> {
        self.state
            .read()
            .map_err(|_| AccessError::Internal("lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, AccessError> {
        self.state
            .write()
            .map_err(|_| AccessError::Internal("lock poisoned".into()))
    }
}

#[async_trait]
impl OrganizationRepository for MemoryStore {
    async fn create_organization(
        &self,
        data: CreateOrganization,
    ) -> Result<Organization, AccessError> {
        let mut state = self.write()?;
        if state.organizations.values().any(|o| o.slug == data.slug) {
            return Err(AccessError::Conflict("Slug is already taken".to_owned()));
        }
        if state
            .organizations
            .values()
            .any(|o| o.owner_id == data.owner_id && o.name == data.name)
        {
            return Err(AccessError::Conflict(
                "An organization with this name already exists".to_owned(),
            ));
        }

        let now = Utc::now();
        let org = Organization {
            id: state.next_id(),
            name: data.name,
            slug: data.slug,
            owner_id: data.owner_id,
            contact_email: data.contact_email,
            created_at: now,
            updated_at: now,
        };
        state.organizations.insert(org.id, org.clone());
        state.insert_organization_member(CreateOrganizationMember {
            organization_id: org.id,
            user_id: org.owner_id,
            role: Role::Owner,
        })?;
        Ok(org)
    }

    async fn organization_by_id(&self, id: i64) -> Result<Option<Organization>, AccessError> {
        Ok(self.read()?.organizations.get(&id).cloned())
    }

    async fn organization_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<Organization>, AccessError> {
        Ok(self
            .read()?
            .organizations
            .values()
            .find(|o| o.slug == slug)
            .cloned())
    }

    async fn delete_organization(&self, id: i64) -> Result<(), AccessError> {
        let mut state = self.write()?;
        state.organizations.remove(&id);
        let workspace_ids: Vec<i64> = state
            .workspaces
            .values()
            .filter(|w| w.organization_id == id)
            .map(|w| w.id)
            .collect();
        let project_ids: Vec<i64> = state
            .projects
            .values()
            .filter(|p| workspace_ids.contains(&p.workspace_id))
            .map(|p| p.id)
            .collect();
        state.workspaces.retain(|_, w| w.organization_id != id);
        state
            .projects
            .retain(|_, p| !workspace_ids.contains(&p.workspace_id));
        state
            .organization_members
            .retain(|_, m| m.organization_id != id);
        state
            .workspace_members
            .retain(|_, m| !workspace_ids.contains(&m.workspace_id));
        state
            .project_members
            .retain(|_, m| !project_ids.contains(&m.project_id));
        // invites are append-only and survive target deletion
        Ok(())
    }
}

#[async_trait]
impl WorkspaceRepository for MemoryStore {
    async fn create_workspace(&self, data: CreateWorkspace) -> Result<Workspace, AccessError> {
        let mut state = self.write()?;
        if !state.organizations.contains_key(&data.organization_id) {
            return Err(AccessError::NotFound);
        }
        if state.workspaces.values().any(|w| w.slug == data.slug) {
            return Err(AccessError::Conflict("Slug is already taken".to_owned()));
        }
        if state
            .workspaces
            .values()
            .any(|w| w.organization_id == data.organization_id && w.name == data.name)
        {
            return Err(AccessError::Conflict(
                "A workspace with this name already exists in the organization".to_owned(),
            ));
        }

        let now = Utc::now();
        let workspace = Workspace {
            id: state.next_id(),
            organization_id: data.organization_id,
            name: data.name,
            slug: data.slug,
            owner_id: data.owner_id,
            created_at: now,
            updated_at: now,
        };
        state.workspaces.insert(workspace.id, workspace.clone());
        state.insert_workspace_member(CreateWorkspaceMember {
            workspace_id: workspace.id,
            user_id: workspace.owner_id,
            role: Role::Owner,
        })?;
        Ok(workspace)
    }

    async fn workspace_by_id(&self, id: i64) -> Result<Option<Workspace>, AccessError> {
        Ok(self.read()?.workspaces.get(&id).cloned())
    }

    async fn workspace_by_slug(&self, slug: &str) -> Result<Option<Workspace>, AccessError> {
        Ok(self
            .read()?
            .workspaces
            .values()
            .find(|w| w.slug == slug)
            .cloned())
    }

    async fn workspaces_in_organization(
        &self,
        organization_id: i64,
    ) -> Result<Vec<Workspace>, AccessError> {
        let mut workspaces: Vec<Workspace> = self
            .read()?
            .workspaces
            .values()
            .filter(|w| w.organization_id == organization_id)
            .cloned()
            .collect();
        workspaces.sort_by_key(|w| w.id);
        Ok(workspaces)
    }
}

#[async_trait]
impl ProjectRepository for MemoryStore {
    async fn create_project(&self, data: CreateProject) -> Result<Project, AccessError> {
        let mut state = self.write()?;
        if !state.workspaces.contains_key(&data.workspace_id) {
            return Err(AccessError::NotFound);
        }
        if state
            .projects
            .values()
            .any(|p| p.workspace_id == data.workspace_id && p.name == data.name)
        {
            return Err(AccessError::Conflict(
                "A project with this name already exists in the workspace".to_owned(),
            ));
        }

        let now = Utc::now();
        let project = Project {
            id: state.next_id(),
            workspace_id: data.workspace_id,
            name: data.name,
            nature: data.nature,
            owner_id: data.owner_id,
            created_at: now,
            updated_at: now,
        };
        state.projects.insert(project.id, project.clone());
        state.insert_project_member(CreateProjectMember {
            project_id: project.id,
            user_id: project.owner_id,
            role: Role::Owner,
        })?;
        Ok(project)
    }

    async fn project_by_id(&self, id: i64) -> Result<Option<Project>, AccessError> {
        Ok(self.read()?.projects.get(&id).cloned())
    }
}

#[async_trait]
impl OrganizationMemberRepository for MemoryStore {
    async fn add_organization_member(
        &self,
        data: CreateOrganizationMember,
    ) -> Result<OrganizationMember, AccessError> {
        self.write()?.insert_organization_member(data)
    }

    async fn organization_membership(
        &self,
        organization_id: i64,
        user_id: i64,
    ) -> Result<Option<OrganizationMember>, AccessError> {
        Ok(self
            .read()?
            .organization_members
            .values()
            .find(|m| m.organization_id == organization_id && m.user_id == user_id)
            .cloned())
    }

    async fn organization_membership_by_email(
        &self,
        organization_id: i64,
        email: &str,
    ) -> Result<Option<OrganizationMember>, AccessError> {
        let state = self.read()?;
        let Some(user_id) = state.user_id_by_email(email) else {
            return Ok(None);
        };
        Ok(state
            .organization_members
            .values()
            .find(|m| m.organization_id == organization_id && m.user_id == user_id)
            .cloned())
    }

    async fn organization_members(
        &self,
        organization_id: i64,
    ) -> Result<Vec<OrganizationMember>, AccessError> {
        let mut members: Vec<OrganizationMember> = self
            .read()?
            .organization_members
            .values()
            .filter(|m| m.organization_id == organization_id)
            .cloned()
            .collect();
        members.sort_by_key(|m| m.id);
        Ok(members)
    }
}

#[async_trait]
impl WorkspaceMemberRepository for MemoryStore {
    async fn add_workspace_member(
        &self,
        data: CreateWorkspaceMember,
    ) -> Result<WorkspaceMember, AccessError> {
        self.write()?.insert_workspace_member(data)
    }

    async fn workspace_membership(
        &self,
        workspace_id: i64,
        user_id: i64,
    ) -> Result<Option<WorkspaceMember>, AccessError> {
        Ok(self
            .read()?
            .workspace_members
            .values()
            .find(|m| m.workspace_id == workspace_id && m.user_id == user_id)
            .cloned())
    }

    async fn workspace_membership_by_email(
        &self,
        workspace_id: i64,
        email: &str,
    ) -> Result<Option<WorkspaceMember>, AccessError> {
        let state = self.read()?;
        let Some(user_id) = state.user_id_by_email(email) else {
            return Ok(None);
        };
        Ok(state
            .workspace_members
            .values()
            .find(|m| m.workspace_id == workspace_id && m.user_id == user_id)
            .cloned())
    }

    async fn workspace_members(
        &self,
        workspace_id: i64,
    ) -> Result<Vec<WorkspaceMember>, AccessError> {
        let mut members: Vec<WorkspaceMember> = self
            .read()?
            .workspace_members
            .values()
            .filter(|m| m.workspace_id == workspace_id)
            .cloned()
            .collect();
        members.sort_by_key(|m| m.id);
        Ok(members)
    }

    async fn remove_workspace_member(
        &self,
        workspace_id: i64,
        user_id: i64,
    ) -> Result<(), AccessError> {
        self.write()?
            .workspace_members
            .retain(|_, m| !(m.workspace_id == workspace_id && m.user_id == user_id));
        Ok(())
    }
}

#[async_trait]
impl ProjectMemberRepository for MemoryStore {
    async fn add_project_member(
        &self,
        data: CreateProjectMember,
    ) -> Result<ProjectMember, AccessError> {
        self.write()?.insert_project_member(data)
    }

    async fn project_membership(
        &self,
        project_id: i64,
        user_id: i64,
    ) -> Result<Option<ProjectMember>, AccessError> {
        Ok(self
            .read()?
            .project_members
            .values()
            .find(|m| m.project_id == project_id && m.user_id == user_id)
            .cloned())
    }

    async fn project_members(&self, project_id: i64) -> Result<Vec<ProjectMember>, AccessError> {
        let mut members: Vec<ProjectMember> = self
            .read()?
            .project_members
            .values()
            .filter(|m| m.project_id == project_id)
            .cloned()
            .collect();
        members.sort_by_key(|m| m.id);
        Ok(members)
    }

    async fn remove_project_member(
        &self,
        project_id: i64,
        user_id: i64,
    ) -> Result<(), AccessError> {
        self.write()?
            .project_members
            .retain(|_, m| !(m.project_id == project_id && m.user_id == user_id));
        Ok(())
    }
}

#[async_trait]
impl InviteRepository for MemoryStore {
    async fn create_invite(
        &self,
        data: CreateInvite,
        now: DateTime<Utc>,
    ) -> Result<Invite, AccessError> {
        // check-and-insert under one write lock: the atomicity the trait
        // contract demands
        let mut state = self.write()?;
        let active_exists = state.invites.values().any(|i| {
            i.scope == data.scope
                && i.target_id == data.target_id
                && i.email == data.email
                && i.is_usable_at(now)
        });
        if active_exists {
            return Err(AccessError::Conflict(
                "An active invitation already exists for this email".to_owned(),
            ));
        }

        let invite = Invite {
            id: state.next_id(),
            scope: data.scope,
            target_id: data.target_id,
            email: data.email,
            role: data.role,
            token_hash: data.token_hash,
            status: InviteStatus::Pending,
            invited_by: data.invited_by,
            expires_at: data.expires_at,
            accepted_at: None,
            created_at: now,
        };
        state.invites.insert(invite.id, invite.clone());
        Ok(invite)
    }

    async fn invite_by_id(&self, id: i64) -> Result<Option<Invite>, AccessError> {
        Ok(self.read()?.invites.get(&id).cloned())
    }

    async fn pending_invites(
        &self,
        scope: InviteScope,
        target_id: i64,
        email: &str,
    ) -> Result<Vec<Invite>, AccessError> {
        let mut invites: Vec<Invite> = self
            .read()?
            .invites
            .values()
            .filter(|i| {
                i.scope == scope
                    && i.target_id == target_id
                    && i.email == email
                    && i.status == InviteStatus::Pending
            })
            .cloned()
            .collect();
        invites.sort_by_key(|i| i.id);
        Ok(invites)
    }

    async fn invites_for_target(
        &self,
        scope: InviteScope,
        target_id: i64,
        status: Option<InviteStatus>,
    ) -> Result<Vec<Invite>, AccessError> {
        let mut invites: Vec<Invite> = self
            .read()?
            .invites
            .values()
            .filter(|i| {
                i.scope == scope
                    && i.target_id == target_id
                    && status.map_or(true, |s| i.status == s)
            })
            .cloned()
            .collect();
        invites.sort_by_key(|i| i.id);
        Ok(invites)
    }

    async fn refresh_invite_token(
        &self,
        id: i64,
        token_hash: String,
        expires_at: DateTime<Utc>,
    ) -> Result<Invite, AccessError> {
        let mut state = self.write()?;
        let invite = state.invites.get_mut(&id).ok_or(AccessError::NotFound)?;
        invite.token_hash = token_hash;
        invite.expires_at = expires_at;
        invite.status = InviteStatus::Pending;
        Ok(invite.clone())
    }

    async fn set_invite_status(
        &self,
        id: i64,
        status: InviteStatus,
        accepted_at: Option<DateTime<Utc>>,
    ) -> Result<(), AccessError> {
        let mut state = self.write()?;
        state.apply(BufferedWrite::SetInviteStatus {
            invite_id: id,
            status,
            accepted_at,
        })
    }
}

enum BufferedWrite {
    CreateOrganizationMember(CreateOrganizationMember),
    CreateWorkspaceMember(CreateWorkspaceMember),
    UpsertWorkspaceMember {
        workspace_id: i64,
        user_id: i64,
        role: Role,
    },
    DeleteWorkspaceMember {
        workspace_id: i64,
        user_id: i64,
    },
    UpdateOrganizationMemberRole {
        organization_id: i64,
        user_id: i64,
        role: Role,
    },
    DeleteOrganizationMember {
        organization_id: i64,
        user_id: i64,
    },
    SetInviteStatus {
        invite_id: i64,
        status: InviteStatus,
        accepted_at: Option<DateTime<Utc>>,
    },
}

/// Buffers writes until commit; nothing is visible to other handles until
/// every write has applied cleanly.
struct MemoryUnitOfWork {
    store: MemoryStore,
    writes: Vec<BufferedWrite>,
}

#[async_trait]
impl Transactional for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AccessError> {
        Ok(Box::new(MemoryUnitOfWork {
            store: self.clone(),
            writes: Vec::new(),
        }))
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn create_organization_member(
        &mut self,
        data: CreateOrganizationMember,
    ) -> Result<(), AccessError> {
        self.writes.push(BufferedWrite::CreateOrganizationMember(data));
        Ok(())
    }

    async fn create_workspace_member(
        &mut self,
        data: CreateWorkspaceMember,
    ) -> Result<(), AccessError> {
        self.writes.push(BufferedWrite::CreateWorkspaceMember(data));
        Ok(())
    }

    async fn upsert_workspace_member(
        &mut self,
        workspace_id: i64,
        user_id: i64,
        role: Role,
    ) -> Result<(), AccessError> {
        self.writes.push(BufferedWrite::UpsertWorkspaceMember {
            workspace_id,
            user_id,
            role,
        });
        Ok(())
    }

    async fn delete_workspace_member(
        &mut self,
        workspace_id: i64,
        user_id: i64,
    ) -> Result<(), AccessError> {
        self.writes.push(BufferedWrite::DeleteWorkspaceMember {
            workspace_id,
            user_id,
        });
        Ok(())
    }

    async fn update_organization_member_role(
        &mut self,
        organization_id: i64,
        user_id: i64,
        role: Role,
    ) -> Result<(), AccessError> {
        self.writes.push(BufferedWrite::UpdateOrganizationMemberRole {
            organization_id,
            user_id,
            role,
        });
        Ok(())
    }

    async fn delete_organization_member(
        &mut self,
        organization_id: i64,
        user_id: i64,
    ) -> Result<(), AccessError> {
        self.writes.push(BufferedWrite::DeleteOrganizationMember {
            organization_id,
            user_id,
        });
        Ok(())
    }

    async fn set_invite_status(
        &mut self,
        invite_id: i64,
        status: InviteStatus,
        accepted_at: Option<DateTime<Utc>>,
    ) -> Result<(), AccessError> {
        self.writes.push(BufferedWrite::SetInviteStatus {
            invite_id,
            status,
            accepted_at,
        });
        Ok(())
    }

    async fn workspaces_in_organization(
        &mut self,
        organization_id: i64,
    ) -> Result<Vec<Workspace>, AccessError> {
        self.store.workspaces_in_organization(organization_id).await
    }

    async fn commit(self: Box<Self>) -> Result<(), AccessError> {
        let this = *self;
        let mut guard = this.store.write()?;
        // apply against a copy so a failing write leaves the shared state
        // untouched
        let mut staged = guard.clone();
        for write in this.writes {
            staged.apply(write)?;
        }
        *guard = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), AccessError> {
        Ok(())
    }
}
