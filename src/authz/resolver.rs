use super::Principal;
use crate::tenancy::{
    Organization, ProjectNature, Role, TenancyStore, Workspace,
};
use crate::AccessError;

/// A resource addressed by id or slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceRef {
    Id(i64),
    Slug(String),
}

impl From<i64> for ResourceRef {
    fn from(id: i64) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for ResourceRef {
    fn from(slug: &str) -> Self {
        Self::Slug(slug.to_owned())
    }
}

impl From<String> for ResourceRef {
    fn from(slug: String) -> Self {
        Self::Slug(slug)
    }
}

/// The target of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Organization(ResourceRef),
    /// A workspace, optionally scoped under an organization. When the
    /// scope is given and the workspace does not belong to it, the check
    /// fails `NotFound` rather than resolving the workspace elsewhere.
    Workspace {
        org: Option<ResourceRef>,
        workspace: ResourceRef,
    },
    Project(i64),
}

impl Resource {
    pub fn organization(org: impl Into<ResourceRef>) -> Self {
        Self::Organization(org.into())
    }

    pub fn workspace(workspace: impl Into<ResourceRef>) -> Self {
        Self::Workspace {
            org: None,
            workspace: workspace.into(),
        }
    }

    pub fn workspace_in(org: impl Into<ResourceRef>, workspace: impl Into<ResourceRef>) -> Self {
        Self::Workspace {
            org: Some(org.into()),
            workspace: workspace.into(),
        }
    }

    pub fn project(id: i64) -> Self {
        Self::Project(id)
    }
}

/// Decides whether a principal may act on a resource.
///
/// The check at every level has the same two-tier shape: an elevated role
/// (`Owner`/`Admin`) at the parent level grants access outright, otherwise
/// a membership row at the current level must exist and satisfy the
/// required roles. Checks walk the hierarchy top-down, so an organization
/// admin short-circuits before any workspace or project lookup happens.
///
/// `required_roles` is an exact set: a `Member` does not satisfy a check
/// that lists only `Owner`/`Admin`, and an empty set means any membership
/// suffices.
///
/// # Example
///
/// ```rust,ignore
/// let resolver = RoleResolver::new(store);
/// resolver
///     .authorize(
///         Some(&principal),
///         &Resource::workspace_in("acme", "platform"),
///         &[Role::Owner, Role::Admin],
///     )
///     .await?;
/// ```
pub struct RoleResolver<S: TenancyStore> {
    store: S,
}

impl<S: TenancyStore> RoleResolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Authorizes `principal` to act on `resource` with one of
    /// `required_roles`.
    ///
    /// # Returns
    ///
    /// - `Ok(())` - the principal holds a satisfying membership, or an
    ///   elevated role at an ancestor level
    /// - `Err(AccessError::Unauthenticated)` - no principal was supplied
    /// - `Err(AccessError::NotFound)` - the resource does not resolve, or
    ///   does not live under the given parent scope
    /// - `Err(AccessError::Forbidden)` - no membership, or a membership
    ///   whose role is not in `required_roles`
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "authorize", skip_all, err)
    )]
    pub async fn authorize(
        &self,
        principal: Option<&Principal>,
        resource: &Resource,
        required_roles: &[Role],
    ) -> Result<(), AccessError> {
        let principal = principal.ok_or(AccessError::Unauthenticated)?;

        match resource {
            Resource::Organization(org_ref) => {
                let org = self.resolve_organization(org_ref).await?;
                // the organization is the hierarchy root: no level above it
                // to inherit from, so a local membership must exist
                let membership = self
                    .store
                    .organization_membership(org.id, principal.id)
                    .await?
                    .ok_or_else(|| deny(principal.id, "organization", org.id))?;
                check_required(principal.id, "organization", org.id, membership.role, required_roles)
            }
            Resource::Workspace { org, workspace } => {
                let ws = self.resolve_workspace(workspace).await?;
                if let Some(org_ref) = org {
                    let org = self.resolve_organization(org_ref).await?;
                    if ws.organization_id != org.id {
                        return Err(AccessError::NotFound);
                    }
                }
                if self.has_elevated_org_role(ws.organization_id, principal.id).await? {
                    return Ok(());
                }
                let membership = self
                    .store
                    .workspace_membership(ws.id, principal.id)
                    .await?
                    .ok_or_else(|| deny(principal.id, "workspace", ws.id))?;
                check_required(principal.id, "workspace", ws.id, membership.role, required_roles)
            }
            Resource::Project(id) => {
                let project = self
                    .store
                    .project_by_id(*id)
                    .await?
                    .ok_or(AccessError::NotFound)?;
                let ws = self
                    .store
                    .workspace_by_id(project.workspace_id)
                    .await?
                    .ok_or_else(|| {
                        AccessError::Internal(format!(
                            "project {} references missing workspace {}",
                            project.id, project.workspace_id
                        ))
                    })?;

                // top-down: organization first, then workspace
                if self.has_elevated_org_role(ws.organization_id, principal.id).await? {
                    return Ok(());
                }
                let ws_membership = self
                    .store
                    .workspace_membership(ws.id, principal.id)
                    .await?;
                if ws_membership
                    .as_ref()
                    .is_some_and(|m| m.role.is_elevated())
                {
                    return Ok(());
                }

                match project.nature {
                    ProjectNature::Public => {
                        // open membership: any workspace member is in, and
                        // role gating reads the workspace role
                        let membership = ws_membership
                            .ok_or_else(|| deny(principal.id, "project", project.id))?;
                        check_required(
                            principal.id,
                            "project",
                            project.id,
                            membership.role,
                            required_roles,
                        )
                    }
                    ProjectNature::Private => {
                        let membership = self
                            .store
                            .project_membership(project.id, principal.id)
                            .await?
                            .ok_or_else(|| deny(principal.id, "project", project.id))?;
                        check_required(
                            principal.id,
                            "project",
                            project.id,
                            membership.role,
                            required_roles,
                        )
                    }
                }
            }
        }
    }

    async fn resolve_organization(
        &self,
        org_ref: &ResourceRef,
    ) -> Result<Organization, AccessError> {
        let org = match org_ref {
            ResourceRef::Id(id) => self.store.organization_by_id(*id).await?,
            ResourceRef::Slug(slug) => self.store.organization_by_slug(slug).await?,
        };
        org.ok_or(AccessError::NotFound)
    }

    async fn resolve_workspace(&self, ws_ref: &ResourceRef) -> Result<Workspace, AccessError> {
        let ws = match ws_ref {
            ResourceRef::Id(id) => self.store.workspace_by_id(*id).await?,
            ResourceRef::Slug(slug) => self.store.workspace_by_slug(slug).await?,
        };
        ws.ok_or(AccessError::NotFound)
    }

    async fn has_elevated_org_role(
        &self,
        organization_id: i64,
        user_id: i64,
    ) -> Result<bool, AccessError> {
        Ok(self
            .store
            .organization_membership(organization_id, user_id)
            .await?
            .is_some_and(|m| m.role.is_elevated()))
    }
}

/// Builds the generic denial, logging the specifics at debug only; the
/// error itself must not reveal which level denied.
fn deny(user_id: i64, level: &str, resource_id: i64) -> AccessError {
    log::debug!(
        target: "terrace",
        "msg=\"access denied: no membership\", user_id={user_id}, level={level}, resource_id={resource_id}"
    );
    AccessError::Forbidden
}

fn check_required(
    user_id: i64,
    level: &str,
    resource_id: i64,
    role: Role,
    required_roles: &[Role],
) -> Result<(), AccessError> {
    if required_roles.is_empty() || required_roles.contains(&role) {
        return Ok(());
    }
    log::debug!(
        target: "terrace",
        "msg=\"access denied: role not sufficient\", user_id={user_id}, level={level}, resource_id={resource_id}, role={}",
        role.as_str()
    );
    Err(AccessError::Forbidden)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MemoryStore;
    use crate::tenancy::{
        CreateOrganization, CreateProject, CreateWorkspace, CreateWorkspaceMember,
        OrganizationMemberRepository, OrganizationRepository, ProjectRepository,
        WorkspaceMemberRepository, WorkspaceRepository,
    };

    async fn setup() -> (MemoryStore, Organization, Workspace) {
        let store = MemoryStore::new();
        store.register_user(1, "owner@example.com");
        let org = store
            .create_organization(CreateOrganization {
                name: "Acme".to_owned(),
                slug: "acme".to_owned(),
                owner_id: 1,
                contact_email: "owner@example.com".to_owned(),
            })
            .await
            .unwrap();
        let ws = store
            .create_workspace(CreateWorkspace {
                organization_id: org.id,
                name: "Platform".to_owned(),
                slug: "platform".to_owned(),
                owner_id: 1,
            })
            .await
            .unwrap();
        (store, org, ws)
    }

    #[tokio::test]
    async fn test_missing_principal_is_unauthenticated() {
        let (store, org, _) = setup().await;
        let resolver = RoleResolver::new(store);

        let result = resolver
            .authorize(None, &Resource::organization(org.id), &[])
            .await;
        assert!(matches!(result.unwrap_err(), AccessError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_unknown_slug_is_not_found() {
        let (store, _, _) = setup().await;
        let resolver = RoleResolver::new(store);
        let principal = Principal::new(1, "owner@example.com");

        let result = resolver
            .authorize(Some(&principal), &Resource::organization("nonexistent"), &[])
            .await;
        assert!(matches!(result.unwrap_err(), AccessError::NotFound));
    }

    #[tokio::test]
    async fn test_org_admin_inherits_workspace_access() {
        let (store, org, ws) = setup().await;
        store.register_user(3, "admin@example.com");
        store
            .add_organization_member(crate::tenancy::CreateOrganizationMember {
                organization_id: org.id,
                user_id: 3,
                role: Role::Admin,
            })
            .await
            .unwrap();
        let resolver = RoleResolver::new(store);
        // user 3 holds no workspace membership row at all
        let principal = Principal::new(3, "admin@example.com");

        let result = resolver
            .authorize(
                Some(&principal),
                &Resource::workspace(ws.id),
                &[Role::Owner, Role::Admin],
            )
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_workspace_scope_mismatch_is_not_found() {
        let (store, _, ws) = setup().await;
        store.register_user(2, "other-owner@example.com");
        let other_org = store
            .create_organization(CreateOrganization {
                name: "Globex".to_owned(),
                slug: "globex".to_owned(),
                owner_id: 2,
                contact_email: "other-owner@example.com".to_owned(),
            })
            .await
            .unwrap();
        let resolver = RoleResolver::new(store);
        let principal = Principal::new(1, "owner@example.com");

        let result = resolver
            .authorize(
                Some(&principal),
                &Resource::workspace_in(other_org.id, ws.id),
                &[],
            )
            .await;
        assert!(matches!(result.unwrap_err(), AccessError::NotFound));
    }

    #[tokio::test]
    async fn test_member_does_not_satisfy_elevated_requirement() {
        let (store, _, ws) = setup().await;
        store.register_user(2, "member@example.com");
        store
            .add_workspace_member(CreateWorkspaceMember {
                workspace_id: ws.id,
                user_id: 2,
                role: Role::Member,
            })
            .await
            .unwrap();
        let resolver = RoleResolver::new(store);
        let principal = Principal::new(2, "member@example.com");

        // plain membership passes with no required roles
        let result = resolver
            .authorize(Some(&principal), &Resource::workspace(ws.id), &[])
            .await;
        assert!(result.is_ok());

        // but Member is not in {Owner, Admin}
        let result = resolver
            .authorize(
                Some(&principal),
                &Resource::workspace(ws.id),
                &[Role::Owner, Role::Admin],
            )
            .await;
        assert!(matches!(result.unwrap_err(), AccessError::Forbidden));
    }

    #[tokio::test]
    async fn test_private_project_requires_membership() {
        let (store, _, ws) = setup().await;
        store.register_user(2, "member@example.com");
        store
            .add_workspace_member(CreateWorkspaceMember {
                workspace_id: ws.id,
                user_id: 2,
                role: Role::Member,
            })
            .await
            .unwrap();
        let project = store
            .create_project(CreateProject {
                workspace_id: ws.id,
                name: "Skunkworks".to_owned(),
                nature: ProjectNature::Private,
                owner_id: 1,
            })
            .await
            .unwrap();
        let resolver = RoleResolver::new(store);

        // a workspace member without a project row is denied
        let principal = Principal::new(2, "member@example.com");
        let result = resolver
            .authorize(Some(&principal), &Resource::project(project.id), &[])
            .await;
        assert!(matches!(result.unwrap_err(), AccessError::Forbidden));
    }

    #[tokio::test]
    async fn test_public_project_gates_on_workspace_role() {
        let (store, _, ws) = setup().await;
        store.register_user(2, "member@example.com");
        store
            .add_workspace_member(CreateWorkspaceMember {
                workspace_id: ws.id,
                user_id: 2,
                role: Role::Member,
            })
            .await
            .unwrap();
        let project = store
            .create_project(CreateProject {
                workspace_id: ws.id,
                name: "Website".to_owned(),
                nature: ProjectNature::Public,
                owner_id: 1,
            })
            .await
            .unwrap();
        let resolver = RoleResolver::new(store);
        let principal = Principal::new(2, "member@example.com");

        // open membership: any workspace member may read
        let result = resolver
            .authorize(Some(&principal), &Resource::project(project.id), &[])
            .await;
        assert!(result.is_ok());

        // elevation is judged on the workspace role, which is Member
        let result = resolver
            .authorize(
                Some(&principal),
                &Resource::project(project.id),
                &[Role::Owner, Role::Admin],
            )
            .await;
        assert!(matches!(result.unwrap_err(), AccessError::Forbidden));
    }
}
