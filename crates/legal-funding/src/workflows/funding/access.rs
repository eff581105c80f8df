use serde::{Deserialize, Serialize};

use super::domain::{Role, Tenant, TenantId, UserId};

/// Discrete permissions checked before any lifecycle operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    SubmitApplication,
    ReviewApplication,
    FundApplication,
    /// See applications of every firm, not only the caller's own.
    ViewAllTenants,
    ViewOwnTenant,
}

impl Capability {
    pub const fn label(self) -> &'static str {
        match self {
            Capability::SubmitApplication => "submit_application",
            Capability::ReviewApplication => "review_application",
            Capability::FundApplication => "fund_application",
            Capability::ViewAllTenants => "view_all_tenants",
            Capability::ViewOwnTenant => "view_own_tenant",
        }
    }
}

/// Capabilities granted to each role. Adding a role forces an explicit entry here.
pub const fn capabilities(role: Role) -> &'static [Capability] {
    match role {
        Role::LenderAdmin | Role::LenderReviewer => &[
            Capability::ReviewApplication,
            Capability::FundApplication,
            Capability::ViewAllTenants,
            Capability::ViewOwnTenant,
        ],
        Role::BorrowerAdmin | Role::BorrowerUser => {
            &[Capability::SubmitApplication, Capability::ViewOwnTenant]
        }
    }
}

pub fn permits(role: Role, capability: Capability) -> bool {
    capabilities(role).contains(&capability)
}

/// Caller identity as resolved by an identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
    pub tenant_id: TenantId,
}

impl Identity {
    pub fn can(&self, capability: Capability) -> bool {
        permits(self.role, capability)
    }

    /// Whether the caller may read records owned by `owner`.
    pub fn can_view(&self, owner: &TenantId) -> bool {
        self.can(Capability::ViewAllTenants)
            || (self.can(Capability::ViewOwnTenant) && self.tenant_id == *owner)
    }
}

/// A role may only be held by members of a firm on the same side of the market.
pub fn role_fits_tenant(role: Role, tenant: &Tenant) -> bool {
    role.side() == tenant.firm_type
}
