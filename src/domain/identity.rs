//! The (tenant, user, department) identity triple resolved from request
//! headers / auth context (spec §3, §6).

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub tenant_id: String,
    pub user_id: String,
    pub department: String,
}

impl Identity {
    pub fn new(
        tenant_id: impl Into<String>,
        user_id: impl Into<String>,
        department: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
            department: department.into(),
        }
    }

    /// Key used to look up DepartmentPolicy and budget counters.
    pub fn policy_key(&self) -> (String, String) {
        (self.tenant_id.clone(), self.department.clone())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.tenant_id, self.department, self.user_id
        )
    }
}
