use core::str::FromStr;

use serde::{Deserialize, Serialize};

use budget_eagle_core::DomainError;

/// Organisational role.
///
/// Closed set. Finance and manager are the administrative roles; manager is the
/// only reviewing role.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Employee,
    Hr,
    Manager,
    Finance,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Employee, Role::Hr, Role::Manager, Role::Finance];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Hr => "hr",
            Role::Manager => "manager",
            Role::Finance => "finance",
        }
    }

    /// Roles that only ever see and manage their own bills.
    pub fn is_submitter(&self) -> bool {
        matches!(self, Role::Employee | Role::Hr)
    }

    /// Roles with organisation-wide visibility.
    pub fn is_administrative(&self) -> bool {
        matches!(self, Role::Manager | Role::Finance)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "employee" => Ok(Role::Employee),
            "hr" => Ok(Role::Hr),
            "manager" => Ok(Role::Manager),
            "finance" => Ok(Role::Finance),
            other => Err(DomainError::validation(format!(
                "unknown role `{other}` (expected employee|hr|manager|finance)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Manager".parse::<Role>().unwrap(), Role::Manager);
        assert_eq!(" hr ".parse::<Role>().unwrap(), Role::Hr);
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn display_matches_parse() {
        for role in Role::ALL {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
    }
}
