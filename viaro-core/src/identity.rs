use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Customer,
    Admin,
}

/// The authenticated principal an operation runs as. The API layer builds
/// this from verified token claims; engine code never sees raw credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Caller {
    pub id: String,
    pub role: Role,
}

impl Caller {
    pub fn customer(id: impl Into<String>) -> Self {
        Caller {
            id: id.into(),
            role: Role::Customer,
        }
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Caller {
            id: id.into(),
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Owner-or-admin check used by booking-scoped operations.
    pub fn can_manage(&self, owner_id: &str) -> bool {
        self.is_admin() || self.id == owner_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_manages_everything_customer_only_their_own() {
        let admin = Caller::admin("ops-1");
        let customer = Caller::customer("user-7");

        assert!(admin.can_manage("user-7"));
        assert!(customer.can_manage("user-7"));
        assert!(!customer.can_manage("user-8"));
    }

    #[test]
    fn role_serializes_screaming_snake() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
        assert_eq!(
            serde_json::to_string(&Role::Customer).unwrap(),
            "\"CUSTOMER\""
        );
    }
}
