//! Principal context and role policy for mutating operations.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use thiserror::Error;
use ts_rs::TS;
use utils::jwt::{self, JwtError};
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Student,
    Instructor,
    /// Instructor lead
    Lead,
    Admin,
}

impl Role {
    /// Elevated roles may manage content of any instructor.
    pub fn is_elevated(self) -> bool {
        matches!(self, Role::Lead | Role::Admin)
    }
}

/// The authenticated caller, passed explicitly into every mutating service call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct AccessDenied(pub String);

impl Principal {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn can_manage(&self, instructor_id: Uuid) -> bool {
        match self.role {
            role if role.is_elevated() => true,
            Role::Instructor => self.user_id == instructor_id,
            _ => false,
        }
    }

    pub fn ensure_can_manage(&self, instructor_id: Uuid) -> Result<(), AccessDenied> {
        if self.can_manage(instructor_id) {
            Ok(())
        } else {
            Err(AccessDenied(format!(
                "role '{}' may not manage content of instructor {}",
                self.role, instructor_id
            )))
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token error: {0}")]
    Jwt(#[from] JwtError),
}

/// Claims carried by access tokens minted by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,
    pub role: Role,
    pub iat: usize,
    pub exp: usize,
}

pub fn issue_token(principal: &Principal, secret: &str, ttl: Duration) -> Result<String, AuthError> {
    let claims = AccessClaims {
        sub: principal.user_id,
        role: principal.role,
        iat: jwt::issued_now(),
        exp: jwt::expiry_from_now(ttl),
    };
    Ok(jwt::encode(&claims, secret)?)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Principal, AuthError> {
    let claims: AccessClaims = jwt::decode(token, secret)?;
    Ok(Principal::new(claims.sub, claims.role))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instructors_manage_only_their_own_content() {
        let me = Uuid::new_v4();
        let principal = Principal::new(me, Role::Instructor);
        assert!(principal.can_manage(me));
        assert!(principal.ensure_can_manage(Uuid::new_v4()).is_err());
    }

    #[test]
    fn elevated_roles_manage_everything_and_students_nothing() {
        assert!(Role::Lead.is_elevated() && Role::Admin.is_elevated());
        assert!(!Role::Instructor.is_elevated());
        let other = Uuid::new_v4();
        assert!(Principal::new(Uuid::new_v4(), Role::Lead).can_manage(other));
        assert!(Principal::new(Uuid::new_v4(), Role::Admin).can_manage(other));
        let student = Uuid::new_v4();
        assert!(!Principal::new(student, Role::Student).can_manage(student));
    }

    #[test]
    fn token_round_trip_restores_principal() {
        let principal = Principal::new(Uuid::new_v4(), Role::Lead);
        let token = issue_token(&principal, "secret", Duration::minutes(5)).unwrap();
        assert_eq!(verify_token(&token, "secret").unwrap(), principal);
        assert!(verify_token(&token, "wrong").is_err());
    }
}
