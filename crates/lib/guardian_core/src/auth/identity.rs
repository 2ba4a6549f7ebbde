//! Identity store operations: registration, lookup, password checks.

use tracing::info;
use uuid::Uuid;

use super::AuthError;
use super::password::{self, MIN_PASSWORD_LEN};
use crate::models::media::MediaHandle;
use crate::models::user::{NewUser, Role, User, UserWithPassword, normalize_email};
use crate::store::{StoreError, UserStore};

/// Raw registration input as received from a client.
#[derive(Debug, Clone, Default)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub mobile: String,
    pub address: String,
    pub city: String,
    /// Role name; `None` registers a citizen.
    pub role: Option<String>,
}

/// Syntactic email check: `local@domain.tld`, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

fn required(value: &str, field: &str) -> Result<String, AuthError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AuthError::ValidationError(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Validate registration input and hash the password.
pub fn validate_registration(input: &RegisterInput, cost: u32) -> Result<NewUser, AuthError> {
    if input.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::ValidationError(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    let name = required(&input.name, "Name")?;
    let email = normalize_email(&input.email);
    if !is_valid_email(&email) {
        return Err(AuthError::ValidationError("Invalid email address".into()));
    }
    let mobile = required(&input.mobile, "Phone")?;
    let address = required(&input.address, "Address")?;
    let city = required(&input.city, "City")?;
    let role = match input.role.as_deref() {
        None => Role::Citizen,
        Some(r) if r.trim().is_empty() => Role::Citizen,
        Some(r) => r.parse::<Role>().map_err(AuthError::ValidationError)?,
    };

    Ok(NewUser {
        name,
        email,
        password_hash: password::hash_password(&input.password, cost)?,
        mobile,
        address,
        city,
        role,
    })
}

/// Register a new user. The email comparison is case-insensitive.
pub async fn register<S>(store: &S, input: &RegisterInput, cost: u32) -> Result<User, AuthError>
where
    S: UserStore + ?Sized,
{
    let new_user = validate_registration(input, cost)?;

    if store.find_user_by_email(&new_user.email).await?.is_some() {
        return Err(AuthError::DuplicateEmail);
    }

    // A concurrent registration can still win the race; the backend's unique
    // constraint reports it as a conflict.
    let user = store.insert_user(new_user).await.map_err(|e| match e {
        StoreError::Conflict(_) => AuthError::DuplicateEmail,
        other => AuthError::Store(other),
    })?;

    info!(user_id = %user.id, role = %user.role, "registered user");
    Ok(user)
}

/// Look up a user (with hash) by email, normalizing first.
pub async fn find_by_email<S>(store: &S, email: &str) -> Result<Option<UserWithPassword>, AuthError>
where
    S: UserStore + ?Sized,
{
    Ok(store.find_user_by_email(&normalize_email(email)).await?)
}

/// Compare `candidate` against the user's stored hash.
pub fn verify_password(user: &UserWithPassword, candidate: &str) -> Result<bool, AuthError> {
    password::verify_password(candidate, &user.password_hash)
}

/// Replace or clear a user's avatar.
pub async fn set_avatar<S>(
    store: &S,
    user_id: Uuid,
    avatar: Option<MediaHandle>,
) -> Result<User, AuthError>
where
    S: UserStore + ?Sized,
{
    Ok(store.set_user_avatar(user_id, avatar).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    const COST: u32 = 4;

    fn alice() -> RegisterInput {
        RegisterInput {
            name: "Alice".into(),
            email: "a@x.com".into(),
            password: "secret1".into(),
            mobile: "555-1000".into(),
            address: "1 Main St".into(),
            city: "Springfield".into(),
            role: None,
        }
    }

    #[test]
    fn email_syntax() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@city.gov.uk"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("@x.com"));
        assert!(!is_valid_email("a b@x.com"));
        assert!(!is_valid_email("a@@x.com"));
        assert!(!is_valid_email("a@x..com"));
    }

    #[tokio::test]
    async fn register_defaults_to_citizen_and_normalizes_email() {
        let store = MemoryStore::new();
        let mut input = alice();
        input.email = "  Alice@X.com ".into();
        let user = register(&store, &input, COST).await.unwrap();
        assert_eq!(user.email, "alice@x.com");
        assert_eq!(user.role, Role::Citizen);
    }

    #[tokio::test]
    async fn duplicate_email_differing_in_case_is_rejected() {
        let store = MemoryStore::new();
        register(&store, &alice(), COST).await.unwrap();
        let mut again = alice();
        again.email = "A@X.COM".into();
        let err = register(&store, &again, COST).await.unwrap_err();
        assert!(matches!(err, AuthError::DuplicateEmail));
    }

    #[tokio::test]
    async fn short_password_fails_even_with_other_fields_invalid() {
        let store = MemoryStore::new();
        let input = RegisterInput {
            password: "12345".into(),
            ..RegisterInput::default()
        };
        let err = register(&store, &input, COST).await.unwrap_err();
        match err {
            AuthError::ValidationError(msg) => assert!(msg.contains("at least 6")),
            other => panic!("unexpected error: {other:?}"),
        }

        let mut valid_otherwise = alice();
        valid_otherwise.password = "abc".into();
        assert!(matches!(
            register(&store, &valid_otherwise, COST).await,
            Err(AuthError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn unknown_role_is_rejected() {
        let store = MemoryStore::new();
        let mut input = alice();
        input.role = Some("mayor".into());
        assert!(matches!(
            register(&store, &input, COST).await,
            Err(AuthError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn stored_hash_verifies_password() {
        let store = MemoryStore::new();
        register(&store, &alice(), COST).await.unwrap();
        let found = find_by_email(&store, "A@x.com").await.unwrap().unwrap();
        assert_ne!(found.password_hash, "secret1");
        assert!(verify_password(&found, "secret1").unwrap());
        assert!(!verify_password(&found, "secret2").unwrap());
    }

    #[tokio::test]
    async fn avatar_can_be_set_and_cleared() {
        let store = MemoryStore::new();
        let user = register(&store, &alice(), COST).await.unwrap();
        let handle = MediaHandle::new("https://img/a.png", "avatars/a");
        let updated = set_avatar(&store, user.id, Some(handle.clone()))
            .await
            .unwrap();
        assert_eq!(updated.avatar, Some(handle));
        let cleared = set_avatar(&store, user.id, None).await.unwrap();
        assert_eq!(cleared.avatar, None);
    }
}
