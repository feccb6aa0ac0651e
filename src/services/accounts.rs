//! Accounts: registration, login, bearer authentication

use serde::Serialize;
use tracing::{debug, warn};

use crate::auth::{extract_token_from_header, hash_password, verify_login, JwtValidator};
use crate::db::SurveyStore;
use crate::services::questionnaires::{self, QuestionnaireView};
use crate::types::{DataObject, NewUser, Page, Result, SurveyError, User, UserId};

/// Issued access token
#[derive(Debug, Clone, Serialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
}

/// Account as returned by the API, with owned questionnaires and favorites
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub name: String,
    pub is_active: bool,
    pub questionnaires: Vec<QuestionnaireView>,
    pub favorite_data_objects: Vec<DataObject>,
}

/// Register a new account. `Conflict` if the name is taken.
pub async fn register(store: &dyn SurveyStore, name: &str, password: &str) -> Result<User> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SurveyError::BadRequest("Name must not be empty".into()));
    }
    if password.is_empty() {
        return Err(SurveyError::BadRequest("Password must not be empty".into()));
    }

    let password_hash = hash_password(password)?;
    let user = store
        .create_user(NewUser {
            name: name.to_string(),
            password_hash,
        })
        .await?;

    debug!(user_id = user.id, "Registered user");
    Ok(user)
}

/// Exchange credentials for a bearer token
pub async fn login(
    store: &dyn SurveyStore,
    jwt: &JwtValidator,
    name: &str,
    password: &str,
) -> Result<Token> {
    let account = store.get_user_by_name(name).await?;
    let verified = verify_login(password, account.as_ref().map(|u| u.password_hash.as_str()))?;
    let user = match account {
        Some(user) if verified => user,
        _ => {
            warn!(name, "Login failed");
            return Err(SurveyError::Unauthorized(
                "Incorrect username or password".into(),
            ));
        }
    };

    Ok(Token {
        access_token: jwt.generate_token(user.id, &user.name)?,
        token_type: "bearer".into(),
    })
}

/// Resolve the active account behind an `Authorization` header
pub async fn authenticate(
    store: &dyn SurveyStore,
    jwt: &JwtValidator,
    auth_header: Option<&str>,
) -> Result<User> {
    let token = extract_token_from_header(auth_header)
        .ok_or_else(|| SurveyError::Unauthorized("Not authenticated".into()))?;

    let invalid = || SurveyError::Unauthorized("Could not validate credentials".into());

    let result = jwt.verify_token(token);
    let claims = match result.claims {
        Some(claims) if result.valid => claims,
        _ => {
            debug!(reason = ?result.error, "Token rejected");
            return Err(invalid());
        }
    };

    let user = store.get_user(claims.uid).await?.ok_or_else(invalid)?;
    if user.name != claims.sub {
        return Err(invalid());
    }
    if !user.is_active {
        return Err(SurveyError::BadRequest("Inactive user".into()));
    }
    Ok(user)
}

/// Like [`authenticate`], but a missing or bad token yields `None`
pub async fn authenticate_optional(
    store: &dyn SurveyStore,
    jwt: &JwtValidator,
    auth_header: Option<&str>,
) -> Result<Option<User>> {
    if auth_header.is_none() {
        return Ok(None);
    }
    match authenticate(store, jwt, auth_header).await {
        Ok(user) => Ok(Some(user)),
        Err(SurveyError::Unauthorized(_)) | Err(SurveyError::BadRequest(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Account view with everything it owns and has favorited
pub async fn user_view(store: &dyn SurveyStore, user: &User, max_page: usize) -> Result<UserView> {
    let questionnaires =
        questionnaires::list_owned(store, user, Page::new(0, max_page)).await?;
    let favorite_data_objects = crate::services::favorites::list(store, user).await?;

    Ok(UserView {
        id: user.id,
        name: user.name.clone(),
        is_active: user.is_active,
        questionnaires,
        favorite_data_objects,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use tokio_test::{assert_err, assert_ok};

    fn jwt() -> JwtValidator {
        JwtValidator::new_dev(1800)
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let store = MemoryStore::new();
        let user = assert_ok!(register(&store, "alice", "s3cret").await);
        assert_ne!(user.password_hash, "s3cret");

        let token = assert_ok!(login(&store, &jwt(), "alice", "s3cret").await);
        assert_eq!(token.token_type, "bearer");

        let header = format!("Bearer {}", token.access_token);
        let me = assert_ok!(authenticate(&store, &jwt(), Some(&header)).await);
        assert_eq!(me.id, user.id);
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let store = MemoryStore::new();
        assert_ok!(register(&store, "alice", "a").await);
        let err = register(&store, "alice", "b").await.unwrap_err();
        assert!(matches!(err, SurveyError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_register_rejects_blank_fields() {
        let store = MemoryStore::new();
        assert_err!(register(&store, "  ", "pw").await);
        assert_err!(register(&store, "bob", "").await);
    }

    #[tokio::test]
    async fn test_wrong_credentials() {
        let store = MemoryStore::new();
        register(&store, "alice", "right").await.unwrap();

        for (name, pw) in [("alice", "wrong"), ("nobody", "right")] {
            let err = login(&store, &jwt(), name, pw).await.unwrap_err();
            assert!(matches!(err, SurveyError::Unauthorized(_)));
            assert_eq!(err.detail(), "Incorrect username or password");
        }
    }

    #[tokio::test]
    async fn test_authenticate_failures() {
        let store = MemoryStore::new();

        let err = authenticate(&store, &jwt(), None).await.unwrap_err();
        assert_eq!(err.detail(), "Not authenticated");

        let err = authenticate(&store, &jwt(), Some("Bearer garbage"))
            .await
            .unwrap_err();
        assert_eq!(err.detail(), "Could not validate credentials");

        // Valid signature, unknown account
        let token = jwt().generate_token(42, "ghost").unwrap();
        let header = format!("Bearer {}", token);
        assert_err!(authenticate(&store, &jwt(), Some(&header)).await);
    }

    #[tokio::test]
    async fn test_optional_authentication() {
        let store = MemoryStore::new();
        assert!(authenticate_optional(&store, &jwt(), None).await.unwrap().is_none());
        assert!(authenticate_optional(&store, &jwt(), Some("Bearer nope"))
            .await
            .unwrap()
            .is_none());
    }
}
