use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::{
    auth,
    entities::user,
    error::{AppError, AppResult},
    models::NAME_MAX_CHARS,
};

pub async fn register(
    db: &DatabaseConnection,
    email: &str,
    name: &str,
    password: &str,
) -> AppResult<user::Model> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::InvalidInput("email is not valid".to_string()));
    }
    let name = name.trim();
    if name.is_empty() || name.chars().count() > NAME_MAX_CHARS {
        return Err(AppError::InvalidInput("name must be 1-255 characters".to_string()));
    }
    if password.chars().count() < 8 {
        return Err(AppError::InvalidInput("password must be at least 8 characters".to_string()));
    }

    let existing =
        user::Entity::find().filter(user::Column::Email.eq(email.clone())).one(db).await?;
    if existing.is_some() {
        return Err(AppError::EmailAlreadyRegistered);
    }

    let created = user::ActiveModel {
        id: Default::default(),
        email: Set(email),
        name: Set(name.to_string()),
        password_hash: Set(auth::hash_password(password)?),
        created_at: Set(jiff::Timestamp::now().as_second()),
    }
    .insert(db)
    .await?;

    Ok(created)
}

pub async fn authenticate(
    db: &DatabaseConnection,
    email: &str,
    password: &str,
) -> AppResult<user::Model> {
    let email = email.trim().to_lowercase();
    let Some(user) = user::Entity::find().filter(user::Column::Email.eq(email)).one(db).await?
    else {
        return Err(AppError::InvalidCredentials);
    };

    if !auth::verify_password(password, &user.password_hash)? {
        return Err(AppError::InvalidCredentials);
    }

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;

    #[tokio::test]
    async fn register_then_authenticate() {
        let db = connect_in_memory().await;

        let user = register(&db, " Petro@Example.com ", "Petro", "password1").await.unwrap();
        assert_eq!(user.email, "petro@example.com");

        let found = authenticate(&db, "petro@example.com", "password1").await.unwrap();
        assert_eq!(found.id, user.id);

        let err = authenticate(&db, "petro@example.com", "wrong-password").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let db = connect_in_memory().await;

        register(&db, "petro@example.com", "Petro", "password1").await.unwrap();
        let err = register(&db, "PETRO@example.com", "Other", "password2").await.unwrap_err();
        assert!(matches!(err, AppError::EmailAlreadyRegistered));
    }

    #[tokio::test]
    async fn weak_inputs_are_rejected() {
        let db = connect_in_memory().await;

        assert!(register(&db, "not-an-email", "Petro", "password1").await.is_err());
        assert!(register(&db, "petro@example.com", "  ", "password1").await.is_err());
        assert!(register(&db, "petro@example.com", "Petro", "short").await.is_err());
    }
}
