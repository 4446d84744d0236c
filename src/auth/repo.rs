use sqlx::PgConnection;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User};
use crate::store::{StoreError, StoreResult};

const USER_COLUMNS: &str =
    "id, email, name, password_hash, is_active, is_staff, is_superuser, created_at";

/// Find a user by normalized email.
pub async fn find_by_email(conn: &mut PgConnection, email: &str) -> StoreResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
    ))
    .bind(email)
    .fetch_optional(conn)
    .await?;
    Ok(user)
}

pub async fn find_by_id(conn: &mut PgConnection, id: Uuid) -> StoreResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(user)
}

/// Insert a new user; a taken email is reported as a conflict.
pub async fn insert(conn: &mut PgConnection, user: &NewUser) -> StoreResult<User> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (id, email, name, password_hash, is_staff, is_superuser)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(&user.email)
    .bind(&user.name)
    .bind(&user.password_hash)
    .bind(user.is_staff)
    .bind(user.is_superuser)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            StoreError::Conflict("user with this email already exists".into())
        }
        other => other.into(),
    })
}

pub async fn update(conn: &mut PgConnection, user: &User) -> StoreResult<User> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users
           SET name = $2, password_hash = $3, is_active = $4, is_staff = $5, is_superuser = $6
         WHERE id = $1
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(user.id)
    .bind(&user.name)
    .bind(&user.password_hash)
    .bind(user.is_active)
    .bind(user.is_staff)
    .bind(user.is_superuser)
    .fetch_one(conn)
    .await?;
    Ok(user)
}
