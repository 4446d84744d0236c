use crate::auth::dto::{RegisterRequest, UpdateMeRequest};
use crate::auth::repo_types::{NewUser, User};
use crate::error::{AppError, FieldErrors};
use crate::store::{Store, StoreError};
use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use regex::Regex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub const MIN_PASSWORD_LEN: usize = 5;
const MAX_FIELD_LEN: usize = 255;
const BAD_CREDENTIALS: &str = "Unable to authenticate with provided credentials.";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trims and lower-cases the domain part; the local part keeps its case.
pub(crate) fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

fn check_email(email: &str, errors: &mut FieldErrors) {
    if email.is_empty() {
        errors.add("email", "This field may not be blank.");
    } else if email.chars().count() > MAX_FIELD_LEN || !is_valid_email(email) {
        errors.add("email", "Enter a valid email address.");
    }
}

fn check_password(password: &str, errors: &mut FieldErrors) {
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.add("password", "Ensure this field has at least 5 characters.");
    }
}

fn check_name(name: &str, errors: &mut FieldErrors) {
    if name.trim().is_empty() {
        errors.add("name", "This field may not be blank.");
    } else if name.chars().count() > MAX_FIELD_LEN {
        errors.add("name", "Ensure this field has no more than 255 characters.");
    }
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Validates and stores a new regular user.
pub async fn register_user(store: &dyn Store, payload: RegisterRequest) -> Result<User, AppError> {
    let email = normalize_email(&payload.email);
    let mut errors = FieldErrors::default();
    check_email(&email, &mut errors);
    check_password(&payload.password, &mut errors);
    check_name(&payload.name, &mut errors);
    errors.into_result()?;

    let new_user = NewUser {
        email,
        name: payload.name.trim().to_string(),
        password_hash: hash_password(&payload.password)?,
        is_staff: false,
        is_superuser: false,
    };
    let user = insert_user(store, &new_user).await?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user)
}

async fn insert_user(store: &dyn Store, new_user: &NewUser) -> Result<User, AppError> {
    let mut tx = store.begin().await?;
    let user = match tx.create_user(new_user).await {
        Ok(user) => user,
        Err(StoreError::Conflict(_)) => {
            warn!(email = %new_user.email, "email already registered");
            return Err(AppError::field("email", "user with this email already exists."));
        }
        Err(e) => return Err(e.into()),
    };
    tx.commit().await?;
    Ok(user)
}

/// Checks credentials. Unknown email, wrong password and inactive account all
/// produce the same 400.
pub async fn authenticate(store: &dyn Store, email: &str, password: &str) -> Result<User, AppError> {
    let email = normalize_email(email);
    let mut errors = FieldErrors::default();
    if email.is_empty() {
        errors.add("email", "This field may not be blank.");
    }
    if password.is_empty() {
        errors.add("password", "This field may not be blank.");
    }
    errors.into_result()?;

    let mut tx = store.begin().await?;
    let user = tx.find_user_by_email(&email).await?;
    tx.commit().await?;

    let Some(user) = user else {
        warn!(%email, "token requested for unknown email");
        return Err(AppError::BadRequest(BAD_CREDENTIALS.into()));
    };
    if !verify_password(password, &user.password_hash)? || !user.is_active {
        warn!(%email, user_id = %user.id, "token requested with bad credentials");
        return Err(AppError::BadRequest(BAD_CREDENTIALS.into()));
    }
    Ok(user)
}

/// Loads the token subject; a missing or deactivated account is a 401.
pub async fn load_user(store: &dyn Store, user_id: Uuid) -> Result<User, AppError> {
    let mut tx = store.begin().await?;
    let user = tx.find_user_by_id(user_id).await?;
    tx.commit().await?;
    match user {
        Some(user) if user.is_active => Ok(user),
        Some(user) => {
            warn!(user_id = %user.id, "token presented for inactive user");
            Err(AppError::Unauthorized("User inactive or deleted".into()))
        }
        None => {
            warn!(%user_id, "token subject no longer exists");
            Err(AppError::Unauthorized("User inactive or deleted".into()))
        }
    }
}

/// Updates name and/or password of the authenticated user.
pub async fn update_profile(
    store: &dyn Store,
    user_id: Uuid,
    changes: UpdateMeRequest,
) -> Result<User, AppError> {
    let mut errors = FieldErrors::default();
    if let Some(name) = changes.name.as_deref() {
        check_name(name, &mut errors);
    }
    if let Some(password) = changes.password.as_deref() {
        check_password(password, &mut errors);
    }
    errors.into_result()?;

    let mut tx = store.begin().await?;
    let mut user = tx
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
    if let Some(name) = changes.name {
        user.name = name.trim().to_string();
    }
    if let Some(password) = changes.password {
        user.password_hash = hash_password(&password)?;
    }
    let user = tx.update_user(&user).await?;
    tx.commit().await?;
    info!(user_id = %user.id, "profile updated");
    Ok(user)
}

/// Creates a staff superuser unless the email is already registered.
pub async fn ensure_superuser(store: &dyn Store, email: &str, password: &str) -> Result<User, AppError> {
    let email = normalize_email(email);
    let mut errors = FieldErrors::default();
    check_email(&email, &mut errors);
    check_password(password, &mut errors);
    errors.into_result()?;

    let mut tx = store.begin().await?;
    if let Some(existing) = tx.find_user_by_email(&email).await? {
        debug!(user_id = %existing.id, "superuser already present");
        return Ok(existing);
    }
    drop(tx);

    let user = insert_user(
        store,
        &NewUser {
            email,
            name: String::new(),
            password_hash: hash_password(password)?,
            is_staff: true,
            is_superuser: true,
        },
    )
    .await?;
    info!(user_id = %user.id, email = %user.email, "superuser created");
    Ok(user)
}
