use crate::{
    config::AppConfig,
    error::AppResult,
    models::{NewUser, User, UserDetails, UserRole, normalize_email},
    password::PasswordHasher,
    repository::RepositoryState,
};

/// seed_super_admin
///
/// Creates the super admin account from the configured credentials when none exists yet.
/// Returns the created user, or `None` when a super admin was already present.
pub async fn seed_super_admin(repo: &RepositoryState, config: &AppConfig) -> AppResult<Option<User>> {
    if let Some(existing) = repo.find_super_admin().await? {
        tracing::debug!(user_id = %existing.id, "super admin already present");
        return Ok(None);
    }

    let password_hash = PasswordHasher::new(config.bcrypt_cost)
        .hash(&config.super_admin_password)
        .await?;
    let user = repo
        .create_user(NewUser {
            email: normalize_email(&config.super_admin_email)?,
            password_hash,
            name: "Super Admin".to_string(),
            role: UserRole::SuperAdmin,
            details: UserDetails::default(),
        })
        .await?;
    tracing::info!(user_id = %user.id, email = %user.email, "super admin seeded");
    Ok(Some(user))
}
