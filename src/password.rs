use bcrypt::{hash, verify};

use crate::error::{AppError, AppResult};

/// PasswordHasher
///
/// bcrypt with a configurable cost. Hashing is CPU-bound, so both operations run on the
/// blocking pool instead of stalling the async runtime.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    /// Cost should be between 4 and 31; `AppConfig` enforces the range.
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub async fn hash(&self, password: &str) -> AppResult<String> {
        let password = password.to_owned();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || hash(password, cost))
            .await
            .map_err(|e| AppError::Internal(format!("password hashing task failed: {e}")))?
            .map_err(AppError::from)
    }

    pub async fn verify(&self, password: &str, hashed: &str) -> AppResult<bool> {
        let password = password.to_owned();
        let hashed = hashed.to_owned();
        tokio::task::spawn_blocking(move || verify(password, &hashed))
            .await
            .map_err(|e| AppError::Internal(format!("password verification task failed: {e}")))?
            .map_err(AppError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify() {
        let hasher = PasswordHasher::new(4);
        let hashed = hasher.hash("correct horse").await.unwrap();

        assert!(hashed.starts_with("$2"));
        assert_eq!(hashed.len(), 60);
        assert!(hasher.verify("correct horse", &hashed).await.unwrap());
        assert!(!hasher.verify("battery staple", &hashed).await.unwrap());
    }

    #[tokio::test]
    async fn malformed_hash_is_an_error() {
        let hasher = PasswordHasher::new(4);
        assert!(hasher.verify("anything", "not-a-bcrypt-hash").await.is_err());
    }
}
