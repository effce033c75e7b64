//! Startup seeding of the first master admin.
//!
//! Signup only ever creates `user` accounts and only a master admin may
//! assign roles, so a fresh deployment needs one seeded account.

use stockroom_auth::{Role, hash_password};
use tracing::info;

use crate::config::SeedAdminConfig;
use crate::models::{UserRecord, normalize_email};
use crate::repository::UserRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    Created,
    AlreadyPresent,
}

/// Inserts a `master_admin` with the configured credentials unless a user
/// with that email already exists. An existing account is left untouched,
/// whatever its role.
pub async fn seed_master_admin(
    users: &UserRepository,
    seed: &SeedAdminConfig,
) -> anyhow::Result<SeedOutcome> {
    let email = normalize_email(&seed.email);
    if let Some(existing) = users.find_by_email(&email).await? {
        info!(user_id = %existing.id, role = %existing.role, "seed admin already present, skipping");
        return Ok(SeedOutcome::AlreadyPresent);
    }

    let password = seed.password.clone();
    let hash = tokio::task::spawn_blocking(move || hash_password(&password)).await??;

    let record = UserRecord {
        id: uuid::Uuid::new_v4().to_string(),
        name: seed.name.trim().to_string(),
        email,
        password: hash,
        role: Role::MasterAdmin,
        gender: None,
        age: None,
        address: None,
        phone: None,
    };
    users
        .insert(&record)
        .await
        .map_err(|e| anyhow::anyhow!("failed to insert seed admin: {}", e.message()))?;

    info!(user_id = %record.id, "seeded master admin");
    Ok(SeedOutcome::Created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheBackend, CacheTtls, EntityCache};
    use std::sync::Arc;
    use stockroom_auth::verify_password;

    fn users() -> UserRepository {
        let cache = EntityCache::new(Arc::new(CacheBackend::new_local()), CacheTtls::default());
        UserRepository::new(stockroom_db_memory::create_memory_store(), cache)
    }

    fn seed() -> SeedAdminConfig {
        SeedAdminConfig {
            name: "Root".into(),
            email: "Root@Example.com".into(),
            password: "changeme".into(),
        }
    }

    #[tokio::test]
    async fn seeds_once() {
        let users = users();
        assert_eq!(
            seed_master_admin(&users, &seed()).await.unwrap(),
            SeedOutcome::Created
        );
        assert_eq!(
            seed_master_admin(&users, &seed()).await.unwrap(),
            SeedOutcome::AlreadyPresent
        );

        let admin = users.find_by_email("root@example.com").await.unwrap().unwrap();
        assert_eq!(admin.role, Role::MasterAdmin);
        assert!(verify_password("changeme", &admin.password).unwrap());
    }
}
