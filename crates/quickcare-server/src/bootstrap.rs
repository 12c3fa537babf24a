//! First-start seeding of the initial admin account.

use quickcare_auth::password::hash_password;
use quickcare_core::{Role, User};
use quickcare_storage::UserStore;

use crate::config::BootstrapConfig;

/// Creates the configured admin account if no user with that email
/// exists yet. Idempotent across restarts.
pub async fn seed_admin(users: &dyn UserStore, cfg: &BootstrapConfig) -> anyhow::Result<()> {
    if !cfg.enabled {
        tracing::debug!("Bootstrap disabled, skipping admin seed");
        return Ok(());
    }

    if users.find_user_by_email(&cfg.admin_email).await?.is_some() {
        tracing::debug!(email = %cfg.admin_email, "Admin account already present");
        return Ok(());
    }

    let hash = hash_password(&cfg.admin_password).map_err(|e| anyhow::anyhow!(e))?;
    let admin = User::new(&cfg.admin_name, &cfg.admin_email, hash, Role::Admin);
    let admin = users.create_user(admin).await?;
    tracing::info!(user_id = %admin.id, email = %admin.email, "Seeded initial admin account");
    Ok(())
}
