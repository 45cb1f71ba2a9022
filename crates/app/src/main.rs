use anyhow::{Context, bail};

use budget_eagle_app::{NewBill, Services};
use budget_eagle_auth::{IdentityProvider, InMemoryIdentityProvider, Principal};
use budget_eagle_infra::{AppConfig, BlobStore, DeliveryMode, InMemoryBlobStore, LoadOptions};

/// Sign in through the identity provider and resolve the acting principal.
async fn sign_in(
    identity: &InMemoryIdentityProvider,
    services: &Services,
    email: &str,
    password: &str,
) -> anyhow::Result<Principal> {
    identity
        .authenticate(email, password)
        .await
        .with_context(|| format!("sign-in failed for {email}"))?;
    let Some(session) = identity.session().await else {
        bail!("no session after signing in {email}");
    };
    Ok(services.users.principal_for(&session).await?)
}

/// The demo exits right after its last write, so spawned sends would be cut off.
fn demo_config(mut config: AppConfig) -> AppConfig {
    config.notifications.delivery = DeliveryMode::Inline;
    config
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let loaded = AppConfig::load(LoadOptions::default()).context("loading configuration")?;
    let config = demo_config(loaded);
    budget_eagle_observability::init(&config.logging);

    let services = Services::in_memory(&config);
    let identity = InMemoryIdentityProvider::default();

    for user in services.users.seed_demo_directory().await? {
        identity
            .register(user.id, &user.email, "password")
            .with_context(|| format!("registering {}", user.email))?;
    }

    let employee = sign_in(&identity, &services, "employeelogin2025@gmail.com", "password").await?;
    let receipt = InMemoryBlobStore::new()
        .upload("receipt.pdf", b"%PDF-1.4 office supplies".to_vec())
        .await
        .context("uploading receipt")?;
    let bill = services
        .bills
        .submit(
            &employee,
            NewBill {
                title: "Office Supplies".into(),
                description: "pens".into(),
                amount: 500,
                attachment: Some(receipt),
            },
        )
        .await?;
    identity.sign_out().await;

    let manager = sign_in(&identity, &services, "managerlogin2025@gmail.com", "password").await?;
    services.bills.approve(&manager, bill.id_typed()).await?;

    if let Err(err) = services.bills.approve(&manager, bill.id_typed()).await {
        tracing::info!(kind = err.kind(), message = %err.user_message(), "second approval refused");
    }

    let stats = services.bills.stats(&manager).await?;
    let departments = services.bills.department_totals(&manager).await?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    println!("{}", serde_json::to_string_pretty(&departments)?);

    identity.sign_out().await;
    Ok(())
}
