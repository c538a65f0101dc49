//! 认证流程集成测试（内存存储）

mod common;

use common::{Harness, SEED_ADMIN_EMAIL, SEED_ADMIN_PASSWORD};
use warden_common::Scope;
use warden_errors::AppError;
use warden_identity::application::{ProvisionAccount, ProvisionCredential};
use warden_identity::domain::{CredentialRepository, PrincipalUpdate};

#[tokio::test]
async fn test_seed_admin_login() {
    let harness = Harness::new();
    harness.seed_admin().await;
    let gateway = &harness.state.gateway;

    let issued = gateway
        .login(Scope::Admin, SEED_ADMIN_EMAIL, SEED_ADMIN_PASSWORD)
        .await
        .unwrap();
    let claims = gateway.tokens().decode(&issued.token).unwrap();
    assert_eq!(claims.scope.as_deref(), Some("admin"));
    assert!(gateway.tokens().authenticate(&issued.token).is_ok());

    let wrong = gateway.login(Scope::Admin, SEED_ADMIN_EMAIL, "wrong").await;
    assert!(matches!(wrong, Err(AppError::InvalidCredentials)));
}

#[tokio::test]
async fn test_seed_admin_hash_is_upgraded_on_login() {
    let harness = Harness::new();
    harness.seed_admin().await;
    let gateway = &harness.state.gateway;

    gateway
        .login(Scope::Admin, SEED_ADMIN_EMAIL, SEED_ADMIN_PASSWORD)
        .await
        .unwrap();

    let stored = harness
        .store
        .find_by_email_and_scope(SEED_ADMIN_EMAIL, Scope::Admin)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.password_hash.as_str().starts_with("$argon2id$"));

    gateway
        .login(Scope::Admin, SEED_ADMIN_EMAIL, SEED_ADMIN_PASSWORD)
        .await
        .unwrap();
    let wrong = gateway.login(Scope::Admin, SEED_ADMIN_EMAIL, "wrong").await;
    assert!(matches!(wrong, Err(AppError::InvalidCredentials)));
}

#[tokio::test]
async fn test_password_does_not_cross_scopes() {
    let harness = Harness::new();
    harness.seed_admin().await;

    let result = harness
        .state
        .gateway
        .login(Scope::User, SEED_ADMIN_EMAIL, SEED_ADMIN_PASSWORD)
        .await;
    assert!(matches!(result, Err(AppError::InvalidCredentials)));
}

#[tokio::test]
async fn test_registration_lifecycle() {
    let mut harness = Harness::new();
    let accounts = harness.state.accounts.clone();
    let gateway = harness.state.gateway.clone();

    let principal = accounts.register(" Alice@Example.com", "correct horse").await.unwrap();
    assert!(!principal.active);
    assert_eq!(principal.email.as_str(), "alice@example.com");

    // 未激活账户不能登录
    let early = gateway.login(Scope::User, "alice@example.com", "correct horse").await;
    assert!(matches!(early, Err(AppError::InvalidCredentials)));

    let (email, hash) = harness.next_link().await;
    assert_eq!(email, "alice@example.com");

    let activated = accounts.verify(&hash).await.unwrap();
    assert!(activated.active);
    assert_eq!(activated.id, principal.id);

    let issued = gateway
        .login(Scope::User, "alice@example.com", "correct horse")
        .await
        .unwrap();
    assert_eq!(issued.scope, Scope::User);

    assert!(matches!(accounts.verify(&hash).await, Err(AppError::LinkExpired)));
}

#[tokio::test]
async fn test_concurrent_verification_activates_once() {
    let mut harness = Harness::new();
    let accounts = harness.state.accounts.clone();
    accounts.register("race@example.com", "pw-race").await.unwrap();
    let (_, hash) = harness.next_link().await;

    let attempts: Vec<_> = (0..8)
        .map(|_| {
            let accounts = accounts.clone();
            let hash = hash.clone();
            tokio::spawn(async move { accounts.verify(&hash).await })
        })
        .collect();

    let mut succeeded = 0;
    for attempt in attempts {
        match attempt.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(AppError::LinkExpired) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(succeeded, 1);
}

#[tokio::test]
async fn test_duplicate_registration() {
    let harness = Harness::new();
    let accounts = &harness.state.accounts;

    accounts.register("dup@example.com", "pw").await.unwrap();
    let again = accounts.register("DUP@example.com", "other").await;
    assert!(matches!(again, Err(AppError::DuplicateAccount)));
}

#[tokio::test]
async fn test_unknown_verification_hash() {
    let harness = Harness::new();
    let result = harness.state.accounts.verify("deadbeef").await;
    assert!(matches!(result, Err(AppError::LinkExpired)));
}

#[tokio::test]
async fn test_provisioned_accounts() {
    let harness = Harness::new();
    let accounts = &harness.state.accounts;
    let gateway = &harness.state.gateway;

    accounts
        .provision(ProvisionAccount {
            email: "ops@example.com".to_string(),
            scope: Scope::Admin,
            credential: Some(ProvisionCredential::Password("ops-password".to_string())),
            active: true,
        })
        .await
        .unwrap();
    let issued = gateway
        .login(Scope::Admin, "ops@example.com", "ops-password")
        .await
        .unwrap();
    assert_eq!(issued.scope, Scope::Admin);

    let no_password = accounts
        .provision(ProvisionAccount {
            email: "nologin@example.com".to_string(),
            scope: Scope::User,
            credential: None,
            active: true,
        })
        .await
        .unwrap();
    assert!(no_password.active);
    let result = gateway.login(Scope::User, "nologin@example.com", "").await;
    assert!(matches!(result, Err(AppError::InvalidCredentials)));
}

#[tokio::test]
async fn test_resent_link_supersedes_on_consume() {
    let mut harness = Harness::new();
    harness.seed_admin().await;
    let accounts = harness.state.accounts.clone();
    let gateway = harness.state.gateway.clone();

    let principal = accounts.register("late@example.com", "pw-late").await.unwrap();
    let (_, first) = harness.next_link().await;

    let admin_token = gateway
        .login(Scope::Admin, SEED_ADMIN_EMAIL, SEED_ADMIN_PASSWORD)
        .await
        .unwrap()
        .token;
    let admin = gateway.authorize(Some(&admin_token), Scope::Admin).unwrap();
    accounts.resend_verification(&admin, principal.id).await.unwrap();
    let (_, second) = harness.next_link().await;
    assert_ne!(first, second);

    accounts.verify(&second).await.unwrap();
    assert!(matches!(accounts.verify(&first).await, Err(AppError::LinkExpired)));

    let again = accounts.resend_verification(&admin, principal.id).await;
    assert!(matches!(again, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_scope_escalation_is_ignored_for_users() {
    let mut harness = Harness::new();
    let accounts = harness.state.accounts.clone();
    let gateway = harness.state.gateway.clone();

    let principal = accounts.register("bob@example.com", "pw-bob").await.unwrap();
    let (_, hash) = harness.next_link().await;
    accounts.verify(&hash).await.unwrap();

    let token = gateway
        .login(Scope::User, "bob@example.com", "pw-bob")
        .await
        .unwrap()
        .token;
    let bob = gateway.authorize(Some(&token), Scope::User).unwrap();

    let updated = accounts
        .update(
            &bob,
            principal.id,
            PrincipalUpdate {
                email: None,
                scope: Some(Scope::Admin),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.scope, Scope::User);
}
