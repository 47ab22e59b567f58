use ab_core::{AppError, Table};
use integration_tests::Harness;

#[tokio::test]
async fn ensure_profile_is_idempotent() {
    let h = Harness::new();
    let actor = h.sign_in("haruto.sato@example.com");
    let profiles = h.community.profiles();

    let first = profiles.ensure_profile(&actor).await.unwrap();
    let second = profiles.ensure_profile(&actor).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.id, actor.id);
    assert_eq!(first.username, "haruto.sato");
    assert_eq!(h.backend.row_count(Table::Profiles), 1);

    assert_eq!(profiles.current_profile().await.unwrap(), Some(first));
}

#[tokio::test]
async fn guests_have_no_current_profile() {
    let h = Harness::new();
    assert_eq!(h.community.profiles().current_profile().await.unwrap(), None);
}

#[tokio::test]
async fn ensure_profile_requires_a_session() {
    let h = Harness::new();
    let actor = h.sign_in("nobody@example.com");
    h.backend.sign_out();

    let err = h.community.profiles().ensure_profile(&actor).await.unwrap_err();
    assert_eq!(err, AppError::Unauthenticated);
}
