//! Integration tests for the authentication guardian

use async_trait::async_trait;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::sync::Arc;
use xui_guardian::{
    allowed_transitions, validate_transition, Access, AuthBackend, AuthError, DefaultRegistration,
    DefaultUser, Guardian, GuardianError, GuardianEvent, GuardianPhase, UserProfile,
    TOKEN_STORAGE_KEY,
};
use xui_session::MemorySideStore;

#[derive(Default)]
struct ScriptedBackend {
    logout_refused: bool,
}

#[async_trait]
impl AuthBackend for ScriptedBackend {
    type User = DefaultUser;
    type Registration = DefaultRegistration;

    async fn fetch_user(&self, token: &str) -> Result<DefaultUser, AuthError> {
        match token {
            "t-ada" => Ok(DefaultUser {
                id: "ada".to_string(),
                email: "ada@example.com".to_string(),
                profile: UserProfile {
                    first_name: "Ada".to_string(),
                    last_name: "Lovelace".to_string(),
                },
                roles: vec!["ADMIN".to_string()],
            }),
            _ => Err(AuthError::new("unknown token")),
        }
    }

    async fn login(&self, username: &str, _password: &str) -> Result<String, AuthError> {
        Ok(format!("t-{username}"))
    }

    async fn register(&self, registration: &DefaultRegistration) -> Result<Option<String>, AuthError> {
        if registration.email.ends_with("@example.com") {
            Ok(Some("t-ada".to_string()))
        } else {
            Ok(None)
        }
    }

    async fn verify_email(&self, email_token: &str) -> Result<String, AuthError> {
        Ok(format!("t-{email_token}"))
    }

    async fn logout(&self, _token: &str) -> Result<(), AuthError> {
        if self.logout_refused {
            Err(AuthError::new("server unavailable"))
        } else {
            Ok(())
        }
    }
}

fn registration(email: &str) -> DefaultRegistration {
    DefaultRegistration {
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        email: email.to_string(),
        password: "secret".to_string(),
    }
}

#[tokio::test]
async fn test_events_follow_login_and_logout() {
    let guardian = Guardian::new(
        Arc::new(ScriptedBackend::default()),
        Arc::new(MemorySideStore::new()),
        TOKEN_STORAGE_KEY,
    );
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let _sub = guardian.subscribe(move |e| sink.lock().push(e.clone()));

    guardian.init().await.unwrap();
    guardian.login("ada", "pw").await.unwrap();
    guardian.logout().await.unwrap();

    assert_eq!(
        *events.lock(),
        vec![
            GuardianEvent::TokenUpdated { token: None },
            GuardianEvent::LoggedIn {
                token: "t-ada".to_string()
            },
            GuardianEvent::TokenUpdated {
                token: Some("t-ada".to_string())
            },
            GuardianEvent::LoggedOut {
                user_id: Some("ada".to_string())
            },
            GuardianEvent::TokenUpdated { token: None },
        ]
    );
}

#[tokio::test]
async fn test_restart_resumes_session() {
    let side = Arc::new(MemorySideStore::new());
    let first = Guardian::new(Arc::new(ScriptedBackend::default()), side.clone(), TOKEN_STORAGE_KEY);
    first.init().await.unwrap();
    first.login("ada", "pw").await.unwrap();

    let second = Guardian::new(Arc::new(ScriptedBackend::default()), side, TOKEN_STORAGE_KEY);
    second.init().await.unwrap();

    assert_eq!(second.phase(), GuardianPhase::Authenticated);
    assert_eq!(second.user().unwrap().profile.first_name, "Ada");
    assert_eq!(second.access(&[]), Access::Granted);
}

#[tokio::test]
async fn test_login_with_unusable_token_marks_invalid() {
    let side = Arc::new(MemorySideStore::new());
    let guardian = Guardian::new(Arc::new(ScriptedBackend::default()), side.clone(), TOKEN_STORAGE_KEY);
    guardian.init().await.unwrap();

    let err = guardian.login("bob", "pw").await.unwrap_err();

    assert!(err.is_backend());
    assert_eq!(guardian.phase(), GuardianPhase::InvalidToken);
    assert_eq!(side.get(TOKEN_STORAGE_KEY), None);

    guardian.login("ada", "pw").await.unwrap();
    assert_eq!(guardian.phase(), GuardianPhase::Authenticated);
}

#[tokio::test]
async fn test_register_and_verify() {
    let guardian = Guardian::new(
        Arc::new(ScriptedBackend::default()),
        Arc::new(MemorySideStore::new()),
        TOKEN_STORAGE_KEY,
    );
    guardian.init().await.unwrap();

    let pending = guardian.register(&registration("ada@elsewhere.org")).await.unwrap();
    assert_eq!(pending, None);
    assert_eq!(guardian.phase(), GuardianPhase::Anonymous);

    let token = guardian.verify_email("ada").await.unwrap();
    assert_eq!(token, "t-ada");
    assert!(guardian.has_role("ADMIN"));

    let immediate = guardian.register(&registration("ada@example.com")).await.unwrap();
    assert_eq!(immediate.as_deref(), Some("t-ada"));
}

#[tokio::test]
async fn test_refused_logout_keeps_session() {
    let side = Arc::new(MemorySideStore::new());
    let backend = ScriptedBackend { logout_refused: true };
    let guardian = Guardian::new(Arc::new(backend), side.clone(), TOKEN_STORAGE_KEY);
    guardian.init().await.unwrap();
    guardian.login("ada", "pw").await.unwrap();

    let err = guardian.logout().await.unwrap_err();

    assert!(matches!(err, GuardianError::Backend(_)));
    assert_eq!(guardian.phase(), GuardianPhase::Authenticated);
    assert_eq!(side.get(TOKEN_STORAGE_KEY).as_deref(), Some("t-ada"));
}

#[test]
fn test_terminal_free_table() {
    for phase in [
        GuardianPhase::Uninitialised,
        GuardianPhase::Fetching,
        GuardianPhase::Anonymous,
        GuardianPhase::InvalidToken,
        GuardianPhase::Authenticated,
    ] {
        assert!(!allowed_transitions(phase).is_empty(), "{phase} has no way out");
        assert!(!allowed_transitions(phase).contains(&phase));
    }
}

fn phase() -> impl Strategy<Value = GuardianPhase> {
    prop_oneof![
        Just(GuardianPhase::Uninitialised),
        Just(GuardianPhase::Fetching),
        Just(GuardianPhase::Anonymous),
        Just(GuardianPhase::InvalidToken),
        Just(GuardianPhase::Authenticated),
    ]
}

proptest! {
    #[test]
    fn prop_validation_matches_table(from in phase(), to in phase()) {
        let res = validate_transition(from, to);
        let allowed = allowed_transitions(from);

        if res.is_ok() {
            prop_assert!(allowed.contains(&to));
        } else {
            prop_assert!(!allowed.contains(&to));
        }
    }
}
