//! Mentorship applications. Every application starts out `pending`.

use std::sync::Arc;

use ab_core::{AppError, Availability, BackendClient, Mentor, MentorStatus, Result, RowQuery, Table};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::feed::require_text;

#[derive(Debug, Clone, Default)]
pub struct MentorApplication {
    pub expertise: Vec<String>,
    pub languages: Vec<String>,
    pub availability: Option<Availability>,
    pub experience: String,
    pub bio: String,
}

#[derive(Serialize)]
struct NewMentorRow<'a> {
    user_id: Uuid,
    expertise: &'a [String],
    languages: &'a [String],
    availability: Availability,
    experience: &'a str,
    bio: &'a str,
    status: MentorStatus,
}

pub struct MentorRegistry {
    client: Arc<BackendClient>,
}

impl MentorRegistry {
    pub fn new(client: Arc<BackendClient>) -> Self {
        Self { client }
    }

    pub async fn register(&self, application: MentorApplication) -> Result<Mentor> {
        if application.expertise.is_empty() {
            return Err(AppError::validation("pick at least one area of expertise"));
        }
        if application.languages.is_empty() {
            return Err(AppError::validation("pick at least one language"));
        }
        let availability = application
            .availability
            .ok_or_else(|| AppError::validation("availability is required"))?;
        require_text("experience", &application.experience)?;
        require_text("bio", &application.bio)?;

        let actor = self.client.require_actor().await?;
        let row = NewMentorRow {
            user_id: actor.id,
            expertise: &application.expertise,
            languages: &application.languages,
            availability,
            experience: &application.experience,
            bio: &application.bio,
            status: MentorStatus::Pending,
        };
        let mentor: Mentor = self.client.insert(Table::Mentors, &row).await?;
        info!(mentor_id = %mentor.id, actor_id = %actor.id, "mentor application submitted");
        Ok(mentor)
    }

    /// Applications filed by the current actor, newest first.
    pub async fn my_applications(&self) -> Result<Vec<Mentor>> {
        let actor = self.client.require_actor().await?;
        let mut mentors: Vec<Mentor> = self
            .client
            .query(
                Table::Mentors,
                &RowQuery::new()
                    .eq("user_id", actor.id)
                    .order_by("created_at", false),
            )
            .await?;
        mentors.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(mentors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ab_core::{MockAuthSession, MockBlobStore, MockRowStore};

    fn registry_without_backend_calls() -> MentorRegistry {
        let mut auth = MockAuthSession::new();
        auth.expect_current_actor().never();
        let mut rows = MockRowStore::new();
        rows.expect_insert().never();
        let client = BackendClient::new(Arc::new(auth), Arc::new(rows), Arc::new(MockBlobStore::new()));
        MentorRegistry::new(Arc::new(client))
    }

    fn complete() -> MentorApplication {
        MentorApplication {
            expertise: vec!["Housing Assistance".into()],
            languages: vec!["Japanese".into()],
            availability: Some(Availability::Weekends),
            experience: "Lived in Osaka for six years".into(),
            bio: "Happy to help newcomers".into(),
        }
    }

    #[tokio::test]
    async fn incomplete_applications_fail_validation_locally() {
        let registry = registry_without_backend_calls();

        let no_languages = MentorApplication { languages: vec![], ..complete() };
        let no_availability = MentorApplication { availability: None, ..complete() };
        let blank_bio = MentorApplication { bio: "   ".into(), ..complete() };

        for application in [no_languages, no_availability, blank_bio] {
            let err = registry.register(application).await.unwrap_err();
            assert!(matches!(err, AppError::ValidationFailed(_)), "{err:?}");
        }
    }
}
