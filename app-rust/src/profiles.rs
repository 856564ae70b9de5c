use crate::{store::encode, StudyError, StudyResult, UserProfile, UserSession};
use serde_json::json;

pub const DEFAULT_DISPLAY_NAME: &str = "Student";

/// Upper-cased first character of the display name.
#[must_use]
pub fn avatar_for(name: &str) -> String {
    name.chars()
        .next()
        .map(|first| first.to_uppercase().collect())
        .unwrap_or_default()
}

pub struct ProfileService<'a> {
    session: &'a UserSession,
}

impl<'a> ProfileService<'a> {
    pub(crate) fn new(session: &'a UserSession) -> Self {
        Self { session }
    }

    /// Write the profile document for a freshly registered user.
    pub async fn create(&self, name: &str, email: &str, phone: &str) -> StudyResult<UserProfile> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StudyError::validation("Name is required."));
        }

        let profile = UserProfile {
            uid: self.session.uid().to_string(),
            name: name.to_string(),
            email: email.trim().to_string(),
            phone: phone.trim().to_string(),
            avatar: avatar_for(name),
        };
        self.session
            .store()
            .set(&self.session.user_path(), encode(&profile)?)
            .await?;
        Ok(profile)
    }

    /// The stored profile with defaults filled in. Users created before the
    /// profile document existed get the default display name.
    pub async fn load(&self) -> StudyResult<UserProfile> {
        let stored = match self.session.store().get(&self.session.user_path()).await? {
            Some(document) => document.data,
            None => json!({}),
        };
        let field = |key: &str| {
            stored
                .get(key)
                .and_then(|value| value.as_str())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(ToString::to_string)
        };

        let name = field("name").unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string());
        Ok(UserProfile {
            uid: self.session.uid().to_string(),
            avatar: avatar_for(&name),
            email: field("email").unwrap_or_default(),
            phone: field("phone").unwrap_or_default(),
            name,
        })
    }

    /// Change the editable fields of an existing profile.
    pub async fn update(&self, name: &str, phone: &str) -> StudyResult<UserProfile> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StudyError::validation("Name is required."));
        }

        self.session
            .store()
            .update(
                &self.session.user_path(),
                json!({
                    "name": name,
                    "phone": phone.trim(),
                    "avatar": avatar_for(name),
                }),
            )
            .await?;
        self.load().await
    }
}
