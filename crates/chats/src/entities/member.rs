use serde::{Deserialize, Serialize};

use crate::types::UserId;

/// Optional public profile of a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

/// Represents a member of a conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// User ID of the member
    pub user_id: UserId,
    /// Unique username
    pub username: String,
    /// Profile, when the user has filled one in
    #[serde(default)]
    pub profile: Option<Profile>,
}

impl Member {
    /// Create a member without profile information
    pub fn new(user_id: impl Into<UserId>, username: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            profile: None,
        }
    }

    /// Attach a display name to the member's profile
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        let profile = self.profile.get_or_insert_with(Profile::default);
        profile.display_name = Some(display_name.into());
        self
    }

    /// Name to show in the UI: profile display name, falling back to the username
    pub fn display_name(&self) -> &str {
        self.profile
            .as_ref()
            .and_then(|profile| profile.display_name.as_deref())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

/// The authenticated user a session acts for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: UserId,
    pub username: Option<String>,
}

impl Viewer {
    pub fn new(user_id: impl Into<UserId>, username: Option<String>) -> Self {
        Self {
            user_id: user_id.into(),
            username,
        }
    }

    /// Minimal sender snapshot used when the viewer is not among the loaded members
    pub fn stub_member(&self) -> Member {
        Member {
            user_id: self.user_id.clone(),
            username: self
                .username
                .clone()
                .unwrap_or_else(|| self.user_id.clone()),
            profile: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_prefers_profile() {
        let member = Member::new("u1", "ada").with_display_name("Ada Lovelace");
        assert_eq!(member.display_name(), "Ada Lovelace");

        let plain = Member::new("u2", "grace");
        assert_eq!(plain.display_name(), "grace");
    }

    #[test]
    fn test_blank_display_name_falls_back_to_username() {
        let member = Member::new("u1", "ada").with_display_name("  ");
        assert_eq!(member.display_name(), "ada");
    }

    #[test]
    fn test_viewer_stub_member() {
        let named = Viewer::new("u1", Some("ada".to_string()));
        assert_eq!(named.stub_member(), Member::new("u1", "ada"));

        let anonymous = Viewer::new("u9", None);
        assert_eq!(anonymous.stub_member().username, "u9");
    }
}
