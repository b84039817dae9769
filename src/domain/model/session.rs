use serde::{Deserialize, Serialize};
use std::fmt;

/// 不透明なBearerトークン。Debug出力では伏せる。
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `Authorization` ヘッダー値
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

/// 表示用のユーザー情報。どのフィールドも欠けうる。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserProfile {
    /// アバターに出す1文字。username → email → "U" の順。
    pub fn avatar_initial(&self) -> String {
        [self.username.as_deref(), self.email.as_deref()]
            .into_iter()
            .flatten()
            .find_map(|s| s.chars().next())
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_else(|| "U".to_string())
    }

    pub fn display_name(&self) -> &str {
        non_empty(self.username.as_deref()).unwrap_or("Guest User")
    }

    pub fn display_email(&self) -> &str {
        non_empty(self.email.as_deref()).unwrap_or("No email available")
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.is_empty())
}

/// 永続ストレージ上のセッション（tokenとuserの2エントリ）。
/// 画面遷移ごとに読み直すスナップショットとして扱う。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<AuthToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}

impl Session {
    pub fn signed_in(token: AuthToken, user: UserProfile) -> Self {
        Self {
            token: Some(token),
            user: Some(user),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn token(&self) -> Option<&AuthToken> {
        self.token.as_ref()
    }

    /// 未ログイン時は空のプロフィールを返す。
    pub fn profile(&self) -> UserProfile {
        self.user.clone().unwrap_or_default()
    }
}

/// サインイン入力
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// 送信前に前後の空白を除去する。
    pub fn trimmed(&self) -> Self {
        Self {
            username: self.username.trim().to_string(),
            password: self.password.trim().to_string(),
        }
    }
}

/// サインアップ入力
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl Registration {
    pub fn trimmed(&self) -> Self {
        Self {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.trim().to_string(),
        }
    }
}

/// フィードバック送信内容
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub username: String,
    pub email: String,
    pub message: String,
}

impl Feedback {
    /// プロフィールが無ければ "Anonymous" / 空メールで送る。
    pub fn from_profile(profile: &UserProfile, message: impl Into<String>) -> Self {
        Self {
            username: non_empty(profile.username.as_deref())
                .unwrap_or("Anonymous")
                .to_string(),
            email: profile.email.clone().unwrap_or_default(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_debug_is_redacted() {
        let token = AuthToken::new("secret");
        assert_eq!(format!("{token:?}"), "AuthToken(***)");
        assert_eq!(token.bearer(), "Bearer secret");
    }

    #[test]
    fn avatar_initial_prefers_username() {
        let profile = UserProfile {
            username: Some("alice".into()),
            email: Some("bob@example.com".into()),
            ..Default::default()
        };
        assert_eq!(profile.avatar_initial(), "A");
    }

    #[test]
    fn avatar_initial_falls_back_to_email_then_u() {
        let profile = UserProfile {
            email: Some("bob@example.com".into()),
            ..Default::default()
        };
        assert_eq!(profile.avatar_initial(), "B");
        assert_eq!(UserProfile::default().avatar_initial(), "U");
    }

    #[test]
    fn display_fallbacks() {
        let profile = UserProfile::default();
        assert_eq!(profile.display_name(), "Guest User");
        assert_eq!(profile.display_email(), "No email available");
    }

    #[test]
    fn session_roundtrip_uses_two_keys() {
        let session = Session::signed_in(
            AuthToken::new("t"),
            UserProfile {
                username: Some("alice".into()),
                ..Default::default()
            },
        );
        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(value["token"], "t");
        assert_eq!(value["user"]["username"], "alice");
        let back: Session = serde_json::from_value(value).unwrap();
        assert_eq!(back, session);
    }

    #[test]
    fn empty_session_is_anonymous() {
        let session: Session = serde_json::from_str("{}").unwrap();
        assert!(!session.is_authenticated());
        assert_eq!(session.profile(), UserProfile::default());
    }

    #[test]
    fn credentials_are_trimmed() {
        let creds = Credentials {
            username: " alice ".into(),
            password: "pw\n".into(),
        };
        let t = creds.trimmed();
        assert_eq!(t.username, "alice");
        assert_eq!(t.password, "pw");
    }

    #[test]
    fn anonymous_feedback() {
        let fb = Feedback::from_profile(&UserProfile::default(), "Great app");
        assert_eq!(fb.username, "Anonymous");
        assert_eq!(fb.email, "");
        assert_eq!(fb.message, "Great app");
    }
}
