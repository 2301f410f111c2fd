use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Which flow a password reset link belongs to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecoveryMode {
    /// The user forgot their password.
    #[default]
    Recover,
    /// The account has no password yet, e.g. it was created through SSO.
    SetPassword,
}

impl RecoveryMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            RecoveryMode::Recover => "recover",
            RecoveryMode::SetPassword => "set-password",
        }
    }
}

/// A password reset token as passed between services.
///
/// The defaults stand for "no record": id and user id are `-1` and the hash is
/// empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcLostPasswordHash {
    pub id: i64,
    pub user_id: i64,
    pub hash: String,
    pub date_added: Option<DateTime<Utc>>,
}

impl Default for RpcLostPasswordHash {
    fn default() -> Self {
        RpcLostPasswordHash {
            id: -1,
            user_id: -1,
            hash: String::new(),
            date_added: None,
        }
    }
}

impl RpcLostPasswordHash {
    /// Link the user follows to pick a new password, rooted at `base`.
    pub fn get_absolute_url(&self, base: &Url, mode: RecoveryMode) -> Result<Url, url::ParseError> {
        let mut base = base.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        base.join(&format!(
            "account/{}/confirm/{}/{}/",
            mode.as_str(),
            self.user_id,
            self.hash
        ))
    }
}
