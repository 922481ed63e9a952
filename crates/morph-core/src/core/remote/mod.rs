//! Remote sync of a workspace's script and document with a gist.

mod gist;
mod net;

pub use gist::GistClient;
pub use net::build_http_client;

use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum RemoteSyncError {
    #[error("remote sync is disabled (MORPH_ONLINE=0)")]
    Offline,
    #[error("invalid gist id {remote_ref:?}")]
    InvalidRef { remote_ref: String },
    #[error("saving a gist requires a token in ${env}")]
    MissingToken { env: String },
    #[error("gist API rejected the credentials ({status})")]
    Unauthorized { status: StatusCode },
    #[error("gist {remote_ref} was not found")]
    NotFound { remote_ref: String },
    #[error("gist API returned {status}")]
    Status { status: StatusCode },
    #[error("gist API request failed")]
    Transport(#[source] reqwest::Error),
    #[error("gist API returned an unreadable body")]
    Decode(#[source] reqwest::Error),
}

impl RemoteSyncError {
    /// Stable machine-readable reason for JSON output.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            RemoteSyncError::Offline => "offline",
            RemoteSyncError::InvalidRef { .. } => "invalid_gist_id",
            RemoteSyncError::MissingToken { .. } => "missing_token",
            RemoteSyncError::Unauthorized { .. } => "unauthorized",
            RemoteSyncError::NotFound { .. } => "gist_not_found",
            RemoteSyncError::Status { .. } => "http_status",
            RemoteSyncError::Transport(_) => "transport",
            RemoteSyncError::Decode(_) => "decode",
        }
    }

    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            RemoteSyncError::Offline => Some("unset MORPH_ONLINE or set it to 1".to_string()),
            RemoteSyncError::MissingToken { env } => {
                Some(format!("export {env}=<token with gist scope>"))
            }
            RemoteSyncError::Unauthorized { .. } => {
                Some("check that the token is valid and owns the gist".to_string())
            }
            RemoteSyncError::NotFound { .. } | RemoteSyncError::InvalidRef { .. } => {
                Some("check the id with `morph gist link <ID>`".to_string())
            }
            RemoteSyncError::Status { .. }
            | RemoteSyncError::Transport(_)
            | RemoteSyncError::Decode(_) => None,
        }
    }

    /// Errors the user can resolve by changing configuration or input.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        !matches!(
            self,
            RemoteSyncError::Status { .. }
                | RemoteSyncError::Transport(_)
                | RemoteSyncError::Decode(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_and_hints_follow_the_variant() {
        let err = RemoteSyncError::MissingToken {
            env: "GITHUB_TOKEN".to_string(),
        };
        assert_eq!(err.reason(), "missing_token");
        assert!(err.to_string().contains("$GITHUB_TOKEN"));
        assert!(err.hint().is_some_and(|hint| hint.contains("GITHUB_TOKEN")));
        assert!(err.is_user_error());

        let err = RemoteSyncError::Status {
            status: StatusCode::BAD_GATEWAY,
        };
        assert!(!err.is_user_error());
        assert!(err.hint().is_none());
    }
}
