//! Remote lookup used when no local peer matches a search term.

use std::time::Duration;

use hangouts_storage_traits::{Hangout, HangoutState};
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("invalid lookup url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("lookup request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("lookup returned {status} from {endpoint}")]
    Status {
        endpoint: &'static str,
        status: StatusCode,
    },
}

#[derive(Debug, Deserialize)]
struct HangoutsResponse {
    #[serde(default)]
    hangouts: Vec<Hangout>,
}

#[derive(Debug, Deserialize)]
struct UserRecord {
    username: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsersResponse {
    #[serde(default)]
    users: Vec<UserRecord>,
}

#[derive(Debug, Clone)]
pub struct LookupClient {
    http: reqwest::Client,
    base: String,
}

impl LookupClient {
    pub fn new(base: &str) -> Result<Self, LookupError> {
        // Validate eagerly so a bad config fails at login, not at first search.
        Url::parse(base)?;
        let http = reqwest::Client::builder()
            .timeout(LOOKUP_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    /// Known hangouts matching `term`, falling back to the user directory.
    ///
    /// Directory users come back in the pending `INVITE` state. A 404 from the
    /// hangouts endpoint counts as "no hangouts".
    pub async fn find(&self, term: &str, username: &str) -> Result<Vec<Hangout>, LookupError> {
        let hangouts = self.find_hangouts(term, username).await?;
        if !hangouts.is_empty() {
            return Ok(hangouts);
        }
        tracing::debug!(term_len = term.len(), "lookup: no hangouts, trying users");
        self.find_users(term).await
    }

    async fn find_hangouts(&self, term: &str, username: &str) -> Result<Vec<Hangout>, LookupError> {
        let url = Url::parse_with_params(
            &format!("{}/hangouts/find", self.base),
            &[("search", term), ("username", username)],
        )?;
        let resp = self.http.get(url).send().await?;
        match resp.status() {
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            status if status.is_success() => Ok(resp.json::<HangoutsResponse>().await?.hangouts),
            status => Err(LookupError::Status {
                endpoint: "hangouts/find",
                status,
            }),
        }
    }

    async fn find_users(&self, term: &str) -> Result<Vec<Hangout>, LookupError> {
        let url = Url::parse_with_params(&format!("{}/users/find", self.base), &[("search", term)])?;
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(LookupError::Status {
                endpoint: "users/find",
                status,
            });
        }
        let users = resp.json::<UsersResponse>().await?.users;
        Ok(users
            .into_iter()
            .map(|u| {
                let mut hangout = Hangout::new(u.username, HangoutState::Invite);
                hangout.email = u.email;
                hangout
            })
            .collect())
    }
}
