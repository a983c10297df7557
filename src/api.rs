//! One-shot REST calls against the voting service.
//!
//! Every method performs a single request and returns parsed JSON or an
//! [`Error`]. Nothing here retries, caches, or times out; failure policy
//! (notice + log, never a crash) lives in the app layer.

use serde::Deserialize;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::types::{LeaderboardEntry, NewPoll, Poll, PollId, Role, Session};

pub struct ApiClient {
    http: reqwest::Client,
    base: String,
}

/// `{"error": "..."}` payload the server uses for application errors.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Reply shape shared by the login endpoints. A 200 can still carry an
/// error payload, so all fields are optional and checked after parse.
#[derive(Debug, Deserialize)]
struct AuthReply {
    token: Option<String>,
    roles: Option<String>,
    error: Option<String>,
}

impl AuthReply {
    fn into_session(self) -> Result<Session> {
        if let Some(error) = self.error {
            return Err(Error::Server(error));
        }
        let token = self
            .token
            .ok_or_else(|| Error::Server("auth reply missing token".to_string()))?;
        let roles = Role::parse_list(self.roles.as_deref().unwrap_or(""));
        Ok(Session::new(token, roles))
    }
}

#[derive(Debug, Deserialize)]
struct SignupReply {
    message: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnalyticsReply {
    trend: String,
}

#[derive(Debug, Deserialize)]
struct ScoreReply {
    score: f64,
}

impl ApiClient {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: base.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Map non-2xx replies to [`Error::Server`] when the body is the usual
    /// `{error}` shape, [`Error::Http`] otherwise.
    async fn checked(res: reqwest::Response) -> Result<reqwest::Response> {
        if res.status().is_success() {
            return Ok(res);
        }
        match res.json::<ErrorBody>().await {
            Ok(body) => Err(Error::Server(body.error)),
            Err(e) => Err(Error::Http(e)),
        }
    }

    // ── Auth ────────────────────────────────────────────────────────

    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        let body = serde_json::json!({ "username": username, "password": password });
        let reply: AuthReply = self
            .http
            .post(self.url("/api/auth/login"))
            .json(&body)
            .send()
            .await?
            .json()
            .await?;
        reply.into_session()
    }

    /// Alternate login with a decentralized identifier and verifiable
    /// credential; both are opaque to this client.
    pub async fn did_login(&self, did: &str, vc: &str, username: &str) -> Result<Session> {
        let body = serde_json::json!({ "did": did, "vc": vc, "username": username });
        let reply: AuthReply = self
            .http
            .post(self.url("/api/auth/did-login"))
            .json(&body)
            .send()
            .await?
            .json()
            .await?;
        reply.into_session()
    }

    /// Returns the server's confirmation message.
    pub async fn signup(&self, username: &str, password: &str, confirm_password: &str) -> Result<String> {
        let body = serde_json::json!({
            "username": username,
            "password": password,
            "confirmPassword": confirm_password,
        });
        let reply: SignupReply = self
            .http
            .post(self.url("/api/auth/signup"))
            .json(&body)
            .send()
            .await?
            .json()
            .await?;
        if let Some(error) = reply.error {
            return Err(Error::Server(error));
        }
        Ok(reply.message.unwrap_or_default())
    }

    // ── Translations ────────────────────────────────────────────────

    pub async fn messages(&self, lang: &str) -> Result<HashMap<String, String>> {
        let res = self
            .http
            .get(self.url("/api/messages"))
            .query(&[("lang", lang)])
            .send()
            .await?;
        Ok(Self::checked(res).await?.json().await?)
    }

    // ── Polls ───────────────────────────────────────────────────────

    pub async fn polls(&self, token: &str) -> Result<Vec<Poll>> {
        let res = self
            .http
            .get(self.url("/api/polls"))
            .bearer_auth(token)
            .send()
            .await?;
        Ok(Self::checked(res).await?.json().await?)
    }

    pub async fn create_poll(&self, token: &str, poll: &NewPoll) -> Result<Poll> {
        let res = self
            .http
            .post(self.url("/api/polls"))
            .bearer_auth(token)
            .json(poll)
            .send()
            .await?;
        Ok(Self::checked(res).await?.json().await?)
    }

    pub async fn delete_poll(&self, token: &str, id: PollId) -> Result<()> {
        let res = self
            .http
            .delete(self.url(&format!("/api/polls/{id}")))
            .bearer_auth(token)
            .send()
            .await?;
        Self::checked(res).await?;
        Ok(())
    }

    // ── Votes ───────────────────────────────────────────────────────

    /// Base64-encoded PNG for the poll's voting QR code.
    pub async fn vote_qr(&self, token: &str, poll_id: PollId) -> Result<String> {
        let res = self
            .http
            .get(self.url(&format!("/api/votes/qr/{poll_id}")))
            .bearer_auth(token)
            .send()
            .await?;
        Ok(Self::checked(res).await?.text().await?)
    }

    pub async fn cast_vote(&self, token: &str, poll_id: PollId, option: &str) -> Result<()> {
        let body = serde_json::json!({ "pollId": poll_id, "selectedOption": option });
        let res = self
            .http
            .post(self.url("/api/votes"))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        Self::checked(res).await?;
        Ok(())
    }

    pub async fn offline_vote(&self, token: &str, vote_token: &str, option: &str) -> Result<()> {
        let body = serde_json::json!({ "voteToken": vote_token, "selectedOption": option });
        let res = self
            .http
            .post(self.url("/api/votes/offline"))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        Self::checked(res).await?;
        Ok(())
    }

    // ── Gamification and analytics ──────────────────────────────────

    pub async fn badges(&self, token: &str) -> Result<HashMap<String, u64>> {
        let res = self
            .http
            .get(self.url("/api/gamification/badges"))
            .bearer_auth(token)
            .send()
            .await?;
        Ok(Self::checked(res).await?.json().await?)
    }

    pub async fn leaderboard(&self, token: &str) -> Result<Vec<LeaderboardEntry>> {
        let res = self
            .http
            .get(self.url("/api/gamification/leaderboard"))
            .bearer_auth(token)
            .send()
            .await?;
        Ok(Self::checked(res).await?.json().await?)
    }

    pub async fn analytics(&self, token: &str) -> Result<String> {
        let res = self
            .http
            .get(self.url("/api/analytics"))
            .bearer_auth(token)
            .send()
            .await?;
        let reply: AnalyticsReply = Self::checked(res).await?.json().await?;
        Ok(reply.trend)
    }

    pub async fn security_score(&self, token: &str) -> Result<f64> {
        let res = self
            .http
            .get(self.url("/api/security-score"))
            .bearer_auth(token)
            .send()
            .await?;
        let reply: ScoreReply = Self::checked(res).await?.json().await?;
        Ok(reply.score)
    }
}
