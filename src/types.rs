use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type PollId = u64;

/// Vote tallies for a single poll, keyed by option label.
pub type OptionCounts = HashMap<String, u64>;

/// Latest known tallies per poll. Entries are replaced wholesale when a
/// results message arrives, never merged.
pub type ResultsMap = HashMap<PollId, OptionCounts>;

/// Roles as granted by the auth endpoints. The server reports them as a
/// comma-separated string of Spring-style names ("ROLE_ADMIN,ROLE_USER").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Admin,
    User,
    Other(String),
}

impl Role {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "ROLE_ADMIN" => Role::Admin,
            "ROLE_USER" => Role::User,
            other => Role::Other(other.to_string()),
        }
    }

    /// Split a comma-separated role string into roles, skipping empty parts.
    pub fn parse_list(raw: &str) -> Vec<Role> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Role::parse)
            .collect()
    }
}

/// The current auth grant. An empty token means logged out.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub token: String,
    pub roles: Vec<Role>,
}

impl Session {
    pub fn new(token: String, roles: Vec<Role>) -> Self {
        Self { token, roles }
    }

    pub fn is_authenticated(&self) -> bool {
        !self.token.is_empty()
    }

    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }

    pub fn clear(&mut self) {
        self.token.clear();
        self.roles.clear();
    }
}

/// A poll as served by `GET /api/polls`. Created server-side, read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub id: PollId,
    pub question: String,
    pub options: OptionCounts,
    pub active: bool,
    pub expires_at: DateTime<Utc>,
}

/// Body for `POST /api/polls`. Options start at zero votes; the expiry is
/// passed through as the string the user entered.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPoll {
    pub question: String,
    pub options: OptionCounts,
    pub expires_at: String,
}

impl NewPoll {
    pub fn new(question: String, option_labels: Vec<String>, expires_at: String) -> Self {
        let options = option_labels.into_iter().map(|label| (label, 0)).collect();
        Self {
            question,
            options,
            expires_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub username: String,
    pub points: u64,
}
