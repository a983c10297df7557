//! The application-state container.
//!
//! All UI state lives here and is written only through these methods, one
//! writer per field. The exception is `results`, which is shared with the
//! live results task behind an `Arc<RwLock>`; that task is its only writer
//! while a subscription is active.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::types::{LeaderboardEntry, Poll, PollId, ResultsMap, Session};
use crate::view::{initial_view_for, View};

pub struct AppState {
    session: Session,
    view: View,
    polls: Vec<Poll>,
    pub results: Arc<RwLock<ResultsMap>>,
    lang: String,
    messages: HashMap<String, String>,
    badges: HashMap<String, u64>,
    leaderboard: Vec<LeaderboardEntry>,
    analytics_trend: String,
    security_score: f64,
    security_alert: Option<String>,
    qr_code: String,
    visual_mode: bool,
    notices: Vec<String>,
}

impl AppState {
    pub fn new(lang: &str) -> Self {
        Self {
            session: Session::default(),
            view: View::default(),
            polls: Vec::new(),
            results: Arc::new(RwLock::new(HashMap::new())),
            lang: lang.to_string(),
            messages: HashMap::new(),
            badges: HashMap::new(),
            leaderboard: Vec::new(),
            analytics_trend: String::new(),
            security_score: 0.0,
            security_alert: None,
            qr_code: String::new(),
            visual_mode: false,
            notices: Vec::new(),
        }
    }

    // ── Session and view ────────────────────────────────────────────

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn view(&self) -> View {
        self.view
    }

    /// Move to another view if the router allows it. Refused moves are
    /// logged and leave the view unchanged.
    pub fn set_view(&mut self, to: View) -> bool {
        if self.view.can_transition(to) {
            self.view = to;
            true
        } else {
            tracing::warn!("refused view transition {:?} -> {:?}", self.view, to);
            false
        }
    }

    /// Install a fresh auth grant and land on the dashboard its roles call
    /// for. Only reachable from the login screen.
    pub fn establish_session(&mut self, session: Session) -> bool {
        let target = initial_view_for(&session.roles);
        if !self.view.can_transition(target) {
            tracing::warn!("login while not on login screen, ignoring");
            return false;
        }
        self.session = session;
        self.view = target;
        true
    }

    /// Clear the auth grant and everything fetched under it.
    pub fn logout(&mut self) {
        self.session.clear();
        self.view = View::Login;
        self.polls.clear();
        self.badges.clear();
        self.leaderboard.clear();
        self.analytics_trend.clear();
        self.security_score = 0.0;
        self.qr_code.clear();
    }

    // ── Polls and results ───────────────────────────────────────────

    pub fn polls(&self) -> &[Poll] {
        &self.polls
    }

    pub fn set_polls(&mut self, polls: Vec<Poll>) {
        self.polls = polls;
    }

    pub fn add_poll(&mut self, poll: Poll) {
        self.polls.push(poll);
    }

    pub fn remove_poll(&mut self, id: PollId) {
        self.polls.retain(|poll| poll.id != id);
    }

    pub fn find_poll(&self, id: PollId) -> Option<&Poll> {
        self.polls.iter().find(|poll| poll.id == id)
    }

    /// Snapshot of the live results map for rendering.
    pub async fn results_snapshot(&self) -> ResultsMap {
        self.results.read().await.clone()
    }

    // ── Translations ────────────────────────────────────────────────

    pub fn lang(&self) -> &str {
        &self.lang
    }

    pub fn set_messages(&mut self, lang: String, messages: HashMap<String, String>) {
        self.lang = lang;
        self.messages = messages;
    }

    /// Translation lookup; falls back to the key itself when the bundle
    /// has no entry.
    pub fn t<'a>(&'a self, key: &'a str) -> &'a str {
        self.messages.get(key).map(String::as_str).unwrap_or(key)
    }

    // ── Dashboard data ──────────────────────────────────────────────

    pub fn badges(&self) -> &HashMap<String, u64> {
        &self.badges
    }

    pub fn set_badges(&mut self, badges: HashMap<String, u64>) {
        self.badges = badges;
    }

    pub fn leaderboard(&self) -> &[LeaderboardEntry] {
        &self.leaderboard
    }

    pub fn set_leaderboard(&mut self, leaderboard: Vec<LeaderboardEntry>) {
        self.leaderboard = leaderboard;
    }

    pub fn analytics_trend(&self) -> &str {
        &self.analytics_trend
    }

    pub fn set_analytics_trend(&mut self, trend: String) {
        self.analytics_trend = trend;
    }

    pub fn security_score(&self) -> f64 {
        self.security_score
    }

    pub fn set_security_score(&mut self, score: f64) {
        self.security_score = score;
    }

    pub fn security_alert(&self) -> Option<&str> {
        self.security_alert.as_deref()
    }

    pub fn set_security_alert(&mut self, alert: Option<String>) {
        self.security_alert = alert;
    }

    pub fn qr_code(&self) -> &str {
        &self.qr_code
    }

    pub fn set_qr_code(&mut self, qr: String) {
        self.qr_code = qr;
    }

    pub fn visual_mode(&self) -> bool {
        self.visual_mode
    }

    pub fn set_visual_mode(&mut self, on: bool) {
        self.visual_mode = on;
    }

    // ── User notices ────────────────────────────────────────────────

    /// Queue a blocking user-visible notice. Each failure pushes exactly one.
    pub fn push_notice(&mut self, notice: impl Into<String>) {
        self.notices.push(notice.into());
    }

    /// Hand all pending notices to the UI, leaving the queue empty.
    pub fn drain_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OptionCounts, Role};

    fn admin_session() -> Session {
        Session::new("tok-admin".into(), Role::parse_list("ROLE_ADMIN,ROLE_USER"))
    }

    #[test]
    fn test_admin_login_lands_on_admin_view() {
        let mut state = AppState::new("en");
        assert_eq!(state.view(), View::Login);

        assert!(state.establish_session(admin_session()));
        assert_eq!(state.view(), View::Admin);
        assert!(state.session().is_authenticated());
    }

    #[test]
    fn test_user_login_lands_on_user_view() {
        let mut state = AppState::new("en");
        let session = Session::new("tok-user".into(), Role::parse_list("ROLE_USER"));
        assert!(state.establish_session(session));
        assert_eq!(state.view(), View::User);
    }

    #[test]
    fn test_login_refused_outside_login_screen() {
        let mut state = AppState::new("en");
        state.establish_session(admin_session());
        assert!(!state.establish_session(admin_session()));
        assert_eq!(state.view(), View::Admin);
    }

    #[test]
    fn test_logout_clears_everything() {
        let mut state = AppState::new("en");
        state.establish_session(admin_session());
        state.set_badges(HashMap::from([("VOTER".to_string(), 2)]));
        state.set_security_score(0.9);
        state.set_qr_code("aGVsbG8=".into());

        state.logout();
        assert_eq!(state.view(), View::Login);
        assert!(!state.session().is_authenticated());
        assert!(state.badges().is_empty());
        assert_eq!(state.security_score(), 0.0);
        assert!(state.qr_code().is_empty());
    }

    #[test]
    fn test_view_transition_refusal_keeps_view() {
        let mut state = AppState::new("en");
        assert!(state.set_view(View::Signup));
        assert!(!state.set_view(View::Admin));
        assert_eq!(state.view(), View::Signup);
        assert!(state.set_view(View::Login));
    }

    #[test]
    fn test_translation_fallback() {
        let mut state = AppState::new("en");
        state.set_messages(
            "en".into(),
            HashMap::from([("auth.signin".to_string(), "Sign In".to_string())]),
        );
        assert_eq!(state.t("auth.signin"), "Sign In");
        assert_eq!(state.t("missing.key"), "missing.key");
    }

    #[test]
    fn test_notices_drain_once() {
        let mut state = AppState::new("en");
        state.push_notice("poll fetch failed");
        assert_eq!(state.drain_notices(), vec!["poll fetch failed".to_string()]);
        assert!(state.drain_notices().is_empty());
    }

    #[tokio::test]
    async fn test_results_snapshot_reflects_shared_map() {
        let state = AppState::new("en");
        let results = state.results.clone();
        results
            .write()
            .await
            .insert(1, OptionCounts::from([("Red".to_string(), 3)]));

        let snapshot = state.results_snapshot().await;
        assert_eq!(snapshot[&1]["Red"], 3);
    }

    #[test]
    fn test_poll_list_edits() {
        let mut state = AppState::new("en");
        let poll: Poll = serde_json::from_str(
            r#"{"id":1,"question":"Q","options":{},"active":true,"expiresAt":"2026-09-01T12:00:00Z"}"#,
        )
        .unwrap();
        state.add_poll(poll.clone());
        assert!(state.find_poll(1).is_some());
        state.remove_poll(1);
        assert!(state.polls().is_empty());
    }
}
