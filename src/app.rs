//! Intent orchestration: wires the REST client, the state container and
//! the live results feed together.
//!
//! Every method corresponds to one user intent. Failures never leave this
//! layer: each one becomes exactly one queued notice plus one log line,
//! and the method reports success as a bool.

use futures::join;

use crate::api::ApiClient;
use crate::config::Config;
use crate::error::Error;
use crate::live::ResultsFeed;
use crate::state::AppState;
use crate::types::{NewPoll, PollId};
use crate::visual::VisualPlugin;

/// Placeholder vote token used by the stubbed offline-vote path.
const OFFLINE_VOTE_TOKEN: &str = "1:user1:1623071234567";

pub struct App {
    pub api: ApiClient,
    pub state: AppState,
    feed: ResultsFeed,
    visual: Option<Box<dyn VisualPlugin>>,
}

impl App {
    pub fn new(config: &Config) -> Self {
        Self {
            api: ApiClient::new(config.api_base.clone()),
            state: AppState::new(&config.lang),
            feed: ResultsFeed::new(config.ws_url.clone()),
            visual: None,
        }
    }

    /// Install the decorative renderer. The app works unchanged without one.
    pub fn install_visual_plugin(&mut self, plugin: Box<dyn VisualPlugin>) {
        tracing::info!("visual plugin installed: {}", plugin.name());
        self.visual = Some(plugin);
    }

    fn report(&mut self, context: &str, notice: String, err: &Error) {
        tracing::error!("{context}: {err}");
        self.state.push_notice(notice);
    }

    // ── Auth intents ────────────────────────────────────────────────

    pub async fn login(&mut self, username: &str, password: &str) -> bool {
        match self.api.login(username, password).await {
            Ok(session) => {
                if !self.state.establish_session(session) {
                    return false;
                }
                self.refresh_dashboard().await;
                true
            }
            Err(Error::Server(msg)) => {
                self.report("login rejected", msg.clone(), &Error::Server(msg));
                false
            }
            Err(e) => {
                let notice = self.state.t("auth.login_failed").to_string();
                self.report("login failed", notice, &e);
                false
            }
        }
    }

    pub async fn did_login(&mut self, did: &str, vc: &str, username: &str) -> bool {
        match self.api.did_login(did, vc, username).await {
            Ok(session) => {
                if !self.state.establish_session(session) {
                    return false;
                }
                self.refresh_dashboard().await;
                true
            }
            Err(Error::Server(msg)) => {
                self.report("did login rejected", msg.clone(), &Error::Server(msg));
                false
            }
            Err(e) => {
                let notice = self.state.t("auth.did_login_failed").to_string();
                self.report("did login failed", notice, &e);
                false
            }
        }
    }

    pub async fn signup(&mut self, username: &str, password: &str, confirm: &str) -> bool {
        match self.api.signup(username, password, confirm).await {
            Ok(message) => {
                self.state.push_notice(message);
                self.state.set_view(crate::view::View::Login);
                true
            }
            Err(Error::Server(msg)) => {
                self.report("signup rejected", msg.clone(), &Error::Server(msg));
                false
            }
            Err(e) => {
                let notice = self.state.t("auth.signup_failed").to_string();
                self.report("signup failed", notice, &e);
                false
            }
        }
    }

    pub async fn logout(&mut self) {
        self.feed.disconnect().await;
        self.state.logout();
    }

    // ── Dashboard ───────────────────────────────────────────────────

    /// The five dashboard fetches, fired concurrently. Each failure is
    /// caught on its own so the others still land; a fresh poll list
    /// re-syncs the live results feed.
    pub async fn refresh_dashboard(&mut self) {
        let token = self.state.session().token.clone();
        if token.is_empty() {
            return;
        }

        let (polls, badges, leaderboard, analytics, score) = join!(
            self.api.polls(&token),
            self.api.badges(&token),
            self.api.leaderboard(&token),
            self.api.analytics(&token),
            self.api.security_score(&token),
        );

        let mut polls_changed = false;
        match polls {
            Ok(polls) => {
                self.state.set_polls(polls);
                polls_changed = true;
            }
            Err(e) => self.report("poll fetch failed", "Failed to load polls".into(), &e),
        }
        match badges {
            Ok(badges) => self.state.set_badges(badges),
            Err(e) => self.report("badges fetch failed", "Failed to load badges".into(), &e),
        }
        match leaderboard {
            Ok(entries) => self.state.set_leaderboard(entries),
            Err(e) => self.report(
                "leaderboard fetch failed",
                "Failed to load leaderboard".into(),
                &e,
            ),
        }
        match analytics {
            Ok(trend) => self.state.set_analytics_trend(trend),
            Err(e) => self.report(
                "analytics fetch failed",
                "Failed to load analytics".into(),
                &e,
            ),
        }
        match score {
            Ok(score) => self.state.set_security_score(score),
            Err(e) => self.report(
                "security score fetch failed",
                "Failed to load security score".into(),
                &e,
            ),
        }

        if polls_changed {
            self.sync_feed().await;
        }
    }

    /// Re-activate the live feed for the current token and poll list.
    async fn sync_feed(&mut self) {
        let token = self.state.session().token.clone();
        self.feed
            .sync(&token, self.state.polls(), self.state.results.clone())
            .await;
    }

    pub fn feed_active(&self) -> bool {
        self.feed.is_active()
    }

    // ── Translations ────────────────────────────────────────────────

    pub async fn set_language(&mut self, lang: &str) -> bool {
        match self.api.messages(lang).await {
            Ok(messages) => {
                self.state.set_messages(lang.to_string(), messages);
                true
            }
            Err(e) => {
                self.report(
                    "messages fetch failed",
                    "Failed to load translations".into(),
                    &e,
                );
                false
            }
        }
    }

    // ── Poll management (admin) ─────────────────────────────────────

    pub async fn create_poll(
        &mut self,
        question: String,
        options: Vec<String>,
        expires_at: String,
    ) -> bool {
        let token = self.state.session().token.clone();
        let new_poll = NewPoll::new(question, options, expires_at);
        match self.api.create_poll(&token, &new_poll).await {
            Ok(poll) => {
                self.state.add_poll(poll);
                let notice = self.state.t("poll.created").to_string();
                self.state.push_notice(notice);
                self.sync_feed().await;
                true
            }
            Err(e) => {
                let notice = self.state.t("poll.create_failed").to_string();
                self.report("poll creation failed", notice, &e);
                false
            }
        }
    }

    pub async fn delete_poll(&mut self, id: PollId) -> bool {
        let token = self.state.session().token.clone();
        match self.api.delete_poll(&token, id).await {
            Ok(()) => {
                self.state.remove_poll(id);
                self.sync_feed().await;
                true
            }
            Err(e) => {
                let notice = self.state.t("poll.delete_failed").to_string();
                self.report("poll deletion failed", notice, &e);
                false
            }
        }
    }

    pub async fn fetch_qr(&mut self, poll_id: PollId) -> bool {
        let token = self.state.session().token.clone();
        match self.api.vote_qr(&token, poll_id).await {
            Ok(qr) => {
                self.state.set_qr_code(qr);
                true
            }
            Err(e) => {
                let notice = self.state.t("poll.qr_failed").to_string();
                self.report("qr generation failed", notice, &e);
                false
            }
        }
    }

    // ── Voting ──────────────────────────────────────────────────────

    pub async fn cast_vote(&mut self, poll_id: PollId, option: &str) -> bool {
        let token = self.state.session().token.clone();
        match self.api.cast_vote(&token, poll_id, option).await {
            Ok(()) => {
                let notice = self.state.t("vote.success").to_string();
                self.state.push_notice(notice);
                true
            }
            Err(Error::Server(msg)) => {
                // The server explains rejected votes (expired poll, double
                // vote); show its message verbatim.
                self.report("vote rejected", msg.clone(), &Error::Server(msg));
                false
            }
            Err(e) => {
                let notice = self.state.t("vote.failed").to_string();
                self.report("vote failed", notice, &e);
                false
            }
        }
    }

    /// Stubbed offline vote: replays a canned vote token against the
    /// offline endpoint. No sync protocol behind it.
    pub async fn offline_vote(&mut self, option: &str) -> bool {
        let token = self.state.session().token.clone();
        match self.api.offline_vote(&token, OFFLINE_VOTE_TOKEN, option).await {
            Ok(()) => {
                let notice = self.state.t("vote.success").to_string();
                self.state.push_notice(notice);
                true
            }
            Err(e) => {
                let notice = self.state.t("vote.offline_failed").to_string();
                self.report("offline vote failed", notice, &e);
                false
            }
        }
    }

    // ── Decorative mode ─────────────────────────────────────────────

    pub fn set_visual_mode(&mut self, on: bool) {
        if on && self.visual.is_none() {
            tracing::warn!("visual mode enabled but no plugin is installed");
        }
        self.state.set_visual_mode(on);
    }

    /// Decorative overlay for the current poll list, if the mode is on and
    /// a plugin is installed.
    pub fn visual_overlay(&self) -> Option<String> {
        if !self.state.visual_mode() {
            return None;
        }
        let plugin = self.visual.as_ref()?;
        Some(plugin.render(self.state.polls()))
    }
}
