//! Terminal presentation: renders the current view from the state
//! container and parses command lines into intents.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::fmt::Write as _;

use crate::state::AppState;
use crate::types::{PollId, ResultsMap};
use crate::view::View;

/// A parsed user intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { username: String, password: String },
    DidLogin { did: String, vc: String, username: String },
    Signup { username: String, password: String, confirm: String },
    GotoSignup,
    GotoLogin,
    Refresh,
    CreatePoll { question: String, options: Vec<String>, expires_at: String },
    DeletePoll(PollId),
    Vote { poll_id: PollId, option: String },
    Qr(PollId),
    OfflineVote { option: String },
    Lang(String),
    Visual(bool),
    Logout,
    Help,
    Quit,
}

/// Parse one input line. `None` means the line was not a valid command;
/// the caller shows the help text.
pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match word {
        "login" => {
            let mut parts = rest.split_whitespace();
            Some(Command::Login {
                username: parts.next()?.to_string(),
                password: parts.next()?.to_string(),
            })
        }
        "didlogin" => {
            let mut parts = rest.split_whitespace();
            Some(Command::DidLogin {
                did: parts.next()?.to_string(),
                vc: parts.next()?.to_string(),
                username: parts.next()?.to_string(),
            })
        }
        "register" => {
            let mut parts = rest.split_whitespace();
            Some(Command::Signup {
                username: parts.next()?.to_string(),
                password: parts.next()?.to_string(),
                confirm: parts.next()?.to_string(),
            })
        }
        "signup" => Some(Command::GotoSignup),
        "back" => Some(Command::GotoLogin),
        "refresh" => Some(Command::Refresh),
        "create" => {
            // create <question> | <opt1,opt2,...> | <expires-at>
            let mut fields = rest.splitn(3, '|').map(str::trim);
            let question = fields.next().filter(|s| !s.is_empty())?.to_string();
            let options: Vec<String> = fields
                .next()?
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            let expires_at = fields.next().filter(|s| !s.is_empty())?.to_string();
            if options.is_empty() {
                return None;
            }
            Some(Command::CreatePoll {
                question,
                options,
                expires_at,
            })
        }
        "delete" => Some(Command::DeletePoll(rest.parse().ok()?)),
        "vote" => {
            let (id, option) = rest.split_once(char::is_whitespace)?;
            let option = option.trim();
            if option.is_empty() {
                return None;
            }
            Some(Command::Vote {
                poll_id: id.parse().ok()?,
                option: option.to_string(),
            })
        }
        "qr" => Some(Command::Qr(rest.parse().ok()?)),
        "offline" => {
            if rest.is_empty() {
                return None;
            }
            Some(Command::OfflineVote {
                option: rest.to_string(),
            })
        }
        "lang" => {
            if rest.is_empty() {
                return None;
            }
            Some(Command::Lang(rest.to_string()))
        }
        "visual" => match rest {
            "on" => Some(Command::Visual(true)),
            "off" => Some(Command::Visual(false)),
            _ => None,
        },
        "logout" => Some(Command::Logout),
        "help" => Some(Command::Help),
        "quit" | "exit" => Some(Command::Quit),
        _ => None,
    }
}

pub fn help_text() -> &'static str {
    "commands:\n\
     \x20 login <user> <pass>          didlogin <did> <vc> <user>\n\
     \x20 signup | back                register <user> <pass> <confirm>\n\
     \x20 refresh                      lang <code>\n\
     \x20 create <q> | <a,b,...> | <expires-at>\n\
     \x20 delete <poll-id>             qr <poll-id>\n\
     \x20 vote <poll-id> <option>      offline <option>\n\
     \x20 visual on|off                logout\n\
     \x20 help                         quit"
}

/// Render the screen for the current view. `results` is a snapshot of the
/// live results map taken by the caller.
pub fn render(state: &AppState, results: &ResultsMap) -> String {
    match state.view() {
        View::Login => render_login(state),
        View::Signup => render_signup(state),
        View::Admin => render_admin(state, results),
        View::User => render_user(state, results),
    }
}

fn render_login(state: &AppState) -> String {
    format!(
        "== {} ==\n{}\n{}\n",
        state.t("auth.signin"),
        "login <user> <pass>  or  didlogin <did> <vc> <user>",
        "no account? type: signup",
    )
}

fn render_signup(state: &AppState) -> String {
    format!(
        "== {} ==\n{}\n{}\n",
        state.t("auth.signup"),
        "register <user> <pass> <confirm>",
        "have an account? type: back",
    )
}

fn render_common_header(state: &AppState, out: &mut String) {
    if let Some(alert) = state.security_alert() {
        let _ = writeln!(out, "!! {alert}");
    }
    let _ = writeln!(
        out,
        "{}: {:.2}%",
        state.t("security.score"),
        state.security_score() * 100.0
    );
}

fn render_poll_results(state: &AppState, results: &ResultsMap, poll_id: PollId, out: &mut String) {
    let _ = writeln!(out, "  {}:", state.t("poll.results"));
    if let Some(counts) = results.get(&poll_id) {
        let mut entries: Vec<_> = counts.iter().collect();
        entries.sort();
        for (option, count) in entries {
            let _ = writeln!(out, "    {option}: {count}");
        }
    }
}

fn render_admin(state: &AppState, results: &ResultsMap) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", state.t("admin.polls"));
    render_common_header(state, &mut out);

    for poll in state.polls() {
        let status = if poll.active {
            state.t("poll.active")
        } else {
            state.t("poll.closed")
        };
        let _ = writeln!(out, "#{} {} [{}]", poll.id, poll.question, status);
        let _ = writeln!(out, "  {}: {}", state.t("poll.expires"), poll.expires_at);
        render_poll_results(state, results, poll.id, &mut out);
    }

    if !state.qr_code().is_empty() {
        match BASE64.decode(state.qr_code()) {
            Ok(png) => {
                let _ = writeln!(out, "{}: PNG, {} bytes", state.t("poll.qr_code"), png.len());
            }
            Err(e) => {
                tracing::warn!("qr payload is not valid base64: {e}");
            }
        }
    }

    if !state.analytics_trend().is_empty() {
        let _ = writeln!(out, "{}: {}", state.t("analytics.trend"), state.analytics_trend());
    }
    out
}

fn render_user(state: &AppState, results: &ResultsMap) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", state.t("user.active_polls"));
    render_common_header(state, &mut out);

    for poll in state.polls().iter().filter(|poll| poll.active) {
        let _ = writeln!(out, "#{} {}", poll.id, poll.question);
        let _ = writeln!(out, "  {}: {}", state.t("poll.expires"), poll.expires_at);
        let mut options: Vec<_> = poll.options.keys().collect();
        options.sort();
        for option in options {
            let _ = writeln!(out, "  [ ] {option}");
        }
        render_poll_results(state, results, poll.id, &mut out);
    }

    if !state.badges().is_empty() {
        let _ = writeln!(out, "{}:", state.t("user.badges"));
        let mut badges: Vec<_> = state.badges().iter().collect();
        badges.sort();
        for (badge, count) in badges {
            let _ = writeln!(out, "  {badge}: {count}");
        }
    }

    if !state.leaderboard().is_empty() {
        let _ = writeln!(out, "{}:", state.t("user.leaderboard"));
        for entry in state.leaderboard() {
            let _ = writeln!(
                out,
                "  {}: {} {}",
                entry.username,
                entry.points,
                state.t("user.points")
            );
        }
    }
    out
}
