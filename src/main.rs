use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pollbox::app::App;
use pollbox::config::Config;
use pollbox::ui::{self, Command};
use pollbox::view::View;
use pollbox::visual::WireframePlugin;

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pollbox=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    tracing::info!("Starting pollbox against {}", config.api_base);

    let mut app = App::new(&config);
    app.install_visual_plugin(Box::new(WireframePlugin));

    // Translation bundle loads regardless of login state.
    app.set_language(&config.lang).await;

    println!("{}", ui::help_text());

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        for notice in app.state.drain_notices() {
            println!("*** {notice}");
        }
        let results = app.state.results_snapshot().await;
        print!("{}", ui::render(&app.state, &results));
        if let Some(overlay) = app.visual_overlay() {
            print!("{overlay}");
        }
        println!("> ");

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!("stdin read failed: {e}");
                break;
            }
        };

        let Some(command) = ui::parse_command(&line) else {
            println!("{}", ui::help_text());
            continue;
        };

        match command {
            Command::Login { username, password } => {
                app.login(&username, &password).await;
            }
            Command::DidLogin { did, vc, username } => {
                app.did_login(&did, &vc, &username).await;
            }
            Command::Signup {
                username,
                password,
                confirm,
            } => {
                app.signup(&username, &password, &confirm).await;
            }
            Command::GotoSignup => {
                app.state.set_view(View::Signup);
            }
            Command::GotoLogin => {
                app.state.set_view(View::Login);
            }
            Command::Refresh => app.refresh_dashboard().await,
            Command::CreatePoll {
                question,
                options,
                expires_at,
            } => {
                app.create_poll(question, options, expires_at).await;
            }
            Command::DeletePoll(id) => {
                app.delete_poll(id).await;
            }
            Command::Vote { poll_id, option } => {
                app.cast_vote(poll_id, &option).await;
            }
            Command::Qr(poll_id) => {
                app.fetch_qr(poll_id).await;
            }
            Command::OfflineVote { option } => {
                app.offline_vote(&option).await;
            }
            Command::Lang(lang) => {
                app.set_language(&lang).await;
            }
            Command::Visual(on) => app.set_visual_mode(on),
            Command::Logout => app.logout().await,
            Command::Help => println!("{}", ui::help_text()),
            Command::Quit => break,
        }
    }

    app.logout().await;
    tracing::info!("bye");
}
