//! # Journal Client
//!
//! Headless client: resolves the configured identity to a profile,
//! completes onboarding when asked to, and walks the home feed.

mod config;
mod state;
mod telemetry;

use journal_core::domain::FeedQuery;
use journal_core::feed::FeedLoad;
use journal_core::profile::{OnboardingForm, ProfileState};
use journal_core::{ClientError, JournalContext};

use config::ClientConfig;
use state::ClientState;
use telemetry::{TelemetryConfig, init_telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_telemetry(&TelemetryConfig::from_env());

    let config = ClientConfig::from_env();
    let state = ClientState::new(&config)?;
    let ctx = &state.context;
    ctx.start();
    tracing::info!(backend = ?state.backend, "Client started");

    match config.identity.clone() {
        Some(identity) => {
            tracing::info!(uid = %identity.uid, "Signing in");
            ctx.session.sign_in(identity);
            resolve_profile(ctx, &config).await?;

            if config.send_verification {
                ctx.session.send_verification_email().await?;
                tracing::info!("Verification email requested");
            }
        }
        None => tracing::info!("JOURNAL_UID not set, browsing anonymously"),
    }

    walk_feed(ctx, config.feed_pages).await?;

    ctx.sign_out();
    Ok(())
}

async fn resolve_profile(ctx: &JournalContext, config: &ClientConfig) -> anyhow::Result<()> {
    let mut state = ctx.settled().await;

    if let ProfileState::Error { message, .. } = &state {
        tracing::warn!(%message, "Profile lookup failed, retrying once");
        ctx.profiles.retry().await?;
        state = ctx.profiles.state();
    }

    match state {
        ProfileState::Ready { profile, .. } => {
            tracing::info!(username = %profile.username, "Signed in");
        }
        ProfileState::OnboardingRequired { identity } => match &config.username {
            Some(username) => {
                let form = OnboardingForm {
                    username: username.clone(),
                    ..OnboardingForm::prefilled(&identity)
                };
                let profile = ctx.profiles.complete_onboarding(form).await?;
                tracing::info!(username = %profile.username, "Profile created");
            }
            None => tracing::warn!("No profile yet; set JOURNAL_USERNAME to create one"),
        },
        ProfileState::Error { message, .. } => anyhow::bail!("profile lookup failed: {message}"),
        other => tracing::debug!(state = other.name(), "Profile not resolved"),
    }

    Ok(())
}

async fn walk_feed(ctx: &JournalContext, pages: usize) -> anyhow::Result<()> {
    let feed = ctx.paginator(FeedQuery::Home);
    let viewer = ctx.profiles.viewer_id();

    for _ in 0..pages {
        match feed.load_more().await {
            Ok(FeedLoad::Page(page)) => {
                ctx.likes.seed_page(viewer, &page);
                for post in &page.posts {
                    tracing::info!(
                        post_id = %post.id,
                        title = %post.title,
                        category = post.category_label(),
                        author = %post.author.username,
                        likes = post.like_count,
                        liked = post.liked_by_viewer,
                        "Post"
                    );
                }
            }
            Ok(FeedLoad::End | FeedLoad::Discarded) => break,
            Err(ClientError::TransientNetwork(message)) => {
                tracing::warn!(%message, "Feed page failed");
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    tracing::info!(
        loaded = feed.len(),
        exhausted = feed.is_exhausted(),
        "Feed walk finished"
    );
    Ok(())
}
