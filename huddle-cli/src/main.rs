use anyhow::Result;
use clap::Parser;
use huddle_core::core_membership::MembershipResolver;
use huddle_core::core_message::MessageService;
use huddle_core::logging::{init_logging_with_config, LogConfig, LogLevel};
use huddle_core::{
    AccessGuard, Config, Credentials, IdentityProvider, InviteFlow, InviteRef, JoinError,
    LocalIdentityProvider, MemoryStore, RouteTarget, SessionContext, SharedStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "huddle")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Set the log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable JSON formatted logging
    #[arg(long)]
    json_logs: bool,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Parser, Debug)]
enum Command {
    /// Walk the invite/join protocol end to end against the in-process
    /// reference store
    Demo,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = LogLevel::from_str(&args.log_level).unwrap_or_else(|| {
        eprintln!("Invalid log level '{}', using 'info'", args.log_level);
        LogLevel::Info
    });
    let log_config = LogConfig::new(log_level).json_format(args.json_logs);
    init_logging_with_config(log_config)?;

    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    match args.command {
        Some(Command::Demo) => run_demo(config).await?,
        None => {
            info!("No command specified. Use --help for usage information.");
        }
    }

    Ok(())
}

/// Scripted walkthrough: group creation, an invite followed while signed
/// out, the sign-in detour, the atomic join, and the message feed.
async fn run_demo(config: Config) -> Result<()> {
    info!(endpoint = %config.store.endpoint, "starting demo against reference store");

    let store: Arc<dyn SharedStore> = Arc::new(MemoryStore::new());
    let provider = Arc::new(LocalIdentityProvider::new());
    let resolver = Arc::new(MembershipResolver::with_config(
        store.clone(),
        config.membership.clone(),
    ));
    let session = SessionContext::new();
    let flow = InviteFlow::new(resolver.clone(), session.clone(), provider.clone());
    let messages = MessageService::new(store);

    provider.register("alice@example.com", "hunter2", "Alice").await?;
    provider.register("bob@example.com", "hunter2", "Bob").await?;

    // Alice sets up the group and shares an invite link.
    let alice = provider
        .sign_in(Credentials::new("alice@example.com", "hunter2"))
        .await?;
    let group = resolver.create_group("rust-adopters", &alice).await?;
    let invite = InviteRef::new(group.id.clone(), group.info.invite_token.clone());
    info!(group = %group.id, invite = %invite, "group created, invite link shared");
    messages.send(&group.id, &alice, "welcome to the group!").await?;
    provider.sign_out().await;

    // Bob follows the link signed out; the flow parks it for resumption.
    match flow.follow_invite(invite).await {
        Err(JoinError::AuthRequired) => {
            info!("invite followed while signed out, redirecting to sign-in")
        }
        other => warn!(?other, "expected a sign-in detour"),
    }

    let bob = provider
        .sign_in(Credentials::new("bob@example.com", "hunter2"))
        .await?;
    if let Some(result) = flow.resume_after_sign_in().await {
        let outcome = result?;
        info!(?outcome, "parked invite resumed after sign-in");
    }
    messages.send(&group.id, &bob, "glad to be here").await?;

    let conversation = session
        .active_conversation()
        .ok_or_else(|| anyhow::anyhow!("join did not open a conversation"))?;
    let feed = messages.feed(&conversation).await?;
    for message in feed.current() {
        info!(sender = %message.sender, body = %message.body, "transcript");
    }

    for (group_id, entry) in resolver.list_user_groups(&bob).await? {
        info!(group = %group_id, role = ?entry.role, "bob's chat index");
    }

    // Signing out revokes the open conversation view.
    let guard = AccessGuard::new(provider.clone());
    let mut watcher = guard.guard(RouteTarget::Conversation(conversation));
    provider.sign_out().await;
    if let Some(decision) = watcher.recheck().await {
        info!(?decision, "guard re-evaluated after sign-out");
    }

    info!("demo finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_demo_runs_to_completion() {
        run_demo(Config::default()).await.unwrap();
    }
}
