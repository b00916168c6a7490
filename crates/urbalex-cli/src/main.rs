//! Headless admin console for reviewing machine-extracted urbanistic rules.

mod display;

use clap::{Parser, Subcommand};
use urbalex_core::{DynamicValue, RulePatch, RuleStatus};
use urbalex_moderation::{EventBus, ModerationError, ReviewSession};
use urbalex_sync::RuleApi;

#[derive(Parser)]
#[command(name = "urbalex", version, about = "Rule moderation for the Urbalex pre-feasibility console")]
struct Cli {
    /// Gateway base URL, e.g. https://admin.urbalex.io
    #[arg(long, env = "URBALEX_API_URL")]
    base_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch a working set and print it grouped by category
    List {
        /// Status filter (proposed, approved, rejected, modified)
        #[arg(long, default_value = "proposed")]
        status: RuleStatus,
        #[arg(long)]
        category: Option<String>,
        /// Case-insensitive id/title substring filter
        #[arg(long, default_value = "")]
        filter: String,
    },
    /// Approve every rule in a working set and push the changes
    ApproveAll {
        #[arg(long, default_value = "proposed")]
        status: RuleStatus,
        #[arg(long)]
        category: Option<String>,
    },
    /// Reject (delete) every rule in a working set and push the changes
    RejectAll {
        #[arg(long, default_value = "proposed")]
        status: RuleStatus,
        #[arg(long)]
        category: Option<String>,
    },
    /// Edit one rule's fields and push the change
    Edit {
        /// Rule id within the working set
        id: String,
        /// Status filter used to fetch the working set
        #[arg(long, default_value = "proposed")]
        status: RuleStatus,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Move the rule to this category
        #[arg(long)]
        set_category: Option<String>,
        /// Condition/formula text; stored as JSON when it parses, verbatim
        /// text otherwise
        #[arg(long)]
        condition: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    tracing::info!("urbalex v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let mut session = ReviewSession::new(RuleApi::new(cli.base_url), EventBus::new());

    match cli.command {
        Command::List {
            status,
            category,
            filter,
        } => {
            let count = session.load(status, category.as_deref()).await?;
            println!("{count} rule(s) with status '{status}'");
            display::print_groups(&session.grouped(&filter));
        }
        Command::ApproveAll { status, category } => {
            session.load(status, category.as_deref()).await?;
            let touched = session.approve_all();
            finalize_and_report(&mut session, touched).await?;
        }
        Command::RejectAll { status, category } => {
            session.load(status, category.as_deref()).await?;
            let touched = session.reject_all();
            finalize_and_report(&mut session, touched).await?;
        }
        Command::Edit {
            id,
            status,
            category,
            title,
            description,
            set_category,
            condition,
        } => {
            session.load(status, category.as_deref()).await?;
            let patch = RulePatch {
                title,
                description,
                category: set_category,
                condition: condition.as_deref().map(DynamicValue::from_input),
                ..Default::default()
            };
            let updated = session.edit_and_save(&id, patch)?;
            display::print_rule(&updated);
            finalize_and_report(&mut session, 1).await?;
        }
    }

    Ok(())
}

async fn finalize_and_report(
    session: &mut ReviewSession<RuleApi>,
    touched: usize,
) -> anyhow::Result<()> {
    println!("{touched} rule(s) marked, {} pending change(s)", session.pending_count());
    match session.finalize().await {
        Ok(report) => display::print_report(&report),
        Err(ModerationError::NothingPending) => println!("nothing to push"),
        Err(error) => return Err(error.into()),
    }
    Ok(())
}
