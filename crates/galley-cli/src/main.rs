#![forbid(unsafe_code)]

mod cmd;
mod identity;
mod output;

use clap::{Parser, Subcommand};
use cmd::{Global, Session};
use output::OutputMode;
use std::env;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "galley: manuscript lifecycle for academic journals",
    long_about = None
)]
struct Cli {
    /// Store file (default: $GALLEY_DB, the user config, then ./galley.db).
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Workflow configuration file (default: ./galley.toml).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Act as this account (id or e-mail); overrides $GALLEY_ACTOR.
    #[arg(long = "as", global = true, value_name = "ACCOUNT")]
    actor: Option<String>,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn global(&self) -> Global {
        Global {
            db: self.db.clone(),
            config: self.config.clone(),
            actor: self.actor.clone(),
            output: OutputMode::from_json_flag(self.json),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Create the store and default configuration",
        after_help = "EXAMPLES:\n    galley init --admin-email admin@journal.org"
    )]
    Init(cmd::init::InitArgs),

    #[command(next_help_heading = "Setup", about = "Manage accounts and roles")]
    Account {
        #[command(subcommand)]
        command: cmd::account::AccountCommand,
    },

    #[command(
        next_help_heading = "Intake",
        about = "Submit a manuscript",
        after_help = "EXAMPLES:\n    galley submit --title \"Tidal energy\" --author \"Ada <ada@uni.edu>\" --file draft.pdf=s3://bucket/draft.pdf"
    )]
    Submit(cmd::submit::SubmitArgs),

    #[command(next_help_heading = "Intake", about = "Assign an editor, reviewer or copy editor")]
    Assign {
        #[command(subcommand)]
        command: cmd::assign::AssignCommand,
    },

    #[command(next_help_heading = "Review", about = "Submit and inspect peer reviews")]
    Review {
        #[command(subcommand)]
        command: cmd::review::ReviewCommand,
    },

    #[command(
        next_help_heading = "Review",
        about = "Record the editorial decision",
        after_help = "EXAMPLES:\n    galley decide ms-3f2a9c01bd accept --comments \"Congratulations\"\n    galley decide ms-3f2a9c01bd major-revision --revision 6"
    )]
    Decide(cmd::decide::DecideArgs),

    #[command(next_help_heading = "Review", about = "Resubmit after a revision request")]
    Revise(cmd::revise::ReviseArgs),

    #[command(next_help_heading = "Production", about = "Inspect and settle publication fees")]
    Payment {
        #[command(subcommand)]
        command: cmd::payment::PaymentCommand,
    },

    #[command(next_help_heading = "Production", about = "Drive the copy-editing workflow")]
    Copyedit {
        #[command(subcommand)]
        command: cmd::copyedit::CopyEditCommand,
    },

    #[command(next_help_heading = "Production", about = "Publish a manuscript")]
    Publish(cmd::publish::PublishArgs),

    #[command(next_help_heading = "Read", about = "Show one manuscript")]
    Show(cmd::TargetArgs),

    #[command(next_help_heading = "Read", about = "Show a manuscript's timeline")]
    Timeline(cmd::timeline::TimelineArgs),

    #[command(next_help_heading = "Read", about = "List manuscripts")]
    List(cmd::list::ListArgs),

    #[command(
        next_help_heading = "Maintenance",
        about = "Verify every timeline hash chain"
    )]
    Verify,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("GALLEY_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "galley_core=debug,galley_cli=debug,info"
        } else {
            "galley_core=info,galley_cli=info,warn"
        })
    });

    let format = env::var("GALLEY_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let global = cli.global();
    debug!(command = ?cli.command, "galley starting");

    if let Commands::Init(ref args) = cli.command {
        return cmd::init::run_init(args, &global);
    }

    let session = Session::open(&global)?;
    let result = match cli.command {
        Commands::Init(_) => Ok(()),
        Commands::Account { ref command } => cmd::account::run_account(command, &session),
        Commands::Submit(ref args) => cmd::submit::run_submit(args, &session),
        Commands::Assign { ref command } => cmd::assign::run_assign(command, &session),
        Commands::Review { ref command } => cmd::review::run_review(command, &session),
        Commands::Decide(ref args) => cmd::decide::run_decide(args, &session),
        Commands::Revise(ref args) => cmd::revise::run_revise(args, &session),
        Commands::Payment { ref command } => cmd::payment::run_payment(command, &session),
        Commands::Copyedit { ref command } => cmd::copyedit::run_copyedit(command, &session),
        Commands::Publish(ref args) => cmd::publish::run_publish(args, &session),
        Commands::Show(ref args) => cmd::show::run_show(args, &session),
        Commands::Timeline(ref args) => cmd::timeline::run_timeline(args, &session),
        Commands::List(ref args) => cmd::list::run_list(args, &session),
        Commands::Verify => cmd::verify::run_verify(&session),
    };
    session.close();
    result
}
