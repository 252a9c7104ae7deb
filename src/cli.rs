use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "mail-triage")]
#[command(
    about = "Classifies unread mail with a language model and queues follow-up notifications",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run one triage pass, enqueue follow-ups, and drain the queue
    Run {
        /// Maximum unread messages to triage in this pass
        #[arg(long)]
        max_messages: Option<usize>,

        /// Leave enqueued notifications for a later worker instead of
        /// draining the queue before exiting
        #[arg(long, default_value = "false")]
        no_drain: bool,
    },
    /// Poll the mailbox on an interval with queue workers in the background
    Watch {
        /// Seconds between triage passes
        #[arg(long)]
        interval: Option<u64>,

        /// Number of concurrent queue workers
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Show queue state counts and terminally failed jobs
    Queue,
}
