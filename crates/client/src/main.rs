//! faces-submit - submit a form as partial ajax requests.

use ajax::{AjaxMethod, OverflowPolicy};
use anyhow::{bail, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use client::{parse_field, submit, SubmitConfig};

/// faces-submit - send a form through the partial request queue
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Form action URL
    action: String,

    /// Form id
    #[arg(long, default_value = "form")]
    form_id: String,

    /// Form field as name=value (repeatable)
    #[arg(short, long = "field", value_parser = parse_field)]
    fields: Vec<(String, String)>,

    /// View state token
    #[arg(long)]
    view_state: Option<String>,

    /// Submit only these client ids (repeatable)
    #[arg(short, long = "partial")]
    partial_ids: Vec<String>,

    /// Issuing control as name=value
    #[arg(long, value_parser = parse_field)]
    source: Option<(String, String)>,

    /// Client ids to render (repeatable)
    #[arg(long)]
    render: Vec<String>,

    /// HTTP method
    #[arg(long, default_value = "POST", value_parser = parse_method)]
    method: AjaxMethod,

    /// Send as multipart/form-data
    #[arg(long)]
    multipart: bool,

    /// Request timeout in milliseconds, 0 for none
    #[arg(long, default_value = "0")]
    timeout_ms: u64,

    /// Maximum number of queued requests
    #[arg(long)]
    queue_size: Option<usize>,

    /// Evict the oldest pending request when the queue is full
    #[arg(long)]
    drop_oldest: bool,

    /// Number of times to submit
    #[arg(long, default_value = "1")]
    repeat: usize,

    /// User agent string
    #[arg(long)]
    user_agent: Option<String>,

    /// Print response bodies
    #[arg(long)]
    print_body: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_method(value: &str) -> Result<AjaxMethod, String> {
    AjaxMethod::parse(value).ok_or_else(|| format!("unsupported method '{}'", value))
}

impl Args {
    fn into_config(self) -> SubmitConfig {
        SubmitConfig {
            action: self.action,
            form_id: self.form_id,
            fields: self.fields,
            view_state: self.view_state,
            partial_ids: self.partial_ids,
            source: self.source,
            render: self.render,
            method: self.method,
            multipart: self.multipart,
            timeout_ms: self.timeout_ms,
            queue_size: self.queue_size,
            overflow: if self.drop_oldest {
                OverflowPolicy::DropOldest
            } else {
                OverflowPolicy::RejectNewest
            },
            repeat: self.repeat,
            user_agent: self.user_agent,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("faces-submit v{}", client::VERSION);

    let print_body = args.print_body;
    let config = args.into_config();
    info!("Submitting {} to {}", config.form_id, config.action);

    let summary = submit(&config).await?;

    for (i, response) in summary.responses.iter().enumerate() {
        info!("Response {}: status {}, {} bytes", i + 1, response.status, response.text.len());
        if print_body {
            println!("{}", response.text);
        }
    }
    for error in &summary.errors {
        eprintln!("error: {}", error);
    }

    info!(
        "Sent {}, rejected {}, evicted {}, timed out {}",
        summary.stats.sent, summary.stats.rejected, summary.stats.evicted, summary.timed_out
    );

    if !summary.is_success() {
        bail!(
            "{} error(s), {} timeout(s), {} rejected",
            summary.errors.len(),
            summary.timed_out,
            summary.rejected
        );
    }
    Ok(())
}
