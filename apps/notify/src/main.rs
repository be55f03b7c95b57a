#![allow(clippy::print_stdout)]

use anyhow::Context;
use clap::Parser;
use shed::dingtalk::{At, DingTalkRegistry};
use shed::logger::Logger;
use std::path::PathBuf;
use tracing::info;

/// Sends a message through a named DingTalk robot.
#[derive(Debug, Parser)]
#[command(name = "shed-notify", version, about)]
struct Args {
    /// Robot INI file, one section per robot.
    #[arg(long, default_value = "robots.ini")]
    config: PathBuf,

    /// Robot section name.
    #[arg(long)]
    robot: String,

    /// Send the message as markdown instead of plain text.
    #[arg(long)]
    markdown: bool,

    /// Conversation-list title for markdown messages.
    #[arg(long, default_value = "Notification")]
    title: String,

    /// Message body.
    message: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let _log = Logger::builder().init().context("Logger setup failed")?;

    let registry = DingTalkRegistry::open(&args.config)
        .with_context(|| format!("Loading robots from {}", args.config.display()))?;

    let reply = if args.markdown {
        registry.send_markdown(&args.robot, &args.title, &args.message, At::nobody()).await?
    } else {
        registry.send_text(&args.robot, &args.message, At::nobody()).await?
    };

    info!(robot = %args.robot, "notification sent");
    println!("{reply}");

    Ok(())
}
