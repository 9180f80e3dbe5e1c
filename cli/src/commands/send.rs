use std::sync::Arc;

use anyhow::{Context, bail};
use slidelink_common::config::Config;
use slidelink_common::store::KeyValueStore;
use slidelink_common::success;
use slidelink_core::control::RemoteControl;
use slidelink_protocols::command::Command;

use crate::commands::connect::{close_session, open_session};
use crate::commands::resolve_host;

/// Opens a session, sends one command and closes again.
pub async fn send(
    host: &str,
    words: &[String],
    cfg: &Config,
    store: Arc<dyn KeyValueStore>,
) -> anyhow::Result<()> {
    let command: Command = words
        .join(" ")
        .parse()
        .with_context(|| format!("invalid command '{}'", words.join(" ")))?;
    let endpoint = resolve_host(host, cfg.port)?;

    let mut control = RemoteControl::from_config(cfg, store);
    open_session(&mut control, endpoint, cfg).await?;

    if !control.send_command(&command) {
        close_session(&mut control).await;
        bail!("connection to {endpoint} closed before {command} was sent");
    }

    close_session(&mut control).await;
    success!("Sent {command} to {endpoint}");
    Ok(())
}
