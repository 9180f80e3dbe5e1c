use std::sync::Arc;

use colored::*;
use slidelink_common::config::Config;
use slidelink_common::store::{KeyValueStore, LAST_ENDPOINT_KEY, LAST_PREFIX_KEY};
use slidelink_core::control::RemoteControl;
use slidelink_core::scanner::ScanConfig;

use crate::commands::discover::describe_prefixes;
use crate::terminal::colors;
use crate::terminal::print::{self, GLOBAL_KEY_WIDTH};

const KEY_WIDTH: usize = 12;

pub fn info(cfg: &Config, store: Arc<dyn KeyValueStore>) -> anyhow::Result<()> {
    let last_endpoint = store.get(LAST_ENDPOINT_KEY);
    let last_prefix = store.get(LAST_PREFIX_KEY);

    let control = RemoteControl::from_config(cfg, store);
    let prefixes = control.planned_prefixes(&ScanConfig::from(cfg));

    GLOBAL_KEY_WIDTH.set(KEY_WIDTH);
    print::aligned_line("State file", cfg.state_file.display().to_string());
    print::aligned_line("Port", cfg.port.to_string().color(colors::PORT));
    print::aligned_line("Last host", remembered(last_endpoint, colors::IPV4_ADDR));
    print::aligned_line("Last segment", remembered(last_prefix, colors::IPV4_ADDR));
    print::aligned_line("Scan order", describe_prefixes(&prefixes));
    Ok(())
}

fn remembered(value: Option<String>, color: Color) -> ColoredString {
    match value {
        Some(value) => value.color(color),
        None => "none".dimmed(),
    }
}
