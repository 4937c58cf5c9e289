//! Triage 命令行入口
//!
//! 用法：`triage [--config <path>] [请求文本...]`。带请求文本时处理一次并输出 JSON；
//! 否则从 stdin 逐行读取请求，每行输出一个 JSON 响应。

use std::path::PathBuf;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use triage::config::{load_config, AppConfig};
use triage::{observability, ContainerBuilder};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let mut args = std::env::args().skip(1);
    let mut config_path: Option<PathBuf> = None;
    let mut words = Vec::new();
    while let Some(arg) = args.next() {
        if arg == "--config" {
            let path = args.next().context("--config requires a path")?;
            config_path = Some(PathBuf::from(path));
        } else {
            words.push(arg);
        }
    }

    let cfg = load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });

    let orchestrator = ContainerBuilder::new(cfg)
        .build()
        .context("Failed to assemble services")?;

    if !words.is_empty() {
        let response = orchestrator.handle_json(&words.join(" ")).await;
        println!("{}", serde_json::to_string_pretty(&response)?);
        orchestrator.shutdown().await;
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let request = line.trim();
        if request.is_empty() {
            continue;
        }
        let response = orchestrator.handle_json(request).await;
        println!("{}", serde_json::to_string(&response)?);
    }
    orchestrator.shutdown().await;
    Ok(())
}
