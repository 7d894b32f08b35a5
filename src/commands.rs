//! Command execution: wire the stores to the engine, print JSON, choose
//! the exit code.

use anyhow::Context;
use serde::Serialize;
use serde_json::json;

use crate::cli::Command;
use crate::engine::{self, EngineConfig};
use crate::store::{GitStore, OsFileStore};

/// Run one CLI command. `Ok(code)` is the process exit code.
pub fn execute_command(command: Command) -> anyhow::Result<i32> {
    match command {
        Command::Validate {
            root,
            base,
            summary,
            pretty,
        } => {
            let config = EngineConfig {
                root: root.clone(),
                base,
                summary,
            };
            let working = OsFileStore::new(&root);
            let history = GitStore::new(&root);
            let report = engine::analyze(&config, &working, &history);
            print_json(&report, pretty)?;
            Ok(if report.ok { 0 } else { 1 })
        }
        Command::ApplyVersions { root, base, pretty } => {
            let config = EngineConfig {
                root: root.clone(),
                base: Some(base),
                summary: None,
            };
            let working = OsFileStore::new(&root);
            let history = GitStore::new(&root);
            match engine::apply_versions(&config, &working, &history) {
                Ok((report, applied)) => {
                    print_json(
                        &json!({
                            "ok": true,
                            "applied": applied,
                            "analysis": report.analysis,
                        }),
                        pretty,
                    )?;
                    Ok(0)
                }
                Err(err) => {
                    print_json(&json!({ "ok": false, "error": err.to_string() }), pretty)?;
                    Ok(1)
                }
            }
        }
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .context("serializing result")?;
    println!("{rendered}");
    Ok(())
}
