use serde::Serialize;
use serde_json::json;

use reserva_core::config::{AppConfig, LoadOptions};
use reserva_db::{connect_with_settings, ping};

use crate::commands::{runtime, CommandResult};

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    ok: bool,
    detail: String,
}

pub fn run(json_output: bool) -> CommandResult {
    let mut checks = Vec::new();

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config",
                ok: true,
                detail: "configuration loaded and validated".to_string(),
            });
            Some(config)
        }
        Err(error) => {
            checks.push(DoctorCheck { name: "config", ok: false, detail: error.to_string() });
            None
        }
    };

    if let Some(config) = &config {
        match runtime("doctor") {
            Ok(runtime) => {
                let detail = runtime.block_on(async {
                    match connect_with_settings(
                        &config.database.url,
                        config.database.max_connections,
                        config.database.timeout_secs,
                    )
                    .await
                    {
                        Ok(pool) => {
                            let probe = ping(&pool)
                                .await
                                .map(|_| "database reachable".to_string())
                                .map_err(|error| error.to_string());
                            pool.close().await;
                            probe
                        }
                        Err(error) => Err(error.to_string()),
                    }
                });
                match detail {
                    Ok(detail) => {
                        checks.push(DoctorCheck { name: "database", ok: true, detail })
                    }
                    Err(detail) => {
                        checks.push(DoctorCheck { name: "database", ok: false, detail })
                    }
                }
            }
            Err(failure) => return failure,
        }
    }

    let all_ok = checks.iter().all(|check| check.ok);
    let output = if json_output {
        json!({
            "command": "doctor",
            "status": if all_ok { "ok" } else { "error" },
            "checks": checks,
        })
        .to_string()
    } else {
        let mut lines = Vec::with_capacity(checks.len());
        for check in &checks {
            let marker = if check.ok { "ok" } else { "FAIL" };
            lines.push(format!("[{marker}] {}: {}", check.name, check.detail));
        }
        lines.join("\n")
    };

    CommandResult { exit_code: u8::from(!all_ok), output }
}
