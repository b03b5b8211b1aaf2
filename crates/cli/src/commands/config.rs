use serde_json::json;

use reserva_core::config::{AppConfig, LoadOptions, LogFormat};

/// Prints the effective configuration after file, env, and override layers,
/// with secrets reduced to presence markers.
pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return json!({
                "command": "config",
                "status": "error",
                "error_class": "config_validation",
                "message": format!("configuration issue: {error}"),
            })
            .to_string();
        }
    };

    let payload = json!({
        "command": "config",
        "status": "ok",
        "database": {
            "url": config.database.url,
            "max_connections": config.database.max_connections,
            "timeout_secs": config.database.timeout_secs,
        },
        "llm": {
            "provider": config.llm.provider,
            "api_key": redact(config.llm.api_key.is_some()),
            "base_url": config.llm.base_url,
            "model": config.llm.model,
            "timeout_secs": config.llm.timeout_secs,
        },
        "whatsapp": {
            "enabled": config.whatsapp.enabled,
            "gateway_token": redact(config.whatsapp.gateway_token.is_some()),
            "system_actor_id": config.whatsapp.system_actor_id,
        },
        "logging": {
            "level": config.logging.level,
            "format": match config.logging.format {
                LogFormat::Compact => "compact",
                LogFormat::Pretty => "pretty",
                LogFormat::Json => "json",
            },
        },
    });

    serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string())
}

fn redact(present: bool) -> &'static str {
    if present {
        "***"
    } else {
        "(unset)"
    }
}
