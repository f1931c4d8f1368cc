use std::sync::Arc;

use moldquote_core::config::{AppConfig, LoadOptions};
use moldquote_db::{connect_with_settings, ping};
use moldquote_sheets::{configured_source, SheetsClient};
use serde::Serialize;

use crate::commands::{runtime, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

const CONFIG_CHECK: &str = "config_validation";
const LINE_CHECK: &str = "line_token_readiness";
const DATABASE_CHECK: &str = "database_connectivity";
const PRICING_CHECK: &str = "price_table";

/// Exits 1 when any check fails so scripts can gate deploys on it.
pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: CONFIG_CHECK,
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_line_token(&config));
            checks.extend(check_runtime_dependencies(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: CONFIG_CHECK,
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in [LINE_CHECK, DATABASE_CHECK, PRICING_CHECK] {
                checks.push(skipped(name, "skipped because configuration did not load"));
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn skipped(name: &'static str, details: &str) -> DoctorCheck {
    DoctorCheck { name, status: CheckStatus::Skipped, details: details.to_string() }
}

fn check_line_token(config: &AppConfig) -> DoctorCheck {
    if config.line.has_access_token() {
        DoctorCheck {
            name: LINE_CHECK,
            status: CheckStatus::Pass,
            details: "channel access token present".to_string(),
        }
    } else {
        DoctorCheck {
            name: LINE_CHECK,
            status: CheckStatus::Fail,
            details: "line.channel_access_token is empty; replies cannot be pushed".to_string(),
        }
    }
}

fn check_runtime_dependencies(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            let details = format!("failed to initialize async runtime: {error}");
            return vec![
                DoctorCheck { name: DATABASE_CHECK, status: CheckStatus::Fail, details },
                skipped(PRICING_CHECK, "skipped because the async runtime did not start"),
            ];
        }
    };

    runtime.block_on(async {
        vec![check_database_connectivity(config).await, check_price_table(config).await]
    })
}

async fn check_database_connectivity(config: &AppConfig) -> DoctorCheck {
    let result = async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;
        let pinged = ping(&pool).await.map_err(|error| format!("database ping failed: {error}"));
        pool.close().await;
        pinged
    }
    .await;

    match result {
        Ok(()) => DoctorCheck {
            name: DATABASE_CHECK,
            status: CheckStatus::Pass,
            details: format!("connected using `{}`", config.database.url),
        },
        Err(error) => DoctorCheck { name: DATABASE_CHECK, status: CheckStatus::Fail, details: error },
    }
}

async fn check_price_table(config: &AppConfig) -> DoctorCheck {
    let client = SheetsClient::from_config(&config.sheets).map(Arc::new);
    let source = match configured_source(config, client) {
        Ok(source) => source,
        Err(error) => {
            return DoctorCheck {
                name: PRICING_CHECK,
                status: CheckStatus::Fail,
                details: error.to_string(),
            }
        }
    };

    match source.load().await {
        Ok(table) => DoctorCheck {
            name: PRICING_CHECK,
            status: CheckStatus::Pass,
            details: format!(
                "{} material(s) from {} source: {}",
                table.len(),
                source.name(),
                table.display_list()
            ),
        },
        Err(error) => DoctorCheck {
            name: PRICING_CHECK,
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
