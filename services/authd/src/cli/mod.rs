//! authd CLI 分发：`run`、`doctor`、`version`。

use anyhow::anyhow;
use serde_json::json;

use crate::{
    auth::backend::{JsonFileBackend, RecordBackend},
    config::Config,
};

/// CLI 分发结果。
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum CliDispatch {
    /// 继续进入服务主循环。
    Run,
    /// 命令已处理完成，主程序应退出。
    Exit,
}

/// 解析并执行 authd CLI。
pub(crate) fn dispatch(args: &[String]) -> anyhow::Result<CliDispatch> {
    if args.is_empty() {
        return Ok(CliDispatch::Run);
    }

    let cmd = args[0].trim();
    if cmd.is_empty() || cmd == "run" {
        return Ok(CliDispatch::Run);
    }

    if matches!(cmd, "-h" | "--help" | "help") {
        print_root_help();
        return Ok(CliDispatch::Exit);
    }

    match cmd {
        "doctor" => {
            let format = parse_doctor_format(&args[1..])?;
            run_doctor(format);
            Ok(CliDispatch::Exit)
        }
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(CliDispatch::Exit)
        }
        other => Err(anyhow!(
            "unknown command: {other}; run `tg-authd --help` for usage"
        )),
    }
}

/// `doctor` 输出格式。
#[derive(Debug, PartialEq, Eq)]
enum DoctorFormat {
    Text,
    Json,
}

/// 解析 doctor 的 `--format` 参数。
fn parse_doctor_format(args: &[String]) -> anyhow::Result<DoctorFormat> {
    if args.is_empty() {
        return Ok(DoctorFormat::Text);
    }
    if args.len() == 2 && args[0] == "--format" {
        return match args[1].as_str() {
            "text" => Ok(DoctorFormat::Text),
            "json" => Ok(DoctorFormat::Json),
            other => Err(anyhow!("unsupported doctor format: {other}")),
        };
    }
    Err(anyhow!("usage: tg-authd doctor [--format text|json]"))
}

/// 打印配置与存储自检结果（密钥不输出），不健康时退出码为 1。
fn run_doctor(format: DoctorFormat) {
    let (config_ok, config_error, report) = match Config::from_env() {
        Ok(config) => {
            let backend = JsonFileBackend::new(config.store_path.clone());
            let store = match backend.load() {
                Ok(records) => json!({
                    "path": backend.path().display().to_string(),
                    "loadable": true,
                    "identities": records.len(),
                }),
                Err(err) => json!({
                    "path": backend.path().display().to_string(),
                    "loadable": false,
                    "error": err.to_string(),
                }),
            };
            let report = json!({
                "addr": config.addr,
                "tokenTtlSec": config.token_ttl.as_secs(),
                "bcryptCost": config.bcrypt_cost,
                "secretConfigured": true,
                "store": store,
            });
            (true, None, report)
        }
        Err(err) => (false, Some(format!("{err:#}")), json!({})),
    };
    let store_ok = report["store"]["loadable"].as_bool().unwrap_or(false);
    let healthy = config_ok && store_ok;

    match format {
        DoctorFormat::Text => {
            println!("config: {}", if config_ok { "ok" } else { "invalid" });
            if let Some(err) = &config_error {
                println!("config-error: {err}");
            }
            if config_ok {
                println!("addr: {}", report["addr"].as_str().unwrap_or_default());
                println!("token-ttl-sec: {}", report["tokenTtlSec"]);
                println!("bcrypt-cost: {}", report["bcryptCost"]);
                println!(
                    "store-path: {}",
                    report["store"]["path"].as_str().unwrap_or_default()
                );
                println!("store-loadable: {}", if store_ok { "yes" } else { "no" });
                if store_ok {
                    println!("store-identities: {}", report["store"]["identities"]);
                } else {
                    println!(
                        "store-error: {}",
                        report["store"]["error"].as_str().unwrap_or_default()
                    );
                }
            }
        }
        DoctorFormat::Json => {
            let payload = json!({
                "healthy": healthy,
                "configError": config_error,
                "config": report,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).unwrap_or_else(|_| "{}".to_string())
            );
        }
    }

    if !healthy {
        std::process::exit(1);
    }
}

/// 打印 root help。
fn print_root_help() {
    println!("tg-authd usage:");
    println!("  tg-authd run");
    println!("  tg-authd doctor [--format text|json]");
    println!("  tg-authd version");
    println!();
    println!("environment:");
    println!("  AUTHD_JWT_SECRET      token signing secret (required; JWT_SECRET also accepted)");
    println!("  AUTHD_ADDR            listen address (default 0.0.0.0:5000)");
    println!("  AUTHD_STORE_PATH      identity store file");
    println!("  AUTHD_TOKEN_TTL_SEC   token lifetime in seconds (default 3600)");
    println!("  AUTHD_BCRYPT_COST     bcrypt cost (default 10)");
}

#[cfg(test)]
mod tests {
    use super::{CliDispatch, DoctorFormat, dispatch, parse_doctor_format};

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn empty_or_run_starts_service() {
        assert_eq!(dispatch(&[]).expect("dispatch"), CliDispatch::Run);
        assert_eq!(dispatch(&args(&["run"])).expect("dispatch"), CliDispatch::Run);
    }

    #[test]
    fn unknown_command_is_an_error() {
        assert!(dispatch(&args(&["serve-forever"])).is_err());
    }

    #[test]
    fn doctor_format_parsing() {
        assert_eq!(parse_doctor_format(&[]).expect("default"), DoctorFormat::Text);
        assert_eq!(
            parse_doctor_format(&args(&["--format", "json"])).expect("json"),
            DoctorFormat::Json
        );
        assert!(parse_doctor_format(&args(&["--format", "yaml"])).is_err());
        assert!(parse_doctor_format(&args(&["json"])).is_err());
    }
}
