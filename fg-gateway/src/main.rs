use std::{env, net::SocketAddr};

use gateway::{
    GatewayConfig, SharedState, UnitAddressResolver, build_gateway_app, init_logging,
    parse_listen_addr, parse_timeout_ms,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = match parse_cli_args() {
        Ok(CliAction::Run(cli)) => cli,
        Ok(CliAction::Help) => {
            print_cli_help();
            return Ok(());
        }
        Ok(CliAction::Version) => {
            println!("{}", binary_version_text());
            return Ok(());
        }
        Err(err) => {
            eprintln!("error: {err}\n");
            print_cli_help();
            return Err(err.into());
        }
    };

    init_logging()?;
    info!("{}", binary_version_text());

    let mut config = GatewayConfig::from_env()?;
    if let Some(addr) = cli.listen_addr {
        config.listen_addr = addr;
    }
    if let Some(upstream) = cli.upstream {
        config.upstream = upstream;
    }
    if let Some(timeout_ms) = cli.request_timeout_ms {
        config = config.with_request_timeout_ms(timeout_ms);
    }

    if config.api_key.is_none() {
        warn!("FLEET_COMMAND_API_KEY is not set; stream operations will fail closed");
    }
    info!(
        "fleet-command upstream {} (timeout {}ms)",
        config.upstream.base(),
        config.request_timeout_ms
    );

    let state = SharedState::new(&config);
    let app = build_gateway_app(state);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!("gateway listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Clone, Debug, Default)]
struct CliArgs {
    listen_addr: Option<SocketAddr>,
    upstream: Option<UnitAddressResolver>,
    request_timeout_ms: Option<u64>,
}

enum CliAction {
    Run(CliArgs),
    Help,
    Version,
}

fn parse_cli_args() -> Result<CliAction, String> {
    let mut args = env::args().skip(1);
    let mut cli = CliArgs::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(CliAction::Help),
            "-V" | "--version" => return Ok(CliAction::Version),
            "--listen-addr" => {
                let value = next_arg_value("--listen-addr", &mut args)?;
                cli.listen_addr = Some(parse_listen_addr(&value).map_err(|err| err.to_string())?);
            }
            "--upstream-url" => {
                let value = next_arg_value("--upstream-url", &mut args)?;
                cli.upstream =
                    Some(UnitAddressResolver::parse(&value).map_err(|err| err.to_string())?);
            }
            "--request-timeout-ms" => {
                let value = next_arg_value("--request-timeout-ms", &mut args)?;
                cli.request_timeout_ms =
                    Some(parse_timeout_ms(&value).map_err(|err| err.to_string())?);
            }
            _ => return Err(format!("unknown argument: {arg}")),
        }
    }
    Ok(CliAction::Run(cli))
}

fn next_arg_value(flag: &str, args: &mut impl Iterator<Item = String>) -> Result<String, String> {
    let value = args
        .next()
        .ok_or_else(|| format!("missing value for {flag}"))?;
    if value.trim().is_empty() {
        return Err(format!("value for {flag} cannot be empty"));
    }
    Ok(value)
}

fn print_cli_help() {
    eprintln!(concat!(
        "Usage: fg-gateway [options]\n\n",
        "Options:\n",
        "  --listen-addr <ADDR>          Dashboard listen address (env GATEWAY_ADDR, default: 0.0.0.0:3000)\n",
        "  --upstream-url <URL>          Fleet-command base URL (env FLEET_COMMAND_URL, default: http://127.0.0.1:9000)\n",
        "  --request-timeout-ms <MS>     Per-call upstream timeout (env FLEET_COMMAND_TIMEOUT_MS, default: 5000)\n",
        "  -V, --version                 Show version with git metadata\n",
        "  -h, --help                    Show this help\n\n",
        "Stream operations require FLEET_COMMAND_API_KEY.\n"
    ));
}

fn binary_version_text() -> String {
    let binary = env!("CARGO_PKG_NAME");
    let git_tag = option_env!("FG_BUILD_GIT_TAG").unwrap_or("untagged");
    let git_commit = option_env!("FG_BUILD_GIT_COMMIT").unwrap_or("unknown");
    let git_dirty = option_env!("FG_BUILD_GIT_DIRTY").unwrap_or("false");

    if matches!(git_dirty, "true" | "1" | "yes" | "dirty") {
        format!("{binary} {git_tag} (dirty commit: {git_commit})")
    } else {
        format!("{binary} {git_tag}")
    }
}
