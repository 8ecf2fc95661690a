//! Gateway serve command

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use gotas_commerce::{backend_from_settings, register_payment_tools};
use gotas_config::{BackendKind, GatewaySettings};
use gotas_mcp::{
    payment_catalog, serve_http, serve_stdio, AppState, Dispatcher, InvocationLimits, ServerInfo,
};
use tracing::info;

use crate::error::{CliError, CliResult};

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Serve over HTTP on this address
    #[arg(long, value_name = "ADDR", conflicts_with = "stdio")]
    pub http: Option<String>,

    /// Serve over stdin/stdout
    #[arg(long)]
    pub stdio: bool,

    /// Settings file (YAML or JSON)
    #[arg(long, env = "GOTAS_SETTINGS", value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Payment backend
    #[arg(long, value_name = "live|sandbox")]
    pub backend: Option<BackendKind>,

    /// Tool execution timeout in seconds
    #[arg(long, help = "Tool execution timeout in seconds")]
    pub timeout_secs: Option<u64>,

    /// Maximum concurrent tool executions
    #[arg(long, help = "Maximum concurrent tool executions")]
    pub max_concurrency: Option<usize>,
}

impl ServeArgs {
    /// File settings, then `GOTAS_*` environment, then flags
    pub fn resolve_settings(&self) -> CliResult<GatewaySettings> {
        let mut settings = match &self.settings {
            Some(path) => GatewaySettings::load_from_file(path)?,
            None => GatewaySettings::default(),
        };
        settings.apply_env_overrides()?;
        self.apply_flags(&mut settings)?;
        settings.validate()?;
        Ok(settings)
    }

    fn apply_flags(&self, settings: &mut GatewaySettings) -> CliResult<()> {
        if let Some(addr) = &self.http {
            let has_port = addr
                .rsplit_once(':')
                .map_or(false, |(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());
            if !has_port {
                return Err(CliError::InvalidArgument(format!(
                    "--http expects HOST:PORT, got '{}'",
                    addr
                )));
            }
            settings.bind_addr = addr.clone();
        }
        if let Some(backend) = self.backend {
            settings.backend = backend;
        }
        if let Some(secs) = self.timeout_secs {
            settings.tool_timeout_secs = secs;
        }
        if let Some(n) = self.max_concurrency {
            settings.max_concurrency = n;
        }
        Ok(())
    }
}

/// Wire catalog, backend and limits into a ready-to-serve state
pub fn build_state(settings: GatewaySettings) -> CliResult<AppState> {
    let backend = backend_from_settings(&settings)?;
    info!("Payment backend: {}", backend.name());

    let builder = Dispatcher::builder(payment_catalog())
        .limits(InvocationLimits::from_settings(&settings))
        .server_info(ServerInfo::from_settings(&settings));
    let dispatcher = register_payment_tools(builder, backend, &settings.base_url)
        .build()
        .map_err(CliError::from)?;

    Ok(AppState::new(dispatcher, settings))
}

pub async fn execute(args: ServeArgs) -> Result<()> {
    let settings = args.resolve_settings()?;
    let state = build_state(settings)?;

    if args.stdio {
        info!("Starting stdio gateway");
        serve_stdio(state).await?;
    } else {
        serve_http(state).await?;
    }

    Ok(())
}
