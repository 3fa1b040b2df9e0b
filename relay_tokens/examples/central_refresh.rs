use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use clap::Parser;
use relay_clock::DurationSecs;
use relay_tokens::{
    config::FileConfigProvider, jitter::RandomStartJitter, read_credential, run_cycle,
    store::InMemoryCredentialStore, ApplicationConfig, ConfigProvider, CredentialKind,
    CredentialValueRef, IssuerResponse, IssuerTransportError, RefreshScheduler, RelayConfig,
    RelayServices, StaticConfigProvider, UpstreamIssuer,
};
use tokio::time;

#[derive(Debug, Parser)]
struct Opts {
    /// A JSON configuration file; if omitted, both applications are enabled
    /// with placeholder credentials
    #[arg(short, long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// The prefix for keys in the shared store
    #[arg(short, long, env = "RELAY_NAMESPACE", default_value = "wc")]
    namespace: String,

    /// Seconds between refresh executions of each credential kind
    #[arg(long, env = "RELAY_CADENCE", default_value_t = 5)]
    cadence: u64,

    /// Lifetime, in seconds, of the credentials minted by the demo issuer
    #[arg(long, default_value_t = 330)]
    lifetime: u64,

    /// Run a single refresh cycle and exit
    #[arg(long)]
    once: bool,
}

/// Mints sequentially numbered credentials without talking to anyone
#[derive(Debug)]
struct MintingIssuer {
    lifetime: DurationSecs,
    minted: AtomicU64,
}

impl MintingIssuer {
    fn mint(&self, prefix: &str) -> IssuerResponse {
        let n = self.minted.fetch_add(1, Ordering::Relaxed) + 1;
        IssuerResponse::issued(format!("{prefix}-{n}"), self.lifetime)
    }
}

#[async_trait]
impl UpstreamIssuer for MintingIssuer {
    async fn fetch_access_token(
        &self,
        application: &ApplicationConfig,
        force_refresh: bool,
    ) -> Result<IssuerResponse, IssuerTransportError> {
        tracing::info!(app_id = %application.app_id, force_refresh, "minting access token");
        Ok(self.mint("token"))
    }

    async fn fetch_ticket(
        &self,
        _access_token: &CredentialValueRef,
    ) -> Result<IssuerResponse, IssuerTransportError> {
        tracing::info!("minting ticket");
        Ok(self.mint("ticket"))
    }
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    dotenvy::dotenv().ok();
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();

    let config: Arc<dyn ConfigProvider> = match &opts.config {
        Some(path) => Arc::new(FileConfigProvider::new(path.clone())),
        None => Arc::new(StaticConfigProvider::new(RelayConfig {
            primary: Some(ApplicationConfig::enabled("demo-primary", "demo-secret")),
            secondary: Some(ApplicationConfig::enabled("demo-secondary", "demo-secret")),
        })),
    };

    let services = RelayServices::builder()
        .config(config)
        .store(Arc::new(InMemoryCredentialStore::new()))
        .issuer(Arc::new(MintingIssuer {
            lifetime: DurationSecs(opts.lifetime),
            minted: AtomicU64::new(0),
        }))
        .namespace(opts.namespace)
        .build()?;

    if opts.once {
        for (kind, report) in run_cycle(&services).await {
            tracing::info!(%kind, ?report, "refresh finished");
        }
        return Ok(());
    }

    let _scheduler = RefreshScheduler::new(Duration::from_secs(opts.cadence))
        .with_jitter(RandomStartJitter::new())
        .spawn(services.clone());

    let mut interval = time::interval(Duration::from_secs(opts.cadence));
    loop {
        interval.tick().await;

        for kind in CredentialKind::ALL {
            match read_credential(&services, kind).await? {
                Some(credential) => tracing::info!(
                    %kind,
                    value = format_args!("{:#?}", credential.value),
                    remaining = credential.remaining_ttl.0,
                    "current shared credential"
                ),
                None => tracing::warn!(%kind, "no shared credential yet"),
            }
        }
    }
}
