//! CLI harness for exercising the safety guard against on-disk storage
//!
//! This tool allows testing:
//! - PIN setup, unlock and the failed-attempt counter
//! - Panic wipe arming and execution
//! - Quick exit and trigger routing
//! - Network classification and anonymity routing probes

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use haven_guard::copy::{pin_rejection_message, unlock_message};
use haven_guard::{
    ConfirmationRequest, DataStores, EncryptedFileStorage, Error as GuardError, ExitTrigger,
    GuardConfig, GuardDeps, MasterKey, MemoryCache, MemoryDataStore, MockBiometric,
    NavigationShell, QuickExitDestination, SafetyGuard, SettingFlag,
};
use haven_net::copy::{level_label, suggestion_text, warning_text};
use haven_net::{
    AnonymityRoutingController, AppLauncher, ConnectionType, ConnectivitySnapshot, NetConfig,
    NetworkPrivacyClassifier, SocksOnionProxy, StaticConnectivity,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

const MASTER_KEY_FILE: &str = "master.key";
const STORE_DIR: &str = "store";

#[derive(Parser)]
#[command(name = "guard-harness")]
#[command(about = "Haven safety guard testing harness", long_about = None)]
struct Cli {
    /// Data directory (defaults to $HAVEN_DATA_DIR, then the platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Guard configuration (JSON)
    #[arg(long, global = true)]
    guard_config: Option<PathBuf>,

    /// Network configuration (JSON)
    #[arg(long, global = true)]
    net_config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Set up the PIN
    SetPin { pin: String },

    /// Change the PIN
    ChangePin { current: String, new: String },

    /// Remove the PIN
    RemovePin { current: String },

    /// Try to unlock
    Unlock { pin: String },

    /// Show PIN, attempt and settings state
    Status,

    /// Change a setting
    SetFlag {
        #[arg(value_enum)]
        flag: FlagArg,
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },

    /// Configure panic wipe
    PanicWipe {
        /// Arm (true) or disarm (false)
        #[arg(action = clap::ArgAction::Set)]
        armed: bool,

        /// Failed-attempt threshold (1-10)
        #[arg(short, long)]
        max_attempts: Option<u32>,
    },

    /// Destroy all local data now
    Wipe,

    /// Pick the quick exit destination
    SetDestination {
        #[arg(value_enum)]
        destination: DestinationArg,
    },

    /// Fire an exit trigger
    Trigger {
        #[arg(value_enum)]
        trigger: TriggerArg,
    },

    /// Mark a Wi-Fi network as trusted
    Trust { ssid: String },

    /// Stop trusting a Wi-Fi network
    Untrust { ssid: String },

    /// Classify a simulated connection
    Classify {
        #[arg(value_enum)]
        connection: ConnectionArg,

        /// Wi-Fi SSID
        #[arg(short, long)]
        ssid: Option<String>,
    },

    /// Probe the local onion proxy
    Routing {
        /// Turn routing on before probing
        #[arg(long)]
        enable: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FlagArg {
    Biometric,
    Offline,
    Tor,
    Encryption,
    QuickExit,
    ShakeToClear,
    NetworkMonitoring,
    NetworkWarnings,
    CrashReporting,
    ShareProfile,
}

impl From<FlagArg> for SettingFlag {
    fn from(flag: FlagArg) -> Self {
        match flag {
            FlagArg::Biometric => SettingFlag::Biometric,
            FlagArg::Offline => SettingFlag::OfflineMode,
            FlagArg::Tor => SettingFlag::Tor,
            FlagArg::Encryption => SettingFlag::Encryption,
            FlagArg::QuickExit => SettingFlag::QuickExit,
            FlagArg::ShakeToClear => SettingFlag::ShakeToClear,
            FlagArg::NetworkMonitoring => SettingFlag::NetworkMonitoring,
            FlagArg::NetworkWarnings => SettingFlag::NetworkWarnings,
            FlagArg::CrashReporting => SettingFlag::CrashReporting,
            FlagArg::ShareProfile => SettingFlag::ShareProfileWithAssistant,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DestinationArg {
    Google,
    Weather,
    News,
    Wikipedia,
}

impl From<DestinationArg> for QuickExitDestination {
    fn from(destination: DestinationArg) -> Self {
        match destination {
            DestinationArg::Google => QuickExitDestination::GoogleSearch,
            DestinationArg::Weather => QuickExitDestination::Weather,
            DestinationArg::News => QuickExitDestination::News,
            DestinationArg::Wikipedia => QuickExitDestination::Wikipedia,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum TriggerArg {
    Button,
    AppBar,
    Fab,
    TripleTap,
    Shake,
}

impl From<TriggerArg> for ExitTrigger {
    fn from(trigger: TriggerArg) -> Self {
        match trigger {
            TriggerArg::Button => ExitTrigger::Button,
            TriggerArg::AppBar => ExitTrigger::AppBarIcon,
            TriggerArg::Fab => ExitTrigger::FloatingButton,
            TriggerArg::TripleTap => ExitTrigger::TripleTap,
            TriggerArg::Shake => ExitTrigger::Shake,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ConnectionArg {
    Wifi,
    Cellular,
    Ethernet,
    Vpn,
    None,
}

impl From<ConnectionArg> for ConnectionType {
    fn from(connection: ConnectionArg) -> Self {
        match connection {
            ConnectionArg::Wifi => ConnectionType::Wifi,
            ConnectionArg::Cellular => ConnectionType::Cellular,
            ConnectionArg::Ethernet => ConnectionType::Ethernet,
            ConnectionArg::Vpn => ConnectionType::Vpn,
            ConnectionArg::None => ConnectionType::None,
        }
    }
}

/// Shell that prints what the UI would do
struct ConsoleShell;

impl NavigationShell for ConsoleShell {
    fn clear_visible_state(&self) {
        println!("[shell] visible state cleared");
    }

    fn navigate_to(&self, url: &str) -> haven_guard::Result<()> {
        println!("[shell] navigate to {}", url);
        Ok(())
    }

    fn confirm(&self, request: ConfirmationRequest) -> bool {
        println!("[shell] confirm {:?}: yes", request);
        true
    }
}

/// Launcher for desktop runs, where the proxy is started by hand
struct ManualLauncher;

impl AppLauncher for ManualLauncher {
    fn is_installed(&self, _app_id: &str) -> bool {
        true
    }

    fn launch(&self, app_id: &str) -> haven_net::Result<()> {
        println!("Start {} manually, then run this command again.", app_id);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let data_dir = resolve_data_dir(cli.data_dir)?;
    let guard_config = match &cli.guard_config {
        Some(path) => GuardConfig::from_json(&read(path)?)?,
        None => GuardConfig::default(),
    };
    let net_config: NetConfig = match &cli.net_config {
        Some(path) => serde_json::from_str(&read(path)?)
            .with_context(|| format!("invalid network config {}", path.display()))?,
        None => NetConfig::default(),
    };

    let guard = open_guard(&data_dir, guard_config)?;
    info!("Data directory: {}", data_dir.display());

    match cli.command {
        Commands::SetPin { pin } => match guard.set_pin(pin.as_str()) {
            Ok(()) => println!("PIN set."),
            Err(GuardError::Policy(reason)) => bail!(pin_rejection_message(reason)),
            Err(e) => return Err(e.into()),
        },
        Commands::ChangePin { current, new } => {
            match guard.change_pin(current.as_str(), new.as_str()) {
                Ok(outcome) => println!("{}", unlock_message(&outcome)),
                Err(GuardError::Policy(reason)) => bail!(pin_rejection_message(reason)),
                Err(e) => return Err(e.into()),
            }
        }
        Commands::RemovePin { current } => {
            let outcome = guard.remove_pin(current.as_str())?;
            println!("{}", unlock_message(&outcome));
        }
        Commands::Unlock { pin } => {
            let outcome = guard.unlock(pin.as_str())?;
            println!("{}", unlock_message(&outcome));
        }
        Commands::Status => print_status(&guard)?,
        Commands::SetFlag { flag, enabled } => {
            guard.set_flag(flag.into(), enabled)?;
            println!("Saved.");
        }
        Commands::PanicWipe {
            armed,
            max_attempts,
        } => {
            if let Some(max) = max_attempts {
                guard.set_max_attempts(max)?;
            }
            guard.set_panic_wipe_enabled(armed)?;
            print_status(&guard)?;
        }
        Commands::Wipe => {
            guard.clear_all_data()?;
            println!("All local data erased.");
        }
        Commands::SetDestination { destination } => {
            guard.set_quick_exit_destination(destination.into())?;
            println!("Quick exit goes to {}", guard.quick_exit_destination().url());
        }
        Commands::Trigger { trigger } => {
            let action = guard.on_trigger(trigger.into())?;
            println!("Action: {:?}", action);
        }
        Commands::Trust { ssid } => {
            guard.trust_network(&ssid)?;
            println!("Trusted.");
        }
        Commands::Untrust { ssid } => {
            guard.untrust_network(&ssid)?;
            println!("No longer trusted.");
        }
        Commands::Classify { connection, ssid } => {
            let snapshot = ConnectivitySnapshot {
                connection_type: connection.into(),
                ssid,
            };
            let classifier = NetworkPrivacyClassifier::new(
                Arc::new(StaticConnectivity::new(snapshot)),
                guard.settings_store(),
                guard.trusted_networks(),
                net_config.probe_timeout(),
            );
            let status = classifier.classify().await;
            println!("{}", level_label(status.level));
            if let Some(warning) = status.warning {
                println!("  {}", warning_text(warning));
            }
            if let Some(suggestion) = status.suggestion {
                println!("  {}", suggestion_text(suggestion));
            }
        }
        Commands::Routing { enable } => {
            let controller = AnonymityRoutingController::new(
                Arc::new(SocksOnionProxy::new(&net_config, Arc::new(ManualLauncher))),
                guard.settings_store(),
                guard.offline_gate().clone(),
                &net_config,
            );
            if enable {
                controller.set_enabled(true)?;
            }
            let status = controller.refresh_status().await;
            println!("{:?}: {}", status.state, status.message);
            match controller.route() {
                Ok(route) => println!("Next request: {:?}", route),
                Err(e) => warn!("No route: {}", e),
            }
            if status.enabled && !status.proxy_reachable {
                controller.open_proxy_app()?;
            }
        }
    }

    Ok(())
}

fn resolve_data_dir(explicit: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir);
    }
    if let Ok(dir) = std::env::var("HAVEN_DATA_DIR") {
        return Ok(PathBuf::from(dir));
    }
    directories::ProjectDirs::from("org", "Haven", "haven-guard")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .context("no home directory; pass --data-dir or set HAVEN_DATA_DIR")
}

fn read(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn load_master_key(data_dir: &Path) -> anyhow::Result<MasterKey> {
    let path = data_dir.join(MASTER_KEY_FILE);
    if path.exists() {
        let bytes = hex::decode(read(&path)?.trim()).context("master key is not hex")?;
        return Ok(MasterKey::from_bytes(&bytes)?);
    }

    fs::create_dir_all(data_dir)?;
    let key = MasterKey::generate();
    fs::write(&path, hex::encode(key.as_bytes()))?;
    info!("Generated new master key");
    Ok(key)
}

fn open_guard(data_dir: &Path, config: GuardConfig) -> anyhow::Result<SafetyGuard> {
    let key = load_master_key(data_dir)?;
    let storage = Arc::new(EncryptedFileStorage::open(data_dir.join(STORE_DIR), key)?);

    // Profile, favorites and history belong to the app; the harness has none.
    let data = DataStores {
        profile: Arc::new(MemoryDataStore::new("profile")),
        favorites: Arc::new(MemoryDataStore::new("favorites")),
        history: Arc::new(MemoryDataStore::new("history")),
    };

    Ok(SafetyGuard::new(
        config,
        GuardDeps {
            storage,
            data,
            cache: Arc::new(MemoryCache::new()),
            biometric: Arc::new(MockBiometric::unavailable()),
            shell: Arc::new(ConsoleShell),
        },
    )?)
}

fn print_status(guard: &SafetyGuard) -> anyhow::Result<()> {
    match guard.credential_info()? {
        Some(info) => println!("PIN: set ({} digits)", info.length),
        None => println!("PIN: not set"),
    }

    let attempts = guard.attempt_state()?;
    println!(
        "Panic wipe: {} | failed {}/{}",
        if attempts.panic_wipe_enabled { "armed" } else { "off" },
        attempts.failed_count,
        attempts.max_attempts
    );

    let settings = guard.settings()?;
    for flag in SettingFlag::ALL {
        println!("  {:?}: {}", flag, settings.get(flag));
    }
    println!("Quick exit: {}", guard.quick_exit_destination().url());
    println!("Trusted networks: {}", guard.trusted_networks().list()?.len());
    Ok(())
}
