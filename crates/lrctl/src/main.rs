// Entry point for the lrctl launcher.
//
// Parses the command line, builds the LauncherContext and hands over to the
// Launcher. Everything runs sequentially on a single-threaded runtime.

use clap::Parser;
use lrctl::checks::tool_check::PromptInstallOffer;
use lrctl::command_settings::CommandSettings;
use lrctl::container::DockerCommandManager;
use lrctl::launcher::Launcher;
use lrctl::remote_fetcher::RemoteFetcher;
use lrctl_common::constants::return_code;
use lrctl_common::launcher_context::LauncherContext;
use lrctl_common::LaunchError;
use lrctl_sdk::build_constants::{LauncherPackage, Source};
use std::sync::Arc;

fn main() {
    let settings = CommandSettings::parse();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build Tokio runtime");

    let exit_code = runtime.block_on(async move { run(settings).await });

    std::process::exit(exit_code);
}

async fn run(settings: CommandSettings) -> i32 {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::debug!(
        "{} {} ({})",
        LauncherPackage::NAME,
        LauncherPackage::VERSION,
        Source::COMMIT_HASH
    );

    let context = LauncherContext::new();
    if let Err(e) = context.temp_files().install_signal_handler() {
        tracing::warn!("Failed to install signal handler: {:#}", e);
    }

    let fetcher = match RemoteFetcher::new(&context) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            tracing::error!("Failed to create HTTP client: {:#}", e);
            return return_code::TERMINATED_ERROR;
        }
    };

    let launcher = Launcher::new(
        Arc::clone(&context),
        Arc::new(DockerCommandManager::new()),
        Arc::new(fetcher),
        Arc::new(PromptInstallOffer::new(Arc::new(context.get_trace("InstallOffer")))),
    );

    match launcher.execute_command(&settings).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            match e.downcast_ref::<LaunchError>() {
                Some(launch_error) => eprintln!("lrctl: {}", launch_error),
                None => context.get_trace("lrctl").error_chain(&e),
            }
            return_code::TERMINATED_ERROR
        }
    }
}
