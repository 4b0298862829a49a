//! Mount a DokuWiki instance as a filesystem.
use std::path::PathBuf;
use std::process::exit;

use clap::Parser;
use secrecy::{ExposeSecret as _, SecretString};
use tracing::{debug, error};

use dokufs::app_config::Config;
use dokufs::daemon;
use dokufs::fs::WikiFs;
use dokufs::fs::api::WikiApi;
use dokufs::trc::Trc;
use dokuwiki_rpc::{Client, Credentials};

#[derive(Parser)]
#[command(version, about = "Mount a DokuWiki instance as a filesystem.")]
struct Args {
    #[arg(
        short,
        long,
        value_parser,
        help = "Optional path to a dokufs config TOML."
    )]
    config_path: Option<PathBuf>,

    /// Base URL of the wiki, e.g. https://wiki.example.org.
    #[arg(long)]
    url: Option<String>,

    /// Username for basic authentication.
    #[arg(short, long)]
    user: Option<String>,

    /// Password for basic authentication.
    #[arg(short, long)]
    password: Option<String>,

    /// Bearer token, used instead of user and password.
    #[arg(long)]
    token: Option<String>,

    /// Where to mount the wiki tree.
    #[arg(short, long)]
    mount_point: Option<PathBuf>,

    /// Namespace prefix to confine the mount to, e.g. team:docs.
    #[arg(long)]
    chroot: Option<String>,

    /// Log filter directive, e.g. "debug" or "dokufs=trace".
    #[arg(long)]
    log: Option<String>,
}

/// Main entry point for the application.
fn main() {
    let args = Args::parse();

    // Load config first so the CLI flags can overlay it. Errors use
    // eprintln since tracing isn't initialized yet.
    let mut config = Config::load_or_default(args.config_path.as_deref()).unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {e}");
        exit(1);
    });
    if let Some(url) = args.url {
        config.url = Some(url);
    }
    if let Some(user) = args.user {
        config.user = Some(user);
    }
    if let Some(password) = args.password {
        config.password = Some(SecretString::from(password));
    }
    if let Some(token) = args.token {
        config.token = Some(SecretString::from(token));
    }
    if let Some(mount_point) = args.mount_point {
        config.mount_point = Some(mount_point);
    }
    if let Some(chroot) = args.chroot {
        config.chroot = chroot;
    }

    if let Err(error_messages) = config.validate() {
        eprintln!("Configuration is invalid.");
        for msg in &error_messages {
            eprintln!(" - {msg}");
        }
        exit(1);
    }

    let trc = args
        .log
        .as_deref()
        .map_or_else(Trc::default, Trc::with_directive);
    if let Err(e) = trc.init() {
        eprintln!("Failed to initialize logging: {e}");
        exit(1);
    }

    let url = config
        .url
        .clone()
        .unwrap_or_else(|| unreachable!("validate() requires a url"));
    let mount_point = config
        .mount_point
        .clone()
        .unwrap_or_else(|| unreachable!("validate() requires a mount point"));

    let credentials = if let Some(token) = &config.token {
        Credentials::Token(token.expose_secret().to_owned())
    } else if let (Some(user), Some(password)) = (&config.user, &config.password) {
        Credentials::Basic {
            user: user.clone(),
            password: password.expose_secret().to_owned(),
        }
    } else {
        Credentials::Anonymous
    };

    let client = match Client::builder(&url).credentials(credentials).build() {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to set up the wiki client: {e}");
            exit(1);
        }
    };

    let chroot = config.normalized_chroot();
    debug!(url = %url, chroot = %chroot, "Initializing filesystem...");
    let fs = WikiFs::new(WikiApi::new(client), &chroot, (config.uid, config.gid));

    if let Err(e) = daemon::run(fs, &mount_point) {
        error!("Mount failed: {e}");
        exit(1);
    }
}
