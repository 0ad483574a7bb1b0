use std::io::Write;
use std::net::IpAddr;
use std::str::FromStr;

use clap::Parser;
use clap::error::ErrorKind;
use log::{error, info};
use tokio::io::BufReader;
use tokio::sync::broadcast;

use ortc::api::API;
use ortc::api::setting_engine::SettingEngine;
use ortc::configuration::{
    DEFAULT_SESSION_NAME, SessionConfig, SessionConfigBuilder, parse_ice_role,
    parse_redirect_address,
};
use ortc::session::{Session, SessionEvent};
use ortc::signaling::{WriterSignaling, read_message};
use ortc::transport::ice::server::RTCIceServer;
use shared::error::{EXIT_SUCCESS, EXIT_USAGE, Result};

const USAGE: &str = "usage: redirect-transport <0|1> <redirect-ip> <redirect-port>";

#[derive(Parser)]
#[command(name = "redirect-transport")]
#[command(author = "Rusty Rain <y@liu.mx>")]
#[command(version = "0.0.0")]
#[command(about = "Negotiates ICE and DTLS by hand and redirects the secured stream", long_about = None)]
struct Cli {
    /// ICE role: 0 for controlled, 1 for controlling.
    role: String,
    /// Address the application stream is redirected to.
    redirect_ip: String,
    redirect_port: String,

    #[arg(short, long)]
    debug: bool,
    #[arg(long, default_value_t = format!("INFO"))]
    log_level: String,
    /// Label prefixed to every log line of the session.
    #[arg(long, default_value_t = format!("{DEFAULT_SESSION_NAME}"))]
    name: String,
    /// STUN or TURN URL, replaces the default server list.
    #[arg(long = "ice-server")]
    ice_servers: Vec<String>,
    /// Host address to gather candidates on.
    #[arg(long = "interface")]
    interfaces: Vec<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(_) => {
            eprintln!("{USAGE}");
            std::process::exit(EXIT_USAGE);
        }
    };

    let log_level = match log::LevelFilter::from_str(&cli.log_level) {
        Ok(log_level) => log_level,
        Err(_) => {
            eprintln!("{USAGE}");
            std::process::exit(EXIT_USAGE);
        }
    };
    init_logger(cli.debug, log_level);

    let (config, setting_engine) = match configure(&cli) {
        Ok(configured) => configured,
        Err(err) => {
            error!("{err}");
            eprintln!("{USAGE}");
            std::process::exit(err.exit_code());
        }
    };

    let (stop_tx, stop_rx) = broadcast::channel::<()>(1);

    info!("Press Ctrl-C to stop");
    std::thread::spawn(move || {
        let mut stop_tx = Some(stop_tx);
        if let Err(err) = ctrlc::set_handler(move || {
            if let Some(stop_tx) = stop_tx.take() {
                let _ = stop_tx.send(());
            }
        }) {
            error!("Error setting Ctrl-C handler: {err}");
        }
    });

    let code = run(stop_rx, config, setting_engine).await;
    std::process::exit(code);
}

fn init_logger(debug: bool, log_level: log::LevelFilter) {
    let mut builder = env_logger::Builder::new();
    if debug {
        builder.format(|buf, record| {
            writeln!(
                buf,
                "{}:{} [{}] {} - {}",
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.level(),
                chrono::Local::now().format("%H:%M:%S.%6f"),
                record.args()
            )
        });
    } else {
        builder.format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                record.level(),
                chrono::Local::now().format("%H:%M:%S.%6f"),
                record.args()
            )
        });
    }
    builder.filter(None, log_level).init();
}

fn configure(cli: &Cli) -> Result<(SessionConfig, SettingEngine)> {
    let ice_role = parse_ice_role(&cli.role)?;
    let redirect_address = parse_redirect_address(&cli.redirect_ip, &cli.redirect_port)?;

    let mut builder = SessionConfigBuilder::new()
        .with_name(cli.name.clone())
        .with_ice_role(ice_role)
        .with_redirect_address(redirect_address);
    if !cli.ice_servers.is_empty() {
        builder = builder.with_ice_servers(
            cli.ice_servers
                .iter()
                .map(|url| RTCIceServer::new(vec![url.clone()]))
                .collect(),
        );
    }

    let mut setting_engine = SettingEngine::default();
    if !cli.interfaces.is_empty() {
        let interfaces = cli
            .interfaces
            .iter()
            .map(|interface| interface.parse::<IpAddr>())
            .collect::<std::result::Result<Vec<_>, _>>()?;
        setting_engine.set_interfaces(interfaces);
    }

    Ok((builder.build(), setting_engine))
}

/// Runs the session until it closes and returns the process exit status.
async fn run(
    mut stop_rx: broadcast::Receiver<()>,
    config: SessionConfig,
    setting_engine: SettingEngine,
) -> i32 {
    let mut api = API::new(setting_engine);
    let signaling = WriterSignaling::new(std::io::stdout());
    let mut session = Session::new(config, Box::new(signaling));

    if let Err(err) = session.start(&mut api) {
        return session.fail(err);
    }

    let mut stdin = BufReader::new(tokio::io::stdin());

    'EventLoop: loop {
        if let Err(err) = session.drain_events() {
            return session.fail(err);
        }
        if session.is_closed() {
            break 'EventLoop;
        }

        let event = tokio::select! {
            biased;

            _ = stop_rx.recv() => SessionEvent::Terminate,
            line = read_message(&mut stdin) => match line {
                Ok(Some(line)) => SessionEvent::Signaling(line),
                Ok(None) => SessionEvent::SignalingClosed,
                Err(err) => return session.fail(err),
            },
        };

        if let Err(err) = session.handle_event(event) {
            return session.fail(err);
        }
    }

    EXIT_SUCCESS
}
