//! RAX FTP Client - Entry Point
//!
//! Sends one local file to the configured server the way the distribution
//! daemon does: upload under a hidden temporary name, then rename it into
//! place so readers never see a partial file.

use log::{error, info};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::process::ExitCode;

use rax_ftp_client::error::{log_failure, status_code};
use rax_ftp_client::utils::logging::setup_logging;
use rax_ftp_client::{
    AsciiEncoder, ClientConfig, ConnectionConfig, ControlSession, Direction, FtpClientError,
    FtpResult, Greeting, PassOutcome, ProtectionLevel, Reply, TlsMode, TransferType, UserOutcome,
};

fn main() -> ExitCode {
    setup_logging();

    let mut args = std::env::args().skip(1);
    let Some(local) = args.next() else {
        error!("Usage: rax-ftp-client <local-file> [config.toml]");
        return ExitCode::from(2);
    };
    let config_path = args.next();

    let config = match ClientConfig::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::from(2);
        }
    };

    let result = send(&config, Path::new(&local));
    let status = status_code(&result);
    match &result {
        Ok(()) => {
            info!("Sent {local} to {}", config.connection.host);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log_failure(&format!("Sending {local} failed (status {status})"), e);
            ExitCode::FAILURE
        }
    }
}

fn send(config: &ClientConfig, local: &Path) -> FtpResult<()> {
    let connection = &config.connection;
    let settings = &config.session;

    let (mut session, greeting) =
        ControlSession::connect(&connection.host, connection.port, settings.clone())?;

    if settings.tls != TlsMode::None {
        session.auth_tls()?;
    }
    if greeting != Greeting::AlreadyLoggedIn {
        login(&mut session, connection)?;
    }
    if settings.tls != TlsMode::None {
        let level = if settings.tls.protects_data() {
            ProtectionLevel::Private
        } else {
            ProtectionLevel::Clear
        };
        session.protect(level)?;
    }
    if settings.idle_secs > 0 {
        session.idle(settings.idle_secs)?;
    }
    session.set_type(settings.transfer_type)?;
    if let Some(dir) = &connection.target_dir {
        session.cd(dir, connection.create_target_dir)?;
    }

    let name = local
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            FtpClientError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} has no usable file name", local.display()),
            ))
        })?;
    let temporary = format!(".{name}");
    let file = File::open(local)?;

    let request = session.request_for(Direction::Upload, &temporary);
    session.open_data(&request)?;
    if settings.transfer_type == TransferType::Ascii {
        let mut encoder = AsciiEncoder::new();
        let mut source = &file;
        let mut block = vec![0u8; settings.block_size];
        loop {
            let n = source.read(&mut block)?;
            if n == 0 {
                break;
            }
            session.write(&block[..n], Some(&mut encoder))?;
        }
    } else {
        let mut offset = 0u64;
        while session.send_file(&file, &mut offset, settings.block_size)? > 0 {}
    }
    session.close_data()?;

    session.move_file(&temporary, name, settings.fast_rename, false)?;
    session.quit()
}

fn login(session: &mut ControlSession, connection: &ConnectionConfig) -> FtpResult<()> {
    match session.user(&connection.username)? {
        UserOutcome::LoggedIn => return Ok(()),
        UserOutcome::AccountRequired => return account(session, connection),
        UserOutcome::PasswordRequired | UserOutcome::Busy => {}
    }
    match session.pass(&connection.password)? {
        PassOutcome::LoggedIn => Ok(()),
        PassOutcome::AccountRequired => account(session, connection),
    }
}

fn account(session: &mut ControlSession, connection: &ConnectionConfig) -> FtpResult<()> {
    match &connection.account {
        Some(account) => session.account(account),
        None => {
            error!("Server wants an account but none is configured");
            let reply = session
                .last_reply()
                .cloned()
                .unwrap_or_else(|| Reply::new(332, Vec::new()));
            Err(FtpClientError::UnexpectedReply(reply))
        }
    }
}
