//! End-to-end tests against a scripted FTP peer on loopback.

mod common;

use chrono::{TimeZone, Utc};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::mpsc;
use std::time::Duration;

use common::{
    receive_data, receive_data_tls, send_data, session_config, spawn, tls_server_config, Peer,
};
use rax_ftp_client::error::{status_code, IoPhase};
use rax_ftp_client::{
    ControlSession, DataMode, Direction, FtpClientError, Greeting, ListKind, PassOutcome,
    ProtectionLevel, SessionConfig, TimeoutFlag, TlsMode, TransferType, UserOutcome,
};

fn connect(port: u16, config: SessionConfig) -> ControlSession {
    let (session, greeting) = ControlSession::connect("127.0.0.1", port, config).unwrap();
    assert_eq!(greeting, Greeting::Ready);
    session
}

fn login(session: &mut ControlSession) {
    assert_eq!(session.user("tester").unwrap(), UserOutcome::PasswordRequired);
    assert_eq!(session.pass("secret").unwrap(), PassOutcome::LoggedIn);
}

/// Server side of one active-mode STOR: connects back and reads to EOF.
fn accept_active_upload(peer: &mut Peer, name: &str) -> (SocketAddr, Vec<u8>) {
    let target = peer.port();
    peer.reply(&format!("STOR {name}"), "150 Opening data connection");
    let mut data = TcpStream::connect(target).unwrap();
    let mut received = Vec::new();
    data.read_to_end(&mut received).unwrap();
    peer.send("226 Transfer complete");
    (target, received)
}

fn upload(session: &mut ControlSession, name: &str, bytes: &[u8]) {
    let request = session.request_for(Direction::Upload, name);
    session.open_data(&request).unwrap();
    session.write(bytes, None).unwrap();
    session.close_data().unwrap();
}

fn read_all(session: &mut ControlSession) -> Vec<u8> {
    let mut received = Vec::new();
    let mut block = [0u8; 512];
    loop {
        let n = session.read(&mut block).unwrap();
        if n == 0 {
            break;
        }
        received.extend_from_slice(&block[..n]);
    }
    received
}

#[test]
fn multi_line_greeting_and_busy_login() {
    let (port, peer) = spawn(|peer| {
        peer.send("220-Welcome to the test server");
        peer.send("220-Uploads go to /in");
        peer.send("220 Ready");
        peer.reply("USER ", "430 Previous login still in progress");
        peer.login();
        peer.reply("QUIT", "221 Goodbye");
    });

    let mut session = connect(port, session_config());
    assert_eq!(session.last_reply().unwrap().lines().len(), 3);
    login(&mut session);
    assert!(session.is_logged_in());
    session.quit().unwrap();

    let commands = peer.join().unwrap();
    assert_eq!(
        commands,
        vec!["USER tester", "USER tester", "PASS secret", "QUIT"]
    );
}

#[test]
fn busy_login_gives_up_after_ten_retries() {
    let (port, peer) = spawn(|peer| {
        peer.send("220 Ready");
        for _ in 0..11 {
            peer.reply("USER ", "430 Previous login still in progress");
        }
        peer.reply("QUIT", "221 Goodbye");
    });

    let mut session = connect(port, session_config());
    let result = session.user("tester");
    assert_eq!(status_code(&result), 430);
    assert!(!session.is_logged_in());
    session.quit().unwrap();

    let commands = peer.join().unwrap();
    assert_eq!(commands.iter().filter(|c| c.starts_with("USER ")).count(), 11);
    assert_eq!(commands.last().map(String::as_str), Some("QUIT"));
}

#[test]
fn refused_greeting_is_the_error() {
    let (port, peer) = spawn(|peer| {
        peer.send("421 Too many connections");
    });

    let result = ControlSession::connect("127.0.0.1", port, session_config());
    let err = result.err().unwrap();
    assert_eq!(err.reply().map(|r| r.code()), Some(421));
    peer.join().unwrap();
}

#[test]
fn passive_upload_deletes_existing_target_once() {
    let (port, peer) = spawn(|peer| {
        peer.send("220 Ready");
        peer.login();
        peer.reply("TYPE I", "200 Type set to I");
        let listener = peer.passive();
        peer.reply("STOR .report", "553 Could not create file (Overwrite)");
        peer.reply("DELE .report", "250 Deleted");
        peer.reply("STOR .report", "150 Opening data connection");
        let data = receive_data(&listener);
        assert_eq!(data, b"line one\nline two\n");
        peer.send("226 Transfer complete");
        peer.reply("QUIT", "221 Goodbye");
    });

    let mut session = connect(port, session_config());
    login(&mut session);
    session.set_type(TransferType::Binary).unwrap();
    let request = session.request_for(Direction::Upload, ".report");
    session.open_data(&request).unwrap();
    assert!(session.has_data_channel());
    session.write(b"line one\n", None).unwrap();
    session.write(b"line two\n", None).unwrap();
    let channel = session.data_channel().unwrap();
    assert_eq!(channel.bytes(), 18);
    assert_eq!(channel.mode(), DataMode::Passive);
    assert_eq!(channel.direction(), Direction::Upload);
    assert_eq!(channel.transfer_type(), TransferType::Binary);
    assert!(!channel.is_encrypted());
    session.close_data().unwrap();
    assert!(!session.has_data_channel());
    session.quit().unwrap();

    let commands = peer.join().unwrap();
    assert_eq!(commands.iter().filter(|c| c.starts_with("DELE")).count(), 1);
}

#[test]
fn active_upload_deletes_existing_target_once() {
    let (port, peer) = spawn(|peer| {
        peer.send("220 Ready");
        peer.login();
        let _refused = peer.port();
        peer.reply("STOR .report", "553 Could not create file (Overwrite)");
        peer.reply("DELE .report", "250 Deleted");
        let (_, data) = accept_active_upload(peer, ".report");
        assert_eq!(data, b"fresh copy");
        peer.reply("QUIT", "221 Goodbye");
    });

    let config = SessionConfig {
        data_mode: DataMode::Active,
        ..session_config()
    };
    let mut session = connect(port, config);
    login(&mut session);
    upload(&mut session, ".report", b"fresh copy");
    session.quit().unwrap();

    let commands = peer.join().unwrap();
    assert_eq!(commands.iter().filter(|c| c.starts_with("DELE")).count(), 1);
    assert_eq!(commands.iter().filter(|c| c.starts_with("PORT")).count(), 2);
}

#[test]
fn active_uploads_reuse_the_data_port_until_it_is_taken() {
    let (ports_tx, ports_rx) = mpsc::channel();
    let (port, peer) = spawn(move |peer| {
        peer.send("220 Ready");
        peer.login();
        for name in ["one", "two", "three"] {
            let (target, data) = accept_active_upload(peer, name);
            assert_eq!(data, name.as_bytes());
            ports_tx.send(target.port()).unwrap();
        }
        peer.reply("QUIT", "221 Goodbye");
    });

    let config = SessionConfig {
        data_mode: DataMode::Active,
        reuse_data_port: true,
        ..session_config()
    };
    let mut session = connect(port, config);
    login(&mut session);

    upload(&mut session, "one", b"one");
    let first = ports_rx.recv().unwrap();
    upload(&mut session, "two", b"two");
    assert_eq!(ports_rx.recv().unwrap(), first);

    let _occupant = TcpListener::bind(("127.0.0.1", first)).unwrap();
    upload(&mut session, "three", b"three");
    assert_ne!(ports_rx.recv().unwrap(), first);

    session.quit().unwrap();
    peer.join().unwrap();
}

#[test]
fn passive_upload_retries_after_425() {
    let (port, peer) = spawn(|peer| {
        peer.send("220 Ready");
        peer.login();
        let _first = peer.passive();
        peer.reply("STOR data.bin", "425 Can't open data connection");
        let second = peer.passive();
        peer.reply("STOR data.bin", "150 Ok to send data");
        assert_eq!(receive_data(&second), b"payload");
        peer.send("226 Transfer complete");
        peer.reply("QUIT", "221 Goodbye");
    });

    let mut session = connect(port, session_config());
    login(&mut session);
    let request = session.request_for(Direction::Upload, "data.bin");
    session.open_data(&request).unwrap();
    session.write(b"payload", None).unwrap();
    session.close_data().unwrap();
    session.quit().unwrap();

    let commands = peer.join().unwrap();
    assert_eq!(commands.iter().filter(|c| *c == "PASV").count(), 2);
}

#[test]
fn active_download_resumes_with_rest() {
    let (port, peer) = spawn(|peer| {
        peer.send("220 Ready");
        peer.login();
        let target = peer.port();
        peer.reply("REST 5", "350 Restarting at 5");
        peer.reply("RETR archive.dat", "150 Opening BINARY mode data connection");
        let data = TcpStream::connect(target).unwrap();
        send_data(data, b"world");
        peer.send("226 Transfer complete");
        peer.reply("QUIT", "221 Goodbye");
    });

    let config = SessionConfig {
        data_mode: DataMode::Active,
        ..session_config()
    };
    let mut session = connect(port, config);
    login(&mut session);
    let request = session
        .request_for(Direction::Download, "archive.dat")
        .with_offset(5);
    session.open_data(&request).unwrap();
    assert_eq!(read_all(&mut session), b"world");
    session.close_data().unwrap();
    session.quit().unwrap();

    let commands = peer.join().unwrap();
    let rest = commands.iter().position(|c| c == "REST 5").unwrap();
    let retr = commands.iter().position(|c| c == "RETR archive.dat").unwrap();
    assert!(rest < retr);
}

#[test]
fn name_listing_over_passive_connection() {
    let (port, peer) = spawn(|peer| {
        peer.send("220 Ready");
        peer.login();
        let listener = peer.passive();
        peer.reply("NLST", "150 Here comes the listing");
        let (data, _) = listener.accept().unwrap();
        send_data(data, b"alpha.txt\r\nbeta.txt\r\n");
        peer.send("226 Directory send OK");
        peer.reply("QUIT", "221 Goodbye");
    });

    let mut session = connect(port, session_config());
    login(&mut session);
    assert_eq!(session.list_names("").unwrap(), vec!["alpha.txt", "beta.txt"]);
    session.quit().unwrap();
    peer.join().unwrap();
}

#[test]
fn first_line_of_long_listing() {
    let (port, peer) = spawn(|peer| {
        peer.send("220 Ready");
        peer.login();
        let listener = peer.passive();
        peer.reply("LIST in", "150 Here comes the listing");
        let (data, _) = listener.accept().unwrap();
        send_data(data, b"-rw-r--r-- 1 ftp ftp 12 Jan 01 00:00 a\r\n-rw-r--r-- 1 ftp ftp 3 Jan 01 00:00 b\r\n");
        peer.send("226 Directory send OK");
        peer.reply("QUIT", "221 Goodbye");
    });

    let mut session = connect(port, session_config());
    login(&mut session);
    let line = session.list_first_line(ListKind::Long, "in").unwrap();
    assert_eq!(line, "-rw-r--r-- 1 ftp ftp 12 Jan 01 00:00 a");
    session.quit().unwrap();
    peer.join().unwrap();
}

#[test]
fn first_line_of_a_huge_listing_closes_early() {
    let (port, peer) = spawn(|peer| {
        peer.send("220 Ready");
        peer.login();
        let listener = peer.passive();
        peer.reply("LIST", "150 Here comes the listing");
        let (mut data, _) = listener.accept().unwrap();
        let line = b"-rw-r--r-- 1 ftp ftp 4096 Jan 01 00:00 entry.dat\r\n";
        let mut complete = true;
        for _ in 0..400_000 {
            if data.write_all(line).is_err() {
                complete = false;
                break;
            }
        }
        drop(data);
        if complete {
            peer.send("226 Directory send OK");
        } else {
            peer.send("426 Connection closed; transfer aborted");
        }
        peer.reply("QUIT", "221 Goodbye");
    });

    let config = SessionConfig {
        transfer_timeout_secs: 2,
        ..session_config()
    };
    let mut session = connect(port, config);
    login(&mut session);
    let line = session.list_first_line(ListKind::Long, "").unwrap();
    assert_eq!(line, "-rw-r--r-- 1 ftp ftp 4096 Jan 01 00:00 entry.dat");
    assert_eq!(session.timeout_flag(), TimeoutFlag::None);
    assert!(!session.has_data_channel());
    session.quit().unwrap();
    peer.join().unwrap();
}

#[test]
fn cd_creates_missing_components_in_order() {
    let (port, peer) = spawn(|peer| {
        peer.send("220 Ready");
        peer.login();
        peer.reply("CWD a/b/c", "550 No such directory");
        peer.reply("CWD a", "250 Directory changed");
        peer.reply("CWD b", "550 No such directory");
        peer.reply("MKD b", "257 \"b\" created");
        peer.reply("CWD b", "250 Directory changed");
        peer.reply("CWD c", "550 No such directory");
        peer.reply("MKD c", "257 \"c\" created");
        peer.reply("CWD c", "250 Directory changed");
        peer.reply("QUIT", "221 Goodbye");
    });

    let mut session = connect(port, session_config());
    login(&mut session);
    session.cd("a/b/c", true).unwrap();
    session.quit().unwrap();

    let commands = peer.join().unwrap();
    assert_eq!(
        &commands[2..],
        &[
            "CWD a/b/c", "CWD a", "CWD b", "MKD b", "CWD b", "CWD c", "MKD c", "CWD c", "QUIT"
        ]
    );
}

#[test]
fn cd_without_create_reports_the_refusal() {
    let (port, peer) = spawn(|peer| {
        peer.send("220 Ready");
        peer.login();
        peer.reply("CWD missing", "550 No such directory");
        peer.reply("CWD ~", "250 Home");
        peer.reply("QUIT", "221 Goodbye");
    });

    let mut session = connect(port, session_config());
    login(&mut session);
    let result = session.cd("missing", false);
    assert_eq!(status_code(&result), 550);
    session.cd("", false).unwrap();
    session.quit().unwrap();
    peer.join().unwrap();
}

#[test]
fn move_deletes_target_and_retries() {
    let (port, peer) = spawn(|peer| {
        peer.send("220 Ready");
        peer.login();
        peer.reply("RNFR .file", "350 Ready for RNTO");
        peer.reply("RNTO file", "553 File exists");
        peer.reply("DELE file", "250 Deleted");
        peer.reply("RNFR .file", "350 Ready for RNTO");
        peer.reply("RNTO file", "250 Renamed");
        peer.reply("QUIT", "221 Goodbye");
    });

    let mut session = connect(port, session_config());
    login(&mut session);
    session.move_file(".file", "file", false, false).unwrap();
    session.quit().unwrap();
    peer.join().unwrap();
}

#[test]
fn move_creates_missing_target_directory() {
    let (port, peer) = spawn(|peer| {
        peer.send("220 Ready");
        peer.login();
        peer.reply("RNFR .file", "350 Ready for RNTO");
        peer.reply("RNTO sub/file", "550 No such directory");
        peer.reply("DELE sub/file", "550 No such file");
        peer.reply("PWD", "257 \"/home/ftp\" is the current directory");
        peer.reply("CWD sub", "550 No such directory");
        peer.reply("CWD sub", "550 No such directory");
        peer.reply("MKD sub", "257 \"sub\" created");
        peer.reply("CWD sub", "250 Directory changed");
        peer.reply("CWD /home/ftp", "250 Directory changed");
        peer.reply("RNFR .file", "350 Ready for RNTO");
        peer.reply("RNTO sub/file", "250 Renamed");
        peer.reply("QUIT", "221 Goodbye");
    });

    let mut session = connect(port, session_config());
    login(&mut session);
    session.move_file(".file", "sub/file", false, true).unwrap();
    session.quit().unwrap();
    peer.join().unwrap();
}

#[test]
fn fast_move_reports_the_rnfr_refusal() {
    let (port, peer) = spawn(|peer| {
        peer.send("220 Ready");
        peer.login();
        peer.expect("RNFR .gone");
        peer.expect("RNTO gone");
        peer.send("550 No such file");
        peer.send("503 Bad sequence of commands");
        peer.reply("QUIT", "221 Goodbye");
    });

    let mut session = connect(port, session_config());
    login(&mut session);
    let result = session.move_file(".gone", "gone", true, false);
    assert_eq!(status_code(&result), 550);
    assert_eq!(session.last_reply().unwrap().code(), 550);
    session.quit().unwrap();
    peer.join().unwrap();
}

#[test]
fn size_and_modification_time() {
    let (port, peer) = spawn(|peer| {
        peer.send("220 Ready");
        peer.login();
        peer.reply("SIZE big.iso", "213 1048576");
        peer.reply("MDTM big.iso", "213 20240102030405");
        peer.reply("MDTM bad.iso", "213 202401");
        peer.reply("QUIT", "221 Goodbye");
    });

    let mut session = connect(port, session_config());
    login(&mut session);
    assert_eq!(session.size("big.iso").unwrap(), 1_048_576);
    assert_eq!(
        session.date("big.iso").unwrap(),
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
    );
    assert!(matches!(
        session.date("bad.iso"),
        Err(FtpClientError::MalformedReply(_))
    ));
    session.quit().unwrap();
    peer.join().unwrap();
}

#[test]
fn timeout_flags_the_session_until_cleared() {
    let (port, peer) = spawn(|peer| {
        peer.send("220 Ready");
        peer.login();
        peer.expect("PWD");
        peer.drain();
    });

    let config = SessionConfig {
        transfer_timeout_secs: 1,
        ..session_config()
    };
    let mut session = connect(port, config);
    login(&mut session);

    let err = session.pwd().unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(session.timeout_flag(), TimeoutFlag::TimedOut);

    let err = session.noop().unwrap_err();
    assert!(matches!(
        err,
        FtpClientError::SessionFlagged(TimeoutFlag::TimedOut)
    ));
    assert!(err.is_timeout());

    session.quit().unwrap();
    let commands = peer.join().unwrap();
    assert_eq!(commands, vec!["USER tester", "PASS secret", "PWD", "QUIT"]);
}

#[test]
fn control_hangup_flags_the_session() {
    let (port, peer) = spawn(|peer| {
        peer.send("220 Ready");
        peer.login();
        peer.expect("PWD");
    });

    let mut session = connect(port, session_config());
    login(&mut session);
    let err = session.pwd().unwrap_err();
    assert!(matches!(err, FtpClientError::RemoteHangup));
    assert_eq!(session.timeout_flag(), TimeoutFlag::Hangup);
    assert!(matches!(
        session.noop(),
        Err(FtpClientError::SessionFlagged(TimeoutFlag::Hangup))
    ));
    session.quit().unwrap();
    peer.join().unwrap();
}

#[test]
fn control_reset_flags_the_session() {
    let (port, peer) = spawn(|peer| {
        peer.send("220 Ready");
        peer.login();
        peer.expect("PWD");
        peer.reset();
    });

    let mut session = connect(port, session_config());
    login(&mut session);
    let err = session.pwd().unwrap_err();
    assert!(
        matches!(err, FtpClientError::PeerReset(IoPhase::ControlRead)),
        "unexpected {err:?}"
    );
    assert_eq!(session.timeout_flag(), TimeoutFlag::PeerReset);
    session.quit().unwrap();
    peer.join().unwrap();
}

#[test]
fn stalled_upload_times_out_on_write() {
    let (port, peer) = spawn(|peer| {
        peer.send("220 Ready");
        peer.login();
        let listener = peer.passive();
        peer.reply("STOR stalled.bin", "150 Ok to send data");
        let (_held, _) = listener.accept().unwrap();
        peer.drain();
    });

    let config = SessionConfig {
        transfer_timeout_secs: 1,
        ..session_config()
    };
    let mut session = connect(port, config);
    login(&mut session);
    let request = session.request_for(Direction::Upload, "stalled.bin");
    session.open_data(&request).unwrap();

    let block = vec![0u8; 1024 * 1024];
    let mut failure = None;
    for _ in 0..64 {
        if let Err(e) = session.write(&block, None) {
            failure = Some(e);
            break;
        }
    }
    let err = failure.expect("the peer never reads, so a write must time out");
    assert!(
        matches!(err, FtpClientError::Timeout(IoPhase::DataWrite)),
        "unexpected {err:?}"
    );
    assert_eq!(session.timeout_flag(), TimeoutFlag::TimedOut);
    session.quit().unwrap();

    let commands = peer.join().unwrap();
    assert_eq!(commands.last().map(String::as_str), Some("QUIT"));
}

#[test]
fn clearing_the_flag_makes_the_session_usable() {
    let (port, peer) = spawn(|peer| {
        peer.send("220 Ready");
        peer.login();
        peer.expect("PWD");
        std::thread::sleep(Duration::from_millis(1500));
        peer.send("257 \"/\" is the current directory");
        peer.reply("NOOP", "200 NOOP ok");
        peer.reply("QUIT", "221 Goodbye");
    });

    let config = SessionConfig {
        transfer_timeout_secs: 1,
        ..session_config()
    };
    let mut session = connect(port, config);
    login(&mut session);
    assert!(session.pwd().unwrap_err().is_timeout());

    session.clear_timeout_flag();
    assert_eq!(session.timeout_flag(), TimeoutFlag::None);
    // The late PWD reply is still in flight.
    std::thread::sleep(Duration::from_millis(1000));
    assert_eq!(session.get_reply_immediately().unwrap().code(), 257);
    session.noop().unwrap();
    session.quit().unwrap();
    peer.join().unwrap();
}

#[test]
fn keepalive_asks_for_status() {
    let (port, peer) = spawn(|peer| {
        peer.send("220 Ready");
        peer.login();
        peer.reply("STAT", "211 Server status OK");
        peer.reply("QUIT", "221 Goodbye");
    });

    let mut session = connect(port, session_config());
    login(&mut session);
    session.keepalive().unwrap();
    session.quit().unwrap();

    let commands = peer.join().unwrap();
    assert_eq!(commands[2], "STAT");
}

#[test]
fn quit_accepts_service_closing() {
    let (port, peer) = spawn(|peer| {
        peer.send("220 Ready");
        peer.reply("QUIT", "421 Service closing control connection");
    });

    let session = connect(port, session_config());
    session.quit().unwrap();
    peer.join().unwrap();
}

#[test]
fn encrypted_upload_with_matching_certificates() {
    let server = tls_server_config();
    let (port, peer) = spawn(move |peer| {
        peer.send("220 Ready");
        peer.start_tls(server.clone());
        peer.login();
        peer.reply("PBSZ 0", "200 PBSZ=0");
        peer.reply("PROT P", "200 Protection set to Private");
        let listener = peer.passive();
        peer.reply("STOR secret.bin", "150 Ok to send data");
        assert_eq!(receive_data_tls(&listener, server), b"classified");
        peer.send("226 Transfer complete");
        peer.reply("QUIT", "221 Goodbye");
    });

    let config = SessionConfig {
        tls: TlsMode::Both,
        ..session_config()
    };
    let mut session = connect(port, config);
    let negotiated = session.auth_tls().unwrap();
    assert!(negotiated.starts_with("234 "));
    assert!(session.is_encrypted());
    login(&mut session);
    session.protect(ProtectionLevel::Private).unwrap();

    let request = session.request_for(Direction::Upload, "secret.bin");
    assert!(request.encrypt);
    session.open_data(&request).unwrap();
    session.write(b"classified", None).unwrap();
    session.close_data().unwrap();
    session.quit().unwrap();
    peer.join().unwrap();
}

#[test]
fn data_certificate_must_match_control() {
    let control_cert = tls_server_config();
    let data_cert = tls_server_config();
    let (port, peer) = spawn(move |peer| {
        peer.send("220 Ready");
        peer.start_tls(control_cert);
        peer.login();
        peer.reply("PBSZ 0", "200 PBSZ=0");
        peer.reply("PROT P", "200 Protection set to Private");
        let listener = peer.passive();
        peer.reply("STOR secret.bin", "150 Ok to send data");
        receive_data_tls(&listener, data_cert);
        peer.drain();
    });

    let config = SessionConfig {
        tls: TlsMode::Both,
        ..session_config()
    };
    let mut session = connect(port, config);
    session.auth_tls().unwrap();
    login(&mut session);
    session.protect(ProtectionLevel::Private).unwrap();

    let request = session.request_for(Direction::Upload, "secret.bin");
    let result = session.open_data(&request);
    assert!(matches!(result, Err(FtpClientError::CertificateMismatch)));
    assert!(!session.has_data_channel());
    drop(session);
    peer.join().unwrap();
}

#[test]
fn uploads_ascii_with_crlf_line_ends() {
    let (port, peer) = spawn(|peer| {
        peer.send("220 Ready");
        peer.login();
        peer.reply("TYPE A", "200 Type set to A");
        let listener = peer.passive();
        peer.reply("STOR notes.txt", "150 Ok to send data");
        let (mut data, _) = listener.accept().unwrap();
        let mut received = Vec::new();
        data.read_to_end(&mut received).unwrap();
        assert_eq!(received, b"one\r\ntwo\r\n");
        peer.send("226 Transfer complete");
        peer.reply("QUIT", "221 Goodbye");
    });

    let config = SessionConfig {
        transfer_type: TransferType::Ascii,
        ..session_config()
    };
    let mut session = connect(port, config);
    login(&mut session);
    session.set_type(TransferType::Ascii).unwrap();
    let request = session.request_for(Direction::Upload, "notes.txt");
    let mut encoder = rax_ftp_client::AsciiEncoder::new();
    session.open_data(&request).unwrap();
    session.write(b"one\ntw", Some(&mut encoder)).unwrap();
    session.write(b"o\r\n", Some(&mut encoder)).unwrap();
    session.close_data().unwrap();
    session.quit().unwrap();
    peer.join().unwrap();
}
