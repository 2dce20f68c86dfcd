//! Sessions over a pseudo terminal standing in for the microcontroller

#![cfg(unix)]

use anyhow::{Context, Result};
use futures::StreamExt;
use lcdscope::{
    CommandPayload, FrameEncoder, Lcdscope, MonitorConfig, SessionEnd, SessionEvent, SessionStatus,
};
use rustix::fd::OwnedFd;
use rustix::pty::{OpenptFlags, grantpt, openpt, ptsname, unlockpt};
use std::path::PathBuf;
use std::time::Duration;

/// Master side and slave path of a fresh pseudo terminal.
fn pty() -> Result<(OwnedFd, PathBuf)> {
    let master = openpt(OpenptFlags::RDWR | OpenptFlags::NOCTTY)?;
    grantpt(&master)?;
    unlockpt(&master)?;
    let name = ptsname(&master, Vec::new())?;
    Ok((master, PathBuf::from(name.into_string().context("pty name is not UTF-8")?)))
}

#[tokio::test]
async fn frames_arrive_intact_without_line_ends() -> Result<()> {
    let (master, slave) = pty()?;
    let mut session = Lcdscope::connect(&slave, &MonitorConfig::default()).await?;
    let mut events = session.events();

    // Opcode 13 is a carriage return; neither frame ends in a newline
    let mut stream = FrameEncoder::display_clear_row(2)?;
    stream.extend(FrameEncoder::display_set_cursor(Some(4), Some(1))?);
    rustix::io::write(&master, &stream)?;

    let mut payloads = Vec::new();
    while payloads.len() < 2 {
        let event = tokio::time::timeout(Duration::from_secs(2), events.next())
            .await
            .context("no event within 2s")?
            .context("event stream ended")?;
        match event {
            SessionEvent::Display { command, .. } => payloads.push(command.payload.clone()),
            other => anyhow::bail!("unexpected event {:?}", other),
        }
    }
    assert_eq!(
        payloads,
        [
            CommandPayload::DisplayClearRow { row: 2 },
            CommandPayload::DisplaySetCursor { row: Some(4), column: Some(1) },
        ]
    );

    let reader = master.try_clone()?;
    let ack = tokio::task::spawn_blocking(move || {
        let mut ack = [0u8; 1];
        rustix::io::read(&reader, &mut ack).map(|_| ack)
    });
    let ack = tokio::time::timeout(Duration::from_secs(2), ack).await.context("no ack")???;
    assert_eq!(ack, [0x07]);

    session.disconnect();
    Ok(())
}

#[tokio::test]
async fn disconnect_closes_a_silent_device() -> Result<()> {
    let (_master, slave) = pty()?;
    let session = Lcdscope::connect(&slave, &MonitorConfig::default()).await?;
    assert!(session.is_running());

    // Let the read loop park on the idle port first
    tokio::time::sleep(Duration::from_millis(50)).await;
    session.disconnect();

    let end = tokio::time::timeout(Duration::from_secs(3), session.closed())
        .await
        .context("session did not end after disconnect")?;
    assert!(matches!(end, SessionEnd::Disconnected));
    assert!(matches!(session.status(), SessionStatus::Ended(SessionEnd::Disconnected)));
    Ok(())
}

#[tokio::test]
async fn missing_device_is_classified_before_a_session_exists() {
    let err = Lcdscope::connect("/dev/lcdscope-missing-tty", &MonitorConfig::default())
        .await
        .err()
        .expect("connect should fail");
    assert_eq!(
        lcdscope::SessionFailure::classify(&err, false),
        lcdscope::SessionFailure::NoDeviceFound
    );
}
