//! End-to-end replay of recorded device streams through a session

use anyhow::{Context, Result};
use futures::StreamExt;
use lcdscope::{
    CommandKind, FrameEncoder, Lcdscope, MonitorConfig, ReplayConfig, ReplayTransport,
    SessionEnd, SessionEvent, Severity, TextMode, UpdateRate,
};
use std::sync::atomic::Ordering;

fn recording() -> Result<Vec<u8>> {
    let mut stream = Vec::new();
    stream.extend(FrameEncoder::debug_text("boot", Severity::Ok)?);
    stream.extend(FrameEncoder::display_text_at("HI", 0, 0, TextMode::Normal)?);
    stream.extend(FrameEncoder::display_set_cursor(Some(1), Some(0))?);
    stream.extend(FrameEncoder::display_chars("ok")?);
    // Line noise between frames is skipped
    stream.extend([0x00, 0x55, 0xaa]);
    stream.extend(FrameEncoder::display_char('!', TextMode::Inverse)?);
    Ok(stream)
}

#[tokio::test]
async fn replayed_capture_file_renders_the_panel() -> Result<()> {
    let path = std::env::temp_dir().join(format!("lcdscope-replay-{}.bin", std::process::id()));
    std::fs::write(&path, recording()?).context("writing capture")?;

    let mut config = MonitorConfig::default();
    config.replay.chunk_size = 7;

    let mut session = Lcdscope::replay(&path, &config).await?;
    let events: Vec<SessionEvent> = session.events().collect().await;
    std::fs::remove_file(&path)?;

    assert!(matches!(session.closed().await, SessionEnd::StreamEnded));
    assert_eq!(events.len(), 5);
    assert!(matches!(events[0], SessionEvent::Debug { .. }));

    let display = session.current_display();
    assert_eq!(display.commands_received, 4);
    assert_eq!((display.cursor.row, display.cursor.column), (1, 3));

    let ascii = display.to_ascii();
    let rows: Vec<&str> = ascii.lines().collect();
    assert_eq!(rows.len(), 64);
    assert!(rows[0].starts_with("#...#."));
    assert!(rows[3].starts_with("#####."));
    // Inverse cell at row 1, column 2 has a lit bottom margin
    assert!(rows[15][12..18].chars().all(|c| c == '#'));
    Ok(())
}

#[tokio::test]
async fn chunk_size_does_not_change_the_result() -> Result<()> {
    let mut finals = Vec::new();

    for chunk_size in [1, 3, 64] {
        let replay = ReplayConfig { chunk_size, interval_ms: 0 };
        let transport = ReplayTransport::from_bytes(recording()?, &replay);
        let acks = transport.written_counter();
        let expected_acks = transport.total_chunks() as u64;

        let session = Lcdscope::attach(transport, &MonitorConfig::default());
        assert!(matches!(session.closed().await, SessionEnd::StreamEnded));
        assert_eq!(acks.load(Ordering::Relaxed), expected_acks);

        finals.push(session.current_display());
    }

    assert!(finals.windows(2).all(|pair| pair[0] == pair[1]));
    Ok(())
}

#[tokio::test]
async fn graphic_lines_are_reported_and_leave_the_panel_alone() -> Result<()> {
    let mut stream = FrameEncoder::display_text_at("A", 0, 0, TextMode::Normal)?;
    stream.extend(FrameEncoder::encode(
        lcdscope::protocol::Category::Display,
        lcdscope::protocol::display_op::GRAPHIC_LINE,
        &[2, 0xff, 0xff],
    )?);

    let transport = ReplayTransport::from_bytes(stream, &ReplayConfig::default());
    let mut session = Lcdscope::attach(transport, &MonitorConfig::default());
    let mut updates = session.display_updates(UpdateRate::Native);
    let events: Vec<SessionEvent> = session.events().collect().await;

    match &events[..] {
        [SessionEvent::Display { snapshot, .. }, SessionEvent::Unsupported { command }] => {
            assert_eq!(command.kind(), CommandKind::DisplayGraphicLine);
            assert_eq!(**snapshot, *session.current_display());
        }
        other => panic!("unexpected events {:?}", other),
    }

    // Latest state is visible to display subscribers
    let latest = updates.next().await.context("display stream ended early")?;
    assert_eq!(latest.commands_received, 1);
    Ok(())
}

#[tokio::test]
async fn missing_capture_is_reported_before_a_session_starts() {
    let err = Lcdscope::replay("/nonexistent/capture.bin", &MonitorConfig::default())
        .await
        .err()
        .expect("replay of a missing file must fail");
    assert!(err.is_fatal());
    assert_eq!(
        lcdscope::SessionFailure::classify(&err, false),
        lcdscope::SessionFailure::NoDeviceFound
    );
}
