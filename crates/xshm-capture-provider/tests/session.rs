//! Tests for CaptureSession
//!

mod common;

use common::{Counters, ScriptedBackend, open_session};
use xshm_capture_provider::{CursorPosition, OutputRect, SessionError};

#[test]
fn start_is_idempotent() {
    let backend = ScriptedBackend::single();
    let (_registry, session) = open_session(&backend);

    session.start().unwrap();
    session.start().unwrap();

    assert!(session.is_capturing());
    assert_eq!(Counters::get(&backend.counters.creates), 1);
    assert_eq!(Counters::get(&backend.counters.starts), 1);
}

#[test]
fn stop_when_stopped_is_noop() {
    let backend = ScriptedBackend::single();
    let (_registry, session) = open_session(&backend);

    session.stop();
    session.start().unwrap();
    session.stop();
    session.stop();

    assert!(!session.is_capturing());
    assert_eq!(Counters::get(&backend.counters.ends), 1);
}

#[test]
fn pull_before_start_is_none() {
    let backend = ScriptedBackend::single();
    let (_registry, session) = open_session(&backend);

    assert!(session.pull_frame().is_none());
    assert_eq!(Counters::get(&backend.counters.frames), 0);
}

#[test]
fn restart_behaves_like_fresh_start() {
    let backend = ScriptedBackend::single();
    let (_registry, session) = open_session(&backend);

    session.start().unwrap();
    assert!(session.pull_frame().is_some());

    session.stop();
    assert!(session.pull_frame().is_none());

    session.start().unwrap();
    let frame = session.pull_frame().unwrap();
    assert_eq!(frame.len(), session.expected_frame_length());
    drop(frame);

    assert_eq!(Counters::get(&backend.counters.creates), 1);
    assert_eq!(Counters::get(&backend.counters.starts), 2);
    assert_eq!(Counters::get(&backend.counters.ends), 1);
    assert_eq!(Counters::get(&backend.counters.destroys), 0);
}

#[test]
fn frame_has_output_geometry() {
    let backend = ScriptedBackend::single();
    let (_registry, session) = open_session(&backend);
    session.start().unwrap();

    let frame = session.pull_frame().unwrap();
    assert_eq!(frame.width(), 64);
    assert_eq!(frame.height(), 32);
    assert_eq!(frame.as_bytes().len(), 64 * 32 * 4);
}

#[test]
fn mismatched_length_is_discarded() {
    let backend = ScriptedBackend::new(vec![OutputRect::new([0, 0], [1920, 1080])]);
    let (_registry, session) = open_session(&backend);
    session.start().unwrap();

    assert_eq!(session.expected_frame_length(), 8_294_400);

    backend.script_lengths([8_294_399, 8_294_404, 0]);
    assert!(session.pull_frame().is_none());
    assert!(session.pull_frame().is_none());
    assert!(session.pull_frame().is_none());

    let frame = session.pull_frame().unwrap();
    assert_eq!(frame.len(), 8_294_400);
}

#[test]
fn random_corruption_only_passes_valid_frames() {
    let backend = ScriptedBackend::single();
    let (_registry, session) = open_session(&backend);
    session.start().unwrap();

    let expected = session.expected_frame_length();
    let lengths: Vec<usize> = (0..64)
        .map(|_| {
            if rand::random::<bool>() {
                expected
            } else {
                rand::random_range(0..expected)
            }
        })
        .collect();
    let valid = lengths.iter().filter(|&&length| length == expected).count();
    backend.script_lengths(lengths);

    let delivered = (0..64).filter(|_| session.pull_frame().is_some()).count();
    assert_eq!(delivered, valid);
}

#[test]
fn cursor_query() {
    let backend = ScriptedBackend::single();
    let (_registry, session) = open_session(&backend);

    backend.set_cursor(100, 50);
    assert_eq!(session.cursor_position(), None);
    assert_eq!(session.query_cursor(), Some(CursorPosition::new(100, 50)));
    assert_eq!(session.cursor_position(), Some(CursorPosition::new(100, 50)));
    assert_eq!(Counters::get(&backend.counters.cursors), 1);

    session.dispose();
    assert_eq!(session.query_cursor(), None);
    assert_eq!(session.cursor_position(), None);
    assert_eq!(Counters::get(&backend.counters.cursors), 1);
}

#[test]
fn pull_samples_cursor() {
    let backend = ScriptedBackend::single();
    let (_registry, session) = open_session(&backend);
    session.start().unwrap();

    backend.set_cursor(-3, 7);
    let frame = session.pull_frame().unwrap();

    // Sampling the cursor leaves the frame intact.
    assert!(frame.as_bytes().iter().all(|&byte| byte == 1));
    drop(frame);

    assert_eq!(session.cursor_position(), Some(CursorPosition::new(-3, 7)));
    assert_eq!(Counters::get(&backend.counters.cursors), 1);
}

#[test]
fn dispose_is_idempotent() {
    let backend = ScriptedBackend::single();
    let (_registry, session) = open_session(&backend);
    session.start().unwrap();

    session.dispose();
    session.dispose();

    assert!(session.is_disposed());
    assert!(!session.is_capturing());
    assert!(session.pull_frame().is_none());
    assert!(matches!(session.start(), Err(SessionError::Disposed)));

    assert_eq!(Counters::get(&backend.counters.ends), 1);
    assert_eq!(Counters::get(&backend.counters.destroys), 1);
}

#[test]
fn clones_share_one_handle() {
    let backend = ScriptedBackend::single();
    let (registry, session) = open_session(&backend);
    let clone = session.clone();

    drop(session);
    assert_eq!(Counters::get(&backend.counters.destroys), 0);
    assert!(!clone.is_disposed());

    drop(registry);
    assert!(clone.is_disposed());

    drop(clone);
    assert_eq!(Counters::get(&backend.counters.destroys), 1);
}

#[test]
fn failed_start_keeps_session_stopped() {
    let mut backend = ScriptedBackend::single();
    backend.fail_start = true;
    let (_registry, session) = open_session(&backend);

    assert!(matches!(session.start(), Err(SessionError::Start(_))));
    assert!(!session.is_capturing());
    assert!(session.pull_frame().is_none());
}
