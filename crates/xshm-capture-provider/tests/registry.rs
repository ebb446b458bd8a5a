//! Tests for SessionRegistry
//!

extern crate alloc;

mod common;

use alloc::sync::Arc;

use common::{Counters, ScriptedBackend};
use xshm_capture_provider::{
    CreateError, OutputRect, RegistryError, SessionRegistry, SyntheticCapture,
};

fn two_outputs() -> ScriptedBackend {
    ScriptedBackend::new(vec![
        OutputRect::new([0, 0], [1920, 1080]),
        OutputRect::new([1920, -200], [2560, 1440]),
    ])
}

#[test]
fn lists_outputs() {
    let registry = SessionRegistry::new(Arc::new(two_outputs()));
    assert_eq!(registry.outputs(), vec![0, 1]);
}

#[test]
fn one_session_per_output() {
    let backend = two_outputs();
    let mut registry = SessionRegistry::new(Arc::new(backend.clone()));

    let session = registry.open(0).unwrap();
    assert_eq!(session.output(), 0);

    assert!(matches!(registry.open(0), Err(RegistryError::AlreadyOpen(0))));
    assert_eq!(Counters::get(&backend.counters.creates), 1);

    assert!(registry.open(1).is_ok());
    assert_eq!(Counters::get(&backend.counters.creates), 2);
}

#[test]
fn invalid_output_fails() {
    let mut registry = SessionRegistry::new(Arc::new(two_outputs()));

    assert!(matches!(
        registry.open(2),
        Err(RegistryError::Create(CreateError::InvalidOutput {
            output: 2,
            count: 2
        }))
    ));
    assert!(registry.get(2).is_none());
}

#[test]
fn close_then_reopen() {
    let backend = two_outputs();
    let mut registry = SessionRegistry::new(Arc::new(backend.clone()));

    let session = registry.open(0).unwrap();
    assert!(registry.close(0));
    assert!(!registry.close(0));
    assert!(session.is_disposed());
    assert_eq!(Counters::get(&backend.counters.destroys), 1);

    let reopened = registry.open(0).unwrap();
    assert!(!reopened.is_disposed());
    assert_eq!(Counters::get(&backend.counters.creates), 2);
}

#[test]
fn bounding_rect_is_union() {
    let mut registry = SessionRegistry::new(Arc::new(two_outputs()));
    assert_eq!(registry.bounding_rect(), None);

    registry.open(0).unwrap();
    assert_eq!(
        registry.bounding_rect(),
        Some(OutputRect::new([0, 0], [1920, 1080]))
    );

    registry.open(1).unwrap();
    assert_eq!(
        registry.bounding_rect(),
        Some(OutputRect::new([0, -200], [4480, 1440]))
    );
}

#[test]
fn drop_disposes_every_session() {
    let backend = two_outputs();
    let mut registry = SessionRegistry::new(Arc::new(backend.clone()));

    let sessions = registry.open_all().unwrap();
    assert_eq!(sessions.len(), 2);
    for session in &sessions {
        session.start().unwrap();
    }

    drop(registry);

    assert!(sessions.iter().all(|session| session.is_disposed()));
    assert_eq!(Counters::get(&backend.counters.ends), 2);
    assert_eq!(Counters::get(&backend.counters.destroys), 2);
}

#[test]
fn synthetic_backend_streams() {
    let mut registry = SessionRegistry::new(Arc::new(SyntheticCapture::default()));
    let session = registry.open(1).unwrap();

    assert_eq!(session.rect(), OutputRect::new([1920, 0], [1920, 1080]));

    session.start().unwrap();
    let frame = session.pull_frame().unwrap();
    assert_eq!(frame.len(), 8_294_400);
}
