use codegate_activation::{
    device_id_from_machine_id, platform_device_id, ActivationStatus, DeviceIdentity,
};

#[test]
fn existing_identity_is_returned_unchanged() {
    let identity = DeviceIdentity::with_source(|| Some("platform".into()));
    let mut status = ActivationStatus {
        device_id: "persisted".into(),
        ..Default::default()
    };

    let (id, created) = identity.get_or_create(&mut status);

    assert_eq!(id.as_str(), "persisted");
    assert!(!created);
    assert_eq!(status.device_id, "persisted");
}

#[test]
fn platform_identity_used_when_absent() {
    let identity = DeviceIdentity::with_source(|| Some("platform-id".into()));
    let mut status = ActivationStatus::default();

    let (id, created) = identity.get_or_create(&mut status);

    assert_eq!(id.as_str(), "platform-id");
    assert!(created);
    assert_eq!(status.device_id, "platform-id");
}

#[test]
fn blank_persisted_identity_is_replaced() {
    let identity = DeviceIdentity::with_source(|| Some("platform-id".into()));
    let mut status = ActivationStatus {
        device_id: "   ".into(),
        ..Default::default()
    };

    let (id, created) = identity.get_or_create(&mut status);

    assert_eq!(id.as_str(), "platform-id");
    assert!(created);
}

#[test]
fn random_fallback_when_platform_unavailable() {
    let identity = DeviceIdentity::with_source(|| None);
    let mut status = ActivationStatus::default();

    let (id, created) = identity.get_or_create(&mut status);

    assert!(created);
    assert!(uuid_like(id.as_str()));
    assert_eq!(status.device_id, id.as_str());
}

#[test]
fn random_fallback_when_platform_blank() {
    let identity = DeviceIdentity::with_source(|| Some("  ".into()));
    let mut status = ActivationStatus::default();

    let (id, _) = identity.get_or_create(&mut status);

    assert!(uuid_like(id.as_str()));
}

#[test]
fn created_identity_is_stable_on_second_call() {
    let identity = DeviceIdentity::with_source(|| None);
    let mut status = ActivationStatus::default();

    let (first, _) = identity.get_or_create(&mut status);
    let (second, created) = identity.get_or_create(&mut status);

    assert_eq!(first, second);
    assert!(!created);
}

#[test]
fn platform_device_id_is_stable_and_hashed() {
    let a = platform_device_id();
    let b = platform_device_id();
    assert_eq!(a, b);
    if let Some(id) = a {
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}

#[test]
fn default_identity_always_produces_an_id() {
    let mut status = ActivationStatus::default();
    let (id, _) = DeviceIdentity::new().get_or_create(&mut status);
    assert!(!id.as_str().is_empty());
}

fn uuid_like(s: &str) -> bool {
    s.len() == 36 && s.chars().filter(|c| *c == '-').count() == 4
}

#[test]
fn machine_id_is_hashed_to_hex() {
    let id = device_id_from_machine_id("4c4c4544-0042-3510-8051-b4c04f384d32").unwrap();
    assert_eq!(id.len(), 32);
    assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn machine_id_hash_ignores_surrounding_whitespace() {
    assert_eq!(
        device_id_from_machine_id("abc123\n"),
        device_id_from_machine_id("  abc123")
    );
    assert_ne!(
        device_id_from_machine_id("abc123"),
        device_id_from_machine_id("abc124")
    );
}

#[test]
fn blank_machine_id_yields_none() {
    assert_eq!(device_id_from_machine_id(""), None);
    assert_eq!(device_id_from_machine_id(" \n "), None);
}
