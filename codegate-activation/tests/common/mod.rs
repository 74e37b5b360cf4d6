//! Shared test helpers for activation tests.

#![allow(dead_code)]

use async_trait::async_trait;
use codegate_activation::{
    ActivationConfig, ActivationError, ActivationResult, ActivationStatus, Activator,
    DeviceIdentity, HttpTransport, LinkParser, MemoryStatusStore, ProfileStore,
    TransportTimeouts,
};
use codegate_types::{GroupId, ProfileDescriptor, ProfileId};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate, Times};

pub const LOGIN_PATH: &str = "/login";
pub const TEST_DEVICE_ID: &str = "test-device-0001";

/// Link parser that yields one descriptor per call, or none when `empty`.
#[derive(Default)]
pub struct FakeParser {
    pub empty: bool,
    pub calls: AtomicUsize,
}

impl FakeParser {
    pub fn empty() -> Self {
        Self {
            empty: true,
            ..Default::default()
        }
    }
}

impl LinkParser for FakeParser {
    fn parse(&self, link: &str) -> Vec<ProfileDescriptor> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.empty {
            return Vec::new();
        }
        vec![
            ProfileDescriptor::new("first", link),
            ProfileDescriptor::new("second", link),
        ]
    }
}

/// Profile store that records every creation and hands out ids from 1.
#[derive(Default)]
pub struct RecordingProfiles {
    pub created: Mutex<Vec<(GroupId, ProfileDescriptor)>>,
    pub fail: bool,
    next_id: AtomicI64,
}

impl RecordingProfiles {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn created(&self) -> Vec<(GroupId, ProfileDescriptor)> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProfileStore for RecordingProfiles {
    async fn create_profile(
        &self,
        group: GroupId,
        descriptor: ProfileDescriptor,
    ) -> ActivationResult<ProfileId> {
        if self.fail {
            return Err(ActivationError::Storage("profile database is locked".into()));
        }
        self.created.lock().unwrap().push((group, descriptor));
        Ok(ProfileId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1))
    }
}

/// Everything an activation test needs to inspect afterwards.
pub struct Harness {
    pub activator: Arc<Activator>,
    pub parser: Arc<FakeParser>,
    pub profiles: Arc<RecordingProfiles>,
    pub store: Arc<MemoryStatusStore>,
}

pub fn test_config(server: &MockServer) -> ActivationConfig {
    ActivationConfig {
        endpoint: format!("{}{LOGIN_PATH}", server.uri()),
        default_group: GroupId::new(7),
        timeouts: TransportTimeouts {
            call_secs: 5,
            connect_secs: 5,
            read_secs: 5,
        },
    }
}

pub fn build(
    server: &MockServer,
    status: ActivationStatus,
    parser: FakeParser,
    profiles: RecordingProfiles,
    identity: DeviceIdentity,
) -> Harness {
    let config = test_config(server);
    let transport = Arc::new(HttpTransport::new(config.timeouts).unwrap());
    let parser = Arc::new(parser);
    let profiles = Arc::new(profiles);
    let store = Arc::new(MemoryStatusStore::new(status));
    let activator = Activator::new(
        config,
        transport,
        parser.clone(),
        profiles.clone(),
        store.clone(),
    )
    .unwrap()
    .with_identity(identity);

    Harness {
        activator: Arc::new(activator),
        parser,
        profiles,
        store,
    }
}

/// Harness with a fresh status, a working parser and profile store, and a
/// fixed platform device id.
pub fn harness(server: &MockServer) -> Harness {
    build(
        server,
        ActivationStatus::default(),
        FakeParser::default(),
        RecordingProfiles::default(),
        fixed_identity(),
    )
}

pub fn fixed_identity() -> DeviceIdentity {
    DeviceIdentity::with_source(|| Some(TEST_DEVICE_ID.to_string()))
}

pub fn activated_status(profile: i64) -> ActivationStatus {
    ActivationStatus {
        last_code: "OLD-CODE".into(),
        device_id: TEST_DEVICE_ID.into(),
        activated: true,
        selected_profile_id: Some(ProfileId::new(profile)),
        current_profile_id: Some(ProfileId::new(profile)),
        activated_at: None,
    }
}

/// Mounts a login endpoint answering with `status` and `body`.
pub async fn mount_login(
    server: &MockServer,
    status: u16,
    body: &str,
    expected_calls: impl Into<Times>,
) {
    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// Like [`mount_login`] but the response is delayed.
pub async fn mount_slow_login(
    server: &MockServer,
    body: &str,
    delay: Duration,
    expected_calls: impl Into<Times>,
) {
    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .set_delay(delay),
        )
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// Device ids sent in every request the server received.
pub async fn sent_device_ids(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| {
            let body: serde_json::Value = serde_json::from_slice(&r.body).unwrap();
            body["device_id"].as_str().unwrap().to_string()
        })
        .collect()
}
