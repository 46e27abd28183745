//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use safehall_core::{ChannelId, Clock, FixedClock};
use safehall_policy::{Channel, ChannelMode, ChannelType, ParticipantGrant, PermissionLevel, Principal, Role};
use safehall_store::{Backend, MemoryStore};

/// The org every fixture principal belongs to.
pub const ORG: &str = "org-northside";

/// Tuesday 2024-01-09 10:00 UTC, inside the default office hours.
pub fn school_hours() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 9, 10, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// Tuesday 2024-01-09 20:00 UTC, after the default office hours.
pub fn after_hours() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 9, 20, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// A store plus a frozen clock set to [`school_hours`].
pub struct TestFixture<S = MemoryStore> {
    pub store: Arc<S>,
    pub clock: Arc<FixedClock>,
}

impl TestFixture<MemoryStore> {
    /// Create a fixture over an empty memory store.
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }
}

impl Default for TestFixture<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Backend> TestFixture<S> {
    /// Create a fixture over any backend.
    pub fn with_store(store: S) -> Self {
        Self {
            store: Arc::new(store),
            clock: Arc::new(FixedClock::at(school_hours())),
        }
    }

    /// The clock as a trait object, for `Messenger::with_clock`.
    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    /// Build a principal in [`ORG`] without storing it.
    pub fn principal(&self, id: &str, role: Role) -> Principal {
        Principal::new(id, role, ORG, format!("{role} {id}"))
    }

    /// Build and store a principal in [`ORG`].
    pub async fn register(&self, id: &str, role: Role) -> Principal {
        let principal = self.principal(id, role);
        self.store
            .put_principal(&principal)
            .await
            .expect("failed to store principal");
        principal
    }

    /// Open a channel directly in the store, bypassing creation policy.
    ///
    /// The first member is recorded as creator.
    pub async fn open_channel(
        &self,
        channel_type: ChannelType,
        mode: ChannelMode,
        members: &[(&Principal, PermissionLevel)],
    ) -> Channel {
        let creator = members.first().map(|(p, _)| p.id.clone()).expect("at least one member");
        let channel = Channel::new(ChannelId::generate(), channel_type, mode, ORG, creator).expect("valid channel");

        let joined_at = self.clock.now_millis();
        let grants: Vec<_> = members
            .iter()
            .map(|(p, level)| ParticipantGrant::issue(p, &channel, *level, joined_at).expect("same-org member"))
            .collect();
        self.store
            .insert_channel(&channel, &grants)
            .await
            .expect("failed to store channel");
        channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use safehall_policy::OfficeHours;
    use safehall_store::ChannelStore;

    #[test]
    fn test_reference_times_straddle_office_hours() {
        let hours = OfficeHours::default();
        assert!(hours.contains(school_hours()));
        assert!(!hours.contains(after_hours()));
    }

    #[tokio::test]
    async fn test_open_channel_grants_every_member() {
        let fixture = TestFixture::new();
        let teacher = fixture.register("t1", Role::Teacher).await;
        let student = fixture.register("s1", Role::Student).await;

        let channel = fixture
            .open_channel(
                ChannelType::Direct,
                ChannelMode::Moderated,
                &[(&teacher, PermissionLevel::Moderator), (&student, PermissionLevel::ReadWrite)],
            )
            .await;

        assert_eq!(channel.created_by, teacher.id);
        let grants = fixture.store.grants_for_channel(&channel.id).await.unwrap();
        assert_eq!(grants.len(), 2);
    }
}
