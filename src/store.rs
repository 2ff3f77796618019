// store.rs
//
// Narrow query interface over the persistent record sets. Each method is an
// individually atomic store operation; multi-statement sequences (token
// check, scope check, delete-then-insert) are sequenced by the handlers and
// are NOT wrapped in a cross-statement transaction. Concurrent replace
// submissions for the same participant therefore race: the last writer's
// delete+insert pair wins.
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    AvailabilityBlock, LinkToken, NewBlock, NewParticipant, NewPoll, Participant, Poll, PollPatch,
};

#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_poll(&self, poll: NewPoll) -> Result<Poll, StoreError>;
    async fn get_poll(&self, poll_id: Uuid) -> Result<Option<Poll>, StoreError>;
    async fn update_poll(&self, poll_id: Uuid, patch: PollPatch)
        -> Result<Option<Poll>, StoreError>;

    async fn insert_link_token(&self, poll_id: Uuid, token: &str)
        -> Result<LinkToken, StoreError>;
    async fn find_link_token(
        &self,
        poll_id: Uuid,
        token: &str,
    ) -> Result<Option<LinkToken>, StoreError>;

    async fn insert_participant(&self, new: NewParticipant) -> Result<Participant, StoreError>;
    async fn find_participant(
        &self,
        poll_id: Uuid,
        participant_id: Uuid,
    ) -> Result<Option<Participant>, StoreError>;
    /// Ordered by `invited_at` ascending.
    async fn list_participants(&self, poll_id: Uuid) -> Result<Vec<Participant>, StoreError>;

    async fn insert_blocks(&self, rows: Vec<NewBlock>) -> Result<u64, StoreError>;
    /// Removes every block for (poll, participant); returns the count removed.
    async fn clear_blocks(&self, poll_id: Uuid, participant_id: Uuid)
        -> Result<u64, StoreError>;
    /// Ordered by `start_ts` ascending.
    async fn list_blocks(&self, poll_id: Uuid) -> Result<Vec<AvailabilityBlock>, StoreError>;
    async fn get_block(&self, block_id: Uuid) -> Result<Option<AvailabilityBlock>, StoreError>;
    async fn delete_block(&self, block_id: Uuid) -> Result<bool, StoreError>;
}

/// In-memory store with the same observable semantics as the Postgres
/// backend. Backs the test suite and keeps the gateway honest about going
/// through the `Store` seam only.
#[derive(Default)]
pub struct MemStore {
    inner: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    polls: HashMap<Uuid, Poll>,
    tokens: Vec<LinkToken>,
    participants: HashMap<Uuid, Participant>,
    blocks: HashMap<Uuid, AvailabilityBlock>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Administrative revocation hook; the HTTP surface never exposes this.
    pub async fn set_token_active(&self, poll_id: Uuid, token: &str, active: bool) {
        let mut tables = self.inner.write().await;
        for link in &mut tables.tokens {
            if link.poll_id == poll_id && link.token == token {
                link.active = active;
            }
        }
    }
}

#[async_trait]
impl Store for MemStore {
    async fn insert_poll(&self, poll: NewPoll) -> Result<Poll, StoreError> {
        let now = Utc::now();
        let row = Poll {
            id: Uuid::new_v4(),
            title: poll.title,
            description: poll.description,
            duration_minutes: poll.duration_minutes,
            start_date: poll.start_date,
            end_date: poll.end_date,
            timezone_mode: poll.timezone_mode,
            fairness_mode: poll.fairness_mode,
            created_at: now,
            updated_at: now,
        };
        self.inner.write().await.polls.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_poll(&self, poll_id: Uuid) -> Result<Option<Poll>, StoreError> {
        Ok(self.inner.read().await.polls.get(&poll_id).cloned())
    }

    async fn update_poll(
        &self,
        poll_id: Uuid,
        patch: PollPatch,
    ) -> Result<Option<Poll>, StoreError> {
        let mut tables = self.inner.write().await;
        let Some(poll) = tables.polls.get_mut(&poll_id) else {
            return Ok(None);
        };
        if let Some(title) = patch.title {
            poll.title = title;
        }
        if let Some(description) = patch.description {
            poll.description = Some(description);
        }
        if let Some(duration) = patch.duration_minutes {
            poll.duration_minutes = duration;
        }
        if let Some(start_date) = patch.start_date {
            poll.start_date = start_date;
        }
        if let Some(end_date) = patch.end_date {
            poll.end_date = end_date;
        }
        if let Some(mode) = patch.timezone_mode {
            poll.timezone_mode = mode;
        }
        if let Some(fairness) = patch.fairness_mode {
            poll.fairness_mode = fairness;
        }
        poll.updated_at = Utc::now();
        Ok(Some(poll.clone()))
    }

    async fn insert_link_token(
        &self,
        poll_id: Uuid,
        token: &str,
    ) -> Result<LinkToken, StoreError> {
        let row = LinkToken {
            id: Uuid::new_v4(),
            poll_id,
            token: token.to_string(),
            active: true,
        };
        self.inner.write().await.tokens.push(row.clone());
        Ok(row)
    }

    async fn find_link_token(
        &self,
        poll_id: Uuid,
        token: &str,
    ) -> Result<Option<LinkToken>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .tokens
            .iter()
            .find(|link| link.poll_id == poll_id && link.token == token)
            .cloned())
    }

    async fn insert_participant(&self, new: NewParticipant) -> Result<Participant, StoreError> {
        let row = Participant {
            id: Uuid::new_v4(),
            poll_id: new.poll_id,
            name: new.name,
            email: new.email,
            tz: new.tz,
            quiet_start: None,
            quiet_end: None,
            invited_at: Utc::now(),
            responded_at: None,
        };
        self.inner
            .write()
            .await
            .participants
            .insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_participant(
        &self,
        poll_id: Uuid,
        participant_id: Uuid,
    ) -> Result<Option<Participant>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .participants
            .get(&participant_id)
            .filter(|p| p.poll_id == poll_id)
            .cloned())
    }

    async fn list_participants(&self, poll_id: Uuid) -> Result<Vec<Participant>, StoreError> {
        let mut rows: Vec<_> = self
            .inner
            .read()
            .await
            .participants
            .values()
            .filter(|p| p.poll_id == poll_id)
            .cloned()
            .collect();
        rows.sort_by_key(|p| p.invited_at);
        Ok(rows)
    }

    async fn insert_blocks(&self, rows: Vec<NewBlock>) -> Result<u64, StoreError> {
        let mut tables = self.inner.write().await;
        let count = rows.len() as u64;
        for new in rows {
            let row = AvailabilityBlock {
                id: Uuid::new_v4(),
                poll_id: new.poll_id,
                participant_id: new.participant_id,
                start_ts: new.start_ts,
                end_ts: new.end_ts,
            };
            tables.blocks.insert(row.id, row);
        }
        Ok(count)
    }

    async fn clear_blocks(
        &self,
        poll_id: Uuid,
        participant_id: Uuid,
    ) -> Result<u64, StoreError> {
        let mut tables = self.inner.write().await;
        let before = tables.blocks.len();
        tables
            .blocks
            .retain(|_, b| !(b.poll_id == poll_id && b.participant_id == participant_id));
        Ok((before - tables.blocks.len()) as u64)
    }

    async fn list_blocks(&self, poll_id: Uuid) -> Result<Vec<AvailabilityBlock>, StoreError> {
        let mut rows: Vec<_> = self
            .inner
            .read()
            .await
            .blocks
            .values()
            .filter(|b| b.poll_id == poll_id)
            .cloned()
            .collect();
        rows.sort_by_key(|b| b.start_ts);
        Ok(rows)
    }

    async fn get_block(&self, block_id: Uuid) -> Result<Option<AvailabilityBlock>, StoreError> {
        Ok(self.inner.read().await.blocks.get(&block_id).cloned())
    }

    async fn delete_block(&self, block_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.inner.write().await.blocks.remove(&block_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, Utc};

    use super::*;
    use crate::models::TimezoneMode;

    fn new_poll() -> NewPoll {
        let start = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        NewPoll {
            title: "standup".to_string(),
            description: None,
            duration_minutes: 30,
            start_date: start,
            end_date: start + Duration::days(7),
            timezone_mode: TimezoneMode::default(),
            fairness_mode: false,
        }
    }

    async fn seed(store: &MemStore) -> (Uuid, Uuid) {
        let poll = store.insert_poll(new_poll()).await.unwrap();
        let participant = store
            .insert_participant(NewParticipant {
                poll_id: poll.id,
                name: "Ada".to_string(),
                email: None,
                tz: "UTC".to_string(),
            })
            .await
            .unwrap();
        (poll.id, participant.id)
    }

    fn block_at(poll_id: Uuid, participant_id: Uuid, hour: i64) -> NewBlock {
        let start = Utc::now() + Duration::hours(hour);
        NewBlock {
            poll_id,
            participant_id,
            start_ts: start,
            end_ts: start + Duration::hours(1),
        }
    }

    #[tokio::test]
    async fn participant_lookup_is_poll_scoped() {
        let store = MemStore::new();
        let (poll_id, participant_id) = seed(&store).await;
        let other = store.insert_poll(new_poll()).await.unwrap();

        assert!(store
            .find_participant(poll_id, participant_id)
            .await
            .unwrap()
            .is_some());
        assert!(store
            .find_participant(other.id, participant_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn clear_then_insert_replaces_the_set() {
        let store = MemStore::new();
        let (poll_id, participant_id) = seed(&store).await;

        store
            .insert_blocks(vec![
                block_at(poll_id, participant_id, 1),
                block_at(poll_id, participant_id, 3),
            ])
            .await
            .unwrap();
        let cleared = store.clear_blocks(poll_id, participant_id).await.unwrap();
        assert_eq!(cleared, 2);
        store
            .insert_blocks(vec![block_at(poll_id, participant_id, 5)])
            .await
            .unwrap();

        assert_eq!(store.list_blocks(poll_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn clear_does_not_touch_other_participants() {
        let store = MemStore::new();
        let (poll_id, participant_id) = seed(&store).await;
        let other = store
            .insert_participant(NewParticipant {
                poll_id,
                name: "Grace".to_string(),
                email: None,
                tz: "UTC".to_string(),
            })
            .await
            .unwrap();

        store
            .insert_blocks(vec![
                block_at(poll_id, participant_id, 1),
                block_at(poll_id, other.id, 2),
            ])
            .await
            .unwrap();
        store.clear_blocks(poll_id, participant_id).await.unwrap();

        let remaining = store.list_blocks(poll_id).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].participant_id, other.id);
    }

    #[tokio::test]
    async fn blocks_list_in_start_order() {
        let store = MemStore::new();
        let (poll_id, participant_id) = seed(&store).await;
        store
            .insert_blocks(vec![
                block_at(poll_id, participant_id, 5),
                block_at(poll_id, participant_id, 1),
                block_at(poll_id, participant_id, 3),
            ])
            .await
            .unwrap();

        let rows = store.list_blocks(poll_id).await.unwrap();
        assert!(rows.windows(2).all(|w| w[0].start_ts <= w[1].start_ts));
    }

    #[tokio::test]
    async fn patch_overlays_only_present_fields() {
        let store = MemStore::new();
        let poll = store.insert_poll(new_poll()).await.unwrap();

        let updated = store
            .update_poll(
                poll.id,
                PollPatch {
                    duration_minutes: Some(45),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.duration_minutes, 45);
        assert_eq!(updated.title, poll.title);
        assert_eq!(updated.start_date, poll.start_date);
        assert!(updated.updated_at >= poll.updated_at);
    }

    #[tokio::test]
    async fn update_of_unknown_poll_is_none() {
        let store = MemStore::new();
        let patch = PollPatch::default();
        assert!(store
            .update_poll(Uuid::new_v4(), patch)
            .await
            .unwrap()
            .is_none());
    }
}
