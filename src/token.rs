// src/token.rs
//
// Capability tokens stand in for authentication: one high-entropy opaque
// string per poll, stored server-side with an `active` flag for revocation.
use rand::Rng;
use uuid::Uuid;

use crate::error::{ApiError, StoreError};
use crate::store::Store;

const TOKEN_BYTES: usize = 24;

/// 24 bytes from a CSPRNG, hex-encoded to 48 characters. Collisions are
/// negligible at this entropy and are not re-checked.
pub fn mint_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill(&mut bytes[..]);
    hex::encode(bytes)
}

/// Mint and persist the link token for a freshly created poll.
pub async fn issue(store: &dyn Store, poll_id: Uuid) -> Result<String, StoreError> {
    let token = mint_token();
    store.insert_link_token(poll_id, &token).await?;
    Ok(token)
}

/// Grant iff the (poll, token) pair exists and is active. Denial is opaque:
/// an unknown poll and a bad token produce the same error, so callers learn
/// nothing about which lookup failed. Lookup is by exact match against the
/// store index; a store failure is a 500, not a denial.
pub async fn authorize(
    store: &dyn Store,
    poll_id: Uuid,
    token: &str,
) -> Result<(), ApiError> {
    let link = store
        .find_link_token(poll_id, token)
        .await
        .map_err(|e| ApiError::store("Failed to validate token", e))?;
    match link {
        Some(link) if link.active => Ok(()),
        _ => Err(ApiError::Forbidden),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemStore;

    #[test]
    fn tokens_are_48_hex_chars() {
        let token = mint_token();
        assert_eq!(token.len(), 48);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn tokens_do_not_repeat() {
        assert_ne!(mint_token(), mint_token());
    }

    #[tokio::test]
    async fn authorize_requires_matching_active_token() {
        let store = MemStore::new();
        let poll_id = Uuid::new_v4();
        let token = issue(&store, poll_id).await.unwrap();

        assert!(authorize(&store, poll_id, &token).await.is_ok());
        assert!(authorize(&store, poll_id, "0000").await.is_err());
        // bound to its own poll only
        assert!(authorize(&store, Uuid::new_v4(), &token).await.is_err());
    }

    #[tokio::test]
    async fn revocation_denies_immediately() {
        let store = MemStore::new();
        let poll_id = Uuid::new_v4();
        let token = issue(&store, poll_id).await.unwrap();

        store.set_token_active(poll_id, &token, false).await;
        assert!(matches!(
            authorize(&store, poll_id, &token).await,
            Err(ApiError::Forbidden)
        ));
    }
}
