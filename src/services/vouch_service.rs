use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{debug, warn};

use crate::error::AppResult;
use crate::models::vouch::{
    same_address, ChainVouch, ChallengeRecord, ChallengedVouchSummary, LoadedVouch,
    PendingChallenge, RawChallenge, TokenId, VouchMetadata, VouchRecord, VouchStatus, WalletVouch,
};
use crate::services::ipfs_service::MetadataStore;
use crate::utils::clock::Clock;

const CHALLENGE_PAGE_TARGET: usize = 30;
const CHALLENGE_SCAN_WINDOW: u64 = 60;
const WALLET_REASON_UNAVAILABLE: &str = "Could not load reason from IPFS.";

/// Outcome of resolving a vouch's metadata CID.
enum MetadataLookup {
    Missing,
    Loaded(VouchMetadata),
    Failed,
}

/// Read side of the RepuFi SBT contract.
#[async_trait::async_trait]
pub trait ChainReader: Send + Sync {
    async fn token_counter(&self) -> AppResult<u64>;
    async fn vouch_details(&self, token_id: TokenId) -> AppResult<VouchRecord>;
    async fn challenge_counter(&self) -> AppResult<u64>;
    async fn challenge(&self, challenge_id: u64) -> AppResult<RawChallenge>;
    async fn owner(&self) -> AppResult<String>;
}

/// Collapse mirrored token pairs into one entry per relationship, newest first.
///
/// Unminted slots (zero backer) are dropped. For each relationship the first record
/// encountered in input order is kept.
pub fn reconcile(vouches: Vec<ChainVouch>) -> Vec<ChainVouch> {
    let mut seen = HashSet::new();
    let mut unique: Vec<ChainVouch> = vouches
        .into_iter()
        .filter(|vouch| !vouch.record.is_unminted())
        .filter(|vouch| seen.insert(vouch.relationship_id()))
        .collect();

    unique.sort_by(|a, b| b.token_id.cmp(&a.token_id));
    unique
}

/// Lifecycle state; force-expiry wins over withdrawal, which wins over plain expiry.
pub fn classify(record: &VouchRecord, now: DateTime<Utc>) -> VouchStatus {
    if record.force_expired {
        VouchStatus::ForceExpired
    } else if record.withdrawn {
        VouchStatus::Processed
    } else if now.timestamp() > record.expiry {
        VouchStatus::Expired
    } else {
        VouchStatus::Active
    }
}

/// Vouch views over the SBT contract. Library-only: no HTTP route is mounted for it.
pub struct VouchLoader {
    chain: Arc<dyn ChainReader>,
    metadata: Arc<dyn MetadataStore>,
    clock: Arc<dyn Clock>,
}

impl VouchLoader {
    pub fn new(
        chain: Arc<dyn ChainReader>,
        metadata: Arc<dyn MetadataStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            chain,
            metadata,
            clock,
        }
    }

    /// Every minted relationship with resolved metadata, newest first.
    pub async fn load_all(&self) -> AppResult<Vec<LoadedVouch>> {
        let total = self.chain.token_counter().await?;
        debug!(target: "app::vouch", total, "loading all vouches");

        let reads = (1..=total).map(|token_id| self.read_vouch(token_id));
        let records: Vec<ChainVouch> = join_all(reads).await.into_iter().flatten().collect();
        let unique = reconcile(records);

        let now = self.clock.now();
        let loaded = join_all(unique.into_iter().map(|vouch| async move {
            let metadata = match self.lookup_metadata(&vouch).await {
                MetadataLookup::Loaded(metadata) => metadata,
                MetadataLookup::Missing => VouchMetadata::placeholder(vouch.token_id),
                MetadataLookup::Failed => VouchMetadata::unavailable(vouch.token_id),
            };
            LoadedVouch {
                status: classify(&vouch.record, now),
                token_id: vouch.token_id,
                record: vouch.record,
                metadata,
            }
        }))
        .await;

        Ok(loaded)
    }

    /// Tokens held by `address`; both sides of a pair are kept since the wallet owns each one.
    /// A missing CID reads as an empty document; a failed fetch gets a fixed reason.
    pub async fn load_for_wallet(
        &self,
        address: &str,
        owned_token_ids: &[TokenId],
    ) -> AppResult<Vec<WalletVouch>> {
        let reads = owned_token_ids.iter().map(|id| self.read_vouch(*id));
        let mut records: Vec<ChainVouch> = join_all(reads).await.into_iter().flatten().collect();
        records.sort_by(|a, b| b.token_id.cmp(&a.token_id));

        let now = self.clock.now();
        let vouches = join_all(records.into_iter().map(|vouch| async move {
            let (metadata, reason) = match self.lookup_metadata(&vouch).await {
                MetadataLookup::Loaded(metadata) => {
                    let reason = metadata.reason();
                    (metadata, reason)
                }
                MetadataLookup::Missing => {
                    let metadata = VouchMetadata::default();
                    let reason = metadata.reason();
                    (metadata, reason)
                }
                MetadataLookup::Failed => {
                    (VouchMetadata::default(), WALLET_REASON_UNAVAILABLE.to_string())
                }
            };
            WalletVouch {
                status: classify(&vouch.record, now),
                name: metadata
                    .name
                    .unwrap_or_else(|| format!("Vouch #{}", vouch.token_id)),
                reason,
                image: metadata.image,
                is_backer: same_address(&vouch.record.backer, address),
                is_borrower: same_address(&vouch.record.borrower, address),
                token_id: vouch.token_id,
                record: vouch.record,
            }
        }))
        .await;

        Ok(vouches)
    }

    /// Open challenges, newest first. Older history is skipped once a full page is collected.
    pub async fn load_pending_challenges(&self) -> AppResult<Vec<PendingChallenge>> {
        let total = self.chain.challenge_counter().await?;
        let mut pending = Vec::new();

        for id in (1..=total).rev() {
            if pending.len() >= CHALLENGE_PAGE_TARGET && id + CHALLENGE_SCAN_WINDOW < total {
                break;
            }

            let challenge = match self.read_challenge(id).await {
                Some(challenge) if challenge.is_open() => challenge,
                _ => continue,
            };

            let vouch = match self.chain.vouch_details(challenge.vouch_token_id).await {
                Ok(record) => Some(ChallengedVouchSummary {
                    backer: record.backer,
                    borrower: record.borrower,
                    amount: record.amount,
                }),
                Err(error) => {
                    warn!(
                        target: "app::vouch",
                        challenge_id = id,
                        vouch_token_id = challenge.vouch_token_id,
                        error = %error,
                        "could not read challenged vouch"
                    );
                    None
                }
            };

            pending.push(PendingChallenge {
                id,
                challenge,
                vouch,
            });
        }

        Ok(pending)
    }

    pub async fn is_admin(&self, address: &str) -> AppResult<bool> {
        if address.trim().is_empty() {
            return Ok(false);
        }
        let owner = self.chain.owner().await?;
        Ok(same_address(&owner, address))
    }

    async fn read_vouch(&self, token_id: TokenId) -> Option<ChainVouch> {
        match self.chain.vouch_details(token_id).await {
            Ok(record) => Some(ChainVouch::new(token_id, record)),
            Err(error) => {
                warn!(target: "app::vouch", token_id, error = %error, "dropping unreadable vouch");
                None
            }
        }
    }

    async fn read_challenge(&self, id: u64) -> Option<ChallengeRecord> {
        let raw = match self.chain.challenge(id).await {
            Ok(raw) => raw,
            Err(error) => {
                warn!(target: "app::vouch", challenge_id = id, error = %error, "could not read challenge");
                return None;
            }
        };

        match ChallengeRecord::try_from(raw) {
            Ok(record) => Some(record),
            Err(error) => {
                warn!(target: "app::vouch", challenge_id = id, error = %error, "skipping malformed challenge");
                None
            }
        }
    }

    async fn lookup_metadata(&self, vouch: &ChainVouch) -> MetadataLookup {
        let cid = vouch.record.metadata_cid.trim();
        if cid.is_empty() {
            return MetadataLookup::Missing;
        }

        let document = match self.metadata.fetch_json(cid).await {
            Ok(document) => document,
            Err(error) => {
                warn!(target: "app::vouch", token_id = vouch.token_id, %cid, error = %error, "metadata fetch failed");
                return MetadataLookup::Failed;
            }
        };

        match serde_json::from_value(document) {
            Ok(metadata) => MetadataLookup::Loaded(metadata),
            Err(error) => {
                warn!(target: "app::vouch", token_id = vouch.token_id, %cid, error = %error, "metadata is not a vouch document");
                MetadataLookup::Failed
            }
        }
    }
}
