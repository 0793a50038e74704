use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{TimeZone, Utc};
use httpmock::prelude::*;
use repufi_drs_lib::error::{AppError, AppResult};
use repufi_drs_lib::models::vouch::{
    ChallengeStatus, RawChallenge, TokenId, VouchRecord, VouchStatus, ZERO_ADDRESS,
};
use repufi_drs_lib::services::ipfs_service::{IpfsGateway, MetadataStore};
use repufi_drs_lib::services::vouch_service::{ChainReader, VouchLoader};
use repufi_drs_lib::utils::clock::ManualClock;
use serde_json::{json, Value as JsonValue};

const BACKER: &str = "0xB0b0000000000000000000000000000000000001";
const BORROWER: &str = "0xA11ce00000000000000000000000000000000002";
const CHALLENGER: &str = "0xC4a1100000000000000000000000000000000003";
const OWNER: &str = "0x0wNer000000000000000000000000000000000004";
const NOW_SECS: i64 = 1_750_000_000;
const ONE_ETH: u128 = 1_000_000_000_000_000_000;

#[derive(Default)]
struct InMemoryChain {
    vouches: HashMap<TokenId, VouchRecord>,
    token_counter: u64,
    challenges: HashMap<u64, RawChallenge>,
    challenge_reads: AtomicUsize,
    owner_reads: AtomicUsize,
}

#[async_trait::async_trait]
impl ChainReader for InMemoryChain {
    async fn token_counter(&self) -> AppResult<u64> {
        Ok(self.token_counter)
    }

    async fn vouch_details(&self, token_id: TokenId) -> AppResult<VouchRecord> {
        self.vouches
            .get(&token_id)
            .cloned()
            .ok_or_else(|| AppError::external("chain", format!("execution reverted for {token_id}")))
    }

    async fn challenge_counter(&self) -> AppResult<u64> {
        Ok(self.challenges.keys().copied().max().unwrap_or(0))
    }

    async fn challenge(&self, challenge_id: u64) -> AppResult<RawChallenge> {
        self.challenge_reads.fetch_add(1, Ordering::SeqCst);
        self.challenges
            .get(&challenge_id)
            .cloned()
            .ok_or_else(|| AppError::external("chain", "execution reverted"))
    }

    async fn owner(&self) -> AppResult<String> {
        self.owner_reads.fetch_add(1, Ordering::SeqCst);
        Ok(OWNER.to_string())
    }
}

#[derive(Default)]
struct InMemoryMetadata {
    documents: HashMap<String, JsonValue>,
}

#[async_trait::async_trait]
impl MetadataStore for InMemoryMetadata {
    async fn fetch_json(&self, cid: &str) -> AppResult<JsonValue> {
        self.documents
            .get(cid)
            .cloned()
            .ok_or_else(|| AppError::external("ipfs", format!("Failed to fetch from IPFS gateway (404): {cid}")))
    }
}

fn vouch(backer: &str, paired: TokenId, cid: &str) -> VouchRecord {
    VouchRecord {
        backer: backer.to_string(),
        borrower: BORROWER.to_string(),
        amount: ONE_ETH,
        expiry: NOW_SECS + 86_400,
        withdrawn: false,
        paired_token_id: paired,
        force_expired: false,
        metadata_cid: cid.to_string(),
    }
}

fn challenge(vouch_token_id: TokenId, status: u64, processed: bool) -> RawChallenge {
    RawChallenge {
        vouch_token_id,
        challenger: CHALLENGER.to_string(),
        staked_amount: ONE_ETH / 10,
        timestamp: NOW_SECS - 3_600,
        reason: "Borrower defaulted".to_string(),
        status,
        processed,
    }
}

/// Tokens 1..=9: pairs {1,2}, {5,9}, {6,7}; 3 and 8 are unminted; 4 cannot be read.
fn seeded_chain() -> InMemoryChain {
    let mut vouches = HashMap::new();

    let mut expired = vouch(BACKER, 2, "bafy-missing");
    expired.expiry = NOW_SECS - 1;
    vouches.insert(1, expired.clone());
    vouches.insert(2, VouchRecord { paired_token_id: 1, ..expired });

    vouches.insert(3, vouch(ZERO_ADDRESS, 0, ""));
    vouches.insert(5, vouch(BACKER, 9, "bafy-five"));
    vouches.insert(9, vouch(BACKER, 5, "bafy-nine"));

    let mut revoked = vouch(BACKER, 7, "");
    revoked.force_expired = true;
    revoked.withdrawn = true;
    vouches.insert(6, revoked.clone());
    vouches.insert(7, VouchRecord { paired_token_id: 6, ..revoked });

    vouches.insert(8, vouch(ZERO_ADDRESS, 0, ""));

    InMemoryChain {
        vouches,
        token_counter: 9,
        ..InMemoryChain::default()
    }
}

fn seeded_metadata() -> InMemoryMetadata {
    let mut documents = HashMap::new();
    documents.insert(
        "bafy-five".to_string(),
        json!({
            "name": "Vouch for Alice",
            "description": "Known collaborator",
            "image": "ipfs://bafy-image",
            "attributes": [
                { "trait_type": "Backer's Reason/Note", "value": "Shipped three audits together" },
                { "trait_type": "Amount", "value": 1 }
            ]
        }),
    );
    documents.insert("bafy-nine".to_string(), json!("not a metadata document"));
    InMemoryMetadata { documents }
}

fn loader(chain: InMemoryChain, metadata: impl MetadataStore + 'static) -> (VouchLoader, Arc<InMemoryChain>) {
    let chain = Arc::new(chain);
    let clock = Arc::new(ManualClock::new(Utc.timestamp_opt(NOW_SECS, 0).unwrap()));
    let loader = VouchLoader::new(Arc::clone(&chain) as Arc<dyn ChainReader>, Arc::new(metadata), clock);
    (loader, chain)
}

#[tokio::test]
async fn load_all_reconciles_pairs_and_resolves_metadata() {
    let (loader, _) = loader(seeded_chain(), seeded_metadata());

    let vouches = loader.load_all().await.expect("load succeeds");

    let ids: Vec<_> = vouches.iter().map(|v| v.token_id).collect();
    assert_eq!(ids, vec![6, 5, 1]);

    let unique: HashSet<_> = vouches
        .iter()
        .map(|v| v.token_id.min(v.record.paired_token_id))
        .collect();
    assert_eq!(unique.len(), vouches.len());
    assert!(vouches.iter().all(|v| v.record.backer != ZERO_ADDRESS));

    let revoked = &vouches[0];
    assert_eq!(revoked.status, VouchStatus::ForceExpired);
    assert_eq!(revoked.metadata.name.as_deref(), Some("Vouch SBT #6"));

    let active = &vouches[1];
    assert_eq!(active.status, VouchStatus::Active);
    assert_eq!(active.metadata.name.as_deref(), Some("Vouch for Alice"));
    assert_eq!(active.metadata.reason(), "Shipped three audits together");

    let expired = &vouches[2];
    assert_eq!(expired.status, VouchStatus::Expired);
    assert_eq!(
        expired.metadata.description.as_deref(),
        Some("Error loading metadata.")
    );
}

#[tokio::test]
async fn mirrored_pair_keeps_first_read_token() {
    let mut chain = InMemoryChain {
        token_counter: 9,
        ..InMemoryChain::default()
    };
    chain.vouches.insert(5, vouch(BACKER, 9, ""));
    chain.vouches.insert(9, vouch(BACKER, 5, ""));

    let (loader, _) = loader(chain, InMemoryMetadata::default());
    let vouches = loader.load_all().await.unwrap();

    assert_eq!(vouches.len(), 1);
    assert_eq!(vouches[0].token_id, 5);
    assert_eq!(vouches[0].record.paired_token_id, 9);
}

#[tokio::test]
async fn wallet_view_keeps_both_sides_and_flags_roles() {
    let (loader, _) = loader(seeded_chain(), seeded_metadata());

    let vouches = loader
        .load_for_wallet(&BORROWER.to_lowercase(), &[5, 42, 9])
        .await
        .expect("wallet load succeeds");

    let ids: Vec<_> = vouches.iter().map(|v| v.token_id).collect();
    assert_eq!(ids, vec![9, 5]);
    assert!(vouches.iter().all(|v| v.is_borrower && !v.is_backer));

    assert_eq!(vouches[0].name, "Vouch #9");
    assert_eq!(vouches[0].reason, "Could not load reason from IPFS.");
    assert_eq!(vouches[1].name, "Vouch for Alice");
    assert_eq!(vouches[1].reason, "Shipped three audits together");
    assert_eq!(vouches[1].image.as_deref(), Some("ipfs://bafy-image"));
    assert_eq!(vouches[1].status, VouchStatus::Active);
}

#[tokio::test]
async fn wallet_view_treats_missing_cid_as_empty_metadata() {
    let (loader, _) = loader(seeded_chain(), seeded_metadata());

    let vouches = loader.load_for_wallet(BORROWER, &[6]).await.unwrap();

    assert_eq!(vouches.len(), 1);
    assert_eq!(vouches[0].name, "Vouch #6");
    assert_eq!(vouches[0].reason, "No reason provided.");
    assert_eq!(vouches[0].image, None);
    assert_eq!(vouches[0].status, VouchStatus::ForceExpired);
}

#[tokio::test]
async fn pending_challenges_are_open_ones_newest_first() {
    let mut chain = seeded_chain();
    chain.challenges.insert(1, challenge(5, 0, false));
    chain.challenges.insert(2, challenge(5, 0, true));
    chain.challenges.insert(3, challenge(5, 1, false));
    chain.challenges.insert(4, challenge(5, 7, false));
    chain.challenges.insert(
        5,
        RawChallenge {
            challenger: ZERO_ADDRESS.to_string(),
            ..challenge(5, 0, false)
        },
    );
    chain.challenges.insert(6, challenge(4, 0, false));
    chain.challenges.insert(8, challenge(5, 0, false));

    let (loader, _) = loader(chain, InMemoryMetadata::default());
    let pending = loader.load_pending_challenges().await.expect("scan succeeds");

    let ids: Vec<_> = pending.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![8, 6, 1]);
    assert!(pending
        .iter()
        .all(|p| p.challenge.status == ChallengeStatus::Pending));

    assert!(pending[1].vouch.is_none());
    let summary = pending[2].vouch.as_ref().expect("vouch summary attached");
    assert_eq!(summary.backer, BACKER);
    assert_eq!(summary.borrower, BORROWER);
    assert_eq!(summary.amount, ONE_ETH);
}

#[tokio::test]
async fn challenge_scan_stops_after_a_full_page_of_recent_history() {
    let mut chain = seeded_chain();
    for id in 1..=100 {
        chain.challenges.insert(id, challenge(5, 0, false));
    }

    let (loader, chain) = loader(chain, InMemoryMetadata::default());
    let pending = loader.load_pending_challenges().await.unwrap();

    assert_eq!(pending.len(), 61);
    assert_eq!(pending.first().map(|p| p.id), Some(100));
    assert_eq!(pending.last().map(|p| p.id), Some(40));
    assert_eq!(chain.challenge_reads.load(Ordering::SeqCst), 61);
}

#[tokio::test]
async fn sparse_open_challenges_scan_the_whole_history() {
    let mut chain = seeded_chain();
    for id in 1..=100 {
        chain.challenges.insert(id, challenge(5, 0, id > 5));
    }

    let (loader, chain) = loader(chain, InMemoryMetadata::default());
    let pending = loader.load_pending_challenges().await.unwrap();

    let ids: Vec<_> = pending.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![5, 4, 3, 2, 1]);
    assert_eq!(chain.challenge_reads.load(Ordering::SeqCst), 100);
}

#[tokio::test]
async fn admin_check_ignores_address_case() {
    let (loader, chain) = loader(seeded_chain(), InMemoryMetadata::default());

    assert!(loader.is_admin(&OWNER.to_uppercase().replace("0X", "0x")).await.unwrap());
    assert!(loader.is_admin(&OWNER.to_lowercase()).await.unwrap());
    assert!(!loader.is_admin(BACKER).await.unwrap());
    assert!(!loader.is_admin("  ").await.unwrap());
    assert_eq!(chain.owner_reads.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn ipfs_gateway_feeds_the_loader() {
    let server = MockServer::start_async().await;
    let document_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/ipfs/bafy-five");
            then.status(200).json_body(json!({
                "name": "Vouch for Alice",
                "attributes": [{ "trait_type": "Vouch Type", "value": "Work reference" }]
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/ipfs/bafy-nine");
            then.status(504).body("gateway timeout");
        })
        .await;

    let gateway = IpfsGateway::try_new(server.url("/ipfs/"), StdDuration::from_secs(5)).unwrap();
    let mut chain = InMemoryChain {
        token_counter: 9,
        ..InMemoryChain::default()
    };
    chain.vouches.insert(5, vouch(BACKER, 9, "bafy-five"));
    chain.vouches.insert(9, vouch(BACKER, 5, "bafy-nine"));

    let (loader, _) = loader(chain, gateway);
    let wallet = loader.load_for_wallet(BACKER, &[5, 9]).await.unwrap();

    assert_eq!(wallet.len(), 2);
    assert!(wallet.iter().all(|v| v.is_backer && !v.is_borrower));
    assert_eq!(wallet[0].name, "Vouch #9");
    assert_eq!(wallet[0].reason, "Could not load reason from IPFS.");
    assert_eq!(wallet[1].name, "Vouch for Alice");
    assert_eq!(wallet[1].reason, "Work reference");
    document_mock.assert_hits_async(1).await;
}

#[tokio::test]
async fn ipfs_gateway_rejects_blank_cids_and_http_errors() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/ipfs/bafy-gone");
            then.status(404);
        })
        .await;
    let gateway = IpfsGateway::try_new(server.url("/ipfs"), StdDuration::from_secs(5)).unwrap();

    assert!(matches!(
        gateway.fetch_json("   ").await,
        Err(AppError::Validation { .. })
    ));
    let error = gateway.fetch_json("bafy-gone").await.unwrap_err();
    assert!(matches!(error, AppError::External { service: "ipfs", .. }));
    assert!(error.to_string().contains("(404)"));
}
