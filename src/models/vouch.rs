use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{AppError, AppResult};

pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

pub type TokenId = u64;

/// Raw `getVouchDetails` struct as read from the SBT contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VouchRecord {
    pub backer: String,
    pub borrower: String,
    pub amount: u128,
    /// Unix seconds.
    pub expiry: i64,
    pub withdrawn: bool,
    pub paired_token_id: TokenId,
    pub force_expired: bool,
    #[serde(rename = "metadataCID", default)]
    pub metadata_cid: String,
}

impl VouchRecord {
    /// Unminted slots read back with a zero backer.
    pub fn is_unminted(&self) -> bool {
        is_zero_address(&self.backer)
    }
}

/// A vouch record together with the token id it was read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainVouch {
    pub token_id: TokenId,
    pub record: VouchRecord,
}

impl ChainVouch {
    pub fn new(token_id: TokenId, record: VouchRecord) -> Self {
        Self { token_id, record }
    }

    /// Key shared by both mirrored tokens of one relationship.
    pub fn relationship_id(&self) -> TokenId {
        self.token_id.min(self.record.paired_token_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VouchStatus {
    Active,
    ForceExpired,
    Processed,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataAttribute {
    pub trait_type: String,
    #[serde(default)]
    pub value: JsonValue,
}

/// NFT metadata document pinned to IPFS for each vouch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VouchMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub attributes: Vec<MetadataAttribute>,
}

const VOUCH_TYPE_TRAIT: &str = "Vouch Type";
const BACKER_NOTE_TRAIT: &str = "Backer's Reason/Note";
const NO_REASON: &str = "No reason provided.";

impl VouchMetadata {
    pub fn placeholder(token_id: TokenId) -> Self {
        Self {
            name: Some(format!("Vouch SBT #{token_id}")),
            description: Some("Loading metadata...".to_string()),
            ..Self::default()
        }
    }

    pub fn unavailable(token_id: TokenId) -> Self {
        Self {
            name: Some(format!("Vouch SBT #{token_id}")),
            description: Some("Error loading metadata.".to_string()),
            ..Self::default()
        }
    }

    pub fn attribute(&self, trait_type: &str) -> Option<String> {
        self.attributes
            .iter()
            .find(|attr| attr.trait_type == trait_type)
            .and_then(|attr| match &attr.value {
                JsonValue::String(text) if !text.is_empty() => Some(text.clone()),
                JsonValue::Number(number) => Some(number.to_string()),
                _ => None,
            })
    }

    /// Short display reason: vouch type, then the backer's note, then the description.
    pub fn reason(&self) -> String {
        self.attribute(VOUCH_TYPE_TRAIT)
            .or_else(|| self.attribute(BACKER_NOTE_TRAIT))
            .or_else(|| self.description.clone().filter(|text| !text.is_empty()))
            .unwrap_or_else(|| NO_REASON.to_string())
    }
}

/// Reconciled vouch ready for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedVouch {
    pub token_id: TokenId,
    pub record: VouchRecord,
    pub status: VouchStatus,
    pub metadata: VouchMetadata,
}

/// A token held by the viewing wallet, with its role in the relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletVouch {
    pub token_id: TokenId,
    pub record: VouchRecord,
    pub status: VouchStatus,
    pub name: String,
    pub reason: String,
    pub image: Option<String>,
    pub is_backer: bool,
    pub is_borrower: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengeStatus {
    Pending,
    Accepted,
    Rejected,
}

impl TryFrom<u64> for ChallengeStatus {
    type Error = AppError;

    fn try_from(value: u64) -> AppResult<Self> {
        match value {
            0 => Ok(ChallengeStatus::Pending),
            1 => Ok(ChallengeStatus::Accepted),
            2 => Ok(ChallengeStatus::Rejected),
            other => Err(AppError::validation(format!(
                "unknown challenge status {other}"
            ))),
        }
    }
}

/// `challenges(id)` tuple exactly as the contract returns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChallenge {
    pub vouch_token_id: TokenId,
    pub challenger: String,
    pub staked_amount: u128,
    pub timestamp: i64,
    pub reason: String,
    pub status: u64,
    pub processed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRecord {
    pub vouch_token_id: TokenId,
    pub challenger: String,
    pub staked_amount: u128,
    pub timestamp: i64,
    pub reason: String,
    pub status: ChallengeStatus,
    pub processed: bool,
}

impl TryFrom<RawChallenge> for ChallengeRecord {
    type Error = AppError;

    fn try_from(raw: RawChallenge) -> AppResult<Self> {
        Ok(Self {
            status: ChallengeStatus::try_from(raw.status)?,
            vouch_token_id: raw.vouch_token_id,
            challenger: raw.challenger,
            staked_amount: raw.staked_amount,
            timestamp: raw.timestamp,
            reason: raw.reason,
            processed: raw.processed,
        })
    }
}

impl ChallengeRecord {
    pub fn is_open(&self) -> bool {
        !is_zero_address(&self.challenger)
            && !self.processed
            && self.status == ChallengeStatus::Pending
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengedVouchSummary {
    pub backer: String,
    pub borrower: String,
    pub amount: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingChallenge {
    pub id: u64,
    pub challenge: ChallengeRecord,
    pub vouch: Option<ChallengedVouchSummary>,
}

pub fn is_zero_address(address: &str) -> bool {
    address.trim().is_empty() || address.eq_ignore_ascii_case(ZERO_ADDRESS)
}

pub fn same_address(left: &str, right: &str) -> bool {
    left.trim().eq_ignore_ascii_case(right.trim())
}
