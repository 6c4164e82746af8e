use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

use alloy::primitives::{Address, B256, TxHash, U256};
pub use chain::Header;

/// Bit set of the sync strategies a stored header was committed by.
///
/// The cursor of `(address, option)` is the earliest (or latest) header whose
/// bits contain `option`. Headers stored only because they own a transfer
/// carry [`SyncOption::NONE`] and never move a cursor.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SyncOption(u8);

impl SyncOption {
    pub const NONE: Self = Self(0);
    pub const ETH: Self = Self(1);
    pub const ERC20: Self = Self(2);
    pub const LIVE: Self = Self(4);
    /// What a block processed by the head follower is synced for.
    pub const ALL: Self = Self(Self::ETH.0 | Self::ERC20.0 | Self::LIVE.0);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for SyncOption {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for SyncOption {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for SyncOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = [(Self::ETH, "ETH"), (Self::ERC20, "ERC20"), (Self::LIVE, "LIVE")]
            .into_iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| name)
            .collect();
        if names.is_empty() { f.write_str("NONE") } else { f.write_str(&names.join("|")) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransferType {
    Eth,
    Erc20,
}

impl TransferType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferType::Eth => "eth",
            TransferType::Erc20 => "erc20",
        }
    }
}

impl FromStr for TransferType {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eth" => Ok(TransferType::Eth),
            "erc20" => Ok(TransferType::Erc20),
            other => Err(eyre::eyre!("unknown transfer type {other}")),
        }
    }
}

/// A native or token transfer touching a watched `address`.
///
/// `id` is the transaction hash for native transfers and
/// `keccak256(tx_hash ‖ be_u32(log_index))` for token transfers; it is unique
/// per `(address, transfer_type)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub transfer_type: TransferType,
    pub id: B256,
    pub address: Address,
    pub block: Header,
    pub transaction_hash: TxHash,
    pub log_index: Option<u64>,
    /// Sender of the transaction that carried the transfer.
    pub signer: Address,
    pub from: Address,
    pub to: Option<Address>,
    pub contract: Option<Address>,
    pub value: U256,
    pub receipt_status: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncedHeader {
    pub header: Header,
    pub sync: SyncOption,
}
