//! Chained references and the per-action amount / output-reference allocator.
//!
//! A chained reference is a 256-bit tag that the relayer resolves at execution
//! time to a value stored by a previous sub-call. Temporary references are
//! cleared when read; read-only references survive the read.

use crate::actions::{ActionStep, ActionType};
use alloy::primitives::U256;
use std::fmt;

/// Prefix of temporary chained references (`0xba10` in the top 16 bits).
pub const CHAINED_REFERENCE_TEMP_PREFIX: u16 = 0xba10;
/// Prefix of read-only chained references (`0xba11` in the top 16 bits).
pub const CHAINED_REFERENCE_READONLY_PREFIX: u16 = 0xba11;

const PREFIX_SHIFT: usize = 240;
// top 12 bits; shared by both prefixes
const CHAINED_REFERENCE_MASK_SHIFT: usize = 244;
const CHAINED_REFERENCE_MASK_VALUE: u64 = 0xba1;

const BPS_DENOMINATOR: u32 = 10_000;

/// Monotonic counter used to allocate chained reference keys while building actions.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ChainedReferenceKey(u64);

impl ChainedReferenceKey {
    pub const fn new(key: u64) -> Self {
        Self(key)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    /// The key allocated after this one.
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// The most recently allocated key, i.e. the one the previous action wrote to.
    ///
    /// Saturates at zero: a key of zero means nothing has been allocated yet and
    /// callers must not ask for a predecessor.
    pub const fn previous(self) -> Self {
        Self(self.0.saturating_sub(1))
    }

    pub fn to_chained_reference(self) -> ChainedReference {
        ChainedReference::temporary(self)
    }
}

impl From<u64> for ChainedReferenceKey {
    fn from(key: u64) -> Self {
        Self(key)
    }
}

impl fmt::Display for ChainedReferenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ReferenceKind {
    Temporary,
    ReadOnly,
}

impl ReferenceKind {
    fn prefix(self) -> u16 {
        match self {
            ReferenceKind::Temporary => CHAINED_REFERENCE_TEMP_PREFIX,
            ReferenceKind::ReadOnly => CHAINED_REFERENCE_READONLY_PREFIX,
        }
    }
}

/// A chained reference tag as understood by the relayer.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ChainedReference {
    pub kind: ReferenceKind,
    pub key: ChainedReferenceKey,
}

impl ChainedReference {
    pub fn temporary(key: ChainedReferenceKey) -> Self {
        Self { kind: ReferenceKind::Temporary, key }
    }

    pub fn read_only(key: ChainedReferenceKey) -> Self {
        Self { kind: ReferenceKind::ReadOnly, key }
    }

    /// The 256-bit value placed in calldata: `prefix << 240 | key`.
    pub fn to_u256(self) -> U256 {
        (U256::from(self.kind.prefix()) << PREFIX_SHIFT) | U256::from(self.key.get())
    }

    /// Parses a calldata value back into a reference.
    ///
    /// Returns `None` for literal amounts and for references whose key does not
    /// fit the allocator's key space.
    pub fn from_u256(value: U256) -> Option<Self> {
        if !is_chained_reference(value) {
            return None;
        }
        let prefix: u16 = (value >> PREFIX_SHIFT).to::<u16>();
        let kind = match prefix {
            CHAINED_REFERENCE_TEMP_PREFIX => ReferenceKind::Temporary,
            CHAINED_REFERENCE_READONLY_PREFIX => ReferenceKind::ReadOnly,
            _ => return None,
        };
        let key = value ^ (U256::from(prefix) << PREFIX_SHIFT);
        let key = u64::try_from(key).ok()?;
        Some(Self { kind, key: ChainedReferenceKey(key) })
    }
}

/// Whether `value` carries the chained reference marker in its top 12 bits.
pub fn is_chained_reference(value: U256) -> bool {
    value >> CHAINED_REFERENCE_MASK_SHIFT == U256::from(CHAINED_REFERENCE_MASK_VALUE)
}

/// The amount an action consumes: a literal or a value produced earlier in the multicall.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ActionAmount {
    Literal(U256),
    Chained(ChainedReference),
}

impl ActionAmount {
    pub fn to_u256(self) -> U256 {
        match self {
            ActionAmount::Literal(amount) => amount,
            ActionAmount::Chained(reference) => reference.to_u256(),
        }
    }

    pub fn is_chained(&self) -> bool {
        matches!(self, ActionAmount::Chained(_))
    }

    pub fn chained_reference(&self) -> Option<ChainedReference> {
        match self {
            ActionAmount::Chained(reference) => Some(*reference),
            ActionAmount::Literal(_) => None,
        }
    }
}

impl fmt::Display for ActionAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_u256())
    }
}

/// Instruction to store the action's output at `index` under the reference `key`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct OutputReference {
    pub index: usize,
    pub key: ChainedReference,
}

/// Resolves the amount an action consumes.
///
/// Actions that produce the final output, and intermediate joins and exits,
/// consume the value the previous action stored under `key - 1`. Everything
/// else, including intermediate swaps, keeps the literal amount.
pub fn action_amount(
    amount: U256,
    action_type: ActionType,
    step: ActionStep,
    key: ChainedReferenceKey,
) -> ActionAmount {
    let chained = match step {
        ActionStep::TokenOut => true,
        ActionStep::Middle => matches!(action_type, ActionType::Join | ActionType::Exit),
        ActionStep::Direct | ActionStep::TokenIn => false,
    };
    if chained {
        ActionAmount::Chained(key.previous().to_chained_reference())
    } else {
        ActionAmount::Literal(amount)
    }
}

/// Allocates the output reference for an action and advances the counter.
///
/// Only actions whose output feeds a later action (`TokenIn`, `Middle`) get a
/// reference. The counter is never advanced otherwise.
pub fn action_output_ref(
    step: ActionStep,
    token_out_index: usize,
    key: ChainedReferenceKey,
) -> (Option<OutputReference>, ChainedReferenceKey) {
    match step {
        ActionStep::TokenIn | ActionStep::Middle => {
            let reference = OutputReference {
                index: token_out_index,
                key: key.to_chained_reference(),
            };
            (Some(reference), key.next())
        }
        ActionStep::Direct | ActionStep::TokenOut => (None, key),
    }
}

/// Minimum acceptable output after applying `slippage_bps` to the expected amount.
///
/// Chained amounts are unknown until execution, so their minimum is zero.
pub fn action_min_out(expected: ActionAmount, slippage_bps: u32) -> U256 {
    match expected {
        ActionAmount::Chained(_) => U256::ZERO,
        ActionAmount::Literal(amount) => {
            let keep = U256::from(BPS_DENOMINATOR.saturating_sub(slippage_bps));
            let denominator = U256::from(BPS_DENOMINATOR);
            // divide first when the product does not fit; loses at most `keep` wei
            match amount.checked_mul(keep) {
                Some(product) => product / denominator,
                None => amount / denominator * keep,
            }
        }
    }
}
