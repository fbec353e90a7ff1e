use typenum::Unsigned as _;
use types::{
    config::Config,
    phase0::{
        consts::GENESIS_SLOT,
        primitives::{Epoch, Slot, UnixSeconds},
    },
    preset::Preset,
};

#[must_use]
pub const fn compute_epoch_at_slot<P: Preset>(slot: Slot) -> Epoch {
    slot / P::SLOTS_PER_EPOCH.get()
}

#[must_use]
pub const fn compute_start_slot_at_epoch<P: Preset>(epoch: Epoch) -> Slot {
    epoch.saturating_mul(P::SlotsPerEpoch::U64)
}

#[must_use]
pub const fn is_epoch_start<P: Preset>(slot: Slot) -> bool {
    slots_since_epoch_start::<P>(slot) == 0
}

/// [`compute_slots_since_epoch_start`](https://github.com/ethereum/consensus-specs/blob/v1.1.0/specs/phase0/fork-choice.md#compute_slots_since_epoch_start)
#[must_use]
pub const fn slots_since_epoch_start<P: Preset>(slot: Slot) -> u64 {
    slot % P::SLOTS_PER_EPOCH.get()
}

/// [`compute_slots_since_genesis`] combined with the slot lookup in [`get_current_slot`].
///
/// Times before genesis map to [`GENESIS_SLOT`].
///
/// [`compute_slots_since_genesis`]: https://github.com/ethereum/consensus-specs/blob/v1.1.0/specs/phase0/fork-choice.md#compute_slots_since_genesis
/// [`get_current_slot`]:            https://github.com/ethereum/consensus-specs/blob/v1.1.0/specs/phase0/fork-choice.md#get_current_slot
#[must_use]
pub const fn compute_slot_at_time(
    config: &Config,
    genesis_time: UnixSeconds,
    time: UnixSeconds,
) -> Slot {
    GENESIS_SLOT + time.saturating_sub(genesis_time) / config.seconds_per_slot.get()
}

/// Returns `None` if the start of `slot` cannot be represented as [`UnixSeconds`].
#[must_use]
pub const fn compute_time_at_slot(
    config: &Config,
    genesis_time: UnixSeconds,
    slot: Slot,
) -> Option<UnixSeconds> {
    let slots_since_genesis = slot - GENESIS_SLOT;

    match slots_since_genesis.checked_mul(config.seconds_per_slot.get()) {
        Some(seconds_since_genesis) => genesis_time.checked_add(seconds_since_genesis),
        None => None,
    }
}

#[must_use]
pub const fn seconds_into_slot(
    config: &Config,
    genesis_time: UnixSeconds,
    time: UnixSeconds,
) -> UnixSeconds {
    time.saturating_sub(genesis_time) % config.seconds_per_slot.get()
}
