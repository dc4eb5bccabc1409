//! Public-signal layouts. Positions are fixed; the ledger regenerates these
//! from its own view and a proof only verifies against matching signals.

use primitives::{Fp, PubKey};

/// `new_state_root, state_root_before, message_root, coord_x, coord_y,
/// vote_options_max_index, message_start_index`, then one `(x, y)` pair per
/// step's ephemeral key.
pub const BATCH_SIGNAL_PREFIX_LEN: usize = 7;

/// `new_results_commitment, state_root, intermediate_path_index,
/// intermediate_state_root, current_results_commitment`.
pub const TALLY_SIGNAL_LEN: usize = 5;

#[allow(clippy::too_many_arguments)]
pub fn batch_public_signals(
    new_state_root: Fp,
    state_root_before: Fp,
    message_root: Fp,
    coordinator_pub_key: &PubKey,
    vote_options_max_index: u64,
    message_start_index: u64,
    ecdh_pub_keys: &[PubKey],
) -> Vec<Fp> {
    let [cx, cy] = coordinator_pub_key.as_fields();
    let mut out = Vec::with_capacity(BATCH_SIGNAL_PREFIX_LEN + 2 * ecdh_pub_keys.len());
    out.extend_from_slice(&[
        new_state_root,
        state_root_before,
        message_root,
        cx,
        cy,
        Fp::from(vote_options_max_index),
        Fp::from(message_start_index),
    ]);
    for key in ecdh_pub_keys {
        out.extend_from_slice(&key.as_fields());
    }
    out
}

pub fn tally_public_signals(
    new_results_commitment: Fp,
    state_root: Fp,
    intermediate_path_index: u64,
    intermediate_state_root: Fp,
    current_results_commitment: Fp,
) -> Vec<Fp> {
    vec![
        new_results_commitment,
        state_root,
        Fp::from(intermediate_path_index),
        intermediate_state_root,
        current_results_commitment,
    ]
}
