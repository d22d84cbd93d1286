use primitive_types::H256;

use crate::arith::Target;
use crate::params::ConsensusParams;

/// Checks that `hash` meets the compact target `bits` and that the target
/// itself is a positive value within the network's limit.
///
/// `hash` is in display order. A `false` result is an ordinary rejection.
pub fn check_proof_of_work(hash: &H256, bits: u32, params: &ConsensusParams) -> bool {
    let decoded = Target::from_compact(bits);
    let target = decoded.target;

    if decoded.negative || target.is_zero() || decoded.overflow || target > params.pow_limit {
        return false;
    }

    Target::from_hash(hash) <= target
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Network;

    fn hash_of(target: Target) -> H256 {
        H256::from(target.to_be_bytes())
    }

    #[test]
    fn mainnet_genesis_meets_its_target() {
        let genesis = Network::Main.genesis();
        assert!(check_proof_of_work(
            &genesis.hash,
            genesis.bits,
            &Network::Main.params()
        ));
    }

    #[test]
    fn boundary_hashes() {
        let params = Network::Main.params();
        let bits = 0x1d00_ffff;
        let target = Target::from_compact(bits).target;
        let one = Target::from_u64(1);

        assert!(check_proof_of_work(&hash_of(target), bits, &params));
        assert!(check_proof_of_work(&hash_of(target - one), bits, &params));
        assert!(!check_proof_of_work(&hash_of(target + one), bits, &params));
    }

    #[test]
    fn malformed_or_out_of_range_bits_are_rejected() {
        let params = Network::Main.params();
        let zero_hash = H256::zero();
        // negative
        assert!(!check_proof_of_work(&zero_hash, 0x0492_3456, &params));
        // zero
        assert!(!check_proof_of_work(&zero_hash, 0x0300_0000, &params));
        // overflow
        assert!(!check_proof_of_work(&zero_hash, 0xff12_3456, &params));
        // above the mainnet limit
        assert!(!check_proof_of_work(&zero_hash, 0x1f00_ffff, &params));
        // the limit itself is fine
        assert!(check_proof_of_work(&zero_hash, 0x1e0f_ffff, &params));
    }
}
