//! Knock sequence generation.
//!
//! Sequences are drawn either uniformly at random or deterministically from
//! a seed, then pushed through a per-element filter that keeps every port
//! inside the configured range and outside the blacklist.

use std::collections::BTreeSet;

use rand::Rng;
use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::types::KnockSequence;

/// Generation constraints: how many ports, the inclusive acceptable range,
/// and the ports that must never appear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceSpec {
    pub length: usize,
    pub low: u16,
    pub high: u16,
    pub blacklist: BTreeSet<u16>,
}

impl SequenceSpec {
    pub fn from_config(config: &Config) -> Self {
        Self {
            length: config.sequence_length,
            low: config.port_range_start,
            high: config.port_range_end,
            blacklist: config.port_blacklist.iter().copied().collect(),
        }
    }
}

/// Generate an ordered knock sequence.
///
/// With a seed, each candidate is derived from a SHA-256 digest of
/// `index + seed` and the output is identical across calls with the same
/// `(spec, seed)`. Without a seed, candidates are drawn uniformly from the
/// acceptable range and the result is not reproducible.
///
/// Both branches feed [`filter_port`], so every returned port is inside
/// `[spec.low, spec.high]` and outside `spec.blacklist`.
pub fn generate_sequence(spec: &SequenceSpec, seed: Option<u64>) -> KnockSequence {
    let candidates: Vec<u128> = match seed {
        Some(seed) => (0..spec.length)
            .map(|i| seeded_candidate(i as u128 + seed as u128))
            .collect(),
        None => {
            let mut rng = rand::thread_rng();
            (0..spec.length)
                .map(|_| rng.gen_range(spec.low..=spec.high) as u128)
                .collect()
        }
    };

    KnockSequence::new(
        candidates
            .into_iter()
            .map(|candidate| filter_port(candidate, spec))
            .collect(),
    )
}

/// The sequence an apply/rotation uses: the fixed open sequence when the
/// configuration says so (a testing aid), otherwise a fresh random draw.
pub fn next_sequence(config: &Config) -> KnockSequence {
    if config.use_open_sequence {
        KnockSequence::new(config.open_sequence.clone())
    } else {
        generate_sequence(&SequenceSpec::from_config(config), None)
    }
}

/// Derive an unranged candidate from a one-way hash of `index + seed`.
///
/// The digest is computed over the decimal rendering of the sum, and the
/// first 16 digest bytes are read big-endian. The value is intentionally
/// not reduced into the acceptable range here; the filter does that.
fn seeded_candidate(input: u128) -> u128 {
    let digest = Sha256::digest(input.to_string().as_bytes());
    let mut head = [0u8; 16];
    head.copy_from_slice(&digest[..16]);
    u128::from_be_bytes(head)
}

/// Force a candidate into the acceptable range and off the blacklist.
///
/// Forward linear probe with wraparound: while the candidate is blacklisted
/// or out of range, increment it; an increment past `high` wraps to
/// `(candidate mod high) + low`. Terminates provided at least one port in
/// the range is not blacklisted, which the configuration must guarantee.
pub fn filter_port(mut candidate: u128, spec: &SequenceSpec) -> u16 {
    let low = spec.low as u128;
    let high = spec.high as u128;

    while !admissible(candidate, spec) {
        candidate += 1;
        if candidate > high {
            candidate = (candidate % high) + low;
        }
    }

    candidate as u16
}

fn admissible(candidate: u128, spec: &SequenceSpec) -> bool {
    if candidate < spec.low as u128 || candidate > spec.high as u128 {
        return false;
    }
    !spec.blacklist.contains(&(candidate as u16))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn spec(low: u16, high: u16, blacklist: &[u16]) -> SequenceSpec {
        SequenceSpec {
            length: 3,
            low,
            high,
            blacklist: blacklist.iter().copied().collect(),
        }
    }

    #[test]
    fn seeded_generation_is_deterministic() {
        let spec = spec(1024, 65535, &[22, 80]);
        let a = generate_sequence(&spec, Some(0xfeed));
        let b = generate_sequence(&spec, Some(0xfeed));
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_seeds_diverge() {
        let spec = spec(1024, 65535, &[]);
        let a = generate_sequence(&spec, Some(1));
        let b = generate_sequence(&spec, Some(2));
        assert_ne!(a, b);
    }

    #[test]
    fn sequences_have_configured_length() {
        let mut spec = spec(2000, 3000, &[]);
        spec.length = 5;
        assert_eq!(generate_sequence(&spec, None).len(), 5);
        assert_eq!(generate_sequence(&spec, Some(9)).len(), 5);
    }

    #[test]
    fn open_sequence_bypasses_generation() {
        let config = Config {
            use_open_sequence: true,
            open_sequence: vec![1111, 2222, 3333],
            ..Config::default()
        };
        assert_eq!(
            next_sequence(&config),
            KnockSequence::new(vec![1111, 2222, 3333])
        );

        let config = Config {
            use_open_sequence: false,
            ..config
        };
        let generated = next_sequence(&config);
        assert_eq!(generated.len(), config.sequence_length);
    }

    #[test]
    fn filter_probes_past_blacklisted_run() {
        // Candidate lands on 1005, which is blacklisted; so is 1006. The
        // probe must settle on 1007.
        let spec = spec(1000, 1010, &[1005, 1006]);
        assert_eq!(filter_port(1005, &spec), 1007);
    }

    #[test]
    fn filter_wraps_above_range() {
        let spec = spec(1000, 1010, &[]);
        // 1010 is admissible as-is; one past it must wrap back into range.
        assert_eq!(filter_port(1010, &spec), 1010);
        let wrapped = filter_port(1011, &spec);
        assert!(wrapped >= 1000 && wrapped <= 1010);
    }

    #[test]
    fn filter_reduces_unranged_hash_candidates() {
        let spec = spec(1024, 65535, &[1024]);
        let port = filter_port(u128::MAX - 5, &spec);
        assert!(port >= 1024 && port <= 65535);
        assert_ne!(port, 1024);
    }

    proptest! {
        #[test]
        fn filtered_ports_always_admissible(
            candidate in 0u128..1u128 << 80,
            low in 1000u16..2000,
            span in 100u16..5000,
            blacked in proptest::collection::btree_set(1000u16..7000, 0..8),
        ) {
            let high = low.saturating_add(span);
            let spec = SequenceSpec { length: 1, low, high, blacklist: blacked };
            // Skip degenerate configurations where every port is blacklisted.
            let admissible_exists = (low..=high).any(|p| !spec.blacklist.contains(&p));
            prop_assume!(admissible_exists);

            let port = filter_port(candidate, &spec);
            prop_assert!(port >= spec.low && port <= spec.high);
            prop_assert!(!spec.blacklist.contains(&port));
        }

        #[test]
        fn generated_sequences_respect_spec(seed in proptest::option::of(any::<u64>())) {
            let spec = SequenceSpec {
                length: 4,
                low: 2000,
                high: 2100,
                blacklist: [2050, 2051].into_iter().collect(),
            };
            let sequence = generate_sequence(&spec, seed);
            prop_assert_eq!(sequence.len(), spec.length);
            for port in sequence.ports() {
                prop_assert!(*port >= spec.low && *port <= spec.high);
                prop_assert!(!spec.blacklist.contains(port));
            }
        }
    }
}
