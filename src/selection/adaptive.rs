/// Adaptive routing: response-time weighted roulette wheel
///
/// Instead of minimizing a score, every candidate gets a slice of [0, 1)
/// sized by the inverse cube of its average response time, and one uniform
/// draw picks the winner. Fast servers dominate, but a floor keeps even the
/// slowest server sampled often enough for its average to recover.
use rand::Rng;

use crate::core::backend::Backend;

/// Stand-in average for servers with no samples yet (0.1 microseconds);
/// favors them heavily until real measurements arrive.
const VERY_QUICK_SECONDS: f64 = 1.0 / 10_000_000.0;

/// Floor divisor: each slot is at least pre_total / 197, roughly 0.5% of the
/// aggregate (not exact once more than one candidate is floored).
const SLOT_FLOOR_DIVISOR: f64 = 197.0;

/// Normalized roulette slots for the pool, summing to 1.0
fn roulette_slots(backends: &[Backend], pool: &[usize]) -> Vec<f64> {
    let mut slots = Vec::with_capacity(pool.len());
    let mut pre_total = 0.0;

    for &idx in pool {
        let average = backends[idx].server().stats().response_time_average();
        let inverse = if average == 0.0 {
            1.0 / VERY_QUICK_SECONDS
        } else {
            1.0 / average
        };
        // Cubed so a modest speed advantage becomes a large probability one
        let slot = inverse * inverse * inverse;
        pre_total += slot;
        slots.push(slot);
    }

    let floor = pre_total / SLOT_FLOOR_DIVISOR;
    let mut total = 0.0;
    for slot in &mut slots {
        *slot = slot.max(floor);
        total += *slot;
    }

    for slot in &mut slots {
        *slot /= total;
    }

    slots
}

/// Draw one candidate from `pool`, or `None` if it is empty.
///
/// The random source must belong to the calling worker; sharing one across
/// workers would serialize draws and correlate sessions.
pub fn select<R: Rng>(backends: &[Backend], pool: &[usize], rng: &mut R) -> Option<usize> {
    if pool.is_empty() {
        return None;
    }

    let slots = roulette_slots(backends, pool);
    let ball: f64 = rng.gen();

    let mut walk = 0.0;
    for (slot, &idx) in slots.iter().zip(pool) {
        walk += slot;
        if ball < walk {
            return Some(idx);
        }
    }

    // Floating-point rounding can leave the cumulative walk a hair under
    // 1.0; the last candidate absorbs the remainder.
    pool.last().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::backend::ServerRef;
    use crate::core::{status, ServerInfo};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn slave_with_average(name: &str, average_secs: f64) -> Backend {
        let server = Arc::new(ServerInfo::new(name, "10.0.0.1", 3306, 1.0));
        server.set_status(status::RUNNING | status::SLAVE);
        if average_secs > 0.0 {
            server.stats().sample_response_time(average_secs);
        }
        Backend::new(ServerRef::new(server))
    }

    fn pool(backends: &[Backend]) -> Vec<usize> {
        (0..backends.len()).collect()
    }

    #[test]
    fn test_slots_are_a_distribution() {
        let backends = vec![
            slave_with_average("db1", 0.001),
            slave_with_average("db2", 0.004),
            slave_with_average("db3", 0.100),
            slave_with_average("db4", 0.0),
        ];
        let slots = roulette_slots(&backends, &pool(&backends));

        let total: f64 = slots.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        // Every candidate keeps at least the floored share
        for slot in &slots {
            assert!(*slot >= 1.0 / SLOT_FLOOR_DIVISOR / backends.len() as f64);
            assert!(*slot > 0.0);
        }
    }

    #[test]
    fn test_unmeasured_server_is_strongly_favored() {
        let backends = vec![
            slave_with_average("measured", 0.002),
            slave_with_average("fresh", 0.0),
        ];
        let slots = roulette_slots(&backends, &pool(&backends));
        assert!(slots[1] > 0.99);
    }

    #[test]
    fn test_faster_server_wins_most_draws() {
        let backends = vec![
            slave_with_average("fast", 0.001),
            slave_with_average("slow", 0.002),
        ];
        let candidates = pool(&backends);
        let mut rng = SmallRng::seed_from_u64(42);

        let mut fast_wins = 0;
        for _ in 0..10_000 {
            if select(&backends, &candidates, &mut rng) == Some(0) {
                fast_wins += 1;
            }
        }
        // 2x faster cubed => 8:1 odds, ~88.9% of draws
        assert!(fast_wins > 8_000, "fast won only {fast_wins}");
    }

    #[test]
    fn test_slow_server_still_sampled() {
        let backends = vec![
            slave_with_average("db1", 0.001),
            slave_with_average("db2", 0.001),
            slave_with_average("db3", 0.001),
            slave_with_average("db4", 0.001),
            slave_with_average("slow", 0.100),
        ];
        let candidates = pool(&backends);
        let mut rng = SmallRng::seed_from_u64(42);

        let mut slow_draws = 0;
        let draws = 100_000;
        for _ in 0..draws {
            if select(&backends, &candidates, &mut rng) == Some(4) {
                slow_draws += 1;
            }
        }

        // The floor guarantees roughly 0.5% aggregate probability; allow
        // generous slack around it but insist the slow server is seen.
        assert!(slow_draws > draws / 1000, "slow drawn only {slow_draws}");
        assert!(slow_draws < draws / 20, "slow drawn too often: {slow_draws}");
    }

    #[test]
    fn test_single_candidate_always_wins() {
        let backends = vec![slave_with_average("only", 0.050)];
        let mut rng = SmallRng::seed_from_u64(1);
        for _ in 0..100 {
            assert_eq!(select(&backends, &[0], &mut rng), Some(0));
        }
    }

    #[test]
    fn test_empty_pool_returns_none() {
        let backends: Vec<Backend> = Vec::new();
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(select(&backends, &[], &mut rng), None);
    }

    #[test]
    fn test_pool_subset_indices_are_returned() {
        let backends = vec![
            slave_with_average("db1", 0.001),
            slave_with_average("db2", 0.001),
            slave_with_average("db3", 0.001),
        ];
        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..100 {
            let chosen = select(&backends, &[1, 2], &mut rng).unwrap();
            assert!(chosen == 1 || chosen == 2);
        }
    }
}
