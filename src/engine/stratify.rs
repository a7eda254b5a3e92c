// src/engine/stratify.rs

use std::collections::BTreeMap;

/// Splits `target_total` across buckets in proportion to their sizes.
///
/// Each bucket first receives `floor(target_total * count / pool_size)`.
/// The slots lost to flooring go, one each, to the buckets with the largest
/// fractional remainder. Ties on the remainder go to the larger bucket, then
/// to the bucket later in key order (for difficulty buckets that is the
/// easier one). No bucket is ever asked for more than it holds.
///
/// When the pool is smaller than the target every bucket is taken whole.
pub fn compute_bucket_sizes<K>(buckets: &BTreeMap<K, usize>, target_total: usize) -> BTreeMap<K, usize>
where
    K: Ord + Clone,
{
    let pool_size: usize = buckets.values().sum();
    if pool_size <= target_total {
        return buckets.clone();
    }

    let mut sizes = BTreeMap::new();
    let mut remainders = Vec::with_capacity(buckets.len());
    let mut allocated = 0usize;

    for (key, &count) in buckets {
        let numerator = target_total as u128 * count as u128;
        let base = (numerator / pool_size as u128) as usize;
        let remainder = numerator % pool_size as u128;
        allocated += base;
        sizes.insert(key.clone(), base);
        remainders.push((key, remainder, count));
    }

    remainders.sort_by(|a, b| b.1.cmp(&a.1).then(b.2.cmp(&a.2)).then(b.0.cmp(a.0)));

    let mut leftover = target_total - allocated;
    for (key, _, count) in remainders {
        if leftover == 0 {
            break;
        }
        if let Some(size) = sizes.get_mut(key) {
            if *size < count {
                *size += 1;
                leftover -= 1;
            }
        }
    }

    sizes
}
