//! Task fee calculation

/// Total cost of a task: the data price plus one compute fee per node.
///
/// Widening to `u128` keeps the result exact for every `u64` input:
/// `(2^64 - 1)^2 + (2^64 - 1) < 2^128`.
pub fn total_price(data_price: u64, node_price: u64, node_count: usize) -> u128 {
    data_price as u128 + node_price as u128 * node_count as u128
}
