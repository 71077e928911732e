//! Structural limits of the target platform.
//!
//! These are static tables, not live quotas.

use regex::Regex;
use std::sync::LazyLock;

/// Smallest and largest memory a serverless function may be given, in MB.
pub const FUNCTION_MEMORY_MB: std::ops::RangeInclusive<u32> = 128..=10240;

/// Allowed memory (MiB) for a container task with `cpu` units.
/// Returns `None` for unsupported cpu values.
pub fn container_memory_options(cpu: u32) -> Option<Vec<u32>> {
    let options = match cpu {
        256 => vec![512, 1024, 2048],
        512 => (1..=4).map(|gb| gb * 1024).collect(),
        1024 => (2..=8).map(|gb| gb * 1024).collect(),
        2048 => (4..=16).map(|gb| gb * 1024).collect(),
        4096 => (8..=30).map(|gb| gb * 1024).collect(),
        _ => return None,
    };
    Some(options)
}

pub const CONTAINER_CPU_OPTIONS: [u32; 5] = [256, 512, 1024, 2048, 4096];

static DNS_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?$").unwrap()
});

/// Whether `name` is a single valid DNS label.
pub fn is_dns_label(name: &str) -> bool {
    DNS_LABEL.is_match(name)
}

pub const DNS_LABEL_MAX_LEN: usize = 63;

/// Longest service id whose resource names (`<id>-db`, `<id>-app`) are still
/// DNS labels.
pub const SERVICE_ID_MAX_LEN: usize = DNS_LABEL_MAX_LEN - "-app".len();

/// Whether `id` can name a service.
pub fn is_service_id(id: &str) -> bool {
    id.len() <= SERVICE_ID_MAX_LEN && is_dns_label(id)
}
