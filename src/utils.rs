use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

/// Get the current time.
///
/// Returns the current time in the form YYYY-mm-ddTHH:MM:SS+00:00
pub fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S+00:00").to_string()
}

/// Acquire a read lock, recovering the guard if a writer panicked.
pub fn read_lock<T: ?Sized>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

/// Acquire a write lock, recovering the guard if a writer panicked.
pub fn write_lock<T: ?Sized>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Get all IP addresses of this machine, IPv6 ones in brackets, sorted.
///
/// Interfaces that cannot be listed yield an empty list.
#[cfg(feature = "actix")]
pub fn get_addresses() -> Vec<String> {
    use std::collections::BTreeSet;
    use std::net::IpAddr;

    let interfaces = match if_addrs::get_if_addrs() {
        Ok(interfaces) => interfaces,
        Err(e) => {
            log::warn!("Failed to list network interfaces: {}", e);
            return Vec::new();
        }
    };

    let addresses: BTreeSet<String> = interfaces
        .iter()
        .map(|iface| match iface.ip() {
            IpAddr::V4(addr) => addr.to_string(),
            IpAddr::V6(addr) => format!("[{}]", addr),
        })
        .collect();

    addresses.into_iter().collect()
}
