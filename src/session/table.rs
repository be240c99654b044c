//! Concurrent session table
//!
//! Two maps keyed by session id. A key lives in at most one of them; the
//! TCP map is always locked before the UDP map when both are needed.

use super::{TcpSession, UdpSession};
use crate::error::PortalError;
use crate::protocol::SessionId;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

type Map<T> = HashMap<SessionId, Arc<T>>;

/// Shared table of live TCP and UDP sessions
#[derive(Debug, Default)]
pub struct SessionTable {
    tcp: RwLock<Map<TcpSession>>,
    udp: RwLock<Map<UdpSession>>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl SessionTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a CONNECT session
    pub fn insert_tcp(&self, session: Arc<TcpSession>) -> Result<(), PortalError> {
        let mut tcp = write(&self.tcp);
        let udp = read(&self.udp);
        let id = session.id();
        if tcp.contains_key(id) || udp.contains_key(id) {
            return Err(PortalError::DuplicateSession(id.to_string()));
        }
        tcp.insert(id.clone(), session);
        Ok(())
    }

    /// Register a UDP ASSOCIATE session
    pub fn insert_udp(&self, session: Arc<UdpSession>) -> Result<(), PortalError> {
        let tcp = read(&self.tcp);
        let mut udp = write(&self.udp);
        let id = session.id();
        if tcp.contains_key(id) || udp.contains_key(id) {
            return Err(PortalError::DuplicateSession(id.to_string()));
        }
        udp.insert(id.clone(), session);
        Ok(())
    }

    /// Look up a CONNECT session
    pub fn tcp(&self, id: &SessionId) -> Option<Arc<TcpSession>> {
        read(&self.tcp).get(id).cloned()
    }

    /// Look up a UDP ASSOCIATE session
    pub fn udp(&self, id: &SessionId) -> Option<Arc<UdpSession>> {
        read(&self.udp).get(id).cloned()
    }

    /// Remove a session from both maps; removing an absent id is a no-op
    pub fn remove(&self, id: &SessionId) {
        let mut tcp = write(&self.tcp);
        let mut udp = write(&self.udp);
        if tcp.remove(id).is_some() {
            tracing::debug!("Removed TCP session {}", id);
        }
        if udp.remove(id).is_some() {
            tracing::debug!("Removed UDP session {}", id);
        }
    }

    /// Number of live CONNECT sessions
    pub fn tcp_count(&self) -> usize {
        read(&self.tcp).len()
    }

    /// Number of live UDP ASSOCIATE sessions
    pub fn udp_count(&self) -> usize {
        read(&self.udp).len()
    }

    /// Cancel every session (agent shutdown)
    pub fn close_all(&self) {
        for session in read(&self.tcp).values() {
            session.close();
        }
        for session in read(&self.udp).values() {
            session.close();
        }
    }
}
