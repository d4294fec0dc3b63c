//! In-memory [`LinkBackend`] for exercising the link layer without kernel
//! privileges.
//!
//! [`MemoryBackend`] keeps a fake host interface table and enforces the
//! same observable semantics a kernel-facing backend would: unique names,
//! existing masters, veth pairing (deleting one end removes both), address
//! add/remove conflicts and namespace moves that hide the interface from
//! by-name lookup. The host table is process-global mutable state on a
//! real host; here it is instance state, so every test gets its own.

use crate::backend::{LinkAttr, LinkBackend, LinkKind, NetnsHandle};
use crate::macaddr::MacAddr;
use crate::{Error, InterfaceFlags, InterfaceRef};
use ipnet::IpNet;
use log::debug;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard};

// Range the fake devices accept; values outside surface as backend errors,
// the way a real driver would reject them.
const MTU_MIN: u32 = 68;
const MTU_MAX: u32 = 65536;

const DEFAULT_MTU: u32 = 1500;

#[derive(Clone, Debug)]
struct IfaceEntry {
    index: u32,
    flags: InterfaceFlags,
    mtu: u32,
    mac: Option<MacAddr>,
    addrs: Vec<IpNet>,
    default_gw: Option<IpAddr>,
    master: Option<String>,
    peer: Option<String>,
    netns: Option<NetnsHandle>,
}

impl IfaceEntry {
    fn new(index: u32) -> Self {
        Self {
            index,
            flags: InterfaceFlags::BROADCAST | InterfaceFlags::MULTICAST,
            mtu: DEFAULT_MTU,
            mac: None,
            addrs: Vec::new(),
            default_gw: None,
            master: None,
            peer: None,
            netns: None,
        }
    }

    fn to_ref(&self, name: &str) -> InterfaceRef {
        InterfaceRef::new(name, self.index, self.flags)
    }
}

#[derive(Default)]
struct HostTable {
    ifaces: HashMap<String, IfaceEntry>,
    namespaces: Vec<NetnsHandle>,
    next_index: u32,
}

impl HostTable {
    fn insert(&mut self, name: &str) -> &mut IfaceEntry {
        self.next_index += 1;
        self.ifaces
            .entry(name.to_string())
            .or_insert_with(|| IfaceEntry::new(self.next_index))
    }

    fn entry_mut(&mut self, name: &str) -> Result<&mut IfaceEntry, Error> {
        self.ifaces
            .get_mut(name)
            .ok_or_else(|| Error::NotFound(format!("interface {name}")))
    }
}

/// Fake host interface table implementing the whole backend contract.
#[derive(Default)]
pub struct MemoryBackend {
    table: Mutex<HostTable>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, HostTable> {
        self.table.lock().unwrap()
    }

    /// Registers a namespace target as reachable. Moves to an unregistered
    /// target fail with a not-found error, the way a dead PID would.
    pub fn register_namespace(&self, ns: NetnsHandle) {
        self.table().namespaces.push(ns);
    }

    /// Pre-seeds an interface, as if some other process had created it.
    pub fn seed_interface(&self, name: &str) -> InterfaceRef {
        let mut table = self.table();
        let entry = table.insert(name);
        entry.to_ref(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table().ifaces.contains_key(name)
    }

    pub fn mtu(&self, name: &str) -> Option<u32> {
        self.table().ifaces.get(name).map(|e| e.mtu)
    }

    pub fn mac(&self, name: &str) -> Option<MacAddr> {
        self.table().ifaces.get(name).and_then(|e| e.mac)
    }

    pub fn is_up(&self, name: &str) -> Option<bool> {
        self.table()
            .ifaces
            .get(name)
            .map(|e| e.flags.contains(InterfaceFlags::UP))
    }

    pub fn addresses(&self, name: &str) -> Option<Vec<IpNet>> {
        self.table().ifaces.get(name).map(|e| e.addrs.clone())
    }

    pub fn default_gw(&self, name: &str) -> Option<IpAddr> {
        self.table().ifaces.get(name).and_then(|e| e.default_gw)
    }

    pub fn master_of(&self, name: &str) -> Option<String> {
        self.table().ifaces.get(name).and_then(|e| e.master.clone())
    }

    pub fn namespace_of(&self, name: &str) -> Option<NetnsHandle> {
        self.table().ifaces.get(name).and_then(|e| e.netns.clone())
    }
}

impl LinkBackend for MemoryBackend {
    fn create_interface(&self, kind: &LinkKind, name: &str) -> Result<InterfaceRef, Error> {
        let mut table = self.table();

        if table.ifaces.contains_key(name) {
            return Err(Error::Conflict(format!("interface {name} already exists")));
        }

        let master = match kind {
            LinkKind::Vlan { master, .. }
            | LinkKind::MacVlan { master, .. }
            | LinkKind::MacVtap { master, .. } => Some(master.clone()),
            _ => None,
        };
        if let Some(master) = &master {
            if !table.ifaces.contains_key(master) {
                return Err(Error::NotFound(format!("master interface {master}")));
            }
        }

        if let LinkKind::Veth { peer, .. } = kind {
            if peer == name {
                return Err(Error::Conflict(format!("interface {name} already exists")));
            }
            if table.ifaces.contains_key(peer) {
                return Err(Error::Conflict(format!("interface {peer} already exists")));
            }
            let peer_entry = table.insert(peer);
            peer_entry.peer = Some(name.to_string());
        }

        debug!("creating {kind:?} interface {name}");
        let entry = table.insert(name);
        if let LinkKind::Veth { peer, .. } = kind {
            entry.peer = Some(peer.clone());
        }
        let ifc = entry.to_ref(name);
        Ok(ifc)
    }

    fn delete_interface(&self, ifc: &InterfaceRef) -> Result<(), Error> {
        let mut table = self.table();
        let name = ifc.name();

        let entry = table
            .ifaces
            .remove(name)
            .ok_or_else(|| Error::NotFound(format!("interface {name}")))?;

        // kernel pairing: a veth device never outlives its peer
        if let Some(peer) = &entry.peer {
            table.ifaces.remove(peer);
        }

        // slaves of a deleted bridge are released, not deleted
        for other in table.ifaces.values_mut() {
            if other.master.as_deref() == Some(name) {
                other.master = None;
            }
        }
        debug!("deleted interface {name}");
        Ok(())
    }

    fn set_attribute(&self, ifc: &InterfaceRef, attr: LinkAttr) -> Result<(), Error> {
        let mut table = self.table();
        let name = ifc.name();
        debug!("set {attr:?} on {name}");

        match attr {
            LinkAttr::Mtu(mtu) => {
                let entry = table.entry_mut(name)?;
                if !(MTU_MIN..=MTU_MAX).contains(&mtu) {
                    return Err(Error::Backend(format!("mtu {mtu} rejected by device")));
                }
                entry.mtu = mtu;
            }
            LinkAttr::MacAddress(mac) => {
                table.entry_mut(name)?.mac = Some(mac);
            }
            LinkAttr::Up(up) => {
                // idempotent in both directions
                let entry = table.entry_mut(name)?;
                if up {
                    entry.flags.insert(InterfaceFlags::UP);
                } else {
                    entry.flags.remove(InterfaceFlags::UP);
                }
            }
            LinkAttr::AddIp(network) => {
                let entry = table.entry_mut(name)?;
                if entry.addrs.contains(&network) {
                    return Err(Error::Conflict(format!(
                        "address {network} already present on {name}"
                    )));
                }
                entry.addrs.push(network);
            }
            LinkAttr::DelIp(network) => {
                let entry = table.entry_mut(name)?;
                match entry.addrs.iter().position(|a| *a == network) {
                    Some(pos) => {
                        entry.addrs.remove(pos);
                    }
                    None => {
                        return Err(Error::Conflict(format!(
                            "address {network} not present on {name}"
                        )));
                    }
                }
            }
            LinkAttr::DefaultGw(gw) => {
                table.entry_mut(name)?.default_gw = Some(gw);
            }
            LinkAttr::Master(Some(master)) => {
                if !table.ifaces.contains_key(&master) {
                    return Err(Error::NotFound(format!("master interface {master}")));
                }
                let entry = table.entry_mut(name)?;
                if let Some(current) = &entry.master {
                    return Err(Error::Conflict(format!(
                        "interface {name} already enslaved to {current}"
                    )));
                }
                entry.master = Some(master);
            }
            LinkAttr::Master(None) => {
                let entry = table.entry_mut(name)?;
                if entry.master.is_none() {
                    return Err(Error::Conflict(format!("interface {name} has no master")));
                }
                entry.master = None;
            }
            LinkAttr::Name(new_name) => {
                if table.ifaces.contains_key(&new_name) {
                    return Err(Error::Conflict(format!(
                        "interface {new_name} already exists"
                    )));
                }
                let entry = table
                    .ifaces
                    .remove(name)
                    .ok_or_else(|| Error::NotFound(format!("interface {name}")))?;
                if let Some(peer) = &entry.peer {
                    if let Some(peer_entry) = table.ifaces.get_mut(peer) {
                        peer_entry.peer = Some(new_name.clone());
                    }
                }
                for other in table.ifaces.values_mut() {
                    if other.master.as_deref() == Some(name) {
                        other.master = Some(new_name.clone());
                    }
                }
                table.ifaces.insert(new_name, entry);
            }
        }
        Ok(())
    }

    fn move_to_namespace(&self, ifc: &InterfaceRef, ns: &NetnsHandle) -> Result<(), Error> {
        let mut table = self.table();
        if !table.namespaces.contains(ns) {
            return Err(Error::NotFound(format!("namespace target {ns:?}")));
        }
        let name = ifc.name();
        table.entry_mut(name)?.netns = Some(ns.clone());
        debug!("moved {name} into {ns:?}");
        Ok(())
    }

    fn lookup_by_name(&self, name: &str) -> Result<InterfaceRef, Error> {
        let table = self.table();
        match table.ifaces.get(name) {
            // a moved interface is gone from this namespace's table
            Some(entry) if entry.netns.is_none() => Ok(entry.to_ref(name)),
            _ => Err(Error::NotFound(format!("interface {name}"))),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;

    fn backend() -> MemoryBackend {
        MemoryBackend::new()
    }

    #[test]
    fn create_and_lookup() {
        let be = backend();
        let ifc = be.create_interface(&LinkKind::Dummy, "dm0").unwrap();
        assert_eq!(ifc.name(), "dm0");
        assert_eq!(be.lookup_by_name("dm0").unwrap().index(), ifc.index());
    }

    #[test]
    fn create_rejects_taken_name() {
        let be = backend();
        be.create_interface(&LinkKind::Dummy, "dm0").unwrap();
        assert!(matches!(
            be.create_interface(&LinkKind::Bridge, "dm0"),
            Err(Error::Conflict(_))
        ));
    }

    #[test]
    fn vlan_requires_existing_master() {
        let be = backend();
        let kind = LinkKind::Vlan {
            master: "eth0".to_string(),
            id: 10,
        };
        assert!(matches!(
            be.create_interface(&kind, "vlan10"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn veth_creates_and_deletes_both_ends() {
        let be = backend();
        let kind = LinkKind::Veth {
            peer: "vethB".to_string(),
            tx_queue_len: None,
        };
        let a = be.create_interface(&kind, "vethA").unwrap();
        assert!(be.contains("vethB"));

        be.delete_interface(&a).unwrap();
        assert!(!be.contains("vethA"));
        assert!(!be.contains("vethB"));
    }

    #[test]
    fn veth_rejects_a_self_paired_name() {
        let be = backend();
        let kind = LinkKind::Veth {
            peer: "vethA".to_string(),
            tx_queue_len: None,
        };
        assert!(matches!(
            be.create_interface(&kind, "vethA"),
            Err(Error::Conflict(_))
        ));
        assert!(!be.contains("vethA"));
    }

    #[test]
    fn mtu_out_of_range_is_a_backend_error() {
        let be = backend();
        let ifc = be.create_interface(&LinkKind::Dummy, "dm0").unwrap();
        assert!(matches!(
            be.set_attribute(&ifc, LinkAttr::Mtu(10)),
            Err(Error::Backend(_))
        ));
        be.set_attribute(&ifc, LinkAttr::Mtu(9000)).unwrap();
        assert_eq!(be.mtu("dm0"), Some(9000));
    }

    #[test]
    fn namespace_move_hides_interface_from_lookup() {
        let be = backend();
        let ifc = be.create_interface(&LinkKind::Dummy, "dm0").unwrap();
        be.register_namespace(NetnsHandle::Pid(4242));

        be.move_to_namespace(&ifc, &NetnsHandle::Pid(4242)).unwrap();
        assert!(matches!(be.lookup_by_name("dm0"), Err(Error::NotFound(_))));
        // still addressable through the ref for in-namespace configuration
        be.set_attribute(&ifc, LinkAttr::Up(true)).unwrap();
    }

    #[test]
    fn move_to_unknown_namespace_fails() {
        let be = backend();
        let ifc = be.create_interface(&LinkKind::Dummy, "dm0").unwrap();
        assert!(matches!(
            be.move_to_namespace(&ifc, &NetnsHandle::Pid(1)),
            Err(Error::NotFound(_))
        ));
        assert!(be.namespace_of("dm0").is_none());
    }

    #[test]
    fn rename_follows_peer_and_slave_references() {
        let be = backend();
        let kind = LinkKind::Veth {
            peer: "vethB".to_string(),
            tx_queue_len: None,
        };
        let a = be.create_interface(&kind, "vethA").unwrap();
        be.set_attribute(&a, LinkAttr::Name("uplink".to_string()))
            .unwrap();

        assert!(be.contains("uplink"));
        let b = be.lookup_by_name("vethB").unwrap();
        be.delete_interface(&b).unwrap();
        assert!(!be.contains("uplink"));
    }

    #[test]
    fn backend_is_shareable_across_threads() {
        let be: Arc<dyn LinkBackend> = Arc::new(backend());
        let be2 = Arc::clone(&be);
        std::thread::spawn(move || {
            let _ = be2.lookup_by_name("eth0");
        })
        .join()
        .unwrap();
        assert!(matches!(be.lookup_by_name("eth0"), Err(Error::NotFound(_))));
    }
}
