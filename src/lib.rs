//! hostlink is a library for managing host network links: plain links,
//! bridges, vlans, macvlan/macvtap devices and veth pairs, plus moving any
//! of them between network namespaces.
//!
//! The crate is split into a thin capability layer (the [`Linker`] family
//! of traits and the concrete link kinds implementing them) and a
//! [`LinkBackend`] boundary that performs the actual kernel interaction.
//! Backends are injected, so the layer itself never talks to the kernel:
//! pass a netlink-backed implementation on a Linux host, the bundled
//! [`mock::MemoryBackend`] in tests, or fall back to
//! [`UnsupportedBackend`] where no kernel support exists.
//!
//! ```no_run
//! use hostlink::{default_backend, Bridge, Linker};
//!
//! let backend = default_backend();
//! let bridge = Bridge::with_name(backend, "br0")?;
//! bridge.set_link_up()?;
//! # Ok::<(), hostlink::Error>(())
//! ```

mod backend;
mod bridge;
mod error;
mod ifname;
mod link;
mod macaddr;
mod macvlan;
mod macvtap;
pub mod mock;
mod veth;
mod vlan;

pub use backend::{
    default_backend, ContainerPidResolver, LinkAttr, LinkBackend, LinkKind, NetnsHandle,
    UnsupportedBackend,
};
pub use bridge::{add_to_bridge, remove_from_bridge, Bridge, Bridger};
pub use error::Error;
pub use ifname::IFNAMSIZ;
pub use link::{delete_link, rename_interface, Link, LinkOptions, Linker};
pub use macaddr::MacAddr;
pub use macvlan::{MacVlanLink, MacVlanMode, MacVlanOptions, MacVlaner};
pub use macvtap::{MacVtapLink, MacVtaper};
pub use veth::{VethOptions, VethPair, Vether};
pub use vlan::{VlanLink, VlanOptions, Vlaner};

pub use ipnet;

use std::fmt::{self, Debug, Formatter};
use std::ops::BitOr;

/// Link-layer flags of a host interface, mirroring the kernel `IFF_*` bits.
#[derive(Default, Copy, Clone, Eq, PartialEq, Hash)]
pub struct InterfaceFlags(u32);

impl InterfaceFlags {
    pub const UP: InterfaceFlags = InterfaceFlags(0x1);
    pub const BROADCAST: InterfaceFlags = InterfaceFlags(0x2);
    pub const LOOPBACK: InterfaceFlags = InterfaceFlags(0x8);
    pub const POINTOPOINT: InterfaceFlags = InterfaceFlags(0x10);
    pub const MULTICAST: InterfaceFlags = InterfaceFlags(0x1000);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl BitOr for InterfaceFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl Debug for InterfaceFlags {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        const NAMES: [(InterfaceFlags, &str); 5] = [
            (InterfaceFlags::UP, "UP"),
            (InterfaceFlags::BROADCAST, "BROADCAST"),
            (InterfaceFlags::LOOPBACK, "LOOPBACK"),
            (InterfaceFlags::POINTOPOINT, "POINTOPOINT"),
            (InterfaceFlags::MULTICAST, "MULTICAST"),
        ];

        let mut first = true;
        for (flag, name) in NAMES {
            if self.contains(flag) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        if first {
            write!(f, "(empty)")?;
        }
        Ok(())
    }
}

/// Identifies a host network interface by name and index.
///
/// An `InterfaceRef` is an immutable snapshot of kernel state at fetch
/// time. It goes stale after any mutation of the interface; re-fetch it by
/// name (e.g. via [`LinkBackend::lookup_by_name`]) when current flags are
/// needed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InterfaceRef {
    name: String,
    index: u32,
    flags: InterfaceFlags,
}

impl InterfaceRef {
    pub fn new(name: impl Into<String>, index: u32, flags: InterfaceFlags) -> Self {
        Self {
            name: name.into(),
            index,
            flags,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn flags(&self) -> InterfaceFlags {
        self.flags
    }
}

#[cfg(test)]
mod test {
    use super::InterfaceFlags;

    #[test]
    fn flag_set_operations() {
        let mut flags = InterfaceFlags::BROADCAST | InterfaceFlags::MULTICAST;
        assert!(flags.contains(InterfaceFlags::BROADCAST));
        assert!(!flags.contains(InterfaceFlags::UP));

        flags.insert(InterfaceFlags::UP);
        assert!(flags.contains(InterfaceFlags::UP));

        flags.remove(InterfaceFlags::UP);
        assert!(!flags.contains(InterfaceFlags::UP));
        assert_eq!(flags, InterfaceFlags::BROADCAST | InterfaceFlags::MULTICAST);
    }

    #[test]
    fn flag_debug_lists_names() {
        let flags = InterfaceFlags::UP | InterfaceFlags::MULTICAST;
        assert_eq!(format!("{flags:?}"), "UP|MULTICAST");
        assert_eq!(format!("{:?}", InterfaceFlags::empty()), "(empty)");
    }
}
