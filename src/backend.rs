//! The boundary toward the kernel-facing collaborator.
//!
//! Everything this crate does ends up as one of the five [`LinkBackend`]
//! calls. The crate itself ships no netlink transport; a real backend is
//! injected by the embedding application, while [`UnsupportedBackend`]
//! stands in wherever kernel support is missing and
//! [`mock::MemoryBackend`](crate::mock::MemoryBackend) serves tests.

use crate::macaddr::MacAddr;
use crate::macvlan::MacVlanMode;
use crate::{Error, InterfaceRef};
use ipnet::IpNet;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

/// Device kind and its creation parameters.
///
/// Master and peer devices are referred to by name only; the relationship
/// is resolved by the backend at creation time, never held as ownership.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LinkKind {
    Dummy,
    Bridge,
    Vlan { master: String, id: u16 },
    MacVlan { master: String, mode: MacVlanMode },
    MacVtap { master: String, mode: MacVlanMode },
    Veth { peer: String, tx_queue_len: Option<u32> },
}

/// A single mutable attribute of an existing interface.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LinkAttr {
    Mtu(u32),
    MacAddress(MacAddr),
    Up(bool),
    AddIp(IpNet),
    DelIp(IpNet),
    /// Replaces the interface's default route.
    DefaultGw(IpAddr),
    /// `Some(name)` enslaves the interface to the named master,
    /// `None` releases it.
    Master(Option<String>),
    Name(String),
}

/// Target of a namespace move.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum NetnsHandle {
    /// The network namespace of a running process.
    Pid(i32),
    /// A bind-mounted namespace file, e.g. `/var/run/netns/blue`.
    Path(PathBuf),
}

/// Resolves a container name to the PID of its init process.
///
/// Container runtimes are a further external collaborator; this crate only
/// defines the lookup it needs to derive a [`NetnsHandle`] from a name.
pub trait ContainerPidResolver {
    fn container_pid(&self, name: &str) -> Result<i32, Error>;
}

/// Contract the kernel-facing collaborator must satisfy.
///
/// All calls are synchronous and map 1:1 onto a blocking kernel request.
/// The layer performs no locking of its own; callers racing mutations
/// against the same interface name must serialize themselves.
pub trait LinkBackend: Send + Sync {
    /// Creates an interface of the given kind. Fails with a conflict error
    /// if the name is already taken and a not-found error if a referenced
    /// master device does not exist.
    fn create_interface(&self, kind: &LinkKind, name: &str) -> Result<InterfaceRef, Error>;

    /// Removes the interface. For a veth device this removes its peer too.
    fn delete_interface(&self, ifc: &InterfaceRef) -> Result<(), Error>;

    /// Applies one attribute change to an existing interface.
    fn set_attribute(&self, ifc: &InterfaceRef, attr: LinkAttr) -> Result<(), Error>;

    /// Moves the interface into the target network namespace. After the
    /// move the interface is no longer visible to
    /// [`lookup_by_name`](Self::lookup_by_name) in the current namespace.
    fn move_to_namespace(&self, ifc: &InterfaceRef, ns: &NetnsHandle) -> Result<(), Error>;

    /// Fetches a fresh snapshot of the named interface.
    fn lookup_by_name(&self, name: &str) -> Result<InterfaceRef, Error>;
}

/// Backend for hosts without kernel support: every operation fails with
/// [`Error::UnsupportedPlatform`] and has no observable side effect.
#[derive(Default, Copy, Clone, Debug)]
pub struct UnsupportedBackend;

impl LinkBackend for UnsupportedBackend {
    fn create_interface(&self, _kind: &LinkKind, _name: &str) -> Result<InterfaceRef, Error> {
        Err(Error::UnsupportedPlatform)
    }

    fn delete_interface(&self, _ifc: &InterfaceRef) -> Result<(), Error> {
        Err(Error::UnsupportedPlatform)
    }

    fn set_attribute(&self, _ifc: &InterfaceRef, _attr: LinkAttr) -> Result<(), Error> {
        Err(Error::UnsupportedPlatform)
    }

    fn move_to_namespace(&self, _ifc: &InterfaceRef, _ns: &NetnsHandle) -> Result<(), Error> {
        Err(Error::UnsupportedPlatform)
    }

    fn lookup_by_name(&self, _name: &str) -> Result<InterfaceRef, Error> {
        Err(Error::UnsupportedPlatform)
    }
}

/// Returns the backend selected for this build.
///
/// No kernel-facing transport is bundled with this crate, so this is the
/// stub backend on every platform; applications wire their own
/// implementation in through the constructors instead of relying on a
/// parallel source tree per platform.
pub fn default_backend() -> Arc<dyn LinkBackend> {
    Arc::new(UnsupportedBackend)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::InterfaceFlags;

    #[test]
    fn unsupported_backend_fails_every_operation() {
        let backend = UnsupportedBackend;
        let ifc = InterfaceRef::new("eth0", 2, InterfaceFlags::empty());

        assert!(matches!(
            backend.create_interface(&LinkKind::Dummy, "dm0"),
            Err(Error::UnsupportedPlatform)
        ));
        assert!(matches!(
            backend.delete_interface(&ifc),
            Err(Error::UnsupportedPlatform)
        ));
        assert!(matches!(
            backend.set_attribute(&ifc, LinkAttr::Up(true)),
            Err(Error::UnsupportedPlatform)
        ));
        assert!(matches!(
            backend.move_to_namespace(&ifc, &NetnsHandle::Pid(1)),
            Err(Error::UnsupportedPlatform)
        ));
        assert!(matches!(
            backend.lookup_by_name("eth0"),
            Err(Error::UnsupportedPlatform)
        ));
    }

    #[test]
    fn default_backend_is_the_stub() {
        assert!(matches!(
            default_backend().lookup_by_name("eth0"),
            Err(Error::UnsupportedPlatform)
        ));
    }
}
