use crate::backend::{ContainerPidResolver, LinkAttr, LinkBackend, LinkKind};
use crate::link::{Link, Linker};
use crate::{ifname, Error, InterfaceRef};
use delegate::delegate;
use ipnet::IpNet;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

/// A link that can enslave other interfaces.
pub trait Bridger: Linker {
    /// Enslaves the interface to this bridge, equivalent to
    /// `ip link set <ifc> master <bridge>`. Fails if the interface is
    /// already enslaved elsewhere; it is never silently re-parented.
    fn add_slave_ifc(&mut self, ifc: &InterfaceRef) -> Result<(), Error>;

    /// Releases the interface from this bridge, equivalent to
    /// `ip link set dev <ifc> nomaster`.
    fn remove_slave_ifc(&mut self, ifc: &InterfaceRef) -> Result<(), Error>;
}

/// A network bridge with zero or more slave interfaces.
///
/// Slaves are membership, not ownership: the bridge records which
/// interfaces it enslaved, but their lifecycles stay independent.
pub struct Bridge {
    link: Link,
    slave_ifcs: Vec<InterfaceRef>,
}

impl Bridge {
    /// Creates a bridge with a random `br`-prefixed name.
    pub fn new(backend: Arc<dyn LinkBackend>) -> Result<Self, Error> {
        let name = ifname::random("br");
        Self::with_name(backend, &name)
    }

    /// Creates a bridge with the given name, equivalent to
    /// `ip link add name <name> type bridge`.
    pub fn with_name(backend: Arc<dyn LinkBackend>, name: &str) -> Result<Self, Error> {
        ifname::validate(name)?;
        let ifc = backend.create_interface(&LinkKind::Bridge, name)?;
        Ok(Self {
            link: Link::adopt(backend, ifc),
            slave_ifcs: Vec::new(),
        })
    }

    /// Wraps an existing bridge of the given name. Lookup only, nothing is
    /// created.
    pub fn from_name(backend: Arc<dyn LinkBackend>, name: &str) -> Result<Self, Error> {
        ifname::validate(name)?;
        let ifc = backend.lookup_by_name(name)?;
        Ok(Self {
            link: Link::adopt(backend, ifc),
            slave_ifcs: Vec::new(),
        })
    }

    /// The interfaces this handle has enslaved, in insertion order.
    pub fn slave_ifcs(&self) -> &[InterfaceRef] {
        &self.slave_ifcs
    }
}

impl Linker for Bridge {
    delegate! {
        to self.link {
            fn net_interface(&self) -> &InterfaceRef;
            fn delete_link(&self) -> Result<(), Error>;
            fn set_link_mtu(&self, mtu: u32) -> Result<(), Error>;
            fn set_link_mac_address(&self, macaddr: &str) -> Result<(), Error>;
            fn set_link_up(&self) -> Result<(), Error>;
            fn set_link_down(&self) -> Result<(), Error>;
            fn set_link_ip(&self, network: IpNet) -> Result<(), Error>;
            fn unset_link_ip(&self, network: IpNet) -> Result<(), Error>;
            fn set_link_default_gw(&self, gateway: IpAddr) -> Result<(), Error>;
            fn set_link_netns_pid(&self, pid: i32) -> Result<(), Error>;
            fn set_link_netns_fd(&self, path: &Path) -> Result<(), Error>;
            fn set_link_net_in_ns(
                &self,
                pid: i32,
                network: IpNet,
                gateway: Option<IpAddr>,
            ) -> Result<(), Error>;
            fn set_link_ns_to_container(
                &self,
                name: &str,
                resolver: &dyn ContainerPidResolver,
            ) -> Result<(), Error>;
        }
    }
}

/// Enslaves an interface to a bridge without holding a [`Bridge`] handle,
/// equivalent to `ip link set <ifc> master <bridge>`. Fails if the
/// interface is already enslaved elsewhere.
pub fn add_to_bridge(
    backend: &Arc<dyn LinkBackend>,
    ifc: &InterfaceRef,
    bridge: &InterfaceRef,
) -> Result<(), Error> {
    backend.set_attribute(ifc, LinkAttr::Master(Some(bridge.name().to_string())))
}

/// Releases an interface from whatever bridge it is enslaved to,
/// equivalent to `ip link set dev <ifc> nomaster`. Fails if the interface
/// has no master.
pub fn remove_from_bridge(backend: &Arc<dyn LinkBackend>, ifc: &InterfaceRef) -> Result<(), Error> {
    backend.set_attribute(ifc, LinkAttr::Master(None))
}

impl Bridger for Bridge {
    fn add_slave_ifc(&mut self, ifc: &InterfaceRef) -> Result<(), Error> {
        let master = self.link.net_interface().name().to_string();
        self.link
            .backend()
            .set_attribute(ifc, LinkAttr::Master(Some(master)))?;
        self.slave_ifcs.push(ifc.clone());
        Ok(())
    }

    fn remove_slave_ifc(&mut self, ifc: &InterfaceRef) -> Result<(), Error> {
        self.link
            .backend()
            .set_attribute(ifc, LinkAttr::Master(None))?;
        self.slave_ifcs.retain(|slave| slave.name() != ifc.name());
        Ok(())
    }
}
