use crate::backend::{ContainerPidResolver, LinkAttr, LinkBackend, LinkKind, NetnsHandle};
use crate::link::{self, Link, Linker};
use crate::{ifname, Error, InterfaceRef};
use delegate::delegate;
use ipnet::IpNet;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

/// Construction parameters for a veth pair.
#[derive(Clone, Debug, Default)]
pub struct VethOptions {
    /// Peer interface name; a random `veth`-prefixed name when absent.
    pub peer_name: Option<String>,
    /// TX queue length for both ends.
    pub tx_queue_len: Option<u32>,
}

/// A veth pair: the base [`Linker`] capability on the primary end plus
/// peer-targeted mirrors of the mutating operations.
pub trait Vether: Linker {
    /// Reference to the peer end, as snapshotted at construction.
    fn peer_net_interface(&self) -> &InterfaceRef;

    fn set_peer_link_up(&self) -> Result<(), Error>;

    /// Deletes the peer end. The kernel destroys the primary with it, so
    /// after this succeeds BOTH ends are gone and this handle is invalid
    /// even though its own interface was never directly targeted.
    fn delete_peer_link(&self) -> Result<(), Error>;

    fn set_peer_link_ip(&self, network: IpNet) -> Result<(), Error>;

    fn set_peer_link_netns_pid(&self, pid: i32) -> Result<(), Error>;

    fn set_peer_link_netns_fd(&self, path: &Path) -> Result<(), Error>;

    /// Peer-side counterpart of [`Linker::set_link_net_in_ns`], with the
    /// same no-rollback behavior on partial failure.
    fn set_peer_link_net_in_ns(
        &self,
        pid: i32,
        network: IpNet,
        gateway: Option<IpAddr>,
    ) -> Result<(), Error>;

    fn set_peer_link_ns_to_container(
        &self,
        name: &str,
        resolver: &dyn ContainerPidResolver,
    ) -> Result<(), Error>;
}

/// Two links created and destroyed together.
///
/// The pair holds its peer as a plain [`InterfaceRef`]; the pairing
/// lifecycle belongs to the kernel. Deleting either end deletes both.
pub struct VethPair {
    link: Link,
    peer_ifc: InterfaceRef,
}

impl VethPair {
    /// Creates a veth pair with two random `veth`-prefixed names,
    /// equivalent to
    /// `ip link add name veth<RAND> type veth peer name veth<RAND>`.
    pub fn new(backend: Arc<dyn LinkBackend>) -> Result<Self, Error> {
        let name = ifname::random("veth");
        Self::with_options(backend, &name, VethOptions::default())
    }

    /// Creates a veth pair with the given primary name; the peer name
    /// comes from the options or is randomly generated.
    pub fn with_options(
        backend: Arc<dyn LinkBackend>,
        name: &str,
        opts: VethOptions,
    ) -> Result<Self, Error> {
        ifname::validate(name)?;
        let peer = opts
            .peer_name
            .clone()
            .unwrap_or_else(|| ifname::random("veth"));
        ifname::validate(&peer)?;
        // both ends share the host name table, so a self-paired name can
        // never be satisfied
        if peer == name {
            return Err(Error::Validation(format!(
                "veth peer name must differ from the primary name {name:?}"
            )));
        }

        let kind = LinkKind::Veth {
            peer: peer.clone(),
            tx_queue_len: opts.tx_queue_len,
        };
        let ifc = backend.create_interface(&kind, name)?;
        let peer_ifc = backend.lookup_by_name(&peer)?;
        Ok(Self {
            link: Link::adopt(backend, ifc),
            peer_ifc,
        })
    }
}

impl Linker for VethPair {
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

impl Vether for VethPair {
    fn peer_net_interface(&self) -> &InterfaceRef {
        &self.peer_ifc
    }

    fn set_peer_link_up(&self) -> Result<(), Error> {
        self.link
            .backend()
            .set_attribute(&self.peer_ifc, LinkAttr::Up(true))
    }

    fn delete_peer_link(&self) -> Result<(), Error> {
        self.link.backend().delete_interface(&self.peer_ifc)
    }

    fn set_peer_link_ip(&self, network: IpNet) -> Result<(), Error> {
        self.link
            .backend()
            .set_attribute(&self.peer_ifc, LinkAttr::AddIp(network))
    }

    fn set_peer_link_netns_pid(&self, pid: i32) -> Result<(), Error> {
        self.link
            .backend()
            .move_to_namespace(&self.peer_ifc, &NetnsHandle::Pid(pid))
    }

    fn set_peer_link_netns_fd(&self, path: &Path) -> Result<(), Error> {
        self.link
            .backend()
            .move_to_namespace(&self.peer_ifc, &NetnsHandle::Path(path.to_path_buf()))
    }

    fn set_peer_link_net_in_ns(
        &self,
        pid: i32,
        network: IpNet,
        gateway: Option<IpAddr>,
    ) -> Result<(), Error> {
        link::net_in_ns(self.link.backend(), &self.peer_ifc, pid, network, gateway)
    }

    fn set_peer_link_ns_to_container(
        &self,
        name: &str,
        resolver: &dyn ContainerPidResolver,
    ) -> Result<(), Error> {
        let pid = resolver.container_pid(name)?;
        self.set_peer_link_netns_pid(pid)
    }
}
