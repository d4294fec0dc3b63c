use crate::backend::{ContainerPidResolver, LinkAttr, LinkBackend, LinkKind, NetnsHandle};
use crate::macaddr::MacAddr;
use crate::{ifname, Error, InterfaceFlags, InterfaceRef};
use ipnet::IpNet;
use log::{debug, warn};
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

/// Construction parameters for a plain link.
#[derive(Clone, Debug, Default)]
pub struct LinkOptions {
    /// Hardware address, colon- or dash-delimited hex.
    pub mac_addr: Option<String>,
    pub mtu: Option<u32>,
    /// Initial flags; only [`InterfaceFlags::UP`] is acted on.
    pub flags: InterfaceFlags,
    /// Network namespace (by PID) the link is moved into after creation.
    pub ns_pid: Option<i32>,
}

/// Operations common to every link kind.
pub trait Linker {
    /// Returns the cached interface reference. No kernel call is made; the
    /// snapshot goes stale after any mutation.
    fn net_interface(&self) -> &InterfaceRef;

    /// Removes the interface from the host. The handle is invalid for any
    /// further operation once this succeeds.
    fn delete_link(&self) -> Result<(), Error>;

    fn set_link_mtu(&self, mtu: u32) -> Result<(), Error>;

    /// Sets the hardware address. The string is validated client-side;
    /// malformed input fails with [`Error::Validation`] before any backend
    /// call.
    fn set_link_mac_address(&self, macaddr: &str) -> Result<(), Error>;

    /// Brings the link up. Idempotent.
    fn set_link_up(&self) -> Result<(), Error>;

    /// Brings the link down. Idempotent.
    fn set_link_down(&self) -> Result<(), Error>;

    /// Adds an IP network to the link. Fails if the address is already
    /// present.
    fn set_link_ip(&self, network: IpNet) -> Result<(), Error>;

    /// Removes an IP network from the link. Fails if the address is not
    /// present.
    fn unset_link_ip(&self, network: IpNet) -> Result<(), Error>;

    /// Replaces the link's default route.
    fn set_link_default_gw(&self, gateway: IpAddr) -> Result<(), Error>;

    /// Moves the link into the network namespace of the given process.
    fn set_link_netns_pid(&self, pid: i32) -> Result<(), Error>;

    /// Moves the link into the namespace bind-mounted at `path`.
    fn set_link_netns_fd(&self, path: &Path) -> Result<(), Error>;

    /// Moves the link into the namespace of `pid`, then configures address
    /// and (optionally) default gateway there.
    ///
    /// The steps are applied in order and are NOT rolled back on partial
    /// failure: if configuring the address fails, the link stays in the
    /// target namespace. Callers must handle partial application.
    fn set_link_net_in_ns(
        &self,
        pid: i32,
        network: IpNet,
        gateway: Option<IpAddr>,
    ) -> Result<(), Error>;

    /// Moves the link into the namespace of the named container, resolving
    /// the container's PID through the given runtime collaborator.
    fn set_link_ns_to_container(
        &self,
        name: &str,
        resolver: &dyn ContainerPidResolver,
    ) -> Result<(), Error>;
}

/// A plain host network link. Base entity of every other link kind.
pub struct Link {
    backend: Arc<dyn LinkBackend>,
    ifc: InterfaceRef,
}

impl Link {
    /// Creates a new dummy link, equivalent to
    /// `ip link add name <name> type dummy`.
    pub fn new(backend: Arc<dyn LinkBackend>, name: &str) -> Result<Self, Error> {
        ifname::validate(name)?;
        let ifc = backend.create_interface(&LinkKind::Dummy, name)?;
        Ok(Self { backend, ifc })
    }

    /// Adopts an existing interface of the given name.
    pub fn from_name(backend: Arc<dyn LinkBackend>, name: &str) -> Result<Self, Error> {
        ifname::validate(name)?;
        let ifc = backend.lookup_by_name(name)?;
        Ok(Self { backend, ifc })
    }

    /// Creates a new link and applies MAC address, MTU, up state and
    /// namespace from `opts`, in that order.
    ///
    /// If applying any option fails the newly created link is deleted
    /// before the triggering error is returned, so no half-configured
    /// interface is left behind. This is the only operation with an
    /// automatic-cleanup guarantee.
    pub fn with_options(
        backend: Arc<dyn LinkBackend>,
        name: &str,
        opts: LinkOptions,
    ) -> Result<Self, Error> {
        ifname::validate(name)?;
        let mac = opts
            .mac_addr
            .as_deref()
            .map(str::parse::<MacAddr>)
            .transpose()?;

        let ifc = backend.create_interface(&LinkKind::Dummy, name)?;
        let link = Self { backend, ifc };
        if let Err(err) = link.apply_options(mac, &opts) {
            debug!("option application on {name} failed, rolling back: {err}");
            if let Err(del) = link.delete_link() {
                warn!("rollback deletion of {name} failed: {del}");
            }
            return Err(err);
        }
        Ok(link)
    }

    pub(crate) fn adopt(backend: Arc<dyn LinkBackend>, ifc: InterfaceRef) -> Self {
        Self { backend, ifc }
    }

    pub(crate) fn backend(&self) -> &Arc<dyn LinkBackend> {
        &self.backend
    }

    fn apply_options(&self, mac: Option<MacAddr>, opts: &LinkOptions) -> Result<(), Error> {
        if let Some(mac) = mac {
            self.backend
                .set_attribute(&self.ifc, LinkAttr::MacAddress(mac))?;
        }
        if let Some(mtu) = opts.mtu {
            self.backend.set_attribute(&self.ifc, LinkAttr::Mtu(mtu))?;
        }
        if opts.flags.contains(InterfaceFlags::UP) {
            self.set_link_up()?;
        }
        if let Some(pid) = opts.ns_pid {
            self.set_link_netns_pid(pid)?;
        }
        Ok(())
    }
}

impl Linker for Link {
    fn net_interface(&self) -> &InterfaceRef {
        &self.ifc
    }

    fn delete_link(&self) -> Result<(), Error> {
        self.backend.delete_interface(&self.ifc)
    }

    fn set_link_mtu(&self, mtu: u32) -> Result<(), Error> {
        self.backend.set_attribute(&self.ifc, LinkAttr::Mtu(mtu))
    }

    fn set_link_mac_address(&self, macaddr: &str) -> Result<(), Error> {
        let mac: MacAddr = macaddr.parse()?;
        self.backend
            .set_attribute(&self.ifc, LinkAttr::MacAddress(mac))
    }

    fn set_link_up(&self) -> Result<(), Error> {
        self.backend.set_attribute(&self.ifc, LinkAttr::Up(true))
    }

    fn set_link_down(&self) -> Result<(), Error> {
        self.backend.set_attribute(&self.ifc, LinkAttr::Up(false))
    }

    fn set_link_ip(&self, network: IpNet) -> Result<(), Error> {
        self.backend
            .set_attribute(&self.ifc, LinkAttr::AddIp(network))
    }

    fn unset_link_ip(&self, network: IpNet) -> Result<(), Error> {
        self.backend
            .set_attribute(&self.ifc, LinkAttr::DelIp(network))
    }

    fn set_link_default_gw(&self, gateway: IpAddr) -> Result<(), Error> {
        self.backend
            .set_attribute(&self.ifc, LinkAttr::DefaultGw(gateway))
    }

    fn set_link_netns_pid(&self, pid: i32) -> Result<(), Error> {
        self.backend
            .move_to_namespace(&self.ifc, &NetnsHandle::Pid(pid))
    }

    fn set_link_netns_fd(&self, path: &Path) -> Result<(), Error> {
        self.backend
            .move_to_namespace(&self.ifc, &NetnsHandle::Path(path.to_path_buf()))
    }

    fn set_link_net_in_ns(
        &self,
        pid: i32,
        network: IpNet,
        gateway: Option<IpAddr>,
    ) -> Result<(), Error> {
        net_in_ns(&self.backend, &self.ifc, pid, network, gateway)
    }

    fn set_link_ns_to_container(
        &self,
        name: &str,
        resolver: &dyn ContainerPidResolver,
    ) -> Result<(), Error> {
        let pid = resolver.container_pid(name)?;
        self.set_link_netns_pid(pid)
    }
}

// Shared by Linker and the peer-targeted veth mirror. Move first, then
// configure; no rollback on partial failure.
pub(crate) fn net_in_ns(
    backend: &Arc<dyn LinkBackend>,
    ifc: &InterfaceRef,
    pid: i32,
    network: IpNet,
    gateway: Option<IpAddr>,
) -> Result<(), Error> {
    backend.move_to_namespace(ifc, &NetnsHandle::Pid(pid))?;
    backend.set_attribute(ifc, LinkAttr::AddIp(network))?;
    match gateway {
        Some(gw) => backend.set_attribute(ifc, LinkAttr::DefaultGw(gw)),
        None => Ok(()),
    }
}

/// Deletes the named interface, equivalent to `ip link delete dev <name>`.
pub fn delete_link(backend: &Arc<dyn LinkBackend>, name: &str) -> Result<(), Error> {
    ifname::validate(name)?;
    let ifc = backend.lookup_by_name(name)?;
    backend.delete_interface(&ifc)
}

/// Renames an interface. The new name must be free.
pub fn rename_interface(backend: &Arc<dyn LinkBackend>, old: &str, new: &str) -> Result<(), Error> {
    ifname::validate(old)?;
    ifname::validate(new)?;
    let ifc = backend.lookup_by_name(old)?;
    backend.set_attribute(&ifc, LinkAttr::Name(new.to_string()))
}
