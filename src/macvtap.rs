use crate::backend::{ContainerPidResolver, LinkBackend};
use crate::link::Linker;
use crate::macvlan::{self, MacVlanLink, MacVlanMode, MacVlanOptions, MacVlaner};
use crate::{Error, InterfaceRef};
use delegate::delegate;
use ipnet::IpNet;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

/// Capability set of a macvtap link. Identical to [`MacVlaner`]; macvtap
/// differs from macvlan only in the kernel device subtype.
pub trait MacVtaper: MacVlaner {}

/// A macvtap device on top of a master interface.
///
/// Reuses the macvlan attributes and validation rules wholesale; only the
/// subtype handed to the backend differs.
pub struct MacVtapLink {
    inner: MacVlanLink,
}

impl MacVtapLink {
    /// Creates a macvtap link with a random `mvt`-prefixed name in the
    /// default `bridge` mode, equivalent to
    /// `ip link add name mvt<RAND> link <master> type macvtap`.
    pub fn new(backend: Arc<dyn LinkBackend>, master_dev: &str) -> Result<Self, Error> {
        Self::with_options(backend, master_dev, MacVlanOptions::default())
    }

    /// Creates a macvtap link with the given options, validated exactly as
    /// for a macvlan link.
    pub fn with_options(
        backend: Arc<dyn LinkBackend>,
        master_dev: &str,
        opts: MacVlanOptions,
    ) -> Result<Self, Error> {
        let inner = macvlan::create(backend, master_dev, opts, "mvt", true)?;
        Ok(Self { inner })
    }
}

impl Linker for MacVtapLink {
    delegate! {
        to self.inner {
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

impl MacVlaner for MacVtapLink {
    delegate! {
        to self.inner {
            fn master_net_interface(&self) -> &InterfaceRef;
            fn mode(&self) -> MacVlanMode;
        }
    }
}

impl MacVtaper for MacVtapLink {}
