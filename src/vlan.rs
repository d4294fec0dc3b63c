use crate::backend::{ContainerPidResolver, LinkAttr, LinkBackend, LinkKind};
use crate::link::{Link, Linker};
use crate::macaddr::MacAddr;
use crate::{ifname, Error, InterfaceRef};
use delegate::delegate;
use ipnet::IpNet;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

/// Construction parameters for a vlan link.
///
/// The tag is not range-checked here; out-of-range tags are left for the
/// backend and kernel to reject.
#[derive(Clone, Debug, Default)]
pub struct VlanOptions {
    /// Device name; a random `vlan`-prefixed name is used when empty.
    pub dev: String,
    /// VLAN tag.
    pub id: u16,
    pub mac_addr: Option<String>,
}

/// A link with a master device and a VLAN tag.
pub trait Vlaner: Linker {
    /// Reference to the master device, as snapshotted at construction.
    fn master_net_interface(&self) -> &InterfaceRef;

    /// The VLAN tag. Immutable after creation.
    fn id(&self) -> u16;
}

/// An 802.1q vlan device on top of a master interface.
///
/// The master is a relationship by name, not ownership; it is resolved at
/// construction and the two lifecycles stay independent.
pub struct VlanLink {
    link: Link,
    master_ifc: InterfaceRef,
    id: u16,
}

impl VlanLink {
    /// Creates a vlan link with a random `vlan`-prefixed name, equivalent
    /// to `ip link add name vlan<RAND> link <master> type vlan id <id>`.
    pub fn new(backend: Arc<dyn LinkBackend>, master_dev: &str, id: u16) -> Result<Self, Error> {
        Self::with_options(
            backend,
            master_dev,
            VlanOptions {
                id,
                ..Default::default()
            },
        )
    }

    /// Creates a vlan link with the given options. Fails with a not-found
    /// error if the master interface does not exist.
    pub fn with_options(
        backend: Arc<dyn LinkBackend>,
        master_dev: &str,
        opts: VlanOptions,
    ) -> Result<Self, Error> {
        ifname::validate(master_dev)?;
        let dev = if opts.dev.is_empty() {
            ifname::random("vlan")
        } else {
            opts.dev.clone()
        };
        ifname::validate(&dev)?;
        let mac = opts
            .mac_addr
            .as_deref()
            .map(str::parse::<MacAddr>)
            .transpose()?;

        let master_ifc = backend.lookup_by_name(master_dev)?;
        let kind = LinkKind::Vlan {
            master: master_dev.to_string(),
            id: opts.id,
        };
        let ifc = backend.create_interface(&kind, &dev)?;
        let link = Link::adopt(backend, ifc);
        if let Some(mac) = mac {
            link.backend()
                .set_attribute(link.net_interface(), LinkAttr::MacAddress(mac))?;
        }
        Ok(Self {
            link,
            master_ifc,
            id: opts.id,
        })
    }
}

impl Linker for VlanLink {
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

impl Vlaner for VlanLink {
    fn master_net_interface(&self) -> &InterfaceRef {
        &self.master_ifc
    }

    fn id(&self) -> u16 {
        self.id
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mock::MemoryBackend;

    fn backend() -> (Arc<MemoryBackend>, Arc<dyn LinkBackend>) {
        let mock = Arc::new(MemoryBackend::new());
        let backend: Arc<dyn LinkBackend> = mock.clone();
        (mock, backend)
    }

    #[test]
    fn new_uses_vlan_prefix_and_keeps_tag() {
        let (mock, be) = backend();
        mock.seed_interface("eth0");
        let vlan = VlanLink::new(be, "eth0", 42).unwrap();
        assert!(vlan.net_interface().name().starts_with("vlan"));
        assert_eq!(vlan.id(), 42);
        assert_eq!(vlan.master_net_interface().name(), "eth0");
    }

    #[test]
    fn missing_master_fails() {
        let (_, be) = backend();
        assert!(matches!(
            VlanLink::new(be, "eth0", 42),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn with_options_sets_name_and_mac() {
        let (mock, be) = backend();
        mock.seed_interface("eth0");
        let opts = VlanOptions {
            dev: "vlan42".to_string(),
            id: 42,
            mac_addr: Some("02:00:00:00:00:01".to_string()),
        };
        let vlan = VlanLink::with_options(be, "eth0", opts).unwrap();
        assert_eq!(vlan.net_interface().name(), "vlan42");
        assert_eq!(mock.mac("vlan42").unwrap().to_string(), "02:00:00:00:00:01");
    }

    #[test]
    fn bad_mac_fails_before_creation() {
        let (mock, be) = backend();
        mock.seed_interface("eth0");
        let opts = VlanOptions {
            dev: "vlan42".to_string(),
            id: 42,
            mac_addr: Some("bogus".to_string()),
        };
        assert!(matches!(
            VlanLink::with_options(be, "eth0", opts),
            Err(Error::Validation(_))
        ));
        assert!(!mock.contains("vlan42"));
    }

    #[test]
    fn linker_operations_reach_the_device() {
        let (mock, be) = backend();
        mock.seed_interface("eth0");
        let vlan = VlanLink::new(be, "eth0", 7).unwrap();
        vlan.set_link_up().unwrap();
        assert_eq!(mock.is_up(vlan.net_interface().name()), Some(true));
        vlan.delete_link().unwrap();
        assert!(!mock.contains(vlan.net_interface().name()));
    }
}
