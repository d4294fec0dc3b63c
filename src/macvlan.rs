use crate::backend::{ContainerPidResolver, LinkAttr, LinkBackend, LinkKind};
use crate::link::{Link, Linker};
use crate::macaddr::MacAddr;
use crate::{ifname, Error, InterfaceRef};
use delegate::delegate;
use ipnet::IpNet;
use std::fmt::{self, Display, Formatter};
use std::net::IpAddr;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// Operation mode of a macvlan or macvtap device.
///
/// The kernel knows more modes; these three are the supported set here.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum MacVlanMode {
    Private,
    Vepa,
    #[default]
    Bridge,
}

impl FromStr for MacVlanMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Self::Private),
            "vepa" => Ok(Self::Vepa),
            "bridge" => Ok(Self::Bridge),
            other => Err(Error::Validation(format!(
                "unsupported macvlan mode: {other:?}"
            ))),
        }
    }
}

impl Display for MacVlanMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Private => "private",
            Self::Vepa => "vepa",
            Self::Bridge => "bridge",
        };
        write!(f, "{s}")
    }
}

/// Construction parameters for a macvlan (or macvtap) link.
#[derive(Clone, Debug, Default)]
pub struct MacVlanOptions {
    /// Device name; a random prefixed name is used when empty.
    pub dev: String,
    /// Mode string; one of `private`, `vepa`, `bridge`. An empty string
    /// selects the default (`bridge`), anything else fails validation.
    pub mode: String,
    pub mac_addr: Option<String>,
}

/// A link with a master device operating in a macvlan mode.
pub trait MacVlaner: Linker {
    /// Reference to the master device, as snapshotted at construction.
    fn master_net_interface(&self) -> &InterfaceRef;

    /// The operation mode. Immutable after creation.
    fn mode(&self) -> MacVlanMode;
}

/// A macvlan device on top of a master interface.
pub struct MacVlanLink {
    link: Link,
    master_ifc: InterfaceRef,
    mode: MacVlanMode,
}

impl MacVlanLink {
    /// Creates a macvlan link with a random `mc`-prefixed name in the
    /// default `bridge` mode, equivalent to
    /// `ip link add name mc<RAND> link <master> type macvlan`.
    pub fn new(backend: Arc<dyn LinkBackend>, master_dev: &str) -> Result<Self, Error> {
        Self::with_options(backend, master_dev, MacVlanOptions::default())
    }

    /// Creates a macvlan link with the given options. Fails with a
    /// not-found error if the master interface does not exist and a
    /// validation error for an unrecognized mode.
    pub fn with_options(
        backend: Arc<dyn LinkBackend>,
        master_dev: &str,
        opts: MacVlanOptions,
    ) -> Result<Self, Error> {
        create(backend, master_dev, opts, "mc", false)
    }
}

// Shared with the macvtap variant, which differs only in the device
// subtype handed to the backend and the random-name prefix.
pub(crate) fn create(
    backend: Arc<dyn LinkBackend>,
    master_dev: &str,
    opts: MacVlanOptions,
    prefix: &str,
    vtap: bool,
) -> Result<MacVlanLink, Error> {
    ifname::validate(master_dev)?;
    let dev = if opts.dev.is_empty() {
        ifname::random(prefix)
    } else {
        opts.dev.clone()
    };
    ifname::validate(&dev)?;
    let mode = if opts.mode.is_empty() {
        MacVlanMode::default()
    } else {
        opts.mode.parse()?
    };
    let mac = opts
        .mac_addr
        .as_deref()
        .map(str::parse::<MacAddr>)
        .transpose()?;

    let master_ifc = backend.lookup_by_name(master_dev)?;
    let master = master_dev.to_string();
    let kind = if vtap {
        LinkKind::MacVtap { master, mode }
    } else {
        LinkKind::MacVlan { master, mode }
    };
    let ifc = backend.create_interface(&kind, &dev)?;
    let link = Link::adopt(backend, ifc);
    if let Some(mac) = mac {
        link.backend()
            .set_attribute(link.net_interface(), LinkAttr::MacAddress(mac))?;
    }
    Ok(MacVlanLink {
        link,
        master_ifc,
        mode,
    })
}

impl Linker for MacVlanLink {
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

impl MacVlaner for MacVlanLink {
    fn master_net_interface(&self) -> &InterfaceRef {
        &self.master_ifc
    }

    fn mode(&self) -> MacVlanMode {
        self.mode
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
    fn mode_parsing_is_exhaustive() {
        assert_eq!("private".parse::<MacVlanMode>().unwrap(), MacVlanMode::Private);
        assert_eq!("vepa".parse::<MacVlanMode>().unwrap(), MacVlanMode::Vepa);
        assert_eq!("bridge".parse::<MacVlanMode>().unwrap(), MacVlanMode::Bridge);

        for bad in ["passthru", "source", "BRIDGE", "bridge ", ""] {
            assert!(
                matches!(bad.parse::<MacVlanMode>(), Err(Error::Validation(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn mode_round_trips_through_display() {
        for mode in [MacVlanMode::Private, MacVlanMode::Vepa, MacVlanMode::Bridge] {
            assert_eq!(mode.to_string().parse::<MacVlanMode>().unwrap(), mode);
        }
    }

    #[test]
    fn empty_mode_defaults_to_bridge() {
        let (mock, be) = backend();
        mock.seed_interface("eth0");
        let link = MacVlanLink::new(be, "eth0").unwrap();
        assert_eq!(link.mode(), MacVlanMode::Bridge);
        assert!(link.net_interface().name().starts_with("mc"));
    }

    #[test]
    fn explicit_mode_is_kept() {
        let (mock, be) = backend();
        mock.seed_interface("eth0");
        let opts = MacVlanOptions {
            dev: "mc0".to_string(),
            mode: "vepa".to_string(),
            mac_addr: None,
        };
        let link = MacVlanLink::with_options(be, "eth0", opts).unwrap();
        assert_eq!(link.mode(), MacVlanMode::Vepa);
        assert_eq!(link.master_net_interface().name(), "eth0");
    }

    #[test]
    fn unrecognized_mode_never_reaches_the_backend() {
        let (mock, be) = backend();
        mock.seed_interface("eth0");
        let opts = MacVlanOptions {
            dev: "mc0".to_string(),
            mode: "promiscuous".to_string(),
            mac_addr: None,
        };
        assert!(matches!(
            MacVlanLink::with_options(be, "eth0", opts),
            Err(Error::Validation(_))
        ));
        assert!(!mock.contains("mc0"));
    }

    #[test]
    fn missing_master_fails() {
        let (_, be) = backend();
        assert!(matches!(
            MacVlanLink::new(be, "eth0"),
            Err(Error::NotFound(_))
        ));
    }
}
