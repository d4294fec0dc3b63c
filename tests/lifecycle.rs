//! End-to-end scenario over the in-memory backend: the usual container
//! wiring of a bridge, a veth pair enslaved to it, and the peer end pushed
//! into another network namespace.

use hostlink::mock::MemoryBackend;
use hostlink::{
    Bridge, Bridger, Error, LinkBackend, Linker, NetnsHandle, VethOptions, VethPair, Vether,
};
use std::sync::Arc;

#[test]
fn bridge_veth_container_wiring() {
    let mock = Arc::new(MemoryBackend::new());
    let backend: Arc<dyn LinkBackend> = mock.clone();
    mock.register_namespace(NetnsHandle::Pid(12345));

    let mut bridge = Bridge::with_name(Arc::clone(&backend), "br0").unwrap();
    bridge.set_link_ip("10.0.0.1/24".parse().unwrap()).unwrap();
    bridge.set_link_up().unwrap();

    let pair = VethPair::with_options(
        Arc::clone(&backend),
        "vethhost",
        VethOptions {
            peer_name: Some("vethcont".to_string()),
            tx_queue_len: None,
        },
    )
    .unwrap();

    // host end joins the bridge and comes up
    let host_end = pair.net_interface().clone();
    bridge.add_slave_ifc(&host_end).unwrap();
    pair.set_link_up().unwrap();
    assert_eq!(mock.master_of("vethhost").as_deref(), Some("br0"));

    // container end gets its address inside the namespace
    pair.set_peer_link_net_in_ns(
        12345,
        "10.0.0.2/24".parse().unwrap(),
        Some("10.0.0.1".parse().unwrap()),
    )
    .unwrap();
    assert_eq!(mock.namespace_of("vethcont"), Some(NetnsHandle::Pid(12345)));
    assert_eq!(
        mock.addresses("vethcont").unwrap(),
        vec!["10.0.0.2/24".parse().unwrap()]
    );
    // moved out of this namespace, so by-name lookup no longer sees it
    assert!(matches!(
        backend.lookup_by_name("vethcont"),
        Err(Error::NotFound(_))
    ));

    // tearing down the host end takes the container end with it and
    // releases nothing else
    pair.delete_link().unwrap();
    assert!(!mock.contains("vethhost"));
    assert!(!mock.contains("vethcont"));
    assert!(mock.contains("br0"));
    assert!(matches!(pair.set_peer_link_up(), Err(Error::NotFound(_))));

    bridge.delete_link().unwrap();
    assert!(!mock.contains("br0"));
}

#[test]
fn adopted_bridge_operates_like_a_created_one() {
    let mock = Arc::new(MemoryBackend::new());
    let backend: Arc<dyn LinkBackend> = mock.clone();

    Bridge::with_name(Arc::clone(&backend), "br0").unwrap();
    let eth = mock.seed_interface("eth0");

    let mut adopted = Bridge::from_name(backend, "br0").unwrap();
    adopted.add_slave_ifc(&eth).unwrap();
    assert_eq!(mock.master_of("eth0").as_deref(), Some("br0"));

    adopted.remove_slave_ifc(&eth).unwrap();
    assert!(mock.master_of("eth0").is_none());
}
