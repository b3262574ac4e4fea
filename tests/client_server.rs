//! Client/server integration tests over a real TCP connection.
//!
//! Each test owns its broker instance on an ephemeral port, so they run
//! independently of the process-wide handle the simulator entry points use.

use std::time::Duration;

use cosim_bridge::endpoint::TypeDescriptor;
use cosim_bridge::{Config, CosimBroker, MessageBlob};
use cosim_bridge_client::{BlockingCosimClient, ClientError};

fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        ..Config::default()
    }
}

fn start_broker(config: &Config) -> (CosimBroker, String) {
    let broker = CosimBroker::start(config).expect("broker start");
    let addr = broker.local_addr().to_string();
    (broker, addr)
}

fn register(broker: &CosimBroker, id: u32) {
    assert!(broker.registry().register(
        id,
        TypeDescriptor::new(0x100 + id as i64, 8),
        TypeDescriptor::new(0x200 + id as i64, 8),
    ));
}

#[test]
fn test_list_endpoints() {
    let (broker, addr) = start_broker(&test_config());
    register(&broker, 3);
    register(&broker, 1);

    let mut client = BlockingCosimClient::connect(&addr).expect("connect");
    let endpoints = client.endpoints().expect("list");

    assert_eq!(endpoints.len(), 2);
    // Listing is sorted by id.
    assert_eq!(endpoints[0].id, 1);
    assert_eq!(endpoints[0].send_type_id, 0x101);
    assert_eq!(endpoints[0].recv_type_size, 8);
    assert_eq!(endpoints[1].id, 3);

    broker.stop();
}

#[test]
fn test_send_unknown_endpoint() {
    let (broker, addr) = start_broker(&test_config());

    let mut client = BlockingCosimClient::connect(&addr).expect("connect");
    let err = client.send(42, vec![1, 2, 3]).expect_err("must fail");
    assert!(err.is_unknown_endpoint(), "got {err:?}");

    // The connection survives a failed request.
    assert!(client.endpoints().expect("list").is_empty());

    broker.stop();
}

#[test]
fn test_send_reaches_simulator_side() {
    let (broker, addr) = start_broker(&test_config());
    register(&broker, 1);

    let mut client = BlockingCosimClient::connect(&addr).expect("connect");
    client.send(1, vec![0xDE, 0xAD]).expect("send");

    let ep = broker.registry().lookup(1).expect("registered");
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    let blob = loop {
        if let Some(blob) = ep.poll_inbound() {
            break blob;
        }
        assert!(std::time::Instant::now() < deadline, "message never arrived");
        std::thread::sleep(Duration::from_millis(5));
    };
    assert_eq!(blob.as_slice(), &[0xDE, 0xAD]);

    broker.stop();
}

#[test]
fn test_queue_full_rejection() {
    let config = Config {
        max_queue_depth: 1,
        ..test_config()
    };
    let (broker, addr) = start_broker(&config);
    register(&broker, 1);

    let mut client = BlockingCosimClient::connect(&addr).expect("connect");
    client.send(1, vec![1]).expect("first send fits");
    let err = client.send(1, vec![2]).expect_err("queue is full");
    assert!(err.is_queue_full(), "got {err:?}");

    // Draining the queue makes room again.
    let ep = broker.registry().lookup(1).expect("registered");
    assert_eq!(ep.poll_inbound().expect("queued").as_slice(), &[1]);
    client.send(1, vec![3]).expect("send after drain");

    broker.stop();
}

#[test]
fn test_recv_delivers_outbound() {
    let (broker, addr) = start_broker(&test_config());
    register(&broker, 1);

    let ep = broker.registry().lookup(1).expect("registered");
    ep.push_outbound(MessageBlob::from(vec![7, 8, 9]));

    let mut client = BlockingCosimClient::connect(&addr).expect("connect");
    assert_eq!(client.recv(1).expect("recv"), vec![7, 8, 9]);

    broker.stop();
}

#[test]
fn test_recv_parks_until_message() {
    let (broker, addr) = start_broker(&test_config());
    register(&broker, 1);

    let receiver = std::thread::spawn(move || {
        let mut client = BlockingCosimClient::connect(&addr).expect("connect");
        client.recv(1).expect("recv")
    });

    // Let the recv park, then produce.
    std::thread::sleep(Duration::from_millis(50));
    let ep = broker.registry().lookup(1).expect("registered");
    ep.push_outbound(MessageBlob::from(vec![0x55]));

    assert_eq!(receiver.join().expect("receiver"), vec![0x55]);
    broker.stop();
}

#[test]
fn test_stop_unblocks_parked_recv() {
    let (broker, addr) = start_broker(&test_config());
    register(&broker, 1);

    let receiver = std::thread::spawn(move || {
        let mut client = BlockingCosimClient::connect(&addr).expect("connect");
        client.recv(1)
    });

    std::thread::sleep(Duration::from_millis(50));
    broker.stop();

    // Teardown either answers ShuttingDown or drops the connection;
    // either way the parked recv returns instead of hanging.
    let result = receiver.join().expect("receiver");
    let err = result.expect_err("recv cannot succeed after stop");
    assert!(
        err.is_shutdown() || matches!(err, ClientError::Closed | ClientError::Wire(_)),
        "got {err:?}"
    );
}

#[test]
fn test_endpoints_are_independent() {
    let (broker, addr) = start_broker(&test_config());
    register(&broker, 1);
    register(&broker, 2);

    let ep1 = broker.registry().lookup(1).expect("registered");
    let ep2 = broker.registry().lookup(2).expect("registered");
    ep1.push_outbound(MessageBlob::from(vec![0x01]));
    ep2.push_outbound(MessageBlob::from(vec![0x02]));

    let mut client = BlockingCosimClient::connect(&addr).expect("connect");
    assert_eq!(client.recv(2).expect("recv ep2"), vec![0x02]);
    assert_eq!(client.recv(1).expect("recv ep1"), vec![0x01]);

    broker.stop();
}

#[test]
fn test_multiple_clients() {
    let (broker, addr) = start_broker(&test_config());
    register(&broker, 1);

    let mut a = BlockingCosimClient::connect(&addr).expect("connect a");
    let mut b = BlockingCosimClient::connect(&addr).expect("connect b");

    a.send(1, vec![0xA1]).expect("send from a");
    b.send(1, vec![0xB1]).expect("send from b");

    let ep = broker.registry().lookup(1).expect("registered");
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    let mut seen = Vec::new();
    while seen.len() < 2 {
        if let Some(blob) = ep.poll_inbound() {
            seen.push(blob.as_slice()[0]);
        } else {
            assert!(std::time::Instant::now() < deadline, "messages never arrived");
            std::thread::sleep(Duration::from_millis(5));
        }
    }
    seen.sort_unstable();
    assert_eq!(seen, vec![0xA1, 0xB1]);

    broker.stop();
}
