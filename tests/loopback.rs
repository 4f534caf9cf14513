//! End-to-end tests over a loopback TCP connection.
//!
//! Each test binds a subscriber on an ephemeral port, accepts on a helper
//! thread while the publisher connects, and waits for the publisher to see
//! the subscriptions before sending anything.

use approx::assert_relative_eq;
use nalgebra::{UnitQuaternion, Vector3};
use pose_stream::config::TopicConfig;
use pose_stream::transport::{SubSocket, Transport, ZmtpPublisher};
use pose_stream::{
    AppConfig, Endpoint, Error, HumanBone, PoseReceiver, PoseUpdate, Publisher, StaticRig,
    TickOutcome,
};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

const TIMEOUT: Duration = Duration::from_secs(2);

fn loopback(port: u16) -> Endpoint {
    Endpoint::new("127.0.0.1", port)
}

fn connect_socket(sub: SubSocket) -> (SubSocket, ZmtpPublisher) {
    let endpoint = loopback(sub.local_addr().unwrap().port());
    let handle = thread::spawn(move || {
        let mut sub = sub;
        sub.accept().unwrap();
        sub
    });
    let publisher = ZmtpPublisher::connect(&endpoint, TIMEOUT).unwrap();
    let mut sub = handle.join().unwrap();
    sub.set_read_timeout(Some(TIMEOUT)).unwrap();
    (sub, publisher)
}

fn connect_receiver(receiver: PoseReceiver) -> (PoseReceiver, ZmtpPublisher) {
    let endpoint = loopback(receiver.local_addr().unwrap().port());
    let handle = thread::spawn(move || {
        let mut receiver = receiver;
        receiver.accept().unwrap();
        receiver
    });
    let publisher = ZmtpPublisher::connect(&endpoint, TIMEOUT).unwrap();
    let mut receiver = handle.join().unwrap();
    receiver.set_read_timeout(Some(TIMEOUT)).unwrap();
    (receiver, publisher)
}

/// Poll until the publisher holds exactly `count` subscriptions
fn wait_for_subscriptions(publisher: &mut ZmtpPublisher, count: usize) {
    for _ in 0..200 {
        publisher.poll_subscriptions().unwrap();
        if publisher.subscriptions().len() == count {
            return;
        }
        thread::sleep(Duration::from_millis(10));
    }
    panic!(
        "publisher holds {} subscriptions, expected {}",
        publisher.subscriptions().len(),
        count
    );
}

fn recv_update(receiver: &mut PoseReceiver) -> PoseUpdate {
    receiver
        .recv()
        .unwrap()
        .expect("message did not decode to an update")
}

#[test]
fn test_publisher_to_receiver() {
    let receiver = PoseReceiver::bind(
        &loopback(0),
        &TopicConfig::default(),
        [HumanBone::Hips, HumanBone::LeftUpperLeg],
    )
    .unwrap();
    let (mut receiver, mut zmtp) = connect_receiver(receiver);
    wait_for_subscriptions(&mut zmtp, 4);

    let rig = StaticRig::full_skeleton();
    let mut publisher = Publisher::new(&AppConfig::default()).with_rig(rig.clone());
    publisher.initialize_with(zmtp).unwrap();

    let turn = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.5);
    rig.set_root_rotation(turn);
    rig.set_root_position(Vector3::new(1.0, 0.0, -2.0));
    assert_eq!(
        publisher.tick().unwrap(),
        TickOutcome::Sent {
            messages: 2 + HumanBone::ALL.len()
        }
    );

    let PoseUpdate::RootRotation(q) = recv_update(&mut receiver) else {
        panic!("expected root rotation first");
    };
    assert_relative_eq!(q.angle(), 0.5, epsilon = 1e-4);

    assert_eq!(
        recv_update(&mut receiver),
        PoseUpdate::RootPosition(Vector3::new(1.0, 0.0, -2.0))
    );

    let PoseUpdate::Bone(bone, q) = recv_update(&mut receiver) else {
        panic!("expected a bone");
    };
    assert_eq!(bone, HumanBone::Hips);
    assert_relative_eq!(q.w, 1.0, epsilon = 1e-5);

    let PoseUpdate::Bone(bone, _) = recv_update(&mut receiver) else {
        panic!("expected a bone");
    };
    assert_eq!(bone, HumanBone::LeftUpperLeg);

    // no other bone was subscribed, so the next thing seen is the close
    publisher.teardown();
    let err = receiver.recv().unwrap_err();
    assert!(matches!(err, Error::Io(ref e) if e.kind() == std::io::ErrorKind::UnexpectedEof));
    assert!(!receiver.is_connected());
}

#[test]
fn test_unchanged_root_sends_nothing() {
    let receiver = PoseReceiver::bind(&loopback(0), &TopicConfig::default(), [HumanBone::Head])
        .unwrap();
    let (mut receiver, mut zmtp) = connect_receiver(receiver);
    wait_for_subscriptions(&mut zmtp, 3);

    let rig = StaticRig::full_skeleton();
    let mut publisher = Publisher::new(&AppConfig::default()).with_rig(rig.clone());
    publisher.initialize_with(zmtp).unwrap();

    assert_eq!(publisher.tick().unwrap(), TickOutcome::Unchanged);

    rig.set_root_position(Vector3::new(0.0, 1.0, 0.0));
    publisher.tick().unwrap();
    assert_eq!(publisher.tick().unwrap(), TickOutcome::Unchanged);

    assert!(matches!(recv_update(&mut receiver), PoseUpdate::RootRotation(_)));
    assert!(matches!(recv_update(&mut receiver), PoseUpdate::RootPosition(_)));
    assert!(matches!(
        recv_update(&mut receiver),
        PoseUpdate::Bone(HumanBone::Head, _)
    ));

    receiver.set_read_timeout(Some(Duration::from_millis(100))).unwrap();
    let err = receiver.recv().unwrap_err();
    assert!(pose_stream::transport::zmtp::is_timeout(&err));
}

#[test]
fn test_prefix_filtering() {
    let mut sub = SubSocket::bind(&loopback(0)).unwrap();
    sub.subscribe(b"Left").unwrap();
    let (mut sub, mut publisher) = connect_socket(sub);
    wait_for_subscriptions(&mut publisher, 1);

    for topic in ["LeftHand", "RightHand", "LeftFoot"] {
        publisher
            .send_multipart(&[topic.as_bytes(), b"(0, 0, 0, 1)".as_slice()])
            .unwrap();
    }
    assert_eq!(publisher.sent_count(), 2);
    assert_eq!(publisher.filtered_count(), 1);

    let first = sub.recv_multipart().unwrap();
    assert_eq!(first, vec![b"LeftHand".to_vec(), b"(0, 0, 0, 1)".to_vec()]);
    let second = sub.recv_multipart().unwrap();
    assert_eq!(second[0], b"LeftFoot".to_vec());
}

#[test]
fn test_no_subscriptions_no_delivery() {
    let sub = SubSocket::bind(&loopback(0)).unwrap();
    let (mut sub, mut publisher) = connect_socket(sub);

    publisher
        .send_multipart(&[b"foo".as_slice(), b"(0, 0, 0, 1)".as_slice()])
        .unwrap();
    assert_eq!(publisher.sent_count(), 0);
    assert_eq!(publisher.filtered_count(), 1);

    // subscribing on a live connection reaches the publisher
    sub.subscribe(b"foo").unwrap();
    wait_for_subscriptions(&mut publisher, 1);
    publisher
        .send_multipart(&[b"foo".as_slice(), b"(1, 0, 0, 0)".as_slice()])
        .unwrap();

    let message = sub.recv_multipart().unwrap();
    assert_eq!(message[1], b"(1, 0, 0, 0)".to_vec());
}

#[test]
fn test_unsubscribe_stops_delivery() {
    let mut sub = SubSocket::bind(&loopback(0)).unwrap();
    sub.subscribe(b"Hips").unwrap();
    sub.subscribe(b"Spine").unwrap();
    let (mut sub, mut publisher) = connect_socket(sub);
    wait_for_subscriptions(&mut publisher, 2);

    for topic in ["Hips", "Spine"] {
        publisher
            .send_multipart(&[topic.as_bytes(), b"(0, 0, 0, 1)".as_slice()])
            .unwrap();
    }
    assert_eq!(sub.recv_multipart().unwrap()[0], b"Hips".to_vec());
    assert_eq!(sub.recv_multipart().unwrap()[0], b"Spine".to_vec());

    // the cancel travels over the live connection
    sub.unsubscribe(b"Spine").unwrap();
    wait_for_subscriptions(&mut publisher, 1);
    assert!(!publisher.subscriptions().matches(b"Spine"));

    for topic in ["Spine", "Hips"] {
        publisher
            .send_multipart(&[topic.as_bytes(), b"(1, 0, 0, 0)".as_slice()])
            .unwrap();
    }
    assert_eq!(publisher.sent_count(), 3);
    assert_eq!(publisher.filtered_count(), 1);

    let message = sub.recv_multipart().unwrap();
    assert_eq!(message, vec![b"Hips".to_vec(), b"(1, 0, 0, 0)".to_vec()]);
}

#[test]
fn test_tick_keeps_returning_when_subscriber_stops_reading() {
    let mut sub = SubSocket::bind(&loopback(0)).unwrap();
    sub.subscribe(b"").unwrap();
    let port = sub.local_addr().unwrap().port();
    let accepting = thread::spawn(move || {
        sub.accept().unwrap();
        sub
    });

    // long payloads fill the socket buffers quickly
    let mut config = AppConfig::default();
    config.publisher.port = port;
    config.publisher.precision = 30;
    config.publisher.send_hwm = 8;
    let rig = StaticRig::full_skeleton();
    let mut publisher = Publisher::new(&config).with_rig(rig.clone());
    publisher.initialize().unwrap();

    // held open and never read from
    let _sub = accepting.join().unwrap();

    const TICKS: usize = 8000;
    let (done_tx, done_rx) = mpsc::channel();
    thread::spawn(move || {
        let mut sent = 0;
        for i in 0..TICKS {
            let angle = 1e-3 * (i + 1) as f32;
            rig.set_root_rotation(UnitQuaternion::from_axis_angle(&Vector3::y_axis(), angle));
            match publisher.tick() {
                Ok(TickOutcome::Sent { .. }) => sent += 1,
                other => panic!("tick {} returned {:?}", i, other),
            }
        }
        publisher.teardown();
        let _ = done_tx.send(sent);
    });

    let sent = done_rx
        .recv_timeout(Duration::from_secs(60))
        .expect("publisher blocked on a subscriber that stopped reading");
    assert_eq!(sent, TICKS);
}

#[test]
fn test_messages_past_hwm_dropped_whole() {
    let mut sub = SubSocket::bind(&loopback(0)).unwrap();
    sub.subscribe(b"").unwrap();
    let (mut sub, publisher) = connect_socket(sub);
    let mut publisher = publisher.with_send_hwm(4);
    wait_for_subscriptions(&mut publisher, 1);

    // fill until the queue overflows
    const PAYLOAD: usize = 64 * 1024;
    let mut seq: u32 = 0;
    while publisher.dropped_count() == 0 {
        assert!(seq < 20_000, "queue never reached the high-water mark");
        let payload = vec![(seq % 251) as u8; PAYLOAD];
        publisher
            .send_multipart(&[b"pose".as_slice(), payload.as_slice()])
            .unwrap();
        seq += 1;
    }
    assert!(publisher.queued_count() <= 4);
    assert_eq!(
        publisher.sent_count() + publisher.dropped_count(),
        u64::from(seq)
    );

    // everything accepted arrives intact once the reader catches up
    sub.set_read_timeout(Some(Duration::from_millis(50))).unwrap();
    let deadline = Instant::now() + Duration::from_secs(20);
    let mut received: u64 = 0;
    while received < publisher.sent_count() {
        assert!(Instant::now() < deadline, "only {} messages arrived", received);
        publisher.flush().unwrap();
        let message = match sub.recv_multipart() {
            Ok(message) => message,
            Err(e) if pose_stream::transport::zmtp::is_timeout(&e) => continue,
            Err(e) => panic!("receive failed: {}", e),
        };
        assert_eq!(message.len(), 2);
        assert_eq!(message[0], b"pose".to_vec());
        assert_eq!(message[1].len(), PAYLOAD);
        let fill = (received % 251) as u8;
        assert!(message[1].iter().all(|&b| b == fill));
        received += 1;
    }
    assert_eq!(publisher.queued_count(), 0);
}

#[test]
fn test_connect_without_subscriber_fails() {
    // bind then drop to get a port nobody listens on
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let mut publisher = Publisher::new(&AppConfig::default()).with_rig(StaticRig::new());
    publisher.set_endpoint("127.0.0.1", port).unwrap();
    assert!(matches!(publisher.initialize(), Err(Error::Io(_))));
    assert!(!publisher.is_active());
}
