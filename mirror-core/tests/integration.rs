//! Integration tests: full receiver lifecycle over real TCP and UDP
//! sockets on localhost.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mirror_core::{
    ChannelSink, DeviceInfo, MirrorReceiver, ReceiverConfig, ReceiverEvent, ReceiverStatus,
    SessionKey, StartReport, VideoFrame,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::mpsc;

const TIMEOUT: Duration = Duration::from_secs(5);

// ── Helpers ──────────────────────────────────────────────────────

async fn started() -> (MirrorReceiver, StartReport, mpsc::Receiver<VideoFrame>) {
    let (sink, frames) = ChannelSink::new(16);
    let config = ReceiverConfig {
        device: DeviceInfo::named("Integration").with_raw_id("0123456789ab"),
        ..ReceiverConfig::ephemeral()
    };
    let receiver = MirrorReceiver::new(config).with_sink(Arc::new(sink));
    let report = receiver.start().await.unwrap();
    (receiver, report, frames)
}

fn local(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

async fn connect(report: &StartReport) -> TcpStream {
    TcpStream::connect(local(report.control_port)).await.unwrap()
}

/// Read one response: headers up to the blank line plus any
/// `Content-Length` body.
async fn read_response(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    tokio::time::timeout(TIMEOUT, async {
        while !buf.ends_with(b"\r\n\r\n") {
            let n = stream.read(&mut byte).await.unwrap();
            assert_ne!(n, 0, "connection closed mid-response");
            buf.push(byte[0]);
        }
    })
    .await
    .expect("timeout reading response head");

    let head = String::from_utf8(buf).unwrap();
    let len = head
        .lines()
        .find_map(|l| l.strip_prefix("Content-Length: "))
        .map(|v| v.trim().parse::<usize>().unwrap())
        .unwrap_or(0);
    let mut body = vec![0u8; len];
    stream.read_exact(&mut body).await.unwrap();
    head + &String::from_utf8(body).unwrap()
}

async fn request(stream: &mut TcpStream, raw: &str) -> String {
    stream.write_all(raw.as_bytes()).await.unwrap();
    read_response(stream).await
}

fn header<'a>(response: &'a str, name: &str) -> Option<&'a str> {
    response.lines().find_map(|l| {
        let (n, v) = l.split_once(':')?;
        n.eq_ignore_ascii_case(name).then(|| v.trim())
    })
}

// ── Control plane ────────────────────────────────────────────────

#[tokio::test]
async fn test_cseq_is_echoed() {
    let (receiver, report, _frames) = started().await;
    let mut client = connect(&report).await;

    let resp = request(&mut client, "OPTIONS * RTSP/1.0\r\nCSeq: 17\r\n\r\n").await;
    assert!(resp.starts_with("RTSP/1.0 200 OK\r\n"));
    assert_eq!(header(&resp, "CSeq"), Some("17"));
    assert!(header(&resp, "Public").unwrap().contains("TEARDOWN"));

    let resp = request(&mut client, "ANNOUNCE rtsp://x/1 RTSP/1.0\r\nCSeq: 18\r\n\r\n").await;
    assert_eq!(header(&resp, "CSeq"), Some("18"));

    receiver.stop().await.unwrap();
}

#[tokio::test]
async fn test_setup_reports_data_ports() {
    let (receiver, report, _frames) = started().await;
    let mut client = connect(&report).await;

    let resp = request(
        &mut client,
        "SETUP rtsp://x/1 RTSP/1.0\r\nCSeq: 2\r\nTransport: RTP/AVP/UDP;unicast\r\n\r\n",
    )
    .await;
    let expected = format!(
        "RTP/AVP/UDP;unicast;server_port={}-{}",
        report.channels.video_data, report.channels.video_control
    );
    assert_eq!(header(&resp, "Transport"), Some(expected.as_str()));
    assert_eq!(header(&resp, "Session"), Some("1"));

    receiver.stop().await.unwrap();
}

#[tokio::test]
async fn test_body_is_consumed_before_next_request() {
    let (receiver, report, _frames) = started().await;
    let mut client = connect(&report).await;

    let sdp = "v=0\r\no=- 0 0 IN IP4 127.0.0.1\r\n";
    let raw = format!(
        "ANNOUNCE * RTSP/1.0\r\nCSeq: 1\r\nContent-Length: {}\r\n\r\n{sdp}RECORD * RTSP/1.0\r\nCSeq: 2\r\n\r\n",
        sdp.len()
    );
    client.write_all(raw.as_bytes()).await.unwrap();
    assert_eq!(header(&read_response(&mut client).await, "CSeq"), Some("1"));
    let record = read_response(&mut client).await;
    assert_eq!(header(&record, "CSeq"), Some("2"));
    assert_eq!(header(&record, "Audio-Latency"), Some("0"));

    receiver.stop().await.unwrap();
}

#[tokio::test]
async fn test_teardown_closes_connection() {
    let (receiver, report, _frames) = started().await;
    let mut client = connect(&report).await;

    let resp = request(&mut client, "TEARDOWN * RTSP/1.0\r\nCSeq: 9\r\n\r\n").await;
    assert_eq!(header(&resp, "Connection"), Some("close"));

    let mut rest = [0u8; 16];
    let n = tokio::time::timeout(TIMEOUT, client.read(&mut rest))
        .await
        .expect("connection left open")
        .unwrap_or(0);
    assert_eq!(n, 0);

    receiver.stop().await.unwrap();
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let (receiver, report, _frames) = started().await;
    let mut a = connect(&report).await;
    let mut b = connect(&report).await;

    let ra = request(&mut a, "OPTIONS * RTSP/1.0\r\nCSeq: 100\r\n\r\n").await;
    let rb = request(&mut b, "OPTIONS * RTSP/1.0\r\nCSeq: 200\r\n\r\n").await;
    assert_eq!(header(&ra, "CSeq"), Some("100"));
    assert_eq!(header(&rb, "CSeq"), Some("200"));

    // Garbage on one session leaves the other untouched.
    a.write_all(b"   \r\n\r\n").await.unwrap();
    let rb = request(&mut b, "FLUSH * RTSP/1.0\r\nCSeq: 201\r\n\r\n").await;
    assert_eq!(header(&rb, "CSeq"), Some("201"));
    let ra = request(&mut a, "FLUSH * RTSP/1.0\r\nCSeq: 101\r\n\r\n").await;
    assert_eq!(header(&ra, "CSeq"), Some("101"));

    receiver.stop().await.unwrap();
}

#[tokio::test]
async fn test_server_info() {
    let (receiver, report, _frames) = started().await;
    let mut client = connect(&report).await;

    let resp = request(&mut client, "GET /server-info HTTP/1.1\r\nHost: tv\r\n\r\n").await;
    assert!(resp.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(header(&resp, "Content-Type"), Some("text/x-apple-plist+xml"));
    assert!(resp.contains("<string>01:23:45:67:89:AB</string>"));

    let resp = request(&mut client, "POST /fp-setup HTTP/1.1\r\n\r\n").await;
    assert_eq!(resp, "HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");

    receiver.stop().await.unwrap();
}

#[tokio::test]
async fn test_status_follows_setup_and_teardown() {
    let (receiver, report, _frames) = started().await;
    let mut status = receiver.status();
    let mut events = receiver.subscribe();
    assert_eq!(*status.borrow(), ReceiverStatus::Waiting);

    let mut client = connect(&report).await;
    let local_addr = client.local_addr().unwrap();
    request(&mut client, "SETUP * RTSP/1.0\r\nCSeq: 1\r\n\r\n").await;

    tokio::time::timeout(TIMEOUT, status.wait_for(ReceiverStatus::is_connected))
        .await
        .expect("never connected")
        .unwrap();
    match events.recv().await.unwrap() {
        ReceiverEvent::Connected { peer, .. } => assert_eq!(peer, local_addr),
        other => panic!("unexpected event {other:?}"),
    }

    request(&mut client, "TEARDOWN * RTSP/1.0\r\nCSeq: 2\r\n\r\n").await;
    tokio::time::timeout(TIMEOUT, status.wait_for(|s| !s.is_connected()))
        .await
        .expect("never returned to waiting")
        .unwrap();
    assert!(matches!(
        events.recv().await.unwrap(),
        ReceiverEvent::Disconnected { .. }
    ));

    receiver.stop().await.unwrap();
}

// ── Data plane ───────────────────────────────────────────────────

#[tokio::test]
async fn test_time_sync_reply() {
    let (receiver, report, _frames) = started().await;
    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let control = local(report.channels.video_control);

    client.send_to(&[0xAA; 31], control).await.unwrap();
    let mut probe = [0u8; 32];
    probe[..4].copy_from_slice(&[0x80, 0xD2, 0x00, 0x07]);
    client.send_to(&probe, control).await.unwrap();

    let mut buf = [0u8; 64];
    let (n, from) = tokio::time::timeout(TIMEOUT, client.recv_from(&mut buf))
        .await
        .expect("no time-sync reply")
        .unwrap();
    assert_eq!(n, 32);
    assert_eq!(from, control);
    assert_eq!(&buf[..4], &probe[..4]);
    assert_ne!(&buf[16..24], &[0u8; 8]);
    assert_eq!(&buf[16..24], &buf[24..32]);
    assert_eq!(receiver.stats().short_probes, 1);

    receiver.stop().await.unwrap();
}

#[tokio::test]
async fn test_video_payload_reaches_sink() {
    let (receiver, report, mut frames) = started().await;
    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let video = local(report.channels.video_data);

    let mut runt = [0u8; 12];
    runt[0] = 0x80;
    client.send_to(&runt, video).await.unwrap();
    let mut datagram = [0u8; 13];
    datagram[0] = 0x80;
    datagram[2..4].copy_from_slice(&42u16.to_be_bytes());
    datagram[12] = 0x67;
    client.send_to(&datagram, video).await.unwrap();

    let frame = tokio::time::timeout(TIMEOUT, frames.recv())
        .await
        .expect("no frame forwarded")
        .unwrap();
    assert_eq!(&frame.payload[..], &[0x67]);
    assert_eq!(frame.header.sequence, 42);
    assert_eq!(receiver.stats().runt_datagrams, 1);

    receiver.stop().await.unwrap();
}

#[tokio::test]
async fn test_encrypted_video_is_decrypted() {
    use aes::Aes128;
    use cbc::cipher::{BlockEncryptMut, KeyIvInit, block_padding::NoPadding};

    let (receiver, report, mut frames) = started().await;
    let key = [0x11u8; 16];
    receiver.set_session_key(SessionKey::from_bytes(&key).unwrap());

    let plain = [0x42u8; 32];
    let cipher = cbc::Encryptor::<Aes128>::new_from_slices(&key, &[0u8; 16])
        .unwrap()
        .encrypt_padded_vec_mut::<NoPadding>(&plain);

    let mut datagram = vec![0x80u8; 12];
    datagram.extend_from_slice(&cipher);
    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client
        .send_to(&datagram, local(report.channels.video_data))
        .await
        .unwrap();

    let frame = tokio::time::timeout(TIMEOUT, frames.recv())
        .await
        .expect("no frame forwarded")
        .unwrap();
    assert_eq!(&frame.payload[..], &plain);

    receiver.stop().await.unwrap();
}

// ── Lifecycle ────────────────────────────────────────────────────

#[tokio::test]
async fn test_stop_releases_every_port() {
    let (receiver, report, _frames) = started().await;
    let mut client = connect(&report).await;
    request(&mut client, "SETUP * RTSP/1.0\r\nCSeq: 1\r\n\r\n").await;

    tokio::time::timeout(TIMEOUT, receiver.stop())
        .await
        .expect("stop hung")
        .unwrap();
    receiver.stop().await.unwrap();
    assert_eq!(*receiver.status().borrow(), ReceiverStatus::Waiting);

    let mut rest = [0u8; 8];
    assert_eq!(client.read(&mut rest).await.unwrap_or(0), 0);

    TcpListener::bind(local(report.control_port)).await.unwrap();
    for port in [
        report.channels.video_data,
        report.channels.video_control,
        report.channels.audio_data,
        report.channels.audio_control,
    ] {
        UdpSocket::bind(local(port)).await.unwrap();
    }
}

#[tokio::test]
async fn test_stop_with_unread_replies() {
    let (receiver, report, _frames) = started().await;
    let client = connect(&report).await;

    // Pipeline requests and never read a reply, until the kernel buffers
    // fill and the session blocks writing.
    let batch = "OPTIONS * RTSP/1.0\r\nCSeq: 1\r\n\r\n".repeat(1000);
    let flood = tokio::spawn(async move {
        let mut client = client;
        while client.write_all(batch.as_bytes()).await.is_ok() {}
    });
    tokio::time::sleep(Duration::from_millis(500)).await;

    tokio::time::timeout(TIMEOUT, receiver.stop())
        .await
        .expect("stop hung on a session blocked writing")
        .unwrap();
    assert_eq!(*receiver.status().borrow(), ReceiverStatus::Waiting);
    flood.abort();
}
