use std::io;
use std::sync::{Arc, Mutex};

use chain_pack::*;

/// Log sink shared between the subscriber and the test.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn with_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(move || writer.clone())
        .finish();
    let out = tracing::subscriber::with_default(subscriber, f);
    (out, captured.text())
}

fn handshake() -> P2PMessage {
    P2PMessage::Handshake(HandshakeMessage {
        network_version: 1206,
        chain_id: "aca376f206b8fc25a6ed44dbdc66547c36c6c33e3a119ffbeaef943642f0e906"
            .parse()
            .unwrap(),
        time: Tstamp::from_utc(1_527_000_000, 500).unwrap(),
        p2p_address: "peer.example:9876".to_string(),
        head_num: 12345,
        os: "linux".to_string(),
        agent: "\"test agent\"".to_string(),
        generation: 4,
        ..Default::default()
    })
}

#[test]
fn stream_of_envelopes() {
    let messages = vec![
        handshake(),
        P2PMessage::Time(TimeMessage::default()),
        P2PMessage::GoAway(GoAwayMessage {
            reason: GoAwayReason::Forked,
            node_id: Checksum256::default(),
        }),
    ];

    let mut out = wire::Writer::new();
    for msg in messages.iter() {
        to_writer(&P2PMessageEnvelope::from_message(msg.clone()).unwrap(), &mut out).unwrap();
    }
    let data = out.into_vec();

    let mut decoder = Decoder::new(&data);
    for msg in messages.iter() {
        let envelope: P2PMessageEnvelope = decoder.decode().unwrap();
        assert_eq!(envelope.message(), Some(msg));
        assert_eq!(envelope.length() as usize, envelope.payload().len() + 1);
    }
    decoder.finish().unwrap();
}

#[test]
fn mixed_known_and_unknown_without_resolution() {
    let mut out = wire::Writer::new();
    to_writer(&P2PMessageEnvelope::from_raw(77, vec![1, 2, 3]).unwrap(), &mut out).unwrap();
    to_writer(&P2PMessageEnvelope::from_message(handshake()).unwrap(), &mut out).unwrap();
    let data = out.into_vec();

    let mut decoder = Decoder::new(&data).resolve_messages(false);
    let mut first: P2PMessageEnvelope = decoder.decode().unwrap();
    let mut second: P2PMessageEnvelope = decoder.decode().unwrap();
    decoder.finish().unwrap();

    assert_eq!(first.type_tag(), 77);
    assert_eq!(first.payload(), &[1, 2, 3]);
    assert!(second.message().is_none());
    assert_eq!(second.message_type(), Some(P2PMessageType::Handshake));

    let registry = MessageRegistry::standard();
    assert_eq!(second.resolve(registry).unwrap(), &handshake());
    assert_eq!(
        first.resolve(registry),
        Err(Error::UnknownMessageType(77))
    );
}

#[test]
fn failed_envelope_leaves_decoder_in_place() {
    let mut out = wire::Writer::new();
    to_writer(&P2PMessageEnvelope::from_raw(99, vec![0xFF]).unwrap(), &mut out).unwrap();
    let data = out.into_vec();

    let mut decoder = Decoder::new(&data);
    assert_eq!(
        decoder.decode::<P2PMessageEnvelope>(),
        Err(Error::UnknownMessageType(99))
    );
    assert_eq!(decoder.position(), 0);
}

#[test]
fn trailing_payload_is_logged() {
    let mut payload = to_vec(&SyncRequestMessage {
        start_block: 1,
        end_block: 5,
    })
    .unwrap();
    payload.extend_from_slice(&[0, 0, 0]);
    let enc = to_vec(&P2PMessageEnvelope::from_raw(5, payload).unwrap()).unwrap();

    let (dec, logs) = with_logs(|| from_slice::<P2PMessageEnvelope>(&enc));
    let dec = dec.unwrap();
    assert_eq!(
        dec.message(),
        Some(&P2PMessage::SyncRequest(SyncRequestMessage {
            start_block: 1,
            end_block: 5,
        }))
    );
    assert!(logs.contains("trailing bytes"), "logs were: {}", logs);
    assert!(logs.contains("read p2p message envelope"), "logs were: {}", logs);
}

#[test]
fn human_readable_message() {
    let msg = handshake();
    let json = serde_json::to_value(&msg).unwrap();
    let inner = &json["Handshake"];
    assert_eq!(
        inner["chain_id"],
        "aca376f206b8fc25a6ed44dbdc66547c36c6c33e3a119ffbeaef943642f0e906"
    );
    assert_eq!(inner["network_version"], 1206);
    let back: P2PMessage = serde_json::from_value(json).unwrap();
    assert_eq!(back, msg);
}
