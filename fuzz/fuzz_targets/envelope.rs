#![no_main]
use chain_pack::{from_slice, to_vec, P2PMessageEnvelope};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(envelope) = from_slice::<P2PMessageEnvelope>(data) {
        // A decoded envelope re-encodes to exactly the bytes it came from
        let enc = to_vec(&envelope).expect("decoded envelope should re-encode");
        assert_eq!(&enc[..], data);
    }
});
