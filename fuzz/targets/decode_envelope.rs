#![no_main]

use arbitrary::Arbitrary;
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use trigger_hub::pubsub::codec::{decode, decode_inbound, encode};

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    data: Vec<u8>,
}

fuzz_target!(|input: FuzzInput| {
    let bytes = Bytes::from(input.data);

    let decoded = decode(&bytes);
    let (envelope, foreign) = decode_inbound(bytes.clone());
    assert_eq!(decoded.is_err(), foreign);

    if foreign {
        // Чужие байты доставляются как есть.
        assert_eq!(envelope.payload, trigger_hub::Payload::Bytes(bytes));
        return;
    }

    // Разобранный конверт кодируется обратно и читается так же.
    let Ok(encoded) = encode(&envelope) else {
        return;
    };
    if let Ok(again) = decode(&encoded) {
        assert_eq!(again.origin, envelope.origin);
        assert_eq!(again.payload.kind(), envelope.payload.kind());
    }
});
