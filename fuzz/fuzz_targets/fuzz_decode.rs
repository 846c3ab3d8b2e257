#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // The wire types alone, including serde_json's UTF-8 validation.
    let _ = serde_json::from_slice::<hippo_client::protocol::ServerMessage>(data);

    // The full decode path the session runs on every inbound frame.
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(event) = hippo_client::codec::decode(text) {
            let mut store = hippo_client::GameStore::new();
            let _ = store.apply(event);
        }
    }
});
