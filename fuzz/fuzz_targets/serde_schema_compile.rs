#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(schema) = serde_json::from_slice::<jsonshape::SerdeSchema>(data) {
        let _ = schema.compile(&jsonshape::Hooks::with_builtins());
    }
});
