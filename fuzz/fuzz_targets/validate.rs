#![no_main]
use jsonshape::{serialize, CompiledSchema, Hooks, SerdeSchema, SerializeOptions, ValidateOptions};
use libfuzzer_sys::fuzz_target;
use serde_json::json;
use std::sync::OnceLock;

fn schema() -> &'static CompiledSchema {
    static SCHEMA: OnceLock<CompiledSchema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        serde_json::from_value::<SerdeSchema>(json!({
            "definitions": {
                "NetworkDevice": {
                    "fields": {
                        "hostname": {"schema": {"type": "string", "minLength": 1}},
                        "role": {"before": ["singleton_to_list"], "schema": {"elements": {"type": "string"}}},
                        "addr": {
                            "optional": true,
                            "schema": {"anyOf": [
                                {"type": "string", "format": "ipv4_interface"},
                                {"elements": {"type": "string", "format": "ipv4_interface"}},
                                {"enum": [""]},
                            ]},
                        },
                        "mac": {"optional": true, "after": ["mac_address"], "schema": {"type": "string"}},
                    }
                },
                "Switch": {
                    "extends": "NetworkDevice",
                    "fields": {"id": {"alias": "instance-id", "serializer": "int_as_string", "schema": {"type": "uint32"}}},
                },
            },
            "root": {"routed": {"prefixes": {"rtr": "NetworkDevice", "switch": "Switch"}, "mode": "partial"}},
        }))
        .unwrap()
        .compile(&Hooks::with_builtins())
        .unwrap()
    })
}

fuzz_target!(|data: &[u8]| {
    if let Ok(instance) = serde_json::from_slice(data) {
        let validation = schema().validate(&instance, ValidateOptions::new());
        assert_eq!(validation.value.is_some(), validation.report.is_empty());

        if let Some(value) = validation.value {
            let _ = serialize(&value, &SerializeOptions::new().with_alias(true));
        }
    }
});
