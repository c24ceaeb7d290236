//! Proptest generators for property-based testing.

use proptest::prelude::*;
use serde_json::Value;

use claimvault_core::{EntityId, PartnerCode};
use claimvault_crypto::{ClaimPayload, ContentEncryption, PartnerSecretKey, SymmetricKey};

/// Generate a UUID-shaped entity id.
pub fn entity_id() -> impl Strategy<Value = EntityId> {
    "[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}"
        .prop_filter_map("valid entity id", |s| EntityId::new(s).ok())
}

/// Generate a two-letter partner code.
pub fn partner_code() -> impl Strategy<Value = PartnerCode> {
    "[A-Z]{2}".prop_filter_map("valid partner code", |s| PartnerCode::new(s).ok())
}

/// Generate a symmetric key.
pub fn symmetric_key() -> impl Strategy<Value = SymmetricKey> {
    any::<[u8; 32]>().prop_map(SymmetricKey::from_bytes)
}

/// Generate a partner key pair.
pub fn partner_secret_key() -> impl Strategy<Value = PartnerSecretKey> {
    any::<[u8; 32]>().prop_map(PartnerSecretKey::from_bytes)
}

/// Generate a content cipher.
pub fn content_encryption() -> impl Strategy<Value = ContentEncryption> {
    prop_oneof![
        Just(ContentEncryption::A256Gcm),
        Just(ContentEncryption::C20P),
    ]
}

/// Generate a JSON leaf value.
pub fn json_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        any::<f64>()
            .prop_filter("finite", |f| f.is_finite())
            .prop_map(Value::from),
        "[ -~]{0,40}".prop_map(Value::String),
    ]
}

/// Generate a JSON value nested at most `depth` levels.
pub fn json_value(depth: u32) -> impl Strategy<Value = Value> {
    json_leaf().prop_recursive(depth, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z_]{1,10}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

/// Generate a claim payload whose `id` is `id`.
pub fn claim_payload_for(id: EntityId) -> impl Strategy<Value = ClaimPayload> {
    prop::collection::btree_map("[a-z_]{1,12}", json_value(2), 0..8).prop_map(move |fields| {
        let mut payload: ClaimPayload = fields.into_iter().collect();
        payload.insert("id".to_string(), Value::String(id.to_string()));
        payload
    })
}

/// Generate an entity id together with a payload for it.
pub fn claim() -> impl Strategy<Value = (EntityId, ClaimPayload)> {
    entity_id().prop_flat_map(|id| (Just(id.clone()), claim_payload_for(id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimvault_crypto::payload_id;

    proptest! {
        #[test]
        fn test_generated_payload_carries_id((id, payload) in claim()) {
            prop_assert_eq!(payload_id(&payload).unwrap(), id.as_str());
        }

        #[test]
        fn test_generated_partner_codes_are_path_safe(code in partner_code()) {
            prop_assert_eq!(code.as_str().len(), 2);
        }
    }
}
