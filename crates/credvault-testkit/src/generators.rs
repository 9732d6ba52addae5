//! Proptest generators for property-based testing.

use proptest::prelude::*;

use credvault_core::{
    CertificateValue, CredentialValue, GenerationParameters, RsaValue, SshValue, UserValue,
};

/// Generate a normalized credential name of 1 to 4 segments.
pub fn credential_name() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z0-9][a-z0-9_-]{0,11}", 1..=4)
        .prop_map(|segments| format!("/{}", segments.join("/")))
}

/// Generate a non-empty secret string.
pub fn secret() -> impl Strategy<Value = String> {
    "[ -~]{1,64}".prop_map(String::from)
}

/// Generate three optional parts, at least one of them present.
fn some_parts() -> impl Strategy<Value = (Option<String>, Option<String>, Option<String>)> {
    (
        proptest::option::of(secret()),
        proptest::option::of(secret()),
        proptest::option::of(secret()),
    )
        .prop_filter("at least one part", |(a, b, c)| {
            a.is_some() || b.is_some() || c.is_some()
        })
}

/// Generate a certificate with any non-empty subset of its fields.
pub fn certificate_value() -> impl Strategy<Value = CertificateValue> {
    some_parts().prop_map(|(ca, certificate, private_key)| {
        CertificateValue::new(ca.as_deref(), certificate.as_deref(), private_key.as_deref())
    })
}

/// Generate an SSH key pair with at least one half present.
pub fn ssh_value() -> impl Strategy<Value = SshValue> {
    (proptest::option::of(secret()), proptest::option::of(secret()))
        .prop_filter("at least one key", |(public, private)| {
            public.is_some() || private.is_some()
        })
        .prop_map(|(public, private)| SshValue::new(public.as_deref(), private.as_deref()))
}

/// Generate an RSA key pair with at least one half present.
pub fn rsa_value() -> impl Strategy<Value = RsaValue> {
    (proptest::option::of(secret()), proptest::option::of(secret()))
        .prop_filter("at least one key", |(public, private)| {
            public.is_some() || private.is_some()
        })
        .prop_map(|(public, private)| RsaValue::new(public.as_deref(), private.as_deref()))
}

/// Generate a flat JSON object.
pub fn json_value() -> impl Strategy<Value = serde_json::Value> {
    prop::collection::btree_map("[a-z]{1,8}", secret(), 0..4).prop_map(|fields| {
        serde_json::Value::Object(
            fields
                .into_iter()
                .map(|(k, v)| (k, serde_json::Value::String(v)))
                .collect(),
        )
    })
}

/// Generate a valid value of any credential type.
pub fn credential_value() -> impl Strategy<Value = CredentialValue> {
    prop_oneof![
        secret().prop_map(CredentialValue::Value),
        secret().prop_map(CredentialValue::Password),
        certificate_value().prop_map(CredentialValue::Certificate),
        ssh_value().prop_map(CredentialValue::Ssh),
        rsa_value().prop_map(CredentialValue::Rsa),
        json_value().prop_map(CredentialValue::Json),
        (proptest::option::of("[a-z]{1,16}"), secret()).prop_map(|(username, password)| {
            CredentialValue::User(UserValue::new(username.as_deref(), &password))
        }),
    ]
}

/// Generate valid password generation parameters.
pub fn generation_parameters() -> impl Strategy<Value = GenerationParameters> {
    (
        GenerationParameters::MIN_LENGTH..=GenerationParameters::MAX_LENGTH,
        any::<[bool; 4]>(),
    )
        .prop_filter("at least one character class", |(_, flags)| {
            !(flags[0] && flags[1] && flags[2]) || flags[3]
        })
        .prop_map(|(length, flags)| GenerationParameters {
            length,
            exclude_upper: flags[0],
            exclude_lower: flags[1],
            exclude_number: flags[2],
            include_special: flags[3],
        })
}

/// Parameters for writing one credential.
#[derive(Debug, Clone)]
pub struct WriteParams {
    pub name: String,
    pub value: CredentialValue,
}

impl Arbitrary for WriteParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (credential_name(), credential_value())
            .prop_map(|(name, value)| WriteParams { name, value })
            .boxed()
    }
}
