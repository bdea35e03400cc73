// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use anyhow::{Context as _, bail};
use base64::{Engine as _, prelude::BASE64_STANDARD};
use cid::Cid;
use ipld_core::ipld::Ipld;
use multihash_codetable::{Code, MultihashDigest as _};

/// Multicodec of opaque binary blocks.
pub const RAW: u64 = 0x55;

/// Computes a 256 bit BLAKE2b digest.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut out = [0; 32];
    let hash = Code::Blake2b256.digest(data);
    out.copy_from_slice(hash.digest());
    out
}

/// Default CID builder for Filecoin: `dag-cbor` codec with a 256 bit BLAKE2b hash.
pub fn cid_from_cbor<S: serde::Serialize>(obj: &S) -> anyhow::Result<Cid> {
    let bytes = fvm_ipld_encoding::to_vec(obj)?;
    Ok(Cid::new_v1(
        fvm_ipld_encoding::DAG_CBOR,
        Code::Blake2b256.digest(&bytes),
    ))
}

/// CID of an opaque blob under the raw codec.
pub fn raw_cid(bytes: &[u8]) -> Cid {
    Cid::new_v1(RAW, Code::Blake2b256.digest(bytes))
}

/// Reads the element count from the header of a CBOR array. Versioned
/// actor structures are tuples, so the arity identifies the layout.
pub fn cbor_array_len(bytes: &[u8]) -> anyhow::Result<u64> {
    let (&first, rest) = bytes.split_first().context("empty CBOR input")?;
    if first >> 5 != 4 {
        bail!("expected CBOR array, found major type {}", first >> 5);
    }
    let width = match first & 0x1f {
        n @ 0..=23 => return Ok(u64::from(n)),
        24 => 1,
        25 => 2,
        26 => 4,
        27 => 8,
        other => bail!("unsupported CBOR array length encoding {other}"),
    };
    let len_bytes = rest.get(..width).context("truncated CBOR array header")?;
    Ok(len_bytes
        .iter()
        .fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
}

/// Renders an IPLD value in the `dag-json` style, with links as
/// `{"/": cid}` and bytes as `{"/": {"bytes": base64}}`.
pub fn ipld_to_json(ipld: &Ipld) -> serde_json::Value {
    use serde_json::{Value, json};
    match ipld {
        Ipld::Null => Value::Null,
        Ipld::Bool(b) => Value::Bool(*b),
        Ipld::Integer(i) => match i64::try_from(*i) {
            Ok(i) => json!(i),
            Err(_) => Value::String(i.to_string()),
        },
        Ipld::Float(f) => json!(f),
        Ipld::String(s) => Value::String(s.clone()),
        Ipld::Bytes(b) => json!({ "/": { "bytes": BASE64_STANDARD.encode(b) } }),
        Ipld::List(items) => Value::Array(items.iter().map(ipld_to_json).collect()),
        Ipld::Map(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), ipld_to_json(v)))
                .collect(),
        ),
        Ipld::Link(cid) => json!({ "/": cid.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fvm_ipld_encoding::tuple::*;
    use rstest::rstest;

    #[derive(Serialize_tuple, Deserialize_tuple)]
    struct Pair {
        a: u64,
        b: String,
    }

    #[rstest]
    #[case(vec![0u64; 3], 3)]
    #[case(vec![0u64; 24], 24)]
    #[case(vec![0u64; 300], 300)]
    fn array_len_matches_encoding(#[case] items: Vec<u64>, #[case] expected: u64) {
        let bytes = fvm_ipld_encoding::to_vec(&items).unwrap();
        assert_eq!(cbor_array_len(&bytes).unwrap(), expected);
    }

    #[test]
    fn array_len_of_tuple_struct() {
        let bytes = fvm_ipld_encoding::to_vec(&Pair {
            a: 1,
            b: "x".into(),
        })
        .unwrap();
        assert_eq!(cbor_array_len(&bytes).unwrap(), 2);
    }

    #[test]
    fn array_len_rejects_non_arrays() {
        let bytes = fvm_ipld_encoding::to_vec(&7u64).unwrap();
        assert!(cbor_array_len(&bytes).is_err());
        assert!(cbor_array_len(&[]).is_err());
    }

    #[test]
    fn json_rendering_of_links_and_bytes() {
        let cid = raw_cid(b"hello");
        let ipld = Ipld::List(vec![Ipld::Link(cid), Ipld::Bytes(vec![1, 2])]);
        let json = ipld_to_json(&ipld);
        assert_eq!(json[0]["/"], serde_json::json!(cid.to_string()));
        assert_eq!(json[1]["/"]["bytes"], serde_json::json!("AQI="));
    }
}
