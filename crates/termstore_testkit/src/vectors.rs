//! Golden encoding vectors.
//!
//! These vectors pin the exact byte layout of the term codec. Any change to
//! them is a change of the on-disk key format.

use serde::{Deserialize, Serialize};
use termstore_codec::CodecError;
use termstore_core::Term;

/// A term together with its expected encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingVector {
    /// Unique identifier for this vector.
    pub id: String,
    /// Human-readable description.
    pub description: String,
    /// Input term.
    pub term: Term,
    /// Expected `encode` output (hex).
    pub expected_hex: String,
    /// Expected `encode_prefix` output (hex), when it differs from `expected_hex`.
    pub prefix_hex: Option<String>,
}

/// Bytes that must fail to decode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodeErrorVector {
    /// Unique identifier for this vector.
    pub id: String,
    /// Human-readable description.
    pub description: String,
    /// Input data (hex-encoded).
    pub input_hex: String,
    /// Expected error kind, see [`error_kind`].
    pub expected_error: String,
}

fn vector(id: &str, description: &str, term: Term, expected_hex: &str) -> EncodingVector {
    EncodingVector {
        id: id.into(),
        description: description.into(),
        term,
        expected_hex: expected_hex.into(),
        prefix_hex: None,
    }
}

fn prefixed(mut v: EncodingVector, prefix_hex: &str) -> EncodingVector {
    v.prefix_hex = Some(prefix_hex.into());
    v
}

/// Term encoding test vectors.
pub fn encoding_vectors() -> Vec<EncodingVector> {
    vec![
        vector("int_zero", "integer 0", Term::Integer(0), "108000000000000000"),
        vector("int_one", "integer 1", Term::Integer(1), "108000000000000001"),
        vector("int_neg_one", "integer -1", Term::Integer(-1), "107fffffffffffffff"),
        vector("int_min", "smallest integer", Term::Integer(i64::MIN), "100000000000000000"),
        vector("int_max", "largest integer", Term::Integer(i64::MAX), "10ffffffffffffffff"),
        vector("float_one", "float 1.0", Term::Float(1.0), "20bff0000000000000"),
        vector("float_neg_one", "float -1.0", Term::Float(-1.0), "20400fffffffffffff"),
        vector("float_neg_half", "float -0.5", Term::Float(-0.5), "20401fffffffffffff"),
        vector("float_zero", "float 0.0", Term::Float(0.0), "208000000000000000"),
        vector("float_neg_zero", "float -0.0 sorts below 0.0", Term::Float(-0.0), "207fffffffffffffff"),
        vector("atom_ok", "atom ok", Term::atom("ok"), "306f6b0000"),
        vector("atom_empty", "empty atom", Term::atom(""), "300000"),
        prefixed(
            vector("binary_a1", "binary \"a1\"", Term::from("a1"), "4061310000"),
            "406131",
        ),
        prefixed(
            vector("binary_a", "binary \"a\" is a prefix of \"a1\"", Term::from("a"), "40610000"),
            "4061",
        ),
        vector(
            "binary_escapes",
            "binary 00 FE FF is escaped",
            Term::binary(vec![0x00, 0xFE, 0xFF]),
            "4000fffe01fe020000",
        ),
        prefixed(
            vector(
                "tuple_feed_seq",
                "tuple {feed, 7}",
                Term::tuple([Term::atom("feed"), Term::Integer(7)]),
                "503066656564000010800000000000000700",
            ),
            "5030666565640000108000000000000007",
        ),
        prefixed(
            vector("tuple_feed", "tuple {feed}", Term::tuple([Term::atom("feed")]), "503066656564000000"),
            "5030666565640000",
        ),
        prefixed(vector("list_empty", "empty list", Term::list([]), "6000"), "60"),
        vector(
            "list_nested",
            "list [{}, <<>>]",
            Term::list([Term::tuple([]), Term::binary(Vec::new())]),
            "60500040000000",
        ),
        vector(
            "map_sorted",
            "map pairs are written in key order",
            Term::Map(vec![
                (Term::atom("b"), Term::Integer(1)),
                (Term::atom("a"), Term::Integer(2)),
            ]),
            "70306100001080000000000000023062000010800000000000000100",
        ),
    ]
}

/// Decoding failure vectors.
pub fn decode_error_vectors() -> Vec<DecodeErrorVector> {
    let v = |id: &str, description: &str, input_hex: &str, expected_error: &str| DecodeErrorVector {
        id: id.into(),
        description: description.into(),
        input_hex: input_hex.into(),
        expected_error: expected_error.into(),
    };
    vec![
        v("empty", "no bytes", "", "unexpected_eof"),
        v("truncated_int", "integer cut short", "1080", "unexpected_eof"),
        v("unknown_tag", "tag 0x99", "99", "unknown_tag"),
        v("bad_nul_escape", "00 followed by 07", "400007", "invalid_escape"),
        v("raw_ff", "unescaped FF in a binary", "40ff0000", "invalid_escape"),
        v("bad_utf8", "atom with invalid UTF-8", "30c3280000", "invalid_utf8"),
        v("trailing", "bytes after a complete term", "10800000000000000001", "trailing_bytes"),
        v(
            "unsorted_map",
            "map keys out of order",
            "70306200001080000000000000013061000010800000000000000200",
            "non_canonical",
        ),
    ]
}

/// Short name of a codec error kind, as used in [`DecodeErrorVector`].
pub fn error_kind(err: &CodecError) -> &'static str {
    match err {
        CodecError::NaNForbidden => "nan_forbidden",
        CodecError::AtomTooLong { .. } => "atom_too_long",
        CodecError::DuplicateMapKey { .. } => "duplicate_map_key",
        CodecError::DepthLimitExceeded { .. } => "depth_limit_exceeded",
        CodecError::UnexpectedEof { .. } => "unexpected_eof",
        CodecError::UnknownTag { .. } => "unknown_tag",
        CodecError::InvalidEscape { .. } => "invalid_escape",
        CodecError::InvalidUtf8 { .. } => "invalid_utf8",
        CodecError::TrailingBytes { .. } => "trailing_bytes",
        CodecError::NonCanonical { .. } => "non_canonical",
    }
}

/// Encodes bytes as lowercase hex.
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Decodes a hex string. Panics on malformed input.
pub fn hex_decode(hex: &str) -> Vec<u8> {
    assert!(hex.len() % 2 == 0, "odd-length hex string: {hex}");
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).expect("Invalid hex digit"))
        .collect()
}

/// All vectors as JSON, for other implementations of the format.
pub fn all_vectors_json() -> String {
    let vectors = AllTestVectors {
        encoding: encoding_vectors(),
        decode_errors: decode_error_vectors(),
    };

    serde_json::to_string_pretty(&vectors).expect("Failed to serialize vectors")
}

#[derive(Debug, Serialize, Deserialize)]
struct AllTestVectors {
    encoding: Vec<EncodingVector>,
    decode_errors: Vec<DecodeErrorVector>,
}
