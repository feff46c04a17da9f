//! Canonical sign-doc construction.
//!
//! Rebuilds the exact bytes a wallet signs for an arbitrary-message amino
//! sign doc: one message whose value carries the signer address and the
//! pretty-printed request `data`, zero fee, zero account and sequence
//! numbers, empty memo. Field order and whitespace are part of the
//! signature, so nothing here may depend on map iteration order.

use super::verify::{derive_address, VerifyError};
use crate::models::AuthClaim;
use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter};
use serde_json::{Map, Value};
use std::io;

// Struct fields are declared in lexicographic order: serde emits them in
// declaration order, which gives the sorted-key encoding amino expects.

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StdSignDoc {
    pub account_number: String,
    pub chain_id: String,
    pub fee: StdFee,
    pub memo: String,
    pub msgs: Vec<AminoMsg>,
    pub sequence: String,
}

impl StdSignDoc {
    /// Address of the single signer, as embedded in the message.
    pub fn signer(&self) -> &str {
        self.msgs
            .first()
            .map(|msg| msg.value.signer.as_str())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StdFee {
    pub amount: Vec<Coin>,
    pub gas: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Coin {
    pub amount: String,
    pub denom: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AminoMsg {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: SignedData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedData {
    pub data: String,
    pub signer: String,
}

/// Pretty-print `data` with 2-space indentation, keys in received order.
///
/// Numbers are written the way a browser wallet's `JSON.stringify` writes
/// them: every number is an IEEE double, `-0` prints as `0`, and exponent
/// form is used only outside `1e-7 < |x| < 1e21`.
pub fn pretty_data(data: &Map<String, Value>) -> Result<String, VerifyError> {
    let mut out = Vec::with_capacity(256);
    let mut ser = serde_json::Serializer::with_formatter(&mut out, WalletFormatter::default());
    data.serialize(&mut ser)?;
    String::from_utf8(out)
        .map_err(|e| VerifyError::Serialization(serde::ser::Error::custom(e)))
}

/// Pretty formatter with ECMAScript number output.
#[derive(Default)]
struct WalletFormatter {
    pretty: PrettyFormatter<'static>,
}

impl Formatter for WalletFormatter {
    fn write_i64<W: ?Sized + io::Write>(&mut self, writer: &mut W, value: i64) -> io::Result<()> {
        writer.write_all(js_number(value as f64).as_bytes())
    }

    fn write_u64<W: ?Sized + io::Write>(&mut self, writer: &mut W, value: u64) -> io::Result<()> {
        writer.write_all(js_number(value as f64).as_bytes())
    }

    fn write_f64<W: ?Sized + io::Write>(&mut self, writer: &mut W, value: f64) -> io::Result<()> {
        writer.write_all(js_number(value).as_bytes())
    }

    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.pretty.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.pretty.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_object_value(writer)
    }
}

/// ECMAScript `Number::toString` for a double.
fn js_number(value: f64) -> String {
    if !value.is_finite() {
        return "null".to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    // `{:e}` yields the shortest round-tripping digits, e.g. `1.25e-7`
    let sci = format!("{:e}", value.abs());
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let k = digits.len() as i32;
    let n = exponent.parse::<i32>().unwrap_or(0) + 1;

    let mut out = String::with_capacity(k as usize + 8);
    if value < 0.0 {
        out.push('-');
    }
    if k <= n && n <= 21 {
        out.push_str(&digits);
        out.push_str(&"0".repeat((n - k) as usize));
    } else if 0 < n && n <= 21 {
        out.push_str(&digits[..n as usize]);
        out.push('.');
        out.push_str(&digits[n as usize..]);
    } else if -6 < n && n <= 0 {
        out.push_str("0.");
        out.push_str(&"0".repeat(-n as usize));
        out.push_str(&digits);
    } else {
        out.push_str(&digits[..1]);
        if k > 1 {
            out.push('.');
            out.push_str(&digits[1..]);
        }
        let e = n - 1;
        out.push('e');
        out.push(if e < 0 { '-' } else { '+' });
        out.push_str(&e.abs().to_string());
    }
    out
}

/// Assemble the sign doc for `data`, whose `auth` field parsed to `claim`.
pub fn build_sign_doc(
    data: &Map<String, Value>,
    claim: &AuthClaim,
) -> Result<StdSignDoc, VerifyError> {
    let signer = derive_address(&claim.public_key, &claim.chain_bech32_prefix)?;

    Ok(StdSignDoc {
        account_number: "0".to_string(),
        chain_id: claim.chain_id.clone(),
        fee: StdFee {
            amount: vec![Coin {
                amount: "0".to_string(),
                denom: claim.chain_fee_denom.clone(),
            }],
            gas: "0".to_string(),
        },
        memo: String::new(),
        msgs: vec![AminoMsg {
            kind: claim.kind.clone(),
            value: SignedData {
                data: pretty_data(data)?,
                signer,
            },
        }],
        sequence: "0".to_string(),
    })
}

/// Compact sorted-key JSON with `&`, `<` and `>` escaped as unicode.
pub fn serialize_sign_doc(doc: &StdSignDoc) -> Result<Vec<u8>, VerifyError> {
    let json = serde_json::to_string(doc)?;
    Ok(escape_html(&json).into_bytes())
}

/// The byte sequence the wallet must have signed for this request.
pub fn canonical_message(
    data: &Map<String, Value>,
    claim: &AuthClaim,
) -> Result<Vec<u8>, VerifyError> {
    serialize_sign_doc(&build_sign_doc(data, claim)?)
}

fn escape_html(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '&' => out.push_str("\\u0026"),
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            c => out.push(c),
        }
    }
    out
}
