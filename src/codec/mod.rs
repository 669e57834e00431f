//! Wire codecs for the LWM2M TLV and plain-text media types. Codec
//! selection by path shape and content format lives in
//! [`crate::router`]; this module only holds the encode/decode pairs
//! themselves.

pub mod text;
pub mod tlv;
