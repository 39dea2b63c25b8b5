//! Control-channel text encoding.
//!
//! FTP path names travel as raw bytes and plenty of servers in the wild use
//! legacy encodings (GBK in particular). Every command and reply passes
//! through a configurable codec so non-UTF-8 names round-trip intact.

use crate::ftp::error::{FtpError, FtpResult};
use encoding_rs::Encoding;

/// Encoder/decoder for one configured control-channel encoding.
#[derive(Debug, Clone, Copy)]
pub struct TextCodec {
    encoding: &'static Encoding,
}

impl TextCodec {
    /// Resolve an encoding label ("utf-8", "gbk", "latin1", ...).
    ///
    /// Fails fast with `InvalidConfig` so a typo in the configuration is
    /// caught before any connection is attempted.
    pub fn for_label(label: &str) -> FtpResult<Self> {
        Encoding::for_label(label.trim().as_bytes())
            .map(|encoding| Self { encoding })
            .ok_or_else(|| FtpError::invalid_config(format!("Unsupported encoding: {label}")))
    }

    /// Canonical name of the resolved encoding (e.g. "GBK").
    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }

    /// Encode a command line for the wire.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        let (bytes, _, _) = self.encoding.encode(text);
        bytes.into_owned()
    }

    /// Decode bytes from the wire, replacing malformed sequences.
    pub fn decode(&self, bytes: &[u8]) -> String {
        let (text, _, _) = self.encoding.decode(bytes);
        text.into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gbk_round_trip() {
        let codec = TextCodec::for_label("gbk").unwrap();
        assert_eq!(codec.name(), "GBK");
        let bytes = codec.encode("STOR 文件.txt");
        // GBK encodes the two han characters in two bytes each.
        assert_ne!(bytes, "STOR 文件.txt".as_bytes());
        assert_eq!(codec.decode(&bytes), "STOR 文件.txt");
    }

    #[test]
    fn utf8_is_identity() {
        let codec = TextCodec::for_label("utf-8").unwrap();
        assert_eq!(codec.encode("RETR a.txt"), b"RETR a.txt");
    }

    #[test]
    fn unknown_label_rejected() {
        assert!(TextCodec::for_label("no-such-charset").is_err());
    }
}
