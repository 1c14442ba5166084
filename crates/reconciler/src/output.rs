//! Output plan builder.
//!
//! Turns a stream id and the configured protocol set into the single output
//! endpoint of its process. More than one protocol yields a `tee` muxer whose
//! sub-targets always appear in the order hls, rtmp, srt, so the generated
//! address is byte-stable across restarts and input orderings.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use streamsync_core::{Error, ProcessIo, Result, StreamId};

/// Endpoint id used for every input and output.
pub const ENDPOINT_ID: &str = "0";

const TEE_OPTIONS: [&str; 12] = [
    "-map",
    "0",
    "-c",
    "copy",
    "-flags",
    "+global_header",
    "-tag:v",
    "7",
    "-tag:a",
    "10",
    "-f",
    "tee",
];

/// A supported output protocol. Declaration order is the tee precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OutputProtocol {
    Hls,
    Rtmp,
    Srt,
}

impl OutputProtocol {
    /// Muxer used when this protocol is the only output.
    pub const fn muxer(self) -> &'static str {
        match self {
            Self::Hls => "hls",
            Self::Rtmp => "flv",
            Self::Srt => "mpegts",
        }
    }

    /// Format tag used for this protocol inside a tee address.
    pub const fn tee_format(self) -> &'static str {
        match self {
            Self::Hls => "hls",
            Self::Rtmp => "rtmp",
            Self::Srt => "mpegts",
        }
    }

    /// Core address of this protocol's sink for `id`.
    pub fn address(self, id: &StreamId, hls_prefix: &str) -> String {
        match self {
            Self::Hls => format!("{{memfs}}/{hls_prefix}{id}.m3u8"),
            Self::Rtmp => format!("{{rtmp,name={id}}}"),
            Self::Srt => format!("{{srt,mode=publish,name={id}}}"),
        }
    }
}

impl fmt::Display for OutputProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hls => write!(f, "hls"),
            Self::Rtmp => write!(f, "rtmp"),
            Self::Srt => write!(f, "srt"),
        }
    }
}

impl FromStr for OutputProtocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hls" => Ok(Self::Hls),
            "rtmp" => Ok(Self::Rtmp),
            "srt" => Ok(Self::Srt),
            _ => Err(Error::unknown_protocol(s.trim())),
        }
    }
}

/// Non-empty, de-duplicated set of requested protocols, ordered by precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolSet(BTreeSet<OutputProtocol>);

impl ProtocolSet {
    /// Build a set from protocols in any order.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` when no protocol is given.
    pub fn new(protocols: impl IntoIterator<Item = OutputProtocol>) -> Result<Self> {
        let set: BTreeSet<_> = protocols.into_iter().collect();
        if set.is_empty() {
            return Err(Error::invalid_config("at least one output protocol is required"));
        }
        Ok(Self(set))
    }

    /// Iterate in precedence order.
    pub fn iter(&self) -> impl Iterator<Item = OutputProtocol> + '_ {
        self.0.iter().copied()
    }

    /// Number of distinct protocols.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false: construction rejects an empty set.
    pub const fn is_empty(&self) -> bool {
        false
    }
}

impl FromStr for ProtocolSet {
    type Err = Error;

    /// Parse a comma-separated list such as `hls,srt`. Blank items are ignored.
    fn from_str(s: &str) -> Result<Self> {
        let protocols = s
            .split(',')
            .filter(|token| !token.trim().is_empty())
            .map(str::parse::<OutputProtocol>)
            .collect::<Result<Vec<OutputProtocol>>>()?;
        Self::new(protocols)
    }
}

impl fmt::Display for ProtocolSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join(","))
    }
}

/// The single output endpoint of a process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputPlan {
    /// One protocol, written directly.
    Direct {
        protocol: OutputProtocol,
        address: String,
    },
    /// Several protocols fanned out by the tee muxer.
    Tee {
        targets: Vec<(OutputProtocol, String)>,
    },
}

impl OutputPlan {
    /// Plan the output of stream `id`.
    ///
    /// `hls_prefix` is a directory inside the in-memory filesystem; empty
    /// places playlists at its root.
    pub fn build(id: &StreamId, protocols: &ProtocolSet, hls_prefix: &str) -> Self {
        let prefix = normalize_prefix(hls_prefix);
        let targets: Vec<(OutputProtocol, String)> = protocols
            .iter()
            .map(|protocol| (protocol, protocol.address(id, &prefix)))
            .collect();

        if let [(protocol, address)] = targets.as_slice() {
            Self::Direct {
                protocol: *protocol,
                address: address.clone(),
            }
        } else {
            Self::Tee { targets }
        }
    }

    /// Core address of the endpoint.
    pub fn address(&self) -> String {
        match self {
            Self::Direct { address, .. } => address.clone(),
            Self::Tee { targets } => targets
                .iter()
                .map(|(protocol, address)| format!("[f={}]{address}", protocol.tee_format()))
                .join("|"),
        }
    }

    /// Encoder options of the endpoint.
    pub fn options(&self) -> Vec<String> {
        match self {
            Self::Direct { protocol, .. } => ["-c", "copy", "-f", protocol.muxer()]
                .into_iter()
                .map(str::to_string)
                .collect(),
            Self::Tee { .. } => TEE_OPTIONS.into_iter().map(str::to_string).collect(),
        }
    }

    /// Render as a process endpoint.
    pub fn endpoint(&self) -> ProcessIo {
        ProcessIo::new(ENDPOINT_ID, self.address(), self.options())
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_single_hls_is_direct_playlist() -> TestResult {
        let id = StreamId::new("cam")?;
        let plan = OutputPlan::build(&id, &"hls".parse()?, "");

        let io = plan.endpoint();
        assert_eq!(io.id, "0");
        assert_eq!(io.address, "{memfs}/cam.m3u8");
        assert_eq!(io.options, vec!["-c", "copy", "-f", "hls"]);
        Ok(())
    }

    #[test]
    fn test_single_rtmp_and_srt_addresses() -> TestResult {
        let id = StreamId::new("cam")?;

        let rtmp = OutputPlan::build(&id, &"rtmp".parse()?, "").endpoint();
        assert_eq!(rtmp.address, "{rtmp,name=cam}");
        assert_eq!(rtmp.options, vec!["-c", "copy", "-f", "flv"]);

        let srt = OutputPlan::build(&id, &"srt".parse()?, "").endpoint();
        assert_eq!(srt.address, "{srt,mode=publish,name=cam}");
        assert_eq!(srt.options, vec!["-c", "copy", "-f", "mpegts"]);
        Ok(())
    }

    #[test]
    fn test_all_protocols_make_ordered_tee() -> TestResult {
        let id = StreamId::new("cam")?;
        let plan = OutputPlan::build(&id, &"srt,rtmp,hls".parse()?, "");

        assert_eq!(
            plan.address(),
            "[f=hls]{memfs}/cam.m3u8|[f=rtmp]{rtmp,name=cam}|[f=mpegts]{srt,mode=publish,name=cam}"
        );
        assert_eq!(plan.options().last().map(String::as_str), Some("tee"));
        assert_eq!(plan.options().first().map(String::as_str), Some("-map"));
        Ok(())
    }

    #[test]
    fn test_tee_address_is_order_independent() -> TestResult {
        let id = StreamId::new("cam")?;
        let a = OutputPlan::build(&id, &"srt,hls".parse()?, "");
        let b = OutputPlan::build(&id, &"hls,srt".parse()?, "");

        assert_eq!(a.address(), b.address());
        assert_eq!(a.address(), "[f=hls]{memfs}/cam.m3u8|[f=mpegts]{srt,mode=publish,name=cam}");
        Ok(())
    }

    #[test]
    fn test_duplicates_collapse_to_direct() -> TestResult {
        let id = StreamId::new("cam")?;
        let plan = OutputPlan::build(&id, &"rtmp, RTMP".parse()?, "");

        assert!(matches!(plan, OutputPlan::Direct { protocol: OutputProtocol::Rtmp, .. }));
        Ok(())
    }

    #[test]
    fn test_hls_prefix_is_a_directory() -> TestResult {
        let id = StreamId::new("cam")?;
        let plan = OutputPlan::build(&id, &"hls".parse()?, "/live/");

        assert_eq!(plan.address(), "{memfs}/live/cam.m3u8");
        Ok(())
    }

    #[test]
    fn test_unknown_protocol_is_rejected() {
        let result = "hls,dash".parse::<ProtocolSet>();
        assert!(matches!(result, Err(Error::UnknownProtocol { ref token }) if token == "dash"));
    }

    #[test]
    fn test_empty_protocol_list_is_rejected() {
        assert!(matches!(" , ".parse::<ProtocolSet>(), Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_protocol_set_display_is_canonical() -> TestResult {
        let set: ProtocolSet = "srt,hls,srt".parse()?;
        assert_eq!(set.to_string(), "hls,srt");
        assert_eq!(set.len(), 2);
        assert!(!set.is_empty());
        Ok(())
    }
}
