//! Structured identifiers for clusters and nodes.
//!
//! Formats:
//!
//! ```text
//! cluster-<r1>-<YYYY>-<MM>-<DD>-<hh>-<mm>-<ss>-<r2>
//! node-<r1>-<YYYY>-<number>-<r>
//! ```
//!
//! Random segments are 8 characters from `[a-z0-9]`. The node form embeds
//! the first two segments of its cluster's id so a human reading logs can
//! tell which cluster a node came from. That fragment is never the source
//! of truth for ownership; `Node::cluster_id` is.
//!
//! Uniqueness is probabilistic. Callers that need a hard guarantee retry
//! on collision against the store.

use chrono::{DateTime, NaiveDate, Utc};
use rand::rngs::ThreadRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

const CLUSTER_PREFIX: &str = "cluster-";
const NODE_PREFIX: &str = "node-";
const RANDOM_LEN: usize = 8;
const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// Components recovered from a cluster id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedClusterId {
    pub random1: String,
    pub random2: String,
    /// Creation instant at second precision.
    pub created_at: DateTime<Utc>,
}

/// Components recovered from a node id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedNodeId {
    /// `<r1>-<YYYY>` taken from the owning cluster's id.
    pub cluster_suffix: String,
    pub node_number: u64,
    pub random: String,
}

/// Generates identifiers from an injected random source.
///
/// Tests pass a seeded `StdRng` to get reproducible ids; production code
/// uses [`IdentityManager::new`], which draws from the thread-local rng.
#[derive(Debug)]
pub struct IdentityManager<R = ThreadRng> {
    rng: R,
}

impl IdentityManager<ThreadRng> {
    pub fn new() -> Self {
        Self { rng: rand::rng() }
    }
}

impl Default for IdentityManager<ThreadRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> IdentityManager<R> {
    /// Wraps a caller-supplied random source.
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Generates a cluster id stamped with the current time.
    pub fn generate_cluster_id(&mut self) -> String {
        self.generate_cluster_id_at(Utc::now())
    }

    /// Generates a cluster id stamped with `at`, truncated to the second.
    pub fn generate_cluster_id_at(&mut self, at: DateTime<Utc>) -> String {
        let r1 = self.random_segment();
        let r2 = self.random_segment();
        format!(
            "{CLUSTER_PREFIX}{r1}-{}-{r2}",
            at.format(TIMESTAMP_FORMAT)
        )
    }

    /// Generates a node id for the given cluster.
    ///
    /// `node_number` is not checked for uniqueness. If `cluster_id` is not
    /// a valid cluster id the result will not validate either.
    pub fn generate_node_id(&mut self, cluster_id: &str, node_number: u64) -> String {
        let suffix = cluster_suffix(cluster_id);
        let r = self.random_segment();
        format!("{NODE_PREFIX}{suffix}-{node_number}-{r}")
    }

    fn random_segment(&mut self) -> String {
        (0..RANDOM_LEN)
            .map(|_| ALPHABET[self.rng.random_range(0..ALPHABET.len())] as char)
            .collect()
    }
}

/// Returns the first two segments of a cluster id after its prefix.
///
/// `cluster-abcd1234-2024-01-...` yields `abcd1234-2024`.
pub fn cluster_suffix(cluster_id: &str) -> String {
    let rest = cluster_id.strip_prefix(CLUSTER_PREFIX).unwrap_or(cluster_id);
    rest.splitn(3, '-').take(2).collect::<Vec<_>>().join("-")
}

/// Returns true if `id` is a well-formed cluster id.
pub fn validate_cluster_id(id: &str) -> bool {
    parse_cluster_id(id).is_some()
}

/// Returns true if `id` is a well-formed node id.
pub fn validate_node_id(id: &str) -> bool {
    parse_node_id(id).is_some()
}

/// Splits a cluster id into its components.
///
/// Returns `None` for anything the generator could not have produced,
/// including timestamps that are not real calendar instants.
pub fn parse_cluster_id(id: &str) -> Option<ParsedClusterId> {
    let rest = id.strip_prefix(CLUSTER_PREFIX)?;
    let parts: Vec<&str> = rest.split('-').collect();
    let [r1, year, month, day, hour, minute, second, r2] = parts.as_slice() else {
        return None;
    };

    if !is_random_segment(r1) || !is_random_segment(r2) {
        return None;
    }

    let year = fixed_digits(year, 4)?;
    let month = fixed_digits(month, 2)?;
    let day = fixed_digits(day, 2)?;
    let hour = fixed_digits(hour, 2)?;
    let minute = fixed_digits(minute, 2)?;
    let second = fixed_digits(second, 2)?;

    let created_at = NaiveDate::from_ymd_opt(year as i32, month, day)?
        .and_hms_opt(hour, minute, second)?
        .and_utc();

    Some(ParsedClusterId {
        random1: r1.to_string(),
        random2: r2.to_string(),
        created_at,
    })
}

/// Splits a node id into its components.
pub fn parse_node_id(id: &str) -> Option<ParsedNodeId> {
    let rest = id.strip_prefix(NODE_PREFIX)?;
    let parts: Vec<&str> = rest.split('-').collect();
    let [r1, year, number, r] = parts.as_slice() else {
        return None;
    };

    if !is_random_segment(r1) || !is_random_segment(r) {
        return None;
    }
    fixed_digits(year, 4)?;
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let node_number = number.parse().ok()?;

    Some(ParsedNodeId {
        cluster_suffix: format!("{r1}-{year}"),
        node_number,
        random: r.to_string(),
    })
}

fn is_random_segment(s: &str) -> bool {
    s.len() == RANDOM_LEN
        && s
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
}

fn fixed_digits(s: &str, width: usize) -> Option<u32> {
    if s.len() != width || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
