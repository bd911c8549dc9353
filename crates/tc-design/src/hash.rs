//! Topology fingerprints for design records.

use sha2::{Digest, Sha256};

/// Fingerprint a topology as the solver sees it.
///
/// Covers component labels and kinds plus connection labels and endpoint
/// labels, independent of insertion order. Specification values are
/// deliberately left out: re-specifying the same plant must still match
/// its record.
pub fn topology_fingerprint(
    components: &[(&str, &str)],
    connections: &[(&str, &str, &str)],
) -> String {
    let mut lines: Vec<String> = components
        .iter()
        .map(|(label, kind)| format!("comp {label} {kind}"))
        .collect();
    lines.sort();

    let mut conn_lines: Vec<String> = connections
        .iter()
        .map(|(label, src, dst)| format!("conn {label} {src} {dst}"))
        .collect();
    conn_lines.sort();
    lines.extend(conn_lines);

    let mut hasher = Sha256::new();
    for line in &lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}
