// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Local configuration document: reader and structural mutator.
//!
//! The managed service consumes a Knot-style YAML-flavored document with a
//! `remote:` section (transfer peers), an `acl:` section whose transfer rule
//! carries a `remote: [...]` list, and a `template:` section whose secondary
//! template carries a `master: [...]` list.
//!
//! The mutator is a structural merge, not a regeneration: every pre-existing
//! line survives byte-for-byte, and only the insertions for added peers are
//! new. Manual edits to unrelated sections therefore survive reconciliation.
//! The document only ever grows; no code path here removes a peer.

use std::collections::BTreeSet;
use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use crate::constants::{REMOTE_ID_SUFFIX, XFR_KEY_ID, XFR_PORT};
use crate::errors::ConfigError;
use crate::peer::Peer;

/// The site's managed-service configuration document.
///
/// Held as text; all structural knowledge lives in the parse/merge functions
/// so the document round-trips untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalConfig {
    text: String,
    origin: String,
}

impl LocalConfig {
    /// Wrap an in-memory document (tests, candidates).
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: "<memory>".to_string(),
        }
    }

    /// Load the document from durable storage.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read; the cycle
    /// treats this as fatal since there is no baseline to reconcile against.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::Io {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            text,
            origin: path.display().to_string(),
        })
    }

    /// Persist the document atomically: write to a sibling temp file, sync,
    /// then rename over the target. A crash mid-write cannot tear the file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] on any filesystem failure.
    pub async fn persist(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |e: std::io::Error| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        };

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".next");
        let tmp = std::path::PathBuf::from(tmp);

        let mut file = tokio::fs::File::create(&tmp).await.map_err(io_err)?;
        file.write_all(self.text.as_bytes()).await.map_err(io_err)?;
        file.sync_all().await.map_err(io_err)?;
        drop(file);
        tokio::fs::rename(&tmp, path).await.map_err(io_err)?;
        Ok(())
    }

    /// The raw document text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// SHA-256 digest of the document, for change detection and logging.
    #[must_use]
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.text.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Extract the configured peer site ids from the `remote:` section.
    ///
    /// Only remotes following the `<site>-remote` naming convention count as
    /// mesh peers; other remotes (forwarders, notify targets) are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Unparsable`] when the document has no
    /// `remote:` section; reconciling against such a baseline is unsafe.
    pub fn peer_ids(&self) -> Result<BTreeSet<String>, ConfigError> {
        let lines: Vec<&str> = self.text.lines().collect();
        let (start, end) = self.section_bounds(&lines, "remote:")?;

        let mut ids = BTreeSet::new();
        for line in &lines[start + 1..end] {
            let trimmed = line.trim_start();
            if let Some(value) = trimmed.strip_prefix("- id:") {
                let id = value.trim();
                if let Some(site) = id.strip_suffix(REMOTE_ID_SUFFIX) {
                    if !site.is_empty() {
                        ids.insert(site.to_string());
                    }
                }
            }
        }
        Ok(ids)
    }

    /// Produce a candidate document with the given peers merged in.
    ///
    /// For each peer (in `site_id` order): a remote block under `remote:`,
    /// the remote id appended to the transfer ACL's `remote: [...]` list and
    /// to the secondary template's `master: [...]` list. `self` is never
    /// mutated; the caller discards the candidate on validation failure.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Unparsable`] when the `remote:` section or
    /// either bracket list is missing.
    pub fn with_peers(&self, added: &[Peer]) -> Result<Self, ConfigError> {
        let existing = self.peer_ids()?;
        let mut peers: Vec<&Peer> = added
            .iter()
            .filter(|p| !existing.contains(&p.site_id))
            .collect();
        peers.sort();
        if peers.is_empty() {
            return Ok(self.clone());
        }

        let ends_with_newline = self.text.ends_with('\n');
        let mut lines: Vec<String> = self.text.lines().map(str::to_string).collect();
        let borrowed: Vec<&str> = lines.iter().map(String::as_str).collect();
        let (remote_start, remote_end) = self.section_bounds(&borrowed, "remote:")?;
        let indent = entry_indent(&borrowed[remote_start + 1..remote_end]);

        let mut blocks: Vec<String> = Vec::new();
        for peer in &peers {
            blocks.push(format!("{indent}- id: {}", peer.remote_id()));
            blocks.push(format!("{indent}  address: {}@{XFR_PORT}", peer.address));
            blocks.push(format!("{indent}  key: {XFR_KEY_ID}"));
            blocks.push(format!("{indent}  quic: on"));
        }
        lines.splice(remote_start + 1..remote_start + 1, blocks);

        let ids: Vec<String> = peers.iter().map(|p| p.remote_id()).collect();
        self.append_to_list(&mut lines, "acl:", "remote:", &ids)?;
        self.append_to_list(&mut lines, "template:", "master:", &ids)?;

        let mut text = lines.join("\n");
        if ends_with_newline {
            text.push('\n');
        }
        Ok(Self {
            text,
            origin: self.origin.clone(),
        })
    }

    /// Find a top-level section: returns (header index, exclusive end index).
    fn section_bounds(&self, lines: &[&str], header: &str) -> Result<(usize, usize), ConfigError> {
        let start = lines
            .iter()
            .position(|line| line.trim_end() == header)
            .ok_or_else(|| ConfigError::Unparsable {
                path: self.origin.clone(),
                reason: format!("no '{header}' section"),
            })?;
        let end = lines[start + 1..]
            .iter()
            .position(|line| is_section_header(line))
            .map_or(lines.len(), |offset| start + 1 + offset);
        Ok((start, end))
    }

    /// Append ids to the first `key: [...]` bracket list inside a section.
    fn append_to_list(
        &self,
        lines: &mut [String],
        section: &str,
        key: &str,
        ids: &[String],
    ) -> Result<(), ConfigError> {
        let borrowed: Vec<&str> = lines.iter().map(String::as_str).collect();
        let (start, end) = self.section_bounds(&borrowed, section)?;

        let index = lines[start + 1..end]
            .iter()
            .position(|line| {
                let trimmed = line.trim_start();
                trimmed.starts_with(key) && trimmed.contains('[') && trimmed.contains(']')
            })
            .map(|offset| start + 1 + offset)
            .ok_or_else(|| ConfigError::Unparsable {
                path: self.origin.clone(),
                reason: format!("no '{key} [...]' list in '{section}' section"),
            })?;

        let line = &lines[index];
        let malformed = || ConfigError::Unparsable {
            path: self.origin.clone(),
            reason: format!("malformed '{key}' list in '{section}' section"),
        };
        let open = line.find('[').ok_or_else(malformed)?;
        let close = line.rfind(']').ok_or_else(malformed)?;
        if close < open {
            return Err(malformed());
        }
        let list_empty = line[open + 1..close].trim().is_empty();
        let joined = ids.join(", ");
        let insertion = if list_empty {
            joined
        } else {
            format!(", {joined}")
        };
        lines[index] = format!("{}{}{}", &line[..close], insertion, &line[close..]);
        Ok(())
    }
}

/// True for top-level `section:` headers (no leading whitespace, ends with a
/// bare colon).
fn is_section_header(line: &str) -> bool {
    !line.starts_with([' ', '\t'])
        && line.trim_end().ends_with(':')
        && !line.trim_end().is_empty()
}

/// Indentation of existing `- id:` entries, defaulting to two spaces.
fn entry_indent(section_lines: &[&str]) -> String {
    section_lines
        .iter()
        .find(|line| line.trim_start().starts_with("- id:"))
        .map(|line| line[..line.len() - line.trim_start().len()].to_string())
        .unwrap_or_else(|| "  ".to_string())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
