//! Host-key trust store read from an OpenSSH `known_hosts` file.

use std::fs;
use std::path::Path;

use anyhow::{Context, anyhow};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use russh::keys::{HashAlg, PublicKey};
use sha1::Sha1;
use tracing::{debug, info};

type HmacSha1 = Hmac<Sha1>;

/// Outcome of checking a server key against the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostKeyVerification {
    Verified,
    /// No entry for this host at all
    Unknown { fingerprint: String },
    /// Entries exist for this host but none carries this key
    Mismatch { fingerprint: String },
    /// The key is explicitly marked `@revoked`
    Revoked { fingerprint: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    None,
    Revoked,
}

/// One comma-separated item of the host field
#[derive(Debug, Clone)]
enum HostPattern {
    /// Plain or wildcard name, lowercased; `negated` for `!pattern`
    Name { pattern: String, negated: bool },
    /// `|1|salt|hash` where hash = HMAC-SHA1(salt, lookup name)
    Hashed { salt: Vec<u8>, hash: Vec<u8> },
}

impl HostPattern {
    fn parse(raw: &str) -> Result<Self, anyhow::Error> {
        if let Some(rest) = raw.strip_prefix("|1|") {
            let (salt, hash) = rest
                .split_once('|')
                .ok_or_else(|| anyhow!("hashed host {:?} is missing its hash", raw))?;
            let salt = BASE64
                .decode(salt)
                .map_err(|e| anyhow!("invalid hashed host salt: {}", e))?;
            let hash = BASE64
                .decode(hash)
                .map_err(|e| anyhow!("invalid hashed host hash: {}", e))?;
            return Ok(HostPattern::Hashed { salt, hash });
        }
        if raw.starts_with('|') {
            return Err(anyhow!("unsupported hashed host format {:?}", raw));
        }
        let lowered = raw.to_lowercase();
        Ok(match lowered.strip_prefix('!') {
            Some(pattern) => HostPattern::Name {
                pattern: pattern.to_string(),
                negated: true,
            },
            None => HostPattern::Name {
                pattern: lowered,
                negated: false,
            },
        })
    }
}

#[derive(Debug, Clone)]
struct HostEntry {
    patterns: Vec<HostPattern>,
    marker: Marker,
    key: PublicKey,
}

/// Parsed `known_hosts` content
#[derive(Debug, Clone, Default)]
pub struct KnownHosts {
    entries: Vec<HostEntry>,
}

impl KnownHosts {
    /// Loads and parses the store at `path`.
    ///
    /// A missing file, an unreadable file, or a malformed line is an error.
    pub fn from_file(path: &Path) -> Result<Self, anyhow::Error> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read known hosts file {:?}", path))?;
        let store = Self::parse(&content)
            .with_context(|| format!("failed to parse known hosts file {:?}", path))?;
        info!(
            "Loaded {} known host entries from {:?}",
            store.entries.len(),
            path
        );
        Ok(store)
    }

    pub fn parse(content: &str) -> Result<Self, anyhow::Error> {
        let mut entries = Vec::new();

        for (idx, line) in content.lines().enumerate() {
            let line_no = idx + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line.split_whitespace();
            let mut hosts = fields.next().unwrap_or_default();
            let marker = match hosts {
                "@revoked" => Marker::Revoked,
                "@cert-authority" => {
                    debug!("Skipping @cert-authority entry on line {}", line_no);
                    continue;
                }
                m if m.starts_with('@') => {
                    return Err(anyhow!("unknown marker {:?} on line {}", m, line_no));
                }
                _ => Marker::None,
            };
            if marker != Marker::None {
                hosts = fields.next().unwrap_or_default();
            }

            let (Some(_key_type), Some(key_data)) = (fields.next(), fields.next()) else {
                return Err(anyhow!("line {} has fewer than three fields", line_no));
            };
            let key = russh::keys::parse_public_key_base64(key_data)
                .map_err(|e| anyhow!("invalid key on line {}: {}", line_no, e))?;

            let patterns = hosts
                .split(',')
                .filter(|h| !h.is_empty())
                .map(HostPattern::parse)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| anyhow!("line {}: {}", line_no, e))?;
            if patterns.is_empty() {
                continue;
            }

            entries.push(HostEntry {
                patterns,
                marker,
                key,
            });
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Checks `key` as presented by `host` on `port`
    pub fn verify(&self, host: &str, port: u16, key: &PublicKey) -> HostKeyVerification {
        let fingerprint = key.fingerprint(HashAlg::Sha256).to_string();
        let lookup = host_lookup_name(host, port);

        let mut seen_host = false;
        for entry in self.entries.iter().filter(|e| matches_host(&e.patterns, &lookup)) {
            if entry.key.key_data() == key.key_data() {
                if entry.marker == Marker::Revoked {
                    return HostKeyVerification::Revoked { fingerprint };
                }
                return HostKeyVerification::Verified;
            }
            if entry.marker == Marker::None {
                seen_host = true;
            }
        }

        if seen_host {
            HostKeyVerification::Mismatch { fingerprint }
        } else {
            HostKeyVerification::Unknown { fingerprint }
        }
    }
}

/// `host` on the default port, `[host]:port` otherwise
fn host_lookup_name(host: &str, port: u16) -> String {
    let host = host.to_lowercase();
    if port == 22 {
        host
    } else {
        format!("[{}]:{}", host, port)
    }
}

fn matches_host(patterns: &[HostPattern], lookup: &str) -> bool {
    let mut matched = false;
    for pattern in patterns {
        match pattern {
            HostPattern::Name { pattern, negated } => {
                if wildcard_match(pattern, lookup) {
                    if *negated {
                        return false;
                    }
                    matched = true;
                }
            }
            HostPattern::Hashed { salt, hash } => {
                if hashed_match(salt, hash, lookup) {
                    matched = true;
                }
            }
        }
    }
    matched
}

fn hashed_match(salt: &[u8], hash: &[u8], lookup: &str) -> bool {
    let Ok(mut mac) = HmacSha1::new_from_slice(salt) else {
        return false;
    };
    mac.update(lookup.as_bytes());
    // constant-time comparison
    mac.verify_slice(hash).is_ok()
}

/// `*` and `?` globbing as used in known_hosts host patterns
fn wildcard_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|c| *c == '*')
}
