//! DNS profiles: built-in defaults merged with an optional JSON file.
//!
//! The file maps profile names to address lists:
//!
//! ```json
//! {
//!   "MyOffice": { "ipv4": ["10.0.0.53", "10.0.0.54"], "ipv6": [] }
//! }
//! ```
//!
//! Missing or `null` lists are treated as empty. File entries replace
//! built-in profiles of the same name and are otherwise appended in file
//! order.

use crate::error::{Result, SwitcherError};
use serde::Deserialize;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::{Path, PathBuf};

/// Name of the profile file looked up next to the executable.
pub const PROFILE_FILE_NAME: &str = "dns_profiles.json";

/// A named pair of resolver lists.
///
/// # Example
///
/// ```
/// use dns_switcher::DnsProfile;
///
/// let profile = DnsProfile::new("Quad9")
///     .with_ipv4(["9.9.9.9", "149.112.112.112"])
///     .with_ipv6(["2620:fe::fe"]);
///
/// assert_eq!(profile.ipv4[0], "9.9.9.9");
/// assert_eq!(profile.ipv6.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsProfile {
    /// Display name.
    pub name: String,

    /// IPv4 resolvers, primary first.
    pub ipv4: Vec<String>,

    /// IPv6 resolvers, primary first.
    pub ipv6: Vec<String>,
}

impl DnsProfile {
    /// Creates a profile with no addresses.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ipv4: Vec::new(),
            ipv6: Vec::new(),
        }
    }

    /// Replaces the IPv4 list.
    #[must_use]
    pub fn with_ipv4<I, S>(mut self, servers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ipv4 = servers.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the IPv6 list.
    #[must_use]
    pub fn with_ipv6<I, S>(mut self, servers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ipv6 = servers.into_iter().map(Into::into).collect();
        self
    }

    /// Returns `true` if neither family has an address.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ipv4.is_empty() && self.ipv6.is_empty()
    }
}

/// Profile entry as written in the JSON file.
#[derive(Debug, Deserialize)]
struct ProfileEntry {
    #[serde(default)]
    ipv4: Option<Vec<String>>,
    #[serde(default)]
    ipv6: Option<Vec<String>>,
}

/// Ordered collection of profiles, unique by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSet {
    profiles: Vec<DnsProfile>,
}

impl ProfileSet {
    /// The built-in profiles: Cloudflare and Google.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            profiles: vec![
                DnsProfile::new("Cloudflare")
                    .with_ipv4(["1.1.1.1", "1.0.0.1"])
                    .with_ipv6(["2606:4700:4700::1111", "2606:4700:4700::1001"]),
                DnsProfile::new("Google")
                    .with_ipv4(["8.8.8.8", "8.8.4.4"])
                    .with_ipv6(["2001:4860:4860::8888", "2001:4860:4860::8844"]),
            ],
        }
    }

    /// Parses a profile file body and merges it over the built-in profiles.
    ///
    /// # Errors
    ///
    /// Returns [`SwitcherError::Json`] if `json` is not an object of profile
    /// entries.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let entries: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)?;

        let mut set = Self::builtin();
        for (name, value) in entries {
            let entry: ProfileEntry = serde_json::from_value(value)?;
            let profile = DnsProfile {
                ipv4: sanitize(&name, entry.ipv4.unwrap_or_default(), is_ipv4),
                ipv6: sanitize(&name, entry.ipv6.unwrap_or_default(), is_ipv6),
                name,
            };
            set.insert(profile);
        }
        Ok(set)
    }

    /// Loads `path` over the built-in profiles.
    ///
    /// A missing file is not an error and yields the built-in profiles.
    ///
    /// # Errors
    ///
    /// Returns [`SwitcherError::Io`] if the file exists but cannot be read,
    /// or [`SwitcherError::Json`] if it is malformed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No profile file, using built-in profiles");
            return Ok(Self::builtin());
        }
        let json = std::fs::read_to_string(path)?;
        let set = Self::from_json_str(&json)?;
        tracing::info!(path = %path.display(), profiles = set.len(), "Loaded DNS profiles");
        Ok(set)
    }

    /// Like [`load`](Self::load), but reports failures as a warning and
    /// falls back to the built-in profiles.
    #[must_use]
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to read DNS profiles, using built-in profiles"
            );
            Self::builtin()
        })
    }

    /// Writes a sample profile file at `path` unless one already exists.
    ///
    /// Returns `true` if the file was created.
    ///
    /// # Errors
    ///
    /// Returns [`SwitcherError::Io`] if the file cannot be written.
    pub fn write_sample(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        let sample = serde_json::json!({
            "MyOffice": { "ipv4": ["10.0.0.53", "10.0.0.54"], "ipv6": [] }
        });
        std::fs::write(path, serde_json::to_string_pretty(&sample)?)?;
        tracing::info!(path = %path.display(), "Created sample DNS profile file");
        Ok(true)
    }

    /// Adds `profile`, replacing any profile with the same name in place.
    pub fn insert(&mut self, profile: DnsProfile) {
        match self.profiles.iter_mut().find(|p| p.name == profile.name) {
            Some(existing) => *existing = profile,
            None => self.profiles.push(profile),
        }
    }

    /// Looks up a profile by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DnsProfile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    /// Looks up a profile by name, failing if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`SwitcherError::InvalidProfile`] for an unknown name.
    pub fn require(&self, name: &str) -> Result<&DnsProfile> {
        self.get(name)
            .ok_or_else(|| SwitcherError::InvalidProfile(format!("unknown profile: {name}")))
    }

    /// Profile names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.iter().map(|p| p.name.as_str())
    }

    /// Profiles in order.
    pub fn iter(&self) -> std::slice::Iter<'_, DnsProfile> {
        self.profiles.iter()
    }

    /// Number of profiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Returns `true` if there are no profiles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl Default for ProfileSet {
    fn default() -> Self {
        Self::builtin()
    }
}

impl<'a> IntoIterator for &'a ProfileSet {
    type Item = &'a DnsProfile;
    type IntoIter = std::slice::Iter<'a, DnsProfile>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Returns `<executable dir>/dns_profiles.json`.
///
/// # Errors
///
/// Returns [`SwitcherError::Io`] if the executable path cannot be determined.
pub fn default_profile_path() -> Result<PathBuf> {
    let exe = std::env::current_exe()?;
    let dir = exe.parent().unwrap_or_else(|| Path::new("."));
    Ok(dir.join(PROFILE_FILE_NAME))
}

fn is_ipv4(s: &str) -> bool {
    s.parse::<Ipv4Addr>().is_ok()
}

fn is_ipv6(s: &str) -> bool {
    s.parse::<Ipv6Addr>().is_ok()
}

/// Trims entries, drops blanks, and drops anything `valid` rejects.
fn sanitize(profile: &str, servers: Vec<String>, valid: fn(&str) -> bool) -> Vec<String> {
    servers
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .filter(|s| {
            let ok = valid(s);
            if !ok {
                tracing::warn!(profile = %profile, address = %s, "Ignoring invalid DNS address");
            }
            ok
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_has_both_families() {
        let set = ProfileSet::builtin();
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["Cloudflare", "Google"]);
        for p in &set {
            assert!(!p.ipv4.is_empty());
            assert!(!p.ipv6.is_empty());
        }
        assert_eq!(set.get("Cloudflare").unwrap().ipv4, vec!["1.1.1.1", "1.0.0.1"]);
    }

    #[test]
    fn file_overrides_and_extends() {
        let set = ProfileSet::from_json_str(
            r#"{
                "Office": { "ipv4": ["10.0.0.53"] },
                "Google": { "ipv4": ["8.8.8.8"], "ipv6": null }
            }"#,
        )
        .unwrap();

        assert_eq!(set.names().collect::<Vec<_>>(), vec!["Cloudflare", "Google", "Office"]);
        let google = set.get("Google").unwrap();
        assert_eq!(google.ipv4, vec!["8.8.8.8"]);
        assert!(google.ipv6.is_empty());
        assert!(set.get("Office").unwrap().ipv6.is_empty());
    }

    #[test]
    fn user_entries_keep_file_order() {
        let set = ProfileSet::from_json_str(r#"{ "Zeta": {}, "Alpha": {} }"#).unwrap();
        assert_eq!(
            set.names().collect::<Vec<_>>(),
            vec!["Cloudflare", "Google", "Zeta", "Alpha"]
        );
        assert!(set.get("Zeta").unwrap().is_empty());
    }

    #[test]
    fn invalid_and_blank_addresses_dropped() {
        let set = ProfileSet::from_json_str(
            r#"{ "Mixed": { "ipv4": ["", " 9.9.9.9 ", "2620:fe::fe", "x'; rm"], "ipv6": ["9.9.9.9", "2620:fe::fe"] } }"#,
        )
        .unwrap();
        let p = set.get("Mixed").unwrap();
        assert_eq!(p.ipv4, vec!["9.9.9.9"]);
        assert_eq!(p.ipv6, vec!["2620:fe::fe"]);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            ProfileSet::from_json_str("{ not json"),
            Err(SwitcherError::Json(_))
        ));
        assert!(ProfileSet::from_json_str(r#"{ "Bad": { "ipv4": "1.1.1.1" } }"#).is_err());
        assert!(ProfileSet::from_json_str("[]").is_err());
    }

    #[test]
    fn load_missing_file_uses_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let set = ProfileSet::load(&dir.path().join(PROFILE_FILE_NAME)).unwrap();
        assert_eq!(set, ProfileSet::builtin());
    }

    #[test]
    fn load_or_default_survives_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PROFILE_FILE_NAME);
        std::fs::write(&path, "garbage").unwrap();

        assert!(ProfileSet::load(&path).is_err());
        assert_eq!(ProfileSet::load_or_default(&path), ProfileSet::builtin());
    }

    #[test]
    fn write_sample_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PROFILE_FILE_NAME);

        assert!(ProfileSet::write_sample(&path).unwrap());
        assert!(!ProfileSet::write_sample(&path).unwrap());

        let set = ProfileSet::load(&path).unwrap();
        let office = set.get("MyOffice").unwrap();
        assert_eq!(office.ipv4, vec!["10.0.0.53", "10.0.0.54"]);
        assert!(office.ipv6.is_empty());
    }

    #[test]
    fn require_unknown_profile() {
        let set = ProfileSet::builtin();
        assert!(set.require("Google").is_ok());
        assert!(matches!(
            set.require("Nope"),
            Err(SwitcherError::InvalidProfile(_))
        ));
    }

    #[test]
    fn default_path_ends_with_file_name() {
        let path = default_profile_path().unwrap();
        assert!(path.ends_with(PROFILE_FILE_NAME));
    }
}
