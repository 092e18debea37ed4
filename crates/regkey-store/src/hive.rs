use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the five well-known root containers of the system registry.
///
/// Roots are process-wide and pre-existing: they are never created, opened
/// or closed by this crate, only mapped to a backend's root handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Hive {
    #[serde(rename = "HKEY_CURRENT_USER")]
    CurrentUser,
    #[serde(rename = "HKEY_LOCAL_MACHINE")]
    LocalMachine,
    #[serde(rename = "HKEY_CLASSES_ROOT")]
    ClassesRoot,
    #[serde(rename = "HKEY_USERS")]
    Users,
    #[serde(rename = "HKEY_CURRENT_CONFIG")]
    CurrentConfig,
}

impl Hive {
    /// Every recognized hive, in canonical order.
    pub const ALL: [Hive; 5] = [
        Hive::CurrentUser,
        Hive::LocalMachine,
        Hive::ClassesRoot,
        Hive::Users,
        Hive::CurrentConfig,
    ];

    /// Resolve a hive by its canonical name.
    ///
    /// Matching is exact and case-sensitive; anything outside the fixed set
    /// yields `None`.
    ///
    /// ```
    /// use regkey_store::Hive;
    ///
    /// assert_eq!(Hive::resolve("HKEY_USERS"), Some(Hive::Users));
    /// assert_eq!(Hive::resolve("hkey_users"), None);
    /// ```
    pub fn resolve(name: &str) -> Option<Hive> {
        match name {
            "HKEY_CURRENT_USER" => Some(Hive::CurrentUser),
            "HKEY_LOCAL_MACHINE" => Some(Hive::LocalMachine),
            "HKEY_CLASSES_ROOT" => Some(Hive::ClassesRoot),
            "HKEY_USERS" => Some(Hive::Users),
            "HKEY_CURRENT_CONFIG" => Some(Hive::CurrentConfig),
            _ => None,
        }
    }

    /// The canonical name of this hive.
    pub fn name(&self) -> &'static str {
        match self {
            Hive::CurrentUser => "HKEY_CURRENT_USER",
            Hive::LocalMachine => "HKEY_LOCAL_MACHINE",
            Hive::ClassesRoot => "HKEY_CLASSES_ROOT",
            Hive::Users => "HKEY_USERS",
            Hive::CurrentConfig => "HKEY_CURRENT_CONFIG",
        }
    }
}

impl fmt::Display for Hive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unrecognized hive name.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized hive: {0}")]
pub struct UnknownHive(pub String);

impl FromStr for Hive {
    type Err = UnknownHive;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Hive::resolve(s).ok_or_else(|| UnknownHive(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_every_canonical_name() {
        for hive in Hive::ALL {
            assert_eq!(Hive::resolve(hive.name()), Some(hive));
        }
    }

    #[test]
    fn resolution_is_case_sensitive() {
        assert!(Hive::resolve("hkey_current_user").is_none());
        assert!(Hive::resolve("HKEY_Current_User").is_none());
    }

    #[test]
    fn rejects_unknown_names() {
        assert!(Hive::resolve("").is_none());
        assert!(Hive::resolve("not-a-real-hive").is_none());
        assert!(Hive::resolve("HKEY_CURRENT_USER ").is_none());
        assert!(Hive::resolve("HKCU").is_none());
    }

    #[test]
    fn from_str_and_display_agree() {
        let hive: Hive = "HKEY_CLASSES_ROOT".parse().unwrap();
        assert_eq!(hive, Hive::ClassesRoot);
        assert_eq!(hive.to_string(), "HKEY_CLASSES_ROOT");
        assert_eq!(
            "bogus".parse::<Hive>().unwrap_err(),
            UnknownHive("bogus".into())
        );
    }

    #[test]
    fn serde_uses_canonical_names() {
        let json = serde_json::to_string(&Hive::LocalMachine).unwrap();
        assert_eq!(json, "\"HKEY_LOCAL_MACHINE\"");
        let back: Hive = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Hive::LocalMachine);
    }
}
