//! Behavioural laws of the accessor, checked against the in-memory store.

use proptest::prelude::*;
use regkey::{ErrorKind, Hive, InMemoryKeyStore, Registry, RegistryConfig};

fn hive_name() -> impl Strategy<Value = &'static str> {
    prop::sample::select(Hive::ALL.iter().map(|h| h.name()).collect::<Vec<_>>())
}

fn segment() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_ .-]{1,12}"
}

fn key_path() -> impl Strategy<Value = String> {
    prop::collection::vec(segment(), 1..4).prop_map(|segments| segments.join("\\"))
}

proptest! {
    #[test]
    fn set_then_get_returns_the_value(
        hive in hive_name(),
        path in key_path(),
        name in "[A-Za-z0-9_]{0,16}",
        value in "\\PC{0,200}",
    ) {
        let reg = Registry::new(InMemoryKeyStore::new());
        reg.set_string(hive, &path, &name, &value).unwrap();
        prop_assert_eq!(reg.get_string(hive, &path, &name).unwrap(), value);
        prop_assert_eq!(reg.store().open_handles(), 0);
    }

    #[test]
    fn fixed_buffer_reads_fit_or_read_empty(value in "[a-z]{200,300}") {
        let reg = Registry::with_config(InMemoryKeyStore::new(), RegistryConfig::fixed_buffers());
        reg.set_string("HKEY_CURRENT_USER", "K", "v", &value).unwrap();
        let read = reg.get_string("HKEY_CURRENT_USER", "K", "v").unwrap();
        if (value.len() + 1) * 2 <= 512 {
            prop_assert_eq!(read, value);
        } else {
            prop_assert_eq!(read, "");
        }
    }

    #[test]
    fn delete_then_get_reads_empty(path in key_path(), name in "[A-Za-z]{1,8}") {
        let reg = Registry::new(InMemoryKeyStore::new());
        reg.set_string("HKEY_LOCAL_MACHINE", &path, &name, "x").unwrap();
        reg.delete_value("HKEY_LOCAL_MACHINE", &path, &name).unwrap();
        prop_assert_eq!(reg.get_string("HKEY_LOCAL_MACHINE", &path, &name).unwrap(), "");
    }

    #[test]
    fn children_enumerate_exactly_once(
        children in prop::collection::btree_set("[a-z]{1,10}", 1..12),
    ) {
        let reg = Registry::new(InMemoryKeyStore::new());
        for child in &children {
            reg.set_string("HKEY_USERS", &format!("Parent\\{child}"), "v", "1").unwrap();
        }
        let mut names = reg.enumerate_keys("HKEY_USERS", "Parent").unwrap();
        names.sort();
        let expected: Vec<String> = children.iter().cloned().collect();
        prop_assert_eq!(names, expected);
    }

    #[test]
    fn unknown_hives_never_reach_the_store(hive in "[a-z_]{1,20}") {
        let reg = Registry::new(InMemoryKeyStore::new());
        let err = reg.set_string(&hive, "Software", "v", "x").unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::UnresolvedHive);
        prop_assert_eq!(reg.store().primitive_calls(), 0);
    }
}
