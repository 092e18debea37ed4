//! Dynamically typed call surface.
//!
//! Host bindings hand over untyped positional arguments. [`dispatch`] checks
//! arity and argument types before calling into the [`Registry`], so a
//! malformed call fails with `InvalidArgument` without touching the store.
//! [`Request`] and [`Response`] are the JSON envelopes used by line-oriented
//! front ends.

use regkey_store::KeyStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ErrorKind, RegistryError, Result};
use crate::registry::Registry;

/// The exported operations, named as host bindings know them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    EnumRegKeyKeys,
    EnumRegKeyValues,
    GetStringRegKey,
    SetStringRegKey,
    DeleteRegKeyKey,
    DeleteRegKeyValue,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::EnumRegKeyKeys,
        Operation::EnumRegKeyValues,
        Operation::GetStringRegKey,
        Operation::SetStringRegKey,
        Operation::DeleteRegKeyKey,
        Operation::DeleteRegKeyValue,
    ];

    /// Number of string arguments the operation consumes.
    pub fn arity(&self) -> usize {
        match self {
            Operation::EnumRegKeyKeys | Operation::EnumRegKeyValues => 2,
            Operation::GetStringRegKey
            | Operation::DeleteRegKeyKey
            | Operation::DeleteRegKeyValue => 3,
            Operation::SetStringRegKey => 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::EnumRegKeyKeys => "EnumRegKeyKeys",
            Operation::EnumRegKeyValues => "EnumRegKeyValues",
            Operation::GetStringRegKey => "GetStringRegKey",
            Operation::SetStringRegKey => "SetStringRegKey",
            Operation::DeleteRegKeyKey => "DeleteRegKeyKey",
            Operation::DeleteRegKeyValue => "DeleteRegKeyValue",
        }
    }
}

/// Successful result of a dispatched call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Reply {
    Names(Vec<String>),
    Value(String),
    Done,
}

/// A call as it arrives from a host.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Request {
    pub op: Operation,
    #[serde(default)]
    pub args: Vec<Value>,
}

/// Structured error carried back to a host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
}

impl From<&RegistryError> for ErrorReply {
    fn from(e: &RegistryError) -> Self {
        Self {
            kind: e.kind(),
            code: e.code().map(str::to_string),
            message: e.to_string(),
        }
    }
}

/// Outcome envelope for a [`Request`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Response {
    Ok(Reply),
    Err(ErrorReply),
}

impl From<Result<Reply>> for Response {
    fn from(result: Result<Reply>) -> Self {
        match result {
            Ok(reply) => Response::Ok(reply),
            Err(e) => Response::Err(ErrorReply::from(&e)),
        }
    }
}

/// Check arity and types, then run `op`.
///
/// Arguments beyond the operation's arity are ignored, as host bindings do.
pub fn dispatch<S: KeyStore>(
    registry: &Registry<S>,
    op: Operation,
    args: &[Value],
) -> Result<Reply> {
    let arity = op.arity();
    if args.len() < arity {
        return Err(RegistryError::invalid("Wrong number of arguments"));
    }
    let strings = args[..arity]
        .iter()
        .map(|arg| arg.as_str().ok_or_else(|| RegistryError::invalid("Expected string")))
        .collect::<Result<Vec<&str>>>()?;

    match (op, strings.as_slice()) {
        (Operation::EnumRegKeyKeys, [hive, path]) => {
            registry.enumerate_keys(hive, path).map(Reply::Names)
        }
        (Operation::EnumRegKeyValues, [hive, path]) => {
            registry.enumerate_values(hive, path).map(Reply::Names)
        }
        (Operation::GetStringRegKey, [hive, path, name]) => {
            registry.get_string(hive, path, name).map(Reply::Value)
        }
        (Operation::SetStringRegKey, [hive, path, name, value]) => registry
            .set_string(hive, path, name, value)
            .map(|()| Reply::Done),
        (Operation::DeleteRegKeyKey, [hive, path, name]) => {
            registry.delete_key(hive, path, name).map(|()| Reply::Done)
        }
        (Operation::DeleteRegKeyValue, [hive, path, name]) => {
            registry.delete_value(hive, path, name).map(|()| Reply::Done)
        }
        _ => Err(RegistryError::invalid("Wrong number of arguments")),
    }
}

/// Run a [`Request`] and wrap the outcome in a [`Response`].
pub fn handle<S: KeyStore>(registry: &Registry<S>, request: &Request) -> Response {
    dispatch(registry, request.op, &request.args).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use regkey_store::InMemoryKeyStore;
    use serde_json::json;

    fn registry() -> Registry<InMemoryKeyStore> {
        Registry::new(InMemoryKeyStore::new())
    }

    #[test]
    fn arity_per_operation() {
        assert_eq!(Operation::EnumRegKeyKeys.arity(), 2);
        assert_eq!(Operation::GetStringRegKey.arity(), 3);
        assert_eq!(Operation::SetStringRegKey.arity(), 4);
        assert_eq!(Operation::DeleteRegKeyValue.arity(), 3);
    }

    #[test]
    fn too_few_arguments() {
        let reg = registry();
        for args in [vec![], vec![json!("HKEY_LOCAL_MACHINE")], vec![json!("HKEY_LOCAL_MACHINE"), json!("SOFTWARE")]] {
            let err = dispatch(&reg, Operation::GetStringRegKey, &args).unwrap_err();
            assert_eq!(err.to_string(), "Wrong number of arguments");
            assert_eq!(err.code(), Some("EINVAL"));
        }
        assert_eq!(reg.store().primitive_calls(), 0);
    }

    #[test]
    fn non_string_argument() {
        let reg = registry();
        let args = [json!("HKEY_CURRENT_USER"), json!(42)];
        let err = dispatch(&reg, Operation::EnumRegKeyKeys, &args).unwrap_err();
        assert_eq!(err.to_string(), "Expected string");
        assert_eq!(reg.store().primitive_calls(), 0);
    }

    #[test]
    fn extra_arguments_are_ignored() {
        let reg = registry();
        let args = [json!("HKEY_CURRENT_USER"), json!(""), json!(null)];
        let reply = dispatch(&reg, Operation::EnumRegKeyKeys, &args).unwrap();
        assert_eq!(reply, Reply::Names(vec![]));
    }

    #[test]
    fn full_cycle_through_dispatch() {
        let reg = registry();
        let set = [json!("HKEY_CURRENT_USER"), json!("Software\\ExampleApp"), json!("Token"), json!("abc123")];
        assert_eq!(dispatch(&reg, Operation::SetStringRegKey, &set).unwrap(), Reply::Done);

        let get = &set[..3];
        assert_eq!(
            dispatch(&reg, Operation::GetStringRegKey, get).unwrap(),
            Reply::Value("abc123".into())
        );
        assert_eq!(
            dispatch(&reg, Operation::EnumRegKeyValues, &set[..2]).unwrap(),
            Reply::Names(vec!["Token".into()])
        );
        assert_eq!(dispatch(&reg, Operation::DeleteRegKeyValue, get).unwrap(), Reply::Done);
        assert_eq!(
            dispatch(&reg, Operation::GetStringRegKey, get).unwrap(),
            Reply::Value(String::new())
        );
    }

    #[test]
    fn request_envelope_round_trip() {
        let reg = registry();
        let request: Request = serde_json::from_value(json!({
            "op": "DeleteRegKeyKey",
            "args": ["HKEY_NOWHERE", "", "x"],
        }))
        .unwrap();
        let response = handle(&reg, &request);
        let Response::Err(err) = &response else {
            panic!("expected error, got {response:?}");
        };
        assert_eq!(err.kind, ErrorKind::UnresolvedHive);
        assert!(err.code.is_none());

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["err"]["kind"], "unresolved_hive");
    }

    #[test]
    fn ok_response_serialization() {
        let response = Response::Ok(Reply::Names(vec!["a".into()]));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json, json!({"ok": {"type": "names", "data": ["a"]}}));
        let done = serde_json::to_value(Response::Ok(Reply::Done)).unwrap();
        assert_eq!(done, json!({"ok": {"type": "done"}}));
    }
}
