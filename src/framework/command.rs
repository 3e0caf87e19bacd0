//! # Command Codec
//!
//! Turns raw delivery payloads into typed [`Command`]s and back.
//!
//! The wire format has no envelope: create and update payloads are the JSON
//! object of the entity, delete payloads are the raw identifier bytes. Which
//! variant a payload decodes to is decided by the destination's [`Binding`]
//! alone; transport metadata is never consulted.

use crate::framework::binding::{Binding, EntityKind, OperationKind};
use crate::framework::error::DecodeError;
use crate::model::{Computer, User};
use serde::de::DeserializeOwned;

/// A decoded command, ready to be routed to a command executor.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateUser(User),
    UpdateUser(User),
    DeleteUser(String),
    CreateComputer(Computer),
    UpdateComputer(Computer),
    DeleteComputer(String),
}

impl Command {
    /// Decodes `payload` received on a destination bound to `binding`.
    ///
    /// Delete payloads are taken verbatim as the identifier (invalid UTF-8 is
    /// replaced, never rejected). Create and update payloads are schema-light:
    /// unknown fields are ignored, missing fields take empty defaults and a
    /// bare `null` decodes to the empty entity, leaving it to the executor's
    /// validation to refuse it.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Malformed`] when a create or update payload is not
    /// a JSON object of the right shape.
    pub fn decode(binding: Binding, payload: &[u8]) -> Result<Self, DecodeError> {
        let command = match (binding.entity, binding.operation) {
            (EntityKind::User, OperationKind::Create) => {
                Command::CreateUser(decode_entity("user", payload)?)
            }
            (EntityKind::User, OperationKind::Update) => {
                Command::UpdateUser(decode_entity("user", payload)?)
            }
            (EntityKind::User, OperationKind::Delete) => Command::DeleteUser(decode_id(payload)),
            (EntityKind::Computer, OperationKind::Create) => {
                Command::CreateComputer(decode_entity("computer", payload)?)
            }
            (EntityKind::Computer, OperationKind::Update) => {
                Command::UpdateComputer(decode_entity("computer", payload)?)
            }
            (EntityKind::Computer, OperationKind::Delete) => {
                Command::DeleteComputer(decode_id(payload))
            }
        };
        Ok(command)
    }

    /// Encodes the command into its wire payload.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            Command::CreateUser(user) | Command::UpdateUser(user) => serde_json::to_vec(user),
            Command::CreateComputer(computer) | Command::UpdateComputer(computer) => {
                serde_json::to_vec(computer)
            }
            Command::DeleteUser(id) | Command::DeleteComputer(id) => Ok(id.as_bytes().to_vec()),
        }
    }

    /// The binding whose destination carries this command.
    pub fn binding(&self) -> Binding {
        let (entity, operation) = match self {
            Command::CreateUser(_) => (EntityKind::User, OperationKind::Create),
            Command::UpdateUser(_) => (EntityKind::User, OperationKind::Update),
            Command::DeleteUser(_) => (EntityKind::User, OperationKind::Delete),
            Command::CreateComputer(_) => (EntityKind::Computer, OperationKind::Create),
            Command::UpdateComputer(_) => (EntityKind::Computer, OperationKind::Update),
            Command::DeleteComputer(_) => (EntityKind::Computer, OperationKind::Delete),
        };
        Binding::new(entity, operation)
    }
}

fn decode_entity<T: DeserializeOwned + Default>(
    entity: &'static str,
    payload: &[u8],
) -> Result<T, DecodeError> {
    serde_json::from_slice::<Option<T>>(payload)
        .map(Option::unwrap_or_default)
        .map_err(|source| DecodeError::Malformed { entity, source })
}

fn decode_id(payload: &[u8]) -> String {
    String::from_utf8_lossy(payload).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER_CREATE: Binding = Binding::new(EntityKind::User, OperationKind::Create);
    const USER_DELETE: Binding = Binding::new(EntityKind::User, OperationKind::Delete);
    const COMPUTER_CREATE: Binding = Binding::new(EntityKind::Computer, OperationKind::Create);
    const COMPUTER_UPDATE: Binding = Binding::new(EntityKind::Computer, OperationKind::Update);

    #[test]
    fn test_decode_create_user_with_empty_id() {
        let payload = br#"{"name":"Alice","age":28,"email":"a@x.com"}"#;

        let command = Command::decode(USER_CREATE, payload).unwrap();

        let Command::CreateUser(user) = command else {
            panic!("expected CreateUser, got {command:?}");
        };
        assert_eq!(user.id, "");
        assert_eq!(user.name, "Alice");
        assert_eq!(user.age, 28);
        assert_eq!(user.email, "a@x.com");
        assert!(!user.is_deleted);
    }

    #[test]
    fn test_decode_delete_is_verbatim() {
        let command = Command::decode(USER_DELETE, b"u-123").unwrap();
        assert_eq!(command, Command::DeleteUser("u-123".to_string()));

        // JSON-looking and non-UTF-8 payloads are still identifiers
        let json = Command::decode(USER_DELETE, br#"{"id":"x"}"#).unwrap();
        assert_eq!(json, Command::DeleteUser(r#"{"id":"x"}"#.to_string()));

        let binary = Command::decode(USER_DELETE, &[0xff, b'a']).unwrap();
        assert_eq!(binary, Command::DeleteUser("\u{fffd}a".to_string()));

        let empty = Command::decode(USER_DELETE, b"").unwrap();
        assert_eq!(empty, Command::DeleteUser(String::new()));
    }

    #[test]
    fn test_decode_malformed_payload_fails() {
        let err = Command::decode(COMPUTER_UPDATE, b"\xff\xfe not json").unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { entity: "computer", .. }));

        let wrong_type = Command::decode(USER_CREATE, br#"{"name":"Bob","age":"old"}"#);
        assert!(wrong_type.is_err());

        let not_an_object = Command::decode(USER_CREATE, b"[1,2,3]");
        assert!(not_an_object.is_err());
    }

    #[test]
    fn test_decode_null_is_empty_entity() {
        let user = Command::decode(USER_CREATE, b"null").unwrap();
        assert_eq!(user, Command::CreateUser(User::default()));

        let computer = Command::decode(COMPUTER_UPDATE, b" null ").unwrap();
        assert_eq!(computer, Command::UpdateComputer(Computer::default()));

        assert!(Command::decode(USER_CREATE, b"").is_err());
    }

    #[test]
    fn test_decode_ignores_unknown_fields() {
        let payload = br#"{"ip":"10.0.0.1","cpu":"x86","color":"beige"}"#;

        let Command::CreateComputer(computer) = Command::decode(COMPUTER_CREATE, payload).unwrap()
        else {
            panic!("expected CreateComputer");
        };
        assert_eq!(computer.id, None);
        assert_eq!(computer.ip, "10.0.0.1");
        assert_eq!(computer.cpu, "x86");
        assert_eq!(computer.gpu, "");
    }

    #[test]
    fn test_computer_round_trip_keeps_every_field() {
        let computer = Computer {
            id: Some("65f0c0ffee00000000000001".to_string()),
            ip: "192.168.1.20".to_string(),
            manufacturer: "Lenovo".to_string(),
            cpu: "i7".to_string(),
            ram: "32GB".to_string(),
            hdd: "1TB".to_string(),
            gpu: "RTX".to_string(),
            os: "Linux".to_string(),
            is_deleted: true,
        };
        let command = Command::UpdateComputer(computer);

        let bytes = command.encode().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 9);
        assert_eq!(object["_id"], "65f0c0ffee00000000000001");
        assert_eq!(object["isDeleted"], true);

        let decoded = Command::decode(command.binding(), &bytes).unwrap();
        assert_eq!(decoded, command);
    }

    #[test]
    fn test_create_computer_omits_absent_id() {
        let command = Command::CreateComputer(Computer {
            ip: "10.0.0.2".to_string(),
            ..Computer::default()
        });

        let bytes = command.encode().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(value.get("_id").is_none());
    }

    #[test]
    fn test_user_round_trip() {
        let command = Command::UpdateUser(User::new("u-1", "Alice", 28, "a@x.com"));

        let bytes = command.encode().unwrap();
        assert_eq!(Command::decode(command.binding(), &bytes).unwrap(), command);

        let delete = Command::DeleteComputer("abc".to_string());
        assert_eq!(delete.encode().unwrap(), b"abc".to_vec());
    }
}
