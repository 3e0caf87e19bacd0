//! # Queue Binding Table
//!
//! Static mapping from destination name to the command it carries. The table
//! is built once at startup from configuration, is read-only afterwards and is
//! shared by reference (`Arc<BindingTable>`) with the supervisor and producers.
//!
//! Each destination resolves to a [`Binding`] (entity kind × operation kind)
//! exactly once, when its consumer subscribes. Consumers match on that enum
//! instead of re-inspecting the destination name for every message.

use crate::framework::error::BindingError;
use std::collections::HashSet;
use std::fmt::{self, Display};

// =============================================================================
// Kinds
// =============================================================================

/// The broker family a destination lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    /// Topic-based log transport.
    Kafka,
    /// Queue-based transport with per-message ack/nack.
    RabbitMq,
}

impl Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Kafka => write!(f, "kafka"),
            Transport::RabbitMq => write!(f, "rabbitmq"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    User,
    Computer,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Computer => "computer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Create => "create",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        }
    }
}

/// The (entity, operation) pair a destination is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Binding {
    pub entity: EntityKind,
    pub operation: OperationKind,
}

impl Binding {
    /// Every binding, in the order destinations are declared.
    pub const ALL: [Binding; 6] = [
        Binding::new(EntityKind::User, OperationKind::Create),
        Binding::new(EntityKind::User, OperationKind::Update),
        Binding::new(EntityKind::User, OperationKind::Delete),
        Binding::new(EntityKind::Computer, OperationKind::Create),
        Binding::new(EntityKind::Computer, OperationKind::Update),
        Binding::new(EntityKind::Computer, OperationKind::Delete),
    ];

    pub const fn new(entity: EntityKind, operation: OperationKind) -> Self {
        Self { entity, operation }
    }
}

impl Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.operation.as_str(), self.entity.as_str())
    }
}

// =============================================================================
// Destinations
// =============================================================================

/// One declared destination. Created at startup, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationDescriptor {
    pub transport: Transport,
    pub name: String,
    pub binding: Binding,
}

impl DestinationDescriptor {
    pub fn new(transport: Transport, name: impl Into<String>, binding: Binding) -> Self {
        Self {
            transport,
            name: name.into(),
            binding,
        }
    }
}

/// The six destination names of one transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationNames {
    pub user_created: String,
    pub user_updated: String,
    pub user_deleted: String,
    pub computer_created: String,
    pub computer_updated: String,
    pub computer_deleted: String,
}

impl Default for DestinationNames {
    fn default() -> Self {
        Self {
            user_created: "USER_CREATED".to_string(),
            user_updated: "USER_UPDATED".to_string(),
            user_deleted: "USER_DELETED".to_string(),
            computer_created: "COMPUTER_CREATED".to_string(),
            computer_updated: "COMPUTER_UPDATED".to_string(),
            computer_deleted: "COMPUTER_DELETED".to_string(),
        }
    }
}

impl DestinationNames {
    /// Returns the configured name for `binding`.
    pub fn name_for(&self, binding: Binding) -> &str {
        match (binding.entity, binding.operation) {
            (EntityKind::User, OperationKind::Create) => &self.user_created,
            (EntityKind::User, OperationKind::Update) => &self.user_updated,
            (EntityKind::User, OperationKind::Delete) => &self.user_deleted,
            (EntityKind::Computer, OperationKind::Create) => &self.computer_created,
            (EntityKind::Computer, OperationKind::Update) => &self.computer_updated,
            (EntityKind::Computer, OperationKind::Delete) => &self.computer_deleted,
        }
    }
}

// =============================================================================
// Binding table
// =============================================================================

/// Immutable, ordered set of destination descriptors for one transport.
#[derive(Debug, Clone)]
pub struct BindingTable {
    transport: Transport,
    descriptors: Vec<DestinationDescriptor>,
}

impl BindingTable {
    /// Builds a table from explicit descriptors.
    ///
    /// # Errors
    ///
    /// Fails when a destination name or a binding appears twice, or when a
    /// descriptor belongs to another transport.
    pub fn new(
        transport: Transport,
        descriptors: Vec<DestinationDescriptor>,
    ) -> Result<Self, BindingError> {
        let mut names = HashSet::new();
        let mut bindings = HashSet::new();

        for descriptor in &descriptors {
            if descriptor.transport != transport {
                return Err(BindingError::TransportMismatch {
                    name: descriptor.name.clone(),
                    expected: transport,
                    found: descriptor.transport,
                });
            }
            if !names.insert(descriptor.name.as_str()) {
                return Err(BindingError::Duplicate {
                    transport,
                    name: descriptor.name.clone(),
                });
            }
            if !bindings.insert(descriptor.binding) {
                return Err(BindingError::DuplicateBinding {
                    transport,
                    operation: descriptor.binding.to_string(),
                });
            }
        }

        Ok(Self {
            transport,
            descriptors,
        })
    }

    /// Builds the standard six-destination table from configured names.
    pub fn for_transport(
        transport: Transport,
        names: &DestinationNames,
    ) -> Result<Self, BindingError> {
        let descriptors = Binding::ALL
            .iter()
            .map(|binding| DestinationDescriptor::new(transport, names.name_for(*binding), *binding))
            .collect();
        Self::new(transport, descriptors)
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    /// The declared destinations, in declaration order.
    pub fn bindings(&self) -> &[DestinationDescriptor] {
        &self.descriptors
    }

    pub fn iter(&self) -> impl Iterator<Item = &DestinationDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Finds the descriptor declared under `name`.
    pub fn lookup(&self, name: &str) -> Option<&DestinationDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    /// Finds the destination that carries `binding`.
    pub fn destination_for(&self, binding: Binding) -> Option<&DestinationDescriptor> {
        self.descriptors.iter().find(|d| d.binding == binding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_uses_default_names() {
        let table = BindingTable::for_transport(Transport::Kafka, &DestinationNames::default())
            .unwrap();

        assert_eq!(table.len(), 6);
        let names: Vec<&str> = table.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "USER_CREATED",
                "USER_UPDATED",
                "USER_DELETED",
                "COMPUTER_CREATED",
                "COMPUTER_UPDATED",
                "COMPUTER_DELETED",
            ]
        );

        let delete = table.lookup("USER_DELETED").unwrap();
        assert_eq!(
            delete.binding,
            Binding::new(EntityKind::User, OperationKind::Delete)
        );
        assert_eq!(delete.transport, Transport::Kafka);
    }

    #[test]
    fn test_duplicate_destination_is_rejected() {
        let names = DestinationNames {
            user_updated: "USER_CREATED".to_string(),
            ..DestinationNames::default()
        };

        let err = BindingTable::for_transport(Transport::RabbitMq, &names).unwrap_err();
        assert_eq!(
            err,
            BindingError::Duplicate {
                transport: Transport::RabbitMq,
                name: "USER_CREATED".to_string(),
            }
        );
    }

    #[test]
    fn test_duplicate_binding_is_rejected() {
        let binding = Binding::new(EntityKind::Computer, OperationKind::Create);
        let descriptors = vec![
            DestinationDescriptor::new(Transport::Kafka, "A", binding),
            DestinationDescriptor::new(Transport::Kafka, "B", binding),
        ];

        let err = BindingTable::new(Transport::Kafka, descriptors).unwrap_err();
        assert!(matches!(err, BindingError::DuplicateBinding { .. }));
    }

    #[test]
    fn test_foreign_transport_is_rejected() {
        let binding = Binding::new(EntityKind::User, OperationKind::Create);
        let descriptors = vec![DestinationDescriptor::new(Transport::RabbitMq, "A", binding)];

        let err = BindingTable::new(Transport::Kafka, descriptors).unwrap_err();
        assert!(matches!(err, BindingError::TransportMismatch { .. }));
    }

    #[test]
    fn test_destination_for_binding() {
        let names = DestinationNames {
            computer_updated: "pc.updated".to_string(),
            ..DestinationNames::default()
        };
        let table = BindingTable::for_transport(Transport::RabbitMq, &names).unwrap();

        let binding = Binding::new(EntityKind::Computer, OperationKind::Update);
        assert_eq!(table.destination_for(binding).unwrap().name, "pc.updated");
        assert_eq!(binding.to_string(), "update_computer");
    }
}
