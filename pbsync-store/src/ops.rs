//! Batch mutation operations
//!
//! A batch is an ordered list of [`Operation`]s applied all-or-nothing by
//! the store. Child operations point at their parent contact row through a
//! [`RowRef`]: either a real row id, or the position of an earlier
//! insert-parent operation in the same batch. Positional references exist
//! because the parent's row id is not known until the batch executes; the
//! store resolves them at apply time.

use crate::GroupId;

/// Reference to a contact row, resolved at apply time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowRef {
    /// Position of an earlier insert-parent operation in the same batch
    BackRef(usize),
    /// Already-known row id
    Id(i64),
}

/// Phone number category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneSubtype {
    Home,
    Mobile,
    Work,
    Other,
}

impl PhoneSubtype {
    /// Stable label used in the `contact_data.phone_subtype` column
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Mobile => "mobile",
            Self::Work => "work",
            Self::Other => "other",
        }
    }
}

/// A data row attached to a contact
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    StructuredName { display_name: String },
    Phone { number: String, subtype: PhoneSubtype },
    GroupMembership { group_id: GroupId },
}

impl Field {
    /// Stable label used in the `contact_data.kind` column
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StructuredName { .. } => "structured_name",
            Self::Phone { .. } => "phone",
            Self::GroupMembership { .. } => "group_membership",
        }
    }
}

/// One store mutation within a batch
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Insert a parent contact row. Ownership fields stay unset for
    /// imported entries (they are not tied to any external account).
    InsertContact {
        account_name: Option<String>,
        account_type: Option<String>,
    },
    /// Insert a data row attached to a contact
    InsertData { contact: RowRef, field: Field },
}

impl Operation {
    /// Insert-parent operation with no account ownership
    pub fn insert_contact() -> Self {
        Self::InsertContact {
            account_name: None,
            account_type: None,
        }
    }
}
