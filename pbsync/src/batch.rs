//! Per-contact batch construction
//!
//! Builds the ordered operation list that inserts one contact: the parent
//! record first, then its data rows, each back-referencing the parent's
//! position in the batch (the parent row id does not exist yet). The
//! builder performs no I/O; nothing happens until the store applies the
//! batch.

use crate::feed::Contact;
use pbsync_store::{Field, GroupId, Operation, PhoneSubtype, RowRef};

/// Position of the insert-parent operation within every batch
const PARENT: usize = 0;

/// Build the operation batch for one contact.
///
/// Fixed order: parent record, structured name (if named), phone number
/// (if present, subtype mobile), group membership (always).
pub fn build_batch(contact: &Contact, group_id: GroupId) -> Vec<Operation> {
    let mut ops = vec![Operation::insert_contact()];

    if let Some(name) = &contact.name {
        ops.push(Operation::InsertData {
            contact: RowRef::BackRef(PARENT),
            field: Field::StructuredName {
                display_name: name.clone(),
            },
        });
    }

    if let Some(extension) = &contact.extension {
        ops.push(Operation::InsertData {
            contact: RowRef::BackRef(PARENT),
            field: Field::Phone {
                number: extension.clone(),
                subtype: PhoneSubtype::Mobile,
            },
        });
    }

    ops.push(Operation::InsertData {
        contact: RowRef::BackRef(PARENT),
        field: Field::GroupMembership { group_id },
    });

    ops
}
