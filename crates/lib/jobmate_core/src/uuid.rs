// Identifiers for identities, verification codes and refresh-token records
// are generated app-side as UUIDv7 so that rows sort by creation time.

use uuid::Uuid;

/// Generate a new UUIDv7 (timestamp-sortable).
pub fn uuidv7() -> Uuid {
    Uuid::now_v7()
}

/// Generate a new UUIDv7 rendered as a hyphenated string.
pub fn new_id() -> String {
    uuidv7().to_string()
}
