// Complaint IDs are UUIDv7 so that listings sorted by id follow creation order.
// User IDs keep PostgreSQL's gen_random_uuid() (v4).

use uuid::Uuid;

/// Generate a new UUIDv7 (timestamp-sortable).
pub fn uuidv7() -> Uuid {
    Uuid::now_v7()
}
