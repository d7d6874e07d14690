use diesel::prelude::*;

use crate::schema::key_slots;

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = key_slots)]
pub struct KeySlotRow {
    pub slot_name: String,
    pub policy_id: Vec<u8>,
    pub asset_name: Vec<u8>,
    pub updated_at: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = key_slots)]
pub struct NewKeySlotRow<'a> {
    pub slot_name: &'a str,
    pub policy_id: Vec<u8>,
    pub asset_name: Vec<u8>,
    pub updated_at: String,
}
