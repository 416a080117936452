use crate::model::Minutes;

pub const MAX_NAME_LEN: usize = 200;
pub const MAX_PHONE_LEN: usize = 32;
pub const MAX_PARTY_SIZE: u32 = 100;
pub const MAX_TABLE_CAPACITY: u32 = 100;
pub const MAX_TABLES_PER_RESTAURANT: usize = 1_000;
/// A reservation never spans more than a full day.
pub const MAX_DURATION_MINUTES: Minutes = 24 * 60;
pub const MAX_ALTERNATIVES: usize = 48;
