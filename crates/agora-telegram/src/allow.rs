//! Admin check for privileged commands.
//!
//! Deny-by-default: an empty admin list means nobody is an admin.

/// Returns `true` when `user_id` is one of the configured admin ids.
pub fn is_admin(admin_ids: &[i64], user_id: i64) -> bool {
    admin_ids.contains(&user_id)
}
