mod test_join_errors;
mod test_leave_idempotent;
