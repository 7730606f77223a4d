mod test_call_presence;
mod test_leave_presence;
