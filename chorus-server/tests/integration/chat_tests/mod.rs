mod test_chat_broadcast;
mod test_connection_auth;
mod test_duplicate_login;
mod test_promote_user;
