
mod test_client;
