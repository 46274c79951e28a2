use crate::config::Config;

pub fn mock_cfg() -> Config {
    Config::load_from_str(
        r#"
        [database]
        name = ":memory:"

        [web_server]
        address = "127.0.0.1:0"

        [feed]
        keep_alive_secs = 2
        channel_capacity = 16
        session_buffer = 4

        [mailbox]
        min_time_secs = 1
        max_time_secs = 30
        "#,
    )
    .unwrap()
}
