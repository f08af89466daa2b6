/// Config struct definitions with embedded defaults
///
/// `config_struct!` declares a struct, its `Default` impl and serde support
/// in one place so every field's default sits next to its type.
///
/// ```ignore
/// config_struct! {
///     pub struct WebSocketConfig {
///         send_queue_capacity: usize = 256,
///         heartbeat_interval_secs: u64 = 30,
///     }
/// }
/// ```
///
/// Missing fields in the TOML file fall back to the declared default.
#[macro_export]
macro_rules! config_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_name:ident: $field_type:ty = $default_value:expr
            ),*
            $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        #[serde(default)]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                pub $field_name: $field_type,
            )*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $(
                        $field_name: $default_value,
                    )*
                }
            }
        }
    };
}
