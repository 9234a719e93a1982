#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}

/// Declare one entity kind's field table as an enum.
///
/// Every upstream key becomes a variant bound to exactly one `FieldRule`, so
/// dispatch is an exhaustive `match` and a key can never be registered twice
/// with different behavior.
///
/// ```ignore
/// field_table! {
///     pub enum NodeField {
///         "NodeName" => NodeName: rename(identity, "name"),
///         "Weight" => Weight: ignore(),
///     }
/// }
/// ```
#[macro_export]
macro_rules! field_table {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $key:literal => $variant:ident : $rule:expr ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $variant ),*
        }

        impl $name {
            /// Every field of the table, in declaration order.
            pub const ALL: &'static [$name] = &[ $( $name::$variant ),* ];

            pub fn from_key(key: &str) -> Option<Self> {
                match key {
                    $( $key => Some($name::$variant), )*
                    _ => None,
                }
            }

            /// The raw key as `scontrol` prints it.
            pub fn key(self) -> &'static str {
                match self {
                    $( $name::$variant => $key, )*
                }
            }

            pub fn rule(self) -> $crate::FieldRule {
                match self {
                    $( $name::$variant => $rule, )*
                }
            }
        }
    };
}
