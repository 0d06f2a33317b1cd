/// Declares a closed enum over a native `cl_uint` table, with an `Unknown`
/// fallback so conversions from raw values never fail.
macro_rules! native_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident: $raw:ty {
            $($variant:ident = $value:path => $display:tt,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)*
            Unknown($raw),
        }

        impl $name {
            pub fn from_raw(raw: $raw) -> Self {
                match raw {
                    $($value => Self::$variant,)*
                    other => Self::Unknown(other),
                }
            }

            pub fn raw(self) -> $raw {
                match self {
                    $(Self::$variant => $value,)*
                    Self::Unknown(raw) => raw,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($display),)*
                    Self::Unknown(raw) => write!(f, "Unknown({:x})", raw),
                }
            }
        }
    };
}

/// `Display` for a bitflags type: set flags joined with `|` in declaration
/// order, or `$empty` when none of the listed flags is set.
macro_rules! flags_display {
    ($name:ident, $empty:expr, [$($flag:ident => $display:tt),* $(,)?]) => {
        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let parts: Vec<&str> = [$(($name::$flag, $display)),*]
                    .into_iter()
                    .filter(|(flag, _)| self.intersects(*flag))
                    .map(|(_, name)| name)
                    .collect();
                if parts.is_empty() {
                    return f.write_str($empty);
                }
                f.write_str(&parts.join("|"))
            }
        }
    };
}
