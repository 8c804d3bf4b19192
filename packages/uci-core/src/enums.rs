//! Open integer enums.
//!
//! Every protocol enum is open: a set of compile-time variants plus an
//! `Unknown(value)` catch-all. An inbound byte that matches no variant is
//! logged once per (enum, value) and execution continues. Addins may pair
//! extra values with display names at load time through
//! [`crate::registry::RegistryBuilder::extend_enum`]; such values still
//! decode as `Unknown(v)` but render under their registered name.

/// Declare an open integer enum.
#[macro_export]
macro_rules! open_enum {
    (
        $(#[$meta:meta])*
        pub enum $Name:ident {
            $($(#[$vmeta:meta])* $Variant:ident = $value:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $Name {
            $($(#[$vmeta])* $Variant,)+
            /// Value not known to this build or its addins.
            Unknown(u8),
        }

        impl $Name {
            pub const NAME: &'static str = stringify!($Name);

            pub fn from_value(v: u8) -> Self {
                match v {
                    $($value => Self::$Variant,)+
                    other => {
                        $crate::registry::log_unknown_enum_value(Self::NAME, other);
                        Self::Unknown(other)
                    }
                }
            }

            pub fn value(self) -> u8 {
                match self {
                    $(Self::$Variant => $value,)+
                    Self::Unknown(v) => v,
                }
            }
        }

        impl ::core::fmt::Display for $Name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                match self {
                    $(Self::$Variant => f.write_str(stringify!($Variant)),)+
                    Self::Unknown(v) => {
                        match $crate::registry::registry().enum_name(Self::NAME, *v) {
                            Some(name) => f.write_str(name),
                            None => write!(f, "Unknown({v:#04x})"),
                        }
                    }
                }
            }
        }

        impl ::serde::Serialize for $Name {
            fn serialize<S: ::serde::Serializer>(
                &self,
                serializer: S,
            ) -> ::core::result::Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl From<u8> for $Name {
            fn from(v: u8) -> Self {
                Self::from_value(v)
            }
        }

        impl From<$Name> for u8 {
            fn from(v: $Name) -> u8 {
                v.value()
            }
        }
    };
}
