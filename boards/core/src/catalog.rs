//! Closed value catalogs and open identifiers.
//!
//! The keyboard reports raw numbers. Most have a known meaning, but unknown
//! values must still round trip, so identifiers are either a catalog entry or
//! a raw number ([`open_id!`]). Pure value sets without a raw fallback use
//! [`catalog!`] directly and fail to decode unknown bytes.

use std::num::ParseIntError;

/// Integer types that can be parsed with an explicit radix
pub trait FromStrRadix: Sized {
    fn from_str_radix(src: &str, radix: u32) -> Result<Self, ParseIntError>;
}

macro_rules! impl_from_str_radix {
    ($($t:ty),*) => {
        $(
            impl FromStrRadix for $t {
                fn from_str_radix(src: &str, radix: u32) -> Result<Self, ParseIntError> {
                    <$t>::from_str_radix(src, radix)
                }
            }
        )*
    };
}

impl_from_str_radix!(u8, u16, u32, u64);

/// Parse `0x` prefixed hex or plain decimal
pub fn parse_int<T: FromStrRadix>(text: &str) -> Option<T> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => T::from_str_radix(hex, 16).ok(),
        None => T::from_str_radix(text, 10).ok(),
    }
}

/// Declare a closed catalog of named values backed by an integer.
///
/// Generates the enum along with `ALL`, `from_raw`, `raw`, `name`, `from_name`,
/// `Display` and a `TryFrom` that reports [`KeyboardError::InvalidValue`].
///
/// [`KeyboardError::InvalidValue`]: crate::KeyboardError::InvalidValue
#[macro_export]
macro_rules! catalog {
    (
        $( #[$meta:meta] )*
        $vis:vis enum $name:ident : $repr:ident {
            $(
                $( #[$vmeta:meta] )*
                $variant:ident = $value:literal => $label:literal
            ),* $(,)?
        }
    ) => {
        $( #[$meta] )*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr($repr)]
        $vis enum $name {
            $(
                $( #[$vmeta] )*
                $variant = $value,
            )*
        }

        impl $name {
            /// Every catalog entry, in declaration order
            pub const ALL: &'static [Self] = &[ $( Self::$variant ),* ];

            pub const fn from_raw(value: $repr) -> Option<Self> {
                match value {
                    $( $value => Some(Self::$variant), )*
                    _ => None,
                }
            }

            pub const fn raw(self) -> $repr {
                self as $repr
            }

            pub const fn name(self) -> &'static str {
                match self {
                    $( Self::$variant => $label, )*
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                Self::ALL.iter().copied().find(|v| v.name() == name)
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.name())
            }
        }

        impl ::std::convert::TryFrom<$repr> for $name {
            type Error = $crate::KeyboardError;

            fn try_from(value: $repr) -> ::std::result::Result<Self, Self::Error> {
                Self::from_raw(value).ok_or($crate::KeyboardError::InvalidValue {
                    what: stringify!($name),
                    value: value.into(),
                })
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                Self::from_name(s)
                    .or_else(|| $crate::parse_int::<$repr>(s).and_then(Self::from_raw))
                    .ok_or_else(|| format!("unknown {}: {s}", stringify!($name)))
            }
        }
    };
}

/// Declare an open identifier: a catalog entry or any other raw number.
///
/// Equality, ordering and hashing go through the raw value, so `Raw(n)` and the
/// named entry for `n` are the same identifier.
#[macro_export]
macro_rules! open_id {
    (
        $( #[$meta:meta] )*
        $vis:vis enum $name:ident ( $named:ident ) : $repr:ident
    ) => {
        $( #[$meta] )*
        #[derive(Clone, Copy, Debug)]
        $vis enum $name {
            Named($named),
            Raw($repr),
        }

        impl $name {
            pub const fn raw(self) -> $repr {
                match self {
                    Self::Named(n) => n.raw(),
                    Self::Raw(r) => r,
                }
            }

            /// The catalog entry for this value, if there is one
            pub const fn named(self) -> Option<$named> {
                $named::from_raw(self.raw())
            }
        }

        impl From<$repr> for $name {
            fn from(value: $repr) -> Self {
                match $named::from_raw(value) {
                    Some(n) => Self::Named(n),
                    None => Self::Raw(value),
                }
            }
        }

        impl From<$named> for $name {
            fn from(value: $named) -> Self {
                Self::Named(value)
            }
        }

        impl From<$name> for $repr {
            fn from(value: $name) -> Self {
                value.raw()
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.raw() == other.raw()
            }
        }

        impl Eq for $name {}

        impl ::std::hash::Hash for $name {
            fn hash<H: ::std::hash::Hasher>(&self, state: &mut H) {
                self.raw().hash(state)
            }
        }

        impl PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<::std::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $name {
            fn cmp(&self, other: &Self) -> ::std::cmp::Ordering {
                self.raw().cmp(&other.raw())
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                let width = ::std::mem::size_of::<$repr>() * 2;
                match self.named() {
                    Some(n) => write!(f, "0x{:0width$x}[{}]", self.raw(), n.name()),
                    None => write!(f, "0x{:0width$x}", self.raw()),
                }
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                $named::from_name(s)
                    .map(Self::Named)
                    .or_else(|| $crate::parse_int::<$repr>(s).map(Self::from))
                    .ok_or_else(|| format!("unknown {}: {s}", stringify!($name)))
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::catalog! {
        enum Fruit: u8 {
            Apple = 0x01 => "apple",
            Pear = 0x05 => "pear",
        }
    }

    crate::open_id! {
        enum FruitId(Fruit): u8
    }

    #[test]
    fn parse_int_accepts_hex_and_decimal() {
        assert_eq!(parse_int::<u16>("0xff00"), Some(0xFF00));
        assert_eq!(parse_int::<u16>("0XFF00"), Some(0xFF00));
        assert_eq!(parse_int::<u8>("17"), Some(17));
        assert_eq!(parse_int::<u8>("256"), None);
        assert_eq!(parse_int::<u8>("pear"), None);
    }

    #[test]
    fn catalog_lookup() {
        assert_eq!(Fruit::from_raw(5), Some(Fruit::Pear));
        assert_eq!(Fruit::from_raw(2), None);
        assert_eq!(Fruit::from_name("apple"), Some(Fruit::Apple));
        assert_eq!("0x05".parse::<Fruit>(), Ok(Fruit::Pear));
        assert!("banana".parse::<Fruit>().is_err());
        assert!(matches!(
            Fruit::try_from(9u8),
            Err(crate::KeyboardError::InvalidValue { value: 9, .. })
        ));
    }

    #[test]
    fn open_id_round_trips_every_value() {
        for value in 0..=u8::MAX {
            assert_eq!(FruitId::from(value).raw(), value);
        }
        assert_eq!(FruitId::from(1u8), FruitId::Named(Fruit::Apple));
        assert_eq!(FruitId::Raw(5), FruitId::Named(Fruit::Pear));
    }

    #[test]
    fn open_id_display_and_parse() {
        assert_eq!(FruitId::from(5u8).to_string(), "0x05[pear]");
        assert_eq!(FruitId::from(0x42u8).to_string(), "0x42");
        assert_eq!("pear".parse::<FruitId>(), Ok(FruitId::Named(Fruit::Pear)));
        assert_eq!("0x42".parse::<FruitId>(), Ok(FruitId::Raw(0x42)));
        assert_eq!("66".parse::<FruitId>(), Ok(FruitId::Raw(0x42)));
    }
}
