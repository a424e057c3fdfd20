//! Text coercion for scalar field kinds.
//!
//! Every scalar a field can hold implements [`ParseText`]. Integer and float
//! parsing is base 10 and checked against the width of the target type;
//! booleans accept the usual spellings of true and false.

use crate::SetError;
use std::fmt::Display;
use std::str::FromStr;

/// A scalar that can be parsed from one textual value.
pub trait ParseText: Sized {
    /// Kind name reported in parse errors.
    const KIND: &'static str;

    /// Parses `text` into a value of this kind.
    fn parse_text(text: &str) -> Result<Self, SetError>;
}

impl ParseText for String {
    const KIND: &'static str = "string";

    fn parse_text(text: &str) -> Result<Self, SetError> {
        Ok(text.to_string())
    }
}

impl ParseText for bool {
    const KIND: &'static str = "bool";

    fn parse_text(text: &str) -> Result<Self, SetError> {
        match text {
            "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
            "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
            _ => Err(SetError::parse(text, Self::KIND, "expected true or false")),
        }
    }
}

macro_rules! impl_parse_text_via_from_str {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ParseText for $ty {
                const KIND: &'static str = stringify!($ty);

                fn parse_text(text: &str) -> Result<Self, SetError> {
                    text.parse::<$ty>()
                        .map_err(|e| SetError::parse(text, Self::KIND, e))
                }
            }
        )*
    };
}

impl_parse_text_via_from_str!(i8, i16, i32, i64, i128, isize);
impl_parse_text_via_from_str!(u8, u16, u32, u64, u128, usize);
impl_parse_text_via_from_str!(f32, f64);

/// Decodes `text` with the type's own [`FromStr`] implementation.
///
/// Decoder failures become [`SetError::CustomDecode`] with the decoder's
/// message unchanged.
pub fn parse_from_str<T>(text: &str) -> Result<T, SetError>
where
    T: FromStr,
    T::Err: Display,
{
    text.parse::<T>().map_err(SetError::custom)
}
