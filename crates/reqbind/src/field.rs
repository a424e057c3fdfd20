//! Traits connecting Rust types to the schema compiler.
//!
//! - [`Bind`] is implemented by records, normally through `#[derive(Bind)]`.
//! - [`BindField`] decides how a field of some type is registered: as a
//!   scalar leaf, a multi-valued leaf, or a nested record.
//! - [`BindElement`] is implemented by types that can be an element of a
//!   multi-valued `Vec<T>` field.

use crate::schema::{FieldSite, RecordFields};
use crate::value::ParseText;
use crate::SetError;

/// A record whose fields can be bound from a request.
///
/// Implemented by `#[derive(Bind)]`. Hand-written implementations call one
/// [`RecordFields`] method per field, in declaration order.
pub trait Bind: Sized + 'static {
    /// Type name used in diagnostic labels.
    const TYPE_NAME: &'static str;

    /// Describes every bindable field of the record.
    fn describe<R: 'static>(fields: &mut RecordFields<'_, R, Self>);
}

/// A type that can appear as a field of a [`Bind`] record.
pub trait BindField: Sized + 'static {
    /// Registers this field at `site`.
    fn register<R: 'static>(site: FieldSite<'_, R, Self>);
}

/// A type that can be an element of a multi-valued field.
pub trait BindElement: Sized + 'static {
    /// Parses one element from text.
    fn parse_element(text: &str) -> Result<Self, SetError>;
}

macro_rules! impl_scalar_field {
    ($($ty:ty),* $(,)?) => {
        $(
            impl BindField for $ty {
                fn register<R: 'static>(site: FieldSite<'_, R, Self>) {
                    site.scalar();
                }
            }

            impl BindElement for $ty {
                fn parse_element(text: &str) -> Result<Self, SetError> {
                    <$ty as ParseText>::parse_text(text)
                }
            }
        )*
    };
}

impl_scalar_field!(String, bool);
impl_scalar_field!(i8, i16, i32, i64, i128, isize);
impl_scalar_field!(u8, u16, u32, u64, u128, usize);
impl_scalar_field!(f32, f64);

/// Optional fields are left as `None` until a value is written into them.
impl<T: BindField + Default> BindField for Option<T> {
    fn register<R: 'static>(site: FieldSite<'_, R, Self>) {
        let inner = site
            .optional()
            .project(|slot: &mut Option<T>| slot.get_or_insert_with(T::default));
        T::register(inner);
    }
}

/// Sequences take every value of their key, replacing previous contents.
impl<T: BindElement> BindField for Vec<T> {
    fn register<R: 'static>(site: FieldSite<'_, R, Self>) {
        site.leaf(true, |slot: &mut Vec<T>, values: &[&str]| {
            *slot = values
                .iter()
                .map(|text| T::parse_element(text))
                .collect::<Result<_, _>>()?;
            Ok(())
        });
    }
}
