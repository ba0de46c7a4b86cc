//! Per-type field value parsers.
//!
//! The injector picks a parser by the static type of the target member, searching an ordered
//! list of [`LdtkValueParser`] implementations. Supporting a new member type means
//! registering one more parser, usually a [`TypedParser`] over a [`FromFieldValue`] impl.

use std::any::{Any, TypeId, type_name};
use std::marker::PhantomData;

use bevy::prelude::*;
use bevy_ldtkmap_schema::prelude::TilesetRect;

use super::enums::LdtkEnumInfo;
use super::value::{FieldData, FieldKind, FieldValue};

/// Static type of an injectable member (the element type for `Option`/`Vec` members).
#[derive(Clone, Copy)]
pub struct MemberType {
    pub type_id: fn() -> TypeId,
    pub type_name: fn() -> &'static str,
}

impl MemberType {
    pub const fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>,
            type_name: type_name::<T>,
        }
    }

    pub fn is<T: 'static>(&self) -> bool {
        (self.type_id)() == TypeId::of::<T>()
    }

    pub fn name(&self) -> &'static str {
        (self.type_name)()
    }
}

impl std::fmt::Debug for MemberType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A parser turning a [`FieldValue`] into a value of some member type.
pub trait LdtkValueParser: Send + Sync + 'static {
    /// Whether this parser produces values of `member`.
    fn parses(&self, member: &MemberType) -> bool;

    /// Parse one non-null value. The box holds a value of the member's type.
    fn parse(&self, value: &FieldValue, member: &MemberType) -> Result<Box<dyn Any + Send>, String>;
}

/// Types that can be built from a single field value.
///
/// # Example
///
/// ```rust
/// use bevy_ldtkmap_core::prelude::*;
///
/// struct Speed(f32);
///
/// impl FromFieldValue for Speed {
///     fn from_field_value(value: &FieldValue) -> Result<Self, String> {
///         f32::from_field_value(value).map(Speed)
///     }
/// }
///
/// let mut injector = FieldInjector::with_defaults();
/// injector.register(TypedParser::<Speed>::new());
/// ```
pub trait FromFieldValue: Sized + Send + 'static {
    fn from_field_value(value: &FieldValue) -> Result<Self, String>;
}

/// Reference to another entity instance, by IID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Reflect)]
pub struct LdtkEntityRef(pub String);

fn mismatch(value: &FieldValue, expected: &str) -> String {
    format!("cannot read a {:?} field as {expected}", value.kind())
}

fn integer(value: &FieldValue) -> Result<i64, String> {
    match value.data() {
        FieldData::Int(v) => Ok(i64::from(*v)),
        _ => Err(mismatch(value, "an integer")),
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {$(
        impl FromFieldValue for $ty {
            fn from_field_value(value: &FieldValue) -> Result<Self, String> {
                let raw = integer(value)?;
                <$ty>::try_from(raw)
                    .map_err(|_| format!("{raw} does not fit in {}", stringify!($ty)))
            }
        }
    )*};
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

impl FromFieldValue for f32 {
    fn from_field_value(value: &FieldValue) -> Result<Self, String> {
        match value.data() {
            FieldData::Float(v) => Ok(*v),
            FieldData::Int(v) => Ok(*v as f32),
            _ => Err(mismatch(value, "a float")),
        }
    }
}

impl FromFieldValue for f64 {
    fn from_field_value(value: &FieldValue) -> Result<Self, String> {
        f32::from_field_value(value).map(f64::from)
    }
}

impl FromFieldValue for bool {
    fn from_field_value(value: &FieldValue) -> Result<Self, String> {
        match value.data() {
            FieldData::Bool(v) => Ok(*v),
            _ => Err(mismatch(value, "a boolean")),
        }
    }
}

impl FromFieldValue for String {
    fn from_field_value(value: &FieldValue) -> Result<Self, String> {
        match (value.kind(), value.data()) {
            (
                FieldKind::String | FieldKind::Multiline | FieldKind::FilePath | FieldKind::Enum,
                FieldData::Text(text),
            ) => Ok(text.clone()),
            _ => Err(mismatch(value, "a string")),
        }
    }
}

impl FromFieldValue for Color {
    fn from_field_value(value: &FieldValue) -> Result<Self, String> {
        match value.data() {
            FieldData::Color(v) => Ok(*v),
            _ => Err(mismatch(value, "a colour")),
        }
    }
}

impl FromFieldValue for IVec2 {
    fn from_field_value(value: &FieldValue) -> Result<Self, String> {
        match value.data() {
            FieldData::Point(v) => Ok(*v),
            _ => Err(mismatch(value, "a point")),
        }
    }
}

impl FromFieldValue for UVec2 {
    fn from_field_value(value: &FieldValue) -> Result<Self, String> {
        let point = IVec2::from_field_value(value)?;
        if point.x < 0 || point.y < 0 {
            return Err(format!("point {point} has a negative coordinate"));
        }
        Ok(point.as_uvec2())
    }
}

impl FromFieldValue for Vec2 {
    fn from_field_value(value: &FieldValue) -> Result<Self, String> {
        IVec2::from_field_value(value).map(|p| p.as_vec2())
    }
}

impl FromFieldValue for TilesetRect {
    fn from_field_value(value: &FieldValue) -> Result<Self, String> {
        match value.data() {
            FieldData::Tile(v) => Ok(*v),
            _ => Err(mismatch(value, "a tile")),
        }
    }
}

impl FromFieldValue for LdtkEntityRef {
    fn from_field_value(value: &FieldValue) -> Result<Self, String> {
        match (value.kind(), value.data()) {
            (FieldKind::EntityRef, FieldData::Text(iid)) => Ok(LdtkEntityRef(iid.clone())),
            _ => Err(mismatch(value, "an entity reference")),
        }
    }
}

/// Parser for one concrete [`FromFieldValue`] type.
pub struct TypedParser<T>(PhantomData<fn() -> T>);

impl<T> TypedParser<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for TypedParser<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FromFieldValue> LdtkValueParser for TypedParser<T> {
    fn parses(&self, member: &MemberType) -> bool {
        member.is::<T>()
    }

    fn parse(&self, value: &FieldValue, _member: &MemberType) -> Result<Box<dyn Any + Send>, String> {
        T::from_field_value(value).map(|v| Box::new(v) as Box<dyn Any + Send>)
    }
}

/// Parser for every `#[derive(LdtkEnum)]` type, looked up by `TypeId`.
#[derive(Default)]
pub struct EnumParser;

impl LdtkValueParser for EnumParser {
    fn parses(&self, member: &MemberType) -> bool {
        LdtkEnumInfo::find((member.type_id)()).is_some()
    }

    fn parse(&self, value: &FieldValue, member: &MemberType) -> Result<Box<dyn Any + Send>, String> {
        let info = LdtkEnumInfo::find((member.type_id)())
            .ok_or_else(|| format!("{} is not a registered LDtk enum", member.name()))?;
        let FieldData::Text(raw) = value.data() else {
            return Err(mismatch(value, info.name));
        };
        let name = super::enums::normalize_enum_name(raw);
        (info.from_variant)(&name).ok_or_else(|| {
            format!(
                "unknown {} value '{raw}', expected one of: {}",
                info.name,
                info.variants.join(", ")
            )
        })
    }
}

/// Parsers registered by [`FieldInjector::with_defaults`](super::FieldInjector::with_defaults).
pub fn default_parsers() -> Vec<Box<dyn LdtkValueParser>> {
    vec![
        Box::new(TypedParser::<i32>::new()),
        Box::new(TypedParser::<i64>::new()),
        Box::new(TypedParser::<u32>::new()),
        Box::new(TypedParser::<u8>::new()),
        Box::new(TypedParser::<u16>::new()),
        Box::new(TypedParser::<i16>::new()),
        Box::new(TypedParser::<usize>::new()),
        Box::new(TypedParser::<f32>::new()),
        Box::new(TypedParser::<f64>::new()),
        Box::new(TypedParser::<bool>::new()),
        Box::new(TypedParser::<String>::new()),
        Box::new(TypedParser::<Color>::new()),
        Box::new(TypedParser::<IVec2>::new()),
        Box::new(TypedParser::<UVec2>::new()),
        Box::new(TypedParser::<Vec2>::new()),
        Box::new(TypedParser::<TilesetRect>::new()),
        Box::new(TypedParser::<LdtkEntityRef>::new()),
        Box::new(EnumParser),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_type_identity() {
        let member = MemberType::of::<u32>();
        assert!(member.is::<u32>());
        assert!(!member.is::<i32>());
        assert_eq!(member.name(), "u32");
    }

    #[test]
    fn test_integer_range_is_checked() {
        assert_eq!(u8::from_field_value(&FieldValue::int(200)), Ok(200));
        assert!(u8::from_field_value(&FieldValue::int(300)).is_err());
        assert!(u32::from_field_value(&FieldValue::int(-1)).is_err());
    }

    #[test]
    fn test_parsers_are_strict_about_kind() {
        assert!(i32::from_field_value(&FieldValue::float(1.5)).is_err());
        assert!(bool::from_field_value(&FieldValue::int(1)).is_err());
        assert_eq!(f32::from_field_value(&FieldValue::int(2)), Ok(2.0));
    }

    #[test]
    fn test_typed_parser_boxes_member_type() {
        let parser = TypedParser::<Vec2>::new();
        let member = MemberType::of::<Vec2>();
        let value = FieldValue::new(FieldKind::Point, FieldData::Point(IVec2::new(3, -1)));

        assert!(parser.parses(&member));
        let parsed = parser.parse(&value, &member).unwrap();
        assert_eq!(*parsed.downcast::<Vec2>().unwrap(), Vec2::new(3.0, -1.0));
    }

    #[test]
    fn test_entity_ref_requires_entity_ref_kind() {
        let reference = FieldValue::text(FieldKind::EntityRef, "iid-1");
        assert_eq!(
            LdtkEntityRef::from_field_value(&reference),
            Ok(LdtkEntityRef("iid-1".into()))
        );
        let plain = FieldValue::text(FieldKind::String, "iid-1");
        assert!(LdtkEntityRef::from_field_value(&plain).is_err());
    }
}
