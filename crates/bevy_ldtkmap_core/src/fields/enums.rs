//! Translation of LDtk enum value names into Rust enums.
//!
//! Types marked with `#[derive(LdtkEnum)]` implement [`LdtkEnum`] and submit an
//! [`LdtkEnumInfo`] through `inventory`, which lets the injector build an enum member from
//! its `TypeId` alone.

use std::any::{Any, TypeId};

/// A Rust enum whose unit variants mirror an LDtk enum definition.
pub trait LdtkEnum: Sized + Send + 'static {
    /// Variant names as written in LDtk.
    const VARIANTS: &'static [&'static str];

    /// Variant for an already normalized name.
    fn from_variant(name: &str) -> Option<Self>;

    fn variant_name(&self) -> &'static str;
}

/// Normalize a raw LDtk enum value name: surrounding spaces trimmed, inner spaces to `_`.
pub fn normalize_enum_name(raw: &str) -> String {
    raw.trim().replace(' ', "_")
}

/// Translate a raw value name into `E`.
///
/// The error lists the valid names, for reporting.
pub fn parse_enum<E: LdtkEnum>(raw: &str) -> Result<E, String> {
    let name = normalize_enum_name(raw);
    E::from_variant(&name).ok_or_else(|| {
        format!(
            "unknown enum value '{raw}', expected one of: {}",
            E::VARIANTS.join(", ")
        )
    })
}

/// Registration of an [`LdtkEnum`] type, submitted by the derive macro.
pub struct LdtkEnumInfo {
    pub type_id: fn() -> TypeId,
    /// LDtk enum identifier.
    pub name: &'static str,
    pub variants: &'static [&'static str],
    /// Build a boxed variant from a normalized name.
    pub from_variant: fn(&str) -> Option<Box<dyn Any + Send>>,
}

inventory::collect!(LdtkEnumInfo);

impl LdtkEnumInfo {
    /// Registered info for a Rust type, if any.
    pub fn find(type_id: TypeId) -> Option<&'static LdtkEnumInfo> {
        inventory::iter::<LdtkEnumInfo>
            .into_iter()
            .find(|info| (info.type_id)() == type_id)
    }

    /// Registered info for an LDtk enum identifier.
    pub fn find_by_name(name: &str) -> Option<&'static LdtkEnumInfo> {
        inventory::iter::<LdtkEnumInfo>
            .into_iter()
            .find(|info| info.name == name)
    }
}

/// `from_variant` adapter used by the derive macro.
pub fn boxed_variant<E: LdtkEnum>(name: &str) -> Option<Box<dyn Any + Send>> {
    E::from_variant(name).map(|v| Box::new(v) as Box<dyn Any + Send>)
}
