//! Typed field values and their injection into components.

pub mod enums;
pub mod inject;
pub mod parse;
pub mod value;

pub use enums::{LdtkEnum, LdtkEnumInfo, normalize_enum_name, parse_enum};
pub use inject::{
    FieldInjector, FieldPayload, LdtkInjectable, LdtkMember, LdtkTarget, LdtkTargetInfo,
    LdtkTargetRegistry, MemberShape, insert_injected,
};
pub use parse::{
    EnumParser, FromFieldValue, LdtkEntityRef, LdtkValueParser, MemberType, TypedParser,
};
pub use value::{
    FieldData, FieldKind, FieldType, FieldValue, KindMismatch, LdtkField, LdtkFields, parse_color,
};
