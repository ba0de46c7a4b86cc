//! Parsed field values and the `LdtkFields` component.

use bevy::prelude::*;
use bevy_ldtkmap_schema::prelude::{FieldDefinition, FieldInstance, TilesetRect};
use serde_json::Value;
use thiserror::Error;

use super::enums::{LdtkEnum, parse_enum};
use crate::error::{ImportError, ImportErrors};
use crate::registry::UidRegistry;

/// Declared kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum FieldKind {
    Int,
    Float,
    Bool,
    String,
    Multiline,
    FilePath,
    Color,
    Enum,
    Point,
    EntityRef,
    Tile,
}

/// Full declared type of a field: kind, arity and enum name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldType {
    pub kind: FieldKind,
    pub is_array: bool,
    /// Enum identifier for `LocalEnum.X` / `ExternEnum.X` types.
    pub enum_name: Option<String>,
}

impl FieldType {
    /// Parse an LDtk `__type` string such as `Int`, `Multilines` or `Array<LocalEnum.Item>`.
    pub fn parse(type_name: &str) -> Option<Self> {
        let (inner, is_array) = match type_name
            .strip_prefix("Array<")
            .and_then(|rest| rest.strip_suffix('>'))
        {
            Some(inner) => (inner, true),
            None => (type_name, false),
        };

        let mut enum_name = None;
        let kind = match inner {
            "Int" => FieldKind::Int,
            "Float" => FieldKind::Float,
            "Bool" => FieldKind::Bool,
            "String" => FieldKind::String,
            "Multilines" => FieldKind::Multiline,
            "FilePath" => FieldKind::FilePath,
            "Color" => FieldKind::Color,
            "Point" => FieldKind::Point,
            "EntityRef" => FieldKind::EntityRef,
            "Tile" => FieldKind::Tile,
            other => {
                let name = other
                    .strip_prefix("LocalEnum.")
                    .or_else(|| other.strip_prefix("ExternEnum."))?;
                enum_name = Some(name.to_string());
                FieldKind::Enum
            }
        };

        Some(Self {
            kind,
            is_array,
            enum_name,
        })
    }

    /// Declared type of a field definition.
    pub fn from_definition(definition: &FieldDefinition) -> Option<Self> {
        let mut field_type = Self::parse(&definition.type_name)?;
        field_type.is_array |= definition.is_array;
        Some(field_type)
    }
}

/// Reading a value as a kind it does not hold.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("requested {requested:?} from a {stored:?} value")]
pub struct KindMismatch {
    pub stored: FieldKind,
    pub requested: FieldKind,
}

/// Payload of a [`FieldValue`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldData {
    /// Legal empty value of a nullable field.
    Null,
    Int(i32),
    Float(f32),
    Bool(bool),
    /// String, multiline, file path, enum value name, or entity IID.
    Text(String),
    Color(Color),
    /// Grid cell of a point field.
    Point(IVec2),
    Tile(TilesetRect),
}

/// One parsed field value, tagged with its declared kind.
///
/// Typed getters never fail: reading a kind the value does not hold logs an error and
/// returns the zero value of the requested type. The single allowed widening is reading a
/// `String` value as `Multiline`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
    kind: FieldKind,
    data: FieldData,
}

impl FieldValue {
    pub fn new(kind: FieldKind, data: FieldData) -> Self {
        Self { kind, data }
    }

    pub fn null(kind: FieldKind) -> Self {
        Self::new(kind, FieldData::Null)
    }

    pub fn int(value: i32) -> Self {
        Self::new(FieldKind::Int, FieldData::Int(value))
    }

    pub fn float(value: f32) -> Self {
        Self::new(FieldKind::Float, FieldData::Float(value))
    }

    pub fn bool(value: bool) -> Self {
        Self::new(FieldKind::Bool, FieldData::Bool(value))
    }

    pub fn text(kind: FieldKind, value: impl Into<String>) -> Self {
        Self::new(kind, FieldData::Text(value.into()))
    }

    /// Parse one raw JSON value against its declared kind.
    ///
    /// `null` is accepted for every kind. Anything else that does not fit the kind is
    /// malformed.
    pub fn from_json(kind: FieldKind, raw: &Value) -> Result<Self, String> {
        if raw.is_null() {
            return Ok(Self::null(kind));
        }

        let data = match kind {
            FieldKind::Int => {
                let value = raw
                    .as_i64()
                    .ok_or_else(|| format!("expected an integer, got {raw}"))?;
                let value =
                    i32::try_from(value).map_err(|_| format!("integer {value} out of range"))?;
                FieldData::Int(value)
            }
            FieldKind::Float => FieldData::Float(
                raw.as_f64()
                    .ok_or_else(|| format!("expected a number, got {raw}"))? as f32,
            ),
            FieldKind::Bool => FieldData::Bool(
                raw.as_bool()
                    .ok_or_else(|| format!("expected a boolean, got {raw}"))?,
            ),
            FieldKind::String | FieldKind::Multiline | FieldKind::FilePath | FieldKind::Enum => {
                FieldData::Text(
                    raw.as_str()
                        .ok_or_else(|| format!("expected a string, got {raw}"))?
                        .to_string(),
                )
            }
            FieldKind::Color => {
                let hex = raw
                    .as_str()
                    .ok_or_else(|| format!("expected a colour string, got {raw}"))?;
                FieldData::Color(parse_color(hex).ok_or_else(|| format!("invalid colour '{hex}'"))?)
            }
            FieldKind::Point => {
                let coord = |key: &str| {
                    raw.get(key)
                        .and_then(Value::as_i64)
                        .and_then(|v| i32::try_from(v).ok())
                };
                let (Some(cx), Some(cy)) = (coord("cx"), coord("cy")) else {
                    return Err(format!("expected a {{cx, cy}} point of 32-bit cells, got {raw}"));
                };
                FieldData::Point(IVec2::new(cx, cy))
            }
            FieldKind::EntityRef => {
                let iid = raw
                    .get("entityIid")
                    .and_then(Value::as_str)
                    .ok_or_else(|| format!("expected an entity reference, got {raw}"))?;
                FieldData::Text(iid.to_string())
            }
            FieldKind::Tile => FieldData::Tile(
                serde_json::from_value(raw.clone())
                    .map_err(|e| format!("expected a tileset rectangle: {e}"))?,
            ),
        };

        Ok(Self { kind, data })
    }

    #[inline]
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    #[inline]
    pub fn data(&self) -> &FieldData {
        &self.data
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self.data, FieldData::Null)
    }

    /// Check that this value may be read as `requested`.
    pub fn check(&self, requested: FieldKind) -> Result<(), KindMismatch> {
        let widened = self.kind == FieldKind::String && requested == FieldKind::Multiline;
        if self.kind == requested || widened {
            Ok(())
        } else {
            Err(KindMismatch {
                stored: self.kind,
                requested,
            })
        }
    }

    fn read<T>(&self, requested: FieldKind, zero: T, extract: impl FnOnce(&FieldData) -> Option<T>) -> T {
        if let Err(mismatch) = self.check(requested) {
            error!("Trying to get improper field type: {mismatch}");
            return zero;
        }
        extract(&self.data).unwrap_or(zero)
    }

    pub fn get_int(&self) -> i32 {
        self.read(FieldKind::Int, 0, |data| match data {
            FieldData::Int(v) => Some(*v),
            _ => None,
        })
    }

    pub fn get_float(&self) -> f32 {
        self.read(FieldKind::Float, 0.0, |data| match data {
            FieldData::Float(v) => Some(*v),
            _ => None,
        })
    }

    pub fn get_bool(&self) -> bool {
        self.read(FieldKind::Bool, false, |data| match data {
            FieldData::Bool(v) => Some(*v),
            _ => None,
        })
    }

    pub fn get_string(&self) -> String {
        self.read_text(FieldKind::String)
    }

    pub fn get_multiline(&self) -> String {
        self.read_text(FieldKind::Multiline)
    }

    pub fn get_file_path(&self) -> String {
        self.read_text(FieldKind::FilePath)
    }

    /// IID of the referenced entity instance.
    pub fn get_entity_ref(&self) -> String {
        self.read_text(FieldKind::EntityRef)
    }

    /// Raw enum value name, as written in the document.
    pub fn get_enum_name(&self) -> String {
        self.read_text(FieldKind::Enum)
    }

    /// Enum value translated into `E`; unknown names log the valid ones.
    pub fn get_enum<E: LdtkEnum + Default>(&self) -> E {
        let name = self.get_enum_name();
        if name.is_empty() {
            return E::default();
        }
        parse_enum::<E>(&name).unwrap_or_else(|message| {
            error!("{message}");
            E::default()
        })
    }

    /// Colour value; white when unset.
    pub fn get_color(&self) -> Color {
        self.read(FieldKind::Color, Color::WHITE, |data| match data {
            FieldData::Color(v) => Some(*v),
            _ => None,
        })
    }

    pub fn get_point(&self) -> IVec2 {
        self.read(FieldKind::Point, IVec2::ZERO, |data| match data {
            FieldData::Point(v) => Some(*v),
            _ => None,
        })
    }

    pub fn get_tile(&self) -> TilesetRect {
        self.read(FieldKind::Tile, TilesetRect::default(), |data| match data {
            FieldData::Tile(v) => Some(*v),
            _ => None,
        })
    }

    fn read_text(&self, requested: FieldKind) -> String {
        self.read(requested, String::new(), |data| match data {
            FieldData::Text(v) => Some(v.clone()),
            _ => None,
        })
    }

    /// Human-readable rendering of any kind, for logs and UI.
    pub fn as_display_string(&self) -> String {
        match &self.data {
            FieldData::Null => String::new(),
            FieldData::Int(v) => v.to_string(),
            FieldData::Float(v) => v.to_string(),
            FieldData::Bool(v) => v.to_string(),
            FieldData::Text(v) => v.clone(),
            FieldData::Color(v) => v.to_srgba().to_hex(),
            FieldData::Point(v) => format!("{}, {}", v.x, v.y),
            FieldData::Tile(v) => format!("tileset {} ({}, {}, {}, {})", v.tileset_uid, v.x, v.y, v.w, v.h),
        }
    }
}

/// Parse an LDtk colour string (`#rrggbb`, `#rrggbbaa`).
pub fn parse_color(hex: &str) -> Option<Color> {
    Srgba::hex(hex).ok().map(Color::Srgba)
}

/// One field of an entity or level, with all its values.
#[derive(Debug, Clone, PartialEq)]
pub struct LdtkField {
    pub identifier: String,
    pub field_type: FieldType,
    /// One value for single fields, any number for arrays.
    pub values: Vec<FieldValue>,
    /// The raw value did not fit the declared type; `values` holds defaults.
    pub malformed: bool,
}

impl LdtkField {
    /// Parse a field instance against its declared type.
    ///
    /// `definition` is the resolved field definition when available; otherwise the
    /// instance's own `__type` is used. Malformed values are reported and replaced by a
    /// single null value.
    pub fn from_instance(
        instance: &FieldInstance,
        definition: Option<&FieldDefinition>,
        context: &str,
        errors: &mut ImportErrors,
    ) -> Option<Self> {
        let identifier = definition
            .map(|d| d.identifier.clone())
            .unwrap_or_else(|| instance.identifier.clone());
        let field_type = definition
            .and_then(FieldType::from_definition)
            .or_else(|| FieldType::parse(&instance.type_name));

        let Some(field_type) = field_type else {
            errors.report(ImportError::field_mismatch(
                &identifier,
                format!("unknown field type '{}'", instance.type_name),
                context,
            ));
            return None;
        };

        let parsed = if field_type.is_array {
            match &instance.value {
                Value::Null => Ok(Vec::new()),
                Value::Array(items) => items
                    .iter()
                    .map(|item| FieldValue::from_json(field_type.kind, item))
                    .collect(),
                other => Err(format!("expected an array, got {other}")),
            }
        } else {
            FieldValue::from_json(field_type.kind, &instance.value).map(|v| vec![v])
        };

        let (values, malformed) = match parsed {
            Ok(values) => (values, false),
            Err(message) => {
                errors.report(ImportError::field_mismatch(&identifier, message, context));
                (vec![FieldValue::null(field_type.kind)], true)
            }
        };

        Some(Self {
            identifier,
            field_type,
            values,
            malformed,
        })
    }

    /// First value, for single fields.
    pub fn first(&self) -> Option<&FieldValue> {
        self.values.first()
    }
}

/// Field values of an entity or level node, keyed by field identifier.
///
/// # Example
///
/// ```rust,no_run
/// # use bevy::prelude::*;
/// # use bevy_ldtkmap_core::prelude::*;
/// fn read_health(mobs: Query<(&LdtkEntity, &LdtkFields)>) {
///     for (entity, fields) in &mobs {
///         info!("{} has {} hp", entity.identifier, fields.get_int("hp"));
///     }
/// }
/// ```
#[derive(Component, Debug, Clone, Default)]
pub struct LdtkFields {
    fields: Vec<LdtkField>,
}

impl LdtkFields {
    pub fn new(fields: Vec<LdtkField>) -> Self {
        Self { fields }
    }

    /// Parse the field instances of an entity or level.
    ///
    /// Each instance is checked against its definition; an instance whose definition cannot
    /// be resolved is reported and left out.
    pub fn from_instances(
        instances: &[FieldInstance],
        registry: &UidRegistry<'_>,
        context: &str,
        errors: &mut ImportErrors,
    ) -> Self {
        let fields = instances
            .iter()
            .filter_map(|instance| {
                let field_context = format!("field '{}' of {context}", instance.identifier);
                let definition = errors.ok(registry.field_def(instance.def_uid, &field_context))?;
                LdtkField::from_instance(instance, Some(definition), context, errors)
            })
            .collect();
        Self { fields }
    }

    pub fn get(&self, identifier: &str) -> Option<&LdtkField> {
        self.fields.iter().find(|f| f.identifier == identifier)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.get(identifier).is_some()
    }

    /// First value of a field, logging when the field does not exist.
    pub fn value(&self, identifier: &str) -> Option<&FieldValue> {
        let value = self.get(identifier).and_then(LdtkField::first);
        if value.is_none() {
            error!("No field named '{identifier}'");
        }
        value
    }

    /// Every value of an array field; empty when missing.
    pub fn array(&self, identifier: &str) -> &[FieldValue] {
        self.get(identifier).map_or(&[], |f| f.values.as_slice())
    }

    pub fn get_int(&self, identifier: &str) -> i32 {
        self.value(identifier).map_or(0, FieldValue::get_int)
    }

    pub fn get_float(&self, identifier: &str) -> f32 {
        self.value(identifier).map_or(0.0, FieldValue::get_float)
    }

    pub fn get_bool(&self, identifier: &str) -> bool {
        self.value(identifier).is_some_and(FieldValue::get_bool)
    }

    pub fn get_string(&self, identifier: &str) -> String {
        self.value(identifier)
            .map(FieldValue::get_string)
            .unwrap_or_default()
    }

    pub fn get_color(&self, identifier: &str) -> Color {
        self.value(identifier)
            .map_or(Color::WHITE, FieldValue::get_color)
    }

    pub fn get_point(&self, identifier: &str) -> IVec2 {
        self.value(identifier)
            .map_or(IVec2::ZERO, FieldValue::get_point)
    }

    pub fn get_enum<E: LdtkEnum + Default>(&self, identifier: &str) -> E {
        self.value(identifier)
            .map(FieldValue::get_enum::<E>)
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LdtkField> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_type_parsing() {
        let ty = FieldType::parse("Array<LocalEnum.Item>").unwrap();
        assert_eq!(ty.kind, FieldKind::Enum);
        assert!(ty.is_array);
        assert_eq!(ty.enum_name.as_deref(), Some("Item"));

        assert_eq!(FieldType::parse("Multilines").unwrap().kind, FieldKind::Multiline);
        assert!(FieldType::parse("Mystery").is_none());
    }

    #[test]
    fn test_int_read_as_float_is_zero_and_mismatch() {
        let value = FieldValue::int(5);

        assert_eq!(
            value.check(FieldKind::Float),
            Err(KindMismatch {
                stored: FieldKind::Int,
                requested: FieldKind::Float,
            })
        );
        assert_eq!(value.get_float(), 0.0);
        assert_eq!(value.get_int(), 5);
    }

    #[test]
    fn test_string_widens_to_multiline_only() {
        let value = FieldValue::text(FieldKind::String, "hello");
        assert!(value.check(FieldKind::Multiline).is_ok());
        assert_eq!(value.get_multiline(), "hello");

        let multiline = FieldValue::text(FieldKind::Multiline, "a\nb");
        assert!(multiline.check(FieldKind::String).is_err());
        assert_eq!(multiline.get_string(), "");
    }

    #[test]
    fn test_from_json_kinds() {
        assert_eq!(
            FieldValue::from_json(FieldKind::Point, &json!({ "cx": 3, "cy": 4 }))
                .unwrap()
                .get_point(),
            IVec2::new(3, 4)
        );
        assert_eq!(
            FieldValue::from_json(FieldKind::EntityRef, &json!({ "entityIid": "abc" }))
                .unwrap()
                .get_entity_ref(),
            "abc"
        );
        assert_eq!(
            FieldValue::from_json(FieldKind::Color, &json!("#FF0000"))
                .unwrap()
                .get_color(),
            Color::Srgba(Srgba::rgb(1.0, 0.0, 0.0))
        );
        assert!(FieldValue::from_json(FieldKind::Int, &json!("abc")).is_err());
        assert!(FieldValue::from_json(FieldKind::Int, &Value::Null).unwrap().is_null());
    }

    #[test]
    fn test_null_color_reads_white() {
        assert_eq!(FieldValue::null(FieldKind::Color).get_color(), Color::WHITE);
    }

    #[test]
    fn test_malformed_instance_is_reported_once() {
        let instance = FieldInstance {
            identifier: "hp".into(),
            type_name: "Int".into(),
            value: json!("lots"),
            ..Default::default()
        };
        let mut errors = ImportErrors::new();

        let field = LdtkField::from_instance(&instance, None, "entity 'Mob'", &mut errors).unwrap();

        assert!(field.malformed);
        assert_eq!(errors.len(), 1);
        assert_eq!(field.first().unwrap().get_int(), 0);
    }

    #[test]
    fn test_out_of_range_point_is_malformed() {
        let point = |raw| FieldValue::from_json(FieldKind::Point, &raw);
        assert!(point(json!({ "cx": 5_000_000_000_i64, "cy": 0 })).is_err());
        assert!(point(json!({ "cx": 1.5, "cy": 2 })).is_err());
        assert_eq!(point(json!({ "cx": -2, "cy": 7 })).unwrap().get_point(), IVec2::new(-2, 7));

        let instance = FieldInstance {
            identifier: "target".into(),
            type_name: "Point".into(),
            value: json!({ "cx": 3, "cy": -9_000_000_000_i64 }),
            ..Default::default()
        };
        let mut errors = ImportErrors::new();

        let field = LdtkField::from_instance(&instance, None, "entity 'Mob'", &mut errors).unwrap();

        assert!(field.malformed);
        assert_eq!(errors.len(), 1);
        assert_eq!(field.first().unwrap().get_point(), IVec2::ZERO);
    }

    #[test]
    fn test_array_field_collects_every_value() {
        let instance = FieldInstance {
            identifier: "patrol".into(),
            type_name: "Array<Point>".into(),
            value: json!([{ "cx": 1, "cy": 2 }, { "cx": 3, "cy": 4 }]),
            ..Default::default()
        };
        let mut errors = ImportErrors::new();

        let fields = LdtkFields::new(vec![
            LdtkField::from_instance(&instance, None, "test", &mut errors).unwrap(),
        ]);

        let points: Vec<_> = fields.array("patrol").iter().map(FieldValue::get_point).collect();
        assert_eq!(points, vec![IVec2::new(1, 2), IVec2::new(3, 4)]);
        assert!(errors.is_empty());
    }
}
