//! Injection of field values into user components.
//!
//! A component opts in with `#[derive(LdtkInjectable)]`, which lists its injectable members
//! at compile time. The [`FieldInjector`] walks that list, never the target's layout.
//!
//! ```rust,ignore
//! #[derive(Component, Default, LdtkInjectable)]
//! #[ldtk(entity = "Mob")]
//! struct Mob {
//!     #[ldtk]
//!     hp: i32,
//!     #[ldtk(name = "loot")]
//!     drops: Vec<Item>,
//!     #[ldtk]
//!     target: Option<LdtkEntityRef>,
//! }
//! ```

use std::any::Any;

use bevy::ecs::world::EntityWorldMut;
use bevy::prelude::*;

use super::parse::{LdtkValueParser, MemberType, default_parsers};
use super::value::LdtkFields;
use crate::error::{ImportError, ImportErrors};

/// Arity of an injectable member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberShape {
    /// `T`
    Single,
    /// `Option<T>`, `None` for null values.
    Optional,
    /// `Vec<T>`, from array fields.
    Array,
}

/// Parsed values handed to a member setter.
pub enum FieldPayload {
    Single(Box<dyn Any + Send>),
    Optional(Option<Box<dyn Any + Send>>),
    Array(Vec<Box<dyn Any + Send>>),
}

impl FieldPayload {
    pub fn into_single<T: 'static>(self) -> Option<T> {
        match self {
            FieldPayload::Single(value) => value.downcast::<T>().ok().map(|v| *v),
            _ => None,
        }
    }

    pub fn into_optional<T: 'static>(self) -> Option<Option<T>> {
        match self {
            FieldPayload::Optional(None) => Some(None),
            FieldPayload::Optional(Some(value)) => value.downcast::<T>().ok().map(|v| Some(*v)),
            _ => None,
        }
    }

    pub fn into_array<T: 'static>(self) -> Option<Vec<T>> {
        match self {
            FieldPayload::Array(values) => values
                .into_iter()
                .map(|value| value.downcast::<T>().ok().map(|v| *v))
                .collect(),
            _ => None,
        }
    }
}

/// One injectable member of `T`, generated by `#[derive(LdtkInjectable)]`.
pub struct LdtkMember<T> {
    /// LDtk field identifier.
    pub name: &'static str,
    pub element: MemberType,
    pub shape: MemberShape,
    /// Store a payload; `false` if it holds the wrong type.
    pub assign: fn(&mut T, FieldPayload) -> bool,
    /// Restore the member's default.
    pub reset: fn(&mut T),
}

/// A type whose members can be filled from LDtk fields.
pub trait LdtkInjectable: Default + 'static {
    fn members() -> &'static [LdtkMember<Self>];
}

/// Ordered set of value parsers plus the injection routine.
#[derive(Resource)]
pub struct FieldInjector {
    parsers: Vec<Box<dyn LdtkValueParser>>,
}

impl Default for FieldInjector {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl FieldInjector {
    /// Injector without any parser.
    pub fn empty() -> Self {
        Self {
            parsers: Vec::new(),
        }
    }

    /// Injector with parsers for primitives, colours, points, tiles, entity refs and enums.
    pub fn with_defaults() -> Self {
        Self {
            parsers: default_parsers(),
        }
    }

    /// Add a parser. Parsers are searched in registration order.
    pub fn register(&mut self, parser: impl LdtkValueParser) -> &mut Self {
        self.parsers.push(Box::new(parser));
        self
    }

    /// First parser accepting `member`.
    pub fn parser_for(&self, member: &MemberType) -> Option<&dyn LdtkValueParser> {
        self.parsers
            .iter()
            .find(|parser| parser.parses(member))
            .map(|parser| parser.as_ref())
    }

    /// Fill the members of `target` from `fields`.
    ///
    /// Fields without a member are ignored. A member that cannot be filled is reported and
    /// left at its default. Returns the number of members assigned.
    pub fn inject<T: LdtkInjectable>(
        &self,
        target: &mut T,
        fields: &LdtkFields,
        context: &str,
        errors: &mut ImportErrors,
    ) -> usize {
        let mut assigned = 0;

        for member in T::members() {
            let Some(field) = fields.get(member.name) else {
                continue;
            };

            // Already reported when the field was parsed
            if field.malformed {
                (member.reset)(target);
                continue;
            }

            let mut fail = |message: String| {
                errors.report(ImportError::field_mismatch(member.name, message, context));
            };

            let Some(parser) = self.parser_for(&member.element) else {
                fail(format!("no parser for member type {}", member.element.name()));
                (member.reset)(target);
                continue;
            };

            if field.field_type.is_array != (member.shape == MemberShape::Array) {
                fail(format!(
                    "{} field cannot fill a {:?} member",
                    if field.field_type.is_array { "array" } else { "single" },
                    member.shape
                ));
                (member.reset)(target);
                continue;
            }

            let payload = match member.shape {
                MemberShape::Single => match field.first() {
                    None => {
                        (member.reset)(target);
                        continue;
                    }
                    Some(value) if value.is_null() => {
                        (member.reset)(target);
                        continue;
                    }
                    Some(value) => parser.parse(value, &member.element).map(FieldPayload::Single),
                },
                MemberShape::Optional => match field.first() {
                    Some(value) if !value.is_null() => parser.parse(value, &member.element)
                        .map(|v| FieldPayload::Optional(Some(v))),
                    _ => Ok(FieldPayload::Optional(None)),
                },
                MemberShape::Array => field
                    .values
                    .iter()
                    .filter(|value| !value.is_null())
                    .map(|value| parser.parse(value, &member.element))
                    .collect::<Result<Vec<_>, _>>()
                    .map(FieldPayload::Array),
            };

            match payload {
                Ok(payload) => {
                    if (member.assign)(target, payload) {
                        assigned += 1;
                    } else {
                        fail(format!(
                            "parser produced the wrong type for {}",
                            member.element.name()
                        ));
                        (member.reset)(target);
                    }
                }
                Err(message) => {
                    fail(message);
                    (member.reset)(target);
                }
            }
        }

        assigned
    }
}

/// What an injectable component is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LdtkTarget {
    /// Entities of the given LDtk entity identifier.
    Entity(&'static str),
    /// Every level node.
    Level,
}

/// Registration of an injectable component, submitted by `#[derive(LdtkInjectable)]`.
pub struct LdtkTargetInfo {
    pub target: LdtkTarget,
    pub type_name: &'static str,
    /// Build the component from the node's fields and insert it.
    pub insert: fn(&mut EntityWorldMut, &FieldInjector, &LdtkFields, &str, &mut ImportErrors),
}

inventory::collect!(LdtkTargetInfo);

/// Build `T` from defaults plus injected fields and insert it on `entity`.
pub fn insert_injected<T: LdtkInjectable + Component>(
    entity: &mut EntityWorldMut,
    injector: &FieldInjector,
    fields: &LdtkFields,
    context: &str,
    errors: &mut ImportErrors,
) {
    let mut component = T::default();
    injector.inject(&mut component, fields, context, errors);
    entity.insert(component);
}

/// Every registered injectable component, indexed by target.
#[derive(Resource, Default)]
pub struct LdtkTargetRegistry {
    targets: Vec<&'static LdtkTargetInfo>,
}

impl LdtkTargetRegistry {
    /// Collect every `#[derive(LdtkInjectable)]` target linked into the binary.
    pub fn from_inventory() -> Self {
        let targets: Vec<_> = inventory::iter::<LdtkTargetInfo>.into_iter().collect();
        for info in &targets {
            debug!("Registered LDtk target {} for {:?}", info.type_name, info.target);
        }
        Self { targets }
    }

    pub fn register(&mut self, info: &'static LdtkTargetInfo) {
        self.targets.push(info);
    }

    /// Components to build for entities of the given identifier.
    pub fn for_entity<'a>(&'a self, identifier: &'a str) -> impl Iterator<Item = &'static LdtkTargetInfo> + 'a {
        self.targets
            .iter()
            .copied()
            .filter(move |info| matches!(info.target, LdtkTarget::Entity(id) if id == identifier))
    }

    /// Components to build for level nodes.
    pub fn for_level(&self) -> impl Iterator<Item = &'static LdtkTargetInfo> + '_ {
        self.targets
            .iter()
            .copied()
            .filter(|info| info.target == LdtkTarget::Level)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::value::{FieldData, FieldKind, FieldType, LdtkField};

    #[derive(Debug, Default, PartialEq)]
    struct Mob {
        hp: i32,
        speed: f32,
        tags: Vec<String>,
        target: Option<String>,
        untouched: u8,
    }

    static MOB_MEMBERS: &[LdtkMember<Mob>] = &[
        LdtkMember {
            name: "hp",
            element: MemberType::of::<i32>(),
            shape: MemberShape::Single,
            assign: |mob, payload| payload.into_single::<i32>().map(|v| mob.hp = v).is_some(),
            reset: |mob| mob.hp = Mob::default().hp,
        },
        LdtkMember {
            name: "speed",
            element: MemberType::of::<f32>(),
            shape: MemberShape::Single,
            assign: |mob, payload| payload.into_single::<f32>().map(|v| mob.speed = v).is_some(),
            reset: |mob| mob.speed = Mob::default().speed,
        },
        LdtkMember {
            name: "tags",
            element: MemberType::of::<String>(),
            shape: MemberShape::Array,
            assign: |mob, payload| payload.into_array::<String>().map(|v| mob.tags = v).is_some(),
            reset: |mob| mob.tags = Mob::default().tags,
        },
        LdtkMember {
            name: "target",
            element: MemberType::of::<String>(),
            shape: MemberShape::Optional,
            assign: |mob, payload| payload.into_optional::<String>().map(|v| mob.target = v).is_some(),
            reset: |mob| mob.target = Mob::default().target,
        },
        LdtkMember {
            name: "untouched",
            element: MemberType::of::<u8>(),
            shape: MemberShape::Single,
            assign: |mob, payload| payload.into_single::<u8>().map(|v| mob.untouched = v).is_some(),
            reset: |mob| mob.untouched = Mob::default().untouched,
        },
    ];

    impl LdtkInjectable for Mob {
        fn members() -> &'static [LdtkMember<Self>] {
            MOB_MEMBERS
        }
    }

    fn field(identifier: &str, kind: FieldKind, is_array: bool, values: Vec<FieldValue>) -> LdtkField {
        LdtkField {
            identifier: identifier.into(),
            field_type: FieldType {
                kind,
                is_array,
                enum_name: None,
            },
            values,
            malformed: false,
        }
    }

    #[test]
    fn test_injects_every_shape() {
        let fields = LdtkFields::new(vec![
            field("hp", FieldKind::Int, false, vec![FieldValue::int(12)]),
            field("speed", FieldKind::Float, false, vec![FieldValue::float(1.5)]),
            field(
                "tags",
                FieldKind::String,
                true,
                vec![
                    FieldValue::text(FieldKind::String, "a"),
                    FieldValue::text(FieldKind::String, "b"),
                ],
            ),
            field("target", FieldKind::String, false, vec![FieldValue::null(FieldKind::String)]),
            field("unused", FieldKind::Bool, false, vec![FieldValue::bool(true)]),
        ]);
        let mut errors = ImportErrors::new();
        let mut mob = Mob::default();

        let assigned = FieldInjector::with_defaults().inject(&mut mob, &fields, "test", &mut errors);

        assert_eq!(assigned, 4);
        assert!(errors.is_empty());
        assert_eq!(
            mob,
            Mob {
                hp: 12,
                speed: 1.5,
                tags: vec!["a".into(), "b".into()],
                target: None,
                untouched: 0,
            }
        );
    }

    #[test]
    fn test_malformed_value_resets_to_default() {
        let fields = LdtkFields::new(vec![field(
            "hp",
            FieldKind::Int,
            false,
            vec![FieldValue::text(FieldKind::String, "lots")],
        )]);
        let mut errors = ImportErrors::new();
        let mut mob = Mob {
            hp: 99,
            ..Default::default()
        };

        FieldInjector::with_defaults().inject(&mut mob, &fields, "test", &mut errors);

        assert_eq!(mob.hp, 0);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_missing_parser_is_reported() {
        let fields = LdtkFields::new(vec![field("hp", FieldKind::Int, false, vec![FieldValue::int(3)])]);
        let mut errors = ImportErrors::new();
        let mut mob = Mob::default();

        FieldInjector::empty().inject(&mut mob, &fields, "entity 'Mob'", &mut errors);

        assert_eq!(mob.hp, 0);
        assert!(matches!(
            errors.iter().next(),
            Some(ImportError::FieldMismatch { field, .. }) if field == "hp"
        ));
    }

    #[test]
    fn test_array_into_single_member_is_a_mismatch() {
        let fields = LdtkFields::new(vec![field(
            "hp",
            FieldKind::Int,
            true,
            vec![FieldValue::int(1), FieldValue::int(2)],
        )]);
        let mut errors = ImportErrors::new();
        let mut mob = Mob::default();

        FieldInjector::with_defaults().inject(&mut mob, &fields, "test", &mut errors);

        assert_eq!(mob.hp, 0);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_payload_downcast_rejects_wrong_type() {
        let payload = FieldPayload::Single(Box::new(FieldData::Int(1)));
        assert!(payload.into_single::<i32>().is_none());
    }
}
