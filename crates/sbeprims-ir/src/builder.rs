use std::collections::HashMap;

use sbeprims_primitive::{Presence, PrimitiveType, PrimitiveValue};
use tracing::debug;

use crate::config::BuilderConfig;
use crate::def::{DataDef, FieldDef, GroupDef, Literal, SchemaDef, TypeDef};
use crate::error::{Result, ValidationError};
use crate::ir::{
    Block, Choice, Constant, DimensionLayout, EncodedType, Encoding, EnumType, Field, HeaderLayout,
    Ir, Message, SetType, ValidValue, VarData,
};
use crate::validate::{self, GroupParts, IrParts};

/// Resolves a [`SchemaDef`] into a frozen [`Ir`].
///
/// Building either succeeds completely or fails with the first
/// [`ValidationError`] found.
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    config: BuilderConfig,
}

impl SchemaBuilder {
    pub fn new(config: BuilderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    pub fn build(&self, def: &SchemaDef) -> Result<Ir> {
        let mut defs = HashMap::with_capacity(def.types.len());
        for type_def in &def.types {
            let name = type_def.name();
            if PrimitiveType::from_name(name).is_some() || defs.insert(name, type_def).is_some() {
                return Err(ValidationError::DuplicateName {
                    scope: "types".to_string(),
                    name: name.to_string(),
                }
                .into());
            }
        }

        let mut resolver = Resolver {
            defs,
            resolved: HashMap::new(),
            resolving: Vec::new(),
            schema_version: def.version,
            config: self.config,
        };

        let mut types = Vec::with_capacity(def.types.len());
        for type_def in &def.types {
            types.push(resolver.resolve(type_def.name(), "types", 0)?);
        }

        let mut messages = Vec::with_capacity(def.messages.len());
        for message in &def.messages {
            let scope = format!("message '{}'", message.name);
            let block = resolver.block(
                &scope,
                &message.fields,
                &message.groups,
                &message.data,
                message.block_length,
                0,
            )?;
            messages.push(Message {
                name: message.name.clone(),
                id: message.id,
                since_version: message.since_version,
                block,
                description: message.description.clone(),
            });
        }

        let header = HeaderLayout {
            block_length: def.header.block_length,
            template_id: def.header.template_id,
            schema_id: def.header.schema_id,
            version: def.header.version,
        };

        let ir = validate::freeze(IrParts {
            package: def.package.clone(),
            schema_id: def.id,
            version: def.version,
            semantic_version: def.semantic_version.clone(),
            byte_order: def.byte_order,
            description: def.description.clone(),
            header,
            types,
            messages,
        })?;

        debug!(
            package = %ir.package(),
            schema_id = ir.schema_id(),
            version = ir.version(),
            messages = ir.messages().len(),
            types = ir.types().len(),
            "built schema IR"
        );
        Ok(ir)
    }
}

struct Resolver<'d> {
    defs: HashMap<&'d str, &'d TypeDef>,
    resolved: HashMap<String, Encoding>,
    resolving: Vec<String>,
    schema_version: u16,
    config: BuilderConfig,
}

type Resolved<T> = std::result::Result<T, ValidationError>;

impl Resolver<'_> {
    fn resolve(&mut self, name: &str, referenced_by: &str, depth: usize) -> Resolved<Encoding> {
        if let Some(primitive) = PrimitiveType::from_name(name) {
            return Ok(Encoding::Primitive(EncodedType::scalar(primitive)));
        }
        if let Some(encoding) = self.resolved.get(name) {
            return Ok(encoding.clone());
        }
        if self.resolving.iter().any(|n| n == name) {
            let mut chain = self.resolving.clone();
            chain.push(name.to_string());
            return Err(ValidationError::CyclicType(chain.join(" -> ")));
        }
        if depth > self.config.max_depth {
            return Err(ValidationError::NestingTooDeep {
                scope: referenced_by.to_string(),
                max: self.config.max_depth,
            });
        }
        let def = *self
            .defs
            .get(name)
            .ok_or_else(|| ValidationError::UnresolvedType {
                name: name.to_string(),
                referenced_by: referenced_by.to_string(),
            })?;

        self.resolving.push(name.to_string());
        let encoding = self.resolve_def(def, depth);
        self.resolving.pop();
        let encoding = encoding?;

        self.resolved.insert(name.to_string(), encoding.clone());
        Ok(encoding)
    }

    fn resolve_def(&mut self, def: &TypeDef, depth: usize) -> Resolved<Encoding> {
        match def {
            TypeDef::Type {
                name,
                primitive,
                length,
                presence,
                null_value,
                min_value,
                max_value,
                value,
                character_encoding,
            } => {
                let scope = format!("type '{name}'");
                let primitive = *primitive;
                if primitive.size().checked_mul(*length).is_none() {
                    return Err(ValidationError::InvalidEncoding {
                        scope,
                        reason: format!("{primitive}[{length}] is too large to address"),
                    });
                }
                let bound = |literal: &Option<Literal>, default: PrimitiveValue| match literal {
                    Some(literal) => literal_value(&scope, primitive, literal),
                    None => Ok(default),
                };
                let null_value = bound(null_value, primitive.null_value())?;
                let min_value = bound(min_value, primitive.min_value())?;
                let max_value = bound(max_value, primitive.max_value())?;
                let constant = match (presence, value) {
                    (Presence::Constant, Some(literal)) => {
                        Some(primitive_constant(&scope, primitive, *length, literal)?)
                    }
                    _ => None,
                };
                Ok(Encoding::Primitive(EncodedType {
                    name: name.clone(),
                    primitive,
                    length: *length,
                    presence: *presence,
                    null_value,
                    min_value,
                    max_value,
                    constant,
                    character_encoding: character_encoding.clone(),
                }))
            }
            TypeDef::Enum {
                name,
                encoding,
                values,
            } => {
                let scope = format!("enum '{name}'");
                let values = values
                    .iter()
                    .map(|v| {
                        Ok(ValidValue {
                            name: v.name.clone(),
                            value: enum_literal(&scope, &v.value)?,
                            since_version: v.since_version,
                            description: v.description.clone(),
                        })
                    })
                    .collect::<Resolved<Vec<_>>>()?;
                Ok(Encoding::Enum(EnumType {
                    name: name.clone(),
                    encoding: *encoding,
                    null_value: encoding.null_value(),
                    values,
                }))
            }
            TypeDef::Set {
                name,
                encoding,
                choices,
            } => Ok(Encoding::Set(SetType {
                name: name.clone(),
                encoding: *encoding,
                choices: choices
                    .iter()
                    .map(|c| Choice {
                        name: c.name.clone(),
                        bit: c.bit,
                        since_version: c.since_version,
                    })
                    .collect(),
            })),
            TypeDef::Composite { name, members } => {
                let scope = format!("composite '{name}'");
                let members = self.fields(&scope, members, depth + 1)?;
                Ok(Encoding::Composite(validate::seal_composite(
                    name.clone(),
                    members,
                    self.schema_version,
                )?))
            }
        }
    }

    fn fields(&mut self, scope: &str, defs: &[FieldDef], depth: usize) -> Resolved<Vec<Field>> {
        let mut fields = Vec::with_capacity(defs.len());
        let mut next_offset = 0usize;
        for def in defs {
            let field_scope = format!("{scope} field '{}'", def.name);
            let encoding = self.resolve(&def.type_name, &field_scope, depth)?;

            let type_presence = match &encoding {
                Encoding::Primitive(ty) => ty.presence,
                _ => Presence::Required,
            };
            let presence = def.presence.unwrap_or(type_presence);
            let constant = if presence == Presence::Constant {
                Some(field_constant(&field_scope, def, &encoding)?)
            } else {
                None
            };

            if self.config.reject_deprecated
                && def.deprecated.is_some_and(|d| d <= self.schema_version)
            {
                return Err(ValidationError::InvalidValue {
                    scope: scope.to_string(),
                    reason: format!("field '{}' is deprecated", def.name),
                });
            }

            let offset = def.offset.unwrap_or(next_offset);
            let field = Field {
                name: def.name.clone(),
                id: def.id,
                offset,
                since_version: def.since_version,
                deprecated: def.deprecated,
                presence,
                constant,
                encoding,
                description: def.description.clone(),
            };
            let end = field.checked_end().ok_or_else(|| ValidationError::InvalidEncoding {
                scope: field_scope.clone(),
                reason: format!("offset {offset} plus field size overflows"),
            })?;
            next_offset = next_offset.max(end);
            fields.push(field);
        }
        Ok(fields)
    }

    fn block(
        &mut self,
        scope: &str,
        fields: &[FieldDef],
        groups: &[GroupDef],
        data: &[DataDef],
        block_length: Option<usize>,
        depth: usize,
    ) -> Resolved<Block> {
        if depth > self.config.max_depth {
            return Err(ValidationError::NestingTooDeep {
                scope: scope.to_string(),
                max: self.config.max_depth,
            });
        }
        let fields = self.fields(scope, fields, depth)?;

        let mut sealed_groups = Vec::with_capacity(groups.len());
        for group in groups {
            let group_scope = format!("{scope} group '{}'", group.name);
            let block = self.block(
                &group_scope,
                &group.fields,
                &group.groups,
                &group.data,
                group.block_length,
                depth + 1,
            )?;
            sealed_groups.push(validate::seal_group(
                scope,
                GroupParts {
                    name: group.name.clone(),
                    id: group.id,
                    since_version: group.since_version,
                    dimension: DimensionLayout {
                        block_length: group.dimension.block_length,
                        num_in_group: group.dimension.num_in_group,
                    },
                    block,
                    description: group.description.clone(),
                },
            )?);
        }

        let data = data
            .iter()
            .map(|d| VarData {
                name: d.name.clone(),
                id: d.id,
                since_version: d.since_version,
                length_type: d.length_type,
                character_encoding: d.character_encoding.clone(),
                description: d.description.clone(),
            })
            .collect();

        validate::seal_block(
            scope,
            fields,
            sealed_groups,
            data,
            block_length,
            self.schema_version,
        )
    }
}

fn field_constant(scope: &str, def: &FieldDef, encoding: &Encoding) -> Resolved<Constant> {
    let missing = || ValidationError::InvalidValue {
        scope: scope.to_string(),
        reason: "constant field has no value".to_string(),
    };
    match encoding {
        Encoding::Primitive(ty) => match &def.value {
            Some(literal) => primitive_constant(scope, ty.primitive, ty.length, literal),
            None => ty.constant.clone().ok_or_else(missing),
        },
        Encoding::Enum(ty) => match &def.value {
            Some(Literal::Text(name)) if ty.value_named(name).is_some() => {
                Ok(Constant::Enum(name.clone()))
            }
            Some(other) => Err(ValidationError::InvalidValue {
                scope: scope.to_string(),
                reason: format!("{other} is not a value of enum '{}'", ty.name),
            }),
            None => Err(missing()),
        },
        Encoding::Set(_) | Encoding::Composite(_) => Err(ValidationError::InvalidValue {
            scope: scope.to_string(),
            reason: format!("'{}' cannot be constant", encoding.name()),
        }),
    }
}

fn primitive_constant(
    scope: &str,
    primitive: PrimitiveType,
    length: usize,
    literal: &Literal,
) -> Resolved<Constant> {
    if length == 1 {
        return literal_value(scope, primitive, literal).map(Constant::Primitive);
    }
    match literal {
        Literal::Text(text) if primitive.size() == 1 && text.len() <= length => {
            let mut bytes = text.as_bytes().to_vec();
            bytes.resize(length, 0);
            Ok(Constant::Bytes(bytes))
        }
        other => Err(ValidationError::InvalidValue {
            scope: scope.to_string(),
            reason: format!("{other} cannot fill a {primitive}[{length}] constant"),
        }),
    }
}

/// Convert a definition literal to a value of `ty`, without truncation.
///
/// Single-character text is a `char`; other text is parsed as a number.
fn literal_value(scope: &str, ty: PrimitiveType, literal: &Literal) -> Resolved<PrimitiveValue> {
    let invalid = |reason: String| ValidationError::InvalidValue {
        scope: scope.to_string(),
        reason,
    };
    let converted = match literal {
        Literal::Int(v) => PrimitiveValue::from_i64(ty, *v),
        Literal::UInt(v) => PrimitiveValue::from_u64(ty, *v),
        Literal::Float(v) => PrimitiveValue::from_f64(ty, *v),
        Literal::Text(text) if ty == PrimitiveType::Char && text.len() == 1 => {
            PrimitiveValue::from_u64(ty, text.as_bytes()[0] as u64)
        }
        Literal::Text(text) => {
            if let Ok(v) = text.parse::<i64>() {
                PrimitiveValue::from_i64(ty, v)
            } else if let Ok(v) = text.parse::<u64>() {
                PrimitiveValue::from_u64(ty, v)
            } else if let Ok(v) = text.parse::<f64>() {
                PrimitiveValue::from_f64(ty, v)
            } else {
                return Err(invalid(format!("\"{text}\" is not a {ty} value")));
            }
        }
    };
    converted.map_err(|err| invalid(err.to_string()))
}

fn enum_literal(scope: &str, literal: &Literal) -> Resolved<i64> {
    let invalid = || ValidationError::InvalidValue {
        scope: scope.to_string(),
        reason: format!("{literal} is not a valid enum value"),
    };
    match literal {
        Literal::Int(v) => Ok(*v),
        Literal::UInt(v) => i64::try_from(*v).map_err(|_| invalid()),
        Literal::Text(text) if text.len() == 1 => Ok(text.as_bytes()[0] as i64),
        Literal::Text(text) => text.parse::<i64>().map_err(|_| invalid()),
        Literal::Float(_) => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IrError;

    const ORDERS: &str = r#"{
        "package": "orders",
        "id": 1,
        "version": 1,
        "types": [
            { "kind": "enum", "name": "Side", "encoding": "char",
              "values": [{ "name": "Buy", "value": "B" }, { "name": "Sell", "value": "S" }] },
            { "kind": "set", "name": "Flags", "encoding": "uint8",
              "choices": [{ "name": "Urgent", "bit": 0 }, { "name": "Hidden", "bit": 3 }] },
            { "kind": "type", "name": "Price", "primitive": "uint32", "presence": "optional" },
            { "kind": "composite", "name": "Decimal", "members": [
                { "name": "mantissa", "type": "int64" },
                { "name": "exponent", "type": "int8", "presence": "constant", "value": -4 }
            ]}
        ],
        "messages": [
            { "name": "Order", "id": 1, "fields": [
                { "name": "id", "id": 1, "type": "uint64" },
                { "name": "qty", "id": 2, "type": "uint32" },
                { "name": "price", "id": 3, "type": "Price", "sinceVersion": 1 }
            ]},
            { "name": "Quote", "id": 2, "blockLength": 16, "fields": [
                { "name": "side", "id": 1, "type": "Side" },
                { "name": "flags", "id": 2, "type": "Flags" },
                { "name": "px", "id": 3, "type": "Decimal" }
            ],
              "groups": [{ "name": "legs", "id": 10, "fields": [
                  { "name": "leg", "type": "uint64" }
              ]}],
              "data": [{ "name": "note", "id": 20, "lengthType": "uint16" }]
            }
        ]
    }"#;

    fn build(json: &str) -> Result<Ir> {
        SchemaBuilder::default().build(&SchemaDef::from_json(json)?)
    }

    fn validation_error(json: &str) -> ValidationError {
        match build(json) {
            Err(IrError::Validation(err)) => err,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn packs_offsets_and_computes_block_lengths() {
        let ir = build(ORDERS).unwrap();
        let order = ir.message_by_id(1).unwrap();

        assert_eq!(order.field("id").unwrap().offset, 0);
        assert_eq!(order.field("qty").unwrap().offset, 8);
        assert_eq!(order.field("price").unwrap().offset, 12);
        assert_eq!(order.block_length(), 16);
        assert_eq!(order.block_length_at(0), 12);
        assert_eq!(order.block_length_at(1), 16);
        assert!(order.field("price").unwrap().is_optional());
    }

    #[test]
    fn resolves_named_types() {
        let ir = build(ORDERS).unwrap();
        let quote = ir.message_by_name("Quote").unwrap();

        assert_eq!(quote.block_length(), 16);
        let px = quote.field("px").unwrap();
        assert_eq!(px.offset, 2);
        match &px.encoding {
            Encoding::Composite(composite) => {
                assert_eq!(composite.size, 8);
                let exponent = composite.member("exponent").unwrap();
                assert_eq!(
                    exponent.constant,
                    Some(Constant::Primitive(PrimitiveValue::Int8(-4)))
                );
            }
            other => panic!("unexpected {other:?}"),
        }

        let side = ir.find_type("Side").unwrap();
        match side {
            Encoding::Enum(ty) => assert_eq!(ty.value_named("Sell").unwrap().value, b'S' as i64),
            other => panic!("unexpected {other:?}"),
        }

        let legs = quote.group("legs").unwrap();
        assert_eq!(legs.block.block_length, 8);
        assert_eq!(quote.data("note").unwrap().length_type, PrimitiveType::UInt16);
        assert_eq!(ir.types().len(), 4);
        assert_eq!(ir.types()[0].name(), "Side");
    }

    #[test]
    fn rejects_duplicate_template_ids() {
        let err = validation_error(
            r#"{ "package": "p", "id": 1, "messages": [
                { "name": "A", "id": 5 }, { "name": "B", "id": 5 }
            ]}"#,
        );
        assert!(matches!(err, ValidationError::DuplicateTemplateId { id: 5, .. }));
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = validation_error(
            r#"{ "package": "p", "id": 1, "messages": [{ "name": "A", "id": 1,
                "fields": [{ "name": "x", "type": "uint8" }, { "name": "x", "type": "uint8" }] }]}"#,
        );
        assert!(matches!(err, ValidationError::DuplicateName { .. }));
    }

    #[test]
    fn rejects_unresolved_types() {
        let err = validation_error(
            r#"{ "package": "p", "id": 1, "messages": [{ "name": "A", "id": 1,
                "fields": [{ "name": "x", "type": "Missing" }] }]}"#,
        );
        assert!(
            matches!(err, ValidationError::UnresolvedType { ref name, .. } if name == "Missing")
        );
    }

    #[test]
    fn rejects_cyclic_composites() {
        let err = validation_error(
            r#"{ "package": "p", "id": 1, "types": [
                { "kind": "composite", "name": "A", "members": [{ "name": "b", "type": "B" }] },
                { "kind": "composite", "name": "B", "members": [{ "name": "a", "type": "A" }] }
            ]}"#,
        );
        assert!(matches!(err, ValidationError::CyclicType(_)));
    }

    #[test]
    fn rejects_overlapping_offsets() {
        let err = validation_error(
            r#"{ "package": "p", "id": 1, "messages": [{ "name": "A", "id": 1, "fields": [
                { "name": "a", "type": "uint32", "offset": 0 },
                { "name": "b", "type": "uint32", "offset": 2 }
            ]}]}"#,
        );
        assert!(matches!(err, ValidationError::OffsetOverlap { offset: 2, .. }));
    }

    #[test]
    fn rejects_fields_beyond_block_length() {
        let err = validation_error(
            r#"{ "package": "p", "id": 1, "messages": [{ "name": "A", "id": 1, "blockLength": 4,
                "fields": [{ "name": "a", "type": "uint64" }] }]}"#,
        );
        assert!(matches!(
            err,
            ValidationError::ExceedsBlockLength { end: 8, block_length: 4, .. }
        ));
    }

    #[test]
    fn rejects_version_order_conflicts() {
        let err = validation_error(
            r#"{ "package": "p", "id": 1, "version": 2, "messages": [{ "name": "A", "id": 1,
                "fields": [
                    { "name": "a", "type": "uint8", "sinceVersion": 2 },
                    { "name": "b", "type": "uint8", "sinceVersion": 1 }
                ] }]}"#,
        );
        assert!(matches!(err, ValidationError::VersionConflict { .. }));
    }

    #[test]
    fn rejects_versions_above_schema() {
        let err = validation_error(
            r#"{ "package": "p", "id": 1, "version": 1, "messages": [{ "name": "A", "id": 1,
                "fields": [{ "name": "a", "type": "uint8", "sinceVersion": 3 }] }]}"#,
        );
        assert!(matches!(
            err,
            ValidationError::VersionAboveSchema { since_version: 3, schema_version: 1, .. }
        ));
    }

    #[test]
    fn rejects_groups_newer_than_var_data() {
        let err = validation_error(
            r#"{ "package": "p", "id": 1, "version": 1, "messages": [{ "name": "A", "id": 1,
                "groups": [{ "name": "g", "sinceVersion": 1 }],
                "data": [{ "name": "d" }] }]}"#,
        );
        assert!(matches!(err, ValidationError::VersionConflict { .. }));
    }

    #[test]
    fn rejects_invalid_encodings() {
        let err = validation_error(
            r#"{ "package": "p", "id": 1, "messages": [{ "name": "A", "id": 1,
                "data": [{ "name": "d", "lengthType": "int32" }] }]}"#,
        );
        assert!(matches!(err, ValidationError::InvalidEncoding { .. }));

        let err = validation_error(
            r#"{ "package": "p", "id": 1,
                 "header": { "blockLength": "int16", "templateId": "uint16",
                             "schemaId": "uint16", "version": "uint16" } }"#,
        );
        assert!(matches!(err, ValidationError::InvalidEncoding { .. }));

        let err = validation_error(
            r#"{ "package": "p", "id": 1, "messages": [{ "name": "A", "id": 1,
                "groups": [{ "name": "g", "dimension": { "blockLength": "uint16", "numInGroup": "float" } }] }]}"#,
        );
        assert!(matches!(err, ValidationError::InvalidEncoding { .. }));
    }

    #[test]
    fn rejects_sizes_that_overflow() {
        let err = validation_error(
            r#"{ "package": "p", "id": 1, "messages": [{ "name": "A", "id": 1, "fields": [
                { "name": "a", "type": "uint32", "offset": 18446744073709551615 }
            ] }]}"#,
        );
        assert!(matches!(err, ValidationError::InvalidEncoding { .. }));

        let err = validation_error(
            r#"{ "package": "p", "id": 1,
                 "types": [{ "kind": "type", "name": "Huge", "primitive": "uint64",
                             "length": 4611686018427387904 }],
                 "messages": [{ "name": "A", "id": 1, "fields": [{ "name": "a", "type": "Huge" }] }] }"#,
        );
        assert!(matches!(err, ValidationError::InvalidEncoding { .. }));

        // Each part fits, the sum does not.
        let err = validation_error(
            r#"{ "package": "p", "id": 1,
                 "types": [{ "kind": "type", "name": "Wide", "primitive": "uint8",
                             "length": 18446744073709551615 }],
                 "messages": [{ "name": "A", "id": 1, "fields": [
                     { "name": "a", "type": "uint8" },
                     { "name": "b", "type": "Wide" }
                 ] }] }"#,
        );
        assert!(matches!(err, ValidationError::InvalidEncoding { .. }));
    }

    #[test]
    fn rejects_template_ids_wider_than_header() {
        let err = validation_error(
            r#"{ "package": "p", "id": 1,
                 "header": { "blockLength": "uint16", "templateId": "uint8",
                             "schemaId": "uint16", "version": "uint16" },
                 "messages": [{ "name": "A", "id": 300 }] }"#,
        );
        assert!(matches!(err, ValidationError::InvalidEncoding { .. }));
    }

    #[test]
    fn rejects_invalid_values() {
        let err = validation_error(
            r#"{ "package": "p", "id": 1, "types": [
                { "kind": "enum", "name": "E", "encoding": "uint8",
                  "values": [{ "name": "A", "value": 1 }, { "name": "B", "value": 1 }] }
            ]}"#,
        );
        assert!(matches!(err, ValidationError::InvalidValue { .. }));

        let err = validation_error(
            r#"{ "package": "p", "id": 1, "types": [
                { "kind": "set", "name": "S", "encoding": "uint8",
                  "choices": [{ "name": "A", "bit": 8 }] }
            ]}"#,
        );
        assert!(matches!(err, ValidationError::InvalidValue { .. }));

        let err = validation_error(
            r#"{ "package": "p", "id": 1, "types": [
                { "kind": "type", "name": "T", "primitive": "uint8", "presence": "constant", "value": 300 }
            ]}"#,
        );
        assert!(matches!(err, ValidationError::InvalidValue { .. }));

        let err = validation_error(
            r#"{ "package": "p", "id": 1, "types": [
                { "kind": "type", "name": "T", "primitive": "int32", "minValue": 10, "maxValue": 5 }
            ]}"#,
        );
        assert!(matches!(err, ValidationError::InvalidValue { .. }));
    }

    #[test]
    fn constant_fields_take_no_space() {
        let ir = build(
            r#"{ "package": "p", "id": 1, "types": [
                { "kind": "enum", "name": "Venue", "encoding": "uint8",
                  "values": [{ "name": "Lit", "value": 1 }, { "name": "Dark", "value": 2 }] },
                { "kind": "type", "name": "Code", "primitive": "char", "length": 4 }
            ], "messages": [{ "name": "A", "id": 1, "fields": [
                { "name": "a", "type": "uint16" },
                { "name": "venue", "type": "Venue", "presence": "constant", "value": "Dark" },
                { "name": "code", "type": "Code", "presence": "constant", "value": "XL" },
                { "name": "b", "type": "uint16" }
            ]}]}"#,
        )
        .unwrap();
        let message = ir.message_by_id(1).unwrap();
        assert_eq!(message.field("b").unwrap().offset, 2);
        assert_eq!(message.block_length(), 4);
        assert_eq!(
            message.field("venue").unwrap().constant,
            Some(Constant::Enum("Dark".to_string()))
        );
        assert_eq!(
            message.field("code").unwrap().constant,
            Some(Constant::Bytes(b"XL\0\0".to_vec()))
        );
    }

    #[test]
    fn deprecated_fields_follow_config() {
        let json = r#"{ "package": "p", "id": 1, "version": 2, "messages": [{ "name": "A", "id": 1,
            "fields": [{ "name": "old", "type": "uint8", "deprecated": 1 }] }]}"#;
        let def = SchemaDef::from_json(json).unwrap();

        assert!(SchemaBuilder::default().build(&def).is_ok());
        let strict = SchemaBuilder::new(BuilderConfig {
            reject_deprecated: true,
            ..BuilderConfig::default()
        });
        assert!(matches!(
            strict.build(&def),
            Err(IrError::Validation(ValidationError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn nesting_is_bounded() {
        let def = SchemaDef::from_json(
            r#"{ "package": "p", "id": 1, "messages": [{ "name": "A", "id": 1,
                "groups": [{ "name": "g1", "groups": [{ "name": "g2", "groups": [{ "name": "g3" }] }] }] }]}"#,
        )
        .unwrap();
        let shallow = SchemaBuilder::new(BuilderConfig {
            max_depth: 2,
            ..BuilderConfig::default()
        });
        assert!(matches!(
            shallow.build(&def),
            Err(IrError::Validation(ValidationError::NestingTooDeep { max: 2, .. }))
        ));
        assert!(SchemaBuilder::default().build(&def).is_ok());
    }
}
