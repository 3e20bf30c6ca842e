//! Structural invariants of resolved IR.
//!
//! Both [`SchemaBuilder`](crate::SchemaBuilder) and the IR stream decoder
//! assemble blocks, composites and the final [`Ir`] through these functions,
//! so a decoded IR is held to exactly the same rules as a freshly built one.

use std::collections::{HashMap, HashSet};

use sbeprims_primitive::{ByteOrder, Presence, PrimitiveType, PrimitiveValue};

use crate::error::ValidationError;
use crate::ir::{
    Block, CompositeType, Constant, DimensionLayout, EncodedType, Encoding, EnumType, Field, Group,
    HeaderLayout, Ir, Message, SetType, VarData,
};

/// Unassembled top-level IR content.
pub(crate) struct IrParts {
    pub package: String,
    pub schema_id: u16,
    pub version: u16,
    pub semantic_version: String,
    pub byte_order: ByteOrder,
    pub description: Option<String>,
    pub header: HeaderLayout,
    pub types: Vec<Encoding>,
    pub messages: Vec<Message>,
}

pub(crate) fn freeze(parts: IrParts) -> Result<Ir, ValidationError> {
    check_header(&parts.header)?;
    check_fits("schema", "schema id", parts.schema_id as u64, parts.header.schema_id)?;
    check_fits("schema", "version", parts.version as u64, parts.header.version)?;

    let mut types_by_name = HashMap::with_capacity(parts.types.len());
    for (index, ty) in parts.types.iter().enumerate() {
        if types_by_name.insert(ty.name().to_string(), index).is_some() {
            return Err(ValidationError::DuplicateName {
                scope: "types".to_string(),
                name: ty.name().to_string(),
            });
        }
        check_encoding(&format!("type '{}'", ty.name()), ty, parts.version)?;
    }

    let mut by_template: HashMap<u16, usize> = HashMap::with_capacity(parts.messages.len());
    let mut by_name = HashMap::with_capacity(parts.messages.len());
    for (index, message) in parts.messages.iter().enumerate() {
        let scope = format!("message '{}'", message.name);
        if let Some(&previous) = by_template.get(&message.id) {
            return Err(ValidationError::DuplicateTemplateId {
                id: message.id,
                first: parts.messages[previous].name.clone(),
                second: message.name.clone(),
            });
        }
        by_template.insert(message.id, index);
        if by_name.insert(message.name.clone(), index).is_some() {
            return Err(ValidationError::DuplicateName {
                scope: "messages".to_string(),
                name: message.name.clone(),
            });
        }
        check_since(&scope, &message.name, message.since_version, parts.version)?;
        check_fits(&scope, "template id", message.id as u64, parts.header.template_id)?;
        check_fits(
            &scope,
            "block length",
            message.block.block_length as u64,
            parts.header.block_length,
        )?;
    }

    Ok(Ir {
        package: parts.package,
        schema_id: parts.schema_id,
        version: parts.version,
        semantic_version: parts.semantic_version,
        byte_order: parts.byte_order,
        description: parts.description,
        header: parts.header,
        types: parts.types,
        messages: parts.messages,
        by_template,
        by_name,
        types_by_name,
    })
}

/// Assemble a block, checking its fields, groups and var-data.
///
/// `declared_block_length` must cover every field; when absent the block
/// ends after the last field.
pub(crate) fn seal_block(
    scope: &str,
    fields: Vec<Field>,
    groups: Vec<Group>,
    data: Vec<VarData>,
    declared_block_length: Option<usize>,
    schema_version: u16,
) -> Result<Block, ValidationError> {
    check_fields(scope, &fields, schema_version)?;

    let computed = fields.iter().map(Field::end).max().unwrap_or(0);
    let block_length = match declared_block_length {
        Some(declared) if declared < computed => {
            let offender = fields
                .iter()
                .filter(|f| f.end() > declared)
                .max_by_key(|f| f.end())
                .map(|f| f.name.clone())
                .unwrap_or_default();
            return Err(ValidationError::ExceedsBlockLength {
                scope: scope.to_string(),
                field: offender,
                end: computed,
                block_length: declared,
            });
        }
        Some(declared) => declared,
        None => computed,
    };

    let mut names: HashSet<&str> = fields.iter().map(|f| f.name.as_str()).collect();
    for name in groups.iter().map(|g| g.name.as_str()).chain(data.iter().map(|d| d.name.as_str())) {
        if !names.insert(name) {
            return Err(ValidationError::DuplicateName {
                scope: scope.to_string(),
                name: name.to_string(),
            });
        }
    }

    for group in &groups {
        check_since(scope, &group.name, group.since_version, schema_version)?;
    }
    check_monotonic(scope, groups.iter().map(|g| (g.name.as_str(), g.since_version)))?;

    for var_data in &data {
        check_since(scope, &var_data.name, var_data.since_version, schema_version)?;
        if !matches!(
            var_data.length_type,
            PrimitiveType::UInt8 | PrimitiveType::UInt16 | PrimitiveType::UInt32
        ) {
            return Err(ValidationError::InvalidEncoding {
                scope: scope.to_string(),
                reason: format!(
                    "var-data '{}' length must be uint8, uint16 or uint32, not {}",
                    var_data.name, var_data.length_type
                ),
            });
        }
    }
    check_monotonic(scope, data.iter().map(|d| (d.name.as_str(), d.since_version)))?;

    // Groups precede var-data on the wire, so a group may not be newer than
    // any var-data section an older decoder expects to find next.
    if let (Some(newest_group), Some(oldest_data)) = (
        groups.iter().max_by_key(|g| g.since_version),
        data.iter().min_by_key(|d| d.since_version),
    ) {
        if newest_group.since_version > oldest_data.since_version {
            return Err(ValidationError::VersionConflict {
                scope: scope.to_string(),
                name: newest_group.name.clone(),
                since_version: newest_group.since_version,
                conflicting: oldest_data.name.clone(),
                conflicting_since: oldest_data.since_version,
            });
        }
    }

    let field_index = fields
        .iter()
        .enumerate()
        .map(|(i, f)| (f.name.clone(), i))
        .collect();
    let group_index = groups
        .iter()
        .enumerate()
        .map(|(i, g)| (g.name.clone(), i))
        .collect();
    let data_index = data
        .iter()
        .enumerate()
        .map(|(i, d)| (d.name.clone(), i))
        .collect();

    Ok(Block {
        fields,
        groups,
        data,
        block_length,
        schema_version,
        field_index,
        group_index,
        data_index,
    })
}

pub(crate) struct GroupParts {
    pub name: String,
    pub id: u16,
    pub since_version: u16,
    pub dimension: DimensionLayout,
    pub block: Block,
    pub description: Option<String>,
}

pub(crate) fn seal_group(scope: &str, parts: GroupParts) -> Result<Group, ValidationError> {
    let group_scope = format!("{scope} group '{}'", parts.name);
    for (label, ty) in [
        ("block length", parts.dimension.block_length),
        ("group count", parts.dimension.num_in_group),
    ] {
        if !is_unsigned_integer(ty) {
            return Err(ValidationError::InvalidEncoding {
                scope: group_scope,
                reason: format!("dimension {label} must be an unsigned integer, not {ty}"),
            });
        }
    }
    check_fits(
        &group_scope,
        "block length",
        parts.block.block_length as u64,
        parts.dimension.block_length,
    )?;

    Ok(Group {
        name: parts.name,
        id: parts.id,
        since_version: parts.since_version,
        dimension: parts.dimension,
        block: parts.block,
        description: parts.description,
    })
}

pub(crate) fn seal_composite(
    name: String,
    members: Vec<Field>,
    schema_version: u16,
) -> Result<CompositeType, ValidationError> {
    let scope = format!("composite '{name}'");
    check_fields(&scope, &members, schema_version)?;
    let size = members.iter().map(Field::end).max().unwrap_or(0);
    Ok(CompositeType {
        name,
        members,
        size,
    })
}

pub(crate) fn check_header(header: &HeaderLayout) -> Result<(), ValidationError> {
    for (label, ty) in [
        ("blockLength", header.block_length),
        ("templateId", header.template_id),
        ("schemaId", header.schema_id),
        ("version", header.version),
    ] {
        if !is_unsigned_integer(ty) {
            return Err(ValidationError::InvalidEncoding {
                scope: "message header".to_string(),
                reason: format!("{label} must be an unsigned integer, not {ty}"),
            });
        }
    }
    Ok(())
}

pub(crate) fn check_encoding(
    scope: &str,
    encoding: &Encoding,
    schema_version: u16,
) -> Result<(), ValidationError> {
    match encoding {
        Encoding::Primitive(ty) => check_encoded_type(scope, ty),
        Encoding::Enum(ty) => check_enum(scope, ty, schema_version),
        Encoding::Set(ty) => check_set(scope, ty, schema_version),
        // Members are checked when the composite is sealed.
        Encoding::Composite(_) => Ok(()),
    }
}

fn check_encoded_type(scope: &str, ty: &EncodedType) -> Result<(), ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidValue {
        scope: scope.to_string(),
        reason,
    };
    if ty.length == 0 {
        return Err(invalid(format!("type '{}' has zero length", ty.name)));
    }
    if ty.checked_size().is_none() {
        return Err(ValidationError::InvalidEncoding {
            scope: scope.to_string(),
            reason: format!("type '{}' is too large to address", ty.name),
        });
    }
    for (label, value) in [
        ("null", ty.null_value),
        ("min", ty.min_value),
        ("max", ty.max_value),
    ] {
        if value.primitive_type() != ty.primitive {
            return Err(invalid(format!(
                "{label} value of '{}' is {} but the type is {}",
                ty.name,
                value.primitive_type(),
                ty.primitive
            )));
        }
    }
    if ty.primitive.is_float() {
        if ty.min_value.as_f64() > ty.max_value.as_f64() {
            return Err(invalid(format!("min value of '{}' exceeds max value", ty.name)));
        }
    } else if compare_integers(&ty.min_value, &ty.max_value) == std::cmp::Ordering::Greater {
        return Err(invalid(format!("min value of '{}' exceeds max value", ty.name)));
    }
    if ty.presence == Presence::Constant && ty.constant.is_none() {
        return Err(invalid(format!("constant type '{}' has no value", ty.name)));
    }
    Ok(())
}

fn check_enum(scope: &str, ty: &EnumType, schema_version: u16) -> Result<(), ValidationError> {
    if !ty.encoding.is_integer() || ty.encoding.size() > 2 {
        return Err(ValidationError::InvalidEncoding {
            scope: scope.to_string(),
            reason: format!(
                "enum '{}' must be encoded as char or an 8/16-bit integer, not {}",
                ty.name, ty.encoding
            ),
        });
    }
    if ty.null_value != ty.encoding.null_value() {
        return Err(ValidationError::InvalidValue {
            scope: scope.to_string(),
            reason: format!("enum '{}' null value does not match its encoding", ty.name),
        });
    }
    let mut names = HashSet::new();
    let mut values = HashSet::new();
    for value in &ty.values {
        let enum_scope = format!("enum '{}'", ty.name);
        if !names.insert(value.name.as_str()) {
            return Err(ValidationError::DuplicateName {
                scope: enum_scope,
                name: value.name.clone(),
            });
        }
        if !values.insert(value.value) {
            return Err(ValidationError::InvalidValue {
                scope: enum_scope,
                reason: format!("value {} is used more than once", value.value),
            });
        }
        let encoded = PrimitiveValue::from_i64(ty.encoding, value.value).map_err(|err| {
            ValidationError::InvalidValue {
                scope: enum_scope.clone(),
                reason: err.to_string(),
            }
        })?;
        if encoded == ty.null_value {
            return Err(ValidationError::InvalidValue {
                scope: enum_scope,
                reason: format!("'{}' uses the null value", value.name),
            });
        }
        check_since(scope, &value.name, value.since_version, schema_version)?;
    }
    Ok(())
}

fn check_set(scope: &str, ty: &SetType, schema_version: u16) -> Result<(), ValidationError> {
    if !is_unsigned_integer(ty.encoding) {
        return Err(ValidationError::InvalidEncoding {
            scope: scope.to_string(),
            reason: format!(
                "set '{}' must be encoded as an unsigned integer, not {}",
                ty.name, ty.encoding
            ),
        });
    }
    let bits = ty.encoding.size() * 8;
    let mut names = HashSet::new();
    let mut used = HashSet::new();
    for choice in &ty.choices {
        let set_scope = format!("set '{}'", ty.name);
        if !names.insert(choice.name.as_str()) {
            return Err(ValidationError::DuplicateName {
                scope: set_scope,
                name: choice.name.clone(),
            });
        }
        if choice.bit as usize >= bits || !used.insert(choice.bit) {
            return Err(ValidationError::InvalidValue {
                scope: set_scope,
                reason: format!("choice '{}' has invalid bit {}", choice.name, choice.bit),
            });
        }
        check_since(scope, &choice.name, choice.since_version, schema_version)?;
    }
    Ok(())
}

fn check_fields(scope: &str, fields: &[Field], schema_version: u16) -> Result<(), ValidationError> {
    let mut names = HashSet::with_capacity(fields.len());
    for field in fields {
        if !names.insert(field.name.as_str()) {
            return Err(ValidationError::DuplicateName {
                scope: scope.to_string(),
                name: field.name.clone(),
            });
        }
        check_since(scope, &field.name, field.since_version, schema_version)?;
        if let Some(deprecated) = field.deprecated {
            if deprecated < field.since_version {
                return Err(ValidationError::InvalidValue {
                    scope: scope.to_string(),
                    reason: format!(
                        "field '{}' deprecated in version {deprecated} before it was added",
                        field.name
                    ),
                });
            }
        }
        check_encoding(
            &format!("{scope} field '{}'", field.name),
            &field.encoding,
            schema_version,
        )?;
        check_constant(scope, field)?;
        if field.checked_end().is_none() {
            return Err(ValidationError::InvalidEncoding {
                scope: scope.to_string(),
                reason: format!("field '{}' at offset {} overflows", field.name, field.offset),
            });
        }
    }

    let mut ordered: Vec<&Field> = fields.iter().filter(|f| f.size() > 0).collect();
    ordered.sort_by_key(|f| f.offset);
    for pair in ordered.windows(2) {
        let (previous, current) = (pair[0], pair[1]);
        if current.offset < previous.end() {
            return Err(ValidationError::OffsetOverlap {
                scope: scope.to_string(),
                field: current.name.clone(),
                offset: current.offset,
                previous: previous.name.clone(),
                previous_end: previous.end(),
            });
        }
    }

    let mut newest: Option<&Field> = None;
    for field in &ordered {
        if let Some(prior) = newest {
            if field.since_version < prior.since_version {
                return Err(ValidationError::VersionConflict {
                    scope: scope.to_string(),
                    name: prior.name.clone(),
                    since_version: prior.since_version,
                    conflicting: field.name.clone(),
                    conflicting_since: field.since_version,
                });
            }
        }
        if newest.is_none_or(|prior| field.since_version >= prior.since_version) {
            newest = Some(field);
        }
    }
    Ok(())
}

fn check_constant(scope: &str, field: &Field) -> Result<(), ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidValue {
        scope: scope.to_string(),
        reason,
    };
    match (&field.constant, field.presence) {
        (None, Presence::Constant) => Err(invalid(format!(
            "constant field '{}' has no value",
            field.name
        ))),
        (Some(_), Presence::Required | Presence::Optional) => Err(invalid(format!(
            "non-constant field '{}' carries a constant value",
            field.name
        ))),
        (None, _) => Ok(()),
        (Some(constant), Presence::Constant) => match (constant, &field.encoding) {
            (Constant::Primitive(value), Encoding::Primitive(ty))
                if ty.length == 1 && value.primitive_type() == ty.primitive =>
            {
                Ok(())
            }
            (Constant::Bytes(bytes), Encoding::Primitive(ty))
                if ty.primitive.size() == 1 && bytes.len() == ty.length =>
            {
                Ok(())
            }
            (Constant::Enum(name), Encoding::Enum(ty)) if ty.value_named(name).is_some() => Ok(()),
            _ => Err(invalid(format!(
                "constant value of '{}' does not match its type '{}'",
                field.name,
                field.encoding.name()
            ))),
        },
    }
}

fn check_since(
    scope: &str,
    name: &str,
    since: u16,
    schema_version: u16,
) -> Result<(), ValidationError> {
    if since > schema_version {
        return Err(ValidationError::VersionAboveSchema {
            scope: scope.to_string(),
            name: name.to_string(),
            since_version: since,
            schema_version,
        });
    }
    Ok(())
}

fn check_monotonic<'a>(
    scope: &str,
    items: impl Iterator<Item = (&'a str, u16)>,
) -> Result<(), ValidationError> {
    let mut newest: Option<(&str, u16)> = None;
    for (name, since) in items {
        if let Some((prior_name, prior_since)) = newest {
            if since < prior_since {
                return Err(ValidationError::VersionConflict {
                    scope: scope.to_string(),
                    name: prior_name.to_string(),
                    since_version: prior_since,
                    conflicting: name.to_string(),
                    conflicting_since: since,
                });
            }
        }
        newest = Some((name, since));
    }
    Ok(())
}

fn check_fits(
    scope: &str,
    label: &str,
    value: u64,
    ty: PrimitiveType,
) -> Result<(), ValidationError> {
    match ty.unsigned_max() {
        Some(max) if value <= max => Ok(()),
        _ => Err(ValidationError::InvalidEncoding {
            scope: scope.to_string(),
            reason: format!("{label} {value} does not fit header type {ty}"),
        }),
    }
}

fn is_unsigned_integer(ty: PrimitiveType) -> bool {
    ty.is_unsigned() && ty != PrimitiveType::Char
}

fn compare_integers(a: &PrimitiveValue, b: &PrimitiveValue) -> std::cmp::Ordering {
    match (a.as_i64(), b.as_i64()) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => a.as_u64().cmp(&b.as_u64()),
    }
}
