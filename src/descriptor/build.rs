use std::{collections::HashMap, sync::Arc};

use prost::{bytes::Buf, Message};
use prost_types::{
    field_descriptor_proto, DescriptorProto, EnumDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, FileDescriptorSet, ServiceDescriptorProto,
};

use super::{
    api::make_identity, Cardinality, Definition, DescriptorError, DescriptorPool, EnumDescriptorInner,
    EnumIndex, EnumValueDescriptorInner, FieldDescriptorInner, FieldIndex, FileDescriptorInner,
    FileIndex, KindIndex, MessageDescriptorInner, MessageIndex, MethodDescriptorInner, OptionMap,
    OptionValue, PoolInner, Syntax, MAP_ENTRY_KEY_NUMBER, MAP_ENTRY_VALUE_NUMBER,
    RESERVED_MESSAGE_FIELD_NUMBERS, VALID_MESSAGE_FIELD_NUMBERS,
};
use crate::{json::to_json_name, Value};

impl DescriptorPool {
    /// Decodes a [`FileDescriptorSet`] from `bytes` and creates a new pool
    /// from its files.
    ///
    /// Files may appear in any order; dependencies are sorted out before
    /// registration.
    pub fn decode(mut bytes: impl Buf) -> Result<DescriptorPool, DescriptorError> {
        let set = FileDescriptorSet::decode(&mut bytes)
            .map_err(DescriptorError::decode_file_descriptor_set)?;
        DescriptorPool::from_file_descriptor_set(set)
    }

    /// Creates a new pool from a decoded [`FileDescriptorSet`].
    pub fn from_file_descriptor_set(
        set: FileDescriptorSet,
    ) -> Result<DescriptorPool, DescriptorError> {
        let mut pool = DescriptorPool::new();
        pool.add_file_descriptor_set(set)?;
        Ok(pool)
    }

    /// Adds all files of `set` to this pool.
    ///
    /// The files of the set are registered in dependency order, atomically:
    /// either every file registers or the pool is left untouched.
    pub fn add_file_descriptor_set(
        &mut self,
        set: FileDescriptorSet,
    ) -> Result<(), DescriptorError> {
        let mut staged = self.clone();
        for file in sort_by_dependency(set.file) {
            staged.add_file_descriptor_proto(file)?;
        }
        *self = staged;
        Ok(())
    }

    /// Adds a single file to this pool.
    ///
    /// Every file named in `file.dependency` must already be registered.
    /// Re-adding a file identical to an already registered one is a no-op;
    /// a different file under the same name is rejected, as is any type name
    /// colliding with an existing, non-identical declaration. On error the
    /// pool is unchanged.
    pub fn add_file_descriptor_proto(
        &mut self,
        file: FileDescriptorProto,
    ) -> Result<(), DescriptorError> {
        if let Some(&index) = self.inner.file_names.get(file.name()) {
            return if self.inner.files[index as usize].raw == file {
                Ok(())
            } else {
                Err(DescriptorError::file_conflict(file.name()))
            };
        }

        let mut inner = (*self.inner).clone();
        add_file(&mut inner, file)?;
        self.inner = Arc::new(inner);
        Ok(())
    }
}

/// Orders `files` so that every file appears after its in-set dependencies.
/// Files with dependencies outside the set keep their relative order; missing
/// dependencies are diagnosed during registration.
fn sort_by_dependency(files: Vec<FileDescriptorProto>) -> Vec<FileDescriptorProto> {
    let by_name: HashMap<String, usize> = files
        .iter()
        .enumerate()
        .map(|(index, file)| (file.name().to_owned(), index))
        .collect();

    let mut order = Vec::with_capacity(files.len());
    let mut state = vec![0u8; files.len()]; // 0 = unvisited, 1 = visiting, 2 = done
    let mut stack = Vec::new();

    for start in 0..files.len() {
        if state[start] != 0 {
            continue;
        }
        stack.push((start, 0usize));
        state[start] = 1;
        while let Some(&(index, progress)) = stack.last() {
            let deps = &files[index].dependency;
            if progress < deps.len() {
                if let Some(top) = stack.last_mut() {
                    top.1 += 1;
                }
                if let Some(&next) = by_name.get(&deps[progress]) {
                    if state[next] == 0 {
                        state[next] = 1;
                        stack.push((next, 0));
                    }
                }
            } else {
                state[index] = 2;
                order.push(index);
                stack.pop();
            }
        }
    }

    let mut slots: Vec<Option<FileDescriptorProto>> = files.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|index| slots[index].take())
        .collect()
}

struct FileContext<'a> {
    inner: &'a mut PoolInner,
    file: FileIndex,
    syntax: Syntax,
}

pub(super) fn add_file(
    inner: &mut PoolInner,
    raw: FileDescriptorProto,
) -> Result<(), DescriptorError> {
    if raw.name().is_empty() {
        return Err(DescriptorError::missing_file_name());
    }
    let name = raw.name().to_owned();

    let syntax = match raw.syntax.as_deref() {
        None | Some("") | Some("proto2") => Syntax::Proto2,
        Some("proto3") => Syntax::Proto3,
        Some(other) => return Err(DescriptorError::unknown_syntax(other)),
    };

    let mut dependencies = Vec::with_capacity(raw.dependency.len());
    for dependency in &raw.dependency {
        match inner.file_names.get(dependency.as_str()) {
            Some(&index) => dependencies.push(index),
            None => return Err(DescriptorError::missing_dependency(&name, dependency)),
        }
    }

    let package = raw.package().to_owned();
    let file = super::to_index(inner.files.len());

    let mut ctx = FileContext {
        inner,
        file,
        syntax,
    };

    register_package(ctx.inner, &package)?;

    // Phase one: walk every declaration, assign indices, claim names. Field
    // resolution waits until all types of this file are known.
    let mut message_work = Vec::new();
    let mut messages = Vec::with_capacity(raw.message_type.len());
    for message in &raw.message_type {
        messages.push(collect_message(
            &mut ctx,
            message,
            &package,
            None,
            &mut message_work,
        )?);
    }
    let mut enums = Vec::with_capacity(raw.enum_type.len());
    for enum_ in &raw.enum_type {
        enums.push(collect_enum(&mut ctx, enum_, &package, None)?);
    }

    // Phase two: resolve field types and service signatures.
    for &(index, message) in &message_work {
        build_message_fields(&mut ctx, index, message)?;
    }
    let mut services = Vec::with_capacity(raw.service.len());
    for service in &raw.service {
        services.push(collect_service(&mut ctx, service, &package)?);
    }

    let mut options = OptionMap::default();
    if let Some(raw_options) = &raw.options {
        if let Some(value) = &raw_options.java_package {
            options.insert("java_package", OptionValue::String(value.clone()));
        }
        if let Some(value) = &raw_options.go_package {
            options.insert("go_package", OptionValue::String(value.clone()));
        }
        if let Some(value) = raw_options.deprecated {
            options.insert("deprecated", OptionValue::Bool(value));
        }
        if let Some(value) = raw_options.optimize_for {
            options.insert("optimize_for", OptionValue::Int(value.into()));
        }
        if let Some(value) = raw_options.cc_enable_arenas {
            options.insert("cc_enable_arenas", OptionValue::Bool(value));
        }
        options.insert_uninterpreted(&raw_options.uninterpreted_option);
    }

    ctx.inner.file_names.insert(name.clone().into(), file);
    ctx.inner.files.push(FileDescriptorInner {
        name: name.into(),
        package: package.into(),
        syntax,
        raw,
        dependencies,
        messages,
        enums,
        services,
        options,
    });
    Ok(())
}

fn register_package(inner: &mut PoolInner, package: &str) -> Result<(), DescriptorError> {
    if package.is_empty() {
        return Ok(());
    }
    let mut end = 0;
    loop {
        end = match package[end..].find('.') {
            Some(dot) => end + dot,
            None => package.len(),
        };
        let prefix = &package[..end];
        match inner.names.get(prefix) {
            None => {
                inner.names.insert(prefix.into(), Definition::Package);
            }
            Some(Definition::Package) => (),
            Some(_) => return Err(DescriptorError::name_conflict(prefix)),
        }
        if end == package.len() {
            return Ok(());
        }
        end += 1;
    }
}

fn claim_name(
    inner: &mut PoolInner,
    full_name: &str,
    definition: Definition,
) -> Result<(), DescriptorError> {
    if inner.names.contains_key(full_name) {
        return Err(DescriptorError::name_conflict(full_name));
    }
    inner.names.insert(full_name.into(), definition);
    Ok(())
}

fn collect_message<'a>(
    ctx: &mut FileContext<'_>,
    raw: &'a DescriptorProto,
    parent_name: &str,
    parent: Option<MessageIndex>,
    work: &mut Vec<(MessageIndex, &'a DescriptorProto)>,
) -> Result<MessageIndex, DescriptorError> {
    let id = make_identity(parent_name, raw.name());
    let full_name = id.full_name().to_owned();

    let index = super::to_index(ctx.inner.messages.len());
    claim_name(ctx.inner, &full_name, Definition::Message(index))?;

    let mut is_map_entry = false;
    let mut options = OptionMap::default();
    if let Some(raw_options) = &raw.options {
        if let Some(value) = raw_options.map_entry {
            is_map_entry = value;
            options.insert("map_entry", OptionValue::Bool(value));
        }
        if let Some(value) = raw_options.deprecated {
            options.insert("deprecated", OptionValue::Bool(value));
        }
        options.insert_uninterpreted(&raw_options.uninterpreted_option);
    }

    ctx.inner.messages.push(MessageDescriptorInner {
        id,
        file: ctx.file,
        parent,
        fields: Vec::new(),
        field_numbers: Default::default(),
        field_names: Default::default(),
        field_json_names: Default::default(),
        oneofs: Vec::new(),
        nested_messages: Vec::new(),
        nested_enums: Vec::new(),
        is_map_entry,
        options,
    });

    let mut nested_messages = Vec::with_capacity(raw.nested_type.len());
    for nested in &raw.nested_type {
        nested_messages.push(collect_message(ctx, nested, &full_name, Some(index), work)?);
    }
    let mut nested_enums = Vec::with_capacity(raw.enum_type.len());
    for nested in &raw.enum_type {
        nested_enums.push(collect_enum(ctx, nested, &full_name, Some(index))?);
    }

    let message = &mut ctx.inner.messages[index as usize];
    message.nested_messages = nested_messages;
    message.nested_enums = nested_enums;

    work.push((index, raw));
    Ok(index)
}

fn collect_enum(
    ctx: &mut FileContext<'_>,
    raw: &EnumDescriptorProto,
    parent_name: &str,
    parent: Option<MessageIndex>,
) -> Result<EnumIndex, DescriptorError> {
    let id = make_identity(parent_name, raw.name());
    let full_name = id.full_name().to_owned();

    let index = super::to_index(ctx.inner.enums.len());
    claim_name(ctx.inner, &full_name, Definition::Enum(index))?;

    if raw.value.is_empty() {
        return Err(DescriptorError::empty_enum(&full_name));
    }

    let mut values = Vec::with_capacity(raw.value.len());
    let mut value_numbers = Vec::with_capacity(raw.value.len());
    let mut value_names = HashMap::with_capacity(raw.value.len());
    for (value_index, value) in raw.value.iter().enumerate() {
        let value_index = super::to_index(value_index);
        let mut options = OptionMap::default();
        if let Some(raw_options) = &value.options {
            if let Some(deprecated) = raw_options.deprecated {
                options.insert("deprecated", OptionValue::Bool(deprecated));
            }
            options.insert_uninterpreted(&raw_options.uninterpreted_option);
        }
        // Enum values are scoped to the enum's parent, per protobuf name
        // resolution.
        values.push(EnumValueDescriptorInner {
            id: make_identity(parent_name, value.name()),
            number: value.number(),
            options,
        });
        value_names.insert(value.name().into(), value_index);
        value_numbers.push((value.number(), value_index));
    }
    // First declared value wins for aliased numbers.
    value_numbers.sort_by(|(ln, li), (rn, ri)| ln.cmp(rn).then(li.cmp(ri)));
    value_numbers.dedup_by_key(|(number, _)| *number);

    if ctx.syntax == Syntax::Proto3 && !value_numbers.iter().any(|&(number, _)| number == 0) {
        return Err(DescriptorError::missing_enum_zero_value(&full_name));
    }

    let mut options = OptionMap::default();
    if let Some(raw_options) = &raw.options {
        if let Some(allow_alias) = raw_options.allow_alias {
            options.insert("allow_alias", OptionValue::Bool(allow_alias));
        }
        if let Some(deprecated) = raw_options.deprecated {
            options.insert("deprecated", OptionValue::Bool(deprecated));
        }
        options.insert_uninterpreted(&raw_options.uninterpreted_option);
    }

    ctx.inner.enums.push(EnumDescriptorInner {
        id,
        file: ctx.file,
        parent,
        values,
        value_numbers,
        value_names,
        options,
    });
    Ok(index)
}

fn build_message_fields(
    ctx: &mut FileContext<'_>,
    index: MessageIndex,
    raw: &DescriptorProto,
) -> Result<(), DescriptorError> {
    let full_name = ctx.inner.messages[index as usize].id.full_name().to_owned();
    let is_map_entry = ctx.inner.messages[index as usize].is_map_entry;

    let mut oneofs: Vec<super::OneofDescriptorInner> = raw
        .oneof_decl
        .iter()
        .map(|oneof| super::OneofDescriptorInner {
            id: make_identity(&full_name, oneof.name()),
            fields: Vec::new(),
        })
        .collect();

    let mut fields = Vec::with_capacity(raw.field.len());
    let mut field_numbers = std::collections::BTreeMap::new();
    let mut field_names = HashMap::with_capacity(raw.field.len());
    let mut field_json_names = HashMap::with_capacity(raw.field.len());

    for (field_index, field) in raw.field.iter().enumerate() {
        let field_index = super::to_index(field_index) as FieldIndex;
        let built = build_field(ctx, &full_name, field, oneofs.len())?;

        if field_numbers.insert(built.number, field_index).is_some() {
            return Err(DescriptorError::duplicate_field_number(
                &full_name,
                built.number as i32,
            ));
        }
        if field_names.insert(built.id.name().into(), field_index).is_some() {
            return Err(DescriptorError::duplicate_field_name(built.id.full_name()));
        }
        field_json_names.insert(built.json_name.clone(), field_index);
        if let Some(oneof) = built.oneof {
            oneofs[oneof as usize].fields.push(field_index);
        }
        fields.push(built);
    }

    if is_map_entry {
        let key_ok = field_numbers
            .get(&MAP_ENTRY_KEY_NUMBER)
            .map(|&i| is_valid_map_key_kind(fields[i as usize].kind))
            .unwrap_or(false);
        let value_ok = field_numbers.contains_key(&MAP_ENTRY_VALUE_NUMBER);
        if !key_ok || !value_ok || fields.len() != 2 {
            return Err(DescriptorError::invalid_map_entry(&full_name));
        }
    }

    // A field referencing a map entry message must itself be a map field.
    for field in &fields {
        if let KindIndex::Message(target) = field.kind {
            if ctx.inner.messages[target as usize].is_map_entry
                && field.cardinality != Cardinality::Repeated
            {
                return Err(DescriptorError::invalid_map_entry(field.id.full_name()));
            }
        }
    }

    let message = &mut ctx.inner.messages[index as usize];
    message.fields = fields;
    message.field_numbers = field_numbers;
    message.field_names = field_names;
    message.field_json_names = field_json_names;
    message.oneofs = oneofs;
    Ok(())
}

fn build_field(
    ctx: &mut FileContext<'_>,
    message_name: &str,
    raw: &FieldDescriptorProto,
    oneof_count: usize,
) -> Result<FieldDescriptorInner, DescriptorError> {
    use field_descriptor_proto::{Label, Type};

    let id = make_identity(message_name, raw.name());
    let number = raw.number();
    if !VALID_MESSAGE_FIELD_NUMBERS.contains(&number)
        || RESERVED_MESSAGE_FIELD_NUMBERS.contains(&number)
    {
        return Err(DescriptorError::invalid_field_number(id.full_name(), number));
    }
    let number = number as u32;

    let declared_type = raw.r#type.map(|_| raw.r#type());
    let kind = match declared_type {
        Some(Type::Double) => KindIndex::Double,
        Some(Type::Float) => KindIndex::Float,
        Some(Type::Int32) => KindIndex::Int32,
        Some(Type::Int64) => KindIndex::Int64,
        Some(Type::Uint32) => KindIndex::Uint32,
        Some(Type::Uint64) => KindIndex::Uint64,
        Some(Type::Sint32) => KindIndex::Sint32,
        Some(Type::Sint64) => KindIndex::Sint64,
        Some(Type::Fixed32) => KindIndex::Fixed32,
        Some(Type::Fixed64) => KindIndex::Fixed64,
        Some(Type::Sfixed32) => KindIndex::Sfixed32,
        Some(Type::Sfixed64) => KindIndex::Sfixed64,
        Some(Type::Bool) => KindIndex::Bool,
        Some(Type::String) => KindIndex::String,
        Some(Type::Bytes) => KindIndex::Bytes,
        Some(Type::Message) | Some(Type::Enum) | Some(Type::Group) | None => {
            resolve_type_name(ctx, &id, declared_type, raw.type_name.as_deref(), message_name)?
        }
    };

    let label = raw.label.map(|_| raw.label());
    let cardinality = match label {
        Some(Label::Repeated) => Cardinality::Repeated,
        Some(Label::Required) => Cardinality::Singular,
        Some(Label::Optional) | None => {
            if raw.proto3_optional() || ctx.syntax == Syntax::Proto2 {
                Cardinality::Optional
            } else {
                Cardinality::Singular
            }
        }
    };

    let oneof = match raw.oneof_index {
        Some(oneof_index) => {
            if oneof_index < 0 || oneof_index as usize >= oneof_count {
                return Err(DescriptorError::invalid_oneof_index(id.full_name()));
            }
            Some(oneof_index as u32)
        }
        None => None,
    };

    let supports_presence = cardinality != Cardinality::Repeated
        && (oneof.is_some() || cardinality == Cardinality::Optional || kind.is_message());

    let mut options = OptionMap::default();
    let mut packed_option = None;
    if let Some(raw_options) = &raw.options {
        if let Some(packed) = raw_options.packed {
            packed_option = Some(packed);
            options.insert("packed", OptionValue::Bool(packed));
        }
        if let Some(deprecated) = raw_options.deprecated {
            options.insert("deprecated", OptionValue::Bool(deprecated));
        }
        options.insert_uninterpreted(&raw_options.uninterpreted_option);
    }
    let is_packed = cardinality == Cardinality::Repeated
        && kind.is_packable()
        && packed_option.unwrap_or(ctx.syntax == Syntax::Proto3);

    let json_name = match raw.json_name.as_deref() {
        Some(json_name) => json_name.into(),
        None => to_json_name(raw.name()).into(),
    };

    let default = match raw.default_value.as_deref() {
        Some(value) => Some(parse_default(ctx.inner, kind, value, &id)?),
        None => None,
    };

    Ok(FieldDescriptorInner {
        id,
        number,
        json_name,
        kind,
        oneof,
        is_packed,
        supports_presence,
        cardinality,
        default,
        options,
    })
}

fn resolve_type_name(
    ctx: &FileContext<'_>,
    id: &super::Identity,
    declared_type: Option<field_descriptor_proto::Type>,
    type_name: Option<&str>,
    scope: &str,
) -> Result<KindIndex, DescriptorError> {
    use field_descriptor_proto::Type;

    let type_name = match type_name {
        Some(type_name) if !type_name.is_empty() => type_name,
        _ => return Err(DescriptorError::missing_type_name(id.full_name())),
    };

    let definition = resolve_name(ctx.inner, scope, type_name)
        .ok_or_else(|| DescriptorError::type_not_found(type_name))?;

    match (declared_type, definition) {
        (Some(Type::Message) | None, Definition::Message(index)) => Ok(KindIndex::Message(index)),
        (Some(Type::Group), Definition::Message(index)) => Ok(KindIndex::Group(index)),
        (Some(Type::Enum) | None, Definition::Enum(index)) => Ok(KindIndex::Enum(index)),
        (Some(Type::Message) | Some(Type::Group), _) => Err(
            DescriptorError::invalid_type_reference(id.full_name(), type_name, "a message"),
        ),
        (Some(Type::Enum), _) => Err(DescriptorError::invalid_type_reference(
            id.full_name(),
            type_name,
            "an enum",
        )),
        (None, _) => Err(DescriptorError::invalid_type_reference(
            id.full_name(),
            type_name,
            "a message or enum",
        )),
        (Some(_), _) => unreachable!("scalar types are handled by the caller"),
    }
}

/// Resolves `type_name` relative to `scope` using protobuf scoping rules:
/// a leading dot means fully qualified, otherwise each enclosing scope is
/// tried from innermost outwards.
fn resolve_name(inner: &PoolInner, scope: &str, type_name: &str) -> Option<Definition> {
    if let Some(absolute) = type_name.strip_prefix('.') {
        return inner.names.get(absolute).copied();
    }
    let mut scope = scope;
    loop {
        let candidate = if scope.is_empty() {
            type_name.to_owned()
        } else {
            format!("{}.{}", scope, type_name)
        };
        if let Some(definition) = inner.names.get(candidate.as_str()) {
            return Some(*definition);
        }
        match scope.rfind('.') {
            Some(dot) => scope = &scope[..dot],
            None if !scope.is_empty() => scope = "",
            None => return None,
        }
    }
}

fn is_valid_map_key_kind(kind: KindIndex) -> bool {
    matches!(
        kind,
        KindIndex::Int32
            | KindIndex::Int64
            | KindIndex::Uint32
            | KindIndex::Uint64
            | KindIndex::Sint32
            | KindIndex::Sint64
            | KindIndex::Fixed32
            | KindIndex::Fixed64
            | KindIndex::Sfixed32
            | KindIndex::Sfixed64
            | KindIndex::Bool
            | KindIndex::String
    )
}

fn parse_default(
    inner: &PoolInner,
    kind: KindIndex,
    value: &str,
    id: &super::Identity,
) -> Result<Value, DescriptorError> {
    let invalid = || DescriptorError::invalid_default_value(id.full_name(), value);
    match kind {
        KindIndex::Bool => match value {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(invalid()),
        },
        KindIndex::Int32 | KindIndex::Sint32 | KindIndex::Sfixed32 => {
            value.parse().map(Value::I32).map_err(|_| invalid())
        }
        KindIndex::Int64 | KindIndex::Sint64 | KindIndex::Sfixed64 => {
            value.parse().map(Value::I64).map_err(|_| invalid())
        }
        KindIndex::Uint32 | KindIndex::Fixed32 => {
            value.parse().map(Value::U32).map_err(|_| invalid())
        }
        KindIndex::Uint64 | KindIndex::Fixed64 => {
            value.parse().map(Value::U64).map_err(|_| invalid())
        }
        KindIndex::Float => parse_float(value).map(|f| Value::F32(f as f32)).ok_or_else(invalid),
        KindIndex::Double => parse_float(value).map(Value::F64).ok_or_else(invalid),
        KindIndex::String => Ok(Value::String(value.to_owned())),
        KindIndex::Bytes => unescape_bytes(value)
            .map(|bytes| Value::Bytes(bytes.into()))
            .ok_or_else(invalid),
        KindIndex::Enum(index) => inner.enums[index as usize]
            .value_names
            .get(value)
            .map(|&value_index| {
                Value::EnumNumber(inner.enums[index as usize].values[value_index as usize].number)
            })
            .ok_or_else(invalid),
        KindIndex::Message(_) | KindIndex::Group(_) => Err(invalid()),
    }
}

fn parse_float(value: &str) -> Option<f64> {
    match value {
        "inf" => Some(f64::INFINITY),
        "-inf" => Some(f64::NEG_INFINITY),
        "nan" => Some(f64::NAN),
        _ => value.parse().ok(),
    }
}

/// Unescapes the C-style escaping protoc uses for bytes defaults.
fn unescape_bytes(value: &str) -> Option<Vec<u8>> {
    let mut result = Vec::with_capacity(value.len());
    let mut bytes = value.bytes().peekable();
    while let Some(byte) = bytes.next() {
        if byte != b'\\' {
            result.push(byte);
            continue;
        }
        match bytes.next()? {
            b'n' => result.push(b'\n'),
            b'r' => result.push(b'\r'),
            b't' => result.push(b'\t'),
            b'\\' => result.push(b'\\'),
            b'\'' => result.push(b'\''),
            b'"' => result.push(b'"'),
            b'x' => {
                let mut byte = 0u8;
                let mut digits = 0;
                while digits < 2 {
                    match bytes.peek().and_then(|b| (*b as char).to_digit(16)) {
                        Some(digit) => {
                            byte = byte * 16 + digit as u8;
                            bytes.next();
                            digits += 1;
                        }
                        None => break,
                    }
                }
                if digits == 0 {
                    return None;
                }
                result.push(byte);
            }
            digit @ b'0'..=b'7' => {
                let mut byte = u32::from(digit - b'0');
                let mut digits = 1;
                while digits < 3 {
                    match bytes.peek().and_then(|b| (*b as char).to_digit(8)) {
                        Some(next) => {
                            byte = byte * 8 + next;
                            bytes.next();
                            digits += 1;
                        }
                        None => break,
                    }
                }
                result.push(u8::try_from(byte).ok()?);
            }
            _ => return None,
        }
    }
    Some(result)
}

fn collect_service(
    ctx: &mut FileContext<'_>,
    raw: &ServiceDescriptorProto,
    package: &str,
) -> Result<super::ServiceIndex, DescriptorError> {
    let id = make_identity(package, raw.name());
    let full_name = id.full_name().to_owned();

    let index = super::to_index(ctx.inner.services.len());
    claim_name(ctx.inner, &full_name, Definition::Service(index))?;

    let mut methods = Vec::with_capacity(raw.method.len());
    for method in &raw.method {
        let method_id = make_identity(&full_name, method.name());
        let input = resolve_message(ctx.inner, &method_id, method.input_type(), package)?;
        let output = resolve_message(ctx.inner, &method_id, method.output_type(), package)?;
        let mut options = OptionMap::default();
        if let Some(raw_options) = &method.options {
            if let Some(deprecated) = raw_options.deprecated {
                options.insert("deprecated", OptionValue::Bool(deprecated));
            }
            if let Some(idempotency) = raw_options.idempotency_level {
                options.insert("idempotency_level", OptionValue::Int(idempotency.into()));
            }
            options.insert_uninterpreted(&raw_options.uninterpreted_option);
        }
        methods.push(MethodDescriptorInner {
            id: method_id,
            input,
            output,
            client_streaming: method.client_streaming(),
            server_streaming: method.server_streaming(),
            options,
        });
    }

    let mut options = OptionMap::default();
    if let Some(raw_options) = &raw.options {
        if let Some(deprecated) = raw_options.deprecated {
            options.insert("deprecated", OptionValue::Bool(deprecated));
        }
        options.insert_uninterpreted(&raw_options.uninterpreted_option);
    }

    ctx.inner.services.push(super::ServiceDescriptorInner {
        id,
        file: ctx.file,
        methods,
        options,
    });
    Ok(index)
}

fn resolve_message(
    inner: &PoolInner,
    id: &super::Identity,
    type_name: &str,
    scope: &str,
) -> Result<MessageIndex, DescriptorError> {
    if type_name.is_empty() {
        return Err(DescriptorError::missing_type_name(id.full_name()));
    }
    match resolve_name(inner, scope, type_name) {
        Some(Definition::Message(index)) => Ok(index),
        Some(_) => Err(DescriptorError::invalid_type_reference(
            id.full_name(),
            type_name,
            "a message",
        )),
        None => Err(DescriptorError::type_not_found(type_name)),
    }
}
