mod unknown;
mod value;

pub use self::unknown::{UnknownField, UnknownFieldSet};
pub use self::value::{MapKey, Value};

pub(crate) use self::value::map_entry_kinds;

use std::{borrow::Cow, collections::BTreeMap, error::Error, fmt};

use crate::{FieldDescriptor, MessageDescriptor};

/// A protobuf message whose schema is only known at runtime.
///
/// A `DynamicMessage` wraps a [`MessageDescriptor`] and a [`Value`] for each
/// set field of the message. Fields track *explicit* presence: a field is
/// present exactly when it has been set (or decoded), which is distinct from
/// its value being the default for its type.
///
/// Messages are single-writer: a `DynamicMessage` may be freely shared
/// between threads for reading, but concurrent mutation must be serialized
/// externally. The descriptor it references is immutable and share-safe
/// forever.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicMessage {
    desc: MessageDescriptor,
    fields: BTreeMap<u32, Value>,
    unknown: UnknownFieldSet,
}

/// Error type returned by [`DynamicMessage::set_field`] and its sibling
/// mutators.
#[derive(Debug, Clone, PartialEq)]
pub enum SetFieldError {
    /// The field does not belong to the message's descriptor.
    NotFound,
    /// The value type is not compatible with the field type (see
    /// [`Value::is_valid_for_field`]).
    InvalidValue {
        /// The descriptor of the field which could not be set.
        field: FieldDescriptor,
        /// The rejected value.
        value: Value,
    },
}

/// A field value failed the validity predicate, with the offending field and
/// the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    field: String,
    reason: String,
}

impl DynamicMessage {
    /// Creates a new, empty instance of the message type specified by `desc`.
    pub fn new(desc: MessageDescriptor) -> Self {
        DynamicMessage {
            desc,
            fields: BTreeMap::new(),
            unknown: UnknownFieldSet::default(),
        }
    }

    /// Gets the descriptor describing this message's type.
    pub fn descriptor(&self) -> MessageDescriptor {
        self.desc.clone()
    }

    /// Returns `true` if the given field has been explicitly set.
    pub fn has_field(&self, field: &FieldDescriptor) -> bool {
        self.fields.contains_key(&field.number())
    }

    /// Gets the value of the given field, or `None` if it is unset.
    pub fn get_field(&self, field: &FieldDescriptor) -> Option<&Value> {
        self.fields.get(&field.number())
    }

    /// Gets the value of the given field, or its default value if unset.
    pub fn get_field_or_default(&self, field: &FieldDescriptor) -> Cow<'_, Value> {
        match self.fields.get(&field.number()) {
            Some(value) => Cow::Borrowed(value),
            None => Cow::Owned(Value::default_value_for_field(field)),
        }
    }

    /// Gets a mutable reference to the value of the given field, inserting
    /// its default value (and marking the field present) if it was unset.
    ///
    /// For oneof members this clears any sibling field, like
    /// [`set_field`][Self::set_field].
    pub fn get_field_mut(&mut self, field: &FieldDescriptor) -> &mut Value {
        self.clear_oneof_siblings(field);
        self.fields
            .entry(field.number())
            .or_insert_with(|| Value::default_value_for_field(field))
    }

    /// Sets the value of the given field, marking it present.
    ///
    /// Fails with [`SetFieldError::NotFound`] if the field does not belong to
    /// this message's descriptor, and [`SetFieldError::InvalidValue`] if the
    /// value does not validate against the field's type. For members of a
    /// oneof group, any sibling field is cleared.
    pub fn set_field(&mut self, field: &FieldDescriptor, value: Value) -> Result<(), SetFieldError> {
        if field.containing_message() != &self.desc {
            return Err(SetFieldError::NotFound);
        }
        if !value.is_valid_for_field(field) {
            return Err(SetFieldError::InvalidValue {
                field: field.clone(),
                value,
            });
        }
        self.clear_oneof_siblings(field);
        self.fields.insert(field.number(), value);
        Ok(())
    }

    /// Clears the given field: removes its value and its presence.
    ///
    /// For a oneof member this leaves the whole oneof group unset, since at
    /// most one member can be set at a time.
    pub fn clear_field(&mut self, field: &FieldDescriptor) {
        self.fields.remove(&field.number());
    }

    /// Clears the given field and returns its value, or `None` if it was
    /// unset.
    pub fn take_field(&mut self, field: &FieldDescriptor) -> Option<Value> {
        self.fields.remove(&field.number())
    }

    /// Returns `true` if the field with the given number has been set.
    pub fn has_field_by_number(&self, number: u32) -> bool {
        self.fields.contains_key(&number)
    }

    /// Gets the value of the field with the given number, or `None` if it is
    /// unset or no such field exists.
    pub fn get_field_by_number(&self, number: u32) -> Option<&Value> {
        self.desc.get_field(number)?;
        self.fields.get(&number)
    }

    /// Sets the value of the field with the given number.
    ///
    /// See [`set_field`][Self::set_field] for the failure modes.
    pub fn set_field_by_number(&mut self, number: u32, value: Value) -> Result<(), SetFieldError> {
        match self.desc.get_field(number) {
            Some(field) => self.set_field(&field, value),
            None => Err(SetFieldError::NotFound),
        }
    }

    /// Clears the field with the given number, if it exists.
    pub fn clear_field_by_number(&mut self, number: u32) {
        if let Some(field) = self.desc.get_field(number) {
            self.clear_field(&field);
        }
    }

    /// Returns `true` if the field with the given name has been set.
    pub fn has_field_by_name(&self, name: &str) -> bool {
        self.desc
            .get_field_by_name(name)
            .map_or(false, |field| self.has_field(&field))
    }

    /// Gets the value of the field with the given name, or `None` if it is
    /// unset or no such field exists.
    pub fn get_field_by_name(&self, name: &str) -> Option<&Value> {
        let field = self.desc.get_field_by_name(name)?;
        self.fields.get(&field.number())
    }

    /// Sets the value of the field with the given name.
    ///
    /// See [`set_field`][Self::set_field] for the failure modes.
    pub fn set_field_by_name(&mut self, name: &str, value: Value) -> Result<(), SetFieldError> {
        match self.desc.get_field_by_name(name) {
            Some(field) => self.set_field(&field, value),
            None => Err(SetFieldError::NotFound),
        }
    }

    /// Clears the field with the given name, if it exists.
    pub fn clear_field_by_name(&mut self, name: &str) {
        if let Some(field) = self.desc.get_field_by_name(name) {
            self.clear_field(&field);
        }
    }

    /// Appends `value` to the given repeated field, creating an empty list
    /// first if the field was unset.
    ///
    /// Fails with [`SetFieldError::InvalidValue`] if the field is not a
    /// repeated field or the element does not validate against its kind.
    pub fn append_to_list(
        &mut self,
        field: &FieldDescriptor,
        value: Value,
    ) -> Result<(), SetFieldError> {
        if field.containing_message() != &self.desc {
            return Err(SetFieldError::NotFound);
        }
        if !field.is_list() || !value.is_valid(&field.kind()) {
            return Err(SetFieldError::InvalidValue {
                field: field.clone(),
                value,
            });
        }
        match self
            .fields
            .entry(field.number())
            .or_insert_with(|| Value::List(Vec::new()))
        {
            Value::List(values) => values.push(value),
            _ => unreachable!("list field holds a non-list value"),
        }
        Ok(())
    }

    /// Inserts a key-value pair into the given map field, creating an empty
    /// map first if the field was unset. An existing entry under the same key
    /// is replaced.
    pub fn insert_map_entry(
        &mut self,
        field: &FieldDescriptor,
        key: MapKey,
        value: Value,
    ) -> Result<(), SetFieldError> {
        if field.containing_message() != &self.desc {
            return Err(SetFieldError::NotFound);
        }
        let valid = field.is_map() && {
            let entry = field.kind();
            let entry = entry.as_message().expect("map field should be a message");
            let (key_kind, _) = map_entry_kinds(entry);
            key.is_valid(&key_kind) && value.is_valid_for_field(&entry.map_entry_value_field())
        };
        if !valid {
            return Err(SetFieldError::InvalidValue {
                field: field.clone(),
                value,
            });
        }
        match self
            .fields
            .entry(field.number())
            .or_insert_with(|| Value::Map(BTreeMap::new()))
        {
            Value::Map(values) => {
                values.insert(key, value);
            }
            _ => unreachable!("map field holds a non-map value"),
        }
        Ok(())
    }

    /// Removes the entry with the given key from the given map field,
    /// returning its value if it was present.
    pub fn remove_map_entry(
        &mut self,
        field: &FieldDescriptor,
        key: &MapKey,
    ) -> Option<Value> {
        match self.fields.get_mut(&field.number()) {
            Some(Value::Map(values)) => values.remove(key),
            _ => None,
        }
    }

    /// Gets an iterator over all set fields of this message, in ascending
    /// field number order, paired with their descriptors.
    pub fn fields(&self) -> impl Iterator<Item = (FieldDescriptor, &'_ Value)> {
        self.fields.iter().filter_map(move |(&number, value)| {
            self.desc.get_field(number).map(|field| (field, value))
        })
    }

    /// Gets the unknown fields preserved from decoding.
    pub fn unknown_fields(&self) -> &UnknownFieldSet {
        &self.unknown
    }

    /// Clears every field, known and unknown.
    pub fn clear(&mut self) {
        self.fields.clear();
        self.unknown.clear();
    }

    /// Runs the field-validity predicate over every set field, recursing into
    /// nested messages.
    ///
    /// `set_field` enforces validity on the way in, so this only fails after
    /// in-place mutation through [`get_field_mut`][Self::get_field_mut] has
    /// produced a value the field cannot encode. Unknown enum numbers are
    /// valid; proto2 `required` checking is not performed.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (&number, value) in &self.fields {
            let field = self.desc.get_field(number).ok_or_else(|| ValidationError {
                field: format!("{}.{}", self.desc.full_name(), number),
                reason: "field number is not declared by the descriptor".to_owned(),
            })?;
            if !value.is_valid_for_field(&field) {
                return Err(ValidationError {
                    field: field.full_name().to_owned(),
                    reason: format!("value is not valid for a field of type {:?}", field.kind()),
                });
            }
            validate_nested(value)?;
        }
        Ok(())
    }

    /// Returns `true` if every set field holds a valid value.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    fn clear_oneof_siblings(&mut self, field: &FieldDescriptor) {
        if let Some(oneof) = field.containing_oneof() {
            for sibling in oneof.fields() {
                if sibling.number() != field.number() {
                    self.fields.remove(&sibling.number());
                }
            }
        }
    }

    pub(crate) fn insert_field_value(&mut self, field: &FieldDescriptor, value: Value) {
        self.clear_oneof_siblings(field);
        self.fields.insert(field.number(), value);
    }

    pub(crate) fn take_field_value(&mut self, number: u32) -> Option<Value> {
        self.fields.remove(&number)
    }

    pub(crate) fn unknown_mut(&mut self) -> &mut UnknownFieldSet {
        &mut self.unknown
    }
}

fn validate_nested(value: &Value) -> Result<(), ValidationError> {
    match value {
        Value::Message(message) => message.validate(),
        Value::List(values) => values.iter().try_for_each(validate_nested),
        Value::Map(values) => values.values().try_for_each(validate_nested),
        _ => Ok(()),
    }
}

impl ValidationError {
    /// Gets the full name of the field that failed validation.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Gets a human-readable reason for the failure.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid value for field '{}': {}", self.field, self.reason)
    }
}

impl Error for ValidationError {}

impl fmt::Display for SetFieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetFieldError::NotFound => write!(f, "field not found"),
            SetFieldError::InvalidValue { field, value: _ } => {
                write!(f, "expected a value of type '")?;
                if field.is_map() {
                    let entry = field.kind();
                    let entry = entry.as_message().expect("map field should be a message");
                    write!(
                        f,
                        "map<{:?}, {:?}>",
                        entry.map_entry_key_field().kind(),
                        entry.map_entry_value_field().kind()
                    )?;
                } else if field.is_list() {
                    write!(f, "repeated {:?}", field.kind())?;
                } else {
                    write!(f, "{:?}", field.kind())?;
                }
                write!(f, "' for field '{}'", field.name())
            }
        }
    }
}

impl Error for SetFieldError {}
