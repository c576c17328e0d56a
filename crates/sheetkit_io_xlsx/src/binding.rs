//! Column attributes and per-type record schemas.
//!
//! A [`RecordSchema`] is the registration-time mapping table of one record
//! type: every field with its column attribute plus typed getter/setter
//! closures captured when the field is registered.

use std::fmt;

use crate::coerce::{FromCellValue, IntoCellValue};
use crate::error::{XlsxMapError, XlsxMapResult};
use crate::spec::{EnumCellValue, SpecCoerceFailure};
use crate::util::{derive_short_type_name, humanize_property_name};

////////////////////////////////////////////////////////////////////////////////
// #region ColumnAttribute

/// Column binding declaration: an explicit 1-based index, an explicit name,
/// or neither (bind by property name).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecColumnAttr {
    index: Option<usize>,
    name: Option<String>,
}

impl SpecColumnAttr {
    /// Attribute binding by property name.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attribute binding by 1-based column index.
    pub fn by_index(index: i64) -> XlsxMapResult<Self> {
        Self::new().with_index(index)
    }

    /// Attribute binding by header text.
    pub fn by_name(name: impl Into<String>) -> XlsxMapResult<Self> {
        Self::new().with_name(name)
    }

    /// Set the 1-based column index.
    pub fn with_index(mut self, index: i64) -> XlsxMapResult<Self> {
        if self.name.is_some() {
            return Err(XlsxMapError::Configuration(
                "cannot set both index and name".to_string(),
            ));
        }
        if index <= 0 {
            return Err(XlsxMapError::Configuration(format!(
                "column index must be greater than 0, got {index}"
            )));
        }
        let n_index = usize::try_from(index).map_err(|_| {
            XlsxMapError::Configuration(format!("column index overflow: {index}"))
        })?;
        self.index = Some(n_index);
        Ok(self)
    }

    /// Set the header text.
    pub fn with_name(mut self, name: impl Into<String>) -> XlsxMapResult<Self> {
        if self.index.is_some() {
            return Err(XlsxMapError::Configuration(
                "cannot set both index and name".to_string(),
            ));
        }
        let c_name = name.into();
        if c_name.trim().is_empty() {
            return Err(XlsxMapError::Configuration(
                "column name must not be blank".to_string(),
            ));
        }
        self.name = Some(c_name);
        Ok(self)
    }

    /// 1-based column index, if declared.
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Header text, if declared.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FieldBinding

type FnCellSetter<T> = Box<dyn Fn(&mut T, &EnumCellValue) -> Result<(), SpecCoerceFailure>>;
type FnCellGetter<T> = Box<dyn Fn(&T) -> EnumCellValue>;

/// One registered field of a record type.
pub struct SpecFieldBinding<T> {
    property: &'static str,
    attr: Option<SpecColumnAttr>,
    type_name: &'static str,
    setter: FnCellSetter<T>,
    getter: FnCellGetter<T>,
}

impl<T> SpecFieldBinding<T> {
    /// Property identifier.
    pub fn property(&self) -> &'static str {
        self.property
    }

    /// Column attribute; `None` for write-only fields.
    pub fn attr(&self) -> Option<&SpecColumnAttr> {
        self.attr.as_ref()
    }

    /// Field type name.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Header text used by auto-generated columns.
    pub fn header_text(&self) -> String {
        match self.attr.as_ref().and_then(SpecColumnAttr::name) {
            Some(name) => name.to_string(),
            None => humanize_property_name(self.property),
        }
    }

    /// Coerce `value` and store it into `record`.
    pub fn apply(&self, record: &mut T, value: &EnumCellValue) -> Result<(), SpecCoerceFailure> {
        (self.setter)(record, value)
    }

    /// Read the field as a cell value.
    pub fn extract(&self, record: &T) -> EnumCellValue {
        (self.getter)(record)
    }
}

impl<T> fmt::Debug for SpecFieldBinding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecFieldBinding")
            .field("property", &self.property)
            .field("attr", &self.attr)
            .field("type_name", &self.type_name)
            .finish()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RecordSchema

/// Registration-time mapping table of a record type.
pub struct RecordSchema<T> {
    type_name: String,
    sheet_name: Option<String>,
    fields: Vec<SpecFieldBinding<T>>,
}

impl<T: 'static> RecordSchema<T> {
    /// Empty schema named after `T`.
    pub fn new() -> Self {
        Self {
            type_name: derive_short_type_name(std::any::type_name::<T>()),
            sheet_name: None,
            fields: Vec::new(),
        }
    }

    /// Preferred worksheet name.
    pub fn with_sheet_name(mut self, name: impl Into<String>) -> XlsxMapResult<Self> {
        let c_name = name.into();
        if c_name.trim().is_empty() {
            return Err(XlsxMapError::Configuration(
                "worksheet name must not be blank".to_string(),
            ));
        }
        self.sheet_name = Some(c_name);
        Ok(self)
    }

    /// Register a column-bound field.
    pub fn column<V, G, M>(self, property: &'static str, attr: SpecColumnAttr, get: G, get_mut: M) -> Self
    where
        V: FromCellValue + IntoCellValue + 'static,
        G: Fn(&T) -> &V + 'static,
        M: Fn(&mut T) -> &mut V + 'static,
    {
        self.register(property, Some(attr), get, get_mut)
    }

    /// Register a field without a column attribute.
    ///
    /// It is rendered by auto-generated columns but never bound when reading.
    pub fn field<V, G, M>(self, property: &'static str, get: G, get_mut: M) -> Self
    where
        V: FromCellValue + IntoCellValue + 'static,
        G: Fn(&T) -> &V + 'static,
        M: Fn(&mut T) -> &mut V + 'static,
    {
        self.register(property, None, get, get_mut)
    }

    fn register<V, G, M>(
        mut self,
        property: &'static str,
        attr: Option<SpecColumnAttr>,
        get: G,
        get_mut: M,
    ) -> Self
    where
        V: FromCellValue + IntoCellValue + 'static,
        G: Fn(&T) -> &V + 'static,
        M: Fn(&mut T) -> &mut V + 'static,
    {
        self.fields.push(SpecFieldBinding {
            property,
            attr,
            type_name: V::TYPE_NAME,
            setter: Box::new(move |record: &mut T, value: &EnumCellValue| {
                *get_mut(record) = V::from_cell_value(value)?;
                Ok(())
            }),
            getter: Box::new(move |record: &T| get(record).to_cell_value()),
        });
        self
    }
}

impl<T: 'static> Default for RecordSchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RecordSchema<T> {
    /// Type name used when no sheet name is declared.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Preferred worksheet name, falling back to the type name.
    pub fn sheet_name(&self) -> &str {
        self.sheet_name.as_deref().unwrap_or(&self.type_name)
    }

    /// All fields in declaration order.
    pub fn fields(&self) -> &[SpecFieldBinding<T>] {
        &self.fields
    }

    /// `(field index, field)` of column-bound fields in declaration order.
    pub fn column_fields(&self) -> impl Iterator<Item = (usize, &SpecFieldBinding<T>)> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, field)| field.attr.is_some())
    }
}

impl<T> fmt::Debug for RecordSchema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordSchema")
            .field("type_name", &self.type_name)
            .field("sheet_name", &self.sheet_name)
            .field("fields", &self.fields)
            .finish()
    }
}

/// Record type mappable to and from worksheet rows.
pub trait SheetRecord: Default + Sized + 'static {
    /// Build the mapping table. Called once per read or write pass.
    fn schema() -> XlsxMapResult<RecordSchema<Self>>;
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
