//! The configuration blob: header, signal watch set, declarative arrays.

use archi_app::ConfigStep;
use archi_core::{ArchiError, ArchiResult, ArrayLayout, ParamList, SlotKey, Value, ValueFlags};
use tracing::debug;

use crate::reader::MemoryReader;
use crate::serializable::Serializable;
use crate::writer::{var_bytes_size, var_int_size, BinaryWriter};

/// Identifies a configuration blob image ("RCHI" in little-endian order).
pub const BLOB_MAGIC: u32 = 0x4948_4352;

/// Current blob format version.
pub const BLOB_VERSION: u32 = 1;

const VALUE_TAG_EMPTY: u8 = 0;
const VALUE_TAG_BYTES: u8 = 1;
const VALUE_TAG_STRING: u8 = 2;
const VALUE_TAG_INT: u8 = 3;
const VALUE_TAG_FLOAT: u8 = 4;

const STEP_TAG_INIT: u8 = 0;
const STEP_TAG_FINAL: u8 = 1;
const STEP_TAG_SET: u8 = 2;
const STEP_TAG_ASSIGN: u8 = 3;
const STEP_TAG_ACT: u8 = 4;

/// A shared library the host is asked to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryDecl {
    /// Key the library handle is filed under.
    pub key: String,
    /// Library pathname.
    pub pathname: String,
    /// Resolve symbols lazily.
    pub lazy: bool,
    /// Make symbols globally visible.
    pub global: bool,
}

/// A context interface exported by a declared library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDecl {
    /// Key the interface is registered under.
    pub key: String,
    /// Key of the declaring library.
    pub library: String,
    /// Symbol name inside the library.
    pub symbol: String,
}

/// A parsed configuration blob.
#[derive(Debug, Clone, Default)]
pub struct ConfigBlob {
    /// OS signal numbers to watch while this blob is active.
    pub signals: Vec<i32>,
    /// Shared libraries to open, in order.
    pub libraries: Vec<LibraryDecl>,
    /// Interfaces exported by the libraries.
    pub interfaces: Vec<InterfaceDecl>,
    /// The configuration script.
    pub steps: Vec<ConfigStep>,
}

fn layout_size(layout: ArrayLayout) -> usize {
    var_int_size(layout.num_of as u64)
        + var_int_size(layout.size as u64)
        + var_int_size(layout.alignment as u64)
}

fn write_layout(writer: &mut BinaryWriter, layout: ArrayLayout) {
    writer.write_var_int(layout.num_of as u64);
    writer.write_var_int(layout.size as u64);
    writer.write_var_int(layout.alignment as u64);
}

fn read_layout(reader: &mut MemoryReader<'_>) -> ArchiResult<ArrayLayout> {
    Ok(ArrayLayout {
        num_of: reader.read_var_int()? as usize,
        size: reader.read_var_int()? as usize,
        alignment: reader.read_var_int()? as usize,
    })
}

/// The blob-representable payload of a value. Function values and live
/// object graphs never appear inside configuration images.
enum ValuePayload<'a> {
    Empty,
    Bytes(std::cell::Ref<'a, Vec<u8>>),
    Text(std::cell::Ref<'a, String>),
    Int(i64),
    Float(f64),
}

fn value_payload(value: &Value) -> ArchiResult<ValuePayload<'_>> {
    if value.is_function() {
        return Err(ArchiError::format(
            "function values are not blob-representable",
        ));
    }
    if !value.has_data() {
        return Ok(ValuePayload::Empty);
    }
    if let Some(bytes) = value.borrow_as::<Vec<u8>>() {
        return Ok(ValuePayload::Bytes(bytes));
    }
    if let Some(text) = value.borrow_as::<String>() {
        return Ok(ValuePayload::Text(text));
    }
    if let Some(int) = value.borrow_as::<i64>() {
        return Ok(ValuePayload::Int(*int));
    }
    if let Some(float) = value.borrow_as::<f64>() {
        return Ok(ValuePayload::Float(*float));
    }
    Err(ArchiError::format(
        "value pointee type is not blob-representable",
    ))
}

impl Serializable for Value {
    fn size(&self) -> usize {
        let payload = match value_payload(self) {
            Ok(ValuePayload::Empty) => 0,
            Ok(ValuePayload::Bytes(bytes)) => var_bytes_size(bytes.len()),
            Ok(ValuePayload::Text(text)) => var_bytes_size(text.len()),
            Ok(ValuePayload::Int(_)) | Ok(ValuePayload::Float(_)) => 8,
            Err(_) => 0,
        };
        1 + 1 + layout_size(self.layout()) + payload
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> ArchiResult<()> {
        let payload = value_payload(self)?;
        let tag = match &payload {
            ValuePayload::Empty => VALUE_TAG_EMPTY,
            ValuePayload::Bytes(_) => VALUE_TAG_BYTES,
            ValuePayload::Text(_) => VALUE_TAG_STRING,
            ValuePayload::Int(_) => VALUE_TAG_INT,
            ValuePayload::Float(_) => VALUE_TAG_FLOAT,
        };
        writer.write_u8(tag);
        writer.write_u8(self.flags().bits() as u8);
        write_layout(writer, self.layout());
        match payload {
            ValuePayload::Empty => {}
            ValuePayload::Bytes(bytes) => writer.write_var_bytes(&bytes),
            ValuePayload::Text(text) => writer.write_var_string(&text),
            ValuePayload::Int(int) => writer.write_i64(int),
            ValuePayload::Float(float) => writer.write_f64(float),
        }
        Ok(())
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> ArchiResult<Self> {
        let tag = reader.read_u8()?;
        let bits = reader.read_u8()?;
        let flags = ValueFlags::from_bits(u32::from(bits))
            .ok_or_else(|| ArchiError::format(format!("unknown value flag bits {bits:#04x}")))?;
        let layout = read_layout(reader)?;

        let value = match tag {
            VALUE_TAG_EMPTY => Value::with_layout(layout),
            VALUE_TAG_BYTES => Value::data_of(reader.read_var_bytes()?, layout),
            VALUE_TAG_STRING => Value::data_of(reader.read_var_string()?, layout),
            VALUE_TAG_INT => Value::data_of(reader.read_i64()?, layout),
            VALUE_TAG_FLOAT => Value::data_of(reader.read_f64()?, layout),
            other => {
                return Err(ArchiError::format(format!(
                    "unknown value tag {other:#04x}"
                )))
            }
        };
        Ok(value.with_flags(flags))
    }
}

impl Serializable for SlotKey {
    fn size(&self) -> usize {
        var_bytes_size(self.name.len()) + var_int_size(self.indices.len() as u64)
            + self.indices.len() * 8
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> ArchiResult<()> {
        writer.write_var_string(&self.name);
        writer.write_var_int(self.indices.len() as u64);
        for index in &self.indices {
            writer.write_i64(*index);
        }
        Ok(())
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> ArchiResult<Self> {
        let name = reader.read_var_string()?;
        let count = reader.read_var_len(reader.remaining() / 8)?;
        let mut indices = Vec::with_capacity(count);
        for _ in 0..count {
            indices.push(reader.read_i64()?);
        }
        Ok(Self { name, indices })
    }
}

impl Serializable for ParamList {
    fn size(&self) -> usize {
        var_int_size(self.len() as u64)
            + self
                .iter()
                .map(|param| var_bytes_size(param.name.len()) + param.value.size())
                .sum::<usize>()
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> ArchiResult<()> {
        writer.write_var_int(self.len() as u64);
        // Declaration order and duplicates are preserved; first-write-wins
        // is the consumer's concern, not the format's.
        for param in self.iter() {
            writer.write_var_string(&param.name);
            param.value.serialize(writer)?;
        }
        Ok(())
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> ArchiResult<Self> {
        let count = reader.read_var_len(reader.remaining())?;
        let mut params = ParamList::new();
        for _ in 0..count {
            let name = reader.read_var_string()?;
            params.push(name, Value::deserialize(reader)?);
        }
        Ok(params)
    }
}

impl Serializable for ConfigStep {
    fn size(&self) -> usize {
        let payload = match self {
            Self::Init {
                interface, params, ..
            } => var_bytes_size(interface.len()) + params.size(),
            Self::Final { .. } => 0,
            Self::Set { slot, value, .. } => slot.size() + value.size(),
            Self::Assign {
                slot,
                source,
                source_slot,
                ..
            } => {
                slot.size()
                    + var_bytes_size(source.len())
                    + 1
                    + source_slot.as_ref().map_or(0, Serializable::size)
            }
            Self::Act { action, params, .. } => action.size() + params.size(),
        };
        1 + var_bytes_size(self.key().len()) + payload
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> ArchiResult<()> {
        match self {
            Self::Init {
                key,
                interface,
                params,
            } => {
                writer.write_u8(STEP_TAG_INIT);
                writer.write_var_string(key);
                writer.write_var_string(interface);
                params.serialize(writer)?;
            }
            Self::Final { key } => {
                writer.write_u8(STEP_TAG_FINAL);
                writer.write_var_string(key);
            }
            Self::Set { key, slot, value } => {
                writer.write_u8(STEP_TAG_SET);
                writer.write_var_string(key);
                slot.serialize(writer)?;
                value.serialize(writer)?;
            }
            Self::Assign {
                key,
                slot,
                source,
                source_slot,
            } => {
                writer.write_u8(STEP_TAG_ASSIGN);
                writer.write_var_string(key);
                slot.serialize(writer)?;
                writer.write_var_string(source);
                writer.write_bool(source_slot.is_some());
                if let Some(source_slot) = source_slot {
                    source_slot.serialize(writer)?;
                }
            }
            Self::Act {
                key,
                action,
                params,
            } => {
                writer.write_u8(STEP_TAG_ACT);
                writer.write_var_string(key);
                action.serialize(writer)?;
                params.serialize(writer)?;
            }
        }
        Ok(())
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> ArchiResult<Self> {
        let tag = reader.read_u8()?;
        let key = reader.read_var_string()?;
        match tag {
            STEP_TAG_INIT => Ok(Self::Init {
                key,
                interface: reader.read_var_string()?,
                params: ParamList::deserialize(reader)?,
            }),
            STEP_TAG_FINAL => Ok(Self::Final { key }),
            STEP_TAG_SET => Ok(Self::Set {
                key,
                slot: SlotKey::deserialize(reader)?,
                value: Value::deserialize(reader)?,
            }),
            STEP_TAG_ASSIGN => {
                let slot = SlotKey::deserialize(reader)?;
                let source = reader.read_var_string()?;
                let source_slot = if reader.read_bool()? {
                    Some(SlotKey::deserialize(reader)?)
                } else {
                    None
                };
                Ok(Self::Assign {
                    key,
                    slot,
                    source,
                    source_slot,
                })
            }
            STEP_TAG_ACT => Ok(Self::Act {
                key,
                action: SlotKey::deserialize(reader)?,
                params: ParamList::deserialize(reader)?,
            }),
            other => Err(ArchiError::format(format!("unknown step tag {other:#04x}"))),
        }
    }
}

impl Serializable for LibraryDecl {
    fn size(&self) -> usize {
        var_bytes_size(self.key.len()) + var_bytes_size(self.pathname.len()) + 2
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> ArchiResult<()> {
        writer.write_var_string(&self.key);
        writer.write_var_string(&self.pathname);
        writer.write_bool(self.lazy);
        writer.write_bool(self.global);
        Ok(())
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> ArchiResult<Self> {
        Ok(Self {
            key: reader.read_var_string()?,
            pathname: reader.read_var_string()?,
            lazy: reader.read_bool()?,
            global: reader.read_bool()?,
        })
    }
}

impl Serializable for InterfaceDecl {
    fn size(&self) -> usize {
        var_bytes_size(self.key.len())
            + var_bytes_size(self.library.len())
            + var_bytes_size(self.symbol.len())
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> ArchiResult<()> {
        writer.write_var_string(&self.key);
        writer.write_var_string(&self.library);
        writer.write_var_string(&self.symbol);
        Ok(())
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> ArchiResult<Self> {
        Ok(Self {
            key: reader.read_var_string()?,
            library: reader.read_var_string()?,
            symbol: reader.read_var_string()?,
        })
    }
}

fn write_array<T: Serializable>(writer: &mut BinaryWriter, items: &[T]) -> ArchiResult<()> {
    writer.write_var_int(items.len() as u64);
    for item in items {
        item.serialize(writer)?;
    }
    Ok(())
}

fn read_array<T: Serializable>(reader: &mut MemoryReader<'_>) -> ArchiResult<Vec<T>> {
    let count = reader.read_var_len(reader.remaining())?;
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        items.push(T::deserialize(reader)?);
    }
    Ok(items)
}

fn array_size<T: Serializable>(items: &[T]) -> usize {
    var_int_size(items.len() as u64) + items.iter().map(Serializable::size).sum::<usize>()
}

impl Serializable for ConfigBlob {
    fn size(&self) -> usize {
        4 + 4
            + var_int_size(self.signals.len() as u64)
            + self.signals.len() * 4
            + array_size(&self.libraries)
            + array_size(&self.interfaces)
            + array_size(&self.steps)
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> ArchiResult<()> {
        writer.write_u32(BLOB_MAGIC);
        writer.write_u32(BLOB_VERSION);
        writer.write_var_int(self.signals.len() as u64);
        for signal in &self.signals {
            writer.write_i32(*signal);
        }
        write_array(writer, &self.libraries)?;
        write_array(writer, &self.interfaces)?;
        write_array(writer, &self.steps)?;
        Ok(())
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> ArchiResult<Self> {
        let magic = reader.read_u32()?;
        if magic != BLOB_MAGIC {
            return Err(ArchiError::format(format!(
                "not a configuration blob: magic {magic:#010x}"
            )));
        }
        let version = reader.read_u32()?;
        if version != BLOB_VERSION {
            return Err(ArchiError::format(format!(
                "unsupported blob version {version}"
            )));
        }

        let signal_count = reader.read_var_len(reader.remaining() / 4)?;
        let mut signals = Vec::with_capacity(signal_count);
        for _ in 0..signal_count {
            signals.push(reader.read_i32()?);
        }

        let blob = Self {
            signals,
            libraries: read_array(reader)?,
            interfaces: read_array(reader)?,
            steps: read_array(reader)?,
        };
        debug!(
            signals = blob.signals.len(),
            libraries = blob.libraries.len(),
            interfaces = blob.interfaces.len(),
            steps = blob.steps.len(),
            "configuration blob parsed"
        );
        Ok(blob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_blob() -> ConfigBlob {
        ConfigBlob {
            signals: vec![2, 15],
            libraries: vec![LibraryDecl {
                key: "libA".into(),
                pathname: "/usr/lib/liba.so".into(),
                lazy: true,
                global: false,
            }],
            interfaces: vec![InterfaceDecl {
                key: "worker".into(),
                library: "libA".into(),
                symbol: "worker_interface".into(),
            }],
            steps: vec![
                ConfigStep::Init {
                    key: "w".into(),
                    interface: "worker".into(),
                    params: ParamList::new()
                        .with("threads", Value::with_layout(ArrayLayout::of_count(4)))
                        .with(
                            "name",
                            Value::data_of(String::from("pool"), ArrayLayout::of_count(1)),
                        ),
                },
                ConfigStep::Set {
                    key: "w".into(),
                    slot: SlotKey::indexed("queue", vec![0]),
                    value: Value::data_of(256i64, ArrayLayout::of_type::<i64>(1)),
                },
                ConfigStep::Assign {
                    key: "w".into(),
                    slot: SlotKey::named("peer"),
                    source: "other".into(),
                    source_slot: None,
                },
                ConfigStep::Act {
                    key: "w".into(),
                    action: SlotKey::named("start"),
                    params: ParamList::new(),
                },
                ConfigStep::Final { key: "w".into() },
            ],
        }
    }

    #[test]
    fn blob_round_trip_is_byte_equal() {
        let blob = sample_blob();
        let image = blob.to_bytes().unwrap();
        assert_eq!(image.len(), blob.size());

        let parsed = ConfigBlob::from_bytes(&image).unwrap();
        let reimage = parsed.to_bytes().unwrap();
        assert_eq!(image, reimage);
    }

    #[test]
    fn empty_blob_round_trip() {
        let blob = ConfigBlob::default();
        let image = blob.to_bytes().unwrap();
        let parsed = ConfigBlob::from_bytes(&image).unwrap();
        assert!(parsed.signals.is_empty());
        assert!(parsed.libraries.is_empty());
        assert!(parsed.interfaces.is_empty());
        assert!(parsed.steps.is_empty());
        assert_eq!(parsed.to_bytes().unwrap(), image);
    }

    #[test]
    fn bad_magic_is_a_format_error() {
        let mut image = sample_blob().to_bytes().unwrap();
        image[0] ^= 0xFF;
        assert!(matches!(
            ConfigBlob::from_bytes(&image),
            Err(ArchiError::Format { .. })
        ));
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let mut image = sample_blob().to_bytes().unwrap();
        image[4] = 0x7F;
        assert!(ConfigBlob::from_bytes(&image).is_err());
    }

    #[test]
    fn truncation_is_detected() {
        let image = sample_blob().to_bytes().unwrap();
        for cut in [5, 9, image.len() / 2, image.len() - 1] {
            assert!(
                ConfigBlob::from_bytes(&image[..cut]).is_err(),
                "truncation at {cut} must fail"
            );
        }
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        let mut image = sample_blob().to_bytes().unwrap();
        image.push(0);
        assert!(ConfigBlob::from_bytes(&image).is_err());
    }

    #[test]
    fn function_values_refuse_to_serialize() {
        fn probe() {}
        let step = ConfigStep::Set {
            key: "k".into(),
            slot: SlotKey::named("f"),
            value: Value::function_of(probe as fn()),
        };
        assert!(step.to_bytes().is_err());
    }

    #[test]
    fn value_flags_survive_the_round_trip() {
        let value = Value::data_of(7i64, ArrayLayout::of_type::<i64>(1)).read_only();
        let image = value.to_bytes().unwrap();
        let parsed = Value::deserialize(&mut MemoryReader::new(&image)).unwrap();
        assert_eq!(parsed.flags(), value.flags());
        assert_eq!(*parsed.borrow_as::<i64>().unwrap(), 7);
        assert_eq!(parsed.layout(), value.layout());
    }
}
