//! Process-wide registries: per-message codecs, open-enum extensions and
//! parameter tables.
//!
//! Everything here is populated exactly once, when the first caller touches
//! [`registry()`]. The compiled-in addins (`fira`, `qorvo`, `custom`) run in
//! order and inject their enum members, parameter-table entries and codecs;
//! after that the registry is read-only for the life of the process.
//! `UQT_ADDINS` (colon-separated names) selects a subset of the addins;
//! unset loads all of them. An unknown name or a broken load order is fatal
//! with a descriptive diagnostic.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use once_cell::sync::{Lazy, OnceCell};
use tracing::warn;

use crate::error::{Result, UciError};
use crate::fira;
use crate::framing::MessageType;
use crate::qorvo;
use crate::tlv::ParamTable;

// ─── Messages ─────────────────────────────────────────────────────────────────

/// A decoded UCI message, produced by the codec bound to its
/// `(message type, gid, oid)` key.
#[derive(Debug, Clone, PartialEq)]
pub enum UciMessage {
    NoData,
    Status(fira::Status),
    SessionIdOnly { session_id: u32, session_type: u8 },
    Raw(Vec<u8>),
    DeviceInfo(fira::msg::DeviceInfo),
    DeviceStatus(fira::DeviceState),
    SessionStatus(fira::msg::SessionStatus),
    RangingData(fira::msg::RangingData),
    Caps(fira::caps::CapsInfo),
    Diagnostic(qorvo::diag::RangingDiagData),
}

/// Decoder/encoder pair for one message key.
pub trait MessageCodec: Send + Sync {
    fn decode(&self, payload: &[u8]) -> Result<UciMessage>;

    fn encode(&self, _msg: &UciMessage) -> Result<Vec<u8>> {
        Err(UciError::InvalidParam(
            "this message has no encoder".into(),
        ))
    }
}

pub type CodecKey = (MessageType, u8, u8);

// ─── Default codec family ─────────────────────────────────────────────────────

pub struct NoDataCodec;

impl MessageCodec for NoDataCodec {
    fn decode(&self, _payload: &[u8]) -> Result<UciMessage> {
        Ok(UciMessage::NoData)
    }

    fn encode(&self, _msg: &UciMessage) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }
}

/// 1-byte status payload.
pub struct StatusCodec;

impl MessageCodec for StatusCodec {
    fn decode(&self, payload: &[u8]) -> Result<UciMessage> {
        let mut buf = crate::buffer::Buffer::new(payload);
        Ok(UciMessage::Status(fira::Status::from_value(buf.pop_u8()?)))
    }

    fn encode(&self, msg: &UciMessage) -> Result<Vec<u8>> {
        match msg {
            UciMessage::Status(s) => Ok(vec![s.value()]),
            _ => Err(UciError::InvalidParam("expected a status message".into())),
        }
    }
}

/// 4-byte session id plus 1-byte session type.
pub struct SessionIdCodec;

impl MessageCodec for SessionIdCodec {
    fn decode(&self, payload: &[u8]) -> Result<UciMessage> {
        let mut buf = crate::buffer::Buffer::new(payload);
        Ok(UciMessage::SessionIdOnly {
            session_id: buf.pop_uint(4)? as u32,
            session_type: buf.pop_u8()?,
        })
    }

    fn encode(&self, msg: &UciMessage) -> Result<Vec<u8>> {
        match msg {
            UciMessage::SessionIdOnly {
                session_id,
                session_type,
            } => {
                let mut out = session_id.to_le_bytes().to_vec();
                out.push(*session_type);
                Ok(out)
            }
            _ => Err(UciError::InvalidParam(
                "expected a session-id message".into(),
            )),
        }
    }
}

pub struct RawCodec;

impl MessageCodec for RawCodec {
    fn decode(&self, payload: &[u8]) -> Result<UciMessage> {
        Ok(UciMessage::Raw(payload.to_vec()))
    }

    fn encode(&self, msg: &UciMessage) -> Result<Vec<u8>> {
        match msg {
            UciMessage::Raw(bytes) => Ok(bytes.clone()),
            _ => Err(UciError::InvalidParam("expected a raw message".into())),
        }
    }
}

// ─── Enum extension table ─────────────────────────────────────────────────────

/// Runtime members of one open enum: `(name, value)` pairs appended by
/// addins. Names and values must each stay unique within the enum.
#[derive(Debug, Default, Clone)]
pub struct EnumMembers {
    members: Vec<(String, u8)>,
}

impl EnumMembers {
    pub fn extend_with(&mut self, enum_name: &str, name: &str, value: u8) -> Result<()> {
        if self.members.iter().any(|(n, _)| n == name) {
            return Err(UciError::Registry(format!(
                "{name} already exists in {enum_name}"
            )));
        }
        if self.members.iter().any(|(_, v)| *v == value) {
            return Err(UciError::Registry(format!(
                "{value:#04x} duplicate value in {enum_name}"
            )));
        }
        self.members.push((name.to_string(), value));
        Ok(())
    }

    pub fn name_of(&self, value: u8) -> Option<&str> {
        self.members
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(n, _)| n.as_str())
    }

    pub fn value_of(&self, name: &str) -> Option<u8> {
        self.members
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn members(&self) -> &[(String, u8)] {
        &self.members
    }
}

// ─── Registry ─────────────────────────────────────────────────────────────────

struct RegisteredCodec {
    codec: Arc<dyn MessageCodec>,
    is_default: bool,
}

/// Immutable after construction; see module docs.
pub struct Registry {
    codecs: HashMap<CodecKey, RegisteredCodec>,
    enums: HashMap<&'static str, EnumMembers>,
    tables: HashMap<&'static str, ParamTable>,
    cal: qorvo::cal::CalTable,
    loaded_addins: Vec<&'static str>,
}

impl Registry {
    pub fn codec(&self, mt: MessageType, gid: u8, oid: u8) -> Option<&dyn MessageCodec> {
        self.codecs.get(&(mt, gid, oid)).map(|c| c.codec.as_ref())
    }

    /// Decode a payload through the registered codec, falling back to a raw
    /// message when no codec is bound to the key.
    pub fn decode(&self, mt: MessageType, gid: u8, oid: u8, payload: &[u8]) -> Result<UciMessage> {
        match self.codec(mt, gid, oid) {
            Some(codec) => codec.decode(payload),
            None => Ok(UciMessage::Raw(payload.to_vec())),
        }
    }

    pub fn enum_members(&self, enum_name: &str) -> Option<&EnumMembers> {
        self.enums.get(enum_name)
    }

    pub fn enum_name(&self, enum_name: &str, value: u8) -> Option<&str> {
        self.enums.get(enum_name)?.name_of(value)
    }

    /// Parameter table by name (`"device_config"`, `"app_config"`,
    /// `"test_config"`).
    pub fn param_table(&self, name: &str) -> Option<&ParamTable> {
        self.tables.get(name)
    }

    pub fn cal_table(&self) -> &qorvo::cal::CalTable {
        &self.cal
    }

    pub fn loaded_addins(&self) -> &[&'static str] {
        &self.loaded_addins
    }
}

/// Mutable view handed to each addin while the registry is being built.
pub struct RegistryBuilder {
    codecs: HashMap<CodecKey, RegisteredCodec>,
    enums: HashMap<&'static str, EnumMembers>,
    tables: HashMap<&'static str, ParamTable>,
    cal: qorvo::cal::CalTable,
    loaded: Vec<&'static str>,
}

impl RegistryBuilder {
    fn new() -> Self {
        Self {
            codecs: HashMap::new(),
            enums: HashMap::new(),
            tables: HashMap::new(),
            cal: qorvo::cal::CalTable::empty(),
            loaded: Vec::new(),
        }
    }

    /// Install a default codec. Replacing an existing entry is allowed only
    /// for other defaults.
    pub fn register_default_codec(
        &mut self,
        key: CodecKey,
        codec: Arc<dyn MessageCodec>,
    ) -> Result<()> {
        if let Some(existing) = self.codecs.get(&key) {
            if !existing.is_default {
                return Err(UciError::Registry(format!(
                    "codec {key:?} is already bound to a non-default entry"
                )));
            }
        }
        self.codecs.insert(
            key,
            RegisteredCodec {
                codec,
                is_default: true,
            },
        );
        Ok(())
    }

    /// Bind a specific codec, replacing a default entry. Replacing another
    /// specific entry is a hard error; use
    /// [`RegistryBuilder::register_codec_override`] to force it.
    pub fn register_codec(&mut self, key: CodecKey, codec: Arc<dyn MessageCodec>) -> Result<()> {
        if let Some(existing) = self.codecs.get(&key) {
            if !existing.is_default {
                return Err(UciError::Registry(format!(
                    "codec {key:?} is already registered; pass the override flag to replace it"
                )));
            }
        }
        self.codecs.insert(
            key,
            RegisteredCodec {
                codec,
                is_default: false,
            },
        );
        Ok(())
    }

    pub fn register_codec_override(&mut self, key: CodecKey, codec: Arc<dyn MessageCodec>) {
        self.codecs.insert(
            key,
            RegisteredCodec {
                codec,
                is_default: false,
            },
        );
    }

    /// Append one member to an open enum namespace.
    pub fn extend_enum(&mut self, enum_name: &'static str, name: &str, value: u8) -> Result<()> {
        self.enums
            .entry(enum_name)
            .or_default()
            .extend_with(enum_name, name, value)
    }

    /// Install a parameter table. Installing over an existing name is an
    /// addin-ordering bug.
    pub fn install_table(&mut self, table: ParamTable) -> Result<()> {
        let name = table.name();
        if self.tables.contains_key(name) {
            return Err(UciError::Registry(format!(
                "parameter table \"{name}\" is already installed"
            )));
        }
        self.tables.insert(name, table);
        Ok(())
    }

    /// Mutable access to an installed table, for addins extending an earlier
    /// addin's definitions.
    pub fn table_mut(&mut self, name: &str) -> Result<&mut ParamTable> {
        self.tables.get_mut(name).ok_or_else(|| {
            UciError::Registry(format!(
                "parameter table \"{name}\" is not installed; check the addin load order"
            ))
        })
    }

    pub fn cal_table_mut(&mut self) -> &mut qorvo::cal::CalTable {
        &mut self.cal
    }

    pub fn is_loaded(&self, addin: &str) -> bool {
        self.loaded.contains(&addin)
    }
}

// ─── Addins ───────────────────────────────────────────────────────────────────

/// A compiled-in extension module. Addins contribute enum members,
/// parameter-table entries, codecs and (through the client) notification
/// handlers.
pub trait Addin: Sync {
    fn name(&self) -> &'static str;
    fn register(&self, builder: &mut RegistryBuilder) -> Result<()>;
}

fn builtin_addins() -> Vec<&'static dyn Addin> {
    vec![
        &fira::FiraAddin,
        &qorvo::QorvoAddin,
        &crate::custom::CustomAddin,
    ]
}

fn build(selected: Option<&[String]>) -> Result<Registry> {
    let addins = builtin_addins();
    let to_load: Vec<&'static dyn Addin> = match selected {
        None => addins,
        Some(names) => {
            let mut picked = Vec::with_capacity(names.len());
            for name in names {
                let addin = addins
                    .iter()
                    .find(|a| a.name() == name)
                    .copied()
                    .ok_or_else(|| {
                        UciError::Registry(format!("unable to load addin \"{name}\": not found"))
                    })?;
                picked.push(addin);
            }
            picked
        }
    };

    let mut builder = RegistryBuilder::new();
    for addin in to_load {
        addin.register(&mut builder).map_err(|e| {
            UciError::Registry(format!("unable to load addin \"{}\": {e}", addin.name()))
        })?;
        builder.loaded.push(addin.name());
    }

    Ok(Registry {
        codecs: builder.codecs,
        enums: builder.enums,
        tables: builder.tables,
        cal: builder.cal,
        loaded_addins: builder.loaded,
    })
}

static REGISTRY: OnceCell<Registry> = OnceCell::new();

/// The process registry. First access loads the addins selected by
/// `UQT_ADDINS` (all of them when unset). A load failure is fatal: the
/// process cannot speak the protocol with half-installed tables.
pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(|| {
        let selected = std::env::var("UQT_ADDINS")
            .ok()
            .map(|v| v.split(':').map(str::to_string).collect::<Vec<_>>());
        match build(selected.as_deref()) {
            Ok(registry) => registry,
            Err(e) => panic!("{e}"),
        }
    })
}

/// Explicit initialization with a fixed addin list, for front-ends that do
/// not want the `UQT_ADDINS` default. A registry initialized earlier wins;
/// the requested selection is still validated either way.
pub fn init_with_addins(names: &[&str]) -> Result<&'static Registry> {
    let built = build(Some(
        &names.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
    ))?;
    let registry = REGISTRY.get_or_init(|| built);
    Ok(registry)
}

// ─── Unknown-value logging ────────────────────────────────────────────────────

static SEEN_UNKNOWN: Lazy<Mutex<HashSet<(&'static str, u8)>>> =
    Lazy::new(|| Mutex::new(HashSet::new()));

/// Log an unknown enum value once per (enum, value) pair.
pub fn log_unknown_enum_value(enum_name: &'static str, value: u8) {
    let mut seen = SEEN_UNKNOWN.lock().unwrap();
    if seen.insert((enum_name, value)) {
        warn!("enum {enum_name} value {value:#04x} is unknown");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_members_reject_duplicates() {
        let mut members = EnumMembers::default();
        members.extend_with("Gid", "PropA", 0x0A).unwrap();
        assert!(members.extend_with("Gid", "PropA", 0x0B).is_err());
        assert!(members.extend_with("Gid", "PropB", 0x0A).is_err());
        members.extend_with("Gid", "PropB", 0x0B).unwrap();
        assert_eq!(members.name_of(0x0A), Some("PropA"));
        assert_eq!(members.value_of("PropB"), Some(0x0B));
    }

    #[test]
    fn specific_codec_replaces_default_only() {
        let mut builder = RegistryBuilder::new();
        let key = (MessageType::Response, 0, 0);
        builder
            .register_default_codec(key, Arc::new(RawCodec))
            .unwrap();
        builder.register_codec(key, Arc::new(StatusCodec)).unwrap();
        // A second specific registration must be an explicit override
        assert!(builder.register_codec(key, Arc::new(RawCodec)).is_err());
        builder.register_codec_override(key, Arc::new(RawCodec));
    }

    #[test]
    fn unknown_addin_is_fatal() {
        let err = match build(Some(&["fira".to_string(), "nope".to_string()])) {
            Err(e) => e,
            Ok(_) => panic!("expected an error"),
        };
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn addin_order_is_checked() {
        // qorvo extends fira's tables; loading it alone must fail loudly
        let err = match build(Some(&["qorvo".to_string()])) {
            Err(e) => e,
            Ok(_) => panic!("expected an error"),
        };
        assert!(err.to_string().contains("qorvo"));
    }

    #[test]
    fn default_load_includes_all_addins() {
        let registry = build(None).unwrap();
        assert_eq!(registry.loaded_addins(), &["fira", "qorvo", "custom"]);
        assert!(registry.param_table("app_config").is_some());
    }
}
