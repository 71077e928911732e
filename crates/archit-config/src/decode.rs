//! Variant decoding of architecture documents.
//!
//! The document arrives as an untyped tree. This module is the single place
//! that imposes a schema on it: every record with variants is selected by its
//! `kind` discriminator (matched case-insensitively), then exactly the fields
//! of that variant are read. Fields of other variants are ignored.
//!
//! Documents written for the older layout are read as well: legacy kind tags
//! (`CodeCommit`, `AuroraSls`, ...), legacy field names (`enable`,
//! `specFilename`, `create`, `tokenName`, `azCount`) and sizing nested under
//! `spec`. The current spelling wins when both are present.

use archit_core::ServiceId;
use archit_core::config::{
    ApplicationConfig, ArchitectureConfig, ArchitecturePipelineConfig, BuildOptions, CredentialRef, DatabaseConfig,
    NetworkConfig, PipelineConfig, PipelineSection, RepositoryConfig, ServiceConfig,
    ServicesConfig, SiteConfig, StageOption,
};
use serde_json::{Map, Value};

use crate::limits;
use crate::{Category, DecodeError, DecodeReason, DecodeResult};

/// Untyped configuration tree.
pub type Tree = Value;

/// Any record the decoder can produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedConfig {
    Architecture(ArchitectureConfig),
    Site(SiteConfig),
    Network(NetworkConfig),
    Services(ServicesConfig),
    Service(ServiceConfig),
    Pipeline(PipelineConfig),
    Repository(RepositoryConfig),
    Stage(StageOption),
    Database(DatabaseConfig),
    Application(ApplicationConfig),
}

/// Decode `raw` as a record of the `expected` category.
///
/// `Category::Stage` decodes a bare stage option; section-specific rules
/// (spec file required when enabled) apply when it is read as part of a
/// pipeline, or through [`decode_stage`].
pub fn decode(raw: &Tree, expected: Category) -> DecodeResult<TypedConfig> {
    match expected {
        Category::Architecture => decode_architecture(raw).map(TypedConfig::Architecture),
        Category::Site => decode_site(raw).map(TypedConfig::Site),
        Category::Network => decode_network(raw).map(TypedConfig::Network),
        Category::Services => decode_services(raw).map(TypedConfig::Services),
        Category::Service => decode_service(raw).map(TypedConfig::Service),
        Category::Pipeline => decode_pipeline(raw).map(TypedConfig::Pipeline),
        Category::Repository => decode_repository(raw).map(TypedConfig::Repository),
        Category::Stage => decode_stage_option(raw, None).map(TypedConfig::Stage),
        Category::Database => decode_database(raw).map(TypedConfig::Database),
        Category::Application => decode_application(raw).map(TypedConfig::Application),
    }
}

/// Decode a whole document.
///
/// Accepts services either inline (`network` and `services: [..]` at the root)
/// or nested (`services: { network, services: [..] }`).
pub fn decode_architecture(raw: &Tree) -> DecodeResult<ArchitectureConfig> {
    let root = Section::open(Category::Architecture, raw)?;
    let pipeline = optional(&root, ARCHITECTURE_PIPELINE_KEY, decode_architecture_pipeline)?;
    let site = optional(&root, "site", decode_site)?;

    let services = match root.required("services")? {
        Value::Object(_) => nested(&root, "services", decode_services)?,
        Value::Array(_) => ServicesConfig {
            network: nested(&root, "network", decode_network)?,
            services: decode_service_list(&root, "services")?,
        },
        other => return Err(root.wrong_type("services", "array or map", other)),
    };

    Ok(ArchitectureConfig {
        pipeline,
        site,
        services,
    })
}

/// Key of the architecture pipeline in the document root.
pub const ARCHITECTURE_PIPELINE_KEY: &str = "archi";

pub fn decode_architecture_pipeline(raw: &Tree) -> DecodeResult<ArchitecturePipelineConfig> {
    let section = Section::open(Category::Architecture, raw)?;
    let id = section.string("id")?;
    if !limits::is_dns_label(&id) {
        return Err(DecodeError::invalid(
            Category::Architecture,
            "id",
            format!("'{}' is not a valid DNS label", id),
        ));
    }
    Ok(ArchitecturePipelineConfig {
        id,
        pipeline: nested(&section, "pipeline", decode_pipeline)?,
    })
}

pub fn decode_site(raw: &Tree) -> DecodeResult<SiteConfig> {
    let section = Section::open(Category::Site, raw)?;
    Ok(SiteConfig {
        pipeline: nested(&section, "pipeline", decode_pipeline)?,
    })
}

pub fn decode_network(raw: &Tree) -> DecodeResult<NetworkConfig> {
    let section = Section::open(Category::Network, raw)?;

    let namespace = section.string("namespace")?;
    if !limits::is_dns_label(&namespace) {
        return Err(DecodeError::invalid(
            Category::Network,
            "namespace",
            format!("'{}' is not a valid DNS label", namespace),
        ));
    }

    let field = section.alias("availabilityZoneCount", "azCount");
    let count = section.positive_u32(field)?;
    let availability_zone_count = u8::try_from(count).map_err(|_| {
        DecodeError::invalid(Category::Network, field, format!("{} is out of range", count))
    })?;

    Ok(NetworkConfig {
        namespace,
        availability_zone_count,
    })
}

pub fn decode_services(raw: &Tree) -> DecodeResult<ServicesConfig> {
    let section = Section::open(Category::Services, raw)?;
    let list_field = if section.get("services").is_none() && section.get("list").is_some() {
        "list"
    } else {
        "services"
    };

    Ok(ServicesConfig {
        network: nested(&section, "network", decode_network)?,
        services: decode_service_list(&section, list_field)?,
    })
}

fn decode_service_list(section: &Section<'_>, field: &str) -> DecodeResult<Vec<ServiceConfig>> {
    let items = match section.required(field)? {
        Value::Array(items) => items,
        other => return Err(section.wrong_type(field, "array", other)),
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| decode_service(item).map_err(|e| e.at(index.to_string()).at(field)))
        .collect()
}

pub fn decode_service(raw: &Tree) -> DecodeResult<ServiceConfig> {
    let section = Section::open(Category::Service, raw)?;
    let id = section.string("id")?;
    if !limits::is_service_id(&id) {
        return Err(DecodeError::invalid(
            Category::Service,
            "id",
            format!(
                "'{}' must be a DNS label of at most {} characters",
                id,
                limits::SERVICE_ID_MAX_LEN
            ),
        ));
    }
    Ok(ServiceConfig {
        id: ServiceId::new(id),
        db: nested(&section, "db", decode_database)?,
        app: nested(&section, "app", decode_application)?,
    })
}

pub fn decode_pipeline(raw: &Tree) -> DecodeResult<PipelineConfig> {
    let section = Section::open(Category::Pipeline, raw)?;
    let stage = |key: PipelineSection| {
        optional(&section, key.key(), |value| decode_stage(value, key))
    };

    Ok(PipelineConfig {
        repo: nested(&section, "repo", decode_repository)?,
        build: optional(&section, PipelineSection::Build.key(), decode_build)?,
        staging: stage(PipelineSection::Staging)?,
        test: stage(PipelineSection::Test)?,
        approval: stage(PipelineSection::Approval)?,
        deploy: stage(PipelineSection::Deploy)?,
    })
}

fn decode_build(raw: &Tree) -> DecodeResult<BuildOptions> {
    let section = Section::open(Category::Stage, raw)?;
    Ok(BuildOptions {
        privileged: section.bool_or("privileged", false)?,
    })
}

/// Decode the stage option of a pipeline section, enforcing its invariants.
pub fn decode_stage(raw: &Tree, section: PipelineSection) -> DecodeResult<StageOption> {
    decode_stage_option(raw, Some(section))
}

fn decode_stage_option(raw: &Tree, pipeline_section: Option<PipelineSection>) -> DecodeResult<StageOption> {
    let section = Section::open(Category::Stage, raw)?;
    let spec_file_field = section.alias("specFile", "specFilename");
    let option = StageOption {
        enabled: section.bool_or(section.alias("enabled", "enable"), false)?,
        spec_file: section.optional_string(spec_file_field)?,
    };

    let needs_spec_file = pipeline_section.is_some_and(|s| s.requires_spec_file());
    if option.enabled && needs_spec_file && option.spec_file.is_none() {
        return Err(DecodeError::missing(Category::Stage, spec_file_field));
    }
    Ok(option)
}

#[derive(Debug, Clone, Copy)]
enum RepositoryKind {
    Hosted,
    External,
}

// Second tag of each entry is the legacy document name.
const REPOSITORY_KINDS: &[(&[&str], RepositoryKind)] = &[
    (&["hosted", "codecommit"], RepositoryKind::Hosted),
    (&["external", "github"], RepositoryKind::External),
];

pub fn decode_repository(raw: &Tree) -> DecodeResult<RepositoryConfig> {
    let section = Section::open(Category::Repository, raw)?;
    let kind = section.kind()?;

    match match_kind(kind, REPOSITORY_KINDS) {
        Some(RepositoryKind::Hosted) => Ok(RepositoryConfig::Hosted {
            name: section.string("name")?,
            create_if_missing: section.bool_or(section.alias("createIfMissing", "create"), false)?,
        }),
        Some(RepositoryKind::External) => Ok(RepositoryConfig::External {
            name: section.string("name")?,
            owner: section.string("owner")?,
            credential_ref: CredentialRef::new(
                section.string(section.alias("credentialRef", "tokenName"))?,
            ),
        }),
        None => Err(section.unknown_kind(kind)),
    }
}

#[derive(Debug, Clone, Copy)]
enum DatabaseKind {
    ManagedServerless,
    CustomContainer,
}

const DATABASE_KINDS: &[(&[&str], DatabaseKind)] = &[
    (&["managedserverless", "aurorasls"], DatabaseKind::ManagedServerless),
    (&["customcontainer", "customdbcont"], DatabaseKind::CustomContainer),
];

pub fn decode_database(raw: &Tree) -> DecodeResult<DatabaseConfig> {
    let section = Section::open(Category::Database, raw)?;
    let kind = section.kind()?;

    match match_kind(kind, DATABASE_KINDS) {
        Some(DatabaseKind::ManagedServerless) => Ok(DatabaseConfig::ManagedServerless {
            pipeline: nested(&section, "pipeline", decode_pipeline)?,
        }),
        Some(DatabaseKind::CustomContainer) => {
            let (cpu, block) = section.sizing("cpu", "cpu")?;
            let (mem, _) = section.sizing("mem", "mem")?;
            check_container_size(cpu, mem).map_err(|e| within(e, block))?;
            Ok(DatabaseConfig::CustomContainer {
                cpu,
                mem,
                pipeline: nested(&section, "pipeline", decode_pipeline)?,
            })
        }
        None => Err(section.unknown_kind(kind)),
    }
}

fn check_container_size(cpu: u32, mem: u32) -> DecodeResult<()> {
    let Some(options) = limits::container_memory_options(cpu) else {
        return Err(DecodeError::invalid(
            Category::Database,
            "cpu",
            format!(
                "{} is not a supported cpu value (one of {})",
                cpu,
                join(&limits::CONTAINER_CPU_OPTIONS)
            ),
        ));
    };
    if !options.contains(&mem) {
        return Err(DecodeError::invalid(
            Category::Database,
            "mem",
            format!("cpu {} allows memory {}, got {}", cpu, join(&options), mem),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum ApplicationKind {
    ServerlessContainer,
    ManagedContainer,
}

const APPLICATION_KINDS: &[(&[&str], ApplicationKind)] = &[
    (&["serverlesscontainer", "customslscont"], ApplicationKind::ServerlessContainer),
    (&["managedcontainer", "customappcont"], ApplicationKind::ManagedContainer),
];

pub fn decode_application(raw: &Tree) -> DecodeResult<ApplicationConfig> {
    let section = Section::open(Category::Application, raw)?;
    let kind = section.kind()?;

    match match_kind(kind, APPLICATION_KINDS) {
        Some(ApplicationKind::ServerlessContainer) => {
            let (memory_mb, block) = section.sizing("memoryMB", "mem")?;
            if !limits::FUNCTION_MEMORY_MB.contains(&memory_mb) {
                let field = if block.is_some() { "mem" } else { "memoryMB" };
                let message = format!(
                    "must be between {} and {}, got {}",
                    limits::FUNCTION_MEMORY_MB.start(),
                    limits::FUNCTION_MEMORY_MB.end(),
                    memory_mb
                );
                return Err(within(
                    DecodeError::invalid(Category::Application, field, message),
                    block,
                ));
            }
            Ok(ApplicationConfig::ServerlessContainer {
                memory_mb,
                pipeline: nested(&section, "pipeline", decode_pipeline)?,
            })
        }
        Some(ApplicationKind::ManagedContainer) => Ok(ApplicationConfig::ManagedContainer {
            pipeline: nested(&section, "pipeline", decode_pipeline)?,
        }),
        None => Err(section.unknown_kind(kind)),
    }
}

fn match_kind<T: Copy>(raw: &str, table: &[(&[&str], T)]) -> Option<T> {
    let wanted = raw.trim().to_ascii_lowercase();
    table
        .iter()
        .find(|(tags, _)| tags.contains(&wanted.as_str()))
        .map(|(_, kind)| *kind)
}

fn join(values: &[u32]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Block older documents nest sizing fields under.
const LEGACY_SIZING_BLOCK: &str = "spec";

/// Place an error inside `block`, when the value came from one.
fn within(error: DecodeError, block: Option<&str>) -> DecodeError {
    match block {
        Some(block) => error.at(block),
        None => error,
    }
}

/// Decode a required child record, recording its key in the error path.
fn nested<T>(
    section: &Section<'_>,
    field: &str,
    decode: impl FnOnce(&Tree) -> DecodeResult<T>,
) -> DecodeResult<T> {
    decode(section.required(field)?).map_err(|e| e.at(field))
}

/// Decode an optional child record; absent and null are both `None`.
fn optional<T>(
    section: &Section<'_>,
    field: &str,
    decode: impl FnOnce(&Tree) -> DecodeResult<T>,
) -> DecodeResult<Option<T>> {
    section
        .get(field)
        .map(|value| decode(value).map_err(|e| e.at(field)))
        .transpose()
}

fn shape(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "map",
    }
}

/// One mapping of the tree, read as a record of `category`.
struct Section<'a> {
    category: Category,
    map: &'a Map<String, Value>,
}

impl<'a> Section<'a> {
    fn open(category: Category, value: &'a Value) -> DecodeResult<Self> {
        match value {
            Value::Object(map) => Ok(Self { category, map }),
            other => Err(DecodeError::new(
                category,
                "",
                DecodeReason::WrongType {
                    expected: "map",
                    found: shape(other),
                },
            )),
        }
    }

    fn get(&self, field: &str) -> Option<&'a Value> {
        self.map.get(field).filter(|v| !v.is_null())
    }

    /// `field`, or its legacy spelling when only that one is present.
    fn alias(&self, field: &'static str, legacy: &'static str) -> &'static str {
        if self.get(field).is_none() && self.get(legacy).is_some() {
            legacy
        } else {
            field
        }
    }

    fn required(&self, field: &str) -> DecodeResult<&'a Value> {
        self.get(field)
            .ok_or_else(|| DecodeError::missing(self.category, field))
    }

    fn wrong_type(&self, field: &str, expected: &'static str, found: &Value) -> DecodeError {
        DecodeError::new(
            self.category,
            field,
            DecodeReason::WrongType {
                expected,
                found: shape(found),
            },
        )
    }

    fn unknown_kind(&self, kind: &str) -> DecodeError {
        DecodeError::new(
            self.category,
            "kind",
            DecodeReason::UnknownKind(kind.to_string()),
        )
    }

    fn kind(&self) -> DecodeResult<&'a str> {
        match self.required("kind")? {
            Value::String(kind) => Ok(kind),
            other => Err(self.wrong_type("kind", "string", other)),
        }
    }

    fn string(&self, field: &str) -> DecodeResult<String> {
        match self.required(field)? {
            Value::String(s) if s.trim().is_empty() => Err(DecodeError::invalid(
                self.category,
                field,
                "must not be empty",
            )),
            Value::String(s) => Ok(s.clone()),
            other => Err(self.wrong_type(field, "string", other)),
        }
    }

    fn optional_string(&self, field: &str) -> DecodeResult<Option<String>> {
        if self.get(field).is_none() {
            return Ok(None);
        }
        self.string(field).map(Some)
    }

    fn bool_or(&self, field: &str, default: bool) -> DecodeResult<bool> {
        match self.get(field) {
            None => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(self.wrong_type(field, "boolean", other)),
        }
    }

    /// Positive integer `field`, or `legacy` inside the legacy sizing block.
    /// Returns the block key when the value came from there.
    fn sizing(&self, field: &str, legacy: &str) -> DecodeResult<(u32, Option<&'static str>)> {
        if self.get(field).is_none() {
            if let Some(block) = self.get(LEGACY_SIZING_BLOCK) {
                let block = Section::open(self.category, block)
                    .map_err(|e| e.at(LEGACY_SIZING_BLOCK))?;
                let value = block
                    .positive_u32(legacy)
                    .map_err(|e| e.at(LEGACY_SIZING_BLOCK))?;
                return Ok((value, Some(LEGACY_SIZING_BLOCK)));
            }
        }
        Ok((self.positive_u32(field)?, None))
    }

    fn positive_u32(&self, field: &str) -> DecodeResult<u32> {
        let value = self.required(field)?;
        let n = value
            .as_u64()
            .ok_or_else(|| self.wrong_type(field, "positive integer", value))?;
        if n == 0 {
            return Err(DecodeError::invalid(self.category, field, "must be positive"));
        }
        u32::try_from(n)
            .map_err(|_| DecodeError::invalid(self.category, field, format!("{} is out of range", n)))
    }
}
