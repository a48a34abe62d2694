//! Loading and saving configuration files.
//!
//! A load composes one or more files: the first is the base and every later
//! file overlays it. Each file is pre-processed before parsing:
//!
//! - `$VAR` / `${VAR}` are substituted from the process environment, then
//!   from the `.env` entries given to the loader
//! - accounts written as `"name": { "fromFile": "path" }` are cut out and
//!   loaded from the referenced file once everything else is composed

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{Map, Value as Json};
use tracing::{debug, info};

use flow_types::env_utils::substitute_env;
use flow_types::{Error, Result};

use super::json::JsonParser;
use super::Config;

/// File name of a project configuration.
pub const DEFAULT_PATH: &str = "flow.json";

/// `${HOME}/flow.json`.
pub fn global_path() -> String {
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_PATH).to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_PATH.to_string())
}

/// The global and the local configuration path, in that order.
pub fn default_paths() -> Vec<String> {
    vec![global_path(), DEFAULT_PATH.to_string()]
}

// =============================================================================
// Storage
// =============================================================================

/// Where configuration and contract files are read from and written to.
pub trait ReaderWriter: Send + Sync {
    fn read_file(&self, path: &str) -> Result<Vec<u8>>;

    fn write_file(&self, path: &str, data: &[u8]) -> Result<()>;

    fn exists(&self, path: &str) -> bool;
}

/// The local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl ReaderWriter for LocalFs {
    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        std::fs::read(path).map_err(|e| Error::io(path, e))
    }

    fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
            }
        }
        std::fs::write(path, data).map_err(|e| Error::io(path, e))
    }

    fn exists(&self, path: &str) -> bool {
        Path::new(path).is_file()
    }
}

/// Files held in memory, keyed by cleaned path.
#[derive(Debug, Default)]
pub struct MemoryFs {
    files: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: &str, data: impl AsRef<[u8]>) -> Self {
        self.files
            .write()
            .insert(flow_resolver::clean_path(path), data.as_ref().to_vec());
        self
    }
}

impl ReaderWriter for MemoryFs {
    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        self.files
            .read()
            .get(&flow_resolver::clean_path(path))
            .cloned()
            .ok_or_else(|| Error::io(path, "file does not exist"))
    }

    fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        self.files
            .write()
            .insert(flow_resolver::clean_path(path), data.to_vec());
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.files.read().contains_key(&flow_resolver::clean_path(path))
    }
}

// =============================================================================
// Parsers
// =============================================================================

/// A configuration file format.
pub trait Parser: Send + Sync {
    /// Whether files with this extension are handled.
    fn supports(&self, extension: &str) -> bool;

    fn deserialize(&self, raw: &[u8]) -> Result<Config>;

    fn serialize(&self, config: &Config) -> Result<Vec<u8>>;
}

// =============================================================================
// Loader
// =============================================================================

/// An account to be read from another file after composition.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FileAccount {
    name: String,
    path: String,
}

/// Reads `.env` style `KEY=value` entries; a missing file yields nothing.
pub fn read_dotenv(path: impl AsRef<Path>) -> HashMap<String, String> {
    match dotenv::from_path_iter(path.as_ref()) {
        Ok(iter) => iter.filter_map(|entry| entry.ok()).collect(),
        Err(_) => HashMap::new(),
    }
}

pub struct Loader {
    reader: Arc<dyn ReaderWriter>,
    parsers: Vec<Box<dyn Parser>>,
    env: HashMap<String, String>,
}

impl Loader {
    /// A loader that understands JSON.
    pub fn new(reader: Arc<dyn ReaderWriter>) -> Self {
        Self {
            reader,
            parsers: vec![Box::new(JsonParser)],
            env: HashMap::new(),
        }
    }

    /// Values consulted after the process environment during substitution.
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn add_parser(&mut self, parser: Box<dyn Parser>) {
        self.parsers.push(parser);
    }

    pub fn reader(&self) -> &Arc<dyn ReaderWriter> {
        &self.reader
    }

    fn parser_for(&self, path: &str) -> Result<&dyn Parser> {
        let extension = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        self.parsers
            .iter()
            .find(|p| p.supports(extension))
            .map(|p| p.as_ref())
            .ok_or_else(|| Error::parse(path, "unsupported configuration format"))
    }

    /// Load and compose `paths`.
    ///
    /// Given exactly [`default_paths`], the local file is used when it
    /// exists and the global one otherwise.
    pub fn load(&self, paths: &[String]) -> Result<Config> {
        if paths == default_paths().as_slice() {
            let local = DEFAULT_PATH.to_string();
            let global = global_path();
            let chosen = if self.reader.exists(&local) {
                local
            } else if self.reader.exists(&global) {
                global
            } else {
                return Err(Error::ConfigMissing { paths: vec![local, global] });
            };
            return self.compose(&[chosen]);
        }
        self.compose(paths)
    }

    fn compose(&self, paths: &[String]) -> Result<Config> {
        let missing: Vec<String> = paths
            .iter()
            .filter(|p| !self.reader.exists(p))
            .cloned()
            .collect();
        if paths.is_empty() || !missing.is_empty() {
            return Err(Error::ConfigMissing {
                paths: if missing.is_empty() { paths.to_vec() } else { missing },
            });
        }

        let mut composed: Option<Config> = None;
        let mut file_accounts = Vec::new();
        for path in paths {
            let (config, accounts) = self.load_file(path)?;
            debug!(%path, accounts = config.accounts.len(), "loaded configuration file");
            file_accounts.extend(accounts);
            match composed.as_mut() {
                None => composed = Some(config),
                Some(base) => base.overlay(config),
            }
        }
        let mut config = composed.unwrap_or_default();

        for account in file_accounts {
            let (external, _) = self.load_file(&account.path)?;
            let found = external.account_by_name(&account.name).cloned().ok_or_else(|| {
                Error::Validation(format!(
                    "account {} not found in referenced file {}",
                    account.name, account.path
                ))
            })?;
            info!(account = %account.name, path = %account.path, "loaded account from file");
            config.add_or_update_account(found);
        }

        config.validate()?;
        Ok(config)
    }

    /// Read, pre-process and parse one file.
    fn load_file(&self, path: &str) -> Result<(Config, Vec<FileAccount>)> {
        let raw = self.reader.read_file(path)?;
        let text = String::from_utf8(raw).map_err(|e| Error::parse(path, e))?;
        let text = substitute_env(&text, &self.env);

        let base_dir = Path::new(path).parent().map(Path::to_path_buf).unwrap_or_default();
        let (text, file_accounts) = split_file_accounts(text, &base_dir);

        let config = self
            .parser_for(path)?
            .deserialize(text.as_bytes())
            .map_err(|e| match e {
                Error::OutdatedFormat { .. } => Error::OutdatedFormat { path: path.to_string() },
                other => other,
            })?;
        Ok((config, file_accounts))
    }

    /// Serialize `config` to `path` in the format its extension names.
    pub fn save(&self, config: &Config, path: &str) -> Result<()> {
        let data = self.parser_for(path)?.serialize(config)?;
        self.reader.write_file(path, &data)?;
        info!(%path, "configuration saved");
        Ok(())
    }
}

/// Cut `"name": { "fromFile": "path" }` entries out of the `accounts`
/// section. Text that is not a JSON object is returned untouched for the
/// parser to report.
fn split_file_accounts(text: String, base_dir: &Path) -> (String, Vec<FileAccount>) {
    let Ok(mut root) = serde_json::from_str::<Json>(&text) else {
        return (text, Vec::new());
    };
    let Some(accounts) = root.get_mut("accounts").and_then(Json::as_object_mut) else {
        return (text, Vec::new());
    };

    let mut file_accounts = Vec::new();
    let mut kept = Map::new();
    for (name, entry) in std::mem::take(accounts) {
        let reference = file_reference(&entry).map(|r| relative_to(base_dir, r));
        match reference {
            Some(path) => file_accounts.push(FileAccount { name, path }),
            None => {
                kept.insert(name, entry);
            }
        }
    }
    *accounts = kept;

    if file_accounts.is_empty() {
        (text, file_accounts)
    } else {
        (root.to_string(), file_accounts)
    }
}

fn file_reference(entry: &Json) -> Option<&str> {
    let object = entry.as_object().filter(|o| o.len() == 1)?;
    object.get("fromFile")?.as_str()
}

fn relative_to(base: &Path, path: &str) -> String {
    let candidate = PathBuf::from(path);
    if candidate.is_absolute() || base.as_os_str().is_empty() {
        path.to_string()
    } else {
        base.join(candidate).to_string_lossy().into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_A: &str = "21c5dfdeb0ff03a7a73ef39788563b62c89adea67bbb21ab95e5f710bd1d40b7";
    const KEY_B: &str = "dd72967fd2bd75234ae9037dd4694c1f00baad63a10c35172bf65fbb8ad74b47";

    fn base(key: &str) -> String {
        format!(
            r#"{{
                "networks": {{ "emulator": "127.0.0.1:3569" }},
                "accounts": {{ "emulator-account": {{ "address": "f8d6e0586b0a20c7", "key": "{}" }} }}
            }}"#,
            key
        )
    }

    fn loader(fs: MemoryFs) -> Loader {
        Loader::new(Arc::new(fs))
    }

    #[test]
    fn test_overlay_later_file_wins() {
        let fs = MemoryFs::new()
            .with_file("flow.json", base(KEY_A))
            .with_file("private.json", base(KEY_B));
        let config = loader(fs)
            .load(&["flow.json".to_string(), "private.json".to_string()])
            .unwrap();

        assert_eq!(config.accounts.len(), 1);
        assert_eq!(config.accounts[0].key.private_key().unwrap().to_hex(), KEY_B);
    }

    #[test]
    fn test_overlay_same_file_twice() {
        let fs = MemoryFs::new().with_file("flow.json", base(KEY_A));
        let loader = loader(fs);
        let once = loader.load(&["flow.json".to_string()]).unwrap();
        let twice = loader
            .load(&["flow.json".to_string(), "flow.json".to_string()])
            .unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_from_file_accounts() {
        let main = format!(
            r#"{{
                "networks": {{ "emulator": "127.0.0.1:3569" }},
                "accounts": {{
                    "admin-account": {{ "fromFile": "private.json" }},
                    "emulator-account": {{ "address": "f8d6e0586b0a20c7", "key": "{}" }}
                }}
            }}"#,
            KEY_A
        );
        let private = format!(
            r#"{{ "accounts": {{ "admin-account": {{ "address": "179b6b1cb6755e31", "key": "{}" }} }} }}"#,
            KEY_B
        );
        let fs = MemoryFs::new()
            .with_file("project/flow.json", main)
            .with_file("project/private.json", private);

        let config = loader(fs).load(&["project/flow.json".to_string()]).unwrap();
        assert_eq!(config.accounts.len(), 2);
        let admin = config.account_by_name("admin-account").unwrap();
        assert_eq!(admin.address.hex(), "179b6b1cb6755e31");
    }

    #[test]
    fn test_from_file_last_entry() {
        let main = format!(
            r#"{{ "accounts": {{
                "emulator-account": {{ "address": "f8d6e0586b0a20c7", "key": "{}" }},
                "admin-account": {{ "fromFile": "./private.json" }}
            }} }}"#,
            KEY_A
        );
        let private = format!(
            r#"{{ "accounts": {{ "admin-account": {{ "address": "179b6b1cb6755e31", "key": "{}" }} }} }}"#,
            KEY_B
        );
        let fs = MemoryFs::new()
            .with_file("flow.json", main)
            .with_file("private.json", private);
        let config = loader(fs).load(&["flow.json".to_string()]).unwrap();
        assert_eq!(config.accounts.len(), 2);
    }

    #[test]
    fn test_from_file_missing_account() {
        let main = r#"{ "accounts": { "admin-account": { "fromFile": "private.json" } } }"#;
        let private = format!(
            r#"{{ "accounts": {{ "someone-else": {{ "address": "179b6b1cb6755e31", "key": "{}" }} }} }}"#,
            KEY_B
        );
        let fs = MemoryFs::new()
            .with_file("flow.json", main)
            .with_file("private.json", private);
        let err = loader(fs).load(&["flow.json".to_string()]).unwrap_err();
        assert!(matches!(err, Error::Validation(ref m) if m.contains("admin-account")));
    }

    #[test]
    fn test_from_file_only_applies_to_accounts() {
        let main = format!(
            r#"{{
                "contracts": {{ "Foo": {{ "fromFile": "private.json" }} }},
                "accounts": {{ "emulator-account": {{ "address": "f8d6e0586b0a20c7", "key": "{}" }} }}
            }}"#,
            KEY_A
        );
        let fs = MemoryFs::new().with_file("flow.json", main);
        let err = loader(fs).load(&["flow.json".to_string()]).unwrap_err();
        assert!(matches!(err, Error::Parse { ref subject, .. } if subject == "contract Foo"), "{}", err);
    }

    #[test]
    fn test_env_substitution() {
        let raw = r#"{ "accounts": { "emulator-account": { "address": "f8d6e0586b0a20c7", "key": "$FLOWKIT_TEST_LOADER_KEY" } } }"#;
        let mut env = HashMap::new();
        env.insert("FLOWKIT_TEST_LOADER_KEY".to_string(), KEY_A.to_string());

        let fs = MemoryFs::new().with_file("flow.json", raw);
        let config = Loader::new(Arc::new(fs))
            .with_env(env)
            .load(&["flow.json".to_string()])
            .unwrap();
        assert_eq!(config.accounts[0].key.private_key().unwrap().to_hex(), KEY_A);
    }

    #[test]
    fn test_unresolved_variable_left_literal() {
        let raw = r#"{ "networks": { "custom": "$FLOWKIT_TEST_UNSET_HOST" } }"#;
        let fs = MemoryFs::new().with_file("flow.json", raw);
        let config = loader(fs).load(&["flow.json".to_string()]).unwrap();
        assert_eq!(config.networks[0].host, "$FLOWKIT_TEST_UNSET_HOST");
    }

    #[test]
    fn test_missing_and_outdated() {
        let fs = MemoryFs::new().with_file("old.json", r#"{ "host": "127.0.0.1:3569", "accounts": {} }"#);
        let loader = loader(fs);

        assert_eq!(
            loader.load(&["nope.json".to_string()]).unwrap_err(),
            Error::ConfigMissing { paths: vec!["nope.json".to_string()] }
        );
        assert_eq!(
            loader.load(&["old.json".to_string()]).unwrap_err(),
            Error::OutdatedFormat { path: "old.json".to_string() }
        );
    }

    #[test]
    fn test_default_paths_prefer_local() {
        let fs = MemoryFs::new().with_file(DEFAULT_PATH, base(KEY_A));
        let config = loader(fs).load(&default_paths()).unwrap();
        assert_eq!(config.accounts.len(), 1);

        let empty = loader(MemoryFs::new());
        assert!(matches!(
            empty.load(&default_paths()),
            Err(Error::ConfigMissing { .. })
        ));
    }

    #[test]
    fn test_save_and_reload() {
        let fs = Arc::new(MemoryFs::new().with_file("flow.json", base(KEY_A)));
        let loader = Loader::new(fs.clone());
        let config = loader.load(&["flow.json".to_string()]).unwrap();

        loader.save(&config, "copy/flow.json").unwrap();
        assert!(fs.exists("copy/flow.json"));
        assert_eq!(loader.load(&["copy/flow.json".to_string()]).unwrap(), config);
        assert!(matches!(loader.save(&config, "flow.yaml"), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_dotenv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "FLOWKIT_DOTENV_KEY=abc\n# comment\nOTHER=1\n").unwrap();
        let env = read_dotenv(&path);
        assert_eq!(env.get("FLOWKIT_DOTENV_KEY").map(String::as_str), Some("abc"));
        assert!(read_dotenv(dir.path().join("missing.env")).is_empty());
    }
}
